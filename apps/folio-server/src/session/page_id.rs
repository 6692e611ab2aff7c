//! Stable page identifiers
//!
//! A [`PageId`] names a page by the document that issued it and the page's
//! index at open time. It survives reordering and soft deletion, so it is
//! safe to embed in URLs such as `/page/3-12/thumbnail`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::error::PageIdParseError;

/// Separator between the document and page halves of the string form
const SEPARATOR: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub doc_id: u32,
    pub page_num: u32,
}

impl PageId {
    pub fn new(doc_id: u32, page_num: u32) -> Self {
        Self { doc_id, page_num }
    }

    /// Pack into one 64-bit key: document id high, page number low.
    /// Ordering of keys matches the derived ordering of `PageId`.
    pub fn to_key(self) -> u64 {
        (u64::from(self.doc_id) << 32) | u64::from(self.page_num)
    }

    pub fn from_key(key: u64) -> Self {
        Self {
            doc_id: (key >> 32) as u32,
            page_num: key as u32,
        }
    }

    /// Parse the `"{doc_id}-{page_num}"` form produced by `Display`
    pub fn parse(s: &str) -> Result<Self, PageIdParseError> {
        let invalid = || PageIdParseError::InvalidFormat(s.to_string());

        let (doc, page) = s.split_once(SEPARATOR).ok_or_else(invalid)?;
        let doc_id = parse_component(doc).ok_or_else(invalid)?;
        let page_num = parse_component(page).ok_or_else(invalid)?;

        Ok(Self { doc_id, page_num })
    }
}

/// Plain decimal digits only; rejects signs, whitespace and overflow
fn parse_component(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.doc_id, SEPARATOR, self.page_num)
    }
}

impl FromStr for PageId {
    type Err = PageIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
