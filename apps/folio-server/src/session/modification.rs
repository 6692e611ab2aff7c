//! Non-destructive page edits
//!
//! A [`PageModification`] is the overlay a client draws on top of the
//! unrotated source raster. Nothing here touches the PDF bytes.

use serde::{Deserialize, Serialize};

/// Clockwise page rotation, always one of 0/90/180/270 degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "i32")]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    /// Normalize any multiple of 90 degrees, including negative values.
    /// Returns `None` for angles that are not multiples of 90.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => Rotation::None,
            90 => Rotation::Quarter,
            180 => Rotation::Half,
            _ => Rotation::ThreeQuarter,
        })
    }

    /// A rotation edit: one of ±90, ±180, ±270. Anything that normalizes to
    /// no rotation (0, 360, ...) is not an edit and returns `None`.
    pub fn from_delta(degrees: i32) -> Option<Self> {
        if !(-270..=270).contains(&degrees) {
            return None;
        }
        Self::from_degrees(degrees).filter(|rotation| *rotation != Rotation::None)
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }

    /// Add `delta`, wrapping at a full turn
    pub fn rotate_by(self, delta: Rotation) -> Self {
        let steps = (self as u8 + delta as u8) % 4;
        match steps {
            0 => Rotation::None,
            1 => Rotation::Quarter,
            2 => Rotation::Half,
            _ => Rotation::ThreeQuarter,
        }
    }

    /// True for 90 and 270, where width and height swap
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarter)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
            .ok_or_else(|| format!("rotation must be a multiple of 90, got {}", degrees))
    }
}

/// Mirror axis for [`PageModification::toggle_mirror`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorAxis {
    /// Flip left-right
    Horizontal,
    /// Flip top-bottom
    Vertical,
}

/// Cumulative edits applied to one page. The default value is "no changes".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageModification {
    pub rotation: Rotation,
    pub mirror_lr: bool,
    pub mirror_ud: bool,
    pub deleted: bool,
}

impl PageModification {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy with the rotation advanced by `delta`
    #[must_use]
    pub fn apply_rotation(&self, delta: Rotation) -> Self {
        Self {
            rotation: self.rotation.rotate_by(delta),
            ..*self
        }
    }

    /// Mirroring is a toggle: flipping twice restores the page
    pub fn toggle_mirror_lr(&mut self) {
        self.mirror_lr = !self.mirror_lr;
    }

    pub fn toggle_mirror_ud(&mut self) {
        self.mirror_ud = !self.mirror_ud;
    }

    pub fn toggle_mirror(&mut self, axis: MirrorAxis) {
        match axis {
            MirrorAxis::Horizontal => self.toggle_mirror_lr(),
            MirrorAxis::Vertical => self.toggle_mirror_ud(),
        }
    }

    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn unmark_deleted(&mut self) {
        self.deleted = false;
    }

    /// Human-readable summary, e.g. "rotated 180°, mirrored horizontally"
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.rotation != Rotation::None {
            parts.push(format!("rotated {}°", self.rotation.degrees()));
        }
        if self.mirror_lr {
            parts.push("mirrored horizontally".to_string());
        }
        if self.mirror_ud {
            parts.push("mirrored vertically".to_string());
        }
        if self.deleted {
            parts.push("deleted".to_string());
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_delta_excludes_identity() {
        assert_eq!(Rotation::from_delta(90), Some(Rotation::Quarter));
        assert_eq!(Rotation::from_delta(-90), Some(Rotation::ThreeQuarter));
        assert_eq!(Rotation::from_delta(-180), Some(Rotation::Half));
        assert_eq!(Rotation::from_delta(270), Some(Rotation::ThreeQuarter));
        assert_eq!(Rotation::from_delta(0), None);
        assert_eq!(Rotation::from_delta(360), None);
        assert_eq!(Rotation::from_delta(450), None);
        assert_eq!(Rotation::from_delta(45), None);
    }

    #[test]
    fn test_default_is_empty() {
        let m = PageModification::default();
        assert!(m.is_empty());
        assert_eq!(m.describe(), "no changes");
    }

    #[test]
    fn test_any_single_mutation_is_not_empty() {
        let base = PageModification::default();

        assert!(!base.apply_rotation(Rotation::Quarter).is_empty());

        let mut m = base;
        m.toggle_mirror_lr();
        assert!(!m.is_empty());

        let mut m = base;
        m.toggle_mirror_ud();
        assert!(!m.is_empty());

        let mut m = base;
        m.mark_deleted();
        assert!(!m.is_empty());
    }

    #[test]
    fn test_four_quarter_turns_return_to_identity() {
        let mut m = PageModification::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            m = m.apply_rotation(Rotation::Quarter);
            seen.push(m.rotation.degrees());
        }
        assert_eq!(seen, vec![90, 180, 270, 0]);
        assert!(m.is_empty());
    }

    #[test]
    fn test_negative_rotation_normalizes() {
        let delta = Rotation::from_degrees(-90).unwrap();
        assert_eq!(delta, Rotation::ThreeQuarter);
        let m = PageModification::default().apply_rotation(delta);
        assert_eq!(m.rotation.degrees(), 270);

        for (degrees, expected) in [(-180, 180), (-270, 90), (180, 180), (270, 270), (450, 90)] {
            assert_eq!(Rotation::from_degrees(degrees).unwrap().degrees(), expected);
        }
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn test_apply_rotation_leaves_receiver_untouched() {
        let original = PageModification::default();
        let rotated = original.apply_rotation(Rotation::Half);
        assert_eq!(original.rotation, Rotation::None);
        assert_eq!(rotated.rotation, Rotation::Half);
    }

    #[test]
    fn test_mirror_toggle_cancels() {
        let mut m = PageModification::default().apply_rotation(Rotation::Half);
        let before = m.describe();

        m.toggle_mirror_lr();
        assert!(m.mirror_lr);
        assert_eq!(m.describe(), "rotated 180°, mirrored horizontally");

        m.toggle_mirror_lr();
        assert!(!m.mirror_lr);
        assert_eq!(m.describe(), before);

        m.toggle_mirror(MirrorAxis::Vertical);
        m.toggle_mirror(MirrorAxis::Vertical);
        assert_eq!(m.describe(), before);
    }

    #[test]
    fn test_describe_all_fields() {
        let mut m = PageModification::default().apply_rotation(Rotation::Quarter);
        m.toggle_mirror_lr();
        m.toggle_mirror_ud();
        m.mark_deleted();
        assert_eq!(
            m.describe(),
            "rotated 90°, mirrored horizontally, mirrored vertically, deleted"
        );

        m.unmark_deleted();
        assert!(!m.deleted);
    }

    #[test]
    fn test_serde_rotation_as_degrees() {
        let m = PageModification::default().apply_rotation(Rotation::ThreeQuarter);
        let json = serde_json::to_value(m).unwrap();
        assert_eq!(json["rotation"], 270);
        assert_eq!(json["mirrorLr"], false);

        let back: PageModification = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);

        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }
}
