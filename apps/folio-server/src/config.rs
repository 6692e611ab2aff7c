//! Configuration management for Folio Server

use std::env;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

use crate::engine::ThumbnailFormat;
use crate::session::{SessionConfig, DEFAULT_THUMBNAIL_DPI};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload, in megabytes
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub thumbnail_dpi: f32,
    pub full_size_dpi: f32,
    pub thumbnail_format: ThumbnailFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_upload_mb: 512,
            },
            render: RenderConfig {
                thumbnail_dpi: DEFAULT_THUMBNAIL_DPI,
                full_size_dpi: 150.0,
                thumbnail_format: ThumbnailFormat::Png,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                max_upload_mb: parse_var("MAX_UPLOAD_MB", defaults.server.max_upload_mb)?,
            },
            render: RenderConfig {
                thumbnail_dpi: positive_dpi("THUMBNAIL_DPI", defaults.render.thumbnail_dpi)?,
                full_size_dpi: positive_dpi("FULL_SIZE_DPI", defaults.render.full_size_dpi)?,
                thumbnail_format: parse_var(
                    "THUMBNAIL_FORMAT",
                    defaults.render.thumbnail_format,
                )?,
            },
        })
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            thumbnail_dpi: self.render.thumbnail_dpi,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Unset means default; set but unparsable is an error
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

fn positive_dpi(var: &'static str, default: f32) -> Result<f32, ConfigError> {
    let dpi = parse_var(var, default)?;
    if dpi.is_finite() && dpi > 0.0 {
        Ok(dpi)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: dpi.to_string(),
        })
    }
}
