// src/config.rs

//! Configuration for the splash painter.
//!
//! Every section carries `#[serde(default)]`, so a config file only needs to
//! name the settings it changes. Command-line flags are layered on top by the
//! binary; the library itself never reads configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::fbdev::DEFAULT_DEVICE_PATH;

/// Image painted when none is given.
pub const DEFAULT_IMAGE_PATH: &str = "/splash.png";

/// Root of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Framebuffer device settings.
    pub device: DeviceConfig,
    /// What to paint and how to place it.
    pub image: ImageConfig,
}

/// Framebuffer device settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device node to open.
    pub path: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            path: PathBuf::from(DEFAULT_DEVICE_PATH),
        }
    }
}

/// Image placement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageConfig {
    /// PNG to paint.
    pub path: PathBuf,
    /// Resample to exactly fill the visible area.
    pub scale_to_screen: bool,
    /// Centre the image when it is not resampled to the screen size.
    pub center: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            path: PathBuf::from(DEFAULT_IMAGE_PATH),
            scale_to_screen: true,
            center: true,
        }
    }
}

impl Config {
    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
