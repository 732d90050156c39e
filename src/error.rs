// src/error.rs

use std::io;
use std::path::PathBuf;

/// Errors produced by the framebuffer core and its image collaborator.
///
/// Device-layer variants keep the underlying OS error as their source so the
/// caller can report the original errno.
#[derive(thiserror::Error, Debug)]
pub enum FbError {
    #[error("could not open framebuffer device {path}: {source}")]
    DeviceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not query framebuffer mode: {0}")]
    QueryFailed(#[source] io::Error),

    #[error("unsupported visual {visual} at {bits_per_pixel} bits per pixel (need true color, 16-32 bpp)")]
    UnsupportedVisual { visual: u32, bits_per_pixel: u32 },

    #[error("could not map framebuffer memory: {0}")]
    MapFailed(#[source] io::Error),

    #[error("could not load image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("framebuffer device is not open")]
    NotOpen,

    #[error("pixel data too short: need {expected} pixels, got {actual}")]
    PixelDataTooShort { expected: usize, actual: usize },
}

impl FbError {
    /// The raw OS error code behind a device-layer failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            FbError::DeviceUnavailable { source, .. } => source.raw_os_error(),
            FbError::QueryFailed(source) | FbError::MapFailed(source) => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FbError>;
