// src/lib.rs

//! Paints a decoded image onto a memory-mapped Linux framebuffer.
//!
//! The core is [`framebuffer::Framebuffer`]: it negotiates a true-color pixel
//! layout with the device, keeps an ARGB32 shadow of the visible area, tracks
//! the dirty region with [`geometry::Area`] and flushes it with a strategy
//! picked for the device's layout.

pub mod config;
pub mod error;
pub mod fbdev;
pub mod framebuffer;
pub mod geometry;
pub mod splash;

pub use error::{FbError, Result};
pub use framebuffer::{FlushStrategy, Framebuffer};
pub use geometry::Area;
pub use splash::DecodedImage;
