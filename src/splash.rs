// src/splash.rs

//! Decoded splash images in the compositor's `0xAARRGGBB` pixel format.

use crate::error::{FbError, Result};
use crate::fbdev::FramebufferBackend;
use crate::framebuffer::Framebuffer;
use crate::geometry::Area;

use log::debug;
use std::path::Path;

/// Row-major ARGB32 pixels with their dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl DecodedImage {
    /// Wraps existing ARGB32 pixels. Returns `None` if the length does not
    /// match `width * height`.
    pub fn from_argb32(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize {
            return None;
        }
        Some(DecodedImage {
            pixels,
            width,
            height,
        })
    }

    /// Loads an image file (PNG, palette, grayscale and 16-bit variants
    /// included) and converts it to ARGB32.
    pub fn decode(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|source| FbError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                u32::from_be_bytes([a, r, g, b])
            })
            .collect();
        debug!("Decoded {} ({}x{})", path.display(), width, height);
        Ok(DecodedImage {
            pixels,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Nearest-neighbor resample: destination `(x, y)` takes source pixel
    /// `(floor(x * src_w / dst_w), floor(y * src_h / dst_h))`.
    pub fn resize(&self, width: u32, height: u32) -> DecodedImage {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        if self.width > 0 && self.height > 0 {
            for y in 0..u64::from(height) {
                let src_y = (y * u64::from(self.height) / u64::from(height)) as usize;
                let src_row = &self.pixels[src_y * self.width as usize..][..self.width as usize];
                pixels.extend((0..u64::from(width)).map(|x| {
                    src_row[(x * u64::from(self.width) / u64::from(width)) as usize]
                }));
            }
        } else {
            pixels.resize(width as usize * height as usize, 0);
        }
        DecodedImage {
            pixels,
            width,
            height,
        }
    }

    /// Where this image lands when centred inside `screen`.
    pub fn centered_in(&self, screen: Area) -> Area {
        Area::new(
            (screen.width / 2) as i64 - i64::from(self.width / 2),
            (screen.height / 2) as i64 - i64::from(self.height / 2),
            u64::from(self.width),
            u64::from(self.height),
        )
    }
}

/// Paints `image` onto an open framebuffer, centred or anchored at the
/// origin, in a single fill/flush cycle.
pub fn paint<B: FramebufferBackend>(
    fb: &mut Framebuffer<B>,
    image: &DecodedImage,
    center: bool,
) -> Result<()> {
    let screen = fb.bounds();
    let area = if center {
        image.centered_in(screen)
    } else {
        Area::new(0, 0, u64::from(image.width()), u64::from(image.height()))
    };
    debug!("Painting {}x{} image at {:?}", image.width(), image.height(), area);
    fb.fill(Some(area), 0, 0, image.pixels())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn sample(width: u32, height: u32) -> DecodedImage {
        let pixels = (0..width * height).map(|i| 0xFF00_0000 | i).collect();
        DecodedImage::from_argb32(width, height, pixels).expect("sized")
    }

    #[test]
    fn from_argb32_checks_length() {
        assert!(DecodedImage::from_argb32(2, 2, vec![0; 3]).is_none());
    }

    #[test]
    fn resize_to_same_size_is_identity() {
        let img = sample(5, 3);
        assert_eq!(img.resize(5, 3), img);
    }

    #[test]
    fn upscale_repeats_nearest_pixels() {
        let img = DecodedImage::from_argb32(2, 1, vec![1, 2]).expect("sized");
        let big = img.resize(4, 2);
        assert_eq!(big.pixels(), &[1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn downscale_uses_floor_of_scaled_coordinate() {
        let img = sample(4, 4);
        let small = img.resize(2, 2);
        let base = 0xFF00_0000;
        assert_eq!(small.pixels(), &[base, base + 2, base + 8, base + 10]);
    }

    #[test]
    fn resizing_an_empty_image_yields_black() {
        let img = DecodedImage::from_argb32(0, 0, Vec::new()).expect("sized");
        assert_eq!(img.resize(2, 1).pixels(), &[0, 0]);
    }

    #[test]
    fn centered_in_screen() {
        let img = sample(4, 2);
        assert_eq!(img.centered_in(Area::with_size(10, 10)), Area::new(3, 4, 4, 2));
        let wide = sample(12, 2);
        assert_eq!(wide.centered_in(Area::with_size(10, 10)), Area::new(-1, 4, 12, 2));
    }

    #[test]
    fn paint_centres_small_image() {
        use crate::fbdev::mock::MockFbdev;

        let mut fb = Framebuffer::new(None);
        fb.open_with(MockFbdev::xrgb8888(4, 4, 4)).expect("open");
        let img = DecodedImage::from_argb32(2, 2, vec![1, 2, 3, 4]).expect("sized");
        paint(&mut fb, &img, true).expect("paint");
        assert_eq!(fb.shadow().row(0, 1, 4), &[0, 1, 2, 0]);
        assert_eq!(fb.shadow().row(0, 2, 4), &[0, 3, 4, 0]);
    }

    #[test]
    fn decode_converts_rgba_to_argb() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("splash.png");
        let mut png = image::RgbaImage::new(2, 1);
        png.put_pixel(0, 0, image::Rgba([0x11, 0x22, 0x33, 0x44]));
        png.put_pixel(1, 0, image::Rgba([0xFF, 0x00, 0x80, 0xFF]));
        png.save(&path).expect("write png");

        let img = DecodedImage::decode(&path).expect("decode");
        assert_eq!((img.width(), img.height()), (2, 1));
        assert_eq!(img.pixels(), &[0x4411_2233, 0xFFFF_0080]);
    }

    #[test]
    fn decode_expands_grayscale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gray.png");
        let gray = image::GrayImage::from_pixel(1, 1, image::Luma([0x7F]));
        gray.save(&path).expect("write png");

        let img = DecodedImage::decode(&path).expect("decode");
        assert_eq!(img.pixels(), &[0xFF7F_7F7F]);
    }

    #[test]
    fn decode_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nnot really").expect("write");
        assert!(matches!(
            DecodedImage::decode(&path),
            Err(FbError::Decode { .. })
        ));
    }

    #[test]
    fn decode_reports_missing_file() {
        let err = DecodedImage::decode(Path::new("/nonexistent/splash.png"))
            .expect_err("missing file");
        assert!(matches!(err, FbError::Decode { .. }));
    }
}
