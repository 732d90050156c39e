// src/geometry.rs

//! Axis-aligned integer rectangles and the two operations the compositor
//! needs to track dirty regions: `union` and `intersect`.
//!
//! A width of zero is the canonical "empty" sentinel. The `x`/`y` of an empty
//! area carry no meaning and are ignored by both operations.
//!
//! Far edges saturate at `i64::MAX`, so oversized areas still clip correctly
//! against anything that fits on a screen.

/// A rectangle in device pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Area {
    pub x: i64,
    pub y: i64,
    pub width: u64,
    pub height: u64,
}

impl Area {
    /// The canonical empty area.
    pub const EMPTY: Area = Area {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i64, y: i64, width: u64, height: u64) -> Self {
        Area {
            x,
            y,
            width,
            height,
        }
    }

    /// An area anchored at the origin.
    pub const fn with_size(width: u64, height: u64) -> Self {
        Area::new(0, 0, width, height)
    }

    /// Only `width` decides emptiness; a zero height with a nonzero width is
    /// never produced by the operations below.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0
    }

    #[inline]
    pub fn right(&self) -> i64 {
        self.x.saturating_add_unsigned(self.width)
    }

    #[inline]
    pub fn bottom(&self) -> i64 {
        self.y.saturating_add_unsigned(self.height)
    }

    /// Number of pixels covered.
    pub fn pixel_count(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.width.saturating_mul(self.height)
        }
    }

    /// Smallest area covering both `self` and `other`.
    ///
    /// If either operand is empty the other one is returned unchanged.
    pub fn union(&self, other: &Area) -> Area {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Area::new(x, y, span(x, right), span(y, bottom))
    }

    /// Overlap of `self` and `other`.
    ///
    /// If either operand is empty, that operand is returned as-is, so callers
    /// must treat any result with `width == 0` as empty regardless of its
    /// position. Non-overlapping operands yield a zero-sized area.
    pub fn intersect(&self, other: &Area) -> Area {
        if self.is_empty() {
            return *self;
        }
        if other.is_empty() {
            return *other;
        }

        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= x || bottom <= y {
            Area::new(x, y, 0, 0)
        } else {
            Area::new(x, y, span(x, right), span(y, bottom))
        }
    }
}

/// Distance from `start` to `end`, for `start <= end`.
#[inline]
fn span(start: i64, end: i64) -> u64 {
    end.abs_diff(start)
}
