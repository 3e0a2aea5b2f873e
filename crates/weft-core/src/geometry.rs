#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! All coordinates are terminal cells, 0-indexed from the top-left corner.
//! Arithmetic saturates at `u16::MAX` so oversized layouts clip instead of
//! wrapping.

/// A width/height pair in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    /// Zero-area size.
    pub const ZERO: Self = Self::new(0, 0);

    /// Create a new size.
    #[inline]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Check if either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, other: Size) -> Size {
        Size::new(self.width.min(other.width), self.height.min(other.height))
    }

    /// Grow both dimensions by the given sides.
    #[inline]
    pub const fn expand(self, sides: Sides) -> Size {
        Size::new(
            self.width.saturating_add(sides.horizontal_sum()),
            self.height.saturating_add(sides.vertical_sum()),
        )
    }
}

/// A rectangle for clip regions and layout bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: u16,
    /// Top edge (inclusive).
    pub y: u16,
    /// Width in cells.
    pub width: u16,
    /// Height in cells.
    pub height: u16,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(width: u16, height: u16) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Create a rectangle at `(x, y)` covering `size`.
    #[inline]
    pub const fn at(x: u16, y: u16, size: Size) -> Self {
        Self::new(x, y, size.width, size.height)
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    /// Width and height as a [`Size`].
    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Area in cells.
    #[inline]
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Move the rectangle by `(dx, dy)`, saturating at the coordinate limit.
    #[inline]
    pub const fn translate(&self, dx: u16, dy: u16) -> Rect {
        Rect::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.width,
            self.height,
        )
    }

    /// Compute the intersection with another rectangle.
    ///
    /// Returns an empty rectangle if the rectangles don't overlap.
    #[inline]
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Rect::new(x, y, right - x, bottom - y)
        } else {
            Rect::default()
        }
    }

    /// Shrink the rectangle by the given padding.
    pub fn inner(&self, padding: Sides) -> Rect {
        Rect {
            x: self.x.saturating_add(padding.left),
            y: self.y.saturating_add(padding.top),
            width: self.width.saturating_sub(padding.horizontal_sum()),
            height: self.height.saturating_sub(padding.vertical_sum()),
        }
    }
}

/// Per-side spacing (padding around container content).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sides {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Sides {
    /// No spacing.
    pub const ZERO: Self = Self::all(0);

    /// Equal spacing on every side.
    pub const fn all(val: u16) -> Self {
        Self::new(val, val, val, val)
    }

    /// Spacing on the left and right only.
    pub const fn horizontal(val: u16) -> Self {
        Self::new(0, val, 0, val)
    }

    /// Spacing on the top and bottom only.
    pub const fn vertical(val: u16) -> Self {
        Self::new(val, 0, val, 0)
    }

    /// Explicit spacing, clockwise from the top.
    pub const fn new(top: u16, right: u16, bottom: u16, left: u16) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Sum of left and right.
    #[inline]
    pub const fn horizontal_sum(&self) -> u16 {
        self.left.saturating_add(self.right)
    }

    /// Sum of top and bottom.
    #[inline]
    pub const fn vertical_sum(&self) -> u16 {
        self.top.saturating_add(self.bottom)
    }
}

impl From<u16> for Sides {
    fn from(val: u16) -> Self {
        Self::all(val)
    }
}

impl From<(u16, u16)> for Sides {
    fn from((vertical, horizontal): (u16, u16)) -> Self {
        Self::new(vertical, horizontal, vertical, horizontal)
    }
}

#[cfg(test)]
mod tests {
    use super::{Rect, Sides, Size};

    #[test]
    fn rect_contains_edges() {
        let rect = Rect::new(2, 3, 4, 5);
        assert!(rect.contains(2, 3));
        assert!(rect.contains(5, 7));
        assert!(!rect.contains(6, 3));
        assert!(!rect.contains(2, 8));
    }

    #[test]
    fn rect_intersection_overlaps() {
        let a = Rect::new(0, 0, 4, 4);
        let b = Rect::new(2, 2, 4, 4);
        assert_eq!(a.intersection(&b), Rect::new(2, 2, 2, 2));
    }

    #[test]
    fn rect_intersection_disjoint_is_empty() {
        let a = Rect::new(0, 0, 2, 2);
        let b = Rect::new(3, 3, 2, 2);
        assert_eq!(a.intersection(&b), Rect::default());

        // Sharing an edge is not an overlap (right edge is exclusive).
        let c = Rect::new(2, 0, 2, 2);
        assert!(a.intersection(&c).is_empty());
    }

    #[test]
    fn rect_inner_reduces_and_clamps() {
        let rect = Rect::new(0, 0, 10, 10);
        assert_eq!(rect.inner(Sides::new(1, 2, 3, 4)), Rect::new(4, 1, 4, 6));

        let squashed = rect.inner(Sides::all(20));
        assert_eq!(squashed.width, 0);
        assert_eq!(squashed.height, 0);
    }

    #[test]
    fn rect_translate_saturates() {
        let r = Rect::new(u16::MAX - 2, 5, 4, 4);
        let moved = r.translate(10, 1);
        assert_eq!(moved.x, u16::MAX);
        assert_eq!(moved.y, 6);
        assert_eq!(moved.size(), Size::new(4, 4));
    }

    #[test]
    fn rect_right_bottom_saturating() {
        let r = Rect::new(u16::MAX - 5, u16::MAX - 3, 100, 100);
        assert_eq!(r.right(), u16::MAX);
        assert_eq!(r.bottom(), u16::MAX);
    }

    #[test]
    fn size_expand_adds_padding() {
        let s = Size::new(3, 1).expand(Sides::new(1, 2, 1, 2));
        assert_eq!(s, Size::new(7, 3));
        assert!(Size::ZERO.is_empty());
        assert!(!s.is_empty());
    }

    #[test]
    fn sides_conversions() {
        assert_eq!(Sides::from(3), Sides::all(3));
        assert_eq!(Sides::from((1, 2)), Sides::new(1, 2, 1, 2));
        assert_eq!(Sides::horizontal(2).horizontal_sum(), 4);
        assert_eq!(Sides::vertical(4).vertical_sum(), 8);
        assert_eq!(Sides::new(u16::MAX, 0, u16::MAX, 0).vertical_sum(), u16::MAX);
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn intersection_is_contained_in_both(
                ax in 0u16..50, ay in 0u16..50, aw in 0u16..50, ah in 0u16..50,
                bx in 0u16..50, by in 0u16..50, bw in 0u16..50, bh in 0u16..50,
            ) {
                let a = Rect::new(ax, ay, aw, ah);
                let b = Rect::new(bx, by, bw, bh);
                let i = a.intersection(&b);
                prop_assert!(i.area() <= a.area());
                prop_assert!(i.area() <= b.area());
                if !i.is_empty() {
                    prop_assert!(a.contains(i.x, i.y) && b.contains(i.x, i.y));
                }
            }
        }
    }
}
