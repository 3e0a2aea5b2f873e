#![forbid(unsafe_code)]

//! Layout primitives: axes, sizing rules, and main-axis distribution.
//!
//! Containers lay children out along one [`Axis`]. Each child carries a
//! [`Sizing`] rule; [`distribute`] turns the rules plus the children's
//! natural sizes into concrete main-axis lengths.
//!
//! # Rounding
//!
//! Distribution is integer-only and always floors. Leftover cells go to the
//! last `Grow` child, or to the last `Percent` child when there is no `Grow`
//! child and the percentages cover the whole space. Percent children are
//! capped in order so together they never claim more than the flexible
//! space. The same inputs therefore always produce the same lengths, with no
//! one-cell drift between frames.
//!
//! # Example
//!
//! ```
//! use weft_layout::{Item, Sizing, distribute};
//!
//! let items = [
//!     Item::new(Sizing::Fixed(10), 0),
//!     Item::new(Sizing::Grow(1), 0),
//!     Item::new(Sizing::Grow(1), 0),
//! ];
//! let lengths = distribute(31, 0, &items);
//! assert_eq!(lengths.as_slice(), &[10, 10, 11]);
//! ```

pub use weft_core::geometry::{Rect, Sides, Size};

use smallvec::SmallVec;

/// Lengths produced by [`distribute`], one per item.
pub type Lengths = SmallVec<[u16; 16]>;

/// The direction children are laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    /// Top to bottom (a column).
    #[default]
    Vertical,
    /// Left to right (a row).
    Horizontal,
}

impl Axis {
    /// Extent of `size` along this axis.
    #[inline]
    pub const fn main(self, size: Size) -> u16 {
        match self {
            Axis::Vertical => size.height,
            Axis::Horizontal => size.width,
        }
    }

    /// Extent of `size` across this axis.
    #[inline]
    pub const fn cross(self, size: Size) -> u16 {
        match self {
            Axis::Vertical => size.width,
            Axis::Horizontal => size.height,
        }
    }

    /// Build a size from main and cross extents.
    #[inline]
    pub const fn size(self, main: u16, cross: u16) -> Size {
        match self {
            Axis::Vertical => Size::new(cross, main),
            Axis::Horizontal => Size::new(main, cross),
        }
    }

    /// The other axis.
    #[inline]
    pub const fn perpendicular(self) -> Self {
        match self {
            Axis::Vertical => Axis::Horizontal,
            Axis::Horizontal => Axis::Vertical,
        }
    }

    /// Convert a (main, cross) offset into (dx, dy).
    #[inline]
    pub const fn offset(self, main: u16, cross: u16) -> (u16, u16) {
        match self {
            Axis::Vertical => (cross, main),
            Axis::Horizontal => (main, cross),
        }
    }

    /// Padding consumed along this axis.
    #[inline]
    pub const fn main_padding(self, sides: Sides) -> u16 {
        match self {
            Axis::Vertical => sides.vertical_sum(),
            Axis::Horizontal => sides.horizontal_sum(),
        }
    }

    /// Padding consumed across this axis.
    #[inline]
    pub const fn cross_padding(self, sides: Sides) -> u16 {
        match self {
            Axis::Vertical => sides.horizontal_sum(),
            Axis::Horizontal => sides.vertical_sum(),
        }
    }
}

/// How a child claims space along its parent's main axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sizing {
    /// Use the child's natural size.
    #[default]
    Auto,
    /// Exactly this many cells.
    Fixed(u16),
    /// A percentage (0..=100) of the flexible space.
    Percent(u16),
    /// A weighted share of whatever is left after everything else.
    Grow(u16),
}

impl Sizing {
    /// `Percent` and `Grow` depend on the parent's available space.
    #[inline]
    pub const fn is_flexible(self) -> bool {
        matches!(self, Sizing::Percent(_) | Sizing::Grow(_))
    }
}

/// One child as seen by [`distribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Item {
    pub sizing: Sizing,
    /// Natural main-axis size, used by `Auto`.
    pub natural: u16,
}

impl Item {
    #[inline]
    pub const fn new(sizing: Sizing, natural: u16) -> Self {
        Self { sizing, natural }
    }
}

/// Total gap cells between `count` children.
#[inline]
pub const fn total_gap(count: usize, gap: u16) -> u16 {
    if count < 2 {
        0
    } else {
        let n = if count - 1 > u16::MAX as usize {
            u16::MAX
        } else {
            (count - 1) as u16
        };
        gap.saturating_mul(n)
    }
}

/// Split `available` main-axis cells among `items`, with `gap` cells between
/// consecutive items.
pub fn distribute(available: u16, gap: u16, items: &[Item]) -> Lengths {
    let mut out = Lengths::new();
    distribute_into(available, gap, items, &mut out);
    out
}

/// Like [`distribute`], writing into a caller-owned buffer.
pub fn distribute_into(available: u16, gap: u16, items: &[Item], out: &mut Lengths) {
    out.clear();

    let mut rigid: u32 = 0;
    let mut percent_total: u32 = 0;
    let mut grow_weight: u32 = 0;
    let mut last_grow = None;
    let mut last_percent = None;

    for (i, item) in items.iter().enumerate() {
        match item.sizing {
            Sizing::Auto => rigid += u32::from(item.natural),
            Sizing::Fixed(n) => rigid += u32::from(n),
            Sizing::Percent(p) => {
                percent_total += u32::from(p.min(100));
                last_percent = Some(i);
            }
            Sizing::Grow(w) => {
                grow_weight += u32::from(w);
                last_grow = Some(i);
            }
        }
    }

    let space = u32::from(available)
        .saturating_sub(u32::from(total_gap(items.len(), gap)))
        .saturating_sub(rigid);

    let mut claimed: u32 = 0;
    for item in items {
        let len = match item.sizing {
            Sizing::Auto => item.natural,
            Sizing::Fixed(n) => n,
            Sizing::Percent(p) => {
                let len = (space * u32::from(p.min(100)) / 100).min(space - claimed);
                claimed += len;
                len as u16
            }
            Sizing::Grow(_) => 0,
        };
        out.push(len);
    }

    let rest = space.saturating_sub(claimed);
    if let Some(last) = last_grow {
        let mut handed_out: u32 = 0;
        for (i, item) in items.iter().enumerate() {
            if let Sizing::Grow(w) = item.sizing
                && grow_weight > 0
            {
                let len = rest * u32::from(w) / grow_weight;
                out[i] = len as u16;
                handed_out += len;
            }
        }
        out[last] = out[last].saturating_add((rest - handed_out) as u16);
    } else if let Some(last) = last_percent
        && percent_total >= 100
    {
        out[last] = out[last].saturating_add(rest as u16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(available: u16, gap: u16, items: &[Item]) -> Vec<u16> {
        distribute(available, gap, items).to_vec()
    }

    #[test]
    fn auto_and_fixed_keep_their_size() {
        let items = [Item::new(Sizing::Auto, 3), Item::new(Sizing::Fixed(5), 99)];
        assert_eq!(lengths(100, 1, &items), vec![3, 5]);
    }

    #[test]
    fn percents_over_one_hundred_are_capped() {
        let items = [Item::new(Sizing::Percent(19), 0), Item::new(Sizing::Percent(88), 0)];
        assert_eq!(lengths(16, 0, &items), vec![3, 13]);

        let items = [
            Item::new(Sizing::Percent(80), 0),
            Item::new(Sizing::Percent(80), 0),
            Item::new(Sizing::Grow(1), 0),
        ];
        assert_eq!(lengths(10, 0, &items), vec![8, 2, 0]);
    }

    #[test]
    fn percent_floors_and_last_absorbs_remainder() {
        let items = [
            Item::new(Sizing::Percent(33), 0),
            Item::new(Sizing::Percent(33), 0),
            Item::new(Sizing::Percent(34), 0),
        ];
        assert_eq!(lengths(10, 0, &items), vec![3, 3, 4]);
    }

    #[test]
    fn partial_percent_leaves_space() {
        let items = [Item::new(Sizing::Percent(50), 0)];
        assert_eq!(lengths(9, 0, &items), vec![4]);
    }

    #[test]
    fn grow_shares_by_weight() {
        let items = [
            Item::new(Sizing::Grow(1), 0),
            Item::new(Sizing::Grow(2), 0),
        ];
        assert_eq!(lengths(10, 0, &items), vec![3, 7]);
    }

    #[test]
    fn grow_takes_leftover_after_percent() {
        let items = [
            Item::new(Sizing::Percent(50), 0),
            Item::new(Sizing::Grow(1), 0),
            Item::new(Sizing::Fixed(2), 0),
        ];
        // space = 20 - 2 gaps - 2 fixed = 16; percent = 8, grow = 8.
        assert_eq!(lengths(20, 1, &items), vec![8, 8, 2]);
    }

    #[test]
    fn zero_weight_grow_still_receives_remainder() {
        let items = [Item::new(Sizing::Grow(0), 0), Item::new(Sizing::Grow(0), 0)];
        assert_eq!(lengths(6, 0, &items), vec![0, 6]);
    }

    #[test]
    fn overfull_rigid_children_leave_nothing_flexible() {
        let items = [Item::new(Sizing::Fixed(30), 0), Item::new(Sizing::Grow(1), 0)];
        assert_eq!(lengths(10, 0, &items), vec![30, 0]);
    }

    #[test]
    fn total_gap_counts_between_items() {
        assert_eq!(total_gap(0, 3), 0);
        assert_eq!(total_gap(1, 3), 0);
        assert_eq!(total_gap(4, 3), 9);
        assert_eq!(total_gap(100_000, 2), u16::MAX);
    }

    #[test]
    fn axis_helpers() {
        let size = Size::new(7, 3);
        assert_eq!(Axis::Horizontal.main(size), 7);
        assert_eq!(Axis::Vertical.main(size), 3);
        assert_eq!(Axis::Vertical.cross(size), 7);
        assert_eq!(Axis::Horizontal.size(4, 2), Size::new(4, 2));
        assert_eq!(Axis::Vertical.size(4, 2), Size::new(2, 4));
        assert_eq!(Axis::Vertical.offset(5, 1), (1, 5));
        assert_eq!(Axis::Vertical.perpendicular(), Axis::Horizontal);
        let pad = Sides::new(1, 2, 3, 4);
        assert_eq!(Axis::Horizontal.main_padding(pad), 6);
        assert_eq!(Axis::Horizontal.cross_padding(pad), 4);
    }
}
