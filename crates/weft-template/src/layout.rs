#![forbid(unsafe_code)]

//! Three-pass layout over a flat instruction array.
//!
//! 1. **update**: record the space available to every instruction and read
//!    each ForEach's current length.
//! 2. **measure**: compute natural sizes bottom-up.
//! 3. **position**: assign rectangles top-down, relative to the array's
//!    origin.
//!
//! Every pass walks the array once. A `Start` jumps straight past its `End`
//! when it returns, so siblings are visited in order without a tree.
//! ForEach elements are not positioned here; draw places them as it visits
//! them.

use std::ops::{ControlFlow, Range};

use smallvec::SmallVec;
use weft_core::geometry::{Rect, Sides, Size};
use weft_layout::{Axis, Item, Lengths, Sizing, distribute_into, total_gap};
use weft_render::display_width;

use crate::compile::{ForEachOp, Instruction, Op, StartOp, TextOp};
use crate::execute::DrawScope;

/// The window of root-level ForEach elements to lay out and draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Viewport {
    pub offset: usize,
    /// Zero shows every element.
    pub height: usize,
}

impl Viewport {
    pub const NONE: Self = Self {
        offset: 0,
        height: 0,
    };

    /// Visible index range of a collection of `len` elements.
    pub fn window(self, len: usize) -> Range<usize> {
        if self.height == 0 {
            return 0..len;
        }
        let start = self.offset.min(len);
        start..self.offset.saturating_add(self.height).min(len)
    }
}

/// Lay out `instrs` within `avail`. Returns the natural size of the root.
pub(crate) fn layout(
    instrs: &mut [Instruction],
    avail: Size,
    scope: DrawScope<'_>,
    viewport: Viewport,
    scratch: &mut String,
) -> Size {
    if instrs.is_empty() {
        return Size::ZERO;
    }
    let mut i = 0;
    while i < instrs.len() {
        i = update(instrs, i, avail, scope, viewport);
    }
    let mut i = 0;
    while i < instrs.len() {
        i = measure(instrs, i, scope, scratch);
    }
    let natural = instrs[0].geom.natural;
    position(instrs, 0, Rect::at(0, 0, natural));
    natural
}

// ============================================================================
// update
// ============================================================================

fn update(
    instrs: &mut [Instruction],
    i: usize,
    avail: Size,
    scope: DrawScope<'_>,
    viewport: Viewport,
) -> usize {
    instrs[i].geom.avail = avail;
    match &mut instrs[i].op {
        Op::Start(start) => {
            let inner = shrink(avail, start.padding);
            let end = start.end;
            let mut j = i + 1;
            while j < end {
                j = update(instrs, j, inner, scope, viewport);
            }
            end + 1
        }
        Op::ForEach(each) => {
            each.len = each.source.len(&scope);
            each.visible = viewport.window(each.len);
            i + 1
        }
        _ => i + 1,
    }
}

fn shrink(size: Size, padding: Sides) -> Size {
    Size::new(
        size.width.saturating_sub(padding.horizontal_sum()),
        size.height.saturating_sub(padding.vertical_sum()),
    )
}

// ============================================================================
// measure
// ============================================================================

fn measure(
    instrs: &mut [Instruction],
    i: usize,
    scope: DrawScope<'_>,
    scratch: &mut String,
) -> usize {
    let avail = instrs[i].geom.avail;
    let (natural, next) = match &mut instrs[i].op {
        Op::Text(text) => (
            Size::new(text_width(text, &scope, scratch).min(avail.width), 1),
            i + 1,
        ),
        Op::Progress(progress) => (Size::new(progress.width.min(avail.width), 1), i + 1),
        Op::Custom(custom) => ((custom.measure)(avail), i + 1),
        Op::ForEach(each) => (measure_for_each(each, avail, scope, scratch), i + 1),
        Op::Start(start) => {
            let start = *start;
            (measure_container(instrs, i, start, avail, scope, scratch), start.end + 1)
        }
        Op::End { .. } => (Size::ZERO, i + 1),
    };
    instrs[i].geom.natural = natural;
    next
}

fn text_width(text: &TextOp, scope: &DrawScope<'_>, scratch: &mut String) -> u16 {
    if let Some(width) = text.width {
        return width;
    }
    scratch.clear();
    text.binding.read_text(scope, scratch);
    clamp_u16(display_width(first_line(scratch)) as u64)
}

/// Text up to the first newline.
#[inline]
pub(crate) fn first_line(text: &str) -> &str {
    match memchr::memchr(b'\n', text.as_bytes()) {
        Some(end) => &text[..end],
        None => text,
    }
}

fn measure_container(
    instrs: &mut [Instruction],
    i: usize,
    start: StartOp,
    avail: Size,
    scope: DrawScope<'_>,
    scratch: &mut String,
) -> Size {
    let axis = start.axis;
    let mut main: u64 = 0;
    let mut cross: u16 = 0;
    let mut count = 0usize;
    let mut flexible = false;

    let mut j = i + 1;
    while j < start.end {
        let next = measure(instrs, j, scope, scratch);
        let child = &instrs[j];
        main += match child.sizing {
            Sizing::Auto => u64::from(axis.main(child.geom.natural)),
            Sizing::Fixed(n) => u64::from(n),
            Sizing::Percent(_) | Sizing::Grow(_) => {
                flexible = true;
                0
            }
        };
        cross = cross.max(axis.cross(child.geom.natural));
        count += 1;
        j = next;
    }

    let main = if flexible {
        axis.main(avail)
    } else {
        clamp_u16(
            main + u64::from(total_gap(count, start.gap))
                + u64::from(axis.main_padding(start.padding)),
        )
    };
    axis.size(main, cross.saturating_add(axis.cross_padding(start.padding)))
}

fn measure_for_each(
    each: &mut ForEachOp,
    avail: Size,
    scope: DrawScope<'_>,
    scratch: &mut String,
) -> Size {
    let count = each.visible.len();
    if count == 0 {
        each.extent = Size::ZERO;
        return Size::ZERO;
    }
    let axis = each.axis;
    let gap = each.gap;

    if each.template.uniform {
        let extent = layout(
            &mut each.template.instructions,
            avail,
            DrawScope::root(),
            Viewport::NONE,
            scratch,
        );
        each.extent = extent;
        return stack_extent(axis, extent, count, gap);
    }

    let ForEachOp {
        source,
        template,
        visible,
        ..
    } = each;
    let mut main: u64 = 0;
    let mut cross: u16 = 0;
    let mut seen = 0usize;
    source.visit(&scope, visible.clone(), &mut |index, element| {
        let size = layout(
            &mut template.instructions,
            avail,
            DrawScope::element(element, index),
            Viewport::NONE,
            scratch,
        );
        main += u64::from(axis.main(size));
        cross = cross.max(axis.cross(size));
        seen += 1;
        ControlFlow::Continue(())
    });
    main += u64::from(total_gap(seen, gap));
    axis.size(clamp_u16(main), cross)
}

/// Size of `count` equal items stacked along `axis`.
pub(crate) fn stack_extent(axis: Axis, item: Size, count: usize, gap: u16) -> Size {
    if count == 0 {
        return Size::ZERO;
    }
    let main = u64::from(axis.main(item)) * count as u64 + u64::from(total_gap(count, gap));
    axis.size(clamp_u16(main), axis.cross(item))
}

#[inline]
pub(crate) fn clamp_u16(value: u64) -> u16 {
    value.min(u64::from(u16::MAX)) as u16
}

// ============================================================================
// position
// ============================================================================

fn position(instrs: &mut [Instruction], i: usize, rect: Rect) -> usize {
    instrs[i].geom.rect = rect;
    let start = match &instrs[i].op {
        Op::Start(start) => *start,
        _ => return i + 1,
    };

    let inner = rect.inner(start.padding);
    let axis = start.axis;

    let mut children: SmallVec<[usize; 16]> = SmallVec::with_capacity(start.child_count);
    let mut items: SmallVec<[Item; 16]> = SmallVec::with_capacity(start.child_count);
    let mut j = i + 1;
    while j < start.end {
        let child = &instrs[j];
        items.push(Item::new(child.sizing, axis.main(child.geom.natural)));
        children.push(j);
        j = match &child.op {
            Op::Start(nested) => nested.end + 1,
            _ => j + 1,
        };
    }

    let mut lengths = Lengths::new();
    distribute_into(axis.main(inner.size()), start.gap, &items, &mut lengths);

    let mut cursor: u16 = 0;
    for (&child, &len) in children.iter().zip(lengths.iter()) {
        let cross = axis.cross(instrs[child].geom.natural);
        let (dx, dy) = axis.offset(cursor, 0);
        let at = Rect::at(
            inner.x.saturating_add(dx),
            inner.y.saturating_add(dy),
            axis.size(len, cross),
        );
        position(instrs, child, at);
        cursor = cursor.saturating_add(len).saturating_add(start.gap);
    }
    start.end + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{Elem, Live};
    use crate::widget::{Container, Custom, ForEach, Progress, Text, Widget, col, row};
    use crate::{CompileOptions, Compiler};

    fn compiled(tree: impl Into<Widget>) -> Vec<Instruction> {
        Compiler::with_options(CompileOptions::default().optimize_patterns(false))
            .compile(tree)
            .unwrap()
            .into_parts()
            .0
    }

    fn run(instrs: &mut [Instruction], w: u16, h: u16) -> Size {
        layout(instrs, Size::new(w, h), DrawScope::root(), Viewport::NONE, &mut String::new())
    }

    fn rects(instrs: &[Instruction]) -> Vec<Rect> {
        instrs
            .iter()
            .filter(|i| !matches!(i.op, Op::Start(_) | Op::End { .. }))
            .map(|i| i.geom.rect)
            .collect()
    }

    #[test]
    fn viewport_window() {
        assert_eq!(Viewport::NONE.window(5), 0..5);
        let vp = Viewport { offset: 3, height: 4 };
        assert_eq!(vp.window(10), 3..7);
        assert_eq!(vp.window(5), 3..5);
        assert_eq!(vp.window(2), 2..2);
    }

    #[test]
    fn column_stacks_text() {
        let mut instrs = compiled(col(["alpha", "be", "c"]));
        let size = run(&mut instrs, 80, 24);
        assert_eq!(size, Size::new(5, 3));
        assert_eq!(
            rects(&instrs),
            vec![Rect::new(0, 0, 5, 1), Rect::new(0, 1, 2, 1), Rect::new(0, 2, 1, 1)]
        );
    }

    #[test]
    fn row_with_gap_and_padding() {
        let mut instrs = compiled(row(["ab", "cd"]).gap(1).padding(1));
        let size = run(&mut instrs, 80, 24);
        assert_eq!(size, Size::new(7, 3));
        assert_eq!(rects(&instrs), vec![Rect::new(1, 1, 2, 1), Rect::new(4, 1, 2, 1)]);
    }

    #[test]
    fn text_measures_first_line_and_clamps() {
        let mut instrs = compiled(col(["abc\ndefgh", "wide text here"]));
        run(&mut instrs, 6, 5);
        let r = rects(&instrs);
        assert_eq!(r[0].width, 3);
        assert_eq!(r[1].width, 6);
    }

    #[test]
    fn grow_fills_the_row() {
        let mut instrs = compiled(row([
            Widget::from(Text::new("L")),
            Widget::from(Progress::new(0.5).width(4)).sizing(Sizing::Grow(1)),
            Text::new("R").into(),
        ]));
        let size = run(&mut instrs, 20, 1);
        assert_eq!(size.width, 20);
        assert_eq!(
            rects(&instrs),
            vec![Rect::new(0, 0, 1, 1), Rect::new(1, 0, 18, 1), Rect::new(19, 0, 1, 1)]
        );
    }

    #[test]
    fn fixed_sizing_overrides_natural() {
        let mut instrs = compiled(col([
            Widget::from(Text::new("x")).sizing(Sizing::Fixed(3)),
            Text::new("y").into(),
        ]));
        run(&mut instrs, 10, 10);
        assert_eq!(rects(&instrs)[1], Rect::new(0, 3, 1, 1));
    }

    #[test]
    fn nested_containers_position_relative_to_parent() {
        let mut instrs = compiled(col([
            Widget::from(Text::new("head")),
            Container::new(Axis::Horizontal).gap(2).children(["a", "b"]).into(),
        ]));
        run(&mut instrs, 10, 10);
        assert_eq!(
            rects(&instrs),
            vec![Rect::new(0, 0, 4, 1), Rect::new(0, 1, 1, 1), Rect::new(3, 1, 1, 1)]
        );
    }

    #[test]
    fn for_each_reads_length_each_layout() {
        let items = Live::new(vec![String::from("a"), String::from("bb")]);
        let mut instrs = compiled(ForEach::new(&items, |el: &Elem<String>| Text::new(el.as_text())));
        assert_eq!(run(&mut instrs, 10, 10), Size::new(2, 2));
        items.update(|v| v.push(String::from("cccc")));
        assert_eq!(run(&mut instrs, 10, 10), Size::new(4, 3));
        items.set(Vec::new());
        assert_eq!(run(&mut instrs, 10, 10), Size::ZERO);
    }

    #[test]
    fn for_each_gap_counts_between_elements() {
        let items = Live::new(vec![1u8, 2, 3]);
        let mut instrs = compiled(
            ForEach::new(&items, |_: &Elem<u8>| Progress::new(0.5).width(5)).gap(1),
        );
        assert_eq!(run(&mut instrs, 10, 10), Size::new(5, 5));
    }

    #[test]
    fn viewport_limits_root_for_each() {
        let items = Live::new((0..10u32).collect::<Vec<_>>());
        let mut instrs = compiled(ForEach::new(&items, |el: &Elem<u32>| Text::new(el.index()).width(2)));
        let size = layout(
            &mut instrs,
            Size::new(10, 10),
            DrawScope::root(),
            Viewport { offset: 8, height: 5 },
            &mut String::new(),
        );
        assert_eq!(size, Size::new(2, 2));
        let Op::ForEach(each) = &instrs[0].op else { panic!() };
        assert_eq!(each.len, 10);
        assert_eq!(each.visible, 8..10);
    }

    #[test]
    fn custom_measure_sees_available_space() {
        let mut instrs = compiled(col([Custom::new()
            .measure(|avail| Size::new(avail.width / 2, 2))
            .draw(|_, _, _| {})]));
        run(&mut instrs, 30, 10);
        assert_eq!(rects(&instrs), vec![Rect::new(0, 0, 15, 2)]);
    }

    #[test]
    fn stack_extent_saturates() {
        assert_eq!(stack_extent(Axis::Vertical, Size::new(3, 1), 0, 1), Size::ZERO);
        assert_eq!(stack_extent(Axis::Vertical, Size::new(3, 2), 4, 1), Size::new(3, 11));
        assert_eq!(
            stack_extent(Axis::Horizontal, Size::new(1000, 1), 1000, 0),
            Size::new(u16::MAX, 1)
        );
    }

    #[test]
    fn first_line_stops_at_newline() {
        assert_eq!(first_line("a\nb"), "a");
        assert_eq!(first_line("plain"), "plain");
        assert_eq!(first_line("\n"), "");
    }
}
