#![forbid(unsafe_code)]

//! Drawing a laid-out template into a cell buffer.
//!
//! The generic path walks the instruction array, recursing into element
//! templates once per visible element. Strip and grid plans replace that
//! walk with tight loops over fixed-size leaves; both call the same leaf
//! helpers as the generic path so the output is cell-for-cell identical.
//!
//! Element iteration stops at the first element whose main-axis origin lies
//! past the clip, so only on-screen elements are visited.

use std::any::Any;
use std::fmt;
use std::ops::{ControlFlow, Range};

use weft_core::geometry::{Rect, Size};
use weft_layout::Axis;
use weft_render::buffer::CellBuffer;
use weft_render::cell::Cell;

use crate::analyze::{Binding, CollectionBinding};
use crate::compile::{ForEachOp, Instruction, Op};
use crate::layout::{Viewport, layout, stack_extent};
use crate::optimize::{ExecPlan, FastLeaf, GridPlan, LeafKind};
use crate::template::FrameStats;

/// The element a draw is running against.
///
/// [`Custom`](crate::widget::Custom) draw callbacks receive one. Outside any
/// ForEach there is no element.
#[derive(Clone, Copy, Default)]
pub struct DrawScope<'a> {
    element: Option<&'a dyn Any>,
    index: usize,
}

impl<'a> DrawScope<'a> {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    pub(crate) fn element(element: &'a dyn Any, index: usize) -> Self {
        Self {
            element: Some(element),
            index,
        }
    }

    pub(crate) fn element_any(&self) -> Option<&'a dyn Any> {
        self.element
    }

    /// The current element, if there is one and it is a `T`.
    pub fn get<T: Any>(&self) -> Option<&'a T> {
        self.element.and_then(|el| el.downcast_ref::<T>())
    }

    /// Position of the current element in its collection; 0 outside any
    /// ForEach.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the draw is inside a ForEach element.
    pub fn in_element(&self) -> bool {
        self.element.is_some()
    }
}

impl fmt::Debug for DrawScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawScope")
            .field("in_element", &self.in_element())
            .field("index", &self.index)
            .finish()
    }
}

/// Per-draw state threaded through every helper.
pub(crate) struct Frame<'a> {
    pub buf: &'a mut CellBuffer,
    /// Absolute clip rectangle, already intersected with the buffer.
    pub clip: Rect,
    pub scratch: &'a mut String,
    pub stats: &'a mut FrameStats,
}

// ============================================================================
// Generic walk
// ============================================================================

/// Draw every instruction of `instrs` offset by `(ox, oy)`.
pub(crate) fn draw(
    instrs: &mut [Instruction],
    ox: u16,
    oy: u16,
    scope: DrawScope<'_>,
    frame: &mut Frame<'_>,
) {
    let mut i = 0;
    while i < instrs.len() {
        i = draw_at(instrs, i, ox, oy, scope, frame);
    }
}

fn draw_at(
    instrs: &mut [Instruction],
    i: usize,
    ox: u16,
    oy: u16,
    scope: DrawScope<'_>,
    frame: &mut Frame<'_>,
) -> usize {
    frame.stats.instructions_visited += 1;
    let rect = instrs[i].geom.rect.translate(ox, oy);
    let avail = instrs[i].geom.avail;
    match &mut instrs[i].op {
        Op::Text(text) => {
            draw_text(&text.binding, text.cell, rect.x, rect.y, rect.width, scope, frame);
            i + 1
        }
        Op::Progress(progress) => {
            draw_progress(
                &progress.binding,
                progress.filled,
                progress.empty,
                rect.x,
                rect.y,
                rect.width,
                scope,
                frame,
            );
            i + 1
        }
        Op::Custom(custom) => {
            let area = rect.intersection(&frame.clip);
            if !area.is_empty() {
                (custom.draw)(frame.buf, area, &scope);
            }
            i + 1
        }
        Op::ForEach(each) => {
            draw_for_each(each, rect, avail, scope, frame);
            i + 1
        }
        Op::Start(start) => {
            let end = start.end;
            let mut j = i + 1;
            while j < end {
                j = draw_at(instrs, j, ox, oy, scope, frame);
            }
            end + 1
        }
        Op::End { .. } => i + 1,
    }
}

fn draw_for_each(
    each: &mut ForEachOp,
    rect: Rect,
    avail: Size,
    scope: DrawScope<'_>,
    frame: &mut Frame<'_>,
) {
    if let ExecPlan::Strip(leaf) = &each.template.plan {
        draw_strip(
            &each.source,
            each.axis,
            each.gap,
            each.visible.clone(),
            leaf,
            rect,
            avail,
            scope,
            frame,
        );
        return;
    }

    let ForEachOp {
        source,
        axis,
        gap,
        template,
        visible,
        extent,
        ..
    } = each;
    let (axis, gap, extent) = (*axis, *gap, *extent);
    let uniform = template.uniform;
    let limit = main_limit(axis, frame.clip);
    let mut cursor: u16 = 0;

    source.visit(&scope, visible.clone(), &mut |index, element| {
        let (dx, dy) = axis.offset(cursor, 0);
        let (x, y) = (rect.x.saturating_add(dx), rect.y.saturating_add(dy));
        if main_coord(axis, x, y) >= limit {
            return ControlFlow::Break(());
        }
        let element_scope = DrawScope::element(element, index);
        let size = if uniform {
            extent
        } else {
            layout(
                &mut template.instructions,
                avail,
                element_scope,
                Viewport::NONE,
                frame.scratch,
            )
        };
        draw(&mut template.instructions, x, y, element_scope, frame);
        frame.stats.elements_drawn += 1;
        cursor = cursor.saturating_add(axis.main(size)).saturating_add(gap);
        ControlFlow::Continue(())
    });
}

// ============================================================================
// Specialized loops
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn draw_strip(
    source: &CollectionBinding,
    axis: Axis,
    gap: u16,
    visible: Range<usize>,
    leaf: &FastLeaf,
    rect: Rect,
    avail: Size,
    scope: DrawScope<'_>,
    frame: &mut Frame<'_>,
) {
    let width = leaf.width.min(avail.width);
    let step = axis.main(Size::new(width, 1));
    let limit = main_limit(axis, frame.clip);
    let mut cursor: u16 = 0;

    source.visit(&scope, visible, &mut |index, element| {
        let (dx, dy) = axis.offset(cursor, 0);
        let (x, y) = (rect.x.saturating_add(dx), rect.y.saturating_add(dy));
        if main_coord(axis, x, y) >= limit {
            return ControlFlow::Break(());
        }
        draw_leaf(leaf, x, y, width, DrawScope::element(element, index), frame);
        frame.stats.elements_drawn += 1;
        frame.stats.fast_path_elements += 1;
        cursor = cursor.saturating_add(step).saturating_add(gap);
        ControlFlow::Continue(())
    });
}

/// Draw a root-level grid: the root ForEach's rows, each a strip of leaves
/// over a collection nested in the row.
pub(crate) fn draw_grid(
    instr: &Instruction,
    plan: &GridPlan,
    ox: u16,
    oy: u16,
    frame: &mut Frame<'_>,
) {
    let Op::ForEach(outer) = &instr.op else {
        return;
    };
    frame.stats.instructions_visited += 1;
    let rect = instr.geom.rect.translate(ox, oy);

    let width = plan.leaf.width.min(instr.geom.avail.width);
    let leaf_size = Size::new(width, 1);
    let inner_axis = plan.inner_axis;
    let inner_step = inner_axis.main(leaf_size);
    let outer_limit = main_limit(outer.axis, frame.clip);
    let inner_limit = main_limit(inner_axis, frame.clip);
    let mut cursor: u16 = 0;

    outer.source.visit(&DrawScope::root(), outer.visible.clone(), &mut |row_index, row| {
        let (dx, dy) = outer.axis.offset(cursor, 0);
        let (rx, ry) = (rect.x.saturating_add(dx), rect.y.saturating_add(dy));
        if main_coord(outer.axis, rx, ry) >= outer_limit {
            return ControlFlow::Break(());
        }
        let row_scope = DrawScope::element(row, row_index);
        let len = plan.inner_source.len(&row_scope);

        let mut inner_cursor: u16 = 0;
        plan.inner_source.visit(&row_scope, 0..len, &mut |index, element| {
            let (dx, dy) = inner_axis.offset(inner_cursor, 0);
            let (x, y) = (rx.saturating_add(dx), ry.saturating_add(dy));
            if main_coord(inner_axis, x, y) >= inner_limit {
                return ControlFlow::Break(());
            }
            draw_leaf(&plan.leaf, x, y, width, DrawScope::element(element, index), frame);
            frame.stats.elements_drawn += 1;
            frame.stats.fast_path_elements += 1;
            inner_cursor = inner_cursor
                .saturating_add(inner_step)
                .saturating_add(plan.inner_gap);
            ControlFlow::Continue(())
        });

        frame.stats.elements_drawn += 1;
        frame.stats.fast_path_elements += 1;
        let row_size = stack_extent(inner_axis, leaf_size, len, plan.inner_gap);
        cursor = cursor
            .saturating_add(outer.axis.main(row_size))
            .saturating_add(outer.gap);
        ControlFlow::Continue(())
    });
}

// ============================================================================
// Leaves
// ============================================================================

#[inline]
fn draw_leaf(
    leaf: &FastLeaf,
    x: u16,
    y: u16,
    width: u16,
    scope: DrawScope<'_>,
    frame: &mut Frame<'_>,
) {
    match leaf.kind {
        LeafKind::Text { cell } => draw_text(&leaf.binding, cell, x, y, width, scope, frame),
        LeafKind::Progress { filled, empty } => {
            draw_progress(&leaf.binding, filled, empty, x, y, width, scope, frame);
        }
    }
}

#[inline]
fn draw_text(
    binding: &Binding,
    cell: Cell,
    x: u16,
    y: u16,
    width: u16,
    scope: DrawScope<'_>,
    frame: &mut Frame<'_>,
) {
    if width == 0 || !frame.clip.contains(x, y) {
        return;
    }
    frame.scratch.clear();
    binding.read_text(&scope, frame.scratch);
    let max = width.min(frame.clip.right() - x);
    frame.buf.write_str(x, y, frame.scratch, max, cell);
}

#[allow(clippy::too_many_arguments)]
#[inline]
fn draw_progress(
    binding: &Binding,
    filled: Cell,
    empty: Cell,
    x: u16,
    y: u16,
    width: u16,
    scope: DrawScope<'_>,
    frame: &mut Frame<'_>,
) {
    if width == 0 || !frame.clip.contains(x, y) {
        return;
    }
    let ratio = binding.read_ratio(&scope);
    let max = width.min(frame.clip.right() - x);
    frame
        .buf
        .write_progress_bar_clipped(x, y, width, max, ratio, filled, empty);
}

/// First main-axis coordinate past the clip.
#[inline]
fn main_limit(axis: Axis, clip: Rect) -> u16 {
    match axis {
        Axis::Vertical => clip.bottom(),
        Axis::Horizontal => clip.right(),
    }
}

#[inline]
fn main_coord(axis: Axis, x: u16, y: u16) -> u16 {
    match axis {
        Axis::Vertical => y,
        Axis::Horizontal => x,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_downcasts_element() {
        let value = 42u32;
        let scope = DrawScope::element(&value, 3);
        assert_eq!(scope.get::<u32>(), Some(&42));
        assert_eq!(scope.get::<u8>(), None);
        assert_eq!(scope.index(), 3);
        assert!(scope.in_element());

        let root = DrawScope::root();
        assert!(!root.in_element());
        assert_eq!(root.get::<u32>(), None);
        assert_eq!(format!("{root:?}"), "DrawScope { in_element: false, index: 0 }");
    }

    #[test]
    fn main_axis_helpers() {
        let clip = Rect::new(2, 3, 10, 5);
        assert_eq!(main_limit(Axis::Vertical, clip), 8);
        assert_eq!(main_limit(Axis::Horizontal, clip), 12);
        assert_eq!(main_coord(Axis::Vertical, 1, 9), 9);
        assert_eq!(main_coord(Axis::Horizontal, 1, 9), 1);
    }

    #[test]
    fn text_is_clipped_to_frame() {
        let mut buf = CellBuffer::new(6, 2);
        let mut scratch = String::new();
        let mut stats = FrameStats::default();
        let mut frame = Frame {
            buf: &mut buf,
            clip: Rect::new(0, 0, 4, 2),
            scratch: &mut scratch,
            stats: &mut stats,
        };
        let binding = Binding::Static(crate::bind::StaticValue::Text("abcdef\nxyz".into()));
        draw_text(&binding, Cell::BLANK, 1, 0, 10, DrawScope::root(), &mut frame);
        draw_text(&binding, Cell::BLANK, 0, 2, 10, DrawScope::root(), &mut frame);
        assert_eq!(buf.row_text(0), " abc");
        assert_eq!(buf.row_text(1), "");
    }
}
