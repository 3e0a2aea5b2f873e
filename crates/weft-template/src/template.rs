#![forbid(unsafe_code)]

//! The compiled, re-executable form of a widget tree.

use std::fmt;

use weft_core::geometry::{Rect, Size};
use weft_render::buffer::CellBuffer;
use weft_render::cell::Cell;

use crate::compile::{Instruction, Op};
use crate::execute::{self, DrawScope, Frame};
use crate::layout::{self, Viewport};
use crate::optimize::ExecPlan;

/// Counters from the most recent draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of draws so far, including this one.
    pub frame: u64,
    /// Instructions dispatched by the generic walk.
    pub instructions_visited: u64,
    /// ForEach elements drawn, on any path.
    pub elements_drawn: u64,
    /// Elements drawn by a specialized loop.
    pub fast_path_elements: u64,
}

/// A compiled widget tree.
///
/// Create one with [`compile`](crate::compile) or a
/// [`Compiler`](crate::Compiler), then call [`execute`](Self::execute)
/// every frame. Collection lengths and bound values are re-read on every
/// pass; nothing needs recompiling when data changes.
///
/// # Scrolling
///
/// Setting `viewport_height` to a non-zero value restricts every ForEach in
/// the root array to elements `[viewport_offset, viewport_offset +
/// viewport_height)`, clamped to the collection. Element `viewport_offset`
/// lands where element 0 would otherwise be.
pub struct Template {
    /// First visible element of root-level ForEach instructions.
    pub viewport_offset: usize,
    /// Number of visible elements; 0 disables the viewport.
    pub viewport_height: usize,
    instructions: Vec<Instruction>,
    plan: ExecPlan,
    scratch: String,
    stats: FrameStats,
    size: Size,
    /// Area rows from before the last clear, plus whether each was dirty.
    previous: Vec<Cell>,
    previous_dirty: Vec<bool>,
}

impl Template {
    pub(crate) fn new(instructions: Vec<Instruction>, plan: ExecPlan) -> Self {
        Self {
            viewport_offset: 0,
            viewport_height: 0,
            instructions,
            plan,
            scratch: String::new(),
            stats: FrameStats::default(),
            size: Size::ZERO,
            previous: Vec::new(),
            previous_dirty: Vec::new(),
        }
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            offset: self.viewport_offset,
            height: self.viewport_height,
        }
    }

    /// Run layout for a `width` x `height` area. Returns the natural size of
    /// the content.
    pub fn layout(&mut self, width: u16, height: u16) -> Size {
        let span = weft_core::debug_span!("template_layout", width, height);
        let _guard = span.enter();

        let viewport = self.viewport();
        self.size = layout::layout(
            &mut self.instructions,
            Size::new(width, height),
            DrawScope::root(),
            viewport,
            &mut self.scratch,
        );
        weft_core::trace!(
            natural_width = self.size.width,
            natural_height = self.size.height,
            "layout done"
        );
        self.size
    }

    /// Draw the last layout into `area` of `buf` without clearing it first.
    ///
    /// Content is positioned relative to `area`'s origin and clipped to
    /// `area` and the buffer.
    pub fn draw(&mut self, buf: &mut CellBuffer, area: Rect) {
        self.stats = FrameStats {
            frame: self.stats.frame + 1,
            ..FrameStats::default()
        };
        let span = weft_core::debug_span!("template_draw", frame = self.stats.frame);
        let _guard = span.enter();

        let clip = area.intersection(&buf.bounds());
        let mut frame = Frame {
            buf,
            clip,
            scratch: &mut self.scratch,
            stats: &mut self.stats,
        };
        match &self.plan {
            ExecPlan::Grid(plan) if self.instructions.len() == 1 => {
                execute::draw_grid(&self.instructions[0], plan, area.x, area.y, &mut frame);
            }
            _ => execute::draw(
                &mut self.instructions,
                area.x,
                area.y,
                DrawScope::root(),
                &mut frame,
            ),
        }

        weft_core::trace!(
            instructions_visited = self.stats.instructions_visited,
            elements_drawn = self.stats.elements_drawn,
            fast_path_elements = self.stats.fast_path_elements,
            "draw done"
        );
    }

    /// Lay out, clear and draw the `width` x `height` area at the buffer's
    /// origin.
    pub fn execute(&mut self, buf: &mut CellBuffer, width: u16, height: u16) {
        self.execute_in(buf, Rect::from_size(width, height));
    }

    /// Lay out for `area`, clear it, and draw into it.
    ///
    /// Rows that were clean before the call and end up with the same content
    /// stay clean, so an unchanged frame leaves nothing for flush to scan.
    pub fn execute_in(&mut self, buf: &mut CellBuffer, area: Rect) {
        self.layout(area.width, area.height);
        let clip = area.intersection(&buf.bounds());
        self.snapshot(buf, clip);
        buf.fill(area, Cell::BLANK);
        self.draw(buf, area);
        self.restore_clean_rows(buf, clip);
    }

    fn snapshot(&mut self, buf: &CellBuffer, clip: Rect) {
        self.previous.clear();
        self.previous_dirty.clear();
        let (x0, x1) = (clip.x as usize, clip.right() as usize);
        for y in clip.y..clip.bottom() {
            self.previous.extend_from_slice(&buf.row_cells(y)[x0..x1]);
            self.previous_dirty.push(buf.is_row_dirty(y));
        }
    }

    fn restore_clean_rows(&self, buf: &mut CellBuffer, clip: Rect) {
        let (x0, x1) = (clip.x as usize, clip.right() as usize);
        let width = x1 - x0;
        if width == 0 {
            return;
        }
        let rows = self.previous.chunks_exact(width).zip(&self.previous_dirty);
        for (y, (before, &was_dirty)) in (clip.y..clip.bottom()).zip(rows) {
            if !was_dirty && buf.is_row_dirty(y) && buf.row_cells(y)[x0..x1] == *before {
                buf.clear_row_dirty(y);
            }
        }
    }

    /// Counters from the last draw.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Natural size from the last layout.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Instructions in the root array.
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Execution plan of the root array: `"grid"` or `"generic"`.
    pub fn plan_name(&self) -> &'static str {
        self.plan.name()
    }

    #[cfg(test)]
    pub(crate) fn into_parts(self) -> (Vec<Instruction>, ExecPlan) {
        (self.instructions, self.plan)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("viewport_offset", &self.viewport_offset)
            .field("viewport_height", &self.viewport_height)
            .field("plan", &self.plan.name())
            .field("instructions", &Listing(&self.instructions))
            .finish()
    }
}

/// Compact instruction listing for `Debug`.
struct Listing<'a>(&'a [Instruction]);

impl fmt::Debug for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for instr in self.0 {
            match &instr.op {
                Op::ForEach(each) => list.entry(&format_args!(
                    "for_each<{}; {} bytes; {} fields; {}> {:?}",
                    each.template.element_type_name,
                    each.template.element_size,
                    each.template.field_count,
                    each.template.plan.name(),
                    Listing(&each.template.instructions),
                )),
                Op::Start(start) => list.entry(&format_args!(
                    "start {:?} children={} end={}",
                    start.axis, start.child_count, start.end
                )),
                Op::Text(text) => list.entry(&format_args!("text {}", text.binding)),
                Op::Progress(progress) => list.entry(&format_args!(
                    "progress {} width={}",
                    progress.binding, progress.width
                )),
                op => list.entry(&format_args!("{}", op.name())),
            };
        }
        list.finish()
    }
}
