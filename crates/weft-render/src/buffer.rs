#![forbid(unsafe_code)]

//! Cell buffer storage.
//!
//! A `CellBuffer` is a 2D grid of [`Cell`]s with a per-row dirty bitmap.
//! Templates draw into it every frame; the flush layer reads the dirty rows
//! and clears the bitmap once they have been written out.
//!
//! # Layout
//!
//! Cells are stored in row-major order: `index = y * width + x`.
//!
//! # Invariants
//!
//! 1. `cells.len() == width * height`
//! 2. A row's dirty bit is set by any write that changes one of its cells,
//!    and cleared only by [`CellBuffer::clear_dirty`] (called by flush)
//! 3. Writes outside the grid are ignored
//! 4. [`CellBuffer::resize`] reallocates and marks every row dirty

use crate::cell::Cell;
use crate::char_width;
use weft_core::geometry::Rect;

/// A 2D grid of cells with dirty-row tracking.
///
/// # Example
///
/// ```
/// use weft_render::buffer::CellBuffer;
/// use weft_render::cell::Cell;
///
/// let mut buffer = CellBuffer::new(80, 24);
/// buffer.write_str(0, 0, "Hi", 80, Cell::BLANK);
/// assert!(buffer.is_row_dirty(0));
/// assert!(!buffer.is_row_dirty(1));
/// ```
#[derive(Debug, Clone)]
pub struct CellBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    dirty: Vec<u64>,
}

impl CellBuffer {
    /// Create a new buffer with the given dimensions.
    ///
    /// All cells start blank and every row starts dirty, so the first flush
    /// paints the whole grid.
    ///
    /// # Panics
    ///
    /// Panics if width or height is 0.
    pub fn new(width: u16, height: u16) -> Self {
        assert!(width > 0, "buffer width must be > 0");
        assert!(height > 0, "buffer height must be > 0");

        let mut buffer = Self {
            width,
            height,
            cells: vec![Cell::BLANK; width as usize * height as usize],
            dirty: vec![0; dirty_words(height)],
        };
        buffer.mark_all_dirty();
        buffer
    }

    /// Buffer width in cells.
    #[inline]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Buffer height in cells.
    #[inline]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the buffer is empty (never true for a constructed buffer).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Bounding rect of the entire buffer.
    #[inline]
    pub const fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Get a reference to the cell at (x, y).
    ///
    /// Returns `None` if coordinates are out of bounds.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Get the cells for a single row as a slice.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_cells(&self, y: u16) -> &[Cell] {
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    /// Get raw access to the cell slice.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Store a cell, marking its row dirty only if the content changed.
    #[inline]
    fn put(&mut self, idx: usize, y: u16, cell: Cell) {
        if !self.cells[idx].bits_eq(&cell) {
            self.cells[idx] = cell;
            self.mark_row_dirty(y);
        }
    }

    /// Clear the remains of any wide character overlapping (x, y).
    fn cleanup_overlap(&mut self, x: u16, y: u16) {
        let Some(idx) = self.index(x, y) else { return };
        let current = self.cells[idx];

        if current.content.width() > 1 {
            // Overwriting a wide head: drop its continuation tail.
            for i in 1..current.content.width() as u16 {
                if let Some(tail) = self.index(x.saturating_add(i), y)
                    && self.cells[tail].is_continuation()
                {
                    self.put(tail, y, Cell::BLANK);
                }
            }
        } else if current.is_continuation() {
            // Overwriting a tail: blank the head that owns it.
            let mut back_x = x;
            while back_x > 0 {
                back_x -= 1;
                let head_idx = y as usize * self.width as usize + back_x as usize;
                let head = self.cells[head_idx];
                if !head.is_continuation() {
                    if back_x as usize + head.content.width() > x as usize {
                        self.put(head_idx, y, Cell::BLANK);
                        for i in back_x + 1..x {
                            let tail = y as usize * self.width as usize + i as usize;
                            self.put(tail, y, Cell::BLANK);
                        }
                    }
                    break;
                }
            }
        }
    }

    /// Set the cell at (x, y).
    ///
    /// Wide characters also claim the following column(s) with continuation
    /// cells; if they do not fit inside the buffer nothing is written.
    /// Out-of-bounds writes are ignored.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        let width = cell.content.width().max(1) as u16;
        if y >= self.height || x.saturating_add(width) > self.width {
            return;
        }

        self.cleanup_overlap(x, y);
        for i in 1..width {
            self.cleanup_overlap(x + i, y);
        }

        let idx = y as usize * self.width as usize + x as usize;
        self.put(idx, y, cell);
        for i in 1..width {
            self.put(idx + i as usize, y, Cell::CONTINUATION);
        }
    }

    /// Fill a rectangular region with the given cell.
    pub fn fill(&mut self, rect: Rect, cell: Cell) {
        let clipped = self.bounds().intersection(&rect);
        if clipped.is_empty() {
            return;
        }
        for y in clipped.y..clipped.bottom() {
            let start = y as usize * self.width as usize;
            let mut changed = false;
            for idx in start + clipped.x as usize..start + clipped.right() as usize {
                if !self.cells[idx].bits_eq(&cell) {
                    self.cells[idx] = cell;
                    changed = true;
                }
            }
            if changed {
                self.mark_row_dirty(y);
            }
        }
    }

    /// Reset every cell to blank.
    pub fn clear(&mut self) {
        self.fill(self.bounds(), Cell::BLANK);
    }

    /// Write a single line of text starting at (x, y).
    ///
    /// Characters take their fg/bg/attrs from `base`. Writing stops at the
    /// first newline, after `max_width` columns, or at the buffer edge. A wide
    /// character that would straddle the limit is not drawn. Returns the
    /// number of columns written.
    pub fn write_str(&mut self, x: u16, y: u16, text: &str, max_width: u16, base: Cell) -> u16 {
        if y >= self.height || x >= self.width {
            return 0;
        }
        let line = match memchr::memchr(b'\n', text.as_bytes()) {
            Some(end) => &text[..end],
            None => text,
        };
        let limit = x.saturating_add(max_width).min(self.width);

        let mut cx = x;
        for c in line.chars() {
            let w = char_width(c) as u16;
            if w == 0 {
                continue;
            }
            if cx.saturating_add(w) > limit {
                break;
            }
            self.set(cx, y, base.with_char(c));
            cx += w;
        }
        cx - x
    }

    /// Draw a horizontal progress bar of `width` columns at (x, y).
    ///
    /// `ratio` is clamped to `[0, 1]`; `floor(width * ratio)` columns use
    /// `filled`, the rest use `empty`. A ratio of 1 or more fills the bar.
    pub fn write_progress_bar(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        ratio: f64,
        filled: Cell,
        empty: Cell,
    ) {
        self.write_progress_bar_clipped(x, y, width, width, ratio, filled, empty);
    }

    /// Like [`CellBuffer::write_progress_bar`], drawing only the first
    /// `max_width` columns. The fill is computed from the full `width`, so a
    /// clipped bar shows the same cells as the unclipped one.
    #[allow(clippy::too_many_arguments)]
    pub fn write_progress_bar_clipped(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        max_width: u16,
        ratio: f64,
        filled: Cell,
        empty: Cell,
    ) {
        if y >= self.height || x >= self.width {
            return;
        }
        let filled_cols = filled_columns(width, ratio);
        let end = x
            .saturating_add(width.min(max_width))
            .min(self.width);
        for cx in x..end {
            let cell = if cx - x < filled_cols { filled } else { empty };
            self.set(cx, y, cell);
        }
    }

    /// Copy a `w` x `h` region of `src` at (src_x, src_y) into this buffer
    /// at (dst_x, dst_y).
    ///
    /// The region is clipped against both buffers. Rows are marked dirty only
    /// where the copied cells differ from what was there.
    #[allow(clippy::too_many_arguments)]
    pub fn blit(
        &mut self,
        src: &CellBuffer,
        src_x: u16,
        src_y: u16,
        dst_x: u16,
        dst_y: u16,
        w: u16,
        h: u16,
    ) {
        let w = w
            .min(src.width.saturating_sub(src_x))
            .min(self.width.saturating_sub(dst_x));
        let h = h
            .min(src.height.saturating_sub(src_y))
            .min(self.height.saturating_sub(dst_y));
        if w == 0 || h == 0 {
            return;
        }

        for row in 0..h {
            let sy = src_y + row;
            let dy = dst_y + row;
            let s_start = sy as usize * src.width as usize + src_x as usize;
            let d_start = dy as usize * self.width as usize + dst_x as usize;
            let source = &src.cells[s_start..s_start + w as usize];
            let target = &mut self.cells[d_start..d_start + w as usize];
            if target != source {
                target.copy_from_slice(source);
                self.mark_row_dirty(dy);
            }
        }
    }

    /// Reallocate the grid at a new size.
    ///
    /// Content is reset to blank and every row is marked dirty.
    ///
    /// # Panics
    ///
    /// Panics if width or height is 0.
    pub fn resize(&mut self, width: u16, height: u16) {
        assert!(width > 0, "buffer width must be > 0");
        assert!(height > 0, "buffer height must be > 0");

        self.width = width;
        self.height = height;
        self.cells = vec![Cell::BLANK; width as usize * height as usize];
        self.dirty = vec![0; dirty_words(height)];
        self.mark_all_dirty();
    }

    // ========== Dirty Rows ==========

    /// Mark a row as needing retransmission.
    #[inline]
    pub fn mark_row_dirty(&mut self, y: u16) {
        if y < self.height {
            self.dirty[y as usize / 64] |= 1 << (y % 64);
        }
    }

    /// Clear one row's dirty flag, e.g. after redrawing it with the content
    /// it already had.
    #[inline]
    pub fn clear_row_dirty(&mut self, y: u16) {
        if y < self.height {
            self.dirty[y as usize / 64] &= !(1 << (y % 64));
        }
    }

    /// Mark every row dirty.
    pub fn mark_all_dirty(&mut self) {
        for y in 0..self.height {
            self.mark_row_dirty(y);
        }
    }

    /// Check whether a row changed since the last flush.
    #[inline]
    pub fn is_row_dirty(&self, y: u16) -> bool {
        y < self.height && self.dirty[y as usize / 64] & (1 << (y % 64)) != 0
    }

    /// Iterate dirty row indices in ascending order.
    pub fn dirty_rows(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.height).filter(|&y| self.is_row_dirty(y))
    }

    /// Number of dirty rows.
    pub fn dirty_row_count(&self) -> usize {
        self.dirty.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clear every dirty flag. Called by flush once rows are written out.
    pub fn clear_dirty(&mut self) {
        self.dirty.fill(0);
    }

    // ========== Inspection ==========

    /// Render a row as plain text, trailing blanks trimmed.
    ///
    /// Blank cells read as spaces and continuation cells are skipped.
    pub fn row_text(&self, y: u16) -> String {
        if y >= self.height {
            return String::new();
        }
        let mut out = String::with_capacity(self.width as usize);
        for cell in self.row_cells(y) {
            if cell.is_continuation() {
                continue;
            }
            out.push(cell.content.as_char().unwrap_or(' '));
        }
        out.truncate(out.trim_end_matches(' ').len());
        out
    }

    /// Check if two buffers have identical content (dirty flags ignored).
    pub fn content_eq(&self, other: &CellBuffer) -> bool {
        self.width == other.width && self.height == other.height && self.cells == other.cells
    }
}

impl PartialEq for CellBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for CellBuffer {}

#[inline]
fn dirty_words(height: u16) -> usize {
    (height as usize).div_ceil(64)
}

/// Columns of a `width`-wide bar that are filled at `ratio`.
#[inline]
pub fn filled_columns(width: u16, ratio: f64) -> u16 {
    if ratio.is_nan() || ratio <= 0.0 {
        0
    } else if ratio >= 1.0 {
        width
    } else {
        (width as f64 * ratio).floor() as u16
    }
}

impl Default for CellBuffer {
    /// Create a 1x1 buffer (minimum size).
    fn default() -> Self {
        Self::new(1, 1)
    }
}
