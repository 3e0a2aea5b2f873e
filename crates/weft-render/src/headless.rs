#![forbid(unsafe_code)]

//! In-memory sink for tests.
//!
//! `HeadlessSink` applies flushed runs to its own grid, standing in for a
//! terminal. Tests flush a buffer into it and then assert on the visible
//! text, which also checks that dirty tracking sent every changed cell.

use std::io;

use crate::buffer::CellBuffer;
use crate::cell::Cell;
use crate::flush::CellSink;

/// A screen that only exists in memory.
#[derive(Debug, Clone)]
pub struct HeadlessSink {
    screen: CellBuffer,
    frames: usize,
    runs_written: usize,
    cells_written: usize,
}

impl HeadlessSink {
    /// Create a blank screen of the given size.
    pub fn new(width: u16, height: u16) -> Self {
        let mut screen = CellBuffer::new(width, height);
        screen.clear_dirty();
        Self {
            screen,
            frames: 0,
            runs_written: 0,
            cells_written: 0,
        }
    }

    /// The current screen contents.
    pub fn screen(&self) -> &CellBuffer {
        &self.screen
    }

    /// Completed frames.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Runs received across all frames.
    pub fn runs_written(&self) -> usize {
        self.runs_written
    }

    /// Cells received across all frames.
    pub fn cells_written(&self) -> usize {
        self.cells_written
    }

    /// Visible text of row `y`, trailing blanks trimmed.
    pub fn row_text(&self, y: u16) -> String {
        self.screen.row_text(y)
    }

    /// Visible text of every row.
    pub fn screen_text(&self) -> Vec<String> {
        (0..self.screen.height()).map(|y| self.row_text(y)).collect()
    }

    /// Assert that row `y` reads `expected`.
    ///
    /// # Panics
    ///
    /// Panics with the full screen dump when the row differs.
    #[track_caller]
    pub fn assert_row(&self, y: u16, expected: &str) {
        let actual = self.row_text(y);
        if actual != expected {
            panic!(
                "row {y} mismatch\n  expected: {expected:?}\n  actual:   {actual:?}\nscreen:\n{}",
                self.screen_text().join("\n")
            );
        }
    }
}

impl CellSink for HeadlessSink {
    fn begin_frame(&mut self, width: u16, height: u16) -> io::Result<()> {
        if self.screen.width() != width || self.screen.height() != height {
            self.screen.resize(width, height);
        }
        Ok(())
    }

    fn write_run(&mut self, x: u16, y: u16, cells: &[Cell]) -> io::Result<()> {
        for (i, cell) in cells.iter().enumerate() {
            let cx = x as usize + i;
            if cx >= self.screen.width() as usize {
                break;
            }
            if !cell.is_continuation() {
                self.screen.set(cx as u16, y, *cell);
            }
        }
        self.runs_written += 1;
        self.cells_written += cells.len();
        Ok(())
    }

    fn end_frame(&mut self) -> io::Result<()> {
        self.screen.clear_dirty();
        self.frames += 1;
        Ok(())
    }
}
