#![forbid(unsafe_code)]

//! Compile configuration.

use weft_layout::Axis;

/// Characters used to paint progress bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressGlyphs {
    pub filled: char,
    pub empty: char,
}

impl Default for ProgressGlyphs {
    fn default() -> Self {
        Self {
            filled: '█',
            empty: '░',
        }
    }
}

/// Options for a [`Compiler`](crate::Compiler) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Attach specialized loops for recognized ForEach shapes.
    ///
    /// Disabling this runs every element through the generic instruction
    /// walk, with per-element layout. Output is identical either way.
    pub optimize_patterns: bool,
    /// Width of a Progress leaf that does not set one.
    pub progress_width: u16,
    pub progress_glyphs: ProgressGlyphs,
    /// Axis of a root-level ForEach that does not set one.
    pub default_axis: Axis,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize_patterns: true,
            progress_width: 20,
            progress_glyphs: ProgressGlyphs::default(),
            default_axis: Axis::Vertical,
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn optimize_patterns(mut self, enabled: bool) -> Self {
        self.optimize_patterns = enabled;
        self
    }

    #[must_use]
    pub fn progress_width(mut self, width: u16) -> Self {
        self.progress_width = width;
        self
    }

    #[must_use]
    pub fn progress_glyphs(mut self, filled: char, empty: char) -> Self {
        self.progress_glyphs = ProgressGlyphs { filled, empty };
        self
    }

    #[must_use]
    pub fn default_axis(mut self, axis: Axis) -> Self {
        self.default_axis = axis;
        self
    }
}
