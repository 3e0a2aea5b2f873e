#![forbid(unsafe_code)]

//! weft public facade crate.
//!
//! Re-exports the types needed to describe a view, compile it into a
//! [`Template`], draw it into a [`CellBuffer`] and flush the changes to a
//! [`CellSink`].

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use weft_core::geometry::{Rect, Sides, Size};

// --- Render re-exports -----------------------------------------------------

pub use weft_render::buffer::CellBuffer;
pub use weft_render::cell::{Cell, PackedRgba, Style};
pub use weft_render::diff::{ChangeRun, DirtyRuns};
pub use weft_render::flush::{CellSink, FlushStats, Flusher};
pub use weft_render::headless::HeadlessSink;

// --- Template re-exports ---------------------------------------------------

pub use weft_template::{
    Axis, Bind, CompileError, CompileOptions, Compiler, Container, Custom, DrawScope, Elem,
    ForEach, FrameStats, Live, Progress, ProgressGlyphs, Sizing, Template, Text, ValueKind,
    Widget, col, compile, row,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for weft apps.
#[derive(Debug)]
pub enum Error {
    /// The widget tree could not be compiled.
    Compile(CompileError),
    /// I/O failure while flushing to a sink.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Compile(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for weft APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Axis, CellBuffer, CellSink, CompileOptions, Compiler, Container, Custom, DrawScope, Elem,
        Error, Flusher, ForEach, Live, Progress, Rect, Result, Size, Sizing, Template, Text,
        Widget, col, compile, row,
    };

    pub use crate::{core, layout, render, template};
}

pub use weft_core as core;
pub use weft_layout as layout;
pub use weft_render as render;
pub use weft_template as template;
