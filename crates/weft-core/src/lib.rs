#![forbid(unsafe_code)]

//! Core: geometry shared by every weft crate, plus the logging facade.

pub mod geometry;
pub mod logging;

#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace};
