#![forbid(unsafe_code)]

//! Logging facade for the render path.
//!
//! weft only logs through `debug!`, `trace!` and `debug_span!`. With the
//! `tracing` feature these are `tracing`'s own macros; without it they expand
//! to nothing, and `debug_span!` yields a [`NoopSpan`] so the
//! `let _guard = span.enter();` pattern still compiles.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, trace};

#[cfg(not(feature = "tracing"))]
mod disabled {
    /// Discards its arguments.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// Discards its arguments.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// Evaluates to a [`NoopSpan`](crate::logging::NoopSpan).
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }
}

/// What `debug_span!` returns when tracing is off.
#[cfg(not(feature = "tracing"))]
#[derive(Debug, Clone, Copy)]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    #[inline]
    pub fn enter(&self) -> NoopGuard {
        NoopGuard
    }
}

#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct NoopGuard;
