#![forbid(unsafe_code)]

//! Compile-time errors.
//!
//! Every variant is a programming error in the widget tree. Nothing here is
//! produced at render time: once a template compiles, layout and draw are
//! total.

use std::fmt;

use crate::bind::ValueKind;

/// Why a widget tree failed to compile.
///
/// `path` locates the offending node, e.g. `root/col[1]/for_each`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A ForEach source is not a collection.
    NotACollection { path: String, found: &'static str },
    /// A leaf was bound to a collection instead of a value.
    ExpectedValue { path: String },
    /// A leaf was bound to a value of the wrong kind.
    KindMismatch {
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },
    /// A Custom widget is missing a callback.
    MissingCallback {
        path: String,
        callback: &'static str,
    },
    /// The collection's element type differs from the builder's.
    ElementTypeMismatch {
        path: String,
        collection: &'static str,
        builder: &'static str,
    },
    /// A field of an enclosing element was used inside an inner element.
    ForeignElementField { path: String },
    /// A field reference whose placeholder is not an active ForEach element.
    DetachedElementField { path: String },
}

impl CompileError {
    /// Path of the node that failed.
    pub fn path(&self) -> &str {
        match self {
            Self::NotACollection { path, .. }
            | Self::ExpectedValue { path }
            | Self::KindMismatch { path, .. }
            | Self::MissingCallback { path, .. }
            | Self::ElementTypeMismatch { path, .. }
            | Self::ForeignElementField { path }
            | Self::DetachedElementField { path } => path,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotACollection { path, found } => {
                write!(f, "{path}: ForEach source must be a collection, found {found}")
            }
            Self::ExpectedValue { path } => {
                write!(f, "{path}: expected a value, found a collection")
            }
            Self::KindMismatch {
                path,
                expected,
                found,
            } => write!(f, "{path}: expected a {expected} value, found {found}"),
            Self::MissingCallback { path, callback } => {
                write!(f, "{path}: custom widget has no {callback} callback")
            }
            Self::ElementTypeMismatch {
                path,
                collection,
                builder,
            } => write!(
                f,
                "{path}: collection holds `{collection}` but the builder expects `{builder}`"
            ),
            Self::ForeignElementField { path } => write!(
                f,
                "{path}: field of an enclosing element used inside a nested ForEach"
            ),
            Self::DetachedElementField { path } => {
                write!(f, "{path}: element field used outside its ForEach builder")
            }
        }
    }
}

impl std::error::Error for CompileError {}
