#![forbid(unsafe_code)]

//! Compile widget trees bound to live state into re-executable templates.
//!
//! A view is described once as a tree of [`Widget`]s whose leaves are bound
//! to static values, shared [`Live`] state, or fields of ForEach elements.
//! [`compile`] turns the tree into a [`Template`]: a flat instruction array
//! plus nested element templates. Each frame, [`Template::execute`] re-reads
//! every bound value and collection length, lays the instructions out and
//! draws them into a [`CellBuffer`](weft_render::buffer::CellBuffer).
//!
//! ```
//! use weft_template::prelude::*;
//! use weft_render::buffer::CellBuffer;
//!
//! struct Job {
//!     name: String,
//!     done: f64,
//! }
//!
//! let jobs = Live::new(vec![Job { name: "build".into(), done: 0.5 }]);
//! let mut template = compile(ForEach::new(&jobs, |job: &Elem<Job>| {
//!     row([
//!         Widget::from(Text::new(job.text(|j: &Job| j.name.as_str())).width(6)),
//!         Progress::new(job.ratio(|j: &Job| j.done)).width(4).into(),
//!     ])
//! }))
//! .unwrap();
//!
//! let mut buf = CellBuffer::new(10, 2);
//! template.execute(&mut buf, 10, 2);
//! assert_eq!(buf.row_text(0), "build ██░░");
//!
//! jobs.update(|v| v.push(Job { name: "test".into(), done: 1.0 }));
//! template.execute(&mut buf, 10, 2);
//! assert_eq!(buf.row_text(1), "test  ████");
//! ```

pub mod bind;
pub mod error;
pub mod options;
pub mod template;
pub mod widget;

mod analyze;
mod compile;
mod execute;
mod layout;
mod optimize;

pub use bind::{Bind, Elem, Live, ValueKind};
pub use compile::{Compiler, compile};
pub use error::CompileError;
pub use execute::DrawScope;
pub use options::{CompileOptions, ProgressGlyphs};
pub use template::{FrameStats, Template};
pub use weft_layout::{Axis, Sizing};
pub use widget::{Container, Custom, ForEach, Progress, Text, Widget, col, row};

pub mod prelude {
    pub use crate::{
        Axis, Compiler, CompileOptions, Container, Custom, DrawScope, Elem, ForEach, Live,
        Progress, Sizing, Template, Text, Widget, col, compile, row,
    };
}
