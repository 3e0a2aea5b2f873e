#![forbid(unsafe_code)]

//! Widget descriptor DSL.
//!
//! Application code describes a view as a tree of [`Widget`]s. The tree is
//! consumed by [`Compiler::compile`](crate::Compiler::compile) and can be
//! dropped afterwards.
//!
//! ```
//! use weft_template::prelude::*;
//!
//! let jobs = Live::new(vec![0.25_f64, 0.5]);
//! let tree = col([
//!     Widget::from(Text::new("Jobs")),
//!     ForEach::new(&jobs, |job: &Elem<f64>| Progress::new(job.ratio(|r| *r)).width(10)).into(),
//! ]);
//! let template = compile(tree).unwrap();
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use weft_core::geometry::{Rect, Sides, Size};
use weft_layout::{Axis, Sizing};
use weft_render::buffer::CellBuffer;
use weft_render::cell::Style;

use crate::bind::{Bind, Elem, FieldSource, PlaceholderId};
use crate::execute::DrawScope;

/// Measure callback of a [`Custom`] widget: available size in, natural size out.
pub type MeasureFn = dyn Fn(Size) -> Size + Send + Sync;

/// Draw callback of a [`Custom`] widget.
pub type DrawFn = dyn Fn(&mut CellBuffer, Rect, &DrawScope<'_>) + Send + Sync;

/// A node of the descriptor tree.
pub struct Widget {
    pub(crate) node: Node,
    pub(crate) sizing: Sizing,
}

impl Widget {
    /// Set how this widget claims space along its parent's main axis.
    #[must_use]
    pub fn sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = sizing;
        self
    }

    fn new(node: Node) -> Self {
        Self {
            node,
            sizing: Sizing::Auto,
        }
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Widget");
        s.field("kind", &self.node.name()).field("sizing", &self.sizing);
        if let Node::Container(c) = &self.node {
            s.field("children", &c.children);
        }
        s.finish()
    }
}

pub(crate) enum Node {
    Text(Text),
    Progress(Progress),
    Container(Container),
    ForEach(ForEach),
    Custom(Custom),
}

impl Node {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Progress(_) => "progress",
            Node::Container(c) => match c.axis {
                Axis::Horizontal => "row",
                Axis::Vertical => "col",
            },
            Node::ForEach(_) => "for_each",
            Node::Custom(_) => "custom",
        }
    }
}

// ============================================================================
// Leaves
// ============================================================================

/// A single line of text.
pub struct Text {
    pub(crate) content: Bind,
    pub(crate) width: Option<u16>,
    pub(crate) style: Style,
}

impl Text {
    pub fn new(content: impl Into<Bind>) -> Self {
        Self {
            content: content.into(),
            width: None,
            style: Style::new(),
        }
    }

    /// Fixed width in cells instead of the content's width.
    #[must_use]
    pub fn width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

/// A horizontal bar filled in proportion to a ratio in `[0, 1]`.
pub struct Progress {
    pub(crate) value: Bind,
    pub(crate) width: Option<u16>,
    pub(crate) style: Style,
}

impl Progress {
    pub fn new(value: impl Into<Bind>) -> Self {
        Self {
            value: value.into(),
            width: None,
            style: Style::new(),
        }
    }

    /// Bar width in cells. Defaults to the compile option.
    #[must_use]
    pub fn width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

// ============================================================================
// Containers
// ============================================================================

/// Children laid out along one axis: a row or a column.
pub struct Container {
    pub(crate) axis: Axis,
    pub(crate) gap: u16,
    pub(crate) padding: Sides,
    pub(crate) children: Vec<Widget>,
}

impl Container {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            gap: 0,
            padding: Sides::ZERO,
            children: Vec::new(),
        }
    }

    /// Cells between consecutive children.
    #[must_use]
    pub fn gap(mut self, gap: u16) -> Self {
        self.gap = gap;
        self
    }

    #[must_use]
    pub fn padding(mut self, padding: impl Into<Sides>) -> Self {
        self.padding = padding.into();
        self
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<Widget>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Widget>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

/// A left-to-right container.
pub fn row<I>(children: I) -> Container
where
    I: IntoIterator,
    I::Item: Into<Widget>,
{
    Container::new(Axis::Horizontal).children(children)
}

/// A top-to-bottom container.
pub fn col<I>(children: I) -> Container
where
    I: IntoIterator,
    I::Item: Into<Widget>,
{
    Container::new(Axis::Vertical).children(children)
}

// ============================================================================
// ForEach
// ============================================================================

/// One sub-widget per element of a collection.
///
/// The builder runs exactly once, at compile time, with a placeholder
/// [`Elem`]. Values it reads through the placeholder are re-read from each
/// live element every frame.
pub struct ForEach {
    pub(crate) source: Bind,
    pub(crate) axis: Option<Axis>,
    pub(crate) gap: u16,
    pub(crate) builder: Box<dyn ElementBuilder>,
}

impl ForEach {
    pub fn new<T, W, F>(source: impl Into<Bind>, builder: F) -> Self
    where
        T: Any + Send + Sync,
        W: Into<Widget>,
        F: FnOnce(&Elem<T>) -> W + 'static,
    {
        Self {
            source: source.into(),
            axis: None,
            gap: 0,
            builder: Box::new(Builder {
                build: builder,
                _elem: PhantomData,
            }),
        }
    }

    /// Layout axis. Defaults to the enclosing container's axis.
    #[must_use]
    pub fn axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Cells between consecutive elements.
    #[must_use]
    pub fn gap(mut self, gap: u16) -> Self {
        self.gap = gap;
        self
    }
}

/// Type-erased ForEach builder.
pub(crate) trait ElementBuilder {
    fn element_type(&self) -> TypeId;

    fn element_type_name(&self) -> &'static str;

    fn element_size(&self) -> usize;

    /// Run the builder against a placeholder; returns the element's widget
    /// and the fields it registered.
    fn build(self: Box<Self>, id: PlaceholderId) -> (Widget, Vec<Arc<dyn FieldSource>>);
}

struct Builder<T, F> {
    build: F,
    _elem: PhantomData<fn(&T)>,
}

impl<T, W, F> ElementBuilder for Builder<T, F>
where
    T: Any + Send + Sync,
    W: Into<Widget>,
    F: FnOnce(&Elem<T>) -> W,
{
    fn element_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn element_size(&self) -> usize {
        size_of::<T>()
    }

    fn build(self: Box<Self>, id: PlaceholderId) -> (Widget, Vec<Arc<dyn FieldSource>>) {
        let elem = Elem::new(id);
        let widget = (self.build)(&elem).into();
        (widget, elem.into_fields())
    }
}

// ============================================================================
// Custom
// ============================================================================

/// Caller-supplied measure and draw callbacks.
#[derive(Default)]
pub struct Custom {
    pub(crate) measure: Option<Arc<MeasureFn>>,
    pub(crate) draw: Option<Arc<DrawFn>>,
}

impl Custom {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn measure(mut self, measure: impl Fn(Size) -> Size + Send + Sync + 'static) -> Self {
        self.measure = Some(Arc::new(measure));
        self
    }

    #[must_use]
    pub fn draw(
        mut self,
        draw: impl Fn(&mut CellBuffer, Rect, &DrawScope<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.draw = Some(Arc::new(draw));
        self
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Text> for Widget {
    fn from(value: Text) -> Self {
        Widget::new(Node::Text(value))
    }
}

impl From<Progress> for Widget {
    fn from(value: Progress) -> Self {
        Widget::new(Node::Progress(value))
    }
}

impl From<Container> for Widget {
    fn from(value: Container) -> Self {
        Widget::new(Node::Container(value))
    }
}

impl From<ForEach> for Widget {
    fn from(value: ForEach) -> Self {
        Widget::new(Node::ForEach(value))
    }
}

impl From<Custom> for Widget {
    fn from(value: Custom) -> Self {
        Widget::new(Node::Custom(value))
    }
}

impl From<&str> for Widget {
    fn from(value: &str) -> Self {
        Text::new(value).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_collect_children() {
        let tree = row(["a", "b"]).gap(2).padding(1).child(Progress::new(0.5));
        assert_eq!(tree.children.len(), 3);
        assert_eq!(tree.gap, 2);
        assert_eq!(tree.padding, Sides::all(1));
        assert_eq!(tree.axis, Axis::Horizontal);
        assert_eq!(col(Vec::<Widget>::new()).axis, Axis::Vertical);
    }

    #[test]
    fn builder_reports_element_type() {
        let each = ForEach::new(vec![1u32, 2], |el: &Elem<u32>| Text::new(el.index()));
        assert_eq!(each.builder.element_type(), TypeId::of::<u32>());
        assert_eq!(each.builder.element_size(), 4);
        let (widget, fields) = each.builder.build(PlaceholderId(3));
        assert!(matches!(widget.node, Node::Text(_)));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn widget_debug_names_nodes() {
        let w: Widget = col(["x"]).into();
        let dbg = format!("{:?}", w.sizing(Sizing::Grow(1)));
        assert!(dbg.contains("col"));
        assert!(dbg.contains("Grow"));
    }
}
