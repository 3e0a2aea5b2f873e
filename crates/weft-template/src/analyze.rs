#![forbid(unsafe_code)]

//! Binding analysis.
//!
//! Walks a descriptor tree once and classifies every [`Bind`] as a static
//! value, an external reference, or a field of the current ForEach element.
//! ForEach builders are invoked here, exactly once each, with a fresh
//! placeholder. A field reference belongs to the current element when its
//! placeholder id matches the innermost active placeholder.

use std::any::Any;
use std::fmt::{self, Write as _};
use std::ops::{ControlFlow, Range};
use std::sync::Arc;

use weft_core::geometry::Sides;
use weft_layout::{Axis, Sizing};
use weft_render::cell::Style;

use crate::bind::{
    Bind, CollectionRef, CollectionSource, ExternalSource, FieldRef, FieldSource, PlaceholderId,
    StaticValue, ValueKind,
};
use crate::error::CompileError;
use crate::execute::DrawScope;
use crate::widget::{DrawFn, MeasureFn, Node, Widget};

// ============================================================================
// Analyzed bindings
// ============================================================================

/// A classified leaf binding.
#[derive(Clone)]
pub(crate) enum Binding {
    Static(StaticValue),
    External(Arc<dyn ExternalSource>),
    ElementField(FieldBinding),
}

/// A field of the current element: its slot in the placeholder's table and
/// the reader registered there.
#[derive(Clone)]
pub(crate) struct FieldBinding {
    pub slot: usize,
    pub source: Arc<dyn FieldSource>,
}

impl Binding {
    pub fn kind(&self) -> ValueKind {
        match self {
            Binding::Static(v) => v.kind(),
            Binding::External(src) => src.kind(),
            Binding::ElementField(field) => field.source.kind(),
        }
    }

    pub fn is_element_field(&self) -> bool {
        matches!(self, Binding::ElementField(_))
    }

    /// Append the current value as text.
    #[inline]
    pub fn read_text(&self, scope: &DrawScope<'_>, out: &mut String) {
        match self {
            Binding::Static(StaticValue::Text(text)) => out.push_str(text),
            Binding::Static(StaticValue::Ratio(ratio)) => {
                let _ = write!(out, "{ratio}");
            }
            Binding::External(src) => src.read_text(out),
            Binding::ElementField(field) => {
                if let Some(element) = scope.element_any() {
                    field.source.read_text(element, scope.index(), out);
                }
            }
        }
    }

    /// The current value as a ratio.
    #[inline]
    pub fn read_ratio(&self, scope: &DrawScope<'_>) -> f64 {
        match self {
            Binding::Static(StaticValue::Ratio(ratio)) => *ratio,
            Binding::Static(StaticValue::Text(_)) => 0.0,
            Binding::External(src) => src.read_ratio(),
            Binding::ElementField(field) => scope
                .element_any()
                .map_or(0.0, |element| field.source.read_ratio(element, scope.index())),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Static(StaticValue::Text(text)) => write!(f, "{text:?}"),
            Binding::Static(StaticValue::Ratio(ratio)) => write!(f, "{ratio}"),
            Binding::External(src) => write!(f, "external {}", src.kind()),
            Binding::ElementField(field) => write!(f, "field#{} {}", field.slot, field.source.kind()),
        }
    }
}

/// A classified ForEach source.
#[derive(Clone)]
pub(crate) enum CollectionBinding {
    /// Fixed at compile time.
    Static(Arc<dyn CollectionSource>),
    /// Shared state outside any element.
    External(Arc<dyn CollectionSource>),
    /// Nested inside the current element.
    ElementField(Arc<dyn CollectionSource>),
}

impl CollectionBinding {
    pub fn source(&self) -> &dyn CollectionSource {
        match self {
            CollectionBinding::Static(src)
            | CollectionBinding::External(src)
            | CollectionBinding::ElementField(src) => src.as_ref(),
        }
    }

    pub fn is_element_field(&self) -> bool {
        matches!(self, CollectionBinding::ElementField(_))
    }

    #[inline]
    fn base<'a>(&self, scope: &DrawScope<'a>) -> Option<&'a dyn Any> {
        match self {
            CollectionBinding::ElementField(_) => scope.element_any(),
            _ => None,
        }
    }

    /// Current length, read fresh.
    #[inline]
    pub fn len(&self, scope: &DrawScope<'_>) -> usize {
        self.source().len(self.base(scope))
    }

    #[inline]
    pub fn visit(
        &self,
        scope: &DrawScope<'_>,
        range: Range<usize>,
        f: &mut dyn FnMut(usize, &dyn Any) -> ControlFlow<()>,
    ) {
        self.source().visit(self.base(scope), range, f);
    }
}

// ============================================================================
// Analyzed tree
// ============================================================================

pub(crate) struct Analyzed {
    pub node: ANode,
    pub sizing: Sizing,
}

pub(crate) enum ANode {
    Text {
        binding: Binding,
        width: Option<u16>,
        style: Style,
    },
    Progress {
        binding: Binding,
        width: Option<u16>,
        style: Style,
    },
    Container {
        axis: Axis,
        gap: u16,
        padding: Sides,
        children: Vec<Analyzed>,
    },
    ForEach {
        source: CollectionBinding,
        axis: Option<Axis>,
        gap: u16,
        element: Box<AnalyzedElement>,
    },
    Custom {
        measure: Arc<MeasureFn>,
        draw: Arc<DrawFn>,
    },
}

pub(crate) struct AnalyzedElement {
    pub root: Analyzed,
    pub type_name: &'static str,
    pub size: usize,
    pub field_count: usize,
}

impl fmt::Debug for Analyzed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzed")
            .field("node", &self.node)
            .field("sizing", &self.sizing)
            .finish()
    }
}

impl fmt::Debug for ANode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { binding, width, .. } => f
                .debug_struct("Text")
                .field("binding", &format_args!("{binding}"))
                .field("width", width)
                .finish(),
            Self::Progress { binding, width, .. } => f
                .debug_struct("Progress")
                .field("binding", &format_args!("{binding}"))
                .field("width", width)
                .finish(),
            Self::Container {
                axis,
                gap,
                padding,
                children,
            } => f
                .debug_struct("Container")
                .field("axis", axis)
                .field("gap", gap)
                .field("padding", padding)
                .field("children", children)
                .finish(),
            Self::ForEach {
                source,
                axis,
                gap,
                element,
            } => f
                .debug_struct("ForEach")
                .field(
                    "source",
                    &match source {
                        CollectionBinding::Static(_) => "static",
                        CollectionBinding::External(_) => "external",
                        CollectionBinding::ElementField(_) => "element field",
                    },
                )
                .field("axis", axis)
                .field("gap", gap)
                .field("element", &element.type_name)
                .field("fields", &element.field_count)
                .field("root", &element.root)
                .finish(),
            Self::Custom { .. } => f.write_str("Custom"),
        }
    }
}

// ============================================================================
// Analyzer
// ============================================================================

struct ActiveElement {
    id: PlaceholderId,
    fields: Vec<Arc<dyn FieldSource>>,
}

/// One analysis pass. Placeholder ids come from the compile session.
pub(crate) struct Analyzer<'s> {
    next_id: &'s mut u64,
    active: Vec<ActiveElement>,
}

impl<'s> Analyzer<'s> {
    pub fn new(next_id: &'s mut u64) -> Self {
        Self {
            next_id,
            active: Vec::new(),
        }
    }

    pub fn analyze(&mut self, widget: Widget, path: &str) -> Result<Analyzed, CompileError> {
        let Widget { node, sizing } = widget;
        let node = match node {
            Node::Text(text) => ANode::Text {
                binding: self.value(text.content, path)?,
                width: text.width,
                style: text.style,
            },
            Node::Progress(progress) => {
                let binding = self.value(progress.value, path)?;
                if binding.kind() != ValueKind::Ratio {
                    return Err(CompileError::KindMismatch {
                        path: path.to_string(),
                        expected: ValueKind::Ratio,
                        found: binding.kind(),
                    });
                }
                ANode::Progress {
                    binding,
                    width: progress.width,
                    style: progress.style,
                }
            }
            Node::Container(container) => {
                let mut children = Vec::with_capacity(container.children.len());
                for (i, child) in container.children.into_iter().enumerate() {
                    let child_path = format!("{path}/{}[{i}]", child.node.name());
                    children.push(self.analyze(child, &child_path)?);
                }
                ANode::Container {
                    axis: container.axis,
                    gap: container.gap,
                    padding: container.padding,
                    children,
                }
            }
            Node::ForEach(each) => {
                let source = self.collection(each.source, path)?;
                let builder = each.builder;
                if source.source().element_type() != builder.element_type() {
                    return Err(CompileError::ElementTypeMismatch {
                        path: path.to_string(),
                        collection: source.source().element_type_name(),
                        builder: builder.element_type_name(),
                    });
                }

                let id = PlaceholderId(*self.next_id);
                *self.next_id += 1;
                let type_name = builder.element_type_name();
                let size = builder.element_size();

                let (widget, fields) = builder.build(id);
                let element_path = format!("{path}/{}", widget.node.name());
                self.active.push(ActiveElement { id, fields });
                let root = self.analyze(widget, &element_path);
                let field_count = self.active.pop().map_or(0, |active| active.fields.len());

                ANode::ForEach {
                    source,
                    axis: each.axis,
                    gap: each.gap,
                    element: Box::new(AnalyzedElement {
                        root: root?,
                        type_name,
                        size,
                        field_count,
                    }),
                }
            }
            Node::Custom(custom) => {
                let measure = custom.measure.ok_or_else(|| CompileError::MissingCallback {
                    path: path.to_string(),
                    callback: "measure",
                })?;
                let draw = custom.draw.ok_or_else(|| CompileError::MissingCallback {
                    path: path.to_string(),
                    callback: "draw",
                })?;
                ANode::Custom { measure, draw }
            }
        };
        Ok(Analyzed { node, sizing })
    }

    /// Classify a leaf value.
    fn value(&self, bind: Bind, path: &str) -> Result<Binding, CompileError> {
        match bind {
            Bind::Static(value) => Ok(Binding::Static(value)),
            Bind::External(src) => Ok(Binding::External(src)),
            Bind::Field(field) => self.field(field, path).map(Binding::ElementField),
            Bind::Collection(_) => Err(CompileError::ExpectedValue {
                path: path.to_string(),
            }),
        }
    }

    /// Classify a ForEach source.
    fn collection(&self, bind: Bind, path: &str) -> Result<CollectionBinding, CompileError> {
        let Bind::Collection(CollectionRef { owner, source }) = bind else {
            return Err(CompileError::NotACollection {
                path: path.to_string(),
                found: bind.describe(),
            });
        };
        match owner {
            None if source.is_static() => Ok(CollectionBinding::Static(source)),
            None => Ok(CollectionBinding::External(source)),
            Some(owner) => {
                self.check_owner(owner, path)?;
                Ok(CollectionBinding::ElementField(source))
            }
        }
    }

    fn field(&self, field: FieldRef, path: &str) -> Result<FieldBinding, CompileError> {
        self.check_owner(field.owner, path)?;
        self.active
            .last()
            .and_then(|active| active.fields.get(field.slot))
            .map(|source| FieldBinding {
                slot: field.slot,
                source: Arc::clone(source),
            })
            .ok_or_else(|| CompileError::DetachedElementField {
                path: path.to_string(),
            })
    }

    /// The owner must be the innermost active placeholder.
    fn check_owner(&self, owner: PlaceholderId, path: &str) -> Result<(), CompileError> {
        match self.active.last() {
            Some(current) if current.id == owner => Ok(()),
            _ if self.active.iter().any(|active| active.id == owner) => {
                Err(CompileError::ForeignElementField {
                    path: path.to_string(),
                })
            }
            _ => Err(CompileError::DetachedElementField {
                path: path.to_string(),
            }),
        }
    }
}
