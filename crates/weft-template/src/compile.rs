#![forbid(unsafe_code)]

//! Lowering an analyzed tree to a flat instruction array.
//!
//! Containers become a `Start`/`End` pair; `Start` records the index of its
//! `End` so layout and draw can skip a whole subtree in one step. Each
//! ForEach owns a nested [`ElementTemplate`] compiled from its builder's
//! output. Compilation happens once; layout and draw mutate only the
//! geometry slots and ForEach counters afterwards.

use std::ops::Range;
use std::sync::Arc;

use weft_core::geometry::{Rect, Sides, Size};
use weft_layout::{Axis, Sizing};
use weft_render::cell::Cell;

use crate::analyze::{ANode, Analyzed, AnalyzedElement, Analyzer, Binding, CollectionBinding};
use crate::error::CompileError;
use crate::optimize::{self, ExecPlan};
use crate::options::CompileOptions;
use crate::template::Template;
use crate::widget::{DrawFn, MeasureFn, Widget};

// ============================================================================
// Instructions
// ============================================================================

/// Geometry slots rewritten by every layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub avail: Size,
    pub natural: Size,
    /// Relative to the origin of the array being laid out.
    pub rect: Rect,
}

pub(crate) struct Instruction {
    pub op: Op,
    pub sizing: Sizing,
    pub geom: Geometry,
}

impl Instruction {
    fn new(op: Op, sizing: Sizing) -> Self {
        Self {
            op,
            sizing,
            geom: Geometry::default(),
        }
    }
}

pub(crate) enum Op {
    Text(TextOp),
    Progress(ProgressOp),
    Start(StartOp),
    End { start: usize },
    ForEach(Box<ForEachOp>),
    Custom(CustomOp),
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Text(_) => "text",
            Op::Progress(_) => "progress",
            Op::Start(_) => "start",
            Op::End { .. } => "end",
            Op::ForEach(_) => "for_each",
            Op::Custom(_) => "custom",
        }
    }
}

pub(crate) struct TextOp {
    pub binding: Binding,
    pub width: Option<u16>,
    pub cell: Cell,
}

pub(crate) struct ProgressOp {
    pub binding: Binding,
    pub width: u16,
    pub filled: Cell,
    pub empty: Cell,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StartOp {
    pub axis: Axis,
    pub gap: u16,
    pub padding: Sides,
    /// Index of the matching `End`.
    pub end: usize,
    pub child_count: usize,
}

pub(crate) struct ForEachOp {
    pub source: CollectionBinding,
    pub axis: Axis,
    pub gap: u16,
    pub template: ElementTemplate,
    /// Collection length read by the last layout.
    pub len: usize,
    /// Elements inside the viewport at the last layout.
    pub visible: Range<usize>,
    /// Element size when the template is uniform.
    pub extent: Size,
}

pub(crate) struct CustomOp {
    pub measure: Arc<MeasureFn>,
    pub draw: Arc<DrawFn>,
}

/// The compiled sub-template of one ForEach.
pub(crate) struct ElementTemplate {
    pub instructions: Vec<Instruction>,
    pub element_type_name: &'static str,
    pub element_size: usize,
    pub field_count: usize,
    /// Every element has the same size, so one measurement serves all.
    pub uniform: bool,
    pub plan: ExecPlan,
}

// ============================================================================
// Lowering
// ============================================================================

/// Where a node sits, for resolving a ForEach's default axis.
#[derive(Debug, Clone, Copy)]
enum Parent {
    Root,
    Container(Axis),
    Element(Axis),
}

fn lower(node: Analyzed, parent: Parent, options: &CompileOptions, out: &mut Vec<Instruction>) {
    let Analyzed { node, sizing } = node;
    match node {
        ANode::Text {
            binding,
            width,
            style,
        } => out.push(Instruction::new(
            Op::Text(TextOp {
                binding,
                width,
                cell: style.to_cell(),
            }),
            sizing,
        )),
        ANode::Progress {
            binding,
            width,
            style,
        } => {
            let base = style.to_cell();
            out.push(Instruction::new(
                Op::Progress(ProgressOp {
                    binding,
                    width: width.unwrap_or(options.progress_width),
                    filled: base.with_char(options.progress_glyphs.filled),
                    empty: base.with_char(options.progress_glyphs.empty),
                }),
                sizing,
            ));
        }
        ANode::Container {
            axis,
            gap,
            padding,
            children,
        } => {
            let start = out.len();
            out.push(Instruction::new(
                Op::Start(StartOp {
                    axis,
                    gap,
                    padding,
                    end: start,
                    child_count: children.len(),
                }),
                sizing,
            ));
            for child in children {
                lower(child, Parent::Container(axis), options, out);
            }
            let end = out.len();
            out.push(Instruction::new(Op::End { start }, Sizing::Auto));
            if let Op::Start(op) = &mut out[start].op {
                op.end = end;
            }
        }
        ANode::ForEach {
            source,
            axis,
            gap,
            element,
        } => {
            let axis = axis.unwrap_or(match parent {
                Parent::Root => options.default_axis,
                Parent::Container(axis) => axis,
                Parent::Element(axis) => axis.perpendicular(),
            });
            let AnalyzedElement {
                root,
                type_name,
                size,
                field_count,
            } = *element;
            let mut instructions = Vec::new();
            lower(root, Parent::Element(axis), options, &mut instructions);
            out.push(Instruction::new(
                Op::ForEach(Box::new(ForEachOp {
                    source,
                    axis,
                    gap,
                    template: ElementTemplate {
                        instructions,
                        element_type_name: type_name,
                        element_size: size,
                        field_count,
                        uniform: false,
                        plan: ExecPlan::Generic,
                    },
                    len: 0,
                    visible: 0..0,
                    extent: Size::ZERO,
                })),
                sizing,
            ));
        }
        ANode::Custom { measure, draw } => {
            out.push(Instruction::new(Op::Custom(CustomOp { measure, draw }), sizing));
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// A compile session.
///
/// Placeholder ids are unique across every tree compiled by one session,
/// so element fields can never be confused between templates.
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompileOptions,
    next_placeholder: u64,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            next_placeholder: 0,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile a widget tree into a reusable [`Template`].
    ///
    /// Every ForEach builder in the tree runs exactly once, here.
    pub fn compile(&mut self, tree: impl Into<Widget>) -> Result<Template, CompileError> {
        let span = weft_core::debug_span!("template_compile");
        let _guard = span.enter();

        let analyzed = match Analyzer::new(&mut self.next_placeholder).analyze(tree.into(), "root") {
            Ok(analyzed) => analyzed,
            Err(err) => {
                weft_core::debug!(error = %err, "template compile failed");
                return Err(err);
            }
        };

        let mut instructions = Vec::new();
        lower(analyzed, Parent::Root, &self.options, &mut instructions);
        let plan = optimize::optimize(&mut instructions, self.options.optimize_patterns);

        weft_core::trace!(
            instructions = instructions.len(),
            plan = plan.name(),
            "template compiled"
        );
        Ok(Template::new(instructions, plan))
    }
}

/// Compile with default options in a fresh session.
pub fn compile(tree: impl Into<Widget>) -> Result<Template, CompileError> {
    Compiler::new().compile(tree)
}
