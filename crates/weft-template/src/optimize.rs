#![forbid(unsafe_code)]

//! Pattern recognition over compiled templates.
//!
//! Runs once after lowering. Marks element templates whose size cannot vary
//! between elements as uniform, and attaches specialized draw loops to the
//! shapes that dominate dashboards:
//!
//! - a ForEach whose element is a single fixed-width leaf (a *strip*);
//! - a root ForEach whose element is a strip over a collection nested in
//!   the element (a *grid*).
//!
//! Specialized loops produce exactly the cells the generic walk produces.

use weft_layout::Axis;
use weft_render::cell::Cell;

use crate::analyze::{Binding, CollectionBinding};
use crate::compile::{ElementTemplate, Instruction, Op};

/// How a template is executed.
pub(crate) enum ExecPlan {
    /// Per-element layout and a full instruction walk.
    Generic,
    /// One layout serves every element.
    Uniform,
    /// Single fixed-size leaf per element.
    Strip(FastLeaf),
    /// Root-level grid of fixed-size leaves.
    Grid(GridPlan),
}

impl ExecPlan {
    pub fn name(&self) -> &'static str {
        match self {
            ExecPlan::Generic => "generic",
            ExecPlan::Uniform => "uniform",
            ExecPlan::Strip(_) => "strip",
            ExecPlan::Grid(_) => "grid",
        }
    }
}

#[derive(Clone)]
pub(crate) struct FastLeaf {
    pub kind: LeafKind,
    pub binding: Binding,
    /// Declared width; clamped to the available width at draw time.
    pub width: u16,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LeafKind {
    Text { cell: Cell },
    Progress { filled: Cell, empty: Cell },
}

pub(crate) struct GridPlan {
    pub inner_source: CollectionBinding,
    pub inner_axis: Axis,
    pub inner_gap: u16,
    pub leaf: FastLeaf,
}

/// Optimize every element template under `instrs`; returns the plan for the
/// root array.
pub(crate) fn optimize(instrs: &mut [Instruction], enabled: bool) -> ExecPlan {
    for instr in instrs.iter_mut() {
        if let Op::ForEach(each) = &mut instr.op {
            optimize_element(&mut each.template, enabled);
        }
    }
    if !enabled {
        return ExecPlan::Generic;
    }
    grid_plan(instrs).map_or(ExecPlan::Generic, ExecPlan::Grid)
}

fn optimize_element(template: &mut ElementTemplate, enabled: bool) {
    for instr in template.instructions.iter_mut() {
        if let Op::ForEach(each) = &mut instr.op {
            optimize_element(&mut each.template, enabled);
        }
    }

    if !enabled {
        template.uniform = false;
        template.plan = ExecPlan::Generic;
        return;
    }

    template.uniform = template.instructions.iter().all(is_uniform);
    template.plan = match fast_leaf(&template.instructions) {
        Some(leaf) => ExecPlan::Strip(leaf),
        None if template.uniform => ExecPlan::Uniform,
        None => ExecPlan::Generic,
    };
}

/// Whether the instruction's natural size is the same for every element.
fn is_uniform(instr: &Instruction) -> bool {
    match &instr.op {
        Op::Text(text) => text.width.is_some() || !text.binding.is_element_field(),
        Op::ForEach(each) => !each.source.is_element_field(),
        Op::Progress(_) | Op::Start(_) | Op::End { .. } | Op::Custom(_) => true,
    }
}

fn fast_leaf(instrs: &[Instruction]) -> Option<FastLeaf> {
    let [only] = instrs else {
        return None;
    };
    match &only.op {
        Op::Progress(progress) => Some(FastLeaf {
            kind: LeafKind::Progress {
                filled: progress.filled,
                empty: progress.empty,
            },
            binding: progress.binding.clone(),
            width: progress.width,
        }),
        Op::Text(text) => text.width.map(|width| FastLeaf {
            kind: LeafKind::Text { cell: text.cell },
            binding: text.binding.clone(),
            width,
        }),
        _ => None,
    }
}

fn grid_plan(instrs: &[Instruction]) -> Option<GridPlan> {
    let [outer] = instrs else {
        return None;
    };
    let Op::ForEach(outer) = &outer.op else {
        return None;
    };
    let [inner] = outer.template.instructions.as_slice() else {
        return None;
    };
    let Op::ForEach(inner) = &inner.op else {
        return None;
    };
    let ExecPlan::Strip(leaf) = &inner.template.plan else {
        return None;
    };
    if !inner.source.is_element_field() || !leaf.binding.is_element_field() {
        return None;
    }
    Some(GridPlan {
        inner_source: inner.source.clone(),
        inner_axis: inner.axis,
        inner_gap: inner.gap,
        leaf: leaf.clone(),
    })
}
