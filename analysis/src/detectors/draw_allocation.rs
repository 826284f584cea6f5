//! Allocations in draw and layout callbacks, found in compiled members.
//!
//! Findings point at the source line when the class records its source file,
//! which makes that file a dependency of the visit.

use std::sync::Arc;

use lintel_core::artifact::{ClassFile, MethodMember, Opcode};
use lintel_core::{Category, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, VisitContext};

pub const DRAW_ALLOCATION: &str = "DrawAllocation";

/// Callbacks that run on every frame or layout pass, as (name, descriptor).
const HOT_CALLBACKS: [(&str, &str); 3] = [
    ("onDraw", "(Landroid/graphics/Canvas;)V"),
    ("onMeasure", "(II)V"),
    ("onLayout", "(ZIIII)V"),
];

fn is_hot_callback(method: &MethodMember) -> bool {
    HOT_CALLBACKS
        .iter()
        .any(|(name, descriptor)| method.name == *name && method.descriptor == *descriptor)
}

/// Exceptions are only built on failure paths.
fn is_throwable(operand: &str) -> bool {
    operand.ends_with("Exception") || operand.ends_with("Error")
}

#[derive(Debug, Default)]
pub struct DrawAllocationDetector;

impl Detector for DrawAllocationDetector {
    fn name(&self) -> &'static str {
        "DrawAllocationDetector"
    }

    fn capabilities(&self) -> ScopeSet {
        ScopeSet::MEMBER_SCOPE
    }

    fn visit_member(&self, class: &ClassFile, ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        let path = class
            .source_path
            .clone()
            .unwrap_or_else(|| ctx.path().to_string());
        for method in class.methods.iter().filter(|m| is_hot_callback(m)) {
            let mut last_line = None;
            for instruction in &method.instructions {
                if !matches!(instruction.opcode, Opcode::New | Opcode::NewArray) {
                    continue;
                }
                if is_throwable(&instruction.operand) || last_line == Some(instruction.line) {
                    continue;
                }
                last_line = Some(instruction.line);
                let location = ctx.line_location(&path, instruction.line);
                ctx.report(Incident::new(
                    DRAW_ALLOCATION,
                    location,
                    "Avoid object allocations during draw/layout operations (preallocate and reuse instead)",
                ));
            }
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(DrawAllocationDetector);
    vec![Issue::create(
        DRAW_ALLOCATION,
        "Memory allocations within drawing code",
        "You should avoid allocating objects during a drawing or layout operation. These \
         are called frequently, so a smooth UI can be interrupted by garbage collection \
         pauses caused by the object allocations.",
        Category::Performance,
        9,
        Severity::Warning,
        Implementation::new(detector, ScopeSet::MEMBER_SCOPE),
    )]
}
