//! Layouts that are too large or too deeply nested.

use std::sync::Arc;

use lintel_core::artifact::Element;
use lintel_core::{Category, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, VisitContext};

pub const TOO_MANY_VIEWS: &str = "TooManyViews";
pub const TOO_DEEP_LAYOUT: &str = "TooDeepLayout";

pub const MAX_VIEW_COUNT: usize = 80;
pub const MAX_DEPTH: usize = 10;

#[derive(Debug, Default)]
pub struct TooManyViewsDetector;

impl Detector for TooManyViewsDetector {
    fn name(&self) -> &'static str {
        "TooManyViewsDetector"
    }

    fn capabilities(&self) -> ScopeSet {
        ScopeSet::RESOURCE_FILE_SCOPE
    }

    fn visit_resource(&self, root: &Element, ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        let Some(dir) = ctx.resource_dir().filter(|d| d.resource_type == "layout") else {
            return Ok(());
        };

        let mut views = 0usize;
        let mut warned_count = false;
        let mut warned_depth = false;
        // Pre-order with depth; the root is at depth 1.
        let mut stack = vec![(root, 1usize)];
        while let Some((element, depth)) = stack.pop() {
            views += 1;
            if views > MAX_VIEW_COUNT && !warned_count {
                warned_count = true;
                ctx.report(Incident::new(
                    TOO_MANY_VIEWS,
                    ctx.location(element.range),
                    format!(
                        "{} has more than {} views, bad for performance",
                        dir.file_name, MAX_VIEW_COUNT
                    ),
                ));
            }
            if depth > MAX_DEPTH && !warned_depth {
                warned_depth = true;
                ctx.report(Incident::new(
                    TOO_DEEP_LAYOUT,
                    ctx.location(element.range),
                    format!(
                        "`{}` has more than {} levels, bad for performance",
                        element.tag, MAX_DEPTH
                    ),
                ));
            }
            stack.extend(element.children.iter().rev().map(|c| (c, depth + 1)));
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(TooManyViewsDetector);
    let implementation = Implementation::new(detector, ScopeSet::RESOURCE_FILE_SCOPE);
    vec![
        Issue::create(
            TOO_MANY_VIEWS,
            "Layout has too many views",
            "Using too many views in a single layout is bad for performance. Consider \
             using compound drawables or other tricks for reducing the number of views \
             in this layout.",
            Category::Performance,
            1,
            Severity::Warning,
            implementation.clone(),
        ),
        Issue::create(
            TOO_DEEP_LAYOUT,
            "Layout hierarchy is too deep",
            "Layouts with too much nesting is bad for performance. Consider using a \
             flatter layout (such as `RelativeLayout` or `GridLayout`).",
            Category::Performance,
            1,
            Severity::Warning,
            implementation,
        ),
    ]
}
