//! Repeating alarms with intervals the platform will silently raise.

use std::sync::Arc;

use lintel_core::artifact::{NodeKind, SourceNode};
use lintel_core::{Category, ScopeSet, Severity};

use crate::catalog::{Implementation, Issue};
use crate::detectors::{Detector, Incident, VisitContext};

pub const SHORT_ALARM: &str = "ShortAlarm";

const ALARM_MANAGER: &str = "android.app.AlarmManager";
const SET_REPEATING: &str = "setRepeating";

/// Minimum values, in milliseconds, per argument position of `setRepeating`.
const FLOORS: [(usize, i64); 2] = [(1, 5000), (2, 60000)];

#[derive(Debug, Default)]
pub struct AlarmDetector;

impl AlarmDetector {
    fn is_set_repeating(call: &SourceNode) -> bool {
        call.kind == NodeKind::Call
            && call.name() == Some(SET_REPEATING)
            && call
                .owner_type
                .as_deref()
                .map_or(true, |owner| owner == ALARM_MANAGER)
    }
}

impl Detector for AlarmDetector {
    fn name(&self) -> &'static str {
        "AlarmDetector"
    }

    fn capabilities(&self) -> ScopeSet {
        ScopeSet::SOURCE_FILE_SCOPE
    }

    fn visit_source(&self, root: &SourceNode, ctx: &mut VisitContext<'_>) -> anyhow::Result<()> {
        for call in root.walk() {
            if !Self::is_set_repeating(call) {
                continue;
            }
            for (position, floor) in FLOORS {
                let Some(argument) = call.children.get(position) else {
                    continue;
                };
                // Only literals; computed values are not evaluated.
                let Some(value) = argument.int_value() else {
                    continue;
                };
                if value < floor {
                    let message = format!(
                        "Value will be forced up to {} as of Android 5.1; don't rely on this to be exact",
                        floor
                    );
                    ctx.report(Incident::new(SHORT_ALARM, ctx.location(argument.range), message));
                }
            }
        }
        Ok(())
    }
}

pub fn issues() -> Vec<Issue> {
    let detector: Arc<dyn Detector> = Arc::new(AlarmDetector);
    vec![Issue::create(
        SHORT_ALARM,
        "Short or Frequent Alarm",
        "Frequent alarms are bad for battery life. As of API 22, the `AlarmManager` will \
         override near-future and high-frequency alarm requests, delaying the alarm at \
         least 5 seconds into the future and ensuring that the repeat interval is at \
         least 60 seconds.",
        Category::Correctness,
        6,
        Severity::Warning,
        Implementation::new(detector, ScopeSet::SOURCE_FILE_SCOPE),
    )]
}
