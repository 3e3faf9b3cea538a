//! Session-stop gate: refuse to stop while the active plan still has TODO
//! scenarios. Anything unexpected allows the stop.

use crate::hook::StopDecision;
use crate::plan::{self, Completion};
use std::path::Path;

pub fn stop_decision(completion: Option<Completion>) -> StopDecision {
    match completion {
        Some(c) if !c.is_complete() => StopDecision::block(format!(
            "Work incomplete: {}/{} scenarios TODO ({}%)",
            c.todo_count,
            c.total(),
            c.percentage()
        )),
        _ => StopDecision::allow(),
    }
}

/// Locate the plan governing `cwd` and decide whether the session may stop.
pub fn evaluate_stop(cwd: &Path) -> StopDecision {
    let Some(location) = plan::find_plan_file(cwd) else {
        tracing::debug!("no plan file found, allowing stop");
        return stop_decision(None);
    };
    if !location.is_contained() {
        tracing::warn!(
            "unsafe plan file path detected: {}",
            location.path.display()
        );
        return stop_decision(None);
    }
    let content = match std::fs::read_to_string(&location.path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("cannot read plan file: {e}");
            return stop_decision(None);
        }
    };
    if !plan::is_plan(&content) {
        tracing::warn!("plan file format invalid: {}", location.path.display());
        return stop_decision(None);
    }

    let completion = Completion::of(&content);
    let decision = stop_decision(Some(completion));
    tracing::debug!(
        plan = %location.path.display(),
        decision = ?decision.decision,
        completion = completion.percentage(),
        "stop gate evaluated"
    );
    decision
}
