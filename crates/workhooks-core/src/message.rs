//! Squash commit message synthesis. Pure text in, text out; the callers
//! gather the plan content, diff stat and commit subjects from git.

use crate::plan;

pub const WIP_PREFIX: &str = "WIP:";

const DEFAULT_GOAL: &str = "Complete work session";

/// Strip a leading `WIP:` (and the single space after it, if any).
pub fn strip_wip_prefix(message: &str) -> &str {
    match message.strip_prefix(WIP_PREFIX) {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => message,
    }
}

/// One-line summary of `git diff --stat` output: the number of files touched,
/// plus their names when there are at most three.
pub fn summarize_diff_stat(stat: &str) -> String {
    let files: Vec<&str> = stat
        .lines()
        .filter_map(|line| line.split_once('|'))
        .map(|(name, _)| name.trim())
        .collect();

    if files.is_empty() {
        return "No file changes".to_string();
    }

    let mut summary = format!("{} files changed", files.len());
    if files.len() <= 3 {
        summary.push_str(": ");
        summary.push_str(&files.join(", "));
    }
    summary
}

/// Structured message built from a plan file: goal, completed scenarios, key
/// changes, squash count and attribution footer.
pub fn from_plan(plan_content: &str, diff_summary: &str, wip_count: usize, attribution: &str) -> String {
    let goal = plan::goal(plan_content).unwrap_or_else(|| DEFAULT_GOAL.to_string());
    let completed = plan::completed_scenarios(plan_content);

    let mut parts = vec![goal, String::new()];
    if !completed.is_empty() {
        parts.push("Completed scenarios:".to_string());
        parts.extend(completed.iter().map(|s| format!("- {s}")));
        parts.push(String::new());
    }
    parts.push(format!("Key changes: {diff_summary}"));
    parts.push(String::new());
    parts.push(squash_line(wip_count));
    parts.push(String::new());
    parts.push(attribution.to_string());
    parts.join("\n")
}

/// Generic message: every commit subject with its WIP prefix removed, under a
/// `feat:` heading.
pub fn from_subjects(subjects: &[String], wip_count: usize, attribution: &str) -> String {
    let combined = subjects
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| strip_wip_prefix(s))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "feat: {combined}\n\n{}\n\n{attribution}",
        squash_line(wip_count)
    )
}

fn squash_line(wip_count: usize) -> String {
    format!("Squashed {wip_count} WIP commits")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_variants() {
        assert_eq!(strip_wip_prefix("WIP: add login"), "add login");
        assert_eq!(strip_wip_prefix("WIP:add login"), "add login");
        assert_eq!(strip_wip_prefix("feat: WIP: nested"), "feat: WIP: nested");
    }

    #[test]
    fn stat_summary_lists_few_files() {
        let stat = " src/a.rs | 4 ++--\n src/b.rs | 1 +\n 2 files changed, 3 insertions(+), 2 deletions(-)\n";
        assert_eq!(summarize_diff_stat(stat), "2 files changed: src/a.rs, src/b.rs");
    }

    #[test]
    fn stat_summary_counts_many_files() {
        let stat = " a | 1 +\n b | 1 +\n c | 1 +\n d | 1 +\n 4 files changed\n";
        assert_eq!(summarize_diff_stat(stat), "4 files changed");
    }

    #[test]
    fn empty_stat() {
        assert_eq!(summarize_diff_stat(""), "No file changes");
    }

    #[test]
    fn plan_message_layout() {
        let plan = "**Goal**: Ship login\n\n<!-- DONE -->\nScenario: Password sign-in\n<!-- TODO -->\nScenario: SSO\n";
        let msg = from_plan(plan, "1 files changed: src/login.rs", 3, "Generated with workhooks");
        assert_eq!(
            msg,
            "Ship login\n\nCompleted scenarios:\n- Password sign-in\n\nKey changes: 1 files changed: src/login.rs\n\nSquashed 3 WIP commits\n\nGenerated with workhooks"
        );
    }

    #[test]
    fn plan_without_goal_uses_default() {
        let msg = from_plan("# nothing", "No file changes", 2, "sig");
        assert!(msg.starts_with("Complete work session\n\nKey changes: No file changes"));
        assert!(!msg.contains("Completed scenarios"));
    }

    #[test]
    fn subjects_message() {
        let subjects = vec!["WIP: fix Y".to_string(), "WIP: feature X".to_string()];
        let msg = from_subjects(&subjects, 2, "sig");
        assert_eq!(msg, "feat: fix Y\nfeature X\n\nSquashed 2 WIP commits\n\nsig");
    }
}
