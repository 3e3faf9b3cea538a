//! Fuzzy scenario comparison used to reconcile plan scenarios with existing
//! specs.

use similar::TextDiff;

pub const DEFAULT_SCENARIO_THRESHOLD: f64 = 0.8;

const NAME_WEIGHT: f64 = 0.6;
const STEPS_WEIGHT: f64 = 0.4;

const STEP_KEYWORDS: &[&str] = &["Given ", "When ", "Then ", "And ", "But "];

/// Case-insensitive character similarity, `2 * matches / total_len`.
pub fn text_ratio(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio() as f64
}

/// Text after `Scenario:` on its line, or empty.
pub fn scenario_name(scenario: &str) -> String {
    scenario
        .lines()
        .find_map(|l| l.split_once("Scenario:").map(|(_, rest)| rest.trim()))
        .unwrap_or_default()
        .to_string()
}

pub fn scenario_steps(scenario: &str) -> Vec<&str> {
    scenario
        .lines()
        .map(str::trim)
        .filter(|l| STEP_KEYWORDS.iter().any(|k| l.starts_with(k)))
        .collect()
}

/// Weighted name and step similarity. Two step-less scenarios have
/// identical steps; one step-less scenario shares nothing with the other.
pub fn scenario_similarity(a: &str, b: &str) -> f64 {
    let name = text_ratio(&scenario_name(a), &scenario_name(b));
    let steps_a = scenario_steps(a);
    let steps_b = scenario_steps(b);
    let steps = match (steps_a.is_empty(), steps_b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => text_ratio(&steps_a.join(" "), &steps_b.join(" ")),
    };
    NAME_WEIGHT * name + STEPS_WEIGHT * steps
}

pub fn are_scenarios_similar(a: &str, b: &str, threshold: f64) -> bool {
    scenario_similarity(a, b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN: &str = "Scenario: User logs in\n  Given a registered user\n  When they sign in\n  Then they see the dashboard";

    #[test]
    fn ratio_bounds() {
        assert_eq!(text_ratio("abc", "ABC"), 1.0);
        assert_eq!(text_ratio("", ""), 1.0);
        assert_eq!(text_ratio("abc", "xyz"), 0.0);
        let r = text_ratio("abcd", "abce");
        assert!((r - 0.75).abs() < 1e-6, "{r}");
    }

    #[test]
    fn extracts_name_and_steps() {
        assert_eq!(scenario_name(LOGIN), "User logs in");
        assert_eq!(scenario_name("no keyword"), "");
        assert_eq!(
            scenario_steps(LOGIN),
            vec!["Given a registered user", "When they sign in", "Then they see the dashboard"]
        );
    }

    #[test]
    fn identical_scenarios_score_one() {
        assert!((scenario_similarity(LOGIN, LOGIN) - 1.0).abs() < 1e-9);
        assert!(are_scenarios_similar(LOGIN, LOGIN, DEFAULT_SCENARIO_THRESHOLD));
    }

    #[test]
    fn step_presence_mismatch_caps_score_at_name_weight() {
        let bare = "Scenario: User logs in";
        let s = scenario_similarity(LOGIN, bare);
        assert!((s - 0.6).abs() < 1e-9, "{s}");
        assert!(!are_scenarios_similar(LOGIN, bare, DEFAULT_SCENARIO_THRESHOLD));
    }

    #[test]
    fn stepless_scenarios_compare_by_name() {
        let s = scenario_similarity("Scenario: Export CSV", "Scenario: export csv");
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn different_scenarios_are_not_similar() {
        let other = "Scenario: Admin deletes account\n  Given an admin\n  When they delete a user\n  Then the account is gone";
        assert!(!are_scenarios_similar(LOGIN, other, DEFAULT_SCENARIO_THRESHOLD));
    }
}
