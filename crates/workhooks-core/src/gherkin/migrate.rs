//! One-off migration of historical plan files into living `.feature` specs.
//!
//! Gherkin blocks in each plan are classified by the heading of the section
//! they sit in: headings mentioning technical topics become `@technical`
//! scenarios, everything else `@user`. Plans sharing a feature name are
//! merged into one spec file.

use crate::error::Result;
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_BATCH_SIZE: usize = 10;

const TECHNICAL_KEYWORDS: &[&str] = &[
    "technical",
    "specification",
    "implementation",
    "api",
    "database",
];

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Scenarios inside ```` ```gherkin ```` fences, split into user-facing and
/// technical by section heading.
pub fn extract_scenarios_from_plan(content: &str) -> (Vec<String>, Vec<String>) {
    let mut user = Vec::new();
    let mut technical = Vec::new();

    let mut heading: Option<String> = None;
    let mut block: Option<Vec<&str>> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(lines) = block.as_mut() {
            if trimmed.starts_with("```") {
                let scenarios = split_scenarios(&lines.join("\n"));
                if let Some(h) = &heading {
                    if is_technical_heading(h) {
                        technical.extend(scenarios);
                    } else {
                        user.extend(scenarios);
                    }
                }
                block = None;
            } else {
                lines.push(line);
            }
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("##") {
            heading = Some(rest.trim_start_matches('#').trim().to_lowercase());
        } else if trimmed.starts_with("```gherkin") {
            block = Some(Vec::new());
        }
    }

    (user, technical)
}

fn is_technical_heading(heading: &str) -> bool {
    TECHNICAL_KEYWORDS.iter().any(|k| heading.contains(k))
}

/// Each `Scenario:` through to the next one, trimmed. Text before the first
/// scenario is dropped.
fn split_scenarios(gherkin: &str) -> Vec<String> {
    let starts: Vec<usize> = gherkin.match_indices("Scenario:").map(|(i, _)| i).collect();
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(gherkin.len());
            gherkin[start..end].trim().to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}

static FEATURE_TITLE_RE: OnceLock<Regex> = OnceLock::new();
static HEADING_RE: OnceLock<Regex> = OnceLock::new();

/// `# Feature: <name>` if present, else the first heading.
pub fn extract_feature_name(content: &str) -> String {
    let feature = FEATURE_TITLE_RE
        .get_or_init(|| Regex::new(r"(?m)#[ \t]+Feature:[ \t]+(.+)").unwrap());
    let heading = HEADING_RE.get_or_init(|| Regex::new(r"(?m)#[ \t]+(.+)").unwrap());
    feature
        .captures(content)
        .or_else(|| heading.captures(content))
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| "Unknown Feature".to_string())
}

/// Render a `.feature` file: user scenarios first, each tagged and indented.
pub fn feature_file_content(feature_name: &str, user: &[String], technical: &[String]) -> String {
    let mut lines = vec![format!("Feature: {feature_name}"), String::new()];
    let tagged = user
        .iter()
        .map(|s| ("@user", s))
        .chain(technical.iter().map(|s| ("@technical", s)));
    for (tag, scenario) in tagged {
        lines.push(format!("  {tag}"));
        lines.extend(scenario.lines().map(|l| format!("  {l}")));
        lines.push(String::new());
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Project migration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationError {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub total_plans: usize,
    pub successes: usize,
    pub failures: usize,
    pub errors: Vec<MigrationError>,
    /// Spec files written, relative to the project.
    pub written: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub batch: usize,
}

#[derive(Default)]
struct Collected {
    user: Vec<String>,
    technical: Vec<String>,
}

/// Convert `<project>/plans/*.md` into `<project>/specs/*.feature`.
///
/// Plans are processed in name order, `batch_size` at a time, calling
/// `progress` after each batch. A plan that cannot be read or holds no
/// scenarios is recorded as a failure and skipped.
pub fn migrate_project(
    project: &Path,
    batch_size: usize,
    progress: &mut dyn FnMut(BatchProgress),
) -> Result<MigrationSummary> {
    let plans_dir = paths::plans_dir(project);
    let specs_dir = paths::specs_dir(project);
    std::fs::create_dir_all(&specs_dir)?;

    let mut plan_files: Vec<_> = match std::fs::read_dir(&plans_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "md"))
            .collect(),
        Err(_) => Vec::new(),
    };
    plan_files.sort();

    let mut summary = MigrationSummary {
        total_plans: plan_files.len(),
        ..MigrationSummary::default()
    };
    let mut features: BTreeMap<String, Collected> = BTreeMap::new();

    for (n, batch) in plan_files.chunks(batch_size.max(1)).enumerate() {
        for plan in batch {
            let file = plan
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = match std::fs::read_to_string(plan) {
                Ok(c) => c,
                Err(e) => {
                    summary.failures += 1;
                    summary.errors.push(MigrationError {
                        file,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let (user, technical) = extract_scenarios_from_plan(&content);
            if user.is_empty() && technical.is_empty() {
                summary.failures += 1;
                summary.errors.push(MigrationError {
                    file,
                    error: "No scenarios found".to_string(),
                });
                continue;
            }
            let entry = features.entry(extract_feature_name(&content)).or_default();
            entry.user.extend(user);
            entry.technical.extend(technical);
            summary.successes += 1;
        }
        progress(BatchProgress {
            current: (n * batch_size.max(1) + batch.len()).min(plan_files.len()),
            total: plan_files.len(),
            batch: n + 1,
        });
    }

    for (name, collected) in &features {
        let file_name = paths::feature_file_name(name);
        let content = feature_file_content(name, &collected.user, &collected.technical);
        crate::io::atomic_write(&specs_dir.join(&file_name), content.as_bytes())?;
        summary.written.push(format!("{}/{file_name}", paths::SPECS_DIR));
    }

    tracing::debug!(
        "migrated {} of {} plans into {} feature files",
        summary.successes,
        summary.total_plans,
        summary.written.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PLAN: &str = "# Feature: User Login\n\n**Goal**: sign in\n\n## User Requirements\n\n```gherkin\nFeature: Login\n  Scenario: Password sign-in\n    Given a user\n    Then they are signed in\n\n  Scenario: Wrong password\n    Then they see an error\n```\n\n## Technical Specifications\n\n```gherkin\nScenario: Passwords are hashed\n  Then bcrypt is used\n```\n";

    #[test]
    fn splits_user_and_technical_scenarios() {
        let (user, tech) = extract_scenarios_from_plan(PLAN);
        assert_eq!(
            user,
            vec![
                "Scenario: Password sign-in\n    Given a user\n    Then they are signed in",
                "Scenario: Wrong password\n    Then they see an error",
            ]
        );
        assert_eq!(tech, vec!["Scenario: Passwords are hashed\n  Then bcrypt is used"]);
    }

    #[test]
    fn ambiguous_headings_default_to_user() {
        let plan = "## Notes\n```gherkin\nScenario: Something\n```\n## API design\n```gherkin\nScenario: Endpoint\n```\n";
        let (user, tech) = extract_scenarios_from_plan(plan);
        assert_eq!(user, vec!["Scenario: Something"]);
        assert_eq!(tech, vec!["Scenario: Endpoint"]);
    }

    #[test]
    fn feature_name_sources() {
        assert_eq!(extract_feature_name(PLAN), "User Login");
        assert_eq!(extract_feature_name("# Checkout flow\n\ntext"), "Checkout flow");
        assert_eq!(extract_feature_name("no headings"), "Unknown Feature");
    }

    #[test]
    fn renders_tagged_indented_feature() {
        let content = feature_file_content(
            "Login",
            &["Scenario: A\n  Given x".to_string()],
            &["Scenario: B".to_string()],
        );
        assert_eq!(
            content,
            "Feature: Login\n\n  @user\n  Scenario: A\n    Given x\n\n  @technical\n  Scenario: B\n"
        );
    }

    #[test]
    fn migrates_project_in_batches() {
        let dir = TempDir::new().unwrap();
        let plans = dir.path().join("plans");
        std::fs::create_dir_all(&plans).unwrap();
        std::fs::write(plans.join("01-login.md"), PLAN).unwrap();
        std::fs::write(
            plans.join("02-login-more.md"),
            "# Feature: User Login\n## Behavior\n```gherkin\nScenario: Remember me\n```\n",
        )
        .unwrap();
        std::fs::write(plans.join("03-empty.md"), "# Nothing here\n").unwrap();

        let mut batches = Vec::new();
        let summary = migrate_project(dir.path(), 2, &mut |p| batches.push(p)).unwrap();

        assert_eq!(summary.total_plans, 3);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.errors[0].file, "03-empty.md");
        assert_eq!(summary.errors[0].error, "No scenarios found");
        assert_eq!(summary.written, vec!["specs/user-login.feature"]);
        assert_eq!(
            batches,
            vec![
                BatchProgress { current: 2, total: 3, batch: 1 },
                BatchProgress { current: 3, total: 3, batch: 2 },
            ]
        );

        let spec = std::fs::read_to_string(dir.path().join("specs/user-login.feature")).unwrap();
        let feature = crate::gherkin::parse_feature(&spec);
        assert_eq!(feature.name, "User Login");
        let names: Vec<&str> = feature.scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Password sign-in", "Wrong password", "Remember me", "Passwords are hashed"]
        );
        assert_eq!(feature.scenarios[3].tags, vec!["@technical"]);
    }

    #[test]
    fn missing_plans_dir_migrates_nothing() {
        let dir = TempDir::new().unwrap();
        let summary = migrate_project(dir.path(), DEFAULT_BATCH_SIZE, &mut |_| {}).unwrap();
        assert_eq!(summary.total_plans, 0);
        assert!(dir.path().join("specs").is_dir());
    }
}
