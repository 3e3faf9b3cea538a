//! Documentation and coverage reports generated from living specs.

use crate::error::{HookError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use walkdir::WalkDir;

use super::feature::{load_feature_files, Feature};

// ---------------------------------------------------------------------------
// Prose
// ---------------------------------------------------------------------------

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => {
            let mut out: String = first.to_uppercase().collect();
            out.push_str(&chars.as_str().to_lowercase());
            out
        }
        None => String::new(),
    }
}

/// Render a Gherkin scenario as one sentence: `<name>: given, when, then.`
pub fn scenario_to_prose(scenario: &str) -> String {
    let mut parts = Vec::new();
    if let Some(name) = scenario
        .lines()
        .find_map(|l| l.split_once("Scenario:").map(|(_, rest)| rest.trim()))
    {
        parts.push(name.to_string());
    }
    for line in scenario.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("Given ") {
            parts.push(capitalize(rest.trim()));
        } else if let Some(rest) = ["When ", "Then ", "And ", "But "]
            .iter()
            .find_map(|k| line.strip_prefix(k))
        {
            parts.push(rest.trim().to_lowercase());
        }
    }
    match parts.split_first() {
        None => String::new(),
        Some((only, [])) => format!("{only}."),
        Some((first, rest)) => format!("{first}: {}.", rest.join(", ")),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocScenario {
    pub feature: String,
    pub name: String,
    pub prose: String,
}

/// Scenarios carrying any of `tags`, in file then scenario order.
pub fn filter_scenarios_by_tags<S: AsRef<str>>(
    features: &BTreeMap<String, Feature>,
    tags: &[S],
) -> Vec<DocScenario> {
    features
        .values()
        .flat_map(|f| {
            f.scenarios
                .iter()
                .filter(|s| s.has_any_tag(tags))
                .map(|s| DocScenario {
                    feature: f.name.clone(),
                    name: s.name.clone(),
                    prose: scenario_to_prose(&s.gherkin()),
                })
        })
        .collect()
}

/// Scenarios grouped by feature, features in first-seen order.
fn by_feature(scenarios: &[DocScenario]) -> Vec<(&str, Vec<&DocScenario>)> {
    let mut groups: Vec<(&str, Vec<&DocScenario>)> = Vec::new();
    for s in scenarios {
        match groups.iter_mut().find(|(f, _)| *f == s.feature) {
            Some((_, list)) => list.push(s),
            None => groups.push((s.feature.as_str(), vec![s])),
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocFormat {
    Markdown,
    Html,
}

impl FromStr for DocFormat {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            other => Err(HookError::UnknownFormat(other.to_string())),
        }
    }
}

pub fn render_markdown(scenarios: &[DocScenario]) -> String {
    let mut lines = vec!["# Documentation".to_string(), String::new()];
    for (feature, list) in by_feature(scenarios) {
        lines.push(format!("## {feature}"));
        lines.push(String::new());
        for s in list {
            lines.push(format!("### {}", s.name));
            lines.push(s.prose.clone());
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

pub fn render_html(scenarios: &[DocScenario]) -> String {
    let mut lines: Vec<String> = [
        "<!DOCTYPE html>",
        "<html lang=\"en\">",
        "<head>",
        "  <meta charset=\"UTF-8\">",
        "  <title>Documentation</title>",
        "</head>",
        "<body>",
        "  <h1>Documentation</h1>",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for (feature, list) in by_feature(scenarios) {
        lines.push(format!("  <h2>{}</h2>", escape_html(feature)));
        for s in list {
            lines.push(format!("  <h3>{}</h3>", escape_html(&s.name)));
            lines.push(format!("  <p>{}</p>", escape_html(&s.prose)));
        }
    }
    lines.push("</body>".to_string());
    lines.push("</html>".to_string());
    lines.join("\n")
}

/// Write documentation for the tagged scenarios in `specs_dir`. Returns the
/// number of scenarios documented.
pub fn generate_docs<S: AsRef<str>>(
    specs_dir: &Path,
    output: &Path,
    tags: &[S],
    format: DocFormat,
) -> Result<usize> {
    let features = load_feature_files(specs_dir)?;
    let scenarios = filter_scenarios_by_tags(&features, tags);
    let content = match format {
        DocFormat::Markdown => render_markdown(&scenarios),
        DocFormat::Html => render_html(&scenarios),
    };
    crate::io::atomic_write(output, content.as_bytes())?;
    Ok(scenarios.len())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncrementalUpdate {
    pub scenarios_count: usize,
    /// `##` sections kept from the existing document.
    pub preserved_sections: Vec<String>,
}

/// Regenerate the feature sections of an existing markdown document while
/// keeping its introduction and every `##` section not named after a
/// feature.
pub fn generate_docs_incremental<S: AsRef<str>>(
    specs_dir: &Path,
    doc_path: &Path,
    tags: &[S],
) -> Result<IncrementalUpdate> {
    let features = load_feature_files(specs_dir)?;
    let feature_names: Vec<&str> = features.values().map(|f| f.name.as_str()).collect();

    let mut preserved_sections = Vec::new();
    let mut introduction = String::new();
    if doc_path.exists() {
        let existing = std::fs::read_to_string(doc_path)?;
        let mut keep = true;
        for line in existing.lines() {
            if let Some(heading) = section_heading(line) {
                keep = !feature_names.contains(&heading);
                if keep {
                    preserved_sections.push(heading.to_string());
                }
            }
            if keep {
                introduction.push_str(line);
                introduction.push('\n');
            }
        }
    }
    let introduction = introduction.trim();

    let scenarios = filter_scenarios_by_tags(&features, tags);
    let generated = render_markdown(&scenarios);
    let content = if introduction.is_empty() {
        generated
    } else {
        let body = generated
            .strip_prefix("# Documentation\n")
            .map(str::trim_start)
            .unwrap_or(&generated);
        format!("{introduction}\n\n{body}")
    };
    crate::io::atomic_write(doc_path, content.as_bytes())?;

    Ok(IncrementalUpdate {
        scenarios_count: scenarios.len(),
        preserved_sections,
    })
}

/// `## Title` → `Title`. Deeper headings are not section boundaries.
fn section_heading(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if rest.starts_with('#') || !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(rest.trim())
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioCoverage {
    pub name: String,
    pub file: String,
    pub feature: String,
    pub has_test: bool,
    pub test_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub scenarios: Vec<ScenarioCoverage>,
    pub tested: usize,
    pub total: usize,
    pub percentage: f64,
}

impl CoverageReport {
    pub fn untested(&self) -> impl Iterator<Item = &ScenarioCoverage> {
        self.scenarios.iter().filter(|s| !s.has_test)
    }
}

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

fn is_test_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let in_tests_dir = path
        .parent()
        .and_then(|p| p.file_name())
        .is_some_and(|d| d == "tests");
    (name.starts_with("test") && name.ends_with(".py"))
        || name.ends_with("_test.py")
        || name.ends_with("_test.rs")
        || (in_tests_dir && name.ends_with(".rs"))
        || [".test.js", ".test.ts", ".spec.js", ".spec.ts"]
            .iter()
            .any(|ext| name.ends_with(ext))
}

/// Test files under `project`, skipping VCS and build directories.
pub fn find_test_files(project: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = WalkDir::new(project)
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && e.file_name()
                    .to_str()
                    .is_some_and(|n| SKIPPED_DIRS.contains(&n)))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_test_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// A scenario counts as tested when its name, as written or snake_cased,
/// appears (case-insensitively) in some test file.
pub fn analyze_coverage(specs_dir: &Path, project: &Path) -> Result<CoverageReport> {
    let features = load_feature_files(specs_dir)?;
    let tests: Vec<(String, String)> = find_test_files(project)
        .into_iter()
        .filter_map(|p| {
            let content = crate::io::read_text_lossless(&p)?.to_lowercase();
            let name = p.file_name()?.to_string_lossy().into_owned();
            Some((name, content))
        })
        .collect();

    let mut scenarios = Vec::new();
    for (file, feature) in &features {
        for scenario in &feature.scenarios {
            let plain = scenario.name.to_lowercase();
            let snake = plain.replace(' ', "_");
            let test_file = tests
                .iter()
                .find(|(_, content)| content.contains(&snake) || content.contains(&plain))
                .map(|(name, _)| name.clone());
            scenarios.push(ScenarioCoverage {
                name: scenario.name.clone(),
                file: file.clone(),
                feature: feature.name.clone(),
                has_test: test_file.is_some(),
                test_file,
            });
        }
    }

    let tested = scenarios.iter().filter(|s| s.has_test).count();
    let total = scenarios.len();
    let percentage = if total > 0 {
        tested as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    Ok(CoverageReport {
        scenarios,
        tested,
        total,
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CART: &str = "Feature: Cart\n\n  @user\n  Scenario: Add item to cart\n    Given an EMPTY cart\n    When I add a book\n    Then the cart shows 1 item\n\n  @technical\n  Scenario: Cart persists in session\n    Then the cart id is stored\n";

    fn specs() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cart.feature"), CART).unwrap();
        dir
    }

    #[test]
    fn prose_from_steps() {
        let text = "Scenario: Add item\n  Given an EMPTY cart\n  When I Add a book\n  Then the cart shows 1 item\n  But NOT twice";
        assert_eq!(
            scenario_to_prose(text),
            "Add item: An empty cart, i add a book, the cart shows 1 item, not twice."
        );
        assert_eq!(scenario_to_prose("Scenario: Bare"), "Bare.");
        assert_eq!(scenario_to_prose(""), "");
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html("<script>\"x\" & 'y'</script>"),
            "&lt;script&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn formats_parse() {
        assert_eq!("markdown".parse::<DocFormat>().unwrap(), DocFormat::Markdown);
        assert_eq!("html".parse::<DocFormat>().unwrap(), DocFormat::Html);
        let err = "pdf".parse::<DocFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown format: pdf");
    }

    #[test]
    fn markdown_for_user_scenarios() {
        let dir = specs();
        let out = dir.path().join("user.md");
        let n = generate_docs(dir.path(), &out, &["@user"], DocFormat::Markdown).unwrap();
        assert_eq!(n, 1);
        let doc = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            doc,
            "# Documentation\n\n## Cart\n\n### Add item to cart\nAdd item to cart: An empty cart, i add a book, the cart shows 1 item.\n"
        );
    }

    #[test]
    fn html_for_all_scenarios() {
        let dir = specs();
        let out = dir.path().join("all.html");
        generate_docs(dir.path(), &out, &["@user", "@technical"], DocFormat::Html).unwrap();
        let doc = std::fs::read_to_string(&out).unwrap();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert_eq!(doc.matches("<h2>Cart</h2>").count(), 1);
        assert!(doc.contains("<h3>Cart persists in session</h3>"));
        assert!(doc.ends_with("</html>"));
    }

    #[test]
    fn incremental_keeps_custom_sections() {
        let dir = specs();
        let doc = dir.path().join("guide.md");
        std::fs::write(
            &doc,
            "# Shop Guide\n\nWelcome.\n\n## Cart\n\nstale text\n\n### Old scenario\nold\n\n## FAQ\n\nAsk us.\n",
        )
        .unwrap();

        let result = generate_docs_incremental(dir.path(), &doc, &["@user"]).unwrap();
        assert_eq!(result.scenarios_count, 1);
        assert_eq!(result.preserved_sections, vec!["FAQ"]);

        let content = std::fs::read_to_string(&doc).unwrap();
        assert!(content.starts_with("# Shop Guide\n\nWelcome.\n\n## FAQ\n\nAsk us.\n\n## Cart\n"));
        assert!(!content.contains("stale text"));
        assert!(!content.contains("Old scenario"));
        assert!(!content.contains("# Documentation"));
        assert!(content.contains("### Add item to cart"));
    }

    #[test]
    fn incremental_without_existing_doc_writes_fresh() {
        let dir = specs();
        let doc = dir.path().join("new.md");
        generate_docs_incremental(dir.path(), &doc, &["@technical"]).unwrap();
        let content = std::fs::read_to_string(&doc).unwrap();
        assert!(content.starts_with("# Documentation\n"));
        assert!(content.contains("### Cart persists in session"));
    }

    #[test]
    fn coverage_matches_names_in_test_files() {
        let specs = specs();
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join("tests")).unwrap();
        std::fs::create_dir_all(project.path().join("target/debug")).unwrap();
        std::fs::write(
            project.path().join("tests/cart.rs"),
            "#[test]\nfn add_item_to_cart() {}\n",
        )
        .unwrap();
        std::fs::write(
            project.path().join("target/debug/cart_persists_in_session_test.rs"),
            "cart persists in session",
        )
        .unwrap();

        let report = analyze_coverage(specs.path(), project.path()).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.tested, 1);
        assert!((report.percentage - 50.0).abs() < 1e-9);
        let add = &report.scenarios[0];
        assert!(add.has_test);
        assert_eq!(add.test_file.as_deref(), Some("cart.rs"));
        let untested: Vec<&str> = report.untested().map(|s| s.name.as_str()).collect();
        assert_eq!(untested, vec!["Cart persists in session"]);
    }

    #[test]
    fn test_file_patterns() {
        assert!(is_test_file(Path::new("src/test_cart.py")));
        assert!(is_test_file(Path::new("src/cart_test.py")));
        assert!(is_test_file(Path::new("web/cart.spec.ts")));
        assert!(is_test_file(Path::new("crate/tests/integration.rs")));
        assert!(!is_test_file(Path::new("src/cart.rs")));
        assert!(!is_test_file(Path::new("src/cart.py")));
    }
}
