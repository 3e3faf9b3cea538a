use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

use super::similarity::text_ratio;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// The name followed by the scenario's step lines.
    pub text: String,
    pub tags: Vec<String>,
}

impl Scenario {
    /// The scenario as Gherkin, `Scenario:` keyword included.
    pub fn gherkin(&self) -> String {
        format!("Scenario: {}", self.text)
    }

    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|t| self.tags.iter().any(|own| own == t.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedScenario {
    pub file: String,
    pub feature: String,
    pub text: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarScenario {
    pub name: String,
    pub similarity: f64,
    #[serde(flatten)]
    pub scenario: IndexedScenario,
}

// ---------------------------------------------------------------------------
// Line helpers
// ---------------------------------------------------------------------------

/// `Scenario: <name>` → `<name>`.
pub(crate) fn scenario_title(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix("Scenario:").map(str::trim)
}

/// A line made only of `@tag` tokens.
pub(crate) fn is_tag_line(line: &str) -> bool {
    let mut tokens = line.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| t.len() > 1 && t.starts_with('@'))
}

/// Byte range of each line, trailing newline included.
pub(crate) fn line_spans(content: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0;
    for line in content.split_inclusive('\n') {
        spans.push(start..start + line.len());
        start += line.len();
    }
    spans
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a `.feature` file. Tags are the tag lines directly above a
/// scenario; a scenario's steps run until the next tag line or scenario.
pub fn parse_feature(content: &str) -> Feature {
    let name = content
        .lines()
        .find_map(|l| l.split_once("Feature:").map(|(_, rest)| rest.trim()))
        .filter(|n| !n.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    let mut scenarios = Vec::new();
    let mut pending_tags: Vec<String> = Vec::new();
    let mut current: Option<(String, Vec<String>, Vec<&str>)> = None;

    let mut finish = |current: &mut Option<(String, Vec<String>, Vec<&str>)>| {
        if let Some((name, tags, steps)) = current.take() {
            let body = steps.join("\n");
            let body = body.trim();
            let text = if body.is_empty() {
                name.clone()
            } else {
                format!("{name}\n{body}")
            };
            scenarios.push(Scenario { name, text, tags });
        }
    };

    for line in content.lines() {
        if is_tag_line(line) {
            finish(&mut current);
            pending_tags.extend(line.split_whitespace().map(str::to_string));
        } else if let Some(title) = scenario_title(line) {
            finish(&mut current);
            current = Some((title.to_string(), std::mem::take(&mut pending_tags), Vec::new()));
        } else if let Some((_, _, steps)) = current.as_mut() {
            steps.push(line);
        } else if !line.trim().is_empty() {
            // Text between tags and anything but a scenario drops the tags.
            pending_tags.clear();
        }
    }
    finish(&mut current);

    Feature { name, scenarios }
}

/// Parse every `*.feature` file directly inside `specs_dir`, keyed by file
/// name.
pub fn load_feature_files(specs_dir: &Path) -> Result<BTreeMap<String, Feature>> {
    let mut features = BTreeMap::new();
    if !specs_dir.is_dir() {
        return Ok(features);
    }
    for entry in std::fs::read_dir(specs_dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().map_or(true, |e| e != "feature") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)?;
        features.insert(file_name.to_string(), parse_feature(&content));
    }
    tracing::debug!("loaded {} feature files from {}", features.len(), specs_dir.display());
    Ok(features)
}

/// Scenario name → where it lives. A name defined twice keeps the last
/// occurrence in file-name order.
pub fn build_scenario_index(features: &BTreeMap<String, Feature>) -> BTreeMap<String, IndexedScenario> {
    let mut index = BTreeMap::new();
    for (file, feature) in features {
        for scenario in &feature.scenarios {
            index.insert(
                scenario.name.clone(),
                IndexedScenario {
                    file: file.clone(),
                    feature: feature.name.clone(),
                    text: scenario.text.clone(),
                    tags: scenario.tags.clone(),
                },
            );
        }
    }
    index
}

/// Scenarios whose name resembles `query` at or above `threshold`, most
/// similar first.
pub fn find_similar_scenarios(
    query: &str,
    index: &BTreeMap<String, IndexedScenario>,
    threshold: f64,
) -> Vec<SimilarScenario> {
    let mut matches: Vec<SimilarScenario> = index
        .iter()
        .filter_map(|(name, scenario)| {
            let similarity = text_ratio(query, name);
            (similarity >= threshold).then(|| SimilarScenario {
                name: name.clone(),
                similarity,
                scenario: scenario.clone(),
            })
        })
        .collect();
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches
}

/// Byte range of the named scenario: its tag lines, title and steps, up to
/// and including the last non-blank line before the next scenario.
pub(crate) fn find_scenario_span(content: &str, name: &str) -> Option<Range<usize>> {
    let spans = line_spans(content);
    let line = |i: usize| strip_eol(&content[spans[i].clone()]);

    let title = (0..spans.len()).find(|&i| scenario_title(line(i)) == Some(name))?;
    let mut first = title;
    while first > 0 && is_tag_line(line(first - 1)) {
        first -= 1;
    }
    let mut last = title;
    for i in title + 1..spans.len() {
        let l = line(i);
        if is_tag_line(l) || scenario_title(l).is_some() {
            break;
        }
        if !l.trim().is_empty() {
            last = i;
        }
    }
    Some(spans[first].start..spans[last].end)
}
