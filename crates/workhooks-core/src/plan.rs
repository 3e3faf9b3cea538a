//! Plan files: markdown documents tracking a unit of work.
//!
//! A plan carries a `**Goal**:` line, optional `**Created**:` line,
//! `## User Requirements` / `## Technical Specifications` sections, and
//! `<!-- TODO -->` / `<!-- DONE -->` markers placed on the line above each
//! `Scenario:` they track.

use crate::error::{HookError, Result};
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const TODO_MARKER: &str = "<!-- TODO -->";
pub const DONE_MARKER: &str = "<!-- DONE -->";

const USER_REQUIREMENTS: &str = "## User Requirements";
const TECHNICAL_SPECIFICATIONS: &str = "## Technical Specifications";
const NOTES: &str = "## Notes";

static GOAL_RE: OnceLock<Regex> = OnceLock::new();
static CREATED_RE: OnceLock<Regex> = OnceLock::new();

fn goal_re() -> &'static Regex {
    GOAL_RE.get_or_init(|| Regex::new(r"\*\*Goal\*\*:\s*(.+)").unwrap())
}

fn created_re() -> &'static Regex {
    CREATED_RE.get_or_init(|| Regex::new(r"\*\*Created\*\*:\s*(.+)").unwrap())
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

pub fn goal(content: &str) -> Option<String> {
    goal_re()
        .captures(content)
        .map(|c| c[1].trim().to_string())
}

pub fn created(content: &str) -> Option<String> {
    created_re()
        .captures(content)
        .map(|c| c[1].trim().to_string())
}

/// Names of scenarios whose marker line reads `<!-- DONE -->`.
pub fn completed_scenarios(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut done = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if !line.contains(DONE_MARKER) {
            continue;
        }
        let Some(next) = lines.get(i + 1) else {
            continue;
        };
        let next = next.trim();
        if next.starts_with("Scenario:") {
            done.push(next.replace("Scenario:", "").trim().to_string());
        }
    }
    done
}

/// Text after `heading` up to `terminator` (or end of document), trimmed.
/// The heading must be followed by a line break.
fn section(content: &str, heading: &str, terminator: &str) -> Option<String> {
    let start = content.find(heading)?;
    let rest = &content[start + heading.len()..];
    let ws_len = rest.len() - rest.trim_start().len();
    let newline = rest[..ws_len].rfind('\n')?;
    let body = &rest[newline + 1..];
    let end = body.find(terminator).unwrap_or(body.len());
    Some(body[..end].trim().to_string())
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub todo_count: usize,
    pub done_count: usize,
}

impl Completion {
    pub fn of(content: &str) -> Self {
        Self {
            todo_count: content.matches(TODO_MARKER).count(),
            done_count: content.matches(DONE_MARKER).count(),
        }
    }

    pub fn total(&self) -> usize {
        self.todo_count + self.done_count
    }

    /// Whole percent done, rounded down. A plan with no markers is complete.
    pub fn percentage(&self) -> u32 {
        match self.total() {
            0 => 100,
            total => (self.done_count * 100 / total) as u32,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percentage() >= 100
    }
}

/// A plan has at least one of the two requirement sections and at least one
/// marker.
pub fn is_plan(content: &str) -> bool {
    let has_section = content.contains(USER_REQUIREMENTS) || content.contains(TECHNICAL_SPECIFICATIONS);
    let has_markers = content.contains(TODO_MARKER) || content.contains(DONE_MARKER);
    has_section && has_markers
}

// ---------------------------------------------------------------------------
// Metadata for review
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_requirements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_specifications: Option<String>,
    pub todo_count: usize,
    pub done_count: usize,
}

pub fn extract_metadata(content: &str) -> PlanMetadata {
    let completion = Completion::of(content);
    PlanMetadata {
        goal: goal(content),
        created: created(content),
        user_requirements: section(content, USER_REQUIREMENTS, TECHNICAL_SPECIFICATIONS),
        technical_specifications: section(content, TECHNICAL_SPECIFICATIONS, NOTES),
        todo_count: completion.todo_count,
        done_count: completion.done_count,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCategory {
    BackendService,
    Hook,
    UiComponent,
    DatabaseMigration,
}

const CATEGORY_KEYWORDS: &[(PlanCategory, &[&str])] = &[
    (
        PlanCategory::BackendService,
        &["api", "endpoint", "http", "rest", "/api/", "jwt", "auth"],
    ),
    (
        PlanCategory::Hook,
        &["hook", "bash", "cli", "git push", "pre-push", "command"],
    ),
    (
        PlanCategory::UiComponent,
        &["web", "ui", "page", "component", "dashboard", "form", "button"],
    ),
    (
        PlanCategory::DatabaseMigration,
        &["database", "schema", "migration", "table", "postgres", "sql"],
    ),
];

/// Categories of system a plan describes, by case-insensitive substring
/// keywords. Order is fixed: backend, hook, ui, database.
pub fn detect_plan_context(content: &str) -> Vec<PlanCategory> {
    let lower = content.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(cat, _)| *cat)
        .collect()
}

pub fn load_plan(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(HookError::PlanNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// A plan found on disk, with the ancestor directory it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLocation {
    pub path: PathBuf,
    pub search_root: PathBuf,
}

impl PlanLocation {
    /// The plan resolves (symlinks followed) to a file inside its search root.
    pub fn is_contained(&self) -> bool {
        let (Ok(path), Ok(root)) = (self.path.canonicalize(), self.search_root.canonicalize())
        else {
            return false;
        };
        match path.strip_prefix(&root) {
            Ok(rel) => paths::is_safe_relative(rel),
            Err(_) => false,
        }
    }
}

/// Search `start` and up to three parent directories for a plan file, looking
/// at top-level `*.md` files first and then the conventional plan directories.
pub fn find_plan_file(start: &Path) -> Option<PlanLocation> {
    let mut current = start.to_path_buf();
    for _ in 0..4 {
        if let Some(path) = first_plan_in(&current) {
            return Some(PlanLocation {
                path,
                search_root: current,
            });
        }
        for sub in paths::PLAN_SEARCH_DIRS {
            let dir = current.join(sub);
            if !dir.is_dir() {
                continue;
            }
            if let Some(path) = first_plan_in(&dir) {
                return Some(PlanLocation {
                    path,
                    search_root: current,
                });
            }
        }
        match current.parent() {
            Some(p) => current = p.to_path_buf(),
            None => break,
        }
    }
    None
}

fn first_plan_in(dir: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    candidates.sort();
    candidates
        .into_iter()
        .find(|p| crate::io::read_text_lossless(p).is_some_and(|c| is_plan(&c)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
