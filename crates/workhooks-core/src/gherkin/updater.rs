//! Apply plan-driven edits to living `.feature` files.

use crate::error::{HookError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

use super::feature::find_scenario_span;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum SpecAction {
    /// Append a new scenario at the end of the file.
    Creates { scenario_text: String },
    Replaces {
        scenario_name: String,
        scenario_text: String,
    },
    /// Append steps to an existing scenario.
    Extends {
        scenario_name: String,
        additional_steps: String,
    },
    Removes { scenario_name: String },
    /// Tag with `@deprecated` and a comment, keeping the scenario.
    Deprecates {
        scenario_name: String,
        note: String,
    },
}

impl SpecAction {
    /// Build an action from its verb and the fields that verb needs; unused
    /// fields are ignored.
    pub fn from_parts(
        action: &str,
        scenario_name: &str,
        scenario_text: &str,
        additional_steps: &str,
        note: &str,
    ) -> Result<Self> {
        let name = scenario_name.to_string();
        Ok(match action {
            "creates" => Self::Creates {
                scenario_text: scenario_text.to_string(),
            },
            "replaces" => Self::Replaces {
                scenario_name: name,
                scenario_text: scenario_text.to_string(),
            },
            "extends" => Self::Extends {
                scenario_name: name,
                additional_steps: additional_steps.to_string(),
            },
            "removes" => Self::Removes {
                scenario_name: name,
            },
            "deprecates" => Self::Deprecates {
                scenario_name: name,
                note: note.to_string(),
            },
            other => return Err(HookError::UnknownAction(other.to_string())),
        })
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Creates { .. } => "creates",
            Self::Replaces { .. } => "replaces",
            Self::Extends { .. } => "extends",
            Self::Removes { .. } => "removes",
            Self::Deprecates { .. } => "deprecates",
        }
    }
}

static BLANK_RUN_RE: OnceLock<Regex> = OnceLock::new();

fn blank_run_re() -> &'static Regex {
    BLANK_RUN_RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn locate(content: &str, name: &str) -> Result<std::ops::Range<usize>> {
    find_scenario_span(content, name).ok_or_else(|| HookError::ScenarioNotFound(name.to_string()))
}

fn with_newline(text: &str) -> String {
    let mut s = text.to_string();
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

pub fn apply_to_content(content: &str, action: &SpecAction) -> Result<String> {
    let updated = match action {
        SpecAction::Creates { scenario_text } => {
            let mut out = content.to_string();
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(scenario_text);
            out.push('\n');
            out
        }
        SpecAction::Replaces {
            scenario_name,
            scenario_text,
        } => {
            let span = locate(content, scenario_name)?;
            format!(
                "{}{}{}",
                &content[..span.start],
                with_newline(scenario_text),
                &content[span.end..]
            )
        }
        SpecAction::Extends {
            scenario_name,
            additional_steps,
        } => {
            let span = locate(content, scenario_name)?;
            let old = content[span.clone()].trim_end();
            format!(
                "{}{old}\n{}{}",
                &content[..span.start],
                with_newline(additional_steps),
                &content[span.end..]
            )
        }
        SpecAction::Removes { scenario_name } => {
            let span = locate(content, scenario_name)?;
            let joined = format!("{}{}", &content[..span.start], &content[span.end..]);
            blank_run_re().replace_all(&joined, "\n\n").into_owned()
        }
        SpecAction::Deprecates {
            scenario_name,
            note,
        } => {
            let span = locate(content, scenario_name)?;
            let old = &content[span.clone()];
            let indent: String = old.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
            format!(
                "{}{indent}@deprecated\n{indent}# {note}\n{old}{}",
                &content[..span.start],
                &content[span.end..]
            )
        }
    };
    Ok(updated)
}

/// Rewrite `feature_file` with `action` applied.
pub fn apply_action(feature_file: &Path, action: &SpecAction) -> Result<()> {
    let content = std::fs::read_to_string(feature_file)?;
    let updated = apply_to_content(&content, action)?;
    crate::io::atomic_write(feature_file, updated.as_bytes())?;
    tracing::debug!("applied {} to {}", action.verb(), feature_file.display());
    Ok(())
}
