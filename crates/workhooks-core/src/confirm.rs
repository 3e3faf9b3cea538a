//! Operator confirmation, read from the controlling terminal rather than the
//! hook's stdin (which carries the hook JSON).

use crate::error::{HookError, Result};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};

pub trait ConfirmationProvider {
    /// Ask a yes/no question. `Err(HookError::NoTerminal)` when nobody can
    /// answer.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;

    /// Progress text for the operator. Goes to stderr; stdout carries the
    /// hook decision.
    fn show(&mut self, text: &str) {
        eprintln!("{text}");
    }
}

/// Empty input, `y` and `yes` (any case) are affirmative.
pub fn is_affirmative(response: &str) -> bool {
    matches!(response.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

/// Prompts on stderr and reads one line from `/dev/tty`.
#[derive(Debug, Default)]
pub struct TtyConfirmation;

impl ConfirmationProvider for TtyConfirmation {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let tty = std::fs::File::open("/dev/tty").map_err(|e| {
            tracing::debug!("no controlling terminal: {e}");
            HookError::NoTerminal
        })?;
        let mut stderr = std::io::stderr();
        write!(stderr, "{prompt} ")?;
        stderr.flush()?;

        let mut line = String::new();
        BufReader::new(tty).read_line(&mut line)?;
        Ok(is_affirmative(&line))
    }
}

/// Answers from a fixed script; once exhausted, reports no terminal.
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    answers: VecDeque<bool>,
    pub prompts: Vec<String>,
    pub notes: Vec<String>,
}

impl ScriptedConfirmation {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            prompts: Vec::new(),
            notes: Vec::new(),
        }
    }
}

impl ConfirmationProvider for ScriptedConfirmation {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or(HookError::NoTerminal)
    }

    fn show(&mut self, text: &str) {
        self.notes.push(text.to_string());
    }
}

/// Declines everything. For environments where a destructive rewrite must
/// never be approved.
#[derive(Debug, Default)]
pub struct DeclineAll;

impl ConfirmationProvider for DeclineAll {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_responses() {
        for r in ["", "\n", "y", "Y", "yes", "YES", " yes \n"] {
            assert!(is_affirmative(r), "{r:?}");
        }
        for r in ["n", "no", "nope", "yess", "q"] {
            assert!(!is_affirmative(r), "{r:?}");
        }
    }

    #[test]
    fn scripted_answers_in_order_then_no_terminal() {
        let mut c = ScriptedConfirmation::new([true, false]);
        assert!(c.confirm("first?").unwrap());
        assert!(!c.confirm("second?").unwrap());
        assert!(matches!(c.confirm("third?"), Err(HookError::NoTerminal)));
        assert_eq!(c.prompts, vec!["first?", "second?", "third?"]);
    }

    #[test]
    fn decline_all() {
        assert!(!DeclineAll.confirm("anything?").unwrap());
    }
}
