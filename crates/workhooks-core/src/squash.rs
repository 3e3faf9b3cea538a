//! Pre-push squash workflow.
//!
//! ```text
//! Idle ─▶ CommittedStaged? ─▶ BackedUp ─▶ Squashed ─▶ Validated ─▶ Pushed
//!   │                            │           │            │
//!   └──────────── Denied ◀───────┴───────────┘            └─▶ RolledBack
//! ```
//!
//! The backup tag is created before `reset --soft` and is never deleted
//! here; every denial issued after it exists names it.

use crate::classifier::classify_command;
use crate::config::Config;
use crate::confirm::ConfirmationProvider;
use crate::error::{HookError, Result};
use crate::git::Git;
use crate::history::{has_wip_commits, Inspector};
use crate::hook::{HookInput, PermissionDecision};
use crate::interrupt::Interrupt;
use crate::message;
use crate::paths::BACKUP_TAG_PREFIX;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outcome / SquashState
// ---------------------------------------------------------------------------

/// Why the hook answered the way it did. Serialized into the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AllowNonPush,
    AllowFeatureBranch,
    AllowNoCommits,
    AllowNoWip,
    AllowSingleWip,
    AllowSquashSuccess,
    DenyParseError,
    DenyNoGit,
    DenyFetchTimeout,
    DenyFetchFailed,
    DenyQueryTimeout,
    DenyConflicts,
    DenyInterrupted,
    DenyNoTerminal,
    DenyUserCancelled,
    DenySquashFailed,
    DenySquashInvalid,
    DenyFinalCancelled,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SquashState {
    Idle,
    CommittedStaged,
    BackedUp,
    Squashed,
    Validated,
    Pushed,
    RolledBack,
    Denied,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Report {
    pub decision: PermissionDecision,
    pub outcome: Outcome,
    pub state: SquashState,
    pub wip_count: usize,
    pub plan_file: Option<String>,
    pub backup_tag: Option<String>,
    pub commit_message: Option<String>,
}

impl Report {
    fn allow(outcome: Outcome, state: SquashState) -> Self {
        Self {
            decision: PermissionDecision::allow(),
            outcome,
            state,
            wip_count: 0,
            plan_file: None,
            backup_tag: None,
            commit_message: None,
        }
    }

    fn deny(outcome: Outcome, reason: impl Into<String>) -> Self {
        Self {
            decision: PermissionDecision::deny(reason),
            outcome,
            state: SquashState::Denied,
            wip_count: 0,
            plan_file: None,
            backup_tag: None,
            commit_message: None,
        }
    }

    fn with_wip(mut self, wip_count: usize) -> Self {
        self.wip_count = wip_count;
        self
    }

    fn with_tag(mut self, tag: &str) -> Self {
        self.backup_tag = Some(tag.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Evaluate one pre-push hook invocation from its raw stdin JSON.
pub fn evaluate(
    raw_input: &str,
    git: &Git,
    config: &Config,
    confirm: &mut dyn ConfirmationProvider,
    interrupt: &Interrupt,
) -> Report {
    let input = match HookInput::parse(raw_input) {
        Ok(input) => input,
        Err(e) => {
            return Report::deny(Outcome::DenyParseError, format!("Error parsing hook input: {e}"))
        }
    };

    let command = input.command();
    tracing::debug!("received command: {command}");
    if !classify_command(command).is_push() {
        return Report::allow(Outcome::AllowNonPush, SquashState::Idle);
    }

    if let Err(e) = git.ensure_available() {
        return Report::deny(Outcome::DenyNoGit, e.to_string());
    }

    SquashWorkflow::new(git, config, confirm, interrupt.clone()).run()
}

/// Exactly one commit ahead of the remote tip and the backup tag still
/// present. Any git error counts as invalid.
pub fn validate_squash(inspector: &Inspector<'_>, backup_tag: &str) -> bool {
    let count = match inspector.ahead_count() {
        Ok(n) => n,
        Err(e) => {
            tracing::debug!("squash validation failed: {e}");
            return false;
        }
    };
    if count != 1 {
        tracing::debug!("squash validation failed: {count} commits instead of 1");
        return false;
    }
    match inspector.tag_exists(backup_tag) {
        Ok(true) => true,
        Ok(false) => {
            tracing::debug!("squash validation failed: backup tag {backup_tag} not found");
            false
        }
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// SquashWorkflow
// ---------------------------------------------------------------------------

pub struct SquashWorkflow<'a> {
    git: &'a Git,
    config: &'a Config,
    confirm: &'a mut dyn ConfirmationProvider,
    interrupt: Interrupt,
    state: SquashState,
}

impl<'a> SquashWorkflow<'a> {
    pub fn new(
        git: &'a Git,
        config: &'a Config,
        confirm: &'a mut dyn ConfirmationProvider,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            git,
            config,
            confirm,
            interrupt,
            state: SquashState::Idle,
        }
    }

    fn enter(&mut self, next: SquashState) {
        tracing::debug!(from = ?self.state, to = ?next, "squash state transition");
        self.state = next;
    }

    /// Run the workflow for an already-classified push command.
    pub fn run(mut self) -> Report {
        let mut report = match self.try_run() {
            Ok(report) => report,
            Err(e) => {
                tracing::debug!("unexpected error: {e}");
                let tag = self.interrupt.backup_tag();
                let reason = match &tag {
                    Some(tag) => format!("Hook error: {e}\nBackup tag preserved: {tag}"),
                    None => format!("Hook error: {e}"),
                };
                let mut report = Report::deny(Outcome::Error, reason);
                report.backup_tag = tag;
                report
            }
        };
        if !report.decision.is_allow() && self.state != SquashState::RolledBack {
            self.enter(SquashState::Denied);
        }
        report.state = self.state;
        report
    }

    fn try_run(&mut self) -> Result<Report> {
        let branch = Inspector::current_branch(self.git, self.config)?;
        tracing::debug!("current branch: {branch}");
        if !self.config.is_protected(&branch) {
            return Ok(Report::allow(Outcome::AllowFeatureBranch, self.state));
        }

        let inspector = Inspector::new(self.git, self.config, &branch);
        let base = inspector.base().to_string();

        if let Err(e) = inspector.fetch() {
            return inspection_denial(e);
        }
        let commits = match inspector.commits_to_push() {
            Ok(c) => c,
            Err(e) => return inspection_denial(e),
        };
        if commits.is_empty() {
            return Ok(Report::allow(Outcome::AllowNoCommits, self.state));
        }
        let lines: Vec<String> = commits
            .iter()
            .map(|c| format!("{} {}", c.hash, c.subject))
            .collect();
        if !has_wip_commits(&lines) {
            return Ok(Report::allow(Outcome::AllowNoWip, self.state));
        }

        let mut wip_count = commits.len();
        tracing::debug!("found {wip_count} WIP commits");

        if wip_count == 1 {
            self.strip_single_wip()?;
            return Ok(Report::allow(Outcome::AllowSingleWip, self.state).with_wip(1));
        }

        if inspector.has_merge_conflicts() {
            return Ok(Report::deny(
                Outcome::DenyConflicts,
                format!(
                    "❌ Merge conflicts with {base}\nResolve conflicts first: git rebase {base}"
                ),
            )
            .with_wip(wip_count));
        }

        if self.interrupt.is_interrupted() {
            return Ok(Report::deny(Outcome::DenyInterrupted, "Interrupted by user").with_wip(wip_count));
        }

        let auto_staged = inspector.has_unstaged_changes();
        if auto_staged {
            self.auto_commit_unstaged()?;
            wip_count += 1;
        }

        let plan_file = inspector.find_plan_file().filter(|p| p.exists());
        let commit_message = match &plan_file {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                message::from_plan(
                    &content,
                    &inspector.diff_summary(),
                    wip_count,
                    &self.config.attribution,
                )
            }
            None => message::from_subjects(
                &inspector.subjects()?,
                wip_count,
                &self.config.attribution,
            ),
        };
        let plan_display = plan_file.as_ref().map(|p| {
            p.strip_prefix(self.git.dir())
                .unwrap_or(p)
                .display()
                .to_string()
        });

        self.confirm.show(&pre_push_summary(
            auto_staged,
            wip_count,
            plan_display.as_deref(),
            &commit_message,
        ));

        match self.confirm.confirm("Ready to squash and push? (Y/n)") {
            Ok(true) => {}
            Ok(false) => {
                return Ok(Report::deny(Outcome::DenyUserCancelled, "Push cancelled by user")
                    .with_wip(wip_count));
            }
            Err(HookError::NoTerminal) => {
                return Ok(Report::deny(Outcome::DenyNoTerminal, HookError::NoTerminal.to_string())
                    .with_wip(wip_count));
            }
            Err(e) => return Err(e),
        }

        let tag = self.create_backup_tag()?;
        self.confirm.show(&format!("\nBackup tag created: {tag}"));

        if self.interrupt.is_interrupted() {
            return Ok(Report::deny(Outcome::DenyInterrupted, self.interrupt.denial_reason())
                .with_wip(wip_count)
                .with_tag(&tag));
        }

        if let Err(e) = self.squash(&base, &commit_message) {
            return Ok(Report::deny(
                Outcome::DenySquashFailed,
                format!("Squash failed: {e}\nBackup tag preserved: {tag}"),
            )
            .with_wip(wip_count)
            .with_tag(&tag));
        }

        if !validate_squash(&inspector, &tag) {
            return Ok(Report::deny(
                Outcome::DenySquashInvalid,
                format!("Squash validation failed\nBackup tag preserved: {tag}"),
            )
            .with_wip(wip_count)
            .with_tag(&tag));
        }
        self.enter(SquashState::Validated);
        self.confirm
            .show(&format!("✓ Squashed {wip_count} commits into 1"));

        let squashed = self
            .git
            .run(&["log", "-1", "--pretty=format:%B"], None)
            .unwrap_or_default();
        self.confirm.show(&format!(
            "\n━━━ Squashed Commit ━━━\n{squashed}\n━━━━━━━━━━━━━━━━━━━━━━━\n"
        ));

        // A missing terminal here counts as "no": the squash is undone.
        let push = self.confirm.confirm("Push this commit? (Y/n)").unwrap_or(false);
        if !push {
            if let Err(e) = self.git.run(&["reset", "--hard", &tag], None) {
                return Ok(Report::deny(
                    Outcome::DenySquashFailed,
                    format!("Rollback failed: {e}\nBackup tag preserved: {tag}"),
                )
                .with_wip(wip_count)
                .with_tag(&tag));
            }
            self.enter(SquashState::RolledBack);
            return Ok(Report::deny(
                Outcome::DenyFinalCancelled,
                "Squash cancelled - restored to original state",
            )
            .with_wip(wip_count)
            .with_tag(&tag));
        }

        self.enter(SquashState::Pushed);
        let mut report = Report::allow(Outcome::AllowSquashSuccess, self.state)
            .with_wip(wip_count)
            .with_tag(&tag);
        report.plan_file = plan_display;
        report.commit_message = Some(commit_message);
        Ok(report)
    }

    /// Single-commit fast path: drop the `WIP:` prefix by amending in place.
    fn strip_single_wip(&mut self) -> Result<()> {
        tracing::debug!("single WIP commit, removing prefix");
        let full = self.git.run(&["log", "--format=%B", "-n", "1", "HEAD"], None)?;
        let full = full.trim();
        if full.starts_with(message::WIP_PREFIX) {
            let stripped = message::strip_wip_prefix(full);
            self.git.run(&["commit", "--amend", "-m", stripped], None)?;
            self.confirm.show("Removed WIP prefix from single commit");
        }
        Ok(())
    }

    fn auto_commit_unstaged(&mut self) -> Result<()> {
        tracing::debug!("auto-committing unstaged changes");
        self.git.run(&["add", "-A"], None)?;
        self.git
            .run(&["commit", "-m", "WIP: auto-commit unstaged changes"], None)?;
        self.enter(SquashState::CommittedStaged);
        self.confirm.show("Auto-staged and committed unstaged changes");
        Ok(())
    }

    fn create_backup_tag(&mut self) -> Result<String> {
        let sha = self.git.run(&["rev-parse", "--short", "HEAD"], None)?;
        let tag = backup_tag_name(sha.trim(), chrono::Utc::now().timestamp());
        self.git.run(&["tag", &tag], None)?;
        self.interrupt.set_backup_tag(&tag);
        tracing::debug!("created backup tag: {tag}");
        self.enter(SquashState::BackedUp);
        Ok(tag)
    }

    fn squash(&mut self, base: &str, commit_message: &str) -> Result<()> {
        tracing::debug!("squashing commits onto {base}");
        self.git.run(&["reset", "--soft", base], None)?;
        self.git.run(&["commit", "-m", commit_message], None)?;
        self.enter(SquashState::Squashed);
        Ok(())
    }
}

/// The denial for a fetch or commit-listing error the workflow answers
/// itself. Anything else is handed back for the generic fallback.
fn inspection_denial(err: HookError) -> Result<Report> {
    match err {
        HookError::Timeout { command, secs } if command == "fetch" => Ok(Report::deny(
            Outcome::DenyFetchTimeout,
            format!("Fetch timeout - check network connection (waited {secs}s)"),
        )),
        HookError::GitFailed {
            command, stderr, ..
        } if command == "fetch" => Ok(Report::deny(
            Outcome::DenyFetchFailed,
            format!("Fetch failed - check network connection: {stderr}"),
        )),
        HookError::Timeout { command, secs } => Ok(Report::deny(
            Outcome::DenyQueryTimeout,
            format!("git {command} timed out while listing commits to push (waited {secs}s)"),
        )),
        other => Err(other),
    }
}

pub fn backup_tag_name(short_sha: &str, unix_time: i64) -> String {
    format!("{BACKUP_TAG_PREFIX}{short_sha}-{unix_time}")
}

fn pre_push_summary(
    auto_staged: bool,
    wip_count: usize,
    plan_file: Option<&str>,
    commit_message: &str,
) -> String {
    let mut out = String::from("\n━━━ Pre-Push Summary ━━━\n");
    if auto_staged {
        out.push_str("Auto-staged: unstaged changes committed\n");
    }
    out.push_str(&format!("Squashing: {wip_count} WIP commits → 1 commit\n"));
    if let Some(plan) = plan_file {
        out.push_str(&format!("Plan: {plan}\n"));
    }
    out.push_str(&format!("\nFinal commit message:\n{commit_message}\n"));
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
