//! Repository inspection ahead of a push: unpushed commits, WIP detection,
//! working-tree cleanliness and merge-conflict preview.
//!
//! Failure handling is deliberately uneven. A dirty-tree check that times out
//! or errors reports *clean*; a conflict check that times out or errors
//! reports *conflicted*. A fetch that times out or fails is returned to the
//! caller, which denies the push.

use crate::config::Config;
use crate::error::{HookError, Result};
use crate::git::Git;
use crate::message::{self, WIP_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CommitRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub subject: String,
}

impl CommitRecord {
    /// Parse one line of `git rev-list --oneline`.
    pub fn parse_oneline(line: &str) -> Self {
        match line.split_once(' ') {
            Some((hash, subject)) => Self {
                hash: hash.to_string(),
                subject: subject.to_string(),
            },
            None => Self {
                hash: line.to_string(),
                subject: String::new(),
            },
        }
    }

    pub fn is_wip(&self) -> bool {
        self.subject.starts_with(WIP_PREFIX)
    }
}

/// True when any `<hash> <message>` line carries a `WIP:` message.
pub fn has_wip_commits<S: AsRef<str>>(lines: &[S]) -> bool {
    lines
        .iter()
        .any(|l| CommitRecord::parse_oneline(l.as_ref()).is_wip())
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Inspector
// ---------------------------------------------------------------------------

/// Queries against one branch and its remote-tracking counterpart.
pub struct Inspector<'a> {
    git: &'a Git,
    config: &'a Config,
    base: String,
}

impl<'a> Inspector<'a> {
    pub fn new(git: &'a Git, config: &'a Config, branch: &str) -> Self {
        Self {
            git,
            config,
            base: config.base_ref(branch),
        }
    }

    /// The remote-tracking ref, e.g. `origin/main`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn current_branch(git: &Git, config: &Config) -> Result<String> {
        let out = git.run(&["branch", "--show-current"], Some(config.query_timeout()))?;
        Ok(out.trim().to_string())
    }

    /// Refresh the remote-tracking refs. Timeouts and failures are both
    /// returned; the caller denies the push on either.
    pub fn fetch(&self) -> Result<()> {
        tracing::debug!("fetching {}", self.config.remote);
        self.git
            .run(&["fetch", &self.config.remote], Some(self.config.fetch_timeout()))?;
        Ok(())
    }

    /// Commits between the remote tip and HEAD.
    ///
    /// A missing or unknown base ref (first push of a branch) means there is
    /// nothing to inspect and yields an empty list. Timeouts are returned.
    pub fn commits_to_push(&self) -> Result<Vec<CommitRecord>> {
        let range = format!("{}..HEAD", self.base);
        match self.git.run(
            &["rev-list", &range, "--oneline"],
            Some(self.config.query_timeout()),
        ) {
            Ok(out) => {
                let commits: Vec<CommitRecord> = non_empty_lines(&out)
                    .iter()
                    .map(|l| CommitRecord::parse_oneline(l))
                    .collect();
                tracing::debug!("found {} commits to push", commits.len());
                Ok(commits)
            }
            Err(HookError::GitFailed { stderr, .. }) => {
                tracing::debug!("cannot list {range}, nothing to inspect: {stderr}");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Unstaged or staged modifications to tracked files. Fails open.
    pub fn has_unstaged_changes(&self) -> bool {
        let timeout = Some(self.config.query_timeout());
        for args in [&["diff", "--quiet"][..], &["diff", "--cached", "--quiet"][..]] {
            match self.git.output(args, timeout) {
                Ok(out) if out.success() => continue,
                Ok(_) => return true,
                Err(e) => {
                    tracing::debug!("diff check failed ({e}), assuming no unstaged changes");
                    return false;
                }
            }
        }
        false
    }

    /// Three-way merge preview against the remote tip. Fails closed.
    pub fn has_merge_conflicts(&self) -> bool {
        tracing::debug!("checking for merge conflicts against {}", self.base);
        match self.git.output(
            &["merge-tree", &self.base, "HEAD"],
            Some(self.config.query_timeout()),
        ) {
            Ok(out) => {
                let conflict =
                    out.stdout.contains("<<<<<") || out.stdout.to_lowercase().contains("conflict");
                tracing::debug!("merge conflicts: {conflict}");
                conflict
            }
            Err(e) => {
                tracing::debug!("merge conflict check failed ({e}), assuming conflicts exist");
                true
            }
        }
    }

    /// First changed markdown file under a `plans/` directory in the push
    /// range, as an absolute path.
    pub fn find_plan_file(&self) -> Option<PathBuf> {
        let range = format!("{}..HEAD", self.base);
        let out = self
            .git
            .run(&["diff", "--name-only", &range], Some(self.config.query_timeout()))
            .ok()?;
        let found = out
            .lines()
            .map(str::trim)
            .find(|f| f.contains("plans/") && f.ends_with(".md"))?;
        tracing::debug!("found plan file: {found}");
        Some(self.git.dir().join(found))
    }

    pub fn diff_summary(&self) -> String {
        match self.git.run(
            &["diff", "--stat", &self.base, "HEAD"],
            Some(self.config.query_timeout()),
        ) {
            Ok(stat) => message::summarize_diff_stat(&stat),
            Err(_) => "Unable to analyze diff".to_string(),
        }
    }

    /// Subjects of every commit in the push range, newest first.
    pub fn subjects(&self) -> Result<Vec<String>> {
        let range = format!("{}..HEAD", self.base);
        let out = self
            .git
            .run(&["log", "--format=%s", &range], Some(self.config.query_timeout()))?;
        Ok(non_empty_lines(&out))
    }

    pub fn ahead_count(&self) -> Result<usize> {
        let range = format!("{}..HEAD", self.base);
        let out = self.git.run(&["rev-list", "--count", &range], None)?;
        out.trim()
            .parse()
            .map_err(|_| HookError::UnexpectedOutput(out.trim().to_string()))
    }

    pub fn tag_exists(&self, tag: &str) -> Result<bool> {
        let out = self.git.run(&["tag", "-l", tag], None)?;
        Ok(out.lines().any(|l| l.trim() == tag))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
