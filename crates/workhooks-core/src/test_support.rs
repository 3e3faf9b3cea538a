//! Throwaway git repositories for workflow tests: a bare `remote.git` and a
//! `work` clone tracking it on `main`.

use crate::config::Config;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct Sandbox {
    dir: TempDir,
    work: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let remote = dir.path().join("remote.git");
        let work = dir.path().join("work");

        git_in(dir.path(), &["init", "--bare", "-q", remote.to_str().unwrap()]);
        git_in(dir.path(), &["init", "-q", work.to_str().unwrap()]);

        let sandbox = Self { dir, work };
        sandbox.git(&["config", "user.name", "Test User"]);
        sandbox.git(&["config", "user.email", "test@example.com"]);
        sandbox.git(&["config", "commit.gpgsign", "false"]);
        sandbox.git(&["config", "tag.gpgsign", "false"]);
        sandbox.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        sandbox.git(&["remote", "add", "origin", remote.to_str().unwrap()]);
        sandbox.commit_file("README.md", "initial commit");
        sandbox.git(&["push", "-q", "-u", "origin", "main"]);
        sandbox
    }

    pub fn work(&self) -> &Path {
        &self.work
    }

    /// Defaults, with the execution log kept inside the sandbox.
    pub fn config(&self) -> Config {
        Config {
            log_file: Some(self.dir.path().join("hook.log")),
            ..Config::default()
        }
    }

    /// Run git in the work tree, asserting success.
    pub fn git(&self, args: &[&str]) -> String {
        git_in(&self.work, args)
    }

    /// Create (or extend) `name` and commit it with `message`.
    pub fn commit_file(&self, name: &str, message: &str) {
        let path = self.work.join(name);
        let mut content = std::fs::read_to_string(&path).unwrap_or_default();
        content.push_str(message);
        content.push('\n');
        self.write_and_commit(name, &content, message);
    }

    pub fn write_and_commit(&self, name: &str, content: &str, message: &str) {
        let path = self.work.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        self.git(&["add", name]);
        self.git(&["commit", "-q", "-m", message]);
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    pub fn head_message(&self) -> String {
        self.git(&["log", "-1", "--format=%B"]).trim().to_string()
    }

    /// Commits on HEAD not yet on `origin/main`.
    pub fn ahead(&self) -> usize {
        self.git(&["rev-list", "--count", "origin/main..HEAD"])
            .trim()
            .parse()
            .unwrap()
    }

    pub fn backup_tags(&self) -> Vec<String> {
        self.git(&["tag", "-l", "backup/pre-squash-*"])
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn git_in(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}
