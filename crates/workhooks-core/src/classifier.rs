use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// CommandKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// `git push [ref...]`
    GitPush,
    /// `jj git push [ref...]`
    JjPush,
    /// Anything else, including push-like strings carrying shell operators.
    NotPush,
}

impl CommandKind {
    pub fn is_push(self) -> bool {
        !matches!(self, CommandKind::NotPush)
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

// Arguments are limited to word characters, hyphens and slashes so `;`, `&&`,
// `|`, quotes and substitutions can never ride along.
static GIT_PUSH_RE: OnceLock<Regex> = OnceLock::new();
static JJ_PUSH_RE: OnceLock<Regex> = OnceLock::new();
static PUSH_PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn git_push_re() -> &'static Regex {
    GIT_PUSH_RE.get_or_init(|| Regex::new(r"^git\s+push(\s+[\w\-/]+)*$").unwrap())
}

fn jj_push_re() -> &'static Regex {
    JJ_PUSH_RE.get_or_init(|| Regex::new(r"^jj\s+git\s+push(\s+[\w\-/]+)*$").unwrap())
}

fn push_prefix_re() -> &'static Regex {
    PUSH_PREFIX_RE.get_or_init(|| Regex::new(r"^(?:git|jj\s+git)\s+push").unwrap())
}

/// Classify a shell command against the push allow-list.
pub fn classify_command(command: &str) -> CommandKind {
    let kind = if git_push_re().is_match(command) {
        CommandKind::GitPush
    } else if jj_push_re().is_match(command) {
        CommandKind::JjPush
    } else {
        CommandKind::NotPush
    };
    tracing::debug!(?kind, "classified command: {command}");
    kind
}

pub fn is_push_command(command: &str) -> bool {
    classify_command(command).is_push()
}

/// Loose prefix match used after a push has already run: any command that
/// starts like a push counts, whatever follows it.
pub fn looks_like_push(command: &str) -> bool {
    push_prefix_re().is_match(command)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_push_shapes() {
        assert_eq!(classify_command("git push"), CommandKind::GitPush);
        assert_eq!(classify_command("git push origin main"), CommandKind::GitPush);
        assert_eq!(
            classify_command("git  push  origin feature/login-v2"),
            CommandKind::GitPush
        );
        assert_eq!(classify_command("jj git push"), CommandKind::JjPush);
        assert_eq!(classify_command("jj git push main"), CommandKind::JjPush);
    }

    #[test]
    fn rejects_injection() {
        for cmd in [
            "git push; rm -rf /",
            "git push && malicious",
            "git push | cat /etc/passwd",
            "git push origin main; echo pwned",
            "jj git push && curl evil",
            "git push $(whoami)",
            "git push 'origin'",
        ] {
            assert_eq!(classify_command(cmd), CommandKind::NotPush, "{cmd}");
        }
    }

    #[test]
    fn non_push_commands_pass_through() {
        for cmd in ["git status", "git commit -m 'test'", "git log", "", "push"] {
            assert!(!is_push_command(cmd), "{cmd}");
        }
    }

    #[test]
    fn flagged_pushes_are_allowed() {
        // `--force` contains only hyphens and word chars, so it is allowed.
        assert!(is_push_command("git push --force"));
        // `=` is not.
        assert!(!is_push_command("git push --push-option=ci.skip"));
    }

    #[test]
    fn loose_prefix_for_cleanup() {
        assert!(looks_like_push("git push origin main"));
        assert!(looks_like_push("git push --force-with-lease"));
        assert!(looks_like_push("jj git push"));
        assert!(!looks_like_push("git status"));
        assert!(!looks_like_push("echo git push"));
    }
}
