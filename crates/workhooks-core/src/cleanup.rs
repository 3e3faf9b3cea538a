//! Post-push removal of the backup tags the squash workflow leaves behind.
//!
//! Only tags younger than the cleanup window are removed, so a tag from an
//! older session that was never pushed survives. Everything here is best
//! effort.

use crate::classifier::looks_like_push;
use crate::config::Config;
use crate::error::Result;
use crate::git::Git;
use crate::hook::HookInput;
use crate::paths::BACKUP_TAG_PREFIX;

/// Trailing unix timestamp of `backup/pre-squash-<sha>-<unixtime>`.
pub fn tag_timestamp(tag: &str) -> Option<i64> {
    let parts: Vec<&str> = tag.split('-').collect();
    if parts.len() < 4 {
        return None;
    }
    parts.last()?.parse().ok()
}

/// Delete backup tags created within `window_secs` of `now`. Returns the
/// tags that were deleted.
pub fn delete_recent_backup_tags(git: &Git, window_secs: i64, now: i64) -> Result<Vec<String>> {
    let pattern = format!("{BACKUP_TAG_PREFIX}*");
    let listing = git.run(&["tag", "-l", &pattern], None)?;

    let mut deleted = Vec::new();
    for tag in listing.lines().map(str::trim).filter(|t| !t.is_empty()) {
        let Some(ts) = tag_timestamp(tag) else {
            tracing::debug!("skipping tag without timestamp: {tag}");
            continue;
        };
        if now - ts >= window_secs {
            continue;
        }
        match git.output(&["tag", "-d", tag], None) {
            Ok(out) if out.success() => {
                tracing::debug!("deleted backup tag {tag}");
                deleted.push(tag.to_string());
            }
            Ok(out) => tracing::debug!("could not delete {tag}: {}", out.stderr.trim()),
            Err(e) => tracing::debug!("could not delete {tag}: {e}"),
        }
    }
    Ok(deleted)
}

/// Handle one post-tool-use invocation. Acts only on a successful push;
/// never fails.
pub fn run_post_push(raw_input: &str, git: &Git, config: &Config) -> Vec<String> {
    let input = match HookInput::parse(raw_input) {
        Ok(input) => input,
        Err(e) => {
            tracing::debug!("ignoring unparseable hook input: {e}");
            return Vec::new();
        }
    };
    if !looks_like_push(input.command()) || input.tool_result.exit_code != 0 {
        return Vec::new();
    }
    let now = chrono::Utc::now().timestamp();
    delete_recent_backup_tags(git, config.cleanup_window_secs, now).unwrap_or_else(|e| {
        tracing::debug!("backup tag cleanup failed: {e}");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Sandbox;

    #[test]
    fn parses_trailing_timestamp() {
        assert_eq!(
            tag_timestamp("backup/pre-squash-abc1234-1700000000"),
            Some(1_700_000_000)
        );
        assert_eq!(tag_timestamp("backup/pre-squash-abc1234-later"), None);
        assert_eq!(tag_timestamp("backup/other"), None);
    }

    #[test]
    fn deletes_only_recent_tags() {
        let sandbox = Sandbox::new();
        let now = 1_700_000_000;
        let fresh = format!("backup/pre-squash-aaa1111-{}", now - 10);
        let stale = format!("backup/pre-squash-bbb2222-{}", now - 3600);
        sandbox.git(&["tag", &fresh]);
        sandbox.git(&["tag", &stale]);
        sandbox.git(&["tag", "backup/pre-squash-ccc3333-notatime"]);

        let git = Git::new(sandbox.work());
        let deleted = delete_recent_backup_tags(&git, 300, now).unwrap();

        assert_eq!(deleted, vec![fresh]);
        let left = sandbox.backup_tags();
        assert_eq!(left.len(), 2);
        assert!(left.contains(&stale));
    }

    #[test]
    fn ignores_failed_pushes_and_other_commands() {
        let sandbox = Sandbox::new();
        let tag = format!(
            "backup/pre-squash-abc1234-{}",
            chrono::Utc::now().timestamp()
        );
        sandbox.git(&["tag", &tag]);
        let git = Git::new(sandbox.work());
        let config = sandbox.config();

        let failed = r#"{"tool_input":{"command":"git push"},"tool_result":{"exit_code":1}}"#;
        assert!(run_post_push(failed, &git, &config).is_empty());
        let other = r#"{"tool_input":{"command":"git status"}}"#;
        assert!(run_post_push(other, &git, &config).is_empty());
        assert!(run_post_push("not json", &git, &config).is_empty());
        assert_eq!(sandbox.backup_tags(), vec![tag.clone()]);

        let pushed = r#"{"tool_input":{"command":"git push origin main"},"tool_result":{"exit_code":0}}"#;
        assert_eq!(run_post_push(pushed, &git, &config), vec![tag]);
        assert!(sandbox.backup_tags().is_empty());
    }
}
