use crate::error::{HookError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CONFIG_FILE: &str = ".claude/workhooks.local.md";
pub const HOOK_LOG_FILE: &str = ".claude/hooks/pre-push-squash.log";

pub const PLANS_DIR: &str = "plans";
pub const SPECS_DIR: &str = "specs";

/// Directories searched (relative to each ancestor) by the stop gate.
pub const PLAN_SEARCH_DIRS: &[&str] = &["plans", "docs/plans", "tools/claude-plugins/plans"];

pub const BACKUP_TAG_PREFIX: &str = "backup/pre-squash-";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn plans_dir(root: &Path) -> PathBuf {
    root.join(PLANS_DIR)
}

pub fn specs_dir(root: &Path) -> PathBuf {
    root.join(SPECS_DIR)
}

pub fn default_log_file() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(HookError::HomeNotFound)?;
    Ok(home.join(HOOK_LOG_FILE))
}

/// A relative path with no `..` component. Absolute paths are rejected.
pub fn is_safe_relative(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }
    !path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

/// Convert a feature title to its `.feature` file name.
pub fn feature_file_name(feature_name: &str) -> String {
    format!("{}.feature", feature_name.to_lowercase().replace(' ', "-"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_relative_paths() {
        assert!(is_safe_relative(Path::new("plans/auth.md")));
        assert!(is_safe_relative(Path::new("plan.md")));
        assert!(!is_safe_relative(Path::new("../outside.md")));
        assert!(!is_safe_relative(Path::new("plans/../../etc/passwd")));
        assert!(!is_safe_relative(Path::new("/etc/passwd")));
    }

    #[test]
    fn feature_file_names_are_kebab_case() {
        assert_eq!(feature_file_name("User Login"), "user-login.feature");
        assert_eq!(feature_file_name("search"), "search.feature");
    }
}
