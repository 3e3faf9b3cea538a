use crate::error::Result;
use crate::paths;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Hook settings, read from the YAML front matter of
/// `.claude/workhooks.local.md`. The front matter may carry keys owned by
/// other tools, so unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
    /// Execution log location. `~/` is expanded; `None` means the default
    /// under the home directory.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_max_bytes")]
    pub log_max_bytes: u64,
    #[serde(default = "default_log_max_backups")]
    pub log_max_backups: u32,
    #[serde(default = "default_cleanup_window")]
    pub cleanup_window_secs: i64,
    #[serde(default = "default_true")]
    pub auto_resize_images: bool,
    #[serde(default = "default_max_image_dimension")]
    pub max_image_dimension: u32,
    #[serde(default = "default_attribution")]
    pub attribution: String,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_protected_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_query_timeout() -> u64 {
    10
}

fn default_log_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_log_max_backups() -> u32 {
    5
}

fn default_cleanup_window() -> i64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_max_image_dimension() -> u32 {
    2000
}

fn default_attribution() -> String {
    "Generated with workhooks".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            protected_branches: default_protected_branches(),
            fetch_timeout_secs: default_fetch_timeout(),
            query_timeout_secs: default_query_timeout(),
            log_file: None,
            log_max_bytes: default_log_max_bytes(),
            log_max_backups: default_log_max_backups(),
            cleanup_window_secs: default_cleanup_window(),
            auto_resize_images: true,
            max_image_dimension: default_max_image_dimension(),
            attribution: default_attribution(),
        }
    }
}

static FRONT_MATTER_RE: OnceLock<Regex> = OnceLock::new();

fn front_matter_re() -> &'static Regex {
    FRONT_MATTER_RE.get_or_init(|| Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---").unwrap())
}

impl Config {
    /// Load from `<root>/.claude/workhooks.local.md`. A missing file yields the
    /// defaults; unparseable front matter yields the defaults with a warning.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Self::from_markdown(&content))
    }

    pub fn from_markdown(content: &str) -> Self {
        let Some(caps) = front_matter_re().captures(content) else {
            return Self::default();
        };
        let yaml = &caps[1];
        if yaml.trim().is_empty() {
            return Self::default();
        }
        match serde_yaml::from_str::<Config>(yaml) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring malformed config front matter: {e}");
                Self::default()
            }
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn is_protected(&self, branch: &str) -> bool {
        self.protected_branches.iter().any(|b| b == branch)
    }

    /// The remote-tracking ref commits are compared against.
    pub fn base_ref(&self, branch: &str) -> String {
        format!("{}/{}", self.remote, branch)
    }

    pub fn log_file_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            None => paths::default_log_file(),
            Some(p) => match p.strip_prefix("~") {
                Ok(rest) => {
                    let home = home::home_dir().ok_or(crate::error::HookError::HomeNotFound)?;
                    Ok(home.join(rest))
                }
                Err(_) => Ok(p.clone()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
