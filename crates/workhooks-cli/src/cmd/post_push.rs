use std::path::Path;
use workhooks_core::cleanup;
use workhooks_core::config::Config;
use workhooks_core::git::Git;

/// Best effort: never prints, never fails.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let raw = match super::read_stdin() {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("{e:#}");
            return Ok(());
        }
    };
    let config = Config::load(root).unwrap_or_default();
    let deleted = cleanup::run_post_push(&raw, &Git::new(root), &config);
    if !deleted.is_empty() {
        tracing::debug!("removed {} backup tags", deleted.len());
    }
    Ok(())
}
