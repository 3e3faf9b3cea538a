use anyhow::Context;
use std::path::Path;
use workhooks_core::config::Config;
use workhooks_core::images::{self, ResizeResult};

pub fn run(root: &Path) -> anyhow::Result<()> {
    let raw = super::read_stdin()?;
    let config = Config::load(root).unwrap_or_default();

    match images::run_resize_hook(&raw, &config).context("image resize hook failed")? {
        ResizeResult::Skipped => {}
        ResizeResult::Resized(notifications) => {
            for note in notifications {
                println!("{note}");
            }
        }
        ResizeResult::Blocked(block) => {
            println!("{}", serde_json::to_string(&block)?);
        }
    }
    Ok(())
}
