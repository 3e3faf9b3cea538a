pub mod plan;
pub mod post_push;
pub mod pre_push;
pub mod resize_images;
pub mod specs;
pub mod stop;

use anyhow::Context;
use std::io::Read;

/// The hook payload. Hosts close stdin after writing it.
pub(crate) fn read_stdin() -> anyhow::Result<String> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("failed to read hook input from stdin")?;
    Ok(raw)
}
