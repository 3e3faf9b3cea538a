use anyhow::Context;
use workhooks_core::completion;

/// Plans are looked up from the working directory, not the project root:
/// the session may be working in a nested package with its own plan.
pub fn run() -> anyhow::Result<()> {
    let decision = match std::env::current_dir() {
        Ok(cwd) => completion::evaluate_stop(&cwd),
        Err(e) => {
            tracing::warn!("cannot determine working directory: {e}");
            completion::stop_decision(None)
        }
    };
    println!(
        "{}",
        decision.to_json().context("failed to encode stop decision")?
    );
    Ok(())
}
