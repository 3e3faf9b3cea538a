//! Interrupt listener for the pre-push hook.
//!
//! A dedicated thread runs a current-thread tokio runtime that waits for
//! SIGINT or SIGTERM. On delivery it marks the shared [`Interrupt`] and, if
//! the workflow has not answered yet, writes the denial itself and exits.

use workhooks_core::hook::PermissionDecision;
use workhooks_core::interrupt::Interrupt;

/// Spawn the listener. `on_deny` runs after the denial is printed and before
/// the process exits.
pub fn install<F>(interrupt: Interrupt, on_deny: F)
where
    F: FnOnce() + Send + 'static,
{
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::warn!("signal listener unavailable: {e}");
                return;
            }
        };
        runtime.block_on(wait_for_signal());

        tracing::debug!("interrupt received");
        interrupt.trigger();
        if !interrupt.claim_response() {
            return;
        }
        match PermissionDecision::deny(interrupt.denial_reason()).to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!("failed to encode denial: {e}"),
        }
        on_deny();
        std::process::exit(0);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::debug!("SIGTERM handler unavailable: {e}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
