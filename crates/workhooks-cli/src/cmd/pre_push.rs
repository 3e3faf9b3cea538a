use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use workhooks_core::config::Config;
use workhooks_core::confirm::TtyConfirmation;
use workhooks_core::exec_log::{ExecutionLog, LogEntry};
use workhooks_core::git::Git;
use workhooks_core::interrupt::Interrupt;
use workhooks_core::squash::{self, Outcome};

use crate::signals;

/// Always exits 0; the decision travels in the JSON on stdout.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = Config::load(root).unwrap_or_else(|e| {
        tracing::warn!("failed to load config, using defaults: {e}");
        Config::default()
    });
    let log = match ExecutionLog::from_config(&config) {
        Ok(log) => Some(log),
        Err(e) => {
            tracing::debug!("execution log disabled: {e}");
            None
        }
    };

    let interrupt = Interrupt::new();
    {
        let log = log.clone();
        signals::install(interrupt.clone(), move || {
            if let Some(log) = log {
                log.record(&LogEntry {
                    timestamp: Utc::now(),
                    result: Outcome::DenyInterrupted,
                    wip_count: 0,
                    duration_ms: elapsed_ms(started),
                    plan_file: None,
                });
            }
        });
    }

    // An unreadable stdin is treated like malformed input and denied.
    let raw = super::read_stdin().unwrap_or_else(|e| {
        tracing::debug!("{e:#}");
        String::new()
    });

    let git = Git::new(root);
    let mut confirm = TtyConfirmation;
    let report = squash::evaluate(&raw, &git, &config, &mut confirm, &interrupt);
    tracing::debug!(outcome = ?report.outcome, state = ?report.state, "pre-push evaluated");

    if let Some(log) = &log {
        log.record(&LogEntry {
            timestamp: Utc::now(),
            result: report.outcome,
            wip_count: report.wip_count,
            duration_ms: elapsed_ms(started),
            plan_file: report.plan_file.clone(),
        });
    }

    if interrupt.claim_response() {
        println!("{}", report.decision.to_json()?);
    }
    Ok(())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
