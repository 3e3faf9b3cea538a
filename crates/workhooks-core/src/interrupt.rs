//! Shared interruption state between the squash workflow and a signal
//! listener.
//!
//! The workflow records the backup tag here as soon as it exists and checks
//! [`Interrupt::is_interrupted`] between git calls. The listener flips the
//! flag and, if it gets to answer first, reports the tag in its denial. Only
//! one side may write the hook response; [`Interrupt::claim_response`]
//! arbitrates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    interrupted: AtomicBool,
    responded: AtomicBool,
    backup_tag: Mutex<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<Inner>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.inner.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    pub fn set_backup_tag(&self, tag: &str) {
        let mut slot = self
            .inner
            .backup_tag
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *slot = Some(tag.to_string());
    }

    pub fn backup_tag(&self) -> Option<String> {
        self.inner
            .backup_tag
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns true exactly once across all clones.
    pub fn claim_response(&self) -> bool {
        !self.inner.responded.swap(true, Ordering::SeqCst)
    }

    pub fn denial_reason(&self) -> String {
        match self.backup_tag() {
            Some(tag) => format!("Interrupted - backup tag preserved: {tag}"),
            None => "Interrupted".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let a = Interrupt::new();
        let b = a.clone();
        assert!(!b.is_interrupted());
        a.trigger();
        assert!(b.is_interrupted());
    }

    #[test]
    fn denial_mentions_tag_once_recorded() {
        let i = Interrupt::new();
        assert_eq!(i.denial_reason(), "Interrupted");
        i.set_backup_tag("backup/pre-squash-abc1234-1700000000");
        assert_eq!(
            i.denial_reason(),
            "Interrupted - backup tag preserved: backup/pre-squash-abc1234-1700000000"
        );
    }

    #[test]
    fn response_claimed_once() {
        let a = Interrupt::new();
        let b = a.clone();
        assert!(a.claim_response());
        assert!(!b.claim_response());
        assert!(!a.claim_response());
    }

    #[test]
    fn claim_across_threads() {
        let i = Interrupt::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let i = i.clone();
                std::thread::spawn(move || i.claim_response())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|w| *w)
            .count();
        assert_eq!(winners, 1);
    }
}
