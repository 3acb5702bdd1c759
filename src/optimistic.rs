// src/optimistic.rs
//! Optimistic local mutation: change the view first, write to the backend,
//! and roll back to the last known-good state if the write fails.

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;

const MAX_NOTIFICATIONS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimisticOutcome {
    Confirmed,
    /// The write failed; the local value was rolled back.
    Reverted { notice: String },
}

impl OptimisticOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, OptimisticOutcome::Confirmed)
    }
}

/// Applies `mutate` to `value`, then awaits `write`. On failure `revert` is
/// asked for the last known-good value; if that fails too, the pre-mutation
/// snapshot is restored.
pub async fn apply<T, E, M, W, WFut, R, RFut>(
    value: &mut T,
    mutate: M,
    write: W,
    revert: R,
) -> OptimisticOutcome
where
    T: Clone,
    E: Display,
    M: FnOnce(&mut T),
    W: FnOnce() -> WFut,
    WFut: Future<Output = Result<(), E>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<T, E>>,
{
    let snapshot = value.clone();
    mutate(value);

    let error = match write().await {
        Ok(()) => return OptimisticOutcome::Confirmed,
        Err(e) => e,
    };
    log::warn!("Optimistic write failed, reverting: {}", error);

    match revert().await {
        Ok(fresh) => *value = fresh,
        Err(refetch_error) => {
            log::warn!("Revert fetch failed, restoring local snapshot: {}", refetch_error);
            *value = snapshot;
        }
    }

    OptimisticOutcome::Reverted { notice: error.to_string() }
}

// ==================== NOTIFICATIONS ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Transient messages for the user, oldest first. Bounded; the oldest notice
/// is dropped when full.
#[derive(Debug, Default)]
pub struct Notifications {
    queue: VecDeque<Notice>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.queue.len() == MAX_NOTIFICATIONS {
            self.queue.pop_front();
        }
        self.queue.push_back(Notice { level, message: message.into() });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    /// Records a reverted outcome. Confirmed outcomes are silent.
    pub fn record(&mut self, outcome: &OptimisticOutcome) {
        if let OptimisticOutcome::Reverted { notice } = outcome {
            self.error(notice.clone());
        }
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.queue.back()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[actix_rt::test]
    async fn test_confirmed_keeps_mutation() {
        let mut likes = 3;
        let outcome = apply(
            &mut likes,
            |n| *n += 1,
            || async { Ok::<(), String>(()) },
            || async { Ok::<i32, String>(0) },
        )
        .await;
        assert_eq!(outcome, OptimisticOutcome::Confirmed);
        assert_eq!(likes, 4);
    }

    #[actix_rt::test]
    async fn test_failed_write_takes_refetched_value() {
        let mut likes = 3;
        let refetched = Cell::new(false);
        let outcome = apply(
            &mut likes,
            |n| *n += 1,
            || async { Err::<(), _>("network down".to_string()) },
            || {
                refetched.set(true);
                async { Ok(7) }
            },
        )
        .await;
        assert!(refetched.get());
        assert_eq!(likes, 7);
        assert_eq!(outcome, OptimisticOutcome::Reverted { notice: "network down".into() });
    }

    #[actix_rt::test]
    async fn test_failed_revert_restores_snapshot() {
        let mut saved = vec!["a".to_string()];
        let outcome = apply(
            &mut saved,
            |list| list.push("b".to_string()),
            || async { Err::<(), _>("write failed".to_string()) },
            || async { Err("still down".to_string()) },
        )
        .await;
        assert_eq!(saved, vec!["a".to_string()]);
        assert!(!outcome.is_confirmed());
    }

    #[test]
    fn test_notifications_are_bounded() {
        let mut notes = Notifications::new();
        notes.record(&OptimisticOutcome::Confirmed);
        assert!(notes.is_empty());

        for i in 0..(MAX_NOTIFICATIONS + 5) {
            notes.error(format!("failure {}", i));
        }
        assert_eq!(notes.len(), MAX_NOTIFICATIONS);
        assert_eq!(notes.latest().unwrap().message, format!("failure {}", MAX_NOTIFICATIONS + 4));

        let drained = notes.drain();
        assert_eq!(drained[0].message, "failure 5");
        assert!(notes.is_empty());
    }
}
