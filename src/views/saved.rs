// src/views/saved.rs
use crate::client::ClientError;
use crate::models::Scholarship;
use crate::optimistic::{self, Notifications, OptimisticOutcome};

use super::SavedBackend;

/// The signed-in user's saved scholarships.
#[derive(Debug, Default)]
pub struct SavedScholarships {
    saved: Vec<Scholarship>,
    pub notifications: Notifications,
}

impl SavedScholarships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Scholarship] {
        &self.saved
    }

    pub fn is_saved(&self, scholarship_id: &str) -> bool {
        self.saved.iter().any(|s| s.id == scholarship_id)
    }

    pub async fn load<B: SavedBackend + ?Sized>(&mut self, backend: &B) -> bool {
        match backend.fetch_saved().await {
            Ok(saved) => {
                self.saved = saved;
                true
            }
            Err(e) => {
                self.notifications.error(e.to_string());
                false
            }
        }
    }

    /// Saves or unsaves `scholarship` depending on its current state. The
    /// list changes immediately and is re-fetched if the write fails.
    pub async fn toggle<B: SavedBackend + ?Sized>(
        &mut self,
        backend: &B,
        scholarship: &Scholarship,
    ) -> OptimisticOutcome {
        let save = !self.is_saved(&scholarship.id);
        let id = scholarship.id.as_str();

        let outcome = optimistic::apply(
            &mut self.saved,
            |list: &mut Vec<Scholarship>| {
                if save {
                    list.insert(0, scholarship.clone());
                } else {
                    list.retain(|s| s.id != scholarship.id);
                }
            },
            move || async move {
                backend.set_saved(id, save).await?;
                Ok::<(), ClientError>(())
            },
            move || async move { backend.fetch_saved().await },
        )
        .await;

        self.notifications.record(&outcome);
        if outcome.is_confirmed() {
            let message = if save {
                format!("Saved {}", scholarship.title)
            } else {
                format!("Removed {} from saved", scholarship.title)
            };
            self.notifications.info(message);
        }
        outcome
    }
}
