// src/store/memory.rs

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    models::progress::{TopicKey, TopicTally, UserProgress},
    services::progress::{ProgressError, ProgressStore},
};

/// In-process `ProgressStore` for tests and local runs without Postgres.
///
/// A single lock is held for the whole apply. Updates are staged on copies
/// and written back only when every tally succeeded.
#[derive(Default)]
pub struct MemoryProgressStore {
    rows: Mutex<HashMap<(i64, TopicKey), UserProgress>>,
    unavailable: AtomicBool,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `ProgressError::Persistence`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ProgressError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProgressError::Persistence(
                "progress store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn apply_tallies(
        &self,
        user_id: i64,
        tallies: &BTreeMap<TopicKey, TopicTally>,
        at: DateTime<Utc>,
    ) -> Result<Vec<UserProgress>, ProgressError> {
        let mut rows = self.rows.lock().await;

        let mut staged = Vec::with_capacity(tallies.len());
        for (key, tally) in tallies {
            let mut progress = rows
                .get(&(user_id, key.clone()))
                .cloned()
                .unwrap_or_else(|| UserProgress::new(user_id, key));
            progress.absorb(*tally, at);
            staged.push(progress);
        }

        // Nothing is written unless every tally was staged.
        self.check_available()?;

        for progress in &staged {
            rows.insert((user_id, progress.key()), progress.clone());
        }
        Ok(staged)
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        subject: Option<&str>,
    ) -> Result<Vec<UserProgress>, ProgressError> {
        self.check_available()?;

        let rows = self.rows.lock().await;
        let mut progress: Vec<UserProgress> = rows
            .iter()
            .filter(|((owner, key), _)| {
                *owner == user_id && subject.is_none_or(|s| key.subject == s)
            })
            .map(|(_, p)| p.clone())
            .collect();
        progress.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(progress)
    }
}
