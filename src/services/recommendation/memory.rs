use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::store::{decode_items, encode_items, RecommendationStore, StoreError};
use super::types::{ActivityAttempt, LearningActivity, RecommendationQueue};

/// Queue row as persisted: items stay encoded until read, like the JSONB column.
#[derive(Debug, Clone)]
struct StoredQueue {
    id: String,
    user_id: String,
    items: serde_json::Value,
    generated_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

/// In-process store used by tests and local runs without Postgres.
#[derive(Debug, Default)]
pub struct MemoryRecommendationStore {
    mastery: RwLock<HashMap<String, HashMap<String, f64>>>,
    attempts: RwLock<HashMap<String, Vec<ActivityAttempt>>>,
    catalog: RwLock<Vec<LearningActivity>>,
    queues: RwLock<Vec<StoredQueue>>,
    unavailable: AtomicBool,
}

impl MemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mastery(&self, user_id: &str, skill_id: &str, mastery: f64) {
        self.mastery
            .write()
            .entry(user_id.to_string())
            .or_default()
            .insert(skill_id.to_string(), mastery);
    }

    pub fn record_attempt(&self, user_id: &str, attempt: ActivityAttempt) {
        self.attempts
            .write()
            .entry(user_id.to_string())
            .or_default()
            .push(attempt);
    }

    pub fn add_activity(&self, activity: LearningActivity) {
        self.catalog.write().push(activity);
    }

    pub fn queue_count(&self, user_id: &str) -> usize {
        self.queues
            .read()
            .iter()
            .filter(|queue| queue.user_id == user_id)
            .count()
    }

    /// Appends a queue row with an arbitrary payload, bypassing encoding.
    pub fn insert_raw_queue(
        &self,
        user_id: &str,
        items: serde_json::Value,
        generated_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.queues.write().push(StoredQueue {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            items,
            generated_at,
            expires_at,
        });
    }

    /// Makes every subsequent call fail as if the backing database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecommendationStore for MemoryRecommendationStore {
    async fn load_mastery(&self, user_id: &str) -> Result<HashMap<String, f64>, StoreError> {
        self.check_available()?;
        Ok(self.mastery.read().get(user_id).cloned().unwrap_or_default())
    }

    async fn load_recent_attempts(
        &self,
        user_id: &str,
        window: usize,
    ) -> Result<Vec<ActivityAttempt>, StoreError> {
        self.check_available()?;
        let mut attempts = self.attempts.read().get(user_id).cloned().unwrap_or_default();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        attempts.truncate(window);
        Ok(attempts)
    }

    async fn load_completed_activity_ids(
        &self,
        user_id: &str,
    ) -> Result<HashSet<String>, StoreError> {
        self.check_available()?;
        Ok(self
            .attempts
            .read()
            .get(user_id)
            .map(|attempts| {
                attempts
                    .iter()
                    .filter(|attempt| attempt.completed)
                    .map(|attempt| attempt.activity_id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn load_catalog(&self) -> Result<Vec<LearningActivity>, StoreError> {
        self.check_available()?;
        let mut catalog: Vec<LearningActivity> = self
            .catalog
            .read()
            .iter()
            .filter(|activity| activity.is_eligible())
            .cloned()
            .collect();
        catalog.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.id.cmp(&b.id)));
        Ok(catalog)
    }

    async fn latest_queue(&self, user_id: &str) -> Result<Option<RecommendationQueue>, StoreError> {
        self.check_available()?;
        let latest = self
            .queues
            .read()
            .iter()
            .filter(|queue| queue.user_id == user_id)
            .max_by_key(|queue| queue.generated_at)
            .cloned();

        let Some(row) = latest else {
            return Ok(None);
        };
        Ok(Some(RecommendationQueue {
            id: row.id,
            user_id: row.user_id,
            items: decode_items(row.items)?,
            generated_at: row.generated_at,
            expires_at: row.expires_at,
        }))
    }

    async fn insert_queue(&self, queue: &RecommendationQueue) -> Result<(), StoreError> {
        self.check_available()?;
        let items = encode_items(&queue.items)?;
        self.queues.write().push(StoredQueue {
            id: queue.id.clone(),
            user_id: queue.user_id.clone(),
            items,
            generated_at: queue.generated_at,
            expires_at: queue.expires_at,
        });
        Ok(())
    }
}
