use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::types::{ActivityAttempt, LearningActivity, RecommendationItem, RecommendationQueue};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("malformed queue payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the learner data plus the append-only queue table.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Per-skill mastery in [0, 100]. Skills without a row are absent.
    async fn load_mastery(&self, user_id: &str) -> Result<HashMap<String, f64>, StoreError>;

    /// Most recent attempts first, at most `window` rows.
    async fn load_recent_attempts(
        &self,
        user_id: &str,
        window: usize,
    ) -> Result<Vec<ActivityAttempt>, StoreError>;

    /// Every activity the user has ever completed, regardless of the window.
    async fn load_completed_activity_ids(&self, user_id: &str)
        -> Result<HashSet<String>, StoreError>;

    /// Active, unlocked activities in catalog order, with their skill mappings.
    async fn load_catalog(&self) -> Result<Vec<LearningActivity>, StoreError>;

    async fn latest_queue(&self, user_id: &str) -> Result<Option<RecommendationQueue>, StoreError>;

    async fn insert_queue(&self, queue: &RecommendationQueue) -> Result<(), StoreError>;
}

pub fn encode_items(items: &[RecommendationItem]) -> Result<serde_json::Value, StoreError> {
    Ok(serde_json::to_value(items)?)
}

pub fn decode_items(payload: serde_json::Value) -> Result<Vec<RecommendationItem>, StoreError> {
    Ok(serde_json::from_value(payload)?)
}
