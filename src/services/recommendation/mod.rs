//! Adaptive "what to do next" queue for a learner.
//!
//! [`RecommendationService::generate`] scores every eligible activity against
//! the learner's mastery and recent history, keeps the top `limit`, and appends
//! a snapshot to the queue table. [`RecommendationService::get_or_generate`]
//! serves that snapshot until it expires.
//!
//! There is no locking around the read-then-generate path: two requests that
//! both see a stale snapshot will both generate and insert, and the newest row
//! wins on the next read. Freshness matters here, not exactly-once work.

pub mod memory;
pub mod scoring;
pub mod store;
pub mod types;

use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

pub use memory::MemoryRecommendationStore;
pub use scoring::{LearnerSignals, ScoringWeights};
pub use store::{RecommendationStore, StoreError};
pub use types::{
    ActivityAttempt, ActivitySkill, LearningActivity, RecommendationItem, RecommendationOptions,
    RecommendationQueue, RecommendationResult,
};

pub const DEFAULT_LIMIT: i64 = 10;
pub const DEFAULT_TTL_HOURS: f64 = 6.0;
pub const DEFAULT_HISTORY_WINDOW: usize = 100;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationConfig {
    pub default_limit: i64,
    pub default_ttl_hours: f64,
    pub history_window: usize,
    pub weights: ScoringWeights,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            default_ttl_hours: DEFAULT_TTL_HOURS,
            history_window: DEFAULT_HISTORY_WINDOW,
            weights: ScoringWeights::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("recommendations unavailable: {0}")]
    Unavailable(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ResolvedOptions {
    limit: usize,
    ttl: Duration,
}

#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn RecommendationStore>,
    clock: Arc<dyn Clock>,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn RecommendationStore>, config: RecommendationConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn RecommendationStore>,
        clock: Arc<dyn Clock>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub async fn generate(
        &self,
        user_id: &str,
        options: RecommendationOptions,
    ) -> Result<RecommendationResult, RecommendationError> {
        let resolved = self.resolve(user_id, options)?;
        self.generate_resolved(user_id, resolved).await
    }

    pub async fn get_or_generate(
        &self,
        user_id: &str,
        options: RecommendationOptions,
    ) -> Result<RecommendationResult, RecommendationError> {
        let resolved = self.resolve(user_id, options)?;

        if let Some(queue) = self.store.latest_queue(user_id).await? {
            let now = self.clock.now();
            let expires_at = queue
                .expires_at
                .or_else(|| queue.generated_at.checked_add_signed(resolved.ttl));
            if let Some(expires_at) = expires_at.filter(|expires_at| now < *expires_at) {
                tracing::debug!(
                    user_id,
                    generated_at = %queue.generated_at,
                    items = queue.items.len(),
                    "recommendation queue cache hit"
                );
                return Ok(RecommendationResult {
                    items: queue.items,
                    generated_at: queue.generated_at,
                    expires_at,
                    cached: true,
                });
            }
            tracing::debug!(
                user_id,
                generated_at = %queue.generated_at,
                "recommendation queue expired"
            );
        }

        self.generate_resolved(user_id, resolved).await
    }

    async fn generate_resolved(
        &self,
        user_id: &str,
        options: ResolvedOptions,
    ) -> Result<RecommendationResult, RecommendationError> {
        let window = self.config.history_window;
        let (mastery, attempts, completed, catalog) = tokio::try_join!(
            self.store.load_mastery(user_id),
            self.store.load_recent_attempts(user_id, window),
            self.store.load_completed_activity_ids(user_id),
            self.store.load_catalog(),
        )?;

        let candidates: Vec<LearningActivity> =
            catalog.into_iter().filter(LearningActivity::is_eligible).collect();
        let signals = LearnerSignals::from_inputs(mastery, &attempts, completed);
        let mut items = scoring::rank(&candidates, &signals, &self.config.weights);
        items.truncate(options.limit);

        // Queue timestamps are stored with millisecond precision.
        let generated_at = self.clock.now().trunc_subsecs(3);
        let expires_at = generated_at
            .checked_add_signed(options.ttl)
            .ok_or_else(|| ttl_out_of_range(options.ttl))?;
        let queue = RecommendationQueue {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            items,
            generated_at,
            expires_at: Some(expires_at),
        };
        self.store.insert_queue(&queue).await?;

        tracing::info!(
            user_id,
            candidates = candidates.len(),
            items = queue.items.len(),
            history = attempts.len(),
            preferred_difficulty = signals.preferred_difficulty(),
            %expires_at,
            "recommendation queue generated"
        );

        Ok(RecommendationResult {
            items: queue.items,
            generated_at,
            expires_at,
            cached: false,
        })
    }

    fn resolve(
        &self,
        user_id: &str,
        options: RecommendationOptions,
    ) -> Result<ResolvedOptions, RecommendationError> {
        if user_id.trim().is_empty() {
            return Err(RecommendationError::InvalidOptions(
                "userId must not be empty".to_string(),
            ));
        }

        let limit = options.limit.unwrap_or(self.config.default_limit);
        if limit <= 0 {
            return Err(RecommendationError::InvalidOptions(format!(
                "limit must be a positive integer, got {limit}"
            )));
        }

        let ttl_hours = options.ttl_hours.unwrap_or(self.config.default_ttl_hours);
        if !ttl_hours.is_finite() || ttl_hours < 0.0 {
            return Err(RecommendationError::InvalidOptions(format!(
                "ttlHours must be a non-negative number, got {ttl_hours}"
            )));
        }

        let ttl = ttl_from_hours(ttl_hours).ok_or_else(|| {
            RecommendationError::InvalidOptions(format!("ttlHours is out of range, got {ttl_hours}"))
        })?;
        if self.clock.now().checked_add_signed(ttl).is_none() {
            return Err(ttl_out_of_range(ttl));
        }

        Ok(ResolvedOptions {
            limit: usize::try_from(limit).unwrap_or(usize::MAX),
            ttl,
        })
    }
}

fn ttl_from_hours(hours: f64) -> Option<Duration> {
    Duration::try_milliseconds((hours * MILLIS_PER_HOUR).round() as i64)
}

fn ttl_out_of_range(ttl: Duration) -> RecommendationError {
    RecommendationError::InvalidOptions(format!(
        "ttlHours is out of range, got {} hours",
        ttl.num_hours()
    ))
}
