use std::sync::Arc;
use std::time::Instant;

use crate::db::operations::PgRecommendationStore;
use crate::db::DatabaseProxy;
use crate::services::recommendation::{RecommendationConfig, RecommendationService};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    db_proxy: Option<Arc<DatabaseProxy>>,
    recommendations: Option<Arc<RecommendationService>>,
}

impl AppState {
    /// Wires the Postgres-backed engine when a database is available.
    pub fn new(db_proxy: Option<Arc<DatabaseProxy>>, config: RecommendationConfig) -> Self {
        let recommendations = db_proxy.as_ref().map(|proxy| {
            let store = Arc::new(PgRecommendationStore::new(Arc::clone(proxy)));
            Arc::new(RecommendationService::new(store, config))
        });

        Self {
            started_at: Instant::now(),
            db_proxy,
            recommendations,
        }
    }

    pub fn with_service(service: RecommendationService) -> Self {
        Self {
            started_at: Instant::now(),
            db_proxy: None,
            recommendations: Some(Arc::new(service)),
        }
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn recommendations(&self) -> Option<Arc<RecommendationService>> {
        self.recommendations.clone()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
