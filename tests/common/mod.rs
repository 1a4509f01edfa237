#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use learnquest_backend::services::recommendation::{
    ActivitySkill, Clock, LearningActivity, MemoryRecommendationStore, RecommendationConfig,
    RecommendationService,
};
use learnquest_backend::state::AppState;

pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Mutex::new(Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

pub struct TestApp {
    pub store: Arc<MemoryRecommendationStore>,
    pub clock: Arc<ManualClock>,
    pub router: Router,
}

pub fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryRecommendationStore::new());
    let clock = Arc::new(ManualClock::new());
    let service = RecommendationService::with_clock(
        store.clone(),
        clock.clone(),
        RecommendationConfig::default(),
    );
    let router = learnquest_backend::build_app(AppState::with_service(service));

    TestApp {
        store,
        clock,
        router,
    }
}

/// Five activities across two categories, one skill each.
pub fn seed_catalog(store: &MemoryRecommendationStore) {
    let rows = [
        ("fractions-intro", "math", 1, "fractions"),
        ("fractions-quiz", "math", 2, "fractions"),
        ("reading-warmup", "reading", 1, "comprehension"),
        ("reading-essay", "reading", 3, "comprehension"),
        ("geometry-battle", "math", 3, "geometry"),
    ];

    for (i, (id, category, difficulty, skill)) in rows.into_iter().enumerate() {
        store.add_activity(
            LearningActivity::new(id, difficulty)
                .with_category(category)
                .with_sort_order(i as i32)
                .with_estimated_minutes(10)
                .with_skill(ActivitySkill::new(skill, 1.0)),
        );
    }
}
