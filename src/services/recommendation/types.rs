use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SKILL_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySkill {
    pub skill_id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<i32>,
}

impl ActivitySkill {
    pub fn new(skill_id: impl Into<String>, weight: f64) -> Self {
        Self {
            skill_id: skill_id.into(),
            weight,
            difficulty: None,
        }
    }

    pub fn with_difficulty(mut self, difficulty: i32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Weight used for scoring. Non-positive or non-finite weights count as the default.
    pub fn effective_weight(&self) -> f64 {
        if self.weight.is_finite() && self.weight > 0.0 {
            self.weight
        } else {
            DEFAULT_SKILL_WEIGHT
        }
    }
}

fn default_weight() -> f64 {
    DEFAULT_SKILL_WEIGHT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningActivity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub difficulty: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<i32>,
    #[serde(default)]
    pub sort_order: i32,
    pub is_active: bool,
    pub is_locked: bool,
    #[serde(default)]
    pub skills: Vec<ActivitySkill>,
}

impl LearningActivity {
    pub fn new(id: impl Into<String>, difficulty: i32) -> Self {
        Self {
            id: id.into(),
            category: None,
            difficulty,
            estimated_minutes: None,
            sort_order: 0,
            is_active: true,
            is_locked: false,
            skills: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_skill(mut self, skill: ActivitySkill) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_estimated_minutes(mut self, minutes: i32) -> Self {
        self.estimated_minutes = Some(minutes);
        self
    }

    pub fn is_eligible(&self) -> bool {
        self.is_active && !self.is_locked
    }
}

/// One row of a learner's attempt history, most recent first when loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityAttempt {
    pub activity_id: String,
    pub completed: bool,
    pub score: f64,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub activity_id: String,
    pub score: f64,
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<i32>,
}

/// Persisted snapshot of one generation. Never updated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQueue {
    pub id: String,
    pub user_id: String,
    pub items: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResult {
    pub items: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationOptions {
    pub limit: Option<i64>,
    pub ttl_hours: Option<f64>,
}

impl RecommendationOptions {
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_ttl_hours(mut self, ttl_hours: f64) -> Self {
        self.ttl_hours = Some(ttl_hours);
        self
    }
}
