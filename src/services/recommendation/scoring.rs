use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::types::{ActivityAttempt, LearningActivity, RecommendationItem};

const MAX_MASTERY: f64 = 100.0;
const DIFFICULTY_SPAN: f64 = 3.0;
const DEFAULT_PREFERRED_DIFFICULTY: i32 = 1;
const LOW_MASTERY_CEILING: f64 = 40.0;
const MEDIUM_MASTERY_CEILING: f64 = 70.0;
const UNKNOWN_CATEGORY_DIVERSITY: f64 = 0.5;

const MASTERY_REASON_THRESHOLD: f64 = 0.5;
const ALIGNMENT_REASON_THRESHOLD: f64 = 0.66;
const DIVERSITY_REASON_THRESHOLD: f64 = 0.5;

pub const REASON_LOW_MASTERY: &str = "Addresses low-mastery skills";
pub const REASON_DIFFICULTY_MATCH: &str = "Matches your current difficulty";
pub const REASON_DIVERSITY: &str = "Improves topic diversity";
pub const REASON_UNMAPPED: &str = "No skill mapping; using base score";
pub const REASON_REFRESHER: &str = "Completed before; useful as a refresher";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub mastery: f64,
    pub difficulty: f64,
    pub diversity: f64,
    /// Stands in for the mastery score when an activity has no skill mappings.
    pub unmapped_base: f64,
    pub repeat_step: f64,
    pub max_recency_penalty: f64,
    pub completed_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            mastery: 0.6,
            difficulty: 0.2,
            diversity: 0.2,
            unmapped_base: 0.25,
            repeat_step: 0.2,
            max_recency_penalty: 0.5,
            completed_penalty: 0.6,
        }
    }
}

/// Everything the scorer knows about a learner, aggregated once per generation.
#[derive(Debug, Clone)]
pub struct LearnerSignals {
    mastery: HashMap<String, f64>,
    preferred_difficulty: i32,
    category_counts: HashMap<String, usize>,
    max_category_count: usize,
    repeat_counts: HashMap<String, usize>,
    completed: HashSet<String>,
}

impl LearnerSignals {
    pub fn from_inputs(
        mastery: HashMap<String, f64>,
        recent_attempts: &[ActivityAttempt],
        completed_ids: HashSet<String>,
    ) -> Self {
        let mut category_counts: HashMap<String, usize> = HashMap::new();
        let mut repeat_counts: HashMap<String, usize> = HashMap::new();
        let mut completed = completed_ids;

        for attempt in recent_attempts {
            if let Some(category) = attempt.category.as_deref() {
                *category_counts.entry(category.to_string()).or_default() += 1;
            }
            *repeat_counts.entry(attempt.activity_id.clone()).or_default() += 1;
            if attempt.completed {
                completed.insert(attempt.activity_id.clone());
            }
        }

        let max_category_count = category_counts.values().copied().max().unwrap_or(0);
        let preferred_difficulty = preferred_difficulty(&mastery);

        Self {
            mastery,
            preferred_difficulty,
            category_counts,
            max_category_count,
            repeat_counts,
            completed,
        }
    }

    pub fn preferred_difficulty(&self) -> i32 {
        self.preferred_difficulty
    }

    pub fn mastery_of(&self, skill_id: &str) -> f64 {
        self.mastery
            .get(skill_id)
            .copied()
            .filter(|m| m.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, MAX_MASTERY)
    }

    pub fn has_completed(&self, activity_id: &str) -> bool {
        self.completed.contains(activity_id)
    }

    pub fn repeat_count(&self, activity_id: &str) -> usize {
        self.repeat_counts.get(activity_id).copied().unwrap_or(0)
    }
}

impl Default for LearnerSignals {
    fn default() -> Self {
        Self::from_inputs(HashMap::new(), &[], HashSet::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub mastery_score: f64,
    pub difficulty_alignment: f64,
    pub diversity_score: f64,
    pub recency_penalty: f64,
    pub completed_penalty: f64,
    pub skill_mapped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityScore {
    pub score: f64,
    pub reasons: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

/// Step function of the learner's average mastery. No data means beginner.
pub fn preferred_difficulty(mastery: &HashMap<String, f64>) -> i32 {
    let values: Vec<f64> = mastery
        .values()
        .copied()
        .filter(|m| m.is_finite())
        .map(|m| m.clamp(0.0, MAX_MASTERY))
        .collect();
    if values.is_empty() {
        return DEFAULT_PREFERRED_DIFFICULTY;
    }

    let average = values.iter().sum::<f64>() / values.len() as f64;
    if average < LOW_MASTERY_CEILING {
        1
    } else if average < MEDIUM_MASTERY_CEILING {
        2
    } else {
        3
    }
}

/// Weighted, normalized mastery gap over the activity's skills.
/// `None` when the activity is not mapped to any skill.
pub fn mastery_score(activity: &LearningActivity, signals: &LearnerSignals) -> Option<f64> {
    if activity.skills.is_empty() {
        return None;
    }

    let mut weighted_need = 0.0;
    let mut max_need = 0.0;
    for link in &activity.skills {
        let weight = link.effective_weight();
        weighted_need += weight * (MAX_MASTERY - signals.mastery_of(&link.skill_id));
        max_need += weight * MAX_MASTERY;
    }

    Some((weighted_need / max_need).clamp(0.0, 1.0))
}

/// The activity's difficulty, or the weight-averaged mapping difficulty when
/// any mapping overrides it.
pub fn effective_difficulty(activity: &LearningActivity) -> f64 {
    let base = activity.difficulty as f64;
    if activity.skills.iter().all(|link| link.difficulty.is_none()) {
        return base;
    }

    let (sum, weights) = activity.skills.iter().fold((0.0, 0.0), |(sum, weights), link| {
        let weight = link.effective_weight();
        let difficulty = link.difficulty.map(f64::from).unwrap_or(base);
        (sum + weight * difficulty, weights + weight)
    });
    sum / weights
}

pub fn difficulty_alignment(difficulty: f64, preferred: i32) -> f64 {
    (1.0 - (difficulty - preferred as f64).abs() / DIFFICULTY_SPAN).clamp(0.0, 1.0)
}

pub fn diversity_score(category: Option<&str>, signals: &LearnerSignals) -> f64 {
    let Some(category) = category else {
        return UNKNOWN_CATEGORY_DIVERSITY;
    };
    if signals.max_category_count == 0 {
        return 1.0;
    }

    let seen = signals.category_counts.get(category).copied().unwrap_or(0);
    (1.0 - seen as f64 / signals.max_category_count as f64).clamp(0.0, 1.0)
}

pub fn recency_penalty(repeat_count: usize, weights: &ScoringWeights) -> f64 {
    (repeat_count as f64 * weights.repeat_step).min(weights.max_recency_penalty)
}

pub fn score_activity(
    activity: &LearningActivity,
    signals: &LearnerSignals,
    weights: &ScoringWeights,
) -> ActivityScore {
    let mapped = mastery_score(activity, signals);
    let mastery = mapped.unwrap_or(weights.unmapped_base);
    let alignment = difficulty_alignment(
        effective_difficulty(activity),
        signals.preferred_difficulty(),
    );
    let diversity = diversity_score(activity.category.as_deref(), signals);
    let recency = recency_penalty(signals.repeat_count(&activity.id), weights);
    let completed = if signals.has_completed(&activity.id) {
        weights.completed_penalty
    } else {
        0.0
    };

    let base = weights.mastery * mastery
        + weights.difficulty * alignment
        + weights.diversity * diversity;
    let score = (base * (1.0 - recency) * (1.0 - completed)).clamp(0.0, 1.0);

    let mut reasons = Vec::new();
    match mapped {
        Some(m) if m >= MASTERY_REASON_THRESHOLD => reasons.push(REASON_LOW_MASTERY.to_string()),
        Some(_) => {}
        None => reasons.push(REASON_UNMAPPED.to_string()),
    }
    if alignment >= ALIGNMENT_REASON_THRESHOLD {
        reasons.push(REASON_DIFFICULTY_MATCH.to_string());
    }
    if diversity > DIVERSITY_REASON_THRESHOLD {
        reasons.push(REASON_DIVERSITY.to_string());
    }
    if completed > 0.0 {
        reasons.push(REASON_REFRESHER.to_string());
    }

    ActivityScore {
        score,
        reasons,
        breakdown: ScoreBreakdown {
            mastery_score: mastery,
            difficulty_alignment: alignment,
            diversity_score: diversity,
            recency_penalty: recency,
            completed_penalty: completed,
            skill_mapped: mapped.is_some(),
        },
    }
}

/// Scores every candidate and sorts by score descending. The sort is stable,
/// so ties keep catalog order.
pub fn rank(
    catalog: &[LearningActivity],
    signals: &LearnerSignals,
    weights: &ScoringWeights,
) -> Vec<RecommendationItem> {
    let mut items: Vec<RecommendationItem> = catalog
        .iter()
        .map(|activity| {
            let scored = score_activity(activity, signals, weights);
            RecommendationItem {
                activity_id: activity.id.clone(),
                score: scored.score,
                reasons: scored.reasons,
                category: activity.category.clone(),
                difficulty: Some(activity.difficulty),
                estimated_minutes: activity.estimated_minutes,
            }
        })
        .collect();

    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items
}
