//! Property-based tests for the recommendation scorer.
//!
//! Invariants covered:
//! - Score bounds: every score lies in [0, 1]
//! - Ordering: ranked items are sorted descending, ties keep catalog order
//! - Mastery monotonicity: lower mastery never lowers the mastery score
//! - Completed penalty: completion never raises a score

use std::collections::{HashMap, HashSet};

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use learnquest_backend::services::recommendation::scoring::{
    mastery_score, rank, score_activity, LearnerSignals, ScoringWeights,
};
use learnquest_backend::services::recommendation::{
    ActivityAttempt, ActivitySkill, LearningActivity,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

const SKILLS: [&str; 4] = ["s0", "s1", "s2", "s3"];
const CATEGORIES: [&str; 3] = ["math", "reading", "science"];

fn arb_skill_link() -> impl Strategy<Value = ActivitySkill> {
    (
        0usize..SKILLS.len(),
        prop_oneof![(0.1f64..=5.0f64), Just(0.0), Just(-1.0)],
        proptest::option::of(1i32..=4i32),
    )
        .prop_map(|(skill, weight, difficulty)| ActivitySkill {
            skill_id: SKILLS[skill].to_string(),
            weight,
            difficulty,
        })
}

fn arb_activity(id: usize) -> impl Strategy<Value = LearningActivity> {
    (
        1i32..=4i32,
        proptest::option::of(0usize..CATEGORIES.len()),
        prop::collection::vec(arb_skill_link(), 0..4),
    )
        .prop_map(move |(difficulty, category, skills)| LearningActivity {
            id: format!("act-{id}"),
            category: category.map(|c| CATEGORIES[c].to_string()),
            difficulty,
            estimated_minutes: Some(10),
            sort_order: id as i32,
            is_active: true,
            is_locked: false,
            skills,
        })
}

fn arb_catalog() -> impl Strategy<Value = Vec<LearningActivity>> {
    (0usize..8).prop_flat_map(|len| (0..len).map(arb_activity).collect::<Vec<_>>())
}

fn arb_mastery() -> impl Strategy<Value = HashMap<String, f64>> {
    prop::collection::vec(proptest::option::of(0.0f64..=100.0f64), SKILLS.len()).prop_map(
        |values| {
            values
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|m| (SKILLS[i].to_string(), m)))
                .collect()
        },
    )
}

fn arb_attempt() -> impl Strategy<Value = ActivityAttempt> {
    (
        0usize..8,
        any::<bool>(),
        proptest::option::of(0usize..CATEGORIES.len()),
        0i64..10_000,
    )
        .prop_map(|(activity, completed, category, offset)| ActivityAttempt {
            activity_id: format!("act-{activity}"),
            completed,
            score: 50.0,
            started_at: Utc.timestamp_opt(1_700_000_000 + offset, 0).unwrap(),
            category: category.map(|c| CATEGORIES[c].to_string()),
        })
}

fn arb_signals() -> impl Strategy<Value = LearnerSignals> {
    (arb_mastery(), prop::collection::vec(arb_attempt(), 0..30)).prop_map(
        |(mastery, attempts)| LearnerSignals::from_inputs(mastery, &attempts, HashSet::new()),
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// PBT-1: every score stays within [0, 1]
    #[test]
    fn score_is_bounded(catalog in arb_catalog(), signals in arb_signals()) {
        let weights = ScoringWeights::default();
        for activity in &catalog {
            let scored = score_activity(activity, &signals, &weights);
            prop_assert!(scored.score >= 0.0 && scored.score <= 1.0, "score {}", scored.score);
        }
    }

    /// PBT-2: ranked output is sorted and stable, and keeps every candidate
    #[test]
    fn rank_is_sorted_and_stable(catalog in arb_catalog(), signals in arb_signals()) {
        let ranked = rank(&catalog, &signals, &ScoringWeights::default());
        prop_assert_eq!(ranked.len(), catalog.len());

        let position: HashMap<&str, usize> = catalog
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.as_str(), i))
            .collect();
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                prop_assert!(position[pair[0].activity_id.as_str()] < position[pair[1].activity_id.as_str()]);
            }
        }
    }

    /// PBT-3: lowering one mapped skill's mastery never lowers the mastery score
    #[test]
    fn lower_mastery_never_lowers_mastery_score(
        activity in arb_activity(0),
        mastery in arb_mastery(),
        skill in 0usize..SKILLS.len(),
        drop in 0.0f64..=100.0f64,
    ) {
        let skill_id = SKILLS[skill].to_string();
        let before = LearnerSignals::from_inputs(mastery.clone(), &[], HashSet::new());

        let mut lowered = mastery;
        let current = lowered.get(&skill_id).copied().unwrap_or(0.0);
        lowered.insert(skill_id, (current - drop).max(0.0));
        let after = LearnerSignals::from_inputs(lowered, &[], HashSet::new());

        match (mastery_score(&activity, &before), mastery_score(&activity, &after)) {
            (Some(b), Some(a)) => prop_assert!(a + 1e-12 >= b, "before {} after {}", b, a),
            (None, None) => prop_assert!(activity.skills.is_empty()),
            _ => prop_assert!(false, "mapping presence changed"),
        }
    }

    /// PBT-4: marking an activity completed never raises its score
    #[test]
    fn completion_never_raises_score(
        activity in arb_activity(0),
        mastery in arb_mastery(),
        attempts in prop::collection::vec(arb_attempt(), 0..20),
    ) {
        let weights = ScoringWeights::default();
        let fresh_attempts: Vec<ActivityAttempt> = attempts
            .into_iter()
            .map(|mut a| {
                a.completed = false;
                a
            })
            .collect();

        let without = LearnerSignals::from_inputs(mastery.clone(), &fresh_attempts, HashSet::new());
        let with = LearnerSignals::from_inputs(
            mastery,
            &fresh_attempts,
            HashSet::from([activity.id.clone()]),
        );

        let plain = score_activity(&activity, &without, &weights).score;
        let penalized = score_activity(&activity, &with, &weights).score;
        prop_assert!(penalized <= plain);
    }
}
