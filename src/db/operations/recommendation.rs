use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::Row;

use crate::db::DatabaseProxy;
use crate::services::recommendation::store::{
    decode_items, encode_items, RecommendationStore, StoreError,
};
use crate::services::recommendation::types::{
    ActivityAttempt, ActivitySkill, LearningActivity, RecommendationQueue,
};

#[derive(Clone)]
pub struct PgRecommendationStore {
    proxy: Arc<DatabaseProxy>,
}

impl PgRecommendationStore {
    pub fn new(proxy: Arc<DatabaseProxy>) -> Self {
        Self { proxy }
    }
}

#[async_trait]
impl RecommendationStore for PgRecommendationStore {
    async fn load_mastery(&self, user_id: &str) -> Result<HashMap<String, f64>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT "skillId","mastery"
            FROM "user_skill_mastery"
            WHERE "userId" = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(self.proxy.pool())
        .await?;

        let mut mastery = HashMap::with_capacity(rows.len());
        for row in &rows {
            let skill_id: String = row.try_get("skillId")?;
            let value: f64 = row.try_get("mastery")?;
            mastery.insert(skill_id, value);
        }
        Ok(mastery)
    }

    async fn load_recent_attempts(
        &self,
        user_id: &str,
        window: usize,
    ) -> Result<Vec<ActivityAttempt>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT a."activityId", a."completed", a."score", a."startedAt", la."category"
            FROM "activity_attempts" a
            LEFT JOIN "learning_activities" la ON la."id" = a."activityId"
            WHERE a."userId" = $1
            ORDER BY a."startedAt" DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(i64::try_from(window).unwrap_or(i64::MAX))
        .fetch_all(self.proxy.pool())
        .await?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in &rows {
            let started_at: NaiveDateTime = row.try_get("startedAt")?;
            attempts.push(ActivityAttempt {
                activity_id: row.try_get("activityId")?,
                completed: row.try_get("completed")?,
                score: row.try_get::<Option<f64>, _>("score")?.unwrap_or(0.0),
                started_at: to_utc(started_at),
                category: row.try_get("category")?,
            });
        }
        Ok(attempts)
    }

    async fn load_completed_activity_ids(
        &self,
        user_id: &str,
    ) -> Result<HashSet<String>, StoreError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT "activityId"
            FROM "activity_attempts"
            WHERE "userId" = $1
              AND "completed" = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_all(self.proxy.pool())
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn load_catalog(&self) -> Result<Vec<LearningActivity>, StoreError> {
        let pool = self.proxy.pool();

        let rows = sqlx::query(
            r#"
            SELECT "id","category","difficulty","estimatedMinutes","sortOrder","isActive","isLocked"
            FROM "learning_activities"
            WHERE "isActive" = TRUE
              AND "isLocked" = FALSE
            ORDER BY "sortOrder" ASC, "id" ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut activities = Vec::with_capacity(rows.len());
        for row in &rows {
            activities.push(LearningActivity {
                id: row.try_get("id")?,
                category: row.try_get("category")?,
                difficulty: row.try_get("difficulty")?,
                estimated_minutes: row.try_get("estimatedMinutes")?,
                sort_order: row.try_get("sortOrder")?,
                is_active: row.try_get("isActive")?,
                is_locked: row.try_get("isLocked")?,
                skills: Vec::new(),
            });
        }
        if activities.is_empty() {
            return Ok(activities);
        }

        let activity_ids: Vec<String> = activities.iter().map(|a| a.id.clone()).collect();
        let mapping_rows = sqlx::query(
            r#"
            SELECT "activityId","skillId","weight","difficulty"
            FROM "activity_skills"
            WHERE "activityId" = ANY($1)
            ORDER BY "activityId" ASC, "skillId" ASC
            "#,
        )
        .bind(&activity_ids)
        .fetch_all(pool)
        .await?;

        let mut mappings = Vec::with_capacity(mapping_rows.len());
        for row in &mapping_rows {
            let activity_id: String = row.try_get("activityId")?;
            let weight: Option<f64> = row.try_get("weight")?;
            let mut link = ActivitySkill::new(
                row.try_get::<String, _>("skillId")?,
                weight.unwrap_or(1.0),
            );
            link.difficulty = row.try_get("difficulty")?;
            mappings.push((activity_id, link));
        }

        Ok(attach_skills(activities, mappings))
    }

    async fn latest_queue(&self, user_id: &str) -> Result<Option<RecommendationQueue>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT "id","userId","items","generatedAt","expiresAt"
            FROM "recommendation_queues"
            WHERE "userId" = $1
            ORDER BY "generatedAt" DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.proxy.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: serde_json::Value = row.try_get("items")?;
        let generated_at: NaiveDateTime = row.try_get("generatedAt")?;
        let expires_at: Option<NaiveDateTime> = row.try_get("expiresAt")?;

        Ok(Some(RecommendationQueue {
            id: row.try_get("id")?,
            user_id: row.try_get("userId")?,
            items: decode_items(payload)?,
            generated_at: to_utc(generated_at),
            expires_at: expires_at.map(to_utc),
        }))
    }

    async fn insert_queue(&self, queue: &RecommendationQueue) -> Result<(), StoreError> {
        let payload = encode_items(&queue.items)?;

        sqlx::query(
            r#"
            INSERT INTO "recommendation_queues" ("id","userId","items","generatedAt","expiresAt")
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&queue.id)
        .bind(&queue.user_id)
        .bind(payload)
        .bind(queue.generated_at.naive_utc())
        .bind(queue.expires_at.map(|at| at.naive_utc()))
        .execute(self.proxy.pool())
        .await?;

        Ok(())
    }
}

fn to_utc(value: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
}

/// Distributes mapping rows onto their activities without disturbing catalog order.
fn attach_skills(
    mut activities: Vec<LearningActivity>,
    mappings: Vec<(String, ActivitySkill)>,
) -> Vec<LearningActivity> {
    let index: HashMap<String, usize> = activities
        .iter()
        .enumerate()
        .map(|(i, activity)| (activity.id.clone(), i))
        .collect();

    for (activity_id, link) in mappings {
        if let Some(&i) = index.get(&activity_id) {
            activities[i].skills.push(link);
        }
    }
    activities
}
