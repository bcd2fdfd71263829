//! Subjects and their activity history

use crate::{now_millis, ActivityItem, Error, Result, SubjectProfile};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Activity store interface
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Look up a subject profile
    async fn subject(&self, subject_id: i64) -> Result<Option<SubjectProfile>>;

    /// Insert or replace a subject profile
    async fn upsert_subject(&self, profile: &SubjectProfile) -> Result<()>;

    /// Record one activity item for an existing subject
    async fn add_activity(&self, subject_id: i64, item: &ActivityItem) -> Result<()>;

    /// Up to `limit` activity items for a subject, newest first
    async fn recent_activity(&self, subject_id: i64, limit: u32) -> Result<Vec<ActivityItem>>;

    /// Number of known subjects
    async fn subject_count(&self) -> Result<u64>;
}

/// SQLite-backed activity store
#[derive(Clone)]
pub struct Activities {
    pool: SqlitePool,
}

impl Activities {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for Activities {
    async fn subject(&self, subject_id: i64) -> Result<Option<SubjectProfile>> {
        debug!("Getting subject: {}", subject_id);

        let row: Option<(i64, String, String)> = sqlx::query_as(
            r#"
            SELECT subject_id, name, register_number
            FROM subjects
            WHERE subject_id = ?
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(subject_id, name, register_number)| SubjectProfile {
            subject_id,
            name,
            register_number,
        }))
    }

    async fn upsert_subject(&self, profile: &SubjectProfile) -> Result<()> {
        info!("Saving subject: {} ({})", profile.subject_id, profile.name);

        sqlx::query(
            r#"
            INSERT INTO subjects (subject_id, name, register_number, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(subject_id) DO UPDATE SET
                name = excluded.name,
                register_number = excluded.register_number
            "#,
        )
        .bind(profile.subject_id)
        .bind(&profile.name)
        .bind(&profile.register_number)
        .bind(now_millis().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_activity(&self, subject_id: i64, item: &ActivityItem) -> Result<()> {
        if self.subject(subject_id).await?.is_none() {
            return Err(Error::subject_not_found(subject_id));
        }

        debug!(
            "Adding {} activity for subject {}: {}",
            item.pillar, subject_id, item.objective
        );

        let data_json = serde_json::to_string(item)?;

        sqlx::query(
            r#"
            INSERT INTO activities (subject_id, cycle, pillar, created_at, data_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(subject_id)
        .bind(&item.cycle)
        .bind(item.pillar.as_str())
        .bind(item.created_at.timestamp_millis())
        .bind(&data_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_activity(&self, subject_id: i64, limit: u32) -> Result<Vec<ActivityItem>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT data_json
            FROM activities
            WHERE subject_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(subject_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(data_json,)| serde_json::from_str(&data_json).map_err(Error::from))
            .collect()
    }

    async fn subject_count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subjects")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{seed, Database, Pillar};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_subject_round_trip() {
        let (_temp, db) = setup().await;
        let activity = db.activity();

        assert!(activity.subject(1).await.unwrap().is_none());

        let mut profile = SubjectProfile {
            subject_id: 1,
            name: "Ada".to_string(),
            register_number: "REG-0001".to_string(),
        };
        activity.upsert_subject(&profile).await.unwrap();
        profile.name = "Ada L.".to_string();
        activity.upsert_subject(&profile).await.unwrap();

        assert_eq!(activity.subject(1).await.unwrap(), Some(profile));
        assert_eq!(activity.subject_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_activity_newest_first_and_limited() {
        let (_temp, db) = setup().await;
        let activity = db.activity();
        let now = now_millis();

        let demo = seed::demo_subjects(now).remove(0);
        activity.upsert_subject(&demo.profile).await.unwrap();

        for days in [30, 10, 20] {
            let item = ActivityItem {
                cycle: format!("D-{days}"),
                pillar: Pillar::Scd,
                objective: "Practice".to_string(),
                key_results: vec![],
                completion_status: 0.5,
                created_at: now - Duration::days(days),
                metadata: Default::default(),
            };
            activity.add_activity(1, &item).await.unwrap();
        }

        let items = activity.recent_activity(1, 2).await.unwrap();
        let cycles: Vec<_> = items.iter().map(|i| i.cycle.as_str()).collect();
        assert_eq!(cycles, vec!["D-10", "D-20"]);
    }

    #[tokio::test]
    async fn test_add_activity_requires_subject() {
        let (_temp, db) = setup().await;
        let demo = seed::demo_subjects(now_millis()).remove(0);

        let err = db
            .activity()
            .add_activity(42, &demo.activity[0])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
