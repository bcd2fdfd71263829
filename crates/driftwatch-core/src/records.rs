//! Append-only store of analysis records

use crate::{now_millis, AnalysisRecord, RecordReceipt, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// Record store interface
///
/// Records are never updated or deleted once appended.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stamp the record with a fresh id and creation time, then persist it
    async fn append(&self, record: &mut AnalysisRecord) -> Result<RecordReceipt>;

    /// Up to `limit` records for a subject, most recent first
    async fn recent(&self, subject_id: i64, limit: u32) -> Result<Vec<AnalysisRecord>>;

    /// Total number of stored records
    async fn count(&self) -> Result<u64>;
}

/// SQLite-backed record store
#[derive(Clone)]
pub struct Records {
    pool: SqlitePool,
}

impl Records {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for Records {
    async fn append(&self, record: &mut AnalysisRecord) -> Result<RecordReceipt> {
        record.id = Uuid::new_v4();
        record.analysis_date = now_millis();

        info!(
            "Appending analysis record {} for subject {}",
            record.id, record.subject_id
        );

        let data_json = record.to_json()?;

        sqlx::query(
            r#"
            INSERT INTO analysis_records (id, subject_id, analysis_date, data_json)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.subject_id)
        .bind(record.analysis_date.timestamp_millis())
        .bind(&data_json)
        .execute(&self.pool)
        .await?;

        Ok(RecordReceipt {
            id: record.id,
            analysis_date: record.analysis_date,
        })
    }

    async fn recent(&self, subject_id: i64, limit: u32) -> Result<Vec<AnalysisRecord>> {
        debug!("Loading {} recent records for subject {}", limit, subject_id);

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT data_json
            FROM analysis_records
            WHERE subject_id = ?
            ORDER BY analysis_date DESC, seq DESC
            LIMIT ?
            "#,
        )
        .bind(subject_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(data_json,)| AnalysisRecord::from_json(&data_json))
            .collect()
    }

    async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analysis_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CoachingPlan, Database, DriftAssessment, DriftReport, DriftSource, GoalAnalysis,
        HistorySnapshot, PatternClassification, RunParameters, SubjectProfile,
    };
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn sample_record(subject_id: i64, summary: &str) -> AnalysisRecord {
        let params = RunParameters::default();
        AnalysisRecord {
            id: Uuid::nil(),
            subject_id,
            student_info: SubjectProfile {
                subject_id,
                name: "Test Student".to_string(),
                register_number: "REG-TEST".to_string(),
            },
            goal_analysis: GoalAnalysis {
                quarterly_goal: params.goal.clone(),
                current_level: params.level.clone(),
                readiness_score: 40,
            },
            run_parameters: params,
            history: HistorySnapshot {
                items: Vec::new(),
                synthesized: true,
            },
            trajectory_summary: summary.to_string(),
            drift_analysis: DriftAssessment {
                report: DriftReport::fallback(),
                source: DriftSource::Parsed,
            },
            pattern_analysis: PatternClassification {
                primary: None,
                analysis: String::new(),
            },
            coaching_plan: CoachingPlan::default(),
            pillar_analysis: BTreeMap::new(),
            run_started_at: now_millis(),
            analysis_date: now_millis(),
        }
    }

    async fn setup() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_append_assigns_distinct_ids() {
        let (_temp, db) = setup().await;
        let records = db.records();

        let mut first = sample_record(1, "first");
        let mut second = sample_record(1, "second");
        let a = records.append(&mut first).await.unwrap();
        let b = records.append(&mut second).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(first.id, a.id);
        assert_eq!(records.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let (_temp, db) = setup().await;
        let records = db.records();

        for summary in ["t1", "t2", "t3"] {
            records
                .append(&mut sample_record(7, summary))
                .await
                .unwrap();
        }
        records.append(&mut sample_record(8, "other")).await.unwrap();

        let recent = records.recent(7, 5).await.unwrap();
        let order: Vec<_> = recent.iter().map(|r| r.trajectory_summary.as_str()).collect();
        assert_eq!(order, vec!["t3", "t2", "t1"]);

        let limited = records.recent(7, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].trajectory_summary, "t3");

        assert!(records.recent(99, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_cannot_be_modified() {
        let (_temp, db) = setup().await;
        let records = db.records();
        records.append(&mut sample_record(1, "kept")).await.unwrap();

        let update = sqlx::query("UPDATE analysis_records SET subject_id = 2")
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM analysis_records")
            .execute(db.pool())
            .await;
        assert!(delete.is_err());

        assert_eq!(records.count().await.unwrap(), 1);
    }
}
