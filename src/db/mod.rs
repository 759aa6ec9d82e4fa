//! Database module

mod schema;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

use crate::config::DatabaseConfig;

/// One answer submitted by a quiz client
///
/// Every field falls back to its zero value when absent from the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticRecord {
    pub chord_name: String,
    pub root_note: String,
    pub chord_extension: String,
    #[serde(alias = "answer_duration_millis")]
    pub answer_duration_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Number of records created on one UTC calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub day: String,
    pub count: i64,
}

impl DailyCount {
    pub fn new(day: impl Into<String>, count: i64) -> Self {
        Self {
            day: day.into(),
            count,
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Private in-memory database. The pool holds a single connection that
    /// never expires, since every new `:memory:` connection is a fresh database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Liveness probe, run once before serving traffic
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the statistics table if it is missing. There is no versioned
    /// migration history.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(schema::CREATE_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(schema::CREATE_INDEX_CREATED_AT)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn insert_record(&self, record: &StatisticRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO statistics (chord_name, root_note, chord_extension, answer_duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.chord_name)
        .bind(&record.root_note)
        .bind(&record.chord_extension)
        .bind(record.answer_duration_ms)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Every stored record, unfiltered and unpaginated
    pub async fn get_all_records(&self) -> Result<Vec<StatisticRecord>> {
        let rows: Vec<(String, String, String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT chord_name, root_note, chord_extension, answer_duration_ms, created_at
            FROM statistics
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(chord_name, root_note, chord_extension, answer_duration_ms, ts)| -> Result<StatisticRecord> {
                let created_at = DateTime::from_timestamp_millis(ts)
                    .ok_or_else(|| anyhow!("created_at out of range: {ts}"))?;
                Ok(StatisticRecord {
                    chord_name,
                    root_note,
                    chord_extension,
                    answer_duration_ms,
                    created_at,
                })
            })
            .collect()
    }

    /// Group records by the UTC calendar day of `created_at`. Days without
    /// records are absent from the result.
    pub async fn count_by_day(&self) -> Result<Vec<DailyCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT strftime('%Y-%m-%d', created_at / 1000.0, 'unixepoch') AS day, COUNT(*) AS count
            FROM statistics
            GROUP BY day
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(day, count)| DailyCount::new(day, count))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chord: &str, created_at: &str) -> StatisticRecord {
        StatisticRecord {
            chord_name: chord.to_string(),
            root_note: "C".to_string(),
            chord_extension: "maj7".to_string(),
            answer_duration_ms: 1500,
            created_at: created_at.parse().unwrap(),
        }
    }

    #[test]
    fn absent_fields_decode_to_zero_values() {
        let record: StatisticRecord = serde_json::from_str(r#"{"chord_name": "Cmaj7"}"#).unwrap();

        assert_eq!(record.chord_name, "Cmaj7");
        assert_eq!(record.root_note, "");
        assert_eq!(record.answer_duration_ms, 0);
        assert_eq!(record.created_at.timestamp(), 0);
    }

    #[test]
    fn legacy_duration_field_name_is_accepted() {
        let record: StatisticRecord =
            serde_json::from_str(r#"{"answer_duration_millis": 820}"#).unwrap();
        assert_eq!(record.answer_duration_ms, 820);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["answer_duration_ms"], 820);
    }

    #[tokio::test]
    async fn inserted_records_are_returned() {
        let db = Database::in_memory().await.unwrap();
        let first = record("Cmaj7", "2024-01-05T10:00:00Z");
        let second = record("Dm7", "2024-01-06T08:00:00.250Z");

        db.insert_record(&first).await.unwrap();
        db.insert_record(&second).await.unwrap();

        let records = db.get_all_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.contains(&first));
        assert!(records.contains(&second));
    }

    #[tokio::test]
    async fn count_by_day_groups_on_utc_date() {
        let db = Database::in_memory().await.unwrap();
        for ts in [
            "2024-01-05T10:00:00Z",
            "2024-01-05T23:59:59Z",
            "2024-01-06T01:00:00+02:00", // 2024-01-05T23:00:00Z
            "2024-01-06T08:00:00Z",
        ] {
            db.insert_record(&record("Cmaj7", ts)).await.unwrap();
        }

        let mut counts = db.count_by_day().await.unwrap();
        counts.sort_by(|a, b| a.day.cmp(&b.day));

        assert_eq!(
            counts,
            vec![DailyCount::new("2024-01-05", 3), DailyCount::new("2024-01-06", 1)]
        );
    }

    #[tokio::test]
    async fn empty_store_has_no_days() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.count_by_day().await.unwrap().is_empty());
        assert!(db.get_all_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_database_is_created_and_pingable() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite:{}", dir.path().join("stats.db").display()),
            max_connections: 2,
        };

        let db = Database::new(&config).await.unwrap();
        db.ping().await.unwrap();
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();
        db.insert_record(&StatisticRecord::default()).await.unwrap();
        db.close().await;

        let reopened = Database::new(&config).await.unwrap();
        assert_eq!(reopened.get_all_records().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closed_pool_reports_errors() {
        let db = Database::in_memory().await.unwrap();
        db.close().await;

        assert!(db.ping().await.is_err());
        assert!(db.insert_record(&StatisticRecord::default()).await.is_err());
    }
}
