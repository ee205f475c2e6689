//! SQLite storage backend implementation
//!
//! Embedded record sink - no separate database server required. WAL mode
//! keeps reads (the query API) from blocking the recorder's batch writes,
//! and the connection pool provides the internal synchronization the sink
//! contract requires.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use crate::{PingRecord, StatusKind};

use super::backend::{HealthStatus, RecordQuery, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::TargetStats;

/// SQLite record sink.
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Open (creating if missing) the database file, run migrations and
    /// configure SQLite for concurrent use.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> PingRecord {
        let status_str: String = row.get("status");
        PingRecord {
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
            target: row.get("target"),
            resolved_ip: row.get("resolved_ip"),
            status: StatusKind::from_str_lossy(&status_str),
            latency_ms: row.get("latency_ms"),
            attempt: row.get::<i64, _>("attempt") as u64,
        }
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn insert_batch(&self, records: Vec<PingRecord>) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        debug!("inserting {} records into SQLite", records.len());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO ping_records (timestamp, target, resolved_ip, status, latency_ms, attempt)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Self::timestamp_to_millis(&record.timestamp))
            .bind(&record.target)
            .bind(&record.resolved_ip)
            .bind(record.status.as_str())
            .bind(record.latency_ms)
            .bind(record.attempt as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn query_records(&self, query: RecordQuery) -> StorageResult<Vec<PingRecord>> {
        let rows = match &query.target {
            Some(target) => {
                sqlx::query(
                    r#"
                    SELECT timestamp, target, resolved_ip, status, latency_ms, attempt
                    FROM ping_records
                    WHERE target = ?
                    ORDER BY id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(target)
                .bind(query.limit as i64)
                .bind(query.offset as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT timestamp, target, resolved_ip, status, latency_ms, attempt
                    FROM ping_records
                    ORDER BY id DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(query.limit as i64)
                .bind(query.offset as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    #[instrument(skip(self))]
    async fn latest_per_target(&self) -> StorageResult<Vec<PingRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT pr.timestamp, pr.target, pr.resolved_ip, pr.status, pr.latency_ms, pr.attempt
            FROM ping_records pr
            JOIN (SELECT target, MAX(id) AS max_id FROM ping_records GROUP BY target) latest
              ON pr.id = latest.max_id
            ORDER BY pr.target ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    #[instrument(skip(self))]
    async fn target_stats(&self, target: &str, window: usize) -> StorageResult<TargetStats> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, target, resolved_ip, status, latency_ms, attempt
            FROM ping_records
            WHERE target = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(target)
        .bind(window as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let recent: Vec<PingRecord> = rows.iter().map(Self::row_to_record).collect();
        Ok(TargetStats::from_window(target, &recent))
    }

    #[instrument(skip(self), fields(before = %before))]
    async fn cleanup_old_records(&self, before: DateTime<Utc>) -> StorageResult<usize> {
        let result = sqlx::query("DELETE FROM ping_records WHERE timestamp < ?")
            .bind(Self::timestamp_to_millis(&before))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        let deleted = result.rows_affected() as usize;
        if deleted > 0 {
            info!("retention cleanup deleted {} records", deleted);
        }
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ping_records")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::UnhealthyBackend(e.to_string()))?;

        Ok(HealthStatus {
            healthy: true,
            message: format!("SQLite operational ({count} records)"),
            metadata: HashMap::from([
                ("backend".to_string(), "sqlite".to_string()),
                ("path".to_string(), self.db_path.clone()),
                ("total_records".to_string(), count.to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite connection pool");
        self.pool.close().await;
        Ok(())
    }
}
