use crate::ports::outbound::{AuditLog, ScanRepository};
use crate::scan_pipeline::domain::{
    AuditEvent, Scan, ScanId, ScanStatus, STATUS_ENCODING_VERSION,
};
use crate::shared::error::ScanError;
use crate::shared::PipelineResult;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scans (
    scan_id TEXT PRIMARY KEY NOT NULL,
    owner TEXT NOT NULL,
    filename TEXT NOT NULL,
    compliance INTEGER NOT NULL DEFAULT 0,
    report_path TEXT,
    status TEXT NOT NULL,
    status_encoding INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scans_owner ON scans(owner);

CREATE TABLE IF NOT EXISTS audit_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event TEXT NOT NULL,
    principal TEXT NOT NULL,
    action TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

const SCAN_COLUMNS: &str =
    "scan_id, owner, filename, compliance, report_path, status, status_encoding, created_at";

/// SqliteScanRepository adapter storing scan records and the audit trail
///
/// Every status change is a single `UPDATE ... WHERE status = ?`, so the
/// compare-and-set is atomic in SQLite and concurrent readers observe either
/// the old or the new status.
#[derive(Clone)]
pub struct SqliteScanRepository {
    pool: Pool<Sqlite>,
}

impl SqliteScanRepository {
    /// Opens (creating if missing) the database at `url` and ensures the schema
    ///
    /// `sqlite::memory:` gives a private in-memory database; the pool is then
    /// pinned to one long-lived connection so all callers share it.
    pub async fn connect(url: &str) -> PipelineResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(ScanError::persistence)?
            .create_if_missing(true);

        let in_memory = url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| ScanError::persistence(format!("failed to connect to database: {}", e)))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| ScanError::persistence(format!("failed to create tables: {}", e)))?;

        tracing::debug!(url, "Scan database initialized");
        Ok(Self { pool })
    }

    /// Opens a database file, creating parent directories as needed
    pub async fn open(path: &Path) -> PipelineResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScanError::io("creating database directory", parent, e))?;
        }
        Self::connect(&format!("sqlite://{}", path.display())).await
    }

    /// All audit events, oldest first
    pub async fn audit_events(&self) -> PipelineResult<Vec<AuditEvent>> {
        let rows = sqlx::query(
            "SELECT event, principal, action, created_at FROM audit_logs ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ScanError::persistence)?;

        rows.iter().map(audit_from_row).collect()
    }

    async fn stored_status(&self, scan_id: &ScanId) -> PipelineResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT status FROM scans WHERE scan_id = ?")
            .bind(scan_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(ScanError::persistence)
    }

    async fn rejected_transition(
        &self,
        scan_id: &ScanId,
        from: ScanStatus,
        to: ScanStatus,
    ) -> ScanError {
        match self.stored_status(scan_id).await {
            Ok(Some(current)) => ScanError::InvalidTransition {
                from: current,
                to: to.to_string(),
            },
            Ok(None) => ScanError::Persistence {
                details: format!("scan {} does not exist", scan_id),
            },
            Err(_) => ScanError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
        }
    }
}

#[async_trait]
impl ScanRepository for SqliteScanRepository {
    async fn insert(&self, scan: &Scan) -> PipelineResult<()> {
        sqlx::query(
            "INSERT INTO scans (scan_id, owner, filename, compliance, report_path, status, status_encoding, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(scan.id().to_string())
        .bind(scan.owner())
        .bind(scan.filename())
        .bind(scan.compliance())
        .bind(scan.report_path().map(|p| p.to_string_lossy().into_owned()))
        .bind(scan.status().as_str())
        .bind(STATUS_ENCODING_VERSION)
        .bind(encode_timestamp(scan.created_at()))
        .execute(&self.pool)
        .await
        .map_err(ScanError::persistence)?;
        Ok(())
    }

    async fn transition(
        &self,
        scan_id: &ScanId,
        from: ScanStatus,
        to: ScanStatus,
    ) -> PipelineResult<()> {
        let to = from.advance(to)?;
        if to == ScanStatus::Completed {
            return Err(ScanError::Validation {
                message: "completion must record a report path".to_string(),
            });
        }

        let result = sqlx::query(
            "UPDATE scans SET status = ?, status_encoding = ? WHERE scan_id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(STATUS_ENCODING_VERSION)
        .bind(scan_id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(ScanError::persistence)?;

        if result.rows_affected() == 0 {
            return Err(self.rejected_transition(scan_id, from, to).await);
        }
        Ok(())
    }

    async fn complete(&self, scan_id: &ScanId, report_path: &Path) -> PipelineResult<()> {
        let from = ScanStatus::ReportGenerating;
        let result = sqlx::query(
            "UPDATE scans SET status = ?, status_encoding = ?, report_path = ? \
             WHERE scan_id = ? AND status = ?",
        )
        .bind(ScanStatus::Completed.as_str())
        .bind(STATUS_ENCODING_VERSION)
        .bind(report_path.to_string_lossy().into_owned())
        .bind(scan_id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(ScanError::persistence)?;

        if result.rows_affected() == 0 {
            return Err(self
                .rejected_transition(scan_id, from, ScanStatus::Completed)
                .await);
        }
        Ok(())
    }

    async fn find(&self, scan_id: &ScanId) -> PipelineResult<Option<Scan>> {
        let row = sqlx::query(&format!("SELECT {} FROM scans WHERE scan_id = ?", SCAN_COLUMNS))
            .bind(scan_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(ScanError::persistence)?;

        row.as_ref().map(scan_from_row).transpose()
    }

    async fn list(&self, owner: Option<&str>) -> PipelineResult<Vec<Scan>> {
        let rows = match owner {
            Some(owner) => {
                sqlx::query(&format!(
                    "SELECT {} FROM scans WHERE owner = ? ORDER BY created_at DESC, rowid DESC",
                    SCAN_COLUMNS
                ))
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM scans ORDER BY created_at DESC, rowid DESC",
                    SCAN_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(ScanError::persistence)?;

        rows.iter().map(scan_from_row).collect()
    }
}

#[async_trait]
impl AuditLog for SqliteScanRepository {
    async fn record(&self, event: AuditEvent) -> PipelineResult<()> {
        sqlx::query(
            "INSERT INTO audit_logs (event, principal, action, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&event.event)
        .bind(&event.principal)
        .bind(event.action.as_str())
        .bind(encode_timestamp(event.timestamp))
        .execute(&self.pool)
        .await
        .map_err(ScanError::persistence)?;
        Ok(())
    }
}

/// Fixed-width UTC form, so text ordering matches time ordering
fn encode_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(value: &str) -> PipelineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ScanError::persistence(format!("invalid timestamp '{}': {}", value, e)))
}

fn scan_from_row(row: &SqliteRow) -> PipelineResult<Scan> {
    let scan_id: String = row.try_get("scan_id").map_err(ScanError::persistence)?;
    let status: String = row.try_get("status").map_err(ScanError::persistence)?;
    let encoding: i64 = row.try_get("status_encoding").map_err(ScanError::persistence)?;
    let report_path: Option<String> = row.try_get("report_path").map_err(ScanError::persistence)?;
    let created_at: String = row.try_get("created_at").map_err(ScanError::persistence)?;

    Ok(Scan::restore(
        scan_id.parse().map_err(ScanError::persistence)?,
        row.try_get("owner").map_err(ScanError::persistence)?,
        row.try_get("filename").map_err(ScanError::persistence)?,
        row.try_get("compliance").map_err(ScanError::persistence)?,
        report_path.map(PathBuf::from),
        ScanStatus::decode(&status, encoding)?,
        decode_timestamp(&created_at)?,
    ))
}

fn audit_from_row(row: &SqliteRow) -> PipelineResult<AuditEvent> {
    let action: String = row.try_get("action").map_err(ScanError::persistence)?;
    let created_at: String = row.try_get("created_at").map_err(ScanError::persistence)?;

    Ok(AuditEvent {
        event: row.try_get("event").map_err(ScanError::persistence)?,
        principal: row.try_get("principal").map_err(ScanError::persistence)?,
        action: action.parse()?,
        timestamp: decode_timestamp(&created_at)?,
    })
}
