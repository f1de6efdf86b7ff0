//! libSQL persistence for ARRS analyses.
//!
//! [`Repository`] is the contract the orchestrator writes through; [`Storage`]
//! implements it over a local libSQL database file. Every statement runs
//! behind one async lock, so a reader never sees half of a gap set.

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, Row, params};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use arrs_shared::{
    Analysis, AnalysisId, AnalysisStatus, ArrsError, CrawledContent, EngineDetails, EngineScore,
    Gap, Result, SimulationResult, StorageConfig,
};

/// Persistence contract for analyses and everything produced during a run.
///
/// Writes are scoped to one analysis id. Status updates follow
/// [`AnalysisStatus::can_transition_to`] and never leave a terminal state.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Insert a new `pending` analysis.
    async fn create_analysis(&self, url: &str, metadata: serde_json::Value) -> Result<Analysis>;

    async fn get_analysis(&self, id: AnalysisId) -> Result<Option<Analysis>>;

    /// Most recent first.
    async fn list_analyses(&self, limit: u32) -> Result<Vec<Analysis>>;

    /// Move to `status`. `error` is recorded only when entering `failed`.
    async fn update_status(
        &self,
        id: AnalysisId,
        status: AnalysisStatus,
        error: Option<&str>,
    ) -> Result<()>;

    async fn update_composite_score(&self, id: AnalysisId, score: f64) -> Result<()>;

    async fn save_crawled_content(&self, content: &CrawledContent) -> Result<()>;

    /// Latest acquired page for the analysis.
    async fn get_crawled_content(&self, id: AnalysisId) -> Result<Option<CrawledContent>>;

    async fn save_engine_score(&self, score: &EngineScore) -> Result<()>;

    /// In the order they were saved.
    async fn get_engine_scores(&self, id: AnalysisId) -> Result<Vec<EngineScore>>;

    /// Append `gaps` in their given order, all or nothing.
    async fn save_gaps(&self, id: AnalysisId, gaps: &[Gap]) -> Result<()>;

    /// In the order they were saved.
    async fn get_gaps(&self, id: AnalysisId) -> Result<Vec<Gap>>;

    async fn save_simulation_result(&self, result: &SimulationResult) -> Result<()>;

    /// Latest simulation for the analysis.
    async fn get_simulation_result(&self, id: AnalysisId) -> Result<Option<SimulationResult>>;
}

fn db_err(e: libsql::Error) -> ArrsError {
    ArrsError::Persistence(e.to_string())
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ArrsError::Persistence(format!("bad timestamp '{raw}': {e}")))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| ArrsError::Persistence(format!("bad id '{raw}': {e}")))
}

fn parse_json(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|e| ArrsError::Persistence(format!("bad JSON column: {e}")))
}

fn to_json(value: &impl serde::Serialize) -> Result<String> {
    serde_json::to_string(value).map_err(|e| ArrsError::Persistence(e.to_string()))
}

fn text(row: &Row, idx: i32) -> Result<String> {
    row.get::<String>(idx).map_err(db_err)
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArrsError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .await
            .map_err(db_err)?;

        let storage = Self {
            db,
            conn: Mutex::new(conn),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open the database named by the `[storage]` config section.
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(&config.resolved_path()?).await
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;
        let conn = self.conn.lock().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                conn.execute_batch(migration.sql).await.map_err(|e| {
                    ArrsError::Persistence(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, 0 before the first migration.
    pub async fn schema_version(&self) -> u32 {
        let conn = self.conn.lock().await;
        let result = conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const ANALYSIS_COLUMNS: &str =
    "id, url, status, composite_score, metadata_json, error_message, created_at, updated_at";

fn analysis_from_row(row: &Row) -> Result<Analysis> {
    Ok(Analysis {
        id: AnalysisId(parse_uuid(&text(row, 0)?)?),
        url: text(row, 1)?,
        status: text(row, 2)?.parse()?,
        composite_score: row.get::<f64>(3).ok(),
        metadata: parse_json(&text(row, 4)?)?,
        error_message: row.get::<String>(5).ok(),
        created_at: parse_timestamp(&text(row, 6)?)?,
        updated_at: parse_timestamp(&text(row, 7)?)?,
    })
}

fn crawled_from_row(row: &Row) -> Result<CrawledContent> {
    let http_status = row.get::<i64>(5).map_err(db_err)?;
    Ok(CrawledContent {
        id: parse_uuid(&text(row, 0)?)?,
        analysis_id: AnalysisId(parse_uuid(&text(row, 1)?)?),
        url: text(row, 2)?,
        final_url: text(row, 3)?,
        markup: text(row, 4)?,
        http_status: u16::try_from(http_status)
            .map_err(|_| ArrsError::Persistence(format!("bad HTTP status {http_status}")))?,
        method: text(row, 6)?,
        content_hash: text(row, 7)?,
        crawled_at: parse_timestamp(&text(row, 8)?)?,
    })
}

fn score_from_row(row: &Row) -> Result<EngineScore> {
    let details: EngineDetails = serde_json::from_str(&text(row, 5)?)
        .map_err(|e| ArrsError::Persistence(format!("bad engine details: {e}")))?;
    Ok(EngineScore {
        id: parse_uuid(&text(row, 0)?)?,
        analysis_id: AnalysisId(parse_uuid(&text(row, 1)?)?),
        engine_name: text(row, 2)?,
        score: row.get::<f64>(3).map_err(db_err)?,
        weight: row.get::<f64>(4).map_err(db_err)?,
        details,
        created_at: parse_timestamp(&text(row, 6)?)?,
    })
}

fn gap_from_row(row: &Row) -> Result<Gap> {
    Ok(Gap {
        id: parse_uuid(&text(row, 0)?)?,
        analysis_id: AnalysisId(parse_uuid(&text(row, 1)?)?),
        gap_type: text(row, 2)?,
        severity: text(row, 3)?.parse()?,
        description: text(row, 4)?,
        recommendation: text(row, 5)?,
        source: text(row, 6)?,
    })
}

fn simulation_from_row(row: &Row) -> Result<SimulationResult> {
    let citation_count = row.get::<i64>(5).map_err(db_err)?;
    let missing_signals: Vec<String> = serde_json::from_str(&text(row, 6)?)
        .map_err(|e| ArrsError::Persistence(format!("bad missing signals: {e}")))?;
    Ok(SimulationResult {
        id: parse_uuid(&text(row, 0)?)?,
        analysis_id: AnalysisId(parse_uuid(&text(row, 1)?)?),
        prompt: text(row, 2)?,
        response: text(row, 3)?,
        brand_cited: row.get::<i64>(4).map_err(db_err)? != 0,
        citation_count: u32::try_from(citation_count).unwrap_or(0),
        missing_signals,
        metadata: parse_json(&text(row, 7)?)?,
        created_at: parse_timestamp(&text(row, 8)?)?,
    })
}

async fn fetch_analysis(conn: &Connection, id: AnalysisId) -> Result<Option<Analysis>> {
    let mut rows = conn
        .query(
            &format!("SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = ?1"),
            params![id.to_string()],
        )
        .await
        .map_err(db_err)?;

    match rows.next().await.map_err(db_err)? {
        Some(row) => Ok(Some(analysis_from_row(&row)?)),
        None => Ok(None),
    }
}

async fn require_analysis(conn: &Connection, id: AnalysisId) -> Result<Analysis> {
    fetch_analysis(conn, id)
        .await?
        .ok_or_else(|| ArrsError::validation(format!("analysis {id} not found")))
}

// ---------------------------------------------------------------------------
// Repository implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Repository for Storage {
    #[instrument(skip_all, fields(url = %url))]
    async fn create_analysis(&self, url: &str, metadata: serde_json::Value) -> Result<Analysis> {
        let now = Utc::now();
        let analysis = Analysis {
            id: AnalysisId::new(),
            url: url.to_string(),
            status: AnalysisStatus::Pending,
            composite_score: None,
            metadata,
            error_message: None,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO analyses (id, url, status, composite_score, metadata_json, error_message, created_at, updated_at)
             VALUES (?1, ?2, ?3, NULL, ?4, NULL, ?5, ?6)",
            params![
                analysis.id.to_string(),
                analysis.url.as_str(),
                analysis.status.as_str(),
                to_json(&analysis.metadata)?,
                timestamp(&now),
                timestamp(&now),
            ],
        )
        .await
        .map_err(db_err)?;

        debug!(analysis_id = %analysis.id, "analysis created");
        Ok(analysis)
    }

    async fn get_analysis(&self, id: AnalysisId) -> Result<Option<Analysis>> {
        let conn = self.conn.lock().await;
        fetch_analysis(&conn, id).await
    }

    async fn list_analyses(&self, limit: u32) -> Result<Vec<Analysis>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {ANALYSIS_COLUMNS} FROM analyses ORDER BY created_at DESC, id DESC LIMIT ?1"
                ),
                params![i64::from(limit)],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(analysis_from_row(&row)?);
        }
        Ok(results)
    }

    #[instrument(skip_all, fields(analysis_id = %id, status = %status))]
    async fn update_status(
        &self,
        id: AnalysisId,
        status: AnalysisStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        let current = require_analysis(&conn, id).await?;

        if !current.status.can_transition_to(status) {
            return Err(ArrsError::validation(format!(
                "analysis {id} cannot move from {} to {status}",
                current.status
            )));
        }
        if status == AnalysisStatus::Completed && current.composite_score.is_none() {
            return Err(ArrsError::validation(format!(
                "analysis {id} cannot complete without a composite score"
            )));
        }

        let now = timestamp(&Utc::now());
        let id_text = id.to_string();
        let updated = match status {
            AnalysisStatus::Failed => {
                conn.execute(
                    "UPDATE analyses SET status = ?1, error_message = ?2, composite_score = NULL, updated_at = ?3
                     WHERE id = ?4",
                    params![
                        status.as_str(),
                        error.unwrap_or("analysis failed"),
                        now,
                        id_text
                    ],
                )
                .await
            }
            AnalysisStatus::Completed => {
                conn.execute(
                    "UPDATE analyses SET status = ?1, error_message = NULL, updated_at = ?2 WHERE id = ?3",
                    params![status.as_str(), now, id_text],
                )
                .await
            }
            AnalysisStatus::Pending | AnalysisStatus::Processing => {
                conn.execute(
                    "UPDATE analyses SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status.as_str(), now, id_text],
                )
                .await
            }
        };
        updated.map_err(db_err)?;

        debug!(from = %current.status, "status updated");
        Ok(())
    }

    async fn update_composite_score(&self, id: AnalysisId, score: f64) -> Result<()> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(ArrsError::validation(format!(
                "composite score {score} is outside [0, 100]"
            )));
        }

        let conn = self.conn.lock().await;
        let current = require_analysis(&conn, id).await?;
        if current.status.is_terminal() {
            return Err(ArrsError::validation(format!(
                "analysis {id} is already {}",
                current.status
            )));
        }

        conn.execute(
            "UPDATE analyses SET composite_score = ?1, updated_at = ?2 WHERE id = ?3",
            params![score, timestamp(&Utc::now()), id.to_string()],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn save_crawled_content(&self, content: &CrawledContent) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO crawled_pages (id, analysis_id, url, final_url, markup, http_status, method, content_hash, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                content.id.to_string(),
                content.analysis_id.to_string(),
                content.url.as_str(),
                content.final_url.as_str(),
                content.markup.as_str(),
                i64::from(content.http_status),
                content.method.as_str(),
                content.content_hash.as_str(),
                timestamp(&content.crawled_at),
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_crawled_content(&self, id: AnalysisId) -> Result<Option<CrawledContent>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT id, analysis_id, url, final_url, markup, http_status, method, content_hash, crawled_at
                 FROM crawled_pages WHERE analysis_id = ?1
                 ORDER BY crawled_at DESC, rowid DESC LIMIT 1",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(crawled_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_engine_score(&self, score: &EngineScore) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO engine_scores (id, analysis_id, engine_name, score, weight, details_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                score.id.to_string(),
                score.analysis_id.to_string(),
                score.engine_name.as_str(),
                score.score,
                score.weight,
                to_json(&score.details)?,
                timestamp(&score.created_at),
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_engine_scores(&self, id: AnalysisId) -> Result<Vec<EngineScore>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT id, analysis_id, engine_name, score, weight, details_json, created_at
                 FROM engine_scores WHERE analysis_id = ?1 ORDER BY rowid",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(score_from_row(&row)?);
        }
        Ok(results)
    }

    #[instrument(skip_all, fields(analysis_id = %id, count = gaps.len()))]
    async fn save_gaps(&self, id: AnalysisId, gaps: &[Gap]) -> Result<()> {
        if let Some(stray) = gaps.iter().find(|g| g.analysis_id != id) {
            return Err(ArrsError::validation(format!(
                "gap {} belongs to analysis {}, not {id}",
                stray.id, stray.analysis_id
            )));
        }
        if gaps.is_empty() {
            return Ok(());
        }

        let conn = self.conn.lock().await;
        let tx = conn.transaction().await.map_err(db_err)?;

        let mut rows = tx
            .query(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM gaps WHERE analysis_id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;
        let offset = match rows.next().await.map_err(db_err)? {
            Some(row) => row.get::<i64>(0).map_err(db_err)?,
            None => 0,
        };
        drop(rows);

        let mut failure = None;
        for (position, gap) in (offset..).zip(gaps) {
            let inserted = tx
                .execute(
                    "INSERT INTO gaps (id, analysis_id, position, gap_type, severity, description, recommendation, source)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        gap.id.to_string(),
                        id.to_string(),
                        position,
                        gap.gap_type.as_str(),
                        gap.severity.as_str(),
                        gap.description.as_str(),
                        gap.recommendation.as_str(),
                        gap.source.as_str(),
                    ],
                )
                .await;
            if let Err(e) = inserted {
                failure = Some(e);
                break;
            }
        }

        if let Some(e) = failure {
            tx.rollback().await.map_err(db_err)?;
            return Err(db_err(e));
        }
        tx.commit().await.map_err(db_err)?;
        debug!("gaps saved");
        Ok(())
    }

    async fn get_gaps(&self, id: AnalysisId) -> Result<Vec<Gap>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT id, analysis_id, gap_type, severity, description, recommendation, source
                 FROM gaps WHERE analysis_id = ?1 ORDER BY position",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(gap_from_row(&row)?);
        }
        Ok(results)
    }

    async fn save_simulation_result(&self, result: &SimulationResult) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO simulation_results (id, analysis_id, prompt, response, brand_cited, citation_count, missing_signals_json, metadata_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                result.id.to_string(),
                result.analysis_id.to_string(),
                result.prompt.as_str(),
                result.response.as_str(),
                i64::from(result.brand_cited),
                i64::from(result.citation_count),
                to_json(&result.missing_signals)?,
                to_json(&result.metadata)?,
                timestamp(&result.created_at),
            ],
        )
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_simulation_result(&self, id: AnalysisId) -> Result<Option<SimulationResult>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT id, analysis_id, prompt, response, brand_cited, citation_count, missing_signals_json, metadata_json, created_at
                 FROM simulation_results WHERE analysis_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(simulation_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use arrs_shared::{ErrorKind, Severity};
    use serde_json::json;

    async fn test_storage() -> Storage {
        let path = std::env::temp_dir().join(format!("arrs_test_{}.db", Uuid::now_v7()));
        Storage::open(&path).await.unwrap()
    }

    async fn processing(storage: &Storage) -> Analysis {
        let analysis = storage
            .create_analysis("https://shop.example.com/p/1", json!({"brand": "Acme"}))
            .await
            .unwrap();
        storage
            .update_status(analysis.id, AnalysisStatus::Processing, None)
            .await
            .unwrap();
        analysis
    }

    fn gap(analysis_id: AnalysisId, gap_type: &str, severity: Severity) -> Gap {
        Gap::new(analysis_id, gap_type, severity, "desc", "rec", "TRE")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let path = std::env::temp_dir().join(format!("arrs_test_{}.db", Uuid::now_v7()));
        let first = Storage::open(&path).await.unwrap();
        drop(first);
        let second = Storage::open(&path).await.unwrap();
        assert_eq!(second.schema_version().await, 1);
    }

    #[tokio::test]
    async fn create_and_get_analysis() {
        let storage = test_storage().await;
        let created = storage
            .create_analysis("https://shop.example.com/p/1", json!({"brand": "Acme"}))
            .await
            .unwrap();
        assert_eq!(created.status, AnalysisStatus::Pending);

        let loaded = storage.get_analysis(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.url, "https://shop.example.com/p/1");
        assert_eq!(loaded.metadata["brand"], "Acme");
        assert!(loaded.composite_score.is_none());
        assert!(loaded.error_message.is_none());

        assert!(storage.get_analysis(AnalysisId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn completed_lifecycle() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;

        storage.update_composite_score(analysis.id, 72.5).await.unwrap();
        storage
            .update_status(analysis.id, AnalysisStatus::Completed, None)
            .await
            .unwrap();

        let loaded = storage.get_analysis(analysis.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, AnalysisStatus::Completed);
        assert_eq!(loaded.composite_score, Some(72.5));
        assert!(loaded.error_message.is_none());
    }

    #[tokio::test]
    async fn completion_requires_composite() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        let err = storage
            .update_status(analysis.id, AnalysisStatus::Completed, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn failure_clears_composite_and_is_terminal() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        storage.update_composite_score(analysis.id, 40.0).await.unwrap();
        storage
            .update_status(analysis.id, AnalysisStatus::Failed, Some("disk full"))
            .await
            .unwrap();

        let loaded = storage.get_analysis(analysis.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, AnalysisStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("disk full"));
        assert!(loaded.composite_score.is_none());

        let err = storage
            .update_status(analysis.id, AnalysisStatus::Processing, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = storage.update_composite_score(analysis.id, 10.0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn pending_cannot_complete() {
        let storage = test_storage().await;
        let analysis = storage.create_analysis("https://a.example", json!({})).await.unwrap();
        assert!(storage
            .update_status(analysis.id, AnalysisStatus::Completed, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn composite_out_of_range_rejected() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        assert!(storage.update_composite_score(analysis.id, 100.5).await.is_err());
        assert!(storage.update_composite_score(analysis.id, f64::NAN).await.is_err());
    }

    #[tokio::test]
    async fn list_newest_first() {
        let storage = test_storage().await;
        let first = storage.create_analysis("https://a.example", json!({})).await.unwrap();
        let second = storage.create_analysis("https://b.example", json!({})).await.unwrap();
        let third = storage.create_analysis("https://c.example", json!({})).await.unwrap();

        let listed = storage.list_analyses(2).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![third.id, second.id]);
        assert_eq!(storage.list_analyses(10).await.unwrap().len(), 3);
        assert!(listed.iter().all(|a| a.id != first.id));
    }

    #[tokio::test]
    async fn crawled_content_roundtrip() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        let content = CrawledContent {
            id: Uuid::now_v7(),
            analysis_id: analysis.id,
            url: analysis.url.clone(),
            final_url: "https://shop.example.com/p/1?ref=x".into(),
            markup: "<html><body>ok</body></html>".into(),
            http_status: 200,
            method: "rendered".into(),
            content_hash: "abc123".into(),
            crawled_at: Utc::now(),
        };
        storage.save_crawled_content(&content).await.unwrap();

        let loaded = storage.get_crawled_content(analysis.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, content.id);
        assert_eq!(loaded.final_url, content.final_url);
        assert_eq!(loaded.http_status, 200);
        assert_eq!(loaded.method, "rendered");
    }

    #[tokio::test]
    async fn engine_scores_keep_details_and_order() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        let ade = EngineScore::new(
            analysis.id,
            "ADE",
            84.0,
            0.3,
            EngineDetails::new()
                .with("product_schema_present", true)
                .with("missing_fields", vec!["gtin", "mpn"]),
        );
        let tre = EngineScore::new(analysis.id, "TRE", 90.0, 0.2, EngineDetails::new());
        storage.save_engine_score(&ade).await.unwrap();
        storage.save_engine_score(&tre).await.unwrap();

        let scores = storage.get_engine_scores(analysis.id).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].engine_name, "ADE");
        assert_eq!(scores[1].engine_name, "TRE");
        assert!(scores[0].details.flag("product_schema_present"));
        assert_eq!(scores[0].details.strings("missing_fields"), vec!["gtin", "mpn"]);
        assert_eq!(scores[0].weight, 0.3);
    }

    #[tokio::test]
    async fn gaps_keep_order_across_saves() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        storage
            .save_gaps(
                analysis.id,
                &[
                    gap(analysis.id, "no_ssl", Severity::Critical),
                    gap(analysis.id, "no_reviews", Severity::Medium),
                ],
            )
            .await
            .unwrap();
        storage
            .save_gaps(analysis.id, &[gap(analysis.id, "missing_h1", Severity::High)])
            .await
            .unwrap();

        let types: Vec<_> = storage
            .get_gaps(analysis.id)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.gap_type)
            .collect();
        assert_eq!(types, vec!["no_ssl", "no_reviews", "missing_h1"]);
    }

    #[tokio::test]
    async fn foreign_gaps_write_nothing() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        let other = AnalysisId::new();
        let err = storage
            .save_gaps(
                analysis.id,
                &[
                    gap(analysis.id, "no_ssl", Severity::Critical),
                    gap(other, "no_reviews", Severity::Medium),
                ],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(storage.get_gaps(analysis.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_gap_batch_rolls_back() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        let duplicate = gap(analysis.id, "no_ssl", Severity::Critical);
        let err = storage
            .save_gaps(analysis.id, &[duplicate.clone(), duplicate])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(storage.get_gaps(analysis.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn simulation_roundtrip() {
        let storage = test_storage().await;
        let analysis = processing(&storage).await;
        let result = SimulationResult {
            id: Uuid::now_v7(),
            analysis_id: analysis.id,
            prompt: "best trail shoes?".into(),
            response: "Brand X".into(),
            brand_cited: false,
            citation_count: 0,
            missing_signals: vec!["Detailed specifications".into()],
            metadata: json!({"provider": "ollama"}),
            created_at: Utc::now(),
        };
        storage.save_simulation_result(&result).await.unwrap();

        let loaded = storage.get_simulation_result(analysis.id).await.unwrap().unwrap();
        assert!(!loaded.brand_cited);
        assert_eq!(loaded.missing_signals, vec!["Detailed specifications"]);
        assert_eq!(loaded.metadata["provider"], "ollama");
    }

    #[tokio::test]
    async fn child_rows_need_an_analysis() {
        let storage = test_storage().await;
        let orphan = EngineScore::new(AnalysisId::new(), "ADE", 10.0, 0.3, EngineDetails::new());
        let err = storage.save_engine_score(&orphan).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
