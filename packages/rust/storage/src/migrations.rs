//! SQL migration definitions for the ARRS database.
//!
//! Migrations are applied in order on database open. Each one records its
//! version in `schema_migrations`.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: analyses, crawled_pages, engine_scores, gaps, simulation_results",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per analysis run
CREATE TABLE IF NOT EXISTS analyses (
    id              TEXT PRIMARY KEY,
    url             TEXT NOT NULL,
    status          TEXT NOT NULL,
    composite_score REAL,
    metadata_json   TEXT NOT NULL DEFAULT '{}',
    error_message   TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analyses_created_at ON analyses(created_at);
CREATE INDEX IF NOT EXISTS idx_analyses_status ON analyses(status);

-- Acquired markup
CREATE TABLE IF NOT EXISTS crawled_pages (
    id           TEXT PRIMARY KEY,
    analysis_id  TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
    url          TEXT NOT NULL,
    final_url    TEXT NOT NULL,
    markup       TEXT NOT NULL,
    http_status  INTEGER NOT NULL,
    method       TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    crawled_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawled_pages_analysis ON crawled_pages(analysis_id);

-- Per-engine results
CREATE TABLE IF NOT EXISTS engine_scores (
    id           TEXT PRIMARY KEY,
    analysis_id  TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
    engine_name  TEXT NOT NULL,
    score        REAL NOT NULL,
    weight       REAL NOT NULL,
    details_json TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    UNIQUE(analysis_id, engine_name)
);

CREATE INDEX IF NOT EXISTS idx_engine_scores_analysis ON engine_scores(analysis_id);

-- Ordered gap set
CREATE TABLE IF NOT EXISTS gaps (
    id             TEXT PRIMARY KEY,
    analysis_id    TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
    position       INTEGER NOT NULL,
    gap_type       TEXT NOT NULL,
    severity       TEXT NOT NULL,
    description    TEXT NOT NULL,
    recommendation TEXT NOT NULL,
    source         TEXT NOT NULL,
    UNIQUE(analysis_id, position)
);

CREATE INDEX IF NOT EXISTS idx_gaps_analysis ON gaps(analysis_id);

-- AI recommendation simulations
CREATE TABLE IF NOT EXISTS simulation_results (
    id                   TEXT PRIMARY KEY,
    analysis_id          TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
    prompt               TEXT NOT NULL,
    response             TEXT NOT NULL,
    brand_cited          INTEGER NOT NULL,
    citation_count       INTEGER NOT NULL,
    missing_signals_json TEXT NOT NULL,
    metadata_json        TEXT NOT NULL,
    created_at           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_simulation_results_analysis ON simulation_results(analysis_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
