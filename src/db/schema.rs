//! Database schema definitions

pub const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS statistics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chord_name TEXT NOT NULL,
    root_note TEXT NOT NULL,
    chord_extension TEXT NOT NULL,
    answer_duration_ms INTEGER NOT NULL,
    created_at BIGINT NOT NULL            -- Unix epoch milliseconds, UTC
)
"#;

// For the per-day grouping
pub const CREATE_INDEX_CREATED_AT: &str =
    "CREATE INDEX IF NOT EXISTS idx_statistics_created_at ON statistics(created_at)";
