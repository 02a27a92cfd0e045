//! Persistence of fetch results: the primary database sink and the router
//! that falls back to local files when the database is unavailable.

mod clickhouse;
mod router;
mod row;

pub use clickhouse::ClickHouseSink;
pub use router::{PersistError, PersistOutcome, PersistenceRouter};
pub use row::{encode_json_each_row, FeedContentsRow, FEED_CONTENTS_COLUMNS};

/// Rows acknowledged by the sink, when it reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSummary {
    pub written_rows: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("database unreachable: {0}")]
    Transport(String),
    #[error("database rejected insert (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid database request: {0}")]
    InvalidRequest(String),
}

/// Batch insert of newline-delimited JSON rows into a named table.
pub trait PrimarySink: Send + Sync {
    fn insert(&self, table: &str, columns: &[&str], rows: &[u8]) -> Result<InsertSummary, SinkError>;
}
