use std::path::PathBuf;

/// Where in the database a malformed record was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
    /// File (or other source name) the record came from.
    pub source: String,
    /// 1-based data row within the source, not counting the header.
    pub row: u64,
}

impl std::fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.row)
    }
}

/// Errors that can be returned while building a query or running a search.
///
/// Configuration errors are raised before any record is read.
/// [`SearchError::MalformedRecord`] is the only recoverable variant: the
/// scanner skips the offending record and keeps going.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    /// Both a generic `cdr3_aa` and a heavy/light CDR3 were given.
    #[error("cdr3_aa cannot be combined with cdr3_aa_heavy or cdr3_aa_light")]
    ConflictingQuery,
    /// None of `cdr3_aa`, `cdr3_aa_heavy` and `cdr3_aa_light` were given.
    #[error("one of cdr3_aa, cdr3_aa_heavy or cdr3_aa_light is required")]
    MissingCdr3,
    /// A query CDR3 is empty after trimming.
    #[error("query {field} is empty")]
    EmptyCdr3 { field: &'static str },
    #[error("chunk_size must be > 0")]
    InvalidChunkSize,
    #[error("threshold must be >= 0 (got {0})")]
    InvalidThreshold(i64),
    /// A gene-call filter was given for a chain that the query mode never searches.
    #[error("{field} has no effect in {mode} mode")]
    UnusedGeneFilter {
        field: &'static str,
        mode: &'static str,
    },
    #[error("unknown distance method {0:?}, expected \"edit\" or \"hamming\"")]
    UnknownDistanceMethod(String),
    #[error("unknown gene match policy {0:?}, expected \"allele\" or \"exact\"")]
    UnknownGeneMatch(String),
    /// A database row that could not be turned into a record.
    #[error("malformed record at {location}: {reason}")]
    MalformedRecord {
        location: RecordLocation,
        reason: String,
    },
    #[error("database {path} contains no .csv or .tsv files")]
    EmptyDatabase { path: PathBuf },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl SearchError {
    /// True for errors that only affect a single record.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SearchError::MalformedRecord { .. })
    }

    /// True for errors in the search parameters.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SearchError::ConflictingQuery
                | SearchError::MissingCdr3
                | SearchError::EmptyCdr3 { .. }
                | SearchError::InvalidChunkSize
                | SearchError::InvalidThreshold(_)
                | SearchError::UnusedGeneFilter { .. }
                | SearchError::UnknownDistanceMethod(_)
                | SearchError::UnknownGeneMatch(_)
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SearchError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        SearchError::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;
