//! # cdr3search
//!
//! Approximate CDR3 search over paired heavy/light chain antibody repertoire
//! databases.
//!
//! A search scans the database in chunks of at most `chunk_size` records,
//! keeps records whose gene calls pass the query's V/J filters, and scores
//! their CDR3 against the query with edit or Hamming distance. Records within
//! the (inclusive) threshold are written to a CSV file.
//!
//! Four query modes are supported, see [`QueryMode`]:
//! - generic: match any CDR3 of a record,
//! - heavy-only and light-only: match one chain,
//! - paired: both chains must match; the result is the intersection of the
//!   two single-chain searches, joined on `record_id`.
//!
//! ```no_run
//! use cdr3search::{QueryParams, SearchConfig, search_paired_chains};
//!
//! let params = QueryParams {
//!     cdr3_aa_heavy: Some("CARDTGGFDIW".to_string()),
//!     threshold: 1,
//!     v_call_heavy: Some("IGHV1-69".to_string()),
//!     ..Default::default()
//! };
//! let config = SearchConfig::new("./database", "./results/heavy_chain_results.csv");
//! let summary = search_paired_chains(&params, &config).unwrap();
//! println!("{} rows", summary.rows_written);
//! ```

pub mod database;
pub mod distance;
mod error;
pub mod filter;
pub mod matcher;
pub mod merge;
pub mod query;
pub mod record;
pub mod scanner;
mod search;
pub mod writer;

#[cfg(feature = "python")]
mod python;

pub use database::{CsvDatabase, MemoryDatabase, RecordSource};
pub use distance::{DistanceMethod, EditDistance, LengthMismatch, Scorer, distance};
pub use error::{RecordLocation, Result, SearchError};
pub use matcher::{ChainMatcher, MatchResult, Matches, ScanStats, match_chain};
pub use merge::{OutputRow, merge};
pub use query::{GeneFilters, GeneMatch, QueryMode, QueryParams, QuerySpec};
pub use record::{Chain, ClonotypeRecord, Slot};
pub use scanner::{Chunk, DEFAULT_CHUNK_SIZE, ScanConfig, Scanner};
pub use search::{SearchConfig, SearchOutcome, SearchSummary, search, search_paired_chains};
pub use writer::ResultWriter;
