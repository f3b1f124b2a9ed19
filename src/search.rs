use std::path::{Path, PathBuf};

use crate::database::{CsvDatabase, RecordSource};
use crate::error::Result;
use crate::matcher::{ChainMatcher, ScanStats};
use crate::merge::{OutputRow, merge};
use crate::query::{QueryParams, QuerySpec};
use crate::record::Chain;
use crate::scanner::{DEFAULT_CHUNK_SIZE, ScanConfig, Scanner};
use crate::writer::ResultWriter;

/// Where to read from and write to, and how to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Directory of `.csv`/`.tsv` database files, or a single file.
    pub database_dir: PathBuf,
    pub output_file: PathBuf,
    pub scan: ScanConfig,
    /// Number of worker threads. All CPUs by default.
    pub threads: Option<usize>,
}

impl SearchConfig {
    pub fn new(database_dir: impl AsRef<Path>, output_file: impl AsRef<Path>) -> Self {
        Self {
            database_dir: database_dir.as_ref().to_path_buf(),
            output_file: output_file.as_ref().to_path_buf(),
            scan: ScanConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
            threads: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
        self.scan = ScanConfig::new(chunk_size)?;
        Ok(self)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
}

/// Rows and per-chain statistics of a search that has not been written out.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub rows: Vec<OutputRow>,
    /// One entry per matcher pass, in scan order.
    pub stats: Vec<(Chain, ScanStats)>,
}

impl SearchOutcome {
    /// Malformed rows in the database. Every pass sees the same rows, so
    /// this is the count of a single pass.
    pub fn malformed(&self) -> usize {
        self.stats.first().map_or(0, |(_, s)| s.malformed)
    }
}

/// Result of [`search_paired_chains`].
#[derive(Debug, Clone)]
pub struct SearchSummary {
    pub mode: &'static str,
    pub output_file: PathBuf,
    pub rows_written: usize,
    pub stats: Vec<(Chain, ScanStats)>,
}

/// Run `query` against `source` and return the merged rows.
pub fn search(
    source: &dyn RecordSource,
    query: &QuerySpec,
    scan: ScanConfig,
    threads: Option<usize>,
) -> Result<SearchOutcome> {
    let scanner = Scanner::new(source, scan)?;
    let threads = threads.unwrap_or_else(num_cpus::get).max(1);
    log::info!(
        "Searching {} in {} mode (threshold {}, {} distance, chunk size {}, {} threads)",
        source.name(),
        query.mode.name(),
        query.threshold,
        query.method,
        scan.chunk_size,
        threads
    );

    let mut heavy = vec![];
    let mut light = vec![];
    let mut stats = vec![];
    for &chain in query.mode.chains() {
        let (matches, chain_stats) =
            ChainMatcher::new(scanner, query, chain).collect_parallel(threads)?;
        log::info!(
            "{chain} chain: {} matches among {} candidates ({} rows)",
            matches.len(),
            chain_stats.candidates,
            chain_stats.rows
        );
        match chain {
            Chain::Light => light = matches,
            Chain::Heavy | Chain::Generic => heavy = matches,
        }
        stats.push((chain, chain_stats));
    }

    let rows: Vec<OutputRow> = merge(heavy, light, &query.mode).collect();
    let outcome = SearchOutcome { rows, stats };

    let malformed = outcome.malformed();
    if malformed > 0 {
        log::warn!(
            "Skipped {malformed} malformed record(s) in {}",
            source.name()
        );
    }
    Ok(outcome)
}

/// Validate `params`, search the database in `config.database_dir`, and
/// write the matching rows to `config.output_file`.
///
/// Configuration errors are reported before the database is opened. The
/// output file is only created once the search has completed.
pub fn search_paired_chains(params: &QueryParams, config: &SearchConfig) -> Result<SearchSummary> {
    let query = params.build()?;
    let scan = ScanConfig::new(config.scan.chunk_size)?;

    let database = CsvDatabase::open(&config.database_dir)?;
    let outcome = search(&database, &query, scan, config.threads)?;

    let writer = ResultWriter::new(&config.output_file, query.mode.is_generic());
    let rows_written = writer.write(outcome.rows)?;

    Ok(SearchSummary {
        mode: query.mode.name(),
        output_file: config.output_file.clone(),
        rows_written,
        stats: outcome.stats,
    })
}
