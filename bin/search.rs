use std::path::PathBuf;

use anyhow::Context;
use cdr3search::{
    DEFAULT_CHUNK_SIZE, DistanceMethod, GeneMatch, QueryParams, ScanConfig, SearchConfig,
    search_paired_chains,
};

#[derive(clap::Parser, Clone)]
pub struct SearchArgs {
    /// Directory of .csv/.tsv database files, or a single database file.
    #[arg(short = 'd', long)]
    database_dir: PathBuf,

    /// CDR3 to match against any chain of a record.
    #[arg(
        long,
        conflicts_with = "cdr3_aa_heavy",
        conflicts_with = "cdr3_aa_light"
    )]
    cdr3_aa: Option<String>,

    /// Heavy chain CDR3. Combined with --cdr3-aa-light for a paired search.
    #[arg(long)]
    cdr3_aa_heavy: Option<String>,

    /// Light chain CDR3. Combined with --cdr3-aa-heavy for a paired search.
    #[arg(long)]
    cdr3_aa_light: Option<String>,

    /// Report records up to (and including) this distance.
    #[arg(short = 'k', long, default_value_t = 1)]
    threshold: usize,

    #[arg(long, short = 'm', default_value_t = DistanceMethod::Edit, value_enum)]
    distance_method: DistanceMethod,

    #[arg(long)]
    v_call_heavy: Option<String>,
    #[arg(long)]
    j_call_heavy: Option<String>,
    #[arg(long)]
    v_call_light: Option<String>,
    #[arg(long)]
    j_call_light: Option<String>,

    /// How gene-call filters are compared. `allele` also accepts allele
    /// suffixes (IGHV1-69 matches IGHV1-69*01), `exact` requires equality.
    #[arg(long, default_value_t = GeneMatch::Allele, value_enum)]
    gene_match: GeneMatch,

    /// Output CSV file. Parent directories are created.
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Number of database records read per chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Number of threads to use. All CPUs by default.
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

impl SearchArgs {
    pub fn run(self) -> anyhow::Result<()> {
        let params = QueryParams {
            cdr3_aa: self.cdr3_aa,
            cdr3_aa_heavy: self.cdr3_aa_heavy,
            cdr3_aa_light: self.cdr3_aa_light,
            threshold: self.threshold,
            distance_method: self.distance_method,
            v_call_heavy: self.v_call_heavy,
            j_call_heavy: self.j_call_heavy,
            v_call_light: self.v_call_light,
            j_call_light: self.j_call_light,
            gene_match: self.gene_match,
        };
        let config = SearchConfig {
            database_dir: self.database_dir,
            output_file: self.output,
            scan: ScanConfig::new(self.chunk_size)?,
            threads: self.threads,
        };

        let summary = search_paired_chains(&params, &config)
            .with_context(|| format!("search of {} failed", config.database_dir.display()))?;

        eprint!("\nStatistics ({} search): ", summary.mode);
        for (chain, stats) in &summary.stats {
            eprint!("\n  {chain}: ");
            for (dist, &count) in stats.histogram.iter().enumerate() {
                if count > 0 {
                    eprint!("dist {dist} => {count}, ");
                }
            }
            if stats.malformed > 0 {
                eprint!("({} malformed skipped)", stats.malformed);
            }
        }
        eprintln!(
            "\nWrote {} rows to {}",
            summary.rows_written,
            summary.output_file.display()
        );
        Ok(())
    }
}

#[derive(clap::Parser, Clone)]
pub struct DistanceArgs {
    a: String,
    b: String,

    #[arg(long, short = 'm', default_value_t = DistanceMethod::Edit, value_enum)]
    method: DistanceMethod,
}

impl DistanceArgs {
    pub fn run(self) -> anyhow::Result<()> {
        let a = self.a.trim().to_ascii_uppercase();
        let b = self.b.trim().to_ascii_uppercase();
        match cdr3search::distance(a.as_bytes(), b.as_bytes(), self.method) {
            Ok(d) => println!("{d}"),
            Err(e) => anyhow::bail!(e),
        }
        Ok(())
    }
}
