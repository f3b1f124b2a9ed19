use crate::distance::{self, DistanceMethod};
use crate::error::SearchError;
use crate::query::{GeneMatch, QueryParams};
use crate::scanner::ScanConfig;
use crate::search::{self, SearchConfig};
use pyo3::prelude::*;

/// A Python module implemented in Rust.
#[pymodule]
#[pyo3(name = "cdr3search")]
fn cdr3search(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(search_paired_chains, m)?)?;
    m.add_function(wrap_pyfunction!(cdr3_distance, m)?)?;
    Ok(())
}

fn to_py_err(e: SearchError) -> PyErr {
    if e.is_configuration() {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
    } else {
        PyErr::new::<pyo3::exceptions::PyIOError, _>(e.to_string())
    }
}

#[pyfunction]
#[allow(clippy::too_many_arguments)]
#[pyo3(signature = (
    database_dir,
    *,
    output_file,
    cdr3_aa=None,
    cdr3_aa_heavy=None,
    cdr3_aa_light=None,
    threshold=1,
    distance_method="edit",
    v_call_heavy=None,
    j_call_heavy=None,
    v_call_light=None,
    j_call_light=None,
    chunk_size=None,
    threads=None,
    gene_match="allele",
))]
#[doc = "Search a CDR3 database and write matching rows to output_file. Returns the number of rows written."]
fn search_paired_chains(
    py: Python<'_>,
    database_dir: &str,
    output_file: &str,
    cdr3_aa: Option<String>,
    cdr3_aa_heavy: Option<String>,
    cdr3_aa_light: Option<String>,
    threshold: i64,
    distance_method: &str,
    v_call_heavy: Option<String>,
    j_call_heavy: Option<String>,
    v_call_light: Option<String>,
    j_call_light: Option<String>,
    chunk_size: Option<i64>,
    threads: Option<usize>,
    gene_match: &str,
) -> PyResult<usize> {
    if threshold < 0 {
        return Err(to_py_err(SearchError::InvalidThreshold(threshold)));
    }
    let params = QueryParams {
        cdr3_aa,
        cdr3_aa_heavy,
        cdr3_aa_light,
        threshold: threshold as usize,
        distance_method: distance_method.parse().map_err(to_py_err)?,
        v_call_heavy,
        j_call_heavy,
        v_call_light,
        j_call_light,
        gene_match: gene_match.parse::<GeneMatch>().map_err(to_py_err)?,
    };
    let mut config = SearchConfig::new(database_dir, output_file);
    if let Some(chunk_size) = chunk_size {
        config.scan = ScanConfig::try_from(chunk_size).map_err(to_py_err)?;
    }
    config.threads = threads;

    // The search does not touch Python objects.
    let summary = py
        .allow_threads(|| search::search_paired_chains(&params, &config))
        .map_err(to_py_err)?;
    Ok(summary.rows_written)
}

#[pyfunction]
#[pyo3(name = "distance", signature = (a, b, method="edit"))]
#[doc = "Distance between two CDR3 sequences. Returns None for a Hamming length mismatch."]
fn cdr3_distance(a: &str, b: &str, method: &str) -> PyResult<Option<usize>> {
    let method: DistanceMethod = method.parse().map_err(to_py_err)?;
    Ok(distance::distance(a.as_bytes(), b.as_bytes(), method).ok())
}
