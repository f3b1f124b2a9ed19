use std::fmt;
use std::str::FromStr;

/// The distance used to compare a query CDR3 against a database CDR3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DistanceMethod {
    /// Levenshtein distance with unit cost insertions, deletions and substitutions.
    #[default]
    Edit,
    /// Number of mismatching positions. Only defined for equal-length sequences.
    Hamming,
}

impl fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMethod::Edit => write!(f, "edit"),
            DistanceMethod::Hamming => write!(f, "hamming"),
        }
    }
}

impl FromStr for DistanceMethod {
    type Err = crate::SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "edit" | "levenshtein" => Ok(DistanceMethod::Edit),
            "hamming" => Ok(DistanceMethod::Hamming),
            _ => Err(crate::SearchError::UnknownDistanceMethod(s.to_string())),
        }
    }
}

/// Hamming distance requested for two sequences of different length.
///
/// CDR3 lengths vary naturally, so callers treat this as "no match".
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("hamming distance undefined for lengths {left} and {right}")]
pub struct LengthMismatch {
    pub left: usize,
    pub right: usize,
}

/// Number of positions at which `a` and `b` differ.
pub fn hamming(a: &[u8], b: &[u8]) -> Result<usize, LengthMismatch> {
    if a.len() != b.len() {
        return Err(LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).filter(|(x, y)| x != y).count())
}

/// Levenshtein distance between `a` and `b`.
///
/// Allocates a fresh row buffer. Use [`EditDistance`] when computing many
/// distances in a loop.
pub fn edit(a: &[u8], b: &[u8]) -> usize {
    EditDistance::new().distance(a, b)
}

/// Distance between `a` and `b` under `method`.
pub fn distance(a: &[u8], b: &[u8], method: DistanceMethod) -> Result<usize, LengthMismatch> {
    match method {
        DistanceMethod::Edit => Ok(edit(a, b)),
        DistanceMethod::Hamming => hamming(a, b),
    }
}

/// Reusable scratch space for edit distance computations.
///
/// Holds a single DP row of length `min(|a|, |b|) + 1` that is resized on
/// demand and reused between calls, so scoring a database record does not
/// allocate once the buffer has grown to the longest CDR3 seen.
/// Each worker thread owns its own instance.
#[derive(Debug, Default, Clone)]
pub struct EditDistance {
    row: Vec<usize>,
}

impl EditDistance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Levenshtein distance between `a` and `b`.
    pub fn distance(&mut self, a: &[u8], b: &[u8]) -> usize {
        // Keep the row over the shorter sequence.
        let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
        if short.is_empty() {
            return long.len();
        }

        self.row.clear();
        self.row.extend(0..=short.len());
        let row = &mut self.row;

        for (i, &lc) in long.iter().enumerate() {
            // `diag` holds the value of row[j] from the previous iteration of i.
            let mut diag = row[0];
            row[0] = i + 1;
            for (j, &sc) in short.iter().enumerate() {
                let sub = diag + (lc != sc) as usize;
                let del = row[j + 1] + 1;
                let ins = row[j] + 1;
                diag = row[j + 1];
                row[j + 1] = sub.min(del).min(ins);
            }
        }
        row[short.len()]
    }

    /// Levenshtein distance between `a` and `b` if it is at most `k`, `None` otherwise.
    ///
    /// Returns as soon as the length difference or the minimum of a DP row
    /// exceeds `k`; row minima never decrease, so this gives the same
    /// accept/reject decision as [`EditDistance::distance`].
    pub fn distance_within(&mut self, a: &[u8], b: &[u8], k: usize) -> Option<usize> {
        let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
        if long.len() - short.len() > k {
            return None;
        }
        if short.is_empty() {
            return Some(long.len());
        }

        self.row.clear();
        self.row.extend(0..=short.len());
        let row = &mut self.row;

        for (i, &lc) in long.iter().enumerate() {
            let mut diag = row[0];
            row[0] = i + 1;
            let mut row_min = row[0];
            for (j, &sc) in short.iter().enumerate() {
                let sub = diag + (lc != sc) as usize;
                let del = row[j + 1] + 1;
                let ins = row[j] + 1;
                diag = row[j + 1];
                row[j + 1] = sub.min(del).min(ins);
                row_min = row_min.min(row[j + 1]);
            }
            if row_min > k {
                return None;
            }
        }
        let d = row[short.len()];
        (d <= k).then_some(d)
    }
}

/// Per-thread scorer combining a [`DistanceMethod`] with its scratch space.
#[derive(Debug, Clone)]
pub struct Scorer {
    method: DistanceMethod,
    edit: EditDistance,
}

impl Scorer {
    pub fn new(method: DistanceMethod) -> Self {
        Self {
            method,
            edit: EditDistance::new(),
        }
    }

    pub fn method(&self) -> DistanceMethod {
        self.method
    }

    /// Distance between `a` and `b`, or `Ok(None)` when it exceeds `k`.
    pub fn score_within(
        &mut self,
        a: &[u8],
        b: &[u8],
        k: usize,
    ) -> Result<Option<usize>, LengthMismatch> {
        match self.method {
            DistanceMethod::Edit => Ok(self.edit.distance_within(a, b, k)),
            DistanceMethod::Hamming => hamming(a, b).map(|d| (d <= k).then_some(d)),
        }
    }
}
