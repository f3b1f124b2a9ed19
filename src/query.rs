use std::fmt;
use std::str::FromStr;

use crate::distance::DistanceMethod;
use crate::error::{Result, SearchError};
use crate::record::Chain;

/// How a gene-call constraint is compared with a record's gene call.
///
/// The policy is fixed for a whole query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum GeneMatch {
    /// The record field is split on `,` into individual calls. A call matches
    /// when it equals the constraint, or extends it with an allele suffix
    /// (`IGHV1-69` matches `IGHV1-69*01`, not `IGHV1-690`).
    #[default]
    Allele,
    /// Whole-field string equality.
    Exact,
}

impl fmt::Display for GeneMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneMatch::Allele => write!(f, "allele"),
            GeneMatch::Exact => write!(f, "exact"),
        }
    }
}

impl FromStr for GeneMatch {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "allele" => Ok(GeneMatch::Allele),
            "exact" => Ok(GeneMatch::Exact),
            _ => Err(SearchError::UnknownGeneMatch(s.to_string())),
        }
    }
}

/// The CDR3 sequence(s) being searched for.
///
/// Exactly one mode is active per search, so a query combining a generic
/// CDR3 with chain-specific ones cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    /// Match against any CDR3 of a record.
    Generic { cdr3_aa: Vec<u8> },
    HeavyOnly { heavy: Vec<u8> },
    LightOnly { light: Vec<u8> },
    /// Both chains must match independently.
    Paired { heavy: Vec<u8>, light: Vec<u8> },
}

impl QueryMode {
    pub fn name(&self) -> &'static str {
        match self {
            QueryMode::Generic { .. } => "generic",
            QueryMode::HeavyOnly { .. } => "heavy-only",
            QueryMode::LightOnly { .. } => "light-only",
            QueryMode::Paired { .. } => "paired",
        }
    }

    /// Chains that need a matcher pass, in the order they are scanned.
    pub fn chains(&self) -> &'static [Chain] {
        match self {
            QueryMode::Generic { .. } => &[Chain::Generic],
            QueryMode::HeavyOnly { .. } => &[Chain::Heavy],
            QueryMode::LightOnly { .. } => &[Chain::Light],
            QueryMode::Paired { .. } => &[Chain::Heavy, Chain::Light],
        }
    }

    /// Query CDR3 for `chain`, if the mode searches that chain.
    pub fn cdr3(&self, chain: Chain) -> Option<&[u8]> {
        match (self, chain) {
            (QueryMode::Generic { cdr3_aa }, Chain::Generic) => Some(cdr3_aa),
            (QueryMode::HeavyOnly { heavy }, Chain::Heavy) => Some(heavy),
            (QueryMode::LightOnly { light }, Chain::Light) => Some(light),
            (QueryMode::Paired { heavy, .. }, Chain::Heavy) => Some(heavy),
            (QueryMode::Paired { light, .. }, Chain::Light) => Some(light),
            _ => None,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, QueryMode::Generic { .. })
    }
}

/// Optional V/J gene-call constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneFilters {
    pub v_call_heavy: Option<String>,
    pub j_call_heavy: Option<String>,
    pub v_call_light: Option<String>,
    pub j_call_light: Option<String>,
    pub policy: GeneMatch,
}

impl GeneFilters {
    pub fn v_call(&self, chain: Chain) -> Option<&str> {
        match chain {
            Chain::Heavy => self.v_call_heavy.as_deref(),
            Chain::Light => self.v_call_light.as_deref(),
            Chain::Generic => None,
        }
    }

    pub fn j_call(&self, chain: Chain) -> Option<&str> {
        match chain {
            Chain::Heavy => self.j_call_heavy.as_deref(),
            Chain::Light => self.j_call_light.as_deref(),
            Chain::Generic => None,
        }
    }

    /// True when no constraint is set on any chain.
    pub fn is_empty(&self) -> bool {
        self.v_call_heavy.is_none()
            && self.j_call_heavy.is_none()
            && self.v_call_light.is_none()
            && self.j_call_light.is_none()
    }
}

/// A validated search request. Read-only for the duration of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub mode: QueryMode,
    /// Inclusive upper bound on the distance.
    pub threshold: usize,
    pub method: DistanceMethod,
    pub genes: GeneFilters,
}

impl QuerySpec {
    pub fn new(mode: QueryMode, threshold: usize, method: DistanceMethod) -> Self {
        Self {
            mode,
            threshold,
            method,
            genes: GeneFilters::default(),
        }
    }

    pub fn with_genes(mut self, genes: GeneFilters) -> Self {
        self.genes = genes;
        self
    }
}

/// Search parameters as supplied by a caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub cdr3_aa: Option<String>,
    pub cdr3_aa_heavy: Option<String>,
    pub cdr3_aa_light: Option<String>,
    pub threshold: usize,
    pub distance_method: DistanceMethod,
    pub v_call_heavy: Option<String>,
    pub j_call_heavy: Option<String>,
    pub v_call_light: Option<String>,
    pub j_call_light: Option<String>,
    pub gene_match: GeneMatch,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            cdr3_aa: None,
            cdr3_aa_heavy: None,
            cdr3_aa_light: None,
            threshold: 1,
            distance_method: DistanceMethod::Edit,
            v_call_heavy: None,
            j_call_heavy: None,
            v_call_light: None,
            j_call_light: None,
            gene_match: GeneMatch::Allele,
        }
    }
}

fn normalize_cdr3(value: &Option<String>, field: &'static str) -> Result<Option<Vec<u8>>> {
    match value {
        None => Ok(None),
        Some(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(SearchError::EmptyCdr3 { field });
            }
            Ok(Some(s.to_ascii_uppercase().into_bytes()))
        }
    }
}

fn normalize_gene(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl QueryParams {
    /// Validate the parameters into a [`QuerySpec`].
    ///
    /// Fails with a configuration error when the CDR3 arguments do not
    /// select exactly one mode, or when a gene-call filter targets a chain
    /// the mode does not search.
    pub fn build(&self) -> Result<QuerySpec> {
        let generic = normalize_cdr3(&self.cdr3_aa, "cdr3_aa")?;
        let heavy = normalize_cdr3(&self.cdr3_aa_heavy, "cdr3_aa_heavy")?;
        let light = normalize_cdr3(&self.cdr3_aa_light, "cdr3_aa_light")?;

        let mode = match (generic, heavy, light) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(SearchError::ConflictingQuery);
            }
            (Some(cdr3_aa), None, None) => QueryMode::Generic { cdr3_aa },
            (None, Some(heavy), None) => QueryMode::HeavyOnly { heavy },
            (None, None, Some(light)) => QueryMode::LightOnly { light },
            (None, Some(heavy), Some(light)) => QueryMode::Paired { heavy, light },
            (None, None, None) => return Err(SearchError::MissingCdr3),
        };

        let genes = GeneFilters {
            v_call_heavy: normalize_gene(&self.v_call_heavy),
            j_call_heavy: normalize_gene(&self.j_call_heavy),
            v_call_light: normalize_gene(&self.v_call_light),
            j_call_light: normalize_gene(&self.j_call_light),
            policy: self.gene_match,
        };

        let unused = match &mode {
            QueryMode::HeavyOnly { .. } => [
                ("v_call_light", genes.v_call_light.is_some()),
                ("j_call_light", genes.j_call_light.is_some()),
            ],
            QueryMode::LightOnly { .. } => [
                ("v_call_heavy", genes.v_call_heavy.is_some()),
                ("j_call_heavy", genes.j_call_heavy.is_some()),
            ],
            QueryMode::Generic { .. } | QueryMode::Paired { .. } => [("", false), ("", false)],
        };
        if let Some((field, _)) = unused.into_iter().find(|(_, set)| *set) {
            return Err(SearchError::UnusedGeneFilter {
                field,
                mode: mode.name(),
            });
        }

        Ok(QuerySpec {
            mode,
            threshold: self.threshold,
            method: self.distance_method,
            genes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> QueryParams {
        QueryParams::default()
    }

    #[test]
    fn test_modes() {
        let q = QueryParams {
            cdr3_aa: Some("CARDTGGFDIW".into()),
            ..params()
        }
        .build()
        .unwrap();
        assert_eq!(q.mode.name(), "generic");
        assert_eq!(q.mode.chains(), &[Chain::Generic]);

        let q = QueryParams {
            cdr3_aa_heavy: Some("cardtggfdiw ".into()),
            ..params()
        }
        .build()
        .unwrap();
        assert_eq!(
            q.mode,
            QueryMode::HeavyOnly {
                heavy: b"CARDTGGFDIW".to_vec()
            }
        );
        assert_eq!(q.mode.cdr3(Chain::Light), None);

        let q = QueryParams {
            cdr3_aa_light: Some("CASSSGIGNAVFGGGTKLTVL".into()),
            ..params()
        }
        .build()
        .unwrap();
        assert_eq!(q.mode.chains(), &[Chain::Light]);

        let q = QueryParams {
            cdr3_aa_heavy: Some("CARDTGGFDIW".into()),
            cdr3_aa_light: Some("CASSSGIGNAVFGGGTKLTVL".into()),
            ..params()
        }
        .build()
        .unwrap();
        assert_eq!(q.mode.chains(), &[Chain::Heavy, Chain::Light]);
        assert_eq!(q.mode.cdr3(Chain::Heavy), Some(&b"CARDTGGFDIW"[..]));
    }

    #[test]
    fn test_conflicting_query() {
        let err = QueryParams {
            cdr3_aa: Some("CARDTGGFDIW".into()),
            cdr3_aa_light: Some("CASSSGIGNAVFGGGTKLTVL".into()),
            ..params()
        }
        .build()
        .unwrap_err();
        assert!(matches!(err, SearchError::ConflictingQuery));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_and_empty_cdr3() {
        assert!(matches!(
            params().build().unwrap_err(),
            SearchError::MissingCdr3
        ));
        assert!(matches!(
            QueryParams {
                cdr3_aa_heavy: Some("  ".into()),
                ..params()
            }
            .build()
            .unwrap_err(),
            SearchError::EmptyCdr3 {
                field: "cdr3_aa_heavy"
            }
        ));
    }

    #[test]
    fn test_unused_gene_filter() {
        let err = QueryParams {
            cdr3_aa_heavy: Some("CARDTGGFDIW".into()),
            j_call_light: Some("IGLJ3".into()),
            ..params()
        }
        .build()
        .unwrap_err();
        assert!(matches!(
            err,
            SearchError::UnusedGeneFilter {
                field: "j_call_light",
                mode: "heavy-only"
            }
        ));

        // Blank filters are ignored.
        let q = QueryParams {
            cdr3_aa_light: Some("CASSSGIGNAVFGGGTKLTVL".into()),
            v_call_heavy: Some("".into()),
            j_call_light: Some("IGLJ3".into()),
            ..params()
        }
        .build()
        .unwrap();
        assert_eq!(q.genes.v_call_heavy, None);
        assert_eq!(q.genes.j_call(Chain::Light), Some("IGLJ3"));
    }

    #[test]
    fn test_parse_gene_match() {
        assert_eq!("ALLELE".parse::<GeneMatch>().unwrap(), GeneMatch::Allele);
        assert_eq!("exact".parse::<GeneMatch>().unwrap(), GeneMatch::Exact);
        assert!("prefix".parse::<GeneMatch>().is_err());
    }
}
