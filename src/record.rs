use std::fmt;

/// Antibody chain a CDR3 belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Chain {
    Heavy,
    Light,
    /// Any CDR3 of the record, used by generic searches.
    Generic,
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Heavy => write!(f, "heavy"),
            Chain::Light => write!(f, "light"),
            Chain::Generic => write!(f, "generic"),
        }
    }
}

/// Which CDR3 field of a record produced a generic match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Heavy,
    Light,
    /// The undifferentiated `cdr3_aa` field.
    Unpaired,
}

/// One clonotype of the reference database.
///
/// Records are materialized one chunk at a time by the scanner and are
/// never modified after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClonotypeRecord {
    /// Identifier assigned by the database source.
    pub record_id: String,
    pub cdr3_aa_heavy: Option<String>,
    pub cdr3_aa_light: Option<String>,
    /// CDR3 that is not attributed to a chain.
    pub cdr3_aa: Option<String>,
    pub v_call_heavy: Option<String>,
    pub j_call_heavy: Option<String>,
    pub v_call_light: Option<String>,
    pub j_call_light: Option<String>,
    /// Remaining columns as `(name, value)`, in source order.
    pub passthrough: Vec<(String, String)>,
}

impl ClonotypeRecord {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            ..Default::default()
        }
    }

    pub fn with_heavy(mut self, cdr3: &str, v_call: Option<&str>, j_call: Option<&str>) -> Self {
        self.cdr3_aa_heavy = Some(cdr3.to_string());
        self.v_call_heavy = v_call.map(str::to_string);
        self.j_call_heavy = j_call.map(str::to_string);
        self
    }

    pub fn with_light(mut self, cdr3: &str, v_call: Option<&str>, j_call: Option<&str>) -> Self {
        self.cdr3_aa_light = Some(cdr3.to_string());
        self.v_call_light = v_call.map(str::to_string);
        self.j_call_light = j_call.map(str::to_string);
        self
    }

    pub fn with_cdr3(mut self, cdr3: &str) -> Self {
        self.cdr3_aa = Some(cdr3.to_string());
        self
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.passthrough.push((name.to_string(), value.to_string()));
        self
    }

    /// CDR3 of `chain`. For [`Chain::Generic`] this is the undifferentiated field.
    pub fn cdr3(&self, chain: Chain) -> Option<&str> {
        match chain {
            Chain::Heavy => self.cdr3_aa_heavy.as_deref(),
            Chain::Light => self.cdr3_aa_light.as_deref(),
            Chain::Generic => self.cdr3_aa.as_deref(),
        }
    }

    pub fn slot_cdr3(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Heavy => self.cdr3_aa_heavy.as_deref(),
            Slot::Light => self.cdr3_aa_light.as_deref(),
            Slot::Unpaired => self.cdr3_aa.as_deref(),
        }
    }

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
}
