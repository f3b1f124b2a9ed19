//! Gene-call filtering of database records.

use crate::query::{GeneMatch, QuerySpec};
use crate::record::{Chain, ClonotypeRecord, Slot};

/// Does the record's gene call `value` satisfy `constraint` under `policy`?
pub fn gene_matches(value: &str, constraint: &str, policy: GeneMatch) -> bool {
    match policy {
        GeneMatch::Exact => value == constraint,
        GeneMatch::Allele => value.split(',').map(str::trim).any(|call| {
            call.strip_prefix(constraint)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('*'))
        }),
    }
}

fn constraint_passes(value: Option<&str>, constraint: Option<&str>, policy: GeneMatch) -> bool {
    match (constraint, value) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(c), Some(v)) => gene_matches(v, c, policy),
    }
}

/// Whether the gene calls of `chain` in `record` satisfy the query's constraints.
/// Ignores the CDR3.
pub fn genes_pass(record: &ClonotypeRecord, query: &QuerySpec, chain: Chain) -> bool {
    let genes = &query.genes;
    constraint_passes(record.v_call(chain), genes.v_call(chain), genes.policy)
        && constraint_passes(record.j_call(chain), genes.j_call(chain), genes.policy)
}

/// Whether a generic search may score the CDR3 in `slot` of `record`.
///
/// The undifferentiated slot has no chain to check gene calls against, so
/// it is only eligible when the query has no gene constraints at all.
pub fn slot_passes(record: &ClonotypeRecord, query: &QuerySpec, slot: Slot) -> bool {
    if record.slot_cdr3(slot).is_none() {
        return false;
    }
    match slot {
        Slot::Heavy => genes_pass(record, query, Chain::Heavy),
        Slot::Light => genes_pass(record, query, Chain::Light),
        Slot::Unpaired => query.genes.is_empty(),
    }
}

/// Whether `record` is a candidate for `chain`: it has a CDR3 to score and
/// passes the gene-call constraints for that chain.
///
/// For [`Chain::Generic`] a record passes if any of its CDR3 slots does.
pub fn passes(record: &ClonotypeRecord, query: &QuerySpec, chain: Chain) -> bool {
    match chain {
        Chain::Generic => [Slot::Heavy, Slot::Light, Slot::Unpaired]
            .into_iter()
            .any(|slot| slot_passes(record, query, slot)),
        _ => record.cdr3(chain).is_some() && genes_pass(record, query, chain),
    }
}
