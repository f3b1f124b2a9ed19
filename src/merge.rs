use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::matcher::MatchResult;
use crate::query::QueryMode;
use crate::record::{Chain, ClonotypeRecord, Slot};

/// A matched record with its per-chain distances, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub record: ClonotypeRecord,
    pub distance_heavy: Option<usize>,
    pub distance_light: Option<usize>,
    /// Best distance over all CDR3s of the record. Only set by generic searches.
    pub distance: Option<usize>,
}

impl OutputRow {
    /// Row for a match from a single-chain or generic search.
    pub fn single(m: MatchResult) -> Self {
        let mut row = OutputRow {
            record: m.record,
            distance_heavy: None,
            distance_light: None,
            distance: None,
        };
        match m.slot {
            Slot::Heavy => row.distance_heavy = Some(m.distance),
            Slot::Light => row.distance_light = Some(m.distance),
            Slot::Unpaired => {}
        }
        if m.chain == Chain::Generic {
            row.distance = Some(m.distance);
        }
        row
    }

    /// Row for a record that matched on both chains.
    pub fn paired(heavy: &MatchResult, light: MatchResult) -> Self {
        OutputRow {
            record: light.record,
            distance_heavy: Some(heavy.distance),
            distance_light: Some(light.distance),
            distance: None,
        }
    }
}

/// Combine the match streams of a search into output rows.
///
/// Outside paired mode at most one of the two streams is non-empty, and
/// every match becomes one row in stream order. In paired mode the heavy
/// matches are indexed by `record_id` (first occurrence wins) and the light
/// matches are streamed against that index; only records present on both
/// sides produce a row, in light-stream order.
pub fn merge<H, L>(
    heavy_matches: H,
    light_matches: L,
    mode: &QueryMode,
) -> Merge<H::IntoIter, L::IntoIter>
where
    H: IntoIterator<Item = MatchResult>,
    L: IntoIterator<Item = MatchResult>,
{
    let inner = match mode {
        QueryMode::Paired { .. } => {
            let mut index = HashMap::new();
            for m in heavy_matches {
                if let Entry::Vacant(e) = index.entry(m.record.record_id.clone()) {
                    e.insert(m);
                }
            }
            log::debug!("Indexed {} heavy-chain matches for pairing", index.len());
            MergeInner::Paired {
                index,
                light: light_matches.into_iter(),
            }
        }
        _ => MergeInner::Single(heavy_matches.into_iter().chain(light_matches)),
    };
    Merge { inner }
}

/// Iterator returned by [`merge`]. Owns the paired-mode join index, which is
/// dropped together with the iterator.
pub struct Merge<H, L> {
    inner: MergeInner<H, L>,
}

enum MergeInner<H, L> {
    Single(std::iter::Chain<H, L>),
    Paired {
        index: HashMap<String, MatchResult>,
        light: L,
    },
}

impl<H, L> Iterator for Merge<H, L>
where
    H: Iterator<Item = MatchResult>,
    L: Iterator<Item = MatchResult>,
{
    type Item = OutputRow;

    fn next(&mut self) -> Option<OutputRow> {
        match &mut self.inner {
            MergeInner::Single(matches) => matches.next().map(OutputRow::single),
            MergeInner::Paired { index, light } => {
                for m in light.by_ref() {
                    if let Some(heavy) = index.get(&m.record.record_id) {
                        return Some(OutputRow::paired(heavy, m));
                    }
                }
                None
            }
        }
    }
}
