use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::distance::Scorer;
use crate::error::{Result, SearchError};
use crate::filter;
use crate::query::QuerySpec;
use crate::record::{Chain, ClonotypeRecord, Slot};
use crate::scanner::{Chunk, Chunks, Scanner};

/// A database record whose CDR3 on `chain` is within the threshold of the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub record: ClonotypeRecord,
    pub distance: usize,
    pub chain: Chain,
    /// CDR3 field that produced `distance`. For heavy and light matches this
    /// is the chain's own field.
    pub slot: Slot,
}

/// Counters collected during a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub chunks: usize,
    /// Database rows seen, including malformed ones.
    pub rows: usize,
    pub malformed: usize,
    /// Records that had a CDR3 and passed the gene-call filter.
    pub candidates: usize,
    /// Hamming comparisons skipped because of differing lengths.
    pub length_mismatches: usize,
    /// `histogram[d]` is the number of matches at distance `d`.
    pub histogram: Vec<usize>,
}

/// Histogram buckets allocated up front. Larger distances grow it on demand.
const HISTOGRAM_PREALLOC: usize = 64;

impl ScanStats {
    pub fn new(threshold: usize) -> Self {
        Self {
            histogram: vec![0; threshold.min(HISTOGRAM_PREALLOC - 1) + 1],
            ..Default::default()
        }
    }

    /// Count a match at `distance`.
    pub fn record_match(&mut self, distance: usize) {
        if distance >= self.histogram.len() {
            self.histogram.resize(distance + 1, 0);
        }
        self.histogram[distance] += 1;
    }

    pub fn matches(&self) -> usize {
        self.histogram.iter().sum()
    }

    pub fn merge(&mut self, other: &ScanStats) {
        self.chunks += other.chunks;
        self.rows += other.rows;
        self.malformed += other.malformed;
        self.candidates += other.candidates;
        self.length_mismatches += other.length_mismatches;
        if self.histogram.len() < other.histogram.len() {
            self.histogram.resize(other.histogram.len(), 0);
        }
        for (dist, &count) in other.histogram.iter().enumerate() {
            self.histogram[dist] += count;
        }
    }
}

/// Scans the database for records matching the query on one chain.
#[derive(Clone, Copy)]
pub struct ChainMatcher<'a> {
    scanner: Scanner<'a>,
    query: &'a QuerySpec,
    chain: Chain,
}

/// Lazily match `chain` of `query` against every record of `scanner`.
pub fn match_chain<'a>(
    scanner: Scanner<'a>,
    query: &'a QuerySpec,
    chain: Chain,
) -> Result<Matches<'a>> {
    ChainMatcher::new(scanner, query, chain).iter()
}

impl<'a> ChainMatcher<'a> {
    pub fn new(scanner: Scanner<'a>, query: &'a QuerySpec, chain: Chain) -> Self {
        Self {
            scanner,
            query,
            chain,
        }
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    /// Distance of `cdr3` to the query if it is within the threshold.
    fn score(
        &self,
        scorer: &mut Scorer,
        query_cdr3: &[u8],
        cdr3: &str,
        stats: &mut ScanStats,
    ) -> Option<usize> {
        match scorer.score_within(query_cdr3, cdr3.as_bytes(), self.query.threshold) {
            Ok(d) => d,
            Err(_) => {
                stats.length_mismatches += 1;
                None
            }
        }
    }

    /// Score one record. Returns the distance and the slot it came from.
    pub fn score_record(
        &self,
        scorer: &mut Scorer,
        record: &ClonotypeRecord,
        stats: &mut ScanStats,
    ) -> Option<(usize, Slot)> {
        let query_cdr3 = self.query.mode.cdr3(self.chain)?;
        match self.chain {
            Chain::Heavy | Chain::Light => {
                if !filter::passes(record, self.query, self.chain) {
                    return None;
                }
                stats.candidates += 1;
                let cdr3 = record.cdr3(self.chain)?;
                let slot = if self.chain == Chain::Heavy {
                    Slot::Heavy
                } else {
                    Slot::Light
                };
                self.score(scorer, query_cdr3, cdr3, stats).map(|d| (d, slot))
            }
            Chain::Generic => {
                let mut best: Option<(usize, Slot)> = None;
                let mut candidate = false;
                for slot in [Slot::Heavy, Slot::Light, Slot::Unpaired] {
                    if !filter::slot_passes(record, self.query, slot) {
                        continue;
                    }
                    candidate = true;
                    let Some(cdr3) = record.slot_cdr3(slot) else {
                        continue;
                    };
                    if let Some(d) = self.score(scorer, query_cdr3, cdr3, stats)
                        && best.is_none_or(|(b, _)| d < b)
                    {
                        best = Some((d, slot));
                    }
                }
                if candidate {
                    stats.candidates += 1;
                }
                best
            }
        }
    }

    /// Score all records of a chunk, keeping source order.
    pub fn match_chunk(
        &self,
        scorer: &mut Scorer,
        chunk: Chunk,
        stats: &mut ScanStats,
    ) -> Vec<MatchResult> {
        stats.chunks += 1;
        stats.rows += chunk.rows();
        stats.malformed += chunk.malformed.len();

        let mut matches = vec![];
        for record in chunk.records {
            if let Some((distance, slot)) = self.score_record(scorer, &record, stats) {
                log::trace!(
                    "{} match {} at distance {distance}",
                    self.chain,
                    record.record_id
                );
                stats.record_match(distance);
                matches.push(MatchResult {
                    record,
                    distance,
                    chain: self.chain,
                    slot,
                });
            }
        }
        matches
    }

    /// Start a lazy pass over the database.
    pub fn iter(&self) -> Result<Matches<'a>> {
        Ok(Matches {
            matcher: *self,
            chunks: self.scanner.chunks()?,
            scorer: Scorer::new(self.query.method),
            pending: vec![].into_iter(),
            stats: ScanStats::new(self.query.threshold),
            failed: false,
        })
    }

    /// Scan the database with `threads` workers and return all matches in
    /// source order.
    ///
    /// Workers take chunks from the shared scanner one at a time. Results are
    /// keyed by chunk index, so the output does not depend on scheduling.
    pub fn collect_parallel(&self, threads: usize) -> Result<(Vec<MatchResult>, ScanStats)> {
        if threads <= 1 {
            let mut matches = self.iter()?;
            let all = matches.by_ref().collect::<Result<Vec<_>>>()?;
            return Ok((all, matches.stats));
        }

        let chunks = Mutex::new(self.scanner.chunks()?);
        let results = Mutex::new(BTreeMap::<usize, Vec<MatchResult>>::new());
        let global_stats = Mutex::new(ScanStats::new(self.query.threshold));
        let error = Mutex::new(None::<SearchError>);

        std::thread::scope(|s| {
            for _ in 0..threads {
                let chunks = &chunks;
                let results = &results;
                let global_stats = &global_stats;
                let error = &error;
                s.spawn(move || {
                    // Each thread has its own scratch space.
                    let mut scorer = Scorer::new(self.query.method);
                    let mut local_stats = ScanStats::new(self.query.threshold);

                    loop {
                        let next = chunks.lock().unwrap().next();
                        let chunk = match next {
                            Some(Ok(chunk)) => chunk,
                            Some(Err(e)) => {
                                error.lock().unwrap().get_or_insert(e);
                                break;
                            }
                            None => break,
                        };
                        let index = chunk.index;
                        let matches = self.match_chunk(&mut scorer, chunk, &mut local_stats);
                        results.lock().unwrap().insert(index, matches);
                    }

                    global_stats.lock().unwrap().merge(&local_stats);
                });
            }
        });

        if let Some(e) = error.into_inner().unwrap() {
            return Err(e);
        }
        let matches = results
            .into_inner()
            .unwrap()
            .into_values()
            .flatten()
            .collect();
        Ok((matches, global_stats.into_inner().unwrap()))
    }
}

/// Lazy iterator over the matches of one chain.
///
/// Chunks are read only when the previous chunk's matches have been consumed,
/// so dropping the iterator stops the scan.
pub struct Matches<'a> {
    matcher: ChainMatcher<'a>,
    chunks: Chunks<'a>,
    scorer: Scorer,
    pending: std::vec::IntoIter<MatchResult>,
    stats: ScanStats,
    failed: bool,
}

impl Matches<'_> {
    /// Statistics for the chunks read so far.
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn into_stats(self) -> ScanStats {
        self.stats
    }
}

impl Iterator for Matches<'_> {
    type Item = Result<MatchResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(m) = self.pending.next() {
                return Some(Ok(m));
            }
            if self.failed {
                return None;
            }
            match self.chunks.next()? {
                Ok(chunk) => {
                    self.pending = self
                        .matcher
                        .match_chunk(&mut self.scorer, chunk, &mut self.stats)
                        .into_iter();
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
