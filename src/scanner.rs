use crate::database::{RecordSource, RecordStream};
use crate::error::{Result, SearchError};
use crate::record::ClonotypeRecord;

/// Number of records per chunk when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Settings for a [`Scanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Maximum number of database rows held in memory at once.
    /// Only affects performance, never which records match.
    pub chunk_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ScanConfig {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SearchError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }
}

/// Chunk size from a signed value, as passed by callers that cannot express `usize`.
impl TryFrom<i64> for ScanConfig {
    type Error = SearchError;

    fn try_from(chunk_size: i64) -> Result<Self> {
        let chunk_size = usize::try_from(chunk_size).map_err(|_| SearchError::InvalidChunkSize)?;
        ScanConfig::new(chunk_size)
    }
}

/// A batch of consecutive database rows.
#[derive(Debug)]
pub struct Chunk {
    /// 0-based position of the chunk in the scan.
    pub index: usize,
    pub records: Vec<ClonotypeRecord>,
    /// Rows of this chunk that failed to parse. Always [`SearchError::MalformedRecord`].
    pub malformed: Vec<SearchError>,
}

impl Chunk {
    /// Number of database rows covered by this chunk.
    pub fn rows(&self) -> usize {
        self.records.len() + self.malformed.len()
    }
}

/// Reads a [`RecordSource`] in chunks of at most `chunk_size` rows.
///
/// Each call to [`Scanner::chunks`] starts a new pass from the first record.
/// Chunks are only read when the iterator is advanced.
#[derive(Clone, Copy)]
pub struct Scanner<'a> {
    source: &'a dyn RecordSource,
    config: ScanConfig,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a dyn RecordSource, config: ScanConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(SearchError::InvalidChunkSize);
        }
        Ok(Self { source, config })
    }

    pub fn config(&self) -> ScanConfig {
        self.config
    }

    pub fn source(&self) -> &'a dyn RecordSource {
        self.source
    }

    /// Start a new pass over the database.
    pub fn chunks(&self) -> Result<Chunks<'a>> {
        Ok(Chunks {
            stream: self.source.records()?,
            chunk_size: self.config.chunk_size,
            next_index: 0,
            done: false,
        })
    }
}

/// Iterator over the chunks of one pass.
///
/// Yields an error and stops when the source fails with anything other
/// than a malformed record.
pub struct Chunks<'a> {
    stream: RecordStream<'a>,
    chunk_size: usize,
    next_index: usize,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = Chunk {
            index: self.next_index,
            records: Vec::with_capacity(self.chunk_size.min(1 << 16)),
            malformed: vec![],
        };
        while chunk.rows() < self.chunk_size {
            match self.stream.next() {
                Some(Ok(record)) => chunk.records.push(record),
                Some(Err(e)) if e.is_recoverable() => {
                    log::debug!("Skipping {e}");
                    chunk.malformed.push(e);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if chunk.rows() == 0 {
            return None;
        }
        self.next_index += 1;
        log::debug!(
            "Read chunk {} ({} records, {} malformed)",
            chunk.index,
            chunk.records.len(),
            chunk.malformed.len()
        );
        Some(Ok(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDatabase;

    fn database(n: usize) -> MemoryDatabase {
        MemoryDatabase::new((0..n).map(|i| ClonotypeRecord::new(i.to_string())))
    }

    #[test]
    fn test_chunk_sizes() {
        let db = database(10);
        let scanner = Scanner::new(&db, ScanConfig::new(4).unwrap()).unwrap();
        let sizes: Vec<_> = scanner
            .chunks()
            .unwrap()
            .map(|c| c.unwrap().records.len())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);

        let indices: Vec<_> = scanner.chunks().unwrap().map(|c| c.unwrap().index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_source_order_and_restart() {
        let db = database(7);
        let scanner = Scanner::new(&db, ScanConfig::new(3).unwrap()).unwrap();
        fn ids(scanner: &Scanner<'_>) -> Vec<String> {
            scanner
                .chunks()
                .unwrap()
                .flat_map(|c| c.unwrap().records)
                .map(|r| r.record_id)
                .collect()
        }
        let expected: Vec<_> = (0..7).map(|i| i.to_string()).collect();
        assert_eq!(ids(&scanner), expected);
        // A second pass starts from the beginning again.
        assert_eq!(ids(&scanner), expected);
    }

    #[test]
    fn test_malformed_in_chunk() {
        let mut db = database(2);
        db.push_malformed("broken");
        db.push(ClonotypeRecord::new("3"));
        db.push(ClonotypeRecord::new("4"));
        let scanner = Scanner::new(&db, ScanConfig::new(4).unwrap()).unwrap();
        let chunks: Vec<_> = scanner.chunks().unwrap().map(|c| c.unwrap()).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].records.len(), 3);
        assert_eq!(chunks[0].malformed.len(), 1);
        assert_eq!(chunks[1].records[0].record_id, "4");
    }

    #[test]
    fn test_signed_chunk_size() {
        assert_eq!(ScanConfig::try_from(7i64).unwrap().chunk_size, 7);
        for bad in [0i64, -1, i64::MIN] {
            let err = ScanConfig::try_from(bad).unwrap_err();
            assert!(matches!(err, SearchError::InvalidChunkSize));
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_empty_and_invalid() {
        let db = MemoryDatabase::default();
        let scanner = Scanner::new(&db, ScanConfig::default()).unwrap();
        assert_eq!(scanner.chunks().unwrap().count(), 0);

        assert!(matches!(ScanConfig::new(0), Err(SearchError::InvalidChunkSize)));
        assert!(Scanner::new(&db, ScanConfig { chunk_size: 0 }).is_err());
    }
}
