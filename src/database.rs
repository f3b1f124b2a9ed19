//! Record sources the scanner reads from.
//!
//! A [`RecordSource`] hands out a fresh, ordered stream of records on every
//! call to [`RecordSource::records`]. Items that fail to parse are yielded as
//! [`SearchError::MalformedRecord`] and the stream continues with the next
//! record. Any other error ends the stream.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{RecordLocation, Result, SearchError};
use crate::record::ClonotypeRecord;

/// A stream of records, in source order.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<ClonotypeRecord>> + Send + 'a>;

/// A read-only database of clonotype records.
///
/// Sources hold no cursor: each call to [`records`](RecordSource::records)
/// starts from the first record, and concurrent streams are independent.
pub trait RecordSource: Sync {
    /// Human-readable name, used in log messages.
    fn name(&self) -> String;

    /// Open a new stream over all records.
    fn records(&self) -> Result<RecordStream<'_>>;
}

/// Column a CSV header maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Column {
    RecordId,
    Cdr3Heavy,
    Cdr3Light,
    Cdr3,
    VCallHeavy,
    JCallHeavy,
    VCallLight,
    JCallLight,
    Passthrough(String),
}

impl Column {
    /// Known column for a header name, including accepted aliases.
    fn known(name: &str) -> Option<Column> {
        Some(match name.to_ascii_lowercase().as_str() {
            "record_id" | "sequence_id" | "clone_id" | "id" => Column::RecordId,
            "cdr3_aa_heavy" | "heavy_cdr3_aa" | "cdr3_heavy" => Column::Cdr3Heavy,
            "cdr3_aa_light" | "light_cdr3_aa" | "cdr3_light" => Column::Cdr3Light,
            "cdr3_aa" | "cdr3" | "junction_aa" => Column::Cdr3,
            "v_call_heavy" | "heavy_v_call" => Column::VCallHeavy,
            "j_call_heavy" | "heavy_j_call" => Column::JCallHeavy,
            "v_call_light" | "light_v_call" => Column::VCallLight,
            "j_call_light" | "light_j_call" => Column::JCallLight,
            _ => return None,
        })
    }

    /// Map each header to a column. The first header claiming a known column
    /// wins, later duplicates are passed through under their own name.
    fn from_headers<'h>(headers: impl Iterator<Item = &'h str>) -> Vec<Column> {
        let mut columns: Vec<Column> = vec![];
        for header in headers {
            let header = header.trim();
            let column = match Column::known(header) {
                Some(c) if !columns.contains(&c) => c,
                _ => Column::Passthrough(header.to_string()),
            };
            columns.push(column);
        }
        columns
    }
}

/// Reads records from a single delimited file.
struct CsvFileReader {
    path: PathBuf,
    source_name: String,
    reader: csv::Reader<File>,
    columns: Vec<Column>,
    has_record_id: bool,
    row: u64,
    buf: csv::ByteRecord,
}

impl CsvFileReader {
    fn open(path: &Path) -> Result<Self> {
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)
            .map_err(|e| SearchError::csv(path, e))?;

        // Header names are decoded lossily.
        let headers: Vec<String> = reader
            .byte_headers()
            .map_err(|e| SearchError::csv(path, e))?
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        let columns = Column::from_headers(headers.iter().map(String::as_str));
        let has_record_id = columns.contains(&Column::RecordId);
        // The extension is kept: `a.csv` and `a.tsv` must not share ids.
        let source_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::debug!(
            "Opened {} with {} columns{}",
            path.display(),
            columns.len(),
            if has_record_id {
                ""
            } else {
                " (no record_id column, ids are synthesized)"
            }
        );

        Ok(Self {
            path: path.to_path_buf(),
            source_name,
            reader,
            columns,
            has_record_id,
            row: 0,
            buf: csv::ByteRecord::new(),
        })
    }

    fn malformed(&self, reason: impl Into<String>) -> SearchError {
        SearchError::MalformedRecord {
            location: RecordLocation {
                source: self.path.display().to_string(),
                row: self.row,
            },
            reason: reason.into(),
        }
    }

    fn next_record(&mut self) -> Option<Result<ClonotypeRecord>> {
        match self.reader.read_byte_record(&mut self.buf) {
            Ok(false) => return None,
            Ok(true) => {}
            Err(e) => {
                self.row += 1;
                if e.is_io_error() {
                    return Some(Err(SearchError::csv(&self.path, e)));
                }
                return Some(Err(self.malformed(e.to_string())));
            }
        }
        self.row += 1;
        Some(self.parse_row())
    }

    fn parse_row(&self) -> Result<ClonotypeRecord> {
        if self.buf.len() != self.columns.len() {
            return Err(self.malformed(format!(
                "expected {} fields, found {}",
                self.columns.len(),
                self.buf.len()
            )));
        }

        let mut record = ClonotypeRecord::default();
        if !self.has_record_id {
            record.record_id = format!("{}:{}", self.source_name, self.row);
        }

        for (column, raw) in self.columns.iter().zip(self.buf.iter()) {
            let value = std::str::from_utf8(raw)
                .map_err(|e| self.malformed(format!("invalid UTF-8: {e}")))?
                .trim();
            let optional = (!value.is_empty()).then(|| value.to_string());
            match column {
                Column::RecordId => {
                    if value.is_empty() {
                        return Err(self.malformed("empty record_id"));
                    }
                    record.record_id = value.to_string();
                }
                Column::Cdr3Heavy => record.cdr3_aa_heavy = optional.map(|s| s.to_ascii_uppercase()),
                Column::Cdr3Light => record.cdr3_aa_light = optional.map(|s| s.to_ascii_uppercase()),
                Column::Cdr3 => record.cdr3_aa = optional.map(|s| s.to_ascii_uppercase()),
                Column::VCallHeavy => record.v_call_heavy = optional,
                Column::JCallHeavy => record.j_call_heavy = optional,
                Column::VCallLight => record.v_call_light = optional,
                Column::JCallLight => record.j_call_light = optional,
                Column::Passthrough(name) => {
                    record.passthrough.push((name.clone(), value.to_string()))
                }
            }
        }
        Ok(record)
    }
}

/// A directory of `.csv` / `.tsv` files, or a single such file.
///
/// Files are read in lexicographic order of their names. The delimiter is
/// chosen by extension.
#[derive(Debug, Clone)]
pub struct CsvDatabase {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl CsvDatabase {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let meta = std::fs::metadata(&root).map_err(|e| SearchError::io(&root, e))?;

        let files = if meta.is_file() {
            vec![root.clone()]
        } else {
            let mut files = vec![];
            for entry in std::fs::read_dir(&root).map_err(|e| SearchError::io(&root, e))? {
                let path = entry.map_err(|e| SearchError::io(&root, e))?.path();
                let is_table = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("tsv"));
                if is_table && path.is_file() {
                    files.push(path);
                }
            }
            files.sort();
            files
        };

        if files.is_empty() {
            return Err(SearchError::EmptyDatabase { path: root });
        }
        log::info!("Database {}: {} file(s)", root.display(), files.len());
        Ok(Self { root, files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl RecordSource for CsvDatabase {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    fn records(&self) -> Result<RecordStream<'_>> {
        Ok(Box::new(CsvRecords {
            files: self.files.iter(),
            current: None,
            done: false,
        }))
    }
}

/// Chains the records of all files, opening each file only when reached.
struct CsvRecords<'a> {
    files: std::slice::Iter<'a, PathBuf>,
    current: Option<CsvFileReader>,
    done: bool,
}

impl Iterator for CsvRecords<'_> {
    type Item = Result<ClonotypeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.current.is_none() {
                let path = self.files.next()?;
                match CsvFileReader::open(path) {
                    Ok(reader) => self.current = Some(reader),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }
            let reader = self.current.as_mut()?;
            match reader.next_record() {
                Some(Err(e)) if !e.is_recoverable() => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(item) => return Some(item),
                None => self.current = None,
            }
        }
    }
}

/// An in-memory database. Entries are either records or the reason a row
/// failed to parse.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    entries: Vec<std::result::Result<ClonotypeRecord, String>>,
}

impl MemoryDatabase {
    pub fn new(records: impl IntoIterator<Item = ClonotypeRecord>) -> Self {
        Self {
            entries: records.into_iter().map(Ok).collect(),
        }
    }

    pub fn push(&mut self, record: ClonotypeRecord) {
        self.entries.push(Ok(record));
    }

    /// Add an entry that will be reported as a malformed record.
    pub fn push_malformed(&mut self, reason: impl Into<String>) {
        self.entries.push(Err(reason.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RecordSource for MemoryDatabase {
    fn name(&self) -> String {
        "memory".to_string()
    }

    fn records(&self) -> Result<RecordStream<'_>> {
        Ok(Box::new(self.entries.iter().enumerate().map(
            |(i, entry)| match entry {
                Ok(record) => Ok(record.clone()),
                Err(reason) => Err(SearchError::MalformedRecord {
                    location: RecordLocation {
                        source: "memory".to_string(),
                        row: i as u64 + 1,
                    },
                    reason: reason.clone(),
                }),
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_csv_columns_and_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "db.csv",
            "record_id,cdr3_aa_heavy,v_call_heavy,count,cdr3_aa_light\n\
             1,cardtggfdiw,IGHV1-69*01,12,\n\
             2,,,3,CASSSGIGNAVFGGGTKLTVL\n",
        );
        let db = CsvDatabase::open(dir.path()).unwrap();
        let records: Vec<_> = db.records().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].record_id, "1");
        assert_eq!(records[0].cdr3_aa_heavy.as_deref(), Some("CARDTGGFDIW"));
        assert_eq!(records[0].v_call_heavy.as_deref(), Some("IGHV1-69*01"));
        assert_eq!(records[0].cdr3_aa_light, None);
        assert_eq!(
            records[0].passthrough,
            vec![("count".to_string(), "12".to_string())]
        );

        assert_eq!(records[1].cdr3_aa_heavy, None);
        assert_eq!(
            records[1].cdr3_aa_light.as_deref(),
            Some("CASSSGIGNAVFGGGTKLTVL")
        );
    }

    #[test]
    fn test_tsv_and_synthesized_ids() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.tsv", "junction_aa\tsample\nCASSLGF\ts2\n");
        write_file(dir.path(), "a.tsv", "junction_aa\tsample\nCARDW\ts1\nCARDY\ts1\n");
        write_file(dir.path(), "notes.txt", "ignored");
        let db = CsvDatabase::open(dir.path()).unwrap();
        assert_eq!(db.files().len(), 2);

        let ids: Vec<_> = db
            .records()
            .unwrap()
            .map(|r| r.unwrap().record_id)
            .collect();
        assert_eq!(ids, vec!["a.tsv:1", "a.tsv:2", "b.tsv:1"]);
    }

    #[test]
    fn test_synthesized_ids_unique_across_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.csv", "cdr3_aa_heavy\nCARDTGGFDIW\n");
        write_file(dir.path(), "a.tsv", "cdr3_aa_light\nCQQYNSYPLTF\n");
        let db = CsvDatabase::open(dir.path()).unwrap();
        let ids: Vec<_> = db
            .records()
            .unwrap()
            .map(|r| r.unwrap().record_id)
            .collect();
        assert_eq!(ids, vec!["a.csv:1", "a.tsv:1"]);
    }

    #[test]
    fn test_non_utf8_header_is_decoded_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.csv");
        let mut content = b"record_id,cdr3_aa_heavy,note\xff\n".to_vec();
        content.extend_from_slice(b"1,CARDW,x\n");
        std::fs::write(&path, content).unwrap();

        let db = CsvDatabase::open(&path).unwrap();
        let records: Vec<_> = db.records().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cdr3_aa_heavy.as_deref(), Some("CARDW"));
        assert_eq!(
            records[0].passthrough,
            vec![("note\u{FFFD}".to_string(), "x".to_string())]
        );
    }

    #[test]
    fn test_malformed_rows_do_not_stop_stream() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "db.csv",
            "record_id,cdr3_aa_heavy\n1,CARDW\n2,CARDY,extra\n,CARDF\n4,CARDG\n",
        );
        let db = CsvDatabase::open(dir.path()).unwrap();
        let items: Vec<_> = db.records().unwrap().collect();
        assert_eq!(items.len(), 4);
        assert!(items[0].is_ok());
        assert!(matches!(
            &items[1],
            Err(SearchError::MalformedRecord { location, .. }) if location.row == 2
        ));
        assert!(matches!(&items[2], Err(e) if e.is_recoverable()));
        assert_eq!(items[3].as_ref().unwrap().record_id, "4");
    }

    #[test]
    fn test_records_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "db.csv", "id,cdr3\nx,CARDW\ny,CARDY\n");
        let db = CsvDatabase::open(&path).unwrap();
        let mut first = db.records().unwrap();
        assert_eq!(first.next().unwrap().unwrap().record_id, "x");
        let second: Vec<_> = db.records().unwrap().map(|r| r.unwrap().record_id).collect();
        assert_eq!(second, vec!["x", "y"]);
    }

    #[test]
    fn test_open_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            CsvDatabase::open(dir.path()),
            Err(SearchError::EmptyDatabase { .. })
        ));
        assert!(matches!(
            CsvDatabase::open(dir.path().join("missing")),
            Err(SearchError::Io { .. })
        ));
    }

    #[test]
    fn test_memory_database() {
        let mut db = MemoryDatabase::new([ClonotypeRecord::new("1")]);
        db.push_malformed("bad row");
        db.push(ClonotypeRecord::new("3"));
        let items: Vec<_> = db.records().unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[1], Err(e) if e.is_recoverable()));
        assert_eq!(items[2].as_ref().unwrap().record_id, "3");
    }
}
