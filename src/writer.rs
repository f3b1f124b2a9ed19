use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::merge::OutputRow;

/// Columns written for every search, before any passthrough columns.
pub const FIXED_COLUMNS: [&str; 9] = [
    "record_id",
    "cdr3_aa_heavy",
    "v_call_heavy",
    "j_call_heavy",
    "distance_heavy",
    "cdr3_aa_light",
    "v_call_light",
    "j_call_light",
    "distance_light",
];

/// Trailing columns of a generic search: the undifferentiated CDR3 and the
/// best distance over all CDR3s of the record.
pub const GENERIC_COLUMNS: [&str; 2] = ["cdr3_aa", "distance"];

/// Writes output rows to a CSV file.
///
/// Rows go to a temporary file next to the destination, which is renamed
/// into place only once every row has been written. A failed write leaves
/// no output file behind.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    path: PathBuf,
    generic: bool,
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn opt_distance(value: Option<usize>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

impl ResultWriter {
    /// `generic` adds the trailing `cdr3_aa` and `distance` columns.
    pub fn new(path: impl AsRef<Path>, generic: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            generic,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Passthrough column names of `rows`, in first-seen order.
    pub fn passthrough_columns(rows: &[OutputRow]) -> Vec<String> {
        let mut columns: Vec<String> = vec![];
        for row in rows {
            for (name, _) in &row.record.passthrough {
                if !columns.contains(name) {
                    columns.push(name.clone());
                }
            }
        }
        columns
    }

    pub fn header(&self, passthrough: &[String]) -> Vec<String> {
        let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(passthrough.iter().cloned());
        if self.generic {
            header.extend(GENERIC_COLUMNS.iter().map(|c| c.to_string()));
        }
        header
    }

    fn fields(&self, row: &OutputRow, passthrough: &[String]) -> Vec<String> {
        let r = &row.record;
        let mut fields = vec![
            r.record_id.clone(),
            opt(&r.cdr3_aa_heavy).to_string(),
            opt(&r.v_call_heavy).to_string(),
            opt(&r.j_call_heavy).to_string(),
            opt_distance(row.distance_heavy),
            opt(&r.cdr3_aa_light).to_string(),
            opt(&r.v_call_light).to_string(),
            opt(&r.j_call_light).to_string(),
            opt_distance(row.distance_light),
        ];
        for column in passthrough {
            let value = r
                .passthrough
                .iter()
                .find(|(name, _)| name == column)
                .map(|(_, v)| v.as_str())
                .unwrap_or("");
            fields.push(value.to_string());
        }
        if self.generic {
            fields.push(opt(&r.cdr3_aa).to_string());
            fields.push(opt_distance(row.distance));
        }
        fields
    }

    /// Write all rows and move the file into place. Returns the number of rows written.
    pub fn write(&self, rows: impl IntoIterator<Item = OutputRow>) -> Result<usize> {
        let rows: Vec<OutputRow> = rows.into_iter().collect();
        let passthrough = Self::passthrough_columns(&rows);

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| SearchError::io(&dir, e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| SearchError::io(&dir, e))?;

        {
            let mut writer = csv::Writer::from_writer(&mut tmp);
            writer
                .write_record(self.header(&passthrough))
                .map_err(|e| SearchError::csv(&self.path, e))?;
            for row in &rows {
                writer
                    .write_record(self.fields(row, &passthrough))
                    .map_err(|e| SearchError::csv(&self.path, e))?;
            }
            writer.flush().map_err(|e| SearchError::io(&self.path, e))?;
        }
        tmp.flush().map_err(|e| SearchError::io(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| SearchError::io(&self.path, e.error))?;

        log::info!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ClonotypeRecord;

    fn read(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_write_single_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("heavy.csv");
        let rows = vec![
            OutputRow {
                record: ClonotypeRecord::new("1")
                    .with_heavy("CARDTGGFDIW", Some("IGHV1-69"), None)
                    .with_field("count", "12"),
                distance_heavy: Some(0),
                distance_light: None,
                distance: None,
            },
            OutputRow {
                record: ClonotypeRecord::new("2")
                    .with_heavy("CARDTGGFDYW", None, None)
                    .with_field("sample", "s1")
                    .with_field("count", "3"),
                distance_heavy: Some(1),
                distance_light: None,
                distance: None,
            },
        ];
        let n = ResultWriter::new(&path, false).write(rows).unwrap();
        assert_eq!(n, 2);

        let table = read(&path);
        assert_eq!(
            table[0],
            vec![
                "record_id",
                "cdr3_aa_heavy",
                "v_call_heavy",
                "j_call_heavy",
                "distance_heavy",
                "cdr3_aa_light",
                "v_call_light",
                "j_call_light",
                "distance_light",
                "count",
                "sample"
            ]
        );
        assert_eq!(
            table[1],
            vec!["1", "CARDTGGFDIW", "IGHV1-69", "", "0", "", "", "", "", "12", ""]
        );
        assert_eq!(
            table[2],
            vec!["2", "CARDTGGFDYW", "", "", "1", "", "", "", "", "3", "s1"]
        );
    }

    #[test]
    fn test_write_generic_distance_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generic.csv");
        let rows = vec![OutputRow {
            record: ClonotypeRecord::new("u").with_cdr3("CARDTGGFDI"),
            distance_heavy: None,
            distance_light: None,
            distance: Some(1),
        }];
        ResultWriter::new(&path, true).write(rows).unwrap();
        let table = read(&path);
        assert_eq!(&table[0][9..], &["cdr3_aa", "distance"]);
        assert_eq!(&table[1][9..], &["CARDTGGFDI", "1"]);
    }

    #[test]
    fn test_empty_result_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        assert_eq!(ResultWriter::new(&path, false).write(vec![]).unwrap(), 0);
        let table = read(&path);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].len(), FIXED_COLUMNS.len());
    }
}
