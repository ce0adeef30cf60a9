// Review of a table through a CSV file.

use std::path::{Path, PathBuf};

use crate::kobo::*;

/// The result of asking a reviewer for the final version of a table.
#[derive(PartialEq, Debug, Clone)]
pub enum EditOutcome {
    Committed(Table),
    /// The reviewer has not committed the table yet. This is not an error.
    Pending,
}

pub trait TableEditor {
    fn edit(&self, table: &Table) -> BKoboResult<EditOutcome>;
}

/// Round-trips a table through a CSV file on disk.
///
/// The first call writes the table and returns `Pending`. Once the file
/// exists, its edited content is the committed table. Empty fields read back
/// as empty cells.
pub struct CsvFileEditor {
    path: PathBuf,
}

impl CsvFileEditor {
    pub fn new<P: AsRef<Path>>(path: P) -> CsvFileEditor {
        CsvFileEditor {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    fn write_table(&self, table: &Table) -> KoboResult<()> {
        let path = self.path_str();
        let mut wtr = csv::Writer::from_path(&self.path).context(CsvOpenSnafu { path: &path })?;
        wtr.write_record(&table.columns)
            .context(CsvWriteSnafu { path: &path })?;
        for row in table.rows.iter() {
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
                .context(CsvWriteSnafu { path: &path })?;
        }
        wtr.flush().context(WritingFileSnafu { path })?;
        Ok(())
    }

    fn read_table(&self) -> KoboResult<Table> {
        let path = self.path_str();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .context(CsvOpenSnafu { path: &path })?;
        let columns: Vec<String> = rdr
            .headers()
            .context(CsvLineParseSnafu { path: &path })?
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut table = Table::new(columns);
        for record in rdr.records() {
            let record = record.context(CsvLineParseSnafu { path: &path })?;
            let row: Vec<Cell> = record
                .iter()
                .take(table.num_columns())
                .map(|s| {
                    if s.is_empty() {
                        None
                    } else {
                        Some(s.to_string())
                    }
                })
                .collect();
            table.push_row(row);
        }
        debug!(
            "read_table: {}: {} rows, {} columns",
            path,
            table.num_rows(),
            table.num_columns()
        );
        Ok(table)
    }
}

impl TableEditor for CsvFileEditor {
    fn edit(&self, table: &Table) -> BKoboResult<EditOutcome> {
        if self.path.exists() {
            info!("Reading reviewed table from {}", self.path.display());
            Ok(EditOutcome::Committed(self.read_table()?))
        } else {
            self.write_table(table)?;
            info!("Table written for review to {}", self.path.display());
            Ok(EditOutcome::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample() -> Table {
        let mut t = Table::new(vec!["Question".to_string(), "Respondent 1".to_string()]);
        t.push_row(vec![Some("Start".to_string()), Some("2024-01-01".to_string())]);
        t.push_row(vec![Some("Comment, with comma".to_string()), None]);
        t
    }

    #[test]
    fn pending_then_committed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.csv");
        let editor = CsvFileEditor::new(&path);

        assert_eq!(editor.edit(&sample()).unwrap(), EditOutcome::Pending);
        assert!(path.exists());

        // Unchanged file: the committed table is the original one.
        assert_eq!(
            editor.edit(&sample()).unwrap(),
            EditOutcome::Committed(sample())
        );

        let edited = fs::read_to_string(&path)
            .unwrap()
            .replace("2024-01-01", "2024-01-02");
        fs::write(&path, edited).unwrap();
        match editor.edit(&sample()).unwrap() {
            EditOutcome::Committed(t) => {
                assert_eq!(t.rows[0][1], Some("2024-01-02".to_string()));
                assert_eq!(t.rows[1][0], Some("Comment, with comma".to_string()));
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn short_lines_are_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.csv");
        fs::write(&path, "a,b,c\n1\n2,3,4,5\n").unwrap();
        match CsvFileEditor::new(&path).edit(&Table::default()).unwrap() {
            EditOutcome::Committed(t) => {
                assert_eq!(t.columns, vec!["a", "b", "c"]);
                assert_eq!(t.rows[0], vec![Some("1".to_string()), None, None]);
                assert_eq!(t.rows[1].len(), 3);
            }
            x => panic!("unexpected {:?}", x),
        }
    }
}
