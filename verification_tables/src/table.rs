use serde::{Deserialize, Serialize};

/// A cell value. `None` is the explicit empty marker.
pub type Cell = Option<String>;

/// A rectangular table with named columns.
///
/// Invariant: every row has exactly one cell per column.
/// Column names are not required to be unique.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Table {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Adds a row, padding it with empty cells if it is too short.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |r| &r[idx])
    }

    /// Applies `f` to every non-empty cell of a column.
    pub fn map_column<F>(&mut self, idx: usize, f: F)
    where
        F: Fn(&str) -> String,
    {
        for row in self.rows.iter_mut() {
            if let Some(v) = row[idx].take() {
                row[idx] = Some(f(&v));
            }
        }
    }

    /// Inserts a column holding the same value on every row.
    pub fn insert_constant_column(&mut self, idx: usize, name: &str, value: &Cell) {
        self.columns.insert(idx, name.to_string());
        for row in self.rows.iter_mut() {
            row.insert(idx, value.clone());
        }
    }

    /// Keeps the columns for which `keep` returns true.
    pub fn retain_columns<F>(&mut self, keep: F)
    where
        F: Fn(&str) -> bool,
    {
        let kept: Vec<bool> = self.columns.iter().map(|c| keep(c.as_str())).collect();
        retain_masked(&mut self.columns, &mut self.rows, &kept);
    }

    /// Swaps rows and columns.
    ///
    /// Every column of this table becomes a row, whose first cell is taken from
    /// `row_labels` (one label per column). Every row of this table becomes a
    /// column named `<column_prefix> <n>`, 1-based. The first column is named
    /// `first_header`.
    pub fn transpose(
        &self,
        first_header: &str,
        row_labels: &[String],
        column_prefix: &str,
    ) -> Table {
        debug_assert_eq!(row_labels.len(), self.num_columns());
        let mut columns: Vec<String> = vec![first_header.to_string()];
        for idx in 0..self.num_rows() {
            columns.push(format!("{} {}", column_prefix, idx + 1));
        }
        let mut res = Table::new(columns);
        for (col_idx, _) in self.columns.iter().enumerate() {
            let mut row: Vec<Cell> = vec![row_labels.get(col_idx).cloned()];
            row.extend(self.column(col_idx).cloned());
            res.push_row(row);
        }
        res
    }
}

/// Drops the columns whose flag in `kept` is false, from the header and every row.
///
/// Columns past the end of `kept` are kept.
pub(crate) fn retain_masked<C>(columns: &mut Vec<C>, rows: &mut [Vec<Cell>], kept: &[bool]) {
    let mut flags = kept.iter();
    columns.retain(|_| *flags.next().unwrap_or(&true));
    for row in rows.iter_mut() {
        let mut flags = kept.iter();
        row.retain(|_| *flags.next().unwrap_or(&true));
    }
}
