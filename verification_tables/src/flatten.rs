use log::debug;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use std::collections::HashMap;

use crate::config::*;
use crate::path::FieldPath;
use crate::table::{retain_masked, Cell, Table};

/// A top-level field is a repeating group when its value is an array holding
/// at least one object.
fn is_repeating_group(value: &JSValue) -> bool {
    match value {
        JSValue::Array(items) => items.iter().any(|x| x.is_object()),
        _ => false,
    }
}

/// Flattens one JSON value into `(path, cell)` pairs. Objects add one path
/// segment per key, everything else is a cell.
fn flatten_value(path: FieldPath, value: &JSValue, out: &mut Vec<(FieldPath, Cell)>) {
    match value {
        JSValue::Object(obj) => {
            for (k, v) in obj.iter() {
                flatten_value(path.child(k), v, out);
            }
        }
        x => out.push((path, json_cell(x))),
    }
}

/// Turns the entries of one repeating group into a table, one row per entry.
///
/// The columns are the union of the keys of all the entries, in the order
/// they are first seen, identified by their full path. Entry keys are
/// already fully qualified by the platform (`grp/repeat/field`).
fn normalize_repeat(entries: &[JSValue]) -> (Vec<FieldPath>, Vec<Vec<Cell>>) {
    let mut columns: Vec<FieldPath> = Vec::new();
    let mut positions: HashMap<FieldPath, usize> = HashMap::new();
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for entry in entries.iter() {
        let mut cells: Vec<(FieldPath, Cell)> = Vec::new();
        match entry {
            JSValue::Object(obj) => {
                for (k, v) in obj.iter() {
                    flatten_value(FieldPath::parse(k), v, &mut cells);
                }
            }
            x => {
                debug!("normalize_repeat: entry is not an object: {:?}", x);
            }
        }
        let mut row: Vec<Cell> = vec![None; columns.len()];
        for (path, cell) in cells {
            let pos = match positions.get(&path) {
                Some(pos) => *pos,
                None => {
                    positions.insert(path.clone(), columns.len());
                    columns.push(path);
                    row.push(None);
                    columns.len() - 1
                }
            };
            row[pos] = cell;
        }
        rows.push(row);
    }
    for row in rows.iter_mut() {
        row.resize(columns.len(), None);
    }
    (columns, rows)
}

fn scalar_field(submission: &Submission, key: &str) -> Cell {
    submission.get(key).and_then(json_cell)
}

/// Parses the space-separated location into (latitude, longitude).
///
/// The platform appends altitude and accuracy, they are ignored.
fn parse_location(
    submission: &Submission,
    rules: &PipelineRules,
) -> Result<(String, String), ShapeError> {
    let field = rules.location_field.to_string();
    let value = submission
        .get(&field)
        .and_then(|v| v.as_str())
        .context(MissingLocationSnafu {
            field: field.clone(),
        })?;
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(lat), Some(lon)) => Ok((lat.to_string(), lon.to_string())),
        _ => IncompleteLocationSnafu { value }.fail(),
    }
}

/// Flattens the repeating groups of one submission into a wide table.
///
/// The table has one row per repeating entry. Its first four columns are
/// [`META_COLUMNS`], holding the same submission-level values on every row,
/// followed by the answers, named by the last segment of their path.
pub fn flatten_submission(
    submission: &Submission,
    rules: &PipelineRules,
) -> Result<Table, ShapeError> {
    let mut wide: Option<(Vec<FieldPath>, Vec<Vec<Cell>>)> = None;
    for (key, value) in submission.iter() {
        if !is_repeating_group(value) {
            continue;
        }
        let entries = value.as_array().map(|a| a.as_slice()).unwrap_or(&[]);
        let (mut columns, mut rows) = normalize_repeat(entries);
        debug!(
            "flatten_submission: group {}: {} rows, {} columns",
            key,
            rows.len(),
            columns.len()
        );

        // Repeat-index bookkeeping carries no answer.
        let kept: Vec<bool> = columns
            .iter()
            .map(|p| !p.last().unwrap_or("").ends_with(&rules.index_suffix))
            .collect();
        retain_masked(&mut columns, &mut rows, &kept);

        wide = match wide {
            None => Some((columns, rows)),
            Some((mut all_columns, mut all_rows)) => {
                ensure!(
                    all_rows.len() == rows.len(),
                    RowCountMismatchSnafu {
                        field: key.clone(),
                        expected: all_rows.len(),
                        found: rows.len(),
                    }
                );
                all_columns.extend(columns);
                for (row, other) in all_rows.iter_mut().zip(rows) {
                    row.extend(other);
                }
                Some((all_columns, all_rows))
            }
        };
    }
    let (columns, rows) = wide.context(NoRepeatingGroupSnafu {})?;

    let (lat, lon) = parse_location(submission, rules)?;

    let short_names: Vec<String> = columns
        .iter()
        .map(|p| p.last().unwrap_or("").to_string())
        .collect();
    let mut table = Table::new(short_names);
    for row in rows {
        table.push_row(row);
    }
    let meta: [Cell; 4] = [
        scalar_field(submission, "start"),
        scalar_field(submission, "end"),
        Some(lat),
        Some(lon),
    ];
    for (idx, (name, value)) in META_COLUMNS.iter().zip(meta.iter()).enumerate() {
        table.insert_constant_column(idx, name, value);
    }
    Ok(table)
}
