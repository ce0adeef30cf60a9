use log::debug;
use serde_json::Value as JSValue;
use std::collections::HashMap;

use crate::choices::{resolve_choice, resolve_multiple};
use crate::config::*;
use crate::labels::{extract_labels, visit, QuestionNode};
use crate::path::FieldPath;
use crate::table::{Cell, Table};

/// Question types that record metadata about the interview, not answers.
const METADATA_KINDS: [&str; 10] = [
    "start",
    "end",
    "today",
    "deviceid",
    "username",
    "simserial",
    "subscriberid",
    "phonenumber",
    "audit",
    "background-audio",
];

fn is_metadata_key(key: &str) -> bool {
    matches!(key, "start" | "end" | "today" | "deviceid" | "__version__")
        || key.starts_with('_')
        || key.starts_with("meta/")
        || key.starts_with("formhub/")
}

fn geolocation(submission: &Submission, idx: usize) -> Cell {
    submission
        .get("_geolocation")
        .and_then(|g| g.as_array())
        .and_then(|g| g.get(idx))
        .and_then(json_cell)
}

/// (name -> (kind, list name)) for every question of the form.
fn question_index(data: &ProjectData) -> HashMap<String, (String, Option<String>)> {
    let mut res = HashMap::new();
    visit(&data.form.questions.nodes, &mut |n| {
        if let QuestionNode::Question {
            name,
            kind,
            list_name,
            ..
        } = n
        {
            res.insert(name.clone(), (kind.clone(), list_name.clone()));
        }
    });
    res
}

/// Sorts by `_submission_time`. Submissions without a time keep their
/// relative order, after the dated ones.
fn sorted_by_time(submissions: &[Submission]) -> Vec<&Submission> {
    let mut res: Vec<&Submission> = submissions.iter().collect();
    res.sort_by(|a, b| {
        let ta = a.get("_submission_time").and_then(|v| v.as_str());
        let tb = b.get("_submission_time").and_then(|v| v.as_str());
        match (ta, tb) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    res
}

/// Builds one table with one row per submission, for flat (non-repeating) forms.
///
/// The first columns are [`META_COLUMNS`]. Every answered question then adds a
/// column headed by its cleaned label, holding the choice label (or the raw
/// answer). Columns appear in the order they are first seen.
pub fn extract_single_records(data: &ProjectData, rules: &PipelineRules) -> Extraction<Table> {
    if data.submissions.is_empty() {
        return Extraction::NoData;
    }
    let labels = extract_labels(&data.form.questions.nodes);
    let questions = question_index(data);
    let choices = &data.form.choices;

    let mut columns: Vec<String> = META_COLUMNS.iter().map(|s| s.to_string()).collect();
    let mut positions: HashMap<String, usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.clone(), idx))
        .collect();
    let mut rows: Vec<Vec<Cell>> = Vec::new();

    for submission in sorted_by_time(&data.submissions) {
        let mut row: Vec<Cell> = vec![
            submission.get("start").and_then(json_cell),
            submission.get("end").and_then(json_cell),
            geolocation(submission, 0),
            geolocation(submission, 1),
        ];
        for (key, value) in submission.iter() {
            if is_metadata_key(key) {
                continue;
            }
            let path = FieldPath::parse(key);
            let name = path.last().unwrap_or("");
            let (kind, list_name) = match questions.get(name) {
                Some(q) => q,
                None => {
                    debug!("extract_single_records: {} is not a question", key);
                    continue;
                }
            };
            if METADATA_KINDS.contains(&kind.as_str()) {
                continue;
            }
            let header = labels.get(name).cloned().unwrap_or_else(|| name.to_string());
            let cell = match (value, list_name) {
                (JSValue::String(code), Some(list_name)) if kind == "select_multiple" => {
                    Some(resolve_multiple(list_name, code, choices))
                }
                (JSValue::String(code), Some(list_name)) => {
                    Some(resolve_choice(list_name, code, choices).to_string())
                }
                (x, _) => json_cell(x),
            };
            let pos = match positions.get(&header) {
                Some(pos) => *pos,
                None => {
                    positions.insert(header.clone(), columns.len());
                    columns.push(header);
                    columns.len() - 1
                }
            };
            if row.len() <= pos {
                row.resize(pos + 1, None);
            }
            row[pos] = cell;
        }
        rows.push(row);
    }

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row);
    }
    let prefix = rules.time_difference_prefix.as_str();
    table.retain_columns(|c| !c.starts_with(prefix));
    Extraction::Data(table)
}
