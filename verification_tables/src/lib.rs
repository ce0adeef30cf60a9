mod config;
use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};

pub mod asset;
pub mod builder;
pub mod choices;
pub mod labels;
pub mod manual;
pub mod path;
pub mod quick_start;
pub mod table;

mod flatten;
mod single_record;
mod source;

pub use crate::choices::{resolve_choice, resolve_multiple, ChoiceLists};
pub use crate::config::*;
pub use crate::flatten::flatten_submission;
pub use crate::labels::{
    clean_label, extract_labels, extract_list_names, QuestionNode, QuestionTree,
};
pub use crate::path::FieldPath;
pub use crate::single_record::extract_single_records;
pub use crate::source::{fetch_project_data, SurveySource};
pub use crate::table::{Cell, Table};

/// The row labels of a verification table, one per column of the flattened table.
///
/// The metadata columns keep their name. The other columns use the cleaned
/// label of their key when there is one, and the key itself otherwise.
fn row_labels(columns: &[String], labels: &HashMap<String, String>) -> Vec<String> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            if idx < META_COLUMNS.len() {
                key.clone()
            } else {
                labels.get(key).cloned().unwrap_or_else(|| key.clone())
            }
        })
        .collect()
}

/// The display label of the verification number of a submission.
///
/// `None` when the field is absent, or when the list or the code is unknown.
fn verification_name(
    submission: &Submission,
    rules: &PipelineRules,
    data: &ProjectData,
) -> Option<String> {
    let code = submission
        .get(&rules.verification_field.to_string())
        .and_then(json_cell)?;
    data.form
        .choices
        .lookup(&rules.verification_list, &code)
        .map(|s| s.to_string())
}

/// Appends `_1`, `_2`, ... to `base` until the name is not taken.
fn unique_name(base: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&base) {
        return base;
    }
    let mut counter: usize = 1;
    loop {
        let candidate = format!("{}_{}", base, counter);
        if !taken.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Builds one verification table per submission.
///
/// Every submission is flattened, its coded answers are replaced by their
/// labels, and the result is transposed so that questions are rows and
/// respondents are columns. The tables are named after the verification
/// label of the submission (`df_<n>` when it has none or its code is
/// unknown) and the names are made unique in submission order.
///
/// Submissions that cannot be flattened are reported in
/// [`VerificationSet::skipped`] and do not consume a name.
pub fn assemble_verification_tables(
    data: &ProjectData,
    rules: &PipelineRules,
) -> Extraction<VerificationSet> {
    if data.submissions.is_empty() {
        return Extraction::NoData;
    }
    info!(
        "assemble_verification_tables: processing {} submissions",
        data.submissions.len()
    );

    let nodes: &[QuestionNode] = match &rules.question_root {
        None => &data.form.questions.nodes,
        Some(root) => match data.form.questions.subtree(root) {
            Some(nodes) => nodes,
            None => {
                warn!(
                    "assemble_verification_tables: question group {} not found in the form",
                    root
                );
                &[]
            }
        },
    };
    let list_names = extract_list_names(nodes);
    let labels: HashMap<String, String> = extract_labels(nodes)
        .into_iter()
        .filter(|(k, _)| !k.contains(&rules.section_marker))
        .collect();
    debug!(
        "assemble_verification_tables: {} choice keys, {} labels",
        list_names.len(),
        labels.len()
    );

    let mut res = VerificationSet::default();
    let mut taken: HashSet<String> = HashSet::new();
    for (idx, submission) in data.submissions.iter().enumerate() {
        let mut flat = match flatten_submission(submission, rules) {
            Ok(t) => t,
            Err(e) => {
                let id = submission.get("_id").and_then(json_cell);
                warn!(
                    "assemble_verification_tables: skipping submission {} (id {:?}): {}",
                    idx + 1,
                    id,
                    e
                );
                res.skipped.push(SkippedSubmission {
                    position: idx + 1,
                    id,
                    reason: e,
                });
                continue;
            }
        };

        for col_idx in META_COLUMNS.len()..flat.num_columns() {
            if let Some(list_name) = list_names.get(&flat.columns[col_idx]) {
                let choices = &data.form.choices;
                flat.map_column(col_idx, |code| {
                    resolve_choice(list_name, code, choices).to_string()
                });
            }
        }

        let row_labels = row_labels(&flat.columns, &labels);
        let table = flat.transpose(QUESTION_HEADER, &row_labels, RESPONDENT_PREFIX);

        let base = verification_name(submission, rules, data)
            .unwrap_or_else(|| format!("df_{}", idx + 1));
        let name = unique_name(base, &taken);
        debug!(
            "assemble_verification_tables: submission {} -> {:?} ({} respondents)",
            idx + 1,
            name,
            table.num_columns() - 1
        );
        taken.insert(name.clone());
        res.tables.push(NamedTable { name, table });
    }
    info!(
        "assemble_verification_tables: {} tables, {} skipped submissions",
        res.tables.len(),
        res.skipped.len()
    );
    Extraction::Data(res)
}

/// Fetches a project and builds its verification tables.
pub fn generate_verification_tables<S>(
    source: &S,
    project_uid: &str,
    rules: &PipelineRules,
) -> Result<Extraction<VerificationSet>, SourceError>
where
    S: SurveySource + ?Sized,
{
    match fetch_project_data(source, project_uid)? {
        None => Ok(Extraction::NoData),
        Some(data) => Ok(assemble_verification_tables(&data, rules)),
    }
}

/// Fetches a project and builds its single-record table.
pub fn generate_single_records<S>(
    source: &S,
    project_uid: &str,
    rules: &PipelineRules,
) -> Result<Extraction<Table>, SourceError>
where
    S: SurveySource + ?Sized,
{
    match fetch_project_data(source, project_uid)? {
        None => Ok(Extraction::NoData),
        Some(data) => Ok(extract_single_records(&data, rules)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serde_json::Value as JSValue;
    use std::cell::Cell as StdCell;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn q(name: &str, label: &str, list_name: Option<&str>) -> QuestionNode {
        QuestionNode::Question {
            name: name.to_string(),
            kind: if list_name.is_some() {
                "select_one".to_string()
            } else {
                "text".to_string()
            },
            label: Some(label.to_string()),
            list_name: list_name.map(|s| s.to_string()),
        }
    }

    fn group(name: &str, label: &str, children: Vec<QuestionNode>) -> QuestionNode {
        QuestionNode::Group {
            name: name.to_string(),
            label: Some(label.to_string()),
            repeat: false,
            children,
        }
    }

    fn form() -> Form {
        let mut choices = ChoiceLists::new();
        choices.insert("yesno", "1", "Yes");
        choices.insert("yesno", "3", "Maybe");
        choices.insert("verification_no", "v1", "Visit 1");
        Form {
            questions: QuestionTree::new(vec![group(
                "consented_grp",
                "Consented",
                vec![
                    group(
                        "section_b",
                        "Section B",
                        vec![
                            q("verification_no", "Verification number", Some("verification_no")),
                            q("precise_location", "Location", None),
                        ],
                    ),
                    QuestionNode::Group {
                        name: "participants".to_string(),
                        label: Some("Participants".to_string()),
                        repeat: true,
                        children: vec![
                            q("attends", "Does ${name} attend?\nHint", Some("yesno")),
                            q("section_c_note", "Section C", None),
                        ],
                    },
                ],
            )]),
            choices,
        }
    }

    fn submission(verification: Option<&str>, answers: &[&str]) -> Submission {
        let entries: Vec<JSValue> = answers
            .iter()
            .map(|a| json!({"consented_grp/participants/attends": a}))
            .collect();
        let mut js = json!({
            "start": "2024-03-01T09:00:00",
            "end": "2024-03-01T10:00:00",
            "consented_grp/section_b/precise_location": "-1.28 36.82 0 0",
            "consented_grp/participants": entries,
        });
        if let Some(v) = verification {
            js["consented_grp/section_b/verification_no"] = json!(v);
        }
        js.as_object().unwrap().clone()
    }

    fn data(submissions: Vec<Submission>) -> ProjectData {
        ProjectData {
            form: form(),
            submissions,
        }
    }

    fn s(x: &str) -> Cell {
        Some(x.to_string())
    }

    #[test]
    fn no_submissions_is_no_data() {
        init();
        assert_eq!(
            assemble_verification_tables(&data(vec![]), &PipelineRules::default()),
            Extraction::NoData
        );
    }

    #[test]
    fn builds_named_tables() {
        init();
        let d = data(vec![
            submission(Some("v1"), &["1", "3"]),
            submission(Some("v1"), &["9"]),
        ]);
        let set = assemble_verification_tables(&d, &PipelineRules::default())
            .data()
            .unwrap();
        assert_eq!(set.names(), vec!["Visit 1", "Visit 1_1"]);
        assert!(set.skipped.is_empty());

        let t = set.get("Visit 1").unwrap();
        assert_eq!(t.columns, vec!["Question", "Respondent 1", "Respondent 2"]);
        let labels: Vec<Cell> = t.column(0).cloned().collect();
        assert_eq!(
            labels,
            vec![s("Start"), s("End"), s("Latitude"), s("Longitude"), s("Does")]
        );
        assert_eq!(t.rows[2], vec![s("Latitude"), s("-1.28"), s("-1.28")]);
        assert_eq!(t.rows[4], vec![s("Does"), s("Yes"), s("Maybe")]);

        let t2 = set.get("Visit 1_1").unwrap();
        assert_eq!(t2.rows[4], vec![s("Does"), s("9")]);
    }

    #[test]
    fn fallback_names_and_collisions() {
        init();
        let mut d = data(vec![
            submission(None, &["1"]),
            submission(Some("v2"), &["1"]),
            submission(Some("unknown"), &["1"]),
            submission(Some("v2"), &["1"]),
        ]);
        d.form.choices.insert("verification_no", "v2", "df_1");
        let set = assemble_verification_tables(&d, &PipelineRules::default())
            .data()
            .unwrap();
        assert_eq!(set.names(), vec!["df_1", "df_1_1", "df_3", "df_1_2"]);
        let distinct: HashSet<String> = set.names().into_iter().collect();
        assert_eq!(distinct.len(), set.tables.len());
    }

    #[test]
    fn unresolved_codes_fall_back_to_position() {
        init();
        let d = data(vec![submission(Some("v9"), &["1"])]);
        let set = assemble_verification_tables(&d, &PipelineRules::default())
            .data()
            .unwrap();
        assert_eq!(set.names(), vec!["df_1"]);

        let rules = PipelineRules {
            verification_list: "missing_list".to_string(),
            ..PipelineRules::default()
        };
        let d = data(vec![
            submission(Some("v1"), &["1"]),
            submission(Some("v1"), &["1"]),
        ]);
        let set = assemble_verification_tables(&d, &rules).data().unwrap();
        assert_eq!(set.names(), vec!["df_1", "df_2"]);
    }

    #[test]
    fn skips_malformed_submissions() {
        init();
        let mut bad = submission(Some("v1"), &["1"]);
        bad.remove("consented_grp/section_b/precise_location");
        bad.insert("_id".to_string(), json!(42));
        let d = data(vec![bad, submission(Some("v1"), &["1"])]);
        let set = assemble_verification_tables(&d, &PipelineRules::default())
            .data()
            .unwrap();
        assert_eq!(set.names(), vec!["Visit 1"]);
        assert_eq!(set.skipped.len(), 1);
        assert_eq!(set.skipped[0].position, 1);
        assert_eq!(set.skipped[0].id, Some("42".to_string()));
        assert!(matches!(
            set.skipped[0].reason,
            ShapeError::MissingLocation { .. }
        ));
    }

    #[test]
    fn all_skipped_is_not_no_data() {
        init();
        let mut bad = submission(Some("v1"), &["1"]);
        bad.remove("consented_grp/participants");
        let res = assemble_verification_tables(&data(vec![bad]), &PipelineRules::default());
        let set = res.data().unwrap();
        assert!(set.tables.is_empty());
        assert_eq!(set.skipped.len(), 1);
    }

    #[test]
    fn unknown_keys_label_themselves() {
        init();
        let mut sub = submission(Some("v1"), &["1"]);
        sub.insert(
            "consented_grp/extra".to_string(),
            json!([{"consented_grp/extra/section_d_code": "x"}]),
        );
        let set = assemble_verification_tables(&data(vec![sub]), &PipelineRules::default())
            .data()
            .unwrap();
        let labels: Vec<Cell> = set.tables[0].table.column(0).cloned().collect();
        assert_eq!(labels[5], s("section_d_code"));
    }

    struct MemorySource {
        data: ProjectData,
        form_calls: StdCell<usize>,
    }

    impl SurveySource for MemorySource {
        fn list_projects(&self) -> Result<Vec<Project>, SourceError> {
            Ok(vec![Project {
                uid: "a1".to_string(),
                name: "FGD verification".to_string(),
            }])
        }

        fn question_tree(&self, _project_uid: &str) -> Result<QuestionTree, SourceError> {
            self.form_calls.set(self.form_calls.get() + 1);
            Ok(self.data.form.questions.clone())
        }

        fn choice_lists(&self, _project_uid: &str) -> Result<ChoiceLists, SourceError> {
            Ok(self.data.form.choices.clone())
        }

        fn submissions(&self, _project_uid: &str) -> Result<Vec<Submission>, SourceError> {
            Ok(self.data.submissions.clone())
        }
    }

    #[test]
    fn generate_from_source() {
        init();
        let source = MemorySource {
            data: data(vec![submission(Some("v1"), &["1"])]),
            form_calls: StdCell::new(0),
        };
        let set = generate_verification_tables(&source, "a1", &PipelineRules::default())
            .unwrap()
            .data()
            .unwrap();
        assert_eq!(set.names(), vec!["Visit 1"]);
        assert_eq!(source.form_calls.get(), 1);
    }

    #[test]
    fn empty_source_skips_the_form() {
        init();
        let source = MemorySource {
            data: data(vec![]),
            form_calls: StdCell::new(0),
        };
        let res = generate_single_records(&source, "a1", &PipelineRules::default()).unwrap();
        assert_eq!(res, Extraction::NoData);
        assert_eq!(source.form_calls.get(), 0);
    }
}
