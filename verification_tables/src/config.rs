// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::Snafu;

use crate::choices::ChoiceLists;
use crate::labels::QuestionTree;
use crate::path::FieldPath;
use crate::table::Table;

/// One respondent's raw answer record, keyed by fully-qualified field path.
///
/// The order of the fields is the order in which the platform sent them.
pub type Submission = JSMap<String, JSValue>;

/// A survey instrument on the remote platform (an "asset" in KoboToolbox terms).
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub uid: String,
    pub name: String,
}

/// The two families of instruments handled by the application.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DataType {
    /// Key informant interviews and surveys: flat, one record per respondent.
    KiiSurvey,
    /// Focus group discussions: one record per verification, with repeating
    /// groups holding one entry per participant.
    Fgd,
}

impl Project {
    /// Projects are classified by name, the platform has no notion of a data type.
    /// A name may match both families.
    pub fn is_data_type(&self, data_type: DataType) -> bool {
        let name = self.name.to_lowercase();
        match data_type {
            DataType::KiiSurvey => name.contains("kii") || name.contains("survey"),
            DataType::Fgd => name.contains("fgd"),
        }
    }
}

/// The form of a project: its question definitions and the choice lists they refer to.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Form {
    pub questions: QuestionTree,
    pub choices: ChoiceLists,
}

/// Everything fetched for one project, in the order the source provided it.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ProjectData {
    pub form: Form,
    pub submissions: Vec<Submission>,
}

// ******** Output data structures *********

/// Header of the first column of a verification table.
pub const QUESTION_HEADER: &str = "Question";

/// Prefix of the respondent columns of a verification table.
pub const RESPONDENT_PREFIX: &str = "Respondent";

/// The metadata columns, always first and in this order.
pub const META_COLUMNS: [&str; 4] = ["Start", "End", "Latitude", "Longitude"];

/// The outcome of a table-building operation.
///
/// `NoData` means the project has no submission at all. It is not an error,
/// and it is distinct from a result where every submission had to be skipped.
#[derive(PartialEq, Debug, Clone)]
pub enum Extraction<T> {
    NoData,
    Data(T),
}

impl<T> Extraction<T> {
    pub fn data(self) -> Option<T> {
        match self {
            Extraction::NoData => None,
            Extraction::Data(x) => Some(x),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: Table,
}

/// A submission that did not produce a table.
#[derive(PartialEq, Debug, Clone)]
pub struct SkippedSubmission {
    /// 1-based position of the submission in the source order.
    pub position: usize,
    /// The platform identifier (`_id`), when present.
    pub id: Option<String>,
    pub reason: ShapeError,
}

/// The verification tables of one project, in submission order.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct VerificationSet {
    pub tables: Vec<NamedTable>,
    pub skipped: Vec<SkippedSubmission>,
}

impl VerificationSet {
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|nt| nt.name == name)
            .map(|nt| &nt.table)
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|nt| nt.name.clone()).collect()
    }
}

// ******** Errors *********

/// Problems with the shape of a single submission. These never abort a batch.
#[derive(Debug, Snafu, Eq, PartialEq, Clone)]
#[snafu(visibility(pub(crate)))]
pub enum ShapeError {
    #[snafu(display("missing location field {field}"))]
    MissingLocation { field: String },
    #[snafu(display("location {value:?} has fewer than two coordinates"))]
    IncompleteLocation { value: String },
    #[snafu(display("repeating group {field} has {found} rows, expected {expected}"))]
    RowCountMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    #[snafu(display("no repeating group found in the submission"))]
    NoRepeatingGroup {},
    #[snafu(display("a submission must be a JSON object, got {content}"))]
    NotARecord { content: String },
}

/// Problems while reading the form definition of an asset.
#[derive(Debug, Snafu, Eq, PartialEq, Clone)]
#[snafu(visibility(pub(crate)))]
pub enum AssetError {
    #[snafu(display("survey row {row}: {kind} without a matching begin"))]
    UnbalancedGroup { row: usize, kind: String },
    #[snafu(display("survey row {row}: {kind} closes a group opened as {opened}"))]
    MismatchedGroupEnd {
        row: usize,
        kind: String,
        opened: String,
    },
}

/// Failures of the remote source. They are propagated, never retried.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    #[snafu(display("failed to fetch {what} from the remote source"))]
    Fetch {
        what: String,
        source: Box<dyn std::error::Error>,
    },
    #[snafu(display("malformed form definition for project {uid}"))]
    MalformedAsset { uid: String, source: AssetError },
}

// ********* Configuration **********

/// The field names and markers that tie the pipeline to a particular form design.
///
/// The defaults match the FGD verification forms: the location and the
/// verification number live in `section_b` of the consent group.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PipelineRules {
    /// Space-separated coordinates applied to every row of a submission.
    pub location_field: FieldPath,
    /// The coded verification number used to name the tables.
    pub verification_field: FieldPath,
    /// The choice list decoding `verification_field`.
    pub verification_list: String,
    /// The group whose sub-tree defines the questions of the verification tables.
    /// When unset, the whole form is used.
    pub question_root: Option<FieldPath>,
    /// Keys containing this marker are section headers, not questions.
    pub section_marker: String,
    /// Columns ending with this suffix are repeat-index bookkeeping.
    pub index_suffix: String,
    /// Headers starting with this prefix are computed durations.
    pub time_difference_prefix: String,
}

impl Default for PipelineRules {
    fn default() -> Self {
        PipelineRules {
            location_field: FieldPath::parse("consented_grp/section_b/precise_location"),
            verification_field: FieldPath::parse("consented_grp/section_b/verification_no"),
            verification_list: "verification_no".to_string(),
            question_root: Some(FieldPath::parse("consented_grp")),
            section_marker: "section_".to_string(),
            index_suffix: "_index".to_string(),
            time_difference_prefix: "Time difference in".to_string(),
        }
    }
}

/// Renders a scalar JSON answer the way it should appear in a cell.
///
/// `null` is the empty marker, strings are taken verbatim and everything else
/// keeps its compact JSON notation.
pub(crate) fn json_cell(value: &JSValue) -> Option<String> {
    match value {
        JSValue::Null => None,
        JSValue::String(s) => Some(s.clone()),
        x => Some(x.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(name: &str) -> Project {
        Project {
            uid: "a1".to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn classify_projects() {
        assert!(project("ELMI KII round 2").is_data_type(DataType::KiiSurvey));
        assert!(project("Household Survey").is_data_type(DataType::KiiSurvey));
        assert!(!project("Household Survey").is_data_type(DataType::Fgd));
        assert!(project("FGD verification").is_data_type(DataType::Fgd));
        assert!(!project("Training form").is_data_type(DataType::Fgd));
        assert!(!project("Training form").is_data_type(DataType::KiiSurvey));
    }

    #[test]
    fn json_cells() {
        assert_eq!(json_cell(&json!(null)), None);
        assert_eq!(json_cell(&json!("x y")), Some("x y".to_string()));
        assert_eq!(json_cell(&json!(1.5)), Some("1.5".to_string()));
        assert_eq!(json_cell(&json!(true)), Some("true".to_string()));
        assert_eq!(json_cell(&json!(["a", 1])), Some("[\"a\",1]".to_string()));
    }
}
