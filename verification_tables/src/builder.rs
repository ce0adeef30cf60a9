use serde_json::Value as JSValue;

pub use crate::config::*;
use crate::labels::QuestionTree;
use crate::table::Table;
use crate::ChoiceLists;

/// A builder for assembling tables from data that is already at hand.
///
/// Use it when the form and the submissions do not come from a
/// [`crate::SurveySource`], for instance when they were exported to files.
///
/// ```
/// use verification_tables::builder::Builder;
/// use verification_tables::{PipelineRules, QuestionTree, ShapeError};
/// use serde_json::json;
///
/// let mut builder = Builder::new(&PipelineRules::default())
///     .questions(QuestionTree::default());
///
/// builder.add_submission(json!({
///     "consented_grp/section_b/precise_location": "0.5 32.1 0 0",
///     "consented_grp/members": [{"consented_grp/members/name": "Ann"}]
/// }))?;
///
/// let set = builder.verification_tables().data().unwrap();
/// assert_eq!(set.names(), vec!["df_1"]);
///
/// # Ok::<(), ShapeError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: PipelineRules,
    pub(crate) _data: ProjectData,
}

impl Builder {
    pub fn new(rules: &PipelineRules) -> Builder {
        Builder {
            _rules: rules.clone(),
            _data: ProjectData::default(),
        }
    }

    pub fn questions(self, tree: QuestionTree) -> Builder {
        let mut data = self._data;
        data.form.questions = tree;
        Builder {
            _rules: self._rules,
            _data: data,
        }
    }

    pub fn choices(self, lists: ChoiceLists) -> Builder {
        let mut data = self._data;
        data.form.choices = lists;
        Builder {
            _rules: self._rules,
            _data: data,
        }
    }

    /// Adds a submission, as returned by the platform.
    ///
    /// Only JSON objects are accepted. The shape of the submission is checked
    /// later, when the tables are built.
    pub fn add_submission(&mut self, submission: JSValue) -> Result<(), ShapeError> {
        match submission {
            JSValue::Object(obj) => {
                self._data.submissions.push(obj);
                Ok(())
            }
            x => NotARecordSnafu {
                content: x.to_string(),
            }
            .fail(),
        }
    }

    pub fn verification_tables(&self) -> Extraction<VerificationSet> {
        crate::assemble_verification_tables(&self._data, &self._rules)
    }

    pub fn single_records(&self) -> Extraction<Table> {
        crate::extract_single_records(&self._data, &self._rules)
    }
}
