use log::{debug, info};

use crate::choices::ChoiceLists;
use crate::config::*;
use crate::labels::QuestionTree;

/// The remote survey platform, as seen by the pipeline.
///
/// Implementations must give a consistent view of one project across the
/// calls made for one operation. They are called sequentially.
pub trait SurveySource {
    fn list_projects(&self) -> Result<Vec<Project>, SourceError>;

    fn question_tree(&self, project_uid: &str) -> Result<QuestionTree, SourceError>;

    fn choice_lists(&self, project_uid: &str) -> Result<ChoiceLists, SourceError>;

    fn submissions(&self, project_uid: &str) -> Result<Vec<Submission>, SourceError>;

    /// Questions and choices together. Sources that read both from the same
    /// document should override this to fetch it once.
    fn form(&self, project_uid: &str) -> Result<Form, SourceError> {
        Ok(Form {
            questions: self.question_tree(project_uid)?,
            choices: self.choice_lists(project_uid)?,
        })
    }
}

/// Fetches the submissions, then the form, of a project.
///
/// Returns `None` without fetching the form when there is no submission.
pub fn fetch_project_data<S>(
    source: &S,
    project_uid: &str,
) -> Result<Option<ProjectData>, SourceError>
where
    S: SurveySource + ?Sized,
{
    let submissions = source.submissions(project_uid)?;
    info!(
        "fetch_project_data: project {}: {} submissions",
        project_uid,
        submissions.len()
    );
    if submissions.is_empty() {
        return Ok(None);
    }
    let form = source.form(project_uid)?;
    debug!(
        "fetch_project_data: project {}: {} top-level nodes, {} choice lists",
        project_uid,
        form.questions.nodes.len(),
        form.choices.len()
    );
    Ok(Some(ProjectData { form, submissions }))
}
