// Blocking client for the KoboToolbox API (v2).

use crate::kobo::*;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use verification_tables::asset::AssetContent;

/// One page of a listing. `next` is the URL of the following page.
#[derive(Debug, Clone, Deserialize)]
struct Page<T> {
    next: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct AssetSummary {
    uid: String,
    #[serde(default)]
    name: String,
    asset_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AssetDetail {
    #[serde(default)]
    content: AssetContent,
}

fn fetch_error<E>(e: E) -> Box<dyn std::error::Error>
where
    E: std::error::Error + 'static,
{
    Box::new(e)
}

/// The deployed forms are the assets of type `survey`. Assets without a type are kept.
fn survey_projects(assets: Vec<AssetSummary>) -> Vec<Project> {
    assets
        .into_iter()
        .filter(|a| a.asset_type.as_deref().map_or(true, |t| t == "survey"))
        .map(|a| Project {
            uid: a.uid,
            name: a.name,
        })
        .collect()
}

pub struct KoboClient {
    client: Client,
    base_url: String,
    token: String,
}

impl KoboClient {
    pub fn new(url: &str, token: &str, timeout: Option<Duration>) -> KoboResult<KoboClient> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context(HttpClientSnafu {})?;
        Ok(KoboClient {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn assets_url(&self) -> String {
        format!("{}/assets/?format=json", self.base_url)
    }

    fn asset_url(&self, uid: &str) -> String {
        format!("{}/assets/{}/?format=json", self.base_url, uid)
    }

    fn data_url(&self, uid: &str) -> String {
        format!("{}/assets/{}/data/?format=json", self.base_url, uid)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, SourceError> {
        debug!("get_json: {}", url);
        self.client
            .get(url)
            .header("Authorization", format!("Token {}", self.token))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<T>())
            .map_err(fetch_error)
            .context(FetchSnafu { what })
    }

    /// Follows the `next` links until the last page.
    fn get_all<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<Vec<T>, SourceError> {
        let mut res: Vec<T> = Vec::new();
        let mut next: Option<String> = Some(url.to_string());
        while let Some(page_url) = next {
            let page: Page<T> = self.get_json(&page_url, what)?;
            debug!("get_all: {}: {} results", what, page.results.len());
            res.extend(page.results);
            next = page.next;
        }
        Ok(res)
    }

    fn asset_content(&self, uid: &str) -> Result<AssetContent, SourceError> {
        let detail: AssetDetail = self.get_json(&self.asset_url(uid), "form definition")?;
        info!(
            "asset_content: project {}: {} survey rows, {} choices",
            uid,
            detail.content.survey.len(),
            detail.content.choices.len()
        );
        Ok(detail.content)
    }
}

impl SurveySource for KoboClient {
    fn list_projects(&self) -> Result<Vec<Project>, SourceError> {
        let assets: Vec<AssetSummary> = self.get_all(&self.assets_url(), "project list")?;
        Ok(survey_projects(assets))
    }

    fn question_tree(&self, project_uid: &str) -> Result<QuestionTree, SourceError> {
        self.asset_content(project_uid)?
            .question_tree()
            .context(MalformedAssetSnafu { uid: project_uid })
    }

    fn choice_lists(&self, project_uid: &str) -> Result<ChoiceLists, SourceError> {
        Ok(self.asset_content(project_uid)?.choice_lists())
    }

    fn submissions(&self, project_uid: &str) -> Result<Vec<Submission>, SourceError> {
        self.get_all(&self.data_url(project_uid), "submissions")
    }

    fn form(&self, project_uid: &str) -> Result<Form, SourceError> {
        let content = self.asset_content(project_uid)?;
        Ok(Form {
            questions: content
                .question_tree()
                .context(MalformedAssetSnafu { uid: project_uid })?,
            choices: content.choice_lists(),
        })
    }
}
