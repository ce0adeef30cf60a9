use crate::kobo::*;

use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

pub const DEFAULT_URL: &str = "https://kf.kobotoolbox.org/api/v2";
pub const DEFAULT_TOKEN_ENV: &str = "KOBO_TOKEN";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    #[serde(rename = "tokenEnv")]
    pub token_env: Option<String>,
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(rename = "locationField")]
    pub location_field: Option<String>,
    #[serde(rename = "verificationField")]
    pub verification_field: Option<String>,
    #[serde(rename = "verificationList")]
    pub verification_list: Option<String>,
    /// An empty string means the whole form.
    #[serde(rename = "questionRoot")]
    pub question_root: Option<String>,
    #[serde(rename = "sectionMarker")]
    pub section_marker: Option<String>,
    #[serde(rename = "indexSuffix")]
    pub index_suffix: Option<String>,
    #[serde(rename = "timeDifferencePrefix")]
    pub time_difference_prefix: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct KoboConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub output: OutputSettings,
}

impl PipelineSettings {
    /// The pipeline rules, with the defaults filling the unset fields.
    pub fn rules(&self) -> PipelineRules {
        let mut rules = PipelineRules::default();
        if let Some(x) = &self.location_field {
            rules.location_field = FieldPath::parse(x);
        }
        if let Some(x) = &self.verification_field {
            rules.verification_field = FieldPath::parse(x);
        }
        if let Some(x) = &self.verification_list {
            rules.verification_list = x.clone();
        }
        if let Some(x) = &self.question_root {
            rules.question_root = if x.is_empty() {
                None
            } else {
                Some(FieldPath::parse(x))
            };
        }
        if let Some(x) = &self.section_marker {
            rules.section_marker = x.clone();
        }
        if let Some(x) = &self.index_suffix {
            rules.index_suffix = x.clone();
        }
        if let Some(x) = &self.time_difference_prefix {
            rules.time_difference_prefix = x.clone();
        }
        rules
    }
}

/// The settings of one run, once the configuration file, the command line
/// and the environment have been merged.
#[derive(PartialEq, Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub token: String,
    pub timeout: Option<Duration>,
    pub rules: PipelineRules,
    pub output_directory: Option<String>,
}

pub fn read_config(path: &str) -> KoboResult<KoboConfig> {
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    let config: KoboConfig =
        serde_json::from_str(contents.as_str()).context(ParsingConfigSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Command-line values win over the configuration file. The token is looked
/// up last in the environment.
pub fn resolve_settings<F>(config: &KoboConfig, args: &Args, env: F) -> KoboResult<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let url = args
        .url
        .clone()
        .or_else(|| config.server.url.clone())
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    let token_env = config
        .server
        .token_env
        .clone()
        .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string());
    let token = args
        .token
        .clone()
        .or_else(|| config.server.token.clone())
        .or_else(|| env(&token_env))
        .filter(|t| !t.trim().is_empty())
        .context(MissingTokenSnafu {
            variable: token_env.clone(),
        })?;
    Ok(Settings {
        url,
        token,
        timeout: config.server.timeout_secs.map(Duration::from_secs),
        rules: config.pipeline.rules(),
        output_directory: config.output.output_directory.clone(),
    })
}
