use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::ports::ModelSettings;
use crate::domain::types::Project;
use crate::infrastructure::model::{DEFAULT_API_URL, DEFAULT_TIMEOUT};

pub const CONFIG_PATH_ENV: &str = "SMART_TASK_CONFIG";
const DEFAULT_CONFIG_FILE_NAME: &str = "config.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub api_url: String,
    pub groq_api_key: Option<String>,
    pub model: ModelSettings,
    pub request_timeout: Duration,
    pub config_path: PathBuf,
    pub log_level: String,
    pub log_retention_days: u16,
    pub log_dir: PathBuf,
    pub projects: Vec<Project>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_url: DEFAULT_API_URL.to_string(),
            groq_api_key: None,
            model: ModelSettings::default(),
            request_timeout: DEFAULT_TIMEOUT,
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE_NAME),
            log_level: "info".to_string(),
            log_retention_days: 7,
            log_dir: PathBuf::from("logs"),
            projects: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Defaults < config file < environment. `.env` is loaded first when present.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_NAME));
        Self::from_config_file_path(&path, EnvSecrets::from_env())
    }

    pub fn from_config_file_path(path: &Path, env_secrets: EnvSecrets) -> Result<Self> {
        let file_config = if path.exists() {
            read_config_file(path)?
        } else {
            FileConfig::default()
        };
        let mut config = Self::from_inputs(file_config, env_secrets)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    pub fn from_inputs(file_config: FileConfig, env_secrets: EnvSecrets) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = file_config.server.host {
            config.host = host;
        }
        if let Some(port) = file_config.server.port {
            config.port = port;
        }

        let llm = file_config.llm;
        if let Some(api_url) = llm.api_url {
            config.api_url = api_url;
        }
        if let Some(model) = llm.model {
            config.model.model = model;
        }
        if let Some(temperature) = llm.temperature {
            config.model.temperature = temperature;
        }
        if let Some(max_completion_tokens) = llm.max_completion_tokens {
            config.model.max_completion_tokens = max_completion_tokens;
        }
        if let Some(top_p) = llm.top_p {
            config.model.top_p = top_p;
        }
        if let Some(reasoning_effort) = llm.reasoning_effort {
            config.model.reasoning_effort = reasoning_effort;
        }
        if let Some(timeout_secs) = llm.timeout_secs {
            config.request_timeout = Duration::from_secs(timeout_secs.max(1));
        }

        if let Some(level) = file_config.logging.level {
            config.log_level = normalize_log_level(level);
        }
        if let Some(retention_days) = file_config.logging.retention_days {
            config.log_retention_days = retention_days.max(1);
        }
        if let Some(directory) = file_config.logging.dir {
            config.log_dir = directory;
        }

        config.groq_api_key = file_config.secrets.groq_api_key;

        // Priority: config file < environment
        if let Some(api_key) = env_secrets.groq_api_key {
            config.groq_api_key = Some(api_key);
        }
        if let Some(api_url) = env_secrets.groq_api_url {
            config.api_url = api_url;
        }

        config.projects = file_config
            .projects
            .into_iter()
            .map(ProjectSeed::into_project)
            .collect::<Result<Vec<_>>>()?;

        Ok(config)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSecrets {
    pub groq_api_key: Option<String>,
    pub groq_api_url: Option<String>,
}

impl EnvSecrets {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| env::var(name).ok().filter(|value| !value.trim().is_empty());
        Self {
            groq_api_key: non_empty("GROQ_API_KEY"),
            groq_api_url: non_empty("GROQ_API_URL"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerFileConfig,
    pub llm: LlmFileConfig,
    pub logging: LoggingFileConfig,
    pub secrets: SecretsFileConfig,
    pub projects: Vec<ProjectSeed>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LlmFileConfig {
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_completion_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub reasoning_effort: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoggingFileConfig {
    pub level: Option<String>,
    pub retention_days: Option<u16>,
    pub dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SecretsFileConfig {
    pub groq_api_key: Option<String>,
}

/// A project to create at startup. Ids accept the `proj_` short form or a UUID.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProjectSeed {
    pub id: String,
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub config: Option<Value>,
}

impl ProjectSeed {
    fn into_project(self) -> Result<Project> {
        let id = crate::domain::ids::parse_id(&self.id, crate::domain::ids::PROJECT_ID_PREFIX)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid project id in config: {}", self.id))?;
        let account_id = Uuid::parse_str(self.account_id.trim())
            .with_context(|| format!("invalid account id for project {}", self.name))?;
        Ok(Project {
            id,
            account_id,
            name: self.name,
            config: self.config,
        })
    }
}

pub fn read_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_json::from_str::<FileConfig>(&raw)
        .with_context(|| format!("invalid config json: {}", path.display()))
}

fn normalize_log_level(level: String) -> String {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace".to_string(),
        "debug" => "debug".to_string(),
        "info" => "info".to_string(),
        "warning" | "warn" => "warn".to_string(),
        "error" => "error".to_string(),
        _ => "info".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_aliases_normalize() {
        assert_eq!(normalize_log_level("WARNING".into()), "warn");
        assert_eq!(normalize_log_level("verbose".into()), "info");
    }
}
