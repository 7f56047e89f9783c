use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub feedback_db_path: PathBuf,
    pub embedding_cache_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        let log_dir = user_data_dir.join("logs");
        let db_path = user_data_dir.join("documents.db");
        let feedback_db_path = user_data_dir.join("feedback.db");
        let embedding_cache_path = user_data_dir.join("embedding_cache.json");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            db_path,
            feedback_db_path,
            embedding_cache_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("CAMPUS_ANSWERS_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    if let Ok(dir) = env::var("CAMPUS_ANSWERS_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("campus-answers")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub retrieval: RetrievalConfig,
    pub context: ContextConfig,
    pub expansion: ExpansionConfig,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            expansion: ExpansionConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// "ollama" or "openai"
    pub kind: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub completion_model: String,
    pub embedding_model: String,
    pub completion_timeout_secs: u64,
    pub embed_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "ollama".to_string(),
            base_url: "http://127.0.0.1:11434".to_string(),
            api_key: None,
            completion_model: "llama3.1:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            completion_timeout_secs: 60,
            embed_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Candidates fetched per leg = top_k * overfetch_factor.
    pub overfetch_factor: usize,
    pub keyword_leg_enabled: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            overfetch_factor: 2,
            keyword_leg_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub max_section_chars: usize,
    pub relevance_threshold: f32,
    pub max_sections: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_section_chars: 500,
            relevance_threshold: 0.3,
            max_sections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub alternatives: usize,
    pub history_turns: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            alternatives: 3,
            history_turns: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_turns: usize,
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            idle_ttl_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Load the config file if present, falling back to defaults when the
    /// file is missing. A file that exists but fails to parse is an error;
    /// silently ignoring it would run the server with settings the operator
    /// did not choose.
    pub fn load(paths: &AppPaths) -> Result<Self, ApiError> {
        let path = config_path(paths);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(ApiError::internal)?;
        let config: AppConfig = serde_yaml::from_str(&contents).map_err(|e| {
            ApiError::BadRequest(format!("Invalid config at '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_range("retrieval.top_k", self.retrieval.top_k, 1, 100)?;
        validate_range(
            "retrieval.overfetch_factor",
            self.retrieval.overfetch_factor,
            1,
            10,
        )?;
        validate_range(
            "context.max_section_chars",
            self.context.max_section_chars,
            50,
            10_000,
        )?;
        validate_range("context.max_sections", self.context.max_sections, 1, 50)?;
        validate_range("expansion.alternatives", self.expansion.alternatives, 0, 4)?;
        validate_range("session.max_turns", self.session.max_turns, 1, 100)?;
        if !(0.0..=1.0).contains(&self.context.relevance_threshold) {
            return Err(ApiError::BadRequest(
                "Invalid config at 'context.relevance_threshold': must be between 0 and 1"
                    .to_string(),
            ));
        }
        match self.provider.kind.as_str() {
            "ollama" | "openai" => Ok(()),
            other => Err(ApiError::BadRequest(format!(
                "Invalid config at 'provider.kind': unknown provider '{}'",
                other
            ))),
        }
    }
}

fn config_path(paths: &AppPaths) -> PathBuf {
    if let Ok(path) = env::var("CAMPUS_ANSWERS_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    let user_config = paths.user_data_dir.join("config.yml");
    if user_config.exists() {
        return user_config;
    }

    paths.project_root.join("config.yml")
}

fn validate_range(path: &str, value: usize, min: usize, max: usize) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_provider_kind() {
        let mut config = AppConfig::default();
        config.provider.kind = "chatgpt".to_string();
        assert!(matches!(config.validate(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut config = AppConfig::default();
        config.context.relevance_threshold = 1.5;
        assert!(matches!(config.validate(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn parses_partial_yaml_with_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("provider:\n  kind: openai\n  api_key: sk-test\n").unwrap();
        assert_eq!(config.provider.kind, "openai");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.session.max_turns, 10);
    }
}
