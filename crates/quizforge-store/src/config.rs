//! Configuration loading and backend factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizforge_core::traits::Backend;

use crate::error::ConfigError;
use crate::file::JsonFileBackend;
use crate::memory::InMemoryBackend;
use crate::rest::RestBackend;

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "quizforge.toml";

/// Which backend to talk to.
///
/// Note: Custom Debug impl masks keys and tokens to prevent accidental
/// exposure in logs.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Process-local, nothing persisted.
    Memory,
    /// A local JSON data file.
    File {
        #[serde(default = "default_data_path")]
        path: PathBuf,
    },
    /// A PostgREST-style HTTP API.
    Rest {
        base_url: String,
        api_key: String,
        #[serde(default)]
        access_token: Option<String>,
    },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Memory => f.write_str("Memory"),
            BackendConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            BackendConfig::Rest {
                base_url,
                api_key: _,
                access_token,
            } => f
                .debug_struct("Rest")
                .field("base_url", base_url)
                .field("api_key", &"***")
                .field("access_token", &access_token.as_ref().map(|_| "***"))
                .finish(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::File {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("quizforge-data.json")
}

/// Top-level quizforge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    /// User id the CLI signs in as.
    #[serde(default)]
    pub user: Option<String>,
    /// Optional email of that user.
    #[serde(default)]
    pub email: Option<String>,
    /// Directory for exports and reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizforge-output")
}

impl Default for QuizforgeConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            user: None,
            email: None,
            output_dir: default_output_dir(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

fn resolve_backend_config(config: &BackendConfig) -> BackendConfig {
    match config {
        BackendConfig::Memory => BackendConfig::Memory,
        BackendConfig::File { path } => BackendConfig::File {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
        BackendConfig::Rest {
            base_url,
            api_key,
            access_token,
        } => BackendConfig::Rest {
            base_url: resolve_env_vars(base_url),
            api_key: resolve_env_vars(api_key),
            access_token: access_token.as_ref().map(|t| resolve_env_vars(t)),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
///
/// Environment variable overrides: `QUIZFORGE_API_KEY`, `QUIZFORGE_USER`.
pub fn load_config() -> Result<QuizforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            return Err(ConfigError::NotFound(p.to_path_buf()).into());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "config loaded");
            config
        }
        None => QuizforgeConfig::default(),
    };

    apply_env_overrides(&mut config);
    config.backend = resolve_backend_config(&config.backend);
    Ok(config)
}

/// Parse a TOML config document.
pub fn parse_config(content: &str) -> Result<QuizforgeConfig> {
    Ok(toml::from_str::<QuizforgeConfig>(content)?)
}

fn apply_env_overrides(config: &mut QuizforgeConfig) {
    if let Ok(key) = std::env::var("QUIZFORGE_API_KEY") {
        if let BackendConfig::Rest { api_key, .. } = &mut config.backend {
            *api_key = key;
        }
    }
    if let Ok(user) = std::env::var("QUIZFORGE_USER") {
        if !user.trim().is_empty() {
            config.user = Some(user);
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}

/// Create a backend instance from its configuration.
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>> {
    match config {
        BackendConfig::Memory => Ok(Arc::new(InMemoryBackend::new())),
        BackendConfig::File { path } => {
            let backend = JsonFileBackend::open(path)
                .with_context(|| format!("failed to open data file {}", path.display()))?;
            Ok(Arc::new(backend))
        }
        BackendConfig::Rest {
            base_url,
            api_key,
            access_token,
        } => {
            if base_url.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    backend: "rest",
                    field: "base_url",
                }
                .into());
            }
            Ok(Arc::new(RestBackend::new(
                base_url,
                api_key,
                access_token.clone(),
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZFORGE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZFORGE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZFORGE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_QUIZFORGE_UNSET_VAR}x"), "x");
        assert_eq!(resolve_env_vars("no ${closing"), "no ${closing");
        std::env::remove_var("_QUIZFORGE_TEST_VAR");
    }

    #[test]
    fn resolved_value_is_not_expanded_again() {
        std::env::set_var("_QUIZFORGE_NESTED_VAR", "${HOME}");
        assert_eq!(resolve_env_vars("${_QUIZFORGE_NESTED_VAR}"), "${HOME}");
        std::env::remove_var("_QUIZFORGE_NESTED_VAR");
    }

    #[test]
    fn default_config() {
        let config = QuizforgeConfig::default();
        assert_eq!(
            config.backend,
            BackendConfig::File {
                path: PathBuf::from("quizforge-data.json")
            }
        );
        assert!(config.user.is_none());
    }

    #[test]
    fn parse_backend_variants() {
        let config = parse_config(
            r#"
user = "alice"

[backend]
type = "rest"
base_url = "https://example.test"
api_key = "anon"
"#,
        )
        .unwrap();
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert!(matches!(config.backend, BackendConfig::Rest { .. }));

        let config = parse_config("[backend]\ntype = \"file\"\n").unwrap();
        assert_eq!(config.backend, BackendConfig::default());

        let config = parse_config("[backend]\ntype = \"memory\"\n").unwrap();
        assert_eq!(config.backend, BackendConfig::Memory);
    }

    #[test]
    fn debug_masks_secrets() {
        let config = BackendConfig::Rest {
            base_url: "https://example.test".into(),
            api_key: "super-secret".into(),
            access_token: Some("jwt-secret".into()),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("jwt-secret"));
        assert!(debug.contains("example.test"));
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[backend]\ntype = \"memory\"\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.backend, BackendConfig::Memory);

        let missing = dir.path().join("missing.toml");
        let err = load_config_from(Some(&missing)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::NotFound(missing.clone()))
        );
    }

    #[test]
    fn create_backend_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let file = create_backend(&BackendConfig::File {
            path: dir.path().join("data.json"),
        })
        .unwrap();
        assert_eq!(file.name(), "file");
        assert_eq!(create_backend(&BackendConfig::Memory).unwrap().name(), "memory");

        let rest = BackendConfig::Rest {
            base_url: String::new(),
            api_key: "k".into(),
            access_token: None,
        };
        let err = create_backend(&rest).err().unwrap();
        assert!(err.to_string().contains("rest backend requires base_url"));
    }
}
