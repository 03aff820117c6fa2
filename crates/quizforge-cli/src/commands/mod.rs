pub mod admin;
pub mod dashboard;
pub mod export;
pub mod groups;
pub mod import;
pub mod init;
pub mod stats;
pub mod take;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;

use quizforge_core::auth::AuthHub;
use quizforge_core::engine::QuizEngine;
use quizforge_core::model::User;
use quizforge_store::{create_backend, load_config_from, QuizforgeConfig};

/// Loaded configuration plus an engine signed in as the configured user.
pub struct AppContext {
    pub config: QuizforgeConfig,
    pub engine: QuizEngine,
}

/// Load config, open the backend and sign in.
pub fn connect(config_path: Option<PathBuf>, user: Option<String>) -> Result<AppContext> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(user) = user {
        config.user = Some(user);
    }

    let backend = create_backend(&config.backend)?;
    let auth = AuthHub::new();
    if let Some(id) = &config.user {
        auth.sign_in(User {
            id: id.clone(),
            email: config.email.clone(),
        });
    }
    tracing::debug!(backend = backend.name(), user = ?config.user, "connected");

    Ok(AppContext {
        engine: QuizEngine::new(backend, auth),
        config,
    })
}

/// Write `content` to `path`, creating parent directories.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Shorten `s` to at most `max` characters for table cells.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
