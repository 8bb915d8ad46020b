use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use client_core::DEFAULT_REQUEST_TIMEOUT;
use serde::Deserialize;
use shared::domain::{Role, UserId, Viewer};

const LOCAL_CONFIG_FILE: &str = "mentorship.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub token: Option<String>,
    pub role: Option<Role>,
    pub user_id: Option<i64>,
    pub request_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080/api".into(),
            token: None,
            role: None,
            user_id: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn viewer(&self) -> anyhow::Result<Viewer> {
        let role = self
            .role
            .ok_or_else(|| anyhow!("missing role: set `role` in config, MENTORSHIP_ROLE, or --role"))?;
        let user_id = self.user_id.ok_or_else(|| {
            anyhow!("missing user id: set `user_id` in config, MENTORSHIP_USER_ID, or --user-id")
        })?;
        Ok(Viewer {
            user_id: UserId(user_id),
            role,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

/// Defaults, then the first config file found, then environment overrides.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match resolve_config_path(explicit_path)? {
        Some(path) => read_settings_file(&path)?,
        None => Settings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(anyhow!("config file '{}' does not exist", path.display()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    Ok(dirs::config_dir()
        .map(|dir| dir.join("mentorship").join("config.toml"))
        .filter(|path| path.exists()))
}

fn read_settings_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

pub fn apply_env_overrides(settings: &mut Settings, env: impl Fn(&str) -> Option<String>) {
    for key in ["MENTORSHIP_SERVER_URL", "APP__SERVER_URL"] {
        if let Some(v) = env(key) {
            settings.server_url = v;
        }
    }

    for key in ["MENTORSHIP_TOKEN", "APP__TOKEN"] {
        if let Some(v) = env(key) {
            settings.token = Some(v);
        }
    }

    for key in ["MENTORSHIP_ROLE", "APP__ROLE"] {
        if let Some(v) = env(key) {
            match v.parse::<Role>() {
                Ok(role) => settings.role = Some(role),
                Err(err) => tracing::warn!("ignoring {key}: {err}"),
            }
        }
    }

    for key in ["MENTORSHIP_USER_ID", "APP__USER_ID"] {
        if let Some(v) = env(key) {
            match v.trim().parse::<i64>() {
                Ok(id) => settings.user_id = Some(id),
                Err(err) => tracing::warn!("ignoring {key}: {err}"),
            }
        }
    }

    for key in ["MENTORSHIP_TIMEOUT_MS", "APP__REQUEST_TIMEOUT_MS"] {
        if let Some(v) = env(key) {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                settings.request_timeout_ms = parsed;
            }
        }
    }
}
