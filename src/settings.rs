use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Extra header sent with admin directory requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiAuth {
    pub header: String,
    pub key: String,
}

impl ApiAuth {
    /// Header name and value; `Authorization` gets a bearer prefix.
    pub fn header_pair(&self) -> (String, String) {
        let value = if self.header.eq_ignore_ascii_case("authorization") {
            format!("Bearer {}", self.key)
        } else {
            self.key.clone()
        };
        (self.header.clone(), value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub camera_timeout_secs: u64,
    pub proceed_delay_ms: u64,
    pub lock_duration_secs: u32,
    pub request_timeout_secs: u64,
    pub admin: AdminCredentials,
    pub api_auth: Option<ApiAuth>,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".into(),
            data_dir: default_data_dir(),
            camera_timeout_secs: 10,
            proceed_delay_ms: 1200,
            lock_duration_secs: 30,
            request_timeout_secs: 15,
            admin: AdminCredentials::default(),
            api_auth: None,
            debug: false,
        }
    }
}

/// `"1"` or `"true"` (any case) turns a `FACEGATE_*` switch on.
pub(crate) fn flag_enabled(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("facegate")
}

impl Settings {
    /// Reads `settings.json` from `data_dir` (or the default data dir), then
    /// applies `FACEGATE_*` environment overrides. A missing or unreadable
    /// file yields defaults.
    pub fn load(data_dir: Option<&Path>) -> Result<Self> {
        let data_dir = data_dir
            .map(Path::to_path_buf)
            .or_else(|| env::var_os("FACEGATE_DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(default_data_dir);
        let path = data_dir.join(SETTINGS_FILE);

        let mut settings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<Settings>(&contents) {
                Ok(parsed) => parsed,
                Err(err) => {
                    log::warn!("Ignoring malformed settings at {}: {err}", path.display());
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        settings.data_dir = data_dir;
        settings.apply_env(|key| env::var(key).ok());
        Ok(settings)
    }

    pub(crate) fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FACEGATE_API_URL") {
            self.api_base_url = url;
        }
        if let Some(debug) = lookup("FACEGATE_DEBUG") {
            self.debug = flag_enabled(&debug);
        }
        if let Some(user) = lookup("FACEGATE_ADMIN_USER") {
            self.admin.username = user;
        }
        if let Some(password) = lookup("FACEGATE_ADMIN_PASSWORD") {
            self.admin.password = password;
        }
        if let Some(key) = lookup("FACEGATE_API_AUTH_KEY") {
            let header = lookup("FACEGATE_API_AUTH_HEADER").unwrap_or_else(|| "Authorization".into());
            self.api_auth = Some(ApiAuth { header, key });
        }
    }

    pub fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        let path = self.data_dir.join(SETTINGS_FILE);
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(&path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("facegate.sqlite3")
    }

    pub fn camera_timeout(&self) -> Duration {
        Duration::from_secs(self.camera_timeout_secs)
    }

    pub fn proceed_delay(&self) -> Duration {
        Duration::from_millis(self.proceed_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
