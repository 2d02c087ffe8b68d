//! Settings: `costsweep.toml` for folder ids and tuning, environment (or `.env`) for secrets.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::config::{EnvKeys, RunDefaults};
use crate::engine::retry::RetryPolicy;
use crate::types::SubmissionMode;

#[derive(Clone, Debug, Default)]
pub struct DriveSettings {
    pub root_folder_id: String,
    pub procurement_folder_id: String,
    /// Cost sheet template copied during synthesis.
    pub template_id: String,
}

#[derive(Clone, Debug)]
pub struct RunSettings {
    pub workers: usize,
    pub sleep_timeout_secs: u64,
    pub staleness_days: i64,
    pub db_path: Option<PathBuf>,
    pub submission: SubmissionMode,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: RunDefaults::WORKERS,
            sleep_timeout_secs: RunDefaults::SLEEP_TIMEOUT_SECS,
            staleness_days: RunDefaults::STALENESS_DAYS,
            db_path: None,
            submission: SubmissionMode::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub rate_limit_cooldown_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            rate_limit_cooldown_secs: policy.rate_limit_cooldown.as_secs(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            rate_limit_cooldown: Duration::from_secs(self.rate_limit_cooldown_secs),
        }
    }
}

/// Where Suspended/Forgotten marks are kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBackend {
    #[default]
    Local,
    Remote,
}

#[derive(Clone, Debug, Default)]
pub struct StatusSettings {
    pub backend: StatusBackend,
}

#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub drive: DriveSettings,
    pub run: RunSettings,
    pub retry: RetrySettings,
    pub status: StatusSettings,
}

impl Settings {
    /// Fail unless every folder id a sweep needs is set.
    pub fn require_drive(&self) -> Result<()> {
        let d = &self.drive;
        for (key, value) in [
            ("drive.root_folder_id", &d.root_folder_id),
            ("drive.procurement_folder_id", &d.procurement_folder_id),
            ("drive.template_id", &d.template_id),
        ] {
            if value.trim().is_empty() {
                bail!("{key} is not set in {}", super::PackagePaths::get().config_filename());
            }
        }
        Ok(())
    }

    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_secs(self.run.sleep_timeout_secs)
    }

    /// `[run] db_path`, or the package db file in the current directory.
    pub fn db_path(&self) -> PathBuf {
        self.run
            .db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(super::PackagePaths::get().db_filename()))
    }
}

// ---- File representation: every field optional, applied over defaults ----

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    #[serde(default)]
    drive: DriveSection,
    #[serde(default)]
    run: RunSection,
    #[serde(default)]
    retry: RetrySection,
    #[serde(default)]
    status: StatusSection,
}

#[derive(Debug, Default, Deserialize)]
struct DriveSection {
    root_folder_id: Option<String>,
    procurement_folder_id: Option<String>,
    template_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    workers: Option<usize>,
    sleep_timeout_secs: Option<u64>,
    staleness_days: Option<i64>,
    db_path: Option<PathBuf>,
    submission: Option<SubmissionMode>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrySection {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    rate_limit_cooldown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusSection {
    backend: Option<StatusBackend>,
}

/// Overwrite a settings field from the file when present.
macro_rules! apply_file_opt {
    ($section:expr, $target:expr, $field:ident) => {
        if let Some(v) = $section.$field.clone() {
            $target.$field = v;
        }
    };
}

fn apply_file(file: &SettingsFile, settings: &mut Settings) {
    apply_file_opt!(file.drive, settings.drive, root_folder_id);
    apply_file_opt!(file.drive, settings.drive, procurement_folder_id);
    apply_file_opt!(file.drive, settings.drive, template_id);
    apply_file_opt!(file.run, settings.run, workers);
    apply_file_opt!(file.run, settings.run, sleep_timeout_secs);
    apply_file_opt!(file.run, settings.run, staleness_days);
    apply_file_opt!(file.run, settings.run, submission);
    if let Some(ref p) = file.run.db_path {
        settings.run.db_path = Some(p.clone());
    }
    apply_file_opt!(file.retry, settings.retry, max_attempts);
    apply_file_opt!(file.retry, settings.retry, base_delay_ms);
    apply_file_opt!(file.retry, settings.retry, rate_limit_cooldown_secs);
    apply_file_opt!(file.status, settings.status, backend);
}

/// Parse settings text, filling unset values with defaults.
pub fn parse_settings(text: &str) -> Result<Settings> {
    let file: SettingsFile = toml::from_str(text).context("parse settings")?;
    let mut settings = Settings::default();
    apply_file(&file, &mut settings);
    Ok(settings)
}

/// Load settings from `path`. A missing file yields defaults unless `required`.
pub fn load_settings(path: &Path, required: bool) -> Result<Settings> {
    if !path.is_file() {
        if required {
            bail!("settings file {} not found", path.display());
        }
        log::debug!("{} not found; using defaults", path.display());
        return Ok(Settings::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    parse_settings(&text).with_context(|| format!("in {}", path.display()))
}

/// Credentials and endpoints from the environment. `.env` in the working directory is loaded first
/// without overriding variables already set.
#[derive(Clone, Debug, Default)]
pub struct Secrets {
    pub google_access_token: Option<String>,
    pub insightly_api_key: Option<String>,
    pub base_url: Option<String>,
    pub user_token: Option<String>,
    pub tenant_token: Option<String>,
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Secrets {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            log::warn!(".env: {}", e);
        }
        Self {
            google_access_token: env_value(EnvKeys::GOOGLE_ACCESS_TOKEN),
            insightly_api_key: env_value(EnvKeys::INSIGHTLY_API_KEY),
            base_url: env_value(EnvKeys::BASE_URL),
            user_token: env_value(EnvKeys::USER_TOKEN),
            tenant_token: env_value(EnvKeys::TENANT_TOKEN),
        }
    }

    /// The value for `key`, or an error naming the missing variable.
    pub fn require<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
        value
            .as_deref()
            .with_context(|| format!("{key} is not set (environment or .env)"))
    }

    pub fn google_access_token(&self) -> Result<&str> {
        Self::require(&self.google_access_token, EnvKeys::GOOGLE_ACCESS_TOKEN)
    }

    pub fn insightly_api_key(&self) -> Result<&str> {
        Self::require(&self.insightly_api_key, EnvKeys::INSIGHTLY_API_KEY)
    }

    pub fn base_url(&self) -> Result<&str> {
        Self::require(&self.base_url, EnvKeys::BASE_URL)
    }

    pub fn user_token(&self) -> Result<&str> {
        Self::require(&self.user_token, EnvKeys::USER_TOKEN)
    }

    pub fn tenant_token(&self) -> Result<&str> {
        Self::require(&self.tenant_token, EnvKeys::TENANT_TOKEN)
    }
}
