use std::{fs, io, path::Path};

use liftlog_domain as domain;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub const ENV_SUPABASE_URL: &str = "LIFTLOG_SUPABASE_URL";
pub const ENV_SUPABASE_KEY: &str = "LIFTLOG_SUPABASE_KEY";
pub const ENV_ACCESS_TOKEN: &str = "LIFTLOG_ACCESS_TOKEN";
pub const ENV_PROFILE_ID: &str = "LIFTLOG_PROFILE_ID";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub supabase_url: Option<String>,
    pub anon_key: Option<String>,
    /// JWT of the signed-in user. Falls back to the anon key.
    pub access_token: Option<String>,
    pub profile_id: domain::ProfileID,
    pub log_level: LevelFilter,
    /// Offer to persist the routine when finishing a workout.
    pub save_routine: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            supabase_url: None,
            anon_key: None,
            access_token: None,
            profile_id: domain::ProfileID::nil(),
            log_level: LevelFilter::Info,
            save_routine: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] io::Error),
    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid profile id: {0}")]
    InvalidProfileID(String),
}

/// Connection parameters of the remote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote<'a> {
    pub url: &'a str,
    pub api_key: &'a str,
    pub access_token: Option<&'a str>,
}

impl Settings {
    /// Read the settings file, if any, and apply the environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_json(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), SettingsError> {
        if let Some(url) = lookup(ENV_SUPABASE_URL) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = lookup(ENV_SUPABASE_KEY) {
            self.anon_key = Some(key);
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token);
        }
        if let Some(profile_id) = lookup(ENV_PROFILE_ID) {
            self.profile_id = uuid::Uuid::parse_str(profile_id.trim())
                .map_err(|_| SettingsError::InvalidProfileID(profile_id))?
                .into();
        }
        Ok(())
    }

    #[must_use]
    pub fn remote(&self) -> Option<Remote<'_>> {
        match (&self.supabase_url, &self.anon_key) {
            (Some(url), Some(api_key)) if !url.is_empty() && !api_key.is_empty() => Some(Remote {
                url,
                api_key,
                access_token: self.access_token.as_deref(),
            }),
            _ => None,
        }
    }
}
