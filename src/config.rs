use crate::error::{config_error, env_error, AppResult, Error};
use crate::utils::time::parse_timezone;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::str::FromStr;

/// Default location of the optional TOML overrides
pub const DEFAULT_CONFIG_PATH: &str = "config/calendar-pilot.toml";

/// Which language-understanding backend turns prompts into operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentProvider {
    Gemini,
    OpenAi,
}

impl FromStr for IntentProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(IntentProvider::Gemini),
            "openai" => Ok(IntentProvider::OpenAi),
            other => Err(config_error(&format!("Unknown intent provider: {}", other))),
        }
    }
}

/// Main configuration structure for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Timezone used when the caller does not send one
    pub default_timezone: String,
    /// Google Calendar ID to operate on
    pub google_calendar_id: String,
    /// Base URL of the Google Calendar v3 API
    pub google_api_base_url: String,
    /// Selected language-understanding provider
    pub intent_provider: IntentProvider,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    /// How far ahead a search without a date looks
    pub max_look_ahead_days: u32,
    /// Result cap for list requests that do not set one
    pub list_default_max_results: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            default_timezone: "UTC".to_string(),
            google_calendar_id: "primary".to_string(),
            google_api_base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            intent_provider: IntentProvider::Gemini,
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            max_look_ahead_days: 30,
            list_default_max_results: 10,
        }
    }
}

/// Subset of the config that may be set from the TOML file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_address: Option<String>,
    port: Option<u16>,
    default_timezone: Option<String>,
    google_calendar_id: Option<String>,
    google_api_base_url: Option<String>,
    intent_provider: Option<IntentProvider>,
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    openai_model: Option<String>,
    openai_base_url: Option<String>,
    max_look_ahead_days: Option<u32>,
    list_default_max_results: Option<u32>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Config::default();

        let path = env::var("CALENDAR_PILOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if let Ok(content) = fs::read_to_string(&path) {
            config.apply_file(toml::from_str(&content)?);
        }

        config.apply_env()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.bind_address {
            self.bind_address = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.default_timezone {
            self.default_timezone = v;
        }
        if let Some(v) = file.google_calendar_id {
            self.google_calendar_id = v;
        }
        if let Some(v) = file.google_api_base_url {
            self.google_api_base_url = v;
        }
        if let Some(v) = file.intent_provider {
            self.intent_provider = v;
        }
        if let Some(v) = file.gemini_model {
            self.gemini_model = v;
        }
        if let Some(v) = file.gemini_base_url {
            self.gemini_base_url = v;
        }
        if let Some(v) = file.openai_model {
            self.openai_model = v;
        }
        if let Some(v) = file.openai_base_url {
            self.openai_base_url = v;
        }
        if let Some(v) = file.max_look_ahead_days {
            self.max_look_ahead_days = v;
        }
        if let Some(v) = file.list_default_max_results {
            self.list_default_max_results = v;
        }
    }

    fn apply_env(&mut self) -> AppResult<()> {
        override_string(&mut self.bind_address, "BIND_ADDRESS");
        override_string(&mut self.default_timezone, "TIMEZONE");
        override_string(&mut self.google_calendar_id, "GOOGLE_CALENDAR_ID");
        override_string(&mut self.google_api_base_url, "GOOGLE_API_BASE_URL");
        override_string(&mut self.gemini_api_key, "GEMINI_API_KEY");
        override_string(&mut self.gemini_model, "GEMINI_MODEL");
        override_string(&mut self.gemini_base_url, "GEMINI_BASE_URL");
        override_string(&mut self.openai_api_key, "OPENAI_API_KEY");
        override_string(&mut self.openai_model, "OPENAI_MODEL");
        override_string(&mut self.openai_base_url, "OPENAI_BASE_URL");

        if let Ok(provider) = env::var("INTENT_PROVIDER") {
            self.intent_provider = provider.parse()?;
        }

        override_parsed(&mut self.port, "PORT")?;
        override_parsed(&mut self.max_look_ahead_days, "MAX_LOOK_AHEAD_DAYS")?;
        override_parsed(&mut self.list_default_max_results, "LIST_MAX_RESULTS")?;

        Ok(())
    }

    /// Check cross-field requirements once every source has been applied
    pub fn validate(&self) -> AppResult<()> {
        parse_timezone(&self.default_timezone)
            .map_err(|_| config_error(&format!("Invalid default timezone: {}", self.default_timezone)))?;

        match self.intent_provider {
            IntentProvider::Gemini if self.gemini_api_key.is_empty() => Err(env_error("GEMINI_API_KEY")),
            IntentProvider::OpenAi if self.openai_api_key.is_empty() => Err(env_error("OPENAI_API_KEY")),
            _ => Ok(()),
        }
    }
}

fn override_string(target: &mut String, var: &str) {
    if let Ok(value) = env::var(var) {
        if !value.trim().is_empty() {
            *target = value.trim().to_string();
        }
    }
}

fn override_parsed<T: FromStr>(target: &mut T, var: &str) -> AppResult<()> {
    if let Ok(value) = env::var(var) {
        *target = value
            .trim()
            .parse::<T>()
            .map_err(|_| Error::Environment(format!("Invalid {} format", var)))?;
    }
    Ok(())
}
