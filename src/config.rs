use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::model::prompt::DEFAULT_PERSONA;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Controls how much error detail reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(mode) if mode.eq_ignore_ascii_case("development") => RunMode::Development,
            _ => RunMode::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == RunMode::Development
    }
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub personality_max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub service_key: String,
    pub anon_key: Option<String>,
    pub table: String,
}

impl StoreConfig {
    /// The key handed out by `/config`. Prefers the anonymous-scope key.
    pub fn public_key(&self) -> &str {
        self.anon_key.as_deref().unwrap_or(&self.service_key)
    }

    pub fn discloses_service_key(&self) -> bool {
        self.anon_key.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mode: RunMode,
    pub allowed_origins: Vec<String>,
    pub public_dir: String,
    pub upstream_timeout: Duration,
    pub history_window: usize,
    pub require_personality: bool,
    pub default_persona: String,
    pub completion: CompletionConfig,
    pub store: Option<StoreConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let completion = CompletionConfig {
            api_key: var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?,
            base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: var("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            temperature: parse_or(&var, "TEMPERATURE", 0.9)?,
            max_tokens: parse_or(&var, "MAX_TOKENS", 500)?,
            personality_max_tokens: parse_or(&var, "PERSONALITY_MAX_TOKENS", 800)?,
        };

        // Either both halves of the store connection are present or the store is off.
        let store = match (var("SUPABASE_URL"), var("SUPABASE_KEY")) {
            (Some(url), Some(service_key)) => Some(StoreConfig {
                url: url.trim_end_matches('/').to_string(),
                service_key,
                anon_key: var("SUPABASE_ANON_KEY"),
                table: var("SUPABASE_TABLE").unwrap_or_else(|| "chat_messages".to_string()),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_KEY")),
            (None, Some(_)) => return Err(ConfigError::Missing("SUPABASE_URL")),
        };

        let mode_raw = var("APP_ENV").or_else(|| var("NODE_ENV"));

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 10000)?,
            mode: RunMode::parse(mode_raw.as_deref()),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            public_dir: var("PUBLIC_DIR").unwrap_or_else(|| "public".to_string()),
            upstream_timeout: Duration::from_secs(parse_or(&var, "UPSTREAM_TIMEOUT_SECS", 30)?),
            history_window: parse_or(&var, "HISTORY_WINDOW", 20)?,
            require_personality: parse_or(&var, "REQUIRE_PERSONALITY", false)?,
            default_persona: var("DEFAULT_PERSONA")
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            completion,
            store,
        })
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
