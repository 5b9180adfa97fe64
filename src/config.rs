//! Environment configuration

use crate::llm::DEFAULT_WEB_SEARCH_VERSION;
use crate::state_machine::state::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::state_machine::ChatContext;
use thiserror::Error;

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000/api/chat";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be one of on/off/true/false/1/0, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Relay endpoint that forwards requests to the completion service
    pub relay_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub web_search_version: String,
    /// Initial state of the search toggle
    pub search_enabled: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            web_search_version: DEFAULT_WEB_SEARCH_VERSION.to_string(),
            search_enabled: true,
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_tokens = match lookup("SEARCHCHAT_MAX_TOKENS") {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        var: "SEARCHCHAT_MAX_TOKENS",
                        value,
                    })
                }
            },
            None => defaults.max_tokens,
        };

        let search_enabled = match lookup("SEARCHCHAT_WEB_SEARCH") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::InvalidFlag {
                var: "SEARCHCHAT_WEB_SEARCH",
                value,
            })?,
            None => defaults.search_enabled,
        };

        Ok(Self {
            relay_url: lookup("SEARCHCHAT_RELAY_URL").unwrap_or(defaults.relay_url),
            model: lookup("SEARCHCHAT_MODEL").unwrap_or(defaults.model),
            max_tokens,
            web_search_version: lookup("SEARCHCHAT_WEB_SEARCH_VERSION")
                .unwrap_or(defaults.web_search_version),
            search_enabled,
        })
    }

    pub fn context(&self) -> ChatContext {
        ChatContext::new(self.model.clone(), self.max_tokens)
            .with_web_search_version(self.web_search_version.clone())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}
