use std::{env, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MediaType;

const DEFAULT_BASE_URL: &str = "http://localhost:3002";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid editor limits: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Reads `CHATFLOW_API_BASE_URL`, `CHATFLOW_API_TOKEN` and
    /// `CHATFLOW_REQUEST_TIMEOUT_MS`, falling back to a local backend.
    pub fn from_env() -> Self {
        let base_url =
            env::var("CHATFLOW_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Ok(token) = env::var("CHATFLOW_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }
        if let Ok(timeout_ms) = env::var("CHATFLOW_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout_ms.parse::<u64>() {
                config.request_timeout = Duration::from_millis(ms);
            }
        }

        config
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Limits applied by node validation and the per-node editors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorLimits {
    pub text_message_max_chars: usize,
    pub button_body_max_chars: usize,
    pub button_label_max_chars: usize,
    pub max_reply_buttons: usize,
    pub max_url_buttons: usize,
    pub list_body_max_chars: usize,
    pub list_max_items: usize,
    pub list_label_max_chars: usize,
    pub media_caption_max_chars: usize,
    pub delay_min_minutes: i64,
    pub delay_max_minutes: i64,
    pub image_max_bytes: u64,
    pub video_max_bytes: u64,
    pub document_max_bytes: u64,
}

impl Default for EditorLimits {
    fn default() -> Self {
        Self {
            text_message_max_chars: 4096,
            button_body_max_chars: 1024,
            button_label_max_chars: 20,
            max_reply_buttons: 3,
            max_url_buttons: 1,
            list_body_max_chars: 4096,
            list_max_items: 10,
            list_label_max_chars: 24,
            media_caption_max_chars: 1024,
            delay_min_minutes: 1,
            delay_max_minutes: 120,
            image_max_bytes: 5 * MIB,
            video_max_bytes: 16 * MIB,
            document_max_bytes: 100 * MIB,
        }
    }
}

impl EditorLimits {
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let limits: Self = serde_yaml::from_str(input)?;
        limits.validate()?;
        Ok(limits)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Rejects limits the editors cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay_min_minutes < 1 {
            return Err(ConfigError::Invalid(format!(
                "delay_min_minutes must be at least 1, got {}",
                self.delay_min_minutes
            )));
        }
        if self.delay_min_minutes > self.delay_max_minutes {
            return Err(ConfigError::Invalid(format!(
                "delay_min_minutes ({}) is greater than delay_max_minutes ({})",
                self.delay_min_minutes, self.delay_max_minutes
            )));
        }
        if self.max_reply_buttons == 0 {
            return Err(ConfigError::Invalid(
                "max_reply_buttons must be at least 1".to_string(),
            ));
        }
        if self.list_max_items == 0 {
            return Err(ConfigError::Invalid(
                "list_max_items must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::Image => self.image_max_bytes,
            MediaType::Video => self.video_max_bytes,
            MediaType::Document => self.document_max_bytes,
        }
    }

    /// Pulls `minutes` into the configured range. The lower bound wins if the
    /// limits were built by hand with min above max.
    pub fn clamp_delay(&self, minutes: i64) -> i64 {
        minutes.min(self.delay_max_minutes).max(self.delay_min_minutes)
    }
}
