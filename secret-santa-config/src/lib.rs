use core::fmt::{Debug, Display};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE: &str = "santa.toml";
pub const ENV_PREFIX: &str = "SANTA_";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailFormat {
    #[default]
    Plaintext,
    Html,
    Multipart,
}

fn default_summary_template_name() -> String {
    "summary".to_owned()
}

const fn default_max_attempts() -> u32 {
    25
}

const fn default_send_concurrency() -> usize {
    8
}

const fn default_precheck_feasibility() -> bool {
    true
}

/// Settings consumed by the assignment generator and the notification dispatcher.
///
/// Loaded once at startup and treated as immutable afterwards.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Template group used for all exchange emails.
    pub template_group: String,
    pub sender_name: String,
    pub sender_address: String,
    /// Used if neither the exchange nor the participant prefers a format.
    pub default_email_format: EmailFormat,
    pub default_template_name: String,
    /// Template for the single message listing the whole draw for the organizer.
    #[serde(default = "default_summary_template_name")]
    pub summary_template_name: String,
    /// Upper bound of shuffles tried before giving up on an exchange.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Maximum number of notifications in flight at the same time.
    #[serde(default = "default_send_concurrency")]
    pub send_concurrency: usize,
    /// Rejects infeasible conflict graphs before shuffling at all.
    #[serde(default = "default_precheck_feasibility")]
    pub precheck_feasibility: bool,
    /// Treat a shared address domain as a household during automatic conflict detection.
    #[serde(default)]
    pub detect_shared_email_domain: bool,
    /// Public mail providers that must not imply a shared household.
    #[serde(default)]
    pub ignored_email_domains: Vec<String>,
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] Box<figment::Error>),
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Figment(Box::new(value))
    }
}

impl ExchangeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("template_group", &self.template_group),
            ("sender_name", &self.sender_name),
            ("sender_address", &self.sender_address),
            ("default_template_name", &self.default_template_name),
            ("summary_template_name", &self.summary_template_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty",
                });
            }
        }
        if self.max_attempts < 1 {
            return Err(ConfigError::Invalid {
                field: "max_attempts",
                reason: "must be at least 1",
            });
        }
        if self.send_concurrency < 1 {
            return Err(ConfigError::Invalid {
                field: "send_concurrency",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

pub fn from_figment(figment: &Figment) -> Result<ExchangeConfig, ConfigError> {
    let config: ExchangeConfig = figment.extract()?;
    config.validate()?;
    debug!(?config, "loaded exchange config");
    Ok(config)
}

pub fn get_config() -> Result<ExchangeConfig, ConfigError> {
    from_figment(
        &Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__")),
    )
}
