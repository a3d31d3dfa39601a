//! Configuration types for the DNS bot
//!
//! The daemon fills these from environment variables; tests build them
//! directly. Every section has serde defaults so partial documents load.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Main bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Zone every operating context starts in
    #[serde(default)]
    pub default_zone_id: Option<String>,

    /// Users allowed to issue commands
    pub allowed_users: Vec<i64>,

    /// Provider call retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Interactive flow settings
    #[serde(default)]
    pub flow: FlowConfig,
}

impl BotConfig {
    /// Create a configuration with defaults for everything but the essentials
    pub fn new(provider: ProviderConfig, allowed_users: Vec<i64>) -> Self {
        Self {
            provider,
            default_zone_id: None,
            allowed_users,
            retry: RetryConfig::default(),
            flow: FlowConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.allowed_users.is_empty() {
            return Err(crate::Error::config(
                "No allowed users configured; nobody could use the bot",
            ));
        }

        if let Some(zone_id) = &self.default_zone_id
            && zone_id.trim().is_empty()
        {
            return Err(crate::Error::config("Default zone id cannot be blank"));
        }

        self.provider.validate()?;
        self.retry.validate()?;
        self.flow.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Log mutations instead of sending them
        #[serde(default)]
        dry_run: bool,
        /// Per-request HTTP timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        http_timeout_secs: u64,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Cloudflare configuration with default settings
    pub fn cloudflare(api_token: impl Into<String>) -> Self {
        ProviderConfig::Cloudflare {
            api_token: api_token.into(),
            dry_run: false,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                http_timeout_secs,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if *http_timeout_secs == 0 {
                    return Err(crate::Error::config("HTTP timeout must be > 0"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// Hand-written so the token never reaches a log line
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                dry_run,
                http_timeout_secs,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("dry_run", dry_run)
                .field("http_timeout_secs", http_timeout_secs)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

/// Retry policy for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first, for transient failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled per attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound on any single delay
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Random extra delay added to each backoff, up to this many milliseconds
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Timeout for a single attempt
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Wall-clock budget for one call including every retry
    #[serde(default = "default_total_budget_secs")]
    pub total_budget_secs: u64,
}

impl RetryConfig {
    /// Validate the retry configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_retries > 10 {
            return Err(crate::Error::config(format!(
                "max_retries must be between 0 and 10, got {}",
                self.max_retries
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(crate::Error::config(
                "max_delay_ms cannot be smaller than base_delay_ms",
            ));
        }
        if self.attempt_timeout_secs == 0 || self.total_budget_secs == 0 {
            return Err(crate::Error::config(
                "attempt timeout and total budget must be > 0",
            ));
        }
        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn total_budget(&self) -> Duration {
        Duration::from_secs(self.total_budget_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            total_budget_secs: default_total_budget_secs(),
        }
    }
}

/// Interactive flow settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Idle time after which a pending flow is discarded
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Invalid replies at one step after which the flow is abandoned
    #[serde(default = "default_max_invalid_inputs")]
    pub max_invalid_inputs: u32,
}

impl FlowConfig {
    /// Validate the flow configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.session_ttl_secs == 0 {
            return Err(crate::Error::config("session_ttl_secs must be > 0"));
        }
        if self.max_invalid_inputs == 0 {
            return Err(crate::Error::config("max_invalid_inputs must be > 0"));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX))
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            max_invalid_inputs: default_max_invalid_inputs(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    4_000
}

fn default_jitter_ms() -> u64 {
    100
}

fn default_attempt_timeout_secs() -> u64 {
    15
}

fn default_total_budget_secs() -> u64 {
    20
}

fn default_session_ttl_secs() -> u64 {
    300
}

fn default_max_invalid_inputs() -> u32 {
    3
}
