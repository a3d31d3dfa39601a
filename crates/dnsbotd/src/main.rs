// # dnsbotd - DNS Bot Daemon
//
// ⚠️ ARCHITECTURAL CONSTRAINTS ⚠️
//
// - This is a THIN integration layer ONLY
// - DO NOT add command, DNS or retry logic here
// - All bot logic MUST be in dnsbot-core
// - Configuration is via environment variables ONLY
//
// The dnsbotd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Registering providers and validating the default zone
// 4. Feeding console lines through the access gate into the engine
//
// ## Configuration
//
// ### DNS Provider
// - `DNSBOT_PROVIDER_TYPE`: Provider type (cloudflare)
// - `DNSBOT_PROVIDER_API_TOKEN`: API token (required)
// - `DNSBOT_HTTP_TIMEOUT_SECS`: Per-request HTTP timeout
// - `DNSBOT_MODE`: `dry-run` to log mutations instead of sending them
//
// ### Zones and Access
// - `DNSBOT_ZONE_ID`: Zone every context starts in (optional)
// - `DNSBOT_ALLOWED_USERS`: Comma-separated user ids (required)
// - `DNSBOT_OPERATOR_ID`: Identity of the console operator (default: first allowed user)
//
// ### Retries
// - `DNSBOT_MAX_RETRIES`: Transient retries per provider call
// - `DNSBOT_RETRY_BASE_MS`: First backoff delay
// - `DNSBOT_RETRY_MAX_DELAY_MS`: Cap on a single backoff delay
// - `DNSBOT_RETRY_BUDGET_SECS`: Cap on one provider call including retries
//
// ### Flows
// - `DNSBOT_SESSION_TTL_SECS`: Idle time before a pending flow expires
// - `DNSBOT_MAX_INVALID_INPUTS`: Invalid replies tolerated per flow step
//
// ## Example
//
// ```bash
// export DNSBOT_PROVIDER_API_TOKEN=your_token
// export DNSBOT_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export DNSBOT_ALLOWED_USERS=123456789
//
// dnsbotd
// ```

mod console;
mod render;

use anyhow::{Context, Result};
use dnsbot_core::config::{BotConfig, FlowConfig, ProviderConfig, RetryConfig};
use dnsbot_core::zone::lookup_zone;
use dnsbot_core::{AllowList, CommandEngine, ProviderClient, ProviderRegistry, UserId, Zone, ZoneContexts};
use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::console::Console;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsbotExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DnsbotExitCode> for ExitCode {
    fn from(code: DnsbotExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, as read from the environment
#[derive(Debug)]
struct Config {
    bot: BotConfig,
    operator: UserId,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().filter(|(k, _)| k.starts_with("DNSBOT_")).collect();
        Self::from_vars(&vars)
    }

    /// Build configuration from `DNSBOT_*` variables
    fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let provider_type = get("DNSBOT_PROVIDER_TYPE").unwrap_or("cloudflare");
        let api_token = get("DNSBOT_PROVIDER_API_TOKEN")
            .context("DNSBOT_PROVIDER_API_TOKEN is required. Set it via: export DNSBOT_PROVIDER_API_TOKEN=your_token")?
            .to_string();
        let dry_run = get("DNSBOT_MODE").is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run"));

        let mut retry = RetryConfig::default();
        let mut http_timeout_secs = retry.attempt_timeout_secs;
        if let Some(n) = parse_var(vars, "DNSBOT_MAX_RETRIES")? {
            retry.max_retries = n;
        }
        if let Some(n) = parse_var(vars, "DNSBOT_RETRY_BASE_MS")? {
            retry.base_delay_ms = n;
        }
        if let Some(n) = parse_var(vars, "DNSBOT_RETRY_MAX_DELAY_MS")? {
            retry.max_delay_ms = n;
        }
        if let Some(n) = parse_var(vars, "DNSBOT_RETRY_BUDGET_SECS")? {
            retry.total_budget_secs = n;
        }
        if let Some(n) = parse_var(vars, "DNSBOT_HTTP_TIMEOUT_SECS")? {
            http_timeout_secs = n;
            retry.attempt_timeout_secs = n;
        }

        let mut flow = FlowConfig::default();
        if let Some(n) = parse_var(vars, "DNSBOT_SESSION_TTL_SECS")? {
            flow.session_ttl_secs = n;
        }
        if let Some(n) = parse_var(vars, "DNSBOT_MAX_INVALID_INPUTS")? {
            flow.max_invalid_inputs = n;
        }

        let provider = match provider_type {
            "cloudflare" => ProviderConfig::Cloudflare {
                api_token,
                dry_run,
                http_timeout_secs,
            },
            other => ProviderConfig::Custom {
                factory: other.to_string(),
                config: serde_json::json!({ "api_token": api_token }),
            },
        };

        let allowed_users = get("DNSBOT_ALLOWED_USERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .with_context(|| format!("DNSBOT_ALLOWED_USERS contains an invalid user id: '{}'", s))
            })
            .collect::<Result<Vec<_>>>()?;

        let operator = match parse_var::<i64>(vars, "DNSBOT_OPERATOR_ID")? {
            Some(id) => UserId(id),
            None => UserId(allowed_users.first().copied().unwrap_or_default()),
        };

        let mut bot = BotConfig::new(provider, allowed_users);
        bot.default_zone_id = get("DNSBOT_ZONE_ID").map(str::to_string);
        bot.retry = retry;
        bot.flow = flow;

        Ok(Self {
            bot,
            operator,
            log_level: get("DNSBOT_LOG_LEVEL").unwrap_or("info").to_string(),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.bot.validate()?;

        if !self.bot.allowed_users.contains(&self.operator.0) {
            anyhow::bail!(
                "DNSBOT_OPERATOR_ID {} is not in DNSBOT_ALLOWED_USERS; the console would refuse every line",
                self.operator
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSBOT_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// Parse an optional numeric variable, failing on garbage
fn parse_var<T>(vars: &HashMap<String, String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} must be a number, got '{}': {}", key, raw, e)),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DnsbotExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DnsbotExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries the console replies
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsbotExitCode::ConfigError.into();
    }

    info!("Starting dnsbotd daemon");
    info!(
        "Configuration loaded: provider {}, {} allowed user(s)",
        config.bot.provider.type_name(),
        config.bot.allowed_users.len()
    );

    // Create provider registry and the configured provider
    let registry = ProviderRegistry::new();
    register_providers(&registry);

    let provider = match registry.create_provider(&config.bot.provider) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create provider: {}", e);
            return DnsbotExitCode::ConfigError.into();
        }
    };
    let client = ProviderClient::new(Arc::from(provider), config.bot.retry.clone());

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsbotExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async move {
        let default_zone = match resolve_default_zone(&client, config.bot.default_zone_id.as_deref()).await {
            Ok(zone) => zone,
            Err(e) => {
                error!("Default zone check failed: {}", e);
                return DnsbotExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(config, client, default_zone).await {
            error!("Daemon error: {}", e);
            DnsbotExitCode::RuntimeError
        } else {
            DnsbotExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register built-in providers
fn register_providers(registry: &ProviderRegistry) {
    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        dnsbot_provider_cloudflare::register(registry);
    }

    if registry.list_providers().is_empty() {
        warn!("No DNS providers compiled in");
    }
}

/// Check the configured default zone against the provider's zone list
async fn resolve_default_zone(client: &ProviderClient, zone_id: Option<&str>) -> Result<Option<Zone>> {
    let Some(zone_id) = zone_id else {
        info!("No default zone configured; contexts start without one");
        return Ok(None);
    };

    let zone = lookup_zone(client, zone_id)
        .await
        .with_context(|| format!("DNSBOT_ZONE_ID '{}' is not usable", zone_id))?;
    info!("Default zone: {} ({})", zone.name, zone.id);
    Ok(Some(zone))
}

/// Run the daemon
async fn run_daemon(config: Config, client: ProviderClient, default_zone: Option<Zone>) -> Result<()> {
    let policy = AllowList::new(config.bot.allowed_users.iter().copied().map(UserId));
    let engine = CommandEngine::new(client, ZoneContexts::new(default_zone), config.bot.flow.clone());
    let console = Console::new(engine, policy, config.operator);

    info!("Daemon initialized successfully");
    info!("Reading commands from stdin as user {}", config.operator);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                info!("Received shutdown signal: {}", signal?);
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("stdin closed");
                    break;
                };
                if let Some(reply) = console.dispatch(&line).await {
                    stdout.write_all(reply.as_bytes()).await?;
                    stdout.write_all(b"\n\n").await?;
                    stdout.flush().await?;
                }
            }
        }
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DNSBOT_PROVIDER_API_TOKEN", "cf-token-0123456789"),
            ("DNSBOT_ALLOWED_USERS", "42, 7"),
        ]
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let config = Config::from_vars(&vars(&minimal())).unwrap();
        config.validate().unwrap();

        assert_eq!(config.operator, UserId(42));
        assert_eq!(config.bot.allowed_users, vec![42, 7]);
        assert_eq!(config.bot.retry.max_retries, 3);
        assert_eq!(config.bot.flow.session_ttl_secs, 300);
        assert!(config.bot.default_zone_id.is_none());
        assert!(matches!(
            config.bot.provider,
            ProviderConfig::Cloudflare { dry_run: false, http_timeout_secs: 15, .. }
        ));
    }

    #[test]
    fn overrides_are_applied() {
        let mut pairs = minimal();
        pairs.extend([
            ("DNSBOT_ZONE_ID", "zone-1"),
            ("DNSBOT_OPERATOR_ID", "7"),
            ("DNSBOT_MAX_RETRIES", "5"),
            ("DNSBOT_RETRY_BUDGET_SECS", "30"),
            ("DNSBOT_HTTP_TIMEOUT_SECS", "8"),
            ("DNSBOT_SESSION_TTL_SECS", "120"),
            ("DNSBOT_MAX_INVALID_INPUTS", "2"),
            ("DNSBOT_MODE", "DRY-RUN"),
        ]);
        let config = Config::from_vars(&vars(&pairs)).unwrap();
        config.validate().unwrap();

        assert_eq!(config.operator, UserId(7));
        assert_eq!(config.bot.default_zone_id.as_deref(), Some("zone-1"));
        assert_eq!(config.bot.retry.max_retries, 5);
        assert_eq!(config.bot.retry.total_budget_secs, 30);
        assert_eq!(config.bot.retry.attempt_timeout_secs, 8);
        assert_eq!(config.bot.flow.max_invalid_inputs, 2);
        assert!(matches!(
            config.bot.provider,
            ProviderConfig::Cloudflare { dry_run: true, http_timeout_secs: 8, .. }
        ));
    }

    #[test]
    fn missing_token_is_an_error() {
        let result = Config::from_vars(&vars(&[("DNSBOT_ALLOWED_USERS", "42")]));
        assert!(result.is_err());
    }

    #[test]
    fn garbage_numbers_are_errors() {
        let mut pairs = minimal();
        pairs.push(("DNSBOT_MAX_RETRIES", "lots"));
        assert!(Config::from_vars(&vars(&pairs)).is_err());

        let pairs = vec![
            ("DNSBOT_PROVIDER_API_TOKEN", "cf-token-0123456789"),
            ("DNSBOT_ALLOWED_USERS", "42,alice"),
        ];
        assert!(Config::from_vars(&vars(&pairs)).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let empty_users = vec![("DNSBOT_PROVIDER_API_TOKEN", "cf-token-0123456789")];
        assert!(Config::from_vars(&vars(&empty_users)).unwrap().validate().is_err());

        let mut stranger = minimal();
        stranger.push(("DNSBOT_OPERATOR_ID", "99"));
        assert!(Config::from_vars(&vars(&stranger)).unwrap().validate().is_err());

        let mut level = minimal();
        level.push(("DNSBOT_LOG_LEVEL", "verbose"));
        assert!(Config::from_vars(&vars(&level)).unwrap().validate().is_err());

        let mut retries = minimal();
        retries.push(("DNSBOT_MAX_RETRIES", "11"));
        assert!(Config::from_vars(&vars(&retries)).unwrap().validate().is_err());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(DnsbotExitCode::CleanShutdown as u8, 0);
        assert_eq!(DnsbotExitCode::ConfigError as u8, 1);
        assert_eq!(DnsbotExitCode::RuntimeError as u8, 2);
    }
}
