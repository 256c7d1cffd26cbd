use std::path::{Path, PathBuf};
use std::time::Duration;

use facet::Facet;

use crate::error::BotError;

#[derive(Debug, Clone, Default, Facet)]
#[facet(default)]
pub struct Config {
    #[facet(default)]
    pub proxmox: ProxmoxConfig,
    #[facet(default)]
    pub retry: RetryConfig,
    #[facet(default)]
    pub lifecycle: LifecycleConfig,
    #[facet(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct ProxmoxConfig {
    /// `pve.example.com`, `10.0.0.2:8006` or a full `https://` URL.
    #[facet(default)]
    pub host: String,
    /// API user including realm, e.g. `root@pam`.
    #[facet(default)]
    pub user: String,
    #[facet(default)]
    pub token_name: String,
    #[facet(default)]
    pub token_value: String,
    #[facet(default)]
    pub verify_tls: bool,
    #[facet(default = 10)]
    pub timeout_s: u64,
    /// How long an established session is reused before a new one is built.
    #[facet(default = 10)]
    pub session_ttl_s: u64,
}

impl Default for ProxmoxConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            token_name: String::new(),
            token_value: String::new(),
            verify_tls: false,
            timeout_s: 10,
            session_ttl_s: 10,
        }
    }
}

impl ProxmoxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_s)
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct RetryConfig {
    #[facet(default = 5)]
    pub max_retries: u32,
    #[facet(default = 2)]
    pub delay_s: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            delay_s: 2,
        }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct LifecycleConfig {
    /// Wait between issuing a stop and re-checking the guest state.
    #[facet(default = 8)]
    pub settle_s: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self { settle_s: 8 }
    }
}

#[derive(Debug, Clone, Facet)]
#[facet(default)]
pub struct TelegramConfig {
    #[facet(default)]
    pub token: String,
    /// Chat ids allowed to issue commands.
    #[facet(default)]
    pub authorized_users: Vec<i64>,
    #[facet(default = 30)]
    pub poll_timeout_s: u64,
    /// Bot API endpoint; override for a self-hosted Bot API server.
    #[facet(default = "https://api.telegram.org")]
    pub api_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            authorized_users: Vec::new(),
            poll_timeout_s: 30,
            api_url: "https://api.telegram.org".into(),
        }
    }
}

impl Config {
    /// Checks the extra requirements of `pvebot serve`.
    pub fn require_telegram(&self) -> Result<(), BotError> {
        if self.telegram.token.is_empty() {
            return Err(BotError::Validation {
                message: "telegram.token must be set (or TELEGRAM_TOKEN)".into(),
            });
        }
        if self.telegram.authorized_users.is_empty() {
            tracing::warn!("telegram.authorized_users is empty, every command will be denied");
        }
        Ok(())
    }
}

// ── environment overrides ─────────────────────────────────

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, BotError> {
    raw.trim().parse().map_err(|_| BotError::Validation {
        message: format!("{key} must be a non-negative integer (got '{raw}')"),
    })
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_user_list(raw: &str) -> Result<Vec<i64>, BotError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| BotError::Validation {
                message: format!("AUTHORIZED_USERS entries must be chat ids (got '{s}')"),
            })
        })
        .collect()
}

/// Overlay environment variables on top of file values.
///
/// `lookup` is `std::env::var` in production; tests pass a map.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<(), BotError>
where
    F: Fn(&str) -> Option<String>,
{
    let pve = &mut config.proxmox;
    if let Some(v) = lookup("PROXMOX_HOST") {
        pve.host = v;
    }
    if let Some(v) = lookup("PROXMOX_USER") {
        pve.user = v;
    }
    if let Some(v) = lookup("PROXMOX_TOKEN_NAME") {
        pve.token_name = v;
    }
    if let Some(v) = lookup("PROXMOX_TOKEN_VALUE") {
        pve.token_value = v;
    }
    if let Some(v) = lookup("VERIFY_SSL") {
        pve.verify_tls = parse_bool(&v);
    }
    if let Some(v) = lookup("TIMEOUT") {
        pve.timeout_s = parse_env("TIMEOUT", &v)?;
    }
    if let Some(v) = lookup("CONNECTION_CACHE_DURATION") {
        pve.session_ttl_s = parse_env("CONNECTION_CACHE_DURATION", &v)?;
    }
    if let Some(v) = lookup("MAX_RETRIES") {
        config.retry.max_retries = parse_env("MAX_RETRIES", &v)?;
    }
    if let Some(v) = lookup("RETRY_DELAY") {
        config.retry.delay_s = parse_env("RETRY_DELAY", &v)?;
    }
    if let Some(v) = lookup("SETTLE_PERIOD") {
        config.lifecycle.settle_s = parse_env("SETTLE_PERIOD", &v)?;
    }
    if let Some(v) = lookup("TELEGRAM_TOKEN") {
        config.telegram.token = v;
    }
    if let Some(v) = lookup("AUTHORIZED_USERS") {
        config.telegram.authorized_users = parse_user_list(&v)?;
    }
    Ok(())
}

// ── validation ────────────────────────────────────────────

fn validate_config(config: &Config) -> Result<(), BotError> {
    let pve = &config.proxmox;
    for (field, value) in [
        ("proxmox.host", &pve.host),
        ("proxmox.user", &pve.user),
        ("proxmox.token_name", &pve.token_name),
        ("proxmox.token_value", &pve.token_value),
    ] {
        if value.trim().is_empty() {
            return Err(BotError::Validation {
                message: format!("{field} must be set"),
            });
        }
    }
    if !pve.user.contains('@') {
        return Err(BotError::Validation {
            message: format!(
                "proxmox.user must include the realm, e.g. root@pam (got '{}')",
                pve.user
            ),
        });
    }
    if pve.timeout_s == 0 {
        return Err(BotError::Validation {
            message: "proxmox.timeout_s must be at least 1".into(),
        });
    }
    if config.telegram.poll_timeout_s == 0 {
        return Err(BotError::Validation {
            message: "telegram.poll_timeout_s must be at least 1".into(),
        });
    }
    Ok(())
}

// ── public API ────────────────────────────────────────────

/// Default config locations, in lookup order.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("pvebot.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("pvebot").join("pvebot.toml"));
    }
    paths
}

pub fn parse_config(path: &Path) -> Result<Config, BotError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BotError::ConfigLoad {
        path: path.display().to_string(),
        source,
    })?;

    facet_toml::from_str(&contents).map_err(|e| BotError::ConfigParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Load the config file (explicit path, or the first default that exists),
/// overlay the process environment and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<Config, BotError> {
    let mut config = match path {
        Some(p) => parse_config(p)?,
        None => match default_config_paths().into_iter().find(|p| p.is_file()) {
            Some(p) => {
                tracing::debug!(path = %p.display(), "using default config file");
                parse_config(&p)?
            }
            None => Config::default(),
        },
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}
