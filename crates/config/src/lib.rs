use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "fiks-io.toml",
    "config/fiks-io.toml",
    "crates/config/fiks-io.toml",
    "../fiks-io.toml",
    "../config/fiks-io.toml",
];

const DEFAULT_BASE_URL: &str = "https://api.fiks.ks.no";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FiksIoConfig {
    pub account: AccountConfig,
    pub catalog: CatalogConfig,
    pub send: SendConfig,
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default = "AccountConfig::default_ttl")]
    pub default_ttl_seconds: u64,
}

impl AccountConfig {
    const fn default_ttl() -> u64 {
        2 * 24 * 60 * 60
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            default_ttl_seconds: Self::default_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_seconds: 300,
        }
    }
}

/// Where inbound deliveries for the account are consumed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    pub url: String,
    /// Overrides the channel derived from the account id
    #[serde(default)]
    pub queue: Option<String>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            queue: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub integration_id: Uuid,
    pub integration_password: String,
    pub maskinporten: MaskinportenConfig,
}

/// Settings for the Maskinporten JWT bearer grant.
///
/// ```
/// use fiks_io_config::MaskinportenConfig;
///
/// let maskinporten = MaskinportenConfig::default();
/// assert_eq!(maskinporten.token_lifetime_seconds, 120);
/// assert!(maskinporten.token_endpoint.ends_with("/token"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskinportenConfig {
    #[serde(default = "MaskinportenConfig::default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default = "MaskinportenConfig::default_audience")]
    pub audience: String,
    pub issuer: String,
    #[serde(default = "MaskinportenConfig::default_scope")]
    pub scope: String,
    pub private_key_pem_path: PathBuf,
    #[serde(default = "MaskinportenConfig::default_token_lifetime")]
    pub token_lifetime_seconds: u64,
}

impl MaskinportenConfig {
    fn default_token_endpoint() -> String {
        "https://maskinporten.no/token".to_string()
    }

    fn default_audience() -> String {
        "https://maskinporten.no/".to_string()
    }

    fn default_scope() -> String {
        "ks:fiks".to_string()
    }

    const fn default_token_lifetime() -> u64 {
        120
    }
}

impl Default for MaskinportenConfig {
    fn default() -> Self {
        Self {
            token_endpoint: Self::default_token_endpoint(),
            audience: Self::default_audience(),
            issuer: String::new(),
            scope: Self::default_scope(),
            private_key_pem_path: PathBuf::new(),
            token_lifetime_seconds: Self::default_token_lifetime(),
        }
    }
}

fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the client configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use fiks_io_config::load;
///
/// std::env::remove_var("FIKS_IO_CONFIG");
/// std::env::set_var("FIKS_IO__ACCOUNT__ACCOUNT_ID", "7c5a9ef4-3d1e-4f6b-8a2d-1e2f3a4b5c6d");
///
/// let config = load().expect("configuration should load with an account id");
/// assert!(config.auth.is_none());
/// ```
pub fn load() -> anyhow::Result<FiksIoConfig> {
    let defaults = FiksIoConfig::default();

    let mut builder = config::Config::builder()
        .set_default(
            "account.default_ttl_seconds",
            as_i64(defaults.account.default_ttl_seconds),
        )?
        .set_default("catalog.base_url", defaults.catalog.base_url.clone())?
        .set_default(
            "catalog.request_timeout_seconds",
            as_i64(defaults.catalog.request_timeout_seconds),
        )?
        .set_default("send.base_url", defaults.send.base_url.clone())?
        .set_default(
            "send.request_timeout_seconds",
            as_i64(defaults.send.request_timeout_seconds),
        )?
        .set_default("subscription.url", defaults.subscription.url.clone())?;

    let environment_overrides = config::Environment::with_prefix("FIKS_IO").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("FIKS_IO_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via FIKS_IO_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<FiksIoConfig>()
        .context("invalid configuration")?;

    anyhow::ensure!(
        config.account.account_id.is_some(),
        "account.account_id is required"
    );
    anyhow::ensure!(
        config.account.default_ttl_seconds > 0,
        "account.default_ttl_seconds must be positive"
    );

    debug!(
        account_id = ?config.account.account_id,
        authenticated = config.auth.is_some(),
        "loaded fiks io configuration"
    );
    Ok(config)
}
