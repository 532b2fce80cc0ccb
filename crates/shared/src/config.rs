//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Debt ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Category to currency routing.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Inventory reporting settings.
    #[serde(default)]
    pub inventory: InventoryConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT settings as read from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    43_200 // 12 hours, one shop shift
}

/// Debt ledger settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Entries older than this many days are removed by the retention purge.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

fn default_retention_days() -> u32 {
    365
}

/// Category to settlement currency routing.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Product categories settled in EUR. Everything else settles in MKD.
    #[serde(default = "default_eur_categories")]
    pub eur_categories: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            eur_categories: default_eur_categories(),
        }
    }
}

fn default_eur_categories() -> Vec<String> {
    vec!["smartphones".to_string()]
}

/// Inventory reporting settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    /// Products at or below this stock level are reported as low stock.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

fn default_low_stock_threshold() -> i32 {
    5
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources in order of precedence (last wins): `config/default`,
    /// `config/{RUN_MODE}`, then `KASA__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("KASA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pricing.eur_categories")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
