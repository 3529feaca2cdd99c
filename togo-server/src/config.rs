/// Configuration management for the togo server
///
/// Configuration is read from the process environment (after loading a `.env`
/// file if one is present) through the `config` crate.
///
/// # Environment Variables
///
/// Required:
///
/// - `TOGO_DB_HOST`, `TOGO_DB_PORT`: database server address
/// - `TOGO_DB_USERNAME`, `TOGO_DB_PASSWORD`: database role
/// - `TOGO_DB_DATABASE_NAME`: database to open
///
/// Optional:
///
/// - `TOGO_POOL_MAX_CONNECTIONS` (default: 10)
/// - `TOGO_POOL_ACQUIRE_TIMEOUT_SECONDS` (default: 30)
/// - `TOGO_BOOTSTRAP_USERNAME`, `TOGO_BOOTSTRAP_PASSWORD`, `TOGO_BOOTSTRAP_MAX_TODO`:
///   the user seeded into an empty directory (default: firstUser / example / 5)
/// - `RUST_LOG`: log filter (default: `togo_server=debug,togo_store=info`)
///
/// # Example
///
/// ```no_run
/// use togo_server::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("connecting to {}", config.database_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::Deserialize;
use togo_store::db::pool::{PoolSettings, StoreConfig};
use togo_store::db::schema::BootstrapUser;
use validator::Validate;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection parameters
    pub store: StoreConfig,

    /// Connection pool tuning
    pub pool: PoolSettings,

    /// User seeded on first start
    pub bootstrap: BootstrapUser,
}

/// Pool overrides; unset fields keep [`PoolSettings::default`]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PoolOverrides {
    max_connections: Option<u32>,
    acquire_timeout_seconds: Option<u64>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct BootstrapOverrides {
    username: Option<String>,
    password: Option<String>,
    max_todo: Option<i32>,
}

type Vars = Option<config::Map<String, String>>;

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A required `TOGO_DB_*` variable is missing
    /// - A variable has a value of the wrong type
    /// - The connection parameters fail validation
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(None)
    }

    /// Loads configuration from `vars` instead of the process environment
    fn from_vars(vars: Vars) -> anyhow::Result<Self> {
        let store: StoreConfig = section("TOGO_DB", vars.clone())
            .context("invalid TOGO_DB_* configuration")?;
        store
            .validate()
            .context("invalid TOGO_DB_* configuration")?;

        let overrides: PoolOverrides = section("TOGO_POOL", vars.clone())
            .context("invalid TOGO_POOL_* configuration")?;
        let mut pool = PoolSettings::default();
        if let Some(max_connections) = overrides.max_connections {
            if max_connections == 0 {
                anyhow::bail!("TOGO_POOL_MAX_CONNECTIONS must be greater than zero");
            }
            pool.max_connections = max_connections;
            pool.min_connections = pool.min_connections.min(max_connections);
        }
        if let Some(acquire_timeout_seconds) = overrides.acquire_timeout_seconds {
            pool.acquire_timeout_seconds = acquire_timeout_seconds;
        }

        let overrides: BootstrapOverrides = section("TOGO_BOOTSTRAP", vars)
            .context("invalid TOGO_BOOTSTRAP_* configuration")?;
        let defaults = BootstrapUser::default();
        let bootstrap = BootstrapUser {
            username: overrides.username.unwrap_or(defaults.username),
            password: overrides.password.unwrap_or(defaults.password),
            max_todo: overrides.max_todo.unwrap_or(defaults.max_todo),
        };
        if bootstrap.username.is_empty() {
            anyhow::bail!("TOGO_BOOTSTRAP_USERNAME must not be empty");
        }
        if bootstrap.max_todo < 0 {
            anyhow::bail!("TOGO_BOOTSTRAP_MAX_TODO must not be negative");
        }

        Ok(Self {
            store,
            pool,
            bootstrap,
        })
    }

    /// Returns the database address for log lines (no credentials)
    pub fn database_address(&self) -> String {
        format!(
            "{}:{}/{}",
            self.store.host, self.store.port, self.store.database_name
        )
    }
}

/// Deserializes the variables sharing `prefix` into `T`
fn section<T: serde::de::DeserializeOwned>(prefix: &str, vars: Vars) -> Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(
            config::Environment::with_prefix(prefix)
                .try_parsing(true)
                .source(vars),
        )
        .build()?
        .try_deserialize()
}
