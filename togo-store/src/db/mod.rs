/// Connection management for togo
///
/// # Modules
///
/// - `pool`: PostgreSQL pool creation, scoped acquisition, health and shutdown
/// - `schema`: Embedded migrations and bootstrap user seeding
/// - `cancel`: Cancellation token and deadline wrappers for store operations
///
/// # Example
///
/// ```no_run
/// use togo_store::db::pool::{close_pool, create_pool, PoolSettings, StoreConfig};
/// use togo_store::db::schema::{ensure_schema, BootstrapUser};
///
/// # async fn example(config: StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&config, &PoolSettings::default()).await?;
/// ensure_schema(&pool, &BootstrapUser::default()).await?;
///
/// // ... serve requests ...
///
/// close_pool(&pool).await;
/// # Ok(())
/// # }
/// ```

pub mod cancel;
pub mod pool;
pub mod schema;
