//! Database layer
//!
//! The institute store. It supports:
//! - SQLite (default, single-binary deployment)
//! - MySQL (shared deployments)
//!
//! The driver is selected by configuration. Everything above this layer talks
//! to the store through the repository traits in [`repositories`], using the
//! filter grammar in [`query`].
//!
//! ```ignore
//! use aine::config::DatabaseConfig;
//! use aine::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! assert_eq!(pool.driver(), aine::config::DatabaseDriver::Sqlite);
//! ```

pub mod migrations;
pub mod pool;
pub mod query;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};
pub use query::{FilterValue, Op, QuerySpec};
