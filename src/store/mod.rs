pub mod users;
pub mod availability;
pub mod schedules;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::Result;

pub use availability::{AvailabilityRecord, AvailabilityStore};
pub use schedules::{PublishedSchedule, ScheduleStore, StoredOption};
pub use users::{EmployeeSummary, GoogleProfile, NewUser, Role, User, UserStore};

/// Opens the database (creating the file if needed) and applies migrations.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every connection to `:memory:` is its own database, so keep exactly one alive.
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!(database_url, "Database ready");

    Ok(pool)
}

/// All repositories, sharing one pool.
pub struct Stores {
    pub users: UserStore,
    pub availability: AvailabilityStore,
    pub schedules: ScheduleStore,
}

impl Stores {
    pub fn new(pool: SqlitePool, password_hash_cost: u32) -> Self {
        Self {
            // SqlitePool is reference counted, cloning is cheap
            users: UserStore::new(pool.clone(), password_hash_cost),
            availability: AvailabilityStore::new(pool.clone()),
            schedules: ScheduleStore::new(pool),
        }
    }
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database")
}
