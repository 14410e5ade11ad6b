//! Connection management: initialization, pooling and migrations.

use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use diesel::connection::{Connection, SimpleConnection};
use diesel::r2d2;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;
use diesel::{QueryableByName, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::StoreConfig;
use crate::errors::{IntoCore, StorageError};
use spendbook_core::errors::{DatabaseError, Error, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// File name of the database inside the data directory.
pub const DB_FILE_NAME: &str = "spendbook.db";

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub mod write_actor;
pub use write_actor::{spawn_writer, WriteHandle};

/// Creates the database file if needed and switches it to WAL mode.
pub fn init(config: &StoreConfig) -> Result<()> {
    let db_path = &config.db_path;

    if let Some(db_dir) = Path::new(db_path).parent() {
        if !db_dir.as_os_str().is_empty() && !db_dir.exists() {
            fs::create_dir_all(db_dir).map_err(StorageError::from)?;
        }
    }

    let mut conn = SqliteConnection::establish(db_path).into_core()?;
    conn.batch_execute(&format!(
        "PRAGMA journal_mode = WAL; \
         PRAGMA foreign_keys = ON; \
         PRAGMA busy_timeout = {}; \
         PRAGMA synchronous = NORMAL;",
        config.busy_timeout_ms
    ))
    .into_core()?;

    Ok(())
}

pub fn create_pool(config: &StoreConfig) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(config.db_path.as_str());
    let pool = r2d2::Pool::builder()
        .max_size(config.pool_size)
        .min_idle(Some(1)) // Keep at least one connection ready
        .connection_timeout(config.connection_timeout)
        .connection_customizer(Box::new(ConnectionCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::PoolCreationFailed(e.to_string())))?;
    Ok(Arc::new(pool))
}

/// Applies pending migrations.
///
/// With `recreate_on_incompatible_schema` a failed run drops every table and
/// migrates again from an empty database. All stored expenses are lost.
pub fn run_migrations(pool: &DbPool, recreate_on_incompatible_schema: bool) -> Result<()> {
    info!("Running database migrations");
    let mut connection = get_connection(pool)?;

    match apply_pending(&mut connection) {
        Ok(()) => Ok(()),
        Err(e) if recreate_on_incompatible_schema => {
            warn!(
                "Migrations failed on the existing schema ({}), recreating the database",
                e
            );
            drop_all_tables(&mut connection)?;
            apply_pending(&mut connection)
        }
        Err(e) => Err(e),
    }
}

fn apply_pending(connection: &mut SqliteConnection) -> Result<()> {
    let result = connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
        error!("Database migration failed: {}", e);
        Error::Database(DatabaseError::MigrationFailed(e.to_string()))
    })?;

    if result.is_empty() {
        info!("No pending migrations to apply.");
    } else {
        info!("Applied the following migrations:");
        for migration_version in &result {
            info!("  - {}", migration_version);
        }
    }

    Ok(())
}

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = Text)]
    name: String,
}

fn drop_all_tables(connection: &mut SqliteConnection) -> Result<()> {
    let tables: Vec<TableName> = diesel::sql_query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .load(connection)
    .into_core()?;

    let mut statements = String::from("PRAGMA foreign_keys = OFF;");
    for table in &tables {
        info!("Dropping table {}", table.name);
        statements.push_str(&format!(
            " DROP TABLE IF EXISTS \"{}\";",
            table.name.replace('"', "\"\"")
        ));
    }
    statements.push_str(" PRAGMA foreign_keys = ON;");
    connection.batch_execute(&statements).into_core()
}

/// Resolves the database path: `DATABASE_URL` if set, otherwise
/// `<data_dir>/spendbook.db`.
pub fn get_db_path(data_dir: &str) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        Path::new(data_dir)
            .join(DB_FILE_NAME)
            .to_string_lossy()
            .into_owned()
    })
}

/// Gets a connection from the pool
pub fn get_connection(pool: &Pool<ConnectionManager<SqliteConnection>>) -> Result<DbConnection> {
    pool.get().into_core()
}

#[derive(Debug)]
struct ConnectionCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = {}; \
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)?;

        Ok(())
    }
}
