//! Connection pool for the SQL Server source.

use bb8::Pool;
use bb8_tiberius::ConnectionManager;
use std::time::Duration;
use tiberius::Config;

use super::config::{DbAuthMethod, DbConfig};
use crate::db::error::SourceError;

/// Type alias for the database connection pool.
pub type DbPool = Pool<ConnectionManager>;

/// Build a Tiberius config from the resolved settings.
pub fn build_tiberius_config(config: &DbConfig) -> Config {
    let mut sql_config = Config::new();
    sql_config.host(&config.server);
    sql_config.port(config.port);
    sql_config.database(&config.database);

    match &config.auth_method {
        DbAuthMethod::SqlPassword => {
            sql_config.authentication(tiberius::AuthMethod::sql_server(
                &config.username,
                &config.password,
            ));
        }
        DbAuthMethod::AadToken(token) => {
            sql_config.authentication(tiberius::AuthMethod::aad_token(token));
        }
    }

    sql_config.encryption(tiberius::EncryptionLevel::Required);

    if config.trust_cert {
        sql_config.trust_cert();
    }

    sql_config
}

/// Create the connection pool.
///
/// Connections are opened lazily, so an unreachable server surfaces on the
/// first fetch rather than at startup.
pub fn build_pool(config: &DbConfig, connect_timeout: Duration) -> DbPool {
    let manager = ConnectionManager::new(build_tiberius_config(config));

    Pool::builder()
        .max_size(config.max_connections.max(1))
        .connection_timeout(connect_timeout)
        .build_unchecked(manager)
}

/// Map a pool checkout failure onto the source taxonomy.
pub fn checkout_error<E: std::fmt::Display>(err: bb8::RunError<E>) -> SourceError {
    match err {
        bb8::RunError::TimedOut => SourceError::timeout("Timed out waiting for a pooled connection"),
        bb8::RunError::User(e) => SourceError::unreachable(format!(
            "Failed to connect to SQL Server: {}",
            e
        )),
    }
}
