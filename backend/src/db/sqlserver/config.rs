//! SQL Server connection settings and environment variable handling.

use std::env;

use crate::db::error::{SourceError, SourceResult};

/// Authentication method to use when connecting to SQL Server.
#[derive(Debug, Clone)]
pub enum DbAuthMethod {
    /// Traditional SQL Server username/password authentication.
    SqlPassword,
    /// Azure AD access token provided via env var.
    AadToken(String),
}

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQL Server hostname
    pub server: String,
    /// Database name
    pub database: String,
    pub username: String,
    pub password: String,
    /// SQL Server port (default: 1433)
    pub port: u16,
    /// Whether to trust the server certificate
    pub trust_cert: bool,
    pub auth_method: DbAuthMethod,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DB_SERVER` (required): SQL Server hostname
    /// - `DB_DATABASE` (required): Database name
    /// - `DB_USERNAME` / `DB_PASSWORD` (required for `sql_password`)
    /// - `DB_PORT` (optional, default: 1433)
    /// - `DB_TRUST_CERT` (optional, default: true)
    /// - `DB_AUTH_METHOD` (optional): `sql_password` | `aad_token`
    /// - `AZURE_ACCESS_TOKEN` (required if `DB_AUTH_METHOD=aad_token`)
    /// - `DB_MAX_CONNECTIONS` (optional, default: 4)
    pub fn from_env() -> SourceResult<Self> {
        let required = |key: &str| {
            env::var(key).map_err(|_| {
                SourceError::configuration(format!("{} environment variable not set", key))
            })
        };

        let server = required("DB_SERVER")?;
        let database = required("DB_DATABASE")?;
        let port = env::var("DB_PORT")
            .unwrap_or_else(|_| "1433".to_string())
            .parse()
            .map_err(|_| SourceError::configuration("DB_PORT must be a valid port number"))?;
        let trust_cert = env::var("DB_TRUST_CERT")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4);

        let auth_method_env = env::var("DB_AUTH_METHOD").unwrap_or_default();
        let (auth_method, username, password) = match auth_method_env.to_lowercase().as_str() {
            "aad_token" | "access_token" => {
                let token = required("AZURE_ACCESS_TOKEN")?;
                (DbAuthMethod::AadToken(token), String::new(), String::new())
            }
            "sql" | "sql_password" | "" => (
                DbAuthMethod::SqlPassword,
                required("DB_USERNAME")?,
                required("DB_PASSWORD")?,
            ),
            other => {
                return Err(SourceError::configuration(format!(
                    "Unsupported DB_AUTH_METHOD '{}'. Use sql_password or aad_token.",
                    other
                )))
            }
        };

        Ok(Self {
            server,
            database,
            username,
            password,
            port,
            trust_cert,
            auth_method,
            max_connections,
        })
    }
}
