//! Data source factory.
//!
//! Chooses the [`DataSource`] implementation from configuration so the
//! extraction code never branches on "demo vs. live" itself.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::error::{SourceError, SourceResult};
use super::source::DataSource;
use super::synthetic::SyntheticSource;
use crate::config::SourceSettings;

/// Data source type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// Seeded demo-data generator
    Synthetic,
    /// Live SQL Server extraction
    SqlServer,
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "synthetic" | "demo" => Ok(Self::Synthetic),
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

/// Factory for creating data source instances.
pub struct SourceFactory;

impl SourceFactory {
    /// Create the data source described by `settings`.
    pub fn create(settings: &SourceSettings) -> SourceResult<Arc<dyn DataSource>> {
        let source_type = SourceType::from_str(&settings.source_type)
            .map_err(|e| SourceError::configuration(e).with_operation("create_source"))?;

        match source_type {
            SourceType::Synthetic => Ok(Self::create_synthetic(settings)),
            SourceType::SqlServer => {
                #[cfg(feature = "sqlserver-source")]
                {
                    let timeout = Duration::from_secs(settings.fetch_timeout_secs);
                    let source = super::sqlserver::SqlServerSource::from_env(timeout)?;
                    Ok(Arc::new(source) as Arc<dyn DataSource>)
                }
                #[cfg(not(feature = "sqlserver-source"))]
                {
                    Err(SourceError::configuration(
                        "SQL Server source feature not enabled",
                    )
                    .with_operation("create_source"))
                }
            }
        }
    }

    /// Create the demo-data generator.
    pub fn create_synthetic(settings: &SourceSettings) -> Arc<dyn DataSource> {
        Arc::new(SyntheticSource::new(settings.seed, settings.records))
    }

    /// Per-department fetch timeout configured for the source.
    pub fn fetch_timeout(settings: &SourceSettings) -> Duration {
        Duration::from_secs(settings.fetch_timeout_secs.max(1))
    }
}
