//! Data source layer.
//!
//! The refresh pipeline only sees the [`DataSource`] trait. Which
//! implementation backs it is decided once, at startup, by [`SourceFactory`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  RefreshOrchestrator (services::refresh)      │
//! └───────────────────┬──────────────────────────┘
//!                     │ Arc<dyn DataSource>
//!        ┌────────────┴─────────────┐
//!        │                          │
//! ┌──────▼────────────┐   ┌─────────▼─────────────┐
//! │  SyntheticSource   │   │  SqlServerSource       │
//! │  (demo generator)  │   │  (sqlserver-source)    │
//! └───────────────────┘   └───────────────────────┘
//! ```

pub mod error;
pub mod factory;
pub mod source;
#[cfg(feature = "sqlserver-source")]
pub mod sqlserver;
pub mod synthetic;

pub use error::{ErrorContext, FailureReason, SourceError, SourceResult};
pub use factory::{SourceFactory, SourceType};
pub use source::DataSource;
pub use synthetic::{RecordCounts, SyntheticSource};
