//! # ERP Dashboard Backend
//!
//! Periodically pulls department tables (purchase, production, packing,
//! shipment) from an ERP database, keeps the latest consistent snapshot in
//! memory, serves it as a JSON API and exports it to workbook and CSV reports.
//!
//! ## Architecture
//!
//! - [`db`]: the [`db::DataSource`] abstraction with a synthetic and a SQL Server variant
//! - [`models`]: departments, records, snapshots and the shared summary function
//! - [`services`]: snapshot store, single-flight refresh orchestrator, queries
//! - [`reports`]: atomic workbook/CSV writer and retention
//! - [`scheduler`]: daily and interval refresh timers
//! - [`http`]: Axum-based HTTP server and request handlers
//! - [`config`]: `erp.toml` + environment configuration

pub mod config;
pub mod db;
pub mod models;
pub mod reports;
pub mod scheduler;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
