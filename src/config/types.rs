//! Configuration types for the payslip engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from the YAML configuration file. Every field has a
//! default, so an empty file is a valid configuration.

use chrono::NaiveTime;
use serde::Deserialize;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API listens on.
    pub bind_addr: String,
    /// Upper bound on the time spent handling one request.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Civil calendar settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Offset of the civil zone from UTC, in hours.
    pub utc_offset_hours: i32,
    /// Local time from which same-day overtime may be logged.
    pub overtime_cutoff: NaiveTime,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 7,
            overtime_cutoff: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Transaction isolation of writing transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Writers behave as if run one at a time; every check-then-act is
    /// race-free. PostgreSQL `SERIALIZABLE`.
    #[default]
    Serializable,
    /// Writers read a private snapshot and constraints are re-checked at
    /// commit. PostgreSQL `REPEATABLE READ`.
    Snapshot,
}

/// Where the engine keeps its tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// A PostgreSQL database reached through `database_url`.
    Postgres,
}

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which store implementation to run.
    pub backend: Backend,
    /// Transaction isolation level.
    pub isolation: Isolation,
    /// PostgreSQL connection string. `DATABASE_URL` overrides it.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            isolation: Isolation::default(),
            database_url: None,
            max_connections: 10,
        }
    }
}

/// The complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Civil calendar settings.
    pub calendar: CalendarConfig,
    /// Store settings.
    pub store: StoreConfig,
}
