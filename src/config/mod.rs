//! Configuration loading and management for the payslip engine.
//!
//! This module loads the application configuration from a YAML file:
//! server binding, the civil calendar used for date defaults and the
//! overtime cutoff, and the store's isolation level.
//!
//! # Example
//!
//! ```no_run
//! use payslip_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/payslip.yaml").unwrap();
//! println!("Listening on {}", config.config().server.bind_addr);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{AppConfig, Backend, CalendarConfig, Isolation, ServerConfig, StoreConfig};
