//! Application state for the payslip API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::clock::{CivilCalendar, Clock, SystemClock};
use crate::config::{Backend, ConfigLoader};
use crate::error::{EngineError, EngineResult};
use crate::service::{
    ActivityLedger, EmployeeDirectory, PayrollEngine, PayslipResolver, PeriodRegistry,
};
use crate::store::{MemoryStore, PgStore, Store};

/// Shared application state.
///
/// Holds the loaded configuration and one handle per engine component.
/// Every component shares the same store.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    periods: PeriodRegistry,
    ledger: ActivityLedger,
    directory: EmployeeDirectory,
    payroll: PayrollEngine,
    payslips: PayslipResolver,
}

impl AppState {
    /// Wires the engine over `store` and `clock`.
    ///
    /// Fails when the calendar section of the configuration is invalid.
    pub fn new(
        config: ConfigLoader,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
    ) -> EngineResult<Self> {
        let calendar = CivilCalendar::from_config(&config.config().calendar, Arc::clone(&clock))?;

        Ok(Self {
            periods: PeriodRegistry::new(Arc::clone(&store)),
            ledger: ActivityLedger::new(Arc::clone(&store), calendar),
            directory: EmployeeDirectory::new(Arc::clone(&store)),
            payroll: PayrollEngine::new(Arc::clone(&store), clock),
            payslips: PayslipResolver::new(store),
            config: Arc::new(config),
        })
    }

    /// Opens the configured store and wires the engine over it and the
    /// system clock.
    ///
    /// For the PostgreSQL backend `database_url` wins over
    /// `store.database_url`; pending migrations are applied before the
    /// state is returned.
    pub async fn connect(config: ConfigLoader, database_url: Option<&str>) -> EngineResult<Self> {
        let settings = &config.config().store;
        let store: Arc<dyn Store> = match settings.backend {
            Backend::Memory => Arc::new(MemoryStore::from_config(settings)),
            Backend::Postgres => {
                let url = database_url
                    .or(settings.database_url.as_deref())
                    .ok_or_else(|| EngineError::ConfigParseError {
                        path: "store.database_url".to_string(),
                        message: "required by the postgres backend (or set DATABASE_URL)"
                            .to_string(),
                    })?;
                let store = PgStore::connect(url, settings).await?;
                store.health_check().await?;
                store.migrate().await?;
                Arc::new(store)
            }
        };
        Self::new(config, store, Arc::new(SystemClock))
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// The period registry.
    pub fn periods(&self) -> &PeriodRegistry {
        &self.periods
    }

    /// The activity ledger.
    pub fn ledger(&self) -> &ActivityLedger {
        &self.ledger
    }

    /// The salary directory.
    pub fn directory(&self) -> &EmployeeDirectory {
        &self.directory
    }

    /// The payroll engine.
    pub fn payroll(&self) -> &PayrollEngine {
        &self.payroll
    }

    /// The payslip resolver.
    pub fn payslips(&self) -> &PayslipResolver {
        &self.payslips
    }
}
