//! Employee salaries.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use super::two_decimals;
use crate::error::{EngineError, EngineResult};
use crate::models::UserId;
use crate::store::{self, Store};

/// Holds each employee's current monthly salary.
///
/// The payroll run freezes whatever salary is current when it executes.
#[derive(Debug, Clone)]
pub struct EmployeeDirectory {
    store: Arc<dyn Store>,
}

impl EmployeeDirectory {
    /// Creates a directory over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Sets or replaces a user's monthly salary.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a negative salary or one finer than cents.
    pub async fn set_salary(&self, user_id: UserId, salary: Decimal) -> EngineResult<f64> {
        if salary < Decimal::ZERO {
            return Err(EngineError::invalid_input("salary must be >= 0"));
        }
        let salary = two_decimals("salary", salary)?;

        let mut tx = self.store.begin().await?;
        let outcome = tx
            .upsert_salary(user_id, salary)
            .await
            .map_err(EngineError::from);
        store::finish(tx, outcome).await?;

        info!(user_id, "Salary updated");
        Ok(salary)
    }

    /// A user's current monthly salary.
    pub async fn salary_of(&self, user_id: UserId) -> EngineResult<f64> {
        let mut tx = self.store.begin_read().await?;
        let outcome = tx
            .find_salary(user_id)
            .await
            .map_err(EngineError::from)
            .and_then(|found| found.ok_or_else(|| EngineError::not_found("salary", user_id)));
        store::finish(tx, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use std::str::FromStr;

    fn directory() -> EmployeeDirectory {
        EmployeeDirectory::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn test_set_salary_upserts() {
        let directory = directory();
        directory
            .set_salary(1, Decimal::from(5_000_000))
            .await
            .unwrap();
        directory
            .set_salary(1, Decimal::from_str("7000000.50").unwrap())
            .await
            .unwrap();

        assert_eq!(directory.salary_of(1).await.unwrap(), 7_000_000.5);
    }

    #[tokio::test]
    async fn test_zero_salary_is_allowed() {
        let directory = directory();
        assert_eq!(directory.set_salary(2, Decimal::ZERO).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_negative_salary_is_rejected() {
        let err = directory()
            .set_salary(1, Decimal::from(-1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_unknown_salary_is_not_found() {
        let err = directory().salary_of(99).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "salary not found: 99");
    }
}
