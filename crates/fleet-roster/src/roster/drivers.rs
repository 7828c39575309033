//! Driver registration and status management.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{Driver, DriverId, DriverStatus};
use super::repository::{DriverRepository, RepositoryError};
use super::validation::{
    format_name, validate_admission_date, validate_cpf, validate_name, FieldErrors,
};

/// Driver form as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDraft {
    pub name: String,
    pub cpf: String,
    #[serde(default)]
    pub admitted_on: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<DriverStatus>,
}

/// Error raised by the driver service.
#[derive(Debug, thiserror::Error)]
pub enum DriverServiceError {
    #[error("invalid driver: {0}")]
    Validation(FieldErrors),
    #[error("a driver with CPF {0} is already registered")]
    DuplicateCpf(String),
    #[error("driver {0} not found")]
    NotFound(DriverId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct DriverService {
    repository: Arc<dyn DriverRepository>,
}

impl DriverService {
    pub fn new(repository: Arc<dyn DriverRepository>) -> Self {
        Self { repository }
    }

    /// Validates the form against `today` and stores the driver with a
    /// title-cased name and a digits-only CPF.
    pub async fn register(
        &self,
        draft: DriverDraft,
        today: NaiveDate,
    ) -> Result<Driver, DriverServiceError> {
        let mut errors = FieldErrors::new();

        let name = format_name(draft.name.trim());
        errors.check("name", validate_name(&name));
        let cpf = errors.check("cpf", validate_cpf(&draft.cpf));
        let admitted_on = errors.check(
            "admitted_on",
            validate_admission_date(draft.admitted_on, today),
        );

        errors
            .into_result()
            .map_err(DriverServiceError::Validation)?;
        let (Some(cpf), Some(admitted_on)) = (cpf, admitted_on) else {
            return Err(DriverServiceError::Validation(FieldErrors::new()));
        };

        if self.repository.find_by_cpf(&cpf).await?.is_some() {
            return Err(DriverServiceError::DuplicateCpf(cpf));
        }

        let driver = Driver {
            id: DriverId::generate(),
            name,
            cpf: cpf.clone(),
            admitted_on,
            status: draft.status.unwrap_or_default(),
        };

        match self.repository.insert(driver).await {
            Ok(stored) => {
                info!(driver_id = %stored.id, status = stored.status.label(), "driver registered");
                Ok(stored)
            }
            Err(RepositoryError::Conflict) => Err(DriverServiceError::DuplicateCpf(cpf)),
            Err(err) => {
                warn!(error = %err, "failed to register driver");
                Err(err.into())
            }
        }
    }

    pub async fn update_status(
        &self,
        id: &DriverId,
        status: DriverStatus,
    ) -> Result<Driver, DriverServiceError> {
        let mut driver = self
            .repository
            .fetch(id)
            .await?
            .ok_or_else(|| DriverServiceError::NotFound(id.clone()))?;
        if driver.status == status {
            return Ok(driver);
        }
        driver.status = status;
        self.repository.update(driver.clone()).await?;
        info!(driver_id = %id, status = status.label(), "driver status changed");
        Ok(driver)
    }

    pub async fn fetch(&self, id: &DriverId) -> Result<Driver, DriverServiceError> {
        self.repository
            .fetch(id)
            .await?
            .ok_or_else(|| DriverServiceError::NotFound(id.clone()))
    }

    /// Every driver, optionally narrowed to one status.
    pub async fn list(
        &self,
        status: Option<DriverStatus>,
    ) -> Result<Vec<Driver>, DriverServiceError> {
        let drivers = self.repository.list().await?;
        Ok(match status {
            Some(status) => drivers
                .into_iter()
                .filter(|driver| driver.status == status)
                .collect(),
            None => drivers,
        })
    }
}
