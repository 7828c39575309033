//! Backend ports. The hosted data backend sits behind these traits so the
//! services can be exercised against in-memory adapters.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    Driver, DriverEvaluation, DriverId, EvaluationItem, EvaluationItemId, MonthlyRating, Role,
    UserId,
};
use super::settings::Settings;
use super::users::UserProfile;

/// Error enumeration for backend failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// `drivers` collection.
#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn insert(&self, driver: Driver) -> Result<Driver, RepositoryError>;
    async fn update(&self, driver: Driver) -> Result<(), RepositoryError>;
    async fn fetch(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError>;
    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<Driver>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Driver>, RepositoryError>;
}

/// `evaluation_items` collection.
#[async_trait]
pub trait EvaluationItemRepository: Send + Sync {
    async fn insert(&self, item: EvaluationItem) -> Result<EvaluationItem, RepositoryError>;
    async fn update(&self, item: EvaluationItem) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &EvaluationItemId) -> Result<(), RepositoryError>;
    /// Ordered by weight, heaviest first.
    async fn list(&self) -> Result<Vec<EvaluationItem>, RepositoryError>;
}

/// `driver_evaluations` collection. Append-only.
#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    async fn insert_batch(
        &self,
        evaluations: Vec<DriverEvaluation>,
    ) -> Result<Vec<DriverEvaluation>, RepositoryError>;
    /// Newest first.
    async fn for_driver(&self, driver_id: &DriverId)
        -> Result<Vec<DriverEvaluation>, RepositoryError>;
}

/// Monthly ratings collection (`avaliacoes_mensais` on the hosted backend).
#[async_trait]
pub trait MonthlyRatingRepository: Send + Sync {
    async fn find(
        &self,
        driver_id: &DriverId,
        month: NaiveDate,
    ) -> Result<Option<MonthlyRating>, RepositoryError>;
    async fn insert(&self, rating: MonthlyRating) -> Result<MonthlyRating, RepositoryError>;
    async fn update(&self, rating: MonthlyRating) -> Result<(), RepositoryError>;
    async fn for_month(&self, month: NaiveDate) -> Result<Vec<MonthlyRating>, RepositoryError>;
}

/// `user_settings` collection, one row per user.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn load(&self, user_id: &UserId) -> Result<Option<Settings>, RepositoryError>;
    async fn upsert(&self, user_id: &UserId, settings: &Settings) -> Result<(), RepositoryError>;
}

/// `users` profiles plus their `user_roles` assignment.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, profile: UserProfile) -> Result<UserProfile, RepositoryError>;
    /// Replaces any earlier assignment; one role per user.
    async fn assign_role(&self, user_id: &UserId, role: Role) -> Result<(), RepositoryError>;
    async fn role_of(&self, user_id: &UserId) -> Result<Option<Role>, RepositoryError>;
    /// Newest first.
    async fn list(&self) -> Result<Vec<UserProfile>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
}

/// Authentication failures surfaced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account already exists for {0}")]
    EmailTaken(String),
    #[error("authentication backend unavailable: {0}")]
    Unavailable(String),
}

/// Sign-in surface of the hosted backend.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in(&self, credentials: Credentials) -> Result<Session, AuthError>;
    async fn sign_up(&self, credentials: Credentials) -> Result<UserId, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    async fn current_user(&self) -> Result<Option<UserId>, AuthError>;
}
