//! Driver roster back office: validation, driver registration, weighted
//! evaluations, monthly ratings, operator registration drafts, operator
//! roles and settings, and the performance report.

pub mod domain;
pub mod drivers;
pub mod evaluation;
pub mod memory;
pub mod ratings;
pub mod registration;
pub mod report;
pub mod repository;
pub mod router;
pub mod settings;
pub mod users;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    Driver, DriverEvaluation, DriverId, DriverStatus, EvaluationId, EvaluationItem,
    EvaluationItemId, ItemWeight, MonthlyRating, RatingId, RatingStatus, Role, UserId,
};
pub use drivers::{DriverDraft, DriverService, DriverServiceError};
pub use evaluation::{
    aggregate_driver, display_score, DriverScorecard, EvaluationChange, EvaluationFeed,
    EvaluationService, EvaluationServiceError, ItemAverage, ItemDraft, ScoreEntry,
};
pub use ratings::{month_key, MonthlyRatingService, RatingServiceError, RatingUpsert};
pub use registration::{
    DraftStore, DraftStoreError, FileDraftStore, InMemoryDraftStore, RegistrationError,
    RegistrationStage, RegistrationSubmitter, RegistrationWizard, UserRegistrationData,
};
pub use report::{PerformanceReport, PerformanceRow, ReportError, ReportService};
pub use repository::{
    AuthError, AuthGateway, Credentials, DriverRepository, EvaluationItemRepository,
    EvaluationRepository, MonthlyRatingRepository, RepositoryError, Session, SettingsRepository,
    UserRepository,
};
pub use router::{roster_router, RosterState};
pub use settings::{
    FontSize, SaveOutcome, SaveTicket, Settings, SettingsError, SettingsPatch, SettingsStore,
    SubscriptionId, Theme,
};
pub use users::{AccessControl, AccessError, UserDirectory, UserProfile};
pub use validation::{FieldErrors, ValidationError};
