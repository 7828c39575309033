//! Four-stage operator sign-up with a locally persisted draft.

mod data;
mod drafts;
mod wizard;

pub use super::domain::Role;
pub use data::{
    AccessLevel, CommunicationPreference, ModuleAccess, PermissionSet, UserRegistrationData,
};
pub use drafts::{DraftStore, DraftStoreError, FileDraftStore, InMemoryDraftStore};
pub use wizard::{
    AuthRegistrationSubmitter, RegistrationSubmitter, RegistrationWizard, StageProgress,
    DRAFT_DATA_KEY, DRAFT_STAGE_KEY,
};

use serde::{Deserialize, Serialize};

use super::repository::{AuthError, RepositoryError};
use super::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStage {
    BasicInfo,
    RoleSelection,
    Permissions,
    Verification,
}

impl RegistrationStage {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::BasicInfo,
            Self::RoleSelection,
            Self::Permissions,
            Self::Verification,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic information",
            Self::RoleSelection => "Role and department",
            Self::Permissions => "Permissions",
            Self::Verification => "Verification",
        }
    }

    /// 1-based position, as persisted in the draft store.
    pub const fn number(self) -> u8 {
        match self {
            Self::BasicInfo => 1,
            Self::RoleSelection => 2,
            Self::Permissions => 3,
            Self::Verification => 4,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|stage| stage.number() == number)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    const fn index(self) -> usize {
        self.number() as usize - 1
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("stage `{}` is not complete", .0.label())]
    StageIncomplete(RegistrationStage),
    #[error("registration can only be submitted from the verification stage")]
    NotAtFinalStage,
    #[error("invalid registration data: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Drafts(#[from] DraftStoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
