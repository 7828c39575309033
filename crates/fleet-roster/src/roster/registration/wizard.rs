use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::data::UserRegistrationData;
use super::drafts::{DraftStore, DraftStoreError};
use super::{RegistrationError, RegistrationStage};
use crate::roster::domain::UserId;
use crate::roster::repository::{AuthGateway, Credentials, UserRepository};
use crate::roster::users::UserProfile;

pub const DRAFT_DATA_KEY: &str = "registration_data";
pub const DRAFT_STAGE_KEY: &str = "registration_stage";

/// Backend call made once the whole draft has been confirmed.
#[async_trait]
pub trait RegistrationSubmitter: Send + Sync {
    async fn submit(&self, data: &UserRegistrationData) -> Result<UserId, RegistrationError>;
}

/// Creates the account, then writes the profile row and the chosen role.
pub struct AuthRegistrationSubmitter {
    auth: Arc<dyn AuthGateway>,
    users: Arc<dyn UserRepository>,
}

impl AuthRegistrationSubmitter {
    pub fn new(auth: Arc<dyn AuthGateway>, users: Arc<dyn UserRepository>) -> Self {
        Self { auth, users }
    }
}

#[async_trait]
impl RegistrationSubmitter for AuthRegistrationSubmitter {
    async fn submit(&self, data: &UserRegistrationData) -> Result<UserId, RegistrationError> {
        let user_id = self
            .auth
            .sign_up(Credentials {
                email: data.email.trim().to_string(),
                password: data.password.clone(),
            })
            .await?;

        let profile = UserProfile::from_registration(user_id.clone(), data);
        self.users.insert(profile).await?;
        self.users.assign_role(&user_id, data.role).await?;
        Ok(user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageProgress {
    pub stage: RegistrationStage,
    pub title: &'static str,
    pub is_complete: bool,
    pub is_current: bool,
}

/// Stage navigation and draft persistence for operator sign-up.
pub struct RegistrationWizard {
    drafts: Arc<dyn DraftStore>,
    data: UserRegistrationData,
    stage: RegistrationStage,
    completed: [bool; 4],
}

impl RegistrationWizard {
    /// Restores a saved draft, or starts empty when there is none or it cannot be read.
    ///
    /// Stages before the restored one count as complete only if their rules
    /// still pass; the wizard resumes at the first stage that does not.
    pub fn mount(drafts: Arc<dyn DraftStore>) -> Self {
        let mut wizard = Self {
            drafts,
            data: UserRegistrationData::default(),
            stage: RegistrationStage::BasicInfo,
            completed: [false; 4],
        };

        let Some((data, saved_stage)) = wizard.read_draft() else {
            return wizard;
        };
        wizard.data = data;

        for stage in RegistrationStage::ordered() {
            if stage >= saved_stage {
                break;
            }
            if wizard.data.validate_stage(stage).is_err() {
                debug!(stage = stage.label(), "restored draft fails an earlier stage");
                wizard.stage = stage;
                return wizard;
            }
            wizard.completed[stage.index()] = true;
        }
        wizard.stage = saved_stage;
        debug!(stage = saved_stage.label(), "registration draft restored");
        wizard
    }

    fn read_draft(&self) -> Option<(UserRegistrationData, RegistrationStage)> {
        let raw_data = match self.drafts.load(DRAFT_DATA_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                debug!(error = %err, "registration draft unreadable");
                return None;
            }
        };
        let data = match serde_json::from_str::<UserRegistrationData>(&raw_data) {
            Ok(data) => data,
            Err(err) => {
                debug!(error = %err, "registration draft is corrupt");
                return None;
            }
        };

        let stage = match self.drafts.load(DRAFT_STAGE_KEY) {
            Ok(Some(raw)) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(RegistrationStage::from_number),
            Ok(None) => Some(RegistrationStage::BasicInfo),
            Err(err) => {
                debug!(error = %err, "registration stage unreadable");
                None
            }
        };
        match stage {
            Some(stage) => Some((data, stage)),
            None => {
                debug!("registration stage is corrupt");
                None
            }
        }
    }

    pub fn data(&self) -> &UserRegistrationData {
        &self.data
    }

    pub fn stage(&self) -> RegistrationStage {
        self.stage
    }

    pub fn is_complete(&self, stage: RegistrationStage) -> bool {
        self.completed[stage.index()]
    }

    pub fn progress(&self) -> Vec<StageProgress> {
        RegistrationStage::ordered()
            .into_iter()
            .map(|stage| StageProgress {
                stage,
                title: stage.label(),
                is_complete: self.is_complete(stage),
                is_current: stage == self.stage,
            })
            .collect()
    }

    /// Applies a field change and writes the draft and stage to the draft store.
    ///
    /// A completed stage whose rules no longer pass after the edit is reopened.
    pub fn save_progress<F>(&mut self, edit: F) -> Result<(), DraftStoreError>
    where
        F: FnOnce(&mut UserRegistrationData),
    {
        edit(&mut self.data);
        self.reopen_invalid_stages();
        self.persist()
    }

    fn reopen_invalid_stages(&mut self) {
        for stage in RegistrationStage::ordered() {
            if self.completed[stage.index()] && self.data.validate_stage(stage).is_err() {
                debug!(stage = stage.label(), "edit reopened a completed stage");
                self.completed[stage.index()] = false;
            }
        }
    }

    fn persist(&self) -> Result<(), DraftStoreError> {
        let serialized = serde_json::to_string(&self.data)?;
        self.drafts.save(DRAFT_DATA_KEY, &serialized)?;
        self.drafts
            .save(DRAFT_STAGE_KEY, &self.stage.number().to_string())?;
        Ok(())
    }

    /// Validates the current stage's form and marks it complete when it passes.
    pub fn complete_stage(&mut self) -> Result<(), RegistrationError> {
        self.data
            .validate_stage(self.stage)
            .map_err(RegistrationError::Validation)?;
        self.completed[self.stage.index()] = true;
        Ok(())
    }

    /// Moves forward one stage. Staying put on the last stage is not an error.
    pub fn next(&mut self) -> Result<RegistrationStage, RegistrationError> {
        if !self.is_complete(self.stage) {
            return Err(RegistrationError::StageIncomplete(self.stage));
        }
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
        Ok(self.stage)
    }

    pub fn previous(&mut self) -> RegistrationStage {
        if let Some(previous) = self.stage.previous() {
            self.stage = previous;
        }
        self.stage
    }

    /// Completes the verification stage and hands the draft to `submitter`.
    ///
    /// On success the saved draft is cleared and the wizard starts over.
    pub async fn submit(
        &mut self,
        submitter: &dyn RegistrationSubmitter,
    ) -> Result<UserId, RegistrationError> {
        if self.stage != RegistrationStage::Verification {
            return Err(RegistrationError::NotAtFinalStage);
        }
        self.complete_stage()?;
        self.reopen_invalid_stages();
        if let Some(stage) = RegistrationStage::ordered()
            .into_iter()
            .find(|stage| !self.is_complete(*stage))
        {
            return Err(RegistrationError::StageIncomplete(stage));
        }

        let user_id = match submitter.submit(&self.data).await {
            Ok(user_id) => user_id,
            Err(err) => {
                warn!(error = %err, "operator registration rejected");
                return Err(err);
            }
        };
        info!(%user_id, role = self.data.role.label(), "operator registered");

        self.drafts.remove(DRAFT_DATA_KEY)?;
        self.drafts.remove(DRAFT_STAGE_KEY)?;
        self.data = UserRegistrationData::default();
        self.stage = RegistrationStage::BasicInfo;
        self.completed = [false; 4];
        Ok(user_id)
    }
}
