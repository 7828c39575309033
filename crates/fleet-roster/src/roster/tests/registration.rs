use std::sync::Arc;

use crate::roster::memory::{InMemoryAuthGateway, InMemoryUserRepository};
use crate::roster::registration::{
    AuthRegistrationSubmitter, DraftStore, FileDraftStore, InMemoryDraftStore, RegistrationError,
    RegistrationStage, RegistrationWizard, Role, DRAFT_DATA_KEY, DRAFT_STAGE_KEY,
};
use crate::roster::repository::{AuthError, AuthGateway, Credentials, UserRepository};

fn fill_basic_info(wizard: &mut RegistrationWizard) {
    wizard
        .save_progress(|data| {
            data.first_name = "Ana".to_string();
            data.last_name = "Souza".to_string();
            data.email = "ana.souza@fleet.com.br".to_string();
            data.phone_number = "11 98888-7777".to_string();
            data.password = "correct-horse".to_string();
            data.password_confirmation = "correct-horse".to_string();
            data.security_question = "First truck?".to_string();
            data.security_answer = "Scania".to_string();
        })
        .expect("save basic info");
}

fn advance_to_verification(wizard: &mut RegistrationWizard) {
    fill_basic_info(wizard);
    wizard.complete_stage().expect("basic info valid");
    wizard.next().expect("to role selection");

    wizard
        .save_progress(|data| {
            data.role = Role::Administrator;
            data.department = "Logistics".to_string();
        })
        .expect("save role");
    wizard.complete_stage().expect("role valid");
    wizard.next().expect("to permissions");

    wizard.complete_stage().expect("default permissions valid");
    wizard.next().expect("to verification");

    wizard
        .save_progress(|data| {
            data.terms_accepted = true;
            data.privacy_accepted = true;
        })
        .expect("save confirmations");
}

#[test]
fn fresh_wizard_starts_at_basic_info() {
    let wizard = RegistrationWizard::mount(Arc::new(InMemoryDraftStore::default()));
    assert_eq!(wizard.stage(), RegistrationStage::BasicInfo);
    assert!(wizard
        .progress()
        .iter()
        .all(|stage| !stage.is_complete));
    assert!(wizard.progress()[0].is_current);
}

#[test]
fn next_requires_the_current_stage_to_validate() {
    let mut wizard = RegistrationWizard::mount(Arc::new(InMemoryDraftStore::default()));
    assert!(matches!(
        wizard.next(),
        Err(RegistrationError::StageIncomplete(RegistrationStage::BasicInfo))
    ));

    wizard
        .save_progress(|data| {
            data.first_name = "Ana1".to_string();
            data.password = "short".to_string();
        })
        .expect("save");
    match wizard.complete_stage() {
        Err(RegistrationError::Validation(errors)) => {
            assert!(errors.get("first_name").is_some());
            assert_eq!(
                errors.get("password"),
                Some("password must have at least 8 characters")
            );
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
    assert!(!wizard.is_complete(RegistrationStage::BasicInfo));
}

#[test]
fn previous_stops_at_the_first_stage() {
    let mut wizard = RegistrationWizard::mount(Arc::new(InMemoryDraftStore::default()));
    fill_basic_info(&mut wizard);
    wizard.complete_stage().expect("valid");
    assert_eq!(wizard.next().expect("next"), RegistrationStage::RoleSelection);
    assert_eq!(wizard.previous(), RegistrationStage::BasicInfo);
    assert_eq!(wizard.previous(), RegistrationStage::BasicInfo);
    assert!(wizard.is_complete(RegistrationStage::BasicInfo));
}

#[test]
fn progress_is_restored_on_mount() {
    let drafts = Arc::new(InMemoryDraftStore::default());
    let mut wizard = RegistrationWizard::mount(drafts.clone());
    fill_basic_info(&mut wizard);
    wizard.complete_stage().expect("valid");
    wizard.next().expect("next");
    wizard
        .save_progress(|data| data.department = "Operations".to_string())
        .expect("save");

    assert_eq!(
        drafts.load(DRAFT_STAGE_KEY).expect("stage key").as_deref(),
        Some("2")
    );

    let resumed = RegistrationWizard::mount(drafts);
    assert_eq!(resumed.stage(), RegistrationStage::RoleSelection);
    assert!(resumed.is_complete(RegistrationStage::BasicInfo));
    assert!(!resumed.is_complete(RegistrationStage::RoleSelection));
    assert_eq!(resumed.data().department, "Operations");
    assert_eq!(resumed.data().first_name, "Ana");
}

#[test]
fn editing_a_completed_stage_reopens_it() {
    let mut wizard = RegistrationWizard::mount(Arc::new(InMemoryDraftStore::default()));
    fill_basic_info(&mut wizard);
    wizard.complete_stage().expect("valid");
    assert!(wizard.is_complete(RegistrationStage::BasicInfo));

    wizard
        .save_progress(|data| {
            data.email = "not-an-email".to_string();
            data.first_name = "An4".to_string();
        })
        .expect("save");

    assert!(!wizard.is_complete(RegistrationStage::BasicInfo));
    assert!(matches!(
        wizard.next(),
        Err(RegistrationError::StageIncomplete(RegistrationStage::BasicInfo))
    ));
}

#[tokio::test]
async fn submission_rechecks_stages_edited_after_completion() {
    let auth = Arc::new(InMemoryAuthGateway::default());
    let users = Arc::new(InMemoryUserRepository::default());
    let submitter = AuthRegistrationSubmitter::new(auth.clone(), users.clone());
    let mut wizard = RegistrationWizard::mount(Arc::new(InMemoryDraftStore::default()));
    advance_to_verification(&mut wizard);

    wizard
        .save_progress(|data| data.email = "ana.souza@".to_string())
        .expect("save");

    assert!(matches!(
        wizard.submit(&submitter).await,
        Err(RegistrationError::StageIncomplete(RegistrationStage::BasicInfo))
    ));
    assert_eq!(wizard.stage(), RegistrationStage::Verification);
    assert!(users.is_empty());
    assert!(auth
        .sign_in(Credentials {
            email: "ana.souza@".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .is_err());
}

#[test]
fn corrupt_drafts_are_ignored() {
    let drafts = Arc::new(InMemoryDraftStore::default());
    drafts.save(DRAFT_DATA_KEY, "{not json").expect("seed");
    drafts.save(DRAFT_STAGE_KEY, "3").expect("seed");
    let wizard = RegistrationWizard::mount(drafts.clone());
    assert_eq!(wizard.stage(), RegistrationStage::BasicInfo);
    assert_eq!(wizard.data().first_name, "");

    drafts.save(DRAFT_DATA_KEY, r#"{"first_name":"Ana"}"#).expect("seed");
    drafts.save(DRAFT_STAGE_KEY, "nine").expect("seed");
    let wizard = RegistrationWizard::mount(drafts);
    assert_eq!(wizard.stage(), RegistrationStage::BasicInfo);
    assert_eq!(wizard.data().first_name, "");
}

#[test]
fn resume_falls_back_to_the_first_invalid_stage() {
    let drafts = Arc::new(InMemoryDraftStore::default());
    drafts
        .save(DRAFT_DATA_KEY, r#"{"first_name":"Ana","department":"Ops"}"#)
        .expect("seed");
    drafts.save(DRAFT_STAGE_KEY, "3").expect("seed");

    let wizard = RegistrationWizard::mount(drafts);
    assert_eq!(wizard.stage(), RegistrationStage::BasicInfo);
    assert_eq!(wizard.data().first_name, "Ana");
    assert!(!wizard.is_complete(RegistrationStage::BasicInfo));
}

#[tokio::test]
async fn submission_creates_the_account_and_clears_the_draft() {
    let drafts = Arc::new(InMemoryDraftStore::default());
    let auth = Arc::new(InMemoryAuthGateway::default());
    let users = Arc::new(InMemoryUserRepository::default());
    let submitter = AuthRegistrationSubmitter::new(auth.clone(), users.clone());
    let mut wizard = RegistrationWizard::mount(drafts.clone());
    advance_to_verification(&mut wizard);
    assert!(!drafts.is_empty());

    let user_id = wizard.submit(&submitter).await.expect("registered");

    assert!(drafts.is_empty());
    assert_eq!(wizard.stage(), RegistrationStage::BasicInfo);
    assert_eq!(wizard.data().email, "");
    let session = auth
        .sign_in(Credentials {
            email: "ana.souza@fleet.com.br".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .expect("new account signs in");
    assert_eq!(session.user_id, user_id);

    assert_eq!(
        users.role_of(&user_id).await.expect("role lookup"),
        Some(Role::Administrator)
    );
    let profiles = users.list().await.expect("profiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].id, user_id);
    assert_eq!(profiles[0].full_name, "Ana Souza");
    assert_eq!(profiles[0].department, "Logistics");
    assert_eq!(profiles[0].phone_number.as_deref(), Some("+55 11 98888-7777"));
}

#[tokio::test]
async fn submission_requires_confirmations_and_final_stage() {
    let auth = Arc::new(InMemoryAuthGateway::default());
    let submitter =
        AuthRegistrationSubmitter::new(auth, Arc::new(InMemoryUserRepository::default()));
    let mut wizard = RegistrationWizard::mount(Arc::new(InMemoryDraftStore::default()));
    assert!(matches!(
        wizard.submit(&submitter).await,
        Err(RegistrationError::NotAtFinalStage)
    ));

    advance_to_verification(&mut wizard);
    wizard
        .save_progress(|data| data.privacy_accepted = false)
        .expect("save");
    match wizard.submit(&submitter).await {
        Err(RegistrationError::Validation(errors)) => {
            assert!(errors.get("privacy_accepted").is_some());
            assert!(errors.get("terms_accepted").is_none());
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_submission_keeps_the_draft() {
    let drafts = Arc::new(InMemoryDraftStore::default());
    let auth = Arc::new(InMemoryAuthGateway::default());
    auth.sign_up(Credentials {
        email: "ana.souza@fleet.com.br".to_string(),
        password: "another-pass".to_string(),
    })
    .await
    .expect("existing account");
    let users = Arc::new(InMemoryUserRepository::default());
    let submitter = AuthRegistrationSubmitter::new(auth, users.clone());

    let mut wizard = RegistrationWizard::mount(drafts.clone());
    advance_to_verification(&mut wizard);
    assert!(matches!(
        wizard.submit(&submitter).await,
        Err(RegistrationError::Auth(AuthError::EmailTaken(_)))
    ));
    assert_eq!(wizard.stage(), RegistrationStage::Verification);
    assert!(drafts.load(DRAFT_DATA_KEY).expect("load").is_some());
    assert!(users.is_empty());
}

#[test]
fn file_backed_drafts_survive_a_new_wizard() {
    let dir = std::env::temp_dir().join(format!(
        "fleet-roster-wizard-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);

    let mut wizard = RegistrationWizard::mount(Arc::new(FileDraftStore::new(&dir)));
    fill_basic_info(&mut wizard);

    let resumed = RegistrationWizard::mount(Arc::new(FileDraftStore::new(&dir)));
    assert_eq!(resumed.data().email, "ana.souza@fleet.com.br");
    assert_eq!(resumed.stage(), RegistrationStage::BasicInfo);
    assert!(dir.join(format!("{DRAFT_DATA_KEY}.json")).exists());

    let _ = std::fs::remove_dir_all(&dir);
}
