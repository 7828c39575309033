use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::config::SettingsConfig;
use crate::roster::domain::{Driver, DriverId, Role, UserId};
use crate::roster::drivers::{DriverDraft, DriverService};
use crate::roster::evaluation::{EvaluationFeed, EvaluationService};
use crate::roster::memory::{
    InMemoryAuthGateway, InMemoryDriverRepository, InMemoryEvaluationItemRepository,
    InMemoryEvaluationRepository, InMemoryMonthlyRatingRepository, InMemorySettingsRepository,
    InMemoryUserRepository,
};
use crate::roster::ratings::MonthlyRatingService;
use crate::roster::report::ReportService;
use crate::roster::repository::{DriverRepository, RepositoryError, SettingsRepository};
use crate::roster::router::RosterState;
use crate::roster::settings::{Settings, SettingsStore};
use crate::roster::users::{AccessControl, UserDirectory, UserProfile};

pub(super) const OPERATOR_EMAIL: &str = "ops@fleet.com.br";
pub(super) const OPERATOR_PASSWORD: &str = "s3cret-pass";

pub(super) fn valid_cpf() -> &'static str {
    "529.982.247-25"
}

pub(super) fn other_valid_cpf() -> &'static str {
    "111.444.777-35"
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 17).expect("valid date")
}

pub(super) fn driver_draft(name: &str, cpf: &str) -> DriverDraft {
    DriverDraft {
        name: name.to_string(),
        cpf: cpf.to_string(),
        admitted_on: NaiveDate::from_ymd_opt(2021, 6, 1),
        status: None,
    }
}

pub(super) fn settings_config(millis: u64) -> SettingsConfig {
    SettingsConfig {
        persist_debounce: Duration::from_millis(millis),
    }
}

/// User backend holding `user_id` as an operator with `role`.
pub(super) fn users_with(user_id: &UserId, role: Role) -> InMemoryUserRepository {
    let users = InMemoryUserRepository::default();
    users.seed(
        UserProfile::new(user_id.clone(), OPERATOR_EMAIL, "Fleet Operator"),
        role,
    );
    users
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}

/// Settings backend that records every write and can be told to fail.
#[derive(Default, Clone)]
pub(super) struct RecordingSettingsRepository {
    rows: Arc<Mutex<Vec<(UserId, Settings, Instant)>>>,
    stored: Arc<Mutex<Option<Settings>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSettingsRepository {
    pub(super) fn with_stored(settings: Settings) -> Self {
        let repository = Self::default();
        *repository.stored.lock().expect("stored mutex poisoned") = Some(settings);
        repository
    }

    pub(super) fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(super) fn upserts(&self) -> usize {
        self.rows.lock().expect("rows mutex poisoned").len()
    }

    pub(super) fn last_written(&self) -> Option<Settings> {
        self.rows
            .lock()
            .expect("rows mutex poisoned")
            .last()
            .map(|(_, settings, _)| settings.clone())
    }

    pub(super) fn write_times(&self) -> Vec<Instant> {
        self.rows
            .lock()
            .expect("rows mutex poisoned")
            .iter()
            .map(|(_, _, at)| *at)
            .collect()
    }
}

#[async_trait]
impl SettingsRepository for RecordingSettingsRepository {
    async fn load(&self, _user_id: &UserId) -> Result<Option<Settings>, RepositoryError> {
        Ok(self.stored.lock().expect("stored mutex poisoned").clone())
    }

    async fn upsert(&self, user_id: &UserId, settings: &Settings) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("settings table offline".to_string()));
        }
        self.rows.lock().expect("rows mutex poisoned").push((
            user_id.clone(),
            settings.clone(),
            Instant::now(),
        ));
        *self.stored.lock().expect("stored mutex poisoned") = Some(settings.clone());
        Ok(())
    }
}

/// Settings backend whose writes block until the test releases them.
#[derive(Clone)]
pub(super) struct GatedSettingsRepository {
    gate: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    inner: InMemorySettingsRepository,
    writes: Arc<AtomicUsize>,
}

impl Default for GatedSettingsRepository {
    fn default() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            inner: InMemorySettingsRepository::default(),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl GatedSettingsRepository {
    pub(super) fn release(&self, writes: usize) {
        self.gate.add_permits(writes);
    }

    pub(super) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsRepository for GatedSettingsRepository {
    async fn load(&self, user_id: &UserId) -> Result<Option<Settings>, RepositoryError> {
        self.inner.load(user_id).await
    }

    async fn upsert(&self, user_id: &UserId, settings: &Settings) -> Result<(), RepositoryError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| RepositoryError::Unavailable("gate closed".to_string()))?;
        permit.forget();
        let result = self.inner.upsert(user_id, settings).await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Driver backend that is always down.
pub(super) struct UnavailableDriverRepository;

#[async_trait]
impl DriverRepository for UnavailableDriverRepository {
    async fn insert(&self, _driver: Driver) -> Result<Driver, RepositoryError> {
        Err(RepositoryError::Unavailable("drivers offline".to_string()))
    }

    async fn update(&self, _driver: Driver) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("drivers offline".to_string()))
    }

    async fn fetch(&self, _id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        Err(RepositoryError::Unavailable("drivers offline".to_string()))
    }

    async fn find_by_cpf(&self, _cpf: &str) -> Result<Option<Driver>, RepositoryError> {
        Err(RepositoryError::Unavailable("drivers offline".to_string()))
    }

    async fn list(&self) -> Result<Vec<Driver>, RepositoryError> {
        Err(RepositoryError::Unavailable("drivers offline".to_string()))
    }
}

/// In-memory roster wired the way the service crate wires it.
pub(super) struct Harness {
    pub(super) state: RosterState,
    pub(super) auth: InMemoryAuthGateway,
    pub(super) operator: UserId,
    pub(super) ratings: InMemoryMonthlyRatingRepository,
    pub(super) settings: RecordingSettingsRepository,
    pub(super) users: InMemoryUserRepository,
}

pub(super) fn harness(debounce_ms: u64) -> Harness {
    let (auth, operator) = InMemoryAuthGateway::signed_in(OPERATOR_EMAIL, OPERATOR_PASSWORD);
    let drivers = Arc::new(InMemoryDriverRepository::default());
    let items = Arc::new(InMemoryEvaluationItemRepository::default());
    let evaluations = Arc::new(InMemoryEvaluationRepository::default());
    let ratings = InMemoryMonthlyRatingRepository::default();
    let settings = RecordingSettingsRepository::default();
    let users = users_with(&operator, Role::Administrator);
    let auth_port = Arc::new(auth.clone());
    let access = Arc::new(AccessControl::new(auth_port.clone(), Arc::new(users.clone())));

    let state = RosterState {
        auth: auth_port.clone(),
        drivers: Arc::new(DriverService::new(drivers.clone())),
        evaluations: Arc::new(EvaluationService::new(
            items.clone(),
            evaluations.clone(),
            drivers.clone(),
            access.clone(),
            EvaluationFeed::default(),
        )),
        ratings: Arc::new(MonthlyRatingService::new(
            Arc::new(ratings.clone()),
            drivers.clone(),
        )),
        reports: Arc::new(ReportService::new(
            drivers,
            items,
            evaluations,
            Arc::new(ratings.clone()),
        )),
        settings: SettingsStore::new(
            Arc::new(settings.clone()),
            auth_port,
            &settings_config(debounce_ms),
        ),
        users: Arc::new(UserDirectory::new(Arc::new(users.clone()), access)),
    };

    Harness {
        state,
        auth,
        operator,
        ratings,
        settings,
        users,
    }
}
