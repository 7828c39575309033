use chrono::NaiveDate;
use fleet_roster::config::SettingsConfig;
use fleet_roster::error::AppError;
use fleet_roster::roster::memory::{
    InMemoryAuthGateway, InMemoryDriverRepository, InMemoryEvaluationItemRepository,
    InMemoryEvaluationRepository, InMemoryMonthlyRatingRepository, InMemorySettingsRepository,
    InMemoryUserRepository,
};
use fleet_roster::roster::{
    AccessControl, Driver, DriverDraft, DriverService, DriverStatus, EvaluationFeed,
    EvaluationItem, EvaluationService, ItemDraft, MonthlyRatingService, ReportService, Role,
    RosterState, ScoreEntry, SettingsStore, UserDirectory, UserProfile,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) const DEMO_OPERATOR_EMAIL: &str = "operador@frota.com.br";
pub(crate) const DEMO_OPERATOR_PASSWORD: &str = "frota-demo-2025";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Roster services over in-memory adapters, with the demo operator signed in
/// as an administrator.
pub(crate) fn in_memory_roster(settings: &SettingsConfig) -> RosterState {
    let (auth, operator) =
        InMemoryAuthGateway::signed_in(DEMO_OPERATOR_EMAIL, DEMO_OPERATOR_PASSWORD);
    let auth = Arc::new(auth);
    let users = Arc::new(InMemoryUserRepository::default());
    users.seed(
        UserProfile::new(operator, DEMO_OPERATOR_EMAIL, "Operador Demo"),
        Role::Administrator,
    );
    let access = Arc::new(AccessControl::new(auth.clone(), users.clone()));
    let drivers = Arc::new(InMemoryDriverRepository::default());
    let items = Arc::new(InMemoryEvaluationItemRepository::default());
    let evaluations = Arc::new(InMemoryEvaluationRepository::default());
    let ratings = Arc::new(InMemoryMonthlyRatingRepository::default());

    RosterState {
        auth: auth.clone(),
        drivers: Arc::new(DriverService::new(drivers.clone())),
        evaluations: Arc::new(EvaluationService::new(
            items.clone(),
            evaluations.clone(),
            drivers.clone(),
            access.clone(),
            EvaluationFeed::default(),
        )),
        ratings: Arc::new(MonthlyRatingService::new(ratings.clone(), drivers.clone())),
        reports: Arc::new(ReportService::new(drivers, items, evaluations, ratings)),
        users: Arc::new(UserDirectory::new(users, access)),
        settings: SettingsStore::new(
            Arc::new(InMemorySettingsRepository::default()),
            auth,
            settings,
        ),
    }
}

struct SeedDriver {
    name: &'static str,
    cpf: &'static str,
    admitted_on: (i32, u32, u32),
    status: DriverStatus,
    scores: [&'static str; 3],
    monthly_rating: Option<&'static str>,
}

const SEED_DRIVERS: [SeedDriver; 4] = [
    SeedDriver {
        name: "marcos pereira",
        cpf: "529.982.247-25",
        admitted_on: (2019, 3, 11),
        status: DriverStatus::Active,
        scores: ["9", "8.5", "7"],
        monthly_rating: Some("9"),
    },
    SeedDriver {
        name: "juliana costa",
        cpf: "111.444.777-35",
        admitted_on: (2021, 8, 2),
        status: DriverStatus::Active,
        scores: ["7.5", "9", "9.5"],
        monthly_rating: Some("8,5"),
    },
    SeedDriver {
        name: "rafael nunes",
        cpf: "935.411.347-80",
        admitted_on: (2022, 11, 21),
        status: DriverStatus::OnVacation,
        scores: ["6", "7", "8"],
        monthly_rating: None,
    },
    SeedDriver {
        name: "beatriz ramos",
        cpf: "123.456.789-09",
        admitted_on: (2024, 1, 15),
        status: DriverStatus::Active,
        scores: ["", "", ""],
        monthly_rating: Some("7"),
    },
];

const SEED_ITEMS: [(&str, &str, u8); 3] = [
    ("Direção defensiva", "Respeito a limites e distâncias de segurança", 5),
    ("Pontualidade", "Cumprimento dos horários de rota", 3),
    ("Cuidado com o veículo", "Checklist diário e conservação", 2),
];

pub(crate) struct SeededRoster {
    pub(crate) drivers: Vec<Driver>,
    pub(crate) items: Vec<EvaluationItem>,
}

/// Fills an empty roster with sample drivers, items, evaluations and ratings.
///
/// Drivers whose scores are blank are left unevaluated.
pub(crate) async fn seed_roster(
    state: &RosterState,
    today: NaiveDate,
) -> Result<SeededRoster, AppError> {
    let mut items = Vec::with_capacity(SEED_ITEMS.len());
    for (name, description, weight) in SEED_ITEMS {
        let item = state
            .evaluations
            .create_item(ItemDraft {
                name: name.to_string(),
                description: Some(description.to_string()),
                weight,
            })
            .await?;
        items.push(item);
    }

    let mut drivers = Vec::with_capacity(SEED_DRIVERS.len());
    for seed in &SEED_DRIVERS {
        let (year, month, day) = seed.admitted_on;
        let driver = state
            .drivers
            .register(
                DriverDraft {
                    name: seed.name.to_string(),
                    cpf: seed.cpf.to_string(),
                    admitted_on: NaiveDate::from_ymd_opt(year, month, day),
                    status: Some(seed.status),
                },
                today,
            )
            .await?;

        if seed.scores.iter().all(|score| !score.is_empty()) {
            let entries = items
                .iter()
                .zip(seed.scores)
                .map(|(item, score)| ScoreEntry {
                    item_id: item.id.clone(),
                    score: score.to_string(),
                    notes: None,
                })
                .collect();
            state.evaluations.submit(&driver.id, entries).await?;
        }
        if let Some(rating) = seed.monthly_rating {
            state.ratings.upsert(&driver.id, rating, "", today).await?;
        }
        drivers.push(driver);
    }

    info!(
        drivers = drivers.len(),
        items = items.len(),
        "sample roster seeded"
    );
    Ok(SeededRoster { drivers, items })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
