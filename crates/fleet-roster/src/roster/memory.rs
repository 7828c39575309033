//! In-memory backend adapters for the bundled service, demos and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::{
    Driver, DriverEvaluation, DriverId, EvaluationItem, EvaluationItemId, MonthlyRating, RatingId,
    Role, UserId,
};
use super::repository::{
    AuthError, AuthGateway, Credentials, DriverRepository, EvaluationItemRepository,
    EvaluationRepository, MonthlyRatingRepository, RepositoryError, Session, SettingsRepository,
    UserRepository,
};
use super::settings::Settings;
use super::users::UserProfile;

#[derive(Default, Clone)]
pub struct InMemoryDriverRepository {
    records: Arc<Mutex<HashMap<DriverId, Driver>>>,
}

#[async_trait]
impl DriverRepository for InMemoryDriverRepository {
    async fn insert(&self, driver: Driver) -> Result<Driver, RepositoryError> {
        let mut guard = self.records.lock().expect("driver mutex poisoned");
        if guard.contains_key(&driver.id) || guard.values().any(|d| d.cpf == driver.cpf) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(driver.id.clone(), driver.clone());
        Ok(driver)
    }

    async fn update(&self, driver: Driver) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("driver mutex poisoned");
        if guard.contains_key(&driver.id) {
            guard.insert(driver.id.clone(), driver);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn fetch(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        let guard = self.records.lock().expect("driver mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn find_by_cpf(&self, cpf: &str) -> Result<Option<Driver>, RepositoryError> {
        let guard = self.records.lock().expect("driver mutex poisoned");
        Ok(guard.values().find(|driver| driver.cpf == cpf).cloned())
    }

    async fn list(&self) -> Result<Vec<Driver>, RepositoryError> {
        let guard = self.records.lock().expect("driver mutex poisoned");
        let mut drivers: Vec<Driver> = guard.values().cloned().collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(drivers)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryEvaluationItemRepository {
    records: Arc<Mutex<HashMap<EvaluationItemId, EvaluationItem>>>,
}

#[async_trait]
impl EvaluationItemRepository for InMemoryEvaluationItemRepository {
    async fn insert(&self, item: EvaluationItem) -> Result<EvaluationItem, RepositoryError> {
        let mut guard = self.records.lock().expect("item mutex poisoned");
        if guard.contains_key(&item.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(item.id.clone(), item.clone());
        Ok(item)
    }

    async fn update(&self, item: EvaluationItem) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("item mutex poisoned");
        match guard.get_mut(&item.id) {
            Some(existing) => {
                *existing = item;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &EvaluationItemId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("item mutex poisoned");
        guard
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<EvaluationItem>, RepositoryError> {
        let guard = self.records.lock().expect("item mutex poisoned");
        let mut items: Vec<EvaluationItem> = guard.values().cloned().collect();
        items.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryEvaluationRepository {
    records: Arc<Mutex<Vec<DriverEvaluation>>>,
}

#[async_trait]
impl EvaluationRepository for InMemoryEvaluationRepository {
    async fn insert_batch(
        &self,
        evaluations: Vec<DriverEvaluation>,
    ) -> Result<Vec<DriverEvaluation>, RepositoryError> {
        let mut guard = self.records.lock().expect("evaluation mutex poisoned");
        guard.extend(evaluations.iter().cloned());
        Ok(evaluations)
    }

    async fn for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<DriverEvaluation>, RepositoryError> {
        let guard = self.records.lock().expect("evaluation mutex poisoned");
        let mut records: Vec<DriverEvaluation> = guard
            .iter()
            .filter(|record| &record.driver_id == driver_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.evaluated_at.cmp(&a.evaluated_at));
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMonthlyRatingRepository {
    records: Arc<Mutex<HashMap<RatingId, MonthlyRating>>>,
}

impl InMemoryMonthlyRatingRepository {
    pub fn len(&self) -> usize {
        self.records.lock().expect("rating mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MonthlyRatingRepository for InMemoryMonthlyRatingRepository {
    async fn find(
        &self,
        driver_id: &DriverId,
        month: NaiveDate,
    ) -> Result<Option<MonthlyRating>, RepositoryError> {
        let guard = self.records.lock().expect("rating mutex poisoned");
        Ok(guard
            .values()
            .find(|rating| &rating.driver_id == driver_id && rating.month == month)
            .cloned())
    }

    async fn insert(&self, rating: MonthlyRating) -> Result<MonthlyRating, RepositoryError> {
        let mut guard = self.records.lock().expect("rating mutex poisoned");
        if guard.contains_key(&rating.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(rating.id.clone(), rating.clone());
        Ok(rating)
    }

    async fn update(&self, rating: MonthlyRating) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("rating mutex poisoned");
        match guard.get_mut(&rating.id) {
            Some(existing) => {
                *existing = rating;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn for_month(&self, month: NaiveDate) -> Result<Vec<MonthlyRating>, RepositoryError> {
        let guard = self.records.lock().expect("rating mutex poisoned");
        Ok(guard
            .values()
            .filter(|rating| rating.month == month)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemorySettingsRepository {
    rows: Arc<Mutex<HashMap<UserId, Settings>>>,
}

#[async_trait]
impl SettingsRepository for InMemorySettingsRepository {
    async fn load(&self, user_id: &UserId) -> Result<Option<Settings>, RepositoryError> {
        let guard = self.rows.lock().expect("settings mutex poisoned");
        Ok(guard.get(user_id).cloned())
    }

    async fn upsert(&self, user_id: &UserId, settings: &Settings) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("settings mutex poisoned");
        guard.insert(user_id.clone(), settings.clone());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryUserRepository {
    profiles: Arc<Mutex<HashMap<UserId, UserProfile>>>,
    roles: Arc<Mutex<HashMap<UserId, Role>>>,
}

impl InMemoryUserRepository {
    /// Stores a profile and its role outside the async port, for wiring fixtures.
    pub fn seed(&self, profile: UserProfile, role: Role) {
        self.roles
            .lock()
            .expect("role mutex poisoned")
            .insert(profile.id.clone(), role);
        self.profiles
            .lock()
            .expect("user mutex poisoned")
            .insert(profile.id.clone(), profile);
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().expect("user mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, profile: UserProfile) -> Result<UserProfile, RepositoryError> {
        let mut guard = self.profiles.lock().expect("user mutex poisoned");
        if guard.contains_key(&profile.id) || guard.values().any(|p| p.email == profile.email) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn assign_role(&self, user_id: &UserId, role: Role) -> Result<(), RepositoryError> {
        if !self
            .profiles
            .lock()
            .expect("user mutex poisoned")
            .contains_key(user_id)
        {
            return Err(RepositoryError::NotFound);
        }
        self.roles
            .lock()
            .expect("role mutex poisoned")
            .insert(user_id.clone(), role);
        Ok(())
    }

    async fn role_of(&self, user_id: &UserId) -> Result<Option<Role>, RepositoryError> {
        let guard = self.roles.lock().expect("role mutex poisoned");
        Ok(guard.get(user_id).copied())
    }

    async fn list(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("user mutex poisoned");
        let mut profiles: Vec<UserProfile> = guard.values().cloned().collect();
        profiles.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        Ok(profiles)
    }
}

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    password: String,
}

/// Single-session authentication: one operator signed in at a time.
#[derive(Default, Clone)]
pub struct InMemoryAuthGateway {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    session: Arc<Mutex<Option<Session>>>,
}

impl InMemoryAuthGateway {
    /// Gateway with one account already signed in.
    pub fn signed_in(email: &str, password: &str) -> (Self, UserId) {
        let gateway = Self::default();
        let user_id = UserId::generate();
        let email = email.trim().to_ascii_lowercase();
        gateway.accounts.lock().expect("auth mutex poisoned").insert(
            email.clone(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        *gateway.session.lock().expect("auth mutex poisoned") = Some(Session {
            user_id: user_id.clone(),
            email,
        });
        (gateway, user_id)
    }
}

#[async_trait]
impl AuthGateway for InMemoryAuthGateway {
    async fn sign_in(&self, credentials: Credentials) -> Result<Session, AuthError> {
        let email = credentials.email.trim().to_ascii_lowercase();
        let account = {
            let guard = self.accounts.lock().expect("auth mutex poisoned");
            guard.get(&email).cloned()
        };
        match account {
            Some(account) if account.password == credentials.password => {
                let session = Session {
                    user_id: account.user_id,
                    email,
                };
                *self.session.lock().expect("auth mutex poisoned") = Some(session.clone());
                Ok(session)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_up(&self, credentials: Credentials) -> Result<UserId, AuthError> {
        let email = credentials.email.trim().to_ascii_lowercase();
        let mut guard = self.accounts.lock().expect("auth mutex poisoned");
        if guard.contains_key(&email) {
            return Err(AuthError::EmailTaken(email));
        }
        let user_id = UserId::generate();
        guard.insert(
            email,
            Account {
                user_id: user_id.clone(),
                password: credentials.password,
            },
        );
        Ok(user_id)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.session.lock().expect("auth mutex poisoned") = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<UserId>, AuthError> {
        let guard = self.session.lock().expect("auth mutex poisoned");
        Ok(guard.as_ref().map(|session| session.user_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = InMemoryAuthGateway::default();
        let credentials = Credentials {
            email: "Ops@Fleet.com".to_string(),
            password: "s3cret-pass".to_string(),
        };
        let user_id = auth.sign_up(credentials.clone()).await.expect("sign up");
        assert_eq!(auth.current_user().await.expect("current user"), None);

        let session = auth.sign_in(credentials.clone()).await.expect("sign in");
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.email, "ops@fleet.com");
        assert_eq!(
            auth.sign_up(credentials).await,
            Err(AuthError::EmailTaken("ops@fleet.com".to_string()))
        );

        auth.sign_out().await.expect("sign out");
        assert_eq!(auth.current_user().await.expect("current user"), None);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (auth, _) = InMemoryAuthGateway::signed_in("ops@fleet.com", "right-password");
        let result = auth
            .sign_in(Credentials {
                email: "ops@fleet.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert_eq!(result, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn roles_need_a_profile_and_replace_earlier_ones() {
        let users = InMemoryUserRepository::default();
        let id = UserId::generate();
        assert_eq!(
            users.assign_role(&id, Role::Director).await,
            Err(RepositoryError::NotFound)
        );

        users
            .insert(UserProfile::new(id.clone(), "rita@fleet.com", "Rita Alves"))
            .await
            .expect("profile");
        users.assign_role(&id, Role::Standard).await.expect("role");
        users.assign_role(&id, Role::Director).await.expect("role");
        assert_eq!(users.role_of(&id).await, Ok(Some(Role::Director)));
        assert_eq!(
            users
                .insert(UserProfile::new(UserId::generate(), "rita@fleet.com", "Other"))
                .await,
            Err(RepositoryError::Conflict)
        );
    }

    #[tokio::test]
    async fn driver_cpf_is_unique() {
        let repository = InMemoryDriverRepository::default();
        let driver = Driver {
            id: DriverId::generate(),
            name: "Ana Souza".to_string(),
            cpf: "52998224725".to_string(),
            admitted_on: NaiveDate::from_ymd_opt(2024, 2, 1).expect("valid"),
            status: Default::default(),
        };
        repository.insert(driver.clone()).await.expect("first insert");
        let duplicate = Driver {
            id: DriverId::generate(),
            ..driver
        };
        assert_eq!(
            repository.insert(duplicate).await,
            Err(RepositoryError::Conflict)
        );
    }
}
