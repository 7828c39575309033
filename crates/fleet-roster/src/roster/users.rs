//! Operator profiles, role assignments and role-based permission checks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{Role, UserId};
use super::registration::{PermissionSet, UserRegistrationData};
use super::repository::{AuthError, AuthGateway, RepositoryError, UserRepository};

/// Row of the `users` collection, written once registration is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub permissions: PermissionSet,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: UserId, email: &str, full_name: &str) -> Self {
        Self {
            id,
            email: email.trim().to_ascii_lowercase(),
            full_name: full_name.trim().to_string(),
            phone_number: None,
            department: String::new(),
            permissions: PermissionSet::default(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Profile for a confirmed registration draft.
    pub fn from_registration(id: UserId, data: &UserRegistrationData) -> Self {
        let phone = data.phone_number.trim();
        Self {
            phone_number: (!phone.is_empty())
                .then(|| format!("{} {phone}", data.country_code.trim()).trim().to_string()),
            department: data.department.trim().to_string(),
            permissions: data.permissions.clone(),
            ..Self::new(id, &data.email, &data.full_name())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("user not authenticated")]
    Unauthenticated,
    #[error("the {} role is required", .0.label())]
    Forbidden(Role),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Resolves the signed-in operator's role and checks it against a requirement.
pub struct AccessControl {
    auth: Arc<dyn AuthGateway>,
    users: Arc<dyn UserRepository>,
}

impl AccessControl {
    pub fn new(auth: Arc<dyn AuthGateway>, users: Arc<dyn UserRepository>) -> Self {
        Self { auth, users }
    }

    pub async fn signed_in_user(&self) -> Result<UserId, AccessError> {
        self.auth
            .current_user()
            .await?
            .ok_or(AccessError::Unauthenticated)
    }

    /// `None` when nobody is signed in or no role was ever assigned.
    pub async fn current_role(&self) -> Result<Option<Role>, AccessError> {
        let Some(user_id) = self.auth.current_user().await? else {
            return Ok(None);
        };
        Ok(self.users.role_of(&user_id).await?)
    }

    pub async fn check(&self, required: Role) -> Result<bool, AccessError> {
        Ok(self
            .current_role()
            .await?
            .is_some_and(|role| role.satisfies(required)))
    }

    /// Signed-in operator, provided their role satisfies `required`.
    pub async fn require(&self, required: Role) -> Result<UserId, AccessError> {
        let user_id = self.signed_in_user().await?;
        match self.users.role_of(&user_id).await? {
            Some(role) if role.satisfies(required) => Ok(user_id),
            role => {
                warn!(%user_id, ?role, required = required.label(), "permission denied");
                Err(AccessError::Forbidden(required))
            }
        }
    }
}

/// Administrator view over the registered operators.
pub struct UserDirectory {
    users: Arc<dyn UserRepository>,
    access: Arc<AccessControl>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserRepository>, access: Arc<AccessControl>) -> Self {
        Self { users, access }
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn repository(&self) -> Arc<dyn UserRepository> {
        Arc::clone(&self.users)
    }

    /// Profiles newest first, optionally narrowed by a case-insensitive match
    /// on name or email.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<UserProfile>, AccessError> {
        self.access.require(Role::Administrator).await?;
        let profiles = self.users.list().await?;

        let Some(needle) = search
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
        else {
            return Ok(profiles);
        };
        Ok(profiles
            .into_iter()
            .filter(|profile| {
                profile.full_name.to_lowercase().contains(&needle)
                    || profile.email.to_lowercase().contains(&needle)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_profile_keeps_the_whole_draft() {
        let mut data = UserRegistrationData {
            first_name: "helena".to_string(),
            last_name: "martins".to_string(),
            email: " Helena@Frota.com.br ".to_string(),
            phone_number: "11 91234-5678".to_string(),
            department: " Operações ".to_string(),
            role: Role::Administrator,
            ..UserRegistrationData::default()
        };
        data.permissions.modules.reports = true;

        let profile = UserProfile::from_registration(UserId("usr-1".to_string()), &data);

        assert_eq!(profile.email, "helena@frota.com.br");
        assert_eq!(profile.full_name, "Helena Martins");
        assert_eq!(profile.phone_number.as_deref(), Some("+55 11 91234-5678"));
        assert_eq!(profile.department, "Operações");
        assert!(profile.permissions.modules.reports);
        assert!(profile.is_active);
    }

    #[test]
    fn blank_phone_is_not_stored() {
        let data = UserRegistrationData::default();
        let profile = UserProfile::from_registration(UserId("usr-1".to_string()), &data);
        assert_eq!(profile.phone_number, None);
    }
}
