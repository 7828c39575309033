use serde::{Deserialize, Serialize};

use super::RegistrationStage;
use crate::roster::domain::Role;
use crate::roster::validation::{
    format_name, require, validate_email, validate_name, validate_password, FieldErrors,
    ValidationError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Read,
    Write,
    Delete,
    Full,
}

impl AccessLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "Read only",
            Self::Write => "Read and write",
            Self::Delete => "Read, write and delete",
            Self::Full => "Full access",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationPreference {
    #[default]
    Email,
    Phone,
    Both,
}

/// Back-office modules an operator can be granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleAccess {
    pub dashboard: bool,
    pub financial: bool,
    pub user_management: bool,
    pub reports: bool,
    pub documents: bool,
    pub communication: bool,
}

impl Default for ModuleAccess {
    fn default() -> Self {
        Self {
            dashboard: true,
            financial: false,
            user_management: false,
            reports: false,
            documents: true,
            communication: true,
        }
    }
}

impl ModuleAccess {
    pub fn any_enabled(&self) -> bool {
        self.dashboard
            || self.financial
            || self.user_management
            || self.reports
            || self.documents
            || self.communication
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSet {
    pub access_level: AccessLevel,
    pub modules: ModuleAccess,
}

/// Operator sign-up draft, filled across the four registration stages.
///
/// Kept in the local draft store until the final submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRegistrationData {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub country_code: String,
    pub password: String,
    pub password_confirmation: String,
    pub security_question: String,
    pub security_answer: String,

    pub role: Role,
    pub department: String,
    pub communication_preference: CommunicationPreference,

    pub permissions: PermissionSet,

    pub terms_accepted: bool,
    pub privacy_accepted: bool,
    pub corporate_email: Option<String>,
}

impl Default for UserRegistrationData {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            middle_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone_number: String::new(),
            country_code: "+55".to_string(),
            password: String::new(),
            password_confirmation: String::new(),
            security_question: String::new(),
            security_answer: String::new(),
            role: Role::default(),
            department: String::new(),
            communication_preference: CommunicationPreference::default(),
            permissions: PermissionSet::default(),
            terms_accepted: false,
            privacy_accepted: false,
            corporate_email: None,
        }
    }
}

impl UserRegistrationData {
    /// First, middle and last name joined, each title-cased.
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .map(|part| format_name(part.trim()))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the form rules of `stage` against the draft.
    pub fn validate_stage(&self, stage: RegistrationStage) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        match stage {
            RegistrationStage::BasicInfo => self.check_basic_info(&mut errors),
            RegistrationStage::RoleSelection => {
                errors.check("department", require("department", &self.department));
            }
            RegistrationStage::Permissions => {
                if !self.permissions.modules.any_enabled() {
                    errors.push(
                        "modules",
                        ValidationError::Rule("select at least one module".to_string()),
                    );
                }
            }
            RegistrationStage::Verification => self.check_verification(&mut errors),
        }
        errors.into_result()
    }

    fn check_basic_info(&self, errors: &mut FieldErrors) {
        errors.check("first_name", validate_name(&self.first_name));
        if !self.middle_name.trim().is_empty() {
            errors.check("middle_name", validate_name(&self.middle_name));
        }
        errors.check("last_name", validate_name(&self.last_name));
        errors.check("email", validate_email(&self.email));
        errors.check("phone_number", require("phone number", &self.phone_number));
        errors.check(
            "password",
            validate_password(&self.password, &self.password_confirmation),
        );
        errors.check(
            "security_question",
            require("security question", &self.security_question),
        );
        errors.check(
            "security_answer",
            require("security answer", &self.security_answer),
        );
    }

    fn check_verification(&self, errors: &mut FieldErrors) {
        if !self.terms_accepted {
            errors.push(
                "terms_accepted",
                ValidationError::Rule("the terms of use must be accepted".to_string()),
            );
        }
        if !self.privacy_accepted {
            errors.push(
                "privacy_accepted",
                ValidationError::Rule("the privacy policy must be accepted".to_string()),
            );
        }
        if let Some(corporate) = self
            .corporate_email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
        {
            errors.check("corporate_email", validate_email(corporate));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draft_enables_core_modules() {
        let data = UserRegistrationData::default();
        assert_eq!(data.country_code, "+55");
        assert!(data.permissions.modules.dashboard);
        assert!(data.validate_stage(RegistrationStage::Permissions).is_ok());
    }

    #[test]
    fn permissions_require_a_module() {
        let mut data = UserRegistrationData::default();
        data.permissions.modules = ModuleAccess {
            dashboard: false,
            financial: false,
            user_management: false,
            reports: false,
            documents: false,
            communication: false,
        };
        let errors = data
            .validate_stage(RegistrationStage::Permissions)
            .expect_err("no modules");
        assert!(errors.get("modules").is_some());
    }

    #[test]
    fn verification_checks_optional_corporate_email() {
        let mut data = UserRegistrationData {
            terms_accepted: true,
            privacy_accepted: true,
            corporate_email: Some("  ".to_string()),
            ..UserRegistrationData::default()
        };
        assert!(data.validate_stage(RegistrationStage::Verification).is_ok());

        data.corporate_email = Some("not-an-email".to_string());
        let errors = data
            .validate_stage(RegistrationStage::Verification)
            .expect_err("bad corporate email");
        assert_eq!(errors.get("corporate_email"), Some("email address is invalid"));
    }

    #[test]
    fn full_name_skips_empty_middle_name() {
        let data = UserRegistrationData {
            first_name: "ana".to_string(),
            last_name: "souza".to_string(),
            ..UserRegistrationData::default()
        };
        assert_eq!(data.full_name(), "Ana Souza");
    }

    #[test]
    fn drafts_missing_fields_fall_back_to_defaults() {
        let data: UserRegistrationData =
            serde_json::from_str(r#"{"first_name":"Ana"}"#).expect("partial draft");
        assert_eq!(data.first_name, "Ana");
        assert_eq!(data.country_code, "+55");
    }
}
