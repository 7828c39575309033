//! Operator display and accessibility preferences.

mod registry;
mod store;

pub use registry::{SettingsCallback, SubscriptionId};
pub use store::{SaveOutcome, SaveTicket, SettingsStore};

use serde::{Deserialize, Serialize};

use super::repository::{AuthError, RepositoryError};

pub const MAX_CONTRAST: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// One row per user. Fields missing from a stored row fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub font_size: FontSize,
    /// Percentage, 0–100.
    pub contrast: u8,
    pub animations: bool,
    pub notifications: bool,
    pub sound: bool,
    pub language: String,
    pub auto_save: bool,
    pub high_contrast: bool,
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            font_size: FontSize::Medium,
            contrast: 50,
            animations: true,
            notifications: true,
            sound: true,
            language: "pt-BR".to_string(),
            auto_save: true,
            high_contrast: false,
            reduced_motion: false,
        }
    }
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_save: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_contrast: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduced_motion: Option<bool>,
}

impl SettingsPatch {
    pub fn validate(&self) -> Result<(), SettingsError> {
        match self.contrast {
            Some(contrast) if contrast > MAX_CONTRAST => {
                Err(SettingsError::InvalidContrast(contrast))
            }
            _ => Ok(()),
        }
    }

    /// Folds `later` over `self`; fields set in `later` win.
    pub fn merge(self, later: SettingsPatch) -> SettingsPatch {
        SettingsPatch {
            theme: later.theme.or(self.theme),
            font_size: later.font_size.or(self.font_size),
            contrast: later.contrast.or(self.contrast),
            animations: later.animations.or(self.animations),
            notifications: later.notifications.or(self.notifications),
            sound: later.sound.or(self.sound),
            language: later.language.or(self.language),
            auto_save: later.auto_save.or(self.auto_save),
            high_contrast: later.high_contrast.or(self.high_contrast),
            reduced_motion: later.reduced_motion.or(self.reduced_motion),
        }
    }

    pub fn apply_to(&self, base: &Settings) -> Settings {
        Settings {
            theme: self.theme.unwrap_or(base.theme),
            font_size: self.font_size.unwrap_or(base.font_size),
            contrast: self.contrast.unwrap_or(base.contrast),
            animations: self.animations.unwrap_or(base.animations),
            notifications: self.notifications.unwrap_or(base.notifications),
            sound: self.sound.unwrap_or(base.sound),
            language: self
                .language
                .clone()
                .unwrap_or_else(|| base.language.clone()),
            auto_save: self.auto_save.unwrap_or(base.auto_save),
            high_contrast: self.high_contrast.unwrap_or(base.high_contrast),
            reduced_motion: self.reduced_motion.unwrap_or(base.reduced_motion),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

impl From<Settings> for SettingsPatch {
    fn from(settings: Settings) -> Self {
        Self {
            theme: Some(settings.theme),
            font_size: Some(settings.font_size),
            contrast: Some(settings.contrast),
            animations: Some(settings.animations),
            notifications: Some(settings.notifications),
            sound: Some(settings.sound),
            language: Some(settings.language),
            auto_save: Some(settings.auto_save),
            high_contrast: Some(settings.high_contrast),
            reduced_motion: Some(settings.reduced_motion),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("user not authenticated")]
    Unauthenticated,
    #[error("contrast must be between 0 and 100, got {0}")]
    InvalidContrast(u8),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}
