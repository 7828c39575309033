use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), uuid::Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier wrapper for roster drivers.
    DriverId,
    "drv"
);
id_newtype!(
    /// Identifier wrapper for evaluation criteria.
    EvaluationItemId,
    "item"
);
id_newtype!(
    /// Identifier of an authenticated operator account.
    UserId,
    "usr"
);
id_newtype!(RatingId, "rating");
id_newtype!(EvaluationId, "eval");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    #[default]
    Active,
    Inactive,
    OnLeave,
    OnVacation,
}

impl DriverStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Active, Self::Inactive, Self::OnLeave, Self::OnVacation]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
            Self::OnLeave => "On Leave",
            Self::OnVacation => "On Vacation",
        }
    }
}

/// Roster entry. Drivers are deactivated through their status, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    /// Eleven digits, no punctuation.
    pub cpf: String,
    pub admitted_on: NaiveDate,
    pub status: DriverStatus,
}

/// Importance of an evaluation item, 1 (lowest) to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ItemWeight(u8);

impl ItemWeight {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for ItemWeight {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<u8> for ItemWeight {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "weight must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<ItemWeight> for u8 {
    fn from(value: ItemWeight) -> Self {
        value.0
    }
}

/// Weighted criterion drivers are scored against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub id: EvaluationItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub weight: ItemWeight,
}

/// One scored submission of a driver against one item.
///
/// `score` is kept on the ×10 scale: an input of 8.5 is stored as 85.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverEvaluation {
    pub id: EvaluationId,
    pub driver_id: DriverId,
    pub item_id: EvaluationItemId,
    pub score: u16,
    pub notes: String,
    pub evaluator_id: UserId,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingStatus {
    Pending,
    Filled,
}

/// Single 0–10 score per driver per calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRating {
    pub id: RatingId,
    pub driver_id: DriverId,
    /// Always the first day of the rated month.
    pub month: NaiveDate,
    pub score: f32,
    pub comments: String,
    pub status: RatingStatus,
}

/// Operator role. Higher roles inherit everything a lower role may do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Standard,
    Administrator,
    Director,
}

impl Role {
    pub const fn ordered() -> [Self; 3] {
        [Self::Standard, Self::Administrator, Self::Director]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard User",
            Self::Administrator => "Administrator",
            Self::Director => "Director",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Standard => 1,
            Self::Administrator => 2,
            Self::Director => 3,
        }
    }

    /// Whether this role may act where `required` is needed.
    pub const fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}
