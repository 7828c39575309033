//! Weighted evaluation criteria, per-driver score aggregation and the
//! evaluation change feed.

mod aggregate;
mod feed;
mod service;

pub use aggregate::{aggregate_driver, display_score, DriverScorecard, ItemAverage};
pub use feed::{DriverEvaluationSubscription, EvaluationChange, EvaluationFeed};
pub use service::{EvaluationService, EvaluationServiceError, ItemDraft, ScoreEntry};

/// Stored scores are the typed 1–10 value times this factor.
pub const STORED_SCORE_SCALE: f32 = 10.0;
