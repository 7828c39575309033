//! One 0–10 rating per driver per calendar month.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::info;

use super::domain::{DriverId, MonthlyRating, RatingId, RatingStatus};
use super::repository::{DriverRepository, MonthlyRatingRepository, RepositoryError};
use super::validation::{parse_monthly_rating, FieldErrors};

/// First calendar day of the month containing `date`.
pub fn month_key(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Stored rating and whether the call created it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingUpsert {
    pub rating: MonthlyRating,
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RatingServiceError {
    #[error("invalid rating: {0}")]
    Validation(FieldErrors),
    #[error("driver {0} not found")]
    DriverNotFound(DriverId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct MonthlyRatingService {
    ratings: Arc<dyn MonthlyRatingRepository>,
    drivers: Arc<dyn DriverRepository>,
}

impl MonthlyRatingService {
    pub fn new(
        ratings: Arc<dyn MonthlyRatingRepository>,
        drivers: Arc<dyn DriverRepository>,
    ) -> Self {
        Self { ratings, drivers }
    }

    /// Updates this month's rating in place when one exists, otherwise inserts it.
    pub async fn upsert(
        &self,
        driver_id: &DriverId,
        raw_score: &str,
        comments: &str,
        today: NaiveDate,
    ) -> Result<RatingUpsert, RatingServiceError> {
        let mut errors = FieldErrors::new();
        let score = errors.check("score", parse_monthly_rating(raw_score));
        errors.into_result().map_err(RatingServiceError::Validation)?;
        let score = score.unwrap_or_default();

        if self.drivers.fetch(driver_id).await?.is_none() {
            return Err(RatingServiceError::DriverNotFound(driver_id.clone()));
        }

        let month = month_key(today);
        let comments = comments.trim().to_string();

        match self.ratings.find(driver_id, month).await? {
            Some(mut existing) => {
                existing.score = score;
                existing.comments = comments;
                existing.status = RatingStatus::Filled;
                self.ratings.update(existing.clone()).await?;
                info!(%driver_id, %month, score, "monthly rating updated");
                Ok(RatingUpsert {
                    rating: existing,
                    created: false,
                })
            }
            None => {
                let rating = self
                    .ratings
                    .insert(MonthlyRating {
                        id: RatingId::generate(),
                        driver_id: driver_id.clone(),
                        month,
                        score,
                        comments,
                        status: RatingStatus::Filled,
                    })
                    .await?;
                info!(%driver_id, %month, score, "monthly rating recorded");
                Ok(RatingUpsert {
                    rating,
                    created: true,
                })
            }
        }
    }

    /// Rating of the month containing `today`, if one was filled.
    pub async fn current(
        &self,
        driver_id: &DriverId,
        today: NaiveDate,
    ) -> Result<Option<MonthlyRating>, RatingServiceError> {
        Ok(self.ratings.find(driver_id, month_key(today)).await?)
    }

    pub async fn for_month(
        &self,
        month: NaiveDate,
    ) -> Result<Vec<MonthlyRating>, RatingServiceError> {
        Ok(self.ratings.for_month(month_key(month)).await?)
    }
}
