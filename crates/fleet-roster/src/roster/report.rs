//! Driver performance ranking for a month, with CSV export.

use std::cmp::Ordering;
use std::io;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use super::domain::{DriverId, DriverStatus};
use super::evaluation::{aggregate_driver, display_score};
use super::ratings::month_key;
use super::repository::{
    DriverRepository, EvaluationItemRepository, EvaluationRepository, MonthlyRatingRepository,
    RepositoryError,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRow {
    pub rank: usize,
    pub driver_id: DriverId,
    pub name: String,
    pub status: DriverStatus,
    pub status_label: &'static str,
    /// Weighted evaluation score on the 1–10 scale, over the driver's whole
    /// evaluation history.
    pub overall: Option<f32>,
    /// Every evaluation record on file, not only the report month's.
    pub evaluations: usize,
    /// Rating for the report month.
    pub monthly_rating: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub month: NaiveDate,
    pub rows: Vec<PerformanceRow>,
    pub evaluated_drivers: usize,
    pub average_overall: Option<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv export failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Serialize)]
struct CsvRow<'a> {
    rank: usize,
    driver_id: &'a str,
    name: &'a str,
    status: &'static str,
    overall: String,
    evaluations: usize,
    monthly_rating: String,
}

impl PerformanceReport {
    /// Ranks drivers by weighted score, then monthly rating, then name.
    /// Drivers without a score sort after every scored driver.
    pub fn build(month: NaiveDate, mut rows: Vec<PerformanceRow>) -> Self {
        rows.sort_by(|a, b| {
            descending(a.overall, b.overall)
                .then_with(|| descending(a.monthly_rating, b.monthly_rating))
                .then_with(|| a.name.cmp(&b.name))
        });
        for (position, row) in rows.iter_mut().enumerate() {
            row.rank = position + 1;
        }

        let scored: Vec<f32> = rows.iter().filter_map(|row| row.overall).collect();
        let average_overall = if scored.is_empty() {
            None
        } else {
            Some(scored.iter().sum::<f32>() / scored.len() as f32)
        };

        Self {
            month: month_key(month),
            evaluated_drivers: scored.len(),
            average_overall,
            rows,
        }
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(CsvRow {
                rank: row.rank,
                driver_id: row.driver_id.as_str(),
                name: &row.name,
                status: row.status_label,
                overall: display_score(row.overall),
                evaluations: row.evaluations,
                monthly_rating: display_score(row.monthly_rating),
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String, ReportError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|err| ReportError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
    }
}

fn descending(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct ReportService {
    drivers: Arc<dyn DriverRepository>,
    items: Arc<dyn EvaluationItemRepository>,
    evaluations: Arc<dyn EvaluationRepository>,
    ratings: Arc<dyn MonthlyRatingRepository>,
}

impl ReportService {
    pub fn new(
        drivers: Arc<dyn DriverRepository>,
        items: Arc<dyn EvaluationItemRepository>,
        evaluations: Arc<dyn EvaluationRepository>,
        ratings: Arc<dyn MonthlyRatingRepository>,
    ) -> Self {
        Self {
            drivers,
            items,
            evaluations,
            ratings,
        }
    }

    /// Report over every driver for the month containing `month`.
    ///
    /// Only the monthly rating is looked up by month. `overall` and
    /// `evaluations` aggregate every evaluation recorded for the driver.
    pub async fn performance(&self, month: NaiveDate) -> Result<PerformanceReport, ReportError> {
        let month = month_key(month);
        let drivers = self.drivers.list().await?;
        let items = self.items.list().await?;
        let ratings = self.ratings.for_month(month).await?;

        let mut rows = Vec::with_capacity(drivers.len());
        for driver in drivers {
            let records = self.evaluations.for_driver(&driver.id).await?;
            let card = aggregate_driver(&driver.id, &records, &items);
            let monthly_rating = ratings
                .iter()
                .find(|rating| rating.driver_id == driver.id)
                .map(|rating| rating.score);
            rows.push(PerformanceRow {
                rank: 0,
                driver_id: driver.id,
                name: driver.name,
                status: driver.status,
                status_label: driver.status.label(),
                overall: card.overall,
                evaluations: records.len(),
                monthly_rating,
            });
        }

        let report = PerformanceReport::build(month, rows);
        debug!(%month, drivers = report.rows.len(), "performance report built");
        Ok(report)
    }
}
