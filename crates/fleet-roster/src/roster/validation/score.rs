use std::ops::RangeInclusive;

use chrono::NaiveDate;

use super::ValidationError;

pub const EVALUATION_SCORE_RANGE: RangeInclusive<u8> = 1..=10;
pub const MONTHLY_RATING_RANGE: RangeInclusive<u8> = 0..=10;

/// Stored evaluation scores are the typed value times ten.
const SCORE_SCALE: f32 = 10.0;

fn parse_bounded(
    field: &'static str,
    raw: &str,
    range: &RangeInclusive<u8>,
) -> Result<f32, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Required { field });
    }

    let value: f32 = raw
        .replace(',', ".")
        .parse()
        .map_err(|_| ValidationError::NotANumber { field })?;
    if !value.is_finite() {
        return Err(ValidationError::NotANumber { field });
    }

    if value < f32::from(*range.start()) || value > f32::from(*range.end()) {
        return Err(ValidationError::OutOfRange {
            field,
            min: *range.start(),
            max: *range.end(),
        });
    }

    Ok(value)
}

/// Parses a 1–10 evaluation score and returns it on the stored ×10 scale.
pub fn parse_evaluation_score(raw: &str) -> Result<u16, ValidationError> {
    let value = parse_bounded("score", raw, &EVALUATION_SCORE_RANGE)?;
    Ok((value * SCORE_SCALE).round() as u16)
}

/// Parses a 0–10 monthly rating.
pub fn parse_monthly_rating(raw: &str) -> Result<f32, ValidationError> {
    parse_bounded("rating", raw, &MONTHLY_RATING_RANGE)
}

pub fn validate_admission_date(
    admitted_on: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let date = admitted_on.ok_or(ValidationError::Required {
        field: "admission date",
    })?;
    if date > today {
        return Err(ValidationError::FutureDate);
    }
    Ok(date)
}
