use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::aggregate::{aggregate_driver, DriverScorecard};
use super::feed::{EvaluationChange, EvaluationFeed};
use crate::roster::domain::{
    DriverEvaluation, DriverId, EvaluationId, EvaluationItem, EvaluationItemId, ItemWeight, Role,
};
use crate::roster::repository::{
    AuthError, DriverRepository, EvaluationItemRepository, EvaluationRepository, RepositoryError,
};
use crate::roster::users::{AccessControl, AccessError};
use crate::roster::validation::{parse_evaluation_score, FieldErrors, ValidationError};

/// Administrator input for creating or editing an evaluation item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: u8,
}

fn default_weight() -> u8 {
    ItemWeight::default().get()
}

/// One typed score from the evaluation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub item_id: EvaluationItemId,
    pub score: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error("invalid evaluation input: {0}")]
    Validation(FieldErrors),
    #[error("user not authenticated")]
    Unauthenticated,
    #[error("the {} role is required", .0.label())]
    Forbidden(Role),
    #[error("driver {0} not found")]
    DriverNotFound(DriverId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<AccessError> for EvaluationServiceError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Self::Unauthenticated,
            AccessError::Forbidden(role) => Self::Forbidden(role),
            AccessError::Repository(err) => Self::Repository(err),
            AccessError::Auth(err) => Self::Auth(err),
        }
    }
}

/// Service composing the item catalogue, evaluation history and change feed.
///
/// Editing the catalogue takes the administrator role; scoring drivers only
/// takes a signed-in operator.
pub struct EvaluationService {
    items: Arc<dyn EvaluationItemRepository>,
    evaluations: Arc<dyn EvaluationRepository>,
    drivers: Arc<dyn DriverRepository>,
    access: Arc<AccessControl>,
    feed: EvaluationFeed,
}

impl EvaluationService {
    pub fn new(
        items: Arc<dyn EvaluationItemRepository>,
        evaluations: Arc<dyn EvaluationRepository>,
        drivers: Arc<dyn DriverRepository>,
        access: Arc<AccessControl>,
        feed: EvaluationFeed,
    ) -> Self {
        Self {
            items,
            evaluations,
            drivers,
            access,
            feed,
        }
    }

    pub fn feed(&self) -> &EvaluationFeed {
        &self.feed
    }

    pub async fn list_items(&self) -> Result<Vec<EvaluationItem>, EvaluationServiceError> {
        Ok(self.items.list().await?)
    }

    pub async fn create_item(
        &self,
        draft: ItemDraft,
    ) -> Result<EvaluationItem, EvaluationServiceError> {
        self.access.require(Role::Administrator).await?;
        let item = build_item(EvaluationItemId::generate(), draft)?;
        let stored = self.items.insert(item).await?;
        info!(item_id = %stored.id, weight = stored.weight.get(), "evaluation item created");
        Ok(stored)
    }

    pub async fn update_item(
        &self,
        id: &EvaluationItemId,
        draft: ItemDraft,
    ) -> Result<EvaluationItem, EvaluationServiceError> {
        self.access.require(Role::Administrator).await?;
        let item = build_item(id.clone(), draft)?;
        self.items.update(item.clone()).await?;
        info!(item_id = %id, "evaluation item updated");
        Ok(item)
    }

    pub async fn delete_item(&self, id: &EvaluationItemId) -> Result<(), EvaluationServiceError> {
        self.access.require(Role::Administrator).await?;
        self.items.delete(id).await?;
        info!(item_id = %id, "evaluation item deleted");
        Ok(())
    }

    /// Scores a driver on every current item in one batch.
    ///
    /// Nothing is written unless every item has a valid 1–10 score and an
    /// evaluator is signed in.
    pub async fn submit(
        &self,
        driver_id: &DriverId,
        entries: Vec<ScoreEntry>,
    ) -> Result<Vec<DriverEvaluation>, EvaluationServiceError> {
        if self.drivers.fetch(driver_id).await?.is_none() {
            return Err(EvaluationServiceError::DriverNotFound(driver_id.clone()));
        }

        let items = self.items.list().await?;
        let scored = validate_entries(&items, entries).map_err(EvaluationServiceError::Validation)?;

        let evaluator_id = self.access.signed_in_user().await?;

        let evaluated_at = Utc::now();
        let records: Vec<DriverEvaluation> = scored
            .into_iter()
            .map(|(item_id, score, notes)| DriverEvaluation {
                id: EvaluationId::generate(),
                driver_id: driver_id.clone(),
                item_id,
                score,
                notes,
                evaluator_id: evaluator_id.clone(),
                evaluated_at,
            })
            .collect();

        let stored = match self.evaluations.insert_batch(records).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, %driver_id, "failed to save evaluation");
                return Err(err.into());
            }
        };

        info!(%driver_id, %evaluator_id, inserted = stored.len(), "evaluation recorded");
        self.feed.publish(EvaluationChange {
            driver_id: driver_id.clone(),
            inserted: stored.len(),
        });
        Ok(stored)
    }

    pub async fn scorecard(
        &self,
        driver_id: &DriverId,
    ) -> Result<DriverScorecard, EvaluationServiceError> {
        let records = self.evaluations.for_driver(driver_id).await?;
        let items = self.items.list().await?;
        Ok(aggregate_driver(driver_id, &records, &items))
    }
}

fn build_item(
    id: EvaluationItemId,
    draft: ItemDraft,
) -> Result<EvaluationItem, EvaluationServiceError> {
    let mut errors = FieldErrors::new();

    let name = draft.name.trim().to_string();
    if name.is_empty() {
        errors.push("name", ValidationError::Required { field: "item name" });
    }
    let weight = ItemWeight::new(draft.weight);
    if weight.is_none() {
        errors.push(
            "weight",
            ValidationError::OutOfRange {
                field: "weight",
                min: ItemWeight::MIN,
                max: ItemWeight::MAX,
            },
        );
    }
    errors
        .into_result()
        .map_err(EvaluationServiceError::Validation)?;

    let description = draft
        .description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    Ok(EvaluationItem {
        id,
        name,
        description,
        weight: weight.unwrap_or_default(),
    })
}

type ScoredEntry = (EvaluationItemId, u16, String);

fn validate_entries(
    items: &[EvaluationItem],
    entries: Vec<ScoreEntry>,
) -> Result<Vec<ScoredEntry>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let known: HashSet<&EvaluationItemId> = items.iter().map(|item| &item.id).collect();
    let mut seen: HashSet<EvaluationItemId> = HashSet::new();
    let mut scored = Vec::with_capacity(entries.len());

    for entry in entries {
        if !known.contains(&entry.item_id) {
            errors.push(
                entry.item_id.as_str(),
                ValidationError::Rule("unknown evaluation item".to_string()),
            );
            continue;
        }
        if !seen.insert(entry.item_id.clone()) {
            errors.push(
                entry.item_id.as_str(),
                ValidationError::Rule("item scored more than once".to_string()),
            );
            continue;
        }
        if let Some(score) = errors.check(entry.item_id.as_str(), parse_evaluation_score(&entry.score)) {
            scored.push((entry.item_id, score, entry.notes.unwrap_or_default()));
        }
    }

    for item in items {
        if !seen.contains(&item.id) {
            errors.push(item.id.as_str(), ValidationError::Required { field: "score" });
        }
    }

    errors.into_result().map(|()| scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, weight: u8) -> EvaluationItem {
        EvaluationItem {
            id: EvaluationItemId(id.to_string()),
            name: id.to_string(),
            description: None,
            weight: ItemWeight::new(weight).expect("weight in range"),
        }
    }

    fn entry(id: &str, score: &str) -> ScoreEntry {
        ScoreEntry {
            item_id: EvaluationItemId(id.to_string()),
            score: score.to_string(),
            notes: None,
        }
    }

    #[test]
    fn every_item_needs_a_score() {
        let items = vec![item("safety", 5), item("care", 2)];
        let errors = validate_entries(&items, vec![entry("safety", "9")]).expect_err("care missing");
        assert_eq!(errors.get("care"), Some("score is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn out_of_range_and_unknown_items_are_reported_per_field() {
        let items = vec![item("safety", 5)];
        let errors = validate_entries(
            &items,
            vec![entry("safety", "11"), entry("ghost", "5")],
        )
        .expect_err("invalid entries");
        assert_eq!(errors.get("safety"), Some("score must be between 1 and 10"));
        assert_eq!(errors.get("ghost"), Some("unknown evaluation item"));
    }

    #[test]
    fn valid_entries_are_scaled() {
        let items = vec![item("safety", 5)];
        let scored = validate_entries(&items, vec![entry("safety", "7.5")]).expect("valid");
        assert_eq!(scored, vec![(EvaluationItemId("safety".to_string()), 75, String::new())]);
    }

    #[test]
    fn item_drafts_are_trimmed_and_range_checked() {
        let item = build_item(
            EvaluationItemId("i".to_string()),
            ItemDraft {
                name: "  Safety  ".to_string(),
                description: Some("   ".to_string()),
                weight: 3,
            },
        )
        .expect("valid item");
        assert_eq!(item.name, "Safety");
        assert_eq!(item.description, None);

        let err = build_item(
            EvaluationItemId("i".to_string()),
            ItemDraft {
                name: " ".to_string(),
                description: None,
                weight: 9,
            },
        )
        .expect_err("invalid item");
        match err {
            EvaluationServiceError::Validation(errors) => {
                assert_eq!(errors.get("name"), Some("item name is required"));
                assert_eq!(errors.get("weight"), Some("weight must be between 1 and 5"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
