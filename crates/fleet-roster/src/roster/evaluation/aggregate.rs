use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::STORED_SCORE_SCALE;
use crate::roster::domain::{
    DriverEvaluation, DriverId, EvaluationItem, EvaluationItemId, ItemWeight,
};

/// Mean score of one driver on one item, back on the 1–10 display scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAverage {
    pub item_id: EvaluationItemId,
    pub name: String,
    pub weight: ItemWeight,
    pub average: f32,
    pub samples: usize,
}

/// Every item a driver has been scored on, plus the weight-weighted overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverScorecard {
    pub driver_id: DriverId,
    /// Heaviest items first. Items without records have no entry.
    pub items: Vec<ItemAverage>,
    /// `None` when the driver has no evaluations.
    pub overall: Option<f32>,
}

impl DriverScorecard {
    pub fn item(&self, item_id: &EvaluationItemId) -> Option<&ItemAverage> {
        self.items.iter().find(|entry| &entry.item_id == item_id)
    }
}

#[derive(Default)]
struct Tally {
    sum: u32,
    count: usize,
}

/// Groups `records` of `driver_id` by item and averages each group.
///
/// Records for other drivers, and records whose item no longer exists, are ignored.
pub fn aggregate_driver(
    driver_id: &DriverId,
    records: &[DriverEvaluation],
    items: &[EvaluationItem],
) -> DriverScorecard {
    let mut tallies: HashMap<&EvaluationItemId, Tally> = HashMap::new();
    for record in records.iter().filter(|record| &record.driver_id == driver_id) {
        let tally = tallies.entry(&record.item_id).or_default();
        tally.sum += u32::from(record.score);
        tally.count += 1;
    }

    let mut entries: Vec<ItemAverage> = Vec::with_capacity(tallies.len());
    for (item_id, tally) in tallies {
        let Some(item) = items.iter().find(|item| &item.id == item_id) else {
            debug!(%driver_id, %item_id, "skipping evaluations of a deleted item");
            continue;
        };
        entries.push(ItemAverage {
            item_id: item.id.clone(),
            name: item.name.clone(),
            weight: item.weight,
            average: tally.sum as f32 / tally.count as f32 / STORED_SCORE_SCALE,
            samples: tally.count,
        });
    }

    entries.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.name.cmp(&b.name)));

    let overall = weighted_overall(&entries);
    DriverScorecard {
        driver_id: driver_id.clone(),
        items: entries,
        overall,
    }
}

fn weighted_overall(entries: &[ItemAverage]) -> Option<f32> {
    let total_weight: u32 = entries.iter().map(|entry| u32::from(entry.weight.get())).sum();
    if total_weight == 0 {
        return None;
    }
    let weighted: f32 = entries
        .iter()
        .map(|entry| entry.average * f32::from(entry.weight.get()))
        .sum();
    Some(weighted / total_weight as f32)
}

/// One decimal place, or `-` when there is nothing to show.
pub fn display_score(score: Option<f32>) -> String {
    match score {
        Some(score) => format!("{score:.1}"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::domain::{EvaluationId, UserId};
    use chrono::{TimeZone, Utc};

    fn item(id: &str, name: &str, weight: u8) -> EvaluationItem {
        EvaluationItem {
            id: EvaluationItemId(id.to_string()),
            name: name.to_string(),
            description: None,
            weight: ItemWeight::new(weight).expect("weight in range"),
        }
    }

    fn record(driver: &str, item: &str, score: u16) -> DriverEvaluation {
        DriverEvaluation {
            id: EvaluationId::generate(),
            driver_id: DriverId(driver.to_string()),
            item_id: EvaluationItemId(item.to_string()),
            score,
            notes: String::new(),
            evaluator_id: UserId("usr-1".to_string()),
            evaluated_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn averages_per_item_on_display_scale() {
        let items = vec![item("punctuality", "Punctuality", 3)];
        let records = vec![
            record("drv-1", "punctuality", 80),
            record("drv-1", "punctuality", 100),
        ];

        let card = aggregate_driver(&DriverId("drv-1".to_string()), &records, &items);

        assert_eq!(card.items.len(), 1);
        assert_eq!(card.items[0].average, 9.0);
        assert_eq!(card.items[0].samples, 2);
        assert_eq!(card.items[0].weight.get(), 3);
    }

    #[test]
    fn items_without_records_produce_no_entry() {
        let items = vec![item("safety", "Safety", 5), item("care", "Vehicle care", 2)];
        let records = vec![record("drv-1", "care", 70), record("drv-2", "safety", 90)];

        let card = aggregate_driver(&DriverId("drv-1".to_string()), &records, &items);

        assert_eq!(card.items.len(), 1);
        assert!(card.item(&EvaluationItemId("safety".to_string())).is_none());
        assert_eq!(card.items[0].average, 7.0);
    }

    #[test]
    fn empty_history_has_no_overall_score() {
        let items = vec![item("safety", "Safety", 5)];
        let card = aggregate_driver(&DriverId("drv-1".to_string()), &[], &items);
        assert!(card.items.is_empty());
        assert_eq!(card.overall, None);
        assert_eq!(display_score(card.overall), "-");
    }

    #[test]
    fn overall_is_weighted_by_item_importance() {
        let items = vec![item("safety", "Safety", 4), item("care", "Vehicle care", 1)];
        let records = vec![record("drv-1", "safety", 100), record("drv-1", "care", 50)];

        let card = aggregate_driver(&DriverId("drv-1".to_string()), &records, &items);

        assert_eq!(card.items[0].name, "Safety");
        assert_eq!(card.overall, Some(9.0));
        assert_eq!(display_score(card.overall), "9.0");
    }

    #[test]
    fn records_of_deleted_items_are_skipped() {
        let records = vec![record("drv-1", "gone", 60)];
        let card = aggregate_driver(&DriverId("drv-1".to_string()), &records, &[]);
        assert!(card.items.is_empty());
    }
}
