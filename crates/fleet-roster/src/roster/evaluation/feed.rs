use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::roster::domain::DriverId;

const DEFAULT_CAPACITY: usize = 64;

/// Emitted whenever evaluation rows are written for a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationChange {
    pub driver_id: DriverId,
    pub inserted: usize,
}

/// Change notifications for the `driver_evaluations` collection.
#[derive(Debug, Clone)]
pub struct EvaluationFeed {
    sender: broadcast::Sender<EvaluationChange>,
}

impl Default for EvaluationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EvaluationFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, change: EvaluationChange) {
        // No receivers is fine: nobody is watching that driver.
        let _ = self.sender.send(change);
    }

    /// Changes for one driver only. Dropping the subscription unsubscribes.
    pub fn subscribe(&self, driver_id: DriverId) -> DriverEvaluationSubscription {
        DriverEvaluationSubscription {
            driver_id,
            receiver: self.sender.subscribe(),
        }
    }
}

pub struct DriverEvaluationSubscription {
    driver_id: DriverId,
    receiver: broadcast::Receiver<EvaluationChange>,
}

impl DriverEvaluationSubscription {
    /// Next change for the subscribed driver; `None` once the feed is gone.
    ///
    /// When the subscriber fell behind, a synthetic change is returned so the
    /// caller refetches instead of trusting a partial view.
    pub async fn next(&mut self) -> Option<EvaluationChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.driver_id == self.driver_id => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(driver_id = %self.driver_id, skipped, "evaluation feed lagged");
                    return Some(EvaluationChange {
                        driver_id: self.driver_id.clone(),
                        inserted: 0,
                    });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn driver_id(&self) -> &DriverId {
        &self.driver_id
    }
}
