//! Customer entity and its one-shot outcome slot
//!
//! A customer is created together with a `PendingOutcome`. The customer value
//! travels Receptionist -> WaitingRoom -> Barber and carries the writing half of
//! the slot; whoever ends up holding it resolves the visit by consuming it.
//! Because `resolve` takes `self`, a slot can be written at most once.

use crate::domain::types::{CustomerId, Outcome};
use anyhow::anyhow;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

/// A customer in flight through the shop
#[derive(Debug)]
pub struct Customer {
    id: CustomerId,
    arrived_at: Instant,
    slot: oneshot::Sender<Outcome>,
}

impl Customer {
    /// Create a customer and the receiving half of its outcome slot
    pub fn arrive(id: CustomerId) -> (Self, PendingOutcome) {
        let (slot, rx) = oneshot::channel();
        let customer = Self { id, arrived_at: Instant::now(), slot };
        (customer, PendingOutcome { id, rx })
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn arrived_at(&self) -> Instant {
        self.arrived_at
    }

    /// Deliver the outcome, consuming the customer
    ///
    /// Returns false if the customer task is no longer listening.
    pub fn resolve(self, outcome: Outcome) -> bool {
        match self.slot.send(outcome) {
            Ok(()) => true,
            Err(_) => {
                debug!(customer_id = %self.id, outcome = %outcome.as_str(), "outcome_undelivered");
                false
            }
        }
    }
}

/// Receiving half of a customer's outcome slot
#[derive(Debug)]
pub struct PendingOutcome {
    id: CustomerId,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingOutcome {
    pub fn id(&self) -> CustomerId {
        self.id
    }

    /// Wait until the receptionist or the barber resolves the visit
    ///
    /// Fails only if the customer was dropped unresolved, which happens when
    /// the shop shuts down with the customer still inside.
    pub async fn wait(self) -> anyhow::Result<Outcome> {
        let id = self.id;
        self.rx.await.map_err(|_| anyhow!("shop closed before customer {} was resolved", id))
    }
}
