//! Customer visits and the generator that produces them
//!
//! Each arrival runs as its own task: walk in, hand yourself to the
//! receptionist, wait for the outcome slot, leave. The generator spawns one
//! such task per arrival at random intervals and keeps a tally of how the
//! visits ended.

use crate::domain::{Customer, CustomerId, Outcome};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::seeded_rng;
use anyhow::anyhow;
use rand::rngs::StdRng;
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{info, warn};

/// RNG stream for arrival gaps
const GENERATOR_RNG_STREAM: u64 = 2;

/// One customer's visit from arrival to leaving
///
/// Fails only when the shop shuts down before the customer is resolved.
pub async fn visit(
    id: CustomerId,
    front_desk: mpsc::Sender<Customer>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<Outcome> {
    let (customer, pending) = Customer::arrive(id);
    metrics.record_arrival();
    info!(customer_id = %id, "customer_arrived");

    front_desk
        .send(customer)
        .await
        .map_err(|_| anyhow!("shop closed before customer {} reached the receptionist", id))?;
    drop(front_desk);

    let outcome = pending.wait().await?;
    match outcome {
        Outcome::Served => info!(customer_id = %id, "customer_left_served"),
        Outcome::TurnedAway => info!(customer_id = %id, "customer_left_turned_away"),
    }
    Ok(outcome)
}

/// How the generator's visits ended
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VisitTally {
    pub spawned: u64,
    pub served: u64,
    pub turned_away: u64,
    /// Visits cut short by shutdown
    pub unresolved: u64,
}

impl VisitTally {
    fn record(&mut self, finished: Result<anyhow::Result<Outcome>, JoinError>) {
        match finished {
            Ok(Ok(Outcome::Served)) => self.served += 1,
            Ok(Ok(Outcome::TurnedAway)) => self.turned_away += 1,
            Ok(Err(e)) => {
                warn!(error = %e, "customer_visit_unresolved");
                self.unresolved += 1;
            }
            Err(e) => {
                warn!(error = %e, "customer_task_failed");
                self.unresolved += 1;
            }
        }
    }

    /// Visits that have ended, in any way
    pub fn finished(&self) -> u64 {
        self.served + self.turned_away + self.unresolved
    }
}

/// Spawns customer visits at random intervals
pub struct CustomerGenerator {
    front_desk: mpsc::Sender<Customer>,
    metrics: Arc<Metrics>,
    arrival_range_ms: Range<u64>,
    max_customers: Option<u64>,
    rng: StdRng,
    next_id: u64,
}

impl CustomerGenerator {
    pub fn new(config: &Config, front_desk: mpsc::Sender<Customer>, metrics: Arc<Metrics>) -> Self {
        Self {
            front_desk,
            metrics,
            arrival_range_ms: config.arrival_range_ms(),
            max_customers: config.max_customers(),
            rng: seeded_rng(config.seed(), GENERATOR_RNG_STREAM),
            next_id: 1,
        }
    }

    fn limit_reached(&self, spawned: u64) -> bool {
        self.max_customers.is_some_and(|max| spawned >= max)
    }

    /// Spawn visits until the customer limit or shutdown, then wait for every
    /// visit still in flight
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> VisitTally {
        info!(
            arrival_min_ms = %self.arrival_range_ms.start,
            arrival_max_ms = %self.arrival_range_ms.end,
            max_customers = ?self.max_customers,
            "customer_generator_started"
        );

        let mut tally = VisitTally::default();
        let mut visits = JoinSet::new();

        while !*shutdown.borrow() && !self.limit_reached(tally.spawned) {
            let id = CustomerId(self.next_id);
            self.next_id += 1;
            visits.spawn(visit(id, self.front_desk.clone(), self.metrics.clone()));
            tally.spawned += 1;

            while let Some(finished) = visits.try_join_next() {
                tally.record(finished);
            }

            if self.limit_reached(tally.spawned) {
                break;
            }

            let gap_ms = self.rng.gen_range(self.arrival_range_ms.clone());
            tokio::select! {
                _ = sleep(Duration::from_millis(gap_ms)) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        drop(self.front_desk);
        info!(spawned = %tally.spawned, in_flight = %visits.len(), "customer_generator_draining");

        while let Some(finished) = visits.join_next().await {
            tally.record(finished);
        }

        info!(
            spawned = %tally.spawned,
            served = %tally.served,
            turned_away = %tally.turned_away,
            unresolved = %tally.unresolved,
            "customer_generator_stopped"
        );
        tally
    }
}
