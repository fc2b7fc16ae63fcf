//! Receptionist - single admission loop in front of the waiting room
//!
//! Greets arrivals one at a time in the order they came in and tries to seat
//! each without blocking. When every chair is taken the customer is turned
//! away on the spot; admitted customers are left for the barber to resolve.

use crate::domain::{Customer, Outcome};
use crate::infra::metrics::Metrics;
use crate::services::waiting_room::WaitingRoom;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

pub struct Receptionist {
    room: Arc<WaitingRoom>,
    incoming: mpsc::Receiver<Customer>,
    metrics: Arc<Metrics>,
}

impl Receptionist {
    pub fn new(
        room: Arc<WaitingRoom>,
        incoming: mpsc::Receiver<Customer>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { room, incoming, metrics }
    }

    /// Run until the incoming stream closes or shutdown is requested
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(capacity = %self.room.capacity(), "receptionist_started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = self.incoming.recv() => match next {
                    Some(customer) => {
                        self.admit(customer);
                    }
                    None => break,
                },
            }
        }

        // Anyone still queued at the door leaves unresolved
        self.incoming.close();
        info!("receptionist_stopped");
    }

    /// Greet one customer and try to seat them
    ///
    /// Returns the outcome when it is already decided (turned away), None when
    /// the customer now waits for the barber.
    pub fn admit(&self, customer: Customer) -> Option<Outcome> {
        let customer_id = customer.id();
        info!(customer_id = %customer_id, "receptionist_greeted");

        match self.room.try_admit(customer) {
            Ok(occupancy) => {
                self.metrics.record_admitted(occupancy);
                info!(
                    customer_id = %customer_id,
                    occupancy = %occupancy,
                    capacity = %self.room.capacity(),
                    "customer_admitted"
                );
                None
            }
            Err(customer) => {
                self.metrics.record_turned_away();
                info!(
                    customer_id = %customer_id,
                    capacity = %self.room.capacity(),
                    "customer_turned_away"
                );
                customer.resolve(Outcome::TurnedAway);
                Some(Outcome::TurnedAway)
            }
        }
    }
}

/// Create the front-desk channel and the receptionist serving it
///
/// tokio channels hold at least one message, so a `buffer_size` of 1 is the
/// closest to an unbuffered handoff: one customer's `send` may complete before
/// the receptionist has received it, the next one waits.
///
/// Returns the sender (for customers) and the receptionist (to be spawned)
pub fn create_receptionist(
    room: Arc<WaitingRoom>,
    metrics: Arc<Metrics>,
    buffer_size: usize,
) -> (mpsc::Sender<Customer>, Receptionist) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let receptionist = Receptionist::new(room, rx, metrics);
    (tx, receptionist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CustomerId;

    fn front_desk(capacity: usize) -> (mpsc::Sender<Customer>, Receptionist, Arc<WaitingRoom>) {
        let room = Arc::new(WaitingRoom::new(capacity));
        let (tx, receptionist) = create_receptionist(room.clone(), Arc::new(Metrics::new()), 1);
        (tx, receptionist, room)
    }

    #[tokio::test]
    async fn test_admits_while_seats_free() {
        let (_tx, receptionist, room) = front_desk(2);

        let (c1, _p1) = Customer::arrive(CustomerId(1));
        assert_eq!(receptionist.admit(c1), None);
        assert_eq!(room.len(), 1);
        assert_eq!(receptionist.metrics.admitted_total(), 1);
    }

    #[tokio::test]
    async fn test_turns_away_when_full() {
        let (_tx, receptionist, room) = front_desk(2);

        let (c1, _p1) = Customer::arrive(CustomerId(1));
        let (c2, _p2) = Customer::arrive(CustomerId(2));
        let (c3, p3) = Customer::arrive(CustomerId(3));
        receptionist.admit(c1);
        receptionist.admit(c2);

        assert_eq!(receptionist.admit(c3), Some(Outcome::TurnedAway));
        assert_eq!(p3.wait().await.unwrap(), Outcome::TurnedAway);

        // Customer 3 never entered the room
        let seated: Vec<u64> =
            std::iter::from_fn(|| room.take_if_any()).map(|c| c.id().0).collect();
        assert_eq!(seated, vec![1, 2]);
        assert_eq!(receptionist.metrics.turned_away_total(), 1);
    }

    #[tokio::test]
    async fn test_run_processes_stream_in_order() {
        let (tx, receptionist, room) = front_desk(2);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(receptionist.run(shutdown_rx));

        let mut pending = Vec::new();
        for id in 1..=3 {
            let (customer, p) = Customer::arrive(CustomerId(id));
            tx.send(customer).await.unwrap();
            pending.push(p);
        }
        drop(tx);
        handle.await.unwrap();

        let third = pending.pop().unwrap();
        assert_eq!(third.wait().await.unwrap(), Outcome::TurnedAway);
        assert_eq!(room.take_if_any().map(|c| c.id()), Some(CustomerId(1)));
        assert_eq!(room.take_if_any().map(|c| c.id()), Some(CustomerId(2)));
    }

    #[tokio::test]
    async fn test_front_desk_holds_one_arrival() {
        let (tx, receptionist, room) = front_desk(2);

        // Nobody is receiving yet: the first arrival fits, the second has to wait
        let (c1, _p1) = Customer::arrive(CustomerId(1));
        let (c2, _p2) = Customer::arrive(CustomerId(2));
        assert!(tx.try_send(c1).is_ok());
        assert!(matches!(tx.try_send(c2), Err(mpsc::error::TrySendError::Full(_))));
        assert!(room.is_empty());

        drop(tx);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        receptionist.run(shutdown_rx).await;
        assert_eq!(room.take_if_any().map(|c| c.id()), Some(CustomerId(1)));
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let (_tx, receptionist, _room) = front_desk(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(receptionist.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
