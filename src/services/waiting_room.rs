//! Bounded FIFO waiting room shared by the receptionist and the barber
//!
//! Both operations are attempt-and-report: neither ever suspends the caller.
//! The capacity check and FIFO order live behind one mutex so every
//! `try_admit`/`take_if_any` is atomic with respect to occupancy.

use crate::domain::Customer;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

pub struct WaitingRoom {
    capacity: usize,
    seats: Mutex<VecDeque<Customer>>,
    /// Signalled on every admission; only used by a barber in notify mode
    admitted: Notify,
}

impl WaitingRoom {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "waiting room needs at least one seat");
        Self {
            capacity,
            seats: Mutex::new(VecDeque::with_capacity(capacity)),
            admitted: Notify::new(),
        }
    }

    /// Seat the customer if a chair is free
    ///
    /// Returns the occupancy after admission, or hands the customer back
    /// untouched when the room is full.
    pub fn try_admit(&self, customer: Customer) -> Result<usize, Customer> {
        let occupancy = {
            let mut seats = self.seats.lock();
            if seats.len() >= self.capacity {
                return Err(customer);
            }
            seats.push_back(customer);
            assert!(seats.len() <= self.capacity, "waiting room over capacity");
            seats.len()
        };
        self.admitted.notify_one();
        Ok(occupancy)
    }

    /// Remove the customer who has waited longest, if anyone is waiting
    pub fn take_if_any(&self) -> Option<Customer> {
        self.seats.lock().pop_front()
    }

    /// Resolves after the next admission (or immediately if one happened
    /// since the last call)
    pub async fn wait_for_admission(&self) {
        self.admitted.notified().await;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.seats.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.seats.lock().len() >= self.capacity
    }
}
