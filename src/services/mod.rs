//! Services - the concurrent roles of the shop
//!
//! This module contains the simulation's actors and the shared resource they meet at:
//! - `waiting_room` - Bounded FIFO of admitted customers
//! - `barber` - Single service loop (idle / serving)
//! - `receptionist` - Single admission loop in front of the waiting room
//! - `customer` - Per-arrival visit task and the customer generator
//! - `shop` - Startup ordering and shutdown of all roles

pub mod barber;
pub mod customer;
pub mod receptionist;
pub mod shop;
pub mod waiting_room;

// Re-export commonly used types
pub use barber::Barber;
pub use customer::{visit, CustomerGenerator, VisitTally};
pub use receptionist::{create_receptionist, Receptionist};
pub use shop::Shop;
pub use waiting_room::WaitingRoom;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Build an RNG for one role. With a seed each role gets its own
/// reproducible stream; without one it is seeded from OS entropy.
pub(crate) fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ stream),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut first = seeded_rng(Some(42), 1);
        let mut second = seeded_rng(Some(42), 1);
        let a: Vec<u64> = (0..4).map(|_| first.gen_range(0..1_000_000)).collect();
        let b: Vec<u64> = (0..4).map(|_| second.gen_range(0..1_000_000)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_streams_differ() {
        let mut barber = seeded_rng(Some(42), 1);
        let mut generator = seeded_rng(Some(42), 2);
        let a: u64 = barber.gen();
        let b: u64 = generator.gen();
        assert_ne!(a, b);
    }
}
