//! Shared types for the barbershop simulation

/// Newtype wrapper for customer IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CustomerId(pub u64);

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a customer's visit ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Got a haircut from the barber
    Served,
    /// Waiting room was full on arrival
    TurnedAway,
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Served => "served",
            Outcome::TurnedAway => "turned_away",
        }
    }

    #[inline]
    pub fn is_served(&self) -> bool {
        *self == Outcome::Served
    }
}

impl From<bool> for Outcome {
    fn from(served: bool) -> Self {
        if served {
            Outcome::Served
        } else {
            Outcome::TurnedAway
        }
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> Self {
        outcome.is_served()
    }
}

/// Barber state, published on a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarberState {
    /// Started but has not checked the waiting room yet
    Starting,
    /// Nobody waiting, barber is dozing
    Idle,
    /// Cutting hair for one customer
    Serving(CustomerId),
    /// Loop exited on shutdown
    Stopped,
}

impl BarberState {
    pub fn as_str(&self) -> &str {
        match self {
            BarberState::Starting => "starting",
            BarberState::Idle => "idle",
            BarberState::Serving(_) => "serving",
            BarberState::Stopped => "stopped",
        }
    }

    /// Customer currently in the chair, if any
    pub fn in_chair(&self) -> Option<CustomerId> {
        match self {
            BarberState::Serving(id) => Some(*id),
            _ => None,
        }
    }
}
