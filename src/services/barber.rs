//! Barber - the single service loop
//!
//! The barber checks the waiting room without blocking. With someone waiting
//! he cuts their hair for a random duration and resolves their outcome slot as
//! served; otherwise he dozes for the idle interval and checks again. The first
//! doze fires the one-time ready notification the shop waits on before letting
//! anyone in.
//!
//! Only the first idle cycle of a quiet stretch logs `barber_sleeping` at info;
//! the following ones log `barber_still_sleeping` at debug, so at the default
//! level the log shows one sleeping line per stretch rather than one per
//! interval. Every cycle is still counted in `idle_cycles`.

use crate::domain::{BarberState, Customer, Outcome};
use crate::infra::config::{Config, WakeMode};
use crate::infra::metrics::Metrics;
use crate::services::seeded_rng;
use crate::services::waiting_room::WaitingRoom;
use rand::rngs::StdRng;
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info};

/// RNG stream for haircut durations
const BARBER_RNG_STREAM: u64 = 1;

pub struct Barber {
    room: Arc<WaitingRoom>,
    metrics: Arc<Metrics>,
    service_range_ms: Range<u64>,
    idle_interval: Duration,
    wake_mode: WakeMode,
    rng: StdRng,
    /// Taken on the first doze; None afterwards
    ready_tx: Option<oneshot::Sender<()>>,
    /// Set while consecutive idle cycles repeat
    dozing: bool,
    state_tx: watch::Sender<BarberState>,
}

impl Barber {
    /// Create a barber together with the receiver of its ready notification
    pub fn new(
        config: &Config,
        room: Arc<WaitingRoom>,
        metrics: Arc<Metrics>,
    ) -> (Self, oneshot::Receiver<()>) {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (state_tx, _) = watch::channel(BarberState::Starting);
        let barber = Self {
            room,
            metrics,
            service_range_ms: config.service_range_ms(),
            idle_interval: config.idle_interval(),
            wake_mode: config.wake_mode(),
            rng: seeded_rng(config.seed(), BARBER_RNG_STREAM),
            ready_tx: Some(ready_tx),
            dozing: false,
            state_tx,
        };
        (barber, ready_rx)
    }

    /// Watch the barber's state transitions
    pub fn subscribe(&self) -> watch::Receiver<BarberState> {
        self.state_tx.subscribe()
    }

    /// Run until shutdown. A haircut in progress is always finished.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(wake_mode = ?self.wake_mode, "barber_started");

        while !*shutdown.borrow() {
            match self.room.take_if_any() {
                Some(customer) => self.cut_hair(customer).await,
                None => {
                    if !self.doze(&mut shutdown).await {
                        break;
                    }
                }
            }
        }

        self.close_up();
    }

    /// Serving: hold the customer for a random duration, then resolve as served
    async fn cut_hair(&mut self, customer: Customer) {
        let customer_id = customer.id();
        let waited_ms = customer.arrived_at().elapsed().as_millis() as u64;
        self.metrics.set_occupancy(self.room.len());
        self.metrics.record_wait(waited_ms);
        self.dozing = false;
        self.state_tx.send_replace(BarberState::Serving(customer_id));

        let haircut_ms = self.rng.gen_range(self.service_range_ms.clone());
        info!(
            customer_id = %customer_id,
            haircut_ms = %haircut_ms,
            waited_ms = %waited_ms,
            "haircut_started"
        );

        sleep(Duration::from_millis(haircut_ms)).await;

        info!(customer_id = %customer_id, haircut_ms = %haircut_ms, "haircut_finished");
        self.metrics.record_served(haircut_ms);
        customer.resolve(Outcome::Served);
        self.state_tx.send_replace(BarberState::Idle);
    }

    /// Idle: announce readiness once, then sleep until the interval passes
    /// (or an admission arrives in notify mode).
    ///
    /// Returns false when shutdown was requested.
    async fn doze(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        self.metrics.record_idle_cycle();
        self.state_tx.send_replace(BarberState::Idle);
        if self.dozing {
            debug!("barber_still_sleeping");
        } else {
            info!("barber_sleeping");
            self.dozing = true;
        }

        if let Some(ready_tx) = self.ready_tx.take() {
            let _ = ready_tx.send(());
            info!("barber_ready");
        }

        let room = self.room.clone();
        let wake_mode = self.wake_mode;
        let woken_by_admission = async move {
            match wake_mode {
                WakeMode::Notify => room.wait_for_admission().await,
                WakeMode::Poll => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = sleep(self.idle_interval) => true,
            _ = woken_by_admission => {
                debug!("barber_woken_by_admission");
                true
            }
            changed = shutdown.changed() => changed.is_ok() && !*shutdown.borrow(),
        }
    }

    /// Send home anyone still waiting; their visits end unresolved
    fn close_up(&mut self) {
        let mut sent_home = 0;
        while let Some(customer) = self.room.take_if_any() {
            debug!(customer_id = %customer.id(), "customer_sent_home");
            drop(customer);
            sent_home += 1;
        }
        self.metrics.set_occupancy(0);
        self.state_tx.send_replace(BarberState::Stopped);
        info!(sent_home = %sent_home, "barber_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerId, PendingOutcome};
    use tokio::time::{timeout, Instant};

    fn test_config() -> Config {
        Config::default().with_seed(7)
    }

    fn admit(room: &WaitingRoom, id: u64) -> PendingOutcome {
        let (customer, pending) = Customer::arrive(CustomerId(id));
        assert!(room.try_admit(customer).is_ok());
        pending
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_fires_on_first_idle_cycle() {
        let room = Arc::new(WaitingRoom::new(6));
        let metrics = Arc::new(Metrics::new());
        let (barber, ready_rx) = Barber::new(&test_config(), room, metrics.clone());
        let state = barber.subscribe();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(barber.run(shutdown_rx));

        ready_rx.await.unwrap();
        assert_eq!(*state.borrow(), BarberState::Idle);
        assert_eq!(metrics.idle_cycles_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_idle_cycle_counted_in_quiet_stretch() {
        let room = Arc::new(WaitingRoom::new(6));
        let metrics = Arc::new(Metrics::new());
        let (barber, _ready_rx) = Barber::new(&test_config(), room, metrics.clone());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(barber.run(shutdown_rx));

        // Dozes at 0, 1000, 2000 and 3000 ms
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(metrics.idle_cycles_total(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_serves_waiting_customers_in_order() {
        let room = Arc::new(WaitingRoom::new(6));
        let metrics = Arc::new(Metrics::new());
        let p1 = admit(&room, 1);
        let p2 = admit(&room, 2);

        let (barber, _ready_rx) = Barber::new(&test_config(), room.clone(), metrics.clone());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(barber.run(shutdown_rx));

        let served_first = tokio::spawn(async move {
            let outcome = p1.wait().await.unwrap();
            (outcome, Instant::now())
        });
        let (o2, t2) = (p2.wait().await.unwrap(), Instant::now());
        let (o1, t1) = served_first.await.unwrap();

        assert_eq!(o1, Outcome::Served);
        assert_eq!(o2, Outcome::Served);
        assert!(t1 < t2);
        assert_eq!(metrics.served_total(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_haircut_duration_within_range() {
        let config = test_config().with_service_range_ms(2000, 6000);
        let room = Arc::new(WaitingRoom::new(1));
        let metrics = Arc::new(Metrics::new());
        let pending = admit(&room, 1);

        let (barber, _ready_rx) = Barber::new(&config, room, metrics);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let start = Instant::now();
        tokio::spawn(barber.run(shutdown_rx));
        assert_eq!(pending.wait().await.unwrap(), Outcome::Served);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_tracks_customer_in_chair() {
        let room = Arc::new(WaitingRoom::new(2));
        let metrics = Arc::new(Metrics::new());
        let pending = admit(&room, 9);

        let (barber, _ready_rx) = Barber::new(&test_config(), room, metrics);
        let mut state = barber.subscribe();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(barber.run(shutdown_rx));

        let serving = state.wait_for(|s| s.in_chair().is_some()).await.unwrap().in_chair();
        assert_eq!(serving, Some(CustomerId(9)));

        pending.wait().await.unwrap();
        state.wait_for(|s| *s == BarberState::Idle).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_mode_wakes_before_interval() {
        let config = test_config()
            .with_idle_interval_ms(60_000)
            .with_service_range_ms(10, 20)
            .with_wake_mode(WakeMode::Notify);
        let room = Arc::new(WaitingRoom::new(2));
        let metrics = Arc::new(Metrics::new());

        let (barber, ready_rx) = Barber::new(&config, room.clone(), metrics);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(barber.run(shutdown_rx));
        ready_rx.await.unwrap();

        let pending = admit(&room, 1);
        let outcome = timeout(Duration::from_secs(1), pending.wait()).await.unwrap().unwrap();
        assert_eq!(outcome, Outcome::Served);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_sends_waiting_customers_home() {
        // Long haircut keeps customer 2 in the room when shutdown arrives
        let config = test_config().with_service_range_ms(5000, 5001);
        let room = Arc::new(WaitingRoom::new(2));
        let metrics = Arc::new(Metrics::new());
        let p1 = admit(&room, 1);
        let p2 = admit(&room, 2);

        let (barber, _ready_rx) = Barber::new(&config, room.clone(), metrics);
        let mut state = barber.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(barber.run(shutdown_rx));

        state.wait_for(|s| s.in_chair() == Some(CustomerId(1))).await.unwrap();
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        // Haircut in progress is finished, the waiting customer is not served
        assert_eq!(p1.wait().await.unwrap(), Outcome::Served);
        assert!(p2.wait().await.is_err());
        assert!(room.is_empty());
        assert_eq!(*state.borrow(), BarberState::Stopped);
    }
}
