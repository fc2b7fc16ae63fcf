//! Shop - startup ordering and orderly shutdown of all roles
//!
//! Opening the shop starts the barber first and waits for his one-time ready
//! notification, so the first arrivals never meet a cold waiting room. Only
//! then do the receptionist and (optionally) the customer generator start.
//!
//! Closing runs in reverse: the front desk stops taking arrivals, then the
//! barber finishes the haircut in progress and sends the rest home.

use crate::domain::{BarberState, Customer};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::barber::Barber;
use crate::services::customer::{CustomerGenerator, VisitTally};
use crate::services::receptionist::create_receptionist;
use crate::services::waiting_room::WaitingRoom;
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

pub struct Shop {
    config: Config,
    room: Arc<WaitingRoom>,
    metrics: Arc<Metrics>,
    barber_state: watch::Receiver<BarberState>,
    front_desk: mpsc::Sender<Customer>,
    /// Stops the receptionist and the generator
    front_shutdown: watch::Sender<bool>,
    /// Stops the barber once the front desk is closed
    barber_stop: watch::Sender<bool>,
    barber: JoinHandle<()>,
    receptionist: JoinHandle<()>,
    generator: Option<JoinHandle<VisitTally>>,
}

impl Shop {
    /// Start the barber, wait until he is ready, then open the front desk
    pub async fn open(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        config.validate().context("invalid shop config")?;
        let room = Arc::new(WaitingRoom::new(config.capacity()));

        let (barber, ready_rx) = Barber::new(config, room.clone(), metrics.clone());
        let barber_state = barber.subscribe();
        let (barber_stop, barber_stop_rx) = watch::channel(false);
        let barber = tokio::spawn(barber.run(barber_stop_rx));

        ready_rx.await.context("barber stopped before becoming ready")?;

        let (front_shutdown, front_shutdown_rx) = watch::channel(false);
        let (front_desk, receptionist) =
            create_receptionist(room.clone(), metrics.clone(), config.arrival_buffer());
        let receptionist = tokio::spawn(receptionist.run(front_shutdown_rx));

        info!(capacity = %config.capacity(), "shop_open");

        Ok(Self {
            config: config.clone(),
            room,
            metrics,
            barber_state,
            front_desk,
            front_shutdown,
            barber_stop,
            barber,
            receptionist,
            generator: None,
        })
    }

    /// Open the shop and start generating customers
    pub async fn open_with_customers(
        config: &Config,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let mut shop = Self::open(config, metrics).await?;
        shop.start_generator();
        Ok(shop)
    }

    /// Start the customer generator (no-op if already running)
    pub fn start_generator(&mut self) {
        if self.generator.is_some() {
            return;
        }
        let generator =
            CustomerGenerator::new(&self.config, self.front_desk.clone(), self.metrics.clone());
        self.generator = Some(tokio::spawn(generator.run(self.front_shutdown.subscribe())));
    }

    /// Sender customers use to reach the receptionist
    pub fn front_desk(&self) -> mpsc::Sender<Customer> {
        self.front_desk.clone()
    }

    pub fn room(&self) -> &Arc<WaitingRoom> {
        &self.room
    }

    pub fn barber_state(&self) -> watch::Receiver<BarberState> {
        self.barber_state.clone()
    }

    /// Keep the shop open until the generator finishes on its own (customer
    /// limit reached) or `signal` resolves, then close it
    pub async fn run_until<F>(mut self, signal: F) -> anyhow::Result<VisitTally>
    where
        F: Future<Output = ()>,
    {
        let finished = match self.generator.as_mut() {
            Some(generator) => tokio::select! {
                tally = generator => Some(tally.context("customer generator panicked")?),
                _ = signal => None,
            },
            None => {
                signal.await;
                None
            }
        };

        if finished.is_some() {
            self.generator = None;
        }
        let tally = self.close().await?;
        Ok(finished.unwrap_or(tally))
    }

    /// Close the front desk, let the barber finish, and collect the tally
    pub async fn close(self) -> anyhow::Result<VisitTally> {
        info!("shop_closing");
        self.front_shutdown.send_replace(true);
        drop(self.front_desk);
        self.receptionist.await.context("receptionist panicked")?;

        self.barber_stop.send_replace(true);
        self.barber.await.context("barber panicked")?;

        let tally = match self.generator {
            Some(generator) => generator.await.context("customer generator panicked")?,
            None => VisitTally::default(),
        };

        info!(
            served = %tally.served,
            turned_away = %tally.turned_away,
            unresolved = %tally.unresolved,
            "shop_closed"
        );
        Ok(tally)
    }
}
