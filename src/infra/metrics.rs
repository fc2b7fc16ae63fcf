//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! All counter updates are lock-free; reporting is the only operation
//! that needs synchronization (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only; admission decisions are made by the waiting room itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Duration bucket boundaries (milliseconds)
/// Buckets: ≤250, ≤500, ≤1000, ≤2000, ≤3000, ≤4000, ≤5000, ≤6000, ≤10000, ≤30000, >30000
const BUCKET_BOUNDS: [u64; 10] = [250, 500, 1000, 2000, 3000, 4000, 5000, 6000, 10000, 30000];
const NUM_BUCKETS: usize = 11;

/// Compute bucket index for a duration using binary search
#[inline]
fn bucket_index(duration_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < duration_ms)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [250, 500, 1000, 2000, 3000, 4000, 5000, 6000, 10000, 30000, 60000];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Customers that walked in (monotonic)
    arrivals_total: AtomicU64,
    /// Customers placed in the waiting room (monotonic)
    admitted_total: AtomicU64,
    /// Customers rejected because the room was full (monotonic)
    turned_away_total: AtomicU64,
    /// Haircuts completed (monotonic)
    served_total: AtomicU64,
    /// Barber idle cycles (monotonic)
    idle_cycles_total: AtomicU64,
    /// Waiting room occupancy after the latest admit/take (gauge)
    occupancy: AtomicU64,
    /// Highest occupancy ever observed (monotonic)
    peak_occupancy: AtomicU64,
    /// Haircuts since last report (reset on report)
    served_since_report: AtomicU64,
    /// Haircut duration histogram in ms (reset on report)
    service_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of haircut durations in ms (reset on report)
    service_sum_ms: AtomicU64,
    /// Time from arrival to the barber's chair, histogram in ms (reset on report)
    wait_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of waiting times in ms (reset on report)
    wait_sum_ms: AtomicU64,
    /// Longest wait in ms (reset on report)
    wait_max_ms: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            arrivals_total: AtomicU64::new(0),
            admitted_total: AtomicU64::new(0),
            turned_away_total: AtomicU64::new(0),
            served_total: AtomicU64::new(0),
            idle_cycles_total: AtomicU64::new(0),
            occupancy: AtomicU64::new(0),
            peak_occupancy: AtomicU64::new(0),
            served_since_report: AtomicU64::new(0),
            service_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            service_sum_ms: AtomicU64::new(0),
            wait_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            wait_sum_ms: AtomicU64::new(0),
            wait_max_ms: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_arrival(&self) {
        self.arrivals_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an admission and the occupancy it produced
    #[inline]
    pub fn record_admitted(&self, occupancy: usize) {
        self.admitted_total.fetch_add(1, Ordering::Relaxed);
        self.set_occupancy(occupancy);
    }

    #[inline]
    pub fn record_turned_away(&self) {
        self.turned_away_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Set current waiting room occupancy and track the peak
    #[inline]
    pub fn set_occupancy(&self, occupancy: usize) {
        let occupancy = occupancy as u64;
        self.occupancy.store(occupancy, Ordering::Relaxed);
        update_atomic_max(&self.peak_occupancy, occupancy);
    }

    /// Record time a customer spent between arrival and the chair
    #[inline]
    pub fn record_wait(&self, wait_ms: u64) {
        self.wait_buckets[bucket_index(wait_ms)].fetch_add(1, Ordering::Relaxed);
        self.wait_sum_ms.fetch_add(wait_ms, Ordering::Relaxed);
        update_atomic_max(&self.wait_max_ms, wait_ms);
    }

    /// Record a finished haircut and how long it took
    #[inline]
    pub fn record_served(&self, service_ms: u64) {
        self.served_total.fetch_add(1, Ordering::Relaxed);
        self.served_since_report.fetch_add(1, Ordering::Relaxed);
        self.service_buckets[bucket_index(service_ms)].fetch_add(1, Ordering::Relaxed);
        self.service_sum_ms.fetch_add(service_ms, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_idle_cycle(&self) {
        self.idle_cycles_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn arrivals_total(&self) -> u64 {
        self.arrivals_total.load(Ordering::Relaxed)
    }

    pub fn admitted_total(&self) -> u64 {
        self.admitted_total.load(Ordering::Relaxed)
    }

    pub fn turned_away_total(&self) -> u64 {
        self.turned_away_total.load(Ordering::Relaxed)
    }

    pub fn served_total(&self) -> u64 {
        self.served_total.load(Ordering::Relaxed)
    }

    pub fn idle_cycles_total(&self) -> u64 {
        self.idle_cycles_total.load(Ordering::Relaxed)
    }

    pub fn occupancy(&self) -> u64 {
        self.occupancy.load(Ordering::Relaxed)
    }

    pub fn peak_occupancy(&self) -> u64 {
        self.peak_occupancy.load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        let served_count = self.served_since_report.swap(0, Ordering::Relaxed);
        let service_buckets = swap_buckets(&self.service_buckets);
        let service_sum = self.service_sum_ms.swap(0, Ordering::Relaxed);

        let wait_buckets = swap_buckets(&self.wait_buckets);
        let wait_sum = self.wait_sum_ms.swap(0, Ordering::Relaxed);
        let wait_max = self.wait_max_ms.swap(0, Ordering::Relaxed);
        let wait_count: u64 = wait_buckets.iter().sum();

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let served_per_min = if elapsed.as_secs_f64() > 0.0 {
            served_count as f64 * 60.0 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        MetricsSummary {
            arrivals_total: self.arrivals_total(),
            admitted_total: self.admitted_total(),
            turned_away_total: self.turned_away_total(),
            served_total: self.served_total(),
            idle_cycles_total: self.idle_cycles_total(),
            occupancy: self.occupancy(),
            peak_occupancy: self.peak_occupancy(),
            served_per_min,
            service_avg_ms: if served_count > 0 { service_sum / served_count } else { 0 },
            service_p95_ms: percentile_from_buckets(&service_buckets, 0.95),
            wait_avg_ms: if wait_count > 0 { wait_sum / wait_count } else { 0 },
            wait_max_ms: wait_max,
            wait_p95_ms: percentile_from_buckets(&wait_buckets, 0.95),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub arrivals_total: u64,
    pub admitted_total: u64,
    pub turned_away_total: u64,
    pub served_total: u64,
    pub idle_cycles_total: u64,
    /// Occupancy snapshot at report time
    pub occupancy: u64,
    pub peak_occupancy: u64,
    /// Haircut throughput since last report
    pub served_per_min: f64,
    pub service_avg_ms: u64,
    pub service_p95_ms: u64,
    /// Arrival to chair
    pub wait_avg_ms: u64,
    pub wait_max_ms: u64,
    pub wait_p95_ms: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            arrivals = %self.arrivals_total,
            admitted = %self.admitted_total,
            turned_away = %self.turned_away_total,
            served = %self.served_total,
            occupancy = %self.occupancy,
            peak_occupancy = %self.peak_occupancy,
            served_per_min = format!("{:.1}", self.served_per_min),
            service_avg_ms = %self.service_avg_ms,
            service_p95_ms = %self.service_p95_ms,
            wait_avg_ms = %self.wait_avg_ms,
            wait_max_ms = %self.wait_max_ms,
            wait_p95_ms = %self.wait_p95_ms,
            idle_cycles = %self.idle_cycles_total,
            "metrics"
        );
    }
}
