//! Throughput accounting and completion estimates.
//!
//! A *cell update* is one evaluation of the recurrence: one query position in
//! one slot for one step. Every step emits `slots * m` of them, and each is
//! attributed to exactly one bucket:
//!
//! - `residue`: the slot consumed a real database residue (useful work),
//! - `terminator`: the slot consumed the terminator ending its target,
//! - `idle`: the slot was padding (drained queue or stalled ring).
//!
//! Conservation: `residue + terminator + idle == steps * slots * m`, and the
//! residue bucket equals the compared residues times `m`.

use std::fmt;
use std::time::{Duration, Instant};

use super::feeder::FeedOutcome;
use crate::core::utils::format_duration;

/// Cell-update tallies for one or more queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellTally {
    pub steps: u64,
    pub residue: u64,
    pub terminator: u64,
    pub idle: u64,
    /// `steps * slots * m`, accumulated independently of the buckets.
    pub emitted: u64,
}

impl CellTally {
    /// Account for one submitted step of a query of length `query_len`.
    pub fn record(&mut self, outcome: &FeedOutcome, slots: usize, query_len: usize) {
        let m = query_len as u64;
        self.steps += 1;
        self.residue += outcome.residues as u64 * m;
        self.terminator += outcome.terminators as u64 * m;
        self.idle += outcome.wasted() as u64 * m;
        self.emitted += slots as u64 * m;
    }

    pub fn accounted(&self) -> u64 {
        self.residue + self.terminator + self.idle
    }

    /// Whether every emitted update landed in exactly one bucket.
    pub fn is_conserved(&self) -> bool {
        self.accounted() == self.emitted
    }

    /// Share of emitted updates spent on real residues.
    pub fn utilisation(&self) -> f64 {
        if self.emitted == 0 {
            0.0
        } else {
            self.residue as f64 / self.emitted as f64
        }
    }

    pub fn merge(&mut self, other: &CellTally) {
        self.steps += other.steps;
        self.residue += other.residue;
        self.terminator += other.terminator;
        self.idle += other.idle;
        self.emitted += other.emitted;
    }
}

/// Running throughput estimator for a whole search run.
#[derive(Debug, Clone)]
pub struct BenchmarkEstimator {
    started: Instant,
    tally: CellTally,
    host_time: Duration,
    device_wait: Duration,
    /// Residue cell updates the full run is expected to perform.
    expected_updates: u64,
}

impl BenchmarkEstimator {
    pub fn new(expected_updates: u64) -> Self {
        Self {
            started: Instant::now(),
            tally: CellTally::default(),
            host_time: Duration::ZERO,
            device_wait: Duration::ZERO,
            expected_updates,
        }
    }

    pub fn tally(&self) -> &CellTally {
        &self.tally
    }

    pub fn expected_updates(&self) -> u64 {
        self.expected_updates
    }

    pub fn add_query(&mut self, tally: &CellTally) {
        self.tally.merge(tally);
    }

    pub fn add_host_time(&mut self, d: Duration) {
        self.host_time += d;
    }

    pub fn add_device_wait(&mut self, d: Duration) {
        self.device_wait += d;
    }

    pub fn host_time(&self) -> Duration {
        self.host_time
    }

    pub fn device_wait(&self) -> Duration {
        self.device_wait
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Useful cell updates per second, in billions.
    pub fn gcups(&self, residue_updates: u64, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        residue_updates as f64 / secs / 1e9
    }

    /// Fraction of the expected work done, given `in_flight` updates from the
    /// query still running.
    pub fn progress(&self, in_flight: u64) -> f64 {
        if self.expected_updates == 0 {
            return 1.0;
        }
        ((self.tally.residue + in_flight) as f64 / self.expected_updates as f64).min(1.0)
    }

    /// Estimated time to finish at the rate observed so far.
    pub fn eta(&self, in_flight: u64) -> Option<Duration> {
        let done = self.tally.residue + in_flight;
        if done == 0 {
            return None;
        }
        let remaining = self.expected_updates.saturating_sub(done);
        let rate = done as f64 / self.elapsed().as_secs_f64().max(f64::EPSILON);
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// One operator-facing progress line.
    pub fn progress_line(&self, query: usize, step: u64, in_flight: &CellTally) -> String {
        let elapsed = self.elapsed();
        let done = self.tally.residue + in_flight.residue;
        let eta = self
            .eta(in_flight.residue)
            .map_or_else(|| "-".to_string(), format_duration);
        format!(
            "query {} step {}: {} cell updates, {:.1}% of run, {:.2} GCUPS, host {:.1}s / device wait {:.1}s, elapsed {}, eta {}",
            query,
            step,
            done,
            100.0 * self.progress(in_flight.residue),
            self.gcups(done, elapsed),
            self.host_time.as_secs_f64(),
            self.device_wait.as_secs_f64(),
            format_duration(elapsed),
            eta
        )
    }
}

/// Per-run summary returned by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub queries: usize,
    pub targets_compared: u64,
    pub records: u64,
    pub skipped_empty: u64,
    pub cells: CellTally,
    pub host_secs: f64,
    pub device_wait_secs: f64,
    pub wall_time_secs: f64,
    pub cpu_time_secs: f64,
}

impl RunStatistics {
    pub fn gcups(&self) -> f64 {
        if self.wall_time_secs <= 0.0 {
            0.0
        } else {
            self.cells.residue as f64 / self.wall_time_secs / 1e9
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} queries, {} targets, {} records, {} cell updates ({:.1}% utilisation, {} idle), {:.2} GCUPS, real {:.3}s, cpu {:.3}s",
            self.queries,
            self.targets_compared,
            self.records,
            self.cells.residue,
            100.0 * self.cells.utilisation(),
            self.cells.idle,
            self.gcups(),
            self.wall_time_secs,
            self.cpu_time_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_buckets_cover_every_emitted_update() {
        let mut t = CellTally::default();
        let outcome = FeedOutcome {
            residues: 5,
            terminators: 2,
            idle: 0,
            stalled: 1,
            assigned: 3,
        };
        t.record(&outcome, 8, 10);
        assert_eq!(t.residue, 50);
        assert_eq!(t.terminator, 20);
        assert_eq!(t.idle, 10);
        assert_eq!(t.emitted, 80);
        assert!(t.is_conserved());

        let mut total = CellTally::default();
        total.merge(&t);
        total.merge(&t);
        assert_eq!(total.steps, 2);
        assert!(total.is_conserved());
    }

    #[test]
    fn progress_is_clamped_and_eta_needs_work() {
        let est = BenchmarkEstimator::new(100);
        assert_eq!(est.eta(0), None);
        assert_eq!(est.progress(50), 0.5);
        assert_eq!(est.progress(500), 1.0);
        assert_eq!(BenchmarkEstimator::new(0).progress(0), 1.0);
    }

    #[test]
    fn gcups_of_zero_elapsed_is_zero() {
        let est = BenchmarkEstimator::new(0);
        assert_eq!(est.gcups(1_000_000, Duration::ZERO), 0.0);
        assert!((est.gcups(2_000_000_000, Duration::from_secs(2)) - 1.0).abs() < 1e-9);
    }
}
