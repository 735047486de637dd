//! Memory and search-cost accounting for one search call.
//!
//! Nothing here influences results; the numbers are reported to the caller
//! and logged.

// Timings and counts are reported as floating point.
#![allow(clippy::cast_precision_loss)]

use std::time::{Duration, Instant};

use cf_comm::{CommResult, Communicator, ReduceOp};

/// Per-round record kept by [`DiagnosticsContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundTiming {
    /// Round number, `0..shard_count`.
    pub round: usize,
    /// Facets gathered from all ranks this round.
    pub gathered: usize,
    /// Facets left after culling.
    pub survivors: usize,
    /// Voxels in the round's index.
    pub voxels: usize,
    /// Wall time spent in the round.
    pub seconds: f64,
}

/// Diagnostics state for one search call.
///
/// A context may be reused: every search [`restart`](Self::restart)s it
/// before the first round. Call [`finish`](Self::finish) (collectively) to
/// aggregate across ranks.
///
/// # Example
///
/// ```
/// use mesh_distance::DiagnosticsContext;
///
/// let mut diagnostics = DiagnosticsContext::new();
/// diagnostics.reset_search_cost(2);
/// diagnostics.add_search_cost(1, 0.25);
/// assert_eq!(diagnostics.search_cost(), &[0.0, 0.25]);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticsContext {
    started: Instant,
    peak_memory_mb: f64,
    search_cost: Vec<f64>,
    rounds: Vec<RoundTiming>,
}

impl Default for DiagnosticsContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticsContext {
    /// Start a new context; the elapsed-time clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            peak_memory_mb: 0.0,
            search_cost: Vec::new(),
            rounds: Vec::new(),
        }
    }

    /// Read resident memory and fold it into the peak.
    ///
    /// Returns the current reading, `None` where it is unavailable.
    pub fn sample_memory(&mut self) -> Option<f64> {
        let current = resident_memory_mb()?;
        self.peak_memory_mb = self.peak_memory_mb.max(current);
        Some(current)
    }

    /// Largest resident memory seen by [`sample_memory`](Self::sample_memory).
    #[must_use]
    pub const fn peak_memory_mb(&self) -> f64 {
        self.peak_memory_mb
    }

    /// Forget everything recorded so far and restart the clock, sized for
    /// `points` query points.
    pub fn restart(&mut self, points: usize) {
        self.started = Instant::now();
        self.peak_memory_mb = 0.0;
        self.rounds.clear();
        self.reset_search_cost(points);
    }

    /// Zero the per-point cost array for `points` query points.
    pub fn reset_search_cost(&mut self, points: usize) {
        self.search_cost.clear();
        self.search_cost.resize(points, 0.0);
    }

    /// Charge `seconds` of search time to `point`.
    pub fn add_search_cost(&mut self, point: usize, seconds: f64) {
        if point >= self.search_cost.len() {
            self.search_cost.resize(point + 1, 0.0);
        }
        self.search_cost[point] += seconds;
    }

    /// Accumulated search seconds per query point.
    #[must_use]
    pub fn search_cost(&self) -> &[f64] {
        &self.search_cost
    }

    /// Record a finished round.
    pub fn record_round(&mut self, timing: RoundTiming) {
        self.rounds.push(timing);
    }

    /// Rounds recorded so far.
    #[must_use]
    pub fn rounds(&self) -> &[RoundTiming] {
        &self.rounds
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Aggregate across ranks: peak memory (max) and local search time
    /// (min, max, sum).
    ///
    /// Collective: every rank must call it.
    ///
    /// # Errors
    ///
    /// Propagates communication errors.
    pub fn finish<C: Communicator + ?Sized>(&self, comm: &C) -> CommResult<SearchDiagnostics> {
        let local: f64 = self.search_cost.iter().sum();
        let peak = comm.all_reduce_f64(self.peak_memory_mb, ReduceOp::Max)?;
        let min = comm.all_reduce_f64(local, ReduceOp::Min)?;
        let max = comm.all_reduce_f64(local, ReduceOp::Max)?;
        let sum = comm.all_reduce_f64(local, ReduceOp::Sum)?;
        let avg = sum / comm.size() as f64;

        Ok(SearchDiagnostics {
            peak_memory_mb: peak,
            local_search_seconds: local,
            min_search_seconds: min,
            max_search_seconds: max,
            avg_search_seconds: avg,
            load_balance: if avg > 0.0 { max / avg } else { 1.0 },
            rounds: self.rounds.len(),
            elapsed_seconds: self.elapsed().as_secs_f64(),
        })
    }
}

/// Diagnostics of a finished search, aggregated across ranks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchDiagnostics {
    /// Largest resident memory on any rank, in MB (0 where unavailable).
    pub peak_memory_mb: f64,
    /// Search seconds spent on this rank.
    pub local_search_seconds: f64,
    /// Smallest per-rank search time.
    pub min_search_seconds: f64,
    /// Largest per-rank search time.
    pub max_search_seconds: f64,
    /// Mean per-rank search time.
    pub avg_search_seconds: f64,
    /// `max / avg` search time; 1.0 is perfectly balanced.
    pub load_balance: f64,
    /// Rounds executed.
    pub rounds: usize,
    /// Wall time of the whole call on this rank.
    pub elapsed_seconds: f64,
}

impl std::fmt::Display for SearchDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Distance Search Diagnostics:")?;
        writeln!(f, "  Rounds: {}", self.rounds)?;
        writeln!(f, "  Elapsed: {:.3}s", self.elapsed_seconds)?;
        writeln!(f, "  Peak memory: {:.1} MB", self.peak_memory_mb)?;
        writeln!(
            f,
            "  Search time: min {:.3}s, max {:.3}s, avg {:.3}s",
            self.min_search_seconds, self.max_search_seconds, self.avg_search_seconds
        )?;
        writeln!(f, "  Load balance: {:.2}", self.load_balance)?;
        Ok(())
    }
}

/// Resident set size of this process in MB, where the platform exposes it.
#[must_use]
pub fn resident_memory_mb() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|status| parse_vm_rss_mb(&status))
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// `VmRSS` from a `/proc/<pid>/status` listing, converted from kB to MB.
fn parse_vm_rss_mb(status: &str) -> Option<f64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cf_comm::{LocalComm, LocalWorld};

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tworker\nVmPeak:\t  900 kB\nVmRSS:\t    2048 kB\nThreads:\t1\n";
        assert_relative_eq!(parse_vm_rss_mb(status).unwrap(), 2.0);
        assert!(parse_vm_rss_mb("Name:\tworker\n").is_none());
        assert!(parse_vm_rss_mb("VmRSS:\tlots kB\n").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sample_memory_tracks_peak() {
        let mut diagnostics = DiagnosticsContext::new();
        let current = diagnostics.sample_memory().unwrap();
        assert!(current > 0.0);
        assert!(diagnostics.peak_memory_mb() >= current);
    }

    #[test]
    fn test_search_cost_grows_on_demand() {
        let mut diagnostics = DiagnosticsContext::new();
        diagnostics.add_search_cost(3, 1.0);
        diagnostics.add_search_cost(3, 0.5);
        assert_eq!(diagnostics.search_cost(), &[0.0, 0.0, 0.0, 1.5]);
        diagnostics.reset_search_cost(1);
        assert_eq!(diagnostics.search_cost(), &[0.0]);
    }

    #[test]
    fn test_restart_forgets_previous_search() {
        let mut diagnostics = DiagnosticsContext::new();
        diagnostics.add_search_cost(0, 2.0);
        diagnostics.record_round(RoundTiming {
            round: 0,
            gathered: 4,
            survivors: 2,
            voxels: 1,
            seconds: 0.5,
        });
        std::thread::sleep(Duration::from_millis(20));

        diagnostics.restart(3);
        assert!(diagnostics.rounds().is_empty());
        assert_eq!(diagnostics.search_cost(), &[0.0, 0.0, 0.0]);
        assert!(diagnostics.elapsed() < Duration::from_millis(20));
    }

    #[test]
    fn test_finish_solo() {
        let mut diagnostics = DiagnosticsContext::new();
        diagnostics.reset_search_cost(2);
        diagnostics.add_search_cost(0, 1.0);
        diagnostics.add_search_cost(1, 3.0);
        let summary = diagnostics.finish(&LocalComm::solo()).unwrap();
        assert_relative_eq!(summary.local_search_seconds, 4.0);
        assert_relative_eq!(summary.avg_search_seconds, 4.0);
        assert_relative_eq!(summary.load_balance, 1.0);
        assert!(format!("{summary}").contains("Load balance"));
    }

    #[test]
    fn test_finish_reduces_across_ranks() {
        let summaries = LocalWorld::run(3, |comm| {
            let mut diagnostics = DiagnosticsContext::new();
            diagnostics.add_search_cost(0, comm.rank() as f64 + 1.0);
            diagnostics.finish(&comm)
        })
        .unwrap();
        for summary in summaries {
            let summary = summary.unwrap();
            assert_relative_eq!(summary.min_search_seconds, 1.0);
            assert_relative_eq!(summary.max_search_seconds, 3.0);
            assert_relative_eq!(summary.avg_search_seconds, 2.0);
            assert_relative_eq!(summary.load_balance, 1.5);
        }
    }
}
