//! Per-seqno de-jitter latency reporting (§6), grounded in
//! `thearossman-sidekick`'s `webrtc_server.rs` `Statistics` (sorted-value
//! percentile lookup), adapted to record a seqno alongside each latency so
//! it can be written out as `jitter_buffer_stats.csv` instead of printed.

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

pub struct Statistics {
    records: Vec<(u32, Duration)>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn record(&mut self, seqno: u32, latency: Duration) {
        self.records.push((seqno, latency));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn percentile(&self, sorted: &[Duration], p: f64) -> Duration {
        let index = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted[index.min(sorted.len().saturating_sub(1))]
    }

    /// Logs p50/p95/p99 de-jitter latency, matching the percentiles the
    /// teacher's `print_statistics` reports.
    pub fn log_summary(&self) {
        if self.records.is_empty() {
            log::warn!("no packets played back; nothing to summarize");
            return;
        }
        let mut sorted: Vec<Duration> = self.records.iter().map(|(_, d)| *d).collect();
        sorted.sort();
        log::info!(
            "played {} packets: p50={:?} p95={:?} p99={:?}",
            sorted.len(),
            self.percentile(&sorted, 0.50),
            self.percentile(&sorted, 0.95),
            self.percentile(&sorted, 0.99),
        );
    }

    /// Writes `seqno,latency_ms` rows in playback order, per §6's
    /// `jitter_buffer_stats.csv`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut f = std::fs::File::create(path)?;
        writeln!(f, "seqno,latency_ms")?;
        for (seqno, latency) in &self.records {
            writeln!(f, "{},{}", seqno, latency.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}
