//! Session and benchmark statistics.
//!
//! All aggregates are computed once after a loop finishes and rendered
//! through `Display`. Labels, units and precision match the report format
//! other tooling scrapes.

use std::fmt;
use std::time::Duration;

const RULE: &str = "========================================";
const THIN_RULE: &str = "----------------------------------------";

/// `count` events over `elapsed`, per second.
///
/// `None` when no time has elapsed.
pub fn rate_per_sec(count: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        Some(count as f64 / secs)
    } else {
        None
    }
}

/// Totals for one server session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStats {
    pub messages: u64,
    pub elapsed: Duration,
}

impl SessionStats {
    pub fn average_rate(&self) -> Option<f64> {
        rate_per_sec(self.messages, self.elapsed)
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[SESSION STATS]")?;
        writeln!(f, "  Total Messages: {}", self.messages)?;
        write!(f, "  Total Duration: {} ms", self.elapsed.as_millis())?;
        if let Some(rate) = self.average_rate() {
            write!(f, "\n  Average Rate: {rate:.2} msg/sec")?;
        }
        Ok(())
    }
}

/// Min, max and mean of a latency sequence, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub min_us: i64,
    pub max_us: i64,
    pub avg_us: f64,
}

impl LatencySummary {
    /// Summarize `samples`, or `None` if there are none.
    pub fn from_samples(samples: &[i64]) -> Option<Self> {
        let min_us = *samples.iter().min()?;
        let max_us = *samples.iter().max()?;
        let sum: i128 = samples.iter().map(|&s| s as i128).sum();

        Some(Self {
            count: samples.len(),
            min_us,
            max_us,
            avg_us: sum as f64 / samples.len() as f64,
        })
    }
}

/// Final client report for one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkReport {
    pub latency: LatencySummary,
    /// Bytes sent plus bytes received.
    pub total_bytes: u64,
    /// Wall time of the whole send loop.
    pub elapsed: Duration,
}

impl BenchmarkReport {
    /// Build a report, or `None` if no round trip completed.
    pub fn new(samples: &[i64], total_bytes: u64, elapsed: Duration) -> Option<Self> {
        Some(Self {
            latency: LatencySummary::from_samples(samples)?,
            total_bytes,
            elapsed,
        })
    }

    pub fn messages(&self) -> usize {
        self.latency.count
    }

    /// Transfer rate in MiB per second.
    pub fn throughput_mb_per_sec(&self) -> Option<f64> {
        rate_per_sec(self.total_bytes, self.elapsed).map(|bps| bps / 1024.0 / 1024.0)
    }

    pub fn messages_per_sec(&self) -> Option<f64> {
        rate_per_sec(self.latency.count as u64, self.elapsed)
    }
}

fn write_rate(f: &mut fmt::Formatter<'_>, rate: Option<f64>) -> fmt::Result {
    match rate {
        Some(rate) => write!(f, "{rate:.2}"),
        None => write!(f, "n/a"),
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "BENCHMARK RESULTS")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Messages Sent:     {}", self.messages())?;
        writeln!(f, "Total Duration:    {} ms", self.elapsed.as_millis())?;
        writeln!(f, "Total Data:        {:.2} KB", self.total_bytes as f64 / 1024.0)?;
        writeln!(f, "{THIN_RULE}")?;
        writeln!(f, "Latency (RTT):")?;
        writeln!(f, "  Average:         {:.3} ms", self.latency.avg_us / 1000.0)?;
        writeln!(f, "  Min:             {:.3} ms", self.latency.min_us as f64 / 1000.0)?;
        writeln!(f, "  Max:             {:.3} ms", self.latency.max_us as f64 / 1000.0)?;
        writeln!(f, "{THIN_RULE}")?;
        write!(f, "Throughput:        ")?;
        write_rate(f, self.throughput_mb_per_sec())?;
        writeln!(f, " MB/s")?;
        write!(f, "Messages/sec:      ")?;
        write_rate(f, self.messages_per_sec())?;
        writeln!(f)?;
        write!(f, "{RULE}")
    }
}
