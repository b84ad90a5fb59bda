use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target(Url);

impl Target {
    pub fn url(&self) -> &Url {
        &self.0
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidTarget {
            url: s.to_string(),
            reason,
        };
        let url = Url::parse(s).map_err(|e| invalid(e.to_string()))?;
        if !url.has_host() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(Target(url))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub total_requests: usize,
    pub concurrency: usize,
    pub timeout: Option<Duration>,
}

impl RunConfig {
    pub fn new(total_requests: usize, concurrency: usize) -> Self {
        Self {
            total_requests,
            concurrency,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_requests == 0 {
            return Err(Error::InvalidConfig(
                "total requests must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Number of workers actually spawned; never more than there are requests.
    pub fn workers(&self) -> usize {
        self.concurrency.min(self.total_requests)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(1000, 6)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    Status(u16),
    Transport(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Status(code) => write!(f, "status {code}"),
            Failure::Transport(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(Duration),
    Failure(Failure),
}

#[derive(Debug)]
pub struct WorkerOutcome {
    pub rank: usize,
    pub outcome: Outcome,
}

#[derive(Clone, Debug)]
pub struct RunResult {
    pub started_at: DateTime<Utc>,
    pub completed: usize,
    pub failed: usize,
    pub mean: Option<Duration>,
    pub fastest: Option<Duration>,
    pub slowest: Option<Duration>,
    pub p50: Option<Duration>,
    pub p99: Option<Duration>,
    pub total_duration: Duration,
    pub interrupted: bool,
}

impl RunResult {
    pub fn from_timings(
        started_at: DateTime<Utc>,
        mut timings: Vec<Duration>,
        failed: usize,
        total_duration: Duration,
        interrupted: bool,
    ) -> Self {
        timings.sort_unstable();
        let completed = timings.len();
        let mean = if completed > 0 {
            let sum: Duration = timings.iter().sum();
            Some(Duration::from_nanos(
                (sum.as_nanos() / completed as u128) as u64,
            ))
        } else {
            None
        };

        RunResult {
            started_at,
            completed,
            failed,
            mean,
            fastest: timings.first().copied(),
            slowest: timings.last().copied(),
            p50: percentile(&timings, 0.50),
            p99: percentile(&timings, 0.99),
            total_duration,
            interrupted,
        }
    }

    /// Mean latency in seconds, infinite when nothing succeeded.
    pub fn mean_secs(&self) -> f64 {
        self.mean.map_or(f64::INFINITY, |d| d.as_secs_f64())
    }

    pub fn throughput(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }
}

// nearest-rank on already sorted samples
fn percentile(sorted: &[Duration], q: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}
