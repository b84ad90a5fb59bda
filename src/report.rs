use crate::model::RunResult;
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

pub struct Summary<'a>(pub &'a RunResult);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        writeln!(f, "{}", style("Summary").bold().underlined())?;
        writeln!(f, "Completed: {}", style(r.completed).green())?;
        if r.failed > 0 {
            writeln!(f, "Failed: {}", style(r.failed).red())?;
        }
        writeln!(f, "Avg time/req: {:.6} sec", r.mean_secs())?;
        writeln!(f, "Total test time: {:.3} sec", r.total_duration.as_secs_f64())?;
        write!(f, "Throughput: {:.2} req/s", r.throughput())?;

        let latencies = [
            ("fastest", r.fastest),
            ("p50", r.p50),
            ("p99", r.p99),
            ("slowest", r.slowest),
        ];
        if latencies.iter().any(|(_, v)| v.is_some()) {
            writeln!(f)?;
            write!(f, "{}", style("Latency").bold())?;
            for (name, value) in latencies {
                if let Some(value) = value {
                    write!(f, " {name}={:.2}ms", value.as_secs_f64() * 1000.0)?;
                }
            }
        }
        Ok(())
    }
}

/// Flat, machine-readable form of a run, printed with `--json`.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub started_at: DateTime<Utc>,
    pub completed: usize,
    pub failed: usize,
    /// `null` when nothing succeeded
    pub mean_secs: Option<f64>,
    pub fastest_secs: Option<f64>,
    pub p50_secs: Option<f64>,
    pub p99_secs: Option<f64>,
    pub slowest_secs: Option<f64>,
    pub total_secs: f64,
    pub throughput: f64,
    pub interrupted: bool,
}

impl From<&RunResult> for JsonReport {
    fn from(r: &RunResult) -> Self {
        let secs = |d: Option<Duration>| d.map(|d| d.as_secs_f64());
        JsonReport {
            started_at: r.started_at,
            completed: r.completed,
            failed: r.failed,
            mean_secs: secs(r.mean),
            fastest_secs: secs(r.fastest),
            p50_secs: secs(r.p50),
            p99_secs: secs(r.p99),
            slowest_secs: secs(r.slowest),
            total_secs: r.total_duration.as_secs_f64(),
            throughput: r.throughput(),
            interrupted: r.interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(timings: Vec<Duration>, failed: usize) -> RunResult {
        RunResult::from_timings(Utc::now(), timings, failed, Duration::from_secs(1), false)
    }

    #[test]
    fn summary_lists_core_numbers() {
        console::set_colors_enabled(false);
        let r = result(vec![Duration::from_millis(50), Duration::from_millis(150)], 1);
        let text = Summary(&r).to_string();
        assert!(text.contains("Completed: 2"));
        assert!(text.contains("Failed: 1"));
        assert!(text.contains("Avg time/req: 0.100000 sec"));
        assert!(text.contains("Total test time: 1.000 sec"));
        assert!(text.contains("Throughput: 2.00 req/s"));
        assert!(text.contains("p50=50.00ms"));
    }

    #[test]
    fn summary_of_empty_run_shows_infinite_mean() {
        console::set_colors_enabled(false);
        let r = result(vec![], 3);
        let text = Summary(&r).to_string();
        assert!(text.contains("Avg time/req: inf sec"));
        assert!(text.contains("Throughput: 0.00 req/s"));
        assert!(!text.contains("Latency"));
    }

    #[test]
    fn json_report_uses_null_for_undefined_mean() {
        let r = result(vec![], 0);
        let value = serde_json::to_value(JsonReport::from(&r)).unwrap();
        assert!(value["mean_secs"].is_null());
        assert_eq!(value["completed"], 0);
        assert_eq!(value["throughput"], 0.0);
    }
}
