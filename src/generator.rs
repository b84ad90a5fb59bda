use crate::error::{Error, Result};
use crate::model::{Outcome, RunConfig, RunResult, Target};
use crate::stop::StopSignal;
use crate::worker::{worker, Slots};
use chrono::Utc;
use indicatif::ProgressBar;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

const CHANNEL_CAPACITY: usize = 100;
const MAX_PREALLOCATED_TIMINGS: usize = 4096;

pub struct LoadGenerator {
    target: Target,
    config: RunConfig,
    client: Client,
    progress: ProgressBar,
}

impl LoadGenerator {
    /// Validates the config and builds the pooled HTTP client. Fails before
    /// any request is issued.
    pub fn new(target: Target, config: RunConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().pool_max_idle_per_host(config.workers());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::Client)?;

        Ok(Self {
            target,
            config,
            client,
            progress: ProgressBar::hidden(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        progress.set_length(self.config.total_requests as u64);
        self.progress = progress;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self, stop: &StopSignal) -> RunResult {
        let span = tracing::info_span!(
            "run",
            target = %self.target,
            total = self.config.total_requests,
            concurrency = self.config.concurrency,
        );
        self.run_inner(stop).instrument(span).await
    }

    async fn run_inner(&self, stop: &StopSignal) -> RunResult {
        tracing::info!(workers = self.config.workers(), "starting load run");

        let started_at = Utc::now();
        let begin = Instant::now();

        let slots = Arc::new(Slots::new(self.config.total_requests));
        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

        let mut set = JoinSet::new();
        for rank in 0..self.config.workers() {
            set.spawn(worker(
                rank,
                self.client.clone(),
                self.target.url().clone(),
                slots.clone(),
                stop.clone(),
                tx.clone(),
            ));
        }

        drop(tx);

        let mut timings =
            Vec::with_capacity(self.config.total_requests.min(MAX_PREALLOCATED_TIMINGS));
        let mut failed = 0;
        let mut interrupted = false;
        loop {
            let received = tokio::select! {
                biased;
                _ = stop.stopped() => None,
                received = rx.recv() => received,
            };
            if stop.is_triggered() {
                interrupted = true;
                break;
            }
            let Some(worker_outcome) = received else {
                break;
            };

            match worker_outcome.outcome {
                Outcome::Success(elapsed) => timings.push(elapsed),
                Outcome::Failure(failure) => {
                    tracing::debug!(rank = worker_outcome.rank, %failure, "request failed");
                    failed += 1;
                }
            }
            self.progress.inc(1);
        }

        let total_duration = begin.elapsed();

        if interrupted {
            tracing::warn!(
                collected = timings.len() + failed,
                "stop requested, abandoning in-flight requests"
            );
            self.progress.abandon();
            // in-flight requests are left to finish on their own
            set.detach_all();
        } else {
            self.progress.finish();
            while let Some(res) = set.join_next().await {
                match res {
                    Ok(issued) => tracing::trace!(issued, "worker finished"),
                    Err(e) => tracing::error!(error = %e, "worker task failed"),
                }
            }
        }

        let result =
            RunResult::from_timings(started_at, timings, failed, total_duration, interrupted);
        tracing::info!(
            completed = result.completed,
            failed = result.failed,
            elapsed_ms = result.total_duration.as_millis() as u64,
            "load run finished"
        );
        result
    }
}
