use crate::model::{Failure, Outcome, WorkerOutcome};
use crate::stop::StopSignal;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

#[derive(Debug)]
pub struct Slots {
    next: AtomicUsize,
    total: usize,
}

impl Slots {
    pub fn new(total: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            total,
        }
    }

    pub fn claim(&self) -> Option<usize> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed);
        (slot < self.total).then_some(slot)
    }
}

/// One member of the pool. Issues GETs until the slots run out, the stop
/// signal is set or the collector hangs up.
pub async fn worker(
    rank: usize,
    client: Client,
    url: Url,
    slots: Arc<Slots>,
    stop: StopSignal,
    tx: mpsc::Sender<WorkerOutcome>,
) -> usize {
    let mut issued = 0;
    loop {
        if stop.is_triggered() {
            tracing::trace!(rank, "stop observed, skipping remaining requests");
            break;
        }
        let Some(_slot) = slots.claim() else {
            break;
        };

        let outcome = timed_get(&client, &url).await;
        issued += 1;

        if tx.send(WorkerOutcome { rank, outcome }).await.is_err() {
            // collector has left, nobody reads what is still in flight
            break;
        }
    }
    issued
}

/// Times one GET from just before the call until the body has been read.
pub async fn timed_get(client: &Client, url: &Url) -> Outcome {
    let begin = Instant::now();
    let response = match client.get(url.clone()).send().await {
        Ok(res) => res,
        Err(e) => return Outcome::Failure(Failure::Transport(e.to_string())),
    };

    let status = response.status();
    let body = response.bytes().await;
    let elapsed = begin.elapsed();

    if !status.is_success() {
        return Outcome::Failure(Failure::Status(status.as_u16()));
    }
    match body {
        Ok(_) => Outcome::Success(elapsed),
        Err(e) => Outcome::Failure(Failure::Transport(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_hand_out_exactly_total() {
        let slots = Slots::new(3);
        let claimed: Vec<_> = std::iter::from_fn(|| slots.claim()).collect();
        assert_eq!(claimed, vec![0, 1, 2]);
        assert_eq!(slots.claim(), None);
    }
}
