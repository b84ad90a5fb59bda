use crate::error::{Error, Result};
use crate::model::Target;
use serde_json::Value;
use std::time::{Duration, Instant};

pub const DEFAULT_FIELD: &str = "total";

#[derive(Debug)]
pub struct ProbeResult {
    pub status: u16,
    pub elapsed: Duration,
    /// Top-level field of the body, `None` if the object does not carry it
    pub value: Option<Value>,
}

/// Issues one GET and pulls `field` out of the JSON body.
pub async fn probe(target: &Target, field: &str, timeout: Option<Duration>) -> Result<ProbeResult> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().map_err(Error::Client)?;

    let begin = Instant::now();
    let response = client.get(target.url().clone()).send().await?;
    let status = response.status().as_u16();
    let body: Value = response.json().await.map_err(Error::Decode)?;
    let elapsed = begin.elapsed();

    tracing::debug!(%target, status, elapsed_ms = elapsed.as_millis() as u64, "probe finished");

    Ok(ProbeResult {
        status,
        elapsed,
        value: body.get(field).cloned(),
    })
}
