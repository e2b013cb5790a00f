//! Fixed-interval polling behind a start/stop handle.

use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::ApiResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Consecutive failures tolerated before the delay starts doubling
    pub failure_threshold: u32,
    pub max_interval: Duration,
}

impl PollPolicy {
    pub fn every(interval: Duration) -> Self {
        PollPolicy {
            interval,
            failure_threshold: 3,
            max_interval: Duration::from_secs(30),
        }
    }

    /// Delay before the next tick given the current failure streak.
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures < self.failure_threshold {
            return self.interval;
        }
        let exponent = (consecutive_failures - self.failure_threshold + 1).min(16);
        let backed_off = self.interval.saturating_mul(1u32 << exponent);
        backed_off.min(self.max_interval.max(self.interval))
    }
}

/// Owns a running poll loop. Stopping or dropping the handle aborts the
/// task, including a request that is still in flight.
pub struct PollHandle {
    name: String,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Stopped poll {}", self.name);
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Runs `fetch` immediately and then on every tick, handing each result to
/// `deliver`. The loop ends when `deliver` returns false (receiver gone).
pub fn spawn_poll<T, F, Fut, D>(name: impl Into<String>, policy: PollPolicy, mut fetch: F, mut deliver: D) -> PollHandle
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ApiResult<T>> + Send,
    D: FnMut(ApiResult<T>) -> bool + Send + 'static,
{
    let name = name.into();
    let task_name = name.clone();

    let task = tokio::spawn(async move {
        let mut failures: u32 = 0;
        loop {
            let result = fetch().await;
            match &result {
                Ok(_) => failures = 0,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    // Logged only; the next tick is the retry
                    warn!("Poll {} failed ({} in a row): {}", task_name, failures, e);
                }
            }

            if !deliver(result) {
                debug!("Poll {} receiver closed", task_name);
                break;
            }

            tokio::time::sleep(policy.delay_after(failures)).await;
        }
    });

    debug!("Started poll {} every {:?}", name, policy.interval);
    PollHandle { name, task: Some(task) }
}
