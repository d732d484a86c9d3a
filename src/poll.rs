// This file is part of the terraform-provider-azurerm project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Poll a remote object until it reaches a target state

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Pseudo-state reported when the refresh function finds nothing
pub const NOT_FOUND: &str = "NotFound";

/// Failure of [`StateChange::wait`]
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timeout while waiting for state to become '{target}' (last state: '{last_state}', timeout: {timeout:?})")]
    Timeout {
        target: String,
        last_state: String,
        timeout: Duration,
    },
    #[error("unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState { state: String, target: String },
    #[error("couldn't find the resource ({checks} retries)")]
    NotFound { checks: usize },
    #[error(transparent)]
    Refresh(#[from] anyhow::Error),
}

/// Configuration of a wait loop
#[derive(Debug, Clone)]
pub struct StateChange<'a> {
    /// States that keep the loop going
    pub pending: &'a [&'a str],
    /// States that end the loop
    pub target: &'a [&'a str],
    /// Delay before the first refresh
    pub delay: Duration,
    pub poll_interval: Duration,
    /// Number of target observations in a row required to succeed
    pub continuous_target_occurrence: usize,
    /// Number of "not found" observations tolerated when neither pending nor target
    pub not_found_checks: usize,
    pub timeout: Duration,
}

impl<'a> StateChange<'a> {
    pub fn new(pending: &'a [&'a str], target: &'a [&'a str], timeout: Duration) -> Self {
        Self {
            pending,
            target,
            delay: Duration::ZERO,
            poll_interval: Duration::from_secs(10),
            continuous_target_occurrence: 1,
            not_found_checks: 20,
            timeout,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_continuous_target_occurrence(mut self, occurrences: usize) -> Self {
        self.continuous_target_occurrence = occurrences;
        self
    }

    fn timed_out(&self, last_state: String) -> WaitError {
        WaitError::Timeout {
            target: self.target.join(", "),
            last_state,
            timeout: self.timeout,
        }
    }

    /// Call `refresh` until it reports a target state
    ///
    /// `refresh` returns `Ok(None)` when the object does not exist, which is
    /// observed as [`NOT_FOUND`].
    pub async fn wait<F, Fut>(&self, mut refresh: F) -> Result<String, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<String>>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut last_state = String::new();
        let mut target_seen = 0;
        let mut not_found_seen = 0;

        if !self.delay.is_zero() {
            tokio::time::sleep_until(deadline.min(Instant::now() + self.delay)).await;
        }

        loop {
            if Instant::now() >= deadline {
                return Err(self.timed_out(last_state));
            }

            let state = match tokio::time::timeout_at(deadline, refresh()).await {
                Err(_) => return Err(self.timed_out(last_state)),
                Ok(result) => result?.unwrap_or_else(|| NOT_FOUND.to_owned()),
            };

            if self.target.contains(&state.as_str()) {
                target_seen += 1;
                if target_seen >= self.continuous_target_occurrence.max(1) {
                    return Ok(state);
                }
            } else if self.pending.contains(&state.as_str()) {
                target_seen = 0;
            } else if state == NOT_FOUND {
                target_seen = 0;
                not_found_seen += 1;
                if not_found_seen > self.not_found_checks {
                    return Err(WaitError::NotFound {
                        checks: not_found_seen,
                    });
                }
            } else {
                return Err(WaitError::UnexpectedState {
                    state,
                    target: self.target.join(", "),
                });
            }

            tracing::trace!(state = %state, target_seen, "waiting for state change");
            last_state = state;
            tokio::time::sleep_until(deadline.min(Instant::now() + self.poll_interval)).await;
        }
    }
}
