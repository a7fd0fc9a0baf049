// Copyright 2025 RSP Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
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

use rsp_common::{Result, RspError};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Readiness probe configuration.
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// How long a new backend gets to accept connections; `None` skips the probe
    pub timeout: Option<Duration>,
    /// Pause between connection attempts
    pub interval: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(5000)),
            interval: Duration::from_millis(50),
        }
    }
}

/// Checks that a freshly launched backend is accepting connections before it
/// is published.
#[derive(Debug, Clone, Default)]
pub struct HealthChecker {
    config: HealthCheckConfig,
}

impl HealthChecker {
    pub fn new(config: HealthCheckConfig) -> Self {
        Self { config }
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self::new(HealthCheckConfig {
            timeout,
            ..Default::default()
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.timeout.is_some()
    }

    /// Single connection attempt.
    pub async fn check(addr: &str) -> Result<()> {
        TcpStream::connect(addr)
            .await
            .map(drop)
            .map_err(|e| RspError::Transport(format!("{}: {}", addr, e)))
    }

    /// Retries [`check`](Self::check) until it succeeds or the timeout
    /// passes.
    pub async fn wait_ready(&self, addr: &str) -> Result<()> {
        let Some(timeout) = self.config.timeout else {
            return Ok(());
        };
        let interval = self.config.interval;

        let probe = async {
            loop {
                match Self::check(addr).await {
                    Ok(()) => return,
                    Err(e) => {
                        debug!("Backend not ready yet: {}", e);
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        };
        tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| RspError::Timeout(timeout.as_millis() as u64))
    }
}
