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

//! Rolling orchestrator.
//!
//! Owns a fixed ring of backend slots. Each cycle it rescans the web root
//! and, when the live backend is stale (or none has started yet), builds
//! into the next slot, launches it, publishes its address and retires the
//! previous backend in the background:
//!
//! ```text
//! lock slot -> build -> launch -> publish -> (old) drain -> kill -> wait -> delete -> unlock
//! ```
//!
//! The slot lock is the only backpressure. When the ring wraps around to a
//! slot whose previous occupant is still draining, the cycle waits for it.

use rsp_common::{Result, RspConfig, RspError};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{broadcast, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::builder::Builder;
use crate::health_checker::HealthChecker;
use crate::live::LiveBackend;
use crate::monitor::Monitor;
use crate::slot::{Slot, SlotState};
use crate::spawner::BackendSpawner;
use crate::toolchain::Toolchain;

/// Progress of a rotation, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RotationEvent {
    BuildStarted { slot: usize },
    BuildFailed { slot: usize, error: String },
    Launched { slot: usize, addr: String },
    LaunchFailed { slot: usize, error: String },
    Published { slot: usize, addr: String },
    Draining { slot: usize },
    Terminated { slot: usize },
    Exited { slot: usize, code: Option<i32> },
    Deleted { slot: usize },
    DeleteFailed { slot: usize, error: String },
    Released { slot: usize },
}

/// Result of one orchestration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Live backend is up to date
    Idle,
    /// A new backend was published
    Rotated,
    BuildFailed,
    LaunchFailed,
}

/// Delays applied during a rotation.
#[derive(Debug, Clone)]
pub struct RotationTiming {
    /// Warm-up after launching, before the first readiness check
    pub start_wait: Duration,
    /// Drain period of a replaced backend before it is killed
    pub kill_wait: Duration,
    /// Pause between process exit and deleting its executable
    pub del_wait: Duration,
    pub poll_interval: Duration,
}

impl RotationTiming {
    pub fn from_config(config: &RspConfig) -> Self {
        Self {
            start_wait: config.backend.start_wait(),
            kill_wait: config.backend.kill_wait(),
            del_wait: config.backend.del_wait(),
            poll_interval: config.backend.poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub index: usize,
    pub addr: String,
    pub state: SlotState,
}

/// Snapshot served by the proxy's status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub live: Option<String>,
    pub current: usize,
    pub last: Option<usize>,
    pub slots: Vec<SlotStatus>,
}

/// Anything that can report an [`OrchestratorStatus`].
pub trait StatusProvider: Send + Sync {
    fn status(&self) -> OrchestratorStatus;
}

/// The running backend together with the lock of the slot it came from.
struct LiveHandle {
    slot: Arc<Slot>,
    child: Child,
    guard: OwnedMutexGuard<()>,
}

struct Ring {
    current: usize,
    last: Option<usize>,
    live: Option<LiveHandle>,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    current: usize,
    last: Option<usize>,
}

pub struct Orchestrator<T, S> {
    monitor: Monitor,
    builder: Builder<T>,
    spawner: S,
    health: HealthChecker,
    timing: RotationTiming,
    slots: Vec<Arc<Slot>>,
    live_backend: LiveBackend,
    events: broadcast::Sender<RotationEvent>,
    ring: tokio::sync::Mutex<Ring>,
    cursor: Mutex<Cursor>,
}

impl<T: Toolchain, S: BackendSpawner> Orchestrator<T, S> {
    pub fn new(config: &RspConfig, toolchain: T, spawner: S, live_backend: LiveBackend) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(256);
        Ok(Self {
            monitor: Monitor::new(&config.web_root),
            builder: Builder::new(config, toolchain),
            spawner,
            health: HealthChecker::with_timeout(config.backend.ready_timeout()),
            timing: RotationTiming::from_config(config),
            slots: Slot::ring(config),
            live_backend,
            events,
            ring: tokio::sync::Mutex::new(Ring {
                current: 0,
                last: None,
                live: None,
            }),
            cursor: Mutex::new(Cursor {
                current: 0,
                last: None,
            }),
        })
    }

    pub fn slots(&self) -> &[Arc<Slot>] {
        &self.slots
    }

    pub fn live_backend(&self) -> &LiveBackend {
        &self.live_backend
    }

    pub fn builder(&self) -> &Builder<T> {
        &self.builder
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RotationEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RotationEvent) {
        let _ = self.events.send(event);
    }

    /// Runs one cycle: rebuild and rotate if the sources changed.
    pub async fn step(&self) -> Result<StepOutcome> {
        let mut ring = self.ring.lock().await;
        let files = self.monitor.scan()?;

        let slot = self.slots[ring.current].clone();
        let marker = match &ring.live {
            Some(live) => live.slot.exe_path.clone(),
            None => slot.exe_path.clone(),
        };
        let stale = Monitor::needs_update(&marker, &files);
        if ring.live.is_some() && !stale {
            return Ok(StepOutcome::Idle);
        }

        debug!("Acquiring slot {}", slot.index);
        let guard = slot.acquire().await;

        if ring.live.is_none() && !stale {
            info!("Reusing up-to-date {}", slot.exe_path.display());
        } else {
            slot.transition(SlotState::Building);
            self.emit(RotationEvent::BuildStarted { slot: slot.index });
            info!("Building {} pages into slot {}", files.len(), slot.index);

            if let Err(e) = self.builder.build(&files, &slot.exe_path).await {
                error!("Build for slot {} failed: {}", slot.index, e);
                slot.transition(SlotState::Idle);
                self.emit(RotationEvent::BuildFailed {
                    slot: slot.index,
                    error: e.to_string(),
                });
                return Ok(StepOutcome::BuildFailed);
            }
        }

        slot.transition(SlotState::Launching);
        let child = match self.launch(&slot).await {
            Ok(child) => child,
            Err(e) => {
                error!("Launching slot {} on {} failed: {}", slot.index, slot.addr, e);
                slot.transition(SlotState::Idle);
                self.emit(RotationEvent::LaunchFailed {
                    slot: slot.index,
                    error: e.to_string(),
                });
                return Ok(StepOutcome::LaunchFailed);
            }
        };

        slot.transition(SlotState::Live);
        let previous = self.live_backend.publish(&slot.addr);
        info!("Publishing {} (previously {:?})", slot.addr, previous.as_deref());
        self.emit(RotationEvent::Published {
            slot: slot.index,
            addr: slot.addr.clone(),
        });

        let handle = LiveHandle {
            slot: slot.clone(),
            child,
            guard,
        };
        if let Some(old) = ring.live.replace(handle) {
            self.retire(old);
        }

        ring.last = Some(ring.current);
        ring.current = (ring.current + 1) % self.slots.len();
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner) = Cursor {
            current: ring.current,
            last: ring.last,
        };
        Ok(StepOutcome::Rotated)
    }

    async fn launch(&self, slot: &Slot) -> Result<Child> {
        let mut child = self.spawner.spawn_backend(&slot.exe_path, &slot.addr)?;
        info!(
            "Launched {} on {} (pid {:?})",
            slot.exe_path.display(),
            slot.addr,
            child.id()
        );
        tokio::time::sleep(self.timing.start_wait).await;

        let ready = match child.try_wait() {
            Ok(Some(status)) => Err(RspError::Launch(format!(
                "backend exited during start-up with {}",
                status
            ))),
            Ok(None) => self.health.wait_ready(&slot.addr).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = ready {
            if let Err(kill_err) = child.kill().await {
                debug!("Killing failed backend: {}", kill_err);
            }
            return Err(e);
        }

        self.emit(RotationEvent::Launched {
            slot: slot.index,
            addr: slot.addr.clone(),
        });
        Ok(child)
    }

    /// Drains, kills and cleans up a replaced backend in the background.
    fn retire(&self, old: LiveHandle) {
        let events = self.events.clone();
        let timing = self.timing.clone();

        tokio::spawn(async move {
            let LiveHandle {
                slot,
                mut child,
                guard,
            } = old;
            let emit = |event| {
                let _ = events.send(event);
            };

            slot.transition(SlotState::Draining);
            info!("Draining slot {} for {:?}", slot.index, timing.kill_wait);
            emit(RotationEvent::Draining { slot: slot.index });
            tokio::time::sleep(timing.kill_wait).await;

            slot.transition(SlotState::Terminating);
            if let Err(e) = child.start_kill() {
                warn!("Killing backend in slot {} failed: {}", slot.index, e);
            }
            emit(RotationEvent::Terminated { slot: slot.index });

            let code = match child.wait().await {
                Ok(status) => {
                    info!("Backend in slot {} exited with {}", slot.index, status);
                    status.code()
                }
                Err(e) => {
                    warn!("Waiting for backend in slot {} failed: {}", slot.index, e);
                    None
                }
            };
            emit(RotationEvent::Exited {
                slot: slot.index,
                code,
            });

            tokio::time::sleep(timing.del_wait).await;
            slot.transition(SlotState::Cleaning);
            match remove_executable(&slot.exe_path).await {
                Ok(()) => {
                    info!("Deleted {}", slot.exe_path.display());
                    emit(RotationEvent::Deleted { slot: slot.index });
                }
                Err(e) => {
                    error!("Deleting {} failed: {}", slot.exe_path.display(), e);
                    emit(RotationEvent::DeleteFailed {
                        slot: slot.index,
                        error: e.to_string(),
                    });
                }
            }

            slot.transition(SlotState::Idle);
            drop(guard);
            emit(RotationEvent::Released { slot: slot.index });
        });
    }

    /// Loops forever, one [`step`](Self::step) per poll interval.
    pub async fn run(&self) {
        info!("Orchestrating {} backend slots", self.slots.len());
        loop {
            match self.step().await {
                Ok(StepOutcome::Idle) => {}
                Ok(outcome) => debug!("Rotation step: {:?}", outcome),
                Err(e) => warn!("Rotation step failed: {}", e),
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Stops the live backend. Waits for any rotation step in progress.
    pub async fn shutdown(&self) {
        let mut ring = self.ring.lock().await;
        if let Some(LiveHandle {
            slot,
            mut child,
            guard,
        }) = ring.live.take()
        {
            info!("Stopping backend in slot {}", slot.index);
            if let Err(e) = child.kill().await {
                warn!("Killing backend in slot {} failed: {}", slot.index, e);
            }
            slot.transition(SlotState::Draining);
            slot.transition(SlotState::Terminating);
            slot.transition(SlotState::Cleaning);
            slot.transition(SlotState::Idle);
            drop(guard);
        }
    }
}

impl<T: Toolchain, S: BackendSpawner> StatusProvider for Orchestrator<T, S> {
    fn status(&self) -> OrchestratorStatus {
        let cursor = *self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        OrchestratorStatus {
            live: self.live_backend.current().map(|a| a.to_string()),
            current: cursor.current,
            last: cursor.last,
            slots: self
                .slots
                .iter()
                .map(|s| SlotStatus {
                    index: s.index,
                    addr: s.addr.clone(),
                    state: s.state(),
                })
                .collect(),
        }
    }
}

async fn remove_executable(path: &Path) -> std::io::Result<()> {
    tokio::fs::remove_file(path).await
}
