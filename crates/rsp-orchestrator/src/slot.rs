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

use rsp_common::RspConfig;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

/// Lifecycle of the backend occupying a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No process, lock free
    Idle,
    /// Executable being compiled
    Building,
    /// Process started, waiting for it to come up
    Launching,
    /// Receiving traffic
    Live,
    /// Replaced, finishing in-flight requests
    Draining,
    /// Kill signal sent, waiting for exit
    Terminating,
    /// Process gone, removing the executable
    Cleaning,
}

impl SlotState {
    pub fn can_transition_to(self, next: SlotState) -> bool {
        use SlotState::*;
        matches!(
            (self, next),
            (Idle, Building)
                | (Idle, Launching)
                | (Building, Launching)
                | (Building, Idle)
                | (Launching, Live)
                | (Launching, Idle)
                | (Live, Draining)
                | (Draining, Terminating)
                | (Terminating, Cleaning)
                | (Cleaning, Idle)
        )
    }
}

/// One position in the backend ring.
///
/// The executable path and listen address are fixed for the life of the
/// process. Whoever holds `lock` owns the slot: it is taken before a build
/// and only released once the backend started from it is gone.
#[derive(Debug)]
pub struct Slot {
    pub index: usize,
    pub exe_path: PathBuf,
    pub addr: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    state: Mutex<SlotState>,
}

impl Slot {
    pub fn new(index: usize, exe_path: PathBuf, addr: String) -> Self {
        Self {
            index,
            exe_path,
            addr,
            lock: Arc::new(tokio::sync::Mutex::new(())),
            state: Mutex::new(SlotState::Idle),
        }
    }

    /// One slot per configured backend port.
    pub fn ring(config: &RspConfig) -> Vec<Arc<Slot>> {
        config
            .backend
            .addrs()
            .into_iter()
            .enumerate()
            .map(|(index, addr)| {
                let exe = config.exe_dir.join(format!(
                    "backend-{}{}",
                    index,
                    std::env::consts::EXE_SUFFIX
                ));
                Arc::new(Slot::new(index, exe, addr))
            })
            .collect()
    }

    /// Waits until the previous occupant has been fully retired.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        self.lock.clone().lock_owned().await
    }

    pub fn try_acquire(&self) -> Option<OwnedMutexGuard<()>> {
        self.lock.clone().try_lock_owned().ok()
    }

    pub fn state(&self) -> SlotState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `next`. Unexpected transitions are logged but still applied.
    pub fn transition(&self, next: SlotState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let valid = state.can_transition_to(next);
        if valid {
            debug!("Slot {}: {:?} -> {:?}", self.index, *state, next);
        } else {
            warn!("Slot {}: unexpected transition {:?} -> {:?}", self.index, *state, next);
        }
        *state = next;
        valid
    }
}
