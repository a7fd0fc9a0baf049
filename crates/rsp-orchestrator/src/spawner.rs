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

//! Starting backend processes.
//!
//! The orchestrator only talks to [`BackendSpawner`], so tests can launch
//! stand-in processes instead of real compiled backends.

use rsp_common::{Result, RspError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

pub trait BackendSpawner: Send + Sync + 'static {
    /// Starts `exe` listening on `addr`.
    fn spawn_backend(&self, exe: &Path, addr: &str) -> Result<Child>;
}

/// Runs the executable directly, passing the listen address as its only
/// argument. Output goes to the orchestrator's own stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpawner {
    working_dir: Option<PathBuf>,
}

impl ProcessSpawner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
        }
    }
}

impl BackendSpawner for ProcessSpawner {
    fn spawn_backend(&self, exe: &Path, addr: &str) -> Result<Child> {
        let mut cmd = Command::new(exe);
        cmd.arg(addr).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.spawn()
            .map_err(|e| RspError::Launch(format!("Failed to spawn {}: {}", exe.display(), e)))
    }
}
