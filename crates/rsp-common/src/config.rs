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

//! Configuration for the RSP server.
//!
//! The configuration is a JSON document; every section and every field has a
//! default, so an empty object (or a missing file) yields a runnable setup.
//!
//! ```json
//! {
//!   "web_root": "web",
//!   "listen_addr": "0.0.0.0:8080",
//!   "backend": { "ports": [8081, 8082, 8083], "kill_wait_ms": 10000 },
//!   "build": { "release": true, "dependencies": { "chrono": "0.4" } }
//! }
//! ```

use crate::{Result, RspError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rsps.json";

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RspConfig {
    /// Watched tree of `.rsp` pages; also the root for static files
    pub web_root: PathBuf,
    /// Where generated page sources are written
    pub src_dir: PathBuf,
    /// Where slot executables and their build logs live
    pub exe_dir: PathBuf,
    /// Parent of per-build project directories (system temp dir when unset)
    pub tmp_dir: Option<PathBuf>,
    /// Cargo target directory shared by all builds
    pub target_dir: PathBuf,
    /// Location of the `rsp-runtime` crate generated backends depend on
    pub runtime_crate: PathBuf,
    /// Front-end listen address
    pub listen_addr: String,
    pub backend: BackendConfig,
    pub build: BuildConfig,
}

/// Backend ring and rotation timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Host the backends bind to
    pub host: String,
    /// One port per ring slot
    pub ports: Vec<u16>,
    /// Warm-up delay after launching a backend, before publishing it
    pub start_wait_ms: u64,
    /// Drain delay before the previous backend is killed
    pub kill_wait_ms: u64,
    /// Delay between process exit and executable deletion
    pub del_wait_ms: u64,
    /// Orchestration poll interval
    pub poll_interval_ms: u64,
    /// How long a new backend may take to accept connections; 0 disables the probe
    pub ready_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            ports: vec![8081, 8082, 8083],
            start_wait_ms: 1000,
            kill_wait_ms: 10_000,
            del_wait_ms: 1000,
            poll_interval_ms: 1000,
            ready_timeout_ms: 5000,
        }
    }
}

impl BackendConfig {
    pub fn start_wait(&self) -> Duration {
        Duration::from_millis(self.start_wait_ms)
    }

    pub fn kill_wait(&self) -> Duration {
        Duration::from_millis(self.kill_wait_ms)
    }

    pub fn del_wait(&self) -> Duration {
        Duration::from_millis(self.del_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `None` when the readiness probe is disabled.
    pub fn ready_timeout(&self) -> Option<Duration> {
        (self.ready_timeout_ms > 0).then(|| Duration::from_millis(self.ready_timeout_ms))
    }

    /// Listen address of each slot, in ring order.
    pub fn addrs(&self) -> Vec<String> {
        self.ports
            .iter()
            .map(|port| format!("{}:{}", self.host, port))
            .collect()
    }
}

/// Toolchain settings for compiling generated backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Cargo executable
    pub cargo: String,
    /// Build with `--release`
    pub release: bool,
    /// Extra crates available to page imports: name -> version requirement
    pub dependencies: BTreeMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cargo: "cargo".to_string(),
            release: true,
            dependencies: BTreeMap::new(),
        }
    }
}

/// The `rsp-runtime` crate next to this one in the workspace.
fn default_runtime_crate() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(|crates| crates.join("rsp-runtime"))
        .unwrap_or_else(|| PathBuf::from("rsp-runtime"))
}

impl Default for RspConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("web"),
            src_dir: PathBuf::from("src"),
            exe_dir: PathBuf::from("exe"),
            tmp_dir: None,
            target_dir: PathBuf::from("target-rsp"),
            runtime_crate: default_runtime_crate(),
            listen_addr: "0.0.0.0:8080".to_string(),
            backend: BackendConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl RspConfig {
    /// Parses a configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Loads the configuration file at `path`.
    ///
    /// A missing file is not an error: it is logged and the defaults are used.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                info!("Loaded configuration from {}", path.display());
                Self::from_json(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Configuration file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves every relative directory against `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.web_root);
        resolve(&mut self.src_dir);
        resolve(&mut self.exe_dir);
        resolve(&mut self.target_dir);
        resolve(&mut self.runtime_crate);
        if let Some(tmp) = self.tmp_dir.as_mut() {
            resolve(tmp);
        }
        self
    }

    /// Checks the invariants the orchestrator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(RspError::Config("listen_addr must not be empty".to_string()));
        }

        // The previous occupant of a slot keeps its lock until retired, so a
        // single-slot ring could never rotate.
        if self.backend.ports.len() < 2 {
            return Err(RspError::Config(format!(
                "at least 2 backend ports are required, got {}",
                self.backend.ports.len()
            )));
        }

        let mut seen = HashSet::new();
        for port in &self.backend.ports {
            if !seen.insert(port) {
                return Err(RspError::Config(format!("duplicate backend port {}", port)));
            }
        }

        Ok(())
    }
}
