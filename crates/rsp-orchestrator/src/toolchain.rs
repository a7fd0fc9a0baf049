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

use rsp_common::{BuildConfig, Result, RspError};
use std::fs::{self, File};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

/// Name of the binary target in every generated backend project.
pub const BACKEND_BIN: &str = "rsp-backend";

/// Compiles an assembled backend project into an executable.
pub trait Toolchain: Send + Sync + 'static {
    /// Builds the project in `project_dir`, sending compiler output to
    /// `log_path`, and returns the path of the produced executable.
    fn compile(
        &self,
        project_dir: &Path,
        log_path: &Path,
    ) -> impl Future<Output = Result<PathBuf>> + Send;
}

/// Runs `cargo build` with a target directory shared across builds.
#[derive(Debug, Clone)]
pub struct CargoToolchain {
    cargo: String,
    target_dir: PathBuf,
    release: bool,
}

impl CargoToolchain {
    pub fn new(cargo: impl Into<String>, target_dir: impl Into<PathBuf>, release: bool) -> Self {
        Self {
            cargo: cargo.into(),
            target_dir: target_dir.into(),
            release,
        }
    }

    pub fn from_config(build: &BuildConfig, target_dir: &Path) -> Self {
        Self::new(build.cargo.clone(), target_dir, build.release)
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    fn output_path(&self) -> PathBuf {
        let profile = if self.release { "release" } else { "debug" };
        self.target_dir
            .join(profile)
            .join(format!("{}{}", BACKEND_BIN, std::env::consts::EXE_SUFFIX))
    }
}

impl Toolchain for CargoToolchain {
    async fn compile(&self, project_dir: &Path, log_path: &Path) -> Result<PathBuf> {
        let stdout = File::create(log_path)?;
        let stderr = stdout.try_clone()?;

        let mut cmd = Command::new(&self.cargo);
        cmd.arg("build")
            .arg("--manifest-path")
            .arg(project_dir.join("Cargo.toml"))
            .arg("--target-dir")
            .arg(&self.target_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        if self.release {
            cmd.arg("--release");
        }

        info!("Compiling {} (log: {})", project_dir.display(), log_path.display());
        let status = cmd
            .status()
            .await
            .map_err(|e| RspError::Build(format!("failed to run {}: {}", self.cargo, e)))?;

        if !status.success() {
            error!("Compiling failed with {}:", status);
            for line in log_tail(log_path, 30) {
                error!("  {}", line);
            }
            return Err(RspError::Build(format!(
                "{} build exited with {}",
                self.cargo, status
            )));
        }

        let exe = self.output_path();
        if !exe.is_file() {
            return Err(RspError::Build(format!(
                "compiler succeeded but {} is missing",
                exe.display()
            )));
        }
        Ok(exe)
    }
}

/// Last `n` lines of a log file. Unreadable logs yield nothing.
pub fn log_tail(path: &Path, n: usize) -> Vec<String> {
    let Ok(bytes) = fs::read(path) else {
        return Vec::new();
    };
    let text = String::from_utf8_lossy(&bytes);
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
