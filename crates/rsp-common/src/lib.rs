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

//! RSP Common Types
//!
//! Shared infrastructure for the RSP (Rust Server Pages) application server:
//!
//! - [`RspError`] / [`Result`]: the error type every crate in the workspace returns
//! - [`config`]: the [`RspConfig`](config::RspConfig) model and its JSON loader
//!
//! # Error Taxonomy
//!
//! Errors are grouped by the stage that produced them. None of them is fatal to
//! the `rsps` process: the orchestration loop and the proxy log them and carry
//! on with the next cycle or the next request.
//!
//! - **Template**: a page could not be loaded
//! - **Build**: the toolchain exited non-zero
//! - **Launch**: a backend failed to start or never became ready
//! - **Transport**: a network operation failed

pub mod config;

pub use config::{BackendConfig, BuildConfig, RspConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RspError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Launch failed: {0}")]
    Launch(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl From<std::net::AddrParseError> for RspError {
    fn from(err: std::net::AddrParseError) -> Self {
        RspError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RspError>;
