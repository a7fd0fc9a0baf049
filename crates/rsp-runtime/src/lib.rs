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

//! Runtime for compiled RSP backends.
//!
//! Every generated backend is a small binary crate that depends on this one.
//! Its `main` hands the table of compiled pages to [`run`], which starts an
//! HTTP server on the address given as the first command line argument
//! (`127.0.0.1:8081` by default).
//!
//! Pages see the request through [`PageRequest`] and write output into
//! [`PageResponse`]. The [`prelude`] is glob-imported into every page.

pub mod escape;
pub mod http_server;
pub mod registry;
pub mod request;
pub mod response;

pub use http_server::BackendServer;
pub use registry::{PageHandler, PageRegistry};
pub use request::PageRequest;
pub use response::PageResponse;

use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8081";

/// Names available to page code without an explicit import.
pub mod prelude {
    pub use crate::escape::{html, js, markdown, query, value};
    pub use crate::request::PageRequest;
    pub use crate::response::PageResponse;
    pub use hyper::StatusCode;
    pub use std::fmt::Write as _;
}

/// Entry point of a generated backend.
pub fn run(pages: &[(&str, PageHandler)]) -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let addr = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let server = BackendServer::new(PageRegistry::from_pages(pages));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server.run(&addr)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Backend server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
