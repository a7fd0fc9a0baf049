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

//! HTTP server for a generated backend.
//!
//! Accepts HTTP/1.1 connections, spawns one task per connection and
//! dispatches each request to the page registered for its exact path.
//! A page that panics produces a 500 instead of taking the connection
//! or the process down.

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rsp_common::{Result, RspError};
use std::convert::Infallible;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::registry::PageRegistry;
use crate::request::PageRequest;
use crate::response::PageResponse;

pub struct BackendServer {
    registry: Arc<PageRegistry>,
}

impl BackendServer {
    pub fn new(registry: PageRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Binds `addr` and serves until the process is stopped.
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RspError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(
            "Backend server listening at {} with {} pages",
            listener.local_addr()?,
            self.registry.len()
        );

        loop {
            let (stream, peer) = listener.accept().await.map_err(|e| {
                RspError::Transport(format!("Failed to accept connection: {}", e))
            })?;
            debug!("Accepted connection from {}", peer);

            let io = TokioIo::new(stream);
            let registry = self.registry.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let registry = registry.clone();
                    async move { Ok::<_, Infallible>(Self::handle_request(&registry, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Error serving connection: {}", err);
                }
            });
        }
    }

    async fn handle_request(
        registry: &PageRegistry,
        req: Request<Incoming>,
    ) -> Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return text_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read request body: {}", e),
                )
            }
        };
        let request = PageRequest::new(parts, body);
        dispatch(registry, &request)
    }
}

/// Runs the page registered for the request path.
pub fn dispatch(registry: &PageRegistry, request: &PageRequest) -> Response<Full<Bytes>> {
    let path = request.path();
    let Some(handler) = registry.lookup(&path) else {
        return text_response(StatusCode::NOT_FOUND, format!("Not found: {}", path));
    };

    let mut response = PageResponse::new();
    match panic::catch_unwind(AssertUnwindSafe(|| handler(request, &mut response))) {
        Ok(()) => response.into_response(),
        Err(_) => {
            error!("Page {} panicked", path);
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error rendering {}", path),
            )
        }
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
