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

//! Front-end HTTP server.
//!
//! The only externally visible endpoint. Page requests are forwarded to the
//! backend address published at the moment the request arrives, so a
//! rotation never interrupts traffic: requests already in flight finish on
//! the old backend while new ones reach the new one.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rsp_common::{Result, RspError};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::http_router::{classify, content_type, Route};
use crate::live::LiveBackend;
use crate::orchestrator::StatusProvider;

type HttpClient = Client<HttpConnector, Body>;

/// Bytes of a decoded path that are forwarded without escaping.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Clone)]
struct ProxyState {
    live: LiveBackend,
    web_root: Arc<PathBuf>,
    client: HttpClient,
    status: Option<Arc<dyn StatusProvider>>,
}

pub struct HttpServer {
    state: ProxyState,
}

impl HttpServer {
    pub fn new(live: LiveBackend, web_root: impl Into<PathBuf>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            state: ProxyState {
                live,
                web_root: Arc::new(web_root.into()),
                client,
                status: None,
            },
        }
    }

    /// Serves `status` on `/__status`.
    pub fn with_status(mut self, status: Arc<dyn StatusProvider>) -> Self {
        self.state.status = Some(status);
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/__health", get(health_check))
            .route("/__status", get(status))
            .fallback(handle_request)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("Front-end listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router())
            .await
            .map_err(|e| RspError::Transport(format!("Server error: {}", e)))
    }

    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RspError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }
}

async fn handle_request(State(state): State<ProxyState>, req: Request) -> Response {
    let path = percent_decode_str(req.uri().path())
        .decode_utf8_lossy()
        .into_owned();
    match classify(&path) {
        Route::Page(path) => forward(&state, req, &path).await,
        Route::Static(rel) => serve_static(&state.web_root, &rel).await,
        Route::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn forward(state: &ProxyState, req: Request, path: &str) -> Response {
    let Some(addr) = state.live.current() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "No backend is running yet").into_response();
    };

    let encoded = utf8_percent_encode(path, PATH_SAFE);
    let target = match req.uri().query() {
        Some(query) => format!("http://{}{}?{}", addr, encoded, query),
        None => format!("http://{}{}", addr, encoded),
    };
    let uri: Uri = match target.parse() {
        Ok(uri) => uri,
        Err(e) => return internal_error(path, e),
    };

    let (mut parts, body) = req.into_parts();
    parts.uri = uri;
    parts.version = Version::HTTP_11;
    match HeaderValue::from_str(&addr) {
        Ok(host) => {
            parts.headers.insert(header::HOST, host);
        }
        Err(e) => return internal_error(path, e),
    }

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => response.into_response(),
        Err(e) => internal_error(path, e),
    }
}

fn internal_error(path: &str, err: impl std::fmt::Display) -> Response {
    warn!("Error accessing {}: {}", path, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Internal error accessing {}: {}", path, err),
    )
        .into_response()
}

async fn serve_static(root: &Path, rel: &str) -> Response {
    match tokio::fs::read(root.join(rel)).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(rel))], bytes).into_response(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
        Err(e) => {
            warn!("Reading {} failed: {}", rel, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn status(State(state): State<ProxyState>) -> Response {
    match &state.status {
        Some(provider) => Json(provider.status()).into_response(),
        None => Json(serde_json::json!({ "live": state.live.current().as_deref() })).into_response(),
    }
}
