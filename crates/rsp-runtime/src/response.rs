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

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use hyper::http::HeaderMap;
use hyper::{Response, StatusCode};
use std::fmt::{self, Write};
use tracing::warn;

pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// The response a page handler writes into.
///
/// Output is buffered and sent once the handler returns, so status and
/// headers can be changed at any point during rendering.
#[derive(Debug)]
pub struct PageResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Default for PageResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl PageResponse {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        Self {
            status: StatusCode::OK,
            headers,
            body: String::new(),
        }
    }

    /// Appends the `Display` form of `value`.
    pub fn print<T: fmt::Display + ?Sized>(&mut self, value: &T) {
        let _ = write!(self.body, "{}", value);
    }

    pub fn print_str(&mut self, text: &str) {
        self.body.push_str(text);
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Replaces a header. Invalid names or values are logged and ignored.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => warn!("Ignoring invalid header {}: {:?}", name, value),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn redirect(&mut self, location: &str) {
        self.set_status(StatusCode::FOUND);
        self.set_header(LOCATION.as_str(), location);
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Drops everything printed so far.
    pub fn clear(&mut self) {
        self.body.clear();
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Write for PageResponse {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.body.push_str(s);
        Ok(())
    }
}
