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

use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::http::{HeaderMap, Method, Uri};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use url::form_urlencoded;

/// A request as seen by a page handler. The body is fully buffered.
#[derive(Debug)]
pub struct PageRequest {
    parts: Parts,
    body: Bytes,
}

impl PageRequest {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self { parts, body }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Percent-decoded request path, the form pages are registered under.
    pub fn path(&self) -> Cow<'_, str> {
        percent_decode_str(self.parts.uri.path()).decode_utf8_lossy()
    }

    /// Raw query string without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// First value of the named query parameter, decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        find_param(self.query()?.as_bytes(), name)
    }

    /// Looks a parameter up in the query string and then, for urlencoded
    /// form posts, in the body.
    pub fn form_value(&self, name: &str) -> Option<String> {
        if let Some(v) = self.query_param(name) {
            return Some(v);
        }
        let is_form = self
            .header("content-type")
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);
        if is_form {
            find_param(&self.body, name)
        } else {
            None
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

fn find_param(pairs: &[u8], name: &str) -> Option<String> {
    form_urlencoded::parse(pairs)
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
