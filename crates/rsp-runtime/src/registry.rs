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

use crate::request::PageRequest;
use crate::response::PageResponse;
use std::collections::HashMap;
use tracing::{info, warn};

/// Signature of a compiled page.
pub type PageHandler = fn(&PageRequest, &mut PageResponse);

/// Exact-match table from URL path to page handler.
#[derive(Default)]
pub struct PageRegistry {
    pages: HashMap<String, PageHandler>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: &[(&str, PageHandler)]) -> Self {
        let mut registry = Self::new();
        for (path, handler) in pages {
            registry.register(path, *handler);
        }
        registry
    }

    pub fn register(&mut self, path: &str, handler: PageHandler) {
        info!("Register path: {}", path);
        if self.pages.insert(path.to_string(), handler).is_some() {
            warn!("Path {} registered twice, keeping the last handler", path);
        }
    }

    pub fn lookup(&self, path: &str) -> Option<PageHandler> {
        self.pages.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.pages.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}
