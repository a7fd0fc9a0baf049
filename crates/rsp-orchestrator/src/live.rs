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

use std::sync::Arc;
use tokio::sync::watch;

/// Address of the backend currently receiving traffic.
///
/// Written only by the orchestrator, read by every proxied request. Readers
/// never wait on orchestration work: a read clones the current `Arc`.
#[derive(Debug, Clone)]
pub struct LiveBackend {
    tx: Arc<watch::Sender<Option<Arc<str>>>>,
}

impl Default for LiveBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveBackend {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Makes `addr` the target of new requests and returns the previous one.
    pub fn publish(&self, addr: &str) -> Option<Arc<str>> {
        self.tx.send_replace(Some(Arc::from(addr)))
    }

    pub fn current(&self) -> Option<Arc<str>> {
        self.tx.borrow().clone()
    }

    /// Notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<str>>> {
        self.tx.subscribe()
    }
}
