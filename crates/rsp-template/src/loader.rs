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

//! Sources for `include` and `require` targets.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolves a directive path to page source text.
pub trait SourceLoader {
    fn load(&self, path: &str) -> io::Result<String>;
}

impl<F> SourceLoader for F
where
    F: Fn(&str) -> io::Result<String>,
{
    fn load(&self, path: &str) -> io::Result<String> {
        self(path)
    }
}

/// In-memory sources keyed by path.
impl SourceLoader for HashMap<String, String> {
    fn load(&self, path: &str) -> io::Result<String> {
        self.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("Not found: {}", path))
        })
    }
}

/// Loads pages from the web root.
///
/// Paths are always relative to the root, never to the including page, and
/// may not leave it.
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let rel = Path::new(path);
        let confined = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined || path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{:?} is not a path inside the web root", path),
            ));
        }
        Ok(self.root.join(rel))
    }
}

impl SourceLoader for DirLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path)?)
    }
}
