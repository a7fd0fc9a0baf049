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

use rsp_common::{Result, RspError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extension of page sources, matched case-insensitively.
pub const PAGE_EXTENSION: &str = "rsp";

pub fn is_page(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(PAGE_EXTENSION))
        .unwrap_or(false)
}

/// Watches the web root for page sources.
#[derive(Debug, Clone)]
pub struct Monitor {
    root: PathBuf,
}

impl Monitor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every page under the root, keyed by its path relative to the root,
    /// with its modification time.
    pub fn scan(&self) -> Result<BTreeMap<PathBuf, SystemTime>> {
        if !self.root.is_dir() {
            return Err(RspError::Config(format!(
                "web root {} is not a directory",
                self.root.display()
            )));
        }

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_page(entry.path()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            match entry.metadata().map_err(std::io::Error::from).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    files.insert(rel.to_path_buf(), mtime);
                }
                Err(e) => warn!("Cannot stat {}: {}", entry.path().display(), e),
            }
        }
        debug!("Found {} pages under {}", files.len(), self.root.display());
        Ok(files)
    }

    /// True when `marker` is missing or any file was modified after it.
    pub fn needs_update(marker: &Path, files: &BTreeMap<PathBuf, SystemTime>) -> bool {
        let marker_time = match fs::metadata(marker).and_then(|m| m.modified()) {
            Ok(time) => time,
            Err(_) => return true,
        };
        files.values().any(|mtime| *mtime > marker_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(path: &Path, time: SystemTime) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_is_page() {
        assert!(is_page(Path::new("a/index.rsp")));
        assert!(is_page(Path::new("INDEX.RSP")));
        assert!(!is_page(Path::new("index.rsp.bak")));
        assert!(!is_page(Path::new("rsp")));
    }

    #[test]
    fn test_scan() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        touch(&dir.path().join("index.rsp"), now);
        touch(&dir.path().join("blog/Post.RSP"), now);
        touch(&dir.path().join("logo.png"), now);

        let files = Monitor::new(dir.path()).scan().unwrap();
        let names: Vec<&Path> = files.keys().map(PathBuf::as_path).collect();
        assert_eq!(names, vec![Path::new("blog/Post.RSP"), Path::new("index.rsp")]);
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Monitor::new(dir.path().join("nope")).scan().is_err());
    }

    #[test]
    fn test_needs_update() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("backend");
        let page = dir.path().join("web/index.rsp");
        let base = SystemTime::now() - Duration::from_secs(60);

        touch(&page, base);
        let files = Monitor::new(dir.path().join("web")).scan().unwrap();
        assert!(Monitor::needs_update(&marker, &files), "missing marker");

        touch(&marker, base + Duration::from_secs(10));
        assert!(!Monitor::needs_update(&marker, &files), "older sources");

        touch(&page, base + Duration::from_secs(20));
        let files = Monitor::new(dir.path().join("web")).scan().unwrap();
        assert!(Monitor::needs_update(&marker, &files), "newer source");
    }
}
