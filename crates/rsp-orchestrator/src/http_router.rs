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

//! Request routing for the front-end proxy.
//!
//! Decides from the URL path alone whether a request goes to the live
//! backend, is answered from the web root, or is rejected.

use crate::monitor::PAGE_EXTENSION;

/// Extensions served straight from the web root.
pub const STATIC_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jpe", "png", "gif", "webp", "zip", "js", "css"];

const INDEX_PAGE: &str = "index.rsp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Forward to the backend under this URL path
    Page(String),
    /// File relative to the web root
    Static(String),
    NotFound,
}

/// Classifies an already percent-decoded request path.
pub fn classify(path: &str) -> Route {
    let mut path = path.to_string();
    if path.ends_with('/') {
        path.push_str(INDEX_PAGE);
    }

    let Some(ext) = extension(&path) else {
        return Route::NotFound;
    };
    if ext == PAGE_EXTENSION {
        return Route::Page(path);
    }
    if !STATIC_EXTENSIONS.contains(&ext.as_str()) {
        return Route::NotFound;
    }
    if path.split('/').any(|seg| seg == ".." || seg.contains('\\')) {
        return Route::NotFound;
    }
    Route::Static(path.trim_start_matches('/').to_string())
}

/// Lower-cased extension of the last path segment.
fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn content_type(path: &str) -> &'static str {
    match extension(path).as_deref() {
        Some("jpg" | "jpeg" | "jpe") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("zip") => "application/zip",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages() {
        assert_eq!(classify("/index.rsp"), Route::Page("/index.rsp".into()));
        assert_eq!(classify("/blog/Post.RSP"), Route::Page("/blog/Post.RSP".into()));
    }

    #[test]
    fn test_directory_gets_index() {
        assert_eq!(classify("/"), Route::Page("/index.rsp".into()));
        assert_eq!(classify("/blog/"), Route::Page("/blog/index.rsp".into()));
    }

    #[test]
    fn test_static_allow_list() {
        assert_eq!(classify("/img/logo.PNG"), Route::Static("img/logo.PNG".into()));
        assert_eq!(classify("/app.js"), Route::Static("app.js".into()));
        assert_eq!(classify("/a/b/c.jpe"), Route::Static("a/b/c.jpe".into()));
        assert_eq!(classify("/notes.txt"), Route::NotFound);
        assert_eq!(classify("/index.rsp.bak"), Route::NotFound);
        assert_eq!(classify("/Makefile"), Route::NotFound);
        assert_eq!(classify("/.css"), Route::NotFound);
    }

    #[test]
    fn test_traversal_rejected() {
        assert_eq!(classify("/../secret.png"), Route::NotFound);
        assert_eq!(classify("/a/../../x.css"), Route::NotFound);
        assert_eq!(classify("/a\\..\\x.css"), Route::NotFound);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a/b.CSS"), "text/css; charset=utf-8");
        assert_eq!(content_type("x.bin"), "application/octet-stream");
    }
}
