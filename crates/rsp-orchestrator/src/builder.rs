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

//! Turns the pages under the web root into one backend executable.
//!
//! Every routable page is compiled to `<src_dir>/<symbol>.rs`. A throwaway
//! cargo project is then assembled in a temporary directory: a manifest that
//! depends on the runtime crate, a generated `main.rs` holding the page table,
//! and links to the generated page sources. The toolchain compiles it and the
//! resulting binary is copied to the slot's executable path.

use rsp_common::{Result, RspConfig};
use rsp_template::{render_entry, render_page, DirLoader, EntryPage, Parser};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

use crate::symbols::{allocate_symbols, path_to_url};
use crate::toolchain::{Toolchain, BACKEND_BIN};

/// Generated source of a single page.
#[derive(Debug, Clone)]
pub struct CompiledPage {
    pub url: String,
    pub include_only: bool,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub exe_path: PathBuf,
    pub log_path: PathBuf,
    /// URLs of the pages compiled into the executable
    pub pages: Vec<String>,
    /// URLs of include-only pages left out
    pub skipped: Vec<String>,
    pub elapsed: Duration,
}

pub struct Builder<T> {
    web_root: PathBuf,
    src_dir: PathBuf,
    tmp_dir: Option<PathBuf>,
    runtime_crate: PathBuf,
    dependencies: BTreeMap<String, String>,
    lock_file: PathBuf,
    toolchain: T,
}

impl<T: Toolchain> Builder<T> {
    pub fn new(config: &RspConfig, toolchain: T) -> Self {
        Self {
            web_root: config.web_root.clone(),
            src_dir: config.src_dir.clone(),
            tmp_dir: config.tmp_dir.clone(),
            runtime_crate: config.runtime_crate.clone(),
            dependencies: config.build.dependencies.clone(),
            lock_file: config.target_dir.join("Cargo.lock"),
            toolchain,
        }
    }

    pub fn toolchain(&self) -> &T {
        &self.toolchain
    }

    pub fn web_root(&self) -> &Path {
        &self.web_root
    }

    /// Parses one page, given relative to the web root, and renders it.
    pub fn compile_page(&self, rel: &Path) -> Result<CompiledPage> {
        let url = path_to_url(rel);
        let parser = Parser::new(DirLoader::new(&self.web_root));
        let parts = parser.parse_file(url.trim_start_matches('/'))?;
        Ok(CompiledPage {
            source: render_page(&parts, &url),
            include_only: parts.include_only,
            url,
        })
    }

    /// Builds every page in `files` into one executable at `exe_path`.
    pub async fn build(
        &self,
        files: &BTreeMap<PathBuf, SystemTime>,
        exe_path: &Path,
    ) -> Result<BuildReport> {
        let started = Instant::now();
        fs::create_dir_all(&self.src_dir)?;

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for (symbol, rel) in allocate_symbols(files.keys()) {
            let page = match self.compile_page(&rel) {
                Ok(page) => page,
                Err(e) => {
                    warn!("Skipping {}: {}", rel.display(), e);
                    continue;
                }
            };
            if page.include_only {
                debug!("{} is include-only, not compiled", page.url);
                skipped.push(page.url);
                continue;
            }
            fs::write(self.src_dir.join(format!("{}.rs", symbol)), &page.source)?;
            entries.push(EntryPage { symbol, url: page.url });
        }
        info!(
            "Generated {} pages ({} include-only skipped)",
            entries.len(),
            skipped.len()
        );

        let project = match &self.tmp_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                tempfile::Builder::new().prefix("rsp_").tempdir_in(dir)?
            }
            None => tempfile::Builder::new().prefix("rsp_").tempdir()?,
        };
        self.assemble(project.path(), &entries)?;

        if let Some(parent) = exe_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let log_path = log_path_for(exe_path);
        let built = self.toolchain.compile(project.path(), &log_path).await?;

        tokio::fs::copy(&built, exe_path).await?;
        if let Err(e) = fs::copy(project.path().join("Cargo.lock"), &self.lock_file) {
            debug!("Not caching Cargo.lock: {}", e);
        }

        let elapsed = started.elapsed();
        info!("Built {} in {:.1?}", exe_path.display(), elapsed);
        Ok(BuildReport {
            exe_path: exe_path.to_path_buf(),
            log_path,
            pages: entries.into_iter().map(|e| e.url).collect(),
            skipped,
            elapsed,
        })
    }

    fn assemble(&self, project: &Path, entries: &[EntryPage]) -> Result<()> {
        let pages_dir = project.join("src").join("pages");
        fs::create_dir_all(&pages_dir)?;

        fs::write(project.join("Cargo.toml"), self.manifest())?;
        fs::write(project.join("src").join("main.rs"), render_entry(entries))?;
        if self.lock_file.is_file() {
            fs::copy(&self.lock_file, project.join("Cargo.lock"))?;
        }

        for entry in entries {
            let name = format!("{}.rs", entry.symbol);
            link_or_copy(&self.src_dir.join(&name), &pages_dir.join(&name))?;
        }
        Ok(())
    }

    /// Manifest of the generated backend project.
    pub fn manifest(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[package]");
        let _ = writeln!(out, "name = \"{}\"", BACKEND_BIN);
        let _ = writeln!(out, "version = \"0.0.0\"");
        let _ = writeln!(out, "edition = \"2021\"");
        let _ = writeln!(out, "publish = false\n");
        let _ = writeln!(out, "[[bin]]");
        let _ = writeln!(out, "name = \"{}\"", BACKEND_BIN);
        let _ = writeln!(out, "path = \"src/main.rs\"\n");
        let _ = writeln!(out, "[dependencies]");
        let _ = writeln!(
            out,
            "rsp-runtime = {{ path = {:?} }}",
            self.runtime_crate.to_string_lossy()
        );
        for (name, req) in &self.dependencies {
            let req = req.trim();
            if req.starts_with('{') {
                let _ = writeln!(out, "{} = {}", name, req);
            } else {
                let _ = writeln!(out, "{} = {:?}", name, req);
            }
        }
        // keep the project out of any enclosing workspace
        let _ = writeln!(out, "\n[workspace]");
        out
    }
}

/// Build log location for an executable: the same path plus `.log`.
pub fn log_path_for(exe_path: &Path) -> PathBuf {
    let mut name = exe_path.as_os_str().to_owned();
    name.push(".log");
    PathBuf::from(name)
}

fn link_or_copy(src: &Path, dst: &Path) -> io::Result<()> {
    let src = fs::canonicalize(src)?;
    if symlink(&src, dst).is_err() {
        fs::copy(&src, dst)?;
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_src: &Path, _dst: &Path) -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "no symlinks"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Monitor;
    use rsp_common::RspError;
    use std::sync::Mutex;

    /// Records the assembled project and produces a dummy executable.
    #[derive(Default)]
    struct InspectingToolchain {
        fail: bool,
        seen: Mutex<Option<(String, String, Vec<String>)>>,
    }

    impl Toolchain for InspectingToolchain {
        async fn compile(&self, project_dir: &Path, log_path: &Path) -> Result<PathBuf> {
            let manifest = fs::read_to_string(project_dir.join("Cargo.toml"))?;
            let main = fs::read_to_string(project_dir.join("src/main.rs"))?;
            let mut pages: Vec<String> = fs::read_dir(project_dir.join("src/pages"))?
                .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
                .collect::<io::Result<_>>()?;
            pages.sort();
            *self.seen.lock().unwrap() = Some((manifest, main, pages));

            fs::write(log_path, "compiling\n")?;
            if self.fail {
                return Err(RspError::Build("exit status: 101".to_string()));
            }
            let exe = project_dir.join("backend-bin");
            fs::write(&exe, "binary")?;
            Ok(exe)
        }
    }

    fn setup() -> (tempfile::TempDir, RspConfig) {
        let dir = tempfile::tempdir().unwrap();
        let web = dir.path().join("web");
        fs::create_dir_all(web.join("blog")).unwrap();
        fs::write(web.join("index.rsp"), r#"<%!include "header.rsp"%>home"#).unwrap();
        fs::write(web.join("header.rsp"), "<%!includeonly%><h1>site</h1>").unwrap();
        fs::write(web.join("blog/post.rsp"), "<%= 1 + 1 %>").unwrap();

        let mut config = RspConfig::default();
        config.web_root = web;
        config.src_dir = dir.path().join("src");
        config.exe_dir = dir.path().join("exe");
        config.tmp_dir = Some(dir.path().join("tmp"));
        config.target_dir = dir.path().join("target");
        config.runtime_crate = PathBuf::from("/opt/rsp-runtime");
        config
            .build
            .dependencies
            .insert("serde_json".to_string(), "1".to_string());
        (dir, config)
    }

    #[tokio::test]
    async fn test_build_assembles_project() {
        let (_dir, config) = setup();
        let builder = Builder::new(&config, InspectingToolchain::default());
        let files = Monitor::new(&config.web_root).scan().unwrap();
        let exe = config.exe_dir.join("backend-0");

        let report = builder.build(&files, &exe).await.unwrap();

        assert_eq!(report.pages, vec!["/blog/post.rsp", "/index.rsp"]);
        assert_eq!(report.skipped, vec!["/header.rsp"]);
        assert_eq!(fs::read_to_string(&exe).unwrap(), "binary");
        assert_eq!(report.log_path, config.exe_dir.join("backend-0.log"));
        assert!(report.log_path.is_file());

        assert!(config.src_dir.join("index.rsp.rs").is_file());
        assert!(config.src_dir.join("blog_post.rsp.rs").is_file());
        assert!(!config.src_dir.join("header.rsp.rs").exists());

        let generated = fs::read_to_string(config.src_dir.join("index.rsp.rs")).unwrap();
        assert!(generated.contains("response.print_str(\"<h1>site</h1>\");"));
        assert!(generated.contains("response.print_str(\"home\");"));

        let (manifest, main, pages) = builder.toolchain().seen.lock().unwrap().clone().unwrap();
        assert!(manifest.contains("rsp-runtime = { path = \"/opt/rsp-runtime\" }"));
        assert!(manifest.contains("serde_json = \"1\""));
        assert!(manifest.contains("[workspace]"));
        assert!(main.contains("(\"/index.rsp\", page_1::__process__)"));
        assert!(main.contains("(\"/blog/post.rsp\", page_0::__process__)"));
        assert_eq!(pages, vec!["blog_post.rsp.rs", "index.rsp.rs"]);

        // the temporary project is removed after the build
        let leftovers = fs::read_dir(config.tmp_dir.as_ref().unwrap()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_failed_build_leaves_executable_untouched() {
        let (_dir, config) = setup();
        let toolchain = InspectingToolchain {
            fail: true,
            ..Default::default()
        };
        let builder = Builder::new(&config, toolchain);
        let files = Monitor::new(&config.web_root).scan().unwrap();
        let exe = config.exe_dir.join("backend-0");
        fs::create_dir_all(&config.exe_dir).unwrap();
        fs::write(&exe, "previous").unwrap();

        let err = builder.build(&files, &exe).await.unwrap_err();
        assert!(matches!(err, RspError::Build(_)));
        assert_eq!(fs::read_to_string(&exe).unwrap(), "previous");
    }

    #[tokio::test]
    async fn test_empty_page_set_builds() {
        let (_dir, config) = setup();
        let builder = Builder::new(&config, InspectingToolchain::default());
        let report = builder
            .build(&BTreeMap::new(), &config.exe_dir.join("backend-1"))
            .await
            .unwrap();
        assert!(report.pages.is_empty());
    }

    #[test]
    fn test_compile_page() {
        let (_dir, config) = setup();
        let builder = Builder::new(&config, InspectingToolchain::default());
        let page = builder.compile_page(Path::new("blog/post.rsp")).unwrap();
        assert_eq!(page.url, "/blog/post.rsp");
        assert!(!page.include_only);
        assert!(page.source.contains("response.print(&(1 + 1));"));

        assert!(builder.compile_page(Path::new("missing.rsp")).is_err());
    }

    #[test]
    fn test_manifest_inline_table_dependency() {
        let (_dir, mut config) = setup();
        config.build.dependencies.insert(
            "chrono".to_string(),
            "{ version = \"0.4\", default-features = false }".to_string(),
        );
        let builder = Builder::new(&config, InspectingToolchain::default());
        let manifest = builder.manifest();
        assert!(manifest.contains("chrono = { version = \"0.4\", default-features = false }"));
        assert!(manifest.contains("name = \"rsp-backend\""));
    }

    #[test]
    fn test_log_path_for() {
        assert_eq!(
            log_path_for(Path::new("/x/backend-2")),
            PathBuf::from("/x/backend-2.log")
        );
    }
}
