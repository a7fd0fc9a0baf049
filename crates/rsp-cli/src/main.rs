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

//! # rsps
//!
//! Serves a directory of `.rsp` pages. Pages are compiled into a backend
//! executable, which is rebuilt and swapped in without downtime whenever a
//! page changes.
//!
//! ## Usage
//!
//! ```bash
//! # Watch ./web and serve it on the configured address
//! rsps serve -c rsps.json
//!
//! # Override the front-end address
//! rsps serve -l 127.0.0.1:8000
//!
//! # Compile once, without launching anything
//! rsps build -o exe/backend
//!
//! # Show the Rust source generated for a page
//! rsps gen blog/post.rsp
//! ```

use anyhow::{Context, Result};
use argh::FromArgs;
use rsp_common::config::DEFAULT_CONFIG_FILE;
use rsp_common::RspConfig;
use rsp_orchestrator::{
    Builder, CargoToolchain, HttpServer, LiveBackend, Monitor, Orchestrator, ProcessSpawner,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(FromArgs)]
/// rsps - self-updating server for RSP pages
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Build(BuildArgs),
    Gen(GenArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// watch the web root, rotate backends and serve traffic
struct ServeArgs {
    /// configuration file
    #[argh(option, short = 'c', default = "DEFAULT_CONFIG_FILE.to_string()")]
    config: String,

    /// front-end listen address, overriding the configuration
    #[argh(option, short = 'l')]
    listen: Option<String>,

    /// directory of page sources, overriding the configuration
    #[argh(option, short = 'w', long = "web-root")]
    web_root: Option<String>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "build")]
/// compile all pages into one backend executable
struct BuildArgs {
    /// configuration file
    #[argh(option, short = 'c', default = "DEFAULT_CONFIG_FILE.to_string()")]
    config: String,

    /// where to write the executable
    #[argh(option, short = 'o')]
    output: String,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "gen")]
/// print the Rust source generated for one page
struct GenArgs {
    /// page path relative to the web root
    #[argh(positional)]
    page: String,

    /// configuration file
    #[argh(option, short = 'c', default = "DEFAULT_CONFIG_FILE.to_string()")]
    config: String,
}

/// Loads, overrides, resolves and validates the configuration.
fn load_config(path: &str, listen: Option<&str>, web_root: Option<&str>) -> Result<RspConfig> {
    let mut config = RspConfig::load(Path::new(path))?;
    if let Some(listen) = listen {
        config.listen_addr = listen.to_string();
    }
    if let Some(web_root) = web_root {
        config.web_root = PathBuf::from(web_root);
    }

    let cwd = std::env::current_dir().context("reading the working directory")?;
    let config = config.resolve_paths(&cwd);
    config.validate()?;
    Ok(config)
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = load_config(&args.config, args.listen.as_deref(), args.web_root.as_deref())?;
    info!("Serving {} on {}", config.web_root.display(), config.listen_addr);
    info!("Backend addresses: {:?}", config.backend.addrs());

    let live = LiveBackend::new();
    let toolchain = CargoToolchain::from_config(&config.build, &config.target_dir);
    let orchestrator = Arc::new(Orchestrator::new(
        &config,
        toolchain,
        ProcessSpawner::new(&config.web_root),
        live.clone(),
    )?);
    let rotation = orchestrator.clone().spawn();

    let server = HttpServer::new(live, &config.web_root).with_status(orchestrator.clone());
    let result = tokio::select! {
        res = server.run(&config.listen_addr) => res.map_err(anyhow::Error::from),
        res = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            res.map_err(anyhow::Error::from)
        }
    };

    rotation.abort();
    orchestrator.shutdown().await;
    result
}

async fn build(args: BuildArgs) -> Result<()> {
    let config = load_config(&args.config, None, None)?;
    let files = Monitor::new(&config.web_root).scan()?;
    let builder = Builder::new(
        &config,
        CargoToolchain::from_config(&config.build, &config.target_dir),
    );

    let report = builder
        .build(&files, Path::new(&args.output))
        .await
        .with_context(|| format!("building {}", args.output))?;
    info!(
        "Built {} pages into {} in {:.1?}",
        report.pages.len(),
        report.exe_path.display(),
        report.elapsed
    );
    Ok(())
}

fn gen(args: GenArgs) -> Result<()> {
    let config = load_config(&args.config, None, None)?;
    let builder = Builder::new(
        &config,
        CargoToolchain::from_config(&config.build, &config.target_dir),
    );
    let page = builder.compile_page(Path::new(&args.page))?;
    if page.include_only {
        warn!("{} is include-only and is left out of backends", page.url);
    }
    print!("{}", page.source);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // logs go to stderr so `gen` output can be redirected
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Build(args) => build(args).await,
        Commands::Gen(args) => gen(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> std::result::Result<Cli, argh::EarlyExit> {
        Cli::from_args(&["rsps"], args)
    }

    #[test]
    fn test_parse_serve_defaults() {
        match parse(&["serve"]).unwrap().command {
            Commands::Serve(ServeArgs {
                config,
                listen,
                web_root,
            }) => {
                assert_eq!(config, "rsps.json");
                assert!(listen.is_none());
                assert!(web_root.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = parse(&["serve", "-c", "site.json", "-l", "127.0.0.1:9000", "--web-root", "pages"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, "site.json");
                assert_eq!(args.listen.as_deref(), Some("127.0.0.1:9000"));
                assert_eq!(args.web_root.as_deref(), Some("pages"));
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_parse_build_requires_output() {
        assert!(parse(&["build"]).is_err());
        match parse(&["build", "-o", "exe/backend"]).unwrap().command {
            Commands::Build(args) => assert_eq!(args.output, "exe/backend"),
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_parse_gen() {
        match parse(&["gen", "blog/post.rsp", "-c", "x.json"]).unwrap().command {
            Commands::Gen(args) => {
                assert_eq!(args.page, "blog/post.rsp");
                assert_eq!(args.config, "x.json");
            }
            _ => panic!("Expected Gen command"),
        }
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(parse(&["deploy"]).is_err());
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsps.json");
        fs::write(&path, r#"{"web_root": "/srv/site", "backend": {"ports": [9001, 9002]}}"#).unwrap();

        let config = load_config(path.to_str().unwrap(), Some("127.0.0.1:9999"), None).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert_eq!(config.web_root, PathBuf::from("/srv/site"));
        assert!(config.src_dir.is_absolute());

        let config = load_config(path.to_str().unwrap(), None, Some("/other")).unwrap();
        assert_eq!(config.web_root, PathBuf::from("/other"));
    }

    #[test]
    fn test_load_config_rejects_invalid_ring() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rsps.json");
        fs::write(&path, r#"{"backend": {"ports": [9001]}}"#).unwrap();
        assert!(load_config(path.to_str().unwrap(), None, None).is_err());
    }
}
