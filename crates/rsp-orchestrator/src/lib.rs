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

//! Build, rotation and front-end serving for RSP.
//!
//! - [`monitor`], [`symbols`], [`builder`], [`toolchain`]: turn the web root
//!   into a backend executable
//! - [`orchestrator`], [`slot`], [`spawner`], [`health_checker`], [`live`]:
//!   rotate backends through a fixed ring of slots
//! - [`http_server`], [`http_router`]: the reverse proxy in front of them

pub mod builder;
pub mod health_checker;
pub mod http_router;
pub mod http_server;
pub mod live;
pub mod monitor;
pub mod orchestrator;
pub mod slot;
pub mod spawner;
pub mod symbols;
pub mod toolchain;

pub use builder::{BuildReport, Builder, CompiledPage};
pub use health_checker::{HealthCheckConfig, HealthChecker};
pub use http_server::HttpServer;
pub use live::LiveBackend;
pub use monitor::Monitor;
pub use orchestrator::{
    Orchestrator, OrchestratorStatus, RotationEvent, RotationTiming, StatusProvider, StepOutcome,
};
pub use slot::{Slot, SlotState};
pub use spawner::{BackendSpawner, ProcessSpawner};
pub use toolchain::{CargoToolchain, Toolchain};
