//! The runtime launcher. Abstracts hypervisor invocation behind a
//! `Launcher` trait so the orchestrator engine never shells out directly:
//! stages boot media with checksum verification, assembles the hypervisor
//! command line, spawns the process, and hands back an `Instance` exposing
//! a PID, an awaitable exit, and a graceful stop.

pub mod config;
pub mod fake;
pub mod launcher;
pub mod process;
pub mod staging;

pub use config::LauncherConfig;
pub use fake::{FakeInstance, FakeLauncher};
pub use launcher::{Instance, Launcher};
pub use process::HypervisorLauncher;

pub use volant_core::{Error, Result};
