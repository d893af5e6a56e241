//! The microVM lifecycle engine: plugin registry, event bus, and the
//! `Engine` that drives VM and deployment state machines for the Volant
//! control plane. `volant-api` is the only expected consumer — it holds one
//! `Engine` clone per worker and calls straight into it.

pub mod config;
pub mod deployments;
pub mod engine;
pub mod events;
pub mod locks;
pub mod merge;
pub mod registry;
pub mod supervisor;

pub use config::EngineConfig;
pub use engine::Engine;
pub use events::EventBus;
pub use locks::LockTable;
pub use registry::PluginRegistry;
pub use supervisor::{Supervised, SupervisorTable};

pub use volant_core::{Error, Result};
