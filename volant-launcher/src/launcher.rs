use async_trait::async_trait;
use volant_core::launch::{ExitCause, LaunchSpec};
use volant_core::Result;

/// Launches hypervisor processes from a `LaunchSpec`. Expressed as a trait
/// so the engine's lifecycle tests can substitute `FakeLauncher` instead of
/// spawning a real hypervisor binary.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn Instance>>;
}

/// A running (or exited) supervised process. `wait` and `stop` take `&mut
/// self` rather than `self: Box<Self>` so the handle stays usable through a
/// `Box<dyn Instance>` without extra indirection at the call site.
#[async_trait]
pub trait Instance: Send + Sync {
    fn pid(&self) -> Option<u32>;

    /// Resolves when the process exits, yielding why. Idempotent: calling it
    /// again after the process has already exited returns the same cause.
    async fn wait(&mut self) -> ExitCause;

    /// Sends SIGTERM, then SIGKILL after the configured grace period if the
    /// process is still alive. `force` skips straight to SIGKILL. No-op if
    /// the process has already exited.
    async fn stop(&mut self, force: bool);
}
