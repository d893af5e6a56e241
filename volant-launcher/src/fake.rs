//! Test double for `Launcher`/`Instance`, whose `Instance` exposes a
//! programmable wait channel. Lets orchestrator-engine tests drive VM
//! lifecycle transitions without spawning a real hypervisor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;

use volant_core::launch::{ExitCause, LaunchSpec};
use volant_core::{Error, Result};

use crate::launcher::{Instance, Launcher};

struct FakeInstanceHandle {
    exit_tx: watch::Sender<Option<ExitCause>>,
    stopped: Arc<AtomicBool>,
}

impl FakeInstanceHandle {
    fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// A `Launcher` that never spawns a process. Each `launch()` call hands back
/// a `FakeInstance` whose exit is triggered externally via `signal_exit`.
pub struct FakeLauncher {
    handles: Mutex<HashMap<i64, FakeInstanceHandle>>,
    fail_next: Mutex<Option<Error>>,
    next_pid: Mutex<u32>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            fail_next: Mutex::new(None),
            next_pid: Mutex::new(1000),
        }
    }

    /// The next `launch()` call returns `err` instead of an instance.
    pub fn fail_next_launch(&self, err: Error) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Signals the instance previously launched for `vm_id` as having
    /// exited. Panics if no instance was launched for that VM.
    pub fn signal_exit(&self, vm_id: i64, cause: ExitCause) {
        let handles = self.handles.lock().unwrap();
        let handle = handles.get(&vm_id).expect("no fake instance launched for vm_id");
        let _ = handle.exit_tx.send(Some(cause));
    }

    pub fn was_stopped(&self, vm_id: i64) -> bool {
        self.handles
            .lock()
            .unwrap()
            .get(&vm_id)
            .map(FakeInstanceHandle::was_stopped)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn Instance>> {
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }

        let pid = {
            let mut next_pid = self.next_pid.lock().unwrap();
            let pid = *next_pid;
            *next_pid += 1;
            pid
        };

        let (exit_tx, exit_rx) = watch::channel(None);
        let stopped = Arc::new(AtomicBool::new(false));
        self.handles.lock().unwrap().insert(
            spec.vm_id,
            FakeInstanceHandle { exit_tx, stopped: stopped.clone() },
        );

        Ok(Box::new(FakeInstance { pid, exit_rx, stopped }))
    }
}

pub struct FakeInstance {
    pid: u32,
    exit_rx: watch::Receiver<Option<ExitCause>>,
    stopped: Arc<AtomicBool>,
}

#[async_trait]
impl Instance for FakeInstance {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn wait(&mut self) -> ExitCause {
        loop {
            if let Some(cause) = *self.exit_rx.borrow() {
                return cause;
            }
            if self.exit_rx.changed().await.is_err() {
                return ExitCause::Crashed { signal_or_code: -1 };
            }
        }
    }

    async fn stop(&mut self, _force: bool) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volant_core::launch::{BootMedia, LaunchSpec, NetworkDescriptor};

    fn spec(vm_id: i64) -> LaunchSpec {
        LaunchSpec {
            vm_id,
            vm_name: "web-1".into(),
            cpu: 1,
            memory_mib: 128,
            boot_media: BootMedia::Initramfs { url: "http://p/app.cpio".into(), checksum: None },
            additional_disks: vec![],
            cloud_init_seed_path: None,
            network: NetworkDescriptor::Dhcp { tap_name: "tap0".into(), mac_address: "0a:58:00:00:00:01".into() },
            kernel_cmdline: String::new(),
            vfio_device_paths: vec![],
            serial_socket_path: "/tmp/web-1.sock".into(),
            kernel_override: None,
        }
    }

    #[tokio::test]
    async fn wait_resolves_after_signal_exit() {
        let launcher = FakeLauncher::new();
        let mut instance = launcher.launch(&spec(1)).await.unwrap();

        let waiter = tokio::spawn(async move { instance.wait().await });
        tokio::task::yield_now().await;
        launcher.signal_exit(1, ExitCause::Clean);

        assert_eq!(waiter.await.unwrap(), ExitCause::Clean);
    }

    #[tokio::test]
    async fn fail_next_launch_surfaces_the_configured_error() {
        let launcher = FakeLauncher::new();
        launcher.fail_next_launch(Error::Hypervisor("boom".into()));

        let err = launcher.launch(&spec(2)).await.unwrap_err();
        assert_eq!(err.kind(), "hypervisor");
    }

    #[tokio::test]
    async fn stop_is_observable() {
        let launcher = FakeLauncher::new();
        let mut instance = launcher.launch(&spec(3)).await.unwrap();
        instance.stop(false).await;
        assert!(launcher.was_stopped(3));
    }
}
