//! Per-VM supervision: the state kept for a VM while its hypervisor process
//! is alive, and the monitor task that awaits its exit. Each VM gets its
//! own handle, looked up by name, rather than sharing one global state map.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{error, info, warn};

use volant_core::event::{VmEvent, VmEventType};
use volant_core::launch::ExitCause;
use volant_core::vm::VmStatus;
use volant_launcher::Instance;
use volant_network::{NetworkManager, TapDevice};
use volant_store::Store;

use crate::engine::Engine;
use crate::events::EventBus;

/// Kept alive for as long as a VM's hypervisor process is supervised. The
/// `exited` notifier lets `destroy_vm` wait for the monitor to observe exit
/// instead of racing it; `stop` lets `StopVM`/`DestroyVM` ask the monitor
/// (the sole owner of the `Instance`) to terminate the process on their
/// behalf rather than reaching into it directly.
pub struct Supervised {
    pub tap: Option<TapDevice>,
    pub exited: Arc<Notify>,
    stop: mpsc::Sender<bool>,
}

impl Supervised {
    /// Best-effort — if the monitor has already torn itself down the
    /// receiver is gone and there's nothing left to stop. `force` skips the
    /// launcher's grace period and goes straight to SIGKILL.
    pub async fn request_stop(&self, force: bool) {
        let _ = self.stop.send(force).await;
    }
}

#[derive(Clone, Default)]
pub struct SupervisorTable {
    entries: Arc<Mutex<HashMap<String, Arc<Supervised>>>>,
}

impl SupervisorTable {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, vm_name: &str, supervised: Arc<Supervised>) {
        self.entries.lock().await.insert(vm_name.to_string(), supervised);
    }

    pub async fn get(&self, vm_name: &str) -> Option<Arc<Supervised>> {
        self.entries.lock().await.get(vm_name).cloned()
    }

    async fn remove(&self, vm_name: &str) -> Option<Arc<Supervised>> {
        self.entries.lock().await.remove(vm_name)
    }
}

/// Registers `instance` as supervised and spawns the background task that
/// awaits its exit (or a stop request), persists the resulting state
/// transition, detaches the tap device, publishes the matching event, and
/// removes the supervisor entry. Reused unchanged by the `StartVM`/
/// `RestartVM` re-launch path.
///
/// The registration itself happens synchronously, before the background
/// task is spawned, so a caller that awaits this function is guaranteed a
/// `StopVM`/`DestroyVM` issued immediately afterwards will find the entry.
///
/// `deployment_id`, when set, identifies the deployment this VM is a replica
/// of; on a terminal (`stopped`/`crashed`) transition the monitor triggers
/// that deployment's reconciler so a replica that exits out-of-band — a
/// crash, or an operator destroying it directly — gets replaced rather than
/// waiting for an unrelated scale/create to notice the shortfall.
#[allow(clippy::too_many_arguments)]
pub async fn spawn_monitor(
    vm_name: String,
    vm_id: i64,
    deployment_id: Option<i64>,
    mut instance: Box<dyn Instance>,
    tap: Option<TapDevice>,
    network: Arc<dyn NetworkManager>,
    store: Store,
    events: EventBus,
    supervisors: SupervisorTable,
    engine: Engine,
) {
    let exited = Arc::new(Notify::new());
    let (stop_tx, mut stop_rx) = mpsc::channel::<bool>(1);

    supervisors
        .insert(&vm_name, Arc::new(Supervised { tap: tap.clone(), exited: exited.clone(), stop: stop_tx }))
        .await;

    tokio::spawn(async move {
        let cause = tokio::select! {
            cause = instance.wait() => cause,
            Some(force) = stop_rx.recv() => {
                instance.stop(force).await;
                instance.wait().await
            }
        };

        let status = match cause {
            ExitCause::Clean => VmStatus::Stopped,
            ExitCause::Crashed { .. } => VmStatus::Crashed,
        };

        if let Err(e) = volant_store::vms::update_runtime_state(store.pool(), &vm_name, status, None).await {
            error!(vm = %vm_name, error = %e, "failed to persist vm state after process exit");
        }

        if let Some(tap) = &tap {
            if let Err(e) = network.destroy_tap(tap).await {
                warn!(vm = %vm_name, error = %e, "failed to destroy tap device after process exit");
            }
        }

        let event_type = match status {
            VmStatus::Crashed => VmEventType::Crashed,
            _ => VmEventType::Stopped,
        };
        let mut event = VmEvent::new(event_type, vm_name.clone()).with_status(status.as_str());
        if let ExitCause::Crashed { signal_or_code } = cause {
            event = event.with_message(format!("exited with signal_or_code={signal_or_code}"));
        }
        events.publish(event);

        if let Some(deployment_id) = deployment_id {
            match volant_store::deployments::get_by_id(store.pool(), deployment_id).await {
                Ok(Some(deployment)) => engine.spawn_reconcile(deployment.name),
                Ok(None) => {}
                Err(e) => error!(vm = %vm_name, error = %e, "failed to look up deployment after process exit"),
            }
        }

        supervisors.remove(&vm_name).await;
        exited.notify_waiters();

        info!(vm = %vm_name, vm_id, status = status.as_str(), "vm monitor exited");
    });
}
