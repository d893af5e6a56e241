//! The orchestrator engine. Owns every VM lifecycle transition and hands
//! deployment reconciliation (in `deployments.rs`) the same
//! store/launcher/network/device handles. The one thing every HTTP
//! handler holds a clone of.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use volant_cloudinit::CloudInitBuilder;
use volant_core::cloudinit::CloudInitRecord;
use volant_core::config::{VmConfig, VmConfigHistoryEntry, VmConfigOverride};
use volant_core::event::{VmEvent, VmEventType};
use volant_core::launch::{LaunchSpec, NetworkDescriptor};
use volant_core::manifest::{NetworkMode, Plugin, PluginManifest};
use volant_core::mac::derive_mac;
use volant_core::codec::encode_manifest;
use volant_core::types::ListParams;
use volant_core::vm::{CreateVmRequest, ListVmsResponse, UpdateConfigResponse, Vm, VmStatus};
use volant_core::{Error, Result};
use volant_device::{DeviceManager, PciAddress};
use volant_launcher::{Instance, Launcher, LauncherConfig};
use volant_network::{NetworkManager, TapDevice};
use volant_store::{cloudinit as cloudinit_store, ip as ip_store, vm_config, vms, with_tx, Store};

use crate::config::EngineConfig;
use crate::events::EventBus;
use crate::locks::LockTable;
use crate::merge::{self, EffectiveConfig};
use crate::registry::PluginRegistry;
use crate::supervisor::{self, SupervisorTable};

/// The lifecycle engine. Cloned freely — every field is either `Clone`-cheap
/// (a pool handle, an `Arc`) or itself internally shared, so handlers can
/// clone the whole struct per request rather than reach through a lock.
#[derive(Clone)]
pub struct Engine {
    pub(crate) store: Store,
    pub(crate) config: EngineConfig,
    pub(crate) launcher_config: LauncherConfig,
    pub(crate) events: EventBus,
    pub(crate) vm_locks: Arc<LockTable>,
    pub(crate) deployment_locks: Arc<LockTable>,
    pub(crate) registry: PluginRegistry,
    pub(crate) network: Arc<dyn NetworkManager>,
    pub(crate) device: Arc<dyn DeviceManager>,
    pub(crate) launcher: Arc<dyn Launcher>,
    pub(crate) cloud_init: Arc<CloudInitBuilder>,
    pub(crate) supervisors: SupervisorTable,
}

/// Host-side resources provisioned for a launch attempt, kept around so a
/// failed launch can be unwound without re-deriving what was allocated.
struct Provisioned {
    tap: Option<TapDevice>,
    bound_devices: Vec<volant_device::BoundDevice>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        config: EngineConfig,
        launcher_config: LauncherConfig,
        network: Arc<dyn NetworkManager>,
        device: Arc<dyn DeviceManager>,
        launcher: Arc<dyn Launcher>,
        cloud_init: Arc<CloudInitBuilder>,
    ) -> Self {
        let registry = PluginRegistry::new(store.clone());
        Self {
            store,
            config,
            launcher_config,
            events: EventBus::new(),
            vm_locks: Arc::new(LockTable::new()),
            deployment_locks: Arc::new(LockTable::new()),
            registry,
            network,
            device,
            launcher,
            cloud_init,
            supervisors: SupervisorTable::new(),
        }
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Loads the plugin cache, seeds the IP pool, and kicks off a
    /// reconciliation pass for every persisted deployment — self-healing
    /// after a control-plane restart.
    pub async fn start(&self) -> Result<()> {
        self.registry.load().await?;
        ip_store::ensure_pool(self.store.pool(), &self.config.leasable_addresses()).await?;

        let deployments = volant_store::deployments::list(self.store.pool()).await?;
        for deployment in deployments {
            self.spawn_reconcile(deployment.name);
        }

        info!("orchestrator engine started");
        Ok(())
    }

    /// Stops every currently-running VM. Best-effort per VM — one stuck VM
    /// must not block the rest of shutdown.
    pub async fn stop(&self) -> Result<()> {
        let filter = vms::ListFilter {
            plugin: None,
            status: Some("running"),
            runtime: None,
            q: None,
            sort: None,
            order: None,
            limit: i64::MAX,
            offset: 0,
        };
        let (running, _) = vms::list(self.store.pool(), &filter).await?;
        for vm in running {
            if let Err(e) = self.stop_vm(&vm.name, false).await {
                warn!(vm = %vm.name, error = %e, "failed to stop vm during shutdown");
            }
        }

        info!("orchestrator engine stopped");
        Ok(())
    }

    pub async fn get_vm(&self, name: &str) -> Result<Vm> {
        vms::get_by_name(self.store.pool(), name)
            .await?
            .ok_or_else(|| Error::not_found(format!("vm {name}")))
    }

    pub async fn list_vms(&self, params: &ListParams) -> Result<ListVmsResponse> {
        let filter = vms::ListFilter {
            plugin: params.plugin.as_deref(),
            status: params.status.as_deref(),
            runtime: params.runtime.as_deref(),
            q: params.q.as_deref(),
            sort: params.sort.as_deref(),
            order: params.order.as_deref(),
            limit: params.limit.unwrap_or(50),
            offset: params.offset.unwrap_or(0),
        };
        let (vms, total) = vms::list(self.store.pool(), &filter).await?;
        Ok(ListVmsResponse { vms, total })
    }

    /// Validates the request, resolves the effective configuration
    /// against the plugin manifest, and creates the VM under its per-name
    /// lock. `deployment_id` is `None` for a freestanding VM and `Some` for
    /// a deployment replica (see `deployments.rs`).
    pub async fn create_vm(&self, req: CreateVmRequest) -> Result<Vm> {
        validate_vm_name(&req.name)?;

        let plugin = self
            .registry
            .get(&req.plugin)
            .await
            .ok_or_else(|| Error::not_found(format!("plugin {}", req.plugin)))?;
        if !plugin.enabled {
            return Err(Error::validation(format!("plugin {} is disabled", req.plugin)));
        }

        let config_override: VmConfigOverride = match req.config_override {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| Error::validation(format!("invalid config_override: {e}")))?,
            None => VmConfigOverride::default(),
        };
        let request_overrides = VmConfigOverride {
            cpu: req.cpu,
            memory_mib: req.memory_mib,
            kernel_cmdline_extra: req.kernel_cmdline_extra.clone(),
            ..Default::default()
        };
        let override_doc = request_overrides.merged_with(&config_override);

        let _guard = self.vm_locks.lock(&req.name).await;
        self.create_vm_locked(&req.name, &plugin, override_doc, None).await
    }

    /// Shared by `create_vm` and the deployment reconciler — both just need
    /// a name, a resolved plugin, an override document, and an optional
    /// owning deployment.
    pub(crate) async fn create_vm_locked(
        &self,
        name: &str,
        plugin: &Plugin,
        override_doc: VmConfigOverride,
        deployment_id: Option<i64>,
    ) -> Result<Vm> {
        let effective = merge::resolve(&plugin.manifest, &override_doc)?;
        let runtime = plugin.manifest.runtime.clone().unwrap_or_else(|| plugin.name.clone());
        let needs_ip = effective.network.mode == NetworkMode::Bridged;

        let name_owned = name.to_string();
        let plugin_name = plugin.name.clone();
        let runtime_for_tx = runtime.clone();
        let cpu = effective.cpu;
        let memory_mib = effective.memory_mib;
        let override_for_tx = override_doc.clone();
        let cloud_init_for_tx = effective.cloud_init.clone();
        let launcher_config = self.launcher_config.clone();

        let creation: Result<(i64, Option<String>, String, Option<PathBuf>)> = with_tx(self.store.pool(), move |tx| {
            Box::pin(async move {
                let vm_id = vms::create(
                    tx,
                    &name_owned,
                    &runtime_for_tx,
                    &plugin_name,
                    cpu,
                    memory_mib,
                    deployment_id,
                )
                .await?;

                let ip = if needs_ip {
                    let address = ip_store::lease_next(tx).await?;
                    ip_store::assign(tx, &address, vm_id).await?;
                    Some(address)
                } else {
                    None
                };

                let mac = derive_mac(&name_owned, ip.as_deref().unwrap_or(""), vm_id);
                vms::update_spec(tx, vm_id, ip.as_deref(), Some(&mac)).await?;
                vm_config::upsert(tx, vm_id, 1, &override_for_tx).await?;

                let seed_path = if let Some(documents) = &cloud_init_for_tx {
                    let path = launcher_config.vm_runtime_dir(vm_id).join("cloud-init.img");
                    cloudinit_store::upsert(
                        tx,
                        &CloudInitRecord {
                            vm_id,
                            user_data: documents.user_data.clone(),
                            meta_data: documents.meta_data.clone(),
                            network_config: documents.network_config.clone(),
                            seed_image_path: path.to_string_lossy().to_string(),
                        },
                    )
                    .await?;
                    Some(path)
                } else {
                    None
                };

                Ok((vm_id, ip, mac, seed_path))
            })
        })
        .await;

        let (vm_id, ip, mac, seed_path) = creation?;

        match self
            .finish_create(
                vm_id,
                name,
                &runtime,
                &plugin.manifest,
                &effective,
                ip.as_deref(),
                &mac,
                seed_path.as_deref(),
                deployment_id,
            )
            .await
        {
            Ok(()) => self.get_vm(name).await,
            Err(e) => {
                if let Some(ip) = &ip {
                    let _ = ip_store::release(self.store.pool(), ip).await;
                }
                let _ = vms::delete(self.store.pool(), name).await;
                Err(e)
            }
        }
    }

    /// The remainder of VM creation after the creation transaction commits:
    /// resolve the kernel cmdline, provision host-side resources, publish
    /// `vm.created`, and attempt the launch.
    #[allow(clippy::too_many_arguments)]
    async fn finish_create(
        &self,
        vm_id: i64,
        name: &str,
        runtime: &str,
        manifest: &PluginManifest,
        effective: &EffectiveConfig,
        ip: Option<&str>,
        mac: &str,
        seed_path: Option<&Path>,
        deployment_id: Option<i64>,
    ) -> Result<()> {
        let manifest_encoded = encode_manifest(manifest)?;
        let cmdline = build_kernel_cmdline(&self.config, name, runtime, &manifest.name, &manifest_encoded, ip, effective);
        vms::update_kernel_cmdline(self.store.pool(), name, &cmdline).await?;

        let serial_socket_path = self.launcher_config.vm_runtime_dir(vm_id).join("console.sock");
        vms::update_sockets(self.store.pool(), name, &serial_socket_path.to_string_lossy()).await?;

        let provisioned = match self.provision_side_effects(name, vm_id, effective, seed_path).await {
            Ok(p) => p,
            Err(e) => {
                if let Some(seed_path) = seed_path {
                    let _ = self.cloud_init.remove(seed_path).await;
                }
                return Err(e);
            }
        };

        // Published before the launch attempt: a VM that fails to launch
        // still existed, and its creation is still observable on the feed.
        self.events.publish(VmEvent::new(VmEventType::Created, name));

        if let Err(e) = self
            .launch_and_supervise(
                vm_id,
                name,
                effective,
                ip,
                Some(mac),
                &cmdline,
                &serial_socket_path,
                seed_path,
                &provisioned,
                deployment_id,
            )
            .await
        {
            self.rollback_side_effects(name, &provisioned, seed_path).await;
            return Err(e);
        }

        Ok(())
    }

    /// `StartVM` / the re-launch half of `RestartVM`: re-provisions
    /// host-side resources and relaunches against the VM's already-persisted
    /// identity (IP, MAC, kernel cmdline) — no new lease, no new cmdline.
    pub async fn start_vm(&self, name: &str) -> Result<Vm> {
        let _guard = self.vm_locks.lock(name).await;
        let vm = self.get_vm(name).await?;

        match vm.status {
            VmStatus::Running => return Ok(vm),
            VmStatus::Stopped | VmStatus::Crashed => {}
            VmStatus::Pending | VmStatus::Deleting => {
                return Err(Error::PreconditionFailed(format!(
                    "vm {name} cannot be started while {}",
                    vm.status.as_str()
                )));
            }
        }

        let plugin = self
            .registry
            .get(&vm.plugin)
            .await
            .ok_or_else(|| Error::not_found(format!("plugin {}", vm.plugin)))?;
        let (_, override_doc) = vm_config::get_current(self.store.pool(), vm.id)
            .await?
            .ok_or_else(|| Error::Integrity(format!("vm {name} has no stored configuration")))?;
        let effective = merge::resolve(&plugin.manifest, &override_doc)?;

        let seed_path = cloudinit_store::get(self.store.pool(), vm.id)
            .await?
            .map(|record| PathBuf::from(record.seed_image_path));

        let serial_socket_path = vm
            .serial_socket_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.launcher_config.vm_runtime_dir(vm.id).join("console.sock"));
        let cmdline = vm.kernel_cmdline.clone().unwrap_or_default();

        let provisioned = self.provision_side_effects(name, vm.id, &effective, seed_path.as_deref()).await?;

        match self
            .launch_and_supervise(
                vm.id,
                name,
                &effective,
                vm.ip_address.as_deref(),
                vm.mac_address.as_deref(),
                &cmdline,
                &serial_socket_path,
                seed_path.as_deref(),
                &provisioned,
                vm.deployment_id,
            )
            .await
        {
            Ok(()) => self.get_vm(name).await,
            Err(e) => {
                self.rollback_side_effects(name, &provisioned, seed_path.as_deref()).await;
                Err(e)
            }
        }
    }

    /// `StopVM`: asks the monitor to terminate the process and waits
    /// (bounded) for it to observe exit. Idempotent on a non-running VM.
    /// `force` skips the launcher's grace period and SIGKILLs immediately.
    pub async fn stop_vm(&self, name: &str, force: bool) -> Result<Vm> {
        let _guard = self.vm_locks.lock(name).await;
        let vm = self.get_vm(name).await?;
        if vm.status != VmStatus::Running {
            return Ok(vm);
        }

        self.request_stop_and_wait(name, force).await;
        self.get_vm(name).await
    }

    /// `RestartVM`: stop, then start. Each half takes its own lock
    /// acquisition rather than one held across both — a concurrent
    /// `StartVM`/`StopVM` in the brief gap between them is the same hazard
    /// any stop-then-start pair already has.
    pub async fn restart_vm(&self, name: &str) -> Result<Vm> {
        {
            let _guard = self.vm_locks.lock(name).await;
            let vm = self.get_vm(name).await?;
            if vm.status == VmStatus::Running {
                self.request_stop_and_wait(name, false).await;
            }
        }
        self.start_vm(name).await
    }

    async fn request_stop_and_wait(&self, name: &str, force: bool) {
        if let Some(supervised) = self.supervisors.get(name).await {
            let notified = supervised.exited.notified();
            supervised.request_stop(force).await;
            let _ = tokio::time::timeout(Duration::from_secs(15), notified).await;
        }
    }

    /// `DestroyVM`: stop if running, best-effort unwind host-side
    /// resources, then transactionally remove every trace of the VM. The
    /// config and cloud-init rows cascade with the `vms` row delete.
    pub async fn destroy_vm(&self, name: &str) -> Result<()> {
        let _guard = self.vm_locks.lock(name).await;
        let vm = match vms::get_by_name(self.store.pool(), name).await? {
            Some(vm) => vm,
            None => return Ok(()),
        };

        if vm.status == VmStatus::Running {
            self.request_stop_and_wait(name, false).await;
        }

        self.unbind_devices_best_effort(name, &vm).await;

        if let Some(record) = cloudinit_store::get(self.store.pool(), vm.id).await? {
            let _ = self.cloud_init.remove(Path::new(&record.seed_image_path)).await;
        }

        if let Some(ip) = &vm.ip_address {
            let _ = ip_store::release(self.store.pool(), ip).await;
        }

        vms::delete(self.store.pool(), name).await?;

        if vm.status != VmStatus::Running {
            // The monitor already published vm.stopped/vm.crashed on its own
            // exit; this covers destroying a VM that was already at rest.
            self.events
                .publish(VmEvent::new(VmEventType::Stopped, name).with_status(VmStatus::Stopped.as_str()));
        }

        if let Some(deployment_id) = vm.deployment_id {
            if let Ok(Some(deployment)) = volant_store::deployments::get_by_id(self.store.pool(), deployment_id).await {
                self.spawn_reconcile(deployment.name);
            }
        }

        Ok(())
    }

    /// VFIO bindings outlive a stop (by design — see `start_vm`'s reuse of
    /// `bind_all`'s idempotency), so destroy is the only place they're torn
    /// down. The current driver/iommu metadata isn't persisted across a
    /// control-plane restart, so this re-derives it with an idempotent
    /// `bind_all` call before unbinding; see DESIGN.md for the tradeoff.
    async fn unbind_devices_best_effort(&self, name: &str, vm: &Vm) {
        let Some((_, override_doc)) = vm_config::get_current(self.store.pool(), vm.id).await.ok().flatten() else {
            return;
        };
        let Some(plugin) = self.registry.get(&vm.plugin).await else {
            return;
        };
        let Ok(effective) = merge::resolve(&plugin.manifest, &override_doc) else {
            return;
        };
        let Some(devices) = &effective.devices else {
            return;
        };
        if devices.pci_passthrough.is_empty() {
            return;
        }

        let addresses: Result<Vec<PciAddress>> = devices.pci_passthrough.iter().map(|s| s.parse()).collect();
        let Ok(addresses) = addresses else {
            return;
        };
        let Ok(bound) = self.device.bind_all(&addresses, &devices.allowlist).await else {
            return;
        };
        if let Err(e) = self.device.unbind_all(&bound).await {
            warn!(vm = %name, error = %e, "vfio unbind failed during destroy");
        }
    }

    /// `UpdateVMConfig`: merges `patch` over the current override,
    /// validates the merged result against the plugin manifest, and appends
    /// a new version. The engine never restarts the VM on its own — the
    /// caller decides, guided by `restart_required`.
    pub async fn update_vm_config(&self, name: &str, patch: VmConfigOverride) -> Result<UpdateConfigResponse> {
        let _guard = self.vm_locks.lock(name).await;
        let vm = self.get_vm(name).await?;
        let plugin = self
            .registry
            .get(&vm.plugin)
            .await
            .ok_or_else(|| Error::not_found(format!("plugin {}", vm.plugin)))?;

        let (version, current) = vm_config::get_current(self.store.pool(), vm.id)
            .await?
            .unwrap_or((0, VmConfigOverride::default()));

        let merged = current.merged_with(&patch);
        merge::resolve(&plugin.manifest, &merged)?;

        let restart_required = current.affects_launch_spec(&patch);
        let new_version = version + 1;
        let vm_id = vm.id;

        with_tx(self.store.pool(), move |tx| {
            Box::pin(async move { vm_config::upsert(tx, vm_id, new_version, &merged).await })
        })
        .await?;

        Ok(UpdateConfigResponse { version: new_version, restart_required })
    }

    pub async fn get_vm_config(&self, name: &str) -> Result<VmConfig> {
        let vm = self.get_vm(name).await?;
        let (version, override_doc) = vm_config::get_current(self.store.pool(), vm.id)
            .await?
            .unwrap_or((0, VmConfigOverride::default()));
        Ok(VmConfig { vm_name: name.to_string(), version, override_doc })
    }

    pub async fn vm_config_history(&self, name: &str, limit: Option<i64>) -> Result<Vec<VmConfigHistoryEntry>> {
        let vm = self.get_vm(name).await?;
        vm_config::history(self.store.pool(), vm.id, name, limit).await
    }

    /// Stages the cloud-init seed image, binds any VFIO devices, and creates
    /// the tap device a bridged/DHCP network needs — the provisioning half
    /// of the VM creation path, reused by `start_vm`.
    async fn provision_side_effects(
        &self,
        vm_name: &str,
        vm_id: i64,
        effective: &EffectiveConfig,
        seed_path: Option<&Path>,
    ) -> Result<Provisioned> {
        if let (Some(documents), Some(seed_path)) = (&effective.cloud_init, seed_path) {
            self.cloud_init.build(vm_name, vm_id, vm_name, documents, seed_path).await?;
        }

        let bound_devices = if let Some(devices) = &effective.devices {
            if devices.pci_passthrough.is_empty() {
                Vec::new()
            } else {
                let addresses: Result<Vec<PciAddress>> =
                    devices.pci_passthrough.iter().map(|s| s.parse()).collect();
                self.device.bind_all(&addresses?, &devices.allowlist).await?
            }
        } else {
            Vec::new()
        };

        let tap = if matches!(effective.network.mode, NetworkMode::Bridged | NetworkMode::Dhcp) {
            Some(self.network.create_tap(vm_name, &self.config.bridge_name).await?)
        } else {
            None
        };

        Ok(Provisioned { tap, bound_devices })
    }

    async fn rollback_side_effects(&self, vm_name: &str, provisioned: &Provisioned, seed_path: Option<&Path>) {
        if let Some(tap) = &provisioned.tap {
            if let Err(e) = self.network.destroy_tap(tap).await {
                warn!(vm = %vm_name, error = %e, "failed to roll back tap device");
            }
        }
        if !provisioned.bound_devices.is_empty() {
            if let Err(e) = self.device.unbind_all(&provisioned.bound_devices).await {
                warn!(vm = %vm_name, error = %e, "failed to roll back vfio binding");
            }
        }
        if let Some(seed_path) = seed_path {
            let _ = self.cloud_init.remove(seed_path).await;
        }
    }

    /// Assembles the `LaunchSpec`, launches under the configured deadline,
    /// persists the resulting running state, publishes `vm.running`, and
    /// hands the instance to the supervisor.
    #[allow(clippy::too_many_arguments)]
    async fn launch_and_supervise(
        &self,
        vm_id: i64,
        vm_name: &str,
        effective: &EffectiveConfig,
        ip: Option<&str>,
        mac: Option<&str>,
        cmdline: &str,
        serial_socket_path: &Path,
        seed_path: Option<&Path>,
        provisioned: &Provisioned,
        deployment_id: Option<i64>,
    ) -> Result<()> {
        let network = match effective.network.mode {
            NetworkMode::Bridged => NetworkDescriptor::Bridged {
                tap_name: provisioned.tap.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
                mac_address: mac.unwrap_or_default().to_string(),
                ip_address: ip.unwrap_or_default().to_string(),
                netmask_prefix: self.config.netmask_prefix(),
            },
            NetworkMode::Dhcp => NetworkDescriptor::Dhcp {
                tap_name: provisioned.tap.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
                mac_address: mac.unwrap_or_default().to_string(),
            },
            NetworkMode::Vsock => NetworkDescriptor::Vsock { cid: self.config.vsock_cid_base + vm_id as u32 },
        };

        let spec = LaunchSpec {
            vm_id,
            vm_name: vm_name.to_string(),
            cpu: effective.cpu,
            memory_mib: effective.memory_mib,
            boot_media: effective.boot_media.clone(),
            additional_disks: effective.additional_disks.clone(),
            cloud_init_seed_path: seed_path.map(|p| p.to_path_buf()),
            network,
            kernel_cmdline: cmdline.to_string(),
            vfio_device_paths: provisioned.bound_devices.iter().map(|d| d.vfio_device_path.clone()).collect(),
            serial_socket_path: serial_socket_path.to_path_buf(),
            kernel_override: None,
        };

        let instance: Box<dyn Instance> = tokio::time::timeout(self.config.launch_deadline, self.launcher.launch(&spec))
            .await
            .map_err(|_| {
                Error::Hypervisor(format!("hypervisor did not reach running within {:?}", self.config.launch_deadline))
            })??;

        let pid = instance.pid().map(|p| p as i32);
        vms::update_runtime_state(self.store.pool(), vm_name, VmStatus::Running, pid).await?;

        let mut event = VmEvent::new(VmEventType::Running, vm_name).with_status(VmStatus::Running.as_str());
        if let Some(pid) = pid {
            event = event.with_pid(pid);
        }
        if let Some(ip) = ip {
            event = event.with_ip(ip);
        }
        if let Some(mac) = mac {
            event = event.with_mac(mac);
        }
        self.events.publish(event);

        supervisor::spawn_monitor(
            vm_name.to_string(),
            vm_id,
            deployment_id,
            instance,
            provisioned.tap.clone(),
            self.network.clone(),
            self.store.clone(),
            self.events.clone(),
            self.supervisors.clone(),
            self.clone(),
        )
        .await;

        Ok(())
    }
}

/// VM names are used as tap-name and DNS-label inputs downstream, so they're
/// held to the stricter of the two: lowercase DNS-label rules. Also used to
/// validate deployment names, which double as the prefix for replica names.
pub(crate) fn validate_vm_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 63 {
        return Err(Error::validation("vm name must be between 1 and 63 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(Error::validation(
            "vm name must contain only lowercase letters, digits, and hyphens",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(Error::validation("vm name must not start or end with a hyphen"));
    }
    Ok(())
}

/// Assembles the kernel command line injected at VM creation: console/panic
/// boilerplate, the `ip=` directive for a bridged attachment, the
/// `volant.*` tokens the in-guest agent reads to find its way home, and any
/// per-VM extra arguments.
fn build_kernel_cmdline(
    config: &EngineConfig,
    vm_name: &str,
    runtime: &str,
    plugin: &str,
    manifest_encoded: &str,
    ip: Option<&str>,
    effective: &EffectiveConfig,
) -> String {
    let mut parts = vec!["console=ttyS0".to_string(), "panic=1".to_string(), "reboot=k".to_string()];

    if let Some(ip) = ip {
        let gateway = effective.network.gateway.clone().unwrap_or_else(|| config.host_ip.to_string());
        let netmask = config.subnet.netmask();
        parts.push(format!("ip={ip}::{gateway}:{netmask}:{vm_name}:eth0:off"));
    }

    parts.push(format!("volant.runtime={runtime}"));
    parts.push(format!("volant.plugin={plugin}"));
    parts.push(format!("volant.api_host={}", config.host_ip));
    parts.push(format!("volant.api_port={}", config.api_port));
    parts.push(format!("volant.manifest={manifest_encoded}"));

    if !effective.kernel_cmdline_extra.is_empty() {
        parts.push(effective.kernel_cmdline_extra.clone());
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_vm_name("").is_err());
    }

    #[test]
    fn rejects_uppercase() {
        assert!(validate_vm_name("Web-1").is_err());
    }

    #[test]
    fn rejects_leading_hyphen() {
        assert!(validate_vm_name("-web").is_err());
    }

    #[test]
    fn accepts_lowercase_alphanumeric_with_hyphens() {
        assert!(validate_vm_name("web-1").is_ok());
        assert!(validate_vm_name("a").is_ok());
    }
}
