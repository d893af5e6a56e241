//! The real `Launcher`: shells out to the configured hypervisor binary,
//! assembling its command line from a `LaunchSpec` and supervising it via
//! `tokio::process::Child` so exit can be awaited rather than polled.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use volant_core::launch::{BootMedia, ExitCause, LaunchSpec, NetworkDescriptor};
use volant_core::{Error, Result};

use crate::config::LauncherConfig;
use crate::launcher::{Instance, Launcher};
use crate::staging;

pub struct HypervisorLauncher {
    config: LauncherConfig,
}

impl HypervisorLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    fn select_kernel(&self, spec: &LaunchSpec) -> PathBuf {
        if let Some(override_path) = &spec.kernel_override {
            return override_path.clone();
        }
        match &spec.boot_media {
            BootMedia::Initramfs { .. } => self.config.uncompressed_kernel_path.clone(),
            BootMedia::Rootfs { .. } => self.config.compressed_kernel_path.clone(),
        }
    }
}

#[async_trait]
impl Launcher for HypervisorLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn Instance>> {
        let vm_dir = self.config.vm_runtime_dir(spec.vm_id);
        tokio::fs::create_dir_all(&vm_dir)
            .await
            .map_err(|e| Error::HostOs(format!("creating vm runtime dir {}: {e}", vm_dir.display())))?;

        let kernel_path = self.select_kernel(spec);
        let mut staged_paths = Vec::new();
        let mut disk_args = Vec::new();

        let boot_media_path = staging::staged_path(&vm_dir, "boot");
        match &spec.boot_media {
            BootMedia::Initramfs { url, checksum } => {
                staging::stage(url, checksum.as_deref(), &boot_media_path, self.config.download_timeout).await?;
                staged_paths.push(boot_media_path.clone());
            }
            BootMedia::Rootfs { url, checksum, .. } => {
                staging::stage(url, checksum.as_deref(), &boot_media_path, self.config.download_timeout).await?;
                staged_paths.push(boot_media_path.clone());
                disk_args.push(format!(
                    "path={},readonly=off,id=boot",
                    boot_media_path.display()
                ));
            }
        }

        for (i, disk) in spec.additional_disks.iter().enumerate() {
            let disk_path = staging::staged_path(&vm_dir, &format!("disk-{i}"));
            staging::stage(&disk.url, disk.checksum.as_deref(), &disk_path, self.config.download_timeout).await?;
            staged_paths.push(disk_path.clone());
            disk_args.push(format!(
                "path={},readonly={},id=disk-{i}",
                disk_path.display(),
                if disk.read_only { "on" } else { "off" }
            ));
        }

        if let Some(seed) = &spec.cloud_init_seed_path {
            disk_args.push(format!("path={},readonly=on,id=cloud-init", seed.display()));
        }

        let mut args: Vec<String> = vec![
            "--cpus".into(),
            format!("boot={}", spec.cpu),
            "--memory".into(),
            format!("size={}M", spec.memory_mib),
            "--kernel".into(),
            kernel_path.display().to_string(),
        ];

        if let BootMedia::Initramfs { .. } = &spec.boot_media {
            args.push("--initramfs".into());
            args.push(boot_media_path.display().to_string());
        }

        for disk_arg in &disk_args {
            args.push("--disk".into());
            args.push(disk_arg.clone());
        }

        match &spec.network {
            NetworkDescriptor::Bridged { tap_name, mac_address, ip_address, netmask_prefix } => {
                args.push("--net".into());
                args.push(format!(
                    "tap={tap_name},mac={mac_address},ip={ip_address},mask={netmask_prefix}"
                ));
            }
            NetworkDescriptor::Dhcp { tap_name, mac_address } => {
                args.push("--net".into());
                args.push(format!("tap={tap_name},mac={mac_address}"));
            }
            NetworkDescriptor::Vsock { cid } => {
                args.push("--vsock".into());
                args.push(format!("cid={cid}"));
            }
        }

        for vfio_path in &spec.vfio_device_paths {
            args.push("--device".into());
            args.push(format!("path={}", vfio_path.display()));
        }

        args.push("--serial".into());
        args.push(format!("socket={}", spec.serial_socket_path.display()));
        args.push("--cmdline".into());
        args.push(spec.kernel_cmdline.clone());

        info!(
            vm_id = spec.vm_id,
            vm_name = %spec.vm_name,
            binary = %self.config.hypervisor_binary.display(),
            "launching hypervisor"
        );

        let child = Command::new(&self.config.hypervisor_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Hypervisor(format!("spawning hypervisor: {e}")))?;

        staged_paths.push(spec.serial_socket_path.clone());

        Ok(Box::new(ProcessInstance {
            child,
            staged_paths,
            stop_grace: self.config.stop_grace,
            exit_cause: None,
        }))
    }
}

struct ProcessInstance {
    child: Child,
    staged_paths: Vec<PathBuf>,
    stop_grace: Duration,
    exit_cause: Option<ExitCause>,
}

impl ProcessInstance {
    async fn cleanup(&self) {
        for path in &self.staged_paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "cleanup failed to remove staged file");
                }
            }
        }
    }
}

#[async_trait]
impl Instance for ProcessInstance {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> ExitCause {
        if let Some(cause) = self.exit_cause {
            return cause;
        }

        let cause = match self.child.wait().await {
            Ok(status) if status.success() => ExitCause::Clean,
            Ok(status) => ExitCause::Crashed {
                signal_or_code: status.signal().unwrap_or_else(|| status.code().unwrap_or(-1)),
            },
            Err(e) => {
                warn!(error = %e, "waiting on hypervisor process failed");
                ExitCause::Crashed { signal_or_code: -1 }
            }
        };

        self.exit_cause = Some(cause);
        self.cleanup().await;
        cause
    }

    async fn stop(&mut self, force: bool) {
        if self.exit_cause.is_some() {
            return;
        }

        let Some(pid) = self.pid() else {
            return;
        };

        if force {
            warn!(pid, "force stop requested, sending SIGKILL");
            let _ = self.child.start_kill();
            let _ = self.child.wait().await;
            return;
        }

        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(pid, error = %e, "sending SIGTERM to hypervisor failed");
        }

        let deadline = tokio::time::Instant::now() + self.stop_grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => {
                    if tokio::time::Instant::now() >= deadline {
                        warn!(pid, "hypervisor still alive after grace period, sending SIGKILL");
                        let _ = self.child.start_kill();
                        let _ = self.child.wait().await;
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(e) => {
                    warn!(pid, error = %e, "polling hypervisor exit status failed");
                    return;
                }
            }
        }
    }
}
