use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use ipnet::Ipv4Net;
use volant_cloudinit::CloudInitBuilder;
use volant_core::manifest::{BootImage, PluginManifest, Resources, Workload, WorkloadType};
use volant_device::NoopDeviceManager;
use volant_launcher::{FakeLauncher, LauncherConfig};
use volant_network::NoopNetworkManager;
use volant_orchestrator::{Engine, EngineConfig};
use volant_store::Store;

use volant_api::state::AppState;
use volant_api::Config;

/// Builds an `AppState` wired to an on-disk tempfile sqlite database, a
/// `FakeLauncher`, and no-op network/device managers — the same test-double
/// stack the orchestrator engine's own would-be integration tests use.
pub async fn test_state() -> (AppState, tempfile::TempDir, Arc<FakeLauncher>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("volant.db");
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let store = Store::connect(&database_url).await.expect("connect store");

    let config = Config {
        bind_addr: "127.0.0.1:0".into(),
        database_url,
        subnet: "10.100.0.0/24".parse::<Ipv4Net>().unwrap(),
        host_ip: "10.100.0.1".parse::<Ipv4Addr>().unwrap(),
        bridge_name: "vbr0".into(),
        runtime_dir: dir.path().join("run"),
        log_dir: dir.path().join("log"),
        hypervisor_binary: "cloud-hypervisor".into(),
        kernel_compressed: dir.path().join("kernel.gz"),
        kernel_uncompressed: dir.path().join("vmlinux"),
        api_key: None,
        allowed_cidrs: Vec::new(),
        vsock_cid_base: 3,
        agent_http_port: 8080,
        agent_vsock_port: 10000,
        download_timeout: Duration::from_secs(5),
    };

    let engine_config = EngineConfig {
        subnet: config.subnet,
        host_ip: config.host_ip,
        bridge_name: config.bridge_name.clone(),
        api_host: config.host_ip.to_string(),
        api_port: 7777,
        vsock_cid_base: config.vsock_cid_base,
        launch_deadline: Duration::from_secs(5),
    };
    let launcher_config = LauncherConfig {
        hypervisor_binary: config.hypervisor_binary.clone(),
        compressed_kernel_path: config.kernel_compressed.clone(),
        uncompressed_kernel_path: config.kernel_uncompressed.clone(),
        runtime_dir: config.runtime_dir.clone(),
        stop_grace: Duration::from_millis(50),
        download_timeout: config.download_timeout,
    };

    let launcher = Arc::new(FakeLauncher::new());
    let engine = Engine::new(
        store,
        engine_config,
        launcher_config,
        Arc::new(NoopNetworkManager::default()),
        Arc::new(NoopDeviceManager::default()),
        launcher.clone(),
        Arc::new(CloudInitBuilder::new().await),
    );
    engine.start().await.expect("engine start");

    let state = AppState {
        config: Arc::new(config),
        engine,
        agent_http: reqwest::Client::new(),
        start_time: std::time::Instant::now(),
    };

    (state, dir, launcher)
}

pub fn demo_manifest(name: &str) -> PluginManifest {
    PluginManifest {
        name: name.to_string(),
        version: "1.0.0".into(),
        runtime: Some(name.to_string()),
        enabled: true,
        labels: None,
        initramfs: Some(BootImage { url: "https://example.com/app.cpio".into(), checksum: None }),
        rootfs: None,
        resources: Resources { cpu: 1, memory_mib: 128 },
        workload: Workload {
            entrypoint: vec!["/bin/app".into()],
            working_dir: None,
            env: Default::default(),
            workload_type: WorkloadType::Http,
            base_url: None,
        },
        health_check: None,
        network: Default::default(),
        cloud_init: None,
        devices: None,
        disks: Vec::new(),
        actions: None,
        openapi_url: None,
    }
}
