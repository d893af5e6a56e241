//! `AppState`: the one thing every handler holds a clone of — a config
//! plus a single `Engine` clone. Every registry a handler needs (the
//! plugin registry, the store, the supervisor table) lives inside the
//! engine rather than as separate fields here.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use reqwest::Client;
use volant_cloudinit::CloudInitBuilder;
use volant_device::default_device_manager;
use volant_launcher::HypervisorLauncher;
use volant_network::default_network_manager;
use volant_orchestrator::Engine;
use volant_store::Store;

use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Engine,
    /// Shared `reqwest` client for bridged/DHCP agent proxying — built once
    /// so connection pooling works across requests.
    pub agent_http: Client,
    pub start_time: Instant,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let store = Store::connect(&config.database_url).await?;
        let network = Arc::from(default_network_manager());
        let device = Arc::from(default_device_manager());
        let launcher = Arc::new(HypervisorLauncher::new(config.launcher_config()));
        let cloud_init = Arc::new(CloudInitBuilder::new().await);

        let engine = Engine::new(
            store,
            config.engine_config(),
            config.launcher_config(),
            network,
            device,
            launcher,
            cloud_init,
        );
        engine.start().await?;

        Ok(Self {
            config: Arc::new(config),
            engine,
            agent_http: Client::builder().build()?,
            start_time: Instant::now(),
        })
    }
}
