//! The plugin registry. An in-memory index of installed manifests backed by
//! the Store, the same cache-plus-repository shape the rest of the engine's
//! state uses for hot lookups against a durable backing table.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use volant_core::manifest::{BootImage, Plugin, PluginManifest, RootfsImage};
use volant_core::{Error, Result};
use volant_store::Store;

#[derive(Clone)]
pub struct PluginRegistry {
    store: Store,
    cache: Arc<RwLock<HashMap<String, Plugin>>>,
}

impl PluginRegistry {
    pub fn new(store: Store) -> Self {
        Self { store, cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Loads every plugin row into the cache. Called once from `Engine::start`.
    pub async fn load(&self) -> Result<()> {
        let plugins = volant_store::plugins::list(self.store.pool()).await?;
        let mut cache = self.cache.write().await;
        cache.clear();
        for plugin in plugins {
            cache.insert(plugin.name.clone(), plugin);
        }
        info!(count = cache.len(), "loaded plugins into registry");
        Ok(())
    }

    /// Normalises and validates `manifest`, then upserts the row and cache
    /// entry. Returns the normalised plugin.
    pub async fn install(&self, mut manifest: PluginManifest) -> Result<Plugin> {
        normalise(&mut manifest);
        validate(&manifest)?;

        volant_store::plugins::upsert(self.store.pool(), &manifest).await?;

        let plugin = Plugin {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            enabled: manifest.enabled,
            manifest,
        };
        self.cache.write().await.insert(plugin.name.clone(), plugin.clone());
        Ok(plugin)
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        let name = name.to_lowercase();
        volant_store::plugins::delete(self.store.pool(), &name).await?;
        self.cache.write().await.remove(&name);
        Ok(())
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let name = name.to_lowercase();
        volant_store::plugins::set_enabled(self.store.pool(), &name, enabled).await?;
        if let Some(plugin) = self.cache.write().await.get_mut(&name) {
            plugin.enabled = enabled;
            plugin.manifest.enabled = enabled;
        }
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Plugin> {
        self.cache.read().await.get(&name.to_lowercase()).cloned()
    }

    pub async fn list(&self) -> Vec<Plugin> {
        let mut plugins: Vec<Plugin> = self.cache.read().await.values().cloned().collect();
        plugins.sort_by(|a, b| a.name.cmp(&b.name));
        plugins
    }
}

fn normalise(manifest: &mut PluginManifest) {
    manifest.name = manifest.name.trim().to_lowercase();
    manifest.version = manifest.version.trim().to_string();
    if manifest
        .runtime
        .as_ref()
        .map(|r| r.trim().is_empty())
        .unwrap_or(true)
    {
        manifest.runtime = Some(manifest.name.clone());
    } else if let Some(runtime) = &mut manifest.runtime {
        *runtime = runtime.trim().to_string();
    }
}

fn validate(manifest: &PluginManifest) -> Result<()> {
    if manifest.name.is_empty() {
        return Err(Error::validation("plugin name must not be empty"));
    }

    match (&manifest.initramfs, &manifest.rootfs) {
        (Some(_), None) | (None, Some(_)) => {}
        (Some(_), Some(_)) => {
            return Err(Error::validation("exactly one of initramfs or rootfs may be set, got both"))
        }
        (None, None) => {
            return Err(Error::validation("exactly one of initramfs or rootfs must be set"))
        }
    }
    validate_boot_image(manifest.initramfs.as_ref())?;
    validate_rootfs_image(manifest.rootfs.as_ref())?;

    if manifest.resources.cpu < 1 {
        return Err(Error::validation("resources.cpu must be >= 1"));
    }
    if manifest.resources.memory_mib < 1 {
        return Err(Error::validation("resources.memory_mib must be >= 1"));
    }

    if manifest.network.mode == volant_core::manifest::NetworkMode::Bridged
        && !manifest.network.auto_assign
        && (manifest.network.subnet.is_none() || manifest.network.gateway.is_none())
    {
        return Err(Error::validation(
            "bridged network mode requires subnet and gateway, or auto_assign",
        ));
    }

    if let Some(actions) = &manifest.actions {
        for (name, action) in actions {
            if !action.path.starts_with('/') {
                return Err(Error::validation(format!(
                    "action {name} path must be absolute, got {}",
                    action.path
                )));
            }
        }
    }

    Ok(())
}

fn validate_boot_image(image: Option<&BootImage>) -> Result<()> {
    if let Some(image) = image {
        if image.url.is_empty() {
            return Err(Error::validation("initramfs.url must not be empty"));
        }
    }
    Ok(())
}

fn validate_rootfs_image(image: Option<&RootfsImage>) -> Result<()> {
    if let Some(image) = image {
        if image.url.is_empty() {
            return Err(Error::validation("rootfs.url must not be empty"));
        }
        if image.format.is_empty() {
            return Err(Error::validation("rootfs.format must not be empty"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use volant_core::manifest::{ActionSpec, Resources, Workload, WorkloadType};

    fn base_manifest() -> PluginManifest {
        PluginManifest {
            name: "  Web-App  ".into(),
            version: "1.0.0".into(),
            runtime: None,
            enabled: true,
            labels: None,
            initramfs: Some(BootImage { url: "https://example.com/app.cpio".into(), checksum: None }),
            rootfs: None,
            resources: Resources { cpu: 1, memory_mib: 128 },
            workload: Workload {
                entrypoint: vec!["/bin/app".into()],
                working_dir: None,
                env: Map::new(),
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

    #[test]
    fn normalise_lowercases_and_defaults_runtime() {
        let mut manifest = base_manifest();
        normalise(&mut manifest);
        assert_eq!(manifest.name, "web-app");
        assert_eq!(manifest.runtime.as_deref(), Some("web-app"));
    }

    #[test]
    fn validate_rejects_both_boot_media_kinds() {
        let mut manifest = base_manifest();
        manifest.rootfs = Some(RootfsImage {
            url: "https://example.com/disk.img".into(),
            checksum: None,
            format: "raw".into(),
            device: None,
        });
        assert!(validate(&manifest).is_err());
    }

    #[test]
    fn validate_rejects_neither_boot_media_kind() {
        let mut manifest = base_manifest();
        manifest.initramfs = None;
        assert!(validate(&manifest).is_err());
    }

    #[test]
    fn validate_rejects_zero_cpu() {
        let mut manifest = base_manifest();
        manifest.resources.cpu = 0;
        assert!(validate(&manifest).is_err());
    }

    #[test]
    fn validate_requires_subnet_for_bridged_without_auto_assign() {
        let manifest = base_manifest();
        assert!(validate(&manifest).is_err());
    }

    #[test]
    fn validate_allows_bridged_with_auto_assign() {
        let mut manifest = base_manifest();
        manifest.network.auto_assign = true;
        assert!(validate(&manifest).is_ok());
    }

    #[test]
    fn validate_rejects_relative_action_path() {
        let mut manifest = base_manifest();
        manifest.network.auto_assign = true;
        let mut actions = Map::new();
        actions.insert(
            "restart".to_string(),
            ActionSpec { method: "POST".into(), path: "restart".into(), timeout_ms: None },
        );
        manifest.actions = Some(actions);
        assert!(validate(&manifest).is_err());
    }
}
