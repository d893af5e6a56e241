//! Deep-merge of plugin manifest defaults with per-VM overrides into the
//! effective configuration the creation path needs:
//! `plugin manifest defaults ← request overrides ← supplied config override`.
//!
//! `VmConfigOverride` already holds the sparse, merged override document by
//! the time it reaches [`resolve`] — this module's job is to lay it over the
//! manifest's defaults and produce the concrete values the rest of the
//! creation path consumes (launch spec inputs, cloud-init documents).

use serde::Deserialize;
use volant_core::config::VmConfigOverride;
use volant_core::launch::{AdditionalDiskSpec, BootMedia};
use volant_core::manifest::{DevicesSpec, NetworkConfig, NetworkMode, PluginManifest};
use volant_core::{Error, Result};
use volant_cloudinit::CloudInitDocuments;

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub cpu: u32,
    pub memory_mib: u32,
    pub kernel_cmdline_extra: String,
    pub network: NetworkConfig,
    pub boot_media: BootMedia,
    pub additional_disks: Vec<AdditionalDiskSpec>,
    pub devices: Option<DevicesSpec>,
    pub cloud_init: Option<CloudInitDocuments>,
}

/// A sparse override for whichever boot media kind the manifest declares.
/// Only `url`/`checksum` are overridable — switching kinds (initramfs vs
/// rootfs) requires a new plugin version, not a per-VM override.
#[derive(Debug, Default, Deserialize)]
struct BootMediaOverride {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
}

/// A sparse override of the three cloud-init documents, as inline strings —
/// the config-override path never reads host files, unlike the manifest's
/// own `DocumentRef::Path` (resolved once, at install time, in the registry).
#[derive(Debug, Default, Deserialize)]
struct CloudInitOverride {
    #[serde(default)]
    user_data: Option<String>,
    #[serde(default)]
    meta_data: Option<String>,
    #[serde(default)]
    network_config: Option<String>,
}

pub fn resolve(manifest: &PluginManifest, override_doc: &VmConfigOverride) -> Result<EffectiveConfig> {
    let cpu = override_doc.cpu.unwrap_or(manifest.resources.cpu);
    let memory_mib = override_doc.memory_mib.unwrap_or(manifest.resources.memory_mib);
    if cpu < 1 {
        return Err(Error::validation("cpu must be >= 1"));
    }
    if memory_mib < 1 {
        return Err(Error::validation("memory_mib must be >= 1"));
    }

    let network = override_doc.network.clone().unwrap_or_else(|| manifest.network.clone());
    if network.mode == NetworkMode::Bridged
        && !network.auto_assign
        && (network.subnet.is_none() || network.gateway.is_none())
    {
        return Err(Error::validation(
            "bridged network mode requires subnet and gateway, or auto_assign",
        ));
    }

    let boot_media = resolve_boot_media(manifest, override_doc)?;

    let additional_disks = manifest
        .disks
        .iter()
        .map(|d| AdditionalDiskSpec {
            url: d.url.clone(),
            checksum: d.checksum.clone(),
            read_only: d.read_only,
            device: d.device.clone(),
        })
        .collect();

    let devices = override_doc.devices.clone().or_else(|| manifest.devices.clone());

    let cloud_init = resolve_cloud_init(manifest, override_doc)?;

    Ok(EffectiveConfig {
        cpu,
        memory_mib,
        kernel_cmdline_extra: override_doc.kernel_cmdline_extra.clone().unwrap_or_default(),
        network,
        boot_media,
        additional_disks,
        devices,
        cloud_init,
    })
}

fn resolve_boot_media(manifest: &PluginManifest, override_doc: &VmConfigOverride) -> Result<BootMedia> {
    let patch: Option<BootMediaOverride> = match &override_doc.boot_media {
        Some(value) => Some(
            serde_json::from_value(value.clone())
                .map_err(|e| Error::validation(format!("invalid boot_media override: {e}")))?,
        ),
        None => None,
    };

    match (&manifest.initramfs, &manifest.rootfs) {
        (Some(image), None) => Ok(BootMedia::Initramfs {
            url: patch.as_ref().and_then(|p| p.url.clone()).unwrap_or_else(|| image.url.clone()),
            checksum: patch
                .as_ref()
                .and_then(|p| p.checksum.clone())
                .or_else(|| image.checksum.clone()),
        }),
        (None, Some(image)) => Ok(BootMedia::Rootfs {
            url: patch.as_ref().and_then(|p| p.url.clone()).unwrap_or_else(|| image.url.clone()),
            checksum: patch
                .as_ref()
                .and_then(|p| p.checksum.clone())
                .or_else(|| image.checksum.clone()),
            format: image.format.clone(),
            device: image.device.clone(),
        }),
        (Some(_), Some(_)) => Err(Error::Integrity(
            "plugin manifest declares both initramfs and rootfs".to_string(),
        )),
        (None, None) => Err(Error::Integrity(
            "plugin manifest declares neither initramfs nor rootfs".to_string(),
        )),
    }
}

fn resolve_cloud_init(
    manifest: &PluginManifest,
    override_doc: &VmConfigOverride,
) -> Result<Option<CloudInitDocuments>> {
    if manifest.cloud_init.is_none() && override_doc.cloud_init.is_none() {
        return Ok(None);
    }

    let mut documents = CloudInitDocuments::default();
    if let Some(spec) = &manifest.cloud_init {
        documents.user_data = resolve_document_ref(spec.user_data.as_ref())?;
        documents.meta_data = resolve_document_ref(spec.meta_data.as_ref())?;
        documents.network_config = resolve_document_ref(spec.network_config.as_ref())?;
    }

    if let Some(value) = &override_doc.cloud_init {
        let patch: CloudInitOverride = serde_json::from_value(value.clone())
            .map_err(|e| Error::validation(format!("invalid cloud_init override: {e}")))?;
        if patch.user_data.is_some() {
            documents.user_data = patch.user_data;
        }
        if patch.meta_data.is_some() {
            documents.meta_data = patch.meta_data;
        }
        if patch.network_config.is_some() {
            documents.network_config = patch.network_config;
        }
    }

    Ok(Some(documents))
}

/// Resolves a manifest-time `DocumentRef` to its string content. Paths are
/// read from the host filesystem synchronously — this runs during plugin
/// install / VM creation, not on a hot path, and the rest of the registry's
/// validation path (`normalise`/`validate` in `registry.rs`) is likewise
/// synchronous.
fn resolve_document_ref(doc: Option<&volant_core::manifest::DocumentRef>) -> Result<Option<String>> {
    use volant_core::manifest::DocumentRef;

    match doc {
        None => Ok(None),
        Some(DocumentRef::Inline { content }) => Ok(Some(content.clone())),
        Some(DocumentRef::Path { path }) => std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| Error::HostOs(format!("reading cloud-init document {path}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use volant_core::manifest::{BootImage, Resources, Workload, WorkloadType};

    fn manifest() -> PluginManifest {
        PluginManifest {
            name: "web".into(),
            version: "1.0.0".into(),
            runtime: Some("web".into()),
            enabled: true,
            labels: None,
            initramfs: Some(BootImage { url: "https://p/app.cpio".into(), checksum: None }),
            rootfs: None,
            resources: Resources { cpu: 1, memory_mib: 128 },
            workload: Workload {
                entrypoint: vec!["/bin/app".into()],
                working_dir: None,
                env: HashMap::new(),
                workload_type: WorkloadType::Http,
                base_url: None,
            },
            health_check: None,
            network: NetworkConfig { mode: NetworkMode::Dhcp, subnet: None, gateway: None, auto_assign: false },
            cloud_init: None,
            devices: None,
            disks: Vec::new(),
            actions: None,
            openapi_url: None,
        }
    }

    #[test]
    fn cpu_and_memory_default_to_manifest() {
        let effective = resolve(&manifest(), &VmConfigOverride::default()).expect("resolve");
        assert_eq!(effective.cpu, 1);
        assert_eq!(effective.memory_mib, 128);
    }

    #[test]
    fn override_replaces_cpu_and_memory() {
        let override_doc = VmConfigOverride { cpu: Some(4), memory_mib: Some(512), ..Default::default() };
        let effective = resolve(&manifest(), &override_doc).expect("resolve");
        assert_eq!(effective.cpu, 4);
        assert_eq!(effective.memory_mib, 512);
    }

    #[test]
    fn rejects_zero_cpu_override() {
        let override_doc = VmConfigOverride { cpu: Some(0), ..Default::default() };
        assert!(resolve(&manifest(), &override_doc).is_err());
    }

    #[test]
    fn boot_media_override_replaces_url_only() {
        let override_doc = VmConfigOverride {
            boot_media: Some(serde_json::json!({"url": "https://p/app-v2.cpio"})),
            ..Default::default()
        };
        let effective = resolve(&manifest(), &override_doc).expect("resolve");
        match effective.boot_media {
            BootMedia::Initramfs { url, .. } => assert_eq!(url, "https://p/app-v2.cpio"),
            _ => panic!("expected initramfs"),
        }
    }

    #[test]
    fn bridged_without_subnet_or_auto_assign_is_rejected() {
        let override_doc = VmConfigOverride {
            network: Some(NetworkConfig { mode: NetworkMode::Bridged, subnet: None, gateway: None, auto_assign: false }),
            ..Default::default()
        };
        assert!(resolve(&manifest(), &override_doc).is_err());
    }
}
