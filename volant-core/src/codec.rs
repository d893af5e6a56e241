//! The manifest is injected into the guest as a
//! `volant.manifest=<b64url(gzip(json))>` kernel argument. Must round-trip
//! losslessly for every legal manifest.

use std::io::{Read, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use crate::manifest::PluginManifest;

/// Encodes a manifest as `base64url(gzip(json))`, suitable for embedding as
/// a single kernel command-line token (no `=`, `+`, `/`, or whitespace).
pub fn encode_manifest(manifest: &PluginManifest) -> Result<String> {
    let json = serde_json::to_vec(manifest)
        .map_err(|e| Error::Internal(format!("encoding manifest: {e}")))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| Error::Internal(format!("gzipping manifest: {e}")))?;
    let gzipped = encoder
        .finish()
        .map_err(|e| Error::Internal(format!("gzipping manifest: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(gzipped))
}

/// Inverse of [`encode_manifest`].
pub fn decode_manifest(encoded: &str) -> Result<PluginManifest> {
    let gzipped = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| Error::Integrity(format!("invalid manifest encoding: {e}")))?;
    let mut decoder = GzDecoder::new(gzipped.as_slice());
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| Error::Integrity(format!("invalid manifest gzip stream: {e}")))?;
    serde_json::from_slice(&json).map_err(|e| Error::Integrity(format!("invalid manifest json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Resources, Workload, WorkloadType};
    use std::collections::HashMap;

    fn sample_manifest() -> PluginManifest {
        PluginManifest {
            name: "demo".into(),
            version: "1.0.0".into(),
            runtime: None,
            enabled: true,
            labels: None,
            initramfs: None,
            rootfs: None,
            resources: Resources {
                cpu: 1,
                memory_mib: 128,
            },
            workload: Workload {
                entrypoint: vec!["/bin/demo".into()],
                working_dir: None,
                env: HashMap::new(),
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
    fn round_trips_losslessly() {
        let manifest = sample_manifest();
        let encoded = encode_manifest(&manifest).expect("encode");
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        let decoded = decode_manifest(&encoded).expect("decode");
        assert_eq!(
            serde_json::to_value(&manifest).unwrap(),
            serde_json::to_value(&decoded).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(decode_manifest("not valid base64!!").is_err());
    }
}
