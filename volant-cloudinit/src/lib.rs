//! The cloud-init seed builder. Writes user-data, meta-data, and
//! network-config documents to a VFAT image labelled `CIDATA` at a
//! well-known per-VM path, attached as a read-only disk to the launch spec
//! and removed on destroy.

mod image;
mod manager;

pub use manager::CloudInitBuilder;

use serde::{Deserialize, Serialize};

/// The three documents a seed image carries. Each is either synthesised
/// (meta-data only, when absent) or taken verbatim from the plugin manifest
/// / config override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudInitDocuments {
    pub user_data: Option<String>,
    pub meta_data: Option<String>,
    pub network_config: Option<String>,
}
