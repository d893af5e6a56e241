//! One row per VM storing the three cloud-init documents and the generated
//! seed image path.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudInitRecord {
    pub vm_id: i64,
    pub user_data: Option<String>,
    pub meta_data: Option<String>,
    pub network_config: Option<String>,
    pub seed_image_path: String,
}
