//! Platform settings that influence how hardware state is classified.

use serde::{Deserialize, Serialize};

/// Field group whose entries hold the switch ACLs.
pub const DEFAULT_ACL_GROUP_ID: u32 = 128;

/// Warm-boot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmBootConfig {
    /// Index full-mask routes as host routes (platforms that place them in
    /// the host table).
    pub host_table_for_host_routes: bool,
    /// Whether ports may sample to a mirror destination.
    pub sflow_sampling_supported: bool,
    /// ACL field group to scan.
    pub acl_group_id: u32,
    /// Deepest MPLS label stack the ASIC can push.
    pub max_label_stack_depth: usize,
}

impl Default for WarmBootConfig {
    fn default() -> Self {
        Self {
            host_table_for_host_routes: true,
            sflow_sampling_supported: false,
            acl_group_id: DEFAULT_ACL_GROUP_ID,
            max_label_stack_depth: 9,
        }
    }
}

impl WarmBootConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
