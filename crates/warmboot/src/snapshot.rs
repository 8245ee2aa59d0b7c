//! Persisted warm-boot document.
//!
//! The snapshot records what the previous generation believed was live and
//! which hardware handle backs each logical object. Every section is optional
//! on disk: a document written by an older release simply lacks the newer
//! sections and loads with them empty.
//!
//! Structural checks run once in [`WarmBootSnapshot::validate`]; code that
//! consumes a validated snapshot does not re-check field presence.

use crate::error::{Result, WarmBootError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sonic_hw::VrfId;
use sonic_types::{AggregatePortId, IpAddress, VlanId};
use std::collections::{BTreeMap, BTreeSet};

const SOURCE: &str = "WarmBootSnapshot";

/// Schema version written by this release.
pub const SNAPSHOT_VERSION: u32 = 2;

/// A host table record: a resolved next hop and the egress backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub vrf: VrfId,
    pub ip: IpAddress,
    /// Interface id; only meaningful for IPv6 link-local next hops.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intf: Option<u64>,
    /// Absent when the host was never programmed. Such records are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
}

/// An ECMP next hop recorded by the host table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcmpHostRecord {
    pub vrf: VrfId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecmp_egress_id: Option<u64>,
    #[serde(default)]
    pub paths: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostTable {
    pub hosts: Vec<HostRecord>,
    pub ecmp_hosts: Vec<EcmpHostRecord>,
}

/// An ECMP group with its full logical membership, including paths whose
/// links were down at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcmpRecord {
    pub ecmp_egress_id: Option<u64>,
    #[serde(default)]
    pub paths: Vec<u64>,
}

/// An MPLS next hop. Exactly one of `label` and `stack` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MplsNextHopRecord {
    pub vrf: VrfId,
    pub ip: IpAddress,
    pub intf: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egress_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntfRecord {
    pub vlan: VlanId,
    pub intf_id: u64,
}

/// Map ids programmed for one QoS policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QosPolicyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_dscp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_exp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_exp: Option<u64>,
}

/// The warm-boot document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmBootSnapshot {
    /// Zero for documents that predate versioning.
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    pub host_table: HostTable,
    /// ECMP membership saved by the cache itself, for exits before a FIB sync.
    pub ecmp_objects: Vec<EcmpRecord>,
    pub trunks: BTreeMap<AggregatePortId, u64>,
    pub mpls_next_hops: Vec<MplsNextHopRecord>,
    pub intf_table: Vec<IntfRecord>,
    pub qos_policy_table: BTreeMap<String, QosPolicyRecord>,
}

impl WarmBootSnapshot {
    /// An empty document at the current version, as used for a cold boot.
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            ..Default::default()
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(text)
            .map_err(|e| WarmBootError::invalid_snapshot(format!("parse error: {}", e)))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WarmBootError::invalid_snapshot(format!("serialize error: {}", e)))
    }

    /// Checks the structural rules that the schema alone cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.version > SNAPSHOT_VERSION {
            crate::warn_log!(
                SOURCE,
                version = self.version,
                supported = SNAPSHOT_VERSION,
                "snapshot written by a newer release, unknown fields are ignored"
            );
        }

        for (i, ecmp) in self.ecmp_objects.iter().enumerate() {
            match ecmp.ecmp_egress_id {
                None | Some(0) => {
                    return Err(WarmBootError::invalid_snapshot(format!(
                        "ecmp_objects[{}] has no ecmp egress id",
                        i
                    )))
                }
                Some(_) => {}
            }
            if ecmp.paths.contains(&0) {
                return Err(WarmBootError::invalid_snapshot(format!(
                    "ecmp_objects[{}] has a null path",
                    i
                )));
            }
        }

        for (i, nh) in self.mpls_next_hops.iter().enumerate() {
            match (&nh.label, &nh.stack) {
                (Some(_), None) => {}
                (None, Some(stack)) if !stack.is_empty() => {}
                (None, Some(_)) => {
                    return Err(WarmBootError::invalid_snapshot(format!(
                        "mpls_next_hops[{}] has an empty label stack",
                        i
                    )))
                }
                _ => {
                    return Err(WarmBootError::invalid_snapshot(format!(
                        "mpls_next_hops[{}] must carry exactly one of label and stack",
                        i
                    )))
                }
            }
        }

        let mut vlans = BTreeSet::new();
        for record in &self.intf_table {
            if record.intf_id == 0 {
                return Err(WarmBootError::invalid_snapshot(format!(
                    "intf_table entry for vlan {} has a null interface id",
                    record.vlan
                )));
            }
            if !vlans.insert(record.vlan) {
                return Err(WarmBootError::invalid_snapshot(format!(
                    "intf_table lists vlan {} twice",
                    record.vlan
                )));
            }
        }

        if let Some((agg, _)) = self.trunks.iter().find(|(_, id)| **id == 0) {
            return Err(WarmBootError::invalid_snapshot(format!(
                "trunk for {} has a null id",
                agg
            )));
        }

        Ok(())
    }

    /// Per-section entry counts, for logging and inspection.
    pub fn section_counts(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("hosts", self.host_table.hosts.len()),
            ("ecmp_hosts", self.host_table.ecmp_hosts.len()),
            ("ecmp_objects", self.ecmp_objects.len()),
            ("trunks", self.trunks.len()),
            ("mpls_next_hops", self.mpls_next_hops.len()),
            ("intf_table", self.intf_table.len()),
            ("qos_policy_table", self.qos_policy_table.len()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_document_without_newer_sections() {
        let snapshot = WarmBootSnapshot::from_json(
            r#"{
                "host_table": {
                    "hosts": [
                        {"vrf": 0, "ip": "10.0.0.2", "egress_id": 100003}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert_eq!(snapshot.version, 0);
        assert_eq!(snapshot.host_table.hosts.len(), 1);
        assert!(snapshot.mpls_next_hops.is_empty());
        assert!(snapshot.intf_table.is_empty());
        assert!(snapshot.qos_policy_table.is_empty());
    }

    #[test]
    fn test_unparseable_document_is_invalid() {
        let err = WarmBootSnapshot::from_json("{ not json").unwrap_err();
        assert!(matches!(err, WarmBootError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_null_ecmp_id_is_invalid() {
        let err = WarmBootSnapshot::from_json(
            r#"{"ecmp_objects": [{"ecmp_egress_id": null, "paths": [1, 2]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ecmp_objects[0]"));
    }

    #[test]
    fn test_mpls_record_needs_exactly_one_label_form() {
        let both = r#"{"mpls_next_hops": [
            {"vrf": 0, "ip": "10.0.0.1", "intf": 5, "egress_id": 7, "label": 100, "stack": [1]}
        ]}"#;
        assert!(WarmBootSnapshot::from_json(both).is_err());

        let neither = r#"{"mpls_next_hops": [
            {"vrf": 0, "ip": "10.0.0.1", "intf": 5, "egress_id": 7}
        ]}"#;
        assert!(WarmBootSnapshot::from_json(neither).is_err());

        let stack = r#"{"mpls_next_hops": [
            {"vrf": 0, "ip": "10.0.0.1", "intf": 5, "egress_id": 7, "stack": [100, 200]}
        ]}"#;
        assert!(WarmBootSnapshot::from_json(stack).is_ok());
    }

    #[test]
    fn test_duplicate_intf_vlan_is_invalid() {
        let err = WarmBootSnapshot::from_json(
            r#"{"intf_table": [{"vlan": 10, "intf_id": 1}, {"vlan": 10, "intf_id": 2}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("vlan 10"));
    }

    #[test]
    fn test_newer_version_is_accepted() {
        let snapshot =
            WarmBootSnapshot::from_json(r#"{"version": 99, "future_section": [1, 2, 3]}"#)
                .unwrap();
        assert_eq!(snapshot.version, 99);
    }

    #[test]
    fn test_trunk_keys_round_trip() {
        let mut snapshot = WarmBootSnapshot::empty();
        snapshot.trunks.insert(AggregatePortId(3), 100_020);
        let json = snapshot.to_json_pretty().unwrap();
        let back = WarmBootSnapshot::from_json(&json).unwrap();
        assert_eq!(back.trunks.get(&AggregatePortId(3)), Some(&100_020));
    }
}
