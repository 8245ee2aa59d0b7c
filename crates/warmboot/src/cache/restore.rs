//! Snapshot ingestion.

use super::{WarmBootCache, SOURCE};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::error::{Result, WarmBootError};
use crate::key::{EcmpKey, LabelStack, LabeledHostKey, NextHopKey, QosMapType};
use crate::snapshot::WarmBootSnapshot;
use sonic_hw::{EcmpHandle, EgressHandle, L3IntfHandle, QosMapHandle, TrunkHandle};

impl WarmBootCache {
    /// Indexes the logical keys recorded by the previous generation.
    ///
    /// Sections missing from the document are treated as empty. Only
    /// structural problems fail, with [`WarmBootError::InvalidSnapshot`].
    pub fn restore(&mut self, snapshot: &WarmBootSnapshot) -> Result<()> {
        snapshot.validate()?;

        // ECMP membership comes from both the host table and the cache's own
        // record, which covers exits before the first FIB sync.
        for record in &snapshot.host_table.ecmp_hosts {
            let Some(ecmp) = record.ecmp_egress_id.and_then(EcmpHandle::from_raw) else {
                continue;
            };
            self.add_ecmp_paths(ecmp, &record.paths);
        }
        for record in &snapshot.ecmp_objects {
            if let Some(ecmp) = record.ecmp_egress_id.and_then(EcmpHandle::from_raw) {
                self.add_ecmp_paths(ecmp, &record.paths);
            }
        }
        for (ecmp, paths) in &self.ecmp_paths {
            crate::debug_log!(SOURCE, ecmp = %ecmp, paths = %paths, "restored ecmp membership");
        }

        for (agg, id) in &snapshot.trunks {
            if let Some(trunk) = TrunkHandle::from_raw(*id) {
                self.snapshot_trunks.insert(*agg, trunk);
            }
        }

        for record in &snapshot.host_table.hosts {
            let Some(egress) = record.egress_id.and_then(EgressHandle::from_raw) else {
                continue;
            };
            let key = NextHopKey::new(record.vrf, record.ip, record.intf);
            if self.host_egress.insert(key, egress).is_some() {
                return Err(WarmBootError::invalid_snapshot(format!(
                    "host table lists {} twice",
                    key
                )));
            }
            self.snapshot_egress_ids.insert(egress);
            if let Some(class_id) = record.class_id {
                self.host_class_ids.insert(key, class_id);
            }
            crate::debug_log!(SOURCE, next_hop = %key, egress = %egress, "restored host");
        }

        for record in &snapshot.mpls_next_hops {
            let Some(egress) = record.egress_id.and_then(EgressHandle::from_raw) else {
                continue;
            };
            let labels = match (&record.label, &record.stack) {
                (Some(label), _) => LabelStack::Label(*label),
                (None, Some(stack)) => {
                    if stack.len() > self.config.max_label_stack_depth {
                        return Err(WarmBootError::invalid_snapshot(format!(
                            "label stack of {} next hop {} is {} deep, limit is {}",
                            record.vrf,
                            record.ip,
                            stack.len(),
                            self.config.max_label_stack_depth
                        )));
                    }
                    LabelStack::Stack(stack.clone())
                }
                (None, None) => {
                    return Err(WarmBootError::invalid_snapshot(format!(
                        "mpls next hop {} has no label",
                        record.ip
                    )))
                }
            };
            let key = LabeledHostKey {
                vrf: record.vrf,
                labels,
                ip: record.ip,
                intf: record.intf,
            };
            if self.labeled_egress.contains_key(&key) {
                return Err(WarmBootError::invalid_snapshot(format!(
                    "mpls next hops list {} twice",
                    key
                )));
            }
            self.snapshot_egress_ids.insert(egress);
            self.labeled_egress.insert(key, egress);
        }

        for record in &snapshot.intf_table {
            if let Some(intf) = L3IntfHandle::from_raw(record.intf_id) {
                self.snapshot_intfs.insert(record.vlan, intf);
            }
        }

        for (policy, record) in &snapshot.qos_policy_table {
            let bindings = [
                (QosMapType::IpIngress, record.in_dscp),
                (QosMapType::MplsIngress, record.in_exp),
                (QosMapType::MplsEgress, record.out_exp),
            ];
            for (map_type, id) in bindings {
                if let Some(map) = id.and_then(QosMapHandle::from_raw) {
                    self.qos_policies.insert((policy.clone(), map_type), map);
                }
            }
        }

        let counts = snapshot.section_counts();
        crate::info_log!(SOURCE, version = snapshot.version, "restored warm boot snapshot");
        crate::audit_log!(AuditRecord::new(AuditCategory::WarmRestart, SOURCE, "restore")
            .with_outcome(AuditOutcome::Success)
            .with_details(serde_json::json!({
                "version": snapshot.version,
                "sections": counts,
            })));
        Ok(())
    }

    fn add_ecmp_paths(&mut self, ecmp: EcmpHandle, paths: &[u64]) {
        let entry = self.ecmp_paths.entry(ecmp).or_insert_with(EcmpKey::default);
        for path in paths.iter().copied().filter_map(EgressHandle::from_raw) {
            entry.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarmBootConfig;
    use crate::snapshot::{EcmpHostRecord, EcmpRecord, HostRecord, MplsNextHopRecord};
    use pretty_assertions::assert_eq;
    use sonic_types::IpAddress;

    fn egress(raw: u64) -> EgressHandle {
        EgressHandle::from_raw(raw).unwrap()
    }

    #[test]
    fn test_ecmp_paths_merge_both_sources() {
        let mut snapshot = WarmBootSnapshot::empty();
        snapshot.host_table.ecmp_hosts.push(EcmpHostRecord {
            vrf: 0,
            ecmp_egress_id: Some(500),
            paths: vec![1, 2],
        });
        snapshot.host_table.ecmp_hosts.push(EcmpHostRecord {
            vrf: 0,
            ecmp_egress_id: None,
            paths: vec![9],
        });
        snapshot.ecmp_objects.push(EcmpRecord {
            ecmp_egress_id: Some(500),
            paths: vec![3],
        });

        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&snapshot).unwrap();

        let paths = cache
            .paths_for_ecmp(EcmpHandle::from_raw(500).unwrap())
            .unwrap();
        assert_eq!(
            paths,
            &[egress(1), egress(2), egress(3)].into_iter().collect::<EcmpKey>()
        );
        assert_eq!(cache.ecmp_paths.len(), 1);
    }

    #[test]
    fn test_hosts_without_egress_are_skipped() {
        let mut snapshot = WarmBootSnapshot::empty();
        snapshot.host_table.hosts.push(HostRecord {
            vrf: 0,
            ip: IpAddress::v4(10, 0, 0, 1),
            intf: None,
            egress_id: None,
            class_id: None,
        });
        snapshot.host_table.hosts.push(HostRecord {
            vrf: 0,
            ip: "fe80::1".parse().unwrap(),
            intf: Some(4),
            egress_id: Some(77),
            class_id: Some(10),
        });

        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&snapshot).unwrap();
        assert_eq!(cache.host_egress.len(), 1);
        assert!(cache.snapshot_egress_ids.contains(&egress(77)));
        assert_eq!(
            cache.host_class_id(0, "fe80::1".parse().unwrap(), Some(4)),
            Some(10)
        );
        // Link-local next hops are keyed by interface.
        assert_eq!(
            cache.host_class_id(0, "fe80::1".parse().unwrap(), Some(5)),
            None
        );
    }

    #[test]
    fn test_label_stack_deeper_than_asic_limit() {
        let mut snapshot = WarmBootSnapshot::empty();
        snapshot.mpls_next_hops.push(MplsNextHopRecord {
            vrf: 0,
            ip: IpAddress::v4(10, 0, 0, 1),
            intf: 5,
            egress_id: Some(9),
            label: None,
            stack: Some(vec![1, 2, 3]),
        });
        let config = WarmBootConfig {
            max_label_stack_depth: 2,
            ..WarmBootConfig::default()
        };
        let mut cache = WarmBootCache::new(config);
        let err = cache.restore(&snapshot).unwrap_err();
        assert!(matches!(err, WarmBootError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_qos_policy_bindings() {
        let mut snapshot = WarmBootSnapshot::empty();
        snapshot.qos_policy_table.insert(
            "default".to_string(),
            crate::snapshot::QosPolicyRecord {
                in_dscp: Some(40),
                in_exp: None,
                out_exp: Some(41),
            },
        );
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&snapshot).unwrap();
        assert_eq!(cache.qos_policies.len(), 2);
        assert_eq!(
            cache
                .qos_policies
                .get(&("default".to_string(), QosMapType::MplsEgress)),
            Some(&QosMapHandle::from_raw(41).unwrap())
        );
    }
}
