//! QoS maps bound to policies.

use super::scan::traverse;
use super::{WarmBootCache, SOURCE};
use crate::error::{Result, WarmBootError};
use crate::key::{QosMapType, ResourceClass};
use sonic_hw::{HwScanner, QosMapEntry, QosMapFlags, QosMapHandle, QosRule};
use std::collections::BTreeSet;

fn map_type(flags: QosMapFlags) -> Option<QosMapType> {
    if flags.contains(QosMapFlags::INGRESS.union(QosMapFlags::L3)) {
        Some(QosMapType::IpIngress)
    } else if flags.contains(QosMapFlags::INGRESS.union(QosMapFlags::MPLS)) {
        Some(QosMapType::MplsIngress)
    } else if flags.contains(QosMapFlags::EGRESS.union(QosMapFlags::MPLS)) {
        Some(QosMapType::MplsEgress)
    } else {
        None
    }
}

impl WarmBootCache {
    pub(super) fn scan_qos_maps<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        traverse(
            ResourceClass::QosMap,
            |visit| hw.qos_maps(visit),
            |entry| self.ingest_qos_map(entry),
        )?;

        for ((policy, map_type), map) in &self.qos_policies {
            if !self.qos_maps.contains_handle(*map) {
                crate::error_log!(
                    SOURCE,
                    policy = %policy,
                    map_type = %map_type,
                    map = map.as_raw(),
                    "policy bound to a qos map missing from hardware"
                );
                return Err(WarmBootError::DanglingReference {
                    class: ResourceClass::QosMap,
                    handle: map.as_raw(),
                });
            }
        }
        Ok(())
    }

    fn ingest_qos_map(&mut self, entry: &QosMapEntry) -> Result<()> {
        let raw = entry.handle.as_raw();
        let Some(map_type) = map_type(entry.flags) else {
            crate::warn_log!(
                SOURCE,
                map = raw,
                flags = %entry.flags,
                "ignoring qos map of unknown type"
            );
            return Ok(());
        };
        crate::debug_log!(
            SOURCE,
            map = raw,
            map_type = %map_type,
            rules = entry.rules.len(),
            "found qos map"
        );
        self.register_owner(ResourceClass::QosMap, &entry.handle, raw)?;
        self.qos_maps.register(entry.handle, entry.handle)?;
        self.qos_map_rules
            .insert(entry.handle, (map_type, entry.rules.clone()));
        Ok(())
    }

    /// The map `policy` used for `map_type`, if hardware still holds it with
    /// exactly `rules`.
    pub fn find_qos_map(
        &self,
        policy: &str,
        map_type: QosMapType,
        rules: &BTreeSet<QosRule>,
    ) -> Option<QosMapHandle> {
        if map_type == QosMapType::IpEgress {
            crate::warn_log!(SOURCE, policy = %policy, "egress ip qos maps are not supported");
            return None;
        }
        let map = self
            .qos_policies
            .get(&(policy.to_string(), map_type))
            .copied()?;
        let map = self.qos_maps.find(&map)?;
        match self.qos_map_rules.get(&map) {
            Some((found_type, found_rules)) if *found_type == map_type && found_rules == rules => {
                Some(map)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarmBootConfig;
    use crate::key::ResourceKey;
    use crate::snapshot::{QosPolicyRecord, WarmBootSnapshot};
    use pretty_assertions::assert_eq;
    use sonic_hw::SimHardware;

    fn rules(pairs: &[(u16, u8)]) -> BTreeSet<QosRule> {
        pairs.iter().map(|(tc, attr)| QosRule::new(*tc, *attr)).collect()
    }

    fn bound(policy: &str, in_dscp: Option<u64>, out_exp: Option<u64>) -> WarmBootSnapshot {
        let mut snapshot = WarmBootSnapshot::empty();
        snapshot.qos_policy_table.insert(
            policy.to_string(),
            QosPolicyRecord {
                in_dscp,
                in_exp: None,
                out_exp,
            },
        );
        snapshot
    }

    #[test]
    fn test_flags_classification() {
        let ingress_l3 = QosMapFlags::INGRESS.union(QosMapFlags::L3);
        assert_eq!(map_type(ingress_l3), Some(QosMapType::IpIngress));
        assert_eq!(
            map_type(QosMapFlags::EGRESS.union(QosMapFlags::MPLS)),
            Some(QosMapType::MplsEgress)
        );
        assert_eq!(map_type(QosMapFlags::EGRESS.union(QosMapFlags::L3)), None);
    }

    #[test]
    fn test_rules_must_match_exactly() {
        let mut hw = SimHardware::new();
        let dscp = hw.create_qos_map(
            QosMapFlags::INGRESS.union(QosMapFlags::L3),
            rules(&[(0, 0), (1, 8)]),
        );
        let exp = hw.create_qos_map(
            QosMapFlags::EGRESS.union(QosMapFlags::MPLS),
            rules(&[(0, 1)]),
        );

        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache
            .restore(&bound("default", Some(dscp.as_raw()), Some(exp.as_raw())))
            .unwrap();
        cache.scan(&hw).unwrap();

        let wanted = rules(&[(0, 0), (1, 8)]);
        assert_eq!(
            cache.find_qos_map("default", QosMapType::IpIngress, &wanted),
            Some(dscp)
        );
        assert_eq!(
            cache.find_qos_map("default", QosMapType::IpIngress, &rules(&[(0, 0)])),
            None
        );
        assert_eq!(
            cache.find_qos_map("other", QosMapType::IpIngress, &wanted),
            None
        );
        assert_eq!(
            cache.find_qos_map("default", QosMapType::IpEgress, &wanted),
            None
        );

        let key = ResourceKey::QosMap {
            policy: "default".to_string(),
            map_type: QosMapType::MplsEgress,
            rules: rules(&[(0, 1)]),
        };
        assert_eq!(cache.find(&key), Some(exp.as_raw()));
        cache.mark_claimed(&key).unwrap();
    }

    #[test]
    fn test_policy_bound_to_missing_map() {
        let hw = SimHardware::new();
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&bound("default", Some(555), None)).unwrap();
        let err = cache.scan(&hw).unwrap_err();
        assert!(matches!(
            err,
            WarmBootError::DanglingReference {
                class: ResourceClass::QosMap,
                handle: 555,
            }
        ));
    }
}
