//! Steady-state registry of what the running generation programmed.
//!
//! Resource managers record every object they create or keep. Before a
//! planned restart, [`WarmBootState::capture`] turns the registry into the
//! snapshot the next generation restores from.

use crate::key::{EcmpKey, LabelStack, NextHopKey, QosMapType};
use crate::snapshot::{
    EcmpHostRecord, EcmpRecord, HostRecord, HostTable, IntfRecord, MplsNextHopRecord,
    QosPolicyRecord, WarmBootSnapshot, SNAPSHOT_VERSION,
};
use chrono::Utc;
use sonic_hw::{EcmpHandle, EgressHandle, L3IntfHandle, QosMapHandle, TrunkHandle, VrfId};
use sonic_types::{AggregatePortId, IpAddress, VlanId};
use std::collections::BTreeMap;

const SOURCE: &str = "WarmBootState";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct MplsKey {
    vrf: VrfId,
    ip: IpAddress,
    intf: u32,
    labels: LabelStack,
}

#[derive(Debug, Clone, Copy)]
struct HostBinding {
    egress: EgressHandle,
    class_id: Option<u32>,
}

/// Live-state registry for one hardware unit.
#[derive(Debug, Clone, Default)]
pub struct WarmBootState {
    hosts: BTreeMap<NextHopKey, HostBinding>,
    ecmp_hosts: BTreeMap<(VrfId, EcmpHandle), EcmpKey>,
    ecmps: BTreeMap<EcmpHandle, EcmpKey>,
    mpls_next_hops: BTreeMap<MplsKey, EgressHandle>,
    intfs: BTreeMap<VlanId, L3IntfHandle>,
    qos_policies: BTreeMap<String, QosPolicyRecord>,
    trunks: BTreeMap<AggregatePortId, TrunkHandle>,
}

impl WarmBootState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resolved next hop. `intf` is only kept for IPv6 link-local
    /// addresses.
    pub fn add_host(
        &mut self,
        vrf: VrfId,
        ip: IpAddress,
        intf: Option<u64>,
        egress: EgressHandle,
        class_id: Option<u32>,
    ) {
        self.hosts
            .insert(NextHopKey::new(vrf, ip, intf), HostBinding { egress, class_id });
    }

    /// Returns whether the host was known.
    pub fn remove_host(&mut self, vrf: VrfId, ip: IpAddress, intf: Option<u64>) -> bool {
        self.hosts.remove(&NextHopKey::new(vrf, ip, intf)).is_some()
    }

    /// Records an ECMP next hop of the host table.
    pub fn add_ecmp_host(&mut self, vrf: VrfId, ecmp: EcmpHandle, paths: EcmpKey) {
        self.ecmp_hosts.insert((vrf, ecmp), paths);
    }

    /// Records an ECMP group with its full logical membership, including
    /// members whose links are down.
    pub fn add_ecmp(&mut self, ecmp: EcmpHandle, paths: EcmpKey) {
        self.ecmps.insert(ecmp, paths);
    }

    pub fn remove_ecmp(&mut self, ecmp: EcmpHandle) -> bool {
        self.ecmp_hosts.retain(|(_, group), _| *group != ecmp);
        self.ecmps.remove(&ecmp).is_some()
    }

    pub fn add_mpls_next_hop(
        &mut self,
        vrf: VrfId,
        ip: IpAddress,
        intf: u32,
        labels: LabelStack,
        egress: EgressHandle,
    ) {
        self.mpls_next_hops.insert(
            MplsKey {
                vrf,
                ip,
                intf,
                labels,
            },
            egress,
        );
    }

    pub fn remove_mpls_next_hop(
        &mut self,
        vrf: VrfId,
        ip: IpAddress,
        intf: u32,
        labels: LabelStack,
    ) -> bool {
        self.mpls_next_hops
            .remove(&MplsKey {
                vrf,
                ip,
                intf,
                labels,
            })
            .is_some()
    }

    pub fn add_intf(&mut self, vlan: VlanId, intf: L3IntfHandle) {
        self.intfs.insert(vlan, intf);
    }

    pub fn remove_intf(&mut self, vlan: VlanId) -> bool {
        self.intfs.remove(&vlan).is_some()
    }

    /// Records the map a policy uses in one role. Egress IP maps are not
    /// supported by the hardware and are not recorded.
    pub fn add_qos_policy(&mut self, policy: &str, map_type: QosMapType, map: QosMapHandle) {
        let record = self.qos_policies.entry(policy.to_string()).or_default();
        let id = Some(map.as_raw());
        match map_type {
            QosMapType::IpIngress => record.in_dscp = id,
            QosMapType::MplsIngress => record.in_exp = id,
            QosMapType::MplsEgress => record.out_exp = id,
            QosMapType::IpEgress => {
                crate::warn_log!(SOURCE, policy = %policy, "egress ip qos maps are not recorded");
            }
        }
    }

    pub fn remove_qos_policy(&mut self, policy: &str) -> bool {
        self.qos_policies.remove(policy).is_some()
    }

    pub fn add_trunk(&mut self, agg: AggregatePortId, trunk: TrunkHandle) {
        self.trunks.insert(agg, trunk);
    }

    pub fn remove_trunk(&mut self, agg: AggregatePortId) -> bool {
        self.trunks.remove(&agg).is_some()
    }

    /// Builds the snapshot for the next generation.
    pub fn capture(&self) -> WarmBootSnapshot {
        let hosts = self
            .hosts
            .iter()
            .map(|(key, binding)| HostRecord {
                vrf: key.vrf,
                ip: key.ip,
                intf: key.intf,
                egress_id: Some(binding.egress.as_raw()),
                class_id: binding.class_id,
            })
            .collect();
        let ecmp_hosts = self
            .ecmp_hosts
            .iter()
            .map(|((vrf, ecmp), paths)| EcmpHostRecord {
                vrf: *vrf,
                ecmp_egress_id: Some(ecmp.as_raw()),
                paths: raw_paths(paths),
            })
            .collect();
        let ecmp_objects = self
            .ecmps
            .iter()
            .map(|(ecmp, paths)| EcmpRecord {
                ecmp_egress_id: Some(ecmp.as_raw()),
                paths: raw_paths(paths),
            })
            .collect();
        let mpls_next_hops = self
            .mpls_next_hops
            .iter()
            .map(|(key, egress)| {
                let (label, stack) = match &key.labels {
                    LabelStack::Label(label) => (Some(*label), None),
                    LabelStack::Stack(stack) => (None, Some(stack.clone())),
                };
                MplsNextHopRecord {
                    vrf: key.vrf,
                    ip: key.ip,
                    intf: key.intf,
                    egress_id: Some(egress.as_raw()),
                    label,
                    stack,
                }
            })
            .collect();
        let intf_table = self
            .intfs
            .iter()
            .map(|(vlan, intf)| IntfRecord {
                vlan: *vlan,
                intf_id: intf.as_raw(),
            })
            .collect();

        let snapshot = WarmBootSnapshot {
            version: SNAPSHOT_VERSION,
            captured_at: Some(Utc::now()),
            host_table: HostTable { hosts, ecmp_hosts },
            ecmp_objects,
            trunks: self
                .trunks
                .iter()
                .map(|(agg, trunk)| (*agg, trunk.as_raw()))
                .collect(),
            mpls_next_hops,
            intf_table,
            qos_policy_table: self.qos_policies.clone(),
        };
        crate::info_log!(SOURCE, sections = ?snapshot.section_counts(), "captured warm boot state");
        snapshot
    }
}

fn raw_paths(paths: &EcmpKey) -> Vec<u64> {
    paths.members().iter().map(|egress| egress.as_raw()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn egress(raw: u64) -> EgressHandle {
        EgressHandle::from_raw(raw).unwrap()
    }

    #[test]
    fn test_capture_is_valid_snapshot() {
        let mut state = WarmBootState::new();
        state.add_host(0, IpAddress::v4(10, 0, 0, 1), None, egress(11), Some(2));
        state.add_host(0, "fe80::1".parse().unwrap(), Some(3), egress(12), None);
        state.add_ecmp(
            EcmpHandle::from_raw(20).unwrap(),
            [egress(11), egress(12)].into_iter().collect(),
        );
        state.add_mpls_next_hop(
            0,
            IpAddress::v4(10, 0, 0, 9),
            5,
            LabelStack::Stack(vec![100, 200]),
            egress(13),
        );
        state.add_intf(VlanId::new(10).unwrap(), L3IntfHandle::from_raw(30).unwrap());
        state.add_qos_policy(
            "default",
            QosMapType::MplsEgress,
            QosMapHandle::from_raw(40).unwrap(),
        );
        state.add_trunk(AggregatePortId(1), TrunkHandle::from_raw(50).unwrap());

        let snapshot = state.capture();
        snapshot.validate().unwrap();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert!(snapshot.captured_at.is_some());
        assert_eq!(snapshot.host_table.hosts.len(), 2);
        assert_eq!(snapshot.ecmp_objects[0].paths, vec![11, 12]);
        assert_eq!(snapshot.mpls_next_hops[0].stack, Some(vec![100, 200]));
        assert_eq!(snapshot.mpls_next_hops[0].label, None);
        assert_eq!(snapshot.qos_policy_table["default"].out_exp, Some(40));
        assert_eq!(snapshot.trunks.get(&AggregatePortId(1)), Some(&50));

        let json = snapshot.to_json_pretty().unwrap();
        assert_eq!(WarmBootSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_removal() {
        let mut state = WarmBootState::new();
        let ip = IpAddress::v4(10, 0, 0, 1);
        state.add_host(0, ip, None, egress(11), None);
        // A non link-local host ignores the interface.
        assert!(state.remove_host(0, ip, Some(7)));
        assert!(!state.remove_host(0, ip, None));

        let ecmp = EcmpHandle::from_raw(20).unwrap();
        state.add_ecmp_host(0, ecmp, [egress(11)].into_iter().collect());
        state.add_ecmp(ecmp, [egress(11)].into_iter().collect());
        assert!(state.remove_ecmp(ecmp));
        let snapshot = state.capture();
        assert!(snapshot.host_table.ecmp_hosts.is_empty());
        assert!(snapshot.ecmp_objects.is_empty());
    }
}
