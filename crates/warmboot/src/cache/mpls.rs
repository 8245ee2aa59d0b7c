//! MPLS label-switch actions, tunnel initiators and labeled next hops.

use super::scan::traverse;
use super::{WarmBootCache, SOURCE};
use crate::error::Result;
use crate::key::{LabeledHostKey, ResourceClass, TunnelKey};
use sonic_hw::{EgressHandle, HwScanner, L3IntfHandle, LabelSwitchEntry, LabelSwitchHandle};
use sonic_types::VlanId;

impl WarmBootCache {
    pub(super) fn scan_label_switch_actions<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        traverse(
            ResourceClass::LabelSwitchAction,
            |visit| hw.label_switch_actions(visit),
            |entry| self.ingest_label_switch(entry),
        )
    }

    fn ingest_label_switch(&mut self, entry: &LabelSwitchEntry) -> Result<()> {
        crate::debug_log!(
            SOURCE,
            label = entry.label,
            action = %entry.action,
            handle = entry.handle.as_raw(),
            "found label switch action"
        );
        self.label_actions.register(entry.label, entry.handle)?;
        self.register_owner(
            ResourceClass::LabelSwitchAction,
            &entry.label,
            entry.handle.as_raw(),
        )
    }

    pub fn find_label_switch_action(&self, label: u32) -> Option<LabelSwitchHandle> {
        self.label_actions.find(&label)
    }

    /// The tunnel initiator on `vlan` that pushes exactly `labels`.
    pub fn find_labeled_tunnel(&self, vlan: VlanId, labels: &[u32]) -> Option<L3IntfHandle> {
        self.tunnels.find(&TunnelKey {
            vlan,
            labels: labels.to_vec(),
        })
    }

    /// Resolves an MPLS next hop recorded in the snapshot to its egress.
    pub fn find_egress_from_labeled_host_key(&self, key: &LabeledHostKey) -> Option<EgressHandle> {
        let egress = self.labeled_egress.get(key)?;
        self.egresses.find(egress)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::WarmBootConfig;
    use crate::key::{LabelStack, LabeledHostKey, ResourceKey, TunnelKey};
    use crate::snapshot::{MplsNextHopRecord, WarmBootSnapshot};
    use crate::WarmBootCache;
    use pretty_assertions::assert_eq;
    use sonic_hw::{LabelAction, RouteTarget, SimHardware};
    use sonic_types::{IpAddress, MacAddress, PortId, VlanId};

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0x02, 0, 0, 0, 0, last])
    }

    #[test]
    fn test_tunnel_found_once_through_many_egresses() {
        let vlan = VlanId::new(20).unwrap();
        let mut hw = SimHardware::new();
        hw.create_vlan(vlan, &[], &[PortId(1)]).unwrap();
        let plain = hw.create_l3_intf(vlan, mac(1)).unwrap();
        let tunnel = hw.create_l3_intf(vlan, mac(1)).unwrap();
        hw.set_tunnel_initiator(tunnel, vec![100, 200]).unwrap();
        let e1 = hw.create_mpls_egress(tunnel, mac(5), PortId(1), 300).unwrap();
        let e2 = hw.create_mpls_egress(tunnel, mac(6), PortId(1), 301).unwrap();
        let swap = hw
            .add_label_switch(1000, LabelAction::Swap(1001), Some(RouteTarget::Egress(e1)))
            .unwrap();

        let mut snapshot = WarmBootSnapshot::empty();
        for (egress, ip) in [(e1, IpAddress::v4(10, 0, 0, 1)), (e2, IpAddress::v4(10, 0, 0, 2))] {
            snapshot.mpls_next_hops.push(MplsNextHopRecord {
                vrf: 0,
                ip,
                intf: 20,
                egress_id: Some(egress.as_raw()),
                label: None,
                stack: Some(vec![100, 200]),
            });
        }

        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&snapshot).unwrap();
        cache.scan(&hw).unwrap();

        assert_eq!(cache.find_labeled_tunnel(vlan, &[100, 200]), Some(tunnel));
        assert_eq!(cache.find_labeled_tunnel(vlan, &[100]), None);
        assert_eq!(cache.tunnels.len(), 1);
        assert_eq!(cache.find_intf(vlan, mac(1)), Some(plain));
        assert_eq!(cache.find_label_switch_action(1000), Some(swap));

        let key = LabeledHostKey {
            vrf: 0,
            labels: LabelStack::Stack(vec![100, 200]),
            ip: IpAddress::v4(10, 0, 0, 2),
            intf: 20,
        };
        assert_eq!(cache.find_egress_from_labeled_host_key(&key), Some(e2));

        let tunnel_key = ResourceKey::TunnelInitiator(TunnelKey {
            vlan,
            labels: vec![100, 200],
        });
        assert_eq!(cache.find(&tunnel_key), Some(tunnel.as_raw()));
    }

    #[test]
    fn test_missing_mpls_section_misses() {
        let snapshot = WarmBootSnapshot::from_json(r#"{"host_table": {"hosts": []}}"#).unwrap();
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&snapshot).unwrap();
        cache.scan(&SimHardware::new()).unwrap();

        let key = LabeledHostKey {
            vrf: 0,
            labels: LabelStack::Label(100),
            ip: IpAddress::v4(10, 0, 0, 1),
            intf: 1,
        };
        assert_eq!(cache.find_egress_from_labeled_host_key(&key), None);
        assert_eq!(cache.find(&ResourceKey::LabelSwitchAction(100)), None);
    }
}
