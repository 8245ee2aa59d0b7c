//! Warm boot integration tests
//!
//! Each test builds a simulated hardware unit the way a previous generation
//! would have left it, records the matching live state, and drives a boot
//! through the public API.

use pretty_assertions::assert_eq;
use sonic_hw::port_mirror_flags::{INGRESS, SFLOW};
use sonic_hw::sim::{SimOp, SimTable};
use sonic_hw::{
    learn_flags, EcmpHandle, EgressHandle, HostHandle, HwResult, HwScanner, L3IntfHandle,
    LabelAction, MirrorTunnel, QosMapFlags, QosMapHandle, QosRule, RouteHandle, RouteTarget,
    SimHardware, Visitor,
};
use sonic_types::{IpAddress, IpPrefix, MacAddress, PortId, VlanId};
use sonic_warmboot::{
    ClassCounts, EcmpKey, FileSnapshotStore, HostKey, HostRouteKey, IntfKey, LabelStack,
    LabeledHostKey, MirrorKey, MirroredPortKey, PrefixRouteKey, QosMapType, ResourceClass,
    ResourceKey, SnapshotStore, WarmBoot, WarmBootCache, WarmBootConfig, WarmBootError,
    WarmBootSnapshot, WarmBootState,
};
use std::collections::{BTreeMap, BTreeSet};
use tempfile::TempDir;

fn mac(last: u8) -> MacAddress {
    MacAddress::new([0x02, 0, 0, 0, 0, last])
}

fn vlan(id: u16) -> VlanId {
    VlanId::new(id).unwrap()
}

fn prefix(text: &str) -> IpPrefix {
    text.parse().unwrap()
}

/// A routed VLAN with three next hops load-balanced by one ECMP group.
struct Fabric {
    hw: SimHardware,
    state: WarmBootState,
    vlan: VlanId,
    intf: L3IntfHandle,
    egresses: Vec<EgressHandle>,
    hosts: Vec<(IpAddress, HostHandle)>,
    ecmp: EcmpHandle,
    host_route: RouteHandle,
    prefix_route: RouteHandle,
}

impl Fabric {
    fn new() -> Self {
        let mut hw = SimHardware::new();
        for port in 1..=4 {
            hw.add_port(PortId(port), learn_flags::ARL | learn_flags::FWD);
        }
        let vlan = vlan(10);
        hw.create_vlan(vlan, &[PortId(4)], &[PortId(1), PortId(2), PortId(3)])
            .unwrap();
        let intf = hw.create_l3_intf(vlan, mac(1)).unwrap();
        hw.create_station(vlan, mac(1)).unwrap();

        let mut state = WarmBootState::new();
        state.add_intf(vlan, intf);

        let mut egresses = Vec::new();
        let mut hosts = Vec::new();
        for i in 1..=3u8 {
            let ip = IpAddress::v4(10, 0, 0, i);
            let egress = hw
                .create_egress(intf, mac(10 + i), PortId(u32::from(i)))
                .unwrap();
            let host = hw.add_host(0, ip, egress, None).unwrap();
            state.add_host(0, ip, None, egress, None);
            egresses.push(egress);
            hosts.push((ip, host));
        }

        let ecmp = hw.create_ecmp(egresses.clone()).unwrap();
        state.add_ecmp(ecmp, egresses.iter().copied().collect());
        let prefix_route = hw
            .add_route(0, prefix("10.1.0.0/16"), RouteTarget::Ecmp(ecmp))
            .unwrap();
        let host_route = hw
            .add_route(0, prefix("10.0.0.1/32"), RouteTarget::Egress(egresses[0]))
            .unwrap();

        Self {
            hw,
            state,
            vlan,
            intf,
            egresses,
            hosts,
            ecmp,
            host_route,
            prefix_route,
        }
    }

    fn paths(&self) -> EcmpKey {
        self.egresses.iter().copied().collect()
    }

    /// Everything the new generation asks for when nothing changed.
    fn desired(&self) -> Vec<ResourceKey> {
        let mut keys = vec![
            ResourceKey::HostRoute(HostRouteKey {
                vrf: 0,
                ip: IpAddress::v4(10, 0, 0, 1),
            }),
            ResourceKey::PrefixRoute(PrefixRouteKey {
                vrf: 0,
                prefix: prefix("10.1.0.0/16"),
            }),
            ResourceKey::EcmpGroup(self.paths()),
            ResourceKey::Interface(IntfKey {
                vlan: self.vlan,
                mac: mac(1),
            }),
            ResourceKey::Station(self.vlan),
            ResourceKey::Vlan(self.vlan),
        ];
        for (ip, _) in &self.hosts {
            keys.push(ResourceKey::Host(HostKey { vrf: 0, ip: *ip }));
        }
        for egress in &self.egresses {
            keys.push(ResourceKey::Egress(*egress));
        }
        keys
    }

    fn cache(&self, snapshot: &WarmBootSnapshot) -> WarmBootCache {
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(snapshot).unwrap();
        cache.scan(&self.hw).unwrap();
        cache
    }
}

fn claim_all(cache: &mut WarmBootCache, keys: &[ResourceKey]) -> sonic_warmboot::Result<()> {
    for key in keys {
        assert!(cache.find(key).is_some(), "{} not found", key);
        cache.mark_claimed(key)?;
    }
    Ok(())
}

fn store_with(snapshot: Option<&WarmBootSnapshot>) -> (TempDir, FileSnapshotStore) {
    let dir = TempDir::new().unwrap();
    let store = FileSnapshotStore::new(dir.path().join("warmboot.json"));
    if let Some(snapshot) = snapshot {
        store.save(snapshot).unwrap();
    }
    (dir, store)
}

fn position(ops: &[SimOp], wanted: impl Fn(&SimOp) -> bool) -> usize {
    ops.iter().position(wanted).unwrap()
}

#[test]
fn test_capture_restore_round_trip() {
    let mut f = Fabric::new();
    let json = f.state.capture().to_json_pretty().unwrap();
    let snapshot = WarmBootSnapshot::from_json(&json).unwrap();
    let mut cache = f.cache(&snapshot);

    assert_eq!(
        cache.find(&ResourceKey::EcmpGroup(f.paths())),
        Some(f.ecmp.as_raw())
    );
    for ((ip, host), egress) in f.hosts.iter().zip(&f.egresses) {
        assert_eq!(cache.find_host(0, *ip), Some(*host));
        assert_eq!(cache.find_egress_from_host(0, *ip, None), Some(*egress));
    }
    assert_eq!(
        cache.find_host_route(0, IpAddress::v4(10, 0, 0, 1)),
        Some(f.host_route)
    );
    assert_eq!(
        cache.find_route(&PrefixRouteKey {
            vrf: 0,
            prefix: prefix("10.1.0.0/16"),
        }),
        Some(f.prefix_route)
    );
    assert_eq!(cache.find_intf(f.vlan, mac(1)), Some(f.intf));

    claim_all(&mut cache, &f.desired()).unwrap();
    let report = cache.clear(&mut f.hw).unwrap();

    assert_eq!(report.total_deleted(), 0);
    assert!(f.hw.op_log().is_empty());
    assert_eq!(
        report.counts(ResourceClass::Egress),
        ClassCounts {
            retained: 3,
            deleted: 0,
            cascaded: 0,
        }
    );
    // VLAN 10 was claimed, the default VLAN is always kept.
    assert_eq!(report.counts(ResourceClass::Vlan).retained, 2);
}

#[test]
fn test_ecmp_with_all_links_down_is_found_and_kept() {
    let mut f = Fabric::new();
    let snapshot = f.state.capture();
    for egress in f.egresses.clone() {
        f.hw.set_egress_link_down(egress);
    }

    let mut cache = f.cache(&snapshot);
    assert_eq!(cache.find_ecmp(&f.paths()), Some(f.ecmp));
    assert_eq!(cache.paths_for_ecmp(f.ecmp), Some(&f.paths()));

    claim_all(&mut cache, &f.desired()).unwrap();
    let report = cache.clear(&mut f.hw).unwrap();
    assert!(!report.deleted_handles().contains(&f.ecmp.as_raw()));
    assert!(f.hw.is_live(f.ecmp.as_raw()));
}

#[test]
fn test_double_wide_artifact_is_skipped() {
    let mut f = Fabric::new();
    let snapshot = f.state.capture();
    let artifact = f.hw.add_double_wide_artifact();

    let mut cache = f.cache(&snapshot);
    assert_eq!(cache.entry_counts()[&ResourceClass::EcmpGroup], 1);

    claim_all(&mut cache, &f.desired()).unwrap();
    let report = cache.clear(&mut f.hw).unwrap();
    assert!(!report.deleted_handles().contains(&artifact));
    assert_eq!(report.total_deleted(), 0);
}

#[test]
fn test_populated_ecmp_unknown_to_snapshot_is_unowned() {
    let mut f = Fabric::new();
    let snapshot = f.state.capture();
    let stray = f.hw.create_ecmp(vec![f.egresses[0]]).unwrap();

    let mut cache = WarmBootCache::new(WarmBootConfig::default());
    cache.restore(&snapshot).unwrap();
    let err = cache.scan(&f.hw).unwrap_err();
    assert!(matches!(err, WarmBootError::UnownedResource { .. }));
    assert_eq!(err.class(), Some(ResourceClass::EcmpGroup));
    assert_eq!(err.handle(), Some(stray.as_raw()));
}

#[test]
fn test_document_without_newer_sections() {
    let f = Fabric::new();
    let mut doc = serde_json::to_value(f.state.capture()).unwrap();
    let sections = doc.as_object_mut().unwrap();
    for name in [
        "version",
        "captured_at",
        "mpls_next_hops",
        "intf_table",
        "qos_policy_table",
        "trunks",
    ] {
        sections.remove(name);
    }
    let snapshot = WarmBootSnapshot::from_json(&doc.to_string()).unwrap();
    assert_eq!(snapshot.version, 0);
    assert!(snapshot.mpls_next_hops.is_empty());

    let cache = f.cache(&snapshot);
    let labeled = LabeledHostKey {
        vrf: 0,
        labels: LabelStack::Label(100),
        ip: IpAddress::v4(10, 0, 0, 1),
        intf: 7,
    };
    assert_eq!(cache.find_egress_from_labeled_host_key(&labeled), None);
    assert_eq!(cache.find(&ResourceKey::LabelSwitchAction(100)), None);
    // Without an interface table the interface is looked up by VLAN.
    assert_eq!(cache.find_intf(f.vlan, mac(1)), Some(f.intf));
}

#[test]
fn test_full_mask_routes_follow_host_table_policy() {
    let mut f = Fabric::new();
    let v6 = "2001:db8::1".parse::<IpAddress>().unwrap();
    let v6_route = f
        .hw
        .add_route(0, prefix("2001:db8::1/128"), RouteTarget::Egress(f.egresses[1]))
        .unwrap();
    let snapshot = f.state.capture();

    let cache = f.cache(&snapshot);
    assert_eq!(cache.find_host_route(0, v6), Some(v6_route));
    assert_eq!(
        cache.find_route(&PrefixRouteKey {
            vrf: 0,
            prefix: prefix("10.0.0.1/32"),
        }),
        None
    );

    let config = WarmBootConfig {
        host_table_for_host_routes: false,
        ..WarmBootConfig::default()
    };
    let mut cache = WarmBootCache::new(config);
    cache.restore(&snapshot).unwrap();
    cache.scan(&f.hw).unwrap();
    assert_eq!(cache.find_host_route(0, v6), None);
    assert_eq!(
        cache.find_route(&PrefixRouteKey {
            vrf: 0,
            prefix: prefix("10.0.0.1/32"),
        }),
        Some(f.host_route)
    );
}

#[test]
fn test_second_drop_egress_is_duplicate() {
    let mut f = Fabric::new();
    let snapshot = f.state.capture();
    let drop = f.hw.create_drop_egress();
    let cpu = f.hw.create_to_cpu_egress();

    let cache = f.cache(&snapshot);
    assert_eq!(cache.drop_egress(), Some(drop));
    assert_eq!(cache.to_cpu_egress(), Some(cpu));

    let second = f.hw.create_drop_egress();
    let mut cache = WarmBootCache::new(WarmBootConfig::default());
    cache.restore(&snapshot).unwrap();
    let err = cache.scan(&f.hw).unwrap_err();
    assert!(matches!(
        err,
        WarmBootError::DuplicateRegistration {
            class: ResourceClass::Egress,
            ..
        }
    ));
    assert_eq!(err.handle(), Some(second.as_raw()));
}

#[test]
fn test_traversal_failure_stops_scan() {
    let mut f = Fabric::new();
    let snapshot = f.state.capture();
    f.hw.fail_traversal(SimTable::Hosts);

    let mut cache = WarmBootCache::new(WarmBootConfig::default());
    cache.restore(&snapshot).unwrap();
    let err = cache.scan(&f.hw).unwrap_err();
    assert!(matches!(err, WarmBootError::TraversalFailure { .. }));
    assert_eq!(err.class(), Some(ResourceClass::Host));
}

#[test]
fn test_unclaimed_state_swept_in_dependency_order() {
    let mut f = Fabric::new();
    let snapshot = f.state.capture();
    let cache = f.cache(&snapshot);
    let found = cache.entry_counts();

    let report = cache.clear(&mut f.hw).unwrap();
    let ops = f.hw.op_log();

    let last_route = ops
        .iter()
        .rposition(|op| matches!(op, SimOp::RouteDelete(_)))
        .unwrap();
    let ecmp = position(ops, |op| *op == SimOp::EcmpDestroy(f.ecmp));
    let first_egress = position(ops, |op| matches!(op, SimOp::EgressDestroy(_)));
    let last_host = ops
        .iter()
        .rposition(|op| matches!(op, SimOp::HostDelete(_)))
        .unwrap();
    let intf = position(ops, |op| *op == SimOp::L3IntfDelete(f.intf));
    let station = position(ops, |op| *op == SimOp::StationDelete(f.vlan));
    let vlan = position(ops, |op| *op == SimOp::VlanDestroy(f.vlan));
    assert!(last_route < ecmp);
    assert!(ecmp < first_egress);
    assert!(last_host < first_egress);
    assert!(first_egress < intf);
    assert!(intf < vlan);
    assert!(station < vlan);

    // Every scanned entry ends up retained, deleted or removed with its owner.
    for (class, count) in found {
        let counts = report.counts(class);
        assert_eq!(
            counts.retained + counts.deleted + counts.cascaded,
            count,
            "{}",
            class
        );
    }
    assert_eq!(
        report.counts(ResourceClass::Vlan),
        ClassCounts {
            retained: 1,
            deleted: 1,
            cascaded: 0,
        }
    );
    assert_eq!(report.deletions.len(), ops.len());
    assert!(f.hw.has_vlan(VlanId::DEFAULT));
    assert!(!f.hw.has_vlan(f.vlan));
    for egress in &f.egresses {
        assert!(!f.hw.is_live(egress.as_raw()));
    }
}

#[test]
fn test_failed_deletion_stops_sweep() {
    let mut f = Fabric::new();
    let snapshot = f.state.capture();
    let (_, stuck) = f.hosts[1];
    f.hw.fail_op(SimOp::HostDelete(stuck));

    let cache = f.cache(&snapshot);
    let err = cache.clear(&mut f.hw).unwrap_err();
    assert!(matches!(
        err,
        WarmBootError::DeletionFailure {
            class: ResourceClass::Host,
            ..
        }
    ));
    assert_eq!(err.handle(), Some(stuck.as_raw()));
    assert!(f.hw.is_live(stuck.as_raw()));
    assert!(!f
        .hw
        .op_log()
        .iter()
        .any(|op| matches!(op, SimOp::EgressDestroy(_))));
}

#[test]
fn test_cold_boot_reports_unowned_egress() {
    let mut f = Fabric::new();
    let (_dir, store) = store_with(None);

    let err = WarmBoot::default()
        .run(&mut f.hw, &store, |_| Ok(()))
        .unwrap_err();
    assert!(matches!(err, WarmBootError::UnownedResource { .. }));
    assert_eq!(err.class(), Some(ResourceClass::Egress));
    assert_eq!(err.handle(), Some(f.egresses[0].as_raw()));
    assert!(f.hw.op_log().is_empty());
}

#[test]
fn test_claiming_unknown_key_fails_boot() {
    let mut f = Fabric::new();
    let (_dir, store) = store_with(Some(&f.state.capture()));

    let unknown = ResourceKey::Host(HostKey {
        vrf: 0,
        ip: IpAddress::v4(192, 168, 0, 1),
    });
    let err = WarmBoot::default()
        .run(&mut f.hw, &store, |cache| cache.mark_claimed(&unknown))
        .unwrap_err();
    assert!(matches!(
        err,
        WarmBootError::InvalidClaim {
            class: ResourceClass::Host,
            ..
        }
    ));
    assert!(f.hw.op_log().is_empty());
}

#[test]
fn test_generations_through_file_store() {
    let mut f = Fabric::new();
    let ip = IpAddress::v4(10, 0, 0, 4);
    let extra_egress = f.hw.create_egress(f.intf, mac(20), PortId(4)).unwrap();
    let extra_host = f.hw.add_host(0, ip, extra_egress, Some(5)).unwrap();
    f.state.add_host(0, ip, None, extra_egress, Some(5));

    let (_dir, store) = store_with(Some(&f.state.capture()));
    let keys = f.desired();

    // The next hop went away while the process was down.
    let report = WarmBoot::default()
        .run(&mut f.hw, &store, |cache| {
            assert_eq!(cache.host_class_id(0, ip, None), Some(5));
            claim_all(cache, &keys)
        })
        .unwrap();
    assert_eq!(
        f.hw.op_log(),
        &[
            SimOp::HostDelete(extra_host),
            SimOp::EgressDestroy(extra_egress),
        ]
    );
    assert_eq!(report.counts(ResourceClass::Host).deleted, 1);
    assert_eq!(report.counts(ResourceClass::Egress).retained, 3);

    assert!(f.state.remove_host(0, ip, None));
    store.save(&f.state.capture()).unwrap();
    let report = WarmBoot::default()
        .run(&mut f.hw, &store, |cache| claim_all(cache, &keys))
        .unwrap();
    assert_eq!(report.total_deleted(), 0);
    assert_eq!(f.hw.op_log().len(), 2);
}

fn sflow_tunnel() -> MirrorTunnel {
    MirrorTunnel {
        src_ip: IpAddress::v4(10, 0, 0, 1),
        dst_ip: IpAddress::v4(10, 9, 9, 9),
        src_mac: mac(1),
        dst_mac: mac(2),
        udp_ports: Some((6343, 6343)),
        ttl: 64,
    }
}

/// Ports 1 and 2 sample to an sFlow collector; port 2 is also spanned.
fn sampled_unit() -> (SimHardware, sonic_hw::MirrorHandle, sonic_hw::MirrorHandle) {
    let mut hw = SimHardware::new();
    for port in 1..=3 {
        hw.add_port(PortId(port), learn_flags::ARL | learn_flags::FWD);
    }
    let sflow = hw.create_mirror(PortId(3), Some(sflow_tunnel()));
    let span = hw.create_mirror(PortId(3), None);
    hw.set_port_mirror(PortId(1), INGRESS | SFLOW, sflow).unwrap();
    hw.set_port_mirror(PortId(2), INGRESS | SFLOW, sflow).unwrap();
    hw.set_port_mirror(PortId(2), INGRESS, span).unwrap();
    (hw, sflow, span)
}

fn sflow_boot() -> WarmBoot {
    WarmBoot::new(WarmBootConfig {
        sflow_sampling_supported: true,
        ..WarmBootConfig::default()
    })
}

#[test]
fn test_sflow_session_claimed_as_a_group() {
    let (mut hw, sflow, span) = sampled_unit();
    let (_dir, store) = store_with(Some(&WarmBootSnapshot::empty()));

    let report = sflow_boot()
        .run(&mut hw, &store, |cache| {
            cache.mark_claimed(&ResourceKey::MirroredPort(MirroredPortKey {
                port: PortId(1),
                flags: INGRESS | SFLOW,
            }))?;
            cache.mark_claimed(&ResourceKey::Mirror(MirrorKey {
                egress_port: PortId(3),
                tunnel: Some(sflow_tunnel()),
            }))
        })
        .unwrap();

    assert_eq!(
        hw.op_log(),
        &[
            SimOp::PortMirrorDelete(PortId(2), INGRESS, span),
            SimOp::MirrorDestroy(span),
        ]
    );
    assert!(hw.has_port_mirror(PortId(2), INGRESS | SFLOW));
    assert!(hw.is_live(sflow.as_raw()));
    assert_eq!(
        report.counts(ResourceClass::MirroredPort),
        ClassCounts {
            retained: 2,
            deleted: 1,
            cascaded: 0,
        }
    );
}

#[test]
fn test_mirror_kept_for_claimed_binding_is_residue() {
    let (mut hw, _, _) = sampled_unit();
    let (_dir, store) = store_with(Some(&WarmBootSnapshot::empty()));

    let err = sflow_boot()
        .run(&mut hw, &store, |cache| {
            cache.mark_claimed(&ResourceKey::MirroredPort(MirroredPortKey {
                port: PortId(1),
                flags: INGRESS | SFLOW,
            }))
        })
        .unwrap_err();
    assert!(matches!(
        err,
        WarmBootError::ResidualStateViolation {
            class: ResourceClass::Mirror,
            count: 1,
        }
    ));
}

fn rules(pairs: &[(u16, u8)]) -> BTreeSet<QosRule> {
    pairs.iter().map(|(tc, attr)| QosRule::new(*tc, *attr)).collect()
}

#[test]
fn test_qos_maps_reused_only_on_exact_rules() {
    let mut hw = SimHardware::new();
    let dscp = hw.create_qos_map(
        QosMapFlags::INGRESS.union(QosMapFlags::L3),
        rules(&[(0, 0), (1, 8)]),
    );
    let exp = hw.create_qos_map(
        QosMapFlags::EGRESS.union(QosMapFlags::MPLS),
        rules(&[(0, 1)]),
    );
    let mut state = WarmBootState::new();
    state.add_qos_policy("default", QosMapType::IpIngress, dscp);
    state.add_qos_policy("default", QosMapType::MplsEgress, exp);
    let (_dir, store) = store_with(Some(&state.capture()));

    let report = WarmBoot::default()
        .run(&mut hw, &store, |cache| {
            // The egress map changed while the process was down.
            assert_eq!(
                cache.find_qos_map("default", QosMapType::MplsEgress, &rules(&[(0, 2)])),
                None
            );
            cache.mark_claimed(&ResourceKey::QosMap {
                policy: "default".to_string(),
                map_type: QosMapType::IpIngress,
                rules: rules(&[(0, 0), (1, 8)]),
            })
        })
        .unwrap();

    assert_eq!(hw.op_log(), &[SimOp::QosMapDestroy(exp)]);
    assert_eq!(
        report.counts(ResourceClass::QosMap),
        ClassCounts {
            retained: 1,
            deleted: 1,
            cascaded: 0,
        }
    );
}

/// A routed VLAN whose only next hop leaves through an MPLS tunnel, with a
/// label swap pointing at it.
struct MplsUnit {
    hw: SimHardware,
    vlan: VlanId,
    plain: L3IntfHandle,
    tunnel: L3IntfHandle,
    egress: EgressHandle,
    swap: sonic_hw::LabelSwitchHandle,
    snapshot: WarmBootSnapshot,
}

impl MplsUnit {
    fn new() -> Self {
        let vlan = vlan(20);
        let mut hw = SimHardware::new();
        hw.create_vlan(vlan, &[], &[PortId(1)]).unwrap();
        let plain = hw.create_l3_intf(vlan, mac(1)).unwrap();
        let tunnel = hw.create_l3_intf(vlan, mac(1)).unwrap();
        hw.set_tunnel_initiator(tunnel, vec![100, 200]).unwrap();
        let egress = hw.create_mpls_egress(tunnel, mac(5), PortId(1), 300).unwrap();
        let swap = hw
            .add_label_switch(1000, LabelAction::Swap(1001), Some(RouteTarget::Egress(egress)))
            .unwrap();

        let mut state = WarmBootState::new();
        state.add_intf(vlan, plain);
        state.add_mpls_next_hop(
            0,
            IpAddress::v4(10, 2, 0, 1),
            20,
            LabelStack::Stack(vec![100, 200]),
            egress,
        );
        Self {
            hw,
            vlan,
            plain,
            tunnel,
            egress,
            swap,
            snapshot: state.capture(),
        }
    }

    fn cache(&self) -> WarmBootCache {
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&self.snapshot).unwrap();
        cache.scan(&self.hw).unwrap();
        cache
    }
}

#[test]
fn test_unclaimed_mpls_state_swept_in_dependency_order() {
    let mut unit = MplsUnit::new();
    let report = unit.cache().clear(&mut unit.hw).unwrap();

    assert_eq!(
        unit.hw.op_log(),
        &[
            SimOp::LabelSwitchDelete(unit.swap),
            SimOp::EgressDestroy(unit.egress),
            SimOp::TunnelInitiatorClear(unit.tunnel),
            SimOp::L3IntfDelete(unit.tunnel),
            SimOp::L3IntfDelete(unit.plain),
            SimOp::VlanDestroy(unit.vlan),
        ]
    );
    assert_eq!(report.counts(ResourceClass::LabelSwitchAction).deleted, 1);
    assert_eq!(report.counts(ResourceClass::TunnelInitiator).deleted, 1);
    assert_eq!(report.counts(ResourceClass::Interface).deleted, 1);
    assert!(!unit.hw.is_live(unit.tunnel.as_raw()));
}

#[test]
fn test_failed_tunnel_clear_keeps_interfaces() {
    let mut unit = MplsUnit::new();
    unit.hw.fail_op(SimOp::TunnelInitiatorClear(unit.tunnel));

    let err = unit.cache().clear(&mut unit.hw).unwrap_err();
    assert!(matches!(
        err,
        WarmBootError::DeletionFailure {
            class: ResourceClass::TunnelInitiator,
            ..
        }
    ));
    assert_eq!(err.handle(), Some(unit.tunnel.as_raw()));
    assert_eq!(
        unit.hw.op_log(),
        &[
            SimOp::LabelSwitchDelete(unit.swap),
            SimOp::EgressDestroy(unit.egress),
        ]
    );
    assert!(unit.hw.is_live(unit.tunnel.as_raw()));
    assert!(unit.hw.is_live(unit.plain.as_raw()));
}

/// Reports every QoS map of the wrapped unit under one fixed id, the way a
/// switch SDK that numbers QoS maps independently of ACL entries would.
struct RenumberedQosMaps<'a> {
    hw: &'a SimHardware,
    map: QosMapHandle,
}

impl HwScanner for RenumberedQosMaps<'_> {
    fn hosts(&self, visit: Visitor<'_, sonic_hw::HostEntry>) -> HwResult<()> {
        self.hw.hosts(visit)
    }

    fn routes(&self, visit: Visitor<'_, sonic_hw::RouteEntry>) -> HwResult<()> {
        self.hw.routes(visit)
    }

    fn egresses(&self, visit: Visitor<'_, sonic_hw::EgressEntry>) -> HwResult<()> {
        self.hw.egresses(visit)
    }

    fn ecmp_groups(&self, visit: Visitor<'_, sonic_hw::EcmpEntry>) -> HwResult<()> {
        self.hw.ecmp_groups(visit)
    }

    fn vlans(&self) -> HwResult<Vec<sonic_hw::VlanEntry>> {
        self.hw.vlans()
    }

    fn default_vlan(&self) -> HwResult<VlanId> {
        self.hw.default_vlan()
    }

    fn l3_intf_get(&self, intf: L3IntfHandle) -> HwResult<Option<sonic_hw::L3Intf>> {
        self.hw.l3_intf_get(intf)
    }

    fn l3_intf_find_vlan(&self, vlan: VlanId) -> HwResult<Option<sonic_hw::L3Intf>> {
        self.hw.l3_intf_find_vlan(vlan)
    }

    fn l2_station_get(&self, vlan: VlanId) -> HwResult<Option<sonic_hw::L2Station>> {
        self.hw.l2_station_get(vlan)
    }

    fn tunnel_initiator_get(
        &self,
        intf: L3IntfHandle,
        max_depth: usize,
    ) -> HwResult<Option<Vec<u32>>> {
        self.hw.tunnel_initiator_get(intf, max_depth)
    }

    fn acl_entries(&self, group: u32, visit: Visitor<'_, sonic_hw::AclEntry>) -> HwResult<()> {
        self.hw.acl_entries(group, visit)
    }

    fn mirror_destinations(
        &self,
        visit: Visitor<'_, sonic_hw::MirrorDestination>,
    ) -> HwResult<()> {
        self.hw.mirror_destinations(visit)
    }

    fn ports(&self) -> HwResult<Vec<PortId>> {
        self.hw.ports()
    }

    fn port_mirror_get(
        &self,
        port: PortId,
        flags: u32,
    ) -> HwResult<Option<sonic_hw::MirrorHandle>> {
        self.hw.port_mirror_get(port, flags)
    }

    fn port_learn_flags(&self, port: PortId) -> HwResult<u32> {
        self.hw.port_learn_flags(port)
    }

    fn qos_maps(&self, visit: Visitor<'_, sonic_hw::QosMapEntry>) -> HwResult<()> {
        self.hw.qos_maps(&mut |entry: &sonic_hw::QosMapEntry| {
            let mut entry = entry.clone();
            entry.handle = self.map;
            visit(&entry)
        })
    }

    fn label_switch_actions(
        &self,
        visit: Visitor<'_, sonic_hw::LabelSwitchEntry>,
    ) -> HwResult<()> {
        self.hw.label_switch_actions(visit)
    }

    fn trunks(&self, visit: Visitor<'_, sonic_hw::TrunkEntry>) -> HwResult<()> {
        self.hw.trunks(visit)
    }

    fn hash_module_state(
        &self,
        module: sonic_hw::HashModule,
    ) -> HwResult<BTreeMap<sonic_hw::SwitchControl, i32>> {
        self.hw.hash_module_state(module)
    }

    fn output_selection_state(
        &self,
        lb: sonic_hw::LoadBalancerId,
    ) -> HwResult<BTreeMap<sonic_hw::OutputSelectionControl, i32>> {
        self.hw.output_selection_state(lb)
    }
}

#[test]
fn test_handles_numbered_per_class_do_not_collide() {
    let config = WarmBootConfig::default();
    let mut hw = SimHardware::new();
    let acl = hw.add_acl_entry(config.acl_group_id, 10, None).unwrap();
    hw.create_qos_map(
        QosMapFlags::INGRESS.union(QosMapFlags::L3),
        rules(&[(0, 8)]),
    );

    // The SDK numbers QoS maps independently, so the map shares the ACL
    // entry's id.
    let map = QosMapHandle::from_raw(acl.as_raw()).unwrap();
    let mut state = WarmBootState::new();
    state.add_qos_policy("default", QosMapType::IpIngress, map);

    let scanner = RenumberedQosMaps { hw: &hw, map };
    let mut cache = WarmBootCache::new(config);
    cache.restore(&state.capture()).unwrap();
    cache.scan(&scanner).unwrap();

    assert_eq!(cache.find_acl(10), Some(acl));
    assert_eq!(
        cache.find_qos_map("default", QosMapType::IpIngress, &rules(&[(0, 8)])),
        Some(map)
    );
    let counts = cache.entry_counts();
    assert_eq!(counts[&ResourceClass::QosMap], 1);
    assert_eq!(counts[&ResourceClass::AclEntry], 1);
}
