//! The warm-boot reconciliation cache.
//!
//! One [`WarmBootCache`] exists per hardware unit for the duration of a boot.
//! It is filled in two steps, [`restore`](WarmBootCache::restore) from the
//! snapshot and [`scan`](WarmBootCache::scan) from hardware, then consulted
//! by resource managers through `find*` and
//! [`mark_claimed`](WarmBootCache::mark_claimed) while they apply desired
//! state. [`clear`](WarmBootCache::clear) consumes the cache and removes every
//! entry nobody claimed.
//!
//! The submodules split the per-class logic:
//!
//! - `restore`: snapshot ingestion
//! - `scan`: L3 tables, VLANs, interfaces, stations and L2 learning
//! - `acl`, `mirror`, `qos`, `mpls`, `lb`: remaining resource families
//! - `clear`: dependency-ordered sweep and [`ClearReport`]

mod acl;
mod clear;
mod lb;
mod mirror;
mod mpls;
mod qos;
mod restore;
mod scan;

pub use clear::{ClassCounts, ClearReport, Deletion};

use crate::config::WarmBootConfig;
use crate::error::{Result, WarmBootError};
use crate::index::{ClaimIndex, HandleMode};
use crate::key::{
    EcmpKey, HandleSpace, HostKey, HostRouteKey, IntfKey, LabeledHostKey, MirrorKey,
    MirroredAclKey, MirroredPortKey, NextHopKey, PrefixRouteKey, QosMapType, ResourceClass,
    ResourceKey, TunnelKey,
};
use sonic_hw::{
    learn_flags, AclEntryHandle, AclStatHandle, EcmpHandle, EgressEntry, EgressHandle, HashModule,
    HostEntry, HostHandle, L3IntfHandle, LabelSwitchHandle, LoadBalancerId, MirrorHandle,
    OutputSelectionControl, QosMapHandle, QosRule, RawHandle, RouteHandle, StationHandle,
    SwitchControl, TrunkHandle, VlanEntry, VrfId,
};
use sonic_types::{AggregatePortId, IpAddress, PortId, VlanId};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const SOURCE: &str = "WarmBootCache";

/// How the switch learns L2 addresses, as found on every port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum L2LearningMode {
    /// Hardware learns and forwards on its own.
    Hardware,
    /// Learned addresses wait for software to confirm them.
    Software,
}

impl L2LearningMode {
    /// Maps port learn flags to a mode. Only the two exact flag combinations
    /// the agent programs are recognized.
    pub fn from_flags(flags: u32) -> Option<Self> {
        if flags == learn_flags::ARL | learn_flags::FWD {
            Some(L2LearningMode::Hardware)
        } else if flags == learn_flags::ARL | learn_flags::PENDING {
            Some(L2LearningMode::Software)
        } else {
            None
        }
    }
}

/// Reconciliation cache for one hardware unit.
#[derive(Debug)]
pub struct WarmBootCache {
    config: WarmBootConfig,

    // Restored from the snapshot.
    snapshot_egress_ids: BTreeSet<EgressHandle>,
    host_egress: BTreeMap<NextHopKey, EgressHandle>,
    host_class_ids: BTreeMap<NextHopKey, u32>,
    labeled_egress: BTreeMap<LabeledHostKey, EgressHandle>,
    ecmp_paths: BTreeMap<EcmpHandle, EcmpKey>,
    snapshot_intfs: BTreeMap<VlanId, L3IntfHandle>,
    qos_policies: BTreeMap<(String, QosMapType), QosMapHandle>,
    snapshot_trunks: BTreeMap<AggregatePortId, TrunkHandle>,

    // Discovered in hardware.
    owners: BTreeMap<(HandleSpace, RawHandle), ResourceClass>,
    host_routes: ClaimIndex<HostRouteKey, RouteHandle>,
    prefix_routes: ClaimIndex<PrefixRouteKey, RouteHandle>,
    label_actions: ClaimIndex<u32, LabelSwitchHandle>,
    ecmps: ClaimIndex<EcmpKey, EcmpHandle>,
    hosts: ClaimIndex<HostKey, HostHandle>,
    host_entries: BTreeMap<HostKey, HostEntry>,
    egresses: ClaimIndex<EgressHandle, EgressHandle>,
    egress_entries: BTreeMap<EgressHandle, EgressEntry>,
    drop_egress: Option<EgressHandle>,
    to_cpu_egress: Option<EgressHandle>,
    tunnels: ClaimIndex<TunnelKey, L3IntfHandle>,
    intfs: ClaimIndex<IntfKey, L3IntfHandle>,
    stations: ClaimIndex<VlanId, StationHandle>,
    vlans: ClaimIndex<VlanId, VlanId>,
    vlan_entries: BTreeMap<VlanId, VlanEntry>,
    default_vlan: Option<VlanId>,
    learning_mode: Option<L2LearningMode>,
    acls: ClaimIndex<i32, AclEntryHandle>,
    acl_stats: ClaimIndex<AclEntryHandle, AclStatHandle>,
    mirrors: ClaimIndex<MirrorKey, MirrorHandle>,
    sflow_mirrors: BTreeSet<MirrorHandle>,
    mirrored_ports: ClaimIndex<MirroredPortKey, MirrorHandle>,
    mirrored_acls: ClaimIndex<MirroredAclKey, MirrorHandle>,
    qos_maps: ClaimIndex<QosMapHandle, QosMapHandle>,
    qos_map_rules: BTreeMap<QosMapHandle, (QosMapType, BTreeSet<QosRule>)>,
    trunks: ClaimIndex<AggregatePortId, TrunkHandle>,
    hash_state: BTreeMap<HashModule, BTreeMap<SwitchControl, i32>>,
    output_selection: BTreeMap<LoadBalancerId, BTreeMap<OutputSelectionControl, i32>>,
}

impl WarmBootCache {
    pub fn new(config: WarmBootConfig) -> Self {
        use HandleMode::{Shared, Unique};
        use ResourceClass as C;

        Self {
            config,
            snapshot_egress_ids: BTreeSet::new(),
            host_egress: BTreeMap::new(),
            host_class_ids: BTreeMap::new(),
            labeled_egress: BTreeMap::new(),
            ecmp_paths: BTreeMap::new(),
            snapshot_intfs: BTreeMap::new(),
            qos_policies: BTreeMap::new(),
            snapshot_trunks: BTreeMap::new(),
            owners: BTreeMap::new(),
            host_routes: ClaimIndex::new(C::HostRoute, Unique),
            prefix_routes: ClaimIndex::new(C::PrefixRoute, Unique),
            label_actions: ClaimIndex::new(C::LabelSwitchAction, Unique),
            ecmps: ClaimIndex::new(C::EcmpGroup, Unique),
            hosts: ClaimIndex::new(C::Host, Unique),
            host_entries: BTreeMap::new(),
            egresses: ClaimIndex::new(C::Egress, Unique),
            egress_entries: BTreeMap::new(),
            drop_egress: None,
            to_cpu_egress: None,
            tunnels: ClaimIndex::new(C::TunnelInitiator, Unique),
            intfs: ClaimIndex::new(C::Interface, Unique),
            stations: ClaimIndex::new(C::Station, Unique),
            vlans: ClaimIndex::new(C::Vlan, Unique),
            vlan_entries: BTreeMap::new(),
            default_vlan: None,
            learning_mode: None,
            acls: ClaimIndex::new(C::AclEntry, Unique),
            acl_stats: ClaimIndex::new(C::AclStat, Shared),
            mirrors: ClaimIndex::new(C::Mirror, Unique),
            sflow_mirrors: BTreeSet::new(),
            mirrored_ports: ClaimIndex::new(C::MirroredPort, Shared),
            mirrored_acls: ClaimIndex::new(C::MirroredAcl, Shared),
            qos_maps: ClaimIndex::new(C::QosMap, Unique),
            qos_map_rules: BTreeMap::new(),
            trunks: ClaimIndex::new(C::Trunk, Unique),
            hash_state: BTreeMap::new(),
            output_selection: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &WarmBootConfig {
        &self.config
    }

    /// Records that `raw` belongs to `class`. Within one handle space a
    /// handle may only ever belong to one class; ACL stats may be listed
    /// repeatedly because several entries can share a counter.
    fn register_owner(
        &mut self,
        class: ResourceClass,
        key: &dyn fmt::Display,
        raw: RawHandle,
    ) -> Result<()> {
        let space = class.handle_space();
        match self.owners.get(&(space, raw)) {
            None => {
                self.owners.insert((space, raw), class);
                Ok(())
            }
            Some(owner) if *owner == class && class == ResourceClass::AclStat => Ok(()),
            Some(owner) => {
                crate::error_log!(
                    SOURCE,
                    handle = raw,
                    owner = %owner,
                    class = %class,
                    "handle already owned by another resource"
                );
                Err(WarmBootError::duplicate(class, key, raw))
            }
        }
    }

    fn owner_of(&self, space: HandleSpace, raw: RawHandle) -> Option<ResourceClass> {
        self.owners.get(&(space, raw)).copied()
    }

    // ------------------------------------------------------------------
    // Generic lookup and claim
    // ------------------------------------------------------------------

    /// Looks up the hardware handle bound to `key`. `None` means the caller
    /// must create the object.
    pub fn find(&self, key: &ResourceKey) -> Option<RawHandle> {
        match key {
            ResourceKey::HostRoute(k) => self.host_routes.find(k).map(|h| h.as_raw()),
            ResourceKey::PrefixRoute(k) => self.prefix_routes.find(k).map(|h| h.as_raw()),
            ResourceKey::LabelSwitchAction(label) => {
                self.label_actions.find(label).map(|h| h.as_raw())
            }
            ResourceKey::EcmpGroup(k) => self.ecmps.find(k).map(|h| h.as_raw()),
            ResourceKey::Host(k) => self.hosts.find(k).map(|h| h.as_raw()),
            ResourceKey::Egress(h) => self.egresses.find(h).map(|h| h.as_raw()),
            ResourceKey::TunnelInitiator(k) => self.tunnels.find(k).map(|h| h.as_raw()),
            ResourceKey::Interface(k) => self.intfs.find(k).map(|h| h.as_raw()),
            ResourceKey::Station(vlan) => self.stations.find(vlan).map(|h| h.as_raw()),
            ResourceKey::Vlan(vlan) => self.vlans.find(vlan).map(|v| RawHandle::from(v.as_u16())),
            ResourceKey::AclStat(entry) => self.acl_stats.find(entry).map(|h| h.as_raw()),
            ResourceKey::AclEntry(priority) => self.acls.find(priority).map(|h| h.as_raw()),
            ResourceKey::MirroredPort(k) => self.mirrored_ports.find(k).map(|h| h.as_raw()),
            ResourceKey::MirroredAcl(k) => self.mirrored_acls.find(k).map(|h| h.as_raw()),
            ResourceKey::Mirror(k) => self.mirrors.find(k).map(|h| h.as_raw()),
            ResourceKey::QosMap {
                policy,
                map_type,
                rules,
            } => self
                .find_qos_map(policy, *map_type, rules)
                .map(|h| h.as_raw()),
            ResourceKey::Trunk(agg) => self.trunks.find(agg).map(|h| h.as_raw()),
        }
    }

    /// Marks the entry bound to `key` as reused by the new generation.
    ///
    /// Claiming is idempotent. Claiming a key that `find` would not return is
    /// [`WarmBootError::InvalidClaim`].
    pub fn mark_claimed(&mut self, key: &ResourceKey) -> Result<()> {
        let changed = match key {
            ResourceKey::HostRoute(k) => self.host_routes.mark_claimed(k)?,
            ResourceKey::PrefixRoute(k) => self.prefix_routes.mark_claimed(k)?,
            ResourceKey::LabelSwitchAction(label) => self.label_actions.mark_claimed(label)?,
            ResourceKey::EcmpGroup(k) => self.ecmps.mark_claimed(k)?,
            ResourceKey::Host(k) => self.hosts.mark_claimed(k)?,
            ResourceKey::Egress(h) => self.egresses.mark_claimed(h)?,
            ResourceKey::TunnelInitiator(k) => self.tunnels.mark_claimed(k)?,
            ResourceKey::Interface(k) => self.intfs.mark_claimed(k)?,
            ResourceKey::Station(vlan) => self.stations.mark_claimed(vlan)?,
            ResourceKey::Vlan(vlan) => self.vlans.mark_claimed(vlan)?,
            ResourceKey::AclStat(entry) => self.acl_stats.mark_claimed(entry)?,
            ResourceKey::AclEntry(priority) => self.acls.mark_claimed(priority)?,
            ResourceKey::MirroredPort(k) => self.claim_mirrored_port(k)?,
            ResourceKey::MirroredAcl(k) => self.mirrored_acls.mark_claimed(k)?,
            ResourceKey::Mirror(k) => self.mirrors.mark_claimed(k)?,
            ResourceKey::QosMap {
                policy,
                map_type,
                rules,
            } => {
                let map = self
                    .find_qos_map(policy, *map_type, rules)
                    .ok_or_else(|| WarmBootError::invalid_claim(ResourceClass::QosMap, key))?;
                self.qos_maps.mark_claimed(&map)?
            }
            ResourceKey::Trunk(agg) => self.trunks.mark_claimed(agg)?,
        };
        if changed {
            crate::debug_log!(SOURCE, class = %key.class(), key = %key, "claimed");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // L3 lookups
    // ------------------------------------------------------------------

    /// A full-mask route indexed in the host-route table.
    pub fn find_host_route(&self, vrf: VrfId, ip: IpAddress) -> Option<RouteHandle> {
        self.host_routes.find(&HostRouteKey { vrf, ip })
    }

    pub fn find_route(&self, key: &PrefixRouteKey) -> Option<RouteHandle> {
        self.prefix_routes.find(key)
    }

    pub fn find_host(&self, vrf: VrfId, ip: IpAddress) -> Option<HostHandle> {
        self.hosts.find(&HostKey { vrf, ip })
    }

    /// The egress and class id a scanned host entry points at.
    pub fn host_entry(&self, vrf: VrfId, ip: IpAddress) -> Option<&HostEntry> {
        self.host_entries.get(&HostKey { vrf, ip })
    }

    pub fn find_egress(&self, egress: EgressHandle) -> Option<EgressHandle> {
        self.egresses.find(&egress)
    }

    /// Resolves a next hop from the snapshot's host table to the egress that
    /// backs it in hardware.
    pub fn find_egress_from_host(
        &self,
        vrf: VrfId,
        ip: IpAddress,
        intf: Option<u64>,
    ) -> Option<EgressHandle> {
        let egress = self.host_egress.get(&NextHopKey::new(vrf, ip, intf))?;
        self.egresses.find(egress)
    }

    /// Class id the snapshot recorded for a next hop.
    pub fn host_class_id(&self, vrf: VrfId, ip: IpAddress, intf: Option<u64>) -> Option<u32> {
        self.host_class_ids
            .get(&NextHopKey::new(vrf, ip, intf))
            .copied()
    }

    pub fn egress_entry(&self, egress: EgressHandle) -> Option<&EgressEntry> {
        self.egress_entries.get(&egress)
    }

    /// The unreferenced drop egress found in hardware, if any.
    pub fn drop_egress(&self) -> Option<EgressHandle> {
        self.drop_egress
    }

    /// The unreferenced copy-to-CPU egress found in hardware, if any.
    pub fn to_cpu_egress(&self) -> Option<EgressHandle> {
        self.to_cpu_egress
    }

    pub fn find_ecmp(&self, paths: &EcmpKey) -> Option<EcmpHandle> {
        self.ecmps.find(paths)
    }

    /// Logical ECMP membership recorded in the snapshot, including paths
    /// hardware currently prunes because their links are down.
    pub fn paths_for_ecmp(&self, ecmp: EcmpHandle) -> Option<&EcmpKey> {
        self.ecmp_paths.get(&ecmp)
    }

    pub fn find_intf(&self, vlan: VlanId, mac: sonic_types::MacAddress) -> Option<L3IntfHandle> {
        self.intfs.find(&IntfKey { vlan, mac })
    }

    pub fn find_station(&self, vlan: VlanId) -> Option<StationHandle> {
        self.stations.find(&vlan)
    }

    pub fn find_vlan(&self, vlan: VlanId) -> Option<VlanId> {
        self.vlans.find(&vlan)
    }

    /// Member ports of a scanned VLAN, mapped to whether they are tagged.
    pub fn vlan_member_ports(&self, vlan: VlanId) -> Option<BTreeMap<PortId, bool>> {
        let entry = self.vlan_entries.get(&vlan)?;
        let mut members: BTreeMap<PortId, bool> =
            entry.untagged.iter().map(|port| (*port, false)).collect();
        for port in &entry.ports {
            members.entry(*port).or_insert(true);
        }
        Some(members)
    }

    pub fn default_vlan(&self) -> Option<VlanId> {
        self.default_vlan
    }

    /// Learning mode shared by all ports; `None` when the unit has no ports.
    pub fn l2_learning_mode(&self) -> Option<L2LearningMode> {
        self.learning_mode
    }

    /// Number of indexed entries per class.
    pub fn entry_counts(&self) -> BTreeMap<ResourceClass, usize> {
        BTreeMap::from([
            (ResourceClass::HostRoute, self.host_routes.len()),
            (ResourceClass::PrefixRoute, self.prefix_routes.len()),
            (ResourceClass::LabelSwitchAction, self.label_actions.len()),
            (ResourceClass::EcmpGroup, self.ecmps.len()),
            (ResourceClass::Host, self.hosts.len()),
            (ResourceClass::Egress, self.egresses.len()),
            (ResourceClass::TunnelInitiator, self.tunnels.len()),
            (ResourceClass::Interface, self.intfs.len()),
            (ResourceClass::Station, self.stations.len()),
            (ResourceClass::Vlan, self.vlans.len()),
            (ResourceClass::AclStat, self.acl_stats.len()),
            (ResourceClass::AclEntry, self.acls.len()),
            (ResourceClass::MirroredPort, self.mirrored_ports.len()),
            (ResourceClass::MirroredAcl, self.mirrored_acls.len()),
            (ResourceClass::Mirror, self.mirrors.len()),
            (ResourceClass::QosMap, self.qos_maps.len()),
            (ResourceClass::Trunk, self.trunks.len()),
        ])
    }
}
