//! In-memory hardware unit.
//!
//! `SimHardware` keeps every table in ordered maps, hands out handles from a
//! single counter so no two objects ever share a raw value, and refuses to
//! delete an object that another live object still points at. Deletions are
//! recorded in [`SimHardware::op_log`] so callers can check ordering.
//!
//! Faults can be injected per table traversal ([`SimHardware::fail_traversal`])
//! or per mutation ([`SimHardware::fail_op`]).

use crate::api::{
    AclEntry, EcmpEntry, EgressEntry, EgressFlags, HashModule, HostEntry, L2Station, L3Intf,
    LabelAction, LabelSwitchEntry, LoadBalancerId, MirrorDestination, MirrorDirection,
    MirrorTunnel, OutputSelectionControl, QosMapEntry, QosMapFlags, QosRule, RouteEntry,
    RouteTarget, SwitchControl, TrunkEntry, VlanEntry, VrfId,
};
use crate::error::{HwError, HwResult, HwStatus};
use crate::types::{
    AclEntryHandle, AclStatHandle, EcmpHandle, EgressHandle, HostHandle, HwHandle, HwObjectKind,
    L3IntfHandle, LabelSwitchHandle, MirrorHandle, QosMapHandle, RawHandle, RouteHandle,
    StationHandle, TrunkHandle,
};
use crate::unit::{HwMutator, HwScanner, Visitor};
use log::{debug, warn};
use sonic_types::{IpAddress, IpPrefix, MacAddress, PortId, VlanId};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::ControlFlow;

const FIRST_HANDLE: RawHandle = 100_000;

/// Traversable tables, used to target traversal faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimTable {
    Hosts,
    Routes,
    Egress,
    Ecmp,
    Vlans,
    Acl,
    Mirrors,
    QosMaps,
    LabelSwitch,
    Trunks,
    /// Port list and per-port state reads.
    Ports,
}

/// A mutation issued against the simulated unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    RouteDelete(RouteHandle),
    HostDelete(HostHandle),
    EcmpDestroy(EcmpHandle),
    EgressDestroy(EgressHandle),
    LabelSwitchDelete(LabelSwitchHandle),
    TunnelInitiatorClear(L3IntfHandle),
    L3IntfDelete(L3IntfHandle),
    StationDelete(VlanId),
    VlanDestroy(VlanId),
    AclStatDetach(AclEntryHandle, AclStatHandle),
    AclStatDestroy(AclStatHandle),
    AclEntryDestroy(AclEntryHandle),
    PortMirrorDelete(PortId, u32, MirrorHandle),
    AclMirrorRemove(AclEntryHandle, MirrorDirection),
    MirrorDestroy(MirrorHandle),
    QosMapDestroy(QosMapHandle),
}

#[derive(Debug, Clone)]
struct SimEcmp {
    members: Vec<EgressHandle>,
}

/// In-memory hardware unit.
#[derive(Debug, Clone)]
pub struct SimHardware {
    next_handle: RawHandle,
    default_vlan: VlanId,
    ports: BTreeMap<PortId, u32>,
    vlans: BTreeMap<VlanId, VlanEntry>,
    intfs: BTreeMap<L3IntfHandle, L3Intf>,
    tunnel_labels: BTreeMap<L3IntfHandle, Vec<u32>>,
    stations: BTreeMap<VlanId, L2Station>,
    egresses: BTreeMap<EgressHandle, EgressEntry>,
    ecmps: BTreeMap<EcmpHandle, SimEcmp>,
    down_egresses: BTreeSet<EgressHandle>,
    phantom_ecmps: BTreeSet<RawHandle>,
    hosts: BTreeMap<HostHandle, HostEntry>,
    routes: BTreeMap<RouteHandle, RouteEntry>,
    acl_entries: BTreeMap<AclEntryHandle, AclEntry>,
    acl_stats: BTreeSet<AclStatHandle>,
    mirrors: BTreeMap<MirrorHandle, MirrorDestination>,
    port_mirrors: BTreeMap<(PortId, u32), MirrorHandle>,
    qos_maps: BTreeMap<QosMapHandle, QosMapEntry>,
    label_actions: BTreeMap<LabelSwitchHandle, LabelSwitchEntry>,
    trunks: BTreeMap<TrunkHandle, TrunkEntry>,
    hash_modules: BTreeMap<HashModule, BTreeMap<SwitchControl, i32>>,
    output_selection: BTreeMap<LoadBalancerId, BTreeMap<OutputSelectionControl, i32>>,
    failing_tables: BTreeSet<SimTable>,
    failing_ops: Vec<SimOp>,
    op_log: Vec<SimOp>,
}

impl Default for SimHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHardware {
    /// Creates a unit holding only the default VLAN.
    pub fn new() -> Self {
        let default_vlan = VlanId::DEFAULT;
        let mut vlans = BTreeMap::new();
        vlans.insert(
            default_vlan,
            VlanEntry {
                vlan: default_vlan,
                ports: BTreeSet::new(),
                untagged: BTreeSet::new(),
            },
        );
        Self {
            next_handle: FIRST_HANDLE,
            default_vlan,
            ports: BTreeMap::new(),
            vlans,
            intfs: BTreeMap::new(),
            tunnel_labels: BTreeMap::new(),
            stations: BTreeMap::new(),
            egresses: BTreeMap::new(),
            ecmps: BTreeMap::new(),
            down_egresses: BTreeSet::new(),
            phantom_ecmps: BTreeSet::new(),
            hosts: BTreeMap::new(),
            routes: BTreeMap::new(),
            acl_entries: BTreeMap::new(),
            acl_stats: BTreeSet::new(),
            mirrors: BTreeMap::new(),
            port_mirrors: BTreeMap::new(),
            qos_maps: BTreeMap::new(),
            label_actions: BTreeMap::new(),
            trunks: BTreeMap::new(),
            hash_modules: BTreeMap::new(),
            output_selection: BTreeMap::new(),
            failing_tables: BTreeSet::new(),
            failing_ops: Vec::new(),
            op_log: Vec::new(),
        }
    }

    fn alloc<T: HwObjectKind>(&mut self) -> HwHandle<T> {
        let raw = self.next_handle;
        self.next_handle += 1;
        HwHandle::new_unchecked(raw)
    }

    // ------------------------------------------------------------------
    // Provisioning
    // ------------------------------------------------------------------

    pub fn add_port(&mut self, port: PortId, learn_flags: u32) {
        self.ports.insert(port, learn_flags);
    }

    /// Creates a VLAN. Ports not listed as untagged are tagged members.
    pub fn create_vlan(
        &mut self,
        vlan: VlanId,
        ports: &[PortId],
        untagged: &[PortId],
    ) -> HwResult<()> {
        if self.vlans.contains_key(&vlan) && vlan != self.default_vlan {
            return Err(HwError::from_status(HwStatus::Exists));
        }
        let untagged: BTreeSet<PortId> = untagged.iter().copied().collect();
        let mut all: BTreeSet<PortId> = ports.iter().copied().collect();
        all.extend(untagged.iter().copied());
        self.vlans.insert(
            vlan,
            VlanEntry {
                vlan,
                ports: all,
                untagged,
            },
        );
        Ok(())
    }

    pub fn create_l3_intf(&mut self, vlan: VlanId, mac: MacAddress) -> HwResult<L3IntfHandle> {
        if !self.vlans.contains_key(&vlan) {
            return Err(HwError::not_found(format!("vlan {}", vlan)));
        }
        let handle = self.alloc();
        self.intfs.insert(handle, L3Intf { handle, vlan, mac });
        Ok(handle)
    }

    pub fn create_station(&mut self, vlan: VlanId, mac: MacAddress) -> HwResult<StationHandle> {
        if !self.vlans.contains_key(&vlan) {
            return Err(HwError::not_found(format!("vlan {}", vlan)));
        }
        let handle = self.alloc();
        self.stations.insert(vlan, L2Station { handle, vlan, mac });
        Ok(handle)
    }

    /// Turns an interface into an MPLS tunnel initiator pushing `labels`.
    pub fn set_tunnel_initiator(&mut self, intf: L3IntfHandle, labels: Vec<u32>) -> HwResult<()> {
        if !self.intfs.contains_key(&intf) {
            return Err(HwError::not_found(format!("l3 intf {}", intf)));
        }
        self.tunnel_labels.insert(intf, labels);
        Ok(())
    }

    /// Creates a forwarding egress through `intf`.
    pub fn create_egress(
        &mut self,
        intf: L3IntfHandle,
        mac: MacAddress,
        port: PortId,
    ) -> HwResult<EgressHandle> {
        self.insert_egress(Some(intf), EgressFlags::NONE, mac, Some(port), None)
    }

    /// Creates an egress that pushes `label` and leaves through the tunnel
    /// interface `intf`.
    pub fn create_mpls_egress(
        &mut self,
        intf: L3IntfHandle,
        mac: MacAddress,
        port: PortId,
        label: u32,
    ) -> HwResult<EgressHandle> {
        self.insert_egress(Some(intf), EgressFlags::NONE, mac, Some(port), Some(label))
    }

    pub fn create_drop_egress(&mut self) -> EgressHandle {
        let handle = self.alloc();
        self.egresses.insert(
            handle,
            EgressEntry {
                handle,
                flags: EgressFlags::DST_DISCARD,
                intf: None,
                vlan: None,
                mac: MacAddress::ZERO,
                port: None,
                mpls_label: None,
            },
        );
        handle
    }

    pub fn create_to_cpu_egress(&mut self) -> EgressHandle {
        let handle = self.alloc();
        self.egresses.insert(
            handle,
            EgressEntry {
                handle,
                flags: EgressFlags::L2_TO_CPU.union(EgressFlags::COPY_TO_CPU),
                intf: None,
                vlan: None,
                mac: MacAddress::ZERO,
                port: None,
                mpls_label: None,
            },
        );
        handle
    }

    fn insert_egress(
        &mut self,
        intf: Option<L3IntfHandle>,
        flags: EgressFlags,
        mac: MacAddress,
        port: Option<PortId>,
        mpls_label: Option<u32>,
    ) -> HwResult<EgressHandle> {
        let vlan = match intf {
            Some(i) => Some(
                self.intfs
                    .get(&i)
                    .map(|e| e.vlan)
                    .ok_or_else(|| HwError::not_found(format!("l3 intf {}", i)))?,
            ),
            None => None,
        };
        let handle = self.alloc();
        self.egresses.insert(
            handle,
            EgressEntry {
                handle,
                flags,
                intf,
                vlan,
                mac,
                port,
                mpls_label,
            },
        );
        Ok(handle)
    }

    pub fn create_ecmp(&mut self, members: Vec<EgressHandle>) -> HwResult<EcmpHandle> {
        if let Some(missing) = members.iter().find(|m| !self.egresses.contains_key(m)) {
            return Err(HwError::not_found(format!("egress {}", missing)));
        }
        let handle = self.alloc();
        self.ecmps.insert(handle, SimEcmp { members });
        Ok(handle)
    }

    /// Marks the link behind an egress as down. ECMP traversal then omits it
    /// from every group it belongs to.
    pub fn set_egress_link_down(&mut self, egress: EgressHandle) {
        self.down_egresses.insert(egress);
    }

    /// Makes ECMP traversal report a spurious group id with no members, as
    /// some SDKs do for the second word of double-wide ECMP entries.
    pub fn add_double_wide_artifact(&mut self) -> RawHandle {
        let raw = self.next_handle;
        self.next_handle += 1;
        self.phantom_ecmps.insert(raw);
        raw
    }

    pub fn add_host(
        &mut self,
        vrf: VrfId,
        ip: IpAddress,
        egress: EgressHandle,
        class_id: Option<u32>,
    ) -> HwResult<HostHandle> {
        if !self.egresses.contains_key(&egress) {
            return Err(HwError::not_found(format!("egress {}", egress)));
        }
        let handle = self.alloc();
        self.hosts.insert(
            handle,
            HostEntry {
                handle,
                vrf,
                ip,
                egress,
                class_id,
            },
        );
        Ok(handle)
    }

    pub fn add_route(
        &mut self,
        vrf: VrfId,
        prefix: IpPrefix,
        target: RouteTarget,
    ) -> HwResult<RouteHandle> {
        self.check_target(target)?;
        let handle = self.alloc();
        self.routes.insert(
            handle,
            RouteEntry {
                handle,
                vrf,
                network: *prefix.address(),
                mask: prefix.mask(),
                target,
            },
        );
        Ok(handle)
    }

    fn check_target(&self, target: RouteTarget) -> HwResult<()> {
        let exists = match target {
            RouteTarget::Egress(e) => self.egresses.contains_key(&e),
            RouteTarget::Ecmp(e) => self.ecmps.contains_key(&e),
        };
        if exists {
            Ok(())
        } else {
            Err(HwError::not_found(format!("next hop {}", target.as_raw())))
        }
    }

    pub fn create_acl_stat(&mut self) -> AclStatHandle {
        let handle = self.alloc();
        self.acl_stats.insert(handle);
        handle
    }

    pub fn add_acl_entry(
        &mut self,
        group: u32,
        priority: i32,
        stat: Option<AclStatHandle>,
    ) -> HwResult<AclEntryHandle> {
        if let Some(s) = stat {
            if !self.acl_stats.contains(&s) {
                return Err(HwError::not_found(format!("acl stat {}", s)));
            }
        }
        let handle = self.alloc();
        self.acl_entries.insert(
            handle,
            AclEntry {
                handle,
                group,
                priority,
                stat,
                ingress_mirror: None,
                egress_mirror: None,
            },
        );
        Ok(handle)
    }

    pub fn set_acl_mirror(
        &mut self,
        entry: AclEntryHandle,
        direction: MirrorDirection,
        mirror: MirrorHandle,
    ) -> HwResult<()> {
        if !self.mirrors.contains_key(&mirror) {
            return Err(HwError::not_found(format!("mirror {}", mirror)));
        }
        let acl = self
            .acl_entries
            .get_mut(&entry)
            .ok_or_else(|| HwError::not_found(format!("acl entry {}", entry)))?;
        match direction {
            MirrorDirection::Ingress => acl.ingress_mirror = Some(mirror),
            MirrorDirection::Egress => acl.egress_mirror = Some(mirror),
        }
        Ok(())
    }

    pub fn create_mirror(&mut self, egress_port: PortId, tunnel: Option<MirrorTunnel>) -> MirrorHandle {
        let handle = self.alloc();
        self.mirrors.insert(
            handle,
            MirrorDestination {
                handle,
                egress_port,
                tunnel,
            },
        );
        handle
    }

    pub fn set_port_mirror(&mut self, port: PortId, flags: u32, mirror: MirrorHandle) -> HwResult<()> {
        if !self.mirrors.contains_key(&mirror) {
            return Err(HwError::not_found(format!("mirror {}", mirror)));
        }
        if !self.ports.contains_key(&port) {
            return Err(HwError::from_status(HwStatus::Port));
        }
        self.port_mirrors.insert((port, flags), mirror);
        Ok(())
    }

    pub fn create_qos_map(
        &mut self,
        flags: QosMapFlags,
        rules: impl IntoIterator<Item = QosRule>,
    ) -> QosMapHandle {
        let handle = self.alloc();
        self.qos_maps.insert(
            handle,
            QosMapEntry {
                handle,
                flags,
                rules: rules.into_iter().collect(),
            },
        );
        handle
    }

    pub fn add_label_switch(
        &mut self,
        label: u32,
        action: LabelAction,
        next_hop: Option<RouteTarget>,
    ) -> HwResult<LabelSwitchHandle> {
        if let Some(target) = next_hop {
            self.check_target(target)?;
        }
        if self.label_actions.values().any(|a| a.label == label) {
            return Err(HwError::from_status(HwStatus::Exists));
        }
        let handle = self.alloc();
        self.label_actions.insert(
            handle,
            LabelSwitchEntry {
                handle,
                label,
                action,
                next_hop,
            },
        );
        Ok(handle)
    }

    pub fn create_trunk(&mut self, members: Vec<PortId>) -> TrunkHandle {
        let handle = self.alloc();
        self.trunks.insert(handle, TrunkEntry { handle, members });
        handle
    }

    pub fn set_hash_control(&mut self, module: HashModule, control: SwitchControl, value: i32) {
        self.hash_modules
            .entry(module)
            .or_default()
            .insert(control, value);
    }

    pub fn set_output_selection(
        &mut self,
        lb: LoadBalancerId,
        control: OutputSelectionControl,
        value: i32,
    ) {
        self.output_selection
            .entry(lb)
            .or_default()
            .insert(control, value);
    }

    // ------------------------------------------------------------------
    // Fault injection and inspection
    // ------------------------------------------------------------------

    /// Makes every traversal of `table` fail with `E_INTERNAL`.
    pub fn fail_traversal(&mut self, table: SimTable) {
        self.failing_tables.insert(table);
    }

    /// Makes the given mutation fail with `E_FAIL` when it is issued.
    pub fn fail_op(&mut self, op: SimOp) {
        self.failing_ops.push(op);
    }

    /// Mutations that succeeded, in issue order.
    pub fn op_log(&self) -> &[SimOp] {
        &self.op_log
    }

    /// Returns true if any table still holds an object with this raw handle.
    pub fn is_live(&self, raw: RawHandle) -> bool {
        self.routes.keys().any(|h| h.as_raw() == raw)
            || self.hosts.keys().any(|h| h.as_raw() == raw)
            || self.egresses.keys().any(|h| h.as_raw() == raw)
            || self.ecmps.keys().any(|h| h.as_raw() == raw)
            || self.intfs.keys().any(|h| h.as_raw() == raw)
            || self.stations.values().any(|s| s.handle.as_raw() == raw)
            || self.acl_entries.keys().any(|h| h.as_raw() == raw)
            || self.acl_stats.iter().any(|h| h.as_raw() == raw)
            || self.mirrors.keys().any(|h| h.as_raw() == raw)
            || self.qos_maps.keys().any(|h| h.as_raw() == raw)
            || self.label_actions.keys().any(|h| h.as_raw() == raw)
            || self.trunks.keys().any(|h| h.as_raw() == raw)
    }

    pub fn has_vlan(&self, vlan: VlanId) -> bool {
        self.vlans.contains_key(&vlan)
    }

    pub fn has_station(&self, vlan: VlanId) -> bool {
        self.stations.contains_key(&vlan)
    }

    pub fn has_port_mirror(&self, port: PortId, flags: u32) -> bool {
        self.port_mirrors.contains_key(&(port, flags))
    }

    pub fn acl_stat_of(&self, entry: AclEntryHandle) -> Option<AclStatHandle> {
        self.acl_entries.get(&entry).and_then(|e| e.stat)
    }

    fn traverse<T>(
        &self,
        table: SimTable,
        items: impl Iterator<Item = T>,
        visit: Visitor<'_, T>,
    ) -> HwResult<()> {
        self.check_table(table)?;
        for item in items {
            if visit(&item).is_break() {
                debug!("traversal of {:?} stopped by visitor", table);
                break;
            }
        }
        Ok(())
    }

    fn check_table(&self, table: SimTable) -> HwResult<()> {
        if self.failing_tables.contains(&table) {
            warn!("injected traversal failure for {:?}", table);
            return Err(HwError::from_status(HwStatus::Internal));
        }
        Ok(())
    }

    fn begin(&mut self, op: SimOp) -> HwResult<()> {
        if let Some(pos) = self.failing_ops.iter().position(|o| *o == op) {
            self.failing_ops.remove(pos);
            warn!("injected failure for {:?}", op);
            return Err(HwError::from_status(HwStatus::Fail));
        }
        Ok(())
    }

    fn commit(&mut self, op: SimOp) {
        debug!("{:?}", op);
        self.op_log.push(op);
    }

    fn target_users(&self, raw: RawHandle) -> Option<String> {
        if let Some(r) = self.routes.values().find(|r| r.target.as_raw() == raw) {
            return Some(format!("route {}", r.handle));
        }
        if let Some(l) = self
            .label_actions
            .values()
            .find(|l| l.next_hop.is_some_and(|t| t.as_raw() == raw))
        {
            return Some(format!("label {}", l.label));
        }
        None
    }
}

fn missing<T: HwObjectKind>(handle: HwHandle<T>) -> HwError {
    HwError::not_found(format!("{:?}", handle))
}

impl HwScanner for SimHardware {
    fn hosts(&self, visit: Visitor<'_, HostEntry>) -> HwResult<()> {
        self.traverse(SimTable::Hosts, self.hosts.values().cloned(), visit)
    }

    fn routes(&self, visit: Visitor<'_, RouteEntry>) -> HwResult<()> {
        self.traverse(SimTable::Routes, self.routes.values().cloned(), visit)
    }

    fn egresses(&self, visit: Visitor<'_, EgressEntry>) -> HwResult<()> {
        self.traverse(SimTable::Egress, self.egresses.values().cloned(), visit)
    }

    fn ecmp_groups(&self, visit: Visitor<'_, EcmpEntry>) -> HwResult<()> {
        self.check_table(SimTable::Ecmp)?;
        let mut entries: Vec<EcmpEntry> = self
            .ecmps
            .iter()
            .map(|(handle, group)| EcmpEntry {
                handle: *handle,
                members: group
                    .members
                    .iter()
                    .filter(|m| !self.down_egresses.contains(m))
                    .copied()
                    .collect(),
            })
            .collect();
        entries.extend(self.phantom_ecmps.iter().map(|raw| EcmpEntry {
            handle: HwHandle::new_unchecked(*raw),
            members: Vec::new(),
        }));
        entries.sort_by_key(|e| e.handle);
        self.traverse(SimTable::Ecmp, entries.into_iter(), visit)
    }

    fn vlans(&self) -> HwResult<Vec<VlanEntry>> {
        self.check_table(SimTable::Vlans)?;
        Ok(self.vlans.values().cloned().collect())
    }

    fn default_vlan(&self) -> HwResult<VlanId> {
        Ok(self.default_vlan)
    }

    fn l3_intf_get(&self, intf: L3IntfHandle) -> HwResult<Option<L3Intf>> {
        Ok(self.intfs.get(&intf).cloned())
    }

    fn l3_intf_find_vlan(&self, vlan: VlanId) -> HwResult<Option<L3Intf>> {
        Ok(self.intfs.values().find(|i| i.vlan == vlan).cloned())
    }

    fn l2_station_get(&self, vlan: VlanId) -> HwResult<Option<L2Station>> {
        Ok(self.stations.get(&vlan).cloned())
    }

    fn tunnel_initiator_get(
        &self,
        intf: L3IntfHandle,
        max_depth: usize,
    ) -> HwResult<Option<Vec<u32>>> {
        match self.tunnel_labels.get(&intf) {
            Some(labels) if labels.len() > max_depth => Err(HwError::invalid_parameter(format!(
                "label stack of {} exceeds depth {}",
                intf, max_depth
            ))),
            Some(labels) => Ok(Some(labels.clone())),
            None => Ok(None),
        }
    }

    fn acl_entries(&self, group: u32, visit: Visitor<'_, AclEntry>) -> HwResult<()> {
        self.traverse(
            SimTable::Acl,
            self.acl_entries
                .values()
                .filter(|e| e.group == group)
                .cloned(),
            visit,
        )
    }

    fn mirror_destinations(&self, visit: Visitor<'_, MirrorDestination>) -> HwResult<()> {
        self.traverse(SimTable::Mirrors, self.mirrors.values().cloned(), visit)
    }

    fn ports(&self) -> HwResult<Vec<PortId>> {
        self.check_table(SimTable::Ports)?;
        Ok(self.ports.keys().copied().collect())
    }

    fn port_mirror_get(&self, port: PortId, flags: u32) -> HwResult<Option<MirrorHandle>> {
        if !self.ports.contains_key(&port) {
            return Err(HwError::from_status(HwStatus::Port));
        }
        Ok(self.port_mirrors.get(&(port, flags)).copied())
    }

    fn port_learn_flags(&self, port: PortId) -> HwResult<u32> {
        self.ports
            .get(&port)
            .copied()
            .ok_or_else(|| HwError::from_status(HwStatus::Port))
    }

    fn qos_maps(&self, visit: Visitor<'_, QosMapEntry>) -> HwResult<()> {
        self.traverse(SimTable::QosMaps, self.qos_maps.values().cloned(), visit)
    }

    fn label_switch_actions(&self, visit: Visitor<'_, LabelSwitchEntry>) -> HwResult<()> {
        self.traverse(
            SimTable::LabelSwitch,
            self.label_actions.values().cloned(),
            visit,
        )
    }

    fn trunks(&self, visit: Visitor<'_, TrunkEntry>) -> HwResult<()> {
        self.traverse(SimTable::Trunks, self.trunks.values().cloned(), visit)
    }

    fn hash_module_state(&self, module: HashModule) -> HwResult<BTreeMap<SwitchControl, i32>> {
        Ok(self.hash_modules.get(&module).cloned().unwrap_or_default())
    }

    fn output_selection_state(
        &self,
        lb: LoadBalancerId,
    ) -> HwResult<BTreeMap<OutputSelectionControl, i32>> {
        Ok(self.output_selection.get(&lb).cloned().unwrap_or_default())
    }
}

impl HwMutator for SimHardware {
    fn route_delete(&mut self, route: RouteHandle) -> HwResult<()> {
        let op = SimOp::RouteDelete(route);
        self.begin(op)?;
        self.routes.remove(&route).ok_or_else(|| missing(route))?;
        self.commit(op);
        Ok(())
    }

    fn host_delete(&mut self, host: HostHandle) -> HwResult<()> {
        let op = SimOp::HostDelete(host);
        self.begin(op)?;
        self.hosts.remove(&host).ok_or_else(|| missing(host))?;
        self.commit(op);
        Ok(())
    }

    fn ecmp_destroy(&mut self, ecmp: EcmpHandle) -> HwResult<()> {
        let op = SimOp::EcmpDestroy(ecmp);
        self.begin(op)?;
        if !self.ecmps.contains_key(&ecmp) {
            return Err(missing(ecmp));
        }
        if let Some(user) = self.target_users(ecmp.as_raw()) {
            return Err(HwError::object_in_use(format!("{:?}", ecmp), user));
        }
        self.ecmps.remove(&ecmp);
        self.commit(op);
        Ok(())
    }

    fn egress_destroy(&mut self, egress: EgressHandle) -> HwResult<()> {
        let op = SimOp::EgressDestroy(egress);
        self.begin(op)?;
        if !self.egresses.contains_key(&egress) {
            return Err(missing(egress));
        }
        let object = format!("{:?}", egress);
        if let Some(h) = self.hosts.values().find(|h| h.egress == egress) {
            return Err(HwError::object_in_use(object, format!("host {}", h.ip)));
        }
        if let Some((g, _)) = self.ecmps.iter().find(|(_, g)| g.members.contains(&egress)) {
            return Err(HwError::object_in_use(object, format!("ecmp {}", g)));
        }
        if let Some(user) = self.target_users(egress.as_raw()) {
            return Err(HwError::object_in_use(object, user));
        }
        self.egresses.remove(&egress);
        self.down_egresses.remove(&egress);
        self.commit(op);
        Ok(())
    }

    fn label_switch_delete(&mut self, action: LabelSwitchHandle) -> HwResult<()> {
        let op = SimOp::LabelSwitchDelete(action);
        self.begin(op)?;
        self.label_actions
            .remove(&action)
            .ok_or_else(|| missing(action))?;
        self.commit(op);
        Ok(())
    }

    fn tunnel_initiator_clear(&mut self, intf: L3IntfHandle) -> HwResult<()> {
        let op = SimOp::TunnelInitiatorClear(intf);
        self.begin(op)?;
        if !self.tunnel_labels.contains_key(&intf) {
            return Err(missing(intf));
        }
        if let Some(e) = self
            .egresses
            .values()
            .find(|e| e.intf == Some(intf) && e.mpls_label.is_some())
        {
            return Err(HwError::object_in_use(
                format!("tunnel {}", intf),
                format!("egress {}", e.handle),
            ));
        }
        self.tunnel_labels.remove(&intf);
        self.commit(op);
        Ok(())
    }

    fn l3_intf_delete(&mut self, intf: L3IntfHandle) -> HwResult<()> {
        let op = SimOp::L3IntfDelete(intf);
        self.begin(op)?;
        if !self.intfs.contains_key(&intf) {
            return Err(missing(intf));
        }
        let object = format!("{:?}", intf);
        if let Some(e) = self.egresses.values().find(|e| e.intf == Some(intf)) {
            return Err(HwError::object_in_use(object, format!("egress {}", e.handle)));
        }
        if self.tunnel_labels.contains_key(&intf) {
            return Err(HwError::object_in_use(object, "tunnel initiator"));
        }
        self.intfs.remove(&intf);
        self.commit(op);
        Ok(())
    }

    fn l2_station_delete(&mut self, vlan: VlanId) -> HwResult<()> {
        let op = SimOp::StationDelete(vlan);
        self.begin(op)?;
        self.stations
            .remove(&vlan)
            .ok_or_else(|| HwError::not_found(format!("station on vlan {}", vlan)))?;
        self.commit(op);
        Ok(())
    }

    fn vlan_destroy(&mut self, vlan: VlanId) -> HwResult<()> {
        let op = SimOp::VlanDestroy(vlan);
        self.begin(op)?;
        if vlan == self.default_vlan {
            return Err(HwError::invalid_parameter("cannot destroy the default vlan"));
        }
        if !self.vlans.contains_key(&vlan) {
            return Err(HwError::not_found(format!("vlan {}", vlan)));
        }
        let object = format!("vlan {}", vlan);
        if let Some(i) = self.intfs.values().find(|i| i.vlan == vlan) {
            return Err(HwError::object_in_use(object, format!("l3 intf {}", i.handle)));
        }
        if self.stations.contains_key(&vlan) {
            return Err(HwError::object_in_use(object, "l2 station"));
        }
        self.vlans.remove(&vlan);
        self.commit(op);
        Ok(())
    }

    fn acl_stat_detach(&mut self, entry: AclEntryHandle, stat: AclStatHandle) -> HwResult<()> {
        let op = SimOp::AclStatDetach(entry, stat);
        self.begin(op)?;
        let acl = self.acl_entries.get_mut(&entry).ok_or_else(|| missing(entry))?;
        if acl.stat != Some(stat) {
            return Err(HwError::not_found(format!("{:?} on {:?}", stat, entry)));
        }
        acl.stat = None;
        self.commit(op);
        Ok(())
    }

    fn acl_stat_destroy(&mut self, stat: AclStatHandle) -> HwResult<()> {
        let op = SimOp::AclStatDestroy(stat);
        self.begin(op)?;
        if !self.acl_stats.contains(&stat) {
            return Err(missing(stat));
        }
        if let Some(e) = self.acl_entries.values().find(|e| e.stat == Some(stat)) {
            return Err(HwError::object_in_use(
                format!("{:?}", stat),
                format!("acl entry {}", e.handle),
            ));
        }
        self.acl_stats.remove(&stat);
        self.commit(op);
        Ok(())
    }

    fn acl_entry_destroy(&mut self, entry: AclEntryHandle) -> HwResult<()> {
        let op = SimOp::AclEntryDestroy(entry);
        self.begin(op)?;
        self.acl_entries
            .remove(&entry)
            .ok_or_else(|| missing(entry))?;
        self.commit(op);
        Ok(())
    }

    fn port_mirror_delete(
        &mut self,
        port: PortId,
        flags: u32,
        mirror: MirrorHandle,
    ) -> HwResult<()> {
        let op = SimOp::PortMirrorDelete(port, flags, mirror);
        self.begin(op)?;
        match self.port_mirrors.get(&(port, flags)).copied() {
            Some(m) if m == mirror => {
                self.port_mirrors.remove(&(port, flags));
                self.commit(op);
                Ok(())
            }
            _ => Err(HwError::not_found(format!(
                "mirror {} on {} flags {:#x}",
                mirror, port, flags
            ))),
        }
    }

    fn acl_mirror_remove(
        &mut self,
        entry: AclEntryHandle,
        direction: MirrorDirection,
        mirror: MirrorHandle,
    ) -> HwResult<()> {
        let op = SimOp::AclMirrorRemove(entry, direction);
        self.begin(op)?;
        let acl = self.acl_entries.get_mut(&entry).ok_or_else(|| missing(entry))?;
        let slot = match direction {
            MirrorDirection::Ingress => &mut acl.ingress_mirror,
            MirrorDirection::Egress => &mut acl.egress_mirror,
        };
        if *slot != Some(mirror) {
            return Err(HwError::not_found(format!("{} mirror on {:?}", direction, entry)));
        }
        *slot = None;
        self.commit(op);
        Ok(())
    }

    fn mirror_destination_destroy(&mut self, mirror: MirrorHandle) -> HwResult<()> {
        let op = SimOp::MirrorDestroy(mirror);
        self.begin(op)?;
        if !self.mirrors.contains_key(&mirror) {
            return Err(missing(mirror));
        }
        let object = format!("{:?}", mirror);
        if let Some(((port, _), _)) = self.port_mirrors.iter().find(|(_, m)| **m == mirror) {
            return Err(HwError::object_in_use(object, format!("{}", port)));
        }
        if let Some(e) = self.acl_entries.values().find(|e| {
            e.ingress_mirror == Some(mirror) || e.egress_mirror == Some(mirror)
        }) {
            return Err(HwError::object_in_use(object, format!("acl entry {}", e.handle)));
        }
        self.mirrors.remove(&mirror);
        self.commit(op);
        Ok(())
    }

    fn qos_map_destroy(&mut self, map: QosMapHandle) -> HwResult<()> {
        let op = SimOp::QosMapDestroy(map);
        self.begin(op)?;
        self.qos_maps.remove(&map).ok_or_else(|| missing(map))?;
        self.commit(op);
        Ok(())
    }
}
