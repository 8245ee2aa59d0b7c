//! Traversal and mutation traits for one hardware unit.

use crate::api::{
    AclEntry, EcmpEntry, EgressEntry, HashModule, HostEntry, L2Station, L3Intf, LabelSwitchEntry,
    LoadBalancerId, MirrorDestination, MirrorDirection, OutputSelectionControl, QosMapEntry,
    RouteEntry, SwitchControl, TrunkEntry, VlanEntry,
};
use crate::error::HwResult;
use crate::types::{
    AclEntryHandle, AclStatHandle, EcmpHandle, EgressHandle, HostHandle, L3IntfHandle,
    LabelSwitchHandle, MirrorHandle, QosMapHandle, RouteHandle,
};
use sonic_types::{PortId, VlanId};
use std::collections::BTreeMap;
use std::ops::ControlFlow;

/// Visitor invoked once per live entry. Returning `Break` stops the traversal
/// early without an error from the hardware layer.
pub type Visitor<'a, T> = &'a mut dyn FnMut(&T) -> ControlFlow<()>;

/// Read-only view of hardware tables.
///
/// Traversals must visit every live entry exactly once. A failed traversal
/// returns `Err` and the caller must assume its inventory is incomplete.
pub trait HwScanner {
    fn hosts(&self, visit: Visitor<'_, HostEntry>) -> HwResult<()>;

    fn routes(&self, visit: Visitor<'_, RouteEntry>) -> HwResult<()>;

    fn egresses(&self, visit: Visitor<'_, EgressEntry>) -> HwResult<()>;

    fn ecmp_groups(&self, visit: Visitor<'_, EcmpEntry>) -> HwResult<()>;

    fn vlans(&self) -> HwResult<Vec<VlanEntry>>;

    fn default_vlan(&self) -> HwResult<VlanId>;

    /// Looks up an interface by handle. `Ok(None)` if it does not exist.
    fn l3_intf_get(&self, intf: L3IntfHandle) -> HwResult<Option<L3Intf>>;

    /// Finds the first interface on a VLAN.
    fn l3_intf_find_vlan(&self, vlan: VlanId) -> HwResult<Option<L3Intf>>;

    fn l2_station_get(&self, vlan: VlanId) -> HwResult<Option<L2Station>>;

    /// Reads the label stack an interface pushes. `Ok(None)` if the interface
    /// is not an MPLS tunnel initiator. At most `max_depth` labels are read.
    fn tunnel_initiator_get(&self, intf: L3IntfHandle, max_depth: usize)
        -> HwResult<Option<Vec<u32>>>;

    fn acl_entries(&self, group: u32, visit: Visitor<'_, AclEntry>) -> HwResult<()>;

    fn mirror_destinations(&self, visit: Visitor<'_, MirrorDestination>) -> HwResult<()>;

    fn ports(&self) -> HwResult<Vec<PortId>>;

    /// Returns the mirror a port sends traffic to for the given flag set.
    fn port_mirror_get(&self, port: PortId, flags: u32) -> HwResult<Option<MirrorHandle>>;

    fn port_learn_flags(&self, port: PortId) -> HwResult<u32>;

    fn qos_maps(&self, visit: Visitor<'_, QosMapEntry>) -> HwResult<()>;

    fn label_switch_actions(&self, visit: Visitor<'_, LabelSwitchEntry>) -> HwResult<()>;

    fn trunks(&self, visit: Visitor<'_, TrunkEntry>) -> HwResult<()>;

    fn hash_module_state(&self, module: HashModule) -> HwResult<BTreeMap<SwitchControl, i32>>;

    fn output_selection_state(
        &self,
        lb: LoadBalancerId,
    ) -> HwResult<BTreeMap<OutputSelectionControl, i32>>;
}

/// Deletion and detach primitives for one hardware unit.
///
/// Every call either fully succeeds or leaves the object in place.
pub trait HwMutator {
    fn route_delete(&mut self, route: RouteHandle) -> HwResult<()>;

    fn host_delete(&mut self, host: HostHandle) -> HwResult<()>;

    fn ecmp_destroy(&mut self, ecmp: EcmpHandle) -> HwResult<()>;

    fn egress_destroy(&mut self, egress: EgressHandle) -> HwResult<()>;

    fn label_switch_delete(&mut self, action: LabelSwitchHandle) -> HwResult<()>;

    fn tunnel_initiator_clear(&mut self, intf: L3IntfHandle) -> HwResult<()>;

    fn l3_intf_delete(&mut self, intf: L3IntfHandle) -> HwResult<()>;

    fn l2_station_delete(&mut self, vlan: VlanId) -> HwResult<()>;

    fn vlan_destroy(&mut self, vlan: VlanId) -> HwResult<()>;

    fn acl_stat_detach(&mut self, entry: AclEntryHandle, stat: AclStatHandle) -> HwResult<()>;

    fn acl_stat_destroy(&mut self, stat: AclStatHandle) -> HwResult<()>;

    fn acl_entry_destroy(&mut self, entry: AclEntryHandle) -> HwResult<()>;

    fn port_mirror_delete(&mut self, port: PortId, flags: u32, mirror: MirrorHandle)
        -> HwResult<()>;

    fn acl_mirror_remove(
        &mut self,
        entry: AclEntryHandle,
        direction: MirrorDirection,
        mirror: MirrorHandle,
    ) -> HwResult<()>;

    fn mirror_destination_destroy(&mut self, mirror: MirrorHandle) -> HwResult<()>;

    fn qos_map_destroy(&mut self, map: QosMapHandle) -> HwResult<()>;
}
