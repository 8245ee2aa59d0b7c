//! L3 table records.

use crate::types::{EcmpHandle, EgressHandle, HostHandle, L3IntfHandle, RouteHandle, StationHandle};
use sonic_types::{IpAddress, MacAddress, PortId, VlanId};
use std::collections::BTreeSet;
use std::fmt;

/// Virtual routing domain identifier.
pub type VrfId = u32;

/// What a route forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteTarget {
    Egress(EgressHandle),
    Ecmp(EcmpHandle),
}

impl RouteTarget {
    pub fn as_raw(&self) -> u64 {
        match self {
            RouteTarget::Egress(h) => h.as_raw(),
            RouteTarget::Ecmp(h) => h.as_raw(),
        }
    }
}

/// A host table entry (resolved next hop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    pub handle: HostHandle,
    pub vrf: VrfId,
    pub ip: IpAddress,
    pub egress: EgressHandle,
    pub class_id: Option<u32>,
}

/// A route table entry as reported by traversal: network plus netmask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub handle: RouteHandle,
    pub vrf: VrfId,
    pub network: IpAddress,
    pub mask: IpAddress,
    pub target: RouteTarget,
}

/// Egress object flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EgressFlags(pub u32);

impl EgressFlags {
    pub const NONE: EgressFlags = EgressFlags(0);
    pub const DST_DISCARD: EgressFlags = EgressFlags(1 << 0);
    pub const L2_TO_CPU: EgressFlags = EgressFlags(1 << 1);
    pub const COPY_TO_CPU: EgressFlags = EgressFlags(1 << 2);

    pub const fn contains(&self, other: EgressFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(&self, other: EgressFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: EgressFlags) -> EgressFlags {
        EgressFlags(self.0 | other.0)
    }

    pub const fn is_drop(&self) -> bool {
        self.intersects(Self::DST_DISCARD)
    }

    pub const fn is_to_cpu(&self) -> bool {
        self.intersects(Self::L2_TO_CPU.union(Self::COPY_TO_CPU))
    }
}

impl fmt::Display for EgressFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An egress (next-hop rewrite) object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressEntry {
    pub handle: EgressHandle,
    pub flags: EgressFlags,
    pub intf: Option<L3IntfHandle>,
    pub vlan: Option<VlanId>,
    pub mac: MacAddress,
    pub port: Option<PortId>,
    /// Set when the egress pushes labels through an MPLS tunnel interface.
    pub mpls_label: Option<u32>,
}

/// An ECMP group with the members hardware currently programs.
///
/// Members over down links are pruned by hardware, so this set can be smaller
/// than the group's logical membership or even empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcmpEntry {
    pub handle: EcmpHandle,
    pub members: Vec<EgressHandle>,
}

/// A routed interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L3Intf {
    pub handle: L3IntfHandle,
    pub vlan: VlanId,
    pub mac: MacAddress,
}

/// An L2 station entry terminating routed traffic on a VLAN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2Station {
    pub handle: StationHandle,
    pub vlan: VlanId,
    pub mac: MacAddress,
}

/// A VLAN and its member port bitmaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanEntry {
    pub vlan: VlanId,
    pub ports: BTreeSet<PortId>,
    pub untagged: BTreeSet<PortId>,
}
