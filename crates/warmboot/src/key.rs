//! Logical resource keys.
//!
//! A key is what software means by a resource (a host is a VRF plus an
//! address, an ECMP group is its member set); the handle is what hardware
//! called it. The cache maps one to the other per [`ResourceClass`].

use serde::{Deserialize, Serialize};
use sonic_hw::{
    AclEntryHandle, EgressHandle, L3IntfHandle, MirrorDirection, MirrorTunnel, QosRule, VrfId,
};
use sonic_types::{AggregatePortId, IpAddress, IpPrefix, MacAddress, PortId, VlanId};
use std::collections::BTreeSet;
use std::fmt;

/// Resource classes tracked by the cache, in sweep order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    HostRoute,
    PrefixRoute,
    LabelSwitchAction,
    EcmpGroup,
    Host,
    Egress,
    TunnelInitiator,
    Interface,
    Station,
    Vlan,
    AclStat,
    AclEntry,
    MirroredPort,
    MirroredAcl,
    Mirror,
    QosMap,
    Trunk,
    LoadBalancer,
}

impl ResourceClass {
    pub const ALL: [ResourceClass; 18] = [
        ResourceClass::HostRoute,
        ResourceClass::PrefixRoute,
        ResourceClass::LabelSwitchAction,
        ResourceClass::EcmpGroup,
        ResourceClass::Host,
        ResourceClass::Egress,
        ResourceClass::TunnelInitiator,
        ResourceClass::Interface,
        ResourceClass::Station,
        ResourceClass::Vlan,
        ResourceClass::AclStat,
        ResourceClass::AclEntry,
        ResourceClass::MirroredPort,
        ResourceClass::MirroredAcl,
        ResourceClass::Mirror,
        ResourceClass::QosMap,
        ResourceClass::Trunk,
        ResourceClass::LoadBalancer,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::HostRoute => "host_route",
            ResourceClass::PrefixRoute => "prefix_route",
            ResourceClass::LabelSwitchAction => "label_switch_action",
            ResourceClass::EcmpGroup => "ecmp_group",
            ResourceClass::Host => "host",
            ResourceClass::Egress => "egress",
            ResourceClass::TunnelInitiator => "tunnel_initiator",
            ResourceClass::Interface => "interface",
            ResourceClass::Station => "station",
            ResourceClass::Vlan => "vlan",
            ResourceClass::AclStat => "acl_stat",
            ResourceClass::AclEntry => "acl_entry",
            ResourceClass::MirroredPort => "mirrored_port",
            ResourceClass::MirroredAcl => "mirrored_acl",
            ResourceClass::Mirror => "mirror",
            ResourceClass::QosMap => "qos_map",
            ResourceClass::Trunk => "trunk",
            ResourceClass::LoadBalancer => "load_balancer",
        }
    }

    /// The numbering space this class draws its handles from.
    pub const fn handle_space(&self) -> HandleSpace {
        match self {
            ResourceClass::HostRoute | ResourceClass::PrefixRoute => HandleSpace::Route,
            ResourceClass::LabelSwitchAction => HandleSpace::LabelSwitch,
            ResourceClass::EcmpGroup | ResourceClass::Egress => HandleSpace::L3Egress,
            ResourceClass::Host => HandleSpace::Host,
            ResourceClass::TunnelInitiator | ResourceClass::Interface => HandleSpace::L3Intf,
            ResourceClass::Station => HandleSpace::Station,
            ResourceClass::Vlan => HandleSpace::Vlan,
            ResourceClass::AclStat => HandleSpace::AclStat,
            ResourceClass::AclEntry => HandleSpace::AclEntry,
            ResourceClass::MirroredPort | ResourceClass::MirroredAcl | ResourceClass::Mirror => {
                HandleSpace::Mirror
            }
            ResourceClass::QosMap => HandleSpace::QosMap,
            ResourceClass::Trunk => HandleSpace::Trunk,
            ResourceClass::LoadBalancer => HandleSpace::LoadBalancer,
        }
    }
}

/// A range of ids hardware allocates independently of the others.
///
/// Handles only need to be unique inside one space. ECMP groups live in the
/// egress space and MPLS tunnels are L3 interfaces, so those pairs collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandleSpace {
    Route,
    LabelSwitch,
    L3Egress,
    Host,
    L3Intf,
    Station,
    Vlan,
    AclStat,
    AclEntry,
    Mirror,
    QosMap,
    Trunk,
    LoadBalancer,
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A full-mask route indexed in the host-route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostRouteKey {
    pub vrf: VrfId,
    pub ip: IpAddress,
}

impl fmt::Display for HostRouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vrf {} {}", self.vrf, self.ip)
    }
}

/// Any other route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixRouteKey {
    pub vrf: VrfId,
    pub prefix: IpPrefix,
}

impl fmt::Display for PrefixRouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vrf {} {}", self.vrf, self.prefix)
    }
}

/// A host table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostKey {
    pub vrf: VrfId,
    pub ip: IpAddress,
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vrf {} {}", self.vrf, self.ip)
    }
}

/// A next hop as recorded in the snapshot's host table.
///
/// The interface only takes part in the key for IPv6 link-local addresses,
/// where the same address can be reachable through several interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NextHopKey {
    pub vrf: VrfId,
    pub ip: IpAddress,
    pub intf: Option<u64>,
}

impl NextHopKey {
    pub fn new(vrf: VrfId, ip: IpAddress, intf: Option<u64>) -> Self {
        let intf = if ip.is_link_local() { intf } else { None };
        Self { vrf, ip, intf }
    }
}

impl fmt::Display for NextHopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.intf {
            Some(intf) => write!(f, "vrf {} {}@{}", self.vrf, self.ip, intf),
            None => write!(f, "vrf {} {}", self.vrf, self.ip),
        }
    }
}

/// An ECMP group, identified by the egress set it load-balances over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EcmpKey(BTreeSet<EgressHandle>);

impl EcmpKey {
    pub fn new(members: BTreeSet<EgressHandle>) -> Self {
        Self(members)
    }

    pub fn members(&self) -> &BTreeSet<EgressHandle> {
        &self.0
    }

    pub fn contains(&self, egress: EgressHandle) -> bool {
        self.0.contains(&egress)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, egress: EgressHandle) {
        self.0.insert(egress);
    }
}

impl FromIterator<EgressHandle> for EcmpKey {
    fn from_iter<I: IntoIterator<Item = EgressHandle>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for EcmpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ecmp [{}]", join(&self.0))
    }
}

/// Labels pushed by an MPLS next hop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelStack {
    /// A single label pushed directly by the egress.
    Label(u32),
    /// A stack pushed through a tunnel initiator.
    Stack(Vec<u32>),
}

impl fmt::Display for LabelStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelStack::Label(label) => write!(f, "label {}", label),
            LabelStack::Stack(stack) => write!(f, "stack {}", join(stack)),
        }
    }
}

/// An MPLS next hop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabeledHostKey {
    pub vrf: VrfId,
    pub labels: LabelStack,
    pub ip: IpAddress,
    pub intf: u32,
}

impl fmt::Display for LabeledHostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vrf {} {}@intf{} {}",
            self.vrf, self.ip, self.intf, self.labels
        )
    }
}

/// An MPLS tunnel initiator: the VLAN it egresses on and its label stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TunnelKey {
    pub vlan: VlanId,
    pub labels: Vec<u32>,
}

impl fmt::Display for TunnelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mpls tunnel vlan {} stack [{}]", self.vlan, join(&self.labels))
    }
}

/// A routed interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntfKey {
    pub vlan: VlanId,
    pub mac: MacAddress,
}

impl fmt::Display for IntfKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vlan {} mac {}", self.vlan, self.mac)
    }
}

/// A mirror destination: egress port plus optional encapsulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MirrorKey {
    pub egress_port: PortId,
    pub tunnel: Option<MirrorTunnel>,
}

impl fmt::Display for MirrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tunnel {
            Some(t) if t.is_sflow() => {
                write!(f, "sflow mirror via {} to {}", self.egress_port, t.dst_ip)
            }
            Some(t) => write!(f, "erspan mirror via {} to {}", self.egress_port, t.dst_ip),
            None => write!(f, "span mirror via {}", self.egress_port),
        }
    }
}

/// A port's mirroring binding: port plus direction/sampling flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MirroredPortKey {
    pub port: PortId,
    pub flags: u32,
}

impl fmt::Display for MirroredPortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} flags {:#x}", self.port, self.flags)
    }
}

/// An ACL entry's mirror action in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MirroredAclKey {
    pub entry: AclEntryHandle,
    pub direction: MirrorDirection,
}

impl fmt::Display for MirroredAclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acl {} {}", self.entry, self.direction)
    }
}

/// The role a QoS map plays for a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QosMapType {
    IpIngress,
    IpEgress,
    MplsIngress,
    MplsEgress,
}

impl fmt::Display for QosMapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QosMapType::IpIngress => write!(f, "ip_ingress"),
            QosMapType::IpEgress => write!(f, "ip_egress"),
            QosMapType::MplsIngress => write!(f, "mpls_ingress"),
            QosMapType::MplsEgress => write!(f, "mpls_egress"),
        }
    }
}

/// The logical identity of any resource the cache tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    HostRoute(HostRouteKey),
    PrefixRoute(PrefixRouteKey),
    LabelSwitchAction(u32),
    EcmpGroup(EcmpKey),
    Host(HostKey),
    Egress(EgressHandle),
    TunnelInitiator(TunnelKey),
    Interface(IntfKey),
    Station(VlanId),
    Vlan(VlanId),
    /// The stat bound to an ACL entry.
    AclStat(AclEntryHandle),
    /// An ACL entry by software priority.
    AclEntry(i32),
    MirroredPort(MirroredPortKey),
    MirroredAcl(MirroredAclKey),
    Mirror(MirrorKey),
    QosMap {
        policy: String,
        map_type: QosMapType,
        rules: BTreeSet<QosRule>,
    },
    Trunk(AggregatePortId),
}

impl ResourceKey {
    pub fn class(&self) -> ResourceClass {
        match self {
            ResourceKey::HostRoute(_) => ResourceClass::HostRoute,
            ResourceKey::PrefixRoute(_) => ResourceClass::PrefixRoute,
            ResourceKey::LabelSwitchAction(_) => ResourceClass::LabelSwitchAction,
            ResourceKey::EcmpGroup(_) => ResourceClass::EcmpGroup,
            ResourceKey::Host(_) => ResourceClass::Host,
            ResourceKey::Egress(_) => ResourceClass::Egress,
            ResourceKey::TunnelInitiator(_) => ResourceClass::TunnelInitiator,
            ResourceKey::Interface(_) => ResourceClass::Interface,
            ResourceKey::Station(_) => ResourceClass::Station,
            ResourceKey::Vlan(_) => ResourceClass::Vlan,
            ResourceKey::AclStat(_) => ResourceClass::AclStat,
            ResourceKey::AclEntry(_) => ResourceClass::AclEntry,
            ResourceKey::MirroredPort(_) => ResourceClass::MirroredPort,
            ResourceKey::MirroredAcl(_) => ResourceClass::MirroredAcl,
            ResourceKey::Mirror(_) => ResourceClass::Mirror,
            ResourceKey::QosMap { .. } => ResourceClass::QosMap,
            ResourceKey::Trunk(_) => ResourceClass::Trunk,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::HostRoute(k) => k.fmt(f),
            ResourceKey::PrefixRoute(k) => k.fmt(f),
            ResourceKey::LabelSwitchAction(label) => write!(f, "label {}", label),
            ResourceKey::EcmpGroup(k) => k.fmt(f),
            ResourceKey::Host(k) => k.fmt(f),
            ResourceKey::Egress(h) => write!(f, "egress {}", h),
            ResourceKey::TunnelInitiator(k) => k.fmt(f),
            ResourceKey::Interface(k) => k.fmt(f),
            ResourceKey::Station(vlan) => write!(f, "station vlan {}", vlan),
            ResourceKey::Vlan(vlan) => write!(f, "vlan {}", vlan),
            ResourceKey::AclStat(entry) => write!(f, "stat of acl {}", entry),
            ResourceKey::AclEntry(priority) => write!(f, "acl priority {}", priority),
            ResourceKey::MirroredPort(k) => k.fmt(f),
            ResourceKey::MirroredAcl(k) => k.fmt(f),
            ResourceKey::Mirror(k) => k.fmt(f),
            ResourceKey::QosMap {
                policy, map_type, ..
            } => write!(f, "qos policy {} {}", policy, map_type),
            ResourceKey::Trunk(agg) => write!(f, "{}", agg),
        }
    }
}

pub(crate) fn join<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
