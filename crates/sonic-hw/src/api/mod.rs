//! Entry records reported by hardware table traversal.
//!
//! Each submodule mirrors one family of hardware tables:
//!
//! - [`l3`]: hosts, routes, egress objects, ECMP groups, interfaces, stations, VLANs
//! - [`acl`]: field-processor entries with their stat and mirror actions
//! - [`mirror`]: mirror destinations and port mirroring
//! - [`qos`]: QoS maps
//! - [`mpls`]: label-switch actions
//! - [`switch`]: port learning, load-balancer hash state and trunks

pub mod acl;
pub mod l3;
pub mod mirror;
pub mod mpls;
pub mod qos;
pub mod switch;

pub use acl::AclEntry;
pub use l3::{
    EcmpEntry, EgressEntry, EgressFlags, HostEntry, L2Station, L3Intf, RouteEntry, RouteTarget,
    VlanEntry, VrfId,
};
pub use mirror::{port_mirror_flags, MirrorDestination, MirrorDirection, MirrorTunnel};
pub use mpls::{LabelAction, LabelSwitchEntry};
pub use qos::{QosMapEntry, QosMapFlags, QosRule};
pub use switch::{
    learn_flags, HashModule, LoadBalancerId, OutputSelectionControl, SwitchControl, TrunkEntry,
};
