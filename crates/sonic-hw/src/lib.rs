//! Hardware boundary for switch warm boot.
//!
//! This crate describes the forwarding hardware as the reconciliation code
//! sees it: opaque handles returned by the switch SDK, the entry records the
//! SDK reports while traversing its tables, and the deletion primitives used
//! to sweep stale state.
//!
//! # Architecture
//!
//! - [`types`]: Type-safe handles, one marker kind per resource class
//! - [`error`]: Hardware status codes and error type
//! - [`api`]: Entry records per table (L3, ACL, mirror, QoS, MPLS, switch)
//! - [`HwScanner`] / [`HwMutator`]: traversal and deletion traits
//! - [`sim`]: In-memory hardware unit with reference tracking
//!
//! # Example
//!
//! ```
//! use sonic_hw::{HwScanner, SimHardware};
//! use std::ops::ControlFlow;
//!
//! let hw = SimHardware::new();
//! let mut hosts = 0;
//! hw.hosts(&mut |_| {
//!     hosts += 1;
//!     ControlFlow::Continue(())
//! })
//! .unwrap();
//! assert_eq!(hosts, 0);
//! ```

pub mod api;
pub mod error;
pub mod sim;
pub mod types;

mod unit;

pub use api::{
    learn_flags, port_mirror_flags, AclEntry, EcmpEntry, EgressEntry, EgressFlags, HashModule,
    HostEntry, L2Station, L3Intf, LabelAction, LabelSwitchEntry, LoadBalancerId,
    MirrorDestination, MirrorDirection, MirrorTunnel, OutputSelectionControl, QosMapEntry,
    QosMapFlags, QosRule, RouteEntry, RouteTarget, SwitchControl, TrunkEntry, VlanEntry, VrfId,
};
pub use error::{HwError, HwResult, HwStatus};
pub use sim::SimHardware;
pub use types::{
    AclEntryHandle, AclStatHandle, EcmpHandle, EgressHandle, HostHandle, HwHandle, HwObjectKind,
    L3IntfHandle, LabelSwitchHandle, MirrorHandle, QosMapHandle, RawHandle, RouteHandle,
    StationHandle, TrunkHandle,
};
pub use unit::{HwMutator, HwScanner, Visitor};
