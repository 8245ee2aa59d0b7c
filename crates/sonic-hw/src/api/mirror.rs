//! Mirror destination records.

use crate::types::MirrorHandle;
use sonic_types::{IpAddress, MacAddress, PortId};
use std::fmt;

/// Traffic direction a mirror applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MirrorDirection {
    Ingress,
    Egress,
}

impl fmt::Display for MirrorDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorDirection::Ingress => write!(f, "ingress"),
            MirrorDirection::Egress => write!(f, "egress"),
        }
    }
}

/// Port mirroring flag bits used by `port_mirror_get`.
pub mod port_mirror_flags {
    pub const INGRESS: u32 = 1 << 0;
    pub const EGRESS: u32 = 1 << 1;
    /// Sampled (sFlow) mirroring rather than full-copy mirroring.
    pub const SFLOW: u32 = 1 << 2;

    pub const fn for_direction(direction: super::MirrorDirection) -> u32 {
        match direction {
            super::MirrorDirection::Ingress => INGRESS,
            super::MirrorDirection::Egress => EGRESS,
        }
    }
}

/// Encapsulation used by a remote mirror (ERSPAN over GRE, or sFlow over UDP).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MirrorTunnel {
    pub src_ip: IpAddress,
    pub dst_ip: IpAddress,
    pub src_mac: MacAddress,
    pub dst_mac: MacAddress,
    /// Present for sFlow tunnels: (source, destination) UDP ports.
    pub udp_ports: Option<(u16, u16)>,
    pub ttl: u8,
}

impl MirrorTunnel {
    pub fn is_sflow(&self) -> bool {
        self.udp_ports.is_some()
    }
}

/// A mirror destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorDestination {
    pub handle: MirrorHandle,
    pub egress_port: PortId,
    pub tunnel: Option<MirrorTunnel>,
}

impl MirrorDestination {
    pub fn is_sflow(&self) -> bool {
        self.tunnel.as_ref().is_some_and(MirrorTunnel::is_sflow)
    }
}
