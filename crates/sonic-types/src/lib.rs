//! Common types for switch control-plane code.
//!
//! This crate provides type-safe representations of the network primitives
//! that appear in resource keys throughout the warm-boot path:
//!
//! - [`IpAddress`]: IPv4 and IPv6 addresses
//! - [`IpPrefix`]: IP network prefixes, constructible from an address/mask pair
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`PortId`] / [`AggregatePortId`]: front-panel and LAG identifiers

mod ip;
mod mac;
mod port;
mod vlan;

pub use ip::{IpAddress, IpPrefix};
pub use mac::MacAddress;
pub use port::{AggregatePortId, PortId};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("non-contiguous network mask: {0}")]
    InvalidMask(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),
}
