//! IP address and prefix types.
//!
//! Hardware reports routes as an address plus a network mask, while the
//! software side thinks in prefix lengths. [`IpPrefix::from_mask`] bridges
//! the two and rejects masks that are not contiguous.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IP address that can be either IPv4 or IPv6.
///
/// Serialized as its textual form so that snapshot documents stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpAddress(IpAddr);

impl IpAddress {
    pub const fn new(addr: IpAddr) -> Self {
        IpAddress(addr)
    }

    pub const fn v4(a: u8, b: u8, c: u8, d: u8) -> Self {
        IpAddress(IpAddr::V4(Ipv4Addr::new(a, b, c, d)))
    }

    pub const fn inner(&self) -> IpAddr {
        self.0
    }

    pub const fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    pub const fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }

    /// Address width in bits (32 or 128).
    pub const fn bit_count(&self) -> u8 {
        match self.0 {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }

    /// Returns true for IPv6 link-local addresses (fe80::/10).
    ///
    /// IPv4 link-local addresses are not special-cased: only v6 next hops
    /// need the egress interface to be unambiguous.
    pub fn is_link_local(&self) -> bool {
        match self.0 {
            IpAddr::V4(_) => false,
            IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) == 0xfe80,
        }
    }

    fn to_bits(self) -> u128 {
        match self.0 {
            IpAddr::V4(v4) => u32::from(v4) as u128,
            IpAddr::V6(v6) => u128::from(v6),
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for IpAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(IpAddress)
            .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
    }
}

impl TryFrom<String> for IpAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpAddress> for String {
    fn from(addr: IpAddress) -> String {
        addr.to_string()
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        IpAddress(addr)
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        IpAddress(IpAddr::V4(addr))
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(addr: Ipv6Addr) -> Self {
        IpAddress(IpAddr::V6(addr))
    }
}

/// An IP prefix in CIDR notation (e.g., 10.0.0.0/24 or 2001:db8::/32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    address: IpAddress,
    prefix_len: u8,
}

impl IpPrefix {
    /// Creates a new IP prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length exceeds the address width.
    pub fn new(address: IpAddress, prefix_len: u8) -> Result<Self, ParseError> {
        if prefix_len > address.bit_count() {
            return Err(ParseError::InvalidIpPrefix(format!(
                "{}/{}: prefix length exceeds {}",
                address,
                prefix_len,
                address.bit_count()
            )));
        }
        Ok(IpPrefix {
            address,
            prefix_len,
        })
    }

    /// Builds a prefix from a network address and a netmask, as returned by
    /// route table traversal.
    ///
    /// # Errors
    ///
    /// Fails if the families differ or the mask has holes.
    pub fn from_mask(address: IpAddress, mask: IpAddress) -> Result<Self, ParseError> {
        if address.is_ipv4() != mask.is_ipv4() {
            return Err(ParseError::InvalidMask(format!("{} for {}", mask, address)));
        }
        let width = address.bit_count() as u32;
        let bits = mask.to_bits() << (128 - width);
        let len = bits.leading_ones();
        if bits.checked_shl(len).unwrap_or(0) != 0 {
            return Err(ParseError::InvalidMask(mask.to_string()));
        }
        IpPrefix::new(address, len as u8)
    }

    pub const fn address(&self) -> &IpAddress {
        &self.address
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub const fn is_ipv4(&self) -> bool {
        self.address.is_ipv4()
    }

    pub const fn is_ipv6(&self) -> bool {
        self.address.is_ipv6()
    }

    /// Returns the netmask for this prefix in the same address family.
    pub fn mask(&self) -> IpAddress {
        let width = self.address.bit_count() as u32;
        let len = self.prefix_len as u32;
        let ones: u128 = if len == 0 {
            0
        } else {
            (!0u128) << (128 - len) >> (128 - width)
        };
        if self.address.is_ipv4() {
            IpAddress::from(Ipv4Addr::from(ones as u32))
        } else {
            IpAddress::from(Ipv6Addr::from(ones))
        }
    }

    /// Returns true if the mask covers the full address width (/32 or /128).
    pub const fn is_host_route(&self) -> bool {
        self.prefix_len == self.address.bit_count()
    }

    /// Returns true if this is the default route (0.0.0.0/0 or ::/0).
    pub const fn is_default(&self) -> bool {
        self.prefix_len == 0
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;
        let address: IpAddress = addr_str.parse()?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;
        IpPrefix::new(address, prefix_len)
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> String {
        prefix.to_string()
    }
}
