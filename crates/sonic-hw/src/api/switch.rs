//! Switch-wide settings: L2 learning and load-balancer hash state.

use crate::types::TrunkHandle;
use sonic_types::PortId;
use std::fmt;

/// Port learn flag bits.
pub mod learn_flags {
    /// Learn source addresses into the L2 table.
    pub const ARL: u32 = 1 << 0;
    /// Forward packets with unknown source addresses.
    pub const FWD: u32 = 1 << 1;
    /// Hold learned addresses pending software confirmation.
    pub const PENDING: u32 = 1 << 2;
    pub const CPU: u32 = 1 << 3;
}

/// One of the two hash computation blocks of the load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashModule {
    A,
    B,
}

impl fmt::Display for HashModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashModule::A => write!(f, "A"),
            HashModule::B => write!(f, "B"),
        }
    }
}

/// Consumer of a hash output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoadBalancerId {
    Ecmp,
    AggregatePort,
}

impl fmt::Display for LoadBalancerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadBalancerId::Ecmp => write!(f, "ECMP"),
            LoadBalancerId::AggregatePort => write!(f, "AGGREGATE_PORT"),
        }
    }
}

/// Per-module hash controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwitchControl {
    HashField0Config,
    HashField1Config,
    HashIp4Field0,
    HashIp4Field1,
    HashIp6Field0,
    HashIp6Field1,
    HashSeed,
    HashPreProcessEnable,
}

/// Output-selection controls per load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputSelectionControl {
    FlowBasedHash,
    HashSelect,
    HashOffset,
}

/// A trunk (link aggregation group) programmed in hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrunkEntry {
    pub handle: TrunkHandle,
    pub members: Vec<PortId>,
}
