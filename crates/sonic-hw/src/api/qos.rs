//! QoS map records.

use crate::types::QosMapHandle;
use std::collections::BTreeSet;
use std::fmt;

/// QoS map flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QosMapFlags(pub u32);

impl QosMapFlags {
    pub const INGRESS: QosMapFlags = QosMapFlags(1 << 0);
    pub const EGRESS: QosMapFlags = QosMapFlags(1 << 1);
    pub const L3: QosMapFlags = QosMapFlags(1 << 2);
    pub const MPLS: QosMapFlags = QosMapFlags(1 << 3);

    pub const fn union(self, other: QosMapFlags) -> QosMapFlags {
        QosMapFlags(self.0 | other.0)
    }

    pub const fn contains(&self, other: QosMapFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for QosMapFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One mapping between a traffic class and a marking value (DSCP or EXP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QosRule {
    pub traffic_class: u16,
    pub attr: u8,
}

impl QosRule {
    pub const fn new(traffic_class: u16, attr: u8) -> Self {
        Self {
            traffic_class,
            attr,
        }
    }
}

/// A QoS map and the rules it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QosMapEntry {
    pub handle: QosMapHandle,
    pub flags: QosMapFlags,
    pub rules: BTreeSet<QosRule>,
}
