//! Port and aggregate-port identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical front-panel port number as seen by the switch chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub u32);

impl PortId {
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port{}", self.0)
    }
}

impl From<u32> for PortId {
    fn from(id: u32) -> Self {
        PortId(id)
    }
}

/// Software identifier of a link aggregation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatePortId(pub u32);

impl fmt::Display for AggregatePortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortChannel{}", self.0)
    }
}

impl From<u32> for AggregatePortId {
    fn from(id: u32) -> Self {
        AggregatePortId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PortId(3).to_string(), "port3");
        assert_eq!(AggregatePortId(7).to_string(), "PortChannel7");
    }

    #[test]
    fn test_serde_transparent() {
        assert_eq!(serde_json::to_string(&PortId(5)).unwrap(), "5");
        let agg: AggregatePortId = serde_json::from_str("9").unwrap();
        assert_eq!(agg, AggregatePortId(9));
    }
}
