//! MPLS label-switch records.

use crate::api::l3::RouteTarget;
use crate::types::LabelSwitchHandle;
use std::fmt;

/// Operation applied to packets arriving with a given top label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelAction {
    Swap(u32),
    Pop,
    Php,
}

impl fmt::Display for LabelAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelAction::Swap(label) => write!(f, "swap({})", label),
            LabelAction::Pop => write!(f, "pop"),
            LabelAction::Php => write!(f, "php"),
        }
    }
}

/// A label-switch (label FIB) entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSwitchEntry {
    pub handle: LabelSwitchHandle,
    pub label: u32,
    pub action: LabelAction,
    pub next_hop: Option<RouteTarget>,
}
