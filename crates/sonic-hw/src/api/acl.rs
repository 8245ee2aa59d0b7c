//! Field-processor (ACL) entry records.

use crate::types::{AclEntryHandle, AclStatHandle, MirrorHandle};

/// An ACL entry in a field group together with its attached actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub handle: AclEntryHandle,
    pub group: u32,
    /// Hardware priority (higher wins).
    pub priority: i32,
    pub stat: Option<AclStatHandle>,
    pub ingress_mirror: Option<MirrorHandle>,
    pub egress_mirror: Option<MirrorHandle>,
}

impl AclEntry {
    /// Returns the mirror bound for the given direction, if any.
    pub fn mirror(&self, direction: crate::api::MirrorDirection) -> Option<MirrorHandle> {
        match direction {
            crate::api::MirrorDirection::Ingress => self.ingress_mirror,
            crate::api::MirrorDirection::Egress => self.egress_mirror,
        }
    }
}
