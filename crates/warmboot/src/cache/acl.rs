//! ACL entries of the agent's field group, their stats and mirror actions.

use super::scan::traverse;
use super::{WarmBootCache, SOURCE};
use crate::error::{Result, WarmBootError};
use crate::key::{MirroredAclKey, ResourceClass};
use sonic_hw::{AclEntry, AclEntryHandle, AclStatHandle, HwScanner, MirrorDirection};

impl WarmBootCache {
    pub(super) fn scan_acls<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        let group = self.config.acl_group_id;
        traverse(
            ResourceClass::AclEntry,
            |visit| hw.acl_entries(group, visit),
            |entry| self.ingest_acl(entry),
        )
    }

    fn ingest_acl(&mut self, entry: &AclEntry) -> Result<()> {
        let handle = entry.handle;
        crate::debug_log!(
            SOURCE,
            priority = entry.priority,
            entry = handle.as_raw(),
            "found acl entry"
        );
        // Priority is unique within the group, so it identifies the entry.
        self.acls.register(entry.priority, handle)?;
        self.register_owner(ResourceClass::AclEntry, &entry.priority, handle.as_raw())?;

        if let Some(stat) = entry.stat {
            self.acl_stats.register(handle, stat)?;
            self.register_owner(ResourceClass::AclStat, &stat, stat.as_raw())?;
        }

        for direction in [MirrorDirection::Ingress, MirrorDirection::Egress] {
            if let Some(mirror) = entry.mirror(direction) {
                if !self.mirrors.contains_handle(mirror) {
                    return Err(WarmBootError::InconsistentHardwareState(format!(
                        "acl entry {} {} mirrors to unknown destination {}",
                        handle, direction, mirror
                    )));
                }
                self.mirrored_acls.register(
                    MirroredAclKey {
                        entry: handle,
                        direction,
                    },
                    mirror,
                )?;
            }
        }
        Ok(())
    }

    pub fn find_acl(&self, priority: i32) -> Option<AclEntryHandle> {
        self.acls.find(&priority)
    }

    /// The stat attached to an ACL entry.
    pub fn find_acl_stat(&self, entry: AclEntryHandle) -> Option<AclStatHandle> {
        self.acl_stats.find(&entry)
    }
}
