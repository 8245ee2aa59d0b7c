//! Mirror destinations and the port bindings that use them.
//!
//! ACL mirror actions are discovered with the ACL entries; see `acl`.

use super::scan::traverse;
use super::{WarmBootCache, SOURCE};
use crate::error::{Result, WarmBootError};
use crate::index::ClaimState;
use crate::key::{MirrorKey, MirroredAclKey, MirroredPortKey, ResourceClass};
use sonic_hw::api::port_mirror_flags;
use sonic_hw::{
    AclEntryHandle, HwScanner, MirrorDestination, MirrorDirection, MirrorHandle, MirrorTunnel,
};
use sonic_types::PortId;

impl WarmBootCache {
    pub(super) fn scan_mirrors<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        traverse(
            ResourceClass::Mirror,
            |visit| hw.mirror_destinations(visit),
            |entry| self.ingest_mirror(entry),
        )
    }

    fn ingest_mirror(&mut self, entry: &MirrorDestination) -> Result<()> {
        let key = MirrorKey {
            egress_port: entry.egress_port,
            tunnel: entry.tunnel.clone(),
        };
        crate::debug_log!(SOURCE, mirror = entry.handle.as_raw(), key = %key, "found mirror");
        self.register_owner(ResourceClass::Mirror, &key, entry.handle.as_raw())?;
        self.mirrors.register(key, entry.handle)?;
        if entry.is_sflow() {
            self.sflow_mirrors.insert(entry.handle);
        }
        Ok(())
    }

    pub(super) fn scan_mirrored_ports<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        let class = ResourceClass::MirroredPort;
        let mut flag_sets = vec![
            port_mirror_flags::for_direction(MirrorDirection::Ingress),
            port_mirror_flags::for_direction(MirrorDirection::Egress),
        ];
        if self.config.sflow_sampling_supported {
            flag_sets.push(port_mirror_flags::INGRESS | port_mirror_flags::SFLOW);
        }

        let ports = hw.ports().map_err(|e| WarmBootError::traversal(class, e))?;
        for port in ports {
            for flags in &flag_sets {
                let mirror = hw
                    .port_mirror_get(port, *flags)
                    .map_err(|e| WarmBootError::traversal(class, e))?;
                let Some(mirror) = mirror else {
                    continue;
                };
                let key = MirroredPortKey {
                    port,
                    flags: *flags,
                };
                if !self.mirrors.contains_handle(mirror) {
                    return Err(WarmBootError::InconsistentHardwareState(format!(
                        "{} mirrors to unknown destination {}",
                        key, mirror
                    )));
                }
                crate::debug_log!(
                    SOURCE,
                    binding = %key,
                    mirror = mirror.as_raw(),
                    "found mirrored port"
                );
                self.mirrored_ports.register(key, mirror)?;
            }
        }
        Ok(())
    }

    pub fn find_mirror(
        &self,
        egress_port: PortId,
        tunnel: Option<MirrorTunnel>,
    ) -> Option<MirrorHandle> {
        self.mirrors.find(&MirrorKey {
            egress_port,
            tunnel,
        })
    }

    pub fn find_mirrored_port(&self, port: PortId, flags: u32) -> Option<MirrorHandle> {
        self.mirrored_ports.find(&MirroredPortKey { port, flags })
    }

    pub fn find_mirrored_acl(
        &self,
        entry: AclEntryHandle,
        direction: MirrorDirection,
    ) -> Option<MirrorHandle> {
        self.mirrored_acls.find(&MirroredAclKey { entry, direction })
    }

    /// Claims a port mirroring binding.
    ///
    /// The sampling manager programs every port of an sFlow session in one
    /// go, so claiming one binding to an sFlow destination claims all
    /// bindings with the same flags and destination.
    pub(super) fn claim_mirrored_port(&mut self, key: &MirroredPortKey) -> Result<bool> {
        let mirror = self
            .mirrored_ports
            .find(key)
            .ok_or_else(|| WarmBootError::invalid_claim(ResourceClass::MirroredPort, key))?;
        if !self.sflow_mirrors.contains(&mirror) {
            return self.mirrored_ports.mark_claimed(key);
        }

        let group: Vec<MirroredPortKey> = self
            .mirrored_ports
            .iter()
            .filter(|(k, handle, state)| {
                k.flags == key.flags && *handle == mirror && *state != ClaimState::Deleted
            })
            .map(|(k, _, _)| *k)
            .collect();
        let mut changed = false;
        for member in &group {
            changed |= self.mirrored_ports.mark_claimed(member)?;
        }
        crate::debug_log!(
            SOURCE,
            mirror = mirror.as_raw(),
            ports = group.len(),
            "claimed sflow port group"
        );
        Ok(changed)
    }
}
