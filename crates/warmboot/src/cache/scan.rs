//! Hardware scan ingestion for L3 tables, VLANs and switch settings.
//!
//! Each traversal hands entries to an `ingest_*` method. The first entry that
//! fails classification stops the traversal and its error is returned once
//! the hardware call unwinds.

use super::{L2LearningMode, WarmBootCache, SOURCE};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::error::{Result, WarmBootError};
use crate::key::{
    HandleSpace, HostKey, HostRouteKey, IntfKey, PrefixRouteKey, ResourceClass, TunnelKey,
};
use sonic_hw::{
    EcmpEntry, EgressEntry, HostEntry, HwResult, HwScanner, L3IntfHandle, RouteEntry, Visitor,
};
use sonic_types::IpPrefix;
use std::collections::BTreeMap;
use std::ops::ControlFlow;

/// Runs one hardware traversal, feeding every entry to `ingest`.
pub(super) fn traverse<T>(
    class: ResourceClass,
    walk: impl FnOnce(Visitor<'_, T>) -> HwResult<()>,
    mut ingest: impl FnMut(&T) -> Result<()>,
) -> Result<()> {
    let mut failure = None;
    walk(&mut |entry| match ingest(entry) {
        Ok(()) => ControlFlow::Continue(()),
        Err(err) => {
            failure = Some(err);
            ControlFlow::Break(())
        }
    })
    .map_err(|source| WarmBootError::traversal(class, source))?;
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

impl WarmBootCache {
    /// Walks every hardware table and binds live handles to logical keys.
    ///
    /// Must run after [`restore`](Self::restore): egress and ECMP
    /// classification depends on the snapshot.
    pub fn scan<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        let result = self.scan_all(hw);
        if let Err(err) = &result {
            crate::audit_log!(AuditRecord::new(AuditCategory::ErrorCondition, SOURCE, "scan")
                .with_object_type(err.class().map_or("unknown", |c| c.as_str()))
                .with_error(err.to_string()));
        }
        result
    }

    fn scan_all<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        traverse(
            ResourceClass::Egress,
            |visit| hw.egresses(visit),
            |entry| self.ingest_egress(hw, entry),
        )?;
        traverse(
            ResourceClass::EcmpGroup,
            |visit| hw.ecmp_groups(visit),
            |entry| self.ingest_ecmp(entry),
        )?;
        traverse(
            ResourceClass::Host,
            |visit| hw.hosts(visit),
            |entry| self.ingest_host(entry),
        )?;
        traverse(
            ResourceClass::HostRoute,
            |visit| hw.routes(visit),
            |entry| self.ingest_route(entry),
        )?;
        self.scan_vlans(hw)?;
        self.scan_learning_mode(hw)?;
        self.scan_label_switch_actions(hw)?;
        self.scan_mirrors(hw)?;
        self.scan_mirrored_ports(hw)?;
        self.scan_acls(hw)?;
        self.scan_qos_maps(hw)?;
        self.scan_trunks(hw)?;
        self.scan_load_balancer(hw)?;

        let counts: BTreeMap<&str, usize> = self
            .entry_counts()
            .into_iter()
            .map(|(class, n)| (class.as_str(), n))
            .collect();
        crate::info_log!(
            SOURCE,
            hosts = self.hosts.len(),
            routes = self.host_routes.len() + self.prefix_routes.len(),
            egresses = self.egresses.len(),
            ecmps = self.ecmps.len(),
            "hardware scan complete"
        );
        crate::audit_log!(AuditRecord::new(AuditCategory::WarmRestart, SOURCE, "scan")
            .with_outcome(AuditOutcome::Success)
            .with_details(serde_json::json!(counts)));
        Ok(())
    }

    fn ingest_egress<H: HwScanner + ?Sized>(&mut self, hw: &H, entry: &EgressEntry) -> Result<()> {
        let handle = entry.handle;
        let raw = handle.as_raw();
        if self.egress_entries.contains_key(&handle) {
            return Err(WarmBootError::duplicate(
                ResourceClass::Egress,
                format!("egress {}", handle),
                raw,
            ));
        }

        if self.snapshot_egress_ids.contains(&handle) {
            crate::debug_log!(SOURCE, egress = raw, "egress referenced by snapshot");
        } else if entry.flags.is_drop() {
            if let Some(existing) = self.drop_egress {
                crate::error_log!(
                    SOURCE,
                    egress = raw,
                    existing = existing.as_raw(),
                    "second drop egress"
                );
                return Err(WarmBootError::duplicate(ResourceClass::Egress, "drop egress", raw));
            }
            self.drop_egress = Some(handle);
        } else if entry.flags.is_to_cpu() {
            if let Some(existing) = self.to_cpu_egress {
                crate::error_log!(
                    SOURCE,
                    egress = raw,
                    existing = existing.as_raw(),
                    "second to-cpu egress"
                );
                return Err(WarmBootError::duplicate(ResourceClass::Egress, "to-cpu egress", raw));
            }
            self.to_cpu_egress = Some(handle);
        } else {
            return Err(WarmBootError::unowned(
                ResourceClass::Egress,
                raw,
                format!(
                    "flags {} mac {} is neither referenced by the snapshot nor a default egress",
                    entry.flags, entry.mac
                ),
            ));
        }

        self.egresses.register(handle, handle)?;
        self.register_owner(ResourceClass::Egress, &handle, raw)?;
        self.egress_entries.insert(handle, entry.clone());

        if let (Some(_), Some(intf)) = (entry.mpls_label, entry.intf) {
            self.ingest_tunnel(hw, intf)?;
        }
        Ok(())
    }

    /// Indexes the tunnel initiator behind an MPLS egress. Several egresses
    /// may share one tunnel.
    fn ingest_tunnel<H: HwScanner + ?Sized>(&mut self, hw: &H, intf: L3IntfHandle) -> Result<()> {
        let class = ResourceClass::TunnelInitiator;
        let labels = hw
            .tunnel_initiator_get(intf, self.config.max_label_stack_depth)
            .map_err(|e| WarmBootError::traversal(class, e))?;
        let Some(labels) = labels else {
            // Label pushed by the egress itself, no tunnel.
            return Ok(());
        };
        let l3 = hw
            .l3_intf_get(intf)
            .map_err(|e| WarmBootError::traversal(class, e))?
            .ok_or_else(|| {
                WarmBootError::InconsistentHardwareState(format!(
                    "tunnel initiator on missing interface {}",
                    intf
                ))
            })?;

        let key = TunnelKey {
            vlan: l3.vlan,
            labels,
        };
        if self.tunnels.find(&key).is_some() {
            return Ok(());
        }
        crate::debug_log!(SOURCE, intf = intf.as_raw(), tunnel = %key, "found tunnel initiator");
        self.register_owner(class, &key, intf.as_raw())?;
        self.tunnels.register(key, intf)
    }

    fn ingest_ecmp(&mut self, entry: &EcmpEntry) -> Result<()> {
        let raw = entry.handle.as_raw();
        let paths = match self.ecmp_paths.get(&entry.handle) {
            Some(paths) => paths.clone(),
            // Some SDKs report the second word of a double-wide ECMP entry
            // as its own group with no members.
            None if entry.members.is_empty() => {
                crate::debug_log!(
                    SOURCE,
                    ecmp = raw,
                    "skipping memberless ecmp id unknown to snapshot"
                );
                return Ok(());
            }
            None => {
                return Err(WarmBootError::unowned(
                    ResourceClass::EcmpGroup,
                    raw,
                    format!("{} members but no snapshot membership", entry.members.len()),
                ))
            }
        };
        if paths.is_empty() {
            return Err(WarmBootError::unowned(
                ResourceClass::EcmpGroup,
                raw,
                "snapshot records no paths",
            ));
        }

        // Hardware omits members whose links are down; the snapshot does not.
        crate::debug_log!(
            SOURCE,
            ecmp = raw,
            hw_members = entry.members.len(),
            paths = %paths,
            "indexing ecmp by snapshot paths"
        );
        self.register_owner(ResourceClass::EcmpGroup, &paths, raw)?;
        self.ecmps.register(paths, entry.handle)
    }

    fn ingest_host(&mut self, entry: &HostEntry) -> Result<()> {
        let key = HostKey {
            vrf: entry.vrf,
            ip: entry.ip,
        };
        self.hosts.register(key, entry.handle)?;
        self.register_owner(ResourceClass::Host, &key, entry.handle.as_raw())?;
        self.host_entries.insert(key, entry.clone());
        Ok(())
    }

    fn ingest_route(&mut self, entry: &RouteEntry) -> Result<()> {
        let raw = entry.handle.as_raw();
        let prefix = IpPrefix::from_mask(entry.network, entry.mask).map_err(|e| {
            WarmBootError::InconsistentHardwareState(format!("route {}: {}", raw, e))
        })?;

        if self.config.host_table_for_host_routes && prefix.is_host_route() {
            let key = HostRouteKey {
                vrf: entry.vrf,
                ip: entry.network,
            };
            crate::debug_log!(SOURCE, route = %key, "host route found in route table");
            self.host_routes.register(key, entry.handle)?;
            self.register_owner(ResourceClass::HostRoute, &key, raw)
        } else {
            let key = PrefixRouteKey {
                vrf: entry.vrf,
                prefix,
            };
            self.prefix_routes.register(key, entry.handle)?;
            self.register_owner(ResourceClass::PrefixRoute, &key, raw)
        }
    }

    fn scan_vlans<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        let vlans = hw
            .vlans()
            .map_err(|e| WarmBootError::traversal(ResourceClass::Vlan, e))?;
        self.default_vlan = Some(
            hw.default_vlan()
                .map_err(|e| WarmBootError::traversal(ResourceClass::Vlan, e))?,
        );

        for entry in vlans {
            let vlan = entry.vlan;
            self.vlans.register(vlan, vlan)?;
            self.vlan_entries.insert(vlan, entry);

            let intf_class = ResourceClass::Interface;
            let intf = match self.snapshot_intfs.get(&vlan).copied() {
                Some(handle) => Some(
                    hw.l3_intf_get(handle)
                        .map_err(|e| WarmBootError::traversal(intf_class, e))?
                        .ok_or(WarmBootError::DanglingReference {
                            class: intf_class,
                            handle: handle.as_raw(),
                        })?,
                ),
                None => hw
                    .l3_intf_find_vlan(vlan)
                    .map_err(|e| WarmBootError::traversal(intf_class, e))?,
            };
            let Some(intf) = intf else {
                continue;
            };

            if self.owner_of(HandleSpace::L3Intf, intf.handle.as_raw())
                == Some(ResourceClass::TunnelInitiator)
            {
                crate::debug_log!(
                    SOURCE,
                    vlan = %vlan,
                    intf = intf.handle.as_raw(),
                    "interface is a tunnel initiator"
                );
            } else {
                let key = IntfKey {
                    vlan,
                    mac: intf.mac,
                };
                self.intfs.register(key, intf.handle)?;
                self.register_owner(intf_class, &key, intf.handle.as_raw())?;
            }

            let station = hw
                .l2_station_get(vlan)
                .map_err(|e| WarmBootError::traversal(ResourceClass::Station, e))?;
            if let Some(station) = station {
                self.stations.register(vlan, station.handle)?;
                self.register_owner(ResourceClass::Station, &vlan, station.handle.as_raw())?;
            }
        }
        Ok(())
    }

    fn scan_learning_mode<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        let read_error = |e| WarmBootError::traversal(ResourceClass::Vlan, e);
        let mut first = None;
        for port in hw.ports().map_err(read_error)? {
            let flags = hw.port_learn_flags(port).map_err(read_error)?;
            match first {
                None => first = Some((port, flags)),
                Some((first_port, first_flags)) if first_flags != flags => {
                    return Err(WarmBootError::InconsistentHardwareState(format!(
                        "{} learns with flags {:#x} but {} with {:#x}",
                        first_port, first_flags, port, flags
                    )))
                }
                Some(_) => {}
            }
        }

        self.learning_mode = match first {
            None => None,
            Some((port, flags)) => Some(L2LearningMode::from_flags(flags).ok_or_else(|| {
                WarmBootError::InconsistentHardwareState(format!(
                    "unrecognized learn flags {:#x} on {}",
                    flags, port
                ))
            })?),
        };
        Ok(())
    }
}
