//! The sweep: deletes every entry the new generation did not claim.
//!
//! Classes are swept so that an object is always removed before anything it
//! references:
//!
//! ```text
//! host routes, prefix routes, label-switch actions
//!   -> ecmp groups -> hosts -> egress objects
//!   -> tunnel initiators -> interfaces -> stations -> vlans
//! acl stats -> acl entries
//! mirrored ports, mirrored acls -> mirrors
//! qos maps
//! ```
//!
//! Order within one class is key order and carries no meaning.

use super::{WarmBootCache, SOURCE};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::error::{Result, WarmBootError};
use crate::index::{ClaimIndex, ClaimState, IndexHandle};
use crate::key::ResourceClass;
use serde::Serialize;
use sonic_hw::{AclStatHandle, HwMutator, HwResult, MirrorHandle, RawHandle, TrunkHandle};
use sonic_types::AggregatePortId;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Per-class outcome of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    /// Entries claimed by the new generation.
    pub retained: usize,
    pub deleted: usize,
    /// Entries that went away with the object they hang off, without a
    /// hardware call of their own.
    pub cascaded: usize,
}

/// One hardware deletion or detach issued by the sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub class: ResourceClass,
    pub key: String,
    pub handle: RawHandle,
}

/// What [`WarmBootCache::clear`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub counts: BTreeMap<ResourceClass, ClassCounts>,
    /// Deletions in the order they were issued.
    pub deletions: Vec<Deletion>,
    /// Entries removed by an earlier deletion. No call was issued for them.
    pub cascaded: Vec<Deletion>,
    /// Trunks nobody claimed. They are left to the trunk manager.
    pub unclaimed_trunks: Vec<(AggregatePortId, TrunkHandle)>,
}

impl ClearReport {
    pub fn counts(&self, class: ResourceClass) -> ClassCounts {
        self.counts.get(&class).copied().unwrap_or_default()
    }

    pub fn total_deleted(&self) -> usize {
        self.counts.values().map(|c| c.deleted).sum()
    }

    pub fn total_retained(&self) -> usize {
        self.counts.values().map(|c| c.retained).sum()
    }

    pub fn total_cascaded(&self) -> usize {
        self.counts.values().map(|c| c.cascaded).sum()
    }

    pub fn deleted_handles(&self) -> BTreeSet<RawHandle> {
        self.deletions.iter().map(|d| d.handle).collect()
    }
}

/// Issues deletions against one unit and records them.
struct Sweep<'a, H: ?Sized> {
    hw: &'a mut H,
    deletions: Vec<Deletion>,
    cascaded: Vec<Deletion>,
}

impl<'a, H: HwMutator + ?Sized> Sweep<'a, H> {
    fn new(hw: &'a mut H) -> Self {
        Self {
            hw,
            deletions: Vec::new(),
            cascaded: Vec::new(),
        }
    }

    /// Records an entry that an earlier deletion already removed.
    fn cascade(&mut self, class: ResourceClass, key: &dyn fmt::Display, raw: RawHandle) {
        crate::debug_log!(
            SOURCE,
            class = %class,
            key = %key,
            handle = raw,
            "entry removed with its owner"
        );
        self.cascaded.push(Deletion {
            class,
            key: key.to_string(),
            handle: raw,
        });
    }

    fn delete(
        &mut self,
        class: ResourceClass,
        key: &dyn fmt::Display,
        raw: RawHandle,
        op: impl FnOnce(&mut H) -> HwResult<()>,
    ) -> Result<()> {
        crate::debug_log!(
            SOURCE,
            class = %class,
            key = %key,
            handle = raw,
            "deleting unclaimed entry"
        );
        match op(&mut *self.hw) {
            Ok(()) => {
                crate::audit_log!(AuditRecord::new(
                    AuditCategory::ResourceDelete,
                    SOURCE,
                    "delete_unclaimed"
                )
                .with_outcome(AuditOutcome::Success)
                .with_object_id(raw.to_string())
                .with_object_type(class.as_str())
                .with_details(serde_json::json!({ "key": key.to_string() })));
                self.deletions.push(Deletion {
                    class,
                    key: key.to_string(),
                    handle: raw,
                });
                Ok(())
            }
            Err(source) => {
                crate::audit_log!(AuditRecord::new(
                    AuditCategory::ResourceDelete,
                    SOURCE,
                    "delete_unclaimed"
                )
                .with_outcome(AuditOutcome::Failure)
                .with_object_id(raw.to_string())
                .with_object_type(class.as_str())
                .with_error(source.to_string()));
                Err(WarmBootError::deletion(class, key, raw, source))
            }
        }
    }

    /// Deletes every unclaimed entry of `index` with `op`.
    fn index<K, I>(
        &mut self,
        index: &mut ClaimIndex<K, I>,
        mut op: impl FnMut(&mut H, &K, I) -> HwResult<()>,
    ) -> Result<()>
    where
        K: Ord + Clone + fmt::Display,
        I: IndexHandle,
    {
        let class = index.class();
        for (key, handle) in index.unclaimed() {
            self.delete(class, &key, handle.raw(), |hw| op(hw, &key, handle))?;
            index.mark_deleted(&key);
        }
        Ok(())
    }
}

fn tally<K, I>(index: &ClaimIndex<K, I>) -> ClassCounts
where
    K: Ord + Clone + fmt::Display,
    I: IndexHandle,
{
    ClassCounts {
        retained: index.count(ClaimState::Claimed),
        deleted: index.count(ClaimState::Deleted),
        cascaded: 0,
    }
}

impl WarmBootCache {
    /// Deletes every unclaimed entry in dependency order and consumes the
    /// cache.
    ///
    /// Any failed hardware call stops the sweep with
    /// [`WarmBootError::DeletionFailure`]; the remaining entries are left in
    /// place. The caller is expected to abort the process.
    pub fn clear<H: HwMutator + ?Sized>(mut self, hw: &mut H) -> Result<ClearReport> {
        let mut sweep = Sweep::new(hw);
        let result = self.sweep_all(&mut sweep);
        if let Err(err) = &result {
            crate::audit_log!(AuditRecord::new(AuditCategory::ErrorCondition, SOURCE, "clear")
                .with_object_type(err.class().map_or("unknown", |c| c.as_str()))
                .with_details(serde_json::json!({ "completed": sweep.deletions.len() }))
                .with_error(err.to_string()));
        }
        result?;

        let mut counts = self.class_counts();
        for entry in &sweep.cascaded {
            let class_counts = counts.entry(entry.class).or_default();
            class_counts.deleted = class_counts.deleted.saturating_sub(1);
            class_counts.cascaded += 1;
        }
        let report = ClearReport {
            counts,
            deletions: sweep.deletions,
            cascaded: sweep.cascaded,
            unclaimed_trunks: self.trunks.unclaimed(),
        };
        for (agg, trunk) in &report.unclaimed_trunks {
            crate::warn_log!(
                SOURCE,
                aggregate_port = %agg,
                trunk = trunk.as_raw(),
                "trunk not claimed, leaving it to the trunk manager"
            );
        }
        let leftover = self.unprogrammed_controls();
        if leftover > 0 {
            crate::info_log!(SOURCE, controls = leftover, "hash controls not reprogrammed");
        }

        crate::info_log!(
            SOURCE,
            deleted = report.total_deleted(),
            retained = report.total_retained(),
            "warm boot sweep complete"
        );
        let retained: BTreeMap<&str, usize> = report
            .counts
            .iter()
            .map(|(class, counts)| (class.as_str(), counts.retained))
            .collect();
        crate::audit_log!(AuditRecord::new(AuditCategory::ResourceReuse, SOURCE, "clear")
            .with_outcome(AuditOutcome::Success)
            .with_details(serde_json::json!(retained)));
        crate::audit_log!(AuditRecord::new(AuditCategory::WarmRestart, SOURCE, "clear")
            .with_outcome(AuditOutcome::Success)
            .with_details(serde_json::json!({
                "deleted": report.total_deleted(),
                "retained": report.total_retained(),
                "cascaded": report.total_cascaded(),
                "unclaimed_trunks": report.unclaimed_trunks.len(),
            })));
        Ok(report)
    }

    fn sweep_all<H: HwMutator + ?Sized>(&mut self, sweep: &mut Sweep<'_, H>) -> Result<()> {
        sweep.index(&mut self.host_routes, |hw, _, route| hw.route_delete(route))?;
        sweep.index(&mut self.prefix_routes, |hw, _, route| hw.route_delete(route))?;
        sweep.index(&mut self.label_actions, |hw, _, action| {
            hw.label_switch_delete(action)
        })?;
        sweep.index(&mut self.ecmps, |hw, _, ecmp| hw.ecmp_destroy(ecmp))?;
        sweep.index(&mut self.hosts, |hw, _, host| hw.host_delete(host))?;
        sweep.index(&mut self.egresses, |hw, _, egress| hw.egress_destroy(egress))?;
        sweep.index(&mut self.tunnels, |hw, _, intf| {
            hw.tunnel_initiator_clear(intf)?;
            hw.l3_intf_delete(intf)
        })?;
        sweep.index(&mut self.intfs, |hw, _, intf| hw.l3_intf_delete(intf))?;
        sweep.index(&mut self.stations, |hw, vlan, _| hw.l2_station_delete(*vlan))?;

        // The default VLAN always survives.
        if let Some(default) = self.default_vlan {
            if self.vlans.find(&default).is_some() {
                self.vlans.mark_claimed(&default)?;
            }
        }
        sweep.index(&mut self.vlans, |hw, vlan, _| hw.vlan_destroy(*vlan))?;

        self.sweep_acl_stats(sweep)?;

        let mut destroyed_entries = BTreeSet::new();
        sweep.index(&mut self.acls, |hw, _, entry| {
            hw.acl_entry_destroy(entry)?;
            destroyed_entries.insert(entry);
            Ok(())
        })?;

        sweep.index(&mut self.mirrored_ports, |hw, key, mirror| {
            hw.port_mirror_delete(key.port, key.flags, mirror)
        })?;
        for (key, mirror) in self.mirrored_acls.unclaimed() {
            // Destroying the entry took its mirror actions with it.
            if destroyed_entries.contains(&key.entry) {
                sweep.cascade(ResourceClass::MirroredAcl, &key, mirror.as_raw());
            } else {
                sweep.delete(ResourceClass::MirroredAcl, &key, mirror.as_raw(), |hw| {
                    hw.acl_mirror_remove(key.entry, key.direction, mirror)
                })?;
            }
            self.mirrored_acls.mark_deleted(&key);
        }
        self.sweep_mirrors(sweep)?;
        self.check_mirror_residue()?;

        sweep.index(&mut self.qos_maps, |hw, _, map| hw.qos_map_destroy(map))?;
        Ok(())
    }

    /// Detaches every unclaimed stat binding, then destroys the stats no
    /// claimed binding still uses.
    fn sweep_acl_stats<H: HwMutator + ?Sized>(&mut self, sweep: &mut Sweep<'_, H>) -> Result<()> {
        let class = ResourceClass::AclStat;
        let unclaimed = self.acl_stats.unclaimed();
        let in_use: BTreeSet<AclStatHandle> = self
            .acl_stats
            .claimed()
            .into_iter()
            .map(|(_, stat)| stat)
            .collect();

        for (entry, stat) in &unclaimed {
            let key = format!("stat {} on acl entry {}", stat, entry);
            sweep.delete(class, &key, stat.as_raw(), |hw| {
                hw.acl_stat_detach(*entry, *stat)
            })?;
        }
        let orphaned: BTreeSet<AclStatHandle> = unclaimed
            .iter()
            .map(|(_, stat)| *stat)
            .filter(|stat| !in_use.contains(stat))
            .collect();
        for stat in orphaned {
            sweep.delete(class, &stat, stat.as_raw(), |hw| hw.acl_stat_destroy(stat))?;
        }
        for (entry, _) in &unclaimed {
            self.acl_stats.mark_deleted(entry);
        }
        Ok(())
    }

    fn sweep_mirrors<H: HwMutator + ?Sized>(&mut self, sweep: &mut Sweep<'_, H>) -> Result<()> {
        let in_use: BTreeSet<MirrorHandle> = self
            .mirrored_ports
            .claimed()
            .into_iter()
            .map(|(_, mirror)| mirror)
            .chain(
                self.mirrored_acls
                    .claimed()
                    .into_iter()
                    .map(|(_, mirror)| mirror),
            )
            .collect();

        for (key, mirror) in self.mirrors.unclaimed() {
            if in_use.contains(&mirror) {
                crate::warn_log!(
                    SOURCE,
                    mirror = mirror.as_raw(),
                    key = %key,
                    "unclaimed mirror still has claimed users, keeping it"
                );
                continue;
            }
            sweep.delete(ResourceClass::Mirror, &key, mirror.as_raw(), |hw| {
                hw.mirror_destination_destroy(mirror)
            })?;
            self.mirrors.mark_deleted(&key);
        }
        Ok(())
    }

    /// After the mirror sweep nothing mirror related may be left unclaimed.
    fn check_mirror_residue(&self) -> Result<()> {
        let residue = [
            (ResourceClass::Mirror, self.mirrors.count(ClaimState::Unclaimed)),
            (
                ResourceClass::MirroredPort,
                self.mirrored_ports.count(ClaimState::Unclaimed),
            ),
            (
                ResourceClass::MirroredAcl,
                self.mirrored_acls.count(ClaimState::Unclaimed),
            ),
        ];
        for (class, count) in residue {
            if count > 0 {
                crate::error_log!(
                    SOURCE,
                    class = %class,
                    count = count,
                    "unclaimed entries survived the sweep"
                );
                return Err(WarmBootError::ResidualStateViolation { class, count });
            }
        }
        Ok(())
    }

    fn class_counts(&self) -> BTreeMap<ResourceClass, ClassCounts> {
        BTreeMap::from([
            (ResourceClass::HostRoute, tally(&self.host_routes)),
            (ResourceClass::PrefixRoute, tally(&self.prefix_routes)),
            (ResourceClass::LabelSwitchAction, tally(&self.label_actions)),
            (ResourceClass::EcmpGroup, tally(&self.ecmps)),
            (ResourceClass::Host, tally(&self.hosts)),
            (ResourceClass::Egress, tally(&self.egresses)),
            (ResourceClass::TunnelInitiator, tally(&self.tunnels)),
            (ResourceClass::Interface, tally(&self.intfs)),
            (ResourceClass::Station, tally(&self.stations)),
            (ResourceClass::Vlan, tally(&self.vlans)),
            (ResourceClass::AclStat, tally(&self.acl_stats)),
            (ResourceClass::AclEntry, tally(&self.acls)),
            (ResourceClass::MirroredPort, tally(&self.mirrored_ports)),
            (ResourceClass::MirroredAcl, tally(&self.mirrored_acls)),
            (ResourceClass::Mirror, tally(&self.mirrors)),
            (ResourceClass::QosMap, tally(&self.qos_maps)),
            (ResourceClass::Trunk, tally(&self.trunks)),
        ])
    }
}
