//! Trunks and load-balancer hash state.
//!
//! Neither family is deleted by the sweep. Trunks belong to the trunk
//! manager, and hash controls are plain settings that get overwritten; the
//! cache only lets managers skip reprogramming values that already match.

use super::scan::traverse;
use super::{WarmBootCache, SOURCE};
use crate::error::{Result, WarmBootError};
use crate::key::ResourceClass;
use sonic_hw::{
    HashModule, HwScanner, LoadBalancerId, OutputSelectionControl, SwitchControl, TrunkEntry,
    TrunkHandle,
};
use sonic_types::AggregatePortId;
use std::collections::BTreeSet;

impl WarmBootCache {
    pub(super) fn scan_trunks<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        let mut live = BTreeSet::new();
        traverse(
            ResourceClass::Trunk,
            |visit| hw.trunks(visit),
            |entry: &TrunkEntry| {
                live.insert(entry.handle);
                Ok(())
            },
        )?;

        let known: BTreeSet<TrunkHandle> = self.snapshot_trunks.values().copied().collect();
        for (agg, trunk) in self.snapshot_trunks.clone() {
            if !live.contains(&trunk) {
                crate::warn_log!(
                    SOURCE,
                    aggregate_port = %agg,
                    trunk = trunk.as_raw(),
                    "snapshot trunk missing from hardware"
                );
                continue;
            }
            self.register_owner(ResourceClass::Trunk, &agg, trunk.as_raw())?;
            self.trunks.register(agg, trunk)?;
        }
        for trunk in live.difference(&known) {
            crate::warn_log!(SOURCE, trunk = trunk.as_raw(), "hardware trunk not in snapshot");
        }
        Ok(())
    }

    pub(super) fn scan_load_balancer<H: HwScanner + ?Sized>(&mut self, hw: &H) -> Result<()> {
        let read_error = |e| WarmBootError::traversal(ResourceClass::LoadBalancer, e);
        for module in [HashModule::A, HashModule::B] {
            let state = hw.hash_module_state(module).map_err(read_error)?;
            self.hash_state.insert(module, state);
        }
        for lb in [LoadBalancerId::Ecmp, LoadBalancerId::AggregatePort] {
            let state = hw.output_selection_state(lb).map_err(read_error)?;
            self.output_selection.insert(lb, state);
        }
        Ok(())
    }

    pub fn find_trunk(&self, agg: AggregatePortId) -> Option<TrunkHandle> {
        self.trunks.find(&agg)
    }

    /// Records that the trunk manager kept the trunk of `agg`.
    pub fn programmed_trunk(&mut self, agg: AggregatePortId) -> Result<()> {
        self.trunks.mark_claimed(&agg).map(|_| ())
    }

    /// Whether hash module `module` already holds `value` for `control`.
    pub fn unit_control_matches(
        &self,
        module: HashModule,
        control: SwitchControl,
        value: i32,
    ) -> bool {
        self.hash_state
            .get(&module)
            .and_then(|state| state.get(&control))
            == Some(&value)
    }

    pub fn programmed_hash_control(
        &mut self,
        module: HashModule,
        control: SwitchControl,
    ) -> Result<()> {
        self.hash_state
            .get_mut(&module)
            .and_then(|state| state.remove(&control))
            .map(|_| ())
            .ok_or_else(|| {
                WarmBootError::invalid_claim(
                    ResourceClass::LoadBalancer,
                    format!("hash module {} {:?}", module, control),
                )
            })
    }

    pub fn output_selection_matches(
        &self,
        lb: LoadBalancerId,
        control: OutputSelectionControl,
        value: i32,
    ) -> bool {
        self.output_selection
            .get(&lb)
            .and_then(|state| state.get(&control))
            == Some(&value)
    }

    pub fn programmed_output_selection(
        &mut self,
        lb: LoadBalancerId,
        control: OutputSelectionControl,
    ) -> Result<()> {
        self.output_selection
            .get_mut(&lb)
            .and_then(|state| state.remove(&control))
            .map(|_| ())
            .ok_or_else(|| {
                WarmBootError::invalid_claim(
                    ResourceClass::LoadBalancer,
                    format!("{} output selection {:?}", lb, control),
                )
            })
    }

    /// Hash and output-selection controls no manager reported as programmed.
    pub(super) fn unprogrammed_controls(&self) -> usize {
        self.hash_state.values().map(|s| s.len()).sum::<usize>()
            + self.output_selection.values().map(|s| s.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarmBootConfig;
    use crate::snapshot::WarmBootSnapshot;
    use pretty_assertions::assert_eq;
    use sonic_hw::SimHardware;
    use sonic_types::PortId;

    #[test]
    fn test_trunks_bound_through_snapshot() {
        let mut hw = SimHardware::new();
        let kept = hw.create_trunk(vec![PortId(1), PortId(2)]);
        let stray = hw.create_trunk(vec![PortId(3)]);

        let mut snapshot = WarmBootSnapshot::empty();
        snapshot.trunks.insert(AggregatePortId(1), kept.as_raw());
        snapshot.trunks.insert(AggregatePortId(2), 999_999);

        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.restore(&snapshot).unwrap();
        cache.scan(&hw).unwrap();

        assert_eq!(cache.find_trunk(AggregatePortId(1)), Some(kept));
        assert_eq!(cache.find_trunk(AggregatePortId(2)), None);
        assert_eq!(cache.trunks.len(), 1);
        assert!(!cache.trunks.contains_handle(stray));

        cache.programmed_trunk(AggregatePortId(1)).unwrap();
        assert!(cache.programmed_trunk(AggregatePortId(2)).is_err());
    }

    #[test]
    fn test_hash_modules_keep_separate_state() {
        let mut hw = SimHardware::new();
        hw.set_hash_control(HashModule::A, SwitchControl::HashSeed, 7);
        hw.set_hash_control(HashModule::B, SwitchControl::HashSeed, 9);
        hw.set_output_selection(LoadBalancerId::Ecmp, OutputSelectionControl::HashSelect, 1);

        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.scan(&hw).unwrap();

        assert!(cache.unit_control_matches(HashModule::A, SwitchControl::HashSeed, 7));
        assert!(!cache.unit_control_matches(HashModule::B, SwitchControl::HashSeed, 7));
        assert!(!cache.unit_control_matches(HashModule::A, SwitchControl::HashField0Config, 0));
        assert!(cache.output_selection_matches(
            LoadBalancerId::Ecmp,
            OutputSelectionControl::HashSelect,
            1
        ));
        assert_eq!(cache.unprogrammed_controls(), 3);

        cache
            .programmed_hash_control(HashModule::A, SwitchControl::HashSeed)
            .unwrap();
        assert!(!cache.unit_control_matches(HashModule::A, SwitchControl::HashSeed, 7));
        let err = cache
            .programmed_hash_control(HashModule::A, SwitchControl::HashSeed)
            .unwrap_err();
        assert_eq!(err.class(), Some(ResourceClass::LoadBalancer));

        cache
            .programmed_output_selection(
                LoadBalancerId::Ecmp,
                OutputSelectionControl::HashSelect,
            )
            .unwrap();
        assert_eq!(cache.unprogrammed_controls(), 1);
    }
}
