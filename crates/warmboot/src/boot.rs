//! Boot sequence driver.
//!
//! One [`WarmBoot::run`] call covers a whole generation handover for one
//! hardware unit: load, restore, scan, apply, clear. Any error it returns is
//! fatal; daemons pass it to [`fatal`].

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::cache::{ClearReport, WarmBootCache};
use crate::config::WarmBootConfig;
use crate::error::{Result, WarmBootError};
use crate::snapshot::WarmBootSnapshot;
use crate::store::SnapshotStore;
use serde_json::json;
use sonic_hw::{HwMutator, HwScanner};

const SOURCE: &str = "WarmBoot";

/// Drives the warm-boot sequence.
#[derive(Debug, Clone, Default)]
pub struct WarmBoot {
    config: WarmBootConfig,
}

impl WarmBoot {
    pub fn new(config: WarmBootConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WarmBootConfig {
        &self.config
    }

    /// Runs the boot sequence against `hw`.
    ///
    /// `apply` stands in for the resource managers: it programs the desired
    /// state, claiming every cached entry it reuses. Without a stored
    /// snapshot the boot is cold and every scanned entry that is not a
    /// default object is reported as unowned.
    pub fn run<H, F>(
        &self,
        hw: &mut H,
        store: &dyn SnapshotStore,
        apply: F,
    ) -> Result<ClearReport>
    where
        H: HwScanner + HwMutator,
        F: FnOnce(&mut WarmBootCache) -> Result<()>,
    {
        let (snapshot, warm) = match store.load()? {
            Some(snapshot) => (snapshot, true),
            None => (WarmBootSnapshot::empty(), false),
        };
        crate::audit_log!(
            AuditRecord::new(AuditCategory::WarmRestart, SOURCE, "begin")
                .with_outcome(AuditOutcome::InProgress)
                .with_details(json!({
                    "warm": warm,
                    "snapshot_version": snapshot.version,
                }))
        );

        let mut cache = WarmBootCache::new(self.config.clone());
        cache.restore(&snapshot)?;
        cache.scan(&*hw)?;
        apply(&mut cache)?;
        cache.clear(hw)
    }
}

/// Terminates the process over a fatal warm-boot error.
///
/// The audit record names the resource class and handle when the error has
/// them, so the supervisor's logs identify what blocked the boot.
pub fn fatal(err: &WarmBootError) -> ! {
    let mut record = AuditRecord::new(AuditCategory::ErrorCondition, SOURCE, "fatal")
        .with_outcome(AuditOutcome::Failure)
        .with_error(err.to_string());
    if let Some(class) = err.class() {
        record = record.with_object_type(class.as_str());
    }
    if let Some(handle) = err.handle() {
        record = record.with_object_id(handle.to_string());
    }
    crate::audit_log!(record);
    crate::error_log!(SOURCE, error = %err, "warm boot failed, aborting");
    std::process::abort()
}
