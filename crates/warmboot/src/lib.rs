//! Warm-boot reconciliation for switch forwarding hardware.
//!
//! When the control plane restarts, the forwarding hardware keeps running on
//! the previous generation's routes, next hops, ACLs, mirrors and QoS maps.
//! This crate rebuilds an index of that live state so the restarted process
//! can reuse it instead of reprogramming, then sweeps whatever the new
//! generation did not ask for.
//!
//! # Boot sequence
//!
//! 1. [`SnapshotStore::load`] returns the document captured before shutdown
//! 2. [`WarmBootCache::restore`] indexes the snapshot's logical keys
//! 3. [`WarmBootCache::scan`] walks hardware tables and binds handles
//! 4. Resource managers call [`WarmBootCache::find`] and
//!    [`WarmBootCache::mark_claimed`] while applying desired state
//! 5. [`WarmBootCache::clear`] deletes every unclaimed entry in dependency order
//!
//! [`WarmBoot::run`] drives all of the above; [`boot::fatal`] turns any error
//! into a process abort with an audit record.

pub mod audit;
pub mod boot;
pub mod cache;
pub mod config;
pub mod error;
pub mod index;
pub mod key;
pub mod snapshot;
pub mod state;
pub mod store;

pub use boot::WarmBoot;
pub use cache::{ClearReport, ClassCounts, Deletion, L2LearningMode, WarmBootCache};
pub use config::WarmBootConfig;
pub use error::{Result, WarmBootError};
pub use index::{ClaimIndex, ClaimState, HandleMode};
pub use key::{
    EcmpKey, HandleSpace, HostKey, HostRouteKey, IntfKey, LabelStack, LabeledHostKey,
    MirrorKey, MirroredAclKey, MirroredPortKey, NextHopKey, PrefixRouteKey, QosMapType,
    ResourceClass, ResourceKey, TunnelKey,
};
pub use snapshot::{WarmBootSnapshot, SNAPSHOT_VERSION};
pub use state::WarmBootState;
pub use store::{FileSnapshotStore, SnapshotStore};
