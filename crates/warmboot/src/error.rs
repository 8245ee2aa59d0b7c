//! Error types for warm-boot reconciliation.
//!
//! Apart from [`WarmBootError::Store`] every variant is fatal to the boot
//! attempt. A lookup miss is not an error; `find` returns `None`.

use crate::key::ResourceClass;
use sonic_hw::{HwError, RawHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarmBootError {
    /// A hardware table traversal returned a failure status.
    #[error("traversal of {class} table failed: {source}")]
    TraversalFailure {
        class: ResourceClass,
        #[source]
        source: HwError,
    },

    /// A key or handle was registered twice.
    #[error("duplicate {class} registration for {key} (handle {handle})")]
    DuplicateRegistration {
        class: ResourceClass,
        key: String,
        handle: RawHandle,
    },

    /// A hardware entry has no owner in the snapshot and is not a default object.
    #[error("unowned {class} {handle} found in hardware: {detail}")]
    UnownedResource {
        class: ResourceClass,
        handle: RawHandle,
        detail: String,
    },

    /// Deleting or detaching an unclaimed entry failed.
    #[error("failed to delete {class} {key} (handle {handle}): {source}")]
    DeletionFailure {
        class: ResourceClass,
        key: String,
        handle: RawHandle,
        #[source]
        source: HwError,
    },

    /// Entries were left unclaimed after the sweep.
    #[error("{count} unclaimed {class} entries remain after clear")]
    ResidualStateViolation { class: ResourceClass, count: usize },

    /// The snapshot document cannot be parsed or fails validation.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// `mark_claimed` was called for a key that is not in the cache.
    #[error("cannot claim {class} {key}: not present in warm boot cache")]
    InvalidClaim { class: ResourceClass, key: String },

    /// The snapshot binds a handle that hardware does not have.
    #[error("snapshot references {class} {handle} which is not in hardware")]
    DanglingReference {
        class: ResourceClass,
        handle: RawHandle,
    },

    /// Hardware settings that must agree do not.
    #[error("inconsistent hardware state: {0}")]
    InconsistentHardwareState(String),

    /// Snapshot storage failed.
    #[error("snapshot store error: {0}")]
    Store(#[from] std::io::Error),
}

impl WarmBootError {
    pub fn traversal(class: ResourceClass, source: HwError) -> Self {
        WarmBootError::TraversalFailure { class, source }
    }

    pub fn duplicate(class: ResourceClass, key: impl ToString, handle: RawHandle) -> Self {
        WarmBootError::DuplicateRegistration {
            class,
            key: key.to_string(),
            handle,
        }
    }

    pub fn unowned(class: ResourceClass, handle: RawHandle, detail: impl Into<String>) -> Self {
        WarmBootError::UnownedResource {
            class,
            handle,
            detail: detail.into(),
        }
    }

    pub fn deletion(
        class: ResourceClass,
        key: impl ToString,
        handle: RawHandle,
        source: HwError,
    ) -> Self {
        WarmBootError::DeletionFailure {
            class,
            key: key.to_string(),
            handle,
            source,
        }
    }

    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        WarmBootError::InvalidSnapshot(message.into())
    }

    pub fn invalid_claim(class: ResourceClass, key: impl ToString) -> Self {
        WarmBootError::InvalidClaim {
            class,
            key: key.to_string(),
        }
    }

    /// The resource class the error is about, when there is one.
    pub fn class(&self) -> Option<ResourceClass> {
        match self {
            WarmBootError::TraversalFailure { class, .. }
            | WarmBootError::DuplicateRegistration { class, .. }
            | WarmBootError::UnownedResource { class, .. }
            | WarmBootError::DeletionFailure { class, .. }
            | WarmBootError::ResidualStateViolation { class, .. }
            | WarmBootError::InvalidClaim { class, .. }
            | WarmBootError::DanglingReference { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// The offending handle, when there is one.
    pub fn handle(&self) -> Option<RawHandle> {
        match self {
            WarmBootError::DuplicateRegistration { handle, .. }
            | WarmBootError::UnownedResource { handle, .. }
            | WarmBootError::DeletionFailure { handle, .. }
            | WarmBootError::DanglingReference { handle, .. } => Some(*handle),
            _ => None,
        }
    }
}

/// Result type alias for warm-boot operations.
pub type Result<T> = std::result::Result<T, WarmBootError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sonic_hw::HwStatus;

    #[test]
    fn test_diagnostic_names_class_and_handle() {
        let err = WarmBootError::deletion(
            ResourceClass::Egress,
            "egress 100003",
            100_003,
            HwError::from_status(HwStatus::Busy),
        );
        assert_eq!(err.class(), Some(ResourceClass::Egress));
        assert_eq!(err.handle(), Some(100_003));
        let msg = err.to_string();
        assert!(msg.contains("egress"));
        assert!(msg.contains("100003"));
    }

    #[test]
    fn test_store_error_has_no_class() {
        let err = WarmBootError::from(std::io::Error::other("disk"));
        assert_eq!(err.class(), None);
        assert_eq!(err.handle(), None);
    }
}
