//! Audit logging for warm-boot reconciliation.
//!
//! Every hardware deletion issued during the sweep and every fatal condition
//! produces an [`AuditRecord`], so an operator can reconstruct exactly what a
//! restart removed from the forwarding plane.
//!
//! Records carry the fields NIST SP 800-53 AU-3 asks for (time, source,
//! action, outcome, affected object) with UTC stamps per AU-8.
//!
//! The `*_log!` macros tag each line with the emitting component. Per-entry
//! scan and claim decisions go to debug, phase summaries to info, ignored
//! hardware state to warn and boot-fatal failures to error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit event categories relevant to warm boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    /// Boot sequence milestones
    WarmRestart,
    /// A hardware object was reused by the new generation
    ResourceReuse,
    /// An unclaimed hardware object was deleted
    ResourceDelete,
    /// Raw hardware interaction (traversal, detach)
    HardwareOperation,
    /// Error and failure events
    ErrorCondition,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditCategory::WarmRestart => write!(f, "WARM_RESTART"),
            AuditCategory::ResourceReuse => write!(f, "RESOURCE_REUSE"),
            AuditCategory::ResourceDelete => write!(f, "RESOURCE_DELETE"),
            AuditCategory::HardwareOperation => write!(f, "HARDWARE_OPERATION"),
            AuditCategory::ErrorCondition => write!(f, "ERROR_CONDITION"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    InProgress,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Failure => write!(f, "failure"),
            AuditOutcome::InProgress => write!(f, "in_progress"),
        }
    }
}

/// Structured audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub category: AuditCategory,
    /// Component that generated the event
    pub source: String,
    pub action: String,
    pub outcome: AuditOutcome,
    /// Hardware handle or logical key of the affected object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Resource class of the affected object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// Creates a record stamped with the current time. Outcome starts as
    /// `InProgress`.
    pub fn new(
        category: AuditCategory,
        source: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            source: source.into(),
            action: action.into(),
            outcome: AuditOutcome::InProgress,
            object_id: None,
            object_type: None,
            details: None,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_object_type(mut self, obj_type: impl Into<String>) -> Self {
        self.object_type = Some(obj_type.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the error message and marks the outcome as `Failure`.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization_failed","message":"{}"}}"#, e))
    }
}

/// Debug-level log line tagged with its source component.
///
/// ```ignore
/// debug_log!("WarmBootCache", handle = 100003, "claimed egress");
/// ```
#[macro_export]
macro_rules! debug_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::debug!(
            source = $source,
            $($arg)*
        )
    };
}

#[macro_export]
macro_rules! info_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::info!(
            source = $source,
            $($arg)*
        )
    };
}

#[macro_export]
macro_rules! warn_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::warn!(
            source = $source,
            $($arg)*
        )
    };
}

#[macro_export]
macro_rules! error_log {
    ($source:expr, $($arg:tt)*) => {
        tracing::error!(
            source = $source,
            $($arg)*
        )
    };
}

/// Emits an [`AuditRecord`] on the `audit` target. See [`emit`].
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        $crate::audit::emit(&$record)
    };
}

/// Writes `record` at a level chosen by its outcome: failures at error,
/// completed actions at info, milestones still in progress at debug.
pub fn emit(record: &AuditRecord) {
    let json = record.to_json();
    match record.outcome {
        AuditOutcome::Failure => tracing::error!(
            target: "audit",
            category = %record.category,
            source = %record.source,
            error = record.error.as_deref().unwrap_or(""),
            audit_json = %json,
            "AUDIT {} {} failed",
            record.category,
            record.action
        ),
        AuditOutcome::Success => tracing::info!(
            target: "audit",
            category = %record.category,
            source = %record.source,
            audit_json = %json,
            "AUDIT {} {} ok",
            record.category,
            record.action
        ),
        AuditOutcome::InProgress => tracing::debug!(
            target: "audit",
            category = %record.category,
            source = %record.source,
            audit_json = %json,
            "AUDIT {} {}",
            record.category,
            record.action
        ),
    }
}

fn level_filter(log_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level))
}

/// Installs a JSON subscriber, for daemons whose output is collected.
///
/// `RUST_LOG` overrides `log_level`. The `log` records of the hardware layer
/// reach the subscriber through tracing's `log` bridge.
pub fn init_logging(log_level: &str) {
    use tracing_subscriber::prelude::*;

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    tracing_subscriber::registry()
        .with(level_filter(log_level))
        .with(layer)
        .init();
}

/// Installs a multi-line human-readable subscriber for interactive tools.
pub fn init_logging_pretty(log_level: &str) {
    use tracing_subscriber::prelude::*;

    let layer = tracing_subscriber::fmt::layer().pretty().with_file(true);
    tracing_subscriber::registry()
        .with(level_filter(log_level))
        .with(layer)
        .init();
}
