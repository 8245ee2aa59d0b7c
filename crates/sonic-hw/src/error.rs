//! Hardware status codes and error type.
//!
//! Switch SDKs report results as small negative integers. [`HwStatus`] names
//! the codes the warm-boot path cares about and [`HwError`] carries them as a
//! Rust error together with the object the call was made for.

use std::fmt;
use thiserror::Error;

/// Status codes returned by hardware table calls.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HwStatus {
    Ok = 0,
    Internal = -1,
    Memory = -2,
    Unit = -3,
    Param = -4,
    Empty = -5,
    Full = -6,
    NotFound = -7,
    Exists = -8,
    Timeout = -9,
    Busy = -10,
    Fail = -11,
    Disabled = -12,
    BadId = -13,
    Resource = -14,
    Config = -15,
    Unavailable = -16,
    Init = -17,
    Port = -18,
}

impl HwStatus {
    /// Maps a raw return code. Unknown codes collapse to `Internal`.
    pub fn from_raw(status: i32) -> Self {
        match status {
            0 => HwStatus::Ok,
            -2 => HwStatus::Memory,
            -3 => HwStatus::Unit,
            -4 => HwStatus::Param,
            -5 => HwStatus::Empty,
            -6 => HwStatus::Full,
            -7 => HwStatus::NotFound,
            -8 => HwStatus::Exists,
            -9 => HwStatus::Timeout,
            -10 => HwStatus::Busy,
            -11 => HwStatus::Fail,
            -12 => HwStatus::Disabled,
            -13 => HwStatus::BadId,
            -14 => HwStatus::Resource,
            -15 => HwStatus::Config,
            -16 => HwStatus::Unavailable,
            -17 => HwStatus::Init,
            -18 => HwStatus::Port,
            _ => HwStatus::Internal,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == HwStatus::Ok
    }

    pub fn into_result(self) -> HwResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(HwError::from_status(self))
        }
    }
}

impl fmt::Display for HwStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HwStatus::Ok => "E_NONE",
            HwStatus::Internal => "E_INTERNAL",
            HwStatus::Memory => "E_MEMORY",
            HwStatus::Unit => "E_UNIT",
            HwStatus::Param => "E_PARAM",
            HwStatus::Empty => "E_EMPTY",
            HwStatus::Full => "E_FULL",
            HwStatus::NotFound => "E_NOT_FOUND",
            HwStatus::Exists => "E_EXISTS",
            HwStatus::Timeout => "E_TIMEOUT",
            HwStatus::Busy => "E_BUSY",
            HwStatus::Fail => "E_FAIL",
            HwStatus::Disabled => "E_DISABLED",
            HwStatus::BadId => "E_BADID",
            HwStatus::Resource => "E_RESOURCE",
            HwStatus::Config => "E_CONFIG",
            HwStatus::Unavailable => "E_UNAVAIL",
            HwStatus::Init => "E_INIT",
            HwStatus::Port => "E_PORT",
        };
        write!(f, "{}", s)
    }
}

/// Error type for hardware calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HwError {
    /// The call returned a non-success status.
    #[error("hardware call failed: {status}")]
    Status { status: HwStatus },

    /// The object does not exist in hardware.
    #[error("not found: {object}")]
    NotFound { object: String },

    /// The object is still referenced by another hardware object.
    #[error("object in use: {object} (referenced by {user})")]
    ObjectInUse { object: String, user: String },

    /// Invalid argument passed to the hardware layer.
    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },
}

impl HwError {
    pub fn from_status(status: HwStatus) -> Self {
        HwError::Status { status }
    }

    pub fn not_found(object: impl Into<String>) -> Self {
        HwError::NotFound {
            object: object.into(),
        }
    }

    pub fn object_in_use(object: impl Into<String>, user: impl Into<String>) -> Self {
        HwError::ObjectInUse {
            object: object.into(),
            user: user.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        HwError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Returns the status code this error corresponds to.
    pub fn status(&self) -> HwStatus {
        match self {
            HwError::Status { status } => *status,
            HwError::NotFound { .. } => HwStatus::NotFound,
            HwError::ObjectInUse { .. } => HwStatus::Busy,
            HwError::InvalidParameter { .. } => HwStatus::Param,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == HwStatus::NotFound
    }
}

/// Result type for hardware calls.
pub type HwResult<T> = Result<T, HwError>;
