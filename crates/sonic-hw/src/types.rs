//! Type-safe hardware handles.
//!
//! The SDK hands out plain integers for every object it programs. Wrapping
//! them in [`HwHandle<T>`] keeps an egress id from being passed where an ECMP
//! group id is expected, which matters because both live in the same numeric
//! space on most chips.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw handle value as returned by the hardware layer. Zero is never valid.
pub type RawHandle = u64;

/// Marker trait for hardware object kinds.
pub trait HwObjectKind: Send + Sync + 'static {
    fn type_name() -> &'static str;
}

/// A typed hardware handle.
///
/// ```
/// use sonic_hw::{EgressHandle, EcmpHandle};
///
/// let egress = EgressHandle::from_raw(100_003).unwrap();
/// assert_eq!(egress.as_raw(), 100_003);
/// assert!(EcmpHandle::from_raw(0).is_none());
/// ```
pub struct HwHandle<T: HwObjectKind> {
    raw: RawHandle,
    _marker: PhantomData<T>,
}

impl<T: HwObjectKind> HwHandle<T> {
    /// Returns `None` for the null handle.
    pub fn from_raw(raw: RawHandle) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self {
                raw,
                _marker: PhantomData,
            })
        }
    }

    pub(crate) const fn new_unchecked(raw: RawHandle) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    pub const fn as_raw(&self) -> RawHandle {
        self.raw
    }

    pub fn kind_name(&self) -> &'static str {
        T::type_name()
    }
}

impl<T: HwObjectKind> Clone for HwHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: HwObjectKind> Copy for HwHandle<T> {}

impl<T: HwObjectKind> fmt::Debug for HwHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::type_name(), self.raw)
    }
}

impl<T: HwObjectKind> fmt::Display for HwHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T: HwObjectKind> PartialEq for HwHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: HwObjectKind> Eq for HwHandle<T> {}

impl<T: HwObjectKind> PartialOrd for HwHandle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: HwObjectKind> Ord for HwHandle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T: HwObjectKind> Hash for HwHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

macro_rules! define_object_kind {
    ($name:ident, $type_name:literal, $alias:ident) => {
        #[doc = concat!("Marker type for ", $type_name, " objects.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl HwObjectKind for $name {
            fn type_name() -> &'static str {
                $type_name
            }
        }

        #[doc = concat!("Handle of a ", $type_name, " object.")]
        pub type $alias = HwHandle<$name>;
    };
}

define_object_kind!(RouteKind, "Route", RouteHandle);
define_object_kind!(HostKind, "Host", HostHandle);
define_object_kind!(EgressKind, "Egress", EgressHandle);
define_object_kind!(EcmpKind, "EcmpGroup", EcmpHandle);
define_object_kind!(L3IntfKind, "L3Intf", L3IntfHandle);
define_object_kind!(StationKind, "Station", StationHandle);
define_object_kind!(AclEntryKind, "AclEntry", AclEntryHandle);
define_object_kind!(AclStatKind, "AclStat", AclStatHandle);
define_object_kind!(MirrorKind, "Mirror", MirrorHandle);
define_object_kind!(QosMapKind, "QosMap", QosMapHandle);
define_object_kind!(LabelSwitchKind, "LabelSwitchAction", LabelSwitchHandle);
define_object_kind!(TrunkKind, "Trunk", TrunkHandle);
