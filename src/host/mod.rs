//! The host data access interface.
//!
//! [`DataAccess`] is the contract the dataref handles consume: one method per
//! host operation (find, introspect, typed get/set, windowed get/set, accessor
//! registration, logging and feature switches). Implementations:
//!
//! - [`XplmHost`] - calls straight into the simulator through `xplm-sys`
//! - [`MockHost`] - in-memory registry for tests and demos (feature `mock`)
//! - [`GuardedHost`] - wraps another host and checks the calling thread
//!
//! # Windowed access
//!
//! Array and byte accessors follow the host's length-query convention: passing no
//! destination returns the current element count without copying anything.
//! With a destination, at most `dest.len()` elements starting at `offset` are
//! copied and the number copied is returned.

use std::ffi::{c_void, CStr};
use std::fmt;
use std::ptr::NonNull;

use bitflags::bitflags;

pub mod guard;
#[cfg(feature = "mock")]
pub mod mock;
pub mod xplm;

pub use guard::GuardedHost;
#[cfg(feature = "mock")]
pub use mock::MockHost;
pub use xplm::XplmHost;

/// Opaque, non-null host handle for a dataref or an accessor registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawDataref(NonNull<c_void>);

impl RawDataref {
    /// Wrap a raw host handle, `None` for null.
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// The raw handle for passing back to the host.
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

bitflags! {
    /// Types a host reports for a dataref.
    ///
    /// The host reports a bitfield; numeric datarefs are frequently reported
    /// with several of the scalar bits set at once. No bits set means the
    /// type is unknown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostTypes: i32 {
        const INT = xplm_sys::xplmType_Int as i32;
        const FLOAT = xplm_sys::xplmType_Float as i32;
        const DOUBLE = xplm_sys::xplmType_Double as i32;
        const FLOAT_ARRAY = xplm_sys::xplmType_FloatArray as i32;
        const INT_ARRAY = xplm_sys::xplmType_IntArray as i32;
        const DATA = xplm_sys::xplmType_Data as i32;

        /// The scalar numeric triad
        const NUMERIC = Self::INT.bits() | Self::FLOAT.bits() | Self::DOUBLE.bits();
    }
}

impl HostTypes {
    /// Interpret a raw `XPLMDataTypeID`, keeping unknown bits.
    pub fn from_raw(raw: i32) -> Self {
        Self::from_bits_retain(raw)
    }

    /// True when the host reported no type.
    pub fn is_unknown(self) -> bool {
        self.is_empty()
    }
}

impl fmt::Display for HostTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "xplmType_Unknown");
        }

        let names = [
            (Self::INT, "xplmType_Int"),
            (Self::FLOAT, "xplmType_Float"),
            (Self::DOUBLE, "xplmType_Double"),
            (Self::FLOAT_ARRAY, "xplmType_FloatArray"),
            (Self::INT_ARRAY, "xplmType_IntArray"),
            (Self::DATA, "xplmType_Data"),
        ];

        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }

        let unknown = self.bits() & !Self::all().bits();
        if unknown != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "0x{:x}", unknown)?;
        }

        Ok(())
    }
}

/// Accessor entry points handed to the host when publishing a dataref.
///
/// Slots map one-to-one onto the `XPLMRegisterDataAccessor` arguments. Empty
/// slots tell the host the dataref cannot be read or written that way.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackTable {
    /// Int getter
    pub read_int: xplm_sys::XPLMGetDatai_f,
    /// Int setter
    pub write_int: xplm_sys::XPLMSetDatai_f,
    /// Float getter
    pub read_float: xplm_sys::XPLMGetDataf_f,
    /// Float setter
    pub write_float: xplm_sys::XPLMSetDataf_f,
    /// Double getter
    pub read_double: xplm_sys::XPLMGetDatad_f,
    /// Double setter
    pub write_double: xplm_sys::XPLMSetDatad_f,
    /// Windowed int array getter
    pub read_int_array: xplm_sys::XPLMGetDatavi_f,
    /// Windowed int array setter
    pub write_int_array: xplm_sys::XPLMSetDatavi_f,
    /// Windowed float array getter
    pub read_float_array: xplm_sys::XPLMGetDatavf_f,
    /// Windowed float array setter
    pub write_float_array: xplm_sys::XPLMSetDatavf_f,
    /// Windowed byte getter
    pub read_data: xplm_sys::XPLMGetDatab_f,
    /// Windowed byte setter
    pub write_data: xplm_sys::XPLMSetDatab_f,
}

impl CallbackTable {
    /// Families with at least one populated slot.
    pub fn families(&self) -> HostTypes {
        let mut families = HostTypes::empty();
        families.set(
            HostTypes::INT,
            self.read_int.is_some() || self.write_int.is_some(),
        );
        families.set(
            HostTypes::FLOAT,
            self.read_float.is_some() || self.write_float.is_some(),
        );
        families.set(
            HostTypes::DOUBLE,
            self.read_double.is_some() || self.write_double.is_some(),
        );
        families.set(
            HostTypes::INT_ARRAY,
            self.read_int_array.is_some() || self.write_int_array.is_some(),
        );
        families.set(
            HostTypes::FLOAT_ARRAY,
            self.read_float_array.is_some() || self.write_float_array.is_some(),
        );
        families.set(
            HostTypes::DATA,
            self.read_data.is_some() || self.write_data.is_some(),
        );
        families
    }

    /// True when any setter slot is populated.
    pub fn has_writers(&self) -> bool {
        self.write_int.is_some()
            || self.write_float.is_some()
            || self.write_double.is_some()
            || self.write_int_array.is_some()
            || self.write_float_array.is_some()
            || self.write_data.is_some()
    }
}

/// Host-side data access operations.
pub trait DataAccess {
    /// Look up a dataref by name.
    fn find(&self, name: &CStr) -> Option<RawDataref>;

    /// Types the host reports for a dataref.
    fn types(&self, dataref: RawDataref) -> HostTypes;

    /// Whether the host accepts writes to a dataref.
    fn can_write(&self, dataref: RawDataref) -> bool;

    /// Read as an int.
    fn get_i32(&self, dataref: RawDataref) -> i32;
    /// Write as an int.
    fn set_i32(&self, dataref: RawDataref, value: i32);
    /// Read as a float.
    fn get_f32(&self, dataref: RawDataref) -> f32;
    /// Write as a float.
    fn set_f32(&self, dataref: RawDataref, value: f32);
    /// Read as a double.
    fn get_f64(&self, dataref: RawDataref) -> f64;
    /// Write as a double.
    fn set_f64(&self, dataref: RawDataref, value: f64);

    /// Windowed int array read; `None` returns the length.
    fn get_i32_array(&self, dataref: RawDataref, dest: Option<&mut [i32]>, offset: usize)
        -> usize;

    /// Windowed int array write starting at `offset`.
    fn set_i32_array(&self, dataref: RawDataref, values: &[i32], offset: usize);

    /// Windowed float array read; `None` returns the length.
    fn get_f32_array(&self, dataref: RawDataref, dest: Option<&mut [f32]>, offset: usize)
        -> usize;

    /// Windowed float array write starting at `offset`.
    fn set_f32_array(&self, dataref: RawDataref, values: &[f32], offset: usize);

    /// Windowed byte read; `None` returns the length.
    fn get_bytes(&self, dataref: RawDataref, dest: Option<&mut [u8]>, offset: usize) -> usize;

    /// Windowed byte write starting at `offset`.
    fn set_bytes(&self, dataref: RawDataref, values: &[u8], offset: usize);

    /// Publish a new dataref served by `callbacks`.
    ///
    /// # Safety
    ///
    /// `refcon` is passed back to every callback. It must point to whatever
    /// the callbacks expect and stay valid until [`unregister`] is called
    /// with the returned handle.
    ///
    /// [`unregister`]: DataAccess::unregister
    unsafe fn register(
        &self,
        name: &CStr,
        types: HostTypes,
        writable: bool,
        callbacks: &CallbackTable,
        refcon: *mut c_void,
    ) -> Option<RawDataref>;

    /// Withdraw a dataref published with [`register`](DataAccess::register).
    fn unregister(&self, dataref: RawDataref);

    /// Write a line to the host log.
    fn debug_string(&self, message: &str);

    /// Turn a named host feature on or off, such as `XPLM_USE_NATIVE_PATHS`.
    fn enable_feature(&self, feature: &CStr, enabled: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_types_display() {
        assert_eq!(HostTypes::empty().to_string(), "xplmType_Unknown");
        assert_eq!(HostTypes::INT.to_string(), "xplmType_Int");
        assert_eq!(
            HostTypes::NUMERIC.to_string(),
            "xplmType_Int|xplmType_Float|xplmType_Double"
        );
        assert_eq!(HostTypes::from_raw(64).to_string(), "0x40");
    }

    #[test]
    fn test_host_types_from_raw() {
        assert!(HostTypes::from_raw(0).is_unknown());
        assert_eq!(HostTypes::from_raw(7), HostTypes::NUMERIC);
        assert_eq!(HostTypes::from_raw(32), HostTypes::DATA);
    }

    #[test]
    fn test_raw_dataref_rejects_null() {
        assert!(RawDataref::from_ptr(std::ptr::null_mut()).is_none());
    }

    #[test]
    fn test_empty_callback_table() {
        let table = CallbackTable::default();
        assert!(table.families().is_empty());
        assert!(!table.has_writers());
    }
}
