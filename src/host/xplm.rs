//! [`DataAccess`] backed by the simulator's XPLM library.

use std::ffi::{c_int, c_void, CStr, CString};
use std::ptr;

use super::{CallbackTable, DataAccess, HostTypes, RawDataref};

/// The simulator itself.
///
/// Zero-sized: all state lives in the host process. Only usable inside a
/// loaded plugin built with the `xplm-sdk` feature; with the dummy bindings
/// every call panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XplmHost;

/// Lengths and offsets cross the ABI as `int`.
fn to_c_int(value: usize) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

fn from_c_int(value: c_int) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl DataAccess for XplmHost {
    fn find(&self, name: &CStr) -> Option<RawDataref> {
        // SAFETY: name is a valid null-terminated string
        RawDataref::from_ptr(unsafe { xplm_sys::XPLMFindDataRef(name.as_ptr()) })
    }

    fn types(&self, dataref: RawDataref) -> HostTypes {
        // SAFETY: dataref came from XPLMFindDataRef
        let raw = unsafe { xplm_sys::XPLMGetDataRefTypes(dataref.as_ptr()) };
        HostTypes::from_raw(raw as i32)
    }

    fn can_write(&self, dataref: RawDataref) -> bool {
        // SAFETY: dataref came from XPLMFindDataRef
        unsafe { xplm_sys::XPLMCanWriteDataRef(dataref.as_ptr()) != 0 }
    }

    fn get_i32(&self, dataref: RawDataref) -> i32 {
        unsafe { xplm_sys::XPLMGetDatai(dataref.as_ptr()) }
    }

    fn set_i32(&self, dataref: RawDataref, value: i32) {
        unsafe { xplm_sys::XPLMSetDatai(dataref.as_ptr(), value) }
    }

    fn get_f32(&self, dataref: RawDataref) -> f32 {
        unsafe { xplm_sys::XPLMGetDataf(dataref.as_ptr()) }
    }

    fn set_f32(&self, dataref: RawDataref, value: f32) {
        unsafe { xplm_sys::XPLMSetDataf(dataref.as_ptr(), value) }
    }

    fn get_f64(&self, dataref: RawDataref) -> f64 {
        unsafe { xplm_sys::XPLMGetDatad(dataref.as_ptr()) }
    }

    fn set_f64(&self, dataref: RawDataref, value: f64) {
        unsafe { xplm_sys::XPLMSetDatad(dataref.as_ptr(), value) }
    }

    fn get_i32_array(
        &self,
        dataref: RawDataref,
        dest: Option<&mut [i32]>,
        offset: usize,
    ) -> usize {
        let (out, max) = match dest {
            Some(dest) => (dest.as_mut_ptr(), dest.len()),
            None => (ptr::null_mut(), 0),
        };
        // SAFETY: out is null (length query) or valid for max elements
        let n = unsafe {
            xplm_sys::XPLMGetDatavi(dataref.as_ptr(), out, to_c_int(offset), to_c_int(max))
        };
        from_c_int(n)
    }

    fn set_i32_array(&self, dataref: RawDataref, values: &[i32], offset: usize) {
        // The SDK signature takes a mutable pointer but only reads from it
        unsafe {
            xplm_sys::XPLMSetDatavi(
                dataref.as_ptr(),
                values.as_ptr().cast_mut(),
                to_c_int(offset),
                to_c_int(values.len()),
            )
        }
    }

    fn get_f32_array(
        &self,
        dataref: RawDataref,
        dest: Option<&mut [f32]>,
        offset: usize,
    ) -> usize {
        let (out, max) = match dest {
            Some(dest) => (dest.as_mut_ptr(), dest.len()),
            None => (ptr::null_mut(), 0),
        };
        // SAFETY: out is null (length query) or valid for max elements
        let n = unsafe {
            xplm_sys::XPLMGetDatavf(dataref.as_ptr(), out, to_c_int(offset), to_c_int(max))
        };
        from_c_int(n)
    }

    fn set_f32_array(&self, dataref: RawDataref, values: &[f32], offset: usize) {
        unsafe {
            xplm_sys::XPLMSetDatavf(
                dataref.as_ptr(),
                values.as_ptr().cast_mut(),
                to_c_int(offset),
                to_c_int(values.len()),
            )
        }
    }

    fn get_bytes(&self, dataref: RawDataref, dest: Option<&mut [u8]>, offset: usize) -> usize {
        let (out, max) = match dest {
            Some(dest) => (dest.as_mut_ptr().cast::<c_void>(), dest.len()),
            None => (ptr::null_mut(), 0),
        };
        // SAFETY: out is null (length query) or valid for max bytes
        let n = unsafe {
            xplm_sys::XPLMGetDatab(dataref.as_ptr(), out, to_c_int(offset), to_c_int(max))
        };
        from_c_int(n)
    }

    fn set_bytes(&self, dataref: RawDataref, values: &[u8], offset: usize) {
        unsafe {
            xplm_sys::XPLMSetDatab(
                dataref.as_ptr(),
                values.as_ptr().cast_mut().cast::<c_void>(),
                to_c_int(offset),
                to_c_int(values.len()),
            )
        }
    }

    unsafe fn register(
        &self,
        name: &CStr,
        types: HostTypes,
        writable: bool,
        callbacks: &CallbackTable,
        refcon: *mut c_void,
    ) -> Option<RawDataref> {
        // SAFETY: caller guarantees refcon outlives the registration
        let handle = unsafe {
            xplm_sys::XPLMRegisterDataAccessor(
                name.as_ptr(),
                types.bits() as _,
                c_int::from(writable),
                callbacks.read_int,
                callbacks.write_int,
                callbacks.read_float,
                callbacks.write_float,
                callbacks.read_double,
                callbacks.write_double,
                callbacks.read_int_array,
                callbacks.write_int_array,
                callbacks.read_float_array,
                callbacks.write_float_array,
                callbacks.read_data,
                callbacks.write_data,
                refcon,
                refcon,
            )
        };
        RawDataref::from_ptr(handle)
    }

    fn unregister(&self, dataref: RawDataref) {
        // SAFETY: dataref came from XPLMRegisterDataAccessor
        unsafe { xplm_sys::XPLMUnregisterDataAccessor(dataref.as_ptr()) }
    }

    fn debug_string(&self, message: &str) {
        // Interior NULs would truncate the line; drop them instead
        let line = CString::new(message.replace('\0', "")).unwrap_or_default();
        // SAFETY: line is a valid null-terminated string
        unsafe { xplm_sys::XPLMDebugString(line.as_ptr()) }
    }

    fn enable_feature(&self, feature: &CStr, enabled: bool) {
        // SAFETY: feature is a valid null-terminated string
        unsafe { xplm_sys::XPLMEnableFeature(feature.as_ptr(), c_int::from(enabled)) }
    }
}
