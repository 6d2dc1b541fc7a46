//! Low-level FFI bindings for the X-Plane plugin SDK (XPLM).
//!
//! This crate provides raw, unsafe bindings to the data access API
//! (`XPLMDataAccess.h`) and the logging and feature entry points from
//! `XPLMUtilities.h`.
//! Only the pieces needed to find, read, write, publish and unpublish
//! datarefs are bound.
//!
//! # Safety
//!
//! All functions in this crate are `unsafe` as they are direct FFI bindings.
//! For a safe wrapper, use the `datarefw` crate instead.
//!
//! # Features
//!
//! - `xplm-sdk`: Generate bindings from the SDK headers found under
//!   `XPLM_SDK_DIR`. Without this feature, pre-defined bindings are used and
//!   every function panics when called, so code can be built and unit tested
//!   outside the simulator.
//!
//! # Example (unsafe)
//!
//! ```no_run
//! use xplm_sys::*;
//! use std::ffi::CString;
//!
//! unsafe {
//!     let name = CString::new("sim/time/total_running_time_sec").unwrap();
//!     let dataref = XPLMFindDataRef(name.as_ptr());
//!     if !dataref.is_null() {
//!         let seconds = XPLMGetDataf(dataref);
//!         println!("Running for {} s", seconds);
//!     }
//! }
//! ```

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(dead_code)]
#![allow(unsafe_code)]
#![allow(clippy::all)]

// Include the generated bindings
include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_constants() {
        // The host reports types as a bitfield of these values
        assert_eq!(xplmType_Unknown as i32, 0);
        assert_eq!(xplmType_Int as i32, 1);
        assert_eq!(xplmType_Float as i32, 2);
        assert_eq!(xplmType_Double as i32, 4);
        assert_eq!(xplmType_FloatArray as i32, 8);
        assert_eq!(xplmType_IntArray as i32, 16);
        assert_eq!(xplmType_Data as i32, 32);
    }

    #[test]
    fn test_type_bits_are_disjoint() {
        let all = [
            xplmType_Int as i32,
            xplmType_Float as i32,
            xplmType_Double as i32,
            xplmType_FloatArray as i32,
            xplmType_IntArray as i32,
            xplmType_Data as i32,
        ];
        let combined = all.iter().fold(0, |acc, bit| acc | bit);
        assert_eq!(combined.count_ones() as usize, all.len());
    }

    #[cfg(not(feature = "xplm-sdk"))]
    #[test]
    #[should_panic(expected = "xplm-sdk feature is not enabled")]
    fn test_dummy_binding_unwinds() {
        unsafe {
            XPLMGetDatai(std::ptr::null_mut());
        }
    }
}
