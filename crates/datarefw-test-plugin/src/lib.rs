//! X-Plane plugin that publishes a few datarefs and checks them with
//! lookup handles.
//!
//! On start it loads `datarefw.toml` (and `DATAREFW_*` overrides), routes
//! tracing output to the simulator log, switches the SDK to native paths,
//! then builds a [`DatarefDatabase`] and runs its checks. The database lives in a thread-local slot on the
//! simulator's main thread until `XPluginStop`.

#![allow(unsafe_code)]

pub mod database;

use std::cell::RefCell;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};

use anyhow::Result;
use datarefw::config::{AccessConfig, DatarefwConfig};
use datarefw::{logging, DataAccess, GuardedHost, XplmHost};
use tracing::{error, info, trace, warn};

pub use database::DatarefDatabase;

const PLUGIN_NAME: &str = "Dataref Test";
const PLUGIN_SIGNATURE: &str = "datarefw.dataref.tests";
const PLUGIN_DESCRIPTION: &str = "Testing Dataref Wrapper Functionality";

/// Paths the SDK hands out use the platform's own separators.
const NATIVE_PATHS: &CStr = c"XPLM_USE_NATIVE_PATHS";

/// The SDK gives each output buffer 256 bytes.
const SDK_STRING_LEN: usize = 256;

type PluginHost = GuardedHost<XplmHost>;

thread_local! {
    static DATABASE: RefCell<Option<DatarefDatabase<PluginHost>>> = const { RefCell::new(None) };
}

/// Copy `value` into an SDK-provided buffer, truncated and NUL-terminated.
///
/// # Safety
///
/// `dest` must be null or valid for writes of `SDK_STRING_LEN` bytes.
unsafe fn write_sdk_string(dest: *mut c_char, value: &str) {
    if dest.is_null() {
        return;
    }

    let bytes = value.as_bytes();
    let len = bytes.len().min(SDK_STRING_LEN - 1);
    // SAFETY: caller guarantees room for SDK_STRING_LEN bytes
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), dest, len);
        *dest.add(len) = 0;
    }
}

fn start() -> Result<()> {
    let config = match DatarefwConfig::load() {
        Ok(config) => config,
        Err(err) => {
            // Logging isn't up yet, so report through the defaults
            let config = DatarefwConfig::default();
            logging::init(&config.logging, XplmHost)?;
            warn!(error = %err, "invalid configuration, using defaults");
            config
        }
    };

    if let Err(message) = config.validate() {
        anyhow::bail!(message);
    }
    logging::init(&config.logging, XplmHost)?;

    let database = open_database(XplmHost, &config.access)?;
    DATABASE.with(|slot| *slot.borrow_mut() = Some(database));
    info!(plugin = PLUGIN_NAME, "started");
    Ok(())
}

/// Enable native paths, then publish and check the test datarefs.
fn open_database<H: DataAccess + Clone>(
    host: H,
    access: &AccessConfig,
) -> Result<DatarefDatabase<GuardedHost<H>>> {
    host.enable_feature(NATIVE_PATHS, true);

    let host = GuardedHost::from_config(host, access);
    let mut database = DatarefDatabase::new(host)?;
    database.exercise()?;
    Ok(database)
}

/// Plugin entry point.
///
/// # Safety
///
/// Called by the simulator with three 256-byte output buffers.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn XPluginStart(
    out_name: *mut c_char,
    out_sig: *mut c_char,
    out_desc: *mut c_char,
) -> c_int {
    unsafe {
        write_sdk_string(out_name, PLUGIN_NAME);
        write_sdk_string(out_sig, PLUGIN_SIGNATURE);
        write_sdk_string(out_desc, PLUGIN_DESCRIPTION);
    }

    // A trap must not unwind into the simulator
    match panic::catch_unwind(AssertUnwindSafe(start)) {
        Ok(Ok(())) => 1,
        Ok(Err(err)) => {
            error!(error = ?err, "plugin start failed");
            0
        }
        Err(_) => {
            error!("plugin start panicked");
            0
        }
    }
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn XPluginStop() {
    let database = DATABASE.with(|slot| slot.borrow_mut().take());
    if panic::catch_unwind(AssertUnwindSafe(move || drop(database))).is_err() {
        error!("dropping datarefs panicked");
    }
    info!(plugin = PLUGIN_NAME, "stopped");
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn XPluginEnable() -> c_int {
    1
}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn XPluginDisable() {}

#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn XPluginReceiveMessage(from: c_int, message: c_int, _param: *mut c_void) {
    trace!(from, message, "plugin message");
}

#[cfg(test)]
mod tests {
    use super::*;
    use datarefw::MockHost;

    #[test]
    fn test_write_sdk_string() {
        let mut buf = [0x7f as c_char; SDK_STRING_LEN];
        unsafe { write_sdk_string(buf.as_mut_ptr(), PLUGIN_NAME) };
        let written = unsafe { CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(written.to_str().unwrap(), PLUGIN_NAME);
    }

    #[test]
    fn test_write_sdk_string_truncates() {
        let long = "x".repeat(SDK_STRING_LEN * 2);
        let mut buf = [0 as c_char; SDK_STRING_LEN];
        unsafe { write_sdk_string(buf.as_mut_ptr(), &long) };
        assert_eq!(buf[SDK_STRING_LEN - 1], 0);
        let written = unsafe { CStr::from_ptr(buf.as_ptr()) };
        assert_eq!(written.to_bytes().len(), SDK_STRING_LEN - 1);
    }

    #[test]
    fn test_null_buffer_ignored() {
        unsafe { write_sdk_string(std::ptr::null_mut(), PLUGIN_NAME) };
    }

    #[test]
    fn test_open_database_enables_native_paths() {
        let host = MockHost::new();
        let database = open_database(host.clone(), &AccessConfig::default()).unwrap();
        assert_eq!(host.feature_enabled("XPLM_USE_NATIVE_PATHS"), Some(true));
        assert_eq!(database.int_value(), 194);

        drop(database);
        assert_eq!(host.accessor_count(), 0);
    }

    #[test]
    fn test_stop_without_start() {
        XPluginStop();
        assert_eq!(XPluginEnable(), 1);
    }
}
