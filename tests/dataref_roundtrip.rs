//! Lookup and Publishing Handle Integration Tests
//!
//! Publishes datarefs on an in-memory host and reads them back through lookup
//! handles, so every value crosses the real accessor callbacks.
//!
//! # Test Coverage
//!
//! | Test | Description |
//! |------|-------------|
//! | `test_lookup_missing` | Unknown names leave the handle unbound |
//! | `test_scalar_round_trip_*` | Publisher writes, lookup reads, and back |
//! | `test_array_windowed_read` | Offset/count windows over a published array |
//! | `test_byte_string_round_trip` | String set, append, read back |
//! | `test_string_view_survives_host_write` | Host writes are dropped while a view is held |
//! | `test_int_sugar_at_limits` | Arithmetic wraps at the i32 limits |
//! | `test_drop_unregisters` | Dropping a publisher withdraws the dataref |
//! | `test_*_traps` | Contract violations panic with a clear message |

#![cfg(feature = "mock")]

use datarefw::{
    CreateDataref, DataAccess, DatarefError, FindDataref, HostTypes, MockHost,
};

// =============================================================================
// Lookup
// =============================================================================

#[test]
fn test_lookup_missing() {
    let host = MockHost::new();
    let handle: FindDataref<f32, _> = FindDataref::with_host(host, "sim/does/not/exist");
    assert!(!handle.found());
    assert!(!handle.writable());
}

#[test]
#[should_panic(expected = "not writable")]
fn test_read_only_lookup_set_traps() {
    let host = MockHost::new();
    host.define_f64("sim/flightmodel/position/latitude", 47.5, false);

    let mut handle: FindDataref<f64, _> =
        FindDataref::with_host(host, "sim/flightmodel/position/latitude");
    assert!(handle.found());
    assert!(!handle.writable());
    handle.set(0.0);
}

#[test]
#[should_panic(expected = "not valid")]
fn test_get_on_missing_traps() {
    let handle: FindDataref<i32, _> = FindDataref::with_host(MockHost::new(), "sim/missing");
    let _ = handle.get();
}

#[test]
#[should_panic(expected = "Unknown dataref type")]
fn test_unknown_type_traps() {
    let host = MockHost::new();
    host.define_raw("sim/odd", HostTypes::empty(), 0.0, false);
    let _handle: FindDataref<f64, _> = FindDataref::with_host(host, "sim/odd");
}

#[test]
#[should_panic(expected = "expected xplmType_FloatArray but instead got: xplmType_IntArray")]
fn test_mismatched_type_traps() {
    let host = MockHost::new();
    host.define_i32s("sim/ints", &[1, 2, 3], false);
    let _handle: FindDataref<Vec<f32>, _> = FindDataref::with_host(host, "sim/ints");
}

#[test]
fn test_numeric_triad_accepted_for_each_scalar() {
    let host = MockHost::new();
    host.define_raw("sim/any_number", HostTypes::NUMERIC, 12.0, true);

    let as_int: FindDataref<i32, _> = FindDataref::with_host(host.clone(), "sim/any_number");
    let as_float: FindDataref<f32, _> = FindDataref::with_host(host.clone(), "sim/any_number");
    let as_double: FindDataref<f64, _> = FindDataref::with_host(host, "sim/any_number");

    assert_eq!(as_int.get(), 12);
    assert_eq!(as_float.get(), 12.0);
    assert_eq!(as_double.get(), 12.0);
}

#[test]
fn test_partial_numeric_report_accepted() {
    let host = MockHost::new();
    host.define_raw("sim/float_or_double", HostTypes::FLOAT | HostTypes::DOUBLE, 3.0, true);
    host.define_raw("sim/int_or_float", HostTypes::INT | HostTypes::FLOAT, 4.0, false);

    let as_int = FindDataref::<i32, _>::try_with_host(host.clone(), "sim/float_or_double").unwrap();
    assert_eq!(as_int.get(), 3);

    let as_double = FindDataref::<f64, _>::try_with_host(host, "sim/int_or_float").unwrap();
    assert_eq!(as_double.get(), 4.0);
}

#[test]
#[should_panic(expected = "expected xplmType_Int but instead got: xplmType_Float")]
fn test_single_scalar_mismatch_traps() {
    let host = MockHost::new();
    host.define_f32("sim/float", 1.0, false);
    let _handle: FindDataref<i32, _> = FindDataref::with_host(host, "sim/float");
}

// =============================================================================
// Round trips through published datarefs
// =============================================================================

#[test]
fn test_scalar_round_trip_int() {
    let host = MockHost::new();
    let mut published: CreateDataref<i32, _> =
        CreateDataref::with_host(host.clone(), "plugin/test/int", true);
    let mut lookup: FindDataref<i32, _> = FindDataref::with_host(host, "plugin/test/int");

    assert!(lookup.found());
    assert!(lookup.writable());
    assert_eq!(lookup.host_types(), HostTypes::INT);

    for value in [0, 1, -1, i32::MAX, i32::MIN, 12345] {
        published.set(value);
        assert_eq!(lookup.get(), value);
    }

    lookup.set(77);
    assert_eq!(published.get(), 77);
}

#[test]
fn test_scalar_round_trip_double() {
    let host = MockHost::new();
    let mut published: CreateDataref<f64, _> =
        CreateDataref::with_host(host.clone(), "plugin/test/double", true);
    let lookup: FindDataref<f64, _> = FindDataref::with_host(host.clone(), "plugin/test/double");

    published.set(std::f64::consts::PI);
    assert_eq!(lookup.get(), std::f64::consts::PI);

    // The host may read a double dataref as float or int too
    let raw = lookup_raw(&host, "plugin/test/double");
    assert_eq!(host.get_f32(raw), std::f64::consts::PI as f32);
    assert_eq!(host.get_i32(raw), 3);
}

#[test]
fn test_array_windowed_read() {
    const N: usize = 25;

    let host = MockHost::new();
    let mut published: CreateDataref<Vec<i32>, _> =
        CreateDataref::with_host_array(host.clone(), "plugin/test/int_array", false, N);
    for (i, slot) in published.as_mut_slice().iter_mut().enumerate() {
        *slot = i as i32;
    }

    let lookup: FindDataref<Vec<i32>, _> =
        FindDataref::with_host(host.clone(), "plugin/test/int_array");
    assert_eq!(lookup.size(), N);
    assert_eq!(lookup.get(), (0..N as i32).collect::<Vec<_>>());

    let raw = lookup_raw(&host, "plugin/test/int_array");
    for (offset, count) in [(0, 25), (0, 5), (10, 5), (20, 10), (24, 1), (25, 3), (30, 3)] {
        let mut dest = vec![-1; count];
        let copied = host.get_i32_array(raw, Some(&mut dest), offset);
        let expected = count.min(N.saturating_sub(offset));
        assert_eq!(copied, expected, "offset {} count {}", offset, count);

        let want: Vec<i32> = (offset..offset + expected).map(|i| i as i32).collect();
        assert_eq!(&dest[..copied], want.as_slice());
    }

    for index in [0, 12, 24] {
        assert_eq!(lookup.get_index_value(index), index as i32);
    }
}

#[test]
fn test_array_write_through_lookup() {
    let host = MockHost::new();
    let published: CreateDataref<Vec<f32>, _> =
        CreateDataref::with_host_array(host.clone(), "plugin/test/floats", true, 4);
    let mut lookup: FindDataref<Vec<f32>, _> = FindDataref::with_host(host, "plugin/test/floats");

    lookup.set(vec![0.5, 1.5, 2.5, 3.5, 4.5]);
    assert_eq!(&*published.as_slice(), &[0.5, 1.5, 2.5, 3.5]);
}

#[test]
fn test_byte_string_round_trip() {
    let host = MockHost::new();
    let mut published: CreateDataref<String, _> =
        CreateDataref::with_host(host.clone(), "plugin/test/string", true);
    let mut lookup: FindDataref<String, _> = FindDataref::with_host(host, "plugin/test/string");

    published.set_str("abcdefghijklmnopqrstuvwxyz");
    assert!(lookup == "abcdefghijklmnopqrstuvwxyz");

    published.push_str("123456789");
    assert_eq!(lookup.get(), "abcdefghijklmnopqrstuvwxyz123456789");

    lookup.set_str("short");
    assert_eq!(&*published.as_str(), "short");
}

#[test]
fn test_string_view_survives_host_write() {
    let host = MockHost::new();
    let mut published: CreateDataref<String, _> =
        CreateDataref::with_host(host.clone(), "plugin/test/view", true);
    let mut lookup: FindDataref<String, _> = FindDataref::with_host(host, "plugin/test/view");
    published.set_str("ab");

    let view = published.as_str();
    lookup.set_str(&"x".repeat(4096));
    assert_eq!(&*view, "ab");
    drop(view);

    assert_eq!(lookup.get(), "ab");
}

#[test]
fn test_int_sugar_at_limits() {
    let host = MockHost::new();
    let mut published: CreateDataref<i32, _> =
        CreateDataref::with_host(host.clone(), "plugin/test/limit", true);
    let mut lookup: FindDataref<i32, _> = FindDataref::with_host(host, "plugin/test/limit");

    published.set(i32::MAX);
    published += 1;
    assert_eq!(lookup.get(), i32::MIN);

    lookup *= 2;
    assert_eq!(published.get(), 0);
    lookup -= 1;
    assert_eq!(published.get(), -1);
}

#[test]
#[should_panic(expected = "Division by zero on dataref 'plugin/test/divisor'")]
fn test_division_by_zero_traps() {
    let host = MockHost::new();
    let _published: CreateDataref<i32, _> =
        CreateDataref::with_host(host.clone(), "plugin/test/divisor", true);
    let mut lookup: FindDataref<i32, _> = FindDataref::with_host(host, "plugin/test/divisor");
    lookup /= 0;
}

#[test]
fn test_drop_unregisters() {
    let host = MockHost::new();
    let published: CreateDataref<f32, _> =
        CreateDataref::with_host(host.clone(), "plugin/test/temporary", false);
    assert!(host.contains("plugin/test/temporary"));

    drop(published);
    assert!(!host.contains("plugin/test/temporary"));

    let lookup: FindDataref<f32, _> = FindDataref::with_host(host, "plugin/test/temporary");
    assert!(!lookup.found());
}

#[test]
#[should_panic(expected = "out of bounds")]
fn test_out_of_bounds_index_traps() {
    let mut published: CreateDataref<Vec<i32>, _> =
        CreateDataref::with_host_array(MockHost::new(), "plugin/test/small", true, 3);
    published.set_at(3, 1);
}

#[test]
#[should_panic(expected = "out of bounds")]
fn test_lookup_out_of_bounds_traps() {
    let host = MockHost::new();
    host.define_f32s("sim/floats", &[1.0, 2.0], false);
    let lookup: FindDataref<Vec<f32>, _> = FindDataref::with_host(host, "sim/floats");
    let _ = lookup.get_index_value(2);
}

#[test]
fn test_try_api_returns_errors() {
    let host = MockHost::new();
    host.define_bytes("sim/tail", b"N1", false);

    let err = FindDataref::<i32, _>::try_with_host(host.clone(), "sim/tail").unwrap_err();
    assert!(err.is_type_error());

    let err = CreateDataref::<i32, _>::try_with_host(host, "", true).unwrap_err();
    assert_eq!(err, DatarefError::EmptyName);
}

fn lookup_raw(host: &MockHost, name: &str) -> datarefw::RawDataref {
    let name = std::ffi::CString::new(name).unwrap();
    host.find(&name).unwrap()
}
