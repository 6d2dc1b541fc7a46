//! Lookup handles: typed access to datarefs that already exist.

use std::cmp::Ordering;
use std::ffi::CString;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

use tracing::debug;

use crate::error::{check, verify_name, DatarefError, Result};
use crate::host::{DataAccess, HostTypes, RawDataref, XplmHost};
use crate::kind::{ArrayElement, DatarefValue, ScalarValue};

/// Handle to an existing dataref, read and written as a `T`.
///
/// A lookup that finds nothing is not an error: the handle stays unbound and
/// [`found`](Self::found) returns false. Value access on an unbound handle,
/// writes to a read-only dataref, and a host type that does not match `T`
/// are contract violations. The plain methods trap on them, the `try_*`
/// methods return them.
///
/// ```no_run
/// use datarefw::FindDataref;
///
/// let mut com1: FindDataref<i32> = FindDataref::new("sim/cockpit/radios/com1_freq_hz");
/// if com1.found() && com1.writable() {
///     com1.set(12230);
/// }
/// ```
pub struct FindDataref<T: DatarefValue, H: DataAccess = XplmHost> {
    host: H,
    name: String,
    dataref: Option<RawDataref>,
    types: HostTypes,
    writable: bool,
    _value: PhantomData<fn() -> T>,
}

impl<T: DatarefValue> FindDataref<T, XplmHost> {
    /// Look up `name` in the simulator.
    #[track_caller]
    pub fn new(name: &str) -> Self {
        Self::with_host(XplmHost, name)
    }

    /// Look up `name` in the simulator, returning contract violations.
    pub fn try_new(name: &str) -> Result<Self> {
        Self::try_with_host(XplmHost, name)
    }
}

impl<T: DatarefValue, H: DataAccess> FindDataref<T, H> {
    /// A handle that has not looked anything up yet.
    pub fn unresolved(host: H) -> Self {
        Self {
            host,
            name: String::new(),
            dataref: None,
            types: HostTypes::empty(),
            writable: false,
            _value: PhantomData,
        }
    }

    /// Look up `name` through `host`.
    #[track_caller]
    pub fn with_host(host: H, name: &str) -> Self {
        let mut handle = Self::unresolved(host);
        handle.find_dataref(name);
        handle
    }

    /// Look up `name` through `host`, returning contract violations.
    pub fn try_with_host(host: H, name: &str) -> Result<Self> {
        let mut handle = Self::unresolved(host);
        handle.try_find_dataref(name)?;
        Ok(handle)
    }

    /// Bind to `name`, replacing any previous binding. Returns whether it exists.
    #[track_caller]
    pub fn find_dataref(&mut self, name: &str) -> bool {
        check(self.try_find_dataref(name))
    }

    /// Bind to `name`, replacing any previous binding.
    ///
    /// `Ok(false)` when the host has no such dataref.
    pub fn try_find_dataref(&mut self, name: &str) -> Result<bool> {
        verify_name(name)?;

        self.name = name.to_string();
        self.dataref = None;
        self.types = HostTypes::empty();
        self.writable = false;

        let c_name = CString::new(name).map_err(|_| DatarefError::InvalidName {
            name: name.to_string(),
        })?;

        let Some(dataref) = self.host.find(&c_name) else {
            debug!(name, "dataref not found");
            return Ok(false);
        };

        let types = self.host.types(dataref);
        if types.is_unknown() {
            return Err(DatarefError::UnknownType {
                name: name.to_string(),
            });
        }

        if !T::KIND.accepts(types) {
            return Err(DatarefError::TypeMismatch {
                name: name.to_string(),
                expected: T::KIND,
                actual: types,
            });
        }

        self.writable = self.host.can_write(dataref);
        self.types = types;
        self.dataref = Some(dataref);

        debug!(name, types = %types, writable = self.writable, "found dataref");
        Ok(true)
    }

    /// Whether the last lookup found the dataref.
    pub fn found(&self) -> bool {
        self.dataref.is_some()
    }

    /// Whether the dataref accepts writes. False when not found.
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// The name last looked up, empty if none.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Types the host reported, empty when not found.
    pub fn host_types(&self) -> HostTypes {
        self.types
    }

    /// The host this handle reads through.
    pub fn host(&self) -> &H {
        &self.host
    }

    fn resolved(&self) -> Result<RawDataref> {
        self.dataref.ok_or_else(|| DatarefError::NotFound {
            name: self.name.clone(),
        })
    }

    fn resolved_writable(&self) -> Result<RawDataref> {
        let dataref = self.resolved()?;
        if !self.writable {
            return Err(DatarefError::NotWritable {
                name: self.name.clone(),
            });
        }
        Ok(dataref)
    }

    /// Current value.
    #[track_caller]
    pub fn get(&self) -> T {
        check(self.try_get())
    }

    /// Current value, or `NotFound`.
    pub fn try_get(&self) -> Result<T> {
        let dataref = self.resolved()?;
        Ok(T::read_host(&self.host, dataref))
    }

    /// Write a new value. Arrays and strings are written from offset zero.
    #[track_caller]
    pub fn set(&mut self, value: T) {
        check(self.try_set(value))
    }

    /// Write a new value, or report `NotFound`/`NotWritable`.
    pub fn try_set(&mut self, value: T) -> Result<()> {
        let dataref = self.resolved_writable()?;
        value.write_host(&self.host, dataref);
        Ok(())
    }
}

impl<E: ArrayElement, H: DataAccess> FindDataref<Vec<E>, H>
where
    Vec<E>: DatarefValue,
{
    /// Current number of elements the host reports.
    #[track_caller]
    pub fn size(&self) -> usize {
        check(self.try_size())
    }

    /// Current number of elements, or `NotFound`.
    pub fn try_size(&self) -> Result<usize> {
        let dataref = self.resolved()?;
        Ok(E::get_window(&self.host, dataref, None, 0))
    }

    /// Read a single element.
    #[track_caller]
    pub fn get_index_value(&self, index: usize) -> E {
        check(self.try_get_index_value(index))
    }

    /// Read a single element, reporting an index past the current length.
    pub fn try_get_index_value(&self, index: usize) -> Result<E> {
        let dataref = self.resolved()?;
        let len = E::get_window(&self.host, dataref, None, 0);
        if index >= len {
            return Err(DatarefError::IndexOutOfBounds {
                name: self.name.clone(),
                index,
                len,
            });
        }

        let mut value = [E::default()];
        E::get_window(&self.host, dataref, Some(&mut value), index);
        Ok(value[0])
    }
}

impl<H: DataAccess> FindDataref<String, H> {
    /// Write a string from offset zero.
    #[track_caller]
    pub fn set_str(&mut self, value: &str) {
        self.set(value.to_string())
    }
}

impl<T: ScalarValue, H: DataAccess> FindDataref<T, H> {
    /// Divide the current value by `rhs`, refusing a zero divisor.
    pub fn try_divide(&mut self, rhs: T) -> Result<()> {
        let quotient = self
            .try_get()?
            .div_value(rhs)
            .ok_or_else(|| DatarefError::DivisionByZero {
                name: self.name.clone(),
            })?;
        self.try_set(quotient)
    }
}

impl<H: DataAccess> FindDataref<i32, H> {
    /// Add one, wrapping on overflow.
    #[track_caller]
    pub fn increment(&mut self) {
        let value = self.get();
        self.set(value.add_value(1));
    }

    /// Subtract one, wrapping on overflow.
    #[track_caller]
    pub fn decrement(&mut self) {
        let value = self.get();
        self.set(value.sub_value(1));
    }
}

macro_rules! impl_compound_assign {
    ($trait:ident, $method:ident, $apply:ident) => {
        impl<T: ScalarValue, H: DataAccess> $trait<T> for FindDataref<T, H> {
            #[track_caller]
            fn $method(&mut self, rhs: T) {
                let value = self.get();
                self.set(value.$apply(rhs));
            }
        }
    };
}

impl_compound_assign!(AddAssign, add_assign, add_value);
impl_compound_assign!(SubAssign, sub_assign, sub_value);
impl_compound_assign!(MulAssign, mul_assign, mul_value);

impl<T: ScalarValue, H: DataAccess> DivAssign<T> for FindDataref<T, H> {
    #[track_caller]
    fn div_assign(&mut self, rhs: T) {
        check(self.try_divide(rhs))
    }
}

impl<T: DatarefValue, H: DataAccess> PartialEq<T> for FindDataref<T, H> {
    fn eq(&self, other: &T) -> bool {
        self.get() == *other
    }
}

impl<T: DatarefValue + PartialOrd, H: DataAccess> PartialOrd<T> for FindDataref<T, H> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        self.get().partial_cmp(other)
    }
}

impl<H: DataAccess> PartialEq<&str> for FindDataref<String, H> {
    fn eq(&self, other: &&str) -> bool {
        self.get() == *other
    }
}

impl<T: DatarefValue, H: DataAccess> fmt::Display for FindDataref<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt_value(f)
    }
}

impl<T: DatarefValue, H: DataAccess + fmt::Debug> fmt::Debug for FindDataref<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FindDataref")
            .field("name", &self.name)
            .field("kind", &T::KIND)
            .field("found", &self.found())
            .field("types", &self.types)
            .field("writable", &self.writable)
            .field("host", &self.host)
            .finish()
    }
}

macro_rules! impl_from_handle {
    ($($ty:ty),*) => {
        $(
            impl<H: DataAccess> From<&FindDataref<$ty, H>> for $ty {
                #[track_caller]
                fn from(handle: &FindDataref<$ty, H>) -> Self {
                    handle.get()
                }
            }
        )*
    };
}

impl_from_handle!(i32, f32, f64, Vec<i32>, Vec<f32>, String);

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::host::MockHost;

    fn host() -> MockHost {
        let host = MockHost::new();
        host.define_i32("sim/test/int", 7, true);
        host.define_f32("sim/test/float_ro", 1.5, false);
        host.define_raw("sim/test/numeric", HostTypes::NUMERIC, 3.0, true);
        host.define_raw("sim/test/untyped", HostTypes::empty(), 0.0, false);
        host.define_i32s("sim/test/ints", &[10, 20, 30], true);
        host.define_bytes("sim/test/tail", b"N172SP", true);
        host
    }

    #[test]
    fn test_not_found_is_state() {
        let handle: FindDataref<i32, _> = FindDataref::with_host(host(), "sim/test/missing");
        assert!(!handle.found());
        assert!(!handle.writable());
        assert_eq!(handle.name(), "sim/test/missing");
        assert!(handle.host_types().is_unknown());
        assert!(handle.try_get().unwrap_err().is_not_found());
    }

    #[test]
    fn test_found_scalar() {
        let mut handle: FindDataref<i32, _> = FindDataref::with_host(host(), "sim/test/int");
        assert!(handle.found());
        assert!(handle.writable());
        assert_eq!(handle.get(), 7);
        handle.set(8);
        assert_eq!(handle.get(), 8);
        assert!(handle == 8);
        assert!(handle > 7);
        assert_eq!(i32::from(&handle), 8);
        assert_eq!(handle.to_string(), "8");
    }

    #[test]
    fn test_numeric_triad_accepted() {
        let handle: FindDataref<f64, _> = FindDataref::with_host(host(), "sim/test/numeric");
        assert!(handle.found());
        assert_eq!(handle.host_types(), HostTypes::NUMERIC);
        assert_eq!(handle.get(), 3.0);
    }

    #[test]
    fn test_read_only_write_is_error() {
        let mut handle: FindDataref<f32, _> = FindDataref::with_host(host(), "sim/test/float_ro");
        assert!(handle.found());
        assert!(!handle.writable());
        assert_eq!(
            handle.try_set(2.0),
            Err(DatarefError::NotWritable {
                name: "sim/test/float_ro".to_string()
            })
        );
        assert_eq!(handle.get(), 1.5);
    }

    #[test]
    #[should_panic(expected = "not writable")]
    fn test_read_only_set_traps() {
        let mut handle: FindDataref<f32, _> = FindDataref::with_host(host(), "sim/test/float_ro");
        handle.set(2.0);
    }

    #[test]
    fn test_type_errors() {
        let mut handle: FindDataref<Vec<f32>, _> = FindDataref::unresolved(host());
        let err = handle.try_find_dataref("sim/test/ints").unwrap_err();
        assert!(matches!(err, DatarefError::TypeMismatch { .. }));
        assert!(!handle.found());

        let err = handle.try_find_dataref("sim/test/untyped").unwrap_err();
        assert!(matches!(err, DatarefError::UnknownType { .. }));
    }

    #[test]
    #[should_panic(expected = "Unknown dataref type")]
    fn test_unknown_type_traps() {
        let _handle: FindDataref<i32, _> = FindDataref::with_host(host(), "sim/test/untyped");
    }

    #[test]
    #[should_panic(expected = "Data type mismatch")]
    fn test_mismatch_traps() {
        let _handle: FindDataref<String, _> = FindDataref::with_host(host(), "sim/test/int");
    }

    #[test]
    fn test_invalid_names() {
        let mut handle: FindDataref<i32, _> = FindDataref::unresolved(host());
        assert_eq!(handle.try_find_dataref(""), Err(DatarefError::EmptyName));
        assert!(handle
            .try_find_dataref("sim/test int")
            .unwrap_err()
            .is_invalid_name());
    }

    #[test]
    fn test_array_access() {
        let mut handle: FindDataref<Vec<i32>, _> = FindDataref::with_host(host(), "sim/test/ints");
        assert_eq!(handle.size(), 3);
        assert_eq!(handle.get(), vec![10, 20, 30]);
        assert_eq!(handle.get_index_value(2), 30);
        assert!(matches!(
            handle.try_get_index_value(3),
            Err(DatarefError::IndexOutOfBounds { index: 3, len: 3, .. })
        ));

        handle.set(vec![1, 2]);
        assert_eq!(handle.get(), vec![1, 2, 30]);
    }

    #[test]
    fn test_string_access() {
        let mut handle: FindDataref<String, _> = FindDataref::with_host(host(), "sim/test/tail");
        assert!(handle == "N172SP");
        handle.set_str("D-EFGH");
        assert_eq!(handle.get(), "D-EFGH");
    }

    #[test]
    fn test_compound_assign() {
        let mut handle: FindDataref<i32, _> = FindDataref::with_host(host(), "sim/test/int");
        handle += 3;
        assert_eq!(handle.get(), 10);
        handle *= 2;
        handle -= 5;
        handle /= 3;
        assert_eq!(handle.get(), 5);
        handle.increment();
        handle.decrement();
        handle.decrement();
        assert_eq!(handle.get(), 4);
    }

    #[test]
    fn test_int_sugar_wraps_at_limits() {
        let mut handle: FindDataref<i32, _> = FindDataref::with_host(host(), "sim/test/int");
        handle.set(i32::MAX);
        handle += 1;
        assert_eq!(handle.get(), i32::MIN);
        handle -= 1;
        assert_eq!(handle.get(), i32::MAX);
        handle.increment();
        assert_eq!(handle.get(), i32::MIN);
        handle.decrement();
        assert_eq!(handle.get(), i32::MAX);
    }

    #[test]
    fn test_divide_by_zero() {
        let mut handle: FindDataref<i32, _> = FindDataref::with_host(host(), "sim/test/int");
        assert!(matches!(
            handle.try_divide(0),
            Err(DatarefError::DivisionByZero { .. })
        ));
        assert_eq!(handle.get(), 7);
    }

    #[test]
    #[should_panic(expected = "Division by zero")]
    fn test_divide_by_zero_traps() {
        let mut handle: FindDataref<f32, _> = FindDataref::with_host(host(), "sim/test/numeric");
        handle /= 0.0;
    }

    #[test]
    fn test_combined_numeric_report_accepted_by_every_scalar() {
        let host = host();
        host.define_raw("sim/test/float_double", HostTypes::FLOAT | HostTypes::DOUBLE, 3.0, true);
        let handle = FindDataref::<i32, _>::try_with_host(host, "sim/test/float_double").unwrap();
        assert!(handle.found());
        assert_eq!(handle.get(), 3);
    }

    #[test]
    fn test_rebind() {
        let mut handle: FindDataref<i32, _> = FindDataref::with_host(host(), "sim/test/int");
        assert!(!handle.find_dataref("sim/test/gone"));
        assert!(!handle.found());
        assert_eq!(handle.name(), "sim/test/gone");
    }
}
