//! Publishing handles: datarefs owned and served by this plugin.

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::ffi::CString;
use std::fmt;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};
use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::error::{check, verify_name, DatarefError, Result};
use crate::host::{DataAccess, RawDataref, XplmHost};
use crate::kind::{ArrayElement, DatarefValue, ScalarValue};

/// A dataref published by this plugin and backed by a value it owns.
///
/// The value lives on the heap in a `RefCell`; its address is the refcon the
/// host hands back to the accessor callbacks, so it stays put when the handle
/// moves. Dropping the handle unregisters the dataref before the value is
/// freed.
///
/// Views such as [`as_str`](Self::as_str) are `Ref` guards. While one is
/// held, host writes to the dataref are dropped instead of changing the value
/// under it.
///
/// Array datarefs have a fixed capacity chosen at creation.
///
/// ```no_run
/// use datarefw::CreateDataref;
///
/// let mut counter: CreateDataref<i32> = CreateDataref::new("myplugin/counter", true);
/// counter.increment();
/// assert_eq!(counter.get(), 1);
/// ```
pub struct CreateDataref<T: DatarefValue, H: DataAccess = XplmHost> {
    host: H,
    name: String,
    writable: bool,
    capacity: usize,
    handle: Option<RawDataref>,
    value: NonNull<RefCell<T>>,
}

impl<T: DatarefValue> CreateDataref<T, XplmHost> {
    /// Publish `name` in the simulator.
    #[track_caller]
    pub fn new(name: &str, writable: bool) -> Self {
        Self::with_host(XplmHost, name, writable)
    }

    /// Publish `name` in the simulator, returning contract violations.
    pub fn try_new(name: &str, writable: bool) -> Result<Self> {
        Self::try_with_host(XplmHost, name, writable)
    }
}

impl<E: ArrayElement> CreateDataref<Vec<E>, XplmHost>
where
    Vec<E>: DatarefValue,
{
    /// Publish an array of `capacity` elements in the simulator.
    #[track_caller]
    pub fn new_array(name: &str, writable: bool, capacity: usize) -> Self {
        Self::with_host_array(XplmHost, name, writable, capacity)
    }

    /// Publish an array in the simulator, returning contract violations.
    pub fn try_new_array(name: &str, writable: bool, capacity: usize) -> Result<Self> {
        Self::try_with_host_array(XplmHost, name, writable, capacity)
    }
}

impl<T: DatarefValue, H: DataAccess> CreateDataref<T, H> {
    /// A handle holding a default value that is not published yet.
    pub fn unregistered(host: H) -> Self {
        Self::with_value(host, T::default(), 0)
    }

    fn with_value(host: H, value: T, capacity: usize) -> Self {
        let value = Box::new(RefCell::new(value));
        Self {
            host,
            name: String::new(),
            writable: false,
            capacity,
            handle: None,
            value: NonNull::from(Box::leak(value)),
        }
    }

    /// Publish `name` through `host`.
    #[track_caller]
    pub fn with_host(host: H, name: &str, writable: bool) -> Self {
        check(Self::try_with_host(host, name, writable))
    }

    /// Publish `name` through `host`, returning contract violations.
    pub fn try_with_host(host: H, name: &str, writable: bool) -> Result<Self> {
        let mut handle = Self::unregistered(host);
        handle.try_create_dataref(name, writable)?;
        Ok(handle)
    }

    /// Publish under `name`, replacing any earlier registration of this handle.
    #[track_caller]
    pub fn create_dataref(&mut self, name: &str, writable: bool) {
        check(self.try_create_dataref(name, writable))
    }

    /// Publish under `name`, returning contract violations.
    pub fn try_create_dataref(&mut self, name: &str, writable: bool) -> Result<()> {
        verify_name(name)?;
        if T::KIND.is_array() && self.capacity == 0 {
            return Err(DatarefError::ZeroCapacity {
                name: name.to_string(),
            });
        }

        let c_name = CString::new(name).map_err(|_| DatarefError::InvalidName {
            name: name.to_string(),
        })?;

        if let Some(previous) = self.handle.take() {
            warn!(old = %self.name, new = name, "replacing dataref registration");
            self.host.unregister(previous);
        }

        let callbacks = T::callback_table(writable);
        // SAFETY: the value outlives the registration, Drop unregisters first
        let handle = unsafe {
            self.host.register(
                &c_name,
                T::KIND.host_type(),
                writable,
                &callbacks,
                self.value.as_ptr().cast(),
            )
        };

        let Some(handle) = handle else {
            return Err(DatarefError::RegistrationFailed {
                name: name.to_string(),
            });
        };

        self.name = name.to_string();
        self.writable = writable;
        self.handle = Some(handle);

        debug!(name, kind = %T::KIND, writable, "registered dataref");
        Ok(())
    }

    /// Whether the dataref is currently published.
    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    /// The published name, empty before registration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the host may write this dataref.
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// The host this dataref is published through.
    pub fn host(&self) -> &H {
        &self.host
    }

    fn cell(&self) -> &RefCell<T> {
        // SAFETY: the cell lives until Drop; the callbacks only take shared
        // references to it
        unsafe { self.value.as_ref() }
    }

    /// Borrow the owned value. Host writes are dropped while this is held.
    pub fn value(&self) -> Ref<'_, T> {
        self.cell().borrow()
    }

    /// A copy of the owned value.
    pub fn get(&self) -> T {
        self.value().clone()
    }

    /// Replace the owned value. Arrays take a prefix and keep their capacity.
    #[track_caller]
    pub fn set(&mut self, value: T) {
        check(self.try_set(value))
    }

    /// Replace the owned value, returning `CapacityExceeded` for an array
    /// that does not fit.
    pub fn try_set(&mut self, value: T) -> Result<()> {
        T::assign(&mut self.cell().borrow_mut(), value, &self.name)
    }
}

impl<E: ArrayElement, H: DataAccess> CreateDataref<Vec<E>, H>
where
    Vec<E>: DatarefValue,
{
    /// An unpublished array of `capacity` default elements.
    pub fn unregistered_array(host: H, capacity: usize) -> Self {
        Self::with_value(host, vec![E::default(); capacity], capacity)
    }

    /// Publish an array of `capacity` elements through `host`.
    #[track_caller]
    pub fn with_host_array(host: H, name: &str, writable: bool, capacity: usize) -> Self {
        check(Self::try_with_host_array(host, name, writable, capacity))
    }

    /// Publish an array through `host`, returning contract violations.
    pub fn try_with_host_array(
        host: H,
        name: &str,
        writable: bool,
        capacity: usize,
    ) -> Result<Self> {
        let mut handle = Self::unregistered_array(host, capacity);
        handle.try_create_dataref(name, writable)?;
        Ok(handle)
    }

    /// Number of elements, always the capacity.
    pub fn size(&self) -> usize {
        self.value().len()
    }

    /// The fixed capacity.
    pub fn max_size(&self) -> usize {
        self.capacity
    }

    /// Borrow the elements. Host writes are dropped while this is held.
    pub fn as_slice(&self) -> Ref<'_, [E]> {
        Ref::map(self.value(), Vec::as_slice)
    }

    /// Borrow the elements mutably. Host reads see zero while this is held.
    pub fn as_mut_slice(&mut self) -> RefMut<'_, [E]> {
        RefMut::map(self.cell().borrow_mut(), Vec::as_mut_slice)
    }

    /// Element at `index`, trapping when out of bounds.
    #[track_caller]
    pub fn at(&self, index: usize) -> E {
        check(self.try_at(index))
    }

    /// Element at `index`.
    pub fn try_at(&self, index: usize) -> Result<E> {
        let values = self.value();
        values
            .get(index)
            .copied()
            .ok_or_else(|| self.out_of_bounds(index, values.len()))
    }

    /// Overwrite the element at `index`, trapping when out of bounds.
    #[track_caller]
    pub fn set_at(&mut self, index: usize, value: E) {
        check(self.try_set_at(index, value))
    }

    /// Overwrite the element at `index`.
    pub fn try_set_at(&mut self, index: usize, value: E) -> Result<()> {
        let mut values = self.cell().borrow_mut();
        let len = values.len();
        match values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.out_of_bounds(index, len)),
        }
    }

    fn out_of_bounds(&self, index: usize, len: usize) -> DatarefError {
        DatarefError::IndexOutOfBounds {
            name: self.name.clone(),
            index,
            len,
        }
    }
}

impl<H: DataAccess> CreateDataref<String, H> {
    /// Borrow the string. Host writes are dropped while this is held.
    pub fn as_str(&self) -> Ref<'_, str> {
        Ref::map(self.value(), String::as_str)
    }

    /// Replace the string, cut at the first NUL.
    pub fn set_str(&mut self, value: &str) {
        self.set(value.to_string())
    }

    /// Append to the owned string.
    pub fn push_str(&mut self, value: &str) {
        let mut text = self.get();
        text.push_str(value);
        self.set(text);
    }
}

impl<T: ScalarValue, H: DataAccess> CreateDataref<T, H> {
    fn update(&mut self, f: impl FnOnce(T) -> T) {
        let mut value = self.cell().borrow_mut();
        *value = f(*value);
    }

    /// Divide the owned value by `rhs`, refusing a zero divisor.
    pub fn try_divide(&mut self, rhs: T) -> Result<()> {
        let quotient = self
            .get()
            .div_value(rhs)
            .ok_or_else(|| DatarefError::DivisionByZero {
                name: self.name.clone(),
            })?;
        *self.cell().borrow_mut() = quotient;
        Ok(())
    }
}

impl<H: DataAccess> CreateDataref<i32, H> {
    /// Add one, wrapping on overflow.
    pub fn increment(&mut self) {
        self.update(|value| value.add_value(1));
    }

    /// Subtract one, wrapping on overflow.
    pub fn decrement(&mut self) {
        self.update(|value| value.sub_value(1));
    }
}

macro_rules! impl_compound_assign {
    ($trait:ident, $method:ident, $apply:ident) => {
        impl<T: ScalarValue, H: DataAccess> $trait<T> for CreateDataref<T, H> {
            fn $method(&mut self, rhs: T) {
                self.update(|value| value.$apply(rhs));
            }
        }
    };
}

impl_compound_assign!(AddAssign, add_assign, add_value);
impl_compound_assign!(SubAssign, sub_assign, sub_value);
impl_compound_assign!(MulAssign, mul_assign, mul_value);

impl<T: ScalarValue, H: DataAccess> DivAssign<T> for CreateDataref<T, H> {
    #[track_caller]
    fn div_assign(&mut self, rhs: T) {
        check(self.try_divide(rhs))
    }
}

impl<T: DatarefValue, H: DataAccess> PartialEq<T> for CreateDataref<T, H> {
    fn eq(&self, other: &T) -> bool {
        *self.value() == *other
    }
}

impl<T: DatarefValue + PartialOrd, H: DataAccess> PartialOrd<T> for CreateDataref<T, H> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        (*self.value()).partial_cmp(other)
    }
}

impl<H: DataAccess> PartialEq<&str> for CreateDataref<String, H> {
    fn eq(&self, other: &&str) -> bool {
        &*self.as_str() == *other
    }
}

impl<T: DatarefValue, H: DataAccess> fmt::Display for CreateDataref<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt_value(f)
    }
}

impl<T: DatarefValue, H: DataAccess + fmt::Debug> fmt::Debug for CreateDataref<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateDataref")
            .field("name", &self.name)
            .field("kind", &T::KIND)
            .field("registered", &self.is_registered())
            .field("writable", &self.writable)
            .field("value", &*self.value())
            .field("host", &self.host)
            .finish()
    }
}

impl<T: DatarefValue> Default for CreateDataref<T, XplmHost> {
    fn default() -> Self {
        Self::unregistered(XplmHost)
    }
}

impl<T: DatarefValue, H: DataAccess> Drop for CreateDataref<T, H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.host.unregister(handle);
            debug!(name = %self.name, "unregistered dataref");
        }

        // SAFETY: value came from a leaked Box and the host no longer holds it
        drop(unsafe { Box::from_raw(self.value.as_ptr()) });
    }
}

macro_rules! impl_from_handle {
    ($($ty:ty),*) => {
        $(
            impl<H: DataAccess> From<&CreateDataref<$ty, H>> for $ty {
                fn from(handle: &CreateDataref<$ty, H>) -> Self {
                    handle.get()
                }
            }
        )*
    };
}

impl_from_handle!(i32, f32, f64, Vec<i32>, Vec<f32>, String);
