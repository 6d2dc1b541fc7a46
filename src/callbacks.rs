//! Accessor callbacks handed to the host by publishing handles.
//!
//! Every callback receives the registration's refcon, which is the address
//! of the publishing handle's `RefCell` (around a `T` for scalar kinds, a
//! `Vec<E>` for arrays, a `String` for bytes). The host calls these on the
//! plugin's thread. While the plugin holds a borrow of the value the
//! conflicting access is skipped: reads return zero and writes are dropped.

use std::cell::RefCell;
use std::ffi::{c_double, c_float, c_int, c_void};
use std::slice;

use tracing::warn;

use crate::host::CallbackTable;
use crate::kind::{ArrayElement, ScalarValue};
use crate::marshal;

/// # Safety
///
/// `refcon` must be the storage pointer of a live publishing handle for `T`.
unsafe fn cell<'a, T>(refcon: *mut c_void) -> &'a RefCell<T> {
    unsafe { &*refcon.cast::<RefCell<T>>() }
}

/// Run `f` on a shared borrow, zero when the plugin holds a mutable one.
unsafe fn read<T, R: Default>(refcon: *mut c_void, f: impl FnOnce(&T) -> R) -> R {
    match unsafe { cell::<T>(refcon) }.try_borrow() {
        Ok(value) => f(&value),
        Err(_) => {
            warn!("dataref read skipped, value is borrowed mutably");
            R::default()
        }
    }
}

/// Run `f` on a mutable borrow, skipped while the plugin holds any borrow.
unsafe fn write<T>(refcon: *mut c_void, f: impl FnOnce(&mut T)) {
    match unsafe { cell::<T>(refcon) }.try_borrow_mut() {
        Ok(mut value) => f(&mut value),
        Err(_) => warn!("dataref write dropped, value is borrowed"),
    }
}

/// Scalar slots: all three representations, converting on the way.
pub(crate) fn scalar_table<T: ScalarValue>(writable: bool) -> CallbackTable {
    let mut table = CallbackTable {
        read_int: Some(read_int::<T>),
        read_float: Some(read_float::<T>),
        read_double: Some(read_double::<T>),
        ..Default::default()
    };

    if writable {
        table.write_int = Some(write_int::<T>);
        table.write_float = Some(write_float::<T>);
        table.write_double = Some(write_double::<T>);
    }

    table
}

pub(crate) unsafe extern "C" fn read_int<T: ScalarValue>(refcon: *mut c_void) -> c_int {
    unsafe { read(refcon, |value: &T| value.to_i32()) }
}

pub(crate) unsafe extern "C" fn write_int<T: ScalarValue>(refcon: *mut c_void, value: c_int) {
    unsafe { write(refcon, |slot: &mut T| *slot = T::from_i32(value)) }
}

pub(crate) unsafe extern "C" fn read_float<T: ScalarValue>(refcon: *mut c_void) -> c_float {
    unsafe { read(refcon, |value: &T| value.to_f32()) }
}

pub(crate) unsafe extern "C" fn write_float<T: ScalarValue>(refcon: *mut c_void, value: c_float) {
    unsafe { write(refcon, |slot: &mut T| *slot = T::from_f32(value)) }
}

pub(crate) unsafe extern "C" fn read_double<T: ScalarValue>(refcon: *mut c_void) -> c_double {
    unsafe { read(refcon, |value: &T| value.to_f64()) }
}

pub(crate) unsafe extern "C" fn write_double<T: ScalarValue>(refcon: *mut c_void, value: c_double) {
    unsafe { write(refcon, |slot: &mut T| *slot = T::from_f64(value)) }
}

/// Vector getter. A null `out` asks for the element count.
pub(crate) unsafe extern "C" fn read_array<E: ArrayElement>(
    refcon: *mut c_void,
    out: *mut E,
    offset: c_int,
    max: c_int,
) -> c_int {
    let read_window = |values: &Vec<E>| {
        if out.is_null() {
            return marshal::len_ret(values.len());
        }

        let offset = marshal::offset_arg(offset);
        let n = marshal::window_len(values.len(), offset, marshal::count_arg(max));
        // SAFETY: the host guarantees out has room for max >= n elements
        let dest = unsafe { slice::from_raw_parts_mut(out, n) };
        marshal::len_ret(marshal::copy_window_out(values, dest, offset))
    };
    unsafe { read(refcon, read_window) }
}

/// Vector setter. Copies into the owned array at `offset`, clipped to capacity.
pub(crate) unsafe extern "C" fn write_array<E: ArrayElement>(
    refcon: *mut c_void,
    values: *mut E,
    offset: c_int,
    count: c_int,
) {
    let offset = marshal::offset_arg(offset);
    let count = marshal::count_arg(count);
    if values.is_null() || count == 0 {
        return;
    }

    let write_window = |owned: &mut Vec<E>| {
        let n = marshal::window_len(owned.len(), offset, count);
        // SAFETY: the host guarantees values holds count >= n elements
        let src = unsafe { slice::from_raw_parts(values.cast_const(), n) };
        marshal::copy_window_in(owned, src, offset);
    };
    unsafe { write(refcon, write_window) }
}

/// Byte getter. A null `out` asks for the byte length.
pub(crate) unsafe extern "C" fn read_bytes(
    refcon: *mut c_void,
    out: *mut c_void,
    offset: c_int,
    max: c_int,
) -> c_int {
    let read_window = |value: &String| {
        if out.is_null() {
            return marshal::len_ret(value.len());
        }

        let offset = marshal::offset_arg(offset);
        let n = marshal::window_len(value.len(), offset, marshal::count_arg(max));
        let dest = unsafe { slice::from_raw_parts_mut(out.cast::<u8>(), n) };
        marshal::len_ret(marshal::copy_window_out(value.as_bytes(), dest, offset))
    };
    unsafe { read(refcon, read_window) }
}

/// Byte setter. Replaces the string from `offset` with the terminated input.
pub(crate) unsafe extern "C" fn write_bytes(
    refcon: *mut c_void,
    values: *mut c_void,
    offset: c_int,
    count: c_int,
) {
    let offset = marshal::offset_arg(offset);
    let count = marshal::count_arg(count);
    let src: &[u8] = if values.is_null() {
        &[]
    } else {
        unsafe { slice::from_raw_parts(values.cast_const().cast::<u8>(), count) }
    };

    let splice = |value: &mut String| {
        let mut bytes = std::mem::take(value).into_bytes();
        marshal::splice_bytes(&mut bytes, src, offset);
        *value = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };
    };
    unsafe { write(refcon, splice) }
}
