//! Value kinds and the closed set of types a dataref can hold.
//!
//! Exactly six Rust types implement [`DatarefValue`]: `i32`, `f32`, `f64`,
//! `Vec<i32>`, `Vec<f32>` and `String`. The trait is sealed, so a handle for
//! any other type fails to compile:
//!
//! ```compile_fail
//! use datarefw::FindDataref;
//!
//! let flag: FindDataref<bool> = FindDataref::new("sim/operation/paused");
//! ```
//!
//! ```compile_fail
//! use datarefw::CreateDataref;
//!
//! let count: CreateDataref<u32> = CreateDataref::new("plugin/count", true);
//! ```
//!
//! Each implementation carries its [`ValueKind`] and knows how to move its
//! value to and from the host, both through the host's accessor functions
//! (lookup handles) and through the accessor callbacks handed to the host
//! (publishing handles).

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use crate::callbacks;
use crate::error::{DatarefError, Result};
use crate::host::{CallbackTable, DataAccess, HostTypes, RawDataref};
use crate::marshal;

/// The six kinds of value a dataref can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `i32`
    Int32,
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// `Vec<i32>`
    Int32Array,
    /// `Vec<f32>`
    Float32Array,
    /// `String`, served as raw bytes
    ByteString,
}

impl ValueKind {
    /// Every kind, scalars first.
    pub const ALL: [ValueKind; 6] = [
        Self::Int32,
        Self::Float32,
        Self::Float64,
        Self::Int32Array,
        Self::Float32Array,
        Self::ByteString,
    ];

    /// The kind a value type denotes.
    pub const fn of<T: DatarefValue>() -> Self {
        T::KIND
    }

    /// Int or float array.
    pub const fn is_array(self) -> bool {
        matches!(self, Self::Int32Array | Self::Float32Array)
    }

    /// Int, float or double.
    pub const fn is_scalar_numeric(self) -> bool {
        matches!(self, Self::Int32 | Self::Float32 | Self::Float64)
    }

    /// Byte string.
    pub const fn is_byte(self) -> bool {
        matches!(self, Self::ByteString)
    }

    /// The single host type bit for this kind.
    pub fn host_type(self) -> HostTypes {
        match self {
            Self::Int32 => HostTypes::INT,
            Self::Float32 => HostTypes::FLOAT,
            Self::Float64 => HostTypes::DOUBLE,
            Self::Int32Array => HostTypes::INT_ARRAY,
            Self::Float32Array => HostTypes::FLOAT_ARRAY,
            Self::ByteString => HostTypes::DATA,
        }
    }

    /// Whether a dataref reported as `reported` can be accessed as this kind.
    ///
    /// A single reported type must match exactly. A combination of int,
    /// float and double is accepted by every scalar kind, since the host
    /// converts between them on access.
    pub fn accepts(self, reported: HostTypes) -> bool {
        if reported.is_unknown() {
            return false;
        }

        if reported == self.host_type() {
            return true;
        }

        self.is_scalar_numeric()
            && HostTypes::NUMERIC.contains(reported)
            && reported.bits().count_ones() > 1
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host_type(), f)
    }
}

/// The kind a value type denotes.
pub const fn classify<T: DatarefValue>() -> ValueKind {
    T::KIND
}

mod private {
    pub trait Sealed {}

    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for Vec<i32> {}
    impl Sealed for Vec<f32> {}
    impl Sealed for String {}
}

/// A type that can be stored in a dataref.
pub trait DatarefValue:
    private::Sealed + Clone + Default + PartialEq + fmt::Debug + 'static
{
    /// The kind this type denotes.
    const KIND: ValueKind;

    /// Read the current value through the host's accessor functions.
    fn read_host<H: DataAccess>(host: &H, dataref: RawDataref) -> Self;

    /// Write through the host's accessor functions (offset 0, full length).
    fn write_host<H: DataAccess>(&self, host: &H, dataref: RawDataref);

    /// Callback slots for publishing a dataref backed by a `Self`.
    ///
    /// Only the slots of this kind's family are populated; setters only when
    /// `writable`.
    fn callback_table(writable: bool) -> CallbackTable;

    /// Replace the storage of a publishing handle named `name`.
    ///
    /// Arrays keep their capacity: `value` fills a prefix and must fit.
    fn assign(slot: &mut Self, value: Self, name: &str) -> Result<()>;

    /// Format the value for display.
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Scalar numeric values: `i32`, `f32`, `f64`.
///
/// The host may ask for any of the three representations, so every scalar
/// converts to and from all of them.
///
/// Arithmetic on `i32` wraps on overflow. Division reports a zero divisor as
/// `None` for every kind.
pub trait ScalarValue: DatarefValue + Copy + PartialOrd + fmt::Display {
    /// Convert from the host's int representation.
    fn from_i32(value: i32) -> Self;
    /// Convert from the host's float representation.
    fn from_f32(value: f32) -> Self;
    /// Convert from the host's double representation.
    fn from_f64(value: f64) -> Self;
    /// Convert to the host's int representation, truncating.
    fn to_i32(self) -> i32;
    /// Convert to the host's float representation.
    fn to_f32(self) -> f32;
    /// Convert to the host's double representation.
    fn to_f64(self) -> f64;

    /// `self + rhs`
    fn add_value(self, rhs: Self) -> Self;
    /// `self - rhs`
    fn sub_value(self, rhs: Self) -> Self;
    /// `self * rhs`
    fn mul_value(self, rhs: Self) -> Self;
    /// `self / rhs`, or `None` when `rhs` is zero.
    fn div_value(self, rhs: Self) -> Option<Self>;
}

/// Element types of the array kinds: `i32`, `f32`.
pub trait ArrayElement:
    private::Sealed + Copy + Default + PartialEq + PartialOrd + fmt::Debug + 'static
{
    /// The kind of a `Vec` of this element.
    const ARRAY_KIND: ValueKind;

    /// Windowed read; `None` returns the length.
    fn get_window<H: DataAccess>(
        host: &H,
        dataref: RawDataref,
        dest: Option<&mut [Self]>,
        offset: usize,
    ) -> usize;

    /// Windowed write starting at `offset`.
    fn set_window<H: DataAccess>(host: &H, dataref: RawDataref, values: &[Self], offset: usize);

    /// Populate this element's vector slots.
    fn install_callbacks(table: &mut CallbackTable, writable: bool);
}

macro_rules! impl_scalar {
    ($ty:ty, $kind:expr, $get:ident, $set:ident, $add:ident, $sub:ident, $mul:ident, $div:ident) => {
        impl DatarefValue for $ty {
            const KIND: ValueKind = $kind;

            fn read_host<H: DataAccess>(host: &H, dataref: RawDataref) -> Self {
                host.$get(dataref)
            }

            fn write_host<H: DataAccess>(&self, host: &H, dataref: RawDataref) {
                host.$set(dataref, *self)
            }

            fn callback_table(writable: bool) -> CallbackTable {
                callbacks::scalar_table::<$ty>(writable)
            }

            fn assign(slot: &mut Self, value: Self, _name: &str) -> Result<()> {
                *slot = value;
                Ok(())
            }

            fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        impl ScalarValue for $ty {
            fn from_i32(value: i32) -> Self {
                value as $ty
            }

            fn from_f32(value: f32) -> Self {
                value as $ty
            }

            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            fn to_i32(self) -> i32 {
                self as i32
            }

            fn to_f32(self) -> f32 {
                self as f32
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn add_value(self, rhs: Self) -> Self {
                self.$add(rhs)
            }

            fn sub_value(self, rhs: Self) -> Self {
                self.$sub(rhs)
            }

            fn mul_value(self, rhs: Self) -> Self {
                self.$mul(rhs)
            }

            fn div_value(self, rhs: Self) -> Option<Self> {
                if rhs == Self::default() {
                    None
                } else {
                    Some(self.$div(rhs))
                }
            }
        }
    };
}

impl_scalar!(i32, ValueKind::Int32, get_i32, set_i32, wrapping_add, wrapping_sub, wrapping_mul, wrapping_div);
impl_scalar!(f32, ValueKind::Float32, get_f32, set_f32, add, sub, mul, div);
impl_scalar!(f64, ValueKind::Float64, get_f64, set_f64, add, sub, mul, div);

impl ArrayElement for i32 {
    const ARRAY_KIND: ValueKind = ValueKind::Int32Array;

    fn get_window<H: DataAccess>(
        host: &H,
        dataref: RawDataref,
        dest: Option<&mut [Self]>,
        offset: usize,
    ) -> usize {
        host.get_i32_array(dataref, dest, offset)
    }

    fn set_window<H: DataAccess>(host: &H, dataref: RawDataref, values: &[Self], offset: usize) {
        host.set_i32_array(dataref, values, offset)
    }

    fn install_callbacks(table: &mut CallbackTable, writable: bool) {
        table.read_int_array = Some(callbacks::read_array::<i32>);
        if writable {
            table.write_int_array = Some(callbacks::write_array::<i32>);
        }
    }
}

impl ArrayElement for f32 {
    const ARRAY_KIND: ValueKind = ValueKind::Float32Array;

    fn get_window<H: DataAccess>(
        host: &H,
        dataref: RawDataref,
        dest: Option<&mut [Self]>,
        offset: usize,
    ) -> usize {
        host.get_f32_array(dataref, dest, offset)
    }

    fn set_window<H: DataAccess>(host: &H, dataref: RawDataref, values: &[Self], offset: usize) {
        host.set_f32_array(dataref, values, offset)
    }

    fn install_callbacks(table: &mut CallbackTable, writable: bool) {
        table.read_float_array = Some(callbacks::read_array::<f32>);
        if writable {
            table.write_float_array = Some(callbacks::write_array::<f32>);
        }
    }
}

impl<E> DatarefValue for Vec<E>
where
    E: ArrayElement,
    Vec<E>: private::Sealed,
{
    const KIND: ValueKind = E::ARRAY_KIND;

    fn read_host<H: DataAccess>(host: &H, dataref: RawDataref) -> Self {
        let len = E::get_window(host, dataref, None, 0);
        let mut values = vec![E::default(); len];
        let copied = E::get_window(host, dataref, Some(&mut values), 0);
        values.truncate(copied);
        values
    }

    fn write_host<H: DataAccess>(&self, host: &H, dataref: RawDataref) {
        E::set_window(host, dataref, self, 0)
    }

    fn callback_table(writable: bool) -> CallbackTable {
        let mut table = CallbackTable::default();
        E::install_callbacks(&mut table, writable);
        table
    }

    fn assign(slot: &mut Self, value: Self, name: &str) -> Result<()> {
        if value.len() > slot.len() {
            return Err(DatarefError::CapacityExceeded {
                name: name.to_string(),
                len: value.len(),
                capacity: slot.len(),
            });
        }

        slot[..value.len()].copy_from_slice(&value);
        Ok(())
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl DatarefValue for String {
    const KIND: ValueKind = ValueKind::ByteString;

    fn read_host<H: DataAccess>(host: &H, dataref: RawDataref) -> Self {
        let len = host.get_bytes(dataref, None, 0);
        if len == 0 {
            return String::new();
        }

        // One spare byte so the buffer is always terminated
        let mut buf = vec![0u8; len + 1];
        let copied = host.get_bytes(dataref, Some(&mut buf[..len]), 0);
        buf[copied.min(len)] = 0;

        String::from_utf8_lossy(marshal::terminated(&buf)).into_owned()
    }

    fn write_host<H: DataAccess>(&self, host: &H, dataref: RawDataref) {
        host.set_bytes(dataref, self.as_bytes(), 0)
    }

    fn callback_table(writable: bool) -> CallbackTable {
        CallbackTable {
            read_data: Some(callbacks::read_bytes),
            write_data: if writable {
                Some(callbacks::write_bytes)
            } else {
                None
            },
            ..Default::default()
        }
    }

    fn assign(slot: &mut Self, value: Self, _name: &str) -> Result<()> {
        let end = marshal::terminated(value.as_bytes()).len();
        *slot = value;
        slot.truncate(end);
        Ok(())
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}
