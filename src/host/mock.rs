//! In-memory [`DataAccess`] implementation for tests and demos.
//!
//! `MockHost` keeps a registry of named datarefs. Built-in ones are defined
//! up front with the `define_*` helpers and store their value directly;
//! published ones are served by the accessor callbacks handed to
//! [`DataAccess::register`], exactly as the simulator would call them.
//!
//! Clones share the same registry. Published accessors are only served on
//! the thread that registered them; any other thread traps before a callback
//! runs.
//!
//! # Example
//!
//! ```
//! use datarefw::host::MockHost;
//! use datarefw::FindDataref;
//!
//! let host = MockHost::new();
//! host.define_i32("sim/cockpit/autopilot/mode", 2, true);
//!
//! let mut mode: FindDataref<i32, MockHost> =
//!     FindDataref::with_host(host.clone(), "sim/cockpit/autopilot/mode");
//! assert!(mode.found());
//! mode.set(3);
//! assert_eq!(mode.get(), 3);
//! ```

use std::collections::HashMap;
use std::ffi::{c_int, c_void, CStr};
use std::ptr;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::{CallbackTable, DataAccess, HostTypes, RawDataref};
use crate::error::{trap, DatarefError};
use crate::marshal;

/// A registration's refcon.
#[derive(Debug, Clone, Copy)]
struct Refcon(*mut c_void);

// SAFETY: the registry never dereferences the refcon itself, and only hands
// it back to its callbacks on the registering thread
unsafe impl Send for Refcon {}

#[derive(Debug)]
enum Storage {
    Scalar(f64),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    Bytes(Vec<u8>),
    Accessor {
        callbacks: CallbackTable,
        refcon: Refcon,
        owner: ThreadId,
    },
}

#[derive(Debug)]
struct Entry {
    name: String,
    types: HostTypes,
    writable: bool,
    storage: Storage,
}

#[derive(Debug, Default)]
struct Registry {
    entries: Vec<Option<Entry>>,
    names: HashMap<String, usize>,
    log: Vec<String>,
    features: HashMap<String, bool>,
}

impl Registry {
    fn index(dataref: RawDataref) -> usize {
        (dataref.as_ptr() as usize).wrapping_sub(1)
    }

    fn handle(index: usize) -> RawDataref {
        // Handles are 1-based so they are never null
        match RawDataref::from_ptr((index + 1) as *mut c_void) {
            Some(handle) => handle,
            None => unreachable!("index + 1 is never zero"),
        }
    }

    fn entry(&self, dataref: RawDataref) -> Option<&Entry> {
        self.entries.get(Self::index(dataref))?.as_ref()
    }

    fn entry_mut(&mut self, dataref: RawDataref) -> Option<&mut Entry> {
        self.entries.get_mut(Self::index(dataref))?.as_mut()
    }

    fn insert(&mut self, entry: Entry) -> RawDataref {
        let index = self.entries.len();
        self.names.insert(entry.name.clone(), index);
        self.entries.push(Some(entry));
        Self::handle(index)
    }
}

/// Where an access lands once the registry lock is released.
enum Target {
    Missing,
    Local,
    Accessor(CallbackTable, *mut c_void),
}

/// Simulated host with an in-memory dataref registry.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    inner: Arc<Mutex<Registry>>,
}

impl MockHost {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn define(&self, name: &str, types: HostTypes, writable: bool, storage: Storage) -> RawDataref {
        let mut registry = self.inner.lock();
        let entry = Entry {
            name: name.to_string(),
            types,
            writable,
            storage,
        };

        // Redefining replaces the old value in place
        if let Some(&index) = registry.names.get(name) {
            registry.entries[index] = Some(entry);
            return Registry::handle(index);
        }
        registry.insert(entry)
    }

    /// Define a built-in int dataref.
    pub fn define_i32(&self, name: &str, value: i32, writable: bool) -> RawDataref {
        self.define(name, HostTypes::INT, writable, Storage::Scalar(f64::from(value)))
    }

    /// Define a built-in float dataref.
    pub fn define_f32(&self, name: &str, value: f32, writable: bool) -> RawDataref {
        self.define(name, HostTypes::FLOAT, writable, Storage::Scalar(f64::from(value)))
    }

    /// Define a built-in double dataref.
    pub fn define_f64(&self, name: &str, value: f64, writable: bool) -> RawDataref {
        self.define(name, HostTypes::DOUBLE, writable, Storage::Scalar(value))
    }

    /// Define a scalar dataref reporting an arbitrary set of types.
    ///
    /// Useful for datarefs the simulator reports as several numeric types at
    /// once, or as no type at all.
    pub fn define_raw(
        &self,
        name: &str,
        types: HostTypes,
        value: f64,
        writable: bool,
    ) -> RawDataref {
        self.define(name, types, writable, Storage::Scalar(value))
    }

    /// Define a built-in int array dataref. Its length is fixed.
    pub fn define_i32s(&self, name: &str, values: &[i32], writable: bool) -> RawDataref {
        self.define(
            name,
            HostTypes::INT_ARRAY,
            writable,
            Storage::IntArray(values.to_vec()),
        )
    }

    /// Define a built-in float array dataref. Its length is fixed.
    pub fn define_f32s(&self, name: &str, values: &[f32], writable: bool) -> RawDataref {
        self.define(
            name,
            HostTypes::FLOAT_ARRAY,
            writable,
            Storage::FloatArray(values.to_vec()),
        )
    }

    /// Define a built-in byte dataref.
    pub fn define_bytes(&self, name: &str, value: &[u8], writable: bool) -> RawDataref {
        self.define(name, HostTypes::DATA, writable, Storage::Bytes(value.to_vec()))
    }

    /// True when a dataref with this name is currently defined or published.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().names.contains_key(name)
    }

    /// Number of live published accessors.
    pub fn accessor_count(&self) -> usize {
        self.inner
            .lock()
            .entries
            .iter()
            .flatten()
            .filter(|entry| matches!(entry.storage, Storage::Accessor { .. }))
            .count()
    }

    /// Last state set for `feature` with [`DataAccess::enable_feature`].
    pub fn feature_enabled(&self, feature: &str) -> Option<bool> {
        self.inner.lock().features.get(feature).copied()
    }

    /// Everything written with [`DataAccess::debug_string`], one entry per call.
    pub fn log_lines(&self) -> Vec<String> {
        self.inner.lock().log.clone()
    }

    #[track_caller]
    fn target(&self, dataref: RawDataref) -> Target {
        let registry = self.inner.lock();
        match registry.entry(dataref) {
            None => Target::Missing,
            Some(Entry {
                storage:
                    Storage::Accessor {
                        callbacks,
                        refcon,
                        owner,
                    },
                ..
            }) => {
                let current = thread::current().id();
                if current != *owner {
                    let err = DatarefError::WrongThread {
                        owner: format!("{:?}", owner),
                        actual: format!("{:?}", current),
                    };
                    drop(registry);
                    trap(err);
                }
                Target::Accessor(*callbacks, refcon.0)
            }
            Some(_) => Target::Local,
        }
    }

    fn with_local<R>(&self, dataref: RawDataref, f: impl FnOnce(&mut Entry) -> R) -> Option<R> {
        let mut registry = self.inner.lock();
        registry.entry_mut(dataref).map(f)
    }

    fn local_scalar(&self, dataref: RawDataref) -> f64 {
        self.with_local(dataref, |entry| match entry.storage {
            Storage::Scalar(value) => value,
            _ => 0.0,
        })
        .unwrap_or_default()
    }

    fn store_scalar(&self, dataref: RawDataref, value: f64) {
        self.with_local(dataref, |entry| {
            if let (true, Storage::Scalar(slot)) = (entry.writable, &mut entry.storage) {
                *slot = value;
            }
        });
    }
}

fn arg(value: usize) -> c_int {
    marshal::len_ret(value)
}

impl DataAccess for MockHost {
    fn find(&self, name: &CStr) -> Option<RawDataref> {
        let name = name.to_string_lossy();
        let registry = self.inner.lock();
        registry.names.get(&*name).map(|&index| Registry::handle(index))
    }

    fn types(&self, dataref: RawDataref) -> HostTypes {
        self.inner
            .lock()
            .entry(dataref)
            .map_or(HostTypes::empty(), |entry| entry.types)
    }

    fn can_write(&self, dataref: RawDataref) -> bool {
        self.inner
            .lock()
            .entry(dataref)
            .is_some_and(|entry| entry.writable)
    }

    fn get_i32(&self, dataref: RawDataref) -> i32 {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { read_int: Some(f), .. }, refcon) => unsafe { f(refcon) },
            Target::Local => self.local_scalar(dataref) as i32,
            _ => 0,
        }
    }

    fn set_i32(&self, dataref: RawDataref, value: i32) {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { write_int: Some(f), .. }, refcon) => unsafe {
                f(refcon, value)
            },
            Target::Local => self.store_scalar(dataref, f64::from(value)),
            _ => {}
        }
    }

    fn get_f32(&self, dataref: RawDataref) -> f32 {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { read_float: Some(f), .. }, refcon) => unsafe {
                f(refcon)
            },
            Target::Local => self.local_scalar(dataref) as f32,
            _ => 0.0,
        }
    }

    fn set_f32(&self, dataref: RawDataref, value: f32) {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { write_float: Some(f), .. }, refcon) => unsafe {
                f(refcon, value)
            },
            Target::Local => self.store_scalar(dataref, f64::from(value)),
            _ => {}
        }
    }

    fn get_f64(&self, dataref: RawDataref) -> f64 {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { read_double: Some(f), .. }, refcon) => unsafe {
                f(refcon)
            },
            Target::Local => self.local_scalar(dataref),
            _ => 0.0,
        }
    }

    fn set_f64(&self, dataref: RawDataref, value: f64) {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { write_double: Some(f), .. }, refcon) => unsafe {
                f(refcon, value)
            },
            Target::Local => self.store_scalar(dataref, value),
            _ => {}
        }
    }

    fn get_i32_array(
        &self,
        dataref: RawDataref,
        dest: Option<&mut [i32]>,
        offset: usize,
    ) -> usize {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { read_int_array: Some(f), .. }, refcon) => {
                let (out, max) = match dest {
                    Some(dest) => (dest.as_mut_ptr(), dest.len()),
                    None => (ptr::null_mut(), 0),
                };
                let n = unsafe { f(refcon, out, arg(offset), arg(max)) };
                marshal::count_arg(n)
            }
            Target::Local => self
                .with_local(dataref, |entry| match (&entry.storage, dest) {
                    (Storage::IntArray(values), Some(dest)) => {
                        marshal::copy_window_out(values, dest, offset)
                    }
                    (Storage::IntArray(values), None) => values.len(),
                    _ => 0,
                })
                .unwrap_or_default(),
            _ => 0,
        }
    }

    fn set_i32_array(&self, dataref: RawDataref, values: &[i32], offset: usize) {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { write_int_array: Some(f), .. }, refcon) => unsafe {
                f(refcon, values.as_ptr().cast_mut(), arg(offset), arg(values.len()))
            },
            Target::Local => {
                self.with_local(dataref, |entry| {
                    if let (true, Storage::IntArray(owned)) = (entry.writable, &mut entry.storage) {
                        marshal::copy_window_in(owned, values, offset);
                    }
                });
            }
            _ => {}
        }
    }

    fn get_f32_array(
        &self,
        dataref: RawDataref,
        dest: Option<&mut [f32]>,
        offset: usize,
    ) -> usize {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { read_float_array: Some(f), .. }, refcon) => {
                let (out, max) = match dest {
                    Some(dest) => (dest.as_mut_ptr(), dest.len()),
                    None => (ptr::null_mut(), 0),
                };
                let n = unsafe { f(refcon, out, arg(offset), arg(max)) };
                marshal::count_arg(n)
            }
            Target::Local => self
                .with_local(dataref, |entry| match (&entry.storage, dest) {
                    (Storage::FloatArray(values), Some(dest)) => {
                        marshal::copy_window_out(values, dest, offset)
                    }
                    (Storage::FloatArray(values), None) => values.len(),
                    _ => 0,
                })
                .unwrap_or_default(),
            _ => 0,
        }
    }

    fn set_f32_array(&self, dataref: RawDataref, values: &[f32], offset: usize) {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { write_float_array: Some(f), .. }, refcon) => unsafe {
                f(refcon, values.as_ptr().cast_mut(), arg(offset), arg(values.len()))
            },
            Target::Local => {
                self.with_local(dataref, |entry| {
                    if let (true, Storage::FloatArray(owned)) = (entry.writable, &mut entry.storage)
                    {
                        marshal::copy_window_in(owned, values, offset);
                    }
                });
            }
            _ => {}
        }
    }

    fn get_bytes(&self, dataref: RawDataref, dest: Option<&mut [u8]>, offset: usize) -> usize {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { read_data: Some(f), .. }, refcon) => {
                let (out, max) = match dest {
                    Some(dest) => (dest.as_mut_ptr().cast::<c_void>(), dest.len()),
                    None => (ptr::null_mut(), 0),
                };
                let n = unsafe { f(refcon, out, arg(offset), arg(max)) };
                marshal::count_arg(n)
            }
            Target::Local => self
                .with_local(dataref, |entry| match (&entry.storage, dest) {
                    (Storage::Bytes(bytes), Some(dest)) => {
                        marshal::copy_window_out(bytes, dest, offset)
                    }
                    (Storage::Bytes(bytes), None) => bytes.len(),
                    _ => 0,
                })
                .unwrap_or_default(),
            _ => 0,
        }
    }

    fn set_bytes(&self, dataref: RawDataref, values: &[u8], offset: usize) {
        match self.target(dataref) {
            Target::Accessor(CallbackTable { write_data: Some(f), .. }, refcon) => unsafe {
                f(
                    refcon,
                    values.as_ptr().cast_mut().cast::<c_void>(),
                    arg(offset),
                    arg(values.len()),
                )
            },
            Target::Local => {
                self.with_local(dataref, |entry| {
                    if let (true, Storage::Bytes(owned)) = (entry.writable, &mut entry.storage) {
                        marshal::splice_bytes(owned, values, offset);
                    }
                });
            }
            _ => {}
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
        let name = name.to_string_lossy().into_owned();
        let mut registry = self.inner.lock();
        if registry.names.contains_key(&name) {
            return None;
        }

        Some(registry.insert(Entry {
            name,
            types,
            writable,
            storage: Storage::Accessor {
                callbacks: *callbacks,
                refcon: Refcon(refcon),
                owner: thread::current().id(),
            },
        }))
    }

    fn unregister(&self, dataref: RawDataref) {
        let mut registry = self.inner.lock();
        let index = Registry::index(dataref);
        let is_accessor = matches!(
            registry.entry(dataref),
            Some(Entry {
                storage: Storage::Accessor { .. },
                ..
            })
        );

        if is_accessor {
            if let Some(entry) = registry.entries[index].take() {
                registry.names.remove(&entry.name);
            }
        }
    }

    fn debug_string(&self, message: &str) {
        self.inner.lock().log.push(message.to_string());
    }

    fn enable_feature(&self, feature: &CStr, enabled: bool) {
        let feature = feature.to_string_lossy().into_owned();
        self.inner.lock().features.insert(feature, enabled);
    }
}
