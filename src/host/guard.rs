//! Owner-thread checking for host access.
//!
//! The simulator's data API may only be called from the thread that loaded
//! the plugin. [`GuardedHost`] remembers that thread and traps on any call
//! from another one.

use std::ffi::{c_void, CStr};
use std::thread::{self, ThreadId};

use super::{CallbackTable, DataAccess, HostTypes, RawDataref};
use crate::config::AccessConfig;
use crate::error::{trap, DatarefError};

/// Wraps a host and checks the calling thread before every operation.
#[derive(Debug, Clone)]
pub struct GuardedHost<H> {
    inner: H,
    owner: Option<ThreadId>,
}

impl<H: DataAccess> GuardedHost<H> {
    /// Guard `inner`, owned by the current thread.
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            owner: Some(thread::current().id()),
        }
    }

    /// Wrap `inner` without any thread check.
    pub fn disarmed(inner: H) -> Self {
        Self { inner, owner: None }
    }

    /// Armed or disarmed according to `config.single_thread_check`.
    pub fn from_config(inner: H, config: &AccessConfig) -> Self {
        if config.single_thread_check {
            Self::new(inner)
        } else {
            Self::disarmed(inner)
        }
    }

    pub fn is_armed(&self) -> bool {
        self.owner.is_some()
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    #[track_caller]
    fn check(&self) {
        let Some(owner) = self.owner else {
            return;
        };

        let actual = thread::current().id();
        if actual != owner {
            trap(DatarefError::WrongThread {
                owner: format!("{:?}", owner),
                actual: format!("{:?}", actual),
            });
        }
    }
}

impl<H: DataAccess> DataAccess for GuardedHost<H> {
    fn find(&self, name: &CStr) -> Option<RawDataref> {
        self.check();
        self.inner.find(name)
    }

    fn types(&self, dataref: RawDataref) -> HostTypes {
        self.check();
        self.inner.types(dataref)
    }

    fn can_write(&self, dataref: RawDataref) -> bool {
        self.check();
        self.inner.can_write(dataref)
    }

    fn get_i32(&self, dataref: RawDataref) -> i32 {
        self.check();
        self.inner.get_i32(dataref)
    }

    fn set_i32(&self, dataref: RawDataref, value: i32) {
        self.check();
        self.inner.set_i32(dataref, value)
    }

    fn get_f32(&self, dataref: RawDataref) -> f32 {
        self.check();
        self.inner.get_f32(dataref)
    }

    fn set_f32(&self, dataref: RawDataref, value: f32) {
        self.check();
        self.inner.set_f32(dataref, value)
    }

    fn get_f64(&self, dataref: RawDataref) -> f64 {
        self.check();
        self.inner.get_f64(dataref)
    }

    fn set_f64(&self, dataref: RawDataref, value: f64) {
        self.check();
        self.inner.set_f64(dataref, value)
    }

    fn get_i32_array(
        &self,
        dataref: RawDataref,
        dest: Option<&mut [i32]>,
        offset: usize,
    ) -> usize {
        self.check();
        self.inner.get_i32_array(dataref, dest, offset)
    }

    fn set_i32_array(&self, dataref: RawDataref, values: &[i32], offset: usize) {
        self.check();
        self.inner.set_i32_array(dataref, values, offset)
    }

    fn get_f32_array(
        &self,
        dataref: RawDataref,
        dest: Option<&mut [f32]>,
        offset: usize,
    ) -> usize {
        self.check();
        self.inner.get_f32_array(dataref, dest, offset)
    }

    fn set_f32_array(&self, dataref: RawDataref, values: &[f32], offset: usize) {
        self.check();
        self.inner.set_f32_array(dataref, values, offset)
    }

    fn get_bytes(&self, dataref: RawDataref, dest: Option<&mut [u8]>, offset: usize) -> usize {
        self.check();
        self.inner.get_bytes(dataref, dest, offset)
    }

    fn set_bytes(&self, dataref: RawDataref, values: &[u8], offset: usize) {
        self.check();
        self.inner.set_bytes(dataref, values, offset)
    }

    unsafe fn register(
        &self,
        name: &CStr,
        types: HostTypes,
        writable: bool,
        callbacks: &CallbackTable,
        refcon: *mut c_void,
    ) -> Option<RawDataref> {
        self.check();
        // SAFETY: forwarded from the caller
        unsafe { self.inner.register(name, types, writable, callbacks, refcon) }
    }

    fn unregister(&self, dataref: RawDataref) {
        self.check();
        self.inner.unregister(dataref)
    }

    fn debug_string(&self, message: &str) {
        self.check();
        self.inner.debug_string(message)
    }

    fn enable_feature(&self, feature: &CStr, enabled: bool) {
        self.check();
        self.inner.enable_feature(feature, enabled)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::host::MockHost;
    use std::ffi::CString;

    #[test]
    fn test_owner_thread_passes() {
        let mock = MockHost::new();
        mock.define_i32("sim/test/owned", 3, true);
        let host = GuardedHost::new(mock);
        assert!(host.is_armed());

        let name = CString::new("sim/test/owned").unwrap();
        let handle = host.find(&name).unwrap();
        assert_eq!(host.get_i32(handle), 3);
    }

    #[test]
    fn test_other_thread_traps() {
        let host = GuardedHost::new(MockHost::new());
        let result = thread::spawn(move || host.debug_string("from elsewhere")).join();
        assert!(result.is_err());
    }

    #[test]
    fn test_disarmed_allows_any_thread() {
        let mock = MockHost::new();
        let host = GuardedHost::disarmed(mock.clone());
        thread::spawn(move || host.debug_string("from elsewhere"))
            .join()
            .unwrap();
        assert_eq!(mock.log_lines(), vec!["from elsewhere".to_string()]);
    }

    #[test]
    fn test_from_config() {
        let armed = GuardedHost::from_config(
            MockHost::new(),
            &AccessConfig {
                single_thread_check: true,
            },
        );
        assert!(armed.is_armed());

        let disarmed = GuardedHost::from_config(
            MockHost::new(),
            &AccessConfig {
                single_thread_check: false,
            },
        );
        assert!(!disarmed.is_armed());
    }
}
