//! # datarefw
//!
//! Typed access to X-Plane datarefs for plugins written in Rust.
//!
//! A dataref is a named piece of simulator state (`sim/cockpit/radios/com1_freq_hz`)
//! holding one of six kinds of value: a 32-bit int, a float, a double, an int
//! array, a float array, or a byte string. This crate wraps the untyped C data
//! access API in two handle types:
//!
//! - **[`FindDataref<T>`]** looks up an existing dataref, checks that the type
//!   the simulator reports matches `T`, and then reads and writes it as a `T`.
//! - **[`CreateDataref<T>`]** publishes a new dataref backed by a value the
//!   plugin owns, serving the simulator's reads and writes through accessor
//!   callbacks, and withdraws it when dropped.
//!
//! `T` is one of `i32`, `f32`, `f64`, `Vec<i32>`, `Vec<f32>` or `String`.
//! Anything else is rejected at compile time.
//!
//! ## Crate Structure
//!
//! - **`kind`**: the closed set of value types ([`DatarefValue`]) and their
//!   [`ValueKind`] classification.
//! - **`find`** / **`create`**: the two handle types.
//! - **`host`**: the [`DataAccess`](host::DataAccess) trait the handles talk
//!   to, implemented by the simulator ([`XplmHost`](host::XplmHost)), an
//!   in-memory registry for tests ([`MockHost`](host::MockHost), feature
//!   `mock`) and a thread-checking wrapper ([`GuardedHost`](host::GuardedHost)).
//! - **`error`**: [`DatarefError`] and [`trap`].
//! - **`config`**: Figment-based configuration.
//! - **`logging`**: tracing subscriber setup writing to the simulator log.
//!
//! ## Errors
//!
//! A dataref that does not exist is a normal condition, reported by
//! [`FindDataref::found`]. Misuse (a type mismatch, writing a read-only
//! dataref, an index out of bounds) is a bug in the plugin: the plain methods
//! log it and panic, the `try_*` variants return it as a [`DatarefError`].
//!
//! ## Example
//!
//! ```no_run
//! use datarefw::{CreateDataref, FindDataref};
//!
//! let mut com1: FindDataref<i32> = FindDataref::new("sim/cockpit/radios/com1_freq_hz");
//! if com1.found() && com1.writable() {
//!     com1 += 25;
//! }
//!
//! let mut status: CreateDataref<String> = CreateDataref::new("myplugin/status", false);
//! status.set_str("ready");
//! assert_eq!(&*status.as_str(), "ready");
//! ```

#[allow(unsafe_code)]
mod callbacks;
pub mod config;
#[allow(unsafe_code)]
pub mod create;
pub mod error;
pub mod find;
#[allow(unsafe_code)]
pub mod host;
pub mod kind;
pub mod logging;
pub mod marshal;

pub use create::CreateDataref;
pub use error::{trap, DatarefError, Result};
pub use find::FindDataref;
pub use host::{DataAccess, GuardedHost, HostTypes, RawDataref, XplmHost};
#[cfg(feature = "mock")]
pub use host::MockHost;
pub use kind::{classify, ArrayElement, DatarefValue, ScalarValue, ValueKind};
