//! Build script for xplm-sys FFI bindings.
//!
//! This script generates Rust FFI bindings from the X-Plane SDK C headers
//! using bindgen. It supports two modes:
//!
//! 1. With `xplm-sdk` feature: Generates bindings from the SDK headers
//! 2. Without feature: Uses pre-generated bindings so the crate builds anywhere

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=wrapper.h");
    println!("cargo:rerun-if-env-changed=XPLM_SDK_DIR");

    #[cfg(feature = "xplm-sdk")]
    {
        let sdk_dir = sdk_dir();
        generate_bindings(&sdk_dir);
        link_xplm(&sdk_dir);
    }

    #[cfg(not(feature = "xplm-sdk"))]
    generate_dummy_bindings();
}

/// Locate the unpacked SDK (the directory holding `CHeaders/` and `Libraries/`).
#[cfg(feature = "xplm-sdk")]
fn sdk_dir() -> PathBuf {
    if let Ok(dir) = env::var("XPLM_SDK_DIR") {
        return PathBuf::from(dir);
    }

    for path in ["SDK", "../SDK", "/opt/xplane-sdk", "/usr/local/share/xplane-sdk"] {
        if std::path::Path::new(path).join("CHeaders/XPLM").exists() {
            return PathBuf::from(path);
        }
    }

    panic!("X-Plane SDK not found: set XPLM_SDK_DIR to the unpacked SDK directory");
}

#[cfg(feature = "xplm-sdk")]
fn generate_bindings(sdk_dir: &std::path::Path) {
    let include_dir = sdk_dir.join("CHeaders/XPLM");
    println!("cargo:rerun-if-changed={}", include_dir.display());

    // The SDK headers select their platform from one of these macros.
    let platform = match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("windows") => "-DIBM=1",
        Ok("macos") => "-DAPL=1",
        _ => "-DLIN=1",
    };

    let bindings = bindgen::Builder::default()
        .header("wrapper.h")
        .clang_arg(format!("-I{}", include_dir.display()))
        .clang_arg(platform)
        .clang_args(["-DXPLM200", "-DXPLM210", "-DXPLM300", "-DXPLM301", "-DXPLM400"])
        // Data access and logging only
        .allowlist_function("XPLMFindDataRef")
        .allowlist_function("XPLMCanWriteDataRef")
        .allowlist_function("XPLMIsDataRefGood")
        .allowlist_function("XPLMGetDataRefTypes")
        .allowlist_function("XPLMGetData.*")
        .allowlist_function("XPLMSetData.*")
        .allowlist_function("XPLMRegisterDataAccessor")
        .allowlist_function("XPLMUnregisterDataAccessor")
        .allowlist_function("XPLMDebugString")
        .allowlist_function("XPLMEnableFeature")
        .allowlist_type("XPLMDataRef")
        .allowlist_type("XPLMDataTypeID")
        .allowlist_type("XPLM(Get|Set)Data.*_f")
        .allowlist_var("xplmType_.*")
        // Keep enum constants at top level (matches dummy bindings)
        .default_enum_style(bindgen::EnumVariation::Consts)
        .derive_debug(true)
        .derive_default(true)
        .derive_copy(true)
        .generate_comments(true)
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .generate()
        .expect("Unable to generate XPLM bindings");

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Couldn't write bindings!");
}

/// Plugins resolve XPLM symbols from the host process. Windows and macOS
/// still need the import library / framework at link time; Linux does not.
#[cfg(feature = "xplm-sdk")]
fn link_xplm(sdk_dir: &std::path::Path) {
    match env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("windows") => {
            println!(
                "cargo:rustc-link-search=native={}",
                sdk_dir.join("Libraries/Win").display()
            );
            println!("cargo:rustc-link-lib=XPLM_64");
        }
        Ok("macos") => {
            println!(
                "cargo:rustc-link-search=framework={}",
                sdk_dir.join("Libraries/Mac").display()
            );
            println!("cargo:rustc-link-lib=framework=XPLM");
        }
        _ => {}
    }
}

/// Generate dummy bindings when the SDK is not available.
/// This allows the crate to compile on systems without the X-Plane SDK.
#[cfg(not(feature = "xplm-sdk"))]
fn generate_dummy_bindings() {
    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    let dummy = r#"
// Dummy bindings - xplm-sdk feature not enabled
//
// These are placeholder types and functions that allow the crate to compile
// without the SDK headers. Enable the `xplm-sdk` feature to generate real
// bindings.

use std::os::raw::{c_char, c_double, c_float, c_int, c_void};

/// Opaque handle to a data reference
pub type XPLMDataRef = *mut c_void;

/// Bitfield of xplmType_* values
pub type XPLMDataTypeID = c_int;

pub const xplmType_Unknown: c_int = 0;
pub const xplmType_Int: c_int = 1;
pub const xplmType_Float: c_int = 2;
pub const xplmType_Double: c_int = 4;
pub const xplmType_FloatArray: c_int = 8;
pub const xplmType_IntArray: c_int = 16;
pub const xplmType_Data: c_int = 32;

// Accessor callback signatures used by XPLMRegisterDataAccessor
pub type XPLMGetDatai_f = Option<unsafe extern "C" fn(inRefcon: *mut c_void) -> c_int>;
pub type XPLMSetDatai_f = Option<unsafe extern "C" fn(inRefcon: *mut c_void, inValue: c_int)>;
pub type XPLMGetDataf_f = Option<unsafe extern "C" fn(inRefcon: *mut c_void) -> c_float>;
pub type XPLMSetDataf_f = Option<unsafe extern "C" fn(inRefcon: *mut c_void, inValue: c_float)>;
pub type XPLMGetDatad_f = Option<unsafe extern "C" fn(inRefcon: *mut c_void) -> c_double>;
pub type XPLMSetDatad_f = Option<unsafe extern "C" fn(inRefcon: *mut c_void, inValue: c_double)>;
pub type XPLMGetDatavi_f = Option<
    unsafe extern "C" fn(inRefcon: *mut c_void, outValues: *mut c_int, inOffset: c_int, inMax: c_int) -> c_int,
>;
pub type XPLMSetDatavi_f = Option<
    unsafe extern "C" fn(inRefcon: *mut c_void, inValues: *mut c_int, inOffset: c_int, inCount: c_int),
>;
pub type XPLMGetDatavf_f = Option<
    unsafe extern "C" fn(inRefcon: *mut c_void, outValues: *mut c_float, inOffset: c_int, inMax: c_int) -> c_int,
>;
pub type XPLMSetDatavf_f = Option<
    unsafe extern "C" fn(inRefcon: *mut c_void, inValues: *mut c_float, inOffset: c_int, inCount: c_int),
>;
pub type XPLMGetDatab_f = Option<
    unsafe extern "C" fn(inRefcon: *mut c_void, outValue: *mut c_void, inOffset: c_int, inMaxLength: c_int) -> c_int,
>;
pub type XPLMSetDatab_f = Option<
    unsafe extern "C" fn(inRefcon: *mut c_void, inValue: *mut c_void, inOffset: c_int, inLength: c_int),
>;

// Panic stub implementations - these allow linking to succeed but will panic at runtime
// if called without the xplm-sdk feature enabled. They use the Rust ABI so the
// panic unwinds into the caller instead of aborting.

const XPLM_SDK_PANIC_MSG: &str = "XPLM function called but xplm-sdk feature is not enabled. \
    Enable the xplm-sdk feature (or xplm-sdk in datarefw) and set XPLM_SDK_DIR.";

pub unsafe fn XPLMFindDataRef(_inDataRefName: *const c_char) -> XPLMDataRef {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMCanWriteDataRef(_inDataRef: XPLMDataRef) -> c_int {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMIsDataRefGood(_inDataRef: XPLMDataRef) -> c_int {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMGetDataRefTypes(_inDataRef: XPLMDataRef) -> XPLMDataTypeID {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMGetDatai(_inDataRef: XPLMDataRef) -> c_int {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMSetDatai(_inDataRef: XPLMDataRef, _inValue: c_int) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMGetDataf(_inDataRef: XPLMDataRef) -> c_float {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMSetDataf(_inDataRef: XPLMDataRef, _inValue: c_float) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMGetDatad(_inDataRef: XPLMDataRef) -> c_double {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMSetDatad(_inDataRef: XPLMDataRef, _inValue: c_double) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMGetDatavi(
    _inDataRef: XPLMDataRef,
    _outValues: *mut c_int,
    _inOffset: c_int,
    _inMax: c_int,
) -> c_int {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMSetDatavi(
    _inDataRef: XPLMDataRef,
    _inValues: *mut c_int,
    _inoffset: c_int,
    _inCount: c_int,
) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMGetDatavf(
    _inDataRef: XPLMDataRef,
    _outValues: *mut c_float,
    _inOffset: c_int,
    _inMax: c_int,
) -> c_int {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMSetDatavf(
    _inDataRef: XPLMDataRef,
    _inValues: *mut c_float,
    _inoffset: c_int,
    _inCount: c_int,
) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMGetDatab(
    _inDataRef: XPLMDataRef,
    _outValue: *mut c_void,
    _inOffset: c_int,
    _inMaxBytes: c_int,
) -> c_int {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMSetDatab(
    _inDataRef: XPLMDataRef,
    _inValue: *mut c_void,
    _inOffset: c_int,
    _inLength: c_int,
) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMRegisterDataAccessor(
    _inDataName: *const c_char,
    _inDataType: XPLMDataTypeID,
    _inIsWritable: c_int,
    _inReadInt: XPLMGetDatai_f,
    _inWriteInt: XPLMSetDatai_f,
    _inReadFloat: XPLMGetDataf_f,
    _inWriteFloat: XPLMSetDataf_f,
    _inReadDouble: XPLMGetDatad_f,
    _inWriteDouble: XPLMSetDatad_f,
    _inReadIntArray: XPLMGetDatavi_f,
    _inWriteIntArray: XPLMSetDatavi_f,
    _inReadFloatArray: XPLMGetDatavf_f,
    _inWriteFloatArray: XPLMSetDatavf_f,
    _inReadData: XPLMGetDatab_f,
    _inWriteData: XPLMSetDatab_f,
    _inReadRefcon: *mut c_void,
    _inWriteRefcon: *mut c_void,
) -> XPLMDataRef {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMUnregisterDataAccessor(_inDataRef: XPLMDataRef) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMDebugString(_inString: *const c_char) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}

pub unsafe fn XPLMEnableFeature(_inFeature: *const c_char, _inEnable: c_int) {
    panic!("{}", XPLM_SDK_PANIC_MSG);
}
"#;

    std::fs::write(out_path.join("bindings.rs"), dummy).expect("Couldn't write dummy bindings!");
}
