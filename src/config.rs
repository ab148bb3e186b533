//! Static configuration for the Ulanzi D200 driver.
//!
//! Mirrors `productiondeck`'s `config.rs` in spirit (one module of named
//! constants instead of scattering magic numbers through the codebase), but
//! the values describe a fixed host-side USB-HID endpoint rather than RP2040
//! GPIO pins.

use std::path::PathBuf;

/// Name used for the settings/icons directory under `$HOME/.config` and for
/// the autostart `.desktop` entry.
pub const APP_NAME: &str = "d200ctl";

// ===================================================================
// USB HID identity (Ulanzi D200)
// ===================================================================

pub const VENDOR_ID: u16 = 0x2207;
pub const PRODUCT_ID: u16 = 0x0019;
pub const HID_INTERFACE_NUMBER: i32 = 0;

// ===================================================================
// Button grid
// ===================================================================

/// Number of addressable buttons on the grid (index 13, the aux button,
/// is not one of these — it never appears in a layout's button list).
pub const BUTTON_COUNT: usize = 13;
pub const BUTTON_ROWS: usize = 3;
pub const BUTTON_COLS: usize = 5;

/// Physical aux button index, reserved for small-window mode cycling.
pub const AUX_BUTTON_INDEX: u8 = 13;

// ===================================================================
// Wire framing
// ===================================================================

pub const RECORD_SIZE: usize = 1024;
pub const FRAME_HEADER_SIZE: usize = 8;
pub const FRAME_PAYLOAD_CAPACITY: usize = RECORD_SIZE - FRAME_HEADER_SIZE;

// ===================================================================
// Task cadences
// ===================================================================

pub const PROBE_POLL_INTERVAL_MS: u64 = 2_000;
pub const TELEMETRY_PUSH_INTERVAL_MS: u64 = 500;
pub const RECONNECT_BACKOFF_MS: u64 = 3_000;
pub const BUNDLE_RETRY_SLEEP_MS: u64 = 50;

/// How long a single reader-loop poll blocks for an inbound report before
/// giving writers a turn at the transport lock. Bounded so the writer mutex
/// (brightness/label-style/small-window/button pushes) is never starved
/// behind a parked read on an idle device.
pub const READ_POLL_TIMEOUT_MS: i32 = 100;

/// Bundle builder's forbidden-byte retry counter starting value. The
/// original source seeds this at `04` (decimal); kept as-is per spec.md's
/// Open Questions — the leading zero carries no semantic meaning.
pub const BUNDLE_INITIAL_DUMMY_RETRIES: u32 = 4;

// ===================================================================
// Filesystem locations
// ===================================================================

pub fn home_dir() -> PathBuf {
    dirs::home_dir().expect("no home directory for current user")
}

pub fn settings_path() -> PathBuf {
    home_dir().join(".config").join(APP_NAME).join("settings.json")
}

pub fn icons_dir() -> PathBuf {
    home_dir().join(".config").join(APP_NAME).join("icons")
}

pub fn build_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME).join(".build")
}

pub fn autostart_desktop_file() -> PathBuf {
    home_dir().join(".config").join("autostart").join(format!("{APP_NAME}.desktop"))
}
