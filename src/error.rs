//! Error taxonomy for the driver, per component.
//!
//! All inter-component errors stay local (spec.md §7: "no error crosses a
//! channel boundary"); these types exist so each component can log with
//! context and the supervisor can decide whether to retry, skip, or ignore.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame too short ({0} bytes, need at least 8)")]
    ShortFrame(usize),
    #[error("frame magic mismatch")]
    MalformedFrame,
    #[error("declared payload length {declared} exceeds received buffer of {available} bytes")]
    TruncatedPayload { declared: usize, available: usize },
    #[error("unknown command id 0x{0:04x}")]
    UnknownCommand(u16),
    #[error("malformed IN_BUTTON payload")]
    InvalidButtonPayload,
    #[error("IN_DEVICE_INFO payload is not valid JSON: {0}")]
    InvalidDeviceInfoJson(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no matching HID device found (vid=0x{vid:04x} pid=0x{pid:04x} interface={interface})")]
    NotFound { vid: u16, pid: u16, interface: i32 },
    #[error("HID I/O error: {0}")]
    Hid(#[from] hidapi::HidError),
    #[error("short read: got {0} bytes, need at least 8")]
    ShortRead(usize),
    #[error("device not connected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("I/O error building bundle: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error building bundle: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("external probe failed: {0}")]
    External(String),
}
