//! d200ctl - host-side driver and control daemon for the Ulanzi D200
//! USB-HID macro pad.
//!
//! ## Architecture
//! - **Foreground-app probe**: polls the active window, publishes process
//!   changes (`probe::app`).
//! - **Telemetry push**: samples CPU/mem/GPU every 500ms and renders the
//!   small-window display (`probe::metrics`, driven from `device`).
//! - **HID reader**: owns the device handle, reconnects on I/O failure,
//!   decodes inbound button/device-info records (`device`, `transport`).
//! - **Supervisor**: merges the three event streams into one pin/current
//!   layout state machine and dispatches button commands (`supervisor`).

pub mod autostart;
pub mod bundle;
pub mod config;
pub mod device;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod settings;
pub mod supervisor;
pub mod transport;
pub mod types;
