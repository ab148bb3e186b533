//! HID transport: device discovery, connection, and blocking read/write
//! wrapped for use from async tasks.
//!
//! `hidapi` calls are blocking; every call into this module from
//! [`crate::device`] goes through `tokio::task::spawn_blocking`, matching
//! how the original's single reader goroutine owned the blocking syscalls.

use crate::config::{HID_INTERFACE_NUMBER, PRODUCT_ID, RECORD_SIZE, VENDOR_ID};
use crate::error::TransportError;
use hidapi::{HidApi, HidDevice};
use tracing::{info, warn};

/// An open connection to the pad, or the absence of one. Transport state is
/// owned by [`crate::device::DeviceController`] behind its write mutex; this
/// type itself does no locking.
pub struct Transport {
    api: HidApi,
    device: Option<HidDevice>,
}

impl Transport {
    pub fn new() -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        Ok(Self { api, device: None })
    }

    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }

    /// Close any open handle, then enumerate HID devices (sorted by OS path,
    /// matching the original's bubble-sort-by-path) and open the first one
    /// matching vendor id, product id, and interface number.
    pub fn reconnect(&mut self) -> Result<(), TransportError> {
        if self.device.take().is_some() {
            info!("closed stale HID handle before reconnecting");
        }

        self.api.refresh_devices()?;

        let mut candidates: Vec<_> = self
            .api
            .device_list()
            .filter(|info| {
                info.vendor_id() == VENDOR_ID
                    && info.product_id() == PRODUCT_ID
                    && info.interface_number() == HID_INTERFACE_NUMBER
            })
            .collect();
        candidates.sort_by_key(|info| info.path().to_owned());

        for info in candidates {
            match info.open_device(&self.api) {
                Ok(device) => {
                    info!(path = ?info.path(), "opened Ulanzi D200 HID device");
                    self.device = Some(device);
                    return Ok(());
                }
                Err(err) => {
                    warn!(path = ?info.path(), error = %err, "failed to open candidate HID device");
                }
            }
        }

        Err(TransportError::NotFound {
            vid: VENDOR_ID,
            pid: PRODUCT_ID,
            interface: HID_INTERFACE_NUMBER,
        })
    }

    pub fn write(&self, record: &[u8]) -> Result<(), TransportError> {
        let device = self.device.as_ref().ok_or(TransportError::Disconnected)?;
        device.write(record)?;
        Ok(())
    }

    /// Read one record, blocking for at most `timeout_ms`. Returns `Ok(0)`
    /// on a plain timeout (no report arrived) so callers can release the
    /// transport lock and give writers a turn instead of parking on the
    /// device indefinitely; returns the number of bytes read otherwise,
    /// which callers must check against the protocol's minimum header size
    /// before parsing.
    pub fn read_timeout(&self, buf: &mut [u8; RECORD_SIZE], timeout_ms: i32) -> Result<usize, TransportError> {
        let device = self.device.as_ref().ok_or(TransportError::Disconnected)?;
        let n = device.read_timeout(buf, timeout_ms)?;
        if n == 0 {
            return Ok(0);
        }
        if n < 8 {
            return Err(TransportError::ShortRead(n));
        }
        Ok(n)
    }
}
