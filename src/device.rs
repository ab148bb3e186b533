//! Device controller: owns the transport, the device's last-known state for
//! dedup-unless-forced setters, and the two outbound event channels
//! (`key_pressed`, `refresh`) the supervisor consumes.
//!
//! All outbound writes funnel through a single `tokio::sync::Mutex` guarding
//! the [`Transport`] — one writer at a time, matching the single-goroutine
//! ownership of the device handle in the original.

use crate::bundle;
use crate::config::{self, READ_POLL_TIMEOUT_MS, RECONNECT_BACKOFF_MS, RECORD_SIZE};
use crate::error::TransportError;
use crate::protocol::{self, Command};
use crate::transport::Transport;
use crate::types::{Button, KeyEvent, LabelStyle, SmallWindowData, SmallWindowMode};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, error, instrument, warn};

struct DeviceState {
    brightness: Option<i64>,
    label_style: Option<LabelStyle>,
    small_window_data: Option<SmallWindowData>,
    small_window_mode: SmallWindowMode,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            brightness: None,
            label_style: None,
            small_window_data: None,
            small_window_mode: SmallWindowMode::default(),
        }
    }
}

/// Handle to the running device. Cheaply cloneable; every clone shares the
/// same transport, state, and channels.
#[derive(Clone)]
pub struct DeviceController {
    transport: Arc<AsyncMutex<Transport>>,
    state: Arc<StdMutex<DeviceState>>,
    key_pressed_tx: mpsc::Sender<KeyEvent>,
    refresh_tx: mpsc::Sender<()>,
    icons_dir: PathBuf,
    stopped: Arc<AtomicBool>,
}

/// The receiving ends of the controller's two event channels, handed out
/// once by [`DeviceController::new`].
pub struct DeviceEvents {
    pub key_pressed: mpsc::Receiver<KeyEvent>,
    pub refresh: mpsc::Receiver<()>,
}

impl DeviceController {
    pub fn new(icons_dir: PathBuf) -> Result<(Self, DeviceEvents), TransportError> {
        let transport = Transport::new()?;
        let (key_pressed_tx, key_pressed_rx) = mpsc::channel(1);
        let (refresh_tx, refresh_rx) = mpsc::channel(1);

        let controller = Self {
            transport: Arc::new(AsyncMutex::new(transport)),
            state: Arc::new(StdMutex::new(DeviceState::default())),
            key_pressed_tx,
            refresh_tx,
            icons_dir,
            stopped: Arc::new(AtomicBool::new(false)),
        };

        Ok((controller, DeviceEvents { key_pressed: key_pressed_rx, refresh: refresh_rx }))
    }

    /// Current aux-button small-window mode, as set by the last cycle.
    pub fn small_window_mode(&self) -> SmallWindowMode {
        self.state.lock().unwrap().small_window_mode
    }

    /// Whether the transport currently holds an open device handle. Used by
    /// the telemetry task to skip pushes while disconnected (spec.md §4.4
    /// item 2: "every 500 ms, if connected, ..."), matching the original's
    /// guard in `Start`. A momentary lock contention with the reader task is
    /// read as "not connected yet" rather than blocking this check.
    pub fn is_connected(&self) -> bool {
        self.transport.try_lock().map(|guard| guard.is_connected()).unwrap_or(false)
    }

    pub fn cycle_small_window_mode(&self) {
        let mut state = self.state.lock().unwrap();
        state.small_window_mode = state.small_window_mode.next();
    }

    pub async fn set_brightness(&self, value: i64, force: bool) {
        {
            let mut state = self.state.lock().unwrap();
            if !force && state.brightness == Some(value) {
                return;
            }
            state.brightness = Some(value);
        }
        let payload = value.to_string().into_bytes();
        let frame = protocol::build_frame(Command::SetBrightness, &payload);
        self.write_record(frame).await;
    }

    pub async fn set_label_style(&self, style: LabelStyle, force: bool) {
        {
            let mut state = self.state.lock().unwrap();
            if !force && state.label_style.as_ref() == Some(&style) {
                return;
            }
            state.label_style = Some(style.clone());
        }
        let payload = serde_json::to_vec(&style.to_wire_json()).unwrap_or_default();
        let frame = protocol::build_frame(Command::SetLabelStyle, &payload);
        self.write_record(frame).await;
    }

    /// `mode` is always overwritten with the controller's current
    /// small-window mode before comparison, matching the original.
    pub async fn set_small_window_data(&self, mut data: SmallWindowData, force: bool) {
        data.mode = self.small_window_mode();
        {
            let mut state = self.state.lock().unwrap();
            if !force && state.small_window_data.as_ref() == Some(&data) {
                return;
            }
            state.small_window_data = Some(data.clone());
        }
        let payload = data.to_wire_string().into_bytes();
        let frame = protocol::build_frame(Command::SetSmallWindowData, &payload);
        self.write_record(frame).await;
    }

    /// Render and transmit a button page. `update_only` selects
    /// `PARTIALLY_UPDATE_BUTTONS` over `SET_BUTTONS`.
    pub async fn set_buttons(&self, buttons: BTreeMap<usize, Button>, update_only: bool) -> Result<(), crate::error::BundleError> {
        let icons_dir = self.icons_dir.clone();
        let archive_path = tokio::task::spawn_blocking(move || bundle::prepare_bundle(&buttons, &icons_dir))
            .await
            .expect("bundle builder task panicked")?;

        let data = tokio::fs::read(&archive_path).await?;
        let command = if update_only { Command::PartiallyUpdateButtons } else { Command::SetButtons };
        let records = protocol::chunk_payload(command, &data);
        self.write_records(records).await;
        Ok(())
    }

    async fn write_record(&self, record: [u8; RECORD_SIZE]) {
        self.write_records(vec![record]).await;
    }

    /// Write a sequence of records as one atomic operation under the
    /// transport lock, so a `set_buttons` chunk sequence can't interleave
    /// with a concurrent telemetry push.
    async fn write_records(&self, records: Vec<[u8; RECORD_SIZE]>) {
        let transport = self.transport.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = transport.blocking_lock();
            for record in &records {
                guard.write(record)?;
            }
            Ok::<_, TransportError>(())
        })
        .await
        .expect("write task panicked");

        if let Err(err) = result {
            warn!(error = %err, "failed writing to device, will reconnect on next read cycle");
        }
    }

    pub fn key_pressed_sender(&self) -> mpsc::Sender<KeyEvent> {
        self.key_pressed_tx.clone()
    }

    pub fn refresh_sender(&self) -> mpsc::Sender<()> {
        self.refresh_tx.clone()
    }

    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Spawn the background reader task: owns reconnection, parses inbound
    /// records, publishes `refresh` on `IN_DEVICE_INFO` (and re-asserts full
    /// brightness), publishes `key_pressed` on button release, and cycles
    /// the small-window mode locally on aux-button press.
    pub fn spawn_reader(&self) -> tokio::task::JoinHandle<()> {
        let controller = self.clone();
        tokio::task::spawn_blocking(move || controller.reader_loop())
    }

    #[instrument(skip(self), name = "device_reader")]
    fn reader_loop(&self) {
        {
            let mut guard = self.transport.blocking_lock();
            if let Err(err) = guard.reconnect() {
                warn!(error = %err, "initial HID connect failed, will retry");
            }
        }

        let mut buf = [0u8; RECORD_SIZE];
        while !self.is_stopped() {
            // Hold the transport lock only for one bounded poll, not for the
            // full blocking wait for the next report: the D200 is otherwise
            // silent between button presses / device-info announcements, and
            // a writer (telemetry push, cold-start SET_BUTTONS, the forced
            // brightness after IN_DEVICE_INFO) would starve behind an
            // unbounded read on an idle device.
            let read_result = {
                let guard = self.transport.blocking_lock();
                if !guard.is_connected() {
                    None
                } else {
                    Some(guard.read_timeout(&mut buf, READ_POLL_TIMEOUT_MS))
                }
            };

            let n = match read_result {
                None => {
                    std::thread::sleep(std::time::Duration::from_millis(RECONNECT_BACKOFF_MS));
                    self.reconnect_blocking();
                    continue;
                }
                Some(Ok(0)) => continue,
                Some(Ok(n)) => n,
                Some(Err(err)) => {
                    warn!(error = %err, "HID read failed, reconnecting");
                    self.reconnect_blocking();
                    continue;
                }
            };

            if let Err(err) = self.handle_inbound(&buf[..n]) {
                debug!(error = %err, "dropping unparseable inbound record");
            }
        }
    }

    fn reconnect_blocking(&self) {
        let mut guard = self.transport.blocking_lock();
        if let Err(err) = guard.reconnect() {
            error!(error = %err, "reconnect attempt failed");
        }
    }

    fn handle_inbound(&self, raw: &[u8]) -> Result<(), crate::error::ProtocolError> {
        let frame = protocol::parse_frame(raw)?;
        match frame.command {
            Command::InDeviceInfo => {
                let _ = protocol::decode_device_info(frame.payload)?;
                // Rendezvous send: block until the supervisor is ready to consume
                // this refresh rather than dropping it, so a refresh is never lost
                // behind a slow consumer (spec.md §9, refresh lossy-vs-guaranteed
                // open question — resolved to guaranteed delivery).
                let _ = self.refresh_tx.blocking_send(());
                let controller = self.clone();
                tokio::spawn(async move { controller.set_brightness(100, true).await });
            }
            Command::InButton => {
                let event = protocol::decode_button_payload(frame.payload)?;
                let pressed = protocol::button_payload_pressed(frame.payload);
                if pressed && event.index == config::AUX_BUTTON_INDEX {
                    self.cycle_small_window_mode();
                } else if !pressed && event.index != config::AUX_BUTTON_INDEX {
                    let _ = self.key_pressed_tx.blocking_send(event);
                }
            }
            _ => {}
        }
        Ok(())
    }
}
