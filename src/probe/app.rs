//! Foreground-window process probe: polls the active window every
//! [`PROBE_POLL_INTERVAL_MS`], resolves it to a process name via
//! `xdotool`/`xprop`/`ps`, and publishes the matching layout when it
//! changes.

use crate::config::PROBE_POLL_INTERVAL_MS;
use crate::error::ProbeError;
use std::process::Command;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info_span, warn, Instrument};

/// Spawn the polling loop and return the receiving end of its
/// `app_changed` channel: one process name per detected foreground change.
/// Settings lookup is the supervisor's job, not the probe's.
pub fn spawn() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(
        async move {
            let mut last_process = String::new();
            let mut last_window_id = String::new();

            loop {
                match active_window_process(&last_window_id) {
                    Ok(Some((process, window_id))) => {
                        last_window_id = window_id;
                        if process != last_process {
                            last_process = process.clone();
                            let _ = tx.send(process).await;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => debug!(error = %err, "foreground probe failed this cycle"),
                }

                tokio::time::sleep(Duration::from_millis(PROBE_POLL_INTERVAL_MS)).await;
            }
        }
        .instrument(info_span!("foreground_probe")),
    );

    rx
}

/// Resolve the active window to `(process_name, window_id)`. Returns `Ok(None)`
/// when the active window is unchanged from `prev_window_id`.
fn active_window_process(prev_window_id: &str) -> Result<Option<(String, String)>, ProbeError> {
    let window_id = run_capture("xdotool", &["getactivewindow"])?;
    let window_id = window_id.trim().to_string();
    if window_id.is_empty() || window_id == prev_window_id {
        return Ok(None);
    }

    let xprop_out = run_capture("xprop", &["-id", &window_id, "_NET_WM_PID"])?;
    let pid = xprop_out
        .split('=')
        .nth(1)
        .map(str::trim)
        .ok_or_else(|| ProbeError::External(format!("unexpected xprop output: {xprop_out}")))?;

    let process_name = run_capture("ps", &["-p", pid, "-o", "comm="])?.trim().to_string();
    if process_name.is_empty() {
        return Ok(None);
    }

    Ok(Some((process_name, window_id)))
}

fn run_capture(program: &str, args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| ProbeError::External(format!("{program}: {err}")))?;
    if !output.status.success() {
        warn!(program, "probe helper exited non-zero");
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
