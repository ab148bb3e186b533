//! `focus_or_run`: bring a running instance of a program to the front, or
//! launch it if none is running. Backed by `pgrep`/`wmctrl`/`xdotool`.

use crate::error::ProbeError;
use std::process::{Command, Stdio};

/// Focus the next window belonging to `program` (cycling through matches
/// each call), or launch `program` with `args` if it has none.
pub fn focus_or_run(program: &str, args: &[&str]) -> Result<(), ProbeError> {
    let pids = pids_for(program)?;
    let window_ids = windows_for_pids(&pids)?;

    if window_ids.is_empty() {
        return start_program(program, args);
    }

    let active = active_window()?;
    let target = match active.and_then(|active| window_ids.iter().position(|w| w.eq_ignore_ascii_case(&active))) {
        Some(idx) => &window_ids[(idx + 1) % window_ids.len()],
        None => &window_ids[0],
    };

    activate_window(target)
}

fn pids_for(program: &str) -> Result<Vec<String>, ProbeError> {
    let output = Command::new("pgrep")
        .args(["-x", program])
        .output()
        .map_err(|err| ProbeError::External(format!("pgrep: {err}")))?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn windows_for_pids(pids: &[String]) -> Result<Vec<String>, ProbeError> {
    if pids.is_empty() {
        return Ok(Vec::new());
    }

    let output = Command::new("wmctrl")
        .arg("-lp")
        .output()
        .map_err(|err| ProbeError::External(format!("wmctrl: {err}")))?;

    let mut windows = Vec::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        if pids.iter().any(|pid| pid == fields[2]) {
            windows.push(fields[0].to_string());
        }
    }
    Ok(windows)
}

fn active_window() -> Result<Option<String>, ProbeError> {
    let output = Command::new("xdotool")
        .arg("getactivewindow")
        .output()
        .map_err(|err| ProbeError::External(format!("xdotool: {err}")))?;
    if !output.status.success() {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<u64>() {
        Ok(id) => Ok(Some(format!("0x{id:x}"))),
        Err(_) if text.starts_with("0x") || text.starts_with("0X") => Ok(Some(text.to_lowercase())),
        Err(_) => Ok(None),
    }
}

fn activate_window(window_id: &str) -> Result<(), ProbeError> {
    let wmctrl_ok = Command::new("wmctrl")
        .args(["-ia", window_id])
        .status()
        .map(|status| status.success())
        .unwrap_or(false);
    if wmctrl_ok {
        return Ok(());
    }

    Command::new("xdotool")
        .args(["windowactivate", window_id])
        .status()
        .map_err(|err| ProbeError::External(format!("xdotool windowactivate: {err}")))
        .and_then(|status| {
            if status.success() {
                Ok(())
            } else {
                Err(ProbeError::External(format!("could not activate window {window_id}")))
            }
        })
}

fn start_program(program: &str, args: &[&str]) -> Result<(), ProbeError> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|err| ProbeError::External(format!("{program}: {err}")))
}
