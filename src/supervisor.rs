//! Event-loop supervisor: merges the foreground-app, refresh, and
//! key-pressed streams into one pin/current layout state machine and
//! dispatches button commands.
//!
//! Mirrors `cmd/controller/main.go`'s two goroutines, collapsed into a
//! single `tokio::select!` loop. One divergence from the original is
//! deliberate: the foreground probe here publishes a process name exactly
//! once per change (see [`crate::probe::app`]), so this loop never has to
//! cope with the original's duplicate-publish race.

use crate::device::DeviceController;
use crate::probe::focus;
use crate::settings::SettingsStore;
use crate::types::{Application, Button, KeyEvent};
use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

pub struct Supervisor {
    device: DeviceController,
    settings: SettingsStore,
    app_changed: mpsc::Receiver<String>,
    refresh: mpsc::Receiver<()>,
    key_pressed: mpsc::Receiver<KeyEvent>,
    current_process: String,
    current_layout: Option<Application>,
    pinned_layout: Option<Application>,
    pinned: bool,
}

impl Supervisor {
    pub fn new(
        device: DeviceController,
        settings: SettingsStore,
        app_changed: mpsc::Receiver<String>,
        refresh: mpsc::Receiver<()>,
        key_pressed: mpsc::Receiver<KeyEvent>,
    ) -> Self {
        Self {
            device,
            settings,
            app_changed,
            refresh,
            key_pressed,
            current_process: String::new(),
            current_layout: None,
            pinned_layout: None,
            pinned: false,
        }
    }

    #[instrument(skip(self), name = "supervisor")]
    pub async fn run(mut self) {
        info!("supervisor event loop started");
        loop {
            tokio::select! {
                Some(process) = self.app_changed.recv() => {
                    self.current_process = process;
                    self.reload_current_layout();
                    if !self.pinned {
                        self.apply_current().await;
                    }
                }
                Some(()) = self.refresh.recv() => {
                    if self.pinned {
                        self.apply_pinned().await;
                    } else {
                        self.apply_current().await;
                    }
                }
                Some(event) = self.key_pressed.recv() => {
                    self.handle_key_pressed(event).await;
                }
                else => break,
            }
        }
        warn!("supervisor event loop exited: all event channels closed");
    }

    fn reload_current_layout(&mut self) {
        if let Err(err) = self.settings.reload_if_changed() {
            warn!(error = %err, "failed to reload settings document");
        }
        self.current_layout = self.settings.layout_for_process(&self.current_process).cloned();
    }

    async fn apply_current(&self) {
        if let Some(layout) = &self.current_layout {
            self.apply_layout(layout).await;
        }
    }

    async fn apply_pinned(&self) {
        if let Some(layout) = &self.pinned_layout {
            self.apply_layout(layout).await;
        }
    }

    /// Push a layout's buttons to the device. Only icon paths are sent —
    /// names and commands stay local, matching the original's `setSettings`.
    async fn apply_layout(&self, layout: &Application) {
        let buttons: BTreeMap<usize, Button> = layout
            .buttons
            .iter()
            .enumerate()
            .map(|(index, button)| {
                (
                    index,
                    Button { name: None, icon: button.icon.clone(), command: None },
                )
            })
            .collect();

        if let Err(err) = self.device.set_buttons(buttons, false).await {
            warn!(error = %err, "failed to push button layout");
        }
    }

    async fn handle_key_pressed(&mut self, event: KeyEvent) {
        let active_layout = if self.pinned { &self.pinned_layout } else { &self.current_layout };
        let command = active_layout
            .as_ref()
            .and_then(|layout| layout.button_at(event.index as usize))
            .and_then(|button| button.command.clone());

        let Some(command) = command else { return };
        let Some(dispatch) = classify_command(&command) else { return };

        match dispatch {
            Dispatch::ClearPin => {
                self.pinned = false;
                self.pinned_layout = None;
                self.apply_current().await;
            }
            Dispatch::Pin(target) => {
                self.pinned = true;
                self.pinned_layout = self.settings.layout_for_process(&target).cloned();
                self.apply_pinned().await;
            }
            Dispatch::Focus(program) => {
                tokio::task::spawn_blocking(move || {
                    if let Err(err) = focus::focus_or_run(&program, &[]) {
                        warn!(error = %err, program, "focus_or_run failed");
                    }
                });
            }
            Dispatch::Shell(command) => {
                if let Err(err) = Command::new("sh")
                    .args(["-c", &command])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                {
                    warn!(error = %err, command, "failed to spawn button command");
                }
            }
        }
    }
}

/// What a button's `command` string resolves to, independent of supervisor
/// state — split out so the `@`/`$`/bare-shell parsing rules (spec.md §4.7)
/// can be unit tested without a live device or settings store.
#[derive(Debug, PartialEq, Eq)]
enum Dispatch {
    /// `@` with an empty (post-trim) target: clear the pin, push `current`.
    ClearPin,
    /// `@name`: pin to `name`'s layout and push it.
    Pin(String),
    /// `$program`: focus-or-run `program`.
    Focus(String),
    /// No prefix: run as a shell command line.
    Shell(String),
}

fn classify_command(command: &str) -> Option<Dispatch> {
    if command.is_empty() {
        return None;
    }
    if let Some(target) = command.strip_prefix('@') {
        let target = target.trim();
        return Some(if target.is_empty() { Dispatch::ClearPin } else { Dispatch::Pin(target.to_string()) });
    }
    if let Some(program) = command.strip_prefix('$') {
        return Some(Dispatch::Focus(program.trim().to_string()));
    }
    Some(Dispatch::Shell(command.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_dispatches_to_nothing() {
        assert_eq!(classify_command(""), None);
    }

    #[test]
    fn at_prefix_with_name_pins_to_that_layout() {
        assert_eq!(classify_command("@vim"), Some(Dispatch::Pin("vim".to_string())));
    }

    #[test]
    fn at_prefix_alone_clears_the_pin() {
        assert_eq!(classify_command("@"), Some(Dispatch::ClearPin));
        assert_eq!(classify_command("@   "), Some(Dispatch::ClearPin));
    }

    #[test]
    fn dollar_prefix_dispatches_to_focus_or_run() {
        assert_eq!(classify_command("$firefox"), Some(Dispatch::Focus("firefox".to_string())));
    }

    #[test]
    fn bare_command_dispatches_to_shell() {
        assert_eq!(classify_command("amixer set Master toggle"), Some(Dispatch::Shell("amixer set Master toggle".to_string())));
    }
}
