//! Shared data types for the Ulanzi D200 driver.
//!
//! Mirrors `productiondeck`'s `types.rs` — one module collecting the plain
//! data shared across components — but the shapes themselves follow
//! spec.md §3 rather than a StreamDeck button-state bitmap.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single button's configured appearance and action, as read from the
/// settings document (spec.md §6: `{"name", "icon", "command"}`, all
/// optional).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Button {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// A named button layout assigned to one process name (or the reserved
/// `"default"` key).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Application {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

impl Application {
    /// The button assigned to `index`, if the layout has one that far.
    pub fn button_at(&self, index: usize) -> Option<&Button> {
        self.buttons.get(index)
    }
}

/// The full settings document: process name -> layout, plus the reserved
/// `"default"` fallback.
pub type SettingsDocument = HashMap<String, Application>;

pub const DEFAULT_LAYOUT_KEY: &str = "default";

/// Single button press/release event, as delivered to the supervisor.
/// `state` is retained from the wire format but unused in dispatch (see
/// spec.md §9 Open Questions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub index: u8,
    pub state: u8,
}

/// Auxiliary small-window display mode. Numeric values match the wire
/// protocol and the original source's enum ordering exactly (STATS=0,
/// CLOCK=1, BACKGROUND=2) — callers should reach for [`SmallWindowMode::next`]
/// rather than reconstructing the cycle arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SmallWindowMode {
    Stats = 0,
    Clock = 1,
    Background = 2,
}

impl SmallWindowMode {
    /// Aux-button (index 13) cycle: CLOCK -> STATS -> BACKGROUND -> CLOCK.
    /// Expressed as an explicit table per spec.md §9 (REDESIGN FLAGS),
    /// replacing the original's `(mode + 2) mod 3`.
    pub fn next(self) -> Self {
        match self {
            SmallWindowMode::Clock => SmallWindowMode::Stats,
            SmallWindowMode::Stats => SmallWindowMode::Background,
            SmallWindowMode::Background => SmallWindowMode::Clock,
        }
    }

    /// Numeric value as it appears in the pipe-delimited wire payload.
    pub fn wire_value(self) -> u8 {
        self as u8
    }
}

impl Default for SmallWindowMode {
    fn default() -> Self {
        SmallWindowMode::Clock
    }
}

/// Label alignment, color, and typography applied to every button's text.
/// Wire-serialized with `color` converted from its stored hex string to a
/// signed integer (see [`LabelStyle::to_wire_json`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelStyle {
    pub align: String,
    pub color: String,
    pub font_name: String,
    pub show_title: bool,
    pub size: i32,
    pub weight: i32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            align: "bottom".to_string(),
            color: "FFFFFF".to_string(),
            font_name: "Roboto".to_string(),
            show_title: true,
            size: 10,
            weight: 80,
        }
    }
}

impl LabelStyle {
    /// Render to the exact JSON shape the device firmware expects: field
    /// names capitalized to match the original Go struct tags, `color`
    /// replaced by its parsed integer form.
    pub fn to_wire_json(&self) -> serde_json::Value {
        serde_json::json!({
            "Align": self.align,
            "Color": hex_to_i64(&self.color),
            "FontName": self.font_name,
            "ShowTitle": self.show_title,
            "Size": self.size,
            "Weight": self.weight,
        })
    }
}

fn hex_to_i64(hex: &str) -> i64 {
    i64::from_str_radix(hex, 16).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_window_mode_cycles_clock_stats_background_clock() {
        assert_eq!(SmallWindowMode::Clock.next(), SmallWindowMode::Stats);
        assert_eq!(SmallWindowMode::Stats.next(), SmallWindowMode::Background);
        assert_eq!(SmallWindowMode::Background.next(), SmallWindowMode::Clock);
    }

    #[test]
    fn small_window_mode_defaults_to_clock() {
        assert_eq!(SmallWindowMode::default(), SmallWindowMode::Clock);
    }

    #[test]
    fn label_style_defaults_match_spec() {
        let style = LabelStyle::default();
        assert_eq!(style.align, "bottom");
        assert_eq!(style.color, "FFFFFF");
        assert_eq!(style.font_name, "Roboto");
        assert!(style.show_title);
        assert_eq!(style.size, 10);
        assert_eq!(style.weight, 80);
    }

    #[test]
    fn label_style_wire_json_replaces_color_with_parsed_integer() {
        let style = LabelStyle::default();
        let wire = style.to_wire_json();
        assert_eq!(wire["Color"], 0xFFFFFF);
        assert_eq!(wire["Align"], "bottom");
        assert_eq!(wire["ShowTitle"], true);
    }

    #[test]
    fn small_window_data_wire_string_orders_time_before_gpu() {
        let data = SmallWindowData {
            mode: SmallWindowMode::Stats,
            cpu: 42,
            mem: 55,
            gpu: 9,
            time: "13:05:00".to_string(),
        };
        assert_eq!(data.to_wire_string(), "0|42|55|13:05:00|9");
    }

    #[test]
    fn application_button_at_is_none_past_the_end() {
        let app = Application { name: "x".into(), buttons: vec![Button::default()] };
        assert!(app.button_at(0).is_some());
        assert!(app.button_at(1).is_none());
    }
}

/// Small-window payload (clock / CPU+MEM+GPU stats / background). `mode` is
/// always overwritten by the controller's current mode before comparison
/// and transmission (spec.md §4.4).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmallWindowData {
    pub mode: SmallWindowMode,
    pub cpu: i64,
    pub mem: i64,
    pub gpu: i64,
    pub time: String,
}

impl SmallWindowData {
    /// Pipe-delimited wire payload. Field order is mode, cpu, mem, time,
    /// gpu — note that `time` precedes `gpu`, matching the original.
    pub fn to_wire_string(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.mode.wire_value(),
            self.cpu,
            self.mem,
            self.time,
            self.gpu
        )
    }
}
