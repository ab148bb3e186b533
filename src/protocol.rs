//! HID wire protocol: framing, command ids, and payload (de)serialization.
//!
//! Outbound records are always exactly [`RECORD_SIZE`] bytes (spec.md
//! §4.1). A payload that doesn't fit in one record's 1016-byte budget is
//! split by [`chunk_payload`] into a first header-bearing record followed by
//! raw, headerless 1024-byte chunks — the receiver recovers total length
//! from the first record's length field alone.

use crate::config::{FRAME_HEADER_SIZE, FRAME_PAYLOAD_CAPACITY, RECORD_SIZE};
use crate::error::ProtocolError;
use crate::types::KeyEvent;
use serde::Deserialize;

pub const MAGIC: [u8; 2] = [0x7C, 0x7C];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    SetButtons = 0x0001,
    SetSmallWindowData = 0x0006,
    SetBrightness = 0x000A,
    SetLabelStyle = 0x000B,
    PartiallyUpdateButtons = 0x000D,
    InButton = 0x0101,
    InDeviceInfo = 0x0303,
}

impl Command {
    fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x0001 => Some(Command::SetButtons),
            0x0006 => Some(Command::SetSmallWindowData),
            0x000A => Some(Command::SetBrightness),
            0x000B => Some(Command::SetLabelStyle),
            0x000D => Some(Command::PartiallyUpdateButtons),
            0x0101 => Some(Command::InButton),
            0x0303 => Some(Command::InDeviceInfo),
            _ => None,
        }
    }
}

/// Build the single, fixed-size first record of an outbound transfer:
/// 2-byte magic, big-endian command id, little-endian declared payload
/// length, then up to [`FRAME_PAYLOAD_CAPACITY`] bytes of payload,
/// zero-padded to fill the record.
pub fn build_frame(cmd: Command, payload: &[u8]) -> [u8; RECORD_SIZE] {
    let mut record = [0u8; RECORD_SIZE];
    record[0..2].copy_from_slice(&MAGIC);
    record[2..4].copy_from_slice(&(cmd as u16).to_be_bytes());
    record[4..8].copy_from_slice(&(payload.len() as u32).to_le_bytes());

    let carried = payload.len().min(FRAME_PAYLOAD_CAPACITY);
    record[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + carried].copy_from_slice(&payload[..carried]);
    record
}

/// Split `payload` into the full sequence of outbound records for a
/// `set_buttons`-style transfer: the first record carries the header plus
/// the first 1016 bytes, subsequent records are raw 1024-byte chunks of
/// whatever remains, last one zero-padded.
pub fn chunk_payload(cmd: Command, payload: &[u8]) -> Vec<[u8; RECORD_SIZE]> {
    let mut records = vec![build_frame(cmd, payload)];

    let mut offset = FRAME_PAYLOAD_CAPACITY;
    while offset < payload.len() {
        let end = (offset + RECORD_SIZE).min(payload.len());
        let mut chunk = [0u8; RECORD_SIZE];
        chunk[..end - offset].copy_from_slice(&payload[offset..end]);
        records.push(chunk);
        offset += RECORD_SIZE;
    }

    records
}

/// A decoded inbound record: the command id plus its raw payload slice.
pub struct InboundFrame<'a> {
    pub command: Command,
    pub payload: &'a [u8],
}

/// Parse an inbound record. `buf` is the slice actually read from the HID
/// endpoint (may be shorter than [`RECORD_SIZE`] — transports return the
/// number of bytes read, not a fixed-size buffer).
pub fn parse_frame(buf: &[u8]) -> Result<InboundFrame<'_>, ProtocolError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Err(ProtocolError::ShortFrame(buf.len()));
    }
    if buf[0..2] != MAGIC {
        return Err(ProtocolError::MalformedFrame);
    }

    let command_id = u16::from_be_bytes([buf[2], buf[3]]);
    let declared_len = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;

    if FRAME_HEADER_SIZE + declared_len > buf.len() {
        return Err(ProtocolError::TruncatedPayload {
            declared: declared_len,
            available: buf.len() - FRAME_HEADER_SIZE,
        });
    }

    let command = Command::from_u16(command_id).ok_or(ProtocolError::UnknownCommand(command_id))?;
    let payload = &buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + declared_len];

    Ok(InboundFrame { command, payload })
}

/// Decode an `IN_BUTTON` payload: `[state, index, 0x01, pressed]`. The
/// third byte is a format marker and must be `0x01`.
pub fn decode_button_payload(payload: &[u8]) -> Result<KeyEvent, ProtocolError> {
    if payload.len() < 4 || payload[2] != 0x01 {
        return Err(ProtocolError::InvalidButtonPayload);
    }
    Ok(KeyEvent {
        state: payload[0],
        index: payload[1],
    })
}

/// Whether an `IN_BUTTON` payload reports a press (as opposed to a
/// release). Kept separate from [`decode_button_payload`] since dispatch
/// cares about press/release, not just the event's identity.
pub fn button_payload_pressed(payload: &[u8]) -> bool {
    payload.len() >= 4 && payload[3] == 0x01
}

#[derive(Debug, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "Dversion", default)]
    pub version: String,
    #[serde(rename = "SerialNumber", default)]
    pub serial_number: String,
    #[serde(rename = "error", default)]
    pub error: String,
}

/// Decode an `IN_DEVICE_INFO` payload: a NUL-trimmed UTF-8 JSON string.
pub fn decode_device_info(payload: &[u8]) -> Result<DeviceInfo, ProtocolError> {
    let trimmed = trim_nul(payload);
    let text = String::from_utf8_lossy(trimmed);
    Ok(serde_json::from_str(&text)?)
}

fn trim_nul(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|&b| b != 0).unwrap_or(data.len());
    let end = data.iter().rposition(|&b| b != 0).map(|i| i + 1).unwrap_or(0);
    if start >= end {
        &[]
    } else {
        &data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_frame_has_fixed_size_and_header() {
        let frame = build_frame(Command::SetBrightness, b"100");
        assert_eq!(frame.len(), RECORD_SIZE);
        assert_eq!(&frame[0..2], &MAGIC);
        assert_eq!(u16::from_be_bytes([frame[2], frame[3]]), 0x000A);
        assert_eq!(u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]), 3);
        assert_eq!(&frame[8..11], b"100");
        assert!(frame[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn parse_frame_rejects_short_buffer() {
        let buf = [0x7C, 0x7C, 0, 1, 0, 0, 0];
        assert!(matches!(parse_frame(&buf), Err(ProtocolError::ShortFrame(7))));
    }

    #[test]
    fn parse_frame_rejects_bad_magic() {
        let mut buf = [0u8; 16];
        buf[0] = 0x7C;
        buf[1] = 0x00;
        assert!(matches!(parse_frame(&buf), Err(ProtocolError::MalformedFrame)));
    }

    #[test]
    fn parse_frame_rejects_truncated_payload() {
        let mut buf = [0u8; 10];
        buf[0..2].copy_from_slice(&MAGIC);
        buf[2..4].copy_from_slice(&0x0101u16.to_be_bytes());
        buf[4..8].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            parse_frame(&buf),
            Err(ProtocolError::TruncatedPayload { declared: 100, available: 2 })
        ));
    }

    #[test]
    fn parse_frame_rejects_unknown_command() {
        let mut buf = [0u8; 8];
        buf[0..2].copy_from_slice(&MAGIC);
        buf[2..4].copy_from_slice(&0xBEEFu16.to_be_bytes());
        assert!(matches!(parse_frame(&buf), Err(ProtocolError::UnknownCommand(0xBEEF))));
    }

    #[test]
    fn in_button_round_trip_for_valid_triples() {
        for (state, index, pressed) in [(0u8, 0u8, true), (1, 12, false), (9, 13, true)] {
            let payload = [state, index, 0x01, pressed as u8];
            let event = decode_button_payload(&payload).unwrap();
            assert_eq!(event.state, state);
            assert_eq!(event.index, index);
            assert_eq!(button_payload_pressed(&payload), pressed);
        }
    }

    #[test]
    fn in_button_rejects_bad_marker_byte() {
        let payload = [0u8, 1, 0x02, 1];
        assert!(matches!(decode_button_payload(&payload), Err(ProtocolError::InvalidButtonPayload)));
    }

    #[test]
    fn device_info_trims_nul_padding() {
        let mut payload = br#"{"Dversion":"1.2","SerialNumber":"ABC","error":""}"#.to_vec();
        payload.extend(std::iter::repeat(0u8).take(20));
        let info = decode_device_info(&payload).unwrap();
        assert_eq!(info.version, "1.2");
        assert_eq!(info.serial_number, "ABC");
    }

    #[test]
    fn chunk_payload_splits_large_archives_without_headers_on_later_chunks() {
        let payload = vec![0xAAu8; 8_500];
        let chunks = chunk_payload(Command::SetButtons, &payload);
        // 1016 bytes in record 1, then ceil((8500 - 1016) / 1024) more records.
        assert_eq!(chunks.len(), 1 + ((8_500 - FRAME_PAYLOAD_CAPACITY) + RECORD_SIZE - 1) / RECORD_SIZE);
        for chunk in &chunks {
            assert_eq!(chunk.len(), RECORD_SIZE);
        }
        // Last chunk is zero-padded past the actual data.
        let last = chunks.last().unwrap();
        assert!(last.iter().rev().take_while(|&&b| b == 0).count() > 0 || payload.len() % RECORD_SIZE == 0);
    }
}
