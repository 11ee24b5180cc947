//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use blucon_lib::command::{BlockIndexMode, Command, RollingIndexParams, rolling_index};
#[allow(unused_imports)]
pub use blucon_lib::decoder::{
    GlucoseRecord, GlucoseScale, PatchSnapshot, RecordLabel, SensorAge, decode_history,
    decode_patch_memory, decode_trend, glucose_mg_dl, glucose_mg_dl_8p5, parse_single_block,
    sensor_active_time, sensor_age_from_memory,
};
#[allow(unused_imports)]
pub use blucon_lib::error::BluconError;
#[allow(unused_imports)]
pub use blucon_lib::hexstr::{bytes_to_hex, ensure_ascii, hex_to_bytes, split_byte_pairs};
#[allow(unused_imports)]
pub use blucon_lib::protocol::{Outcome, ProtocolEvent, ProtocolSession, SessionConfig};
#[allow(unused_imports)]
pub use blucon_lib::response::{ResponseTag, classify};

/// Wrap a body in single-block framing: prefix, 2-byte sub-code, body,
/// one trailing nibble.
#[allow(dead_code)]
pub fn single_block(body: &str) -> String {
    format!("8bde00{body}f")
}

/// A 636-hex-char patch memory image with known contents:
/// - trend record at line `n` decodes to `100 + n` mg/dL,
/// - history record at line `n` decodes to `200 + n` mg/dL,
/// - sensor elapsed time of 2000 minutes (1 day, 9 hrs, 20 min).
#[allow(dead_code)]
pub fn synthetic_memory_image(trend_pointer: u8, history_pointer: u8) -> String {
    let mut image = String::new();
    image.push_str(&"00".repeat(26));
    image.push_str(&format!("{trend_pointer:02x}"));
    image.push_str(&format!("{history_pointer:02x}"));
    for line in 0..16u16 {
        image.push_str(&record_hex((100 + line) * 10));
    }
    for line in 0..32u16 {
        image.push_str(&record_hex((200 + line) * 10));
    }
    // bytes 316 (low) and 317 (high): 0x07d0 = 2000 minutes
    image.push_str("d007");
    image
}

/// One 6-byte trend/history record; the glucose pair is little-endian
/// in the first two bytes.
#[allow(dead_code)]
fn record_hex(raw: u16) -> String {
    format!("{:02x}{:02x}00000000", raw & 0xff, raw >> 8)
}
