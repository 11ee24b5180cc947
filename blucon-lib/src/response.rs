//! Inbound response classification.
//!
//! BluCon responses carry no length-prefixed framing; they are
//! recognized by exact match or content prefix on the lowercase hex
//! rendering of the notification.

use strum_macros::Display;

/// Wakeup echo sent by the transmitter when it powers up near a patch.
pub const WAKEUP_SIGNAL: &str = "cb010000";
pub const ACK: &str = "8b0a00";
pub const NACK_PREFIX: &str = "8b1a02";
pub const NACK_PATCH_NOT_FOUND: &str = "8b1a02000f";
pub const NACK_PATCH_READ_ERROR: &str = "8b1a020011";
pub const PATCH_INFO_PREFIX: &str = "8bd9";
pub const SINGLE_BLOCK_PREFIX: &str = "8bde";
pub const MULTI_BLOCK_PREFIX: &str = "8bdf";
/// Superset of [`SINGLE_BLOCK_PREFIX`]; only consulted when the active
/// command actually expects a sensor-time block.
pub const SENSOR_TIME_PREFIX: &str = "8bde27";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ResponseTag {
    Wakeup,
    Ack,
    NackPatchNotFound,
    NackPatchReadError,
    NackOther,
    PatchInfo,
    SingleBlock,
    MultiBlock,
    SensorTime,
    Unrecognized,
}

/// Classify a lowercase hex response. Pure; the same input always
/// yields the same tag for a given `expect_sensor_time`.
///
/// Precedence preserves the original driver: exact matches first, then
/// NACK (sub-classified by exact suffix), then the prefix signatures,
/// with the sensor-time sub-check ahead of the general single-block
/// prefix it overlaps.
pub fn classify(response: &str, expect_sensor_time: bool) -> ResponseTag {
    if response == WAKEUP_SIGNAL {
        return ResponseTag::Wakeup;
    }
    if response == ACK {
        return ResponseTag::Ack;
    }
    if response.starts_with(NACK_PREFIX) {
        return match response {
            NACK_PATCH_NOT_FOUND => ResponseTag::NackPatchNotFound,
            NACK_PATCH_READ_ERROR => ResponseTag::NackPatchReadError,
            _ => ResponseTag::NackOther,
        };
    }
    if response.starts_with(PATCH_INFO_PREFIX) {
        return ResponseTag::PatchInfo;
    }
    if expect_sensor_time && response.starts_with(SENSOR_TIME_PREFIX) {
        return ResponseTag::SensorTime;
    }
    if response.starts_with(SINGLE_BLOCK_PREFIX) {
        return ResponseTag::SingleBlock;
    }
    if response.starts_with(MULTI_BLOCK_PREFIX) {
        return ResponseTag::MultiBlock;
    }
    ResponseTag::Unrecognized
}
