//! Outgoing protocol commands and the rolling block-index transform.

use strum_macros::Display;

use crate::constants::ROLLING_BUFFER_UNITS;
use crate::error::BluconError;
use crate::hexstr;

/// Protocol opcodes, doubling as the "awaiting response" marker of the
/// session state machine. All payloads are fixed hex literals except
/// `GetNowGlucoseData`, whose block address is computed per cycle from
/// the get-now-data-index response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum Command {
    /// Nothing sent, awaiting the transmitter's wakeup signal.
    #[default]
    Idle,
    /// Wakeup is device-initiated; listed for completeness, never written.
    Wakeup,
    AckWakeup,
    Sleep,
    GetPatchInfo,
    GetSensorTime,
    GetNowDataIndex,
    GetNowGlucoseData {
        block: u8,
    },
    GetTrendData,
    GetHistoricData,
}

impl Command {
    /// The wire payload as a hex string. Empty for `Idle`.
    pub fn payload_hex(&self) -> String {
        match self {
            Command::Idle => String::new(),
            Command::Wakeup => "cb010000".into(),
            Command::AckWakeup => "810a00".into(),
            Command::Sleep => "010c0e00".into(),
            Command::GetPatchInfo => "010d0900".into(),
            Command::GetSensorTime => "010d0e0127".into(),
            Command::GetNowDataIndex => "010d0e0103".into(),
            // block address rendered as exactly two uppercase hex digits
            Command::GetNowGlucoseData { block } => format!("010d0e01{block:02X}"),
            Command::GetTrendData => "010d0f02030c".into(),
            Command::GetHistoricData => "010d0f020f18".into(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BluconError> {
        hexstr::hex_to_bytes(&self.payload_hex())
    }
}

/// Which of the two observed block-index algorithms to use. Revisions
/// of the deployed readers disagree; neither is documented as
/// authoritative, so the caller picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum BlockIndexMode {
    /// `index2 = raw*6 + 4`, as first published.
    Direct,
    /// Same, then stepped back one slot with a wrap into the 96-unit
    /// rolling buffer. This is what later revisions shipped.
    #[default]
    DecrementWrap,
}

/// Derived addressing for the "now glucose" read. `index3` is the byte
/// address sent in the next command; `offset` selects the 2-byte pair
/// inside the next single-block response that holds the current value.
/// Valid for one exchange only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingIndexParams {
    pub index2: u32,
    pub index3: u8,
    pub offset: usize,
}

/// Locate the current glucose slot in the device's circular buffer.
/// `raw` is the 6th-from-last byte pair of the get-now-data-index
/// response.
pub fn rolling_index(raw: u8, mode: BlockIndexMode) -> RollingIndexParams {
    let mut index2 = i64::from(raw) * 6 + 4;
    if mode == BlockIndexMode::DecrementWrap {
        index2 -= 6;
        if index2 < 4 {
            index2 += ROLLING_BUFFER_UNITS;
        }
    }
    RollingIndexParams {
        index2: index2 as u32,
        index3: (3 + index2 / 8) as u8,
        offset: (index2 % 8) as usize,
    }
}
