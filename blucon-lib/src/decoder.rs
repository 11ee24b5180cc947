//! Glucose and sensor-time decoding.
//!
//! Works on the hex renderings produced by [`crate::hexstr`]. The bulk
//! functions walk a patch memory image whose layout is known only from
//! reverse engineering; every offset is bounds-checked because real
//! captures are sometimes truncated.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    HISTORY_POINTER_HEX_INDEX, HISTORY_POINTER_WRAP, HISTORY_RANGE, HISTORY_RECORD_MINUTES,
    RECORD_STRIDE_HEX, SENSOR_TIME_BYTES, SINGLE_BLOCK_HEADER_HEX, SINGLE_BLOCK_TRAILER_HEX,
    TREND_POINTER_HEX_INDEX, TREND_POINTER_WRAP, TREND_RANGE,
};
use crate::error::BluconError;
use crate::hexstr::{ensure_ascii, split_byte_pairs};

/// Parse a 2-byte-pair hex string and mask down to the 12-bit raw
/// glucose field.
fn raw12(pair_hex: &str) -> Result<u16, BluconError> {
    let value = u16::from_str_radix(pair_hex, 16)
        .map_err(|e| BluconError::MalformedHex(format!("{e}: {pair_hex:?}")))?;
    Ok(value & 0x0fff)
}

/// Glucose in mg/dL using the original calibration (12-bit raw, integer
/// divided by 10). The mask keeps the result non-negative.
pub fn glucose_mg_dl(pair_hex: &str) -> Result<u16, BluconError> {
    Ok(raw12(pair_hex)? / 10)
}

/// Alternate calibration kept alongside the /10 formula: the same
/// 12-bit raw value divided by 8.5.
pub fn glucose_mg_dl_8p5(pair_hex: &str) -> Result<f64, BluconError> {
    Ok(f64::from(raw12(pair_hex)?) / 8.5)
}

/// Which calibration feeds the emitted "now" value. Both formulas
/// coexist across reader revisions; neither is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseScale {
    #[default]
    DividedBy10,
    DividedBy8p5,
}

impl GlucoseScale {
    pub fn apply(&self, pair_hex: &str) -> Result<f64, BluconError> {
        match self {
            GlucoseScale::DividedBy10 => Ok(f64::from(glucose_mg_dl(pair_hex)?)),
            GlucoseScale::DividedBy8p5 => glucose_mg_dl_8p5(pair_hex),
        }
    }
}

/// Elapsed sensor-active time, broken down from a total minute count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAge {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl SensorAge {
    pub fn total_minutes(&self) -> u32 {
        self.days * 1440 + self.hours * 60 + self.minutes
    }
}

impl fmt::Display for SensorAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sensor active for {} days, {} hrs and {} min",
            self.days, self.hours, self.minutes
        )
    }
}

/// Decode a 16-bit minute count (two concatenated byte pairs) into a
/// [`SensorAge`]. Empty input is an error, not a zero age.
pub fn sensor_active_time(minutes_hex: &str) -> Result<SensorAge, BluconError> {
    if minutes_hex.is_empty() {
        return Err(BluconError::InsufficientData { expected: 4, actual: 0 });
    }
    let total = u32::from(
        u16::from_str_radix(minutes_hex, 16)
            .map_err(|e| BluconError::MalformedHex(format!("{e}: {minutes_hex:?}")))?,
    );
    let days = total / 1440;
    let hours = (total - days * 1440) / 60;
    let minutes = total - days * 1440 - hours * 60;
    Ok(SensorAge { days, hours, minutes })
}

/// Strip the 3-byte header and the trailing nibble off a single-block
/// response and split the remainder into byte pairs.
pub fn parse_single_block(response: &str) -> Result<Vec<&str>, BluconError> {
    ensure_ascii(response)?;
    let min = SINGLE_BLOCK_HEADER_HEX + 2 + SINGLE_BLOCK_TRAILER_HEX;
    if response.len() < min {
        return Err(BluconError::InsufficientData {
            expected: min,
            actual: response.len(),
        });
    }
    let body = &response[SINGLE_BLOCK_HEADER_HEX..response.len() - SINGLE_BLOCK_TRAILER_HEX];
    Ok(split_byte_pairs(body))
}

/// Label for one decoded trend/history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordLabel {
    /// The slot the trend write pointer sits on.
    Now,
    /// The slot the history write pointer sits on.
    Last,
    MinutesAgo(i32),
}

impl fmt::Display for RecordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordLabel::Now => write!(f, "now"),
            RecordLabel::Last => write!(f, "last"),
            RecordLabel::MinutesAgo(m) => write!(f, "{m}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlucoseRecord {
    pub label: RecordLabel,
    /// mg/dL via the /10 calibration.
    pub value: u16,
}

/// Everything one bulk decode of a complete memory image yields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSnapshot {
    pub sensor_age: SensorAge,
    pub trend: Vec<GlucoseRecord>,
    pub history: Vec<GlucoseRecord>,
    /// The trend series' "now" value, when present.
    pub current: Option<u16>,
}

fn read_pointer(all: &str, hex_index: usize) -> Result<i32, BluconError> {
    let end = hex_index + 2;
    if all.len() < end {
        return Err(BluconError::InsufficientData {
            expected: end,
            actual: all.len(),
        });
    }
    i32::from_str_radix(&all[hex_index..end], 16)
        .map_err(|e| BluconError::MalformedHex(format!("{e}: write pointer at {hex_index}")))
}

/// Shared walk for the trend and history ranges. `lineNumber` runs
/// 0-based per stride; the record on the write pointer gets
/// `head_label` and bumps the pointer by `wrap` so the remaining slots
/// keep positive elapsed-time labels.
fn decode_series(
    all: &str,
    pointer_index: usize,
    range: (usize, usize),
    wrap: i32,
    minutes_per_slot: i32,
    head_label: RecordLabel,
) -> Result<Vec<GlucoseRecord>, BluconError> {
    ensure_ascii(all)?;
    let (start, end) = range;
    if all.len() < end {
        return Err(BluconError::InsufficientData {
            expected: end,
            actual: all.len(),
        });
    }
    let mut pointer = read_pointer(all, pointer_index)?;
    let mut records = Vec::with_capacity((end - start) / RECORD_STRIDE_HEX);

    for (line, ele) in (start..end).step_by(RECORD_STRIDE_HEX).enumerate() {
        let pairs = split_byte_pairs(&all[ele..ele + RECORD_STRIDE_HEX]);
        // glucose is little-endian inside the record: high byte second
        let value = glucose_mg_dl(&format!("{}{}", pairs[1], pairs[0]))?;
        let line = line as i32;
        if pointer == line {
            records.push(GlucoseRecord { label: head_label, value });
            pointer += wrap;
        } else {
            records.push(GlucoseRecord {
                label: RecordLabel::MinutesAgo((pointer - line) * minutes_per_slot),
                value,
            });
        }
    }
    Ok(records)
}

/// Sort key shared by both series: "now" pins first, "last" pins last,
/// minute labels ascend in between.
fn series_sort_key(record: &GlucoseRecord) -> (u8, i32) {
    match record.label {
        RecordLabel::Now => (0, 0),
        RecordLabel::MinutesAgo(m) => (1, m),
        RecordLabel::Last => (2, 0),
    }
}

/// Decode the minute-granularity trend series from a memory image.
pub fn decode_trend(all: &str) -> Result<Vec<GlucoseRecord>, BluconError> {
    let mut records = decode_series(
        all,
        TREND_POINTER_HEX_INDEX,
        TREND_RANGE,
        TREND_POINTER_WRAP,
        1,
        RecordLabel::Now,
    )?;
    records.sort_by_key(series_sort_key);
    Ok(records)
}

/// Decode the 15-minute-granularity history series.
pub fn decode_history(all: &str) -> Result<Vec<GlucoseRecord>, BluconError> {
    let mut records = decode_series(
        all,
        HISTORY_POINTER_HEX_INDEX,
        HISTORY_RANGE,
        HISTORY_POINTER_WRAP,
        HISTORY_RECORD_MINUTES,
        RecordLabel::Last,
    )?;
    records.sort_by_key(series_sort_key);
    Ok(records)
}

/// Read the sensor elapsed-time minutes straight out of a memory image.
pub fn sensor_age_from_memory(all: &str) -> Result<SensorAge, BluconError> {
    ensure_ascii(all)?;
    let need = SENSOR_TIME_BYTES[0] * 2 + 2;
    if all.len() < need {
        return Err(BluconError::InsufficientData {
            expected: need,
            actual: all.len(),
        });
    }
    let hi = &all[SENSOR_TIME_BYTES[0] * 2..SENSOR_TIME_BYTES[0] * 2 + 2];
    let lo = &all[SENSOR_TIME_BYTES[1] * 2..SENSOR_TIME_BYTES[1] * 2 + 2];
    sensor_active_time(&format!("{hi}{lo}"))
}

/// Bulk-decode a complete patch memory image: sensor age, both series,
/// and the current value lifted from the trend head.
pub fn decode_patch_memory(all: &str) -> Result<PatchSnapshot, BluconError> {
    let sensor_age = sensor_age_from_memory(all)?;
    let trend = decode_trend(all)?;
    let history = decode_history(all)?;
    let current = trend
        .iter()
        .find(|r| r.label == RecordLabel::Now)
        .map(|r| r.value);
    Ok(PatchSnapshot {
        sensor_age,
        trend,
        history,
        current,
    })
}
