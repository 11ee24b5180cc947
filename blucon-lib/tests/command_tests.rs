//! Tests for command payloads and the rolling block-index transform

mod common;

use common::*;

#[test]
fn test_literal_payloads() {
    assert_eq!(Command::Wakeup.payload_hex(), "cb010000");
    assert_eq!(Command::AckWakeup.payload_hex(), "810a00");
    assert_eq!(Command::Sleep.payload_hex(), "010c0e00");
    assert_eq!(Command::GetPatchInfo.payload_hex(), "010d0900");
    assert_eq!(Command::GetSensorTime.payload_hex(), "010d0e0127");
    assert_eq!(Command::GetNowDataIndex.payload_hex(), "010d0e0103");
    assert_eq!(Command::GetTrendData.payload_hex(), "010d0f02030c");
    assert_eq!(Command::GetHistoricData.payload_hex(), "010d0f020f18");
}

#[test]
fn test_idle_has_no_payload() {
    assert_eq!(Command::Idle.payload_hex(), "");
    assert!(Command::Idle.to_bytes().is_err());
}

#[test]
fn test_computed_now_glucose_payload() {
    assert_eq!(
        Command::GetNowGlucoseData { block: 6 }.payload_hex(),
        "010d0e0106"
    );
    // two uppercase hex digits, zero padded
    assert_eq!(
        Command::GetNowGlucoseData { block: 14 }.payload_hex(),
        "010d0e010E"
    );
    assert_eq!(
        Command::GetNowGlucoseData { block: 0xAB }.payload_hex(),
        "010d0e01AB"
    );
}

#[test]
fn test_rolling_index_direct() {
    let params = rolling_index(5, BlockIndexMode::Direct);
    assert_eq!(params.index2, 34);
    assert_eq!(params.offset, 2);
    assert_eq!(params.index3, 7);
}

#[test]
fn test_rolling_index_decrement_wrap() {
    // raw = 5: index2 = 34 - 6 = 28, offset 4, index3 6
    let params = rolling_index(5, BlockIndexMode::DecrementWrap);
    assert_eq!(params.index2, 28);
    assert_eq!(params.offset, 4);
    assert_eq!(params.index3, 6);
    assert_eq!(
        Command::GetNowGlucoseData { block: params.index3 }.payload_hex(),
        "010d0e0106"
    );
}

#[test]
fn test_rolling_index_wraps_at_buffer_start() {
    // raw = 0: 4 - 6 = -2, wraps into the 96-unit buffer at 94
    let params = rolling_index(0, BlockIndexMode::DecrementWrap);
    assert_eq!(params.index2, 94);
    assert_eq!(params.offset, 6);
    assert_eq!(params.index3, 14);
}

#[test]
fn test_rolling_index_consistency() {
    for raw in 0..=15u8 {
        for mode in [BlockIndexMode::Direct, BlockIndexMode::DecrementWrap] {
            let params = rolling_index(raw, mode);
            assert_eq!(params.offset, (params.index2 % 8) as usize);
            assert_eq!(u32::from(params.index3), 3 + params.index2 / 8);
        }
    }
}
