//! Tests for the hex-string codec

mod common;

use common::*;

#[test]
fn test_bytes_to_hex_lowercase() {
    assert_eq!(bytes_to_hex(&[0xCB, 0x01, 0x00, 0x00]), "cb010000");
    assert_eq!(bytes_to_hex(&[0x8B, 0xDE, 0x27]), "8bde27");
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn test_hex_round_trip() {
    let inputs: Vec<Vec<u8>> = vec![
        vec![0x00],
        vec![0xff],
        vec![0x01, 0x0d, 0x0e, 0x01, 0x06],
        (0u8..=255).collect(),
    ];
    for bytes in inputs {
        let hex = bytes_to_hex(&bytes);
        assert_eq!(hex_to_bytes(&hex).expect("round trip failed"), bytes);
    }
}

#[test]
fn test_hex_to_bytes_case_insensitive() {
    assert_eq!(hex_to_bytes("AbCd").unwrap(), vec![0xab, 0xcd]);
    assert_eq!(hex_to_bytes("010D0E0106").unwrap(), hex_to_bytes("010d0e0106").unwrap());
}

#[test]
fn test_hex_to_bytes_malformed() {
    for input in ["", "x", "zz", "abc", "0 1", "a"] {
        let result = hex_to_bytes(input);
        assert!(
            matches!(result, Err(BluconError::MalformedHex(_))),
            "expected MalformedHex for {input:?}, got {result:?}"
        );
    }
}

#[test]
fn test_split_byte_pairs_even() {
    assert_eq!(split_byte_pairs("aabbcc"), vec!["aa", "bb", "cc"]);
}

#[test]
fn test_split_byte_pairs_odd_tail() {
    // the short final chunk is load-bearing for single-block parsing
    assert_eq!(split_byte_pairs("aabbc"), vec!["aa", "bb", "c"]);
    assert_eq!(split_byte_pairs("a"), vec!["a"]);
}

#[test]
fn test_split_byte_pairs_empty() {
    assert!(split_byte_pairs("").is_empty());
}

#[test]
fn test_ensure_ascii() {
    assert!(ensure_ascii("8bde00aabb").is_ok());
    assert!(ensure_ascii("").is_ok());
    assert!(matches!(
        ensure_ascii("8bde00é"),
        Err(BluconError::MalformedHex(_))
    ));
}
