//! Parsing, canonical formatting and binary encodings of typed column values.
//!
//! Fixed-width values are stored big-endian: uint8/16/32/64 as themselves,
//! float64 as its IEEE-754 bits, IPv4 as a u32 and ISO8601 timestamps as i64
//! nanoseconds since the Unix epoch. Each encoding has exactly one canonical
//! text form, which is what regexp, range and partial-phrase filters match
//! against.

use std::{fmt::Write as _, net::Ipv4Addr};

use chrono::{DateTime, NaiveDateTime};

use crate::{block::ValueType, error::ValueParseError};

/// Length of a canonical ISO8601 timestamp, e.g. `2024-01-02T03:04:05.678Z`.
pub const ISO8601_TIMESTAMP_LEN: usize = 24;

const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Parse a plain decimal unsigned integer; signs and separators are rejected.
pub fn try_parse_uint64(s: &str) -> Result<u64, ValueParseError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValueParseError::Uint(s.to_string()));
    }
    s.parse().map_err(|_| ValueParseError::Uint(s.to_string()))
}

/// Parse a floating-point number. NaN is rejected since it never compares equal.
pub fn try_parse_float64(s: &str) -> Result<f64, ValueParseError> {
    match s.parse::<f64>() {
        Ok(f) if !f.is_nan() => Ok(f),
        _ => Err(ValueParseError::Float(s.to_string())),
    }
}

/// Parse a dotted-quad IPv4 address into its big-endian u32 value.
pub fn try_parse_ipv4(s: &str) -> Result<u32, ValueParseError> {
    s.parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| ValueParseError::Ipv4(s.to_string()))
}

/// Parse a `YYYY-MM-DDTHH:MM:SS.mmmZ` timestamp into Unix nanoseconds.
pub fn try_parse_timestamp_iso8601(s: &str) -> Result<i64, ValueParseError> {
    let err = || ValueParseError::Timestamp(s.to_string());
    if s.len() != ISO8601_TIMESTAMP_LEN || !s.ends_with('Z') {
        return Err(err());
    }
    let naive = NaiveDateTime::parse_from_str(&s[..ISO8601_TIMESTAMP_LEN - 1], ISO8601_FORMAT)
        .map_err(|_| err())?;
    naive.and_utc().timestamp_nanos_opt().ok_or_else(err)
}

/// Append the canonical text of an unsigned integer.
pub fn format_uint64(dst: &mut String, n: u64) {
    let _ = write!(dst, "{n}");
}

/// Append the canonical text of a float: the shortest form that parses back exactly.
pub fn format_float64(dst: &mut String, f: f64) {
    let _ = write!(dst, "{f}");
}

/// Append the dotted-quad text of an IPv4 address.
pub fn format_ipv4(dst: &mut String, n: u32) {
    let _ = write!(dst, "{}", Ipv4Addr::from(n));
}

/// Append the canonical ISO8601 text of a nanosecond timestamp.
pub fn format_timestamp_iso8601(dst: &mut String, nsecs: i64) {
    let dt = DateTime::from_timestamp_nanos(nsecs);
    let _ = write!(dst, "{}Z", dt.format(ISO8601_FORMAT));
}

/// Canonical text of a float, as an owned string.
#[must_use]
pub fn float64_string(f: f64) -> String {
    let mut s = String::new();
    format_float64(&mut s, f);
    s
}

/// Canonical text of an IPv4 address, as an owned string.
#[must_use]
pub fn ipv4_string(n: u32) -> String {
    let mut s = String::new();
    format_ipv4(&mut s, n);
    s
}

/// Canonical text of a timestamp, as an owned string.
#[must_use]
pub fn timestamp_iso8601_string(nsecs: i64) -> String {
    let mut s = String::new();
    format_timestamp_iso8601(&mut s, nsecs);
    s
}

/// Encode `n` with the width of `value_type`, or `None` when it does not fit.
///
/// # Panics
///
/// Panics when `value_type` is not an unsigned integer type.
#[must_use]
pub fn marshal_uint(value_type: ValueType, n: u64) -> Option<Vec<u8>> {
    match value_type {
        ValueType::Uint8 => u8::try_from(n).ok().map(|v| vec![v]),
        ValueType::Uint16 => u16::try_from(n).ok().map(|v| v.to_be_bytes().to_vec()),
        ValueType::Uint32 => u32::try_from(n).ok().map(|v| v.to_be_bytes().to_vec()),
        ValueType::Uint64 => Some(n.to_be_bytes().to_vec()),
        other => panic!("FATAL: marshal_uint called for non-integer value type {other:?}"),
    }
}

/// Encode a float64 value.
#[must_use]
pub fn marshal_float64(f: f64) -> Vec<u8> {
    f.to_bits().to_be_bytes().to_vec()
}

/// Encode an IPv4 value.
#[must_use]
pub fn marshal_ipv4(n: u32) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

/// Encode a nanosecond timestamp.
#[must_use]
pub fn marshal_timestamp_iso8601(nsecs: i64) -> Vec<u8> {
    nsecs.to_be_bytes().to_vec()
}

/// Decode an unsigned integer of any width.
///
/// # Panics
///
/// Panics when `v` does not have the width `value_type` declares; that means
/// the block data is corrupted.
#[must_use]
pub fn unmarshal_uint(part_path: &str, value_type: ValueType, v: &[u8]) -> u64 {
    match value_type {
        ValueType::Uint8 => u64::from(fixed::<1>(part_path, value_type, v)[0]),
        ValueType::Uint16 => u64::from(u16::from_be_bytes(fixed(part_path, value_type, v))),
        ValueType::Uint32 => u64::from(u32::from_be_bytes(fixed(part_path, value_type, v))),
        ValueType::Uint64 => u64::from_be_bytes(fixed(part_path, value_type, v)),
        other => panic!("FATAL: {part_path}: unexpected value type {other:?} for uint decoding"),
    }
}

/// Decode a float64 value; panics on a width mismatch.
#[must_use]
pub fn unmarshal_float64(part_path: &str, v: &[u8]) -> f64 {
    f64::from_bits(u64::from_be_bytes(fixed(part_path, ValueType::Float64, v)))
}

/// Decode an IPv4 value; panics on a width mismatch.
#[must_use]
pub fn unmarshal_ipv4(part_path: &str, v: &[u8]) -> u32 {
    u32::from_be_bytes(fixed(part_path, ValueType::Ipv4, v))
}

/// Decode a nanosecond timestamp; panics on a width mismatch.
#[must_use]
pub fn unmarshal_timestamp_iso8601(part_path: &str, v: &[u8]) -> i64 {
    i64::from_be_bytes(fixed(part_path, ValueType::TimestampIso8601, v))
}

fn fixed<const N: usize>(part_path: &str, value_type: ValueType, v: &[u8]) -> [u8; N] {
    match v.try_into() {
        Ok(bytes) => bytes,
        Err(_) => panic!(
            "FATAL: {part_path}: unexpected length for binary representation of {}; got {} bytes; want {N}",
            value_type.as_str(),
            v.len(),
        ),
    }
}

/// Append the canonical text of an encoded fixed-width value.
///
/// # Panics
///
/// Panics for string and dict types, which are not fixed-width, and on width
/// mismatches.
pub fn format_encoded(dst: &mut String, part_path: &str, value_type: ValueType, v: &[u8]) {
    match value_type {
        ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
            format_uint64(dst, unmarshal_uint(part_path, value_type, v));
        }
        ValueType::Float64 => format_float64(dst, unmarshal_float64(part_path, v)),
        ValueType::Ipv4 => format_ipv4(dst, unmarshal_ipv4(part_path, v)),
        ValueType::TimestampIso8601 => {
            format_timestamp_iso8601(dst, unmarshal_timestamp_iso8601(part_path, v));
        }
        ValueType::String | ValueType::Dict => panic!(
            "FATAL: {part_path}: {} values have no fixed-width encoding",
            value_type.as_str()
        ),
    }
}
