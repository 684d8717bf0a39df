//! Value predicates and row visitors shared by the leaf filters.

use once_cell::sync::Lazy;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ColumnHeader, ValueType},
    filter::bloom_gate::match_bloom_filter_all_tokens,
    pool::Pool,
    tokenizer::is_token_rune,
    values::{format_encoded, try_parse_float64, try_parse_ipv4},
};

static TEXT_BUFFER_POOL: Lazy<Pool<String>> = Lazy::new(Pool::default);

/// Position of the first occurrence of `phrase` in `s` that sits on token boundaries.
///
/// A phrase starting (ending) with a token rune must not be preceded
/// (followed) by one, so `cat` is found in `a cat!` but not in `category`.
pub(crate) fn phrase_pos(s: &str, phrase: &str) -> Option<usize> {
    if phrase.is_empty() {
        return Some(0);
    }
    if phrase.len() > s.len() {
        return None;
    }
    let starts_with_token = phrase.chars().next().is_some_and(is_token_rune);
    let ends_with_token = phrase.chars().next_back().is_some_and(is_token_rune);
    let mut pos = 0;
    while let Some(n) = s[pos..].find(phrase) {
        let start = pos + n;
        let end = start + phrase.len();
        let bad_start =
            starts_with_token && s[..start].chars().next_back().is_some_and(is_token_rune);
        let bad_end = ends_with_token && s[end..].chars().next().is_some_and(is_token_rune);
        if !bad_start && !bad_end {
            return Some(start);
        }
        // skip the first char of the rejected match; `phrase` is non-empty here
        pos = start + s[start..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Returns true when `s` contains `phrase` on token boundaries.
///
/// The empty phrase only matches the empty string.
pub(crate) fn match_phrase(s: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return s.is_empty();
    }
    phrase_pos(s, phrase).is_some()
}

/// Returns true when `s` contains `prefix` starting on a token boundary.
///
/// The empty prefix matches every non-empty string.
pub(crate) fn match_prefix(s: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return !s.is_empty();
    }
    if prefix.len() > s.len() {
        return false;
    }
    let starts_with_token = prefix.chars().next().is_some_and(is_token_rune);
    let mut pos = 0;
    while let Some(n) = s[pos..].find(prefix) {
        let start = pos + n;
        if !starts_with_token || !s[..start].chars().next_back().is_some_and(is_token_rune) {
            return true;
        }
        pos = start + s[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Returns true when every phrase occurs in order, each searched after the previous match.
pub(crate) fn match_sequence(s: &str, phrases: &[String]) -> bool {
    let mut rest = s;
    for phrase in phrases {
        match phrase_pos(rest, phrase) {
            Some(n) => rest = &rest[n + phrase.len()..],
            None => return false,
        }
    }
    true
}

/// Case-insensitive [`match_phrase`]; `phrase_lowercase` is already lowercased.
pub(crate) fn match_any_case_phrase(s: &str, phrase_lowercase: &str) -> bool {
    if phrase_lowercase.is_empty() {
        return s.is_empty();
    }
    if s.is_ascii() && !s.bytes().any(|b| b.is_ascii_uppercase()) {
        return match_phrase(s, phrase_lowercase);
    }
    match_phrase(&s.to_lowercase(), phrase_lowercase)
}

/// Case-insensitive [`match_prefix`]; `prefix_lowercase` is already lowercased.
pub(crate) fn match_any_case_prefix(s: &str, prefix_lowercase: &str) -> bool {
    if prefix_lowercase.is_empty() {
        return !s.is_empty();
    }
    if s.is_ascii() && !s.bytes().any(|b| b.is_ascii_uppercase()) {
        return match_prefix(s, prefix_lowercase);
    }
    match_prefix(&s.to_lowercase(), prefix_lowercase)
}

/// Returns true when `s` parses as a number within `[min, max]`.
pub(crate) fn match_range(s: &str, min: f64, max: f64) -> bool {
    try_parse_float64(s).is_ok_and(|f| f >= min && f <= max)
}

/// Returns true when `s` parses as an IPv4 address within `[min, max]`.
pub(crate) fn match_ipv4_range(s: &str, min: u32, max: u32) -> bool {
    try_parse_ipv4(s).is_ok_and(|n| n >= min && n <= max)
}

/// Lexicographic `[min, max)` test.
pub(crate) fn match_string_range(s: &str, min: &str, max: &str) -> bool {
    s >= min && s < max
}

/// Returns true when the rune count of `s` lies within `[min, max]`.
pub(crate) fn match_len_range(s: &str, min: u64, max: u64) -> bool {
    let n = s.chars().count() as u64;
    n >= min && n <= max
}

/// Resolve the column a leaf filter reads.
///
/// Const columns and missing columns are decided here by evaluating
/// `matches` once, against the const value or the empty string; the bitmap is
/// zeroed when that fails and `None` is returned. Otherwise the caller scans
/// the returned column.
pub(crate) fn leaf_column<'a, F>(
    bs: &BlockSearch<'a>,
    field: &str,
    bm: &mut Bitmap,
    matches: F,
) -> Option<&'a ColumnHeader>
where
    F: FnOnce(&str) -> bool,
{
    let v = bs.const_column_value(field);
    if !v.is_empty() {
        if !matches(v) {
            bm.reset_bits();
        }
        return None;
    }
    match bs.column_header(field) {
        Some(ch) => Some(ch),
        None => {
            if !matches("") {
                bm.reset_bits();
            }
            None
        }
    }
}

/// Visit the raw encoded value of every candidate row, clearing rows `f` rejects.
pub(crate) fn visit_encoded<F>(bs: &BlockSearch<'_>, ch: &ColumnHeader, bm: &mut Bitmap, mut f: F)
where
    F: FnMut(&[u8]) -> bool,
{
    if bm.is_zero() {
        return;
    }
    let values = bs.column_values(ch);
    bm.for_each_set_bit(|idx| f(&values[idx]));
}

/// Visit the canonical text of every candidate row, clearing rows `f` rejects.
///
/// String values are used as stored, dict values are looked up, fixed-width
/// values are formatted into a pooled buffer.
pub(crate) fn visit_text<F>(bs: &BlockSearch<'_>, ch: &ColumnHeader, bm: &mut Bitmap, mut f: F)
where
    F: FnMut(&str) -> bool,
{
    let part_path = bs.part_path();
    match ch.value_type() {
        ValueType::String => visit_encoded(bs, ch, bm, |v| f(string_value(part_path, ch, v))),
        ValueType::Dict => {
            let dict = ch.values_dict();
            visit_encoded(bs, ch, bm, |v| f(&dict[dict_index(part_path, ch, v)]));
        }
        value_type => {
            let mut buf = TEXT_BUFFER_POOL.acquire();
            visit_encoded(bs, ch, bm, |v| {
                buf.clear();
                format_encoded(&mut buf, part_path, value_type, v);
                f(&buf)
            });
        }
    }
}

/// Gate on `tokens`, then test the canonical text of every candidate row.
pub(crate) fn match_text_by<F>(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    tokens: &[u64],
    f: F,
) where
    F: FnMut(&str) -> bool,
{
    if !match_bloom_filter_all_tokens(bs, ch, tokens) {
        bm.reset_bits();
        return;
    }
    visit_text(bs, ch, bm, f);
}

/// Evaluate `matches` once per dictionary entry, then keep rows whose index matched.
pub(crate) fn match_dict_by<F>(bs: &BlockSearch<'_>, ch: &ColumnHeader, bm: &mut Bitmap, mut matches: F)
where
    F: FnMut(&str) -> bool,
{
    let mut selected = [false; 256];
    let mut any = false;
    for (idx, value) in ch.values_dict().iter().enumerate() {
        if matches(value) {
            selected[idx] = true;
            any = true;
        }
    }
    if !any {
        bm.reset_bits();
        return;
    }
    let part_path = bs.part_path();
    visit_encoded(bs, ch, bm, |v| selected[dict_index(part_path, ch, v)]);
}

/// Keep rows whose encoded value equals `needle`, after consulting the bloom filter.
pub(crate) fn match_binary_value(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    needle: &[u8],
    tokens: &[u64],
) {
    if !match_bloom_filter_all_tokens(bs, ch, tokens) {
        bm.reset_bits();
        return;
    }
    let width = needle.len();
    let part_path = bs.part_path();
    visit_encoded(bs, ch, bm, |v| {
        if v.len() != width {
            panic!(
                "FATAL: {part_path}: column {:?}: unexpected length for binary representation of {}; got {} bytes; want {width}",
                ch.name(),
                ch.value_type(),
                v.len(),
            );
        }
        v == needle
    });
}

/// Stored text of a string-column row.
///
/// # Panics
///
/// Panics when the row is not valid UTF-8, which means the part is corrupted.
pub(crate) fn string_value<'v>(part_path: &str, ch: &ColumnHeader, v: &'v [u8]) -> &'v str {
    match std::str::from_utf8(v) {
        Ok(s) => s,
        Err(err) => panic!(
            "FATAL: {part_path}: column {:?} holds invalid UTF-8: {err}",
            ch.name()
        ),
    }
}

fn dict_index(part_path: &str, ch: &ColumnHeader, v: &[u8]) -> usize {
    match v {
        [idx] if usize::from(*idx) < ch.values_dict().len() => usize::from(*idx),
        [idx] => panic!(
            "FATAL: {part_path}: column {:?}: dict index {idx} out of range; dict holds {} values",
            ch.name(),
            ch.values_dict().len()
        ),
        _ => panic!(
            "FATAL: {part_path}: column {:?}: unexpected length for dict value: got {}; want 1",
            ch.name(),
            v.len()
        ),
    }
}
