//! Word tokenization shared by filters and bloom filters.
//!
//! A token is a maximal run of letters, digits and underscores. The same rule
//! decides phrase boundaries in the matchers, so anything found by a phrase
//! search is made of whole tokens that a bloom filter built with this module
//! has seen.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use unicode_ident::is_xid_continue;
use xxhash_rust::xxh64::xxh64;

use crate::pool::Pool;

static HASH_SET_POOL: Lazy<Pool<HashSet<u64>>> = Lazy::new(Pool::default);

/// Returns true when `c` may appear inside a token.
///
/// Digits are decimal digits only; superscripts and fractions such as `²` or
/// `½` separate tokens.
#[inline]
#[must_use]
pub fn is_token_rune(c: char) -> bool {
    c == '_' || c.is_alphabetic() || (c.is_numeric() && is_xid_continue(c))
}

/// ASCII fast path of [`is_token_rune`].
#[inline]
#[must_use]
pub fn is_token_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// Call `f` with every token of `s` in order of appearance, duplicates included.
pub fn for_each_token<'a, F>(s: &'a str, mut f: F)
where
    F: FnMut(&'a str),
{
    if s.is_ascii() {
        let bytes = s.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            while i < bytes.len() && !is_token_byte(bytes[i]) {
                i += 1;
            }
            let start = i;
            while i < bytes.len() && is_token_byte(bytes[i]) {
                i += 1;
            }
            if start < i {
                f(&s[start..i]);
            }
        }
        return;
    }

    let mut start = None;
    for (pos, c) in s.char_indices() {
        match (is_token_rune(c), start) {
            (true, None) => start = Some(pos),
            (false, Some(begin)) => {
                f(&s[begin..pos]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        f(&s[begin..]);
    }
}

/// Append the distinct tokens of `values` to `dst`, in first-seen order.
pub fn tokenize_strings<'a, I>(dst: &mut Vec<String>, values: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<&str> = dst.iter().map(String::as_str).collect::<HashSet<_>>();
    let mut fresh = Vec::new();
    for value in values {
        for_each_token(value, |token| {
            if seen.insert(token) {
                fresh.push(token);
            }
        });
    }
    drop(seen);
    dst.extend(fresh.into_iter().map(str::to_string));
}

/// Distinct tokens of `s`.
#[must_use]
pub fn tokenize(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    tokenize_strings(&mut tokens, [s]);
    tokens
}

/// Distinct tokens of `s` after dropping a trailing partial token.
///
/// Used for prefix literals, where the last token may continue in the value.
#[must_use]
pub fn tokenize_skip_last(s: &str) -> Vec<String> {
    let trimmed = s.trim_end_matches(is_token_rune);
    tokenize(trimmed)
}

/// Hash of a single token as stored in bloom filters.
#[inline]
#[must_use]
pub fn token_hash(token: &str) -> u64 {
    xxh64(token.as_bytes(), 0)
}

/// Append the hashes of the distinct tokens in `values` to `dst`.
///
/// Tokens are hashed without being copied; duplicates are dropped by hash.
pub fn tokenize_hashes<'a, I>(dst: &mut Vec<u64>, values: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HASH_SET_POOL.acquire();
    seen.extend(dst.iter().copied());
    for value in values {
        for_each_token(value, |token| {
            let h = token_hash(token);
            if seen.insert(h) {
                dst.push(h);
            }
        });
    }
}

/// Hashes of the distinct tokens of `s`.
#[must_use]
pub fn hash_tokens(s: &str) -> Vec<u64> {
    let mut hashes = Vec::new();
    tokenize_hashes(&mut hashes, [s]);
    hashes
}

/// Hashes of already-split tokens, duplicates removed.
#[must_use]
pub fn hash_token_list(tokens: &[String]) -> Vec<u64> {
    let mut seen = HASH_SET_POOL.acquire();
    tokens
        .iter()
        .map(|token| token_hash(token))
        .filter(|h| seen.insert(*h))
        .collect()
}
