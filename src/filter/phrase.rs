use std::fmt;

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ColumnHeader, ValueType},
    filter::{
        exact::{
            match_float64_by_exact_value, match_ipv4_by_exact_value, match_timestamp_by_exact_value,
            match_uint_by_exact_value,
        },
        field_name,
        matchers::{leaf_column, match_dict_by, match_phrase, match_text_by},
        quote_field_name, quote_token_if_needed,
    },
    tokenizer::hash_tokens,
    values::{try_parse_float64, try_parse_ipv4, try_parse_timestamp_iso8601},
};

/// `field:phrase`: the value contains the phrase on token boundaries.
#[derive(Debug)]
pub struct PhraseFilter {
    field_name: String,
    phrase: String,
    tokens: OnceCell<Vec<u64>>,
}

impl PhraseFilter {
    /// Match rows of `field` containing `phrase`.
    pub fn new(field: &str, phrase: impl Into<String>) -> Self {
        Self {
            field_name: field_name(field),
            phrase: phrase.into(),
            tokens: OnceCell::new(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub(crate) fn tokens(&self) -> &[u64] {
        self.tokens.get_or_init(|| hash_tokens(&self.phrase))
    }

    /// Narrow `bm` to rows containing the phrase.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let phrase = self.phrase.as_str();
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_phrase(v, phrase)) else {
            return;
        };
        match ch.value_type() {
            ValueType::String => {
                match_text_by(bs, ch, bm, self.tokens(), |v| match_phrase(v, phrase));
            }
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_phrase(v, phrase)),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                match_uint_by_exact_value(bs, ch, bm, phrase);
            }
            ValueType::Float64 => match_float64_by_phrase(bs, ch, bm, phrase, self.tokens()),
            ValueType::Ipv4 => match_ipv4_by_phrase(bs, ch, bm, phrase, self.tokens()),
            ValueType::TimestampIso8601 => {
                match_timestamp_by_phrase(bs, ch, bm, phrase, self.tokens());
            }
        }
    }
}

impl fmt::Display for PhraseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            quote_field_name(&self.field_name),
            quote_token_if_needed(&self.phrase)
        )
    }
}

/// A phrase may be a fragment of a float's text: `123` matches `123.456`
/// and `-0.123`, so only a phrase with an inner dot can use the binary path.
pub(super) fn match_float64_by_phrase(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    phrase: &str,
    tokens: &[u64],
) {
    if try_parse_float64(phrase).is_err() && !matches!(phrase, "." | "+" | "-") {
        bm.reset_bits();
        return;
    }
    if phrase.find('.').is_some_and(|n| n > 0 && n + 1 < phrase.len()) {
        match_float64_by_exact_value(bs, ch, bm, phrase);
        return;
    }
    match_text_by(bs, ch, bm, tokens, |v| match_phrase(v, phrase));
}

/// A complete address goes through the binary path; fragments such as `1.2`
/// are searched in the dotted text.
pub(super) fn match_ipv4_by_phrase(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    phrase: &str,
    tokens: &[u64],
) {
    if try_parse_ipv4(phrase).is_ok() {
        match_ipv4_by_exact_value(bs, ch, bm, phrase);
        return;
    }
    match_text_by(bs, ch, bm, tokens, |v| match_phrase(v, phrase));
}

pub(super) fn match_timestamp_by_phrase(
    bs: &BlockSearch<'_>,
    ch: &ColumnHeader,
    bm: &mut Bitmap,
    phrase: &str,
    tokens: &[u64],
) {
    if try_parse_timestamp_iso8601(phrase).is_ok() {
        match_timestamp_by_exact_value(bs, ch, bm, phrase);
        return;
    }
    match_text_by(bs, ch, bm, tokens, |v| match_phrase(v, phrase));
}
