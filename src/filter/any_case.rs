use std::fmt;

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    filter::{
        exact::match_uint_by_exact_value,
        field_name,
        matchers::{
            leaf_column, match_any_case_phrase, match_any_case_prefix, match_dict_by,
            visit_text,
        },
        phrase::{match_float64_by_phrase, match_ipv4_by_phrase, match_timestamp_by_phrase},
        prefix::{
            match_float64_by_prefix, match_ipv4_by_prefix, match_timestamp_by_prefix,
            match_uint_by_prefix,
        },
        quote_field_name, quote_token_if_needed,
    },
    tokenizer::{hash_token_list, hash_tokens, tokenize_skip_last},
};

/// Operand in one letter case together with the bloom tokens derived from it.
#[derive(Debug)]
struct CasedOperand {
    text: String,
    tokens: Vec<u64>,
}

/// `field:i(phrase)`: case-insensitive phrase match.
///
/// Bloom filters are case-sensitive, so string columns are always scanned.
/// Typed columns render numbers and addresses without letters, except
/// timestamps which use upper-case `T` and `Z`; those get the upper-cased
/// operand instead.
#[derive(Debug)]
pub struct AnyCasePhraseFilter {
    field_name: String,
    phrase: String,
    lowercase: OnceCell<CasedOperand>,
    uppercase: OnceCell<CasedOperand>,
}

impl AnyCasePhraseFilter {
    /// Match rows of `field` containing `phrase` in any letter case.
    pub fn new(field: &str, phrase: impl Into<String>) -> Self {
        Self {
            field_name: field_name(field),
            phrase: phrase.into(),
            lowercase: OnceCell::new(),
            uppercase: OnceCell::new(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    fn lowercase(&self) -> &CasedOperand {
        self.lowercase.get_or_init(|| {
            let text = self.phrase.to_lowercase();
            let tokens = hash_tokens(&text);
            CasedOperand { text, tokens }
        })
    }

    fn uppercase(&self) -> &CasedOperand {
        self.uppercase.get_or_init(|| {
            let text = self.phrase.to_uppercase();
            let tokens = hash_tokens(&text);
            CasedOperand { text, tokens }
        })
    }

    /// Narrow `bm` to rows containing the phrase in any case.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let lower = self.lowercase();
        let phrase = lower.text.as_str();
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_any_case_phrase(v, phrase))
        else {
            return;
        };
        match ch.value_type() {
            ValueType::String => visit_text(bs, ch, bm, |v| match_any_case_phrase(v, phrase)),
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_any_case_phrase(v, phrase)),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                match_uint_by_exact_value(bs, ch, bm, phrase);
            }
            ValueType::Float64 => match_float64_by_phrase(bs, ch, bm, phrase, &lower.tokens),
            ValueType::Ipv4 => match_ipv4_by_phrase(bs, ch, bm, phrase, &lower.tokens),
            ValueType::TimestampIso8601 => {
                let upper = self.uppercase();
                match_timestamp_by_phrase(bs, ch, bm, &upper.text, &upper.tokens);
            }
        }
    }
}

impl fmt::Display for AnyCasePhraseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}i({})",
            quote_field_name(&self.field_name),
            quote_token_if_needed(&self.phrase)
        )
    }
}

/// `field:i(prefix*)`: case-insensitive prefix match.
#[derive(Debug)]
pub struct AnyCasePrefixFilter {
    field_name: String,
    prefix: String,
    lowercase: OnceCell<CasedOperand>,
    uppercase: OnceCell<CasedOperand>,
}

impl AnyCasePrefixFilter {
    /// Match rows of `field` containing a word starting with `prefix` in any letter case.
    pub fn new(field: &str, prefix: impl Into<String>) -> Self {
        Self {
            field_name: field_name(field),
            prefix: prefix.into(),
            lowercase: OnceCell::new(),
            uppercase: OnceCell::new(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    fn lowercase(&self) -> &CasedOperand {
        self.lowercase.get_or_init(|| {
            let text = self.prefix.to_lowercase();
            let tokens = hash_token_list(&tokenize_skip_last(&text));
            CasedOperand { text, tokens }
        })
    }

    fn uppercase(&self) -> &CasedOperand {
        self.uppercase.get_or_init(|| {
            let text = self.prefix.to_uppercase();
            let tokens = hash_token_list(&tokenize_skip_last(&text));
            CasedOperand { text, tokens }
        })
    }

    /// Narrow `bm` to rows matching the prefix in any case.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let lower = self.lowercase();
        let prefix = lower.text.as_str();
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_any_case_prefix(v, prefix))
        else {
            return;
        };
        match ch.value_type() {
            ValueType::String => visit_text(bs, ch, bm, |v| match_any_case_prefix(v, prefix)),
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_any_case_prefix(v, prefix)),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                match_uint_by_prefix(bs, ch, bm, prefix);
            }
            ValueType::Float64 => match_float64_by_prefix(bs, ch, bm, prefix, &lower.tokens),
            ValueType::Ipv4 => match_ipv4_by_prefix(bs, ch, bm, prefix, &lower.tokens),
            ValueType::TimestampIso8601 => {
                let upper = self.uppercase();
                match_timestamp_by_prefix(bs, ch, bm, &upper.text, &upper.tokens);
            }
        }
    }
}

impl fmt::Display for AnyCasePrefixFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = quote_field_name(&self.field_name);
        if self.prefix.is_empty() {
            return write!(f, "{field}i(*)");
        }
        write!(f, "{field}i({}*)", quote_token_if_needed(&self.prefix))
    }
}
