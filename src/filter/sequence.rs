use std::fmt;

use once_cell::sync::OnceCell;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    filter::{
        exact::match_uint_by_exact_value,
        field_name,
        matchers::{leaf_column, match_dict_by, match_sequence, match_text_by},
        phrase::{match_ipv4_by_phrase, match_timestamp_by_phrase},
        quote_field_name, quote_token_if_needed,
    },
    tokenizer::tokenize_hashes,
};

/// `field:seq("a", "b")`: every phrase occurs, in order, without overlapping.
#[derive(Debug)]
pub struct SequenceFilter {
    field_name: String,
    phrases: Vec<String>,
    non_empty_phrases: OnceCell<Vec<String>>,
    tokens: OnceCell<Vec<u64>>,
}

impl SequenceFilter {
    /// Match rows of `field` containing `phrases` in order.
    pub fn new<I, S>(field: &str, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_name: field_name(field),
            phrases: phrases.into_iter().map(Into::into).collect(),
            non_empty_phrases: OnceCell::new(),
            tokens: OnceCell::new(),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    fn non_empty_phrases(&self) -> &[String] {
        self.non_empty_phrases.get_or_init(|| {
            self.phrases
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect()
        })
    }

    pub(crate) fn tokens(&self) -> &[u64] {
        self.tokens.get_or_init(|| {
            let mut tokens = Vec::new();
            tokenize_hashes(&mut tokens, self.non_empty_phrases().iter().map(String::as_str));
            tokens
        })
    }

    /// Narrow `bm` to rows holding the phrases in order.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let phrases = self.non_empty_phrases();
        if phrases.is_empty() {
            return;
        }
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_sequence(v, phrases)) else {
            return;
        };
        let tokens = self.tokens();
        match ch.value_type() {
            ValueType::String => {
                match_text_by(bs, ch, bm, tokens, |v| match_sequence(v, phrases));
            }
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_sequence(v, phrases)),
            ValueType::Uint8 | ValueType::Uint16 | ValueType::Uint32 | ValueType::Uint64 => {
                // decimal text is a single token, so it can hold one phrase at most
                if phrases.len() > 1 {
                    bm.reset_bits();
                    return;
                }
                match_uint_by_exact_value(bs, ch, bm, &phrases[0]);
            }
            ValueType::Float64 => {
                match_text_by(bs, ch, bm, tokens, |v| match_sequence(v, phrases));
            }
            ValueType::Ipv4 => {
                if let [phrase] = phrases {
                    match_ipv4_by_phrase(bs, ch, bm, phrase, tokens);
                    return;
                }
                match_text_by(bs, ch, bm, tokens, |v| match_sequence(v, phrases));
            }
            ValueType::TimestampIso8601 => {
                if let [phrase] = phrases {
                    match_timestamp_by_phrase(bs, ch, bm, phrase, tokens);
                    return;
                }
                match_text_by(bs, ch, bm, tokens, |v| match_sequence(v, phrases));
            }
        }
    }
}

impl fmt::Display for SequenceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}seq(", quote_field_name(&self.field_name))?;
        for (i, phrase) in self.phrases.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", quote_token_if_needed(phrase))?;
        }
        f.write_str(")")
    }
}
