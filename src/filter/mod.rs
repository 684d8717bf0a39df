//! Filter tree evaluated against one block at a time.
//!
//! A [`Filter`] narrows a caller-owned [`Bitmap`] to the rows of a block that
//! satisfy it. On entry the bitmap holds the rows still under consideration;
//! on return it holds exactly those of them that match. Filter trees are
//! immutable after construction and may be shared across threads evaluating
//! different blocks. Per-node caches derived from literal operands are
//! computed once on first use.
//!
//! Leaf filters resolve their field in three steps: a block-constant value is
//! tested once, a field missing from the block is treated as the empty
//! string, and otherwise the column is scanned with a matcher specific to its
//! physical encoding.

mod and;
mod any_case;
mod bloom_gate;
mod exact;
mod exact_prefix;
mod in_values;
mod ipv4_range;
mod len_range;
mod matchers;
mod noop;
mod not;
mod or;
mod phrase;
mod prefix;
mod range;
mod regexp;
mod sequence;
mod string_range;
mod time;

use std::{borrow::Cow, collections::HashSet, fmt, ops::Bound};

pub use and::AndFilter;
pub use any_case::{AnyCasePhraseFilter, AnyCasePrefixFilter};
pub use exact::ExactFilter;
pub use exact_prefix::ExactPrefixFilter;
pub use in_values::InFilter;
pub use ipv4_range::Ipv4RangeFilter;
pub use len_range::LenRangeFilter;
pub use noop::NoopFilter;
pub use not::NotFilter;
pub use or::OrFilter;
pub use phrase::PhraseFilter;
pub use prefix::PrefixFilter;
pub use range::RangeFilter;
pub use regexp::RegexpFilter;
pub use sequence::SequenceFilter;
pub use string_range::StringRangeFilter;
pub use time::TimeFilter;

use crate::{bitmap::Bitmap, block::BlockSearch, error::FilterError, tokenizer::is_token_rune};

/// Field holding the log message; filters written without a field target it.
pub const MSG_FIELD: &str = "_msg";

/// Pseudo-field holding row timestamps.
pub const TIME_FIELD: &str = "_time";

const RESERVED_WORDS: &[&str] = &[
    "and",
    "or",
    "not",
    "exact",
    "i",
    "in",
    "ipv4_range",
    "len_range",
    "range",
    "seq",
    "string_range",
];

/// Node of a filter tree.
#[derive(Debug)]
pub enum Filter {
    /// Matches every row.
    Noop(NoopFilter),
    /// Row timestamp range.
    Time(TimeFilter),
    /// Conjunction.
    And(AndFilter),
    /// Disjunction.
    Or(OrFilter),
    /// Negation.
    Not(NotFilter),
    /// Token-aligned phrase.
    Phrase(PhraseFilter),
    /// Token-aligned prefix.
    Prefix(PrefixFilter),
    /// Case-insensitive phrase.
    AnyCasePhrase(AnyCasePhraseFilter),
    /// Case-insensitive prefix.
    AnyCasePrefix(AnyCasePrefixFilter),
    /// Whole-value equality.
    Exact(ExactFilter),
    /// Whole-value prefix.
    ExactPrefix(ExactPrefixFilter),
    /// Ordered phrases.
    Sequence(SequenceFilter),
    /// Set membership.
    In(InFilter),
    /// Numeric range.
    Range(RangeFilter),
    /// IPv4 range.
    Ipv4Range(Ipv4RangeFilter),
    /// Lexicographic range.
    StringRange(StringRangeFilter),
    /// Character-count range.
    LenRange(LenRangeFilter),
    /// Regular expression.
    Regexp(RegexpFilter),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Filter::Noop($f) => $body,
            Filter::Time($f) => $body,
            Filter::And($f) => $body,
            Filter::Or($f) => $body,
            Filter::Not($f) => $body,
            Filter::Phrase($f) => $body,
            Filter::Prefix($f) => $body,
            Filter::AnyCasePhrase($f) => $body,
            Filter::AnyCasePrefix($f) => $body,
            Filter::Exact($f) => $body,
            Filter::ExactPrefix($f) => $body,
            Filter::Sequence($f) => $body,
            Filter::In($f) => $body,
            Filter::Range($f) => $body,
            Filter::Ipv4Range($f) => $body,
            Filter::StringRange($f) => $body,
            Filter::LenRange($f) => $body,
            Filter::Regexp($f) => $body,
        }
    };
}

impl Filter {
    /// Narrow `bm` to the rows of the block that match.
    ///
    /// # Panics
    ///
    /// Panics with a `FATAL` message when block data violates its declared
    /// encoding, or when `bm` does not have one bit per row.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        dispatch!(self, f => f.apply(bs, bm))
    }

    /// Add the names of the fields this filter reads to `names`.
    pub fn update_referenced_column_names(&self, names: &mut HashSet<String>) {
        match self {
            Filter::Noop(_) => {}
            Filter::Time(_) => {
                names.insert(TIME_FIELD.to_string());
            }
            Filter::And(f) => f
                .filters()
                .iter()
                .for_each(|f| f.update_referenced_column_names(names)),
            Filter::Or(f) => f
                .filters()
                .iter()
                .for_each(|f| f.update_referenced_column_names(names)),
            Filter::Not(f) => f.filter().update_referenced_column_names(names),
            Filter::Phrase(f) => insert(names, f.field_name()),
            Filter::Prefix(f) => insert(names, f.field_name()),
            Filter::AnyCasePhrase(f) => insert(names, f.field_name()),
            Filter::AnyCasePrefix(f) => insert(names, f.field_name()),
            Filter::Exact(f) => insert(names, f.field_name()),
            Filter::ExactPrefix(f) => insert(names, f.field_name()),
            Filter::Sequence(f) => insert(names, f.field_name()),
            Filter::In(f) => insert(names, f.field_name()),
            Filter::Range(f) => insert(names, f.field_name()),
            Filter::Ipv4Range(f) => insert(names, f.field_name()),
            Filter::StringRange(f) => insert(names, f.field_name()),
            Filter::LenRange(f) => insert(names, f.field_name()),
            Filter::Regexp(f) => insert(names, f.field_name()),
        }
    }

    /// Names of the fields this filter reads.
    pub fn referenced_column_names(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        self.update_referenced_column_names(&mut names);
        names
    }

    /// Short name of the node kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Filter::Noop(_) => "noop",
            Filter::Time(_) => "time",
            Filter::And(_) => "and",
            Filter::Or(_) => "or",
            Filter::Not(_) => "not",
            Filter::Phrase(_) => "phrase",
            Filter::Prefix(_) => "prefix",
            Filter::AnyCasePhrase(_) => "any_case_phrase",
            Filter::AnyCasePrefix(_) => "any_case_prefix",
            Filter::Exact(_) => "exact",
            Filter::ExactPrefix(_) => "exact_prefix",
            Filter::Sequence(_) => "sequence",
            Filter::In(_) => "in",
            Filter::Range(_) => "range",
            Filter::Ipv4Range(_) => "ipv4_range",
            Filter::StringRange(_) => "string_range",
            Filter::LenRange(_) => "len_range",
            Filter::Regexp(_) => "regexp",
        }
    }

    /// Field and token hashes a parent AND node may use for block rejection.
    fn field_tokens(&self) -> Option<(&str, &[u64])> {
        match self {
            Filter::Phrase(f) => Some((f.field_name(), f.tokens())),
            Filter::Prefix(f) => Some((f.field_name(), f.tokens())),
            Filter::Exact(f) => Some((f.field_name(), f.tokens())),
            Filter::ExactPrefix(f) => Some((f.field_name(), f.tokens())),
            Filter::Sequence(f) => Some((f.field_name(), f.tokens())),
            _ => None,
        }
    }

    /// `*`.
    pub fn noop() -> Self {
        Filter::Noop(NoopFilter)
    }

    /// `_time:[min, max]` in nanoseconds.
    pub fn time(min_timestamp: i64, max_timestamp: i64) -> Self {
        Filter::Time(TimeFilter::new(min_timestamp, max_timestamp))
    }

    /// Conjunction of `filters`.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(AndFilter::new(filters.into_iter().collect()))
    }

    /// Disjunction of `filters`.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(OrFilter::new(filters.into_iter().collect()))
    }

    /// Negation of `filter`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(NotFilter::new(filter))
    }

    /// `field:phrase`.
    pub fn phrase(field: &str, phrase: impl Into<String>) -> Self {
        Filter::Phrase(PhraseFilter::new(field, phrase))
    }

    /// `field:prefix*`.
    pub fn prefix(field: &str, prefix: impl Into<String>) -> Self {
        Filter::Prefix(PrefixFilter::new(field, prefix))
    }

    /// `field:i(phrase)`.
    pub fn any_case_phrase(field: &str, phrase: impl Into<String>) -> Self {
        Filter::AnyCasePhrase(AnyCasePhraseFilter::new(field, phrase))
    }

    /// `field:i(prefix*)`.
    pub fn any_case_prefix(field: &str, prefix: impl Into<String>) -> Self {
        Filter::AnyCasePrefix(AnyCasePrefixFilter::new(field, prefix))
    }

    /// `field:exact(value)`.
    pub fn exact(field: &str, value: impl Into<String>) -> Self {
        Filter::Exact(ExactFilter::new(field, value))
    }

    /// `field:exact(prefix*)`.
    pub fn exact_prefix(field: &str, prefix: impl Into<String>) -> Self {
        Filter::ExactPrefix(ExactPrefixFilter::new(field, prefix))
    }

    /// `field:seq(phrases...)`.
    pub fn sequence<I, S>(field: &str, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Sequence(SequenceFilter::new(field, phrases))
    }

    /// `field:in(values...)`.
    pub fn in_values<I, S>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::In(InFilter::new(field, values))
    }

    /// `field:range[min, max]`.
    pub fn range(field: &str, min_value: f64, max_value: f64) -> Self {
        Filter::Range(RangeFilter::new(field, min_value, max_value))
    }

    /// Numeric range with arbitrary bound kinds.
    pub fn range_bounds(field: &str, lower: Bound<f64>, upper: Bound<f64>) -> Self {
        Filter::Range(RangeFilter::from_bounds(field, lower, upper))
    }

    /// `field:ipv4_range(min, max)`.
    pub fn ipv4_range(field: &str, min_value: u32, max_value: u32) -> Self {
        Filter::Ipv4Range(Ipv4RangeFilter::new(field, min_value, max_value))
    }

    /// `field:string_range(min, max)`.
    pub fn string_range(
        field: &str,
        min_value: impl Into<String>,
        max_value: impl Into<String>,
    ) -> Self {
        Filter::StringRange(StringRangeFilter::new(field, min_value, max_value))
    }

    /// `field:len_range(min, max)`.
    pub fn len_range(field: &str, min_len: u64, max_len: u64) -> Self {
        Filter::LenRange(LenRangeFilter::new(field, min_len, max_len))
    }

    /// `field:~"pattern"`.
    pub fn regexp(field: &str, pattern: &str) -> Result<Self, FilterError> {
        RegexpFilter::new(field, pattern).map(Filter::Regexp)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, inner => fmt::Display::fmt(inner, f))
    }
}

macro_rules! impl_from_filter {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Filter {
                fn from(f: $ty) -> Self {
                    Filter::$variant(f)
                }
            }
        )*
    };
}

impl_from_filter!(
    Noop(NoopFilter),
    Time(TimeFilter),
    And(AndFilter),
    Or(OrFilter),
    Not(NotFilter),
    Phrase(PhraseFilter),
    Prefix(PrefixFilter),
    AnyCasePhrase(AnyCasePhraseFilter),
    AnyCasePrefix(AnyCasePrefixFilter),
    Exact(ExactFilter),
    ExactPrefix(ExactPrefixFilter),
    Sequence(SequenceFilter),
    In(InFilter),
    Range(RangeFilter),
    Ipv4Range(Ipv4RangeFilter),
    StringRange(StringRangeFilter),
    LenRange(LenRangeFilter),
    Regexp(RegexpFilter),
);

fn insert(names: &mut HashSet<String>, field: &str) {
    if !names.contains(field) {
        names.insert(field.to_string());
    }
}

/// Fields are addressed by name; the empty name means the message field.
pub(crate) fn field_name(name: &str) -> String {
    if name.is_empty() {
        MSG_FIELD.to_string()
    } else {
        name.to_string()
    }
}

/// `name:` prefix of a filter's text form; empty for the message field.
pub(crate) fn quote_field_name(name: &str) -> String {
    if name == MSG_FIELD {
        return String::new();
    }
    format!("{}:", quote_token_if_needed(name))
}

/// `s` as written in a query: bare when it is a single non-reserved token,
/// otherwise as a quoted string.
pub(crate) fn quote_token_if_needed(s: &str) -> Cow<'_, str> {
    let bare = !s.is_empty()
        && s.chars().all(is_token_rune)
        && !RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(s));
    if bare {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(format!("{s:?}"))
    }
}
