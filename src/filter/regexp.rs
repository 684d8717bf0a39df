use std::fmt;

use regex::Regex;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    error::FilterError,
    filter::{
        field_name,
        matchers::{leaf_column, match_dict_by, visit_text},
        quote_field_name,
    },
};

/// `field:~"re"`: the regular expression matches the whole value.
///
/// Typed values are matched against their canonical text.
#[derive(Debug)]
pub struct RegexpFilter {
    field_name: String,
    pattern: String,
    re: Regex,
}

impl RegexpFilter {
    /// Compile `pattern` for `field`.
    pub fn new(field: &str, pattern: &str) -> Result<Self, FilterError> {
        let field_name = field_name(field);
        let invalid = |source| FilterError::InvalidRegex {
            field: field_name.clone(),
            source,
        };
        // Checked alone first: an unbalanced pattern may still compile once wrapped.
        Regex::new(pattern).map_err(invalid)?;
        let re = Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)?;
        Ok(Self {
            field_name,
            pattern: pattern.to_string(),
            re,
        })
    }

    /// Pattern as written, without the whole-value anchors.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Narrow `bm` to rows the expression matches.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let re = &self.re;
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| re.is_match(v)) else {
            return;
        };
        match ch.value_type() {
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| re.is_match(v)),
            _ => visit_text(bs, ch, bm, |v| re.is_match(v)),
        }
    }
}

impl fmt::Display for RegexpFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{:?}", quote_field_name(&self.field_name), self.pattern)
    }
}
