use std::fmt;

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    filter::{
        field_name,
        matchers::{leaf_column, match_dict_by, match_ipv4_range, visit_encoded, visit_text},
        quote_field_name,
    },
    values::{ipv4_string, unmarshal_ipv4},
};

/// `field:ipv4_range(min, max)`: the value is an IPv4 address within inclusive bounds.
#[derive(Debug)]
pub struct Ipv4RangeFilter {
    field_name: String,
    min_value: u32,
    max_value: u32,
}

impl Ipv4RangeFilter {
    /// Match addresses in `[min_value, max_value]`, both given as big-endian u32.
    pub fn new(field: &str, min_value: u32, max_value: u32) -> Self {
        Self {
            field_name: field_name(field),
            min_value,
            max_value,
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Narrow `bm` to rows holding an address within the range.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let (min, max) = (self.min_value, self.max_value);
        if min > max {
            bm.reset_bits();
            return;
        }
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_ipv4_range(v, min, max))
        else {
            return;
        };
        match ch.value_type() {
            ValueType::String => visit_text(bs, ch, bm, |v| match_ipv4_range(v, min, max)),
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_ipv4_range(v, min, max)),
            ValueType::Ipv4 => {
                if u64::from(min) > ch.max_value() || u64::from(max) < ch.min_value() {
                    bm.reset_bits();
                    return;
                }
                let part_path = bs.part_path();
                visit_encoded(bs, ch, bm, |v| {
                    let n = unmarshal_ipv4(part_path, v);
                    n >= min && n <= max
                });
            }
            ValueType::Uint8
            | ValueType::Uint16
            | ValueType::Uint32
            | ValueType::Uint64
            | ValueType::Float64
            | ValueType::TimestampIso8601 => bm.reset_bits(),
        }
    }
}

impl fmt::Display for Ipv4RangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ipv4_range({}, {})",
            quote_field_name(&self.field_name),
            ipv4_string(self.min_value),
            ipv4_string(self.max_value)
        )
    }
}
