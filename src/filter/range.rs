use std::{fmt, ops::Bound};

use crate::{
    bitmap::Bitmap,
    block::{BlockSearch, ValueType},
    filter::{
        field_name,
        matchers::{leaf_column, match_dict_by, match_range, visit_encoded, visit_text},
        quote_field_name,
    },
    values::{unmarshal_float64, unmarshal_uint},
};

/// `field:range[min, max]`: the value is a number within inclusive bounds.
///
/// String values are parsed as floats; IPv4 and timestamp columns never match.
#[derive(Debug)]
pub struct RangeFilter {
    field_name: String,
    min_value: f64,
    max_value: f64,
    string_repr: String,
}

impl RangeFilter {
    /// Match numbers in `[min_value, max_value]`.
    pub fn new(field: &str, min_value: f64, max_value: f64) -> Self {
        Self {
            field_name: field_name(field),
            min_value,
            max_value,
            string_repr: format!("[{}, {}]", format_bound(min_value), format_bound(max_value)),
        }
    }

    /// Match numbers within arbitrary bounds.
    ///
    /// Exclusive bounds become the adjacent representable float, so the
    /// filter stays inclusive internally.
    pub fn from_bounds(field: &str, lower: Bound<f64>, upper: Bound<f64>) -> Self {
        let (min_value, open) = match lower {
            Bound::Included(v) => (v, format!("[{}", format_bound(v))),
            Bound::Excluded(v) => (next_up(v), format!("({}", format_bound(v))),
            Bound::Unbounded => (f64::NEG_INFINITY, "(-inf".to_string()),
        };
        let (max_value, close) = match upper {
            Bound::Included(v) => (v, format!("{}]", format_bound(v))),
            Bound::Excluded(v) => (next_down(v), format!("{})", format_bound(v))),
            Bound::Unbounded => (f64::INFINITY, "inf)".to_string()),
        };
        Self {
            field_name: field_name(field),
            min_value,
            max_value,
            string_repr: format!("{open}, {close}"),
        }
    }

    /// Target field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Inclusive bounds after exclusive bounds were nudged.
    pub fn bounds(&self) -> (f64, f64) {
        (self.min_value, self.max_value)
    }

    /// Narrow `bm` to rows within the range.
    pub fn apply(&self, bs: &BlockSearch<'_>, bm: &mut Bitmap) {
        let (min, max) = (self.min_value, self.max_value);
        if min > max {
            bm.reset_bits();
            return;
        }
        let Some(ch) = leaf_column(bs, &self.field_name, bm, |v| match_range(v, min, max)) else {
            return;
        };
        let part_path = bs.part_path();
        match ch.value_type() {
            ValueType::String => visit_text(bs, ch, bm, |v| match_range(v, min, max)),
            ValueType::Dict => match_dict_by(bs, ch, bm, |v| match_range(v, min, max)),
            value_type @ (ValueType::Uint8
            | ValueType::Uint16
            | ValueType::Uint32
            | ValueType::Uint64) => {
                // `as` saturates, clamping negative bounds to 0
                let min_uint = min.ceil() as u64;
                let max_uint = max.floor() as u64;
                if max < 0.0 || min_uint > max_uint {
                    bm.reset_bits();
                    return;
                }
                if min_uint > ch.max_value() || max_uint < ch.min_value() {
                    bm.reset_bits();
                    return;
                }
                visit_encoded(bs, ch, bm, |v| {
                    let n = unmarshal_uint(part_path, value_type, v);
                    n >= min_uint && n <= max_uint
                });
            }
            ValueType::Float64 => {
                if min > ch.max_float64() || max < ch.min_float64() {
                    bm.reset_bits();
                    return;
                }
                visit_encoded(bs, ch, bm, |v| {
                    let f = unmarshal_float64(part_path, v);
                    f >= min && f <= max
                });
            }
            ValueType::Ipv4 | ValueType::TimestampIso8601 => bm.reset_bits(),
        }
    }
}

impl fmt::Display for RangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}range{}", quote_field_name(&self.field_name), self.string_repr)
    }
}

fn format_bound(v: f64) -> String {
    if v == f64::INFINITY {
        "inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        v.to_string()
    }
}

/// Smallest float greater than `v`.
fn next_up(v: f64) -> f64 {
    if v.is_nan() || v == f64::INFINITY {
        return v;
    }
    if v == 0.0 {
        return f64::from_bits(1);
    }
    let bits = v.to_bits();
    if v > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// Largest float smaller than `v`.
fn next_down(v: f64) -> f64 {
    -next_up(-v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::MemBlock,
        filter::tests::{apply_to_all, bits},
    };

    #[test]
    fn numeric_columns() {
        let block = MemBlock::builder("p", vec![0; 4])
            .uint_column("n", ValueType::Uint32, &[1, 5, 10, 20])
            .float64_column("f", &[-1.5, 0.0, 2.5, 100.0])
            .string_column("s", &["1.5", "abc", "-3", "1e2"])
            .ipv4_column("ip", &[1, 2, 3, 4])
            .build()
            .expect("block");

        assert_eq!(apply_to_all(RangeFilter::new("n", 4.5, 10.0), &block), bits("0110"));
        assert_eq!(apply_to_all(RangeFilter::new("n", -5.0, 1.2), &block), bits("1000"));
        assert_eq!(apply_to_all(RangeFilter::new("n", -5.0, -1.0), &block), bits("0000"));
        assert_eq!(apply_to_all(RangeFilter::new("n", 1.2, 1.8), &block), bits("0000"));
        assert_eq!(apply_to_all(RangeFilter::new("n", 21.0, 30.0), &block), bits("0000"));

        assert_eq!(apply_to_all(RangeFilter::new("f", -1.5, 2.5), &block), bits("1110"));
        assert_eq!(apply_to_all(RangeFilter::new("s", -5.0, 100.0), &block), bits("1011"));
        assert_eq!(apply_to_all(RangeFilter::new("ip", 0.0, 10.0), &block), bits("0000"));
        assert_eq!(apply_to_all(RangeFilter::new("f", 3.0, 1.0), &block), bits("0000"));
        assert_eq!(apply_to_all(RangeFilter::new("missing", 0.0, 1.0), &block), bits("0000"));
    }

    #[test]
    fn exclusive_bounds() {
        let block = MemBlock::builder("p", vec![0; 3])
            .float64_column("f", &[1.0, 1.5, 2.0])
            .uint_column("n", ValueType::Uint8, &[1, 2, 3])
            .build()
            .expect("block");

        let f = RangeFilter::from_bounds("f", Bound::Excluded(1.0), Bound::Excluded(2.0));
        assert_eq!(apply_to_all(f, &block), bits("010"));
        let f = RangeFilter::from_bounds("n", Bound::Excluded(1.0), Bound::Unbounded);
        assert_eq!(apply_to_all(f, &block), bits("011"));

        assert!(next_up(1.0) > 1.0);
        assert!(next_down(1.0) < 1.0);
        assert!(next_up(-0.0) > 0.0);
        assert!(next_down(0.0) < 0.0);
    }

    #[test]
    fn display() {
        assert_eq!(RangeFilter::new("x", 1.0, 2.5).to_string(), "x:range[1, 2.5]");
        let f = RangeFilter::from_bounds("x", Bound::Excluded(1.0), Bound::Unbounded);
        assert_eq!(f.to_string(), "x:range(1, inf)");
    }
}
