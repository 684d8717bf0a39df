//! Randomized checks that the fast paths agree with straightforward evaluation.

use std::ops::Range;

use fastrand::Rng;
use logsieve::{
    search_block, values::timestamp_iso8601_string, Bitmap, BlockSearch, Filter, MemBlock,
    SearchConfig, ValueType,
};

const WORDS: &[&str] = &[
    "foo",
    "bar",
    "baz",
    "Foo",
    "foo-bar",
    "12",
    "1.5",
    "10.0.0.1",
    "error warn",
    "категория",
    "",
];

const RATIOS: &[f64] = &[0.5, 1.0, 1.5, 2.25, -3.0, 12.0, 100.125, 1e20];

// 2024-01-02T03:04:05Z
const BASE_NANOS: i64 = 1_704_164_645_000_000_000;

const ROWS: usize = 150;
const FILTERS: usize = 150;

#[derive(Default)]
struct Rows {
    msg: Vec<String>,
    level: Vec<String>,
    code: Vec<u64>,
    small: Vec<u64>,
    mid: Vec<u64>,
    big: Vec<u64>,
    ratio: Vec<f64>,
    ip: Vec<u32>,
    seen: Vec<i64>,
}

impl Rows {
    fn random(rng: &mut Rng) -> Self {
        let mut rows = Rows::default();
        for _ in 0..ROWS {
            rows.msg.push(random_text(rng));
            rows.level.push(WORDS[rng.usize(..WORDS.len())].to_string());
            rows.code.push(rng.u64(0..1000));
            rows.small.push(rng.u64(0..=255));
            rows.mid.push(rng.u64(0..100_000));
            rows.big.push(match rng.u8(0..8) {
                0 => u64::MAX,
                1 => 0,
                _ => rng.u64(0..1 << 40),
            });
            rows.ratio.push(RATIOS[rng.usize(..RATIOS.len())]);
            rows.ip.push(0x0a00_0000 | rng.u32(0..16));
            rows.seen.push(random_nanos(rng));
        }
        rows
    }

    fn block(&self, range: Range<usize>) -> MemBlock {
        let r = || range.clone();
        MemBlock::builder("p", r().map(|i| i as i64).collect())
            .string_column("msg", &self.msg[r()])
            .dict_column("level", &self.level[r()])
            .string_column("level_raw", &self.level[r()])
            .uint_column("code", ValueType::Uint16, &self.code[r()])
            .uint_column("small", ValueType::Uint8, &self.small[r()])
            .uint_column("mid", ValueType::Uint32, &self.mid[r()])
            .uint_column("big", ValueType::Uint64, &self.big[r()])
            .float64_column("ratio", &self.ratio[r()])
            .ipv4_column("ip", &self.ip[r()])
            .timestamp_iso8601_column("seen", &self.seen[r()])
            .build()
            .expect("block")
    }
}

/// Millisecond-aligned instant within a few days of `BASE_NANOS`.
fn random_nanos(rng: &mut Rng) -> i64 {
    let secs = rng.i64(0..4) * 86_400 + rng.i64(0..60);
    BASE_NANOS + secs * 1_000_000_000 + rng.i64(0..4) * 250_000_000
}

fn random_text(rng: &mut Rng) -> String {
    let n = rng.usize(0..4);
    (0..n)
        .map(|_| WORDS[rng.usize(..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn random_word(rng: &mut Rng) -> &'static str {
    WORDS[rng.usize(..WORDS.len())]
}

/// The first `n` chars of a random word.
fn random_head(rng: &mut Rng, n: usize) -> String {
    random_word(rng).chars().take(n).collect()
}

fn random_ratio_text(rng: &mut Rng) -> String {
    RATIOS[rng.usize(..RATIOS.len())].to_string()
}

fn random_leaf(rng: &mut Rng) -> Filter {
    match rng.usize(0..3) {
        0 => random_text_leaf(rng),
        1 => random_uint_leaf(rng),
        _ => random_float_or_time_leaf(rng),
    }
}

fn random_uint_leaf(rng: &mut Rng) -> Filter {
    let (field, max) = match rng.u8(0..3) {
        0 => ("small", 255),
        1 => ("mid", 100_000),
        _ => ("big", u64::MAX),
    };
    let n = rng.u64(0..max.min(100_000));
    match rng.usize(0..11) {
        0 => Filter::exact(field, n.to_string()),
        1 => Filter::phrase(field, n.to_string()),
        2 => Filter::prefix(field, rng.u64(1..20).to_string()),
        3 => Filter::exact_prefix(field, rng.u64(1..20).to_string()),
        4 => Filter::range(field, n as f64, n as f64 + rng.u64(0..50_000) as f64),
        5 => Filter::range("big", 1e12, f64::INFINITY),
        6 => Filter::in_values(field, [n.to_string(), "0".to_string(), "nope".to_string()]),
        7 => Filter::string_range(field, "1", "5"),
        8 => Filter::len_range(field, rng.u64(0..4), rng.u64(2..21)),
        9 => Filter::sequence(field, [n.to_string()]),
        _ => Filter::regexp(field, "1.*").expect("regexp"),
    }
}

fn random_float_or_time_leaf(rng: &mut Rng) -> Filter {
    if rng.bool() {
        return match rng.usize(0..10) {
            0 => Filter::exact("ratio", random_ratio_text(rng)),
            1 => Filter::phrase("ratio", random_ratio_text(rng)),
            2 => Filter::phrase("ratio", ["1", "5", "0", "-", ".", "25"][rng.usize(..6)]),
            3 => Filter::prefix("ratio", ["1.", "1", "-3", "100.1"][rng.usize(..4)]),
            4 => Filter::exact_prefix("ratio", ["1", "1.", "10", "-"][rng.usize(..4)]),
            5 => Filter::range("ratio", -5.0 + rng.f64() * 10.0, rng.f64() * 200.0),
            6 => Filter::in_values("ratio", [random_ratio_text(rng), "2.250".to_string()]),
            7 => Filter::sequence("ratio", ["1", "5"]),
            8 => Filter::len_range("ratio", 1, rng.u64(1..6)),
            _ => Filter::any_case_phrase("ratio", random_ratio_text(rng)),
        };
    }
    let ts = timestamp_iso8601_string(random_nanos(rng));
    match rng.usize(0..9) {
        0 => Filter::exact("seen", ts),
        1 => Filter::phrase("seen", ts),
        2 => Filter::phrase("seen", "2024-01"),
        3 => Filter::prefix("seen", ts[..rng.usize(1..ts.len())].to_string()),
        4 => Filter::exact_prefix("seen", ts[..rng.usize(1..ts.len())].to_string()),
        5 => Filter::in_values("seen", [ts, "2024-13-01T00:00:00.000Z".to_string()]),
        6 => Filter::string_range("seen", "2024-01-03", "2024-01-05"),
        7 => Filter::any_case_prefix("seen", "2024-01-03t"),
        _ => {
            let lo = rng.i64(0..ROWS as i64);
            Filter::time(lo, lo + rng.i64(0..40))
        }
    }
}

fn random_text_leaf(rng: &mut Rng) -> Filter {
    let field = if rng.bool() { "msg" } else { "level" };
    match rng.usize(0..14) {
        0 => Filter::phrase(field, random_word(rng)),
        1 => Filter::prefix(field, random_head(rng, 2)),
        2 => Filter::exact(field, random_word(rng)),
        3 => Filter::exact_prefix(field, random_head(rng, 1)),
        4 => Filter::any_case_phrase(field, random_word(rng).to_uppercase()),
        5 => Filter::sequence(field, [random_word(rng), random_word(rng)]),
        6 => Filter::in_values(field, [random_word(rng), random_word(rng)]),
        7 => Filter::exact("code", rng.u64(0..1000).to_string()),
        8 => {
            let lo = rng.u64(0..1000) as f64;
            Filter::range("code", lo, lo + rng.u64(0..300) as f64)
        }
        9 => Filter::prefix("code", rng.u64(1..100).to_string()),
        10 => Filter::ipv4_range("ip", 0x0a00_0000 | rng.u32(0..8), 0x0a00_0008 | rng.u32(0..8)),
        11 => Filter::phrase("ip", format!("10.0.0.{}", rng.u32(0..16))),
        12 => Filter::len_range(field, rng.u64(0..5), rng.u64(3..20)),
        _ => Filter::regexp(field, "[fb].*").expect("regexp"),
    }
}

fn random_filter(rng: &mut Rng, depth: usize) -> Filter {
    if depth == 0 || rng.usize(0..3) == 0 {
        return random_leaf(rng);
    }
    let children = |rng: &mut Rng| -> Vec<Filter> {
        (0..rng.usize(1..4))
            .map(|_| random_filter(rng, depth - 1))
            .collect()
    };
    match rng.usize(0..3) {
        0 => Filter::and(children(rng)),
        1 => Filter::or(children(rng)),
        _ => Filter::not(random_filter(rng, depth - 1)),
    }
}

/// Evaluate `filter` one row at a time, each row in a block of its own.
fn per_row(filter: &Filter, singles: &[MemBlock], config: &SearchConfig) -> Bitmap {
    let mut expected = Bitmap::new(singles.len());
    for (i, block) in singles.iter().enumerate() {
        if search_block(filter, block, config).is_set_bit(0) {
            expected.set_bit(i);
        }
    }
    expected
}

#[test]
fn block_evaluation_matches_per_row_evaluation() {
    let mut rng = Rng::with_seed(0x5eed_0001);
    let rows = Rows::random(&mut rng);
    let block = rows.block(0..ROWS);
    let singles: Vec<MemBlock> = (0..ROWS).map(|i| rows.block(i..i + 1)).collect();
    let config = SearchConfig::default();

    for _ in 0..FILTERS {
        let filter = random_filter(&mut rng, 3);
        let got = search_block(&filter, &block, &config);
        let want = per_row(&filter, &singles, &config);
        assert_eq!(*got, want, "filter: {filter}");
    }
}

/// Evaluate composites without short-circuits: every child sees the full input.
fn naive(filter: &Filter, bs: &BlockSearch<'_>, input: &Bitmap) -> Bitmap {
    match filter {
        Filter::And(and) => {
            let mut result = input.clone();
            for child in and.filters() {
                let mut rejected = input.clone();
                rejected.and_not(&naive(child, bs, input));
                result.and_not(&rejected);
            }
            result
        }
        Filter::Or(or) => {
            let mut result = Bitmap::new(input.len());
            for child in or.filters() {
                result.or(&naive(child, bs, input));
            }
            result
        }
        Filter::Not(not) => {
            let mut result = input.clone();
            result.and_not(&naive(not.filter(), bs, input));
            result
        }
        leaf => {
            let mut result = input.clone();
            leaf.apply(bs, &mut result);
            result
        }
    }
}

#[test]
fn short_circuits_match_naive_evaluation() {
    let mut rng = Rng::with_seed(0x5eed_0004);
    let rows = Rows::random(&mut rng);
    let block = rows.block(0..ROWS);
    let config = SearchConfig::default();
    let bs = BlockSearch::new(&block, &config);

    for _ in 0..FILTERS {
        let filter = random_filter(&mut rng, 3);
        let mut input = Bitmap::new(ROWS);
        for i in 0..ROWS {
            if rng.u8(0..4) != 0 {
                input.set_bit(i);
            }
        }
        let mut got = input.clone();
        filter.apply(&bs, &mut got);
        assert_eq!(got, naive(&filter, &bs, &input), "filter: {filter}");
    }
}

#[test]
fn bloom_gating_never_changes_results() {
    let mut rng = Rng::with_seed(0x5eed_0002);
    let rows = Rows::random(&mut rng);
    let block = rows.block(0..ROWS);
    let enabled = SearchConfig::default();
    let disabled = SearchConfig::default().with_bloom_filters(false);

    for _ in 0..FILTERS {
        let filter = random_filter(&mut rng, 2);
        let a = search_block(&filter, &block, &enabled);
        let b = search_block(&filter, &block, &disabled);
        assert_eq!(*a, *b, "filter: {filter}");
    }
}

#[test]
fn dict_columns_match_like_string_columns() {
    let mut rng = Rng::with_seed(0x5eed_0003);
    let rows = Rows::random(&mut rng);
    let block = rows.block(0..ROWS);
    let config = SearchConfig::default();

    let make: [fn(&str, &str) -> Filter; 12] = [
        |f, w| Filter::phrase(f, w),
        |f, w| Filter::prefix(f, w),
        |f, w| Filter::exact(f, w),
        |f, w| Filter::exact_prefix(f, w),
        |f, w| Filter::any_case_prefix(f, w),
        |f, w| Filter::string_range(f, w, "zzz"),
        |f, w| Filter::len_range(f, w.len() as u64, 20),
        |f, w| Filter::range(f, w.len() as f64, 50.0),
        |f, w| Filter::any_case_phrase(f, w.to_uppercase()),
        |f, w| Filter::sequence(f, [w, "bar"]),
        |f, w| Filter::in_values(f, [w, "baz"]),
        |f, w| Filter::regexp(f, &format!("{w}.*")).expect("regexp"),
    ];
    for word in WORDS {
        for build in &make {
            let via_dict = search_block(&build("level", word), &block, &config);
            let via_string = search_block(&build("level_raw", word), &block, &config);
            assert_eq!(*via_dict, *via_string, "filter: {}", build("level", word));
        }
    }
}
