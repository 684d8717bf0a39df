use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logsieve::{search_block, Filter, MemBlock, SearchConfig, ValueType};

const ROWS: usize = 8_192;
const SEED: u64 = 584;

fn make_block() -> MemBlock {
    let mut rng = fastrand::Rng::with_seed(SEED);
    let msgs: Vec<String> = (0..ROWS)
        .map(|i| match rng.u8(0..4) {
            0 => format!("GET /api/v1/items/{i} 200"),
            1 => format!("POST /api/v1/orders failed: timeout after {}ms", rng.u16(..)),
            2 => "cache warmup complete".to_string(),
            _ => format!("user={} session={:x}", rng.u32(..), rng.u64(..)),
        })
        .collect();
    let levels: Vec<&str> = (0..ROWS)
        .map(|_| ["debug", "info", "warn", "error"][rng.usize(..4)])
        .collect();
    let codes: Vec<u64> = (0..ROWS).map(|_| rng.u64(100..600)).collect();
    let ips: Vec<u32> = (0..ROWS).map(|_| rng.u32(..)).collect();
    MemBlock::builder("bench", (0..ROWS as i64).collect())
        .string_column("_msg", &msgs)
        .dict_column("level", &levels)
        .uint_column("status", ValueType::Uint16, &codes)
        .ipv4_column("client", &ips)
        .build()
        .expect("bench block")
}

fn filters() -> Vec<(&'static str, Filter)> {
    vec![
        ("phrase", Filter::phrase("", "timeout")),
        ("phrase_absent", Filter::phrase("", "kernel")),
        ("prefix", Filter::prefix("", "warm")),
        ("any_case", Filter::any_case_phrase("", "FAILED")),
        ("dict_in", Filter::in_values("level", ["warn", "error"])),
        ("uint_range", Filter::range("status", 500.0, 599.0)),
        ("ipv4_range", Filter::ipv4_range("client", 0x0a00_0000, 0x0aff_ffff)),
        (
            "regexp",
            Filter::regexp("", r".*orders failed: timeout after \d{4}ms").expect("regexp"),
        ),
        (
            "composite",
            Filter::and([
                Filter::or([Filter::phrase("", "failed"), Filter::phrase("", "200")]),
                Filter::not(Filter::exact("level", "debug")),
                Filter::range("status", 200.0, 499.0),
            ]),
        ),
    ]
}

fn search(c: &mut Criterion) {
    let block = make_block();
    let config = SearchConfig::default();
    let no_bloom = SearchConfig::default().with_bloom_filters(false);

    let mut group = c.benchmark_group("search_block");
    group.throughput(Throughput::Elements(ROWS as u64));
    for (name, filter) in filters() {
        group.bench_with_input(BenchmarkId::new("bloom", name), &filter, |b, f| {
            b.iter(|| black_box(search_block(f, &block, &config).ones_count()))
        });
        group.bench_with_input(BenchmarkId::new("no_bloom", name), &filter, |b, f| {
            b.iter(|| black_box(search_block(f, &block, &no_bloom).ones_count()))
        });
    }
    group.finish();
}

criterion_group!(benches, search);
criterion_main!(benches);
