//! Benchmarks for extraction and statistics
//!
//! Measures the per-page fold, gap counting over shuffled leaf levels, and
//! statistics over many rows, all from in-memory records.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spaceanalyzer::extract::{count_gaps, extract_object};
use spaceanalyzer::{
    FileInfo, MemorySource, PageNumber, PageType, RawPageRecord, SchemaObject, Selector,
    SpaceAnalyzer,
};

const PAGE_SIZE: u64 = 4096;

fn leaf(object: &str, page: u64) -> RawPageRecord {
    RawPageRecord {
        object_name: object.to_string(),
        page_number: PageNumber(page),
        page_type: PageType::Leaf,
        cell_count: 40,
        payload_bytes: 3600,
        unused_bytes: 200,
        max_cell_payload: 120,
        structural_path: format!("/{:03x}/", page % 0x1000),
        page_size_on_disk: PAGE_SIZE,
    }
}

/// Page numbers visited in a scattered but deterministic order
fn scattered(count: u64) -> Vec<u64> {
    (0..count).map(|i| (i * 7919) % count + 2).collect()
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_object");
    let object = SchemaObject::table("t");

    for pages in [100u64, 10_000, 100_000] {
        let records: Vec<RawPageRecord> = scattered(pages).into_iter().map(|p| leaf("t", p)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(pages), &records, |b, records| {
            b.iter(|| black_box(extract_object(&object, false, records)));
        });
    }
    group.finish();
}

fn bench_count_gaps(c: &mut Criterion) {
    let mut pages: Vec<PageNumber> = scattered(100_000).into_iter().map(PageNumber).collect();
    pages.sort_unstable();
    c.bench_function("count_gaps_100k", |b| b.iter(|| black_box(count_gaps(&pages))));
}

fn bench_stats(c: &mut Criterion) {
    let objects = 500u64;
    let pages_per_object = 20u64;
    let mut source = MemorySource::new(FileInfo {
        page_size: PAGE_SIZE,
        page_count: objects * pages_per_object + 1,
        ..Default::default()
    });
    for i in 0..objects {
        let name = format!("t{i}");
        source.add_object(SchemaObject::table(name.clone()));
        for p in 0..pages_per_object {
            source.add_page(leaf(&name, 2 + i * pages_per_object + p));
        }
    }
    let analyzer = SpaceAnalyzer::from_source(&source).unwrap();

    let mut group = c.benchmark_group("stats");
    group.bench_function("everything", |b| {
        b.iter(|| black_box(analyzer.stats(&Selector::Everything).unwrap()))
    });
    group.bench_function("single_table", |b| {
        b.iter(|| black_box(analyzer.stats(&Selector::TableWithIndices("t250".into())).unwrap()))
    });
    group.bench_function("table_space_usage", |b| {
        b.iter(|| black_box(analyzer.table_space_usage()))
    });
    group.finish();
}

criterion_group!(benches, bench_extract, bench_count_gaps, bench_stats);
criterion_main!(benches);
