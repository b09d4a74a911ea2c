//! Record walker benchmarks
//!
//! Measures decoding and formatting throughput over synthetic NET_RT_FLAGS
//! dumps of increasing size.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sonic_arpdump::wire::{RecordBuilder, encode_dump};
use sonic_arpdump::{
    EntryFormatter, Filter, FormatContext, RawSnapshot, RecordWalker, StaticHosts,
    StaticInterfaces,
};
use std::hint::black_box;
use std::net::Ipv4Addr;

fn synthetic_dump(entries: usize) -> Vec<u8> {
    let records: Vec<_> = (0..entries)
        .map(|i| {
            RecordBuilder::new(Ipv4Addr::from(0x0a00_0000 + i as u32))
                .index((i % 4) as u16 + 1)
                .expire(if i % 3 == 0 { 0 } else { 10_000 })
                .lladdr(&[0x02, 0, 0, 0, (i >> 8) as u8, i as u8])
        })
        .collect();
    encode_dump(&records)
}

/// Decode only
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_records");

    for entries in [10, 100, 1000, 10000] {
        let dump = synthetic_dump(entries);
        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &dump, |b, dump| {
            b.iter(|| {
                let count = RawSnapshot::new(dump.clone())
                    .records()
                    .filter(|r| r.is_ok())
                    .count();
                black_box(count);
            });
        });
    }

    group.finish();
}

/// Walk and format every entry
fn bench_walk_and_format(c: &mut Criterion) {
    let hosts = StaticHosts::new();
    let ifs = StaticInterfaces::new()
        .with(1, "em0")
        .with(2, "em1")
        .with(3, "vlan10")
        .with(4, "bridge0");
    let mut group = c.benchmark_group("walk_and_format");

    for entries in [100, 1000, 10000] {
        let dump = synthetic_dump(entries);
        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &dump, |b, dump| {
            b.iter(|| {
                let walker = RecordWalker::new(&ifs);
                let formatter = EntryFormatter::new(&hosts, &ifs);
                let mut ctx = FormatContext::new(false).with_baseline(5_000);
                let mut bytes = 0;
                walker
                    .enumerate(RawSnapshot::new(dump.clone()), &Filter::default(), |r| {
                        bytes += formatter.format(r, &mut ctx).len();
                        Ok(())
                    })
                    .expect("synthetic dump decodes");
                black_box(bytes);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_walk_and_format);
criterion_main!(benches);
