use analyzemcp::models::domain::PacketRecord;
use analyzemcp::stats::ProtocolStats;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn records(n: usize) -> Vec<PacketRecord> {
    (0..n)
        .map(|i| {
            let protocol = match i % 3 {
                0 => "MCP-1",
                1 => "MCP-2",
                _ => "MCP-3",
            };
            PacketRecord::new(protocol, (i % 512) as u64)
        })
        .collect()
}

fn bench_aggregation(c: &mut Criterion) {
    let small = records(100);
    let large = records(10_000);

    c.bench_function("from_records/100", |b| {
        b.iter(|| ProtocolStats::from_records(black_box(&small)))
    });
    c.bench_function("from_records/10k", |b| {
        b.iter(|| ProtocolStats::from_records(black_box(&large)))
    });
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
