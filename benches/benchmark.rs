use std::{io::Cursor, num::NonZeroUsize};

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use station_stats::{
    accumulate, generate::measurements, parallel::process_buffer, process_reader, Config,
    NoProgress, SliceRecords,
};

pub fn benchmark(c: &mut Criterion) {
    let measurements = measurements(1_000_000, 1);

    let mut group = c.benchmark_group("station-stats");
    group.throughput(Throughput::Bytes(measurements.len() as u64));

    group.bench_function("slice", |b| {
        b.iter(|| black_box(accumulate(SliceRecords::new(&measurements, b';')).unwrap()))
    });
    group.bench_function("stream", |b| {
        b.iter(|| {
            black_box(
                process_reader(Cursor::new(&measurements), &Config::default(), &NoProgress)
                    .unwrap(),
            )
        })
    });
    for threads in [2, 4, 8] {
        let config = Config::default().with_threads(NonZeroUsize::new(threads).unwrap());
        group.bench_function(format!("parallel_{}", threads), |b| {
            b.iter(|| black_box(process_buffer(&measurements, &config, &NoProgress).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
