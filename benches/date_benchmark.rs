use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use goodreads_client::{parse_timestamp, relative_label_at, short_date};
use rand::{thread_rng, Rng};

fn random_timestamps(count: usize, legacy: bool) -> Vec<String> {
    let mut rng = thread_rng();
    let origin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

    (0..count)
        .map(|_| {
            let stamp = origin - Duration::minutes(rng.gen_range(0..5_000_000));
            if legacy {
                stamp.format("%a %b %d %H:%M:%S %z %Y").to_string()
            } else {
                stamp.to_rfc3339()
            }
        })
        .collect()
}

pub fn date_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("date_utility");
    let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

    // The legacy format is only tried after RFC 3339 fails
    for legacy in [false, true] {
        let stamps = random_timestamps(1000, legacy);
        let label = if legacy { "legacy" } else { "rfc3339" };

        group.bench_with_input(BenchmarkId::new("parse", label), &stamps, |b, stamps| {
            b.iter(|| {
                for stamp in stamps {
                    black_box(parse_timestamp(stamp).ok());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("relative", label), &stamps, |b, stamps| {
            b.iter(|| {
                for stamp in stamps {
                    black_box(relative_label_at(stamp, now));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("short", label), &stamps, |b, stamps| {
            b.iter(|| {
                for stamp in stamps {
                    black_box(short_date(stamp));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, date_benchmark);
criterion_main!(benches);
