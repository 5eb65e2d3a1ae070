use std::{convert::Infallible, iter::repeat_with, sync::Arc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::{stream, TryStreamExt};
use spillgroup::{group_by, GroupByOption};
use tempfile::TempDir;

const ENTRIES: usize = 100_000;

fn gen_entries(key_range: u64) -> Vec<(u64, String)> {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    (0..ENTRIES)
        .map(|_| {
            let value = repeat_with(|| rng.alphanumeric()).take(32).collect();
            (rng.u64(0..key_range), value)
        })
        .collect()
}

#[inline(never)]
async fn run_group_by(entries: Vec<(u64, String)>, option: GroupByOption) -> usize {
    let input = stream::iter(entries.into_iter().map(Ok::<_, Infallible>));
    let groups = group_by(input, option).await.unwrap();

    groups
        .try_fold(0, |count, (_, values)| async move { Ok(count + values.len()) })
        .await
        .unwrap()
}

fn group_by_spill(c: &mut Criterion) {
    let runtime = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap(),
    );
    let temp_dir = TempDir::new().unwrap();
    let entries = gen_entries(10_000);

    let mut group = c.benchmark_group("group_by");
    group.throughput(Throughput::Elements(ENTRIES as u64));
    group.sample_size(10);

    // ENTRIES stays on the fast path, the rest spill
    for max_hashmap_entries in [ENTRIES, 10_000, 1_000] {
        for max_number_of_files in [4, 64] {
            let option = GroupByOption::from(temp_dir.path())
                .max_hashmap_entries(max_hashmap_entries)
                .max_number_of_files(max_number_of_files);

            group.bench_with_input(
                BenchmarkId::new(
                    format!("files_{max_number_of_files}"),
                    max_hashmap_entries,
                ),
                &option,
                |b, option| {
                    let r = runtime.clone();
                    b.to_async(&*r).iter(|| async {
                        let grouped = run_group_by(entries.clone(), option.clone()).await;
                        assert_eq!(grouped, ENTRIES);
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, group_by_spill);
criterion_main!(benches);
