use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;

use keyed_hash_collections::{KeyAdapter, OpenAddressedTable, TableConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    id: u64,
    value: u64,
}

struct EntryById;
impl KeyAdapter<Entry> for EntryById {
    type Key = u64;
    fn key_of(value: &Entry) -> u64 {
        value.id
    }
}

type Table = OpenAddressedTable<Entry, EntryById>;

fn populated(size: u64) -> Table {
    let table = Table::new(TableConfig::with_capacity(size as usize)).unwrap();
    for id in 0..size {
        table.put(Entry { id, value: id }).unwrap();
    }
    table
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_addressed_get");
    for &size in &[1_000u64, 10_000, 100_000] {
        let table = populated(size);
        let mut rng = rand::rng();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let key = rng.random_range(0..size);
                black_box(table.get(&key).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_addressed_put");
    for &size in &[1_000u64, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || Table::new(TableConfig::with_capacity(size as usize)).unwrap(),
                |table| {
                    for id in 0..size {
                        table.put(Entry { id, value: id }).unwrap();
                    }
                    black_box(table)
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn bench_rehash_churn(c: &mut Criterion) {
    c.bench_function("open_addressed_put_remove_churn", |b| {
        let table = Table::new(TableConfig::with_capacity(16)).unwrap();
        b.iter(|| {
            for id in 0..256u64 {
                table.put(Entry { id, value: id }).unwrap();
            }
            for id in 0..256u64 {
                table.remove_key(&id).unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_get, bench_put, bench_rehash_churn);
criterion_main!(benches);
