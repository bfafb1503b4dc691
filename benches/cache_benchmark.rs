use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use segmented_cache::{Cache, CacheBuilder, CacheValue};

struct BenchValue {
	data: Vec<u8>,
}

impl CacheValue for BenchValue {
	fn weight(&self) -> Option<u32> {
		Some(self.data.len() as u32)
	}
}

fn keys(count: u64) -> Vec<String> {
	(0..count).map(|i| format!("key:{i}")).collect()
}

fn bench_put(c: &mut Criterion) {
	let mut group = c.benchmark_group("put");

	for size in [100u64, 1000, 10000] {
		group.throughput(Throughput::Elements(size));
		group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
			let keys = keys(size);
			b.iter(|| {
				let cache: Cache<BenchValue> = Cache::new(1_000_000);
				for key in &keys {
					cache.put(
						black_box(key),
						BenchValue {
							data: vec![0u8; 64],
						},
					);
				}
			});
		});
	}

	group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
	let mut group = c.benchmark_group("get_hit");

	for size in [100u64, 1000, 10000] {
		group.throughput(Throughput::Elements(size));
		group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
			let keys = keys(size);
			let cache: Cache<BenchValue> = Cache::new(1_000_000);
			for key in &keys {
				cache.put(
					key,
					BenchValue {
						data: vec![0u8; 64],
					},
				);
			}
			b.iter(|| {
				for key in &keys {
					black_box(cache.get(black_box(key)));
				}
			});
		});
	}

	group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
	let mut group = c.benchmark_group("mixed");
	let size = 10_000u64;
	group.throughput(Throughput::Elements(size));

	group.bench_function("one_put_per_eight_gets", |b| {
		let keys = keys(size);
		let cache: Cache<BenchValue> = CacheBuilder::new(500_000)
			.segments(16)
			.build()
			.expect("valid configuration");
		for key in &keys {
			cache.put(
				key,
				BenchValue {
					data: vec![0u8; 64],
				},
			);
		}
		b.iter(|| {
			for (i, key) in keys.iter().enumerate() {
				if i % 8 == 0 {
					cache.put(
						black_box(key),
						BenchValue {
							data: vec![0u8; 64],
						},
					);
				} else {
					black_box(cache.get(black_box(key)));
				}
			}
		});
	});

	group.finish();
}

fn bench_concurrent_get(c: &mut Criterion) {
	let mut group = c.benchmark_group("concurrent_get");
	let size = 10_000u64;
	group.throughput(Throughput::Elements(size * 4));

	group.bench_function("four_reader_threads", |b| {
		let keys = Arc::new(keys(size));
		let cache: Arc<Cache<BenchValue>> = Arc::new(Cache::new(1_000_000));
		for key in keys.iter() {
			cache.put(
				key,
				BenchValue {
					data: vec![0u8; 64],
				},
			);
		}
		b.iter(|| {
			let handles: Vec<_> = (0..4)
				.map(|_| {
					let cache = Arc::clone(&cache);
					let keys = Arc::clone(&keys);
					std::thread::spawn(move || {
						for key in keys.iter() {
							black_box(cache.get(key));
						}
					})
				})
				.collect();
			for handle in handles {
				handle.join().expect("reader does not panic");
			}
		});
	});

	group.finish();
}

criterion_group!(
	benches,
	bench_put,
	bench_get_hit,
	bench_mixed_workload,
	bench_concurrent_get
);
criterion_main!(benches);
