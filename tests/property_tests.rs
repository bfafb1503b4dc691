use proptest::prelude::*;
use segmented_cache::{Cache, CacheBuilder, CacheValue, PutOptions};

#[derive(Debug, Clone, PartialEq)]
struct TestValue(u64);

impl CacheValue for TestValue {}

#[derive(Debug, Clone)]
enum Op {
	Put(u8),
	Get(u8),
	Delete(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
	prop_oneof![
		(0u8..15).prop_map(Op::Put),
		(0u8..15).prop_map(Op::Get),
		(0u8..15).prop_map(Op::Delete),
	]
}

/// Reference model of a single-segment cache: most recent key first, weight 1
/// per entry, shrink from the back once the budget overflows.
struct LruModel {
	keys: Vec<String>,
	max_size: usize,
	target_size: usize,
}

impl LruModel {
	fn new(max_size: usize, target_size: usize) -> Self {
		Self {
			keys: Vec::new(),
			max_size,
			target_size,
		}
	}

	fn put(&mut self, key: &str) {
		self.keys.retain(|k| k != key);
		self.keys.insert(0, key.to_string());
		if self.keys.len() > self.max_size {
			self.keys.truncate(self.target_size);
		}
	}

	fn get(&mut self, key: &str) -> bool {
		match self.keys.iter().position(|k| k == key) {
			Some(at) => {
				let key = self.keys.remove(at);
				self.keys.insert(0, key);
				true
			}
			None => false,
		}
	}

	fn delete(&mut self, key: &str) {
		self.keys.retain(|k| k != key);
	}

	fn contains(&self, key: &str) -> bool {
		self.keys.iter().any(|k| k == key)
	}
}

proptest! {
	#[test]
	fn test_insert_get_consistency(keys in prop::collection::vec(0u64..100, 1..50)) {
		// Big enough that nothing is ever evicted.
		let cache: Cache<TestValue> = Cache::new(1_000_000);

		for key in &keys {
			cache.put(&format!("k{key}"), TestValue(*key));
		}

		for key in &keys {
			let entry = cache.get(&format!("k{key}"));
			prop_assert_eq!(entry.map(|e| e.0), Some(*key));
		}
	}

	#[test]
	fn test_size_never_exceeds_effective_bound(
		ops in prop::collection::vec((0u64..40, 1u32..10), 1..120)
	) {
		let cache: Cache<TestValue> = CacheBuilder::new(200)
			.segments(4)
			.build()
			.expect("valid configuration");

		for (key, weight) in ops {
			cache.put_with(
				&format!("k{key}"),
				TestValue(key),
				PutOptions::default().weight(weight),
			);
			prop_assert!(cache.size() <= cache.max_size_effective());
		}
	}

	#[test]
	fn test_size_matches_weights_at_quiescence(
		ops in prop::collection::vec((0u64..30, 1u32..5), 1..60)
	) {
		let cache: Cache<TestValue> = Cache::new(1_000_000);

		for (key, weight) in &ops {
			cache.put_with(
				&format!("k{key}"),
				TestValue(*key),
				PutOptions::default().weight(*weight),
			);
		}

		// No evictions at this capacity: the size is the sum over the last
		// weight written per distinct key.
		let mut last_weight = std::collections::HashMap::new();
		for (key, weight) in &ops {
			last_weight.insert(*key, *weight);
		}
		let expected: u64 = last_weight.values().map(|w| *w as u64).sum();
		prop_assert_eq!(cache.size(), expected);
	}

	#[test]
	fn test_contains_after_put_and_not_after_delete(keys in prop::collection::vec(0u64..50, 1..40)) {
		let cache: Cache<TestValue> = Cache::new(1_000_000);

		for key in &keys {
			let k = format!("k{key}");
			cache.put(&k, TestValue(*key));
			prop_assert!(cache.contains(&k));
		}

		for key in &keys {
			let k = format!("k{key}");
			cache.delete(&k);
			prop_assert!(!cache.contains(&k));
		}

		prop_assert!(cache.is_empty());
		prop_assert_eq!(cache.size(), 0);
	}

	#[test]
	fn test_delete_prefix_leaves_no_matching_key(
		keys in prop::collection::vec("[ab][cd][ef]", 1..40),
		prefix in "[ab][cd]?"
	) {
		let cache: Cache<TestValue> = Cache::new(1_000_000);

		for (i, key) in keys.iter().enumerate() {
			cache.put(key, TestValue(i as u64));
		}

		let matching: std::collections::HashSet<&String> =
			keys.iter().filter(|k| k.starts_with(&prefix)).collect();
		let removed = cache.delete_prefix(&prefix);

		prop_assert_eq!(removed, matching.len());
		for key in &keys {
			prop_assert_eq!(cache.contains(key), !key.starts_with(&prefix));
		}
	}

	#[test]
	fn test_single_segment_matches_lru_model(ops in prop::collection::vec(op_strategy(), 1..200)) {
		// One segment, promotion on every hit: the cache must agree with a
		// strict LRU reference model. max_size 10, shrink_ratio 0.2 keeps
		// target_size at 8.
		let cache: Cache<TestValue> = CacheBuilder::new(10)
			.segments(1)
			.gets_per_promote(1)
			.build()
			.expect("valid configuration");
		let mut model = LruModel::new(10, 8);

		for op in ops {
			match op {
				Op::Put(k) => {
					let key = format!("k{k}");
					cache.put(&key, TestValue(k as u64));
					model.put(&key);
				}
				Op::Get(k) => {
					let key = format!("k{k}");
					let hit = cache.get(&key).is_some();
					prop_assert_eq!(hit, model.get(&key));
				}
				Op::Delete(k) => {
					let key = format!("k{k}");
					cache.delete(&key);
					model.delete(&key);
				}
			}

			for k in 0u8..15 {
				let key = format!("k{k}");
				prop_assert_eq!(cache.contains(&key), model.contains(&key));
			}
			prop_assert_eq!(cache.len(), model.keys.len());
		}
	}
}
