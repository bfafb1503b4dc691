use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use ahash::RandomState;

use crate::builder::{DEFAULT_GETS_PER_PROMOTE, DEFAULT_SEGMENT_COUNT, DEFAULT_SHRINK_RATIO};
use crate::entry::EntryRef;
use crate::metrics::CacheMetrics;
use crate::segment::{FetchResult, Segment};
use crate::traits::CacheValue;

/// Per-insert settings.
///
/// ```
/// use std::time::Duration;
/// use segmented_cache::PutOptions;
///
/// let options = PutOptions::default()
///     .ttl(Duration::from_secs(60))
///     .weight(8);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PutOptions {
	ttl: Duration,
	weight: u32,
}

impl PutOptions {
	/// Time to live, measured from insertion and truncated to whole seconds.
	/// A zero TTL produces an entry that is already expired.
	pub fn ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;
		self
	}

	/// Weight charged against the size bound. Ignored when the value type
	/// derives its own weight.
	pub fn weight(mut self, weight: u32) -> Self {
		self.weight = weight;
		self
	}
}

impl Default for PutOptions {
	/// 300 second TTL, weight 1.
	fn default() -> Self {
		Self {
			ttl: Duration::from_secs(300),
			weight: 1,
		}
	}
}

/// Thread-safe, expiration-aware cache with segmented LRU eviction.
///
/// Keys are strings; values are any type implementing [`CacheValue`]. The key
/// space is split across a power-of-two number of segments, each with its own
/// lock, index, recency list, and slice of the size budget. Recency is
/// therefore maintained per segment, and entries are promoted only every
/// `gets_per_promote` hits, so ordering is LRU-like rather than strict LRU.
///
/// Share across threads with `Arc<Cache<T>>`. All methods take `&self`.
///
/// Dropping the cache releases every entry, running each value's removal hook
/// once no outstanding [`EntryRef`] keeps it alive.
pub struct Cache<T: CacheValue> {
	segments: Box<[Segment<T>]>,
	segment_mask: usize,
	hasher: RandomState,
	per_segment_max: u32,
	hits: AtomicU64,
	misses: AtomicU64,
	inserts: AtomicU64,
	updates: AtomicU64,
	evictions: AtomicU64,
	removals: AtomicU64,
}

impl<T: CacheValue> Cache<T> {
	/// Create a cache with the given aggregate weight budget and default
	/// settings. Use [`crate::CacheBuilder`] to tune segmentation, promotion
	/// cadence, or the shrink ratio.
	pub fn new(max_size: u32) -> Self {
		Self::with_settings(
			max_size,
			DEFAULT_SEGMENT_COUNT,
			DEFAULT_GETS_PER_PROMOTE,
			DEFAULT_SHRINK_RATIO,
		)
	}

	/// Construct from settings the builder has already validated.
	pub(crate) fn with_settings(
		max_size: u32,
		segment_count: usize,
		gets_per_promote: u8,
		shrink_ratio: f64,
	) -> Self {
		let per_segment_max = (max_size as u64 / segment_count as u64) as u32;
		let shrink_by = (per_segment_max as f64 * shrink_ratio) as u32;
		let target_size = per_segment_max - shrink_by;

		let segments: Vec<Segment<T>> = (0..segment_count)
			.map(|_| Segment::new(per_segment_max, target_size, gets_per_promote))
			.collect();

		Self {
			segments: segments.into_boxed_slice(),
			segment_mask: segment_count - 1,
			hasher: RandomState::new(),
			per_segment_max,
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
			inserts: AtomicU64::new(0),
			updates: AtomicU64::new(0),
			evictions: AtomicU64::new(0),
			removals: AtomicU64::new(0),
		}
	}

	/// Whether the key is present, expired or not.
	pub fn contains(&self, key: &str) -> bool {
		self.segment(key).contains(key)
	}

	/// Look up a live entry. An expired entry is removed on sight and
	/// reported as a miss.
	pub fn get(&self, key: &str) -> Option<EntryRef<T>> {
		let entry = self.segment(key).get(key);
		self.count_lookup(entry.is_some());
		entry
	}

	/// Look up an entry without expiring it; expired entries come back as-is.
	/// Check [`EntryRef::expired`] before trusting the value.
	pub fn peek(&self, key: &str) -> Option<EntryRef<T>> {
		let entry = self.segment(key).peek(key);
		self.count_lookup(entry.is_some());
		entry
	}

	/// Insert with the default TTL and weight, replacing any existing entry
	/// under the key.
	pub fn put(&self, key: &str, value: T) {
		self.put_with(key, value, PutOptions::default());
	}

	/// Insert with explicit per-entry settings.
	pub fn put_with(&self, key: &str, value: T, options: PutOptions) {
		let result = self.segment(key).put(key, value, options.ttl, options.weight);
		self.count_put(result.replaced, result.evicted);
	}

	/// Remove the entry under the key. Returns whether one was present.
	pub fn delete(&self, key: &str) -> bool {
		let deleted = self.segment(key).delete(key);
		if deleted {
			self.removals.fetch_add(1, Ordering::Relaxed);
		}
		deleted
	}

	/// Remove every entry whose key starts with the prefix, across all
	/// segments. Returns the number removed. Keys inserted concurrently may
	/// or may not survive.
	pub fn delete_prefix(&self, prefix: &str) -> usize {
		let removed: usize = self
			.segments
			.iter()
			.map(|segment| segment.delete_prefix(prefix))
			.sum();
		self.removals.fetch_add(removed as u64, Ordering::Relaxed);
		removed
	}

	/// Get the cached entry, or run the loader and cache what it returns.
	///
	/// The loader's error is propagated verbatim and nothing is cached on
	/// failure. `Ok(None)` from the loader is a cacheable-nothing: `fetch`
	/// returns `Ok(None)` and the cache is untouched. Concurrent fetches of
	/// the same missing key may each invoke the loader.
	pub fn fetch<F, E>(&self, key: &str, loader: F) -> Result<Option<EntryRef<T>>, E>
	where
		F: FnOnce(&str) -> Result<Option<T>, E>,
	{
		self.fetch_with(key, loader, PutOptions::default())
	}

	/// [`Cache::fetch`] with explicit per-entry settings for the inserted
	/// value.
	pub fn fetch_with<F, E>(
		&self,
		key: &str,
		loader: F,
		options: PutOptions,
	) -> Result<Option<EntryRef<T>>, E>
	where
		F: FnOnce(&str) -> Result<Option<T>, E>,
	{
		match self.segment(key).fetch(key, loader, options.ttl, options.weight)? {
			FetchResult::Hit(entry) => {
				self.hits.fetch_add(1, Ordering::Relaxed);
				Ok(Some(entry))
			}
			FetchResult::Loaded(result) => {
				self.misses.fetch_add(1, Ordering::Relaxed);
				self.count_put(result.replaced, result.evicted);
				Ok(Some(result.entry))
			}
			FetchResult::Missing => {
				self.misses.fetch_add(1, Ordering::Relaxed);
				Ok(None)
			}
		}
	}

	/// The enforced aggregate bound: per-segment budget times segment count.
	/// Can be below the configured `max_size` because the budget is divided
	/// with floor division.
	pub fn max_size_effective(&self) -> u64 {
		self.per_segment_max as u64 * self.segments.len() as u64
	}

	/// Summed weight of all cached entries.
	pub fn size(&self) -> u64 {
		self.segments.iter().map(Segment::current_size).sum()
	}

	/// Number of cached entries, expired ones included.
	pub fn len(&self) -> usize {
		self.segments.iter().map(Segment::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Snapshot of the cache's counters and occupancy.
	pub fn metrics(&self) -> CacheMetrics {
		CacheMetrics {
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
			inserts: self.inserts.load(Ordering::Relaxed),
			updates: self.updates.load(Ordering::Relaxed),
			evictions: self.evictions.load(Ordering::Relaxed),
			removals: self.removals.load(Ordering::Relaxed),
			current_size: self.size(),
			capacity: self.max_size_effective(),
			entry_count: self.len(),
		}
	}

	fn segment(&self, key: &str) -> &Segment<T> {
		let hash = self.hasher.hash_one(key);
		&self.segments[(hash as usize) & self.segment_mask]
	}

	fn count_lookup(&self, hit: bool) {
		if hit {
			self.hits.fetch_add(1, Ordering::Relaxed);
		} else {
			self.misses.fetch_add(1, Ordering::Relaxed);
		}
	}

	fn count_put(&self, replaced: bool, evicted: usize) {
		if replaced {
			self.updates.fetch_add(1, Ordering::Relaxed);
		} else {
			self.inserts.fetch_add(1, Ordering::Relaxed);
		}
		if evicted > 0 {
			self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
		}
	}
}
