//! Cache counters and occupancy snapshot.

/// Point-in-time view of the cache's counters.
///
/// Counters are monotonically increasing event totals; `current_size` and
/// `entry_count` reflect occupancy at the moment of the snapshot.
///
/// # Example
///
/// ```
/// use segmented_cache::{Cache, CacheValue};
///
/// struct Blob(Vec<u8>);
///
/// impl CacheValue for Blob {}
///
/// let cache: Cache<Blob> = Cache::new(1024);
/// cache.put("a", Blob(vec![1, 2, 3]));
/// cache.get("a");
/// cache.get("b");
///
/// let metrics = cache.metrics();
/// assert_eq!(metrics.hit_rate(), 0.5);
/// assert_eq!(metrics.total_accesses(), 2);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
	/// Lookups that found a live entry.
	pub hits: u64,
	/// Lookups that found nothing, or only an expired entry on `get`.
	pub misses: u64,
	/// Entries inserted under a previously vacant key.
	pub inserts: u64,
	/// Entries that replaced an existing key.
	pub updates: u64,
	/// Entries evicted by the shrink protocol.
	pub evictions: u64,
	/// Entries removed via `delete` or `delete_prefix`.
	pub removals: u64,
	/// Summed weight of cached entries at snapshot time.
	pub current_size: u64,
	/// The enforced aggregate weight bound.
	pub capacity: u64,
	/// Number of cached entries at snapshot time.
	pub entry_count: usize,
}

impl CacheMetrics {
	/// Fraction of lookups that hit, between 0.0 and 1.0. Zero when there
	/// have been no lookups.
	pub fn hit_rate(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	/// Fraction of the weight budget in use, between 0.0 and 1.0.
	pub fn utilization(&self) -> f64 {
		if self.capacity == 0 {
			0.0
		} else {
			self.current_size as f64 / self.capacity as f64
		}
	}

	/// Total lookups, hit or miss.
	pub fn total_accesses(&self) -> u64 {
		self.hits + self.misses
	}

	/// Total writes, inserts and updates combined.
	pub fn total_writes(&self) -> u64 {
		self.inserts + self.updates
	}
}
