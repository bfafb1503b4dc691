use crate::cache::Cache;
use crate::error::ConfigError;
use crate::traits::CacheValue;

pub(crate) const DEFAULT_MAX_SIZE: u32 = 8000;
pub(crate) const DEFAULT_SEGMENT_COUNT: usize = 8;
pub(crate) const DEFAULT_GETS_PER_PROMOTE: u8 = 5;
pub(crate) const DEFAULT_SHRINK_RATIO: f64 = 0.2;

/// Builder for configuring a [`Cache`].
///
/// # Example
///
/// ```
/// use segmented_cache::{CacheBuilder, CacheValue};
///
/// struct Blob(Vec<u8>);
///
/// impl CacheValue for Blob {}
///
/// let cache = CacheBuilder::new(64_000)
///     .segments(16)
///     .gets_per_promote(3)
///     .shrink_ratio(0.25)
///     .build::<Blob>()
///     .expect("configuration is valid");
/// # drop(cache);
/// ```
pub struct CacheBuilder {
	max_size: u32,
	segment_count: usize,
	gets_per_promote: u8,
	shrink_ratio: f64,
}

impl CacheBuilder {
	/// Start from the defaults with the given aggregate weight budget.
	pub fn new(max_size: u32) -> Self {
		Self {
			max_size,
			segment_count: DEFAULT_SEGMENT_COUNT,
			gets_per_promote: DEFAULT_GETS_PER_PROMOTE,
			shrink_ratio: DEFAULT_SHRINK_RATIO,
		}
	}

	/// Number of segments the key space is split across. Must be a power of
	/// two. More segments reduce lock contention but fragment the budget.
	pub fn segments(mut self, count: usize) -> Self {
		self.segment_count = count;
		self
	}

	/// How many hits an entry takes between promotions to the head of its
	/// segment's recency list. Values below 1 are clamped to 1.
	pub fn gets_per_promote(mut self, gets: u8) -> Self {
		self.gets_per_promote = gets;
		self
	}

	/// Fraction of a segment's budget freed when it overflows, in `(0, 1]`.
	pub fn shrink_ratio(mut self, ratio: f64) -> Self {
		self.shrink_ratio = ratio;
		self
	}

	/// Validate the configuration and construct the cache.
	pub fn build<T: CacheValue>(self) -> Result<Cache<T>, ConfigError> {
		if !self.segment_count.is_power_of_two() {
			return Err(ConfigError::SegmentCountNotPow2(self.segment_count));
		}
		if !(self.shrink_ratio > 0.0 && self.shrink_ratio <= 1.0) {
			return Err(ConfigError::ShrinkRatioInvalid(self.shrink_ratio));
		}
		Ok(Cache::with_settings(
			self.max_size,
			self.segment_count,
			self.gets_per_promote,
			self.shrink_ratio,
		))
	}
}

impl Default for CacheBuilder {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_SIZE)
	}
}
