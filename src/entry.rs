use std::fmt;
use std::ops::Deref;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::list::Node;
use crate::traits::CacheValue;

/// Current wall-clock time as whole unix seconds.
pub(crate) fn unix_now() -> i64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_or(0, |elapsed| elapsed.as_secs() as i64)
}

/// One cached item: the owned key, the value, expiry bookkeeping, and a
/// back-pointer to its node in the segment's recency list.
///
/// Entries are shared through `Arc`: the segment index and the list node each
/// hold one reference, and every `EntryRef` handed to a caller holds another.
/// The value's removal hook runs in `drop`, once the last reference is gone.
pub(crate) struct Entry<T: CacheValue> {
	key: Arc<str>,
	value: T,
	expires_at: i64,
	weight: u32,
	hits: AtomicU8,
	/// Non-owning pointer to this entry's list node. Written only under the
	/// list mutex (or before the entry is published), null once the node has
	/// been taken off the list.
	node: AtomicPtr<Node<T>>,
}

impl<T: CacheValue> Entry<T> {
	pub(crate) fn new(key: &str, value: T, ttl: Duration, weight: u32) -> Self {
		let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
		Self {
			key: Arc::from(key),
			value,
			expires_at: unix_now().saturating_add(ttl),
			weight,
			hits: AtomicU8::new(0),
			node: AtomicPtr::new(ptr::null_mut()),
		}
	}

	pub(crate) fn key(&self) -> &str {
		&self.key
	}

	/// The key allocation, shared with the segment index.
	pub(crate) fn key_shared(&self) -> Arc<str> {
		Arc::clone(&self.key)
	}

	pub(crate) fn value(&self) -> &T {
		&self.value
	}

	pub(crate) fn weight(&self) -> u32 {
		self.weight
	}

	/// Remaining time to live in seconds, negative once past expiry.
	pub(crate) fn ttl(&self) -> i64 {
		self.expires_at - unix_now()
	}

	pub(crate) fn expired(&self) -> bool {
		self.ttl() <= 0
	}

	/// Count a hit and return the post-increment (wrapping) total.
	pub(crate) fn hit(&self) -> u8 {
		self.hits.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
	}

	pub(crate) fn set_node(&self, node: *mut Node<T>) {
		self.node.store(node, Ordering::Release);
	}

	pub(crate) fn node_ptr(&self) -> *mut Node<T> {
		self.node.load(Ordering::Acquire)
	}

	pub(crate) fn clear_node(&self) {
		self.node.store(ptr::null_mut(), Ordering::Release);
	}
}

impl<T: CacheValue> Drop for Entry<T> {
	fn drop(&mut self) {
		// The node is always detached before the last reference can drop.
		debug_assert!(self.node.load(Ordering::Acquire).is_null());
		self.value.on_removed();
	}
}

/// Shared handle to a cached entry.
///
/// The handle keeps the entry alive even after it has been deleted, replaced,
/// or evicted; the value (and its removal hook) is destroyed once the cache
/// and every handle have let go. Holds no locks, so it is safe to retain.
///
/// Dereferences to the cached value.
pub struct EntryRef<T: CacheValue> {
	entry: Arc<Entry<T>>,
}

impl<T: CacheValue> EntryRef<T> {
	pub(crate) fn new(entry: Arc<Entry<T>>) -> Self {
		Self { entry }
	}

	/// The key this entry was stored under.
	pub fn key(&self) -> &str {
		self.entry.key()
	}

	/// The cached value.
	pub fn value(&self) -> &T {
		self.entry.value()
	}

	/// Remaining time to live in seconds. Negative for expired entries.
	pub fn ttl(&self) -> i64 {
		self.entry.ttl()
	}

	/// Whether the entry's time to live has elapsed.
	pub fn expired(&self) -> bool {
		self.entry.expired()
	}

	/// The weight this entry contributes to its segment's size.
	pub fn weight(&self) -> u32 {
		self.entry.weight()
	}
}

impl<T: CacheValue> Clone for EntryRef<T> {
	fn clone(&self) -> Self {
		Self {
			entry: Arc::clone(&self.entry),
		}
	}
}

impl<T: CacheValue> Deref for EntryRef<T> {
	type Target = T;

	fn deref(&self) -> &T {
		self.entry.value()
	}
}

impl<T: CacheValue + fmt::Debug> fmt::Debug for EntryRef<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EntryRef")
			.field("key", &self.key())
			.field("value", self.value())
			.field("ttl", &self.ttl())
			.finish()
	}
}
