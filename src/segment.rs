use std::ptr::NonNull;
use std::sync::Arc;
use std::time::Duration;

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::entry::{Entry, EntryRef};
use crate::list::{List, Node};
use crate::traits::CacheValue;

/// Outcome of a `put`, reported up to the cache facade.
pub(crate) struct PutResult<T: CacheValue> {
	pub(crate) entry: EntryRef<T>,
	pub(crate) replaced: bool,
	pub(crate) evicted: usize,
}

/// Outcome of a fetch-through lookup.
pub(crate) enum FetchResult<T: CacheValue> {
	/// The key was cached and live.
	Hit(EntryRef<T>),
	/// The loader produced a value that is now cached.
	Loaded(PutResult<T>),
	/// The loader reported no value for this key.
	Missing,
}

/// Index half of a segment, guarded by the segment's rwlock.
struct State<T: CacheValue> {
	index: HashMap<Arc<str>, Arc<Entry<T>>, RandomState>,
	/// Summed weight of every indexed entry. Mutated only under the write
	/// lock, and only for entries verifiably added to or removed from the
	/// index.
	size: u64,
}

/// One shard of the cache: a keyed index plus a recency list, each behind its
/// own lock.
///
/// The rwlock guards the index and the size counter; the mutex guards the
/// list's link pointers. When both are needed the rwlock is taken first, and
/// the mutex is never held while acquiring the rwlock. Entry destruction
/// (which runs the value's removal hook) always happens after both locks are
/// released.
pub(crate) struct Segment<T: CacheValue> {
	state: RwLock<State<T>>,
	list: Mutex<List<T>>,
	max_size: u64,
	target_size: u64,
	gets_per_promote: u8,
}

impl<T: CacheValue> Segment<T> {
	pub(crate) fn new(max_size: u32, target_size: u32, gets_per_promote: u8) -> Self {
		Self {
			state: RwLock::new(State {
				index: HashMap::default(),
				size: 0,
			}),
			list: Mutex::new(List::new()),
			max_size: max_size as u64,
			target_size: target_size as u64,
			gets_per_promote: gets_per_promote.max(1),
		}
	}

	pub(crate) fn contains(&self, key: &str) -> bool {
		self.state.read().index.contains_key(key)
	}

	/// Look up a live entry, expiring it on sight.
	pub(crate) fn get(&self, key: &str) -> Option<EntryRef<T>> {
		// The clone must happen under the read lock: once the lock is gone a
		// concurrent delete may drop the index reference, and the entry must
		// already be pinned for the caller by then.
		let entry = {
			let state = self.state.read();
			Arc::clone(state.index.get(key)?)
		};
		if entry.expired() {
			self.remove_if_current(key, &entry);
			return None;
		}
		self.record_hit(&entry);
		Some(EntryRef::new(entry))
	}

	/// Look up an entry without expiring it. Expired entries are returned
	/// as-is and keep their place in the recency list.
	pub(crate) fn peek(&self, key: &str) -> Option<EntryRef<T>> {
		let entry = {
			let state = self.state.read();
			Arc::clone(state.index.get(key)?)
		};
		if !entry.expired() {
			self.record_hit(&entry);
		}
		Some(EntryRef::new(entry))
	}

	/// Insert or replace. The replaced entry, if any, loses the cache's
	/// references; borrowers keep it alive until they drop their handles.
	pub(crate) fn put(&self, key: &str, value: T, ttl: Duration, weight: u32) -> PutResult<T> {
		let weight = value.weight().unwrap_or(weight);
		let entry = Arc::new(Entry::new(key, value, ttl, weight));
		let node = Box::into_raw(Box::new(Node::new(Arc::clone(&entry))));
		entry.set_node(node);

		let (displaced, size) = {
			let mut state = self.state.write();
			let displaced = state.index.insert(entry.key_shared(), Arc::clone(&entry));
			if let Some(old) = &displaced {
				state.size -= old.weight() as u64;
			}
			state.size += weight as u64;
			(displaced, state.size)
		};

		let replaced = displaced.is_some();
		if let Some(old) = displaced {
			self.detach(&old);
		}

		{
			let mut list = self.list.lock();
			// SAFETY: freshly boxed above and never linked.
			list.push_front(unsafe { NonNull::new_unchecked(node) });
		}

		let evicted = if size > self.max_size { self.shrink() } else { 0 };

		PutResult {
			entry: EntryRef::new(entry),
			replaced,
			evicted,
		}
	}

	pub(crate) fn delete(&self, key: &str) -> bool {
		let removed = {
			let mut state = self.state.write();
			let removed = state.index.remove(key);
			if let Some(entry) = &removed {
				state.size -= entry.weight() as u64;
			}
			removed
		};
		match removed {
			Some(entry) => {
				self.detach(&entry);
				true
			}
			None => false,
		}
	}

	/// Two-phase prefix deletion: collect matches under the read lock, then
	/// remove them under the write lock, skipping any mapping that a racing
	/// replacement re-pointed in between.
	pub(crate) fn delete_prefix(&self, prefix: &str) -> usize {
		let matched: Vec<Arc<Entry<T>>> = {
			let state = self.state.read();
			state
				.index
				.values()
				.filter(|entry| entry.key().starts_with(prefix))
				.map(Arc::clone)
				.collect()
		};
		if matched.is_empty() {
			return 0;
		}

		let mut removed = Vec::with_capacity(matched.len());
		{
			let mut state = self.state.write();
			for entry in &matched {
				let current = matches!(
					state.index.get(entry.key()),
					Some(current) if Arc::ptr_eq(current, entry)
				);
				if current {
					state.size -= entry.weight() as u64;
					if let Some(entry) = state.index.remove(entry.key()) {
						removed.push(entry);
					}
				}
			}
		}

		for entry in &removed {
			self.detach(entry);
		}
		removed.len()
	}

	/// Consult the cache, falling back to the loader on a miss. Concurrent
	/// fetches of the same missing key may each run the loader; the last
	/// insert wins.
	pub(crate) fn fetch<F, E>(
		&self,
		key: &str,
		loader: F,
		ttl: Duration,
		weight: u32,
	) -> Result<FetchResult<T>, E>
	where
		F: FnOnce(&str) -> Result<Option<T>, E>,
	{
		if let Some(entry) = self.get(key) {
			return Ok(FetchResult::Hit(entry));
		}
		match loader(key)? {
			Some(value) => Ok(FetchResult::Loaded(self.put(key, value, ttl, weight))),
			None => Ok(FetchResult::Missing),
		}
	}

	pub(crate) fn current_size(&self) -> u64 {
		self.state.read().size
	}

	pub(crate) fn len(&self) -> usize {
		self.state.read().index.len()
	}

	/// Count a hit and, on the promotion cadence, move the entry's node to
	/// the head of the recency list.
	fn record_hit(&self, entry: &Arc<Entry<T>>) {
		if entry.hit() % self.gets_per_promote == 0 {
			let mut list = self.list.lock();
			// The pointer is re-read under the list lock; back-pointers are
			// only cleared there, so a non-null read cannot dangle.
			if let Some(node) = NonNull::new(entry.node_ptr()) {
				list.move_to_front(node);
			}
		}
	}

	/// Remove an expired entry, but only while the index still maps the key
	/// to the entry we observed; a racing replacement wins otherwise.
	fn remove_if_current(&self, key: &str, entry: &Arc<Entry<T>>) {
		let removed = {
			let mut state = self.state.write();
			let current = matches!(
				state.index.get(key),
				Some(current) if Arc::ptr_eq(current, entry)
			);
			if current {
				state.size -= entry.weight() as u64;
				state.index.remove(key)
			} else {
				None
			}
		};
		if let Some(entry) = removed {
			self.detach(&entry);
		}
	}

	/// Unlink the entry's node and destroy the node. No-op when the node is
	/// already gone, or was not linked yet (a racing `put` links it later;
	/// the node then drains through `shrink` or teardown).
	fn detach(&self, entry: &Arc<Entry<T>>) {
		let node = {
			let mut list = self.list.lock();
			let node = NonNull::new(entry.node_ptr());
			if let Some(node) = node {
				if list.unlink(node) {
					entry.clear_node();
					Some(node)
				} else {
					None
				}
			} else {
				None
			}
		};
		if let Some(node) = node {
			// Exclusive owner now: off the list, back-pointer cleared. The
			// drop may run the value's removal hook, so it stays outside the
			// list lock.
			drop(unsafe { Box::from_raw(node.as_ptr()) });
		}
	}

	/// Evict from the recency tail until the segment is back under
	/// `target_size` or the list is drained. Popped nodes are destroyed only
	/// after both locks are released.
	fn shrink(&self) -> usize {
		let mut popped: Vec<NonNull<Node<T>>> = Vec::new();
		let mut evicted = 0;
		{
			let mut state = self.state.write();
			while state.size > self.target_size {
				let node = {
					let mut list = self.list.lock();
					match list.pop_tail() {
						Some(node) => {
							// Cleared before the list lock drops; promotions
							// re-read the pointer under that lock.
							unsafe { node.as_ref() }.entry.clear_node();
							node
						}
						None => break,
					}
				};
				let entry = &unsafe { node.as_ref() }.entry;
				let current = matches!(
					state.index.get(entry.key()),
					Some(current) if Arc::ptr_eq(current, entry)
				);
				if current {
					state.index.remove(entry.key());
					state.size -= entry.weight() as u64;
					evicted += 1;
				}
				popped.push(node);
			}
		}
		for node in popped {
			drop(unsafe { Box::from_raw(node.as_ptr()) });
		}
		evicted
	}

	/// Keys in recency order, head (most recent) first.
	#[cfg(test)]
	pub(crate) fn recency_keys(&self) -> Vec<String> {
		let list = self.list.lock();
		list.entries().iter().map(|entry| entry.key().to_string()).collect()
	}

	/// Check the structural invariants: the list holds exactly the indexed
	/// entries, and the size counter equals the summed weights.
	#[cfg(test)]
	pub(crate) fn assert_invariants(&self) {
		let state = self.state.read();
		let list = self.list.lock();
		let listed = list.entries();
		assert_eq!(listed.len(), state.index.len());

		let mut total = 0u64;
		for entry in state.index.values() {
			total += entry.weight() as u64;
			assert!(
				listed.iter().any(|candidate| Arc::ptr_eq(candidate, entry)),
				"indexed entry {:?} missing from recency list",
				entry.key()
			);
		}
		assert_eq!(total, state.size);
	}
}
