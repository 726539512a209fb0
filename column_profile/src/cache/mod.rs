//! Memo tables for frequency statistics and type tags.
//!
//! Both tables live under one lock so that [`ProfileCache::reset`] clears
//! them atomically: a type tag never outlives the frequency table it was
//! derived from.
//!
//! Values are computed outside the lock. A lookup that misses returns the
//! current generation, the caller computes the value and hands the generation
//! back on insert. If the cache was reset in the meantime the value is
//! discarded. Concurrent misses on the same identity all compute, the last
//! insert wins.

pub mod hook;

use std::sync::Arc;

use hashbrown::HashMap;
use hook::{Hook, LoggingHook};
use parking_lot::Mutex;

use crate::{classify::TypeTag, column::ColumnId, frequency::FrequencyStats};

/// The two memo tables of a [`ProfileCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Identity → [`FrequencyStats`]
    Frequencies,

    /// Identity → [`TypeTag`]
    TypeTag,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<V> {
    Hit(V),

    /// Nothing cached, `generation` must be passed to the matching insert.
    Miss { generation: u64 },
}

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    frequencies: HashMap<ColumnId, Arc<FrequencyStats>>,
    type_tags: HashMap<ColumnId, TypeTag>,
}

impl CacheState {
    fn len(&self, kind: CacheKind) -> usize {
        match kind {
            CacheKind::Frequencies => self.frequencies.len(),
            CacheKind::TypeTag => self.type_tags.len(),
        }
    }
}

/// Per-session memo cache, keyed by column identity.
///
/// Entries never expire individually, only [`reset`](Self::reset) removes
/// them.
#[derive(Debug)]
pub struct ProfileCache {
    state: Mutex<CacheState>,
    hook: Arc<dyn Hook>,
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCache {
    /// Cache that logs its events through [`LoggingHook`].
    pub fn new() -> Self {
        Self::new_with_hook(Arc::new(LoggingHook))
    }

    pub fn new_with_hook(hook: Arc<dyn Hook>) -> Self {
        Self {
            state: Default::default(),
            hook,
        }
    }

    /// Number of resets since creation.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn get_frequencies(&self, id: &ColumnId) -> CacheLookup<Arc<FrequencyStats>> {
        let state = self.state.lock();
        match state.frequencies.get(id) {
            Some(stats) => {
                self.hook.hit(CacheKind::Frequencies, id);
                CacheLookup::Hit(Arc::clone(stats))
            }
            None => {
                self.hook
                    .miss(CacheKind::Frequencies, id, state.generation);
                CacheLookup::Miss {
                    generation: state.generation,
                }
            }
        }
    }

    /// Store `stats` computed after a miss at `generation`.
    ///
    /// Returns `false` if the value was discarded because the cache was
    /// reset since.
    pub fn insert_frequencies(
        &self,
        id: &ColumnId,
        generation: u64,
        stats: Arc<FrequencyStats>,
    ) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            self.hook.discarded(CacheKind::Frequencies, id, generation);
            return false;
        }

        state.frequencies.insert(id.clone(), stats);
        self.hook.inserted(CacheKind::Frequencies, id, generation);
        true
    }

    pub fn get_type_tag(&self, id: &ColumnId) -> CacheLookup<TypeTag> {
        let state = self.state.lock();
        match state.type_tags.get(id) {
            Some(tag) => {
                self.hook.hit(CacheKind::TypeTag, id);
                CacheLookup::Hit(*tag)
            }
            None => {
                self.hook.miss(CacheKind::TypeTag, id, state.generation);
                CacheLookup::Miss {
                    generation: state.generation,
                }
            }
        }
    }

    /// Store `tag` computed after a miss at `generation`.
    ///
    /// Returns `false` if the value was discarded because the cache was
    /// reset since.
    pub fn insert_type_tag(&self, id: &ColumnId, generation: u64, tag: TypeTag) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            self.hook.discarded(CacheKind::TypeTag, id, generation);
            return false;
        }

        state.type_tags.insert(id.clone(), tag);
        self.hook.inserted(CacheKind::TypeTag, id, generation);
        true
    }

    /// Clear both tables and start a new generation.
    ///
    /// Returns the number of evicted entries.
    pub fn reset(&self) -> usize {
        let mut state = self.state.lock();
        let evicted = state.frequencies.len() + state.type_tags.len();

        state.frequencies.clear();
        state.type_tags.clear();
        state.generation += 1;

        self.hook.reset(state.generation, evicted);
        evicted
    }

    pub fn contains(&self, kind: CacheKind, id: &ColumnId) -> bool {
        let state = self.state.lock();
        match kind {
            CacheKind::Frequencies => state.frequencies.contains_key(id),
            CacheKind::TypeTag => state.type_tags.contains_key(id),
        }
    }

    /// Number of entries in the `kind` table.
    pub fn len(&self, kind: CacheKind) -> usize {
        self.state.lock().len(kind)
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.len(CacheKind::Frequencies) == 0 && state.len(CacheKind::TypeTag) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        frequency::FrequencyTable,
        test_util::{TestHook, TestHookRecord},
    };

    fn stats() -> Arc<FrequencyStats> {
        Arc::new(FrequencyStats::new(FrequencyTable::default(), None))
    }

    #[test]
    fn test_miss_insert_hit() {
        let hook = Arc::new(TestHook::default());
        let cache = ProfileCache::new_with_hook(Arc::clone(&hook) as _);
        let id = ColumnId::from("a");

        let CacheLookup::Miss { generation } = cache.get_type_tag(&id) else {
            panic!("empty cache must miss");
        };
        assert!(cache.insert_type_tag(&id, generation, TypeTag::Num));
        assert_eq!(cache.get_type_tag(&id), CacheLookup::Hit(TypeTag::Num));

        assert!(cache.contains(CacheKind::TypeTag, &id));
        assert!(!cache.contains(CacheKind::Frequencies, &id));
        assert_eq!(cache.len(CacheKind::TypeTag), 1);

        assert_eq!(
            hook.records(),
            [
                TestHookRecord::Miss(CacheKind::TypeTag, id.clone(), 0),
                TestHookRecord::Inserted(CacheKind::TypeTag, id.clone(), 0),
                TestHookRecord::Hit(CacheKind::TypeTag, id.clone()),
            ]
        );
    }

    #[test]
    fn test_reset_clears_both_tables() {
        let cache = ProfileCache::new();
        let a = ColumnId::from("a");
        let b = ColumnId::from("b");

        assert!(cache.insert_frequencies(&a, 0, stats()));
        assert!(cache.insert_type_tag(&a, 0, TypeTag::Cat));
        assert!(cache.insert_type_tag(&b, 0, TypeTag::Bool));
        assert!(!cache.is_empty());

        assert_eq!(cache.reset(), 3);
        assert_eq!(cache.generation(), 1);
        assert!(cache.is_empty());
        for id in [&a, &b] {
            assert!(!cache.contains(CacheKind::Frequencies, id));
            assert!(!cache.contains(CacheKind::TypeTag, id));
        }

        assert_eq!(cache.reset(), 0);
        assert_eq!(cache.generation(), 2);
    }

    #[test]
    fn test_stale_insert_is_discarded() {
        let hook = Arc::new(TestHook::default());
        let cache = ProfileCache::new_with_hook(Arc::clone(&hook) as _);
        let id = ColumnId::from("a");

        let CacheLookup::Miss { generation } = cache.get_frequencies(&id) else {
            panic!("empty cache must miss");
        };
        cache.reset();

        assert!(!cache.insert_frequencies(&id, generation, stats()));
        assert!(!cache.insert_type_tag(&id, generation, TypeTag::Cat));
        assert!(cache.is_empty());
        assert_eq!(
            hook.records(),
            [
                TestHookRecord::Miss(CacheKind::Frequencies, id.clone(), 0),
                TestHookRecord::Reset(1, 0),
                TestHookRecord::Discarded(CacheKind::Frequencies, id.clone(), 0),
                TestHookRecord::Discarded(CacheKind::TypeTag, id.clone(), 0),
            ]
        );
    }

    #[test]
    fn test_last_write_wins() {
        let cache = ProfileCache::new();
        let id = ColumnId::from("a");

        assert!(cache.insert_type_tag(&id, 0, TypeTag::Cat));
        assert!(cache.insert_type_tag(&id, 0, TypeTag::Unique));
        assert_eq!(cache.get_type_tag(&id), CacheLookup::Hit(TypeTag::Unique));
        assert_eq!(cache.len(CacheKind::TypeTag), 1);
    }
}
