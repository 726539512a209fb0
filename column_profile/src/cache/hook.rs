//! Observers of [`ProfileCache`](super::ProfileCache) events.

use std::sync::Arc;

use observability_deps::tracing::debug;

use super::CacheKind;
use crate::column::ColumnId;

/// A trait for hooking into cache events.
///
/// This can be used for:
/// - logging
/// - counting recomputations in tests
///
/// Note: members are invoked under the cache lock and should therefore be
/// short-running and not call back into the cache.
pub trait Hook: std::fmt::Debug + Send + Sync {
    /// A lookup found an entry.
    fn hit(&self, _kind: CacheKind, _id: &ColumnId) {}

    /// A lookup found nothing, the caller is about to compute the entry.
    fn miss(&self, _kind: CacheKind, _id: &ColumnId, _generation: u64) {}

    /// A computed entry was stored.
    fn inserted(&self, _kind: CacheKind, _id: &ColumnId, _generation: u64) {}

    /// A computed entry was dropped because the cache was reset while it was
    /// being computed.
    fn discarded(&self, _kind: CacheKind, _id: &ColumnId, _generation: u64) {}

    /// Both mappings were cleared, `generation` is the new generation.
    fn reset(&self, _generation: u64, _evicted: usize) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl Hook for NoopHook {}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHook;

impl Hook for LoggingHook {
    fn hit(&self, kind: CacheKind, id: &ColumnId) {
        debug!(?kind, column = %id, "profile cache hit");
    }

    fn miss(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        debug!(?kind, column = %id, generation, "profile cache miss");
    }

    fn inserted(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        debug!(?kind, column = %id, generation, "profile cache insert");
    }

    fn discarded(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        debug!(?kind, column = %id, generation, "discarding result computed before reset");
    }

    fn reset(&self, generation: u64, evicted: usize) {
        debug!(generation, evicted, "profile cache reset");
    }
}

/// Chains multiple [hooks](Hook).
#[derive(Debug)]
pub struct HookChain {
    hooks: Box<[Arc<dyn Hook>]>,
}

impl HookChain {
    pub fn new(hooks: impl IntoIterator<Item = Arc<dyn Hook>>) -> Self {
        Self {
            hooks: hooks.into_iter().collect(),
        }
    }
}

impl Hook for HookChain {
    fn hit(&self, kind: CacheKind, id: &ColumnId) {
        for hook in &self.hooks {
            hook.hit(kind, id);
        }
    }

    fn miss(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        for hook in &self.hooks {
            hook.miss(kind, id, generation);
        }
    }

    fn inserted(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        for hook in &self.hooks {
            hook.inserted(kind, id, generation);
        }
    }

    fn discarded(&self, kind: CacheKind, id: &ColumnId, generation: u64) {
        for hook in &self.hooks {
            hook.discarded(kind, id, generation);
        }
    }

    fn reset(&self, generation: u64, evicted: usize) {
        for hook in &self.hooks {
            hook.reset(generation, evicted);
        }
    }
}
