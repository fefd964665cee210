//! Per-`(user_id, note_path)` write serialization, a per-user rebuild lock,
//! and cooperative cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// A cooperative cancellation signal, checked before a transaction commits
/// and between per-note units of work during `RebuildIndex`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-`(user_id, note_path)` mutex registry plus a per-user rebuild lock.
/// Entries are created on demand and never removed; in practice bounded by
/// `max_notes_per_user`.
pub struct LockRegistry {
    note_locks: RwLock<HashMap<(String, String), Arc<Mutex<()>>>>,
    rebuild_locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LockRegistry {
    pub fn new() -> Self {
        Self { note_locks: RwLock::new(HashMap::new()), rebuild_locks: RwLock::new(HashMap::new()) }
    }

    fn note_mutex(&self, user_id: &str, note_path: &str) -> Arc<Mutex<()>> {
        let key = (user_id.to_string(), note_path.to_string());
        if let Some(existing) = self.note_locks.read().get(&key).cloned() {
            return existing;
        }
        self.note_locks.write().entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    fn rebuild_mutex(&self, user_id: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.rebuild_locks.read().get(user_id).cloned() {
            return existing;
        }
        self.rebuild_locks
            .write()
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the mutex for `(user_id, note_path)`, creating
    /// the mutex on first use. Serializes concurrent writes to the same note.
    pub fn with_note_lock<F, R>(&self, user_id: &str, note_path: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let mutex = self.note_mutex(user_id, note_path);
        let _guard = mutex.lock();
        f()
    }

    /// Run `f` while holding the per-user rebuild lock, so a `RebuildIndex`
    /// never runs concurrently with another rebuild for the same user.
    pub fn with_rebuild_lock<F, R>(&self, user_id: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let mutex = self.rebuild_mutex(user_id);
        let _guard = mutex.lock();
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_reflects_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancellation_token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn note_locks_serialize_access_to_the_same_key() {
        let registry = LockRegistry::new();
        let order = Mutex::new(Vec::new());
        registry.with_note_lock("u1", "a.md", || order.lock().push(1));
        registry.with_note_lock("u1", "a.md", || order.lock().push(2));
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn different_keys_do_not_block_each_other() {
        let registry = LockRegistry::new();
        registry.with_note_lock("u1", "a.md", || {});
        registry.with_note_lock("u1", "b.md", || {});
        registry.with_rebuild_lock("u1", || {});
    }
}
