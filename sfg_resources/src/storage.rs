use std::collections::HashMap;

use sfg_memory::{Handle, Pool};

/// A generational pool paired with a content-hash -> handle map, so loading the same resource
/// twice by hash returns the original handle instead of allocating a duplicate. One `Storage<T>`
/// per resource kind lives on [`crate::manager::ResourceManager`].
pub struct Storage<T> {
    pool: Pool<T>,
    by_hash: HashMap<u64, Handle<T>>,
}

impl<T> Storage<T> {
    pub fn new(capacity: usize) -> Self {
        Storage {
            pool: Pool::new(capacity),
            by_hash: HashMap::new(),
        }
    }

    /// Returns the existing handle for `hash` if one is registered, otherwise allocates `value`,
    /// registers it under `hash`, and returns the new handle. Mirrors the "idempotent by hash"
    /// contract every `load_*` entry point on `ResourceManager` needs.
    pub fn get_or_create(&mut self, hash: u64, value: impl FnOnce() -> T) -> (Handle<T>, bool) {
        if let Some(&handle) = self.by_hash.get(&hash) {
            return (handle, false);
        }
        let handle = self.pool.allocate(value());
        self.by_hash.insert(hash, handle);
        (handle, true)
    }

    /// Looks up a hash without creating anything on a miss, for callers that need to build the
    /// value (e.g. running a multi-step load cascade) only when the hash is genuinely new.
    pub fn contains_hash(&self, hash: u64) -> Option<Handle<T>> {
        self.by_hash.get(&hash).copied()
    }

    pub fn create(&mut self, value: T) -> Handle<T> {
        self.pool.allocate(value)
    }

    /// Removes the hash registration (if any) and frees the pool slot. A resource created via
    /// `create` rather than `get_or_create` was never registered, so this is a no-op on the
    /// `by_hash` side for those.
    pub fn destroy(&mut self, handle: Handle<T>) {
        self.by_hash.retain(|_, &mut h| h != handle);
        self.pool.free(handle);
    }

    pub fn get(&self, handle: Handle<T>) -> &T {
        self.pool.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> &mut T {
        self.pool.get_mut(handle)
    }

    pub fn try_get(&self, handle: Handle<T>) -> Option<&T> {
        self.pool.try_get(handle)
    }

    pub fn is_valid(&self, handle: Handle<T>) -> bool {
        self.pool.is_valid(handle)
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }
}

/// Hashes arbitrary bytes (a file path, a generated cache key) the same way every resource load
/// and the overlay console's command dispatch table key their entries, so two call sites never
/// need to agree on a hash function by convention alone.
pub fn hash_key(bytes: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_by_hash() {
        let mut storage: Storage<u32> = Storage::new(4);
        let (a, created_a) = storage.get_or_create(hash_key(b"foo.tex"), || 42);
        let (b, created_b) = storage.get_or_create(hash_key(b"foo.tex"), || 99);
        assert_eq!(a, b);
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(*storage.get(a), 42);
    }

    #[test]
    fn destroy_clears_hash_registration() {
        let mut storage: Storage<u32> = Storage::new(4);
        let (handle, _) = storage.get_or_create(hash_key(b"bar.tex"), || 7);
        storage.destroy(handle);
        let (handle2, created) = storage.get_or_create(hash_key(b"bar.tex"), || 8);
        assert!(created);
        assert_eq!(*storage.get(handle2), 8);
    }
}
