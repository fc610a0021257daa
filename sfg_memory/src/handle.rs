use std::fmt;
use std::marker::PhantomData;

/// A generational index into a [`crate::pool::Pool`]. Equality requires both the slot index and
/// the generation to match; a handle whose generation is zero is never alive.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub const NULL: Handle<T> = Handle {
        index: u32::MAX,
        generation: 0,
        _marker: PhantomData,
    };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        debug_assert_ne!(generation, 0);
        Handle {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Reconstructs a handle from its raw `{index, generation}` fields. For bridging against an
    /// externally-defined plain id struct carrying the same two fields (e.g. a backend crate's
    /// `#[repr(C)]` command-payload id) rather than anything a `Pool` hands out directly; callers
    /// still go through `Pool::get`/`is_valid` for the actual liveness check.
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Handle {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// A handle is alive iff its generation is non-zero. This does not consult a pool; it only
    /// tells you whether the handle was ever produced by `allocate` rather than being `NULL` or
    /// default-constructed.
    pub fn is_alive(&self) -> bool {
        self.generation != 0
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}
