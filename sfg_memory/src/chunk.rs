use std::convert::TryFrom;
use std::fmt::Debug;

/// A `{offset, size}` handle into a [`ChunkAllocator`]. Unlike [`crate::bump::BumpAllocator`]
/// this never hands back a pointer, so the allocator is free to relocate its backing storage
/// without invalidating anything a caller is holding onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHandle<Idx> {
    pub offset: Idx,
    pub size: Idx,
}

struct Hole<Idx> {
    offset: Idx,
    size: Idx,
}

/// Bump arena over `{offset, size}` handles with a free-list of holes for reuse. `Idx` is the
/// integer type callers address chunks with (`u16` for the world's per-model node spans, `u32`
/// for larger arenas).
pub struct ChunkAllocator<Idx> {
    capacity: usize,
    head: usize,
    holes: Vec<Hole<Idx>>,
}

impl<Idx> ChunkAllocator<Idx>
where
    Idx: Copy + Into<usize> + TryFrom<usize>,
    <Idx as TryFrom<usize>>::Error: Debug,
{
    pub fn new(capacity: usize) -> Self {
        ChunkAllocator {
            capacity,
            head: 0,
            holes: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.head
    }

    fn idx(value: usize) -> Idx {
        Idx::try_from(value).expect("chunk allocator index out of range for Idx type")
    }

    /// First-fit reuse of a hole at least `size` long, falling back to a bump allocation.
    pub fn allocate(&mut self, size: usize) -> ChunkHandle<Idx> {
        if let Some(pos) = self
            .holes
            .iter()
            .position(|hole| hole.size.into() >= size)
        {
            let hole = self.holes.remove(pos);
            let hole_size: usize = hole.size.into();
            let offset: usize = hole.offset.into();
            if hole_size > size {
                self.holes.push(Hole {
                    offset: Self::idx(offset + size),
                    size: Self::idx(hole_size - size),
                });
            }
            return ChunkHandle {
                offset: Self::idx(offset),
                size: Self::idx(size),
            };
        }

        let offset = self.head;
        let end = offset.checked_add(size).expect("chunk allocator overflow");
        assert!(
            end <= self.capacity,
            "chunk allocator exhausted: requested {} bytes at offset {}, capacity {}",
            size,
            offset,
            self.capacity
        );
        self.head = end;
        ChunkHandle {
            offset: Self::idx(offset),
            size: Self::idx(size),
        }
    }

    pub fn free(&mut self, handle: ChunkHandle<Idx>) {
        self.holes.push(Hole {
            offset: handle.offset,
            size: handle.size,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_free_reuses_hole() {
        let mut chunks: ChunkAllocator<u32> = ChunkAllocator::new(1024);
        let a = chunks.allocate(64);
        assert_eq!(a.offset, 0);
        chunks.free(a);

        let b = chunks.allocate(64);
        assert_eq!(b.offset, 0, "should reuse the freed hole rather than bumping head");
        assert_eq!(chunks.used(), 64);
    }

    #[test]
    fn bumps_past_holes_too_small() {
        let mut chunks: ChunkAllocator<u32> = ChunkAllocator::new(1024);
        let a = chunks.allocate(16);
        chunks.free(a);

        let b = chunks.allocate(64);
        assert_eq!(b.offset, 16);
    }
}
