use bumpalo::Bump;

/// Typed bump arena. Everything allocated here lives until the arena is
/// dropped; nothing is freed individually.
pub struct Arena<T> {
    bump: Bump,
    _marker: std::marker::PhantomData<T>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena {
            bump: Bump::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Pre-sizes the first block. Useful when the caller knows roughly how
    /// many nodes a source file will produce.
    pub fn with_capacity(bytes: usize) -> Self {
        Arena {
            bump: Bump::with_capacity(bytes),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn alloc(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    pub fn alloc_slice<I>(&self, items: I) -> &[T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }

    /// Total bytes handed out so far, across all blocks.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Invalidates all references but keeps the blocks for reuse.
    /// The REPL resets its AST arena between lines this way.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_stable_references() {
        let arena: Arena<u64> = Arena::new();
        let a = arena.alloc(7);
        let b = arena.alloc(11);
        assert_eq!(*a, 7);
        assert_eq!(*b, 11);
    }

    #[test]
    fn references_survive_block_growth() {
        let arena: Arena<usize> = Arena::new();
        let refs: Vec<&usize> = (0..20_000).map(|i| arena.alloc(i)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i);
        }
    }

    #[test]
    fn allocations_are_aligned_and_disjoint() {
        let arena: Arena<u64> = Arena::new();
        let mut addrs: Vec<usize> = (0..256)
            .map(|i| arena.alloc(i as u64) as *const u64 as usize)
            .collect();
        for &addr in &addrs {
            assert_eq!(addr % std::mem::align_of::<u64>(), 0);
        }
        addrs.sort_unstable();
        for pair in addrs.windows(2) {
            assert!(pair[1] - pair[0] >= std::mem::size_of::<u64>());
        }
    }

    #[test]
    fn alloc_slice_copies_contents() {
        let arena: Arena<i32> = Arena::new();
        let slice = arena.alloc_slice(vec![3, 1, 4, 1, 5]);
        assert_eq!(slice, &[3, 1, 4, 1, 5]);
    }

    #[test]
    fn alloc_slice_handles_empty_input() {
        let arena: Arena<i32> = Arena::new();
        let slice = arena.alloc_slice(Vec::new());
        assert!(slice.is_empty());
    }

    #[test]
    fn allocated_bytes_grows_monotonically() {
        let arena: Arena<u64> = Arena::new();
        let before = arena.allocated_bytes();
        arena.alloc(1);
        arena.alloc(2);
        assert!(arena.allocated_bytes() >= before + 2 * std::mem::size_of::<u64>());
    }

    #[test]
    fn reset_keeps_the_arena_usable() {
        let mut arena: Arena<String> = Arena::new();
        arena.alloc("first".to_string());
        arena.reset();
        let r = arena.alloc("second".to_string());
        assert_eq!(r, "second");
    }

    #[test]
    fn with_capacity_allocates_like_new() {
        let arena: Arena<u8> = Arena::with_capacity(4096);
        let r = arena.alloc(42);
        assert_eq!(*r, 42);
    }
}
