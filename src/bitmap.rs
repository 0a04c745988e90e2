//! Convenience owned-buffer type and sparse-metadata helpers.
//!
//! Neither of these is part of the three-operation core contract in
//! spec.md §6 — they are the "expose an aligned-allocation helper as a
//! convenience; it is not part of the core" addition spec.md §9 invites,
//! plus a helper to derive sparse position lists from a dense buffer for
//! the dense/sparse agreement property in spec.md §8.

use crate::alloc_guard::AllocGuard;
use crate::capability::query_alignment;
use std::alloc::Layout;

/// An owned bitmap collection buffer allocated at the alignment the
/// current CPU's kernel requires, per [`query_alignment`].
///
/// Built on [`AllocGuard`] for panic-safe raw allocation, matching the
/// RAII-allocation idiom already established in this crate for other
/// manually-managed buffers.
pub struct AlignedBitmapBuffer {
    guard: AllocGuard,
    n: usize,
    words_per_vector: usize,
}

impl AlignedBitmapBuffer {
    /// Allocates a zeroed collection buffer for `n` vectors of
    /// `words_per_vector` `u64` words each, aligned per [`query_alignment`].
    ///
    /// Returns `None` if `n * words_per_vector == 0` or the allocator
    /// reports an out-of-memory condition.
    #[must_use]
    pub fn zeroed(n: usize, words_per_vector: usize) -> Option<Self> {
        let total_words = n.checked_mul(words_per_vector)?;
        if total_words == 0 {
            return None;
        }

        let align = query_alignment() as usize;
        let size = total_words.checked_mul(8)?;
        let layout = Layout::from_size_align(size, align).ok()?;
        let guard = AllocGuard::new(layout)?;

        // SAFETY: `guard` owns `size` freshly-allocated, uninitialized bytes
        // at `align`-byte alignment; writing `size` zero bytes starting at
        // its base pointer stays within the allocation and fully
        // initializes it before any `u64` read through `as_slice`.
        unsafe {
            std::ptr::write_bytes(guard.as_ptr(), 0, size);
        }

        Some(Self {
            guard,
            n,
            words_per_vector,
        })
    }

    /// Number of vectors in the collection.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the collection holds zero vectors.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Words per vector (`W / 64`).
    #[inline]
    #[must_use]
    pub fn words_per_vector(&self) -> usize {
        self.words_per_vector
    }

    /// The full collection as a flat, read-only word slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        // SAFETY: the buffer was zero-initialized for its full length in
        // `zeroed`, and `guard`'s layout size is exactly
        // `n * words_per_vector * 8` bytes, i.e. `n * words_per_vector`
        // `u64` words, alive for as long as `self`.
        unsafe {
            std::slice::from_raw_parts(guard_cast(&self.guard), self.n * self.words_per_vector)
        }
    }

    /// The full collection as a flat, mutable word slice.
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        let len = self.n * self.words_per_vector;
        // SAFETY: see `as_slice`; `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.guard.cast::<u64>(), len) }
    }

    /// Returns the word slice for vector `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[inline]
    #[must_use]
    pub fn vector(&self, i: usize) -> &[u64] {
        assert!(i < self.n, "vector index {i} out of range (len {})", self.n);
        let w = self.words_per_vector;
        &self.as_slice()[i * w..(i + 1) * w]
    }
}

fn guard_cast(guard: &AllocGuard) -> *const u64 {
    guard.cast::<u64>().cast_const()
}

/// Ascending set-bit positions for one bitmap vector, and the dense-mode
/// metadata arrays [`intersect_sparse`](crate::intersect_sparse) expects
/// when derived for a whole collection via [`derive_sparse_metadata`].
#[derive(Debug, Clone, Default)]
pub struct SparseMetadata {
    /// `n_alts[i]`: number of set bits in vector `i`.
    pub n_alts: Vec<u32>,
    /// Shared ascending-order buffer of set-bit positions across all vectors.
    pub alt_positions: Vec<u32>,
    /// `alt_offsets[i]`: start index of vector `i`'s positions in `alt_positions`.
    pub alt_offsets: Vec<u32>,
}

/// Enumerates the set bits of every vector in `buffer` to build the
/// sparse metadata arrays [`intersect_sparse`](crate::intersect_sparse)
/// requires.
///
/// This is a test/tooling helper, not part of the core: it performs the
/// O(N·W) scan spec.md §8's dense/sparse agreement property needs to
/// derive sparse metadata "from the same buffer by enumerating set bits".
#[must_use]
pub fn derive_sparse_metadata(buffer: &[u64], n: usize, n_words_per_vector: usize) -> SparseMetadata {
    let mut meta = SparseMetadata {
        n_alts: Vec::with_capacity(n),
        alt_positions: Vec::new(),
        alt_offsets: Vec::with_capacity(n),
    };

    for i in 0..n {
        meta.alt_offsets.push(meta.alt_positions.len() as u32);
        let vector = &buffer[i * n_words_per_vector..(i + 1) * n_words_per_vector];
        let mut count = 0u32;
        for (word_idx, &word) in vector.iter().enumerate() {
            let mut bits = word;
            while bits != 0 {
                let bit = bits.trailing_zeros();
                let position = (word_idx * 64) as u32 + bit;
                meta.alt_positions.push(position);
                count += 1;
                bits &= bits - 1;
            }
        }
        meta.n_alts.push(count);
    }

    meta
}
