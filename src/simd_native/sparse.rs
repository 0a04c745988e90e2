//! Sparse intersection kernel.
//!
//! When one operand's set-bit positions are known and few relative to
//! the dense word count of the other, probing beats scanning: for each
//! ascending position in the sparse list, test the corresponding bit in
//! the dense operand's word array directly, skipping every word that
//! carries no sparse-side bit at all.
//!
//! The access pattern into `dense` is effectively random (it jumps
//! between whichever words the sparse positions land in), which makes
//! this kernel latency-bound on cache misses rather than throughput-bound
//! like the dense kernels. Software prefetching `calculate_prefetch_distance`
//! positions ahead (scaled to the dense operand's size) hides part of that
//! latency.

use super::prefetch::{calculate_prefetch_distance, prefetch_words};

/// Counts set bits shared between a sparse position list and a dense
/// bitmap: `popcount(bitmap_of(positions) AND dense)`.
///
/// `positions` holds ascending bit indices (as produced by
/// `crate::bitmap::derive_sparse_metadata`). Each position `p` refers to
/// bit `p % 64` of word `p / 64` in `dense`.
///
/// # Panics
///
/// Debug-asserts every position falls within `dense`'s bit range;
/// out-of-range positions are undefined behaviour in release builds.
#[inline]
#[must_use]
pub fn dense_sparse(positions: &[u32], dense: &[u64]) -> u64 {
    let bit_len = dense.len() * 64;
    let mut total = 0u64;
    let prefetch_ahead = calculate_prefetch_distance(dense.len());

    for (i, &position) in positions.iter().enumerate() {
        debug_assert!(
            (position as usize) < bit_len,
            "sparse position {position} out of range for {bit_len}-bit dense operand"
        );

        if i + prefetch_ahead < positions.len() {
            let ahead = positions[i + prefetch_ahead] as usize / 64;
            if ahead < dense.len() {
                prefetch_words(&dense[ahead..]);
            }
        }

        let word_idx = position as usize / 64;
        let bit_idx = position as usize % 64;
        total += (dense[word_idx] >> bit_idx) & 1;
    }

    total
}
