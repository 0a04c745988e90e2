//! Blocked all-pairs driver and sparse-aware driver (spec.md §4.6, §4.7).
//!
//! Tiles the upper-triangular N×N pair space into B×B blocks so the left
//! operand of a block stays resident in cache across the B columns it is
//! reused against, per spec.md §4.6: a diagonal block, off-diagonal
//! square blocks, a right-edge residual, and a final tail pass for
//! whatever rows fall short of a full block. The tiling never reorders
//! the commutative-associative sum, so the result is independent of
//! block size for a fixed kernel (spec.md §8's block-size invariance
//! property).
#![allow(clippy::cast_possible_truncation)]

use crate::error::PopcountError;
use crate::simd_native::{dense_sparse, KernelEngine, KernelPath};

#[inline]
fn vector(buffer: &[u64], words_per_vector: usize, i: usize) -> &[u64] {
    &buffer[i * words_per_vector..(i + 1) * words_per_vector]
}

fn check_dense_shape(buffer_len: usize, n: usize, n_words_per_vector: usize) -> Result<(), PopcountError> {
    if n_words_per_vector == 0 {
        return Err(PopcountError::ZeroWordsPerVector);
    }
    let needed = n.checked_mul(n_words_per_vector).unwrap_or(usize::MAX);
    if buffer_len < needed {
        return Err(PopcountError::BufferTooShort {
            needed,
            actual: buffer_len,
            n,
            n_words_per_vector,
        });
    }
    Ok(())
}

/// Runs `visit(row, col)` exactly once for every unordered pair `row < col`
/// in `0..n`, tiled into `block_size`-square blocks per spec.md §4.6.
fn for_each_pair_blocked(n: usize, block_size: usize, mut visit: impl FnMut(usize, usize)) {
    let mut i = 0usize;
    while i + block_size <= n {
        // Diagonal block at (i, i): pairs (i+a, i+b), a < b.
        for a in 0..block_size {
            for b in (a + 1)..block_size {
                visit(i + a, i + b);
            }
        }

        // Off-diagonal square blocks (i, j) for later full column blocks.
        let mut j = i + block_size;
        while j + block_size <= n {
            for a in 0..block_size {
                for b in 0..block_size {
                    visit(i + a, j + b);
                }
            }
            j += block_size;
        }

        // Right-edge residual: leftover columns that don't fill a block.
        for col in j..n {
            for a in 0..block_size {
                visit(i + a, col);
            }
        }

        i += block_size;
    }

    // Tail pass: rows that didn't fill a final block, against all later rows.
    for row in i..n {
        for col in (row + 1)..n {
            visit(row, col);
        }
    }
}

/// Dense all-pairs sum: `Σ_{i<j} popcount(B_i AND B_j)` over the `n`
/// vectors in `buffer`, each `n_words_per_vector` `u64` words, per
/// spec.md §4.6/§6.
///
/// # Errors
///
/// Returns [`PopcountError`] if `n_words_per_vector == 0` or `buffer` is
/// shorter than `n * n_words_per_vector` words. These are the only shape
/// checks performed; buffer alignment (see [`crate::capability::query_alignment`])
/// remains the caller's responsibility and is undefined behaviour,
/// debug-assert-only, if violated, per spec.md §7.
pub fn intersect(buffer: &[u64], n: usize, n_words_per_vector: usize) -> Result<u64, PopcountError> {
    check_dense_shape(buffer.len(), n, n_words_per_vector)?;
    if n < 2 {
        return Ok(0);
    }

    let config = crate::config::resolved();
    let block_size = config.block_size(n_words_per_vector);
    tracing::trace!(n, n_words_per_vector, block_size, "dense blocked all-pairs");

    let engine = KernelEngine::new(n_words_per_vector);
    let mut sum = 0u64;
    for_each_pair_blocked(n, block_size, |row, col| {
        let a = vector(buffer, n_words_per_vector, row);
        let b = vector(buffer, n_words_per_vector, col);
        sum += engine.call(a, b);
    });

    Ok(sum)
}

fn check_sparse_shape(
    buffer_len: usize,
    n: usize,
    n_words_per_vector: usize,
    n_alts: &[u32],
    alt_positions_len: usize,
    alt_offsets: &[u32],
) -> Result<(), PopcountError> {
    check_dense_shape(buffer_len, n, n_words_per_vector)?;

    if n_alts.len() != n {
        return Err(PopcountError::SparseMetadataLengthMismatch {
            field: "n_alts",
            actual: n_alts.len(),
            expected: n,
        });
    }
    if alt_offsets.len() != n {
        return Err(PopcountError::SparseMetadataLengthMismatch {
            field: "alt_offsets",
            actual: alt_offsets.len(),
            expected: n,
        });
    }

    for i in 0..n {
        let start = alt_offsets[i] as usize;
        let end = start + n_alts[i] as usize;
        if end > alt_positions_len {
            return Err(PopcountError::SparsePositionRangeOutOfBounds {
                index: i,
                start,
                end,
                len: alt_positions_len,
            });
        }
    }

    Ok(())
}

/// Sparse-aware all-pairs sum: identical tiling to [`intersect`], but for
/// each pair compares both vectors' set-bit counts against `cutoff` and
/// dispatches to the probe-based sparse kernel instead of a full dense
/// AND+popcount whenever either side is sparse, per spec.md §4.7.
///
/// # Errors
///
/// Returns [`PopcountError`] for the same shape violations as
/// [`intersect`], plus a length mismatch if `n_alts` or `alt_offsets` is
/// not length `n`, or an out-of-bounds position-list range. Position
/// *ordering* within `alt_positions` remains a debug-assert-only
/// precondition, per spec.md §7.
#[allow(clippy::too_many_arguments)]
pub fn intersect_sparse(
    buffer: &[u64],
    n: usize,
    n_words_per_vector: usize,
    n_alts: &[u32],
    alt_positions: &[u32],
    alt_offsets: &[u32],
    cutoff: u32,
) -> Result<u64, PopcountError> {
    check_sparse_shape(
        buffer.len(),
        n,
        n_words_per_vector,
        n_alts,
        alt_positions.len(),
        alt_offsets,
    )?;
    if n < 2 {
        return Ok(0);
    }

    let config = crate::config::resolved();
    let block_size = config.block_size(n_words_per_vector);
    tracing::trace!(n, n_words_per_vector, block_size, cutoff, "sparse-aware blocked all-pairs");

    let engine = KernelEngine::new(n_words_per_vector);
    let positions_of = |i: usize| -> &[u32] {
        let start = alt_offsets[i] as usize;
        let end = start + n_alts[i] as usize;
        &alt_positions[start..end]
    };

    let mut sum = 0u64;
    for_each_pair_blocked(n, block_size, |row, col| {
        let row_dense = vector(buffer, n_words_per_vector, row);
        let col_dense = vector(buffer, n_words_per_vector, col);

        sum += if n_alts[row] < cutoff || n_alts[col] < cutoff {
            if n_alts[row] <= n_alts[col] {
                dense_sparse(positions_of(row), col_dense)
            } else {
                dense_sparse(positions_of(col), row_dense)
            }
        } else {
            engine.call(row_dense, col_dense)
        };
    });

    Ok(sum)
}

/// Statistics gathered alongside a dense all-pairs pass, for diagnosing
/// which kernel a workload landed on without doing any extra O(N²) work
/// (spec.md §4.8's opt-in `PopcountStats` accumulator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopcountStats {
    /// The final all-pairs sum, identical to what [`intersect`] returns.
    pub sum: u64,
    /// Total unordered pairs visited: `N * (N - 1) / 2`.
    pub pairs_visited: u64,
    /// The single dense kernel path used for every pair in this pass
    /// (resolved once for the call's `n_words_per_vector`, per spec.md §9).
    pub kernel_path: KernelPath,
}

/// Runs the same dense blocked all-pairs pass as [`intersect`], additionally
/// reporting [`PopcountStats`] — an explicit opt-in entry point layered
/// over the same driver, per spec.md §4.8. `intersect` remains the
/// unchanged zero-overhead default.
///
/// # Errors
///
/// Same preconditions as [`intersect`].
pub fn intersect_with_stats(
    buffer: &[u64],
    n: usize,
    n_words_per_vector: usize,
) -> Result<PopcountStats, PopcountError> {
    check_dense_shape(buffer.len(), n, n_words_per_vector)?;

    let engine = KernelEngine::new(n_words_per_vector);
    let pairs_visited = pair_count(n);
    if n < 2 {
        return Ok(PopcountStats {
            sum: 0,
            pairs_visited,
            kernel_path: engine.path(),
        });
    }

    let config = crate::config::resolved();
    let block_size = config.block_size(n_words_per_vector);

    let mut sum = 0u64;
    for_each_pair_blocked(n, block_size, |row, col| {
        let a = vector(buffer, n_words_per_vector, row);
        let b = vector(buffer, n_words_per_vector, col);
        sum += engine.call(a, b);
    });

    Ok(PopcountStats {
        sum,
        pairs_visited,
        kernel_path: engine.path(),
    })
}

#[inline]
fn pair_count(n: usize) -> u64 {
    let n = n as u64;
    n * n.saturating_sub(1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd_native::dense_scalar;

    fn reference_sum(buffer: &[u64], n: usize, words: usize) -> u64 {
        let mut sum = 0u64;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += dense_scalar(vector(buffer, words, i), vector(buffer, words, j));
            }
        }
        sum
    }

    #[test]
    fn for_each_pair_blocked_covers_every_pair_exactly_once() {
        for n in [0usize, 1, 2, 3, 4, 5, 7, 8, 10, 16, 17, 23] {
            for block_size in [1usize, 2, 3, 7, 16] {
                let mut seen = std::collections::HashSet::new();
                for_each_pair_blocked(n, block_size, |row, col| {
                    assert!(row < col, "row {row} must be < col {col}");
                    assert!(seen.insert((row, col)), "pair ({row},{col}) visited twice");
                });
                let expected: usize = (0..n).map(|i| n - i - 1).sum();
                assert_eq!(seen.len(), expected, "n={n} block_size={block_size}");
            }
        }
    }

    /// spec.md §8's "Agreement across kernels" property: the blocked
    /// driver's *sum*, not just its pair coverage, must equal the scalar
    /// reference for every block size in `{1, 2, 3, 7, 16, 64}`. Drives
    /// `for_each_pair_blocked` directly at each of those explicit block
    /// sizes through the resolved dense kernel, independent of whatever
    /// block size `BlockConfig`'s formula would have auto-computed.
    #[test]
    fn for_each_pair_blocked_sum_matches_reference_across_mandated_block_sizes() {
        let n = 37;
        let words = 5;
        let buffer: Vec<u64> = (0..(n * words) as u64)
            .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(11))
            .collect();
        let expected = reference_sum(&buffer, n, words);
        let engine = KernelEngine::new(words);

        for block_size in [1usize, 2, 3, 7, 16, 64] {
            let mut sum = 0u64;
            for_each_pair_blocked(n, block_size, |row, col| {
                let a = vector(&buffer, words, row);
                let b = vector(&buffer, words, col);
                sum += engine.call(a, b);
            });
            assert_eq!(sum, expected, "n={n} block_size={block_size}");
        }
    }

    #[test]
    fn empty_and_singleton_collections_give_zero() {
        assert_eq!(intersect(&[], 0, 2).unwrap(), 0);
        assert_eq!(intersect(&[1, 2], 1, 2).unwrap(), 0);
    }

    #[test]
    fn rejects_zero_words_per_vector() {
        assert_eq!(
            intersect(&[1, 2], 2, 0).unwrap_err(),
            PopcountError::ZeroWordsPerVector
        );
    }

    #[test]
    fn rejects_buffer_too_short() {
        let err = intersect(&[1, 2, 3], 2, 2).unwrap_err();
        assert_eq!(
            err,
            PopcountError::BufferTooShort {
                needed: 4,
                actual: 3,
                n: 2,
                n_words_per_vector: 2,
            }
        );
    }

    #[test]
    fn matches_reference_across_block_sizes() {
        let n = 23;
        let words = 3;
        let buffer: Vec<u64> = (0..(n * words) as u64)
            .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .collect();
        let expected = reference_sum(&buffer, n, words);
        assert_eq!(intersect(&buffer, n, words).unwrap(), expected);
    }

    #[test]
    fn intersect_with_stats_reports_pair_count_and_sum() {
        let n = 10;
        let words = 2;
        let buffer: Vec<u64> = (0..(n * words) as u64).map(|i| i * 7 + 1).collect();
        let expected = reference_sum(&buffer, n, words);
        let stats = intersect_with_stats(&buffer, n, words).unwrap();
        assert_eq!(stats.sum, expected);
        assert_eq!(stats.pairs_visited, 45);
    }

    // -- spec.md §8 concrete scenarios (W = 128 bits, 2 words/vector) --

    #[test]
    fn scenario_identical_single_bit_vectors() {
        let buffer = [1u64, 0, 1u64, 0];
        assert_eq!(intersect(&buffer, 2, 2).unwrap(), 1);
    }

    #[test]
    fn scenario_partial_overlap() {
        let buffer = [u64::MAX, u64::MAX, 0x0000_000F, 0x0000_000F_0000_0000];
        assert_eq!(intersect(&buffer, 2, 2).unwrap(), 8);
    }

    #[test]
    fn scenario_three_vectors_pair_additivity() {
        let buffer = [1u64, 0, 3u64, 0, 7u64, 0];
        // popcount(1&3) + popcount(1&7) + popcount(3&7) = 1 + 1 + 2 = 4
        assert_eq!(intersect(&buffer, 3, 2).unwrap(), 4);
    }

    #[test]
    fn scenario_all_ones_four_vectors() {
        let buffer = [u64::MAX; 8];
        assert_eq!(intersect(&buffer, 4, 2).unwrap(), 6 * 128);
    }

    #[test]
    fn scenario_disjoint_odd_even_bits_w1024() {
        let words = 16;
        let mut odd = vec![0u64; words];
        let mut even = vec![0u64; words];
        for w in 0..words {
            odd[w] = 0xAAAA_AAAA_AAAA_AAAA;
            even[w] = 0x5555_5555_5555_5555;
        }
        let mut buffer = odd;
        buffer.extend(even);
        assert_eq!(intersect(&buffer, 2, words).unwrap(), 0);
    }

    #[test]
    fn all_zero_collection_gives_zero() {
        let buffer = vec![0u64; 4 * 5];
        assert_eq!(intersect(&buffer, 5, 4).unwrap(), 0);
    }

    #[test]
    fn self_exclusion_duplicating_a_vector_does_not_add_self_popcount() {
        let words = 2;
        let v = [0b1011u64, 0];
        let mut buffer = v.to_vec();
        buffer.extend_from_slice(&v);
        // Only term is popcount(v & v) = 3, not 2x that from a self-pair.
        assert_eq!(intersect(&buffer, 2, words).unwrap(), 3);
    }

    // -- dense/sparse agreement (spec.md §8) --

    #[test]
    fn sparse_agrees_with_dense_for_derived_metadata() {
        let n = 12;
        let words = 4;
        let buffer: Vec<u64> = (0..(n * words) as u64)
            .map(|i| {
                // Biased toward sparse: mostly zero with a few set bits.
                if i % 5 == 0 {
                    1u64 << (i % 64)
                } else {
                    0
                }
            })
            .collect();

        let meta = crate::bitmap::derive_sparse_metadata(&buffer, n, words);
        let dense_result = intersect(&buffer, n, words).unwrap();

        for cutoff in [0u32, 1, 10, 50, 1000] {
            let sparse_result = intersect_sparse(
                &buffer,
                n,
                words,
                &meta.n_alts,
                &meta.alt_positions,
                &meta.alt_offsets,
                cutoff,
            )
            .unwrap();
            assert_eq!(sparse_result, dense_result, "mismatch at cutoff={cutoff}");
        }
    }

    #[test]
    fn sparse_rejects_mismatched_metadata_length() {
        let buffer = vec![0u64; 8];
        let err = intersect_sparse(&buffer, 4, 2, &[0, 0], &[], &[0, 0, 0, 0], 50).unwrap_err();
        assert_eq!(
            err,
            PopcountError::SparseMetadataLengthMismatch {
                field: "n_alts",
                actual: 2,
                expected: 4,
            }
        );
    }

    #[test]
    fn sparse_rejects_out_of_bounds_position_range() {
        let buffer = vec![0u64; 4];
        let err = intersect_sparse(&buffer, 2, 2, &[2, 1], &[5], &[0, 0], 50).unwrap_err();
        assert_eq!(
            err,
            PopcountError::SparsePositionRangeOutOfBounds {
                index: 0,
                start: 0,
                end: 2,
                len: 1,
            }
        );
    }
}
