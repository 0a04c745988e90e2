//! Scalar fallback popcount(AND) kernel.
//!
//! Serves as:
//! - Fallback on platforms without a dedicated packed-integer SIMD kernel
//! - Reference implementation for testing SIMD kernel correctness
//! - The tail handler every dense SIMD kernel falls back to for words that
//!   don't fill a full SIMD lane

use super::and_popcount_tail_unrolled_4;

/// Scalar `popcount(a AND b)` over two equal-length `u64` word slices,
/// 4x unrolled with an accumulating tail for the final 0-3 words.
///
/// # Panics
///
/// Debug-asserts `a.len() == b.len()`; mismatched lengths are undefined
/// behaviour in release builds, matching the kernel-level contract every
/// dense kernel in this module shares.
#[inline]
#[must_use]
pub fn dense_scalar(a: &[u64], b: &[u64]) -> u64 {
    debug_assert_eq!(a.len(), b.len(), "word slices must have equal length");

    let len = a.len();
    let main = len / 4 * 4;
    let mut total = 0u64;
    let mut i = 0;

    while i < main {
        total += (a[i] & b[i]).count_ones() as u64;
        total += (a[i + 1] & b[i + 1]).count_ones() as u64;
        total += (a[i + 2] & b[i + 2]).count_ones() as u64;
        total += (a[i + 3] & b[i + 3]).count_ones() as u64;
        i += 4;
    }

    and_popcount_tail_unrolled_4!(a, b, i, len - i, total);

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slices_give_zero() {
        assert_eq!(dense_scalar(&[], &[]), 0);
    }

    #[test]
    fn disjoint_bitmaps_give_zero() {
        let a = [0b1010u64, 0b1100];
        let b = [0b0101u64, 0b0011];
        assert_eq!(dense_scalar(&a, &b), 0);
    }

    #[test]
    fn remainder_of_one_two_and_three_words_accumulate() {
        // Exercises every branch of the tail macro (remainder 1, 2, 3).
        for len in 1..=7 {
            let a = vec![u64::MAX; len];
            let b = vec![u64::MAX; len];
            assert_eq!(dense_scalar(&a, &b), (len as u64) * 64, "len={len}");
        }
    }

    #[test]
    fn matches_naive_reference_for_mixed_patterns() {
        let a: Vec<u64> = (0..10).map(|i| 0x1234_5678_9abc_def0u64.rotate_left(i)).collect();
        let b: Vec<u64> = (0..10).map(|i| 0x0fed_cba9_8765_4321u64.rotate_right(i)).collect();
        let expected: u64 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| (x & y).count_ones() as u64)
            .sum();
        assert_eq!(dense_scalar(&a, &b), expected);
    }
}
