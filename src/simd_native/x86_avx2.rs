//! AVX2 256-bit dense intersection kernel.
//!
//! Implements the Harley-Seal carry-save popcount(AND) reduction at
//! 256-bit width: each "SIMD word" is one `__m256i` register holding four
//! ANDed `u64` lanes. AVX2 has no vectorized population-count
//! instruction either, so each accumulator register is tallied with the
//! classic nibble-lookup-table trick: split each byte into low/high
//! nibbles, look up each nibble's popcount via `vpshufb`, sum the two
//! nibble counts per byte, then horizontally reduce with
//! `vpsadbw` (sum-of-absolute-differences against zero collapses 8-bit
//! lanes into 64-bit partial sums without overflow).

use std::arch::x86_64::*;

use super::and_popcount_tail_unrolled_4;

const LANE_WORDS: usize = 4;

/// Full-adder carry-save step: `h = majority(a, b, c)`, `l = a ^ b ^ c`.
#[inline]
unsafe fn csa(h: &mut __m256i, l: &mut __m256i, a: __m256i, b: __m256i, c: __m256i) {
    let u = _mm256_xor_si256(a, b);
    *h = _mm256_or_si256(_mm256_and_si256(a, b), _mm256_and_si256(u, c));
    *l = _mm256_xor_si256(u, c);
}

/// Per-byte nibble-lookup popcount, horizontally reduced to a scalar sum.
#[inline]
unsafe fn popcount_m256(v: __m256i) -> u64 {
    let lookup = _mm256_setr_epi8(
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4, 0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3,
        3, 4,
    );
    let low_mask = _mm256_set1_epi8(0x0f);
    let lo_nibble = _mm256_and_si256(v, low_mask);
    let hi_nibble = _mm256_and_si256(_mm256_srli_epi16(v, 4), low_mask);
    let popcnt_lo = _mm256_shuffle_epi8(lookup, lo_nibble);
    let popcnt_hi = _mm256_shuffle_epi8(lookup, hi_nibble);
    let per_byte = _mm256_add_epi8(popcnt_lo, popcnt_hi);
    let sad = _mm256_sad_epu8(per_byte, _mm256_setzero_si256());

    let hi128 = _mm256_extracti128_si256(sad, 1);
    let lo128 = _mm256_castsi256_si128(sad);
    let summed = _mm_add_epi64(lo128, hi128);
    let folded = _mm_add_epi64(summed, _mm_unpackhi_epi64(summed, summed));
    _mm_cvtsi128_si64(folded) as u64
}

#[inline]
unsafe fn load_and(a_ptr: *const u64, b_ptr: *const u64, lane: usize, offset: usize) -> __m256i {
    let byte_offset = (lane + offset) * LANE_WORDS;
    let va = _mm256_loadu_si256(a_ptr.add(byte_offset).cast::<__m256i>());
    let vb = _mm256_loadu_si256(b_ptr.add(byte_offset).cast::<__m256i>());
    _mm256_and_si256(va, vb)
}

/// 256-bit dense `popcount(a AND b)` kernel.
///
/// # Safety
///
/// Caller must have confirmed AVX2 support (e.g. via
/// `crate::capability::capability()` reporting `PACKED_256`) before
/// calling; this function is unsound to call otherwise.
#[target_feature(enable = "avx2")]
#[allow(clippy::missing_panics_doc)]
pub(crate) unsafe fn dense_avx2(a: &[u64], b: &[u64]) -> u64 {
    debug_assert_eq!(a.len(), b.len(), "word slices must have equal length");

    let len = a.len();
    let lanes = len / LANE_WORDS;
    let main_lanes = lanes / 16 * 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut ones = _mm256_setzero_si256();
    let mut twos = _mm256_setzero_si256();
    let mut fours = _mm256_setzero_si256();
    let mut eights = _mm256_setzero_si256();
    let mut total = 0u64;

    let mut lane = 0usize;
    while lane < main_lanes {
        let mut twos_a = _mm256_setzero_si256();
        let mut twos_b = _mm256_setzero_si256();
        let mut fours_a = _mm256_setzero_si256();
        let mut fours_b = _mm256_setzero_si256();
        let mut eights_a = _mm256_setzero_si256();
        let mut eights_b = _mm256_setzero_si256();
        let mut sixteens = _mm256_setzero_si256();

        csa(&mut twos_a, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 0), load_and(a_ptr, b_ptr, lane, 1));
        csa(&mut twos_b, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 2), load_and(a_ptr, b_ptr, lane, 3));
        csa(&mut fours_a, &mut twos, twos, twos_a, twos_b);
        csa(&mut twos_a, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 4), load_and(a_ptr, b_ptr, lane, 5));
        csa(&mut twos_b, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 6), load_and(a_ptr, b_ptr, lane, 7));
        csa(&mut fours_b, &mut twos, twos, twos_a, twos_b);
        csa(&mut eights_a, &mut fours, fours, fours_a, fours_b);
        csa(&mut twos_a, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 8), load_and(a_ptr, b_ptr, lane, 9));
        csa(&mut twos_b, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 10), load_and(a_ptr, b_ptr, lane, 11));
        csa(&mut fours_a, &mut twos, twos, twos_a, twos_b);
        csa(&mut twos_a, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 12), load_and(a_ptr, b_ptr, lane, 13));
        csa(&mut twos_b, &mut ones, ones, load_and(a_ptr, b_ptr, lane, 14), load_and(a_ptr, b_ptr, lane, 15));
        csa(&mut fours_b, &mut twos, twos, twos_a, twos_b);
        csa(&mut eights_b, &mut fours, fours, fours_a, fours_b);
        csa(&mut sixteens, &mut eights, eights, eights_a, eights_b);

        total += 16 * popcount_m256(sixteens);
        lane += 16;
    }

    total += 8 * popcount_m256(eights);
    total += 4 * popcount_m256(fours);
    total += 2 * popcount_m256(twos);
    total += popcount_m256(ones);

    while lane < lanes {
        total += popcount_m256(load_and(a_ptr, b_ptr, lane, 0));
        lane += 1;
    }

    let word_base = lanes * LANE_WORDS;
    and_popcount_tail_unrolled_4!(a, b, word_base, len - word_base, total);

    total
}
