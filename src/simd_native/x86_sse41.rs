//! SSE4.1 128-bit dense intersection kernel.
//!
//! Implements the Harley-Seal carry-save popcount(AND) reduction at
//! 128-bit width: each "SIMD word" is one `__m128i` register holding two
//! ANDed `u64` lanes. SSE4.1 has no vectorized population-count
//! instruction, so each accumulator register's bits are tallied by
//! extracting its two 64-bit halves and using the hardware 64-bit
//! `POPCNT` on each half — the approach this tier's hardware supports.

use std::arch::x86_64::*;

use super::and_popcount_tail_unrolled_4;

const LANE_WORDS: usize = 2;

/// Full-adder carry-save step: `h = majority(a, b, c)`, `l = a ^ b ^ c`.
#[inline]
unsafe fn csa(h: &mut __m128i, l: &mut __m128i, a: __m128i, b: __m128i, c: __m128i) {
    let u = _mm_xor_si128(a, b);
    *h = _mm_or_si128(_mm_and_si128(a, b), _mm_and_si128(u, c));
    *l = _mm_xor_si128(u, c);
}

/// Sums the population count of a 128-bit register by extracting its two
/// 64-bit halves and using the hardware 64-bit popcount on each.
#[inline]
unsafe fn popcount_m128(v: __m128i) -> u64 {
    let lo = _mm_cvtsi128_si64(v) as u64;
    let hi = _mm_cvtsi128_si64(_mm_unpackhi_epi64(v, v)) as u64;
    u64::from(lo.count_ones()) + u64::from(hi.count_ones())
}

#[inline]
unsafe fn load_and(a_ptr: *const u64, b_ptr: *const u64, lane: usize, offset: usize) -> __m128i {
    let byte_offset = (lane + offset) * LANE_WORDS;
    let va = _mm_loadu_si128(a_ptr.add(byte_offset).cast::<__m128i>());
    let vb = _mm_loadu_si128(b_ptr.add(byte_offset).cast::<__m128i>());
    _mm_and_si128(va, vb)
}

/// 128-bit dense `popcount(a AND b)` kernel.
///
/// # Safety
///
/// Caller must have confirmed SSE4.1 support (e.g. via
/// `crate::capability::capability()` reporting `PACKED_128`) before
/// calling; this function is unsound to call otherwise.
#[target_feature(enable = "sse4.1")]
#[allow(clippy::missing_panics_doc)]
pub(crate) unsafe fn dense_sse41(a: &[u64], b: &[u64]) -> u64 {
    debug_assert_eq!(a.len(), b.len(), "word slices must have equal length");

    let len = a.len();
    let lanes = len / LANE_WORDS;
    let main_lanes = lanes / 16 * 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut ones = _mm_setzero_si128();
    let mut twos = _mm_setzero_si128();
    let mut fours = _mm_setzero_si128();
    let mut eights = _mm_setzero_si128();
    let mut total = 0u64;

    let mut lane = 0usize;
    while lane < main_lanes {
        let mut twos_a = _mm_setzero_si128();
        let mut twos_b = _mm_setzero_si128();
        let mut fours_a = _mm_setzero_si128();
        let mut fours_b = _mm_setzero_si128();
        let mut eights_a = _mm_setzero_si128();
        let mut eights_b = _mm_setzero_si128();
        let mut sixteens = _mm_setzero_si128();

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

        total += 16 * popcount_m128(sixteens);
        lane += 16;
    }

    total += 8 * popcount_m128(eights);
    total += 4 * popcount_m128(fours);
    total += 2 * popcount_m128(twos);
    total += popcount_m128(ones);

    while lane < lanes {
        total += popcount_m128(load_and(a_ptr, b_ptr, lane, 0));
        lane += 1;
    }

    let word_base = lanes * LANE_WORDS;
    and_popcount_tail_unrolled_4!(a, b, word_base, len - word_base, total);

    total
}
