//! AVX-512 512-bit dense intersection kernel.
//!
//! At 512-bit width each CSA step collapses from three separate
//! xor/and/or instructions down to two `vpternlogq` instructions, since a
//! carry-save adder's high/low outputs are exactly the majority and
//! parity functions of three inputs: `h = maj(a, b, c)`, `l = a ^ b ^ c`.
//! Both are expressible as a single three-input truth table, so AVX-512's
//! ternary-logic instruction computes each in one op:
//!
//! - majority(a, b, c): truth table byte `0xE8`
//! - a ^ b ^ c:         truth table byte `0x96`
//!
//! Per-register popcount still has no native vector instruction, so it
//! reuses the nibble-lookup-table trick at 512-bit width via
//! `vpshufb`/`vpsadbw`, reduced with `_mm512_reduce_add_epi64`.

use std::arch::x86_64::*;

use super::and_popcount_tail_unrolled_4;

const LANE_WORDS: usize = 8;
const MAJORITY_IMM8: i32 = 0xE8;
const XOR3_IMM8: i32 = 0x96;

/// Full-adder carry-save step fused into two ternary-logic instructions.
#[inline]
unsafe fn csa(h: &mut __m512i, l: &mut __m512i, a: __m512i, b: __m512i, c: __m512i) {
    *h = _mm512_ternarylogic_epi64(a, b, c, MAJORITY_IMM8);
    *l = _mm512_ternarylogic_epi64(a, b, c, XOR3_IMM8);
}

/// Per-byte nibble-lookup popcount, horizontally reduced to a scalar sum.
#[inline]
unsafe fn popcount_m512(v: __m512i) -> u64 {
    // Nibble popcount table, broadcast across all four 128-bit lanes.
    let lookup = _mm512_set_epi8(
        4, 3, 3, 2, 3, 2, 2, 1, 3, 2, 2, 1, 2, 1, 1, 0, 4, 3, 3, 2, 3, 2, 2, 1, 3, 2, 2, 1, 2, 1,
        1, 0, 4, 3, 3, 2, 3, 2, 2, 1, 3, 2, 2, 1, 2, 1, 1, 0, 4, 3, 3, 2, 3, 2, 2, 1, 3, 2, 2, 1,
        2, 1, 1, 0,
    );
    let low_mask = _mm512_set1_epi8(0x0f);
    let lo_nibble = _mm512_and_si512(v, low_mask);
    let hi_nibble = _mm512_and_si512(_mm512_srli_epi16(v, 4), low_mask);
    let popcnt_lo = _mm512_shuffle_epi8(lookup, lo_nibble);
    let popcnt_hi = _mm512_shuffle_epi8(lookup, hi_nibble);
    let per_byte = _mm512_add_epi8(popcnt_lo, popcnt_hi);
    let sad = _mm512_sad_epu8(per_byte, _mm512_setzero_si512());
    _mm512_reduce_add_epi64(sad) as u64
}

#[inline]
unsafe fn load_and(a_ptr: *const u64, b_ptr: *const u64, lane: usize, offset: usize) -> __m512i {
    let byte_offset = (lane + offset) * LANE_WORDS;
    let va = _mm512_loadu_si512(a_ptr.add(byte_offset).cast::<i32>());
    let vb = _mm512_loadu_si512(b_ptr.add(byte_offset).cast::<i32>());
    _mm512_and_si512(va, vb)
}

/// 512-bit dense `popcount(a AND b)` kernel.
///
/// # Safety
///
/// Caller must have confirmed AVX-512F and AVX-512BW support (e.g. via
/// `crate::capability::capability()` reporting `PACKED_512_BW`) before
/// calling; this function is unsound to call otherwise.
#[target_feature(enable = "avx512f,avx512bw")]
#[allow(clippy::missing_panics_doc)]
pub(crate) unsafe fn dense_avx512(a: &[u64], b: &[u64]) -> u64 {
    debug_assert_eq!(a.len(), b.len(), "word slices must have equal length");

    let len = a.len();
    let lanes = len / LANE_WORDS;
    let main_lanes = lanes / 16 * 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut ones = _mm512_setzero_si512();
    let mut twos = _mm512_setzero_si512();
    let mut fours = _mm512_setzero_si512();
    let mut eights = _mm512_setzero_si512();
    let mut total = 0u64;

    let mut lane = 0usize;
    while lane < main_lanes {
        let mut twos_a = _mm512_setzero_si512();
        let mut twos_b = _mm512_setzero_si512();
        let mut fours_a = _mm512_setzero_si512();
        let mut fours_b = _mm512_setzero_si512();
        let mut eights_a = _mm512_setzero_si512();
        let mut eights_b = _mm512_setzero_si512();
        let mut sixteens = _mm512_setzero_si512();

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

        total += 16 * popcount_m512(sixteens);
        lane += 16;
    }

    total += 8 * popcount_m512(eights);
    total += 4 * popcount_m512(fours);
    total += 2 * popcount_m512(twos);
    total += popcount_m512(ones);

    while lane < lanes {
        total += popcount_m512(load_and(a_ptr, b_ptr, lane, 0));
        lane += 1;
    }

    let word_base = lanes * LANE_WORDS;
    and_popcount_tail_unrolled_4!(a, b, word_base, len - word_base, total);

    total
}
