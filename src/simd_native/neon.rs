//! ARM NEON 128-bit dense intersection kernel.
//!
//! NEON is always available on aarch64, so no runtime detection or
//! `#[target_feature]` gate is needed here, unlike the x86_64 kernels.
//! Unlike x86, ARM provides a native per-byte population-count
//! instruction (`vcnt.8`), so the popcount step needs no nibble-lookup
//! trick: count each byte directly, then horizontally add all 16 lanes
//! with `vaddv`.

use std::arch::aarch64::*;

use super::and_popcount_tail_unrolled_4;

const LANE_WORDS: usize = 2;

/// Full-adder carry-save step: `h = majority(a, b, c)`, `l = a ^ b ^ c`.
#[inline]
unsafe fn csa(h: &mut uint64x2_t, l: &mut uint64x2_t, a: uint64x2_t, b: uint64x2_t, c: uint64x2_t) {
    let u = veorq_u64(a, b);
    *h = vorrq_u64(vandq_u64(a, b), vandq_u64(u, c));
    *l = veorq_u64(u, c);
}

/// Native per-byte popcount (`vcnt.8`) horizontally summed across all 16 lanes.
#[inline]
unsafe fn popcount_u64x2(v: uint64x2_t) -> u64 {
    let bytes = vreinterpretq_u8_u64(v);
    let counted = vcntq_u8(bytes);
    u64::from(vaddvq_u8(counted))
}

#[inline]
unsafe fn load_and(a_ptr: *const u64, b_ptr: *const u64, lane: usize, offset: usize) -> uint64x2_t {
    let byte_offset = (lane + offset) * LANE_WORDS;
    let va = vld1q_u64(a_ptr.add(byte_offset));
    let vb = vld1q_u64(b_ptr.add(byte_offset));
    vandq_u64(va, vb)
}

/// 128-bit dense `popcount(a AND b)` kernel for aarch64.
///
/// # Safety
///
/// NEON is part of the aarch64 baseline, so unlike the x86_64 kernels
/// this has no capability precondition beyond running on aarch64. The
/// function is still `unsafe` because it issues raw intrinsics.
#[allow(clippy::missing_panics_doc)]
pub(crate) unsafe fn dense_neon(a: &[u64], b: &[u64]) -> u64 {
    debug_assert_eq!(a.len(), b.len(), "word slices must have equal length");

    let len = a.len();
    let lanes = len / LANE_WORDS;
    let main_lanes = lanes / 16 * 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut ones = vdupq_n_u64(0);
    let mut twos = vdupq_n_u64(0);
    let mut fours = vdupq_n_u64(0);
    let mut eights = vdupq_n_u64(0);
    let mut total = 0u64;

    let mut lane = 0usize;
    while lane < main_lanes {
        let mut twos_a = vdupq_n_u64(0);
        let mut twos_b = vdupq_n_u64(0);
        let mut fours_a = vdupq_n_u64(0);
        let mut fours_b = vdupq_n_u64(0);
        let mut eights_a = vdupq_n_u64(0);
        let mut eights_b = vdupq_n_u64(0);
        let mut sixteens = vdupq_n_u64(0);

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

        total += 16 * popcount_u64x2(sixteens);
        lane += 16;
    }

    total += 8 * popcount_u64x2(eights);
    total += 4 * popcount_u64x2(fours);
    total += 2 * popcount_u64x2(twos);
    total += popcount_u64x2(ones);

    while lane < lanes {
        total += popcount_u64x2(load_and(a_ptr, b_ptr, lane, 0));
        lane += 1;
    }

    let word_base = lanes * LANE_WORDS;
    and_popcount_tail_unrolled_4!(a, b, word_base, len - word_base, total);

    total
}
