//! CPU cache prefetch utilities for the sparse intersection kernel.
//!
//! The sparse kernel probes a dense bitmap at effectively random word
//! offsets (the set-bit positions of the other operand), which makes it
//! latency-bound on cache misses. Prefetching the word a few probe
//! positions ahead hides that latency behind the current iteration's work.

/// L2 cache line size in bytes (standard for modern x86_64 and aarch64 CPUs).
pub const L2_CACHE_LINE_BYTES: usize = 64;

/// Calculates how many probe positions ahead to prefetch, based on the
/// dense operand's size in words.
///
/// # Algorithm
///
/// `distance = (vector_bytes / L2_CACHE_LINE_BYTES).clamp(4, 16)`
/// - Minimum 4: enough lookahead for out-of-order execution to hide a miss.
/// - Maximum 16: avoids evicting cache lines that are still needed.
#[inline]
#[must_use]
pub const fn calculate_prefetch_distance(n_words_per_vector: usize) -> usize {
    let vector_bytes = n_words_per_vector * 8;
    let raw_distance = vector_bytes / L2_CACHE_LINE_BYTES;
    if raw_distance < 4 {
        4
    } else if raw_distance > 16 {
        16
    } else {
        raw_distance
    }
}

/// Prefetches the cache line containing `words[0]` into L1 (T0 hint).
///
/// # Platform Support
///
/// - **x86_64**: `_mm_prefetch` with `_MM_HINT_T0`.
/// - **aarch64**: the `prfm pldl1keep` instruction via inline `asm!`.
/// - **Other**: no-op.
///
/// # Safety
///
/// This function is safe because prefetch instructions are hints and
/// cannot cause memory faults, even for an out-of-bounds or unmapped
/// address.
#[inline]
pub fn prefetch_words(words: &[u64]) {
    if words.is_empty() {
        return;
    }

    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: _mm_prefetch is a hint instruction that cannot cause memory faults.
        // - Condition 1: the pointer is derived from a valid slice reference (non-empty check above)
        // - Condition 2: prefetch instructions are hints and never fault, even with invalid addresses
        // - Condition 3: x86_64 architecture guarantees _mm_prefetch availability
        // Reason: warms the cache line ahead of the sparse probe's random-access read.
        unsafe {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            _mm_prefetch(words.as_ptr().cast::<i8>(), _MM_HINT_T0);
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: `prfm` is a hint instruction that cannot fault.
        // - Condition 1: the pointer is derived from a valid slice reference (non-empty check above)
        // - Condition 2: prefetch hints never fault, even for unmapped addresses
        unsafe {
            std::arch::asm!(
                "prfm pldl1keep, [{0}]",
                in(reg) words.as_ptr(),
                options(nostack, readonly),
            );
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        let _ = words;
    }
}
