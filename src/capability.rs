//! CPU capability probe and alignment advisor.
//!
//! One-shot detection of instruction-set support, cached process-wide in
//! a [`std::sync::OnceLock`] — the same "detect once, cache forever" idiom
//! this codebase lineage uses for its SIMD-tier detection. Detection
//! delegates to `is_x86_feature_detected!`, which already folds in the
//! OS-saved-extended-state check (XCR0/XGETBV for AVX and AVX-512 state);
//! re-deriving that check by hand here would just reimplement what the
//! standard library already verifies soundly.

use std::sync::OnceLock;

/// Named capability flags, packed into a single bitmask.
///
/// A process-wide immutable word of named flags, populated at first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityMask(u32);

impl CapabilityMask {
    /// Hardware `POPCNT` instruction (used by the 128-bit kernel's
    /// per-lane scalar popcount and as a general capability signal).
    pub const POPCNT: u32 = 1 << 0;
    /// 128-bit packed integer SIMD (SSE4.1 on x86_64).
    pub const PACKED_128: u32 = 1 << 1;
    /// 256-bit packed integer SIMD (AVX2 on x86_64).
    pub const PACKED_256: u32 = 1 << 2;
    /// 512-bit packed byte/word SIMD (AVX-512BW on x86_64).
    pub const PACKED_512_BW: u32 = 1 << 3;

    const fn empty() -> Self {
        Self(0)
    }

    const fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    /// Returns `true` if every bit in `flag` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Returns the raw bitmask value.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Builds an arbitrary mask from raw bits, for exercising the
    /// dispatcher's threshold logic against masks the current CPU may not
    /// actually have.
    #[cfg(test)]
    #[must_use]
    pub(crate) const fn from_bits_for_test(bits: u32) -> Self {
        Self(bits)
    }
}

static CAPABILITY: OnceLock<CapabilityMask> = OnceLock::new();

#[cfg(target_arch = "x86_64")]
fn detect() -> CapabilityMask {
    let mut mask = CapabilityMask::empty();

    if is_x86_feature_detected!("popcnt") {
        mask = mask.with(CapabilityMask::POPCNT);
    }
    if is_x86_feature_detected!("sse4.1") {
        mask = mask.with(CapabilityMask::PACKED_128);
    }
    if is_x86_feature_detected!("avx2") {
        mask = mask.with(CapabilityMask::PACKED_256);
    }
    if is_x86_feature_detected!("avx512bw") {
        mask = mask.with(CapabilityMask::PACKED_512_BW);
    }

    mask
}

#[cfg(not(target_arch = "x86_64"))]
fn detect() -> CapabilityMask {
    // Non-x86 targets: scalar-only here. The aarch64 kernel module
    // provides its own always-available NEON path, which is not gated
    // by this x86-shaped bitmask.
    CapabilityMask::empty()
}

/// Returns the cached, process-wide CPU capability bitmask.
///
/// Racy concurrent first callers may each run [`detect`], but every
/// computed value is bit-identical, so a plain [`OnceLock`] is sufficient:
/// readers may observe either the sentinel or the committed value, and
/// either way it's the same answer.
#[inline]
#[must_use]
pub fn capability() -> CapabilityMask {
    *CAPABILITY.get_or_init(|| {
        let mask = detect();
        tracing::debug!(bits = mask.bits(), "cpu capability probe resolved");
        mask
    })
}

/// Returns the minimum buffer alignment (bytes) required by the kernel
/// the dispatcher would select for this CPU: 64/32/16/8 bytes, matching
/// the AVX-512/AVX2/SSE4.1/scalar widths in descending preference order.
#[inline]
#[must_use]
pub fn query_alignment() -> u32 {
    let cap = capability();
    if cap.contains(CapabilityMask::PACKED_512_BW) {
        64
    } else if cap.contains(CapabilityMask::PACKED_256) {
        32
    } else if cap.contains(CapabilityMask::PACKED_128) {
        16
    } else {
        8
    }
}
