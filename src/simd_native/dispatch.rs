//! Capability-to-kernel resolution for the dense intersection kernels.
//!
//! Two ways to use the resolved kernel, both documented in spec.md §9 as
//! equally acceptable:
//!
//! - [`dense_kernel_for`] + [`KernelPath::call`] — resolve per call, a
//!   `match` in the hot loop that the compiler monomorphises.
//! - [`KernelEngine`] — resolve once per `n_words_per_vector` and reuse a
//!   cached function pointer across every pair of one `intersect` call,
//!   mirroring the `DistanceEngine` "resolve once, call many" pattern from
//!   this codebase's distance-dispatch layer.
//!
//! Either way the chosen kernel is a pure function of
//! `(capability mask, n_words_per_vector)`, stable for the process
//! lifetime, per spec.md §9.

use crate::capability::{capability, CapabilityMask};

/// Which dense kernel a given `(capability, n_words_per_vector)` pair
/// resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelPath {
    /// AVX-512BW, 512-bit lanes (`x86_64` only).
    Avx512,
    /// AVX2, 256-bit lanes (`x86_64` only).
    Avx2,
    /// SSE4.1, 128-bit lanes (`x86_64` only).
    Sse41,
    /// NEON, 128-bit lanes (aarch64 only).
    Neon,
    /// Portable 64-bit scalar fallback.
    Scalar,
}

impl KernelPath {
    /// Minimum `n_words_per_vector` this path's SIMD prologue needs to be
    /// worth its setup cost, per spec.md §4.5. `Scalar`/`Neon` have no
    /// lower bound.
    #[inline]
    #[must_use]
    const fn min_words(self) -> usize {
        match self {
            Self::Avx512 => 128,
            Self::Avx2 => 64,
            Self::Sse41 => 32,
            Self::Neon | Self::Scalar => 0,
        }
    }
}

/// Resolves the widest dense kernel supported by `cap` whose minimum
/// vector size is satisfied by `n_words_per_vector`, per spec.md §4.5:
/// AVX-512BW at ≥128 words, else AVX2 at ≥64, else SSE4.1 at ≥32, else
/// scalar. On aarch64, NEON is always selected (it carries no capability
/// gate or minimum-size precondition).
#[inline]
#[must_use]
pub fn dense_kernel_for(cap: CapabilityMask, n_words_per_vector: usize) -> KernelPath {
    #[cfg(target_arch = "aarch64")]
    {
        let _ = (cap, n_words_per_vector);
        return KernelPath::Neon;
    }

    #[cfg(target_arch = "x86_64")]
    {
        for path in [KernelPath::Avx512, KernelPath::Avx2, KernelPath::Sse41] {
            let required = match path {
                KernelPath::Avx512 => CapabilityMask::PACKED_512_BW,
                KernelPath::Avx2 => CapabilityMask::PACKED_256,
                KernelPath::Sse41 => CapabilityMask::PACKED_128,
                _ => unreachable!(),
            };
            if cap.contains(required) && n_words_per_vector >= path.min_words() {
                return path;
            }
        }
        return KernelPath::Scalar;
    }

    #[allow(unreachable_code)]
    {
        let _ = (cap, n_words_per_vector);
        KernelPath::Scalar
    }
}

fn call_scalar(a: &[u64], b: &[u64]) -> u64 {
    super::scalar::dense_scalar(a, b)
}

#[cfg(target_arch = "x86_64")]
fn call_sse41(a: &[u64], b: &[u64]) -> u64 {
    // SAFETY: only installed as `KernelEngine::kernel_fn` when `dense_kernel_for`
    // resolved `Sse41`, which requires `CapabilityMask::PACKED_128`.
    unsafe { super::dense_sse41(a, b) }
}

#[cfg(target_arch = "x86_64")]
fn call_avx2(a: &[u64], b: &[u64]) -> u64 {
    // SAFETY: only installed when `dense_kernel_for` resolved `Avx2`, which
    // requires `CapabilityMask::PACKED_256`.
    unsafe { super::dense_avx2(a, b) }
}

#[cfg(target_arch = "x86_64")]
fn call_avx512(a: &[u64], b: &[u64]) -> u64 {
    // SAFETY: only installed when `dense_kernel_for` resolved `Avx512`, which
    // requires `CapabilityMask::PACKED_512_BW`.
    unsafe { super::dense_avx512(a, b) }
}

#[cfg(target_arch = "aarch64")]
fn call_neon(a: &[u64], b: &[u64]) -> u64 {
    // SAFETY: NEON is part of the aarch64 baseline; no capability gate needed.
    unsafe { super::dense_neon(a, b) }
}

impl KernelPath {
    /// Runs this path's dense kernel over `a AND b`.
    ///
    /// # Panics
    ///
    /// Debug-asserts `a.len() == b.len()`, matching every kernel's own
    /// contract; mismatched lengths are undefined behaviour in release
    /// builds.
    #[inline]
    #[must_use]
    pub fn call(self, a: &[u64], b: &[u64]) -> u64 {
        (self.resolve_fn())(a, b)
    }

    fn resolve_fn(self) -> fn(&[u64], &[u64]) -> u64 {
        match self {
            #[cfg(target_arch = "x86_64")]
            Self::Avx512 => call_avx512,
            #[cfg(target_arch = "x86_64")]
            Self::Avx2 => call_avx2,
            #[cfg(target_arch = "x86_64")]
            Self::Sse41 => call_sse41,
            #[cfg(target_arch = "aarch64")]
            Self::Neon => call_neon,
            _ => call_scalar,
        }
    }
}

/// A pre-resolved, `Copy`, `Send + Sync` dense-kernel function pointer,
/// resolved once for a given `n_words_per_vector` and reused across every
/// pair of one all-pairs pass — all vectors in a single `intersect` call
/// share the same word count, so resolving once up front eliminates the
/// per-pair `match` entirely.
#[derive(Clone, Copy)]
pub struct KernelEngine {
    kernel_fn: fn(&[u64], &[u64]) -> u64,
    path: KernelPath,
}

impl std::fmt::Debug for KernelEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelEngine")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl KernelEngine {
    /// Resolves the dense kernel for the current process-wide capability
    /// mask and the given per-vector word count.
    #[must_use]
    pub fn new(n_words_per_vector: usize) -> Self {
        let path = dense_kernel_for(capability(), n_words_per_vector);
        tracing::debug!(?path, n_words_per_vector, "resolved dense kernel");
        Self {
            kernel_fn: path.resolve_fn(),
            path,
        }
    }

    /// Computes `popcount(a AND b)` using the pre-resolved kernel.
    #[inline]
    #[must_use]
    pub fn call(&self, a: &[u64], b: &[u64]) -> u64 {
        (self.kernel_fn)(a, b)
    }

    /// The dense kernel path this engine resolved to.
    #[inline]
    #[must_use]
    pub fn path(&self) -> KernelPath {
        self.path
    }
}
