//! Native SIMD intrinsics for the dense and sparse intersection kernels.
//!
//! Hand-tuned `core::arch` kernels computing `popcount(A AND B)` over two
//! equally-sized `u64` word arrays, at SIMD widths 128/256/512 bits plus a
//! scalar fallback, following the Harley-Seal carry-save reduction
//! structure. A single ISA family (x86_64) is implemented with runtime
//! dispatch across three widths; an aarch64 NEON kernel provides the
//! "different SIMD ISA" re-implementation.
//!
//! # Module Structure
//!
//! - `scalar` — 64-bit popcount(AND) scalar kernel, 4x unrolled.
//! - `tail_unroll` — remainder-handling macro shared by every dense kernel's tail.
//! - `prefetch` — software prefetch hint used by the sparse kernel.
//! - `x86_sse41` — 128-bit kernel (x86_64 only).
//! - `x86_avx2` — 256-bit kernel (x86_64 only).
//! - `x86_avx512` — 512-bit kernel using ternary-logic CSA fusion (x86_64 only).
//! - `neon` — 128-bit kernel for aarch64.
//! - `sparse` — probe-based sparse intersection kernel.
//! - `dispatch` — capability-to-kernel resolution.
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::missing_panics_doc)]

// =============================================================================
// Shared submodules (scalar, macros, prefetch, sparse)
// =============================================================================

pub mod prefetch;
pub mod scalar;
mod tail_unroll;

#[allow(unused_imports)]
pub(crate) use tail_unroll::and_popcount_tail_unrolled_4;

pub use scalar::dense_scalar;

pub mod sparse;
pub use sparse::dense_sparse;

// Re-export prefetch helpers for the sparse kernel / drivers.
pub use prefetch::{calculate_prefetch_distance, prefetch_words, L2_CACHE_LINE_BYTES};

// =============================================================================
// Unsafe Invariants Reference
// =============================================================================
// SAFETY: Shared invariants for SIMD unsafe blocks in this module tree.
// - Condition 1: All pointer arithmetic is derived from slice pointers with loop bounds
//   proving in-range access for each lane width.
// - Condition 2: Target-featured functions are called only after runtime feature checks
//   or on architectures where the feature is guaranteed.
// - Condition 3: Unaligned loads use `*_loadu_*` intrinsics, so caller alignment beyond
//   the minimum required by the kernel is never assumed.
// Reason: Intrinsics and pointer math are required for hot-path SIMD performance.

// =============================================================================
// ISA kernel submodules
// =============================================================================

#[cfg(target_arch = "x86_64")]
mod x86_avx512;

#[cfg(target_arch = "x86_64")]
mod x86_avx2;

#[cfg(target_arch = "x86_64")]
mod x86_sse41;

#[cfg(target_arch = "aarch64")]
mod neon;

// Re-export ISA kernels so dispatch.rs can access them via `super::`
#[cfg(target_arch = "x86_64")]
pub(crate) use x86_avx512::dense_avx512;

#[cfg(target_arch = "x86_64")]
pub(crate) use x86_avx2::dense_avx2;

#[cfg(target_arch = "x86_64")]
pub(crate) use x86_sse41::dense_sse41;

#[cfg(target_arch = "aarch64")]
pub(crate) use neon::dense_neon;

// =============================================================================
// Dispatch module (public API)
// =============================================================================

mod dispatch;

pub use dispatch::{dense_kernel_for, KernelEngine, KernelPath};
