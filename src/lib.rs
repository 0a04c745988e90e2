//! # pairpop-core
//!
//! SIMD-accelerated all-pairs bitmap intersection popcount engine.
//!
//! Given a collection of `N` fixed-width bitmap vectors, computes
//!
//! ```text
//! S = Σ_{i<j} popcount(B_i AND B_j)
//! ```
//!
//! over every unordered pair, using runtime-dispatched Harley-Seal
//! carry-save SIMD kernels (128/256/512-bit on `x86_64`, NEON on
//! aarch64) and a cache-blocked upper-triangular outer loop. A
//! sparse-aware variant switches to a probe-based kernel for
//! low-cardinality operands.
//!
//! ## Quick start
//!
//! ```rust
//! use pairpop_core::{intersect, query_alignment};
//!
//! // 2 vectors, W=128 bits (2 words each).
//! let buffer: Vec<u64> = vec![0b1011, 0, 0b0011, 0];
//! let sum = intersect(&buffer, 2, 2).unwrap();
//! assert_eq!(sum, 2); // popcount(0b1011 & 0b0011) = popcount(0b0011) = 2
//!
//! // Caller-owned buffers should be allocated at this alignment.
//! let _alignment = query_alignment();
//! ```
//!
//! ## Scope
//!
//! This crate is deliberately narrow: no persistence, no multi-threading,
//! no sparse *output*, no I/O, and no CLI. It computes one scalar from
//! caller-owned buffers and returns. See `SPEC_FULL.md` for the full
//! component design and `DESIGN.md` for the grounding ledger behind each
//! piece of this implementation.

#![warn(missing_docs)]
#![cfg_attr(
    test,
    allow(
        clippy::cast_lossless,
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::uninlined_format_args
    )
)]

pub mod alloc_guard;
pub mod bitmap;
pub mod capability;
pub mod config;
mod driver;
pub mod error;
pub mod simd_native;

pub use bitmap::{derive_sparse_metadata, AlignedBitmapBuffer, SparseMetadata};
pub use capability::{capability, query_alignment, CapabilityMask};
pub use config::{resolved as resolved_config, BlockConfig, DEFAULT_SPARSE_CUTOFF, DEFAULT_WORKING_SET_BYTES, MIN_BLOCK_SIZE};
pub use driver::{intersect, intersect_sparse, intersect_with_stats, PopcountStats};
pub use error::PopcountError;
pub use simd_native::{dense_kernel_for, KernelEngine, KernelPath};
