//! Error type for the public entry points.
//!
//! The inner kernels keep the zero-overhead, debug-assert-only contract:
//! once a call has passed the shape checks here, everything past this
//! module is the caller's responsibility, exactly as an `unsafe` SIMD
//! kernel expects. See `SPEC_FULL.md` §7 for the two-tier rationale.

/// Errors returned by the public driver entry points before any kernel runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PopcountError {
    /// `n_words_per_vector` was zero; every kernel requires at least one word.
    #[error("n_words_per_vector must be >= 1, got 0")]
    ZeroWordsPerVector,

    /// The flat buffer is shorter than `n * n_words_per_vector` words.
    #[error(
        "buffer too short: need {needed} words for {n} vectors of {n_words_per_vector} words each, got {actual}"
    )]
    BufferTooShort {
        /// Words required by `n * n_words_per_vector`.
        needed: usize,
        /// Words actually present in the supplied buffer.
        actual: usize,
        /// Vector count that was requested.
        n: usize,
        /// Word count per vector that was requested.
        n_words_per_vector: usize,
    },

    /// `n_alts` or `alt_offsets` did not have length `n`.
    #[error("{field} has length {actual}, expected {expected} (one entry per vector)")]
    SparseMetadataLengthMismatch {
        /// Which field was malformed (`"n_alts"` or `"alt_offsets"`).
        field: &'static str,
        /// Length actually supplied.
        actual: usize,
        /// Length required (equal to `n`).
        expected: usize,
    },

    /// An `alt_offsets[i] + n_alts[i]` range fell outside `alt_positions`.
    #[error(
        "vector {index}: position list range [{start}, {end}) exceeds alt_positions length {len}"
    )]
    SparsePositionRangeOutOfBounds {
        /// Index of the offending vector.
        index: usize,
        /// Start offset of the vector's position list.
        start: usize,
        /// End offset (`start + n_alts[index]`).
        end: usize,
        /// Length of the shared `alt_positions` buffer.
        len: usize,
    },
}
