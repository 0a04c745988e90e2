//! Tunable constants for the blocked all-pairs driver.
//!
//! Two compile-time tunables drive the driver: the working-set target
//! behind the auto-computed block size (default 262 144 bytes) and the
//! sparse cutoff (default 50). Both are exposed as `const` defaults and
//! as fields on [`BlockConfig`] so a host application can override them
//! without a rebuild, following the `figment`-based layered configuration
//! idiom used elsewhere in this codebase lineage (TOML file, then
//! environment, then explicit builder calls, each layer overriding the
//! last).

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Default working-set target in bytes driving the auto-computed block size.
pub const DEFAULT_WORKING_SET_BYTES: usize = 262_144;

/// Default sparse cutoff: vectors with fewer set bits than this use the
/// probe-based sparse kernel instead of a dense AND+popcount.
pub const DEFAULT_SPARSE_CUTOFF: u32 = 50;

/// Minimum block size the driver will ever choose, regardless of the
/// working-set computation: falls back to 3 if the computed value would
/// be zero or smaller.
pub const MIN_BLOCK_SIZE: usize = 3;

/// Tunable knobs for the blocked all-pairs driver.
///
/// Constructed with [`BlockConfig::default`] for the built-in defaults, or
/// via [`BlockConfig::from_sources`] to layer a TOML file and environment
/// variables (prefixed `PAIRPOP_`) on top of the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Working-set target in bytes, used to derive the block size
    /// `B = floor(working_set_bytes / (n_words_per_vector * 8))`.
    pub working_set_bytes: usize,
    /// Sparse cutoff in set bits for the sparse-aware driver.
    pub sparse_cutoff: u32,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            working_set_bytes: DEFAULT_WORKING_SET_BYTES,
            sparse_cutoff: DEFAULT_SPARSE_CUTOFF,
        }
    }
}

impl BlockConfig {
    /// Computes the block size `B` for a given per-vector word count:
    /// `B = floor(working_set_bytes / (n * 8))`, clamped to a minimum of
    /// [`MIN_BLOCK_SIZE`].
    #[must_use]
    pub fn block_size(&self, n_words_per_vector: usize) -> usize {
        if n_words_per_vector == 0 {
            return MIN_BLOCK_SIZE;
        }
        let computed = self.working_set_bytes / (n_words_per_vector * 8);
        computed.max(MIN_BLOCK_SIZE)
    }

    /// Loads a [`BlockConfig`], layering (lowest to highest priority):
    /// built-in defaults, an optional `pairpop.toml` in the current
    /// directory, then environment variables prefixed `PAIRPOP_`
    /// (e.g. `PAIRPOP_SPARSE_CUTOFF=100`).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if a present `pairpop.toml` is
    /// malformed, or an environment variable fails to parse as the
    /// target field's type.
    pub fn from_sources() -> Result<Self, figment::Error> {
        use figment::{
            providers::{Env, Format, Serialized, Toml},
            Figment,
        };

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file("pairpop.toml"))
            .merge(Env::prefixed("PAIRPOP_"))
            .extract()
    }
}

static RESOLVED: OnceLock<BlockConfig> = OnceLock::new();

/// Returns the process-wide [`BlockConfig`] the driver entry points use,
/// resolved once via [`BlockConfig::from_sources`] and cached thereafter —
/// the same "detect once, cache forever" idiom `capability()` uses, so a
/// `pairpop.toml` or `PAIRPOP_`-prefixed environment variable is read at
/// most once per process rather than on every `intersect` call.
///
/// Falls back to [`BlockConfig::default`] (logging a warning) if loading
/// fails, e.g. a malformed `pairpop.toml`.
#[must_use]
pub fn resolved() -> BlockConfig {
    *RESOLVED.get_or_init(|| {
        BlockConfig::from_sources().unwrap_or_else(|err| {
            tracing::warn!(%err, "failed to load pairpop config, falling back to defaults");
            BlockConfig::default()
        })
    })
}
