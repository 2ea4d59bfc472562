//! Shared types for cluster audits
//!
//! This crate holds the data the audit components exchange:
//! - Per-node, per-layer block production sampled from a running cluster
//! - Log hits returned by the cluster's log query service
//! - The node exclusion predicate used when validating production

pub mod blocks;
pub mod logs;

pub use blocks::{BlockMap, Exclusions, NoExclusions, NodeLayers};
pub use logs::{log_entry_attribute, LogHit, ReleaseTick, LOG_ENTRIES};

/// Node identifier as reported by the cluster
pub type NodeId = String;

/// Block identifier
pub type BlockId = String;

/// Consensus layer index (layer 0 is genesis)
pub type LayerIndex = u64;

/// Whether `layer` starts an epoch
pub fn is_epoch_boundary(layer: LayerIndex, layers_per_epoch: u64) -> bool {
    layer % layers_per_epoch == 0
}
