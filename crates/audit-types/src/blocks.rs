//! Block production sampled per node and layer

use crate::{BlockId, LayerIndex, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::BuildHasher;

/// Blocks a single node produced, keyed by layer
///
/// A layer missing from the map is the same as a layer with no blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLayers {
    #[serde(default)]
    pub layers: BTreeMap<LayerIndex, Vec<BlockId>>,
}

impl NodeLayers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record blocks produced in `layer`, appending to any already known
    pub fn add_blocks<I>(&mut self, layer: LayerIndex, blocks: I)
    where
        I: IntoIterator<Item = BlockId>,
    {
        self.layers.entry(layer).or_default().extend(blocks);
    }

    /// Blocks produced in `layer` (empty when the layer was never seen)
    pub fn blocks_in(&self, layer: LayerIndex) -> &[BlockId] {
        self.layers.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total blocks over the half-open layer range `[from, to)`
    pub fn blocks_between(&self, from: LayerIndex, to: LayerIndex) -> u64 {
        if from >= to {
            return 0;
        }
        self.layers
            .range(from..to)
            .map(|(_, blocks)| blocks.len() as u64)
            .sum()
    }
}

/// Block production for every sampled node
pub type BlockMap = BTreeMap<NodeId, NodeLayers>;

/// Predicate deciding which nodes are left out of a validation
pub trait Exclusions {
    fn is_excluded(&self, node: &str) -> bool;
}

/// Excludes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusions;

impl Exclusions for NoExclusions {
    fn is_excluded(&self, _node: &str) -> bool {
        false
    }
}

impl<S: BuildHasher> Exclusions for HashSet<NodeId, S> {
    fn is_excluded(&self, node: &str) -> bool {
        self.contains(node)
    }
}

impl Exclusions for BTreeSet<NodeId> {
    fn is_excluded(&self, node: &str) -> bool {
        self.contains(node)
    }
}

impl Exclusions for [NodeId] {
    fn is_excluded(&self, node: &str) -> bool {
        self.iter().any(|n| n == node)
    }
}

impl Exclusions for Vec<NodeId> {
    fn is_excluded(&self, node: &str) -> bool {
        self.as_slice().is_excluded(node)
    }
}

impl Exclusions for [&str] {
    fn is_excluded(&self, node: &str) -> bool {
        self.iter().any(|n| *n == node)
    }
}

impl<T: Exclusions + ?Sized> Exclusions for &T {
    fn is_excluded(&self, node: &str) -> bool {
        (**self).is_excluded(node)
    }
}

impl<T: Exclusions> Exclusions for Option<T> {
    fn is_excluded(&self, node: &str) -> bool {
        self.as_ref().map_or(false, |inner| inner.is_excluded(node))
    }
}
