//! Configuration and report types for fairness validation

use crate::rate::Rate;
use audit_types::{LayerIndex, NodeId};
use serde::Serialize;
use std::fmt;

/// Protocol parameters the expected production rate derives from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FairnessConfig {
    /// Layers in one epoch
    pub layers_per_epoch: u64,
    /// Network-wide average number of blocks per layer
    pub layer_avg_size: u64,
    /// Nodes expected to produce blocks
    pub num_miners: u64,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            layers_per_epoch: 3,
            layer_avg_size: 50,
            num_miners: 10,
        }
    }
}

/// Layer range `[from_layer, to_layer)` after bootstrap and alignment checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpochWindow {
    pub from_layer: LayerIndex,
    pub to_layer: LayerIndex,
}

impl EpochWindow {
    /// Number of layers sampled
    pub fn span(&self) -> u64 {
        self.to_layer - self.from_layer
    }

    pub fn is_empty(&self) -> bool {
        self.span() == 0
    }
}

/// How a single node fared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeOutcome {
    pub node: NodeId,
    /// Blocks produced inside the window
    pub blocks: u64,
    /// Blocks per layer; `None` when the window holds no layers
    pub observed: Option<Rate>,
    pub passed: bool,
}

/// A node whose production rate missed the expected share
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FairnessViolation {
    pub node: NodeId,
    pub observed: Rate,
    pub expected: Rate,
}

impl fmt::Display for FairnessViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {} failed creating the avg block size: blocks created per layer {}, wanted average block per node {}",
            self.node, self.observed, self.expected
        )
    }
}

/// Min, max and mean of the observed rates
#[derive(Debug, Clone, Default, Serialize)]
pub struct RateSummary {
    pub min: Option<Rate>,
    pub max: Option<Rate>,
    pub mean: f64,
    pub samples: usize,
}

impl RateSummary {
    pub fn track(&mut self, rate: Rate) {
        self.min = Some(self.min.map_or(rate, |m| m.min(rate)));
        self.max = Some(self.max.map_or(rate, |m| m.max(rate)));

        let count = self.samples as f64;
        self.mean = (self.mean * count + rate.as_f64()) / (count + 1.0);
        self.samples += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

/// Result of validating a block map
#[derive(Debug, Clone, Serialize)]
pub struct FairnessReport {
    pub window: EpochWindow,
    pub expected_rate: Rate,
    pub nodes: Vec<NodeOutcome>,
    /// Nodes left out by the exclusion predicate
    pub skipped: Vec<NodeId>,
    pub summary: RateSummary,
}

impl FairnessReport {
    pub fn passed(&self) -> bool {
        self.nodes.iter().all(|n| n.passed)
    }

    pub fn violations(&self) -> Vec<FairnessViolation> {
        self.nodes
            .iter()
            .filter(|n| !n.passed)
            .filter_map(|n| {
                n.observed.map(|observed| FairnessViolation {
                    node: n.node.clone(),
                    observed,
                    expected: self.expected_rate,
                })
            })
            .collect()
    }
}
