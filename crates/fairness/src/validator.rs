//! Fairness validator - checks every miner produced its share of blocks
//!
//! Each miner is expected to produce `floor(layer_avg_size * layers_per_epoch / num_miners)`
//! blocks per epoch. Over a run of whole epochs the per-layer average must match
//! that share exactly.

use crate::error::FairnessError;
use crate::rate::Rate;
use crate::types::{EpochWindow, FairnessConfig, FairnessReport, NodeOutcome, RateSummary};
use audit_types::{is_epoch_boundary, BlockMap, Exclusions, LayerIndex};

/// Validates block production over whole epochs
pub struct FairnessValidator {
    config: FairnessConfig,
}

impl FairnessValidator {
    /// Create a new validator
    pub fn new(config: FairnessConfig) -> Self {
        Self { config }
    }

    /// Expected blocks per layer for every miner
    pub fn expected_rate(&self) -> Result<Rate, FairnessError> {
        let FairnessConfig {
            layers_per_epoch,
            layer_avg_size,
            num_miners,
        } = self.config;

        if layers_per_epoch == 0 {
            return Err(FairnessError::ZeroEpochLength);
        }
        if num_miners == 0 {
            return Err(FairnessError::NoMiners);
        }

        let per_epoch = layer_avg_size
            .checked_mul(layers_per_epoch)
            .ok_or(FairnessError::ArithmeticOverflow)?;
        Rate::new(per_epoch / num_miners, layers_per_epoch).ok_or(FairnessError::ZeroEpochLength)
    }

    /// Resolve the layer window, skipping the bootstrap epoch
    pub fn window(
        &self,
        from_layer: LayerIndex,
        to_layer: LayerIndex,
    ) -> Result<EpochWindow, FairnessError> {
        let layers_per_epoch = self.config.layers_per_epoch;
        if layers_per_epoch == 0 {
            return Err(FairnessError::ZeroEpochLength);
        }

        // The first epoch bootstraps the network and is never validated
        let from_layer = if from_layer == 0 {
            tracing::info!(
                "Moving starting layer from 0 to {}, not validating first epoch",
                layers_per_epoch
            );
            layers_per_epoch
        } else {
            from_layer
        };

        if from_layer > to_layer {
            return Err(FairnessError::InvertedRange {
                from: from_layer,
                to: to_layer,
            });
        }

        if !is_epoch_boundary(from_layer, layers_per_epoch)
            || !is_epoch_boundary(to_layer, layers_per_epoch)
        {
            return Err(FairnessError::Misaligned {
                from: from_layer,
                to: to_layer,
                layers_per_epoch,
            });
        }

        Ok(EpochWindow {
            from_layer,
            to_layer,
        })
    }

    /// Validate every non-excluded node in `block_map` over `[from_layer, to_layer)`
    ///
    /// All nodes are examined before returning so the error lists every offender.
    pub fn validate<E>(
        &self,
        block_map: &BlockMap,
        from_layer: LayerIndex,
        to_layer: LayerIndex,
        exclusions: E,
    ) -> Result<FairnessReport, FairnessError>
    where
        E: Exclusions,
    {
        let expected = self.expected_rate()?;
        let window = self.window(from_layer, to_layer)?;

        if window.is_empty() {
            tracing::warn!(
                "Empty layer window at layer {}, nothing to validate",
                window.from_layer
            );
        }

        let mut nodes = Vec::with_capacity(block_map.len());
        let mut skipped = Vec::new();
        let mut summary = RateSummary::default();

        for (node, layers) in block_map {
            if exclusions.is_excluded(node) {
                tracing::info!("Skipping node {}", node);
                skipped.push(node.clone());
                continue;
            }

            let blocks = layers.blocks_between(window.from_layer, window.to_layer);
            let observed = Rate::new(blocks, window.span());
            let passed = observed.map_or(true, |rate| rate == expected);

            if let Some(rate) = observed {
                summary.track(rate);
            }

            if passed {
                tracing::info!("Validated node {}: {} blocks", node, blocks);
            } else {
                tracing::warn!(
                    "Node {} failed creating the avg block size: blocks created per layer {}, wanted average block per node {}",
                    node,
                    observed.map(|r| r.to_string()).unwrap_or_default(),
                    expected
                );
            }

            nodes.push(NodeOutcome {
                node: node.clone(),
                blocks,
                observed,
                passed,
            });
        }

        let report = FairnessReport {
            window,
            expected_rate: expected,
            nodes,
            skipped,
            summary,
        };

        if let (Some(min), Some(max)) = (report.summary.min, report.summary.max) {
            tracing::info!(
                "Rate report: {} nodes, avg {:.3}, max {}, min {}, expected {}",
                report.summary.samples,
                report.summary.mean,
                max,
                min,
                expected
            );
        }

        let violations = report.violations();
        if !violations.is_empty() {
            return Err(FairnessError::Unfair { violations });
        }

        tracing::info!(
            "Validation succeeded for {} nodes over layers {}..{}",
            report.nodes.len(),
            window.from_layer,
            window.to_layer
        );
        Ok(report)
    }
}

/// Builder for FairnessValidator
pub struct FairnessValidatorBuilder {
    config: FairnessConfig,
}

impl FairnessValidatorBuilder {
    pub fn new() -> Self {
        Self {
            config: FairnessConfig::default(),
        }
    }

    pub fn layers_per_epoch(mut self, layers: u64) -> Self {
        self.config.layers_per_epoch = layers;
        self
    }

    pub fn layer_avg_size(mut self, size: u64) -> Self {
        self.config.layer_avg_size = size;
        self
    }

    pub fn num_miners(mut self, miners: u64) -> Self {
        self.config.num_miners = miners;
        self
    }

    pub fn build(self) -> FairnessValidator {
        FairnessValidator::new(self.config)
    }
}

impl Default for FairnessValidatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot validation without keeping a validator around
pub fn validate_blocks_per_node<E: Exclusions>(
    block_map: &BlockMap,
    from_layer: LayerIndex,
    to_layer: LayerIndex,
    layers_per_epoch: u64,
    layer_avg_size: u64,
    num_miners: u64,
    exclusions: E,
) -> Result<FairnessReport, FairnessError> {
    FairnessValidatorBuilder::new()
        .layers_per_epoch(layers_per_epoch)
        .layer_avg_size(layer_avg_size)
        .num_miners(num_miners)
        .build()
        .validate(block_map, from_layer, to_layer, exclusions)
}
