//! Fairness validation errors

use crate::types::FairnessViolation;
use audit_types::LayerIndex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FairnessError {
    #[error("layers per epoch must be positive")]
    ZeroEpochLength,

    #[error("number of miners must be positive")]
    NoMiners,

    #[error("starting layer ({from}) must not be after ending layer ({to})")]
    InvertedRange { from: LayerIndex, to: LayerIndex },

    #[error(
        "layer to start from and layer to end at must be at the beginning and ending of an epoch \
         (from layer={from}, to layer={to}, layers per epoch={layers_per_epoch})"
    )]
    Misaligned {
        from: LayerIndex,
        to: LayerIndex,
        layers_per_epoch: u64,
    },

    #[error("arithmetic overflow computing the expected rate")]
    ArithmeticOverflow,

    #[error("{} node(s) failed fairness validation: {}", .violations.len(), join(.violations))]
    Unfair { violations: Vec<FairnessViolation> },
}

impl FairnessError {
    /// True for errors raised before any node was examined
    pub fn is_precondition(&self) -> bool {
        !matches!(self, FairnessError::Unfair { .. })
    }
}

fn join(violations: &[FairnessViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
