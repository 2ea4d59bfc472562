//! Epoch Fairness - block production checks over whole epochs
//!
//! Given the blocks every node produced per layer, verify each participating
//! miner produced exactly its share of the network's average layer size.
//! - The bootstrap epoch is never validated
//! - Windows must start and end on epoch boundaries
//! - Rates are compared exactly, as fractions

pub mod error;
pub mod rate;
pub mod types;
pub mod validator;

pub use error::FairnessError;
pub use rate::Rate;
pub use types::*;
pub use validator::{validate_blocks_per_node, FairnessValidator, FairnessValidatorBuilder};
