pub mod tree;
mod node;

use thiserror::Error;

pub use tree::BTree;

pub const DEFAULT_DEGREE: usize = 3;
pub const MIN_DEGREE: usize = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("minimum degree must be at least {min}, got {0}", min = MIN_DEGREE)]
    DegreeTooSmall(usize),
}

/// Most keys a node may hold for minimum degree `t`.
pub(crate) const fn max_keys(degree: usize) -> usize {
    2 * degree - 1
}
