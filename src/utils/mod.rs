//! # General Utilities
//!
//! Graph abstractions shared by the block-level and the interval-level
//! control flow graphs.

pub mod cfg;
pub mod marks;
