//! # Register-Interval Construction
//!
//! Partitions the control flow graph of a GPU kernel into register-intervals:
//! single-entry regions whose combined register footprint stays under a
//! fixed budget. Each interval boundary is a point where the registers of the
//! next interval can be prefetched into a register-file cache.
//!
//! - [frontend]: reads `nvdisasm -cfg` output into basic blocks.
//! - [passes]: builds the intervals and coarsens them to a fixpoint.
//! - [report]: dumps blocks and intervals as text snapshots.

#![forbid(unsafe_code)]
#![warn(clippy::wildcard_enum_match_arm)]

pub mod collections;
pub mod error;
pub mod frontend;
pub mod graph;
pub mod inst;
pub mod passes;
pub mod regs;
pub mod report;
pub mod utils;
