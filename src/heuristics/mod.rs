//! Heuristics module for the node-cost TSP.
//!
//! This module exports the single-pass construction heuristics. There is no
//! improvement phase: every tour is built once and returned as-is.

pub mod construction;

pub use construction::*;
