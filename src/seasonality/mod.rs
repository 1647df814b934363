//! Seasonal decomposition and strength measures.
//!
//! Used by [`crate::validation::nsdiffs`] to decide on seasonal differencing
//! and by the transform stage to describe the selected series.

pub mod decompose;

pub use decompose::{decompose, Decomposition};
