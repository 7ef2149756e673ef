//! Line breakdown, measurement and vertical placement of the repeating text block.

pub mod metrics;
