//! Short loop-text phrases from a generative model, with a fixed fallback.

pub mod client;
