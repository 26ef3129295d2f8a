//! Search pipelines.
//!
//! - `search`: lane-batched database scan driven by a double-buffered step loop

pub mod search;
