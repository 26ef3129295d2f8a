//! Core reusable components: alignment kernels, compute devices, I/O.
//!
//! Nothing in here schedules work; the step pipeline in `pipelines::search`
//! drives these pieces.

pub mod alignment;
pub mod compute;
pub mod io;
pub mod utils;
