//! Alignment kernels and the per-query data they operate on.
//!
//! These modules know nothing about lanes being fed or results being
//! reported; they implement the recurrence and its inputs.

pub mod kernel; // Lane-step recurrence, specialised per unroll factor
pub mod matrix;
pub mod profile; // Query lookup table builder
pub mod scalar; // Reference implementation
pub mod workspace; // Device-resident DP state
