pub mod core; // Matrices, query profiles, the lane kernel, compute devices, I/O
pub mod defaults;
pub mod error;
pub mod pipelines; // Host-side step pipeline
pub mod scan; // Entry points for the CLI subcommands
pub mod search_opt;
