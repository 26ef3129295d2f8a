//! Input loading and hit output.

pub mod async_writer; // Background output thread
pub mod database;
pub mod fasta_reader;
pub mod hit_output;
