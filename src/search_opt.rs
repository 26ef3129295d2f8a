use clap::Args;
use std::path::PathBuf;

use crate::core::compute::{check_unroll, ComputeBackend};
use crate::defaults;
use crate::pipelines::search::lanes::ComparisonPolicy;

// src/search_opt.rs
//
// Search options: lane geometry, scoring, target/query ranges and run control.

/// Options consumed by the search core.
#[derive(Debug, Clone)]
pub struct SearchOpt {
    // Lane geometry
    pub lanes: usize,  // Parallel lanes (N)
    pub unroll: usize, // Sequences interleaved per lane (U)

    // Scoring
    pub gap_penalty: i32, // Linear cost per gap residue
    pub threshold: i32,   // Minimum score for a reported record
    pub matrix: String,   // "BLOSUM62" or path to an NCBI-style matrix file

    // Target range
    pub policy: ComparisonPolicy,
    pub start_offset: usize,       // First target index (resume point)
    pub end_offset: Option<usize>, // One past the last target index

    // Query range (all-on-all mode)
    pub query_start: usize,
    pub query_end: Option<usize>,

    // Run control
    pub progress_interval: u64, // Steps between progress lines (0 = off)
    pub n_threads: usize,
    pub backend: ComputeBackend,
    pub verify: bool, // Re-score every record with the scalar reference
    pub verbosity: i32,
}

impl Default for SearchOpt {
    fn default() -> Self {
        SearchOpt {
            lanes: defaults::NUM_LANES,
            unroll: defaults::UNROLL,
            gap_penalty: defaults::GAP_PENALTY,
            threshold: defaults::MIN_SCORE,
            matrix: defaults::MATRIX.to_string(),
            policy: ComparisonPolicy::AllPairs,
            start_offset: 0,
            end_offset: None,
            query_start: 0,
            query_end: None,
            progress_interval: defaults::PROGRESS_INTERVAL,
            n_threads: num_cpus::get(),
            backend: ComputeBackend::default(),
            verify: false,
            verbosity: defaults::VERBOSITY,
        }
    }
}

impl SearchOpt {
    /// Check option ranges. Returns every problem found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.lanes < 1 {
            errors.push(format!("lanes must be >= 1, got {}", self.lanes));
        }
        if let Err(e) = check_unroll(self.unroll) {
            errors.push(e.to_string());
        }
        if self.gap_penalty < 1 {
            errors.push(format!(
                "gap_penalty must be >= 1, got {}",
                self.gap_penalty
            ));
        }
        if self.threshold < 1 {
            errors.push(format!("threshold must be >= 1, got {}", self.threshold));
        }
        if let Some(end) = self.end_offset {
            if end < self.start_offset {
                errors.push(format!(
                    "end_offset {} is before start_offset {}",
                    end, self.start_offset
                ));
            }
        }
        if let Some(end) = self.query_end {
            if end < self.query_start {
                errors.push(format!(
                    "query_end {} is before query_start {}",
                    end, self.query_start
                ));
            }
        }
        if self.n_threads < 1 {
            errors.push(format!("threads must be >= 1, got {}", self.n_threads));
        }
        if !(1..=5).contains(&self.verbosity) {
            errors.push(format!(
                "verbosity must be in [1, 5], got {}",
                self.verbosity
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Slots per step (`lanes * unroll`).
    pub fn slots(&self) -> usize {
        self.lanes * self.unroll
    }
}

/// Command-line surface shared by `search` and `estimate`.
#[derive(Debug, Clone, Args)]
pub struct SearchCliOptions {
    /// Database FASTA file (plain or gzip)
    #[arg(value_name = "DB.FA")]
    pub database: PathBuf,

    /// Query FASTA file (default: all-on-all against the database itself)
    #[arg(short = 'q', long, value_name = "QUERY.FA")]
    pub queries: Option<PathBuf>,

    // ===== Lane Geometry =====
    /// Number of parallel lanes
    #[arg(short = 'N', long, value_name = "INT", default_value_t = defaults::NUM_LANES)]
    pub lanes: usize,

    /// Sequences interleaved per lane (1, 2, 4, 8 or 16)
    #[arg(short = 'U', long, value_name = "INT", default_value_t = defaults::UNROLL)]
    pub unroll: usize,

    // ===== Scoring =====
    /// Linear gap penalty per gap residue
    #[arg(short = 'g', long, value_name = "INT", default_value_t = defaults::GAP_PENALTY)]
    pub gap_penalty: i32,

    /// Report pairs scoring at least INT
    #[arg(short = 'T', long, value_name = "INT", default_value_t = defaults::MIN_SCORE)]
    pub threshold: i32,

    /// Substitution matrix: BLOSUM62 or an NCBI-format matrix file
    #[arg(short = 'M', long, value_name = "NAME|FILE", default_value = defaults::MATRIX)]
    pub matrix: String,

    // ===== Ranges =====
    /// Which pairs are compared at all
    #[arg(long, value_enum, default_value_t = ComparisonPolicy::AllPairs)]
    pub policy: ComparisonPolicy,

    /// First target index (resume a partial run)
    #[arg(short = 's', long, value_name = "INT", default_value_t = 0)]
    pub start_offset: usize,

    /// One past the last target index
    #[arg(short = 'e', long, value_name = "INT")]
    pub end_offset: Option<usize>,

    /// First query index
    #[arg(long, value_name = "INT", default_value_t = 0)]
    pub query_start: usize,

    /// One past the last query index
    #[arg(long, value_name = "INT")]
    pub query_end: Option<usize>,

    // ===== Run Control =====
    /// Compute device
    #[arg(long, value_enum, default_value_t = ComputeBackend::Threaded)]
    pub device: ComputeBackend,

    /// Number of threads (default: all available cores)
    #[arg(short = 't', long, value_name = "INT")]
    pub threads: Option<usize>,

    /// Steps between progress lines (0 disables them)
    #[arg(long, value_name = "INT", default_value_t = defaults::PROGRESS_INTERVAL)]
    pub progress_interval: u64,

    /// Re-score every reported pair with the scalar reference and abort on mismatch
    #[arg(long)]
    pub verify: bool,

    /// Verbose level: 1=error, 2=warning, 3=message, 4+=debugging
    #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY)]
    pub verbosity: i32,
}

impl SearchCliOptions {
    pub fn to_opt(&self) -> SearchOpt {
        SearchOpt {
            lanes: self.lanes,
            unroll: self.unroll,
            gap_penalty: self.gap_penalty,
            threshold: self.threshold,
            matrix: self.matrix.clone(),
            policy: self.policy,
            start_offset: self.start_offset,
            end_offset: self.end_offset,
            query_start: self.query_start,
            query_end: self.query_end,
            progress_interval: self.progress_interval,
            n_threads: self.threads.unwrap_or_else(num_cpus::get),
            backend: self.device,
            verify: self.verify,
            verbosity: self.verbosity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let opt = SearchOpt::default();
        assert!(opt.validate().is_ok());
        assert_eq!(opt.slots(), defaults::NUM_LANES * defaults::UNROLL);
    }

    #[test]
    fn validate_reports_every_problem() {
        let opt = SearchOpt {
            lanes: 0,
            unroll: 3,
            gap_penalty: 0,
            threshold: 0,
            start_offset: 10,
            end_offset: Some(5),
            ..SearchOpt::default()
        };
        let errors = opt.validate().unwrap_err();
        assert_eq!(errors.len(), 5, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("unroll factor 3")));
    }
}
