use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ferrous_scan::core::utils::format_duration;
use ferrous_scan::defaults;
use ferrous_scan::error::SearchError;
use ferrous_scan::scan;
use ferrous_scan::search_opt::{SearchCliOptions, SearchOpt};

#[derive(Parser)]
#[command(name = "ferrous-scan")]
#[command(about = "FerrousScan - lane-batched Smith-Waterman database search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score queries against a sequence database and write hit records (TSV)
    Search {
        #[command(flatten)]
        options: SearchCliOptions,

        /// Output file (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Time a sample of queries and project the cost of the full run
    Estimate {
        #[command(flatten)]
        options: SearchCliOptions,

        /// Number of queries to sample across the query range
        #[arg(long, value_name = "INT", default_value_t = defaults::ESTIMATE_SAMPLE_QUERIES)]
        sample: usize,
    },
}

fn init_logging(verbosity: i32) {
    // Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace)
    // to Rust log levels
    let log_level = match verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None) // Don't show timestamps
        .format_target(false) // Don't show module names
        .init();
}

fn init_thread_pool(requested: usize) -> usize {
    let mut num_threads = requested;
    if num_threads < 1 {
        log::warn!("Invalid thread count {}, using 1 thread", num_threads);
        num_threads = 1;
    }

    let max_threads = num_cpus::get() * 2;
    if num_threads > max_threads {
        log::warn!(
            "Thread count {} exceeds recommended maximum {}, capping at {}",
            num_threads,
            max_threads,
            max_threads
        );
        num_threads = max_threads;
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(_) => {
            log::debug!(
                "Successfully built global Rayon thread pool with {} threads",
                num_threads
            );
        }
        Err(e) => {
            log::warn!(
                "Failed to configure thread pool: {} (may already be initialized)",
                e
            );
        }
    }

    let actual_threads = rayon::current_num_threads();
    if actual_threads != num_threads {
        log::warn!(
            "Rayon thread pool has {} threads but requested {}",
            actual_threads,
            num_threads
        );
    }

    let thread_word = if num_threads == 1 { "thread" } else { "threads" };
    log::info!("Using {} {}", num_threads, thread_word);
    num_threads
}

/// Build and validate options; exits on invalid input.
fn prepare(options: &SearchCliOptions) -> SearchOpt {
    init_logging(options.verbosity);

    let mut opt = options.to_opt();
    if let Err(errors) = opt.validate() {
        for e in &errors {
            log::error!("config: {}", e);
        }
        std::process::exit(1);
    }
    opt.n_threads = init_thread_pool(opt.n_threads);

    if opt.verbosity >= 3 {
        log::info!("Search parameters:");
        log::info!(
            "  Lanes: {} x unroll {} = {} slots, device {:?}",
            opt.lanes,
            opt.unroll,
            opt.slots(),
            opt.backend
        );
        log::info!(
            "  Matrix: {}, gap: {}, threshold: {}",
            opt.matrix,
            opt.gap_penalty,
            opt.threshold
        );
        log::info!(
            "  Targets: [{}, {}), policy {:?}",
            opt.start_offset,
            opt.end_offset
                .map_or_else(|| "end".to_string(), |e| e.to_string()),
            opt.policy
        );
    }
    opt
}

/// Log a fatal error naming the failing subsystem and exit.
fn fatal(err: anyhow::Error) -> ! {
    let subsystem = err
        .downcast_ref::<SearchError>()
        .map_or("search", SearchError::subsystem);
    log::error!("{} failed: {:#}", subsystem, err);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { options, output } => {
            let opt = prepare(&options);
            log::info!("Searching database: {}", options.database.display());

            match scan::main_search(&options, output.as_deref(), &opt) {
                Ok(stats) => {
                    log::info!(
                        "Real time: {:.3} sec; CPU: {:.3} sec",
                        stats.wall_time_secs,
                        stats.cpu_time_secs
                    );
                }
                Err(e) => fatal(e),
            }
        }

        Commands::Estimate { options, sample } => {
            let opt = prepare(&options);

            match scan::main_estimate(&options, &opt, sample) {
                Ok(est) => {
                    log::info!(
                        "Sampled {} queries ({} cell updates): {:.2} GCUPS, {:.1}% lane utilisation",
                        est.sampled_queries,
                        est.sampled_updates,
                        est.gcups,
                        100.0 * est.utilisation
                    );
                    match est.projected {
                        Some(d) => log::info!(
                            "Full run: {} cell updates, projected {}",
                            est.total_updates,
                            format_duration(d)
                        ),
                        None => log::warn!(
                            "Full run: {} cell updates, no throughput measured",
                            est.total_updates
                        ),
                    }
                }
                Err(e) => fatal(e),
            }
        }
    }
}
