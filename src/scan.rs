use anyhow::Result;
// src/scan.rs
//
// Entry points behind the `search` and `estimate` subcommands. All inputs and
// the compute device are set up before the output is opened, so a failed
// setup never leaves a partial output file behind.

use crate::core::alignment::matrix::SubstitutionMatrix;
use crate::core::io::async_writer::AsyncChannelWriter;
use crate::core::io::database::SequenceDatabase;
use crate::core::io::fasta_reader::load_database;
use crate::error::SearchError;
use crate::pipelines::search::{ComparisonPolicy, RunEstimate, RunStatistics, SearchOrchestrator};
use crate::search_opt::{SearchCliOptions, SearchOpt};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Matrix, database and optional separate query set.
pub struct SearchInputs {
    pub matrix: SubstitutionMatrix,
    pub database: SequenceDatabase,
    pub queries: Option<SequenceDatabase>,
}

pub fn load_inputs(cli: &SearchCliOptions, opt: &SearchOpt) -> Result<SearchInputs, SearchError> {
    if cli.queries.is_some() && opt.policy == ComparisonPolicy::Triangular {
        return Err(SearchError::Config(
            "triangular policy needs a self-search; drop --queries or use all-pairs".into(),
        ));
    }

    let matrix = SubstitutionMatrix::load(&opt.matrix)?;
    log::info!(
        "Substitution matrix {} ({} symbols)",
        matrix.name(),
        matrix.size()
    );

    let database = load_database(&cli.database, matrix.alphabet())?;
    let queries = match &cli.queries {
        Some(path) => Some(load_database(path, matrix.alphabet())?),
        None => None,
    };

    if database.is_empty() {
        log::warn!("{}: database is empty", cli.database.display());
    }
    Ok(SearchInputs {
        matrix,
        database,
        queries,
    })
}

pub fn main_search(
    cli: &SearchCliOptions,
    output: Option<&Path>,
    opt: &SearchOpt,
) -> Result<RunStatistics> {
    let inputs = load_inputs(cli, opt)?;
    let device = opt.backend.create().map_err(SearchError::from)?;

    let inner: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            SearchError::Output(io::Error::new(
                e.kind(),
                format!("cannot create {}: {}", path.display(), e),
            ))
        })?)),
        None => Box::new(io::stdout()),
    };
    let mut writer = AsyncChannelWriter::new(inner);

    let mut orchestrator = SearchOrchestrator::new(
        &inputs.database,
        inputs.queries.as_ref(),
        &inputs.matrix,
        opt,
        device,
    );
    let stats = orchestrator.run(&mut writer)?;
    writer.finish().map_err(SearchError::Output)?;
    Ok(stats)
}

pub fn main_estimate(cli: &SearchCliOptions, opt: &SearchOpt, sample: usize) -> Result<RunEstimate> {
    let inputs = load_inputs(cli, opt)?;
    let device = opt.backend.create().map_err(SearchError::from)?;

    let mut orchestrator = SearchOrchestrator::new(
        &inputs.database,
        inputs.queries.as_ref(),
        &inputs.matrix,
        opt,
        device,
    );
    Ok(orchestrator.estimate(sample)?)
}
