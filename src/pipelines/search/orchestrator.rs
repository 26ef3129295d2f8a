//! Search orchestration.
//!
//! [`QuerySearch`] runs one query against the database as a step loop with
//! one step in flight:
//!
//! ```text
//! feed 0 -> submit 0
//! loop k = 0, 1, ...:
//!     report k-1      (host set (k+1)%2, outputs of step k-1)
//!     feed k+1        (same set, residues for the next step)
//!     await k         (set k%2 returns to the host)
//!     no work in k+1? report k, stop
//!     submit k+1
//! ```
//!
//! [`SearchOrchestrator`] drives the all-on-all run over a query range,
//! writing records, logging progress and aggregating statistics.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::benchmark::{BenchmarkEstimator, CellTally, RunStatistics};
use super::double_buffer::DoubleBuffer;
use super::feeder::LaneFeeder;
use super::lanes::{ComparisonPolicy, LaneArena, SequenceQueue};
use super::reporter::HitReporter;
use crate::core::alignment::matrix::SubstitutionMatrix;
use crate::core::alignment::profile::QueryContext;
use crate::core::alignment::scalar::local_alignment;
use crate::core::compute::{ComputeDevice, LaneGeometry};
use crate::core::io::database::SequenceDatabase;
use crate::core::io::hit_output::{write_records, HitRecord, TSV_HEADER};
use crate::core::utils::cputime;
use crate::error::{PipelineError, SearchError};
use crate::search_opt::SearchOpt;

/// Everything one query produced.
#[derive(Debug, Clone, Default)]
pub struct QueryOutcome {
    pub records: Vec<HitRecord>,
    pub cells: CellTally,
    /// Targets assigned to a lane and fully reported.
    pub targets: usize,
    pub skipped_empty: usize,
    pub host_time: Duration,
    pub device_wait: Duration,
}

/// Reusable per-geometry state for running queries one after another.
pub struct QuerySearch {
    geometry: LaneGeometry,
    arena: LaneArena,
    buffers: DoubleBuffer,
}

impl QuerySearch {
    pub fn new(geometry: LaneGeometry) -> Self {
        Self {
            geometry,
            arena: LaneArena::new(geometry),
            buffers: DoubleBuffer::new(geometry),
        }
    }

    pub fn geometry(&self) -> LaneGeometry {
        self.geometry
    }

    /// Compare `ctx` against the targets selected by `opt`.
    ///
    /// `query_index` is the query's position in the database when the search
    /// is all-on-all; it only matters for [`ComparisonPolicy::Triangular`].
    /// `progress` is called every `opt.progress_interval` steps with the
    /// tally so far.
    pub fn run(
        &mut self,
        device: &mut dyn ComputeDevice,
        ctx: Arc<QueryContext>,
        query_index: Option<usize>,
        db: &SequenceDatabase,
        opt: &SearchOpt,
        progress: &mut dyn FnMut(u64, &CellTally),
    ) -> Result<QueryOutcome, PipelineError> {
        let result = self.step_loop(device, &ctx, query_index, db, opt, progress);
        if result.is_err() {
            // Leave the device idle so the next query can start cleanly.
            self.buffers.reclaim(device);
        }
        device.end_query()?;
        result
    }

    fn step_loop(
        &mut self,
        device: &mut dyn ComputeDevice,
        ctx: &Arc<QueryContext>,
        query_index: Option<usize>,
        db: &SequenceDatabase,
        opt: &SearchOpt,
        progress: &mut dyn FnMut(u64, &CellTally),
    ) -> Result<QueryOutcome, PipelineError> {
        let Self {
            geometry,
            arena,
            buffers,
        } = self;
        let slots = geometry.slots();
        let m = ctx.len();

        arena.reset();
        device.begin_query(Arc::clone(ctx), *geometry)?;

        let queue = SequenceQueue::new(db, query_index, opt.policy, opt.start_offset, opt.end_offset);
        let mut feeder = LaneFeeder::new(db, queue, ctx.terminator());
        let mut reporter = HitReporter::new(ctx.id(), opt.threshold);
        let mut outcome = QueryOutcome::default();

        let host = Instant::now();
        let first = feeder.feed(arena, 0, &mut buffers.host_mut(0)?.residues)?;
        if !first.has_work() {
            outcome.skipped_empty = feeder.queue().skipped_empty();
            return Ok(outcome);
        }
        outcome.cells.record(&first, slots, m);
        buffers.submit(0, 0, device)?;
        outcome.host_time += host.elapsed();

        let mut step: u64 = 0;
        loop {
            let host = Instant::now();
            let host_set = DoubleBuffer::set_for(step + 1);
            if step >= 1 {
                reporter.report_step(arena, buffers.host_ref(host_set)?);
            }
            let next = feeder.feed(arena, step + 1, &mut buffers.host_mut(host_set)?.residues)?;
            outcome.host_time += host.elapsed();

            let wait = Instant::now();
            let done = buffers.await_complete(DoubleBuffer::set_for(step), device)?;
            outcome.device_wait += wait.elapsed();

            if !next.has_work() {
                reporter.report_step(arena, done);
                break;
            }

            outcome.cells.record(&next, slots, m);
            buffers.submit(host_set, step + 1, device)?;
            step += 1;

            if opt.progress_interval > 0 && step % opt.progress_interval == 0 {
                progress(step, &outcome.cells);
            }
        }

        debug_assert!(arena.is_drained(), "pending targets left after the last step");
        outcome.targets = reporter.finished();
        outcome.skipped_empty = feeder.queue().skipped_empty();
        outcome.records = reporter.into_records();

        log::debug!(
            "query {} ({}): {} steps, {} targets, {} records",
            ctx.id(),
            ctx.name(),
            outcome.cells.steps,
            outcome.targets,
            outcome.records.len()
        );
        Ok(outcome)
    }
}

/// All-on-all (or query-file-against-database) search driver.
pub struct SearchOrchestrator<'a> {
    db: &'a SequenceDatabase,
    /// Separate query set; `None` searches the database against itself.
    queries: Option<&'a SequenceDatabase>,
    matrix: &'a SubstitutionMatrix,
    opt: &'a SearchOpt,
    device: Box<dyn ComputeDevice>,
    search: QuerySearch,
    stats: RunStatistics,
}

impl<'a> SearchOrchestrator<'a> {
    pub fn new(
        db: &'a SequenceDatabase,
        queries: Option<&'a SequenceDatabase>,
        matrix: &'a SubstitutionMatrix,
        opt: &'a SearchOpt,
        device: Box<dyn ComputeDevice>,
    ) -> Self {
        let geometry = LaneGeometry::new(opt.lanes, opt.unroll);
        log::debug!(
            "SearchOrchestrator: {} lanes x {} unroll = {} slots, device {}",
            geometry.lanes,
            geometry.unroll,
            geometry.slots(),
            device.name()
        );
        Self {
            db,
            queries,
            matrix,
            opt,
            device,
            search: QuerySearch::new(geometry),
            stats: RunStatistics::default(),
        }
    }

    fn query_db(&self) -> &'a SequenceDatabase {
        self.queries.unwrap_or(self.db)
    }

    /// Query indices covered by the run.
    pub fn query_range(&self) -> std::ops::Range<usize> {
        let n = self.query_db().len();
        let end = self.opt.query_end.unwrap_or(n).min(n);
        self.opt.query_start.min(end)..end
    }

    /// Index used by the triangular policy; only defined for self-search.
    fn triangular_index(&self, q: usize) -> Option<usize> {
        self.queries.is_none().then_some(q)
    }

    /// Residue cell updates the run over `queries` will perform.
    pub fn expected_updates<I: IntoIterator<Item = usize>>(&self, queries: I) -> u64 {
        let end = self.opt.end_offset.unwrap_or(self.db.len());
        queries
            .into_iter()
            .map(|q| {
                let start = match (self.opt.policy, self.triangular_index(q)) {
                    (ComparisonPolicy::Triangular, Some(q)) => self.opt.start_offset.max(q),
                    _ => self.opt.start_offset,
                };
                self.query_db().seq_len(q) as u64 * self.db.residues_between(start, end)
            })
            .sum()
    }

    /// Run the whole query range, writing TSV records to `out`.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<RunStatistics, SearchError> {
        writeln!(out, "{}", TSV_HEADER)?;
        let range = self.query_range();
        self.run_queries(range, &mut |records| write_records(out, records))?;
        out.flush()?;
        Ok(self.stats.clone())
    }

    /// Run the whole query range and return the records in output order.
    pub fn collect(&mut self) -> Result<Vec<HitRecord>, SearchError> {
        let mut all = Vec::new();
        let range = self.query_range();
        self.run_queries(range, &mut |records| {
            all.extend_from_slice(records);
            Ok(())
        })?;
        Ok(all)
    }

    /// Statistics of the last `run`/`collect`/`estimate`.
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Time a sample of `sample` queries spread over the range and project
    /// the cost of the whole run.
    pub fn estimate(&mut self, sample: usize) -> Result<RunEstimate, SearchError> {
        let range = self.query_range();
        let n = range.len();
        let picks: Vec<usize> = if n == 0 || sample == 0 {
            Vec::new()
        } else {
            let k = sample.min(n);
            (0..k).map(|i| range.start + i * n / k).collect()
        };

        let sampled_expected = self.expected_updates(picks.iter().copied());
        self.run_queries(picks.iter().copied(), &mut |_| Ok(()))?;

        let total_expected = self.expected_updates(range);
        let rate = if self.stats.wall_time_secs > 0.0 {
            self.stats.cells.residue as f64 / self.stats.wall_time_secs
        } else {
            0.0
        };
        let projected = (rate > 0.0).then(|| Duration::from_secs_f64(total_expected as f64 / rate));

        Ok(RunEstimate {
            sampled_queries: picks.len(),
            sampled_updates: sampled_expected,
            total_updates: total_expected,
            gcups: rate / 1e9,
            utilisation: self.stats.cells.utilisation(),
            projected,
        })
    }

    fn run_queries<I>(
        &mut self,
        queries: I,
        sink: &mut dyn FnMut(&[HitRecord]) -> std::io::Result<()>,
    ) -> Result<(), SearchError>
    where
        I: IntoIterator<Item = usize> + Clone,
    {
        let start_time = Instant::now();
        let start_cpu = cputime();
        self.stats = RunStatistics::default();
        let mut estimator = BenchmarkEstimator::new(self.expected_updates(queries.clone()));

        log::info!(
            "Searching {} target(s) with {} matrix, gap {}, threshold {}, policy {:?}",
            self.db.len(),
            self.matrix.name(),
            self.opt.gap_penalty,
            self.opt.threshold,
            self.opt.policy
        );

        let query_db = self.query_db();
        for q in queries {
            let residues = query_db.sequence(q);
            if residues.is_empty() {
                log::debug!("query {}: empty, skipped", q);
                continue;
            }
            let ctx = Arc::new(QueryContext::build(
                q,
                query_db.name(q),
                residues,
                self.matrix,
                self.opt.gap_penalty,
            ));
            let triangular_index = self.triangular_index(q);

            let outcome = {
                let est = &estimator;
                let mut progress = |step: u64, cells: &CellTally| {
                    log::info!("{}", est.progress_line(q, step, cells));
                };
                self.search.run(
                    self.device.as_mut(),
                    Arc::clone(&ctx),
                    triangular_index,
                    self.db,
                    self.opt,
                    &mut progress,
                )?
            };

            if self.opt.verify {
                self.verify(&ctx, &outcome.records)?;
            }
            sink(&outcome.records)?;

            estimator.add_query(&outcome.cells);
            estimator.add_host_time(outcome.host_time);
            estimator.add_device_wait(outcome.device_wait);
            if !outcome.cells.is_conserved() {
                log::warn!(
                    "query {}: cell accounting mismatch ({} accounted, {} emitted)",
                    q,
                    outcome.cells.accounted(),
                    outcome.cells.emitted
                );
            }

            self.stats.queries += 1;
            self.stats.targets_compared += outcome.targets as u64;
            self.stats.records += outcome.records.len() as u64;
            self.stats.skipped_empty += outcome.skipped_empty as u64;
            log::info!(
                "{}",
                estimator.progress_line(q, outcome.cells.steps, &CellTally::default())
            );
        }

        self.stats.cells = *estimator.tally();
        self.stats.host_secs = estimator.host_time().as_secs_f64();
        self.stats.device_wait_secs = estimator.device_wait().as_secs_f64();
        self.stats.wall_time_secs = start_time.elapsed().as_secs_f64();
        self.stats.cpu_time_secs = cputime() - start_cpu;
        log::info!("SearchOrchestrator complete: {}", self.stats);
        Ok(())
    }

    /// Re-score every record with the scalar reference.
    fn verify(&self, ctx: &QueryContext, records: &[HitRecord]) -> Result<(), PipelineError> {
        for rec in records {
            let reference = local_alignment(
                ctx.residues(),
                self.db.sequence(rec.target_id),
                self.matrix,
                ctx.gap_penalty(),
            );
            let span = reference.hit_span(self.opt.threshold);
            if reference.score != rec.score
                || span != Some((rec.first_hit_offset, rec.hit_span_length))
            {
                return Err(PipelineError::Verification {
                    query: rec.query_id,
                    target: rec.target_id,
                    engine: rec.score,
                    reference: reference.score,
                });
            }
        }
        log::trace!("query {}: {} records verified", ctx.id(), records.len());
        Ok(())
    }
}

/// Projected cost of a full run, from a timed sample of queries.
#[derive(Debug, Clone)]
pub struct RunEstimate {
    pub sampled_queries: usize,
    pub sampled_updates: u64,
    pub total_updates: u64,
    pub gcups: f64,
    pub utilisation: f64,
    /// `None` when the sample did no measurable work.
    pub projected: Option<Duration>,
}
