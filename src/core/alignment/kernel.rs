//! Lane-step kernel for the streaming local-alignment recurrence.
//!
//! One call to [`execute_step`] advances every lane slot by one database
//! residue. For slot `u` consuming residue `r`, the previous DP column
//! `H[.][j-1]` is turned into `H[.][j]` by sweeping the query once:
//!
//! ```text
//! up = 0, carry = 0
//! for i in 0..m:
//!     left  = prev[i]
//!     acc   = max(left, up) - gap
//!     acc   = max(acc, carry + profile[r][i])
//!     acc   = max(acc, 0)
//!     acc   = acc & keep           // keep = 0 on the terminator, !0 otherwise
//!     next[i] = acc; up = acc; carry = left
//!     running_max = max(running_max, acc)
//! ```
//!
//! The terminator is the only place the kernel knows about sequence
//! boundaries. It zeroes the column without a branch, publishes the carried
//! running maximum as the finished sequence's score and clears it for the
//! next sequence that enters the slot.
//!
//! The recurrence lives in [`lane_step`] and is monomorphised per unroll
//! factor; [`execute_step`] picks the specialisation at runtime and spreads
//! lanes over the rayon pool.

use rayon::prelude::*;

use crate::core::alignment::profile::QueryContext;
use crate::core::alignment::workspace::DeviceWorkspace;
use crate::core::compute::StepBuffers;
use crate::error::DeviceError;

/// Run one step for all lanes. `buffers.step` selects the DP column parity.
pub fn execute_step(
    ctx: &QueryContext,
    ws: &mut DeviceWorkspace,
    buffers: &mut StepBuffers,
) -> Result<(), DeviceError> {
    let geometry = ws.geometry().ok_or(DeviceError::NoQuery)?;
    if buffers.slots() != geometry.slots() || ws.query_len() != ctx.len() {
        return Err(DeviceError::Geometry(format!(
            "{} slots for a {}x{} lane layout (query {} vs workspace {})",
            buffers.slots(),
            geometry.lanes,
            geometry.unroll,
            ctx.len(),
            ws.query_len()
        )));
    }

    let parity = (buffers.step % 2) as usize;
    let (prev, next, running) = ws.split_for_step(parity);
    let StepBuffers {
        residues,
        column_max,
        finished_max,
        ..
    } = buffers;

    match geometry.unroll {
        1 => run_lanes::<1>(ctx, prev, next, running, residues, column_max, finished_max),
        2 => run_lanes::<2>(ctx, prev, next, running, residues, column_max, finished_max),
        4 => run_lanes::<4>(ctx, prev, next, running, residues, column_max, finished_max),
        8 => run_lanes::<8>(ctx, prev, next, running, residues, column_max, finished_max),
        16 => run_lanes::<16>(ctx, prev, next, running, residues, column_max, finished_max),
        other => return Err(DeviceError::UnsupportedUnroll(other)),
    }
    Ok(())
}

fn run_lanes<const U: usize>(
    ctx: &QueryContext,
    prev: &[i32],
    next: &mut [i32],
    running_max: &mut [i32],
    residues: &[u8],
    column_max: &mut [i32],
    finished_max: &mut [i32],
) {
    let m = ctx.len();
    if m == 0 {
        column_max.fill(0);
        finished_max.fill(0);
        return;
    }

    next.par_chunks_mut(m * U)
        .zip(prev.par_chunks(m * U))
        .zip(running_max.par_chunks_mut(U))
        .zip(residues.par_chunks(U))
        .zip(column_max.par_chunks_mut(U))
        .zip(finished_max.par_chunks_mut(U))
        .for_each(|(((((next, prev), running), residues), colmax), finished)| {
            lane_step::<U>(ctx, prev, next, running, residues, colmax, finished);
        });
}

/// Advance the `U` interleaved slots of one lane by one residue each.
///
/// `prev` and `next` are this lane's `m * U` column cells; the other slices
/// have exactly `U` entries.
#[inline]
pub fn lane_step<const U: usize>(
    ctx: &QueryContext,
    prev: &[i32],
    next: &mut [i32],
    running_max: &mut [i32],
    residues: &[u8],
    column_max: &mut [i32],
    finished_max: &mut [i32],
) {
    let m = ctx.len();
    let gap = ctx.gap_penalty();
    let terminator = ctx.terminator();

    let rows: [&[i32]; U] = std::array::from_fn(|u| ctx.profile_row(residues[u]));
    let keep: [i32; U] = std::array::from_fn(|u| -((residues[u] != terminator) as i32));
    let mut run: [i32; U] = std::array::from_fn(|u| running_max[u]);
    let mut up = [0i32; U];
    let mut carry = [0i32; U];
    let mut colmax = [0i32; U];

    for i in 0..m {
        let base = i * U;
        for u in 0..U {
            let left = prev[base + u];
            let mut acc = left.max(up[u]) - gap;
            acc = acc.max(carry[u] + rows[u][i]);
            acc = acc.max(0) & keep[u];

            next[base + u] = acc;
            up[u] = acc;
            carry[u] = left;
            run[u] = run[u].max(acc);
            colmax[u] = colmax[u].max(acc);
        }
    }

    for u in 0..U {
        column_max[u] = colmax[u];
        // keep == 0 marks a terminator: publish the finished score and restart.
        finished_max[u] = run[u] & !keep[u];
        running_max[u] = run[u] & keep[u];
    }
}
