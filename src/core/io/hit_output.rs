//! Hit records and their tab-separated output format.
//!
//! One line per reported (query, target) pair:
//! `query_id  target_id  score  first_hit_offset  hit_span_length`

use std::io::{self, Write};

/// Best local score of one (query, target) pair plus its approximate location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HitRecord {
    pub query_id: usize,
    pub target_id: usize,
    pub score: i32,
    /// Target offset of the first residue whose column score reached the threshold.
    pub first_hit_offset: usize,
    /// Distance from the first to the last such residue, inclusive.
    pub hit_span_length: usize,
}

pub const TSV_HEADER: &str = "#query_id\ttarget_id\tscore\tfirst_hit_offset\thit_span_length";

pub fn write_record<W: Write + ?Sized>(out: &mut W, rec: &HitRecord) -> io::Result<()> {
    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}",
        rec.query_id, rec.target_id, rec.score, rec.first_hit_offset, rec.hit_span_length
    )
}

pub fn write_records<W: Write + ?Sized>(out: &mut W, records: &[HitRecord]) -> io::Result<()> {
    for rec in records {
        write_record(out, rec)?;
    }
    Ok(())
}
