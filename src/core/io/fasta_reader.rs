// FASTA loader using bio::io::fasta
//
// Reads a (optionally gzip-compressed) FASTA file and encodes every record
// against the substitution matrix alphabet. Gzip is detected by magic bytes,
// not by extension. Any I/O or parse failure aborts the load: a partially
// read database must never reach the search loop.

use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::database::SequenceDatabase;
use crate::core::alignment::matrix::Alphabet;
use crate::error::LoadError;

const BUFFER_SIZE: usize = 4 * 1024 * 1024;

fn is_gzip(path: &Path) -> std::io::Result<bool> {
    let mut magic = [0u8; 2];
    let n = File::open(path)?.read(&mut magic)?;
    Ok(n == 2 && magic == [0x1f, 0x8b])
}

fn open_input(path: &Path) -> Result<Box<dyn Read>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let gz = is_gzip(path).map_err(io_err)?;
    let file = File::open(path).map_err(io_err)?;
    if gz {
        log::debug!("{}: gzip input", path.display());
        Ok(Box::new(BufReader::with_capacity(
            BUFFER_SIZE,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
}

/// Load and encode every record of a FASTA file.
pub fn load_database(path: &Path, alphabet: &Alphabet) -> Result<SequenceDatabase, LoadError> {
    let reader = fasta::Reader::new(open_input(path)?);
    let mut db = SequenceDatabase::new();

    for result in reader.records() {
        let record = result.map_err(|e| LoadError::Malformed {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
        let encoded = alphabet
            .encode_seq(record.seq())
            .map_err(|sym| LoadError::UnknownSymbol {
                path: path.to_path_buf(),
                record: record.id().to_string(),
                symbol: sym as char,
            })?;
        db.push(record.id(), record.desc().unwrap_or(""), &encoded);
    }

    log::info!(
        "Loaded {} sequences ({} residues, longest {}) from {}",
        db.len(),
        db.total_residues(),
        db.max_len(),
        path.display()
    );
    Ok(db)
}
