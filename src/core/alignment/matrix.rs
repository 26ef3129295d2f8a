//! Residue alphabets and square substitution matrices.
//!
//! Residues are carried through the engine as offset codes `0..alphabet.len()`,
//! so every lookup is a direct index. The code `alphabet.len()` is reserved for
//! the sequence terminator and never names a real residue.

use std::fs;
use std::path::Path;

use bio::scores::blosum62;

use crate::error::LoadError;

/// Largest alphabet the engine accepts (the terminator needs one more code).
pub const MAX_ALPHABET: usize = 32;

/// Symbol order of the built-in BLOSUM62 table.
pub const BLOSUM62_SYMBOLS: &[u8] = b"ARNDCQEGHILKMFPSTWYVBZX*";

const NO_CODE: u8 = u8::MAX;

/// Mapping between ASCII residue symbols and offset codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    symbols: Vec<u8>,
    codes: [u8; 256],
    wildcard: Option<u8>,
}

impl Alphabet {
    /// Build an alphabet from distinct symbols. Lookups are case-insensitive.
    /// `X` becomes the wildcard for unknown residues when present.
    pub fn new(symbols: &[u8]) -> Result<Self, LoadError> {
        if symbols.is_empty() || symbols.len() > MAX_ALPHABET {
            return Err(LoadError::Matrix(format!(
                "alphabet must have 1..={} symbols, got {}",
                MAX_ALPHABET,
                symbols.len()
            )));
        }

        let mut codes = [NO_CODE; 256];
        for (code, &sym) in symbols.iter().enumerate() {
            let upper = sym.to_ascii_uppercase();
            if codes[upper as usize] != NO_CODE {
                return Err(LoadError::Matrix(format!(
                    "duplicate alphabet symbol '{}'",
                    upper as char
                )));
            }
            codes[upper as usize] = code as u8;
            codes[upper.to_ascii_lowercase() as usize] = code as u8;
        }

        let wildcard = match codes[b'X' as usize] {
            NO_CODE => None,
            c => Some(c),
        };

        Ok(Self {
            symbols: symbols.iter().map(|s| s.to_ascii_uppercase()).collect(),
            codes,
            wildcard,
        })
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Code appended after every database sequence.
    pub fn terminator(&self) -> u8 {
        self.symbols.len() as u8
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Symbol for a residue code. Panics on the terminator or out-of-range codes.
    pub fn symbol(&self, code: u8) -> u8 {
        self.symbols[code as usize]
    }

    /// Encode one residue, falling back to the wildcard for unknown symbols.
    pub fn encode(&self, residue: u8) -> Option<u8> {
        match self.codes[residue as usize] {
            NO_CODE => self.wildcard,
            c => Some(c),
        }
    }

    /// Encode a whole sequence; on failure returns the first offending symbol.
    pub fn encode_seq(&self, seq: &[u8]) -> Result<Vec<u8>, u8> {
        seq.iter()
            .map(|&r| self.encode(r).ok_or(r))
            .collect()
    }

    pub fn decode_seq(&self, codes: &[u8]) -> Vec<u8> {
        codes.iter().map(|&c| self.symbol(c)).collect()
    }
}

/// Square integer substitution matrix over an [`Alphabet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionMatrix {
    name: String,
    alphabet: Alphabet,
    scores: Vec<i32>,
}

impl SubstitutionMatrix {
    /// `scores` is row-major, `alphabet.len()` squared entries.
    pub fn new(name: &str, alphabet: Alphabet, scores: Vec<i32>) -> Result<Self, LoadError> {
        let n = alphabet.len();
        if scores.len() != n * n {
            return Err(LoadError::Matrix(format!(
                "{} entries for a {}x{} matrix",
                scores.len(),
                n,
                n
            )));
        }
        Ok(Self {
            name: name.to_string(),
            alphabet,
            scores,
        })
    }

    /// BLOSUM62 over `ARNDCQEGHILKMFPSTWYVBZX*`.
    pub fn blosum62() -> Self {
        let n = BLOSUM62_SYMBOLS.len();
        let mut scores = Vec::with_capacity(n * n);
        for &a in BLOSUM62_SYMBOLS {
            for &b in BLOSUM62_SYMBOLS {
                scores.push(blosum62(a, b));
            }
        }
        Self {
            name: "BLOSUM62".to_string(),
            alphabet: Alphabet::new(BLOSUM62_SYMBOLS).expect("built-in alphabet is valid"),
            scores,
        }
    }

    /// Match/mismatch matrix, handy for nucleotide data and hand-checked cases.
    pub fn uniform(symbols: &[u8], match_score: i32, mismatch: i32) -> Result<Self, LoadError> {
        let alphabet = Alphabet::new(symbols)?;
        let n = alphabet.len();
        let scores = (0..n * n)
            .map(|k| if k / n == k % n { match_score } else { mismatch })
            .collect();
        Self::new("uniform", alphabet, scores)
    }

    /// Parse an NCBI-style text matrix: `#` comments, a header row of column
    /// symbols, then one row per symbol starting with that symbol.
    pub fn from_ncbi_text(name: &str, text: &str) -> Result<Self, LoadError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'));

        let header: Vec<u8> = lines
            .next()
            .ok_or_else(|| LoadError::Matrix("no header row".into()))?
            .split_whitespace()
            .map(|tok| symbol_token(tok))
            .collect::<Result<_, _>>()?;

        let alphabet = Alphabet::new(&header)?;
        let n = alphabet.len();
        let mut scores = vec![0i32; n * n];
        let mut seen = vec![false; n];

        for line in lines {
            let mut tokens = line.split_whitespace();
            let row_sym = symbol_token(tokens.next().unwrap_or_default())?;
            let row = match alphabet.codes[row_sym as usize] {
                NO_CODE => {
                    return Err(LoadError::Matrix(format!(
                        "row symbol '{}' missing from header",
                        row_sym as char
                    )))
                }
                c => c as usize,
            };
            if seen[row] {
                return Err(LoadError::Matrix(format!(
                    "duplicate row '{}'",
                    row_sym as char
                )));
            }

            let values: Vec<i32> = tokens
                .map(|t| {
                    t.parse::<i32>()
                        .map_err(|_| LoadError::Matrix(format!("bad score '{}'", t)))
                })
                .collect::<Result<_, _>>()?;
            if values.len() != n {
                return Err(LoadError::Matrix(format!(
                    "row '{}' has {} scores, expected {}",
                    row_sym as char,
                    values.len(),
                    n
                )));
            }
            scores[row * n..(row + 1) * n].copy_from_slice(&values);
            seen[row] = true;
        }

        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(LoadError::Matrix(format!(
                "truncated matrix: no row for '{}'",
                alphabet.symbol(missing as u8) as char
            )));
        }

        Self::new(name, alphabet, scores)
    }

    /// Load either a built-in matrix by name or an NCBI text file.
    pub fn load(name_or_path: &str) -> Result<Self, LoadError> {
        if name_or_path.eq_ignore_ascii_case("BLOSUM62") {
            return Ok(Self::blosum62());
        }
        let path = Path::new(name_or_path);
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name_or_path.to_string());
        Self::from_ncbi_text(&name, &text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn size(&self) -> usize {
        self.alphabet.len()
    }

    /// Score for two residue codes.
    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        self.scores[a as usize * self.alphabet.len() + b as usize]
    }
}

fn symbol_token(tok: &str) -> Result<u8, LoadError> {
    match tok.as_bytes() {
        [c] => Ok(c.to_ascii_uppercase()),
        _ => Err(LoadError::Matrix(format!(
            "expected a single-character symbol, got '{}'",
            tok
        ))),
    }
}
