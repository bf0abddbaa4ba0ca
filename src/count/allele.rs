//! Alleles and candidate input variants.

use crate::err::CountError;

/// One of the four nucleotides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nucleotide {
    A,
    C,
    G,
    T,
}

impl Nucleotide {
    /// Case-insensitive conversion; anything but `ACGT` yields `None`.
    pub fn from_u8(base: u8) -> Option<Self> {
        match base.to_ascii_uppercase() {
            b'A' => Some(Nucleotide::A),
            b'C' => Some(Nucleotide::C),
            b'G' => Some(Nucleotide::G),
            b'T' => Some(Nucleotide::T),
            _ => None,
        }
    }
}

/// The identity of an allele observed at a locus.
///
/// Reference bases and single-base substitutions share the `Base` variant so
/// that a read showing base `A` lands on the same key whether or not `A` is
/// the reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::AsRefStr)]
pub enum Allele {
    Base(Nucleotide),
    Insertion(u32),
    Deletion(u32),
    /// Multi-base substitution, upper-case sequence.
    MultiBase(String),
    /// No usable signal.
    Unknown,
}

impl Allele {
    /// Allele for a single base; non-`ACGT` bases give `Unknown`.
    pub fn from_base(base: u8) -> Self {
        Nucleotide::from_u8(base)
            .map(Allele::Base)
            .unwrap_or(Allele::Unknown)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Allele::Unknown)
    }

    pub fn is_indel(&self) -> bool {
        matches!(self, Allele::Insertion(_) | Allele::Deletion(_))
    }

    /// Event length for indels, sequence length for the others.
    pub fn len(&self) -> usize {
        match self {
            Allele::Base(_) => 1,
            Allele::Insertion(len) | Allele::Deletion(len) => *len as usize,
            Allele::MultiBase(seq) => seq.len(),
            Allele::Unknown => 0,
        }
    }
}

/// One candidate variant from the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputVariant {
    pub chrom: String,
    /// 1-based position.
    pub pos: i64,
    pub reference: String,
    pub alternative: String,
    /// The allele treated as "the" alternate during classification.
    pub allele: Allele,
}

impl InputVariant {
    /// Build from the fields of a candidate line and derive the allele.
    pub fn new(
        chrom: &str,
        pos: i64,
        reference: &str,
        alternative: &str,
    ) -> Result<Self, CountError> {
        if !reference.is_ascii() || !alternative.is_ascii() {
            return Err(CountError::NonAsciiAllele {
                reference: reference.to_string(),
                alternative: alternative.to_string(),
            });
        }
        let (ref_len, alt_len) = (reference.len(), alternative.len());
        if ref_len != 1 && alt_len != 1 && ref_len != alt_len {
            return Err(CountError::UnsupportedVariant {
                reference: reference.to_string(),
                alternative: alternative.to_string(),
            });
        }

        let allele = if ref_len > alt_len {
            Allele::Deletion((ref_len - alt_len) as u32)
        } else if alt_len > ref_len {
            Allele::Insertion((alt_len - ref_len) as u32)
        } else if alt_len > 1 {
            Allele::MultiBase(alternative.to_ascii_uppercase())
        } else {
            alternative
                .bytes()
                .next()
                .map(Allele::from_base)
                .unwrap_or(Allele::Unknown)
        };

        Ok(Self {
            chrom: chrom.to_string(),
            pos,
            reference: reference.to_string(),
            alternative: alternative.to_string(),
            allele,
        })
    }

    /// Parse one whitespace separated candidate line
    /// (`CHROM POS ID REF ALT ...`); `lineno` is used for error reporting.
    pub fn from_line(line: &str, lineno: usize) -> Result<Self, CountError> {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.len() < 5 {
            return Err(CountError::InvalidInputLine {
                lineno,
                reason: format!("expected at least 5 columns, got {}", fields.len()),
            });
        }
        let pos = fields[1]
            .parse::<i64>()
            .map_err(|e| CountError::InvalidInputLine {
                lineno,
                reason: format!("invalid position {:?}: {}", fields[1], e),
            })?;
        Self::new(fields[0], pos, fields[3], fields[4])
    }
}
