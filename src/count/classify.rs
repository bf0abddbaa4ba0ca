//! Assignment of a single read to an allele at a candidate locus.

use crate::count::allele::{Allele, InputVariant};
use crate::count::cigar;
use crate::count::indel::{self, IndelEvent};
use crate::count::read::AlignedRead;
use crate::count::Params;
use crate::err::CountError;

/// What a read contributes at a locus.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// Duplicate, unmapped, secondary or supplementary; not part of any count.
    Ignored,
    LowMappingQuality,
    /// Too many mismatches for a realigned read at an indel candidate.
    MismatchExceeded,
    /// The read shows an insertion or deletion at the locus.
    Indel(IndelEvent),
    /// The read supports a base or multi-base allele.
    Observed(Allele),
    /// Counts toward depth only.
    NoEvidence,
}

/// Outcome for a single observed base, `NoEvidence` for non-`ACGT`.
fn observed_base(base: u8) -> ReadOutcome {
    match Allele::from_base(base) {
        Allele::Unknown => ReadOutcome::NoEvidence,
        allele => ReadOutcome::Observed(allele),
    }
}

/// Whether a realigned read has more mismatches than its mapped length allows.
fn exceeds_mismatch_cap(read: &AlignedRead, max_mismatch_rate: f64) -> bool {
    match read.edit_distance {
        Some(edit_distance) => {
            let mismatches = edit_distance as i64 - read.indel_bases() as i64;
            mismatches as f64 > read.mapped_len() as f64 * max_mismatch_rate
        }
        None => false,
    }
}

/// Classify `read` at the position of `variant`.
pub fn classify_read(
    read: &AlignedRead,
    variant: &InputVariant,
    params: &Params,
) -> Result<ReadOutcome, CountError> {
    if !read.is_countable() {
        return Ok(ReadOutcome::Ignored);
    }
    if read.mapq < params.min_mapq {
        return Ok(ReadOutcome::LowMappingQuality);
    }
    if variant.allele.is_indel()
        && read.contig.is_some()
        && exceeds_mismatch_cap(read, params.max_mismatch_rate)
    {
        tracing::trace!("read {} exceeds mismatch cap", read.name);
        return Ok(ReadOutcome::MismatchExceeded);
    }

    let pos = variant.pos;
    if let Some(event) = indel::locate(read, pos)? {
        tracing::trace!("read {} supports {} at {}", read.name, event.op, pos);
        return Ok(ReadOutcome::Indel(event));
    }

    let base_at = |pos: i64| cigar::base_at(read.start, &read.cigar, &read.seq, &read.qual, pos);
    let passes = |qual: u8| qual >= params.min_baseq;

    let outcome = match &variant.allele {
        Allele::Insertion(_) | Allele::Deletion(_) => {
            let base = base_at(pos)?;
            let next = base_at(pos + 1)?;
            let own_indel = cigar::indel_at(read.start, &read.cigar, pos)?;
            match (base, next, own_indel) {
                (Some((base, qual)), Some(_), None) if passes(qual) => observed_base(base),
                _ => ReadOutcome::NoEvidence,
            }
        }
        Allele::MultiBase(alt) => match base_at(pos)? {
            None => ReadOutcome::NoEvidence,
            Some((base, qual)) => {
                let base = base.to_ascii_uppercase();
                if passes(qual) && alt.as_bytes().first() == Some(&base) {
                    let mut extended = vec![base];
                    for offset in 1..alt.len() as i64 {
                        match base_at(pos + offset)? {
                            Some((next, qual)) if passes(qual) => {
                                extended.push(next.to_ascii_uppercase())
                            }
                            _ => break,
                        }
                    }
                    if extended == alt.as_bytes() {
                        ReadOutcome::Observed(variant.allele.clone())
                    } else {
                        observed_base(base)
                    }
                } else {
                    observed_base(base)
                }
            }
        },
        Allele::Base(_) | Allele::Unknown => match base_at(pos)? {
            Some((base, qual)) if passes(qual) => observed_base(base),
            _ => ReadOutcome::NoEvidence,
        },
    };
    Ok(outcome)
}
