//! Engine-side view of an alignment record.

use crate::count::cigar::{self, CigarKind, CigarOp};
use crate::err::CountError;

/// The fields of one alignment record that allele counting looks at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignedRead {
    pub name: String,
    pub is_duplicate: bool,
    pub is_unmapped: bool,
    pub is_secondary: bool,
    pub is_supplementary: bool,
    pub is_reverse: bool,
    pub mapq: u8,
    /// 1-based leftmost reference position.
    pub start: i64,
    pub cigar: Vec<CigarOp>,
    pub seq: Vec<u8>,
    /// Raw phred qualities, not ASCII encoded.
    pub qual: Vec<u8>,
    /// Value of the `NM` tag, if present.
    pub edit_distance: Option<u32>,
    /// Raw assembled contig annotation (`id,start,cigar`), if present.
    pub contig: Option<String>,
}

impl AlignedRead {
    /// Whether the read takes part in counting at all.
    pub fn is_countable(&self) -> bool {
        !self.is_duplicate && !self.is_unmapped && !self.is_secondary && !self.is_supplementary
    }

    /// Number of bases aligned to the reference (`M`, `=`, `X`).
    pub fn mapped_len(&self) -> u32 {
        self.cigar
            .iter()
            .filter(|op| op.kind.is_aligned())
            .map(|op| op.len)
            .sum()
    }

    /// Number of inserted plus deleted bases.
    pub fn indel_bases(&self) -> u32 {
        self.cigar
            .iter()
            .filter(|op| matches!(op.kind, CigarKind::Insertion | CigarKind::Deletion))
            .map(|op| op.len)
            .sum()
    }

    /// 1-based inclusive rightmost reference position.
    pub fn end(&self) -> i64 {
        self.start + cigar::reference_len(&self.cigar) - 1
    }

    /// Parse the assembled contig annotation, if any.
    pub fn contig_annotation(&self) -> Result<Option<ContigAnnotation>, CountError> {
        self.contig
            .as_deref()
            .map(ContigAnnotation::parse)
            .transpose()
    }
}

/// Alignment of the assembled contig that a realigned read was placed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigAnnotation {
    /// 1-based leftmost reference position of the contig.
    pub start: i64,
    pub cigar: Vec<CigarOp>,
}

impl ContigAnnotation {
    /// Parse from `id,start,cigar`.
    pub fn parse(text: &str) -> Result<Self, CountError> {
        let malformed = || CountError::MalformedContigAnnotation(text.to_string());
        let mut fields = text.split(',');
        let (start, cigar) = match (fields.next(), fields.next(), fields.next()) {
            (Some(_), Some(start), Some(cigar)) => (start, cigar),
            _ => return Err(malformed()),
        };
        let start = start.trim().parse::<i64>().map_err(|_| malformed())?;
        let cigar = cigar::parse(cigar.trim()).map_err(|_| malformed())?;
        Ok(Self { start, cigar })
    }
}
