//! CIGAR handling: parsing, coordinate walking, and indel lookup.
//!
//! Positions are 1-based reference coordinates throughout; read indices are
//! 0-based offsets into the read sequence.

use crate::err::CountError;

/// The kind of a CIGAR operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum CigarKind {
    #[strum(serialize = "M")]
    Match,
    #[strum(serialize = "I")]
    Insertion,
    #[strum(serialize = "D")]
    Deletion,
    #[strum(serialize = "N")]
    Skip,
    #[strum(serialize = "S")]
    SoftClip,
    #[strum(serialize = "H")]
    HardClip,
    #[strum(serialize = "P")]
    Padding,
    #[strum(serialize = "=")]
    SequenceMatch,
    #[strum(serialize = "X")]
    SequenceMismatch,
}

impl CigarKind {
    /// Parse from the single-character SAM code.
    pub fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'M' => CigarKind::Match,
            'I' => CigarKind::Insertion,
            'D' => CigarKind::Deletion,
            'N' => CigarKind::Skip,
            'S' => CigarKind::SoftClip,
            'H' => CigarKind::HardClip,
            'P' => CigarKind::Padding,
            '=' => CigarKind::SequenceMatch,
            'X' => CigarKind::SequenceMismatch,
            _ => return None,
        })
    }

    /// Whether this is one of the aligned-base operations `M`, `=`, `X`.
    pub fn is_aligned(self) -> bool {
        matches!(
            self,
            CigarKind::Match | CigarKind::SequenceMatch | CigarKind::SequenceMismatch
        )
    }

    pub fn consumes_read(self) -> bool {
        self.is_aligned() || matches!(self, CigarKind::Insertion | CigarKind::SoftClip)
    }

    pub fn consumes_reference(self) -> bool {
        self.is_aligned() || matches!(self, CigarKind::Deletion | CigarKind::Skip)
    }
}

/// A single CIGAR operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: u32) -> Self {
        Self { kind, len }
    }
}

impl std::fmt::Display for CigarOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.len, self.kind)
    }
}

/// Parse a textual CIGAR string such as `"10M2I5M"`.
pub fn parse(text: &str) -> Result<Vec<CigarOp>, CountError> {
    let mut result = Vec::new();
    let mut len: Option<u32> = None;
    for c in text.chars() {
        if let Some(digit) = c.to_digit(10) {
            let current = len.unwrap_or(0);
            len = Some(
                current
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(digit))
                    .ok_or_else(|| CountError::InvalidCigar(text.to_string()))?,
            );
        } else {
            let kind =
                CigarKind::from_code(c).ok_or_else(|| CountError::InvalidCigar(text.to_string()))?;
            let op_len = len
                .take()
                .ok_or_else(|| CountError::InvalidCigar(text.to_string()))?;
            result.push(CigarOp::new(kind, op_len));
        }
    }
    if len.is_some() || result.is_empty() {
        return Err(CountError::InvalidCigar(text.to_string()));
    }
    Ok(result)
}

/// Cursor state at the start of one CIGAR operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    op: CigarOp,
    /// Read index before applying `op`.
    read_idx: i64,
    /// Reference position before applying `op`.
    ref_pos: i64,
}

/// Walk `cigar` from `start`, yielding the cursors in front of each operation.
///
/// Padding cannot be placed on the reference and terminates the walk with an
/// error.
fn steps(start: i64, cigar: &[CigarOp]) -> impl Iterator<Item = Result<Step, CountError>> + '_ {
    let mut read_idx = 0i64;
    let mut ref_pos = start;
    cigar.iter().map(move |op| {
        if op.kind == CigarKind::Padding {
            return Err(CountError::UnsupportedCigarOp('P'));
        }
        let step = Step {
            op: *op,
            read_idx,
            ref_pos,
        };
        if op.kind.consumes_read() {
            read_idx += op.len as i64;
        }
        if op.kind.consumes_reference() {
            ref_pos += op.len as i64;
        }
        Ok(step)
    })
}

/// Return the base and phred quality that the read places at reference `pos`.
///
/// `None` if `pos` is not covered by an aligned base of the read, i.e. it falls
/// into a deletion, skip or clip, or the offset runs past the stored sequence
/// or qualities.
pub fn base_at(
    start: i64,
    cigar: &[CigarOp],
    seq: &[u8],
    qual: &[u8],
    pos: i64,
) -> Result<Option<(u8, u8)>, CountError> {
    let read_len = seq.len() as i64;
    for step in steps(start, cigar) {
        let step = step?;
        if step.ref_pos > pos || step.read_idx >= read_len {
            break;
        }
        if step.op.kind.is_aligned() && pos < step.ref_pos + step.op.len as i64 {
            let offset = (step.read_idx + pos - step.ref_pos) as usize;
            return Ok(match (seq.get(offset), qual.get(offset)) {
                (Some(base), Some(q)) => Some((*base, *q)),
                _ => None,
            });
        }
    }
    Ok(None)
}

/// Find an insertion or deletion anchored at `locus`.
///
/// The event is "at" the locus when the reference cursor in front of it equals
/// `locus + 1`, i.e. the last aligned base before the event sits on `locus`.
/// Returns the operation and the read index at which it starts.
pub fn indel_at(
    start: i64,
    cigar: &[CigarOp],
    locus: i64,
) -> Result<Option<(CigarOp, i64)>, CountError> {
    for step in steps(start, cigar) {
        let step = step?;
        if step.ref_pos > locus + 1 {
            break;
        }
        if matches!(step.op.kind, CigarKind::Insertion | CigarKind::Deletion)
            && step.ref_pos == locus + 1
        {
            return Ok(Some((step.op, step.read_idx)));
        }
    }
    Ok(None)
}

/// Number of reference bases covered from the alignment start to the end.
pub fn reference_len(cigar: &[CigarOp]) -> i64 {
    cigar
        .iter()
        .filter(|op| op.kind.consumes_reference())
        .map(|op| op.len as i64)
        .sum()
}
