//! Locating insertions and deletions anchored at a locus.

use crate::count::allele::Allele;
use crate::count::cigar::{self, CigarKind, CigarOp};
use crate::count::read::AlignedRead;
use crate::err::CountError;

/// An insertion or deletion found at a locus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndelEvent {
    pub op: CigarOp,
    /// Read index at which the event starts; may be negative after the
    /// partial-insertion correction at the read start.
    pub read_idx: i64,
    /// Inserted bases, only when the read spans the full insertion.
    pub insert_bases: Option<String>,
}

impl IndelEvent {
    /// The allele this event supports.
    pub fn allele(&self) -> Allele {
        match self.op.kind {
            CigarKind::Insertion => Allele::Insertion(self.op.len),
            _ => Allele::Deletion(self.op.len),
        }
    }
}

/// Return the `len` read bases starting at `read_idx` as a string.
fn read_bases(read: &AlignedRead, read_idx: i64, len: u32) -> Option<String> {
    let begin = usize::try_from(read_idx).ok()?;
    let end = begin.checked_add(len as usize)?;
    read.seq
        .get(begin..end)
        .map(|bases| String::from_utf8_lossy(bases).to_ascii_uppercase())
}

/// Locate the indel that `read` supports at `locus`.
///
/// Only reads carrying an assembled contig annotation support an indel, and
/// only if their own alignment shows an event of the same kind at the locus.
/// Such reads may hold a truncated copy of an insertion at the first or last
/// read base; the read index is then moved by the missing length.
pub fn locate(read: &AlignedRead, locus: i64) -> Result<Option<IndelEvent>, CountError> {
    let contig = match read.contig_annotation()? {
        Some(contig) => contig,
        None => return Ok(None),
    };
    let contig_op = match cigar::indel_at(contig.start, &contig.cigar, locus)? {
        Some((op, _)) => op,
        None => return Ok(None),
    };
    let (read_op, read_idx) = match cigar::indel_at(read.start, &read.cigar, locus)? {
        Some((read_op, read_idx)) if read_op.kind == contig_op.kind => (read_op, read_idx),
        _ => return Ok(None),
    };

    let mut event = IndelEvent {
        op: contig_op,
        read_idx,
        insert_bases: None,
    };
    if contig_op.kind == CigarKind::Insertion {
        if read_op.len == contig_op.len {
            event.insert_bases = read_bases(read, read_idx, read_op.len);
        } else if read_op.len < contig_op.len {
            let diff = (contig_op.len - read_op.len) as i64;
            if read_idx == 0 {
                event.read_idx = read_idx - diff;
            } else if read_idx == read.seq.len() as i64 - 1 {
                event.read_idx = read_idx + diff;
            }
        }
    }
    Ok(Some(event))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn read(start: i64, cigar_text: &str, seq: &str, contig: Option<&str>) -> AlignedRead {
        AlignedRead {
            name: "read".into(),
            start,
            cigar: cigar::parse(cigar_text).unwrap(),
            seq: seq.as_bytes().to_vec(),
            qual: vec![30; seq.len()],
            contig: contig.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn full_insertion_with_annotation() {
        // locus 104 is the last base before the inserted GGG
        let read = read(100, "5M3I5M", "ACGTAGGGCCTTA", Some("c1,90,15M3I20M"));
        let event = locate(&read, 104).unwrap().unwrap();
        assert_eq!(
            event,
            IndelEvent {
                op: CigarOp::new(CigarKind::Insertion, 3),
                read_idx: 5,
                insert_bases: Some("GGG".into()),
            }
        );
        assert_eq!(event.allele(), Allele::Insertion(3));
    }

    #[test]
    fn deletion_with_annotation() {
        let read = read(100, "5M2D5M", "ACGTACCTTA", Some("c1,90,15M2D20M"));
        let event = locate(&read, 104).unwrap().unwrap();
        assert_eq!(event.allele(), Allele::Deletion(2));
        assert_eq!(event.insert_bases, None);
        assert_eq!(locate(&read, 105).unwrap(), None);
    }

    #[test]
    fn read_without_annotation_supports_no_indel() {
        let insertion = read(100, "5M3I5M", "ACGTAGGGCCTTA", None);
        assert_eq!(locate(&insertion, 104).unwrap(), None);
        let deletion = read(100, "5M2D5M", "ACGTACCTTA", None);
        assert_eq!(locate(&deletion, 104).unwrap(), None);
    }

    #[test]
    fn contig_insertion_corroborated_by_read() {
        let read = read(100, "5M3I5M", "ACGTAGGGCCTTA", Some("c1,90,15M3I20M"));
        let event = locate(&read, 104).unwrap().unwrap();
        assert_eq!(event.op, CigarOp::new(CigarKind::Insertion, 3));
        assert_eq!(event.read_idx, 5);
        assert_eq!(event.insert_bases, Some("GGG".into()));
    }

    #[test]
    fn contig_event_not_supported_by_read_alignment() {
        let read = read(100, "13M", "ACGTAGGGCCTTA", Some("c1,90,15M3I20M"));
        assert_eq!(locate(&read, 104).unwrap(), None);
    }

    #[test]
    fn contig_event_of_other_kind() {
        let read = read(100, "5M3D8M", "ACGTAGGGCCTTA", Some("c1,90,15M3I20M"));
        assert_eq!(locate(&read, 104).unwrap(), None);
    }

    #[test]
    fn contig_without_event_at_locus() {
        let read = read(100, "5M3I5M", "ACGTAGGGCCTTA", Some("c1,90,40M"));
        assert_eq!(locate(&read, 104).unwrap(), None);
    }

    #[test]
    fn truncated_insertion_at_read_start() {
        // read starts with 2 of the 5 inserted bases, soft clipped as insertion
        let read = read(105, "2I8M", "GGCCTTAACC", Some("c1,90,15M5I20M"));
        let event = locate(&read, 104).unwrap().unwrap();
        assert_eq!(event.op, CigarOp::new(CigarKind::Insertion, 5));
        assert_eq!(event.read_idx, -3);
        assert_eq!(event.insert_bases, None);
    }

    #[test]
    fn truncated_insertion_at_last_read_base() {
        // the single inserted base is the last base of the read
        let read = read(96, "9M1I", "AACCGTAAGG", Some("c1,90,15M5I20M"));
        let event = locate(&read, 104).unwrap().unwrap();
        assert_eq!(event.op, CigarOp::new(CigarKind::Insertion, 5));
        assert_eq!(event.read_idx, 13);
        assert_eq!(event.insert_bases, None);
    }

    #[test]
    fn truncated_insertion_ending_the_read_keeps_index() {
        // two inserted bases end the read, but the insertion starts before the
        // last read base
        let read = read(97, "8M2I", "AACCGTAAGG", Some("c1,90,15M5I20M"));
        let event = locate(&read, 104).unwrap().unwrap();
        assert_eq!(event.read_idx, 8);
        assert_eq!(event.insert_bases, None);
    }

    #[test]
    fn truncated_insertion_inside_read_keeps_index() {
        let read = read(100, "5M2I5M", "ACGTAGGCCTTA", Some("c1,90,15M5I20M"));
        let event = locate(&read, 104).unwrap().unwrap();
        assert_eq!(event.read_idx, 5);
        assert_eq!(event.insert_bases, None);
    }

    #[test]
    fn malformed_annotation_is_an_error() {
        let read = read(100, "5M3I5M", "ACGTAGGGCCTTA", Some("c1;90;15M"));
        assert_eq!(
            locate(&read, 104),
            Err(CountError::MalformedContigAnnotation("c1;90;15M".into()))
        );
    }
}
