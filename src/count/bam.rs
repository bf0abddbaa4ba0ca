//! Access to aligned reads.

use std::path::Path;

use rust_htslib::bam::{self, record::Aux, record::Cigar, Read as _};

use crate::count::cigar::{CigarKind, CigarOp};
use crate::count::read::AlignedRead;

/// Source of the reads overlapping a single position.
pub trait AlignmentSource {
    /// Name and length of each reference sequence in the alignment header.
    fn contigs(&self) -> Vec<(String, u64)>;

    /// At most `max_reads` reads overlapping 1-based `pos` on `chrom`.
    fn reads_at(
        &mut self,
        chrom: &str,
        pos: i64,
        max_reads: usize,
    ) -> Result<Vec<AlignedRead>, anyhow::Error>;
}

/// Alignment source reading from an indexed BAM or CRAM file.
pub struct IndexedBam {
    reader: bam::IndexedReader,
    contig_tag: Vec<u8>,
}

impl IndexedBam {
    /// Open the alignment file at `path`.
    ///
    /// `reference` is required for decoding CRAM; `contig_tag` names the tag
    /// holding the assembled contig annotation.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        reference: Option<&Path>,
        contig_tag: &str,
    ) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let mut reader = bam::IndexedReader::from_path(path).map_err(|e| {
            anyhow::anyhow!("could not open alignments {}: {}", path.display(), e)
        })?;
        if let Some(reference) = reference {
            reader.set_reference(reference).map_err(|e| {
                anyhow::anyhow!("could not set reference {}: {}", reference.display(), e)
            })?;
        }
        Ok(Self {
            reader,
            contig_tag: contig_tag.as_bytes().to_vec(),
        })
    }
}

impl AlignmentSource for IndexedBam {
    fn contigs(&self) -> Vec<(String, u64)> {
        let header = self.reader.header();
        header
            .target_names()
            .iter()
            .enumerate()
            .map(|(tid, name)| {
                (
                    String::from_utf8_lossy(name).into_owned(),
                    header.target_len(tid as u32).unwrap_or(0),
                )
            })
            .collect()
    }

    fn reads_at(
        &mut self,
        chrom: &str,
        pos: i64,
        max_reads: usize,
    ) -> Result<Vec<AlignedRead>, anyhow::Error> {
        let tid = match self.reader.header().tid(chrom.as_bytes()) {
            Some(tid) => tid,
            None => {
                tracing::warn!("contig {} not in alignment header", chrom);
                return Ok(Vec::new());
            }
        };
        self.reader
            .fetch((tid, pos - 1, pos))
            .map_err(|e| anyhow::anyhow!("could not fetch {}:{}: {}", chrom, pos, e))?;

        let mut result = Vec::new();
        let mut record = bam::Record::new();
        while let Some(read_result) = self.reader.read(&mut record) {
            read_result
                .map_err(|e| anyhow::anyhow!("could not read record at {}:{}: {}", chrom, pos, e))?;
            if result.len() >= max_reads {
                tracing::warn!(
                    "more than {} reads at {}:{}, ignoring the rest",
                    max_reads,
                    chrom,
                    pos
                );
                break;
            }
            result.push(aligned_read(&record, &self.contig_tag));
        }
        Ok(result)
    }
}

fn cigar_op(cigar: &Cigar) -> CigarOp {
    match *cigar {
        Cigar::Match(len) => CigarOp::new(CigarKind::Match, len),
        Cigar::Ins(len) => CigarOp::new(CigarKind::Insertion, len),
        Cigar::Del(len) => CigarOp::new(CigarKind::Deletion, len),
        Cigar::RefSkip(len) => CigarOp::new(CigarKind::Skip, len),
        Cigar::SoftClip(len) => CigarOp::new(CigarKind::SoftClip, len),
        Cigar::HardClip(len) => CigarOp::new(CigarKind::HardClip, len),
        Cigar::Pad(len) => CigarOp::new(CigarKind::Padding, len),
        Cigar::Equal(len) => CigarOp::new(CigarKind::SequenceMatch, len),
        Cigar::Diff(len) => CigarOp::new(CigarKind::SequenceMismatch, len),
    }
}

/// Edit distance from the `NM` tag, whatever integer type it was stored as.
fn edit_distance(record: &bam::Record) -> Option<u32> {
    match record.aux(b"NM") {
        Ok(Aux::U8(v)) => Some(v as u32),
        Ok(Aux::U16(v)) => Some(v as u32),
        Ok(Aux::U32(v)) => Some(v),
        Ok(Aux::I8(v)) => u32::try_from(v).ok(),
        Ok(Aux::I16(v)) => u32::try_from(v).ok(),
        Ok(Aux::I32(v)) => u32::try_from(v).ok(),
        _ => None,
    }
}

/// Convert an htslib record into the engine's read representation.
pub fn aligned_read(record: &bam::Record, contig_tag: &[u8]) -> AlignedRead {
    let contig = match record.aux(contig_tag) {
        Ok(Aux::String(value)) => Some(value.to_string()),
        _ => None,
    };
    AlignedRead {
        name: String::from_utf8_lossy(record.qname()).into_owned(),
        is_duplicate: record.is_duplicate(),
        is_unmapped: record.is_unmapped(),
        is_secondary: record.is_secondary(),
        is_supplementary: record.is_supplementary(),
        is_reverse: record.is_reverse(),
        mapq: record.mapq(),
        start: record.pos() + 1,
        cigar: record.cigar().iter().map(cigar_op).collect(),
        seq: record.seq().as_bytes(),
        qual: record.qual().to_vec(),
        edit_distance: edit_distance(record),
        contig,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rust_htslib::bam::record::CigarString;

    use super::*;
    use crate::count::cigar;

    fn record(flags: u16, aux: Vec<(&str, Aux)>) -> bam::Record {
        let mut record = bam::Record::new();
        let cigar = CigarString(vec![
            Cigar::SoftClip(2),
            Cigar::Match(5),
            Cigar::Ins(2),
            Cigar::Match(3),
        ]);
        record.set(b"frag1", Some(&cigar), b"TTACGTAGGCCT", &[30; 12]);
        record.set_pos(99);
        record.set_mapq(42);
        record.set_flags(flags);
        for (tag, value) in aux {
            record.push_aux(tag.as_bytes(), value).unwrap();
        }
        record
    }

    #[test]
    fn convert_record() {
        let record = record(
            0x10 | 0x400,
            vec![("NM", Aux::U8(3)), ("YA", Aux::String("c1,90,20M2I20M"))],
        );
        let read = aligned_read(&record, b"YA");

        assert_eq!(
            read,
            AlignedRead {
                name: "frag1".into(),
                is_duplicate: true,
                is_unmapped: false,
                is_secondary: false,
                is_supplementary: false,
                is_reverse: true,
                mapq: 42,
                start: 100,
                cigar: cigar::parse("2S5M2I3M").unwrap(),
                seq: b"TTACGTAGGCCT".to_vec(),
                qual: vec![30; 12],
                edit_distance: Some(3),
                contig: Some("c1,90,20M2I20M".into()),
            }
        );
    }

    #[test]
    fn convert_record_without_tags() {
        let read = aligned_read(&record(0, vec![]), b"YA");
        assert_eq!(read.edit_distance, None);
        assert_eq!(read.contig, None);
        assert!(read.is_countable());
    }

    #[test]
    fn contig_tag_is_configurable() {
        let record = record(0, vec![("XC", Aux::String("c1,90,20M"))]);
        assert_eq!(aligned_read(&record, b"YA").contig, None);
        assert_eq!(
            aligned_read(&record, b"XC").contig,
            Some("c1,90,20M".to_string())
        );
    }
}
