//! In-memory alignment source and reference for tests.

use std::collections::HashMap;

use crate::count::bam::AlignmentSource;
use crate::count::cigar;
use crate::count::read::AlignedRead;
use crate::count::reference::ReferenceProvider;

/// Reference sequences held as strings.
#[derive(Debug, Clone, Default)]
pub struct MemoryReference {
    seqs: HashMap<String, String>,
}

impl MemoryReference {
    pub fn new(records: &[(&str, &str)]) -> Self {
        Self {
            seqs: records
                .iter()
                .map(|(name, seq)| (name.to_string(), seq.to_ascii_uppercase()))
                .collect(),
        }
    }
}

impl ReferenceProvider for MemoryReference {
    fn chrom_len(&self, chrom: &str) -> Option<i64> {
        self.seqs.get(chrom).map(|seq| seq.len() as i64)
    }

    fn fetch(&mut self, chrom: &str, start: i64, len: usize) -> Result<String, anyhow::Error> {
        let seq = match self.seqs.get(chrom) {
            Some(seq) => seq,
            None => return Ok(String::new()),
        };
        let begin = (start - 1).max(0) as usize;
        let end = ((start - 1 + len as i64).max(0) as usize).min(seq.len());
        Ok(seq.get(begin..end).unwrap_or_default().to_string())
    }
}

/// Reads placed on named contigs.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlignments {
    contigs: Vec<(String, u64)>,
    reads: Vec<(String, AlignedRead)>,
}

impl MemoryAlignments {
    pub fn new(contigs: &[(&str, u64)]) -> Self {
        Self {
            contigs: contigs
                .iter()
                .map(|(name, len)| (name.to_string(), *len))
                .collect(),
            reads: Vec::new(),
        }
    }

    pub fn push(&mut self, chrom: &str, read: AlignedRead) -> &mut Self {
        self.reads.push((chrom.to_string(), read));
        self
    }
}

impl AlignmentSource for MemoryAlignments {
    fn contigs(&self) -> Vec<(String, u64)> {
        self.contigs.clone()
    }

    fn reads_at(
        &mut self,
        chrom: &str,
        pos: i64,
        max_reads: usize,
    ) -> Result<Vec<AlignedRead>, anyhow::Error> {
        Ok(self
            .reads
            .iter()
            .filter(|(read_chrom, read)| {
                read_chrom == chrom && read.start <= pos && read.end() >= pos
            })
            .map(|(_, read)| read.clone())
            .take(max_reads)
            .collect())
    }
}

/// A mapped read with uniform base quality 30.
pub fn read(name: &str, start: i64, cigar_text: &str, seq: &str, is_reverse: bool) -> AlignedRead {
    AlignedRead {
        name: name.into(),
        mapq: 60,
        is_reverse,
        start,
        cigar: cigar::parse(cigar_text).unwrap(),
        seq: seq.as_bytes().to_vec(),
        qual: vec![30; seq.len()],
        ..Default::default()
    }
}
