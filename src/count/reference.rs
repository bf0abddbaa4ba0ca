//! Access to the reference sequence.

use std::collections::HashMap;
use std::path::Path;

use bio::io::fasta;

/// Read-only lookup of reference bases by 1-based coordinate.
pub trait ReferenceProvider {
    /// Length of `chrom`, `None` if the chromosome is unknown.
    fn chrom_len(&self, chrom: &str) -> Option<i64>;

    /// Fetch up to `len` upper-case bases starting at 1-based `start`.
    ///
    /// The result is truncated at the chromosome end and empty for positions
    /// outside of the chromosome.
    fn fetch(&mut self, chrom: &str, start: i64, len: usize) -> Result<String, anyhow::Error>;

    /// The reference base at 1-based `pos`, if resolvable.
    fn base_at(&mut self, chrom: &str, pos: i64) -> Result<Option<u8>, anyhow::Error> {
        Ok(self.fetch(chrom, pos, 1)?.bytes().next())
    }
}

/// Reference provider backed by an indexed FASTA file.
pub struct FastaReference {
    reader: fasta::IndexedReader<std::fs::File>,
    lengths: HashMap<String, i64>,
}

impl FastaReference {
    /// Open the FASTA file at `path`; the `.fai` index must exist next to it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let reader = fasta::IndexedReader::from_file(&path).map_err(|e| {
            anyhow::anyhow!("could not open indexed FASTA {}: {}", path.display(), e)
        })?;
        let lengths = reader
            .index
            .sequences()
            .into_iter()
            .map(|seq| (seq.name, seq.len as i64))
            .collect();
        Ok(Self { reader, lengths })
    }
}

impl ReferenceProvider for FastaReference {
    fn chrom_len(&self, chrom: &str) -> Option<i64> {
        self.lengths.get(chrom).copied()
    }

    fn fetch(&mut self, chrom: &str, start: i64, len: usize) -> Result<String, anyhow::Error> {
        let chrom_len = match self.chrom_len(chrom) {
            Some(chrom_len) => chrom_len,
            None => return Ok(String::new()),
        };
        let begin = (start - 1).max(0);
        let end = (start - 1 + len as i64).min(chrom_len);
        if begin >= end {
            return Ok(String::new());
        }

        self.reader
            .fetch(chrom, begin as u64, end as u64)
            .map_err(|e| anyhow::anyhow!("could not fetch {}:{}-{}: {}", chrom, begin + 1, end, e))?;
        let mut seq = Vec::with_capacity((end - begin) as usize);
        self.reader
            .read(&mut seq)
            .map_err(|e| anyhow::anyhow!("could not read {}:{}-{}: {}", chrom, begin + 1, end, e))?;
        Ok(String::from_utf8_lossy(&seq).to_ascii_uppercase())
    }
}
