//! Per-allele read support accumulated over one locus.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::count::allele::{Allele, InputVariant};
use crate::count::classify::{classify_read, ReadOutcome};
use crate::count::read::AlignedRead;
use crate::count::Params;
use crate::err::CountError;

/// Read support for one allele at one locus.
///
/// Mates of the same fragment are counted once in the fragment count and the
/// strand counts; the total count sees every read.
#[derive(Debug, Clone, Default)]
pub struct AlleleCounts {
    total_count: u32,
    fwd: u32,
    rev: u32,
    min_read_idx: Option<i64>,
    max_read_idx: Option<i64>,
    /// Read name to index into `fragment_ends`.
    read_ids: HashMap<String, usize>,
    /// Rightmost reference position reached by each fragment.
    fragment_ends: Vec<i64>,
    /// Observed inserted sequences in order of first sighting.
    insert_bases: IndexMap<String, u32>,
    span_end: Option<i64>,
}

impl AlleleCounts {
    /// Register one supporting read.
    pub fn increment(&mut self, read: &AlignedRead) {
        self.total_count += 1;
        let end = read.end();
        match self.read_ids.get(&read.name) {
            Some(&idx) => {
                self.fragment_ends[idx] = self.fragment_ends[idx].max(end);
            }
            None => {
                self.read_ids
                    .insert(read.name.clone(), self.fragment_ends.len());
                self.fragment_ends.push(end);
                if read.is_reverse {
                    self.rev += 1;
                } else {
                    self.fwd += 1;
                }
            }
        }
    }

    /// Number of supporting fragments; after `set_span_end` only those that
    /// reach the span end.
    pub fn count(&self) -> u32 {
        match self.span_end {
            None => self.fragment_ends.len() as u32,
            Some(span_end) => self
                .fragment_ends
                .iter()
                .filter(|end| **end >= span_end)
                .count() as u32,
        }
    }

    /// Number of supporting reads, mates counted separately.
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    pub fn fwd(&self) -> u32 {
        self.fwd
    }

    pub fn rev(&self) -> u32 {
        self.rev
    }

    pub fn update_read_idx(&mut self, read_idx: i64) {
        self.min_read_idx = Some(self.min_read_idx.map_or(read_idx, |v| v.min(read_idx)));
        self.max_read_idx = Some(self.max_read_idx.map_or(read_idx, |v| v.max(read_idx)));
    }

    /// Spread of the read indices the event was seen at, 0 without events.
    pub fn read_idx_span(&self) -> i64 {
        match (self.min_read_idx, self.max_read_idx) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }

    pub fn update_insert_bases(&mut self, bases: &str) {
        *self.insert_bases.entry(bases.to_string()).or_default() += 1;
    }

    /// The most frequently observed inserted sequence, first seen wins ties.
    pub fn preferred_insert_bases(&self) -> Option<&str> {
        let mut best: Option<(&str, u32)> = None;
        for (bases, count) in &self.insert_bases {
            if best.map_or(true, |(_, best_count)| *count > best_count) {
                best = Some((bases.as_str(), *count));
            }
        }
        best.map(|(bases, _)| bases)
    }

    pub fn set_span_end(&mut self, span_end: i64) {
        self.span_end = Some(span_end);
    }

    pub fn clear_read_ids(&mut self) {
        self.read_ids = HashMap::new();
    }
}

/// Aggregated read support at one locus.
#[derive(Debug, Clone, Default)]
pub struct LocusTally {
    pub alleles: IndexMap<Allele, AlleleCounts>,
    /// Reads that passed the flag filter.
    pub total_depth: u32,
    pub low_mapq: u32,
    pub mismatch_exceeded: u32,
}

impl LocusTally {
    /// Start a tally with the reference and candidate alleles present.
    pub fn new(reference: &Allele, candidate: &Allele) -> Self {
        let mut alleles = IndexMap::new();
        alleles.insert(reference.clone(), AlleleCounts::default());
        alleles.insert(candidate.clone(), AlleleCounts::default());
        Self {
            alleles,
            ..Default::default()
        }
    }

    /// Account for the classification of one read.
    pub fn observe(&mut self, read: &AlignedRead, outcome: ReadOutcome) {
        if outcome == ReadOutcome::Ignored {
            return;
        }
        self.total_depth += 1;
        match outcome {
            ReadOutcome::Ignored | ReadOutcome::NoEvidence => (),
            ReadOutcome::LowMappingQuality => self.low_mapq += 1,
            ReadOutcome::MismatchExceeded => self.mismatch_exceeded += 1,
            ReadOutcome::Observed(allele) => {
                if !allele.is_unknown() {
                    self.alleles.entry(allele).or_default().increment(read);
                }
            }
            ReadOutcome::Indel(event) => {
                let counts = self.alleles.entry(event.allele()).or_default();
                counts.increment(read);
                counts.update_read_idx(event.read_idx);
                if let Some(bases) = &event.insert_bases {
                    counts.update_insert_bases(bases);
                }
            }
        }
    }

    /// Drop the per-read bookkeeping once all reads are observed.
    pub fn finish(&mut self) {
        self.alleles
            .values_mut()
            .for_each(AlleleCounts::clear_read_ids);
    }

    /// Only count fragments reaching `span_end` from now on.
    pub fn set_span_end(&mut self, span_end: i64) {
        self.alleles
            .values_mut()
            .for_each(|counts| counts.set_span_end(span_end));
    }

    /// Sum of fragment counts over all alleles.
    pub fn usable_depth(&self) -> u32 {
        self.alleles.values().map(AlleleCounts::count).sum()
    }

    pub fn get(&self, allele: &Allele) -> Option<&AlleleCounts> {
        self.alleles.get(allele)
    }
}

/// Classify all `reads` at `variant` and aggregate the outcomes.
pub fn tally_reads(
    reads: &[AlignedRead],
    variant: &InputVariant,
    reference: &Allele,
    params: &Params,
) -> Result<LocusTally, CountError> {
    let mut tally = LocusTally::new(reference, &variant.allele);
    for read in reads {
        let outcome = classify_read(read, variant, params)?;
        tally.observe(read, outcome);
    }
    tally.finish();
    Ok(tally)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::count::cigar::{self, CigarKind, CigarOp};
    use crate::count::indel::IndelEvent;

    fn read(name: &str, start: i64, cigar_text: &str, is_reverse: bool) -> AlignedRead {
        AlignedRead {
            name: name.into(),
            start,
            cigar: cigar::parse(cigar_text).unwrap(),
            is_reverse,
            ..Default::default()
        }
    }

    #[test]
    fn mates_count_once_per_fragment() {
        let mut counts = AlleleCounts::default();
        counts.increment(&read("a", 100, "50M", false));
        counts.increment(&read("a", 120, "50M", true));
        counts.increment(&read("b", 100, "50M", true));

        assert_eq!(counts.count(), 2);
        assert_eq!(counts.total_count(), 3);
        assert_eq!((counts.fwd(), counts.rev()), (1, 1));
    }

    #[test]
    fn span_end_filters_short_fragments() {
        let mut counts = AlleleCounts::default();
        counts.increment(&read("a", 100, "10M", false)); // ends 109
        counts.increment(&read("b", 100, "20M", false)); // ends 119
        counts.increment(&read("c", 100, "10M", false)); // mate reaches 130
        counts.increment(&read("c", 111, "20M", true));
        counts.clear_read_ids();

        assert_eq!(counts.count(), 3);
        counts.set_span_end(115);
        assert_eq!(counts.count(), 2);
        counts.set_span_end(125);
        assert_eq!(counts.count(), 1);
    }

    #[test]
    fn read_idx_span() {
        let mut counts = AlleleCounts::default();
        assert_eq!(counts.read_idx_span(), 0);
        counts.update_read_idx(12);
        assert_eq!(counts.read_idx_span(), 0);
        counts.update_read_idx(40);
        counts.update_read_idx(-3);
        assert_eq!(counts.read_idx_span(), 43);
    }

    #[test]
    fn preferred_insert_bases() {
        let mut counts = AlleleCounts::default();
        assert_eq!(counts.preferred_insert_bases(), None);
        counts.update_insert_bases("GGT");
        counts.update_insert_bases("GGA");
        assert_eq!(counts.preferred_insert_bases(), Some("GGT"));
        counts.update_insert_bases("GGA");
        assert_eq!(counts.preferred_insert_bases(), Some("GGA"));
    }

    #[test]
    fn tally_outcomes() {
        let reference = Allele::from_base(b'A');
        let candidate = Allele::Insertion(2);
        let mut tally = LocusTally::new(&reference, &candidate);

        tally.observe(&read("dup", 100, "20M", false), ReadOutcome::Ignored);
        tally.observe(&read("lmq", 100, "20M", false), ReadOutcome::LowMappingQuality);
        tally.observe(&read("mer", 100, "20M", false), ReadOutcome::MismatchExceeded);
        tally.observe(&read("none", 100, "20M", false), ReadOutcome::NoEvidence);
        tally.observe(&read("ref", 100, "20M", true), ReadOutcome::Observed(reference.clone()));
        tally.observe(
            &read("snv", 100, "20M", false),
            ReadOutcome::Observed(Allele::from_base(b'G')),
        );
        tally.observe(
            &read("ins", 100, "5M2I13M", false),
            ReadOutcome::Indel(IndelEvent {
                op: CigarOp::new(CigarKind::Insertion, 2),
                read_idx: 5,
                insert_bases: Some("TT".into()),
            }),
        );
        tally.finish();

        assert_eq!(tally.total_depth, 6);
        assert_eq!(tally.low_mapq, 1);
        assert_eq!(tally.mismatch_exceeded, 1);
        assert_eq!(
            tally.alleles.keys().cloned().collect::<Vec<_>>(),
            vec![reference.clone(), candidate.clone(), Allele::from_base(b'G')]
        );
        assert_eq!(tally.get(&reference).map(|c| c.rev()), Some(1));
        let ins = tally.get(&candidate).unwrap();
        assert_eq!(ins.count(), 1);
        assert_eq!(ins.preferred_insert_bases(), Some("TT"));
        assert_eq!(tally.usable_depth(), 3);
    }

    #[test]
    fn tally_reads_at_deletion() {
        let variant = InputVariant::new("1", 104, "AC", "A").unwrap();
        let reference = Allele::from_base(b'A');
        let mut reads = vec![
            AlignedRead {
                mapq: 60,
                seq: b"ACGTAGTACG".to_vec(),
                qual: vec![30; 10],
                contig: Some("c1,90,15M1D20M".into()),
                ..read("r1", 100, "5M1D5M", false)
            },
            AlignedRead {
                mapq: 60,
                seq: b"ACGTAGTACG".to_vec(),
                qual: vec![30; 10],
                contig: Some("c1,90,15M1D20M".into()),
                ..read("r1", 100, "5M1D5M", true)
            },
            AlignedRead {
                mapq: 60,
                seq: b"ACGTACGTAC".to_vec(),
                qual: vec![30; 10],
                ..read("r2", 100, "10M", true)
            },
            AlignedRead {
                mapq: 5,
                ..read("r3", 100, "10M", false)
            },
        ];
        reads.push(AlignedRead {
            is_duplicate: true,
            ..reads[2].clone()
        });

        let tally = tally_reads(&reads, &variant, &reference, &Params::default()).unwrap();

        assert_eq!(tally.total_depth, 4);
        assert_eq!(tally.low_mapq, 1);
        let del = tally.get(&Allele::Deletion(1)).unwrap();
        assert_eq!((del.count(), del.total_count()), (1, 2));
        assert_eq!((del.fwd(), del.rev()), (1, 0));
        assert_eq!(del.read_idx_span(), 0);
        let ref_counts = tally.get(&reference).unwrap();
        assert_eq!((ref_counts.count(), ref_counts.rev()), (1, 1));
        assert_eq!(tally.usable_depth(), 2);
    }

    #[test]
    fn seeded_alleles_have_zero_counts() {
        let tally = LocusTally::new(&Allele::from_base(b'C'), &Allele::Deletion(3));
        assert_eq!(tally.get(&Allele::Deletion(3)).map(|c| c.count()), Some(0));
        assert_eq!(tally.usable_depth(), 0);
    }
}
