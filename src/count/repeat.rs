//! Repeat unit, repeat period, and homopolymer context around a locus.

use crate::count::allele::Allele;
use crate::count::reference::ReferenceProvider;

/// Half-width of the reference context window around the locus.
const CONTEXT_FLANK: i64 = 10;
/// Number of bases in the reference context window.
const CONTEXT_LEN: usize = 20;
/// The repeat window spans this many copies of the allele length.
const REPEAT_WINDOW_FACTOR: usize = 100;

/// Smallest sub-unit whose repetition spells out `bases`.
pub fn repeat_unit(bases: &str) -> &str {
    let len = bases.len();
    (1..len)
        .filter(|unit_len| len % unit_len == 0)
        .filter_map(|unit_len| bases.get(..unit_len))
        .find(|unit| bases.as_bytes().chunks(unit.len()).all(|c| c == unit.as_bytes()))
        .unwrap_or(bases)
}

/// Number of consecutive copies of `unit` at the start of `seq`.
pub fn repeat_period(unit: &str, seq: &str) -> usize {
    if unit.is_empty() {
        return 0;
    }
    seq.as_bytes()
        .chunks_exact(unit.len())
        .take_while(|chunk| *chunk == unit.as_bytes())
        .count()
}

/// Number of reference bases in the repeat that reads must span.
///
/// The deleted copy itself is not part of the reference context, hence one
/// period less for deletions.
pub fn repeat_length(period: usize, unit: &str, allele: &Allele) -> usize {
    match allele {
        Allele::Deletion(_) => period.saturating_sub(1) * unit.len(),
        Allele::Insertion(_) => period * unit.len(),
        _ => 0,
    }
}

/// Repeat period and unit of the candidate's sequence in the reference
/// following `pos`.
///
/// The unit candidate is the deleted reference sequence for deletions and the
/// alternate field without its anchor base otherwise.
pub fn repeat_context<R: ReferenceProvider + ?Sized>(
    reference: &mut R,
    chrom: &str,
    pos: i64,
    allele: &Allele,
    alt_field: &str,
) -> Result<(usize, String), anyhow::Error> {
    let chrom_len = reference.chrom_len(chrom).unwrap_or(0);
    let window_len = ((allele.len() * REPEAT_WINDOW_FACTOR) as i64).min(chrom_len - pos - 2);
    let window = if window_len > 0 {
        reference.fetch(chrom, pos + 1, window_len as usize)?
    } else {
        String::new()
    };

    let bases = match allele {
        Allele::Deletion(len) => window
            .get(..*len as usize)
            .unwrap_or(window.as_str())
            .to_string(),
        _ => alt_field.get(1..).unwrap_or_default().to_ascii_uppercase(),
    };
    let unit = repeat_unit(&bases).to_string();
    let period = repeat_period(&unit, &window);
    Ok((period, unit))
}

/// The 20 bases of reference around `pos`, `None` within 10 bases of either
/// chromosome end.
pub fn reference_context<R: ReferenceProvider + ?Sized>(
    reference: &mut R,
    chrom: &str,
    pos: i64,
) -> Result<Option<String>, anyhow::Error> {
    let chrom_len = match reference.chrom_len(chrom) {
        Some(chrom_len) => chrom_len,
        None => return Ok(None),
    };
    if pos > CONTEXT_FLANK && pos < chrom_len - CONTEXT_FLANK {
        Ok(Some(reference.fetch(
            chrom,
            pos - (CONTEXT_FLANK - 1),
            CONTEXT_LEN,
        )?))
    } else {
        Ok(None)
    }
}

/// Longest run of a single base in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomopolymerRun {
    pub len: usize,
    pub base: char,
    /// Offset of the run's first base in the scanned sequence.
    pub pos: usize,
}

impl Default for HomopolymerRun {
    fn default() -> Self {
        Self {
            len: 0,
            base: 'N',
            pos: 0,
        }
    }
}

impl HomopolymerRun {
    /// Find the longest run in `seq`; the leftmost run wins ties.
    pub fn find(seq: &str) -> Self {
        let mut best = Self::default();
        let bytes = seq.as_bytes();
        let mut start = 0;
        while start < bytes.len() {
            let run = bytes[start..]
                .iter()
                .take_while(|b| **b == bytes[start])
                .count();
            if run > best.len {
                best = Self {
                    len: run,
                    base: bytes[start] as char,
                    pos: start,
                };
            }
            start += run;
        }
        best
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::count::testing::MemoryReference;

    #[rstest]
    #[case("A", "A")]
    #[case("AAAA", "A")]
    #[case("ACAC", "AC")]
    #[case("ACGACG", "ACG")]
    #[case("ACGAC", "ACGAC")]
    #[case("AACAAC", "AAC")]
    #[case("", "")]
    #[case("ÄÄ", "Ä")]
    #[case("AÄ", "AÄ")]
    fn smallest_unit(#[case] bases: &str, #[case] expected: &str) {
        assert_eq!(repeat_unit(bases), expected);
    }

    #[rstest]
    #[case("A", "AAAAT", 4)]
    #[case("AC", "ACACAG", 2)]
    #[case("AC", "CACAC", 0)]
    #[case("ACG", "ACGAC", 1)]
    #[case("", "AAAA", 0)]
    fn period(#[case] unit: &str, #[case] seq: &str, #[case] expected: usize) {
        assert_eq!(repeat_period(unit, seq), expected);
    }

    #[rstest]
    #[case(Allele::Deletion(1), 4, "A", 3)]
    #[case(Allele::Deletion(2), 0, "AC", 0)]
    #[case(Allele::Insertion(2), 3, "AC", 6)]
    #[case(Allele::from_base(b'T'), 3, "A", 0)]
    #[case(Allele::MultiBase("TG".into()), 3, "G", 0)]
    fn length(
        #[case] allele: Allele,
        #[case] period: usize,
        #[case] unit: &str,
        #[case] expected: usize,
    ) {
        assert_eq!(repeat_length(period, unit, &allele), expected);
    }

    #[test]
    fn homopolymer_longest_run() {
        assert_eq!(
            HomopolymerRun::find("AAAAATGGGG"),
            HomopolymerRun {
                len: 5,
                base: 'A',
                pos: 0
            }
        );
    }

    #[rstest]
    #[case("ACGTTTTTGCCCCCA", 5, 'T', 3)]
    #[case("ACGT", 1, 'A', 0)]
    #[case("", 0, 'N', 0)]
    fn homopolymer_ties_and_edges(
        #[case] seq: &str,
        #[case] len: usize,
        #[case] base: char,
        #[case] pos: usize,
    ) {
        assert_eq!(HomopolymerRun::find(seq), HomopolymerRun { len, base, pos });
    }

    fn reference() -> MemoryReference {
        MemoryReference::new(&[("1", "CCCCCCCCCGTAAAAAGTTCACACACGGTCCCCCCCCCCCCCCC")])
    }

    #[test]
    fn deletion_repeat_context() -> Result<(), anyhow::Error> {
        // deleting one A after the T at 11: window starts at 12
        let (period, unit) =
            repeat_context(&mut reference(), "1", 11, &Allele::Deletion(1), "G")?;
        assert_eq!((period, unit.as_str()), (5, "A"));
        Ok(())
    }

    #[test]
    fn insertion_repeat_context() -> Result<(), anyhow::Error> {
        // inserting CA after the T at 19: window CACACACGG...
        let (period, unit) =
            repeat_context(&mut reference(), "1", 19, &Allele::Insertion(4), "TCACA")?;
        assert_eq!((period, unit.as_str()), (3, "CA"));
        Ok(())
    }

    #[test]
    fn substitution_repeat_context_is_empty() -> Result<(), anyhow::Error> {
        let (period, unit) =
            repeat_context(&mut reference(), "1", 11, &Allele::from_base(b'T'), "T")?;
        assert_eq!((period, unit.as_str()), (0, ""));
        Ok(())
    }

    #[test]
    fn repeat_window_bounded_by_chromosome_end() -> Result<(), anyhow::Error> {
        let (period, unit) =
            repeat_context(&mut reference(), "1", 43, &Allele::Deletion(1), "C")?;
        assert_eq!((period, unit.as_str()), (0, ""));
        Ok(())
    }

    #[rstest]
    #[case(11, Some("CCCCCCCCGTAAAAAGTTCA"))]
    #[case(10, None)]
    #[case(34, None)]
    #[case(33, Some("CACGGTCCCCCCCCCCCCCC"))]
    fn context_window(#[case] pos: i64, #[case] expected: Option<&str>) -> Result<(), anyhow::Error> {
        assert_eq!(
            reference_context(&mut reference(), "1", pos)?,
            expected.map(str::to_string)
        );
        Ok(())
    }
}
