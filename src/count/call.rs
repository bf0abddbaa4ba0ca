//! Assembly and VCF rendering of the per-locus call.

use indexmap::IndexMap;

use crate::count::allele::{Allele, InputVariant};
use crate::count::counts::{AlleleCounts, LocusTally};
use crate::count::reference::ReferenceProvider;
use crate::count::repeat::{self, HomopolymerRun};
use crate::count::stats;
use crate::count::Params;

/// Value of the FORMAT column.
pub const FORMAT: &str = "GT:DP:DP2:AD:AD2:ROR:LMQ:ISPAN:VAF:MER:FROR";

/// The output record for one candidate locus.
#[derive(Debug, Clone)]
pub struct SampleCall {
    pub chrom: String,
    pub pos: i64,
    pub reference: Allele,
    pub alternative: Allele,
    pub counts: IndexMap<Allele, AlleleCounts>,
    /// Reads passing the flag filter.
    pub total_reads: u32,
    /// Fragments left after the repeat-span-aware recount.
    pub usable_depth: u32,
    pub quality: f64,
    pub repeat_period: usize,
    pub repeat_unit: String,
    pub low_mapq: u32,
    pub ref_field: String,
    pub alt_field: String,
    pub mismatch_exceeded: u32,
    /// Reference context window, `None` close to the chromosome ends.
    pub context: Option<String>,
    pub hrun: HomopolymerRun,
    pub ispan: i64,
    pub strand_bias: f64,
    /// Reference field plus the preferred inserted bases, insertions only.
    pub alt_insert: Option<String>,
}

impl SampleCall {
    /// Record for a locus without any reads.
    pub fn empty(variant: &InputVariant, reference: Allele) -> Self {
        let mut counts = IndexMap::new();
        counts.insert(reference.clone(), AlleleCounts::default());
        counts.insert(variant.allele.clone(), AlleleCounts::default());
        Self {
            chrom: variant.chrom.clone(),
            pos: variant.pos,
            reference,
            alternative: variant.allele.clone(),
            counts,
            total_reads: 0,
            usable_depth: 0,
            quality: 0.0,
            repeat_period: 0,
            repeat_unit: String::new(),
            low_mapq: 0,
            ref_field: variant.reference.clone(),
            alt_field: variant.alternative.clone(),
            mismatch_exceeded: 0,
            context: None,
            hrun: HomopolymerRun::default(),
            ispan: 0,
            strand_bias: 0.0,
            alt_insert: None,
        }
    }

    fn ref_counts(&self) -> AlleleCounts {
        self.counts.get(&self.reference).cloned().unwrap_or_default()
    }

    fn alt_counts(&self) -> AlleleCounts {
        self.counts
            .get(&self.alternative)
            .cloned()
            .unwrap_or_default()
    }

    /// Alternate fragments over usable depth, 0 without usable depth.
    pub fn vaf(&self) -> f64 {
        if self.usable_depth == 0 {
            0.0
        } else {
            self.alt_counts().count() as f64 / self.usable_depth as f64
        }
    }

    /// Alternate inserted sequence to report when reads disagree with the
    /// declared alternate bases.
    fn reported_alt_insert(&self) -> Option<&str> {
        let alt_insert = self.alt_insert.as_deref()?;
        if self.alt_field.len() > 1
            && alt_insert != self.alt_field
            && self.alt_counts().count() > 0
        {
            alt_insert.get(1..)
        } else {
            None
        }
    }

    fn info(&self) -> String {
        if self.total_reads == 0 {
            return ".".to_string();
        }
        let mut info = format!(
            "RP={};RU={};HRUN={},{};CTX={}",
            self.repeat_period,
            self.repeat_unit,
            self.hrun.len,
            self.hrun.pos,
            self.context.as_deref().unwrap_or("N")
        );
        if let Some(alt_insert) = self.reported_alt_insert() {
            info.push_str(&format!(";ALT_INSERT={}", alt_insert));
        }
        info
    }

    fn sample(&self) -> String {
        let ref_counts = self.ref_counts();
        let alt_counts = self.alt_counts();
        format!(
            "0/1:{}:{}:{},{}:{},{}:{},{},{},{}:{}:{}:{:.2}:{}:{:.2}",
            self.usable_depth,
            self.total_reads,
            ref_counts.count(),
            alt_counts.count(),
            ref_counts.total_count(),
            alt_counts.total_count(),
            ref_counts.fwd(),
            ref_counts.rev(),
            alt_counts.fwd(),
            alt_counts.rev(),
            self.low_mapq,
            self.ispan,
            self.vaf(),
            self.mismatch_exceeded,
            self.strand_bias,
        )
    }
}

impl std::fmt::Display for SampleCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t.\t{}\t{}\t{:.2}\t.\t{}\t{}\t{}",
            self.chrom,
            self.pos,
            self.ref_field,
            self.alt_field,
            self.quality,
            self.info(),
            FORMAT,
            self.sample()
        )
    }
}

/// Build the call for `variant` from its aggregated read support.
///
/// Falls back to a record without alternate allele and quality when the
/// reference base is unknown.
pub fn assemble<R: ReferenceProvider + ?Sized>(
    reference: &mut R,
    variant: &InputVariant,
    reference_allele: Allele,
    mut tally: LocusTally,
    params: &Params,
) -> Result<SampleCall, anyhow::Error> {
    let context = repeat::reference_context(reference, &variant.chrom, variant.pos)?;
    let hrun = context
        .as_deref()
        .map(HomopolymerRun::find)
        .unwrap_or_default();

    if reference_allele.is_unknown() {
        let ref_field = reference.fetch(&variant.chrom, variant.pos, 1)?;
        return Ok(SampleCall {
            chrom: variant.chrom.clone(),
            pos: variant.pos,
            reference: reference_allele,
            alternative: Allele::Unknown,
            counts: tally.alleles,
            total_reads: tally.total_depth,
            usable_depth: 0,
            quality: 0.0,
            repeat_period: 0,
            repeat_unit: String::new(),
            low_mapq: tally.low_mapq,
            ref_field: if ref_field.is_empty() {
                "N".to_string()
            } else {
                ref_field
            },
            alt_field: ".".to_string(),
            mismatch_exceeded: tally.mismatch_exceeded,
            context,
            hrun,
            ispan: 0,
            strand_bias: 0.0,
            alt_insert: None,
        });
    }

    let alternative = variant.allele.clone();
    let (repeat_period, repeat_unit) = repeat::repeat_context(
        reference,
        &variant.chrom,
        variant.pos,
        &alternative,
        &variant.alternative,
    )?;
    let repeat_length = repeat::repeat_length(repeat_period, &repeat_unit, &alternative);
    tally.set_span_end(variant.pos + repeat_length as i64);
    let usable_depth = tally.usable_depth();

    let ref_counts = tally
        .get(&reference_allele)
        .cloned()
        .unwrap_or_default();
    let alt_counts = tally.get(&alternative).cloned().unwrap_or_default();
    let quality = stats::phred_quality(
        alt_counts.count(),
        usable_depth,
        params.betabinom_alpha,
        params.betabinom_beta,
    );
    let strand_bias = stats::strand_bias_score(
        ref_counts.fwd(),
        ref_counts.rev(),
        alt_counts.fwd(),
        alt_counts.rev(),
    );
    let alt_insert = match alternative {
        Allele::Insertion(len) => Some(format!(
            "{}{}",
            variant.reference,
            alt_counts
                .preferred_insert_bases()
                .map(str::to_string)
                .unwrap_or_else(|| "N".repeat(len as usize))
        )),
        _ => None,
    };

    Ok(SampleCall {
        chrom: variant.chrom.clone(),
        pos: variant.pos,
        reference: reference_allele,
        alternative,
        counts: tally.alleles,
        total_reads: tally.total_depth,
        usable_depth,
        quality,
        repeat_period,
        repeat_unit,
        low_mapq: tally.low_mapq,
        ref_field: variant.reference.clone(),
        alt_field: variant.alternative.clone(),
        mismatch_exceeded: tally.mismatch_exceeded,
        context,
        hrun,
        ispan: alt_counts.read_idx_span(),
        strand_bias,
        alt_insert,
    })
}
