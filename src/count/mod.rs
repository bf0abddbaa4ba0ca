//! Implementation of the `count` subcommand.

pub mod allele;
pub mod bam;
pub mod call;
pub mod cigar;
pub mod classify;
pub mod counts;
pub mod header;
pub mod indel;
pub mod input;
pub mod read;
pub mod reference;
pub mod repeat;
pub mod stats;

#[cfg(test)]
pub mod testing;

use std::io::Write;
use std::path::Path;

use itertools::Itertools;
use rayon::prelude::*;
use thousands::Separable;

use crate::common::{self, open_write_maybe_gz};
use crate::err::CountError;

use self::allele::{Allele, InputVariant};
use self::bam::{AlignmentSource, IndexedBam};
use self::call::SampleCall;
use self::reference::{FastaReference, ReferenceProvider};

/// Parameters of the allele counting.
#[derive(Debug, Clone, clap::Args)]
pub struct Params {
    /// Minimal mapping quality of reads to count.
    #[clap(long, default_value_t = 20)]
    pub min_mapq: u8,
    /// Minimal base quality of bases to count.
    #[clap(long, default_value_t = 20)]
    pub min_baseq: u8,
    /// Maximal number of reads to load per locus; bounds memory and runtime
    /// at extreme depth.
    #[clap(long, default_value_t = 500_000)]
    pub max_reads: usize,
    /// Maximal mismatch rate of realigned reads at indel candidates.
    #[clap(long, default_value_t = 0.05)]
    pub max_mismatch_rate: f64,
    /// Tag holding the assembled contig annotation of realigned reads.
    #[clap(long, default_value = "YA")]
    pub contig_tag: String,
    /// Alpha of the beta-binomial prior of the call quality.
    #[clap(long, default_value_t = 1.0)]
    pub betabinom_alpha: f64,
    /// Beta of the beta-binomial prior of the call quality.
    #[clap(long, default_value_t = 1000.0)]
    pub betabinom_beta: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            min_mapq: 20,
            min_baseq: 20,
            max_reads: 500_000,
            max_mismatch_rate: 0.05,
            contig_tag: "YA".to_string(),
            betabinom_alpha: 1.0,
            betabinom_beta: 1000.0,
        }
    }
}

impl Params {
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.betabinom_alpha <= 0.0 || self.betabinom_beta <= 0.0 {
            anyhow::bail!(
                "beta-binomial parameters must be positive, got alpha={} beta={}",
                self.betabinom_alpha,
                self.betabinom_beta
            );
        }
        if self.max_mismatch_rate < 0.0 {
            anyhow::bail!(
                "maximal mismatch rate must not be negative, got {}",
                self.max_mismatch_rate
            );
        }
        if self.contig_tag.len() != 2 {
            anyhow::bail!("contig tag must have two characters, got {:?}", self.contig_tag);
        }
        Ok(())
    }
}

/// Command line arguments for `count` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "count allele support at candidate variants", long_about = None)]
pub struct Args {
    /// Path to the indexed reference FASTA file.
    #[clap(long)]
    pub path_reference: String,
    /// Path to the indexed BAM or CRAM file.
    #[clap(long)]
    pub path_bam: String,
    /// Path to the candidate variant list (plain or gzip compressed).
    #[clap(long)]
    pub path_variants: String,
    /// Path to the output VCF file (gzip compressed if ending in `.gz`).
    #[clap(long)]
    pub path_out: String,
    /// Number of worker threads, defaults to the number of CPUs.
    #[clap(long)]
    pub num_threads: Option<usize>,
    /// Counting parameters.
    #[command(flatten)]
    pub params: Params,
}

/// Count the reads supporting each allele at `variant` and build its call.
pub fn evaluate_locus<A, R>(
    alignments: &mut A,
    reference: &mut R,
    variant: &InputVariant,
    params: &Params,
) -> Result<SampleCall, anyhow::Error>
where
    A: AlignmentSource + ?Sized,
    R: ReferenceProvider + ?Sized,
{
    let reference_allele = reference
        .base_at(&variant.chrom, variant.pos)?
        .map(Allele::from_base)
        .unwrap_or(Allele::Unknown);
    let reads = alignments.reads_at(&variant.chrom, variant.pos, params.max_reads)?;
    if reads.is_empty() {
        return Ok(SampleCall::empty(variant, reference_allele));
    }

    let tally = counts::tally_reads(&reads, variant, &reference_allele, params)?;
    tracing::trace!(
        "{}:{} {} reads, total depth {}",
        variant.chrom,
        variant.pos,
        reads.len(),
        tally.total_depth
    );
    call::assemble(reference, variant, reference_allele, tally, params)
}

/// Evaluate all `variants` in parallel, keeping the input order.
///
/// Each worker thread opens its own alignment source and reference through
/// the given constructors. Loci with malformed alignments are logged and left
/// out; any other error aborts.
pub fn count_variants<A, R, FA, FR>(
    variants: &[InputVariant],
    params: &Params,
    num_threads: Option<usize>,
    make_alignments: FA,
    make_reference: FR,
) -> Result<Vec<SampleCall>, anyhow::Error>
where
    A: AlignmentSource,
    R: ReferenceProvider,
    FA: Fn() -> Result<A, anyhow::Error> + Sync + Send,
    FR: Fn() -> Result<R, anyhow::Error> + Sync + Send,
{
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(num_threads) = num_threads {
        builder = builder.num_threads(num_threads);
    }
    let pool = builder
        .build()
        .map_err(|e| anyhow::anyhow!("building Rayon thread pool failed: {}", e))?;

    let calls = pool.install(|| {
        variants
            .par_iter()
            .map_init(
                || -> Result<(A, R), anyhow::Error> { Ok((make_alignments()?, make_reference()?)) },
                |state, variant| {
                    let (alignments, reference) = match state {
                        Ok((alignments, reference)) => (alignments, reference),
                        Err(e) => return Err(anyhow::anyhow!("opening inputs failed: {}", e)),
                    };
                    match evaluate_locus(alignments, reference, variant, params) {
                        Ok(call) => Ok(Some(call)),
                        Err(e) => match e.downcast_ref::<CountError>() {
                            Some(err) => {
                                tracing::warn!(
                                    "skipping {}:{} {}>{}: {}",
                                    variant.chrom,
                                    variant.pos,
                                    variant.reference,
                                    variant.alternative,
                                    err
                                );
                                Ok(None)
                            }
                            None => Err(e),
                        },
                    }
                },
            )
            .collect::<Result<Vec<_>, _>>()
    })?;

    Ok(calls.into_iter().flatten().collect())
}

/// Main entry point for `count` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);
    args.params.validate()?;

    common::trace_rss_now();

    tracing::info!("Loading candidate variants...");
    let variants = input::load_variants(&args.path_variants)?;
    tracing::info!(
        "... loaded {} candidate variants",
        variants.len().separate_with_commas()
    );
    for (kind, count) in variants
        .iter()
        .map(|variant| AsRef::<str>::as_ref(&variant.allele))
        .counts()
        .into_iter()
        .sorted()
    {
        tracing::debug!("  {}: {}", kind, count.separate_with_commas());
    }

    let path_reference = Path::new(&args.path_reference);
    let cram_reference = args
        .path_bam
        .ends_with(".cram")
        .then_some(path_reference);
    let open_alignments =
        || IndexedBam::from_path(&args.path_bam, cram_reference, &args.params.contig_tag);
    let open_reference = || FastaReference::from_path(path_reference);

    let mut out = open_write_maybe_gz(&args.path_out)
        .map_err(|e| anyhow::anyhow!("could not open output file {}: {}", &args.path_out, e))?;
    let contigs = open_alignments()?.contigs();
    header::write_header(&mut out, path_reference, &contigs)?;

    tracing::info!("Counting alleles...");
    let before_counting = std::time::Instant::now();
    let calls = count_variants(
        &variants,
        &args.params,
        args.num_threads,
        open_alignments,
        open_reference,
    )?;
    tracing::info!(
        "... done counting {} loci in {:?}",
        calls.len().separate_with_commas(),
        before_counting.elapsed()
    );
    if calls.len() < variants.len() {
        tracing::warn!(
            "{} loci could not be evaluated",
            (variants.len() - calls.len()).separate_with_commas()
        );
    }

    for call in &calls {
        writeln!(out, "{}", call)
            .map_err(|e| anyhow::anyhow!("could not write output record: {}", e))?;
    }
    out.flush()
        .map_err(|e| anyhow::anyhow!("could not flush output file: {}", e))?;

    common::trace_rss_now();
    tracing::info!(
        "All of `count` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
