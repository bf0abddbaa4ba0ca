//! VCF header of the counting output.

use std::io::Write;
use std::path::Path;

use crate::common::worker_version;

/// INFO and FORMAT definitions, in output order.
const DEFINITIONS: &[&str] = &[
    r#"##INFO=<ID=RP,Number=1,Type=Integer,Description="Number of times smallest repeating alternate sequence appears in the reference">"#,
    r#"##INFO=<ID=RU,Number=1,Type=String,Description="Smallest repeat unit within alternate sequence.  Appears RP times in reference">"#,
    r#"##INFO=<ID=HRUN,Number=2,Type=Integer,Description="Length,position of homopolymer run found in CTX">"#,
    r#"##INFO=<ID=CTX,Number=1,Type=String,Description="Reference context sequence">"#,
    r#"##INFO=<ID=ALT_INSERT,Number=1,Type=String,Description="Most frequent inserted sequence in reads if it differs from ALT">"#,
    r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#,
    r#"##FORMAT=<ID=DP,Number=1,Type=Integer,Description="Depth (fragment)">"#,
    r#"##FORMAT=<ID=DP2,Number=1,Type=Integer,Description="Depth 2 (read)">"#,
    r#"##FORMAT=<ID=AD,Number=2,Type=Integer,Description="Allele Depth (fragment)">"#,
    r#"##FORMAT=<ID=AD2,Number=2,Type=Integer,Description="Allele Depth (read)">"#,
    r#"##FORMAT=<ID=ROR,Number=4,Type=Integer,Description="Read Orientation (ref_fwd, ref_rev, alt_fwd, alt_rev)">"#,
    r#"##FORMAT=<ID=LMQ,Number=1,Type=Integer,Description="Number of reads filtered due to low mapping quality">"#,
    r#"##FORMAT=<ID=ISPAN,Number=1,Type=Integer,Description="Max variant read pos minus min variant read pos">"#,
    r#"##FORMAT=<ID=VAF,Number=1,Type=Float,Description="Variant allele frequency">"#,
    r#"##FORMAT=<ID=MER,Number=1,Type=Integer,Description="Number of ref reads with num mismatches greater than read length * .05">"#,
    r#"##FORMAT=<ID=FROR,Number=1,Type=Float,Description="Phred scaled Fisher's Exact Test for read orientation">"#,
];

/// Column header line.
const COLUMNS: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE";

/// Write the VCF header for a reference and the alignment file's contigs.
pub fn write_header<W: Write + ?Sized>(
    out: &mut W,
    path_reference: &Path,
    contigs: &[(String, u64)],
) -> Result<(), anyhow::Error> {
    writeln!(out, "##fileformat=VCFv4.2")?;
    writeln!(out, "##source=simple-allele-counter")?;
    writeln!(out, "##x-simple-allele-counter-version={}", worker_version())?;
    writeln!(out, "##reference=file://{}", path_reference.display())?;
    for (name, length) in contigs {
        writeln!(out, "##contig=<ID={},length={}>", name, length)?;
    }
    for line in DEFINITIONS {
        writeln!(out, "{}", line)?;
    }
    writeln!(out, "{}", COLUMNS)?;
    Ok(())
}
