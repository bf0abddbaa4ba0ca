/// Errors raised by the allele counting engine and its input parsing.
///
/// All of these abort the unit they occur in: a single locus for CIGAR and
/// annotation problems, the whole candidate load for input lines.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountError {
    #[error("CIGAR operation {0:?} is not supported when walking alignments")]
    UnsupportedCigarOp(char),
    #[error("invalid CIGAR string: {0:?}")]
    InvalidCigar(String),
    #[error("malformed assembled contig annotation: {0:?}")]
    MalformedContigAnnotation(String),
    #[error(
        "at least one of the REF and ALT fields must be of length 1 for indels (REF={reference}, ALT={alternative})"
    )]
    UnsupportedVariant {
        reference: String,
        alternative: String,
    },
    #[error("REF and ALT must be ASCII (REF={reference:?}, ALT={alternative:?})")]
    NonAsciiAllele {
        reference: String,
        alternative: String,
    },
    #[error("invalid candidate variant line {lineno}: {reason}")]
    InvalidInputLine { lineno: usize, reason: String },
}
