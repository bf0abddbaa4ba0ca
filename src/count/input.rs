//! Loading of the candidate variant list.

use std::io::BufRead;
use std::path::Path;

use crate::common::open_read_maybe_gz;
use crate::count::allele::InputVariant;

/// Parse candidate variants from `reader`, skipping comments and blank lines.
pub fn read_variants<R: BufRead>(reader: R) -> Result<Vec<InputVariant>, anyhow::Error> {
    let mut result = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| anyhow::anyhow!("could not read line {}: {}", idx + 1, e))?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        result.push(InputVariant::from_line(&line, idx + 1)?);
    }
    Ok(result)
}

/// Load candidate variants from a plain or gzip-compressed file.
pub fn load_variants<P: AsRef<Path>>(path: P) -> Result<Vec<InputVariant>, anyhow::Error> {
    let reader = open_read_maybe_gz(path.as_ref()).map_err(|e| {
        anyhow::anyhow!(
            "could not open candidate variants {}: {}",
            path.as_ref().display(),
            e
        )
    })?;
    read_variants(reader)
}
