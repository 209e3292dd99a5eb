use super::{is_gzipped, Result};
use flate2::{write::GzEncoder, Compression};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Creates an output file, gzip compressed when the name ends in `.gz`.
/// Callers must `flush` before dropping to see write errors.
pub fn open_output(path: &Path) -> Result<Box<dyn Write>> {
    let file = File::create(path)
        .map_err(|e| format!("Could not create file '{}': {}", path.display(), e))?;
    if is_gzipped(path) {
        Ok(Box::new(GzEncoder::new(
            BufWriter::new(file),
            Compression::default(),
        )))
    } else {
        Ok(Box::new(BufWriter::new(file)))
    }
}
