use crate::cli::ConvertArgs;
use crate::hssp::fasta::write_fasta;
use crate::hssp::stockholm::read_stockholm;
use crate::utils::{open_output, open_reader, Result};
use std::io::Write;

pub fn convert(args: ConvertArgs) -> Result<()> {
    let reader = open_reader(&args.stockholm)?;
    let mut msa = read_stockholm(reader, &args.sequence, args.num_threads)?;
    msa.sort_by_score();
    log::info!("Read {} sequences from {}", msa.len(), args.stockholm.display());

    let mut out = open_output(&args.output)?;
    write_fasta(&mut out, &msa)
        .and_then(|_| out.flush())
        .map_err(|e| format!("Could not write '{}': {}", args.output.display(), e))
}
