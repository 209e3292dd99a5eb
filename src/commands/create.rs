use super::align::jackhmmer_params;
use crate::cli::CreateArgs;
use crate::hssp::protein::Protein;
use crate::hssp::workflow::{create_hssp, HsspParams};
use crate::utils::{open_output, open_reader, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time;

pub fn create(args: CreateArgs) -> Result<()> {
    let start_timer = time::Instant::now();
    let params = hssp_params(&args);

    if let Some(seq) = &args.sequence {
        let protein = Protein::from_sequence(seq);
        write_protein(&protein, &params, args.output.as_deref())?;
        log::info!("Total execution time: {:.2?}", start_timer.elapsed());
        return Ok(());
    }

    let to_dir = args.output.as_ref().is_some_and(|p| p.is_dir());
    if args.inputs.len() > 1 && args.output.is_some() && !to_dir {
        return Err("Output must be a directory when creating several HSSP files".to_string());
    }

    let mut error_count = 0;
    for input in &args.inputs {
        let output = match &args.output {
            Some(dir) if to_dir => Some(dir.join(format!("{}.hssp", input_stem(input)))),
            other => other.clone(),
        };
        if let Err(e) = create_one(input, &params, output.as_deref()) {
            log::error!("{}: {}", input.display(), e);
            error_count += 1;
        }
    }

    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    match error_count {
        0 => Ok(()),
        n => Err(format!("Failed to create {} of {} HSSP files", n, args.inputs.len())),
    }
}

fn hssp_params(args: &CreateArgs) -> HsspParams {
    HsspParams {
        jackhmmer: jackhmmer_params(&args.search),
        max_hits: args.max_hits,
        min_length: args.min_length,
        threshold: args.threshold,
        data_dir: args.data_dir.clone(),
        databank_version: args.databank_version.clone(),
        threads: args.search.num_threads,
    }
}

fn create_one(input: &Path, params: &HsspParams, output: Option<&Path>) -> Result<()> {
    let mut protein = Protein::from_dssp(open_reader(input)?)?;
    if protein.id.is_empty() {
        protein.id = input_stem(input).to_uppercase();
    }
    write_protein(&protein, params, output)
}

/// Renders the HSSP file in memory, so a failed protein leaves no output.
fn write_protein(protein: &Protein, params: &HsspParams, output: Option<&Path>) -> Result<()> {
    let mut buffer = Vec::new();
    create_hssp(protein, params, &mut buffer)?;

    match output {
        Some(path) => {
            let mut out = open_output(path)?;
            out.write_all(&buffer)
                .and_then(|_| out.flush())
                .map_err(|e| format!("Could not write '{}': {}", path.display(), e))?;
            log::info!("Wrote {}", path.display());
        }
        None => io::stdout()
            .lock()
            .write_all(&buffer)
            .map_err(|e| format!("Could not write HSSP output: {}", e))?,
    }
    Ok(())
}

/// File name without the `.gz` and the format extension.
fn input_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match PathBuf::from(name).file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => name.to_string(),
    }
}
