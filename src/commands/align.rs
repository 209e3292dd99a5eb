use crate::cli::{AlignArgs, SearchArgs};
use crate::hssp::jackhmmer::{run_to_file, JackhmmerParams};
use crate::utils::Result;
use std::time::{self, Duration};

pub fn align(args: AlignArgs) -> Result<()> {
    let start_timer = time::Instant::now();

    let params = jackhmmer_params(&args.search);
    run_to_file(&args.sequence, &params, &args.output)?;

    log::info!("Wrote alignment to {}", args.output.display());
    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}

pub(crate) fn jackhmmer_params(search: &SearchArgs) -> JackhmmerParams {
    let mut params = JackhmmerParams::new(&search.jackhmmer, &search.fasta_dir, &search.databank);
    params.iterations = search.iterations;
    params.threads = search.num_threads;
    params.max_runtime = Duration::from_secs(search.max_runtime);
    params.tmp_dir = search.tmp_dir.clone();
    params.keep_scratch = search.keep_scratch;
    params
}
