//! Builds a complete HSSP file for one protein: chain selection, alignment
//! (cached or fresh), pruning, hit ranking and the per chain statistics.

use super::conservation::calculate_conservation;
use super::databank::FastaDatabank;
use super::fasta::{read_fasta, write_fasta};
use super::hit::rank_hits;
use super::jackhmmer::{run_to_msa, JackhmmerParams};
use super::msa::Msa;
use super::protein::{Chain, Protein};
use super::report::{write_hssp, Report};
use super::residue::{chain_to_hits, cluster_sequences, ResidueHInfo};
use crate::utils::{open_output, open_reader, Result};
use chrono::Local;
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HsspParams {
    pub jackhmmer: JackhmmerParams,
    pub max_hits: usize,
    pub min_length: usize,
    pub threshold: f32,
    /// Alignment cache, `<data_dir>/<protein>-<n>.aln.gz`.
    pub data_dir: Option<PathBuf>,
    pub databank_version: Option<String>,
    pub threads: usize,
}

/// A chain selected for the profile and the name of its alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainAlignment {
    pub chain: char,
    pub name: String,
}

/// Picks the chains of at least `min_length` residues, dropping those whose
/// sequence is contained in another selected chain.
pub fn select_chains(protein: &Protein, min_length: usize) -> Result<Vec<ChainAlignment>> {
    let candidates: Vec<&Chain> = protein
        .chains
        .iter()
        .filter(|c| c.residues.len() >= min_length)
        .collect();

    if candidates.is_empty() {
        return Err(format!(
            "Not enough sequences in PDB file of length {}",
            min_length
        ));
    }

    let mut seqs: Vec<String> = candidates.iter().map(|c| c.sequence()).collect();
    let unique = cluster_sequences(&mut seqs);

    Ok(unique
        .into_iter()
        .enumerate()
        .map(|(n, i)| ChainAlignment {
            chain: candidates[i].id,
            name: format!("{}-{}", protein.id, n),
        })
        .collect())
}

pub fn create_hssp<W: Write>(protein: &Protein, params: &HsspParams, out: &mut W) -> Result<()> {
    let selected = select_chains(protein, params.min_length)?;
    log::info!(
        "Creating HSSP for {} using chain(s) {}",
        protein.id,
        selected.iter().map(|s| s.chain).collect::<String>()
    );

    let mut chains = Vec::with_capacity(selected.len());
    let mut alignments = Vec::with_capacity(selected.len());
    let mut seq_length = 0;

    for selection in &selected {
        let chain = protein
            .chain(selection.chain)
            .ok_or_else(|| format!("Chain {} not found in {}", selection.chain, protein.id))?;
        let seq = chain.sequence();
        seq_length += seq.len();

        let mut msa = load_alignment(&seq, &selection.name, params)
            .map_err(|e| format!("Chain {}: {}", chain.id, e))?;

        let dropped = msa.prune_below(params.threshold);
        log::debug!(
            "Chain {}: {} of {} homologs below threshold",
            chain.id,
            dropped,
            msa.len() - 1
        );

        chains.push(chain);
        alignments.push(msa);
    }

    let wanted: HashSet<String> = alignments
        .iter()
        .flat_map(|msa| msa.rows().iter().skip(1))
        .filter(|s| !s.pruned())
        .map(|s| s.id2().to_string())
        .collect();
    let databank = FastaDatabank::open(
        &params.jackhmmer.fasta_dir,
        &params.jackhmmer.databank,
        params.databank_version.as_deref(),
        Some(&wanted),
    )?;

    let mut hits = Vec::new();
    let mut residues = Vec::new();
    let mut ranges = Vec::with_capacity(chains.len());
    for (i, chain) in chains.iter().enumerate() {
        if !residues.is_empty() {
            residues.push(ResidueHInfo::new_break(residues.len() as u32 + 1));
        }
        let first = residues.len();
        chain_to_hits(&databank, &alignments[i], i, chain, &mut hits, &mut residues)?;
        ranges.push(first..residues.len());
    }

    rank_hits(&mut hits, &mut alignments, params.max_hits);

    for (i, range) in ranges.into_iter().enumerate() {
        let chain_residues = &mut residues[range];
        calculate_conservation(&alignments[i], chain_residues, params.threads)?;
        for r in chain_residues.iter_mut() {
            r.calculate_variability(&hits, &alignments[i]);
        }
    }

    let used_chains: Vec<char> = chains.iter().map(|c| c.id).collect();
    let report = Report {
        databank: &databank,
        protein,
        threshold: params.threshold,
        seq_length,
        used_chains: &used_chains,
        hits: &hits,
        residues: &residues,
        alignments: &alignments,
        date: Local::now().date_naive(),
    };
    write_hssp(out, &report)
        .and_then(|_| out.flush())
        .map_err(|e| format!("Could not write HSSP output: {}", e))?;

    log::info!("Wrote {} hits for {}", hits.len(), protein.id);
    Ok(())
}

/// Reads the cached alignment for `name` or runs jackhmmer, storing the
/// result in the cache when one is configured.
fn load_alignment(seq: &str, name: &str, params: &HsspParams) -> Result<Msa> {
    let cache = params
        .data_dir
        .as_ref()
        .map(|dir| dir.join(format!("{}.aln.gz", name)));

    if let Some(path) = cache.as_ref().filter(|p| p.exists()) {
        log::info!("Using cached alignment {}", path.display());
        return read_fasta(open_reader(path)?, seq, params.threads)
            .map_err(|e| format!("{} ({})", e, path.display()));
    }

    let msa = run_to_msa(seq, &params.jackhmmer)?;

    if let Some(path) = cache {
        let mut out = open_output(&path)?;
        write_fasta(&mut out, &msa)
            .and_then(|_| out.flush())
            .map_err(|e| format!("Could not write '{}': {}", path.display(), e))?;
        log::debug!("Stored alignment in {}", path.display());
    }

    Ok(msa)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hssp::protein::Residue;
    use std::path::Path;
    use std::time::Duration;

    const DATABANK: &str = "\
>UniRef100_A First homolog
MKTAYIAKQRAA
>UniRef100_B Second homolog
KTAYLAKQ
>UniRef100_C Unrelated
VVVVVVVVVV
";

    const CACHED: &str = "\
>input 0|0
MKTAYIAKQR
>UniRef100_A/1-10 1|10
MKTAYIAKQR
>UniRef100_B/1-8 0.875|7
-KTAYLAKQ-
>UniRef100_C/1-10 0|0
VVVVVVVVVV
";

    fn chain(id: char, seq: &str) -> Chain {
        Chain {
            id,
            residues: seq
                .chars()
                .enumerate()
                .map(|(i, aa)| Residue {
                    number: i as i32 + 1,
                    aa,
                    descriptor: format!("{:>5} {} {}{:25}", i + 1, id, aa, ""),
                })
                .collect(),
        }
    }

    fn params(root: &Path, jackhmmer: &Path) -> HsspParams {
        let fasta_dir = root.join("fasta");
        std::fs::create_dir_all(&fasta_dir).unwrap();
        std::fs::write(fasta_dir.join("testdb.fa"), DATABANK).unwrap();

        let data_dir = root.join("data");
        std::fs::create_dir_all(&data_dir).unwrap();

        let mut jackhmmer = JackhmmerParams::new(jackhmmer, &fasta_dir, "testdb");
        jackhmmer.poll_interval = Duration::from_millis(20);
        jackhmmer.tmp_dir = Some(root.join("scratch"));
        HsspParams {
            jackhmmer,
            max_hits: 5000,
            min_length: 5,
            threshold: 0.05,
            data_dir: Some(data_dir),
            databank_version: Some("test".to_string()),
            threads: 2,
        }
    }

    #[test]
    fn test_select_chains_clusters() {
        let protein = Protein {
            id: "1ABC".to_string(),
            chains: vec![
                chain('A', "MKTAYIAKQR"),
                chain('B', "KTAYIAKQ"),
                chain('C', "GSHMLE"),
                chain('D', "MKT"),
            ],
            ..Default::default()
        };
        let selected = select_chains(&protein, 5).unwrap();
        assert_eq!(
            selected,
            vec![
                ChainAlignment {
                    chain: 'A',
                    name: "1ABC-0".to_string()
                },
                ChainAlignment {
                    chain: 'C',
                    name: "1ABC-1".to_string()
                },
            ]
        );

        assert_eq!(
            select_chains(&protein, 50).unwrap_err(),
            "Not enough sequences in PDB file of length 50"
        );
    }

    #[test]
    fn test_create_from_cached_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let params = params(dir.path(), &dir.path().join("no-jackhmmer"));
        {
            let mut out = open_output(&params.data_dir.as_ref().unwrap().join("UNDF-0.aln.gz")).unwrap();
            out.write_all(CACHED.as_bytes()).unwrap();
            out.flush().unwrap();
        }

        let protein = Protein::from_sequence("MKTAYIAKQR");
        let mut buffer = Vec::new();
        create_hssp(&protein, &params, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("SEQBASE    testdb version test\n"));
        assert!(text.contains("SEQLENGTH  0010\n"));
        assert!(text.contains("NALIGN     0002\n"));
        assert!(text.contains("00001 : UniRef100_A "));
        assert!(text.contains("00002 : UniRef100_B "));
        assert!(!text.contains("UniRef100_C"));
        assert!(text.contains(" 00001    1 A M              0   0    0 0002 "));
        assert!(text.ends_with("//\n"));

        let profile = text
            .lines()
            .skip_while(|l| !l.starts_with(" SeqNo PDBNo"))
            .skip(1)
            .take_while(|l| !l.starts_with("##"))
            .count();
        assert_eq!(profile, 10);
    }

    #[cfg(unix)]
    #[test]
    fn test_create_runs_jackhmmer_and_fills_cache() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("jackhmmer.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\ncat > output.sto <<'EOF'\n\
# STOCKHOLM 1.0\n\
#=GF ID input-i2\n\
input             MKTAYIAKQR\n\
UniRef100_A/1-10  MKTAYIAKQR\n\
//\n\
EOF\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let params = params(dir.path(), &script);
        let protein = Protein::from_sequence("MKTAYIAKQR");
        let mut buffer = Vec::new();
        create_hssp(&protein, &params, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("NALIGN     0001\n"));

        let cache = params.data_dir.as_ref().unwrap().join("UNDF-0.aln.gz");
        let msa = read_fasta(open_reader(&cache).unwrap(), "", 1).unwrap();
        assert_eq!(msa.len(), 2);
        assert_eq!(msa.row(1).id(), "UniRef100_A/1-10");
    }
}
