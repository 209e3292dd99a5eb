use super::databank::Databank;
use super::hit::Hit;
use super::matrix::{is_gap, residue_index};
use super::msa::Msa;
use super::protein::Chain;
use crate::utils::Result;

/// Per residue profile entry. Entries with `letter == 0` are chain breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueHInfo {
    pub letter: u8,
    pub chain: char,
    pub dssp: String,
    pub seq_nr: u32,
    pub pdb_nr: i32,
    /// Alignment column of this residue in its chain's query row.
    pub pos: usize,
    pub nocc: u32,
    pub ndel: u32,
    pub nins: u32,
    pub entropy: f32,
    pub consweight: f32,
    pub dist: [u32; 20],
}

impl ResidueHInfo {
    pub fn new(letter: u8, pos: usize, chain: char, seq_nr: u32, pdb_nr: i32, dssp: &str) -> Self {
        ResidueHInfo {
            letter,
            chain,
            dssp: dssp.to_string(),
            seq_nr,
            pdb_nr,
            pos,
            nocc: 1,
            ndel: 0,
            nins: 0,
            entropy: 0.0,
            consweight: 1.0,
            dist: [0; 20],
        }
    }

    pub fn new_break(seq_nr: u32) -> Self {
        Self::new(0, 0, ' ', seq_nr, 0, "")
    }

    pub fn is_break(&self) -> bool {
        self.letter == 0
    }

    /// Fills the residue distribution, entropy and the deletion and insertion
    /// counts from the hits on this chain. `msa` is the chain's alignment.
    pub fn calculate_variability(&mut self, hits: &[Hit], msa: &Msa) {
        self.dist = [0; 20];
        self.entropy = 0.0;

        let Some(ix) = residue_index(self.letter) else {
            return;
        };
        self.dist[ix] = 1;

        let chain = self.chain;
        let chain_hits = || hits.iter().filter(move |h| h.chain == chain);

        for hit in chain_hits() {
            if let Some(ix) = residue_index(msa.row(hit.row).at(self.pos)) {
                self.nocc += 1;
                self.dist[ix] += 1;
            }
        }

        let mut entropy = 0.0f64;
        for count in self.dist.iter_mut() {
            let freq = *count as f64 / self.nocc as f64;
            *count = (100.0 * freq + 0.5) as u32;
            if freq > 0.0 {
                entropy -= freq * freq.ln();
            }
        }
        self.entropy = entropy as f32;

        let query = msa.query();
        let insertion_follows = self.pos + 1 < query.size() && is_gap(query.at(self.pos + 1));

        let (mut ndel, mut nins) = (0, 0);
        for hit in chain_hits() {
            let t = msa.row(hit.row);
            let c = t.at(self.pos);
            if self.pos > t.alignment_begin() && self.pos < t.alignment_end() && is_gap(c) {
                ndel += 1;
            }
            if insertion_follows && (b'a'..=b'y').contains(&c) {
                nins += 1;
            }
        }
        self.ndel += ndel;
        self.nins += nins;
    }
}

/// Creates the hits for the unpruned rows of `msa` known to the databank and
/// appends the profile entries of `chain` to `res`.
pub fn chain_to_hits(
    databank: &dyn Databank,
    msa: &Msa,
    msa_index: usize,
    chain: &Chain,
    hits: &mut Vec<Hit>,
    res: &mut Vec<ResidueHInfo>,
) -> Result<()> {
    let offset = res.len() as u32;

    let mut new_hits = Vec::new();
    for (row, s) in msa.rows().iter().enumerate().skip(1) {
        if s.pruned() {
            continue;
        }
        if databank.document_nr(s.id2()).is_none() {
            log::debug!("Missing document {}", s.id2());
            continue;
        }
        new_hits.push(Hit::new(s, chain.id, msa_index, row, offset));
    }
    log::info!("Chain {}: continuing with {} hits", chain.id, new_hits.len());

    let mut residues = chain.residues.iter();
    let mut previous: Option<i32> = None;
    for (pos, &c) in msa.query().as_bytes().iter().enumerate() {
        if is_gap(c) {
            continue;
        }

        let residue = residues.next().ok_or_else(|| {
            format!(
                "Alignment query holds more residues than chain {}",
                chain.id
            )
        })?;

        if previous.is_some_and(|nr| residue.number > nr + 1) {
            res.push(ResidueHInfo::new_break(res.len() as u32 + 1));
        }
        previous = Some(residue.number);

        res.push(ResidueHInfo::new(
            c,
            pos,
            chain.id,
            res.len() as u32 + 1,
            residue.number,
            &residue.descriptor,
        ));
    }

    if residues.next().is_some() {
        return Err(format!(
            "Chain {} holds more residues than the alignment query",
            chain.id
        ));
    }

    hits.extend(new_hits);
    Ok(())
}

/// Drops every sequence fully contained in another one, repeating until no
/// pair contains the other. Returns the indices of the surviving sequences.
pub fn cluster_sequences(seqs: &mut [String]) -> Vec<usize> {
    loop {
        let mut found = false;
        'search: for i in 0..seqs.len() {
            for j in i + 1..seqs.len() {
                if seqs[i].is_empty() || seqs[j].is_empty() {
                    continue;
                }
                if seqs[i].contains(seqs[j].as_str()) {
                    seqs[j].clear();
                    found = true;
                    break 'search;
                }
                if seqs[j].contains(seqs[i].as_str()) {
                    seqs[i].clear();
                    found = true;
                    break 'search;
                }
            }
        }
        if !found {
            break;
        }
    }

    seqs.iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .map(|(i, _)| i)
        .collect()
}
