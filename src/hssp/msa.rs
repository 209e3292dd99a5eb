use super::matrix::is_gap;
use super::seq::AlignedSeq;
use crate::utils::{thread_pool, Result};
use crossbeam_channel::bounded;
use rayon::iter::{ParallelBridge, ParallelIterator};
use std::thread;

const QUEUE_SIZE: usize = 64;

/// A multiple sequence alignment; row 0 is always the query.
#[derive(Debug, Default)]
pub struct Msa {
    rows: Vec<AlignedSeq>,
}

impl Msa {
    pub fn new() -> Self {
        Msa { rows: Vec::new() }
    }

    pub fn push(&mut self, row: AlignedSeq) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[AlignedSeq] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &AlignedSeq {
        &self.rows[index]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut AlignedSeq {
        &mut self.rows[index]
    }

    /// Orders the homologs by descending score, the query stays in front.
    pub fn sort_by_score(&mut self) {
        if self.rows.len() > 2 {
            self.rows[1..].sort_by(|a, b| b.score().total_cmp(&a.score()));
        }
    }

    pub fn query(&self) -> &AlignedSeq {
        &self.rows[0]
    }

    pub fn last_mut(&mut self) -> Option<&mut AlignedSeq> {
        self.rows.last_mut()
    }

    /// Non-gap characters of the query row.
    pub fn raw_query(&self) -> String {
        self.rows
            .first()
            .map(|q| {
                q.as_bytes()
                    .iter()
                    .filter(|&&c| !is_gap(c))
                    .map(|&c| char::from(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Flags every homolog whose identity is below the homology threshold
    /// raised by `cutoff`. Returns the number of rows flagged.
    pub fn prune_below(&mut self, cutoff: f32) -> usize {
        let mut count = 0;
        for row in self.rows.iter_mut().skip(1) {
            if !row.pruned() && row.drop(cutoff) {
                row.prune();
                count += 1;
            }
        }
        count
    }

    /// Crops the alignment to the columns covering `query` (when it differs
    /// from the full query row) and updates every homolog against row 0.
    pub fn finalize(&mut self, query: &str, threads: usize) -> Result<()> {
        let raw_query = self.raw_query();
        if !query.is_empty() && query != raw_query {
            if raw_query.len() < query.len() {
                return Err(
                    "Query used for the alignment is too short for the chain".to_string()
                );
            }
            let offset = raw_query
                .find(query)
                .ok_or("Alignment does not contain the chain sequence".to_string())?;
            let (pos, n) = query_window(self.rows[0].as_bytes(), offset, query.len());
            log::debug!("Cutting alignment to columns {}..{}", pos, pos + n);
            for row in self.rows.iter_mut() {
                row.cut(pos, n)?;
            }
        }

        self.update_all(threads)
    }

    /// Updates all homologs against the query, spread over `threads` workers.
    pub fn update_all(&mut self, threads: usize) -> Result<()> {
        let Some((query, homologs)) = self.rows.split_first_mut() else {
            return Ok(());
        };

        if threads <= 1 {
            return homologs.iter_mut().try_for_each(|s| s.update(query));
        }

        let pool = thread_pool(threads)?;
        let query: &AlignedSeq = query;
        let (sender, receiver) = bounded::<&mut AlignedSeq>(QUEUE_SIZE);
        thread::scope(|scope| {
            scope.spawn(move || {
                for s in homologs {
                    if sender.send(s).is_err() {
                        // the pool stopped on an error, reported below
                        break;
                    }
                }
            });

            pool.install(|| {
                receiver
                    .into_iter()
                    .par_bridge()
                    .try_for_each(|s| s.update(query))
            })
        })
    }
}

/// Column window `(pos, n)` of `query_row` holding the residues
/// `offset..offset + length` of the ungapped query. Gap columns are free, so
/// the window extends over trailing gaps up to the next residue.
fn query_window(query_row: &[u8], offset: usize, length: usize) -> (usize, usize) {
    let mut pos = 0;
    let mut skip = offset;
    while pos < query_row.len() {
        if is_gap(query_row[pos]) {
            pos += 1;
        } else if skip > 0 {
            skip -= 1;
            pos += 1;
        } else {
            break;
        }
    }

    let mut n = 0;
    let mut remaining = length;
    while pos + n < query_row.len() {
        if is_gap(query_row[pos + n]) {
            n += 1;
        } else if remaining > 0 {
            remaining -= 1;
            n += 1;
        } else {
            break;
        }
    }

    (pos, n)
}
