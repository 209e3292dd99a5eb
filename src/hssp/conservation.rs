//! Conservation weights: per query column, the distance weighted Dayhoff
//! similarity summed over all pairs of unpruned rows.

use super::matrix::{dayhoff, is_gap, residue_index};
use super::msa::Msa;
use super::residue::ResidueHInfo;
use crate::utils::{thread_pool, Result};
use crossbeam_channel::bounded;
use rayon::iter::{ParallelBridge, ParallelIterator};
use std::thread;

const QUEUE_SIZE: usize = 64;
const MAX_SIMILARITY: f32 = 1.5;

#[derive(Debug, Clone)]
struct Sums {
    var: Vec<f32>,
    dist: Vec<f32>,
}

impl Sums {
    fn new(width: usize) -> Self {
        Sums {
            var: vec![0.0; width],
            dist: vec![0.0; width],
        }
    }

    fn add(&mut self, other: &Sums) {
        for (a, b) in self.var.iter_mut().zip(&other.var) {
            *a += b;
        }
        for (a, b) in self.dist.iter_mut().zip(&other.dist) {
            *a += b;
        }
    }
}

/// Assigns `consweight` to the non-break entries of `residues`, which must
/// hold one entry per residue of the query row of `msa`. Row sums are added
/// in row order, so the weights do not depend on `threads`.
pub fn calculate_conservation(
    msa: &Msa,
    residues: &mut [ResidueHInfo],
    threads: usize,
) -> Result<()> {
    log::debug!("Calculating conservation weights");

    let width = msa.query().size();
    let rows: Vec<usize> = (0..msa.len().saturating_sub(1))
        .filter(|&i| !msa.row(i).pruned())
        .collect();

    let mut total = Sums::new(width);
    if threads <= 1 {
        for &i in &rows {
            total.add(&row_sums(msa, i, width));
        }
    } else {
        let pool = thread_pool(threads)?;
        let (sender, receiver) = bounded::<usize>(QUEUE_SIZE);
        let mut partials: Vec<(usize, Sums)> = thread::scope(|scope| {
            scope.spawn(move || {
                for i in rows {
                    if sender.send(i).is_err() {
                        break;
                    }
                }
            });

            pool.install(|| {
                receiver
                    .into_iter()
                    .par_bridge()
                    .map(|i| (i, row_sums(msa, i, width)))
                    .collect()
            })
        });
        partials.sort_unstable_by_key(|(i, _)| *i);
        for (_, sums) in &partials {
            total.add(sums);
        }
    }

    assign_weights(msa, &total, residues)
}

/// Contribution of every pair `(i, j)` with `j > i`.
fn row_sums(msa: &Msa, i: usize, width: usize) -> Sums {
    let mut sums = Sums::new(width);
    let si = msa.row(i);

    for sj in msa.rows().iter().skip(i + 1) {
        if sj.pruned() {
            continue;
        }

        let begin = si.alignment_begin().max(sj.alignment_begin());
        let end = si.alignment_end().min(sj.alignment_end());
        if begin >= end {
            continue;
        }

        let (a, b) = (&si.as_bytes()[begin..end], &sj.as_bytes()[begin..end]);
        let (mut len, mut agr) = (0u32, 0u32);
        for (&x, &y) in a.iter().zip(b) {
            if !is_gap(x) && !is_gap(y) {
                len += 1;
                if x == y {
                    agr += 1;
                }
            }
        }
        if len == 0 {
            continue;
        }

        let distance = 1.0 - agr as f32 / len as f32;
        for (k, (&x, &y)) in a.iter().zip(b).enumerate() {
            if let (Some(ri), Some(rj)) = (residue_index(x), residue_index(y)) {
                sums.var[begin + k] += distance * dayhoff(ri, rj);
                sums.dist[begin + k] += distance * MAX_SIMILARITY;
            }
        }
    }
    sums
}

fn assign_weights(msa: &Msa, sums: &Sums, residues: &mut [ResidueHInfo]) -> Result<()> {
    let mut targets = residues.iter_mut().filter(|r| !r.is_break());

    for (k, &c) in msa.query().as_bytes().iter().enumerate() {
        if is_gap(c) {
            continue;
        }
        let residue = targets
            .next()
            .ok_or("More query residues than profile entries".to_string())?;
        residue.consweight = if sums.dist[k] > 0.0 {
            sums.var[k] / sums.dist[k]
        } else {
            1.0
        };
    }

    if targets.next().is_some() {
        return Err("More profile entries than query residues".to_string());
    }
    Ok(())
}
