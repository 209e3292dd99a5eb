//! One row of a multiple sequence alignment together with the statistics
//! derived from aligning it against the query row.

use super::matrix::{classify, dayhoff, homology_threshold, is_gap, ResidueClass};
use crate::utils::Result;

const BLOCK_SIZE: usize = 512;

/// Glyph used for gaps inside the alignment span after `update`.
pub const GAP_GLYPH: u8 = b'.';
/// Glyph used for columns outside the alignment span after `update`.
pub const BLANK_GLYPH: u8 = b' ';

/// A homolog specific insertion between two query positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub ipos: u32,
    pub jpos: u32,
    pub seq: String,
}

/// Gap bookkeeping while walking the query and a homolog in lock-step. A
/// deletion may be followed by an insertion before the next match, so both
/// flags can be raised at once; a matched column lowers both.
#[derive(Debug, Default, Clone, Copy)]
struct RunState {
    in_deletion: bool,
    in_insertion: bool,
}

impl RunState {
    fn is_matched(&self) -> bool {
        !(self.in_deletion || self.in_insertion)
    }
}

#[derive(Debug, Clone)]
pub struct AlignedSeq {
    id: String,
    id2: String,
    jfir: u32,
    jlas: u32,
    ifir: u32,
    ilas: u32,
    identical: u32,
    similar: u32,
    length: u32,
    score: f32,
    begin: usize,
    end: usize,
    pruned: bool,
    gaps: u32,
    gapn: u32,
    insertions: Vec<Insertion>,
    data: Vec<u8>,
}

impl AlignedSeq {
    pub fn new(id: &str) -> Self {
        let (id2, jfir, jlas) = match split_range_suffix(id) {
            Some((name, jfir, jlas)) => (name.to_string(), jfir, jlas),
            None => (id.to_string(), 0, 0),
        };

        AlignedSeq {
            id: id.to_string(),
            id2,
            jfir,
            jlas,
            ifir: 0,
            ilas: 0,
            identical: 0,
            similar: 0,
            length: 0,
            score: 0.0,
            begin: 0,
            end: 0,
            pruned: false,
            gaps: 0,
            gapn: 0,
            insertions: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier without the `/jfir-jlas` suffix jackhmmer appends.
    pub fn id2(&self) -> &str {
        &self.id2
    }

    pub fn identical(&self) -> u32 {
        self.identical
    }

    pub fn similar(&self) -> u32 {
        self.similar
    }

    pub fn ifir(&self) -> u32 {
        self.ifir
    }

    pub fn ilas(&self) -> u32 {
        self.ilas
    }

    pub fn jfir(&self) -> u32 {
        self.jfir
    }

    pub fn jlas(&self) -> u32 {
        self.jlas
    }

    /// Number of gap runs (insertions and deletions) inside the alignment.
    pub fn gaps(&self) -> u32 {
        self.gaps
    }

    /// Total length of the gap runs.
    pub fn gapn(&self) -> u32 {
        self.gapn
    }

    pub fn alignment_begin(&self) -> usize {
        self.begin
    }

    pub fn alignment_end(&self) -> usize {
        self.end
    }

    pub fn alignment_length(&self) -> u32 {
        self.length
    }

    pub fn insertions(&self) -> &[Insertion] {
        &self.insertions
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn pruned(&self) -> bool {
        self.pruned
    }

    pub fn prune(&mut self) {
        self.pruned = true;
    }

    /// Width of the alignment span.
    pub fn length(&self) -> usize {
        self.end - self.begin
    }

    /// Number of columns stored.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn at(&self, column: usize) -> u8 {
        self.data[column]
    }

    /// Appends an alignment fragment. Storage doubles when it runs out, starting
    /// at one block, or grows to fit an oversized fragment directly.
    pub fn append(&mut self, fragment: &str) {
        let needed = self.data.len() + fragment.len();
        if needed > self.data.capacity() {
            let current = match self.data.capacity() {
                0 => BLOCK_SIZE,
                k => k,
            };
            let target = std::cmp::max(current * 2, needed);
            self.data.reserve_exact(target - self.data.len());
        }
        self.data.extend_from_slice(fragment.as_bytes());
        self.end = self.data.len();
    }

    /// Restricts the row to the columns `[pos, pos + n)`. Must run before `update`.
    pub fn cut(&mut self, pos: usize, n: usize) -> Result<()> {
        if pos + n > self.data.len() {
            return Err(format!(
                "Cannot cut {}..{} from sequence {} of width {}",
                pos,
                pos + n,
                self.id,
                self.data.len()
            ));
        }

        self.data.truncate(pos + n);
        self.data.drain(..pos);

        self.begin = self.begin.saturating_sub(pos);
        self.end = std::cmp::min(self.end.saturating_sub(pos), n);
        Ok(())
    }

    /// Aligns this row against the query row and recomputes all statistics.
    pub fn update(&mut self, query: &AlignedSeq) -> Result<()> {
        let mut ipos: u32 = 1;
        let mut jpos: u32 = if self.jfir == 0 { 1 } else { self.jfir };

        let mut state = RunState::default();
        // Gap counts are only committed once a matched column follows them
        let mut pending_gaps = 0;
        let mut pending_gapn = 0;
        let mut insertion: Option<Insertion> = None;

        let mut begin: Option<usize> = None;
        let mut end = 0;
        let mut length: u32 = 0;

        let width = std::cmp::min(query.data.len(), self.data.len());
        for i in 0..width {
            let q = query.data[i];
            let qgap = is_gap(q);
            let sgap = is_gap(self.data[i]);

            if qgap && sgap {
                continue;
            }

            if length > 0 {
                length += 1;
            }

            if sgap {
                if state.is_matched() {
                    pending_gaps += 1;
                }
                state.in_deletion = true;
                pending_gapn += 1;
                ipos += 1;
                continue;
            }

            if qgap {
                if !state.in_insertion {
                    let mut k = i.saturating_sub(1);
                    while k > 0 && is_gap(self.data[k]) {
                        k -= 1;
                    }
                    self.data[k] = self.data[k].to_ascii_lowercase();
                    insertion = Some(Insertion {
                        ipos,
                        jpos,
                        seq: char::from(self.data[k]).to_string(),
                    });
                }
                if let Some(ins) = insertion.as_mut() {
                    ins.seq.push(char::from(self.data[i]));
                }

                if state.is_matched() {
                    pending_gaps += 1;
                }
                state.in_insertion = true;
                pending_gapn += 1;
                jpos += 1;
            } else {
                if state.in_insertion {
                    self.data[i] = self.data[i].to_ascii_lowercase();
                    if let Some(mut ins) = insertion.take() {
                        ins.seq.push(char::from(self.data[i]));
                        self.insertions.push(ins);
                    }
                }
                state = RunState::default();

                self.ilas = ipos;
                if self.ifir == 0 {
                    self.ifir = ipos;
                    length = 1;
                } else {
                    self.gapn += pending_gapn;
                    self.gaps += pending_gaps;
                }
                self.length = length;

                pending_gaps = 0;
                pending_gapn = 0;

                ipos += 1;
                jpos += 1;
            }

            let s = self.data[i];
            if q == s {
                self.identical += 1;
            }

            let rq = match classify(q) {
                ResidueClass::Invalid => {
                    return Err(format!(
                        "Invalid letter in query sequence ({})",
                        char::from(q)
                    ))
                }
                class => class,
            };
            let rs = match classify(s) {
                ResidueClass::Invalid => {
                    return Err(format!(
                        "Invalid letter in sequence {} ({})",
                        self.id,
                        char::from(s)
                    ))
                }
                class => class,
            };
            if let (ResidueClass::Residue(a), ResidueClass::Residue(b)) = (rq, rs) {
                if dayhoff(a, b) >= 0.0 {
                    self.similar += 1;
                }
            }

            begin.get_or_insert(i);
            end = i + 1;
        }

        match begin {
            None => {
                self.begin = 0;
                self.end = 0;
            }
            Some(begin) => {
                self.begin = begin;
                self.end = end;
                for (i, c) in self.data.iter_mut().enumerate() {
                    if i < begin || i >= end {
                        *c = BLANK_GLYPH;
                    } else if is_gap(*c) {
                        *c = GAP_GLYPH;
                    }
                }
            }
        }

        self.score = if self.length > 0 {
            self.identical as f32 / self.length as f32
        } else {
            0.0
        };

        Ok(())
    }

    /// True when the identity is below the homology threshold for this
    /// alignment length raised by `cutoff`.
    pub fn drop(&self, cutoff: f32) -> bool {
        let threshold = homology_threshold(self.length);
        let result = self.score < threshold + cutoff;
        if result {
            log::trace!(
                "Dropping {} because identity {} is below threshold {}",
                self.id,
                self.score,
                threshold
            );
        }
        result
    }
}

/// Splits `name/123-456` into its parts; the name may only hold `[-a-zA-Z0-9_]`.
fn split_range_suffix(id: &str) -> Option<(&str, u32, u32)> {
    let (name, range) = id.rsplit_once('/')?;
    let (first, last) = range.split_once('-')?;

    let valid_name = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !valid_name || !is_number(first) || !is_number(last) {
        return None;
    }

    Some((name, first.parse().ok()?, last.parse().ok()?))
}
