use super::msa::Msa;
use super::seq::AlignedSeq;
use std::cmp::Ordering;

/// A homolog row selected for the report. Refers to its row by position:
/// `msa` indexes the per-chain alignments, `row` the row within it.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub chain: char,
    pub msa: usize,
    pub row: usize,
    /// Rank in the report, assigned by [`rank_hits`].
    pub nr: u32,
    pub ifir: u32,
    pub ilas: u32,
    /// Number of profile entries preceding this chain.
    pub offset: u32,
    pub ide: f32,
    pub wsim: f32,
    pub alignment_length: u32,
    pub id2: String,
}

impl Hit {
    pub fn new(seq: &AlignedSeq, chain: char, msa: usize, row: usize, offset: u32) -> Self {
        let length = seq.alignment_length();
        let fraction = |n: u32| if length > 0 { n as f32 / length as f32 } else { 0.0 };

        Hit {
            chain,
            msa,
            row,
            nr: 0,
            ifir: seq.ifir() + offset,
            ilas: seq.ilas() + offset,
            offset,
            ide: fraction(seq.identical()),
            wsim: fraction(seq.similar()),
            alignment_length: length,
            id2: seq.id2().to_string(),
        }
    }

    pub fn seq<'a>(&self, alignments: &'a [Msa]) -> &'a AlignedSeq {
        alignments[self.msa].row(self.row)
    }
}

/// Identity descending, then alignment length descending, then the greater
/// id first.
pub fn compare_hits(a: &Hit, b: &Hit) -> Ordering {
    b.ide
        .total_cmp(&a.ide)
        .then_with(|| b.alignment_length.cmp(&a.alignment_length))
        .then_with(|| b.id2.cmp(&a.id2))
}

/// Sorts the hits of all chains, keeps the best `max_hits` and numbers them
/// from 1. Rows of the dropped hits are pruned.
pub fn rank_hits(hits: &mut Vec<Hit>, alignments: &mut [Msa], max_hits: usize) {
    hits.sort_by(compare_hits);

    if hits.len() > max_hits {
        log::debug!("Keeping {} of {} hits", max_hits, hits.len());
        for hit in hits.drain(max_hits..) {
            alignments[hit.msa].row_mut(hit.row).prune();
        }
    }

    for (nr, hit) in hits.iter_mut().enumerate() {
        hit.nr = nr as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id2: &str, ide: f32, alignment_length: u32, row: usize) -> Hit {
        Hit {
            chain: 'A',
            msa: 0,
            row,
            nr: 0,
            ifir: 1,
            ilas: alignment_length,
            offset: 0,
            ide,
            wsim: ide,
            alignment_length,
            id2: id2.to_string(),
        }
    }

    fn alignment(rows: usize) -> Msa {
        let mut msa = Msa::new();
        for i in 0..rows {
            let mut s = AlignedSeq::new(&format!("s{}", i));
            s.append("ACDE");
            msa.push(s);
        }
        msa
    }

    #[test]
    fn test_hit_from_row() {
        let mut query = AlignedSeq::new("q");
        query.append("ACDEFGHIKL");
        let mut s = AlignedSeq::new("UniRef100_X/3-10");
        s.append("--DEFGHIKW");
        s.update(&query).unwrap();

        let h = Hit::new(&s, 'B', 1, 4, 10);
        assert_eq!((h.ifir, h.ilas), (13, 20));
        assert_eq!(h.alignment_length, 8);
        assert!((h.ide - 7.0 / 8.0).abs() < 1e-6);
        assert!((h.wsim - 1.0).abs() < 1e-6);
        assert_eq!(h.id2, "UniRef100_X");
    }

    #[test]
    fn test_ordering() {
        let a = hit("a", 0.9, 50, 1);
        let b = hit("b", 0.8, 90, 2);
        let c = hit("c", 0.8, 70, 3);
        let d = hit("d", 0.8, 70, 4);
        let mut hits = vec![c.clone(), a.clone(), d.clone(), b.clone()];
        hits.sort_by(compare_hits);
        let order: Vec<&str> = hits.iter().map(|h| h.id2.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "d", "c"]);
        assert_eq!(compare_hits(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_rank_truncates_and_prunes() {
        let mut alignments = vec![alignment(4)];
        let mut hits = vec![hit("x", 0.5, 40, 1), hit("y", 0.9, 40, 2), hit("z", 0.7, 40, 3)];
        rank_hits(&mut hits, &mut alignments, 2);

        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].id2.as_str(), hits[0].nr), ("y", 1));
        assert_eq!((hits[1].id2.as_str(), hits[1].nr), ("z", 2));
        assert!(alignments[0].row(1).pruned());
        assert!(!alignments[0].row(2).pruned());
        assert!(!alignments[0].row(3).pruned());
    }
}
