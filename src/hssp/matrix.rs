//! Constant tables shared by the scoring code: the homology threshold curve,
//! the Dayhoff similarity matrix and the residue index map.

/// Identity thresholds for alignment lengths 10..=80,
/// t(L) = 290.15 * L ** -0.562 (as a fraction).
pub const HOMOLOGY_THRESHOLD: [f32; 71] = [
    0.795468, 0.75398, 0.717997, 0.686414, 0.658413, 0.633373, 0.610811, 0.590351, 0.571688,
    0.554579, 0.53882, 0.524246, 0.510718, 0.498117, 0.486344, 0.475314, 0.464951, 0.455194,
    0.445984, 0.437275, 0.429023, 0.421189, 0.413741, 0.406647, 0.399882, 0.39342, 0.38724,
    0.381323, 0.375651, 0.370207, 0.364976, 0.359947, 0.355105, 0.35044, 0.345941, 0.341599,
    0.337406, 0.333352, 0.329431, 0.325636, 0.32196, 0.318396, 0.314941, 0.311587, 0.308331,
    0.305168, 0.302093, 0.299103, 0.296194, 0.293362, 0.290604, 0.287917, 0.285298, 0.282744,
    0.280252, 0.277821, 0.275448, 0.273129, 0.270865, 0.268652, 0.266488, 0.264372, 0.262302,
    0.260277, 0.258294, 0.256353, 0.254452, 0.252589, 0.250764, 0.248975, 0.247221,
];

/// Threshold for an alignment of `length` residues, clamped to 10..=80.
pub fn homology_threshold(length: u32) -> f32 {
    HOMOLOGY_THRESHOLD[(length.clamp(10, 80) - 10) as usize]
}

/// Residue order of the matrix and of the HSSP profile columns.
pub const RESIDUE_ORDER: &[u8; 20] = b"VLIMFWYGAPSTCHRKQEND";

// Lower triangle, row by row, in RESIDUE_ORDER
#[rustfmt::skip]
const DAYHOFF_DATA: [f32; 210] = [
     1.5,
     0.8, 1.5,
     1.1, 0.8, 1.5,
     0.6, 1.3, 0.6, 1.5,
     0.2, 1.2, 0.7, 0.5, 1.5,
    -0.8, 0.5,-0.5,-0.3, 1.3, 1.5,
    -0.1, 0.3, 0.1,-0.1, 1.4, 1.1, 1.5,
     0.2,-0.5,-0.3,-0.3,-0.6,-1.0,-0.7, 1.5,
     0.2,-0.1, 0.0, 0.0,-0.5,-0.8,-0.3, 0.7, 1.5,
     0.1,-0.3,-0.2,-0.2,-0.7,-0.8,-0.8, 0.3, 0.5, 1.5,
    -0.1,-0.4,-0.1,-0.3,-0.3, 0.3,-0.4, 0.6, 0.4, 0.4, 1.5,
     0.2,-0.1, 0.2, 0.0,-0.3,-0.6,-0.3, 0.4, 0.4, 0.3, 0.3, 1.5,
     0.2,-0.8, 0.2,-0.6,-0.1,-1.2, 1.0, 0.2, 0.3, 0.1, 0.7, 0.2, 1.5,
    -0.3,-0.2,-0.3,-0.3,-0.1,-0.1, 0.3,-0.2,-0.1, 0.2,-0.2,-0.1,-0.1, 1.5,
    -0.3,-0.4,-0.3, 0.2,-0.5, 1.4,-0.6,-0.3,-0.3, 0.3, 0.1,-0.1,-0.3, 0.5, 1.5,
    -0.2,-0.3,-0.2, 0.2,-0.7, 0.1,-0.6,-0.1, 0.0, 0.1, 0.2, 0.2,-0.6, 0.1, 0.8, 1.5,
    -0.2,-0.1,-0.3, 0.0,-0.8,-0.5,-0.6, 0.2, 0.2, 0.3,-0.1,-0.1,-0.6, 0.7, 0.4, 0.4, 1.5,
    -0.2,-0.3,-0.2,-0.2,-0.7,-1.1,-0.5, 0.5, 0.3, 0.1, 0.2, 0.2,-0.6, 0.4, 0.0, 0.3, 0.7, 1.5,
    -0.3,-0.4,-0.3,-0.3,-0.5,-0.3,-0.1, 0.4, 0.2, 0.0, 0.3, 0.2,-0.3, 0.5, 0.1, 0.4, 0.4, 0.5, 1.5,
    -0.2,-0.5,-0.2,-0.4,-1.0,-1.1,-0.5, 0.7, 0.3, 0.1, 0.2, 0.2,-0.5, 0.4, 0.0, 0.3, 0.7, 1.0, 0.7, 1.5,
];

/// Dayhoff similarity of two residue indices (as returned by [`residue_index`]).
#[inline]
pub fn dayhoff(a: usize, b: usize) -> f32 {
    let (row, col) = if a >= b { (a, b) } else { (b, a) };
    DAYHOFF_DATA[row * (row + 1) / 2 + col]
}

/// Classification of an alignment character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidueClass {
    Residue(usize),
    Gap,
    Invalid,
}

const INVALID: i8 = -1;
const GAP: i8 = -2;

const fn build_residue_table() -> [i8; 256] {
    let mut table = [INVALID; 256];
    table[b' ' as usize] = GAP;
    table[b'-' as usize] = GAP;
    table[b'.' as usize] = GAP;
    table[b'_' as usize] = GAP;
    table[b'~' as usize] = GAP;
    let mut i = 0;
    while i < RESIDUE_ORDER.len() {
        let aa = RESIDUE_ORDER[i];
        table[aa as usize] = i as i8;
        table[aa.to_ascii_lowercase() as usize] = i as i8;
        i += 1;
    }
    table
}

static RESIDUE_TABLE: [i8; 256] = build_residue_table();

#[inline]
pub fn classify(aa: u8) -> ResidueClass {
    match RESIDUE_TABLE[aa as usize] {
        GAP => ResidueClass::Gap,
        INVALID => ResidueClass::Invalid,
        ix => ResidueClass::Residue(ix as usize),
    }
}

/// Index into [`RESIDUE_ORDER`] for amino acid letters of either case.
#[inline]
pub fn residue_index(aa: u8) -> Option<usize> {
    match classify(aa) {
        ResidueClass::Residue(ix) => Some(ix),
        _ => None,
    }
}

#[inline]
pub fn is_gap(aa: u8) -> bool {
    RESIDUE_TABLE[aa as usize] == GAP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_clamps_length() {
        assert_eq!(homology_threshold(0), HOMOLOGY_THRESHOLD[0]);
        assert_eq!(homology_threshold(10), 0.795468);
        assert_eq!(homology_threshold(45), HOMOLOGY_THRESHOLD[35]);
        assert_eq!(homology_threshold(80), 0.247221);
        assert_eq!(homology_threshold(5000), 0.247221);
    }

    #[test]
    fn test_dayhoff_is_symmetric() {
        for a in 0..20 {
            assert_eq!(dayhoff(a, a), 1.5);
            for b in 0..20 {
                assert_eq!(dayhoff(a, b), dayhoff(b, a));
            }
        }
        let w = residue_index(b'W').unwrap();
        let r = residue_index(b'R').unwrap();
        assert_eq!(dayhoff(w, r), 1.4);
        let d = residue_index(b'D').unwrap();
        let e = residue_index(b'E').unwrap();
        assert_eq!(dayhoff(d, e), 1.0);
    }

    #[test]
    fn test_residue_classes() {
        assert_eq!(classify(b'V'), ResidueClass::Residue(0));
        assert_eq!(classify(b'd'), ResidueClass::Residue(19));
        for gap in [b' ', b'-', b'.', b'_', b'~'] {
            assert!(is_gap(gap));
            assert_eq!(residue_index(gap), None);
        }
        for bad in [b'X', b'B', b'Z', b'U', b'*', 0u8] {
            assert_eq!(classify(bad), ResidueClass::Invalid);
        }
    }
}
