//! The protein chains a profile is built for, read from a DSSP file or made
//! up from a bare sequence.

use crate::utils::Result;
use std::io::BufRead;

const RESIDUE_TABLE_START: &str = "  #  RESIDUE";
const DESCRIPTOR_RANGE: std::ops::Range<usize> = 5..39;

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub number: i32,
    pub aa: char,
    /// Columns 5..39 of the DSSP line: PDB number, chain, amino acid,
    /// secondary structure, bridge partners and accessibility.
    pub descriptor: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: char,
    pub residues: Vec<Residue>,
}

impl Chain {
    pub fn sequence(&self) -> String {
        self.residues.iter().map(|r| r.aa).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protein {
    pub id: String,
    /// Complete PDB records, empty when absent.
    pub header: String,
    pub compound: String,
    pub source: String,
    pub author: String,
    pub chains: Vec<Chain>,
}

impl Protein {
    /// Single chain `A` protein named `UNDF`, numbered from 1.
    pub fn from_sequence(seq: &str) -> Protein {
        let residues = seq
            .chars()
            .enumerate()
            .map(|(i, aa)| {
                let number = i as i32 + 1;
                Residue {
                    number,
                    aa,
                    descriptor: default_descriptor(number, 'A', aa),
                }
            })
            .collect();

        Protein {
            id: "UNDF".to_string(),
            chains: vec![Chain { id: 'A', residues }],
            ..Default::default()
        }
    }

    pub fn from_dssp<R: BufRead>(reader: R) -> Result<Protein> {
        let mut protein = Protein::default();
        let mut in_residues = false;

        for (line_number, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Error at DSSP line {}: {}", line_number + 1, e))?;

            if !in_residues {
                match line.get(..6).unwrap_or_default() {
                    "HEADER" => {
                        protein.id = line.get(62..66).unwrap_or_default().trim().to_string();
                        protein.header = record(&line);
                    }
                    "COMPND" => protein.compound = record(&line),
                    "SOURCE" => protein.source = record(&line),
                    "AUTHOR" => protein.author = record(&line),
                    _ => in_residues = line.starts_with(RESIDUE_TABLE_START),
                }
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }
            protein.add_dssp_residue(&line, line_number + 1)?;
        }

        if protein.chains.is_empty() {
            return Err("DSSP file contains no residues".to_string());
        }
        Ok(protein)
    }

    fn add_dssp_residue(&mut self, line: &str, line_number: usize) -> Result<()> {
        let bytes = line.as_bytes();
        if bytes.len() < DESCRIPTOR_RANGE.end || !line.is_ascii() {
            return Err(format!("Truncated residue on DSSP line {}", line_number));
        }

        // Breaks are recovered from the numbering
        if bytes[13] == b'!' {
            return Ok(());
        }

        let number = line[5..10].trim().parse::<i32>().map_err(|e| {
            format!("Invalid residue number on DSSP line {}: {}", line_number, e)
        })?;
        let chain = char::from(bytes[11]);
        let aa = match bytes[13] {
            b'a'..=b'z' => 'C',
            c => char::from(c),
        };

        if self.chains.last().map(|c| c.id) != Some(chain) {
            self.chains.push(Chain {
                id: chain,
                residues: Vec::new(),
            });
        }
        if let Some(last) = self.chains.last_mut() {
            last.residues.push(Residue {
                number,
                aa,
                descriptor: line[DESCRIPTOR_RANGE].to_string(),
            });
        }
        Ok(())
    }

    pub fn chain(&self, id: char) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == id)
    }
}

/// DSSP pads header records to a fixed width ending in a dot.
fn record(line: &str) -> String {
    line.trim_end().trim_end_matches('.').trim_end().to_string()
}

/// Descriptor for residues without structural information.
fn default_descriptor(number: i32, chain: char, aa: char) -> String {
    format!("{:>5} {} {}{:11}{:>4}{:>4} {:>4} ", number, chain, aa, "", 0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DSSP: &str = "\
==== Secondary Structure Definition by the program DSSP, CMBI version 2.0                          ==== DATE=2011-06-08        .
REFERENCE W. KABSCH AND C.SANDER, BIOPOLYMERS 22 (1983) 2577-2637                                                              .
HEADER    PLANT PROTEIN                           30-APR-81   1CRN                                                             .
COMPND    MOL_ID: 1;  MOLECULE: CRAMBIN;                                                                                       .
SOURCE    MOL_ID: 1;  ORGANISM_SCIENTIFIC: CRAMBE HISPANICA SUBSP. ABYSSINICA;                                                 .
AUTHOR    W.A.HENDRICKSON,M.M.TEETER                                                                                           .
    5  1  0  0  0 TOTAL NUMBER OF RESIDUES, NUMBER OF CHAINS, NUMBER OF SS-BRIDGES(TOTAL,INTRACHAIN,INTERCHAIN)                .
  #  RESIDUE AA STRUCTURE BP1 BP2  ACC     N-H-->O    O-->H-N    N-H-->O    O-->H-N    TCO  KAPPA ALPHA  PHI   PSI    X-CA   Y-CA   Z-CA
    1    1 A T              0   0   52      0, 0.0     2,-0.3     0, 0.0     0, 0.0   0.000 360.0 360.0 360.0 152.2   17.0   14.0    3.6
    2    2 A a  E     -A   34   0A   23     31,-2.0    33,-0.7     2,-0.3     0, 0.0  -0.914 360.0-173.2-113.1 143.3   16.6   12.7    4.5
    3    5 A P        +     0   0   60      0, 0.0     2,-0.2     0, 0.0     0, 0.0   0.352  48.8 -37.5 -76.9 151.4   13.6   11.6    6.4
    4        !              0   0    0      0, 0.0     0, 0.0     0, 0.0     0, 0.0   0.000 360.0 360.0 360.0 360.0    0.0    0.0    0.0
    5    1 B S              0   0   80      0, 0.0     2,-0.2     0, 0.0     0, 0.0   0.000 360.0 360.0 360.0 152.2   10.0   10.0   10.0
";

    #[test]
    fn test_read_dssp() {
        let protein = Protein::from_dssp(Cursor::new(DSSP)).unwrap();
        assert_eq!(protein.id, "1CRN");
        assert!(protein.header.starts_with("HEADER    PLANT PROTEIN"));
        assert_eq!(protein.author, "AUTHOR    W.A.HENDRICKSON,M.M.TEETER");
        assert_eq!(protein.chains.len(), 2);

        let a = protein.chain('A').unwrap();
        assert_eq!(a.sequence(), "TCP");
        assert_eq!(
            a.residues.iter().map(|r| r.number).collect::<Vec<_>>(),
            vec![1, 2, 5]
        );
        assert_eq!(a.residues[0].descriptor.len(), 34);
        assert!(a.residues[0].descriptor.starts_with("    1 A T"));
        assert_eq!(protein.chain('B').unwrap().sequence(), "S");
        assert!(protein.chain('C').is_none());
    }

    #[test]
    fn test_read_dssp_without_residues() {
        let text = "HEADER    X\n  #  RESIDUE AA\n";
        assert!(Protein::from_dssp(Cursor::new(text)).is_err());
    }

    #[test]
    fn test_from_sequence() {
        let protein = Protein::from_sequence("MKV");
        assert_eq!(protein.id, "UNDF");
        let chain = &protein.chains[0];
        assert_eq!(chain.id, 'A');
        assert_eq!(chain.sequence(), "MKV");
        assert_eq!(chain.residues[2].number, 3);
        assert_eq!(chain.residues[2].descriptor, "    3 A V              0   0    0 ");
        assert_eq!(chain.residues[2].descriptor.len(), 34);
    }
}
