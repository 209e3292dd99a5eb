//! Writer for the HSSP 2.0 text format.

use super::databank::Databank;
use super::hit::Hit;
use super::msa::Msa;
use super::protein::Protein;
use super::residue::ResidueHInfo;
use chrono::NaiveDate;
use itertools::Itertools;
use std::io::{self, Write};

const BLOCK_SIZE: usize = 70;
const INSERTION_WIDTH: usize = 100;

const NOTATION: &str = "\
NOTATION : ID: EMBL/SWISSPROT identifier of the aligned (homologous) protein
NOTATION : STRID: if the 3-D structure of the aligned protein is known, then STRID is the Protein Data Bank identifier as taken
NOTATION : from the database reference or DR-line of the EMBL/SWISSPROT entry
NOTATION : %IDE: percentage of residue identity of the alignment
NOTATION : %SIM (%WSIM):  (weighted) similarity of the alignment
NOTATION : IFIR/ILAS: first and last residue of the alignment in the test sequence
NOTATION : JFIR/JLAS: first and last residue of the alignment in the alignend protein
NOTATION : LALI: length of the alignment excluding insertions and deletions
NOTATION : NGAP: number of insertions and deletions in the alignment
NOTATION : LGAP: total length of all insertions and deletions
NOTATION : LSEQ2: length of the entire sequence of the aligned protein
NOTATION : ACCNUM: SwissProt accession number
NOTATION : PROTEIN: one-line description of aligned protein
NOTATION : SeqNo,PDBNo,AA,STRUCTURE,BP1,BP2,ACC: sequential and PDB residue numbers, amino acid (lower case = Cys), secondary
NOTATION : structure, bridge partners, solvent exposure as in DSSP (Kabsch and Sander, Biopolymers 22, 2577-2637(1983)
NOTATION : VAR: sequence variability on a scale of 0-100 as derived from the NALIGN alignments
NOTATION : pair of lower case characters (AvaK) in the alignend sequence bracket a point of insertion in this sequence
NOTATION : dots (....) in the alignend sequence indicate points of deletion in this sequence
NOTATION : SEQUENCE PROFILE: relative frequency of an amino acid type at each position. Asx and Glx are in their
NOTATION : acid/amide form in proportion to their database frequencies
NOTATION : NOCC: number of aligned sequences spanning this position (including the test sequence)
NOTATION : NDEL: number of sequences with a deletion in the test protein at this position
NOTATION : NINS: number of sequences with an insertion in the test protein at this position
NOTATION : ENTROPY: entropy measure of sequence variability at this position
NOTATION : RELENT: relative entropy, i.e.  entropy normalized to the range 0-100
NOTATION : WEIGHT: conservation weight
";

/// Everything that ends up in one HSSP file.
pub struct Report<'a> {
    pub databank: &'a dyn Databank,
    pub protein: &'a Protein,
    pub threshold: f32,
    pub seq_length: usize,
    /// Chains that contributed a profile, in profile order.
    pub used_chains: &'a [char],
    pub hits: &'a [Hit],
    pub residues: &'a [ResidueHInfo],
    pub alignments: &'a [Msa],
    pub date: NaiveDate,
}

pub fn write_hssp<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    write_header(out, report)?;
    write_proteins(out, report)?;
    write_alignments(out, report)?;
    write_profile(out, report)?;
    write_insertions(out, report)?;
    writeln!(out, "//")
}

fn write_header<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    let protein = report.protein;
    let databank = report.databank;

    writeln!(out, "HSSP       HOMOLOGY DERIVED SECONDARY STRUCTURE OF PROTEINS , VERSION 2.0 2011")?;
    writeln!(out, "PDBID      {}", protein.id)?;
    writeln!(out, "DATE       file generated on {}", report.date.format("%Y-%m-%d"))?;
    writeln!(out, "SEQBASE    {} version {}", databank.name(), databank.version())?;
    writeln!(
        out,
        "THRESHOLD  according to: t(L)=(290.15 * L ** -0.562) + {}",
        short_float(report.threshold * 100.0)
    )?;
    writeln!(out, "REFERENCE  Sander C., Schneider R. : Database of homology-derived protein structures. Proteins, 9:56-68 (1991).")?;
    writeln!(out, "CONTACT    Maintained at http://www.cmbi.ru.nl/ by Maarten L. Hekkelman <m.hekkelman@cmbi.ru.nl>")?;

    if let Some(text) = protein.header.get(10..50) {
        writeln!(out, "HEADER     {}", text)?;
    }
    for (label, record) in [
        ("COMPND", &protein.compound),
        ("SOURCE", &protein.source),
        ("AUTHOR", &protein.author),
    ] {
        if let Some(text) = record.get(10..).filter(|t| !t.is_empty()) {
            writeln!(out, "{}     {}", label, text)?;
        }
    }

    let nchain = protein.chains.len();
    writeln!(out, "SEQLENGTH  {}", pad(report.seq_length as i64, 4))?;
    writeln!(out, "NCHAIN     {} chain(s) in {} data set", pad(nchain as i64, 4), protein.id)?;
    if report.used_chains.len() != nchain {
        writeln!(
            out,
            "KCHAIN     {} chain(s) used here ; chains(s) : {}",
            pad(report.used_chains.len() as i64, 4),
            report.used_chains.iter().join(",")
        )?;
    }
    writeln!(out, "NALIGN     {}", pad(report.hits.len() as i64, 4))?;
    write!(out, "{}", NOTATION)?;
    writeln!(out)
}

fn write_proteins<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    let databank = report.databank;

    writeln!(out, "## PROTEINS : identifier and alignment statistics")?;
    writeln!(out, "  NR.    ID         STRID   %IDE %WSIM IFIR ILAS JFIR JLAS LALI NGAP LGAP LSEQ2 ACCNUM     PROTEIN")?;

    for hit in report.hits {
        let s = hit.seq(report.alignments);
        let id = s.id2();

        let (acc, desc, lseq2) = match databank.document_nr(id) {
            Some(doc) => {
                let acc = match id.strip_prefix("UniRef100_") {
                    Some(acc) => acc,
                    None => databank.metadata(doc, "acc"),
                };
                let lseq2 = databank.sequence(doc).len();
                (acc, databank.metadata(doc, "title"), lseq2)
            }
            None => ("", "", 0),
        };

        writeln!(
            out,
            "{} : {}{:4}    {:4.2}  {:4.2} {} {} {} {} {} {} {} {}  {} {}",
            pad(hit.nr as i64, 5),
            fixed_width(id, 12),
            "",
            hit.ide,
            hit.wsim,
            pad(hit.ifir as i64, 4),
            pad(hit.ilas as i64, 4),
            pad(s.jfir() as i64, 4),
            pad(s.jlas() as i64, 4),
            pad(s.alignment_length() as i64, 4),
            pad(s.gaps() as i64, 4),
            pad(s.gapn() as i64, 4),
            pad(lseq2 as i64, 4),
            fixed_width(acc, 10),
            desc
        )?;
    }
    Ok(())
}

fn write_alignments<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    let hits = report.hits;

    for (block, chunk) in hits.chunks(BLOCK_SIZE).enumerate() {
        let first = block * BLOCK_SIZE;
        writeln!(
            out,
            "## ALIGNMENTS {} - {}",
            pad(first as i64 + 1, 4),
            pad((first + chunk.len()) as i64, 4)
        )?;

        let ruler: String = (0..7)
            .map(|k| format!("....:....{}", ((first + k * 10) / 10 + 1) % 10))
            .collect();
        writeln!(
            out,
            " SeqNo  PDBNo AA STRUCTURE BP1 BP2  ACC NOCC  VAR  {}",
            ruler
        )?;

        for r in report.residues {
            if r.is_break() {
                writeln!(
                    out,
                    " {}        !  !           0   0    0    0    0",
                    pad(r.seq_nr as i64, 5)
                )?;
                continue;
            }

            let aln: String = chunk
                .iter()
                .map(|hit| {
                    if r.seq_nr >= hit.ifir && r.seq_nr <= hit.ilas {
                        let s = hit.seq(report.alignments);
                        char::from(s.as_bytes().get(r.pos).copied().unwrap_or(b' '))
                    } else {
                        ' '
                    }
                })
                .collect();

            let var = (100.0 * (1.0 - r.consweight)) as u32;
            writeln!(
                out,
                " {}{}{} {}  {}",
                pad(r.seq_nr as i64, 5),
                r.dssp,
                pad(r.nocc as i64, 4),
                pad(var as i64, 4),
                aln
            )?;
        }
    }
    Ok(())
}

fn write_profile<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    writeln!(out, "## SEQUENCE PROFILE AND ENTROPY")?;
    writeln!(out, " SeqNo PDBNo   V   L   I   M   F   W   Y   G   A   P   S   T   C   H   R   K   Q   E   N   D  NOCC NDEL NINS ENTROPY RELENT WEIGHT")?;

    let max_entropy = 20f64.ln();
    for r in report.residues {
        if r.is_break() {
            writeln!(
                out,
                "{}          0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0   0     0    0    0   0.000      0",
                pad(r.seq_nr as i64, 5)
            )?;
            continue;
        }

        let dist: String = r.dist.iter().map(|&d| pad(d as i64, 4)).collect();
        let relent = (100.0 * r.entropy as f64 / max_entropy) as u32;
        writeln!(
            out,
            " {} {} {}{}  {} {} {}   {:5.3}   {}  {:4.2}",
            pad(r.seq_nr as i64, 4),
            pad(r.pdb_nr as i64, 4),
            r.chain,
            dist,
            pad(r.nocc as i64, 4),
            pad(r.ndel as i64, 4),
            pad(r.nins as i64, 4),
            r.entropy,
            pad(relent as i64, 4),
            r.consweight
        )?;
    }
    Ok(())
}

fn write_insertions<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    writeln!(out, "## INSERTION LIST")?;
    writeln!(out, " AliNo  IPOS  JPOS   Len Sequence")?;

    for hit in report.hits {
        for ins in hit.seq(report.alignments).insertions() {
            let mut lines = ins.seq.as_bytes().chunks(INSERTION_WIDTH);
            let first = lines.next().unwrap_or_default();
            writeln!(
                out,
                "  {}  {}  {}  {} {}",
                pad(hit.nr as i64, 4),
                pad((ins.ipos + hit.offset) as i64, 4),
                pad(ins.jpos as i64, 4),
                pad(ins.seq.len() as i64 - 2, 4),
                String::from_utf8_lossy(first)
            )?;
            for rest in lines {
                writeln!(out, "     +                   {}", String::from_utf8_lossy(rest))?;
            }
        }
    }
    Ok(())
}

/// `%<digits>.<digits>d`: at least `digits` digits, zero filled, the sign
/// in front of the zeros.
fn pad(n: i64, digits: usize) -> String {
    if n < 0 {
        format!("-{:0width$}", -n, width = digits)
    } else {
        format!("{:0width$}", n, width = digits)
    }
}

/// Left aligned, cut or blank filled to `width` characters.
fn fixed_width(text: &str, width: usize) -> String {
    format!("{:width$.width$}", text, width = width)
}

/// Up to four decimals without trailing zeros.
fn short_float(v: f32) -> String {
    let text = format!("{:.4}", v);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-" | "-0" => "0".to_string(),
        t => t.to_string(),
    }
}
