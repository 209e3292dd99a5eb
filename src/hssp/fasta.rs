use super::matrix::is_gap;
use super::msa::Msa;
use super::seq::AlignedSeq;
use crate::utils::Result;
use std::io::{BufRead, Write};

const LINE_WIDTH: usize = 72;

/// Reads an aligned FASTA file (as written by [`write_fasta`]), crops it to
/// `query` and updates all rows.
pub fn read_fasta<R: BufRead>(reader: R, query: &str, threads: usize) -> Result<Msa> {
    log::debug!("Reading fasta file");

    let mut msa = Msa::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Error at FASTA line {}: {}", line_number + 1, e))?;
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            let id = header.split(' ').next().unwrap_or_default();
            msa.push(AlignedSeq::new(id));
        } else {
            msa.last_mut()
                .ok_or_else(|| {
                    format!(
                        "Error at FASTA line {}: sequence data before the first header",
                        line_number + 1
                    )
                })?
                .append(line.trim_end());
        }
    }

    if msa.len() < 2 {
        return Err("Invalid alignment file, too few sequences".to_string());
    }

    let width = msa.query().length();
    if msa.rows().iter().skip(1).any(|s| s.length() != width) {
        return Err("Invalid alignment file, not all sequences are of same length".to_string());
    }

    log::debug!("Read {} sequences, alignment width = {}", msa.len(), width);

    msa.finalize(query, threads)?;
    Ok(msa)
}

/// Writes all rows with their score and identity count in the header, gaps
/// as `-`, wrapped at 72 columns.
pub fn write_fasta<W: Write>(out: &mut W, msa: &Msa) -> std::io::Result<()> {
    for s in msa.rows() {
        writeln!(out, ">{} {}|{}", s.id(), s.score(), s.identical())?;
        for chunk in s.as_bytes().chunks(LINE_WIDTH) {
            let line: Vec<u8> = chunk
                .iter()
                .map(|&c| if is_gap(c) { b'-' } else { c })
                .collect();
            out.write_all(&line)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}
