//! Reader for the Stockholm alignments written by `jackhmmer -A`. The second
//! line must be the `#=GF ID` record naming the query that was searched.

use super::msa::Msa;
use super::seq::AlignedSeq;
use crate::utils::Result;
use std::io::BufRead;

const STOCKHOLM_HEADER: &str = "# STOCKHOLM 1.0";
const ID_PREFIX: &str = "#=GF ID ";

/// Reads a Stockholm alignment, crops it to `query` and updates all rows.
pub fn read_stockholm<R: BufRead>(reader: R, query: &str, threads: usize) -> Result<Msa> {
    log::debug!("Reading stockholm file");

    let mut lines = reader.lines();
    let mut next_line = || -> Result<Option<String>> {
        lines
            .next()
            .transpose()
            .map_err(|e| format!("Error reading stockholm file: {}", e))
    };

    if next_line()?.as_deref() != Some(STOCKHOLM_HEADER) {
        return Err("Not a stockholm file, missing first line".to_string());
    }

    let query_id = match next_line()? {
        Some(line) if line.starts_with(ID_PREFIX) => strip_iteration(&line[ID_PREFIX.len()..]),
        _ => return Err("Not a valid stockholm file, missing #=GF ID line".to_string()),
    };

    let mut msa = Msa::new();
    msa.push(AlignedSeq::new(&query_id));
    let mut ix = 0;
    let mut width = 0;

    loop {
        let line = match next_line()? {
            Some(line) => line,
            None => return Err("Stockholm file is truncated or incomplete".to_string()),
        };

        if line.is_empty() {
            continue;
        }

        if line == "//" {
            break;
        }

        if let Some(declaration) = line.strip_prefix("#=GS ") {
            let id = match declaration.find("DE ") {
                Some(s) => &declaration[..s],
                None => declaration,
            }
            .trim();
            if msa.len() > 1 || msa.query().id() != id {
                msa.push(AlignedSeq::new(id));
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let (id, fragment) = line
            .split_once(' ')
            .ok_or_else(|| format!("Invalid stockholm file, no sequence on line '{}'", line))?;
        let fragment = fragment.trim_start_matches(' ');

        if id == msa.query().id() {
            ix = 0;
            width += fragment.len();
        } else {
            ix += 1;
            if ix >= msa.len() {
                msa.push(AlignedSeq::new(id));
            }
            if id != msa.row(ix).id() {
                return Err(format!(
                    "Invalid Stockholm file, ID does not match ({} != {})",
                    id,
                    msa.row(ix).id()
                ));
            }
        }

        msa.row_mut(ix).append(fragment);
    }

    if msa.len() < 2 {
        return Err("Insufficient sequences in Stockholm MSA".to_string());
    }

    if let Some(row) = msa.rows().iter().find(|s| s.size() != width) {
        return Err(format!(
            "Invalid Stockholm file, sequence {} has {} columns instead of {}",
            row.id(),
            row.size(),
            width
        ));
    }

    log::debug!(
        "Read {} sequences, alignment width = {}",
        msa.len(),
        width
    );

    msa.finalize(query, threads)?;
    Ok(msa)
}

/// Removes the `-i<iteration>` suffix jackhmmer adds to the query name.
fn strip_iteration(id: &str) -> String {
    if let Some((name, iteration)) = id.rsplit_once("-i") {
        if !name.is_empty() && !iteration.is_empty() && iteration.bytes().all(|b| b.is_ascii_digit())
        {
            return name.to_string();
        }
    }
    id.to_string()
}
