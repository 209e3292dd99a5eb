//! Lookup of the sequences jackhmmer searched, keyed by the record ids that
//! end up in the alignments.

use crate::utils::{open_reader, Result};
use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

pub trait Databank {
    /// Name used to locate the FASTA file, `<fasta-dir>/<name>.fa`.
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn document_nr(&self, id: &str) -> Option<usize>;
    /// `acc` or `title` of a document, empty when unknown.
    fn metadata(&self, document: usize, field: &str) -> &str;
    fn sequence(&self, document: usize) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    acc: String,
    title: String,
    sequence: String,
}

/// Databank held in memory, loaded from a FASTA file.
#[derive(Debug, Default)]
pub struct FastaDatabank {
    id: String,
    version: String,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl FastaDatabank {
    /// Loads `<fasta_dir>/<id>.fa` (or `.fa.gz`). The version defaults to the
    /// modification date of the file.
    pub fn open(
        fasta_dir: &Path,
        id: &str,
        version: Option<&str>,
        filter: Option<&HashSet<String>>,
    ) -> Result<FastaDatabank> {
        let mut path = fasta_dir.join(format!("{}.fa", id));
        if !path.exists() {
            let packed = fasta_dir.join(format!("{}.fa.gz", id));
            if packed.exists() {
                path = packed;
            }
        }

        let version = match version {
            Some(v) => v.to_string(),
            None => file_date(&path)?,
        };

        log::info!("Loading databank {} version {}", id, version);
        let databank = Self::from_reader(open_reader(&path)?, id, &version, filter)?;
        log::debug!("Loaded {} databank entries", databank.entries.len());
        Ok(databank)
    }

    /// Reads FASTA records. With a `filter`, only the listed ids are kept.
    pub fn from_reader<R: BufRead>(
        reader: R,
        id: &str,
        version: &str,
        filter: Option<&HashSet<String>>,
    ) -> Result<FastaDatabank> {
        let mut databank = FastaDatabank {
            id: id.to_string(),
            version: version.to_string(),
            ..Default::default()
        };

        let mut keep = false;
        for (line_number, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Error at databank line {}: {}", line_number + 1, e))?;

            if let Some(header) = line.strip_prefix('>') {
                let (doc_id, title) = header.split_once(' ').unwrap_or((header, ""));
                keep = filter.map_or(true, |ids| ids.contains(doc_id));
                if keep {
                    databank.index.insert(doc_id.to_string(), databank.entries.len());
                    databank.entries.push(Entry {
                        acc: accession(doc_id),
                        title: title.trim().to_string(),
                        sequence: String::new(),
                    });
                }
            } else if keep {
                if let Some(entry) = databank.entries.last_mut() {
                    entry.sequence.push_str(line.trim());
                }
            }
        }

        Ok(databank)
    }
}

impl Databank for FastaDatabank {
    fn name(&self) -> &str {
        &self.id
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn document_nr(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn metadata(&self, document: usize, field: &str) -> &str {
        match (self.entries.get(document), field) {
            (Some(entry), "acc") => &entry.acc,
            (Some(entry), "title") => &entry.title,
            _ => "",
        }
    }

    fn sequence(&self, document: usize) -> &str {
        self.entries
            .get(document)
            .map(|e| e.sequence.as_str())
            .unwrap_or_default()
    }
}

/// `sp|P12345|NAME` and `tr|...` carry the accession in the second field,
/// UniRef ids after the cluster prefix.
fn accession(id: &str) -> String {
    let fields: Vec<&str> = id.split('|').collect();
    match fields.as_slice() {
        [db, acc, ..] if *db == "sp" || *db == "tr" => acc.to_string(),
        _ => match id.split_once('_') {
            Some((prefix, acc)) if prefix.starts_with("UniRef") => acc.to_string(),
            _ => String::new(),
        },
    }
}

fn file_date(path: &Path) -> Result<String> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| format!("Could not open file '{}': {}", path.display(), e))?;
    Ok(DateTime::<Local>::from(modified).format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FASTA: &str = "\
>sp|P01542|CRAM_CRAAB Crambin OS=Crambe hispanica
TTCCPSIVARSNFNVCRLPGTPEA
ICATYTGCIIIPGATCPGDYAN
>UniRef100_Q9XYZ1 Uncharacterized protein n=1
MKVLAT
>plain_id
ACDE
";

    #[test]
    fn test_read_databank() {
        let db = FastaDatabank::from_reader(Cursor::new(FASTA), "uniprot", "2024-01", None).unwrap();
        assert_eq!(db.entries.len(), 3);
        assert_eq!((db.name(), db.version()), ("uniprot", "2024-01"));

        let doc = db.document_nr("sp|P01542|CRAM_CRAAB").unwrap();
        assert_eq!(db.metadata(doc, "acc"), "P01542");
        assert_eq!(db.metadata(doc, "title"), "Crambin OS=Crambe hispanica");
        assert_eq!(db.sequence(doc).len(), 46);

        let doc = db.document_nr("UniRef100_Q9XYZ1").unwrap();
        assert_eq!(db.metadata(doc, "acc"), "Q9XYZ1");
        assert_eq!(db.sequence(doc), "MKVLAT");

        let doc = db.document_nr("plain_id").unwrap();
        assert_eq!(db.metadata(doc, "acc"), "");
        assert_eq!(db.metadata(doc, "title"), "");
        assert_eq!(db.metadata(doc, "unknown"), "");
        assert!(db.document_nr("missing").is_none());
    }

    #[test]
    fn test_filtered_databank() {
        let filter: HashSet<String> = ["plain_id".to_string()].into_iter().collect();
        let db = FastaDatabank::from_reader(Cursor::new(FASTA), "uniprot", "1", Some(&filter)).unwrap();
        assert_eq!(db.entries.len(), 1);
        assert_eq!(db.sequence(db.document_nr("plain_id").unwrap()), "ACDE");
    }

    #[test]
    fn test_open_uses_file_date() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tiny.fa"), FASTA).unwrap();
        let db = FastaDatabank::open(dir.path(), "tiny", None, None).unwrap();
        assert_eq!(db.version(), Local::now().format("%Y-%m-%d").to_string());
        assert!(FastaDatabank::open(dir.path(), "absent", None, None).is_err());
    }
}
