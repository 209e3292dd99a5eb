use crate::utils::Result;
use chrono::Datelike;
use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="mkhssp",
          author="Maarten L. Hekkelman <m.hekkelman@cmbi.ru.nl>",
          version=&**FULL_VERSION,
          about="Homology derived secondary structure of proteins (HSSP) from jackhmmer alignments",
          long_about = None,
          disable_help_subcommand = true,
          after_help = format!("Copyright (C) 2008-{}     CMBI, Radboud University Nijmegen", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{author}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Create HSSP files from DSSP files or a sequence")]
    Create(CreateArgs),
    #[clap(about = "Run jackhmmer for a sequence and store the Stockholm alignment")]
    Align(AlignArgs),
    #[clap(about = "Convert a jackhmmer Stockholm alignment to FASTA")]
    Convert(ConvertArgs),
}

/// Options shared by the commands that run jackhmmer.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[clap(required = true)]
    #[clap(short = 'f')]
    #[clap(long = "fasta-dir")]
    #[clap(help = "Directory holding the databank FASTA files")]
    #[clap(value_name = "DIR")]
    #[arg(value_parser = check_file_exists)]
    pub fasta_dir: PathBuf,

    #[clap(short = 'd')]
    #[clap(long = "databank")]
    #[clap(help = "Databank to search, <fasta-dir>/<databank>.fa")]
    #[clap(value_name = "NAME")]
    #[clap(default_value = "uniprot")]
    pub databank: String,

    #[clap(long = "jackhmmer")]
    #[clap(help = "Path to the jackhmmer executable")]
    #[clap(value_name = "JACKHMMER")]
    #[clap(default_value = "jackhmmer")]
    pub jackhmmer: PathBuf,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "iterations")]
    #[clap(value_name = "N")]
    #[clap(help = "Number of jackhmmer iterations")]
    #[clap(default_value = "5")]
    pub iterations: u32,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-runtime")]
    #[clap(value_name = "SECONDS")]
    #[clap(help = "Maximum run time of a jackhmmer search")]
    #[clap(default_value = "3600")]
    pub max_runtime: u64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "tmp-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help = "Directory for jackhmmer scratch directories")]
    pub tmp_dir: Option<PathBuf>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "keep-scratch")]
    #[clap(help = "Keep the jackhmmer scratch directories")]
    pub keep_scratch: bool,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("query").required(true).args(["inputs", "sequence"])))]
#[command(arg_required_else_help(true))]
pub struct CreateArgs {
    #[clap(help = "DSSP files (optionally gzipped) to create HSSP files for")]
    #[clap(value_name = "DSSP")]
    #[arg(value_parser = check_file_exists)]
    pub inputs: Vec<PathBuf>,

    #[clap(short = 's')]
    #[clap(long = "sequence")]
    #[clap(help = "Create an HSSP file for a bare protein sequence")]
    #[clap(value_name = "SEQUENCE")]
    #[arg(value_parser = check_sequence)]
    pub sequence: Option<String>,

    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output file, or directory for several inputs [default: stdout]")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub search: SearchArgs,

    #[clap(long = "data-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help = "Directory caching the alignments per chain")]
    #[arg(value_parser = check_file_exists)]
    pub data_dir: Option<PathBuf>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "databank-version")]
    #[clap(value_name = "VERSION")]
    #[clap(help = "Databank version to report [default: date of the databank file]")]
    pub databank_version: Option<String>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "max-hits")]
    #[clap(value_name = "N")]
    #[clap(help = "Maximum number of hits to report")]
    #[clap(default_value = "5000")]
    pub max_hits: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-length")]
    #[clap(value_name = "N")]
    #[clap(help = "Minimal chain length")]
    #[clap(default_value = "25")]
    pub min_length: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "threshold")]
    #[clap(value_name = "FRAC")]
    #[clap(help = "Identity threshold on top of the HSSP curve")]
    #[clap(default_value = "0.05")]
    #[arg(value_parser = ensure_unit_float)]
    pub threshold: f32,
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct AlignArgs {
    #[clap(required = true)]
    #[clap(short = 's')]
    #[clap(long = "sequence")]
    #[clap(help = "Protein sequence to search for")]
    #[clap(value_name = "SEQUENCE")]
    #[arg(value_parser = check_sequence)]
    pub sequence: String,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Stockholm output file, gzipped when it ends in .gz")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: PathBuf,

    #[command(flatten)]
    pub search: SearchArgs,
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct ConvertArgs {
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "stockholm")]
    #[clap(help = "Stockholm alignment written by jackhmmer, optionally gzipped")]
    #[clap(value_name = "STOCKHOLM")]
    #[arg(value_parser = check_file_exists)]
    pub stockholm: PathBuf,

    #[clap(required = true)]
    #[clap(short = 's')]
    #[clap(long = "sequence")]
    #[clap(help = "Query sequence the alignment is cut to")]
    #[clap(value_name = "SEQUENCE")]
    #[arg(value_parser = check_sequence)]
    pub sequence: String,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "FASTA output file, gzipped when it ends in .gz")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output: PathBuf,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(path.to_path_buf())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_sequence(s: &str) -> Result<String> {
    let seq = s.trim().to_ascii_uppercase();
    if seq.is_empty() {
        return Err("Sequence cannot be an empty string".to_string());
    }
    match seq.chars().find(|c| !c.is_ascii_alphabetic()) {
        Some(c) => Err(format!("Invalid character '{}' in sequence", c)),
        None => Ok(seq),
    }
}

fn ensure_unit_float(s: &str) -> Result<f32> {
    let value = s
        .parse::<f32>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let fasta_dir = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["mkhssp", "create", "-s", "mktayiakqr", "-f", fasta_dir]).unwrap();
        let Command::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.sequence.as_deref(), Some("MKTAYIAKQR"));
        assert_eq!(args.search.databank, "uniprot");
        assert_eq!(args.search.iterations, 5);
        assert_eq!(args.search.max_runtime, 3600);
        assert_eq!(args.max_hits, 5000);
        assert_eq!(args.min_length, 25);
        assert_eq!(args.threshold, 0.05);
        assert!(args.inputs.is_empty());
    }

    #[test]
    fn test_create_requires_query() {
        let dir = tempfile::tempdir().unwrap();
        let fasta_dir = dir.path().to_str().unwrap();
        assert!(Cli::try_parse_from(["mkhssp", "create", "-f", fasta_dir]).is_err());
    }

    #[test]
    fn test_value_parsers() {
        assert_eq!(threads_in_range("4"), Ok(4));
        assert!(threads_in_range("0").is_err());
        assert!(ensure_unit_float("1.5").is_err());
        assert_eq!(check_sequence(" acde "), Ok("ACDE".to_string()));
        assert!(check_sequence("AC-DE").is_err());
        assert!(check_sequence("  ").is_err());
        assert!(check_file_exists("/definitely/not/here").is_err());
    }
}
