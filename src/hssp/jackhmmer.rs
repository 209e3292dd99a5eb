//! Runs jackhmmer in a private scratch directory and collects its Stockholm
//! output.

use super::msa::Msa;
use super::stockholm::read_stockholm;
use crate::utils::{open_output, Result};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const INPUT_FILE: &str = "input.fa";
const OUTPUT_FILE: &str = "output.sto";
const LOG_FILE: &str = "jackhmmer.log";
const LINE_WIDTH: usize = 72;
const LOG_TAIL_LINES: usize = 10;

#[derive(Debug, Clone)]
pub struct JackhmmerParams {
    pub jackhmmer: PathBuf,
    pub fasta_dir: PathBuf,
    /// Databank name; the searched file is `<fasta_dir>/<databank>.fa`.
    pub databank: String,
    pub iterations: u32,
    pub threads: usize,
    pub max_runtime: Duration,
    pub poll_interval: Duration,
    /// Root for scratch directories, the system temp dir when unset.
    pub tmp_dir: Option<PathBuf>,
    pub keep_scratch: bool,
}

impl JackhmmerParams {
    pub fn new(jackhmmer: &Path, fasta_dir: &Path, databank: &str) -> Self {
        JackhmmerParams {
            jackhmmer: jackhmmer.to_path_buf(),
            fasta_dir: fasta_dir.to_path_buf(),
            databank: databank.to_string(),
            iterations: 5,
            threads: 1,
            max_runtime: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(1),
            tmp_dir: None,
            keep_scratch: false,
        }
    }
}

/// Searches `seq` and copies the resulting alignment to `dst`, gzip
/// compressed when `dst` ends in `.gz`.
pub fn run_to_file(seq: &str, params: &JackhmmerParams, dst: &Path) -> Result<()> {
    with_search(seq, params, |alignment| {
        let mut input = File::open(alignment)
            .map_err(|e| format!("Could not open file '{}': {}", OUTPUT_FILE, e))?;
        let mut output = open_output(dst)?;
        io::copy(&mut input, &mut output)
            .and_then(|_| output.flush())
            .map_err(|e| format!("Could not write '{}': {}", dst.display(), e))?;
        Ok(())
    })
}

/// Searches `seq` and reads the result cropped to `seq`.
pub fn run_to_msa(seq: &str, params: &JackhmmerParams) -> Result<Msa> {
    with_search(seq, params, |alignment| {
        let file = File::open(alignment)
            .map_err(|e| format!("Could not open file '{}': {}", OUTPUT_FILE, e))?;
        read_stockholm(BufReader::new(file), seq, params.threads)
    })
}

/// Runs jackhmmer in a fresh scratch directory and hands `output.sto` to
/// `consume`. The directory is removed afterwards, whatever the outcome,
/// unless `keep_scratch` is set.
fn with_search<T>(
    seq: &str,
    params: &JackhmmerParams,
    consume: impl FnOnce(&Path) -> Result<T>,
) -> Result<T> {
    if seq.is_empty() {
        return Err("Empty sequence, nothing to search for".to_string());
    }

    let scratch = create_scratch(params.tmp_dir.as_deref())?;
    let result = run_search(scratch.path(), seq, params)
        .and_then(|_| consume(&scratch.path().join(OUTPUT_FILE)));
    release_scratch(scratch, params.keep_scratch);
    result
}

/// Runs jackhmmer to completion in `dir`, leaving `output.sto` there.
fn run_search(dir: &Path, seq: &str, params: &JackhmmerParams) -> Result<()> {
    log::info!("Running jackhmmer in {}", dir.display());

    write_query(&dir.join(INPUT_FILE), seq)?;

    let log_path = dir.join(LOG_FILE);
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| format!("Could not create file '{}': {}", log_path.display(), e))?;
    let stderr = stdout
        .try_clone()
        .map_err(|e| format!("Could not create file '{}': {}", log_path.display(), e))?;

    let database = absolute(&params.fasta_dir)?.join(format!("{}.fa", params.databank));
    let mut command = Command::new(absolute_program(&params.jackhmmer)?);
    command
        .arg("-N")
        .arg(params.iterations.to_string())
        .arg("--noali")
        .arg("--cpu")
        .arg(params.threads.to_string())
        .arg("-A")
        .arg(OUTPUT_FILE)
        .arg(INPUT_FILE)
        .arg(&database)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    log::debug!("{:?}", command);

    let mut child = command
        .spawn()
        .map_err(|e| format!("Failed to start {}: {}", params.jackhmmer.display(), e))?;

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > params.max_runtime {
                    log::warn!("Killing jackhmmer (pid {})", child.id());
                    child.kill().ok();
                    child.wait().ok();
                    return Err(format!(
                        "Timeout waiting for jackhmmer result after {} seconds",
                        params.max_runtime.as_secs_f32()
                    ));
                }
                thread::sleep(params.poll_interval);
            }
            Err(e) => return Err(format!("Failed to check jackhmmer status: {}", e)),
        }
    };

    if !status.success() {
        let tail = log_tail(&log_path, LOG_TAIL_LINES);
        return Err(format!("jackhmmer exited with {}\n{}", status, tail.join("\n")));
    }

    if !dir.join(OUTPUT_FILE).exists() {
        return Err("Output Stockholm file is missing".to_string());
    }

    log::debug!("jackhmmer finished in {:.1}s", start.elapsed().as_secs_f32());
    Ok(())
}

fn create_scratch(root: Option<&Path>) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("mkhssp-");
    match root {
        Some(root) => {
            fs::create_dir_all(root)
                .map_err(|e| format!("Could not create directory '{}': {}", root.display(), e))?;
            builder.tempdir_in(root)
        }
        None => builder.tempdir(),
    }
    .map_err(|e| format!("Could not create scratch directory: {}", e))
}

fn release_scratch(scratch: TempDir, keep: bool) {
    if keep {
        let path = scratch.keep();
        log::info!("Kept jackhmmer scratch directory {}", path.display());
    }
}

fn write_query(path: &Path, seq: &str) -> Result<()> {
    let write = || -> io::Result<()> {
        let mut file = io::BufWriter::new(File::create(path)?);
        writeln!(file, ">input")?;
        for chunk in seq.as_bytes().chunks(LINE_WIDTH) {
            file.write_all(chunk)?;
            file.write_all(b"\n")?;
        }
        file.flush()
    };
    write().map_err(|e| format!("Failed to create jackhmmer input file: {}", e))
}

/// Last `n` lines of the jackhmmer log, empty when it cannot be read.
fn log_tail(path: &Path, n: usize) -> Vec<String> {
    let Ok(file) = File::open(path) else {
        return Vec::new();
    };
    let mut lines = VecDeque::with_capacity(n + 1);
    for line in BufReader::new(file).lines().map_while(|l| l.ok()) {
        lines.push_back(line);
        if lines.len() > n {
            lines.pop_front();
        }
    }
    lines.into()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| format!("Could not resolve path '{}': {}", path.display(), e))
}

/// Bare program names are left for the PATH lookup, anything with a
/// directory part is anchored before the working directory changes.
fn absolute_program(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        absolute(program)
    } else {
        Ok(program.to_path_buf())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn fake_jackhmmer(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-jackhmmer.sh");
        fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn params(program: &Path, root: &Path) -> JackhmmerParams {
        let mut params = JackhmmerParams::new(program, root, "uniprot");
        params.poll_interval = Duration::from_millis(20);
        params.max_runtime = Duration::from_secs(20);
        params.tmp_dir = Some(root.join("scratch"));
        params
    }

    const STOCKHOLM: &str = "\
# STOCKHOLM 1.0
#=GF ID input-i1
#=GS hit/2-5 DE a homolog
input ACDE
hit/2-5 ACDE
//
";

    #[test]
    fn test_run_to_msa_removes_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_jackhmmer(
            dir.path(),
            &format!(
                "echo \"$@\" > ../args.txt\ncat > output.sto <<'EOF'\n{}EOF\n",
                STOCKHOLM
            ),
        );
        let params = params(&script, dir.path());

        let msa = run_to_msa("ACDE", &params).unwrap();
        assert_eq!(msa.len(), 2);
        assert_eq!(msa.row(1).identical(), 4);

        let args = fs::read_to_string(dir.path().join("scratch/args.txt")).unwrap();
        assert!(args.starts_with("-N 5 --noali --cpu 1 -A output.sto input.fa /"));
        assert!(args.trim_end().ends_with("uniprot.fa"));

        let left: Vec<_> = fs::read_dir(dir.path().join("scratch"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect();
        assert!(left.is_empty());
    }

    #[test]
    fn test_run_to_file_compresses() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_jackhmmer(
            dir.path(),
            &format!("cat > output.sto <<'EOF'\n{}EOF\n", STOCKHOLM),
        );
        let mut params = params(&script, dir.path());
        params.keep_scratch = true;

        let dst = dir.path().join("result.sto.gz");
        run_to_file("ACDE", &params, &dst).unwrap();

        let mut text = String::new();
        crate::utils::open_reader(&dst)
            .unwrap()
            .read_line(&mut text)
            .unwrap();
        assert_eq!(text, "# STOCKHOLM 1.0\n");

        let kept = fs::read_dir(dir.path().join("scratch")).unwrap().count();
        assert_eq!(kept, 1);
    }

    #[test]
    fn test_query_written_in_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INPUT_FILE);
        let seq = "A".repeat(100);
        write_query(&path, &seq).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!(">input\n{}\n{}\n", "A".repeat(72), "A".repeat(28)));
    }

    #[test]
    fn test_empty_sequence_err() {
        let dir = tempfile::tempdir().unwrap();
        let params = params(Path::new("/bin/true"), dir.path());
        assert!(run_to_msa("", &params).unwrap_err().starts_with("Empty sequence"));
    }

    #[test]
    fn test_missing_program_err() {
        let dir = tempfile::tempdir().unwrap();
        let params = params(&dir.path().join("no-such-jackhmmer"), dir.path());
        assert!(run_to_msa("ACDE", &params)
            .unwrap_err()
            .starts_with("Failed to start"));
    }

    #[test]
    fn test_failure_reports_log_tail() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_jackhmmer(
            dir.path(),
            "for i in 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15; do echo \"log line $i.\"; done\nexit 3\n",
        );
        let params = params(&script, dir.path());

        let err = run_to_msa("ACDE", &params).unwrap_err();
        assert!(err.starts_with("jackhmmer exited with"));
        assert!(err.contains("exit status: 3"));
        assert!(err.contains("log line 15."));
        assert!(err.contains("log line 6."));
        assert!(!err.contains("log line 5."));
    }

    fn scratch_dirs(root: &Path) -> Vec<PathBuf> {
        fs::read_dir(root.join("scratch"))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_failed_search_keeps_scratch_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_jackhmmer(dir.path(), "echo boom\nexit 3\n");
        let mut params = params(&script, dir.path());

        let err = run_to_msa("ACDE", &params).unwrap_err();
        assert_eq!(err, "jackhmmer exited with exit status: 3\nboom");
        assert!(scratch_dirs(dir.path()).is_empty());

        params.keep_scratch = true;
        assert!(run_to_msa("ACDE", &params).is_err());
        let kept = scratch_dirs(dir.path());
        assert_eq!(kept.len(), 1);
        let log = fs::read_to_string(kept[0].join(LOG_FILE)).unwrap();
        assert_eq!(log, "boom\n");
    }

    #[test]
    fn test_unreadable_result_keeps_scratch_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_jackhmmer(dir.path(), "echo 'not stockholm' > output.sto\n");
        let mut params = params(&script, dir.path());
        params.keep_scratch = true;

        let err = run_to_msa("ACDE", &params).unwrap_err();
        assert!(err.starts_with("Not a stockholm file"));
        let kept = scratch_dirs(dir.path());
        assert_eq!(kept.len(), 1);
        assert!(kept[0].join(OUTPUT_FILE).exists());
    }

    #[test]
    fn test_missing_output_err() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_jackhmmer(dir.path(), "exit 0\n");
        let params = params(&script, dir.path());
        assert_eq!(
            run_to_msa("ACDE", &params).unwrap_err(),
            "Output Stockholm file is missing"
        );
    }

    #[test]
    fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = fake_jackhmmer(
            dir.path(),
            &format!("echo $$ > {}\nexec sleep 30\n", pid_file.display()),
        );
        let mut params = params(&script, dir.path());
        params.max_runtime = Duration::from_millis(500);

        let start = Instant::now();
        let err = run_to_msa("ACDE", &params).unwrap_err();
        assert!(err.starts_with("Timeout"));
        assert!(start.elapsed() < Duration::from_secs(10));

        #[cfg(target_os = "linux")]
        {
            let pid = fs::read_to_string(&pid_file).unwrap();
            assert!(!Path::new("/proc").join(pid.trim()).exists());
        }
    }
}
