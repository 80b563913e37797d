//! CLI mode for hoist - command-line uploads and remote file management.

mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::task::ByteSource as _;
use crate::{
    Engine, EngineConfig, FileByteSource, HttpTransport, Prompt, ProgressSink, RemoteOps,
    ServerConfig,
};
use progress::{CliSink, print_file_list, print_summary};

/// Builds a configured HTTP client for file-server requests.
fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// A remote file-management operation requested via flags.
enum ManageOp {
    Delete(String),
    Mkdir(String),
    Touch(String),
    Move(String, String),
}

struct CliArgs {
    server: String,
    paths: Vec<String>,
    concurrent: usize,
    verify: bool,
    assume_yes: bool,
    op: Option<ManageOp>,
}

fn parse_args(argv: &[String]) -> Result<CliArgs, String> {
    let mut concurrent = 1usize;
    let mut verify = true;
    let mut assume_yes = false;
    let mut op = None;
    let mut positionals = Vec::new();

    let take_value = |i: &mut usize, flag: &str| -> Result<String, String> {
        *i += 1;
        argv.get(*i)
            .cloned()
            .ok_or_else(|| format!("{flag} requires a value"))
    };

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-j" | "--concurrent" => {
                let value = take_value(&mut i, "--concurrent")?;
                concurrent = value
                    .parse()
                    .map_err(|_| format!("invalid value for --concurrent: {value}"))?;
            }
            "--no-verify" => verify = false,
            "-y" | "--yes" => assume_yes = true,
            "--delete" => op = Some(ManageOp::Delete(take_value(&mut i, "--delete")?)),
            "--mkdir" => op = Some(ManageOp::Mkdir(take_value(&mut i, "--mkdir")?)),
            "--touch" => op = Some(ManageOp::Touch(take_value(&mut i, "--touch")?)),
            "--move" => {
                let from = take_value(&mut i, "--move")?;
                let to = take_value(&mut i, "--move")?;
                op = Some(ManageOp::Move(from, to));
            }
            flag if flag.starts_with('-') => return Err(format!("unknown option {flag}")),
            _ => positionals.push(argv[i].clone()),
        }
        i += 1;
    }

    let mut positionals = positionals.into_iter();
    let server = positionals.next().ok_or("missing server URL")?;
    Ok(CliArgs {
        server,
        paths: positionals.collect(),
        concurrent,
        verify,
        assume_yes,
        op,
    })
}

/// Prompt backed by the terminal.
struct TermPrompt;

impl Prompt for TermPrompt {
    fn prompt(&self, message: &str, initial: &str) -> Option<String> {
        let term = console::Term::stderr();
        if term.write_str(&format!("{message} [{initial}]: ")).is_err() {
            return None;
        }
        match term.read_line() {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    Some(initial.to_string())
                } else {
                    Some(line.to_string())
                }
            }
            Err(_) => None,
        }
    }

    fn confirm(&self, message: &str) -> bool {
        let term = console::Term::stderr();
        if term.write_str(&format!("{message} [y/N] ")).is_err() {
            return false;
        }
        term.read_line()
            .map(|line| line.trim().eq_ignore_ascii_case("y"))
            .unwrap_or(false)
    }
}

/// Prompt for `--yes` runs: accepts everything.
struct AssumeYes;

impl Prompt for AssumeYes {
    fn prompt(&self, _message: &str, initial: &str) -> Option<String> {
        Some(initial.to_string())
    }

    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Collects upload entries from the argument paths.
///
/// A file argument uploads under its file name; a directory argument is
/// walked recursively, contributing its name as a virtual directory segment.
/// Zero-length files found during traversal are skipped.
fn collect_files(paths: &[String]) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for raw in paths {
        let path = Path::new(raw);
        let meta = std::fs::metadata(path)?;
        if meta.is_dir() {
            let prefix = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            walk_dir(path, &prefix, &mut out)?;
        } else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.clone());
            out.push((name, path.to_path_buf()));
        }
    }
    Ok(out)
}

fn walk_dir(dir: &Path, prefix: &str, out: &mut Vec<(String, PathBuf)>) -> std::io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        if entry.file_type()?.is_dir() {
            walk_dir(&entry.path(), &rel, out)?;
        } else if entry.metadata()?.len() > 0 {
            out.push((rel, entry.path()));
        }
    }
    Ok(())
}

/// Runs the CLI: remote management flags perform one operation and exit,
/// otherwise every path argument becomes an upload task.
///
/// # Errors
///
/// Returns an error when the server URL is invalid, a local file cannot be
/// read, or a remote management operation fails.
pub async fn run() -> crate::Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            std::process::exit(1);
        }
    };

    let http = build_http_client()?;
    let server = ServerConfig::new(&args.server)?;
    let prompt: Box<dyn Prompt> = if args.assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TermPrompt)
    };

    if let Some(op) = args.op {
        let ops = RemoteOps::new(http, server);
        match op {
            ManageOp::Delete(path) => {
                ops.delete_path(&path).await?;
                println!("Deleted `{path}`");
            }
            ManageOp::Mkdir(path) => {
                ops.create_dir(&path).await?;
                println!("Created `{path}`");
            }
            ManageOp::Touch(path) => {
                ops.create_file(&path).await?;
                println!("Created `{path}`");
            }
            ManageOp::Move(from, to) => {
                if ops.move_path(&from, &to, &*prompt).await? {
                    println!("Moved `{from}` to `{to}`");
                } else {
                    println!("Move cancelled");
                }
            }
        }
        return Ok(());
    }

    if args.paths.is_empty() {
        eprintln!("Error: nothing to upload");
        std::process::exit(1);
    }

    let files = collect_files(&args.paths)?;
    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    let mut total_size = 0u64;
    let mut items = Vec::new();
    for (rel, local) in files {
        let source = FileByteSource::open(&local).await?;
        total_size += source.len();
        items.push((rel, source));
    }
    let listing: Vec<(&str, u64)> = items
        .iter()
        .map(|(rel, source)| (rel.as_str(), source.len()))
        .collect();
    print_file_list(&listing, total_size);

    let sink = Arc::new(CliSink::new());
    let config = EngineConfig::default()
        .with_max_concurrent(args.concurrent)
        .with_verify_session(args.verify);
    let engine = Engine::new(
        HttpTransport::new(http, server),
        config,
        Arc::clone(&sink) as Arc<dyn ProgressSink>,
    );

    let started = Instant::now();
    for (rel, source) in items {
        let task = engine.new_task(rel, Arc::new(source));
        engine.enqueue(task);
    }
    engine.wait_idle().await;

    let failed = engine.failed_tasks();
    if !failed.is_empty()
        && prompt.confirm(&format!(
            "Retry {} failed upload(s), resuming from the server offset?",
            failed.len()
        ))
    {
        for (id, path) in &failed {
            if let Err(e) = engine.retry(*id).await {
                eprintln!("  cannot retry `{path}`: {e}");
            }
        }
        engine.wait_idle().await;
    }

    let remaining: Vec<(String, Option<String>)> = engine
        .failed_tasks()
        .into_iter()
        .map(|(id, path)| (path, sink.reason_for(id)))
        .collect();
    print_summary(sink.completed(), &remaining, total_size, started.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parse_minimal_upload() {
        let args = parse_args(&argv(&["http://host/", "a.txt", "b.txt"])).unwrap();
        assert_eq!(args.server, "http://host/");
        assert_eq!(args.paths, vec!["a.txt", "b.txt"]);
        assert_eq!(args.concurrent, 1);
        assert!(args.verify);
        assert!(args.op.is_none());
    }

    #[test]
    fn parse_flags() {
        let args = parse_args(&argv(&[
            "-j",
            "4",
            "--no-verify",
            "-y",
            "http://host/",
            "dir",
        ]))
        .unwrap();
        assert_eq!(args.concurrent, 4);
        assert!(!args.verify);
        assert!(args.assume_yes);
    }

    #[test]
    fn parse_move_takes_two_values() {
        let args = parse_args(&argv(&["--move", "a.txt", "b/a.txt", "http://host/"])).unwrap();
        match args.op {
            Some(ManageOp::Move(from, to)) => {
                assert_eq!(from, "a.txt");
                assert_eq!(to, "b/a.txt");
            }
            _ => panic!("expected move op"),
        }
    }

    #[test]
    fn parse_rejects_missing_server() {
        assert!(parse_args(&argv(&["--no-verify"])).is_err());
    }

    #[test]
    fn parse_rejects_unknown_flags() {
        assert!(parse_args(&argv(&["--frobnicate", "http://host/"])).is_err());
    }

    #[test]
    fn parse_rejects_bad_concurrency() {
        assert!(parse_args(&argv(&["-j", "many", "http://host/"])).is_err());
    }

    #[test]
    fn collect_walks_directories_and_skips_empty_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path().join("pics");
        std::fs::create_dir_all(root.join("trip")).unwrap();
        std::fs::write(root.join("a.jpg"), b"jpeg").unwrap();
        std::fs::write(root.join("trip/b.jpg"), b"jpeg").unwrap();
        std::fs::write(root.join("trip/empty.tmp"), b"").unwrap();

        let files = collect_files(&[root.to_string_lossy().into_owned()]).unwrap();
        let rels: Vec<&str> = files.iter().map(|(rel, _)| rel.as_str()).collect();
        assert_eq!(rels, vec!["pics/a.jpg", "pics/trip/b.jpg"]);
    }

    #[test]
    fn collect_single_file_uses_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"pdf").unwrap();

        let files = collect_files(&[path.to_string_lossy().into_owned()]).unwrap();
        assert_eq!(files[0].0, "report.pdf");
    }

    #[test]
    fn assume_yes_accepts_everything() {
        assert!(AssumeYes.confirm("sure?"));
        assert_eq!(AssumeYes.prompt("path?", "x").as_deref(), Some("x"));
    }
}
