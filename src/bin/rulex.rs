//! Stream filter: lowercases input text and stresses every pure-letter run
//! it can resolve through the lexicon, leaving everything else (markers,
//! punctuation, oversized runs) untouched.
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lexring::{alphabet, LexiconEngine, Mode, SearchFlags};

/// Lexical stream filter: markup text with stress according to a lexicon database.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the lexicon database
    db_path: PathBuf,
    /// Optional file to append unresolved words to
    logfile: Option<PathBuf>,
}

/// Splits `line` into symbol runs (letters and markers) and everything
/// else, resolving each pure-letter run through `engine` and appending
/// either the resolved or the original text to `out`. Logs every run that
/// misses resolution to `log`, if given.
fn process_line(
    engine: &mut LexiconEngine,
    max_key_size: usize,
    line: &str,
    log: Option<&mut std::fs::File>,
) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    let mut log = log;
    while i < bytes.len() {
        let is_symbol = |b: u8| alphabet::idx(b).is_some() || alphabet::is_marker(b);
        if !is_symbol(bytes[i]) {
            let start = i;
            while i < bytes.len() && !is_symbol(bytes[i]) {
                i += 1;
            }
            out.push_str(&line[start..i]);
            continue;
        }
        let start = i;
        while i < bytes.len() && is_symbol(bytes[i]) {
            i += 1;
        }
        let run = &line[start..i];
        let pure_letters = run.len() <= max_key_size && run.bytes().all(|b| alphabet::idx(b).is_some());
        if pure_letters {
            match engine.search(run, SearchFlags::ALL) {
                Ok(result) => {
                    if !result.hit {
                        if let Some(log) = log.as_deref_mut() {
                            let _ = writeln!(log, "{run}");
                        }
                    }
                    out.push_str(&result.value);
                }
                Err(e) => {
                    log::warn!("search failed for {run:?}: {e}");
                    out.push_str(run);
                }
            }
        } else {
            out.push_str(run);
        }
    }
    out
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let mut engine =
        LexiconEngine::open(&cli.db_path, Mode::Search).map_err(|e| format!("{}: {e}", cli.db_path.display()))?;
    let max_key_size = engine.config().max_key_size;
    let max_line_size = engine.config().max_line_size;

    let mut log = match &cli.logfile {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("{}: {e}", path.display()))?,
        ),
        None => None,
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| e.to_string())?;
        if line.len() > max_line_size {
            log::warn!("line of {} bytes exceeds max_line_size, passing through unfiltered", line.len());
            writeln!(out, "{line}").map_err(|e| e.to_string())?;
            continue;
        }
        let lowered = line.to_ascii_lowercase();
        let stressed = process_line(&mut engine, max_key_size, &lowered, log.as_mut());
        writeln!(out, "{stressed}").map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
