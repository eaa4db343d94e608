//! Lexical database holding utility: constructs, manages, tests, and
//! queries a lexicon database from the command line.
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use lexring::{
    Dict, LexError, LexiconEngine, Mode, PutTarget, RuleTarget, SearchFlags, SeqDirection,
};

/// Command-line misuse: ambiguous options, or a required dataset was not given explicitly.
const EXIT_MISUSE: u8 = 2;

/// Lexical database holding utility.
///
/// When filling and updating the database, new records are read from
/// standard input. When extracting data or testing, results are printed to
/// standard output. The `-f` option redirects either stream to a file.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// List database content
    #[arg(short = 'l', group = "action")]
    list: bool,
    /// Test the database against a "key value" dictionary file
    #[arg(short = 't', value_name = "FILE", group = "action")]
    test: Option<String>,
    /// Clean the database (drop redundant records)
    #[arg(short = 'c', group = "action")]
    clean: bool,
    /// Search for a specified key
    #[arg(short = 's', value_name = "KEY", group = "action")]
    search: Option<String>,
    /// Retrieve basic forms (if any) for a specified word
    #[arg(short = 'b', value_name = "KEY", group = "action")]
    bases: Option<String>,
    /// Delete the record for a specified key
    #[arg(short = 'd', value_name = "KEY", group = "action")]
    delete: Option<String>,
    /// Discard an entire dataset
    #[arg(short = 'D', group = "action")]
    discard: bool,

    /// Implicit-base dictionary
    #[arg(short = 'M', group = "dataset")]
    implicit_base: bool,
    /// Exception dictionary
    #[arg(short = 'X', group = "dataset")]
    exception: bool,
    /// General (stress-guessing) rules
    #[arg(short = 'G', group = "dataset")]
    general: bool,
    /// Lexical classification rules
    #[arg(short = 'L', group = "dataset")]
    lexclass: bool,
    /// Prefix rules
    #[arg(short = 'P', group = "dataset")]
    prefix: bool,
    /// Correction rules
    #[arg(short = 'C', group = "dataset")]
    corrector: bool,

    /// Search in the exception dictionary
    #[arg(short = 'x')]
    flag_exceptions: bool,
    /// Try to treat the word as an implicit form
    #[arg(short = 'm')]
    flag_forms: bool,
    /// Try to apply general rules
    #[arg(short = 'g')]
    flag_rules: bool,

    /// Use the given file instead of standard input or output
    #[arg(short = 'f', value_name = "FILE")]
    file: Option<String>,
    /// Replace mode: overwrite existing records instead of skipping them
    #[arg(short = 'r')]
    replace: bool,
    /// Be quieter: suppress search results and duplicate-record warnings
    #[arg(short = 'q', conflicts_with = "verbose")]
    quiet: bool,
    /// Be more verbose: print final statistics
    #[arg(short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Path to the lexicon database
    db_path: PathBuf,
}

/// A resolved dataset selector: either of the two dictionaries, or one of
/// the four rule programs.
#[derive(Clone, Copy)]
enum Dataset {
    Dict(Dict),
    Rule(RuleTarget),
}

impl Dataset {
    fn name(self) -> &'static str {
        match self {
            Dataset::Dict(Dict::ImplicitBase) => "implicit-base",
            Dataset::Dict(Dict::Exception) => "exception",
            Dataset::Rule(RuleTarget::General) => "general",
            Dataset::Rule(RuleTarget::LexicalClass) => "lexical-class",
            Dataset::Rule(RuleTarget::Prefix) => "prefix",
            Dataset::Rule(RuleTarget::Corrector) => "corrector",
        }
    }

    fn is_rules(self) -> bool {
        matches!(self, Dataset::Rule(_))
    }
}

impl Cli {
    fn dataset(&self) -> Option<Dataset> {
        if self.implicit_base {
            Some(Dataset::Dict(Dict::ImplicitBase))
        } else if self.exception {
            Some(Dataset::Dict(Dict::Exception))
        } else if self.general {
            Some(Dataset::Rule(RuleTarget::General))
        } else if self.lexclass {
            Some(Dataset::Rule(RuleTarget::LexicalClass))
        } else if self.prefix {
            Some(Dataset::Rule(RuleTarget::Prefix))
        } else if self.corrector {
            Some(Dataset::Rule(RuleTarget::Corrector))
        } else {
            None
        }
    }

    fn search_flags(&self) -> SearchFlags {
        if !self.flag_exceptions && !self.flag_forms && !self.flag_rules {
            SearchFlags::ALL
        } else {
            let mut bits = 0;
            if self.flag_exceptions {
                bits |= SearchFlags::EXCEPTIONS;
            }
            if self.flag_forms {
                bits |= SearchFlags::FORMS;
            }
            if self.flag_rules {
                bits |= SearchFlags::RULES;
            }
            SearchFlags::from_bits(bits)
        }
    }
}

fn record_tail(n: u64) -> &'static str {
    if n == 1 {
        " record has"
    } else {
        " records have"
    }
}

fn lowercase(s: &str) -> String {
    s.to_ascii_lowercase()
}

/// Action implementations. Each returns the process exit code.
fn list(engine: &mut LexiconEngine, dataset: Dataset, quiet: bool, verbose: bool) -> u8 {
    let mut n = 0u64;
    if verbose {
        eprintln!("Listing {} dataset", dataset.name());
    }
    match dataset {
        Dataset::Rule(target) => {
            let mut pos = 1u32;
            loop {
                match engine.rule_fetch(target, pos) {
                    Ok(Some(text)) => {
                        println!("{text}");
                        n += 1;
                        pos += 1;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("Database corruption: {e}");
                        break;
                    }
                }
            }
        }
        Dataset::Dict(dict) => {
            let target = match dict {
                Dict::ImplicitBase => lexring::SeqTarget::ImplicitBase,
                Dict::Exception => lexring::SeqTarget::ExceptionRaw,
            };
            let mut direction = SeqDirection::First;
            loop {
                match engine.seq(target, direction) {
                    Ok((key, value)) => {
                        println!("{key} {value}");
                        n += 1;
                        direction = SeqDirection::Next;
                    }
                    Err(LexError::NotFound) => break,
                    Err(e) => {
                        eprintln!("Database corruption: {e}");
                        break;
                    }
                }
            }
        }
    }
    if !quiet {
        eprintln!("{n}{} been extracted from the database", record_tail(n));
    }
    0
}

fn discover_bases(engine: &mut LexiconEngine, key: &str, quiet: bool) -> u8 {
    let key = lowercase(key);
    match engine.discover_bases(&key) {
        Ok(candidates) => {
            if candidates.is_empty() {
                1
            } else {
                if !quiet {
                    for (rule_no, base) in &candidates {
                        println!("{rule_no}\t{base}");
                    }
                }
                0
            }
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn search(
    engine: &mut LexiconEngine,
    cli: &Cli,
    dataset: Option<Dataset>,
    key: &str,
    quiet: bool,
) -> u8 {
    if let Some(Dataset::Rule(target)) = dataset {
        match key.parse::<u32>() {
            Ok(pos) if pos > 0 => match engine.rule_fetch(target, pos) {
                Ok(Some(text)) => {
                    if !quiet {
                        println!("{text}");
                    }
                    0
                }
                Ok(None) => 1,
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            },
            _ => {
                eprintln!("Invalid key: {key}");
                1
            }
        }
    } else {
        let word = lowercase(key);
        match engine.search(&word, cli.search_flags()) {
            Ok(result) => {
                if !quiet {
                    println!("{}", result.value);
                }
                0
            }
            Err(LexError::InvalidKey(_)) => {
                eprintln!("Invalid key: {word}");
                1
            }
            Err(e) => {
                eprintln!("DB search error: {e}");
                1
            }
        }
    }
}

fn delete(engine: &mut LexiconEngine, dataset: Dataset, key: &str, quiet: bool) -> u8 {
    match dataset {
        Dataset::Rule(target) => match key.parse::<u32>() {
            Ok(pos) if pos > 0 => match engine.rule_remove(target, pos) {
                Ok(true) => 0,
                Ok(false) => {
                    eprintln!("Invalid key: {key}");
                    1
                }
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            },
            _ => {
                eprintln!("Invalid key: {key}");
                1
            }
        },
        Dataset::Dict(dict) => {
            let key = lowercase(key);
            match engine.del(&key, dict) {
                Ok(()) => 0,
                Err(LexError::NotFound) => {
                    if !quiet {
                        eprintln!("No such record: {key}");
                    }
                    1
                }
                Err(LexError::InvalidKey(_)) => {
                    eprintln!("Invalid key: {key}");
                    1
                }
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            }
        }
    }
}

fn discard(engine: &mut LexiconEngine, dataset: Dataset, quiet: bool, verbose: bool) -> u8 {
    if verbose {
        eprintln!("Discarding {} dataset", dataset.name());
    }
    let n = match dataset {
        Dataset::Rule(target) => engine.discard_ruleset(target).map(u64::from),
        Dataset::Dict(dict) => engine.discard_dictionary(dict),
    };
    match n {
        Ok(n) => {
            if !quiet {
                eprintln!("{n}{} been removed from the database", record_tail(n));
            }
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn clean(engine: &mut LexiconEngine, dataset: Option<Dataset>, quiet: bool, verbose: bool) -> u8 {
    if verbose {
        eprintln!("Cleaning the database");
    }
    let mut n = 0u64;
    let do_bases = matches!(dataset, None | Some(Dataset::Dict(Dict::ImplicitBase)));
    let do_exceptions = matches!(dataset, None | Some(Dataset::Dict(Dict::Exception)));

    if do_bases {
        let mut stale = Vec::new();
        let mut direction = SeqDirection::First;
        loop {
            match engine.seq(lexring::SeqTarget::ImplicitBase, direction) {
                Ok((key, _)) => {
                    direction = SeqDirection::Next;
                    match engine.classify(&key) {
                        Ok(lexring::Classification::NotBase) => stale.push(key),
                        Ok(lexring::Classification::IsBase) => {}
                        Err(e) => eprintln!("{e}"),
                    }
                }
                Err(LexError::NotFound) => break,
                Err(e) => {
                    eprintln!("{e}");
                    break;
                }
            }
        }
        for key in stale {
            if engine.del(&key, Dict::ImplicitBase).is_ok() {
                n += 1;
            }
        }
    }

    if do_exceptions {
        let mut stale = Vec::new();
        let mut direction = SeqDirection::First;
        loop {
            match engine.seq(lexring::SeqTarget::ExceptionRaw, direction) {
                Ok((key, value)) => {
                    direction = SeqDirection::Next;
                    let flags = SearchFlags::from_bits(SearchFlags::FORMS | SearchFlags::RULES);
                    match engine.search(&key, flags) {
                        Ok(result) if result.value == value => stale.push(key),
                        Ok(_) => {}
                        Err(e) => eprintln!("{e}"),
                    }
                }
                Err(LexError::NotFound) => break,
                Err(e) => {
                    eprintln!("{e}");
                    break;
                }
            }
        }
        for key in stale {
            if engine.del(&key, Dict::Exception).is_ok() {
                n += 1;
            }
        }
    }

    if !quiet {
        eprintln!("{n} redundant{} been removed from the database", record_tail(n));
    }
    0
}

fn test(engine: &mut LexiconEngine, cli: &Cli, file: &str, quiet: bool, verbose: bool) -> u8 {
    let reader: Box<dyn BufRead> = if file == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        match File::open(file) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                eprintln!("Cannot open {file} for input: {e}");
                return 1;
            }
        }
    };
    if verbose {
        eprintln!("Testing the database");
    }

    let max_line_size = engine.config().max_line_size;
    let max_key_size = engine.config().max_key_size;
    let mut invalid = 0u64;
    let mut mismatches = 0u64;
    let mut checked = 0u64;

    for (lineno, line) in reader.lines().enumerate() {
        let lineno = lineno + 1;
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.len() > max_line_size {
            eprintln!("{file}:{lineno}: warning: Line too long. Ignored.");
            invalid += 1;
            continue;
        }
        let lowered = lowercase(&line);
        let mut parts = lowered.splitn(2, ' ');
        let key = match parts.next() {
            Some(k) if !k.is_empty() => k,
            _ => continue,
        };
        if key.len() > max_key_size {
            eprintln!("{file}:{lineno}: warning: Too long key. Ignored.");
            invalid += 1;
            continue;
        }
        let expected = parts.next().unwrap_or("").trim_end();
        match engine.search(key, cli.search_flags()) {
            Ok(result) => {
                checked += 1;
                if result.value != expected {
                    println!("{key} {expected}");
                    mismatches += 1;
                    if verbose {
                        eprintln!("{file}:{lineno}: warning: Mismatch found.");
                    }
                }
            }
            Err(LexError::InvalidKey(_)) => {
                eprintln!("{file}:{lineno}: warning: Illegal symbols in key. Ignored.");
                invalid += 1;
            }
            Err(e) => {
                eprintln!("{file}:{lineno}: error: {e}");
                invalid += 1;
            }
        }
    }

    if !quiet {
        eprintln!("{checked}{} been checked", record_tail(checked));
        if invalid > 0 {
            eprintln!("{invalid} invalid record{} ignored", if invalid == 1 { " was" } else { "s were" });
        }
        if mismatches > 0 {
            eprintln!("{mismatches} mismatch{} found", if mismatches == 1 { "" } else { "es" });
        } else {
            eprintln!("No mismatches found");
        }
    }
    0
}

fn put_records(engine: &mut LexiconEngine, cli: &Cli, dataset: Option<Dataset>) -> u8 {
    let reader: Box<dyn BufRead> = match &cli.file {
        Some(path) if path != "-" => match File::open(path) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                eprintln!("Cannot open {path} for input: {e}");
                return 1;
            }
        },
        _ => Box::new(BufReader::new(io::stdin())),
    };

    let rule_target = match dataset {
        Some(Dataset::Rule(t)) => Some(t),
        Some(Dataset::Dict(_)) | None => None,
    };

    if let Some(target) = rule_target {
        if cli.replace {
            if cli.verbose {
                eprintln!("Replacing ruleset");
            }
            let _ = engine.discard_ruleset(target);
        } else if cli.verbose {
            eprintln!("Adding rules to ruleset");
        }
    }

    let put_target = match dataset {
        Some(Dataset::Dict(Dict::ImplicitBase)) => PutTarget::ImplicitBase,
        Some(Dataset::Dict(Dict::Exception)) => PutTarget::Exception,
        _ => PutTarget::Default,
    };

    let max_line_size = engine.config().max_line_size;
    let max_key_size = engine.config().max_key_size;
    let mut processed = 0u64;
    let mut invalid = 0u64;
    let mut duplicate = 0u64;

    for (lineno, line) in reader.lines().enumerate() {
        let lineno = lineno + 1;
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.is_empty() {
            continue;
        }
        if line.len() > max_line_size {
            eprintln!("warning: line {lineno}: Line too long. Ignored.");
            invalid += 1;
            continue;
        }
        let lowered = lowercase(&line);

        if let Some(target) = rule_target {
            match engine.rule_insert(target, 0, &lowered) {
                Ok(()) => processed += 1,
                Err(e) => {
                    eprintln!("warning: line {lineno}: {e}. Ignored.");
                    invalid += 1;
                }
            }
            continue;
        }

        let mut parts = lowered.splitn(2, ' ');
        let key = match parts.next() {
            Some(k) if !k.is_empty() => k,
            _ => continue,
        };
        if key.len() > max_key_size {
            eprintln!("warning: line {lineno}: Too long key. Ignored.");
            invalid += 1;
            continue;
        }
        let value = parts.next().unwrap_or("").trim_end();
        match engine.put(key, value, put_target, cli.replace) {
            Ok(()) => processed += 1,
            Err(LexError::Duplicate) => {
                duplicate += 1;
                if cli.replace {
                    processed += 1;
                }
                if !cli.quiet {
                    eprintln!(
                        "{} duplicate entry: {key} {value}",
                        if cli.replace { "Replaced" } else { "Ignored" }
                    );
                }
            }
            Err(LexError::InvalidKey(_)) => {
                eprintln!("warning: line {lineno}: Illegal symbols in key. Ignored.");
                invalid += 1;
            }
            Err(LexError::InvalidRecord(_)) => {
                eprintln!("warning: line {lineno}: Invalid record. Ignored.");
                invalid += 1;
            }
            Err(e) => {
                eprintln!("error: line {lineno}: {e}");
                return 1;
            }
        }
    }

    if !cli.quiet {
        eprintln!("Total: {processed} record{} processed.", if processed == 1 { "" } else { "s" });
        if invalid > 0 {
            eprintln!("Invalid records: {invalid}");
        }
        if duplicate > 0 {
            eprintln!("Duplicates: {duplicate}");
        }
        eprintln!("{processed}{} been put into the database", record_tail(processed));
    }
    0
}

fn run() -> u8 {
    let cli = Cli::parse();
    let dataset = cli.dataset();

    if cli.list || cli.delete.is_some() || cli.discard {
        if dataset.is_none() {
            eprintln!("Dataset must be specified explicitly");
            return EXIT_MISUSE;
        }
    }

    if let Some(key) = &cli.search {
        let db = match LexiconEngine::open(&cli.db_path, Mode::Search) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("{}: {e}", cli.db_path.display());
                return 1;
            }
        };
        let mut db = db;
        return search(&mut db, &cli, dataset, key, cli.quiet);
    }

    if let Some(key) = &cli.bases {
        let mut db = match LexiconEngine::open(&cli.db_path, Mode::Search) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("{}: {e}", cli.db_path.display());
                return 1;
            }
        };
        return discover_bases(&mut db, key, cli.quiet);
    }

    if cli.list {
        let mut db = match LexiconEngine::open(&cli.db_path, Mode::Search) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("{}: {e}", cli.db_path.display());
                return 1;
            }
        };
        return list(&mut db, dataset.unwrap(), cli.quiet, cli.verbose);
    }

    if let Some(file) = &cli.test {
        let mut db = match LexiconEngine::open(&cli.db_path, Mode::Search) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("{}: {e}", cli.db_path.display());
                return 1;
            }
        };
        return test(&mut db, &cli, file, cli.quiet, cli.verbose);
    }

    if cli.clean {
        let mut db = match LexiconEngine::open(&cli.db_path, Mode::Update) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("{}: {e}", cli.db_path.display());
                return 1;
            }
        };
        return clean(&mut db, dataset, cli.quiet, cli.verbose);
    }

    if let Some(key) = &cli.delete {
        let mut db = match LexiconEngine::open(&cli.db_path, Mode::Update) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("{}: {e}", cli.db_path.display());
                return 1;
            }
        };
        return delete(&mut db, dataset.unwrap(), key, cli.quiet);
    }

    if cli.discard {
        let mut db = match LexiconEngine::open(&cli.db_path, Mode::Update) {
            Ok(db) => db,
            Err(e) => {
                eprintln!("{}: {e}", cli.db_path.display());
                return 1;
            }
        };
        return discard(&mut db, dataset.unwrap(), cli.quiet, cli.verbose);
    }

    // Default action: read records from stdin/-f and insert them.
    let mut db = match LexiconEngine::open(&cli.db_path, Mode::Create) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{}: {e}", cli.db_path.display());
            return 1;
        }
    };
    put_records(&mut db, &cli, dataset)
}

fn main() -> ExitCode {
    env_logger::init();
    ExitCode::from(run())
}
