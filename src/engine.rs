//! The lexicon engine façade: the public surface every frontend drives.
//!
//! [`LexiconEngine`] owns the five on-disk datasets (two ordered
//! dictionaries, three-to-four record-numbered rule programs), the two
//! dictionary cursors, and the lazily compiled rule caches, and implements
//! the composite `search`/`classify` pipeline on top of them.
use std::path::Path;
use std::sync::Arc;

use redb::Database;

use crate::alphabet;
use crate::config::Config;
use crate::diff_codec::{pack_data, unpack_data};
use crate::error::{LexError, LexResult};
use crate::key_codec::{pack_key, unpack_key};
use crate::rules::{RuleKind, RuleProgram};
use crate::store::{
    OrderedStore, RedbOrderedStore, RedbRecnoStore, ScratchStore, SeqDirection,
    CORRECTIONS_TABLE, EXCEPTIONS_TABLE, GENERAL_TABLE, LEXBASES_TABLE, LEXCLASSES_TABLE,
    PREFIXES_TABLE,
};

/// Sentinel stored in place of a zero-length diff script, so "absent" and
/// "present with a redundant (identity) pronunciation" stay distinguishable
/// on disk (§3).
const EMPTY_DIFF_SENTINEL: [u8; 1] = [0];

/// How a [`LexiconEngine`] handle was opened, governing which operations
/// are permitted (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read-only. Any mutating call returns [`LexError::Access`].
    Search,
    /// Read-write against an existing database.
    Update,
    /// Read-write, creating the database file if it does not already
    /// exist.
    Create,
}

/// Which dictionary a dictionary-level operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dict {
    /// The implicit-base dictionary (`Lexbases`).
    ImplicitBase,
    /// The exception dictionary (`Exceptions`).
    Exception,
}

/// Target selector for [`LexiconEngine::put`]: either an explicit
/// dictionary, or `Default`, which chooses one based on [`classify`].
///
/// [`classify`]: LexiconEngine::classify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutTarget {
    /// Resolve the dictionary via [`LexiconEngine::classify`].
    Default,
    /// Store unconditionally in the implicit-base dictionary.
    ImplicitBase,
    /// Store unconditionally in the exception dictionary.
    Exception,
}

/// Target selector for [`LexiconEngine::seq`]: an explicit dictionary, with
/// an additional variant that suppresses corrector application on
/// exception records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqTarget {
    /// Walk the implicit-base dictionary.
    ImplicitBase,
    /// Walk the exception dictionary, applying corrector rules to each
    /// decoded value.
    Exception,
    /// Walk the exception dictionary without applying corrector rules.
    ExceptionRaw,
}

impl SeqTarget {
    fn dict(self) -> Dict {
        match self {
            SeqTarget::ImplicitBase => Dict::ImplicitBase,
            SeqTarget::Exception | SeqTarget::ExceptionRaw => Dict::Exception,
        }
    }
}

/// Which rule program a ruleset-level operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    /// Stress-guessing rules.
    General,
    /// Base-form extraction rules.
    LexicalClass,
    /// Prefix-stripping rules (present for interface completeness; never
    /// consulted by `search`/`classify`, §9).
    Prefix,
    /// Post-correction rules.
    Corrector,
}

/// Which steps of [`LexiconEngine::search`]'s pipeline to run. The default
/// (`SearchFlags::ALL`, the all-zero value) runs every stage; setting any
/// bit restricts the pipeline to only the stages named, exactly as the
/// historical `flags=0` meaning "do everything" (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchFlags(u8);

impl SearchFlags {
    /// Consult the exception dictionary.
    pub const EXCEPTIONS: u8 = 1;
    /// Treat the word as an inflected form and consult the implicit-base
    /// dictionary via lexical-class rules.
    pub const FORMS: u8 = 2;
    /// Fall back to general stress-guessing rules.
    pub const RULES: u8 = 4;
    /// Run every stage (the all-zero value, matching the historical
    /// "flags=0 means full search" convention).
    pub const ALL: SearchFlags = SearchFlags(0);

    /// Builds a flag set from the given bits (any combination of
    /// [`Self::EXCEPTIONS`], [`Self::FORMS`], [`Self::RULES`]).
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    fn wants(self, bit: u8) -> bool {
        self.0 == 0 || self.0 & bit != 0
    }
}

/// Whether a word is recognized as a lexical base (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Some lexical-class rule's base construction equals the word
    /// exactly.
    IsBase,
    /// No lexical-class rule's base construction equals the word.
    NotBase,
}

impl Classification {
    /// Whether this is [`Classification::IsBase`].
    pub fn is_base(self) -> bool {
        matches!(self, Classification::IsBase)
    }
}

/// The outcome of [`LexiconEngine::search`]: a resulting surface form, and
/// whether any dictionary or rule actually matched (`hit = false` means the
/// original word was returned unchanged, mirroring the historical
/// `LEXDB_SPECIAL` return code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The transcribed/stressed surface form, or the original word
    /// unchanged if nothing matched.
    pub value: String,
    /// Whether an exception, base, or general rule actually produced
    /// `value`.
    pub hit: bool,
}

/// In-memory-or-persisted backing for one of the two dictionaries. During
/// bulk build (`Config::bulk_build`, Create mode against a nonexistent
/// file) a dictionary starts as a [`ScratchStore`] and is dumped, sorted,
/// into a real `redb` table on [`LexiconEngine::close`]/drop.
enum DictStore {
    Redb(RedbOrderedStore),
    Scratch(ScratchStore),
}

impl OrderedStore for DictStore {
    fn get(&self, key: &[u8]) -> LexResult<Option<Vec<u8>>> {
        match self {
            DictStore::Redb(s) => s.get(key),
            DictStore::Scratch(s) => s.get(key),
        }
    }
    fn put(&mut self, key: &[u8], value: &[u8], overwrite: bool) -> LexResult<bool> {
        match self {
            DictStore::Redb(s) => s.put(key, value, overwrite),
            DictStore::Scratch(s) => s.put(key, value, overwrite),
        }
    }
    fn delete(&mut self, key: &[u8]) -> LexResult<bool> {
        match self {
            DictStore::Redb(s) => s.delete(key),
            DictStore::Scratch(s) => s.delete(key),
        }
    }
    fn truncate(&mut self) -> LexResult<u64> {
        match self {
            DictStore::Redb(s) => s.truncate(),
            DictStore::Scratch(s) => s.truncate(),
        }
    }
    fn first(&self) -> LexResult<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            DictStore::Redb(s) => s.first(),
            DictStore::Scratch(s) => s.first(),
        }
    }
    fn last(&self) -> LexResult<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            DictStore::Redb(s) => s.last(),
            DictStore::Scratch(s) => s.last(),
        }
    }
    fn next_after(&self, key: &[u8]) -> LexResult<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            DictStore::Redb(s) => s.next_after(key),
            DictStore::Scratch(s) => s.next_after(key),
        }
    }
    fn prev_before(&self, key: &[u8]) -> LexResult<Option<(Vec<u8>, Vec<u8>)>> {
        match self {
            DictStore::Redb(s) => s.prev_before(key),
            DictStore::Scratch(s) => s.prev_before(key),
        }
    }
}

/// A handle onto a pronunciation-lexicon database: two dictionaries and
/// three-to-four rule programs backed by one `redb::Database`.
pub struct LexiconEngine {
    db: Arc<Database>,
    config: Config,
    mode: Mode,
    lexbases: DictStore,
    exceptions: DictStore,
    general: RuleProgram<RedbRecnoStore>,
    lexclasses: RuleProgram<RedbRecnoStore>,
    prefixes: RuleProgram<RedbRecnoStore>,
    correctors: RuleProgram<RedbRecnoStore>,
    lexbases_cursor: Option<Vec<u8>>,
    exceptions_cursor: Option<Vec<u8>>,
}

impl LexiconEngine {
    /// Opens (or creates) the database at `path` with the default
    /// [`Config`].
    pub fn open(path: impl AsRef<Path>, mode: Mode) -> LexResult<Self> {
        Self::open_with_config(path, mode, Config::default())
    }

    /// Opens (or creates) the database at `path`.
    ///
    /// Per §4.5, this does not itself open any dataset: the underlying
    /// `redb` tables are created lazily, on first write, by the store
    /// layer. `Search`/`Update` against a database that does not yet exist
    /// fail with [`LexError::Access`]; `Create` may build the two
    /// dictionaries into an in-memory scratch store first when
    /// `config.bulk_build` is set and the file is new (§4.6).
    pub fn open_with_config(path: impl AsRef<Path>, mode: Mode, config: Config) -> LexResult<Self> {
        let path = path.as_ref();
        let exists = path.exists();
        match mode {
            Mode::Search | Mode::Update if !exists => return Err(LexError::Access),
            _ => {}
        }
        let bulk_build = mode == Mode::Create && !exists && config.bulk_build;
        let db = Arc::new(if exists {
            Database::open(path)?
        } else {
            Database::create(path)?
        });

        let lexbases = if bulk_build {
            DictStore::Scratch(ScratchStore::new())
        } else {
            DictStore::Redb(RedbOrderedStore::new(db.clone(), LEXBASES_TABLE))
        };
        let exceptions = if bulk_build {
            DictStore::Scratch(ScratchStore::new())
        } else {
            DictStore::Redb(RedbOrderedStore::new(db.clone(), EXCEPTIONS_TABLE))
        };

        let mut engine = Self {
            general: RuleProgram::new(
                RedbRecnoStore::new(db.clone(), GENERAL_TABLE),
                RuleKind::General,
            ),
            lexclasses: RuleProgram::new(
                RedbRecnoStore::new(db.clone(), LEXCLASSES_TABLE),
                RuleKind::LexicalClass,
            ),
            prefixes: RuleProgram::new(
                RedbRecnoStore::new(db.clone(), PREFIXES_TABLE),
                RuleKind::Prefix,
            ),
            correctors: RuleProgram::new(
                RedbRecnoStore::new(db.clone(), CORRECTIONS_TABLE),
                RuleKind::Corrector,
            ),
            db,
            config,
            mode,
            lexbases,
            exceptions,
            lexbases_cursor: None,
            exceptions_cursor: None,
        };

        if engine.config.eager_rule_compile {
            engine.general.compile_all()?;
            engine.lexclasses.compile_all()?;
            engine.prefixes.compile_all()?;
            engine.correctors.compile_all()?;
        }

        Ok(engine)
    }

    /// Flushes any bulk-built scratch dictionaries to their real `redb`
    /// tables, in sorted key order. Safe to call more than once.
    pub fn close(mut self) -> LexResult<()> {
        self.flush_bulk_build()
    }

    fn flush_bulk_build(&mut self) -> LexResult<()> {
        if let DictStore::Scratch(scratch) = &self.lexbases {
            let entries: Vec<(Vec<u8>, Vec<u8>)> =
                scratch.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let mut redb_store = RedbOrderedStore::new(self.db.clone(), LEXBASES_TABLE);
            for (k, v) in &entries {
                redb_store.put(k, v, true)?;
            }
            self.lexbases = DictStore::Redb(redb_store);
        }
        if let DictStore::Scratch(scratch) = &self.exceptions {
            let entries: Vec<(Vec<u8>, Vec<u8>)> =
                scratch.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let mut redb_store = RedbOrderedStore::new(self.db.clone(), EXCEPTIONS_TABLE);
            for (k, v) in &entries {
                redb_store.put(k, v, true)?;
            }
            self.exceptions = DictStore::Redb(redb_store);
        }
        Ok(())
    }

    fn check_writable(&self) -> LexResult<()> {
        if self.mode == Mode::Search {
            Err(LexError::Access)
        } else {
            Ok(())
        }
    }

    fn dict_store(&self, dict: Dict) -> &DictStore {
        match dict {
            Dict::ImplicitBase => &self.lexbases,
            Dict::Exception => &self.exceptions,
        }
    }

    fn dict_store_mut(&mut self, dict: Dict) -> &mut DictStore {
        match dict {
            Dict::ImplicitBase => &mut self.lexbases,
            Dict::Exception => &mut self.exceptions,
        }
    }

    fn rule_program(&mut self, target: RuleTarget) -> &mut RuleProgram<RedbRecnoStore> {
        match target {
            RuleTarget::General => &mut self.general,
            RuleTarget::LexicalClass => &mut self.lexclasses,
            RuleTarget::Prefix => &mut self.prefixes,
            RuleTarget::Corrector => &mut self.correctors,
        }
    }

    fn check_sizes(&self, key: &str, value: &str) -> LexResult<()> {
        if key.len() > self.config.max_key_size || value.len() > self.config.max_record_size {
            return Err(LexError::OutOfMemory);
        }
        Ok(())
    }

    /// Looks up `lookup_key` (already packed) in `dict` and, on a hit,
    /// reverse-applies its diff script onto `base`, returning the
    /// reconstructed surface form. `base` may differ in length from
    /// `lookup_key` (the caller pads it to the candidate base's length
    /// before calling, per §4.5 step 3).
    fn dict_get(&self, dict: Dict, lookup_key: &str, base: &[u8]) -> LexResult<Option<String>> {
        let Ok(packed) = pack_key(lookup_key.as_bytes()) else {
            return Ok(None);
        };
        match self.dict_store(dict).get(&packed)? {
            None => Ok(None),
            Some(diff) => {
                let diff = if diff == EMPTY_DIFF_SENTINEL {
                    &[][..]
                } else {
                    &diff[..]
                };
                let out = unpack_data(base, diff);
                Ok(Some(String::from_utf8_lossy(&out).into_owned()))
            }
        }
    }

    /// Stores `key`/`value` into the dataset selected by `target` (§4.5
    /// step 1-4).
    ///
    /// On a key collision: under `Default` targeting the implicit-base
    /// dictionary, retries against the exception dictionary; once a final
    /// dictionary is settled on, `overwrite` decides whether the existing
    /// record is replaced. Either way a collision is reported as
    /// [`LexError::Duplicate`] (the replace, if any, has already
    /// happened).
    pub fn put(&mut self, key: &str, value: &str, target: PutTarget, overwrite: bool) -> LexResult<()> {
        self.check_writable()?;
        self.check_sizes(key, value)?;
        let packed_key = pack_key(key.as_bytes())?;
        let diff = pack_data(key.as_bytes(), value.as_bytes())?;
        let record: Vec<u8> = if diff.is_empty() {
            EMPTY_DIFF_SENTINEL.to_vec()
        } else {
            diff
        };

        let mut dict = match target {
            PutTarget::ImplicitBase => Dict::ImplicitBase,
            PutTarget::Exception => Dict::Exception,
            PutTarget::Default => {
                if self.classify(key)?.is_base() {
                    Dict::ImplicitBase
                } else {
                    Dict::Exception
                }
            }
        };

        let mut stored = self.dict_store_mut(dict).put(&packed_key, &record, false)?;
        if !stored && target == PutTarget::Default && dict == Dict::ImplicitBase {
            dict = Dict::Exception;
            stored = self.dict_store_mut(dict).put(&packed_key, &record, false)?;
        }

        if stored {
            Ok(())
        } else if overwrite {
            self.dict_store_mut(dict).put(&packed_key, &record, true)?;
            Err(LexError::Duplicate)
        } else {
            Err(LexError::Duplicate)
        }
    }

    /// Removes the record for `key` from `dict`.
    pub fn del(&mut self, key: &str, dict: Dict) -> LexResult<()> {
        self.check_writable()?;
        let packed = pack_key(key.as_bytes())?;
        if self.dict_store_mut(dict).delete(&packed)? {
            Ok(())
        } else {
            Err(LexError::NotFound)
        }
    }

    /// Advances the per-dataset cursor for `target` in `direction` and
    /// returns the decoded `(key, value)` pair at the new position.
    ///
    /// Returns [`LexError::NotFound`] at either end of the dataset
    /// (mirroring the historical `LEXDB_SPECIAL`/`EndOfData` outcome).
    pub fn seq(&mut self, target: SeqTarget, direction: SeqDirection) -> LexResult<(String, String)> {
        let dict = target.dict();
        let record = {
            let cursor = match dict {
                Dict::ImplicitBase => &self.lexbases_cursor,
                Dict::Exception => &self.exceptions_cursor,
            };
            let store = self.dict_store(dict);
            match direction {
                SeqDirection::First => store.first()?,
                SeqDirection::Last => store.last()?,
                SeqDirection::Next => match cursor {
                    Some(k) => store.next_after(k)?,
                    None => store.first()?,
                },
                SeqDirection::Prev => match cursor {
                    Some(k) => store.prev_before(k)?,
                    None => store.last()?,
                },
            }
        };

        let Some((packed_key, diff)) = record else {
            return Err(LexError::NotFound);
        };
        match dict {
            Dict::ImplicitBase => self.lexbases_cursor = Some(packed_key.clone()),
            Dict::Exception => self.exceptions_cursor = Some(packed_key.clone()),
        }

        let key_bytes = unpack_key(&packed_key, self.config.max_key_size + 1)?;
        let diff = if diff == EMPTY_DIFF_SENTINEL {
            Vec::new()
        } else {
            diff
        };
        let value_bytes = unpack_data(&key_bytes, &diff);
        let mut value = String::from_utf8_lossy(&value_bytes).into_owned();
        if matches!(target, SeqTarget::Exception) {
            self.correctors.apply_correctors(&mut value)?;
        }
        Ok((String::from_utf8_lossy(&key_bytes).into_owned(), value))
    }

    /// The composite search pipeline (§4.5): exception lookup, then
    /// implicit-form lookup via lexical-class rules, then general-rule
    /// stress guessing, each gated by `flags`; a hit is finished off with
    /// corrector rules.
    pub fn search(&mut self, word: &str, flags: SearchFlags) -> LexResult<SearchResult> {
        let mut value = word.to_string();
        let mut hit = false;

        if flags.wants(SearchFlags::EXCEPTIONS) {
            if let Some(v) = self.dict_get(Dict::Exception, word, word.as_bytes())? {
                value = v;
                hit = true;
            }
        }

        if !hit && flags.wants(SearchFlags::FORMS) {
            let mut n = 1u32;
            loop {
                let Some((rule_no, base)) = self.lexclasses.classify_scan(word, n)? else {
                    break;
                };
                let mut padded = word.as_bytes().to_vec();
                if base.len() > word.len() {
                    padded.resize(base.len(), b'_');
                }
                if let Some(v) = self.dict_get(Dict::ImplicitBase, &base, &padded)? {
                    value = v;
                    hit = true;
                    break;
                }
                n = rule_no + 1;
            }
        }

        if !hit && flags.wants(SearchFlags::RULES) {
            if let Some(v) = self.general.match_general(word)? {
                value = v;
                hit = true;
            }
        }

        if hit {
            self.correctors.apply_correctors(&mut value)?;
        }

        Ok(SearchResult { value, hit })
    }

    /// Whether `word` is itself the base form produced by some
    /// lexical-class rule (§4.5).
    pub fn classify(&mut self, word: &str) -> LexResult<Classification> {
        let mut n = 1u32;
        loop {
            match self.lexclasses.classify_scan(word, n)? {
                None => return Ok(Classification::NotBase),
                Some((rule_no, base)) => {
                    if base == word {
                        return Ok(Classification::IsBase);
                    }
                    n = rule_no + 1;
                }
            }
        }
    }

    /// Every lexical-class base candidate for `word`, in rule order, as
    /// `(matched rule number, candidate base)` pairs. Unlike `search`'s
    /// internal scan this does not look candidates up in the implicit-base
    /// dictionary — it is the building block behind a "discover bases"
    /// frontend action (§4.7's `-b` flag).
    pub fn discover_bases(&mut self, word: &str) -> LexResult<Vec<(u32, String)>> {
        let mut out = Vec::new();
        let mut n = 1u32;
        while let Some((rule_no, base)) = self.lexclasses.classify_scan(word, n)? {
            out.push((rule_no, base));
            n = rule_no + 1;
        }
        Ok(out)
    }

    /// Removes every entry from `dict`, closing its cursor, and returns
    /// how many entries were removed.
    pub fn discard_dictionary(&mut self, dict: Dict) -> LexResult<u64> {
        self.check_writable()?;
        match dict {
            Dict::ImplicitBase => self.lexbases_cursor = None,
            Dict::Exception => self.exceptions_cursor = None,
        }
        self.dict_store_mut(dict).truncate()
    }

    /// Removes every rule from `target`'s ruleset, invalidating its
    /// compiled cache, and returns how many rules were removed.
    pub fn discard_ruleset(&mut self, target: RuleTarget) -> LexResult<u32> {
        self.check_writable()?;
        self.rule_program(target).discard()
    }

    /// Inserts a rule record (`pattern` and optional replacement already
    /// joined by a single space) at `pos` (1-based; `0` appends).
    pub fn rule_insert(&mut self, target: RuleTarget, pos: u32, text: &str) -> LexResult<()> {
        self.check_writable()?;
        self.rule_program(target).insert(pos, text)
    }

    /// Fetches the raw text of rule `pos` (1-based) in `target`'s ruleset.
    pub fn rule_fetch(&self, target: RuleTarget, pos: u32) -> LexResult<Option<String>> {
        let program = match target {
            RuleTarget::General => &self.general,
            RuleTarget::LexicalClass => &self.lexclasses,
            RuleTarget::Prefix => &self.prefixes,
            RuleTarget::Corrector => &self.correctors,
        };
        program.fetch(pos)
    }

    /// Removes rule `pos` (1-based) from `target`'s ruleset, renumbering
    /// later rules down. Returns whether a rule existed at that position.
    pub fn rule_remove(&mut self, target: RuleTarget, pos: u32) -> LexResult<bool> {
        self.check_writable()?;
        self.rule_program(target).remove(pos)
    }

    /// Number of rules currently in `target`'s ruleset.
    pub fn rule_count(&mut self, target: RuleTarget) -> LexResult<u32> {
        self.rule_program(target).count()
    }

    /// The engine's effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Verifies `word` contains only alphabet letters (no markers), as
    /// required of a dictionary key, without attempting to pack it.
    pub fn is_plain_key(word: &str) -> bool {
        !word.is_empty() && word.bytes().all(|b| alphabet::idx(b).is_some())
    }
}

impl Drop for LexiconEngine {
    fn drop(&mut self) {
        if let Err(e) = self.flush_bulk_build() {
            log::warn!("failed to flush bulk-built dictionaries on close: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_create(dir: &tempfile::TempDir, name: &str) -> LexiconEngine {
        LexiconEngine::open(dir.path().join(name), Mode::Create).unwrap()
    }

    #[test]
    fn put_and_search_exception_round_trips() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db1.redb");
        engine
            .put("cadidio", "ca+didio", PutTarget::Exception, false)
            .unwrap();
        let result = engine.search("cadidio", SearchFlags::ALL).unwrap();
        assert!(result.hit);
        assert_eq!(result.value, "ca+didio");
    }

    #[test]
    fn search_with_no_data_returns_original_word_as_miss() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db2.redb");
        let result = engine.search("abc", SearchFlags::ALL).unwrap();
        assert!(!result.hit);
        assert_eq!(result.value, "abc");
    }

    #[test]
    fn duplicate_put_without_overwrite_is_rejected() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db3.redb");
        engine
            .put("abc", "a+bc", PutTarget::Exception, false)
            .unwrap();
        let err = engine
            .put("abc", "ab+c", PutTarget::Exception, false)
            .unwrap_err();
        assert!(matches!(err, LexError::Duplicate));
        let result = engine.search("abc", SearchFlags::ALL).unwrap();
        assert_eq!(result.value, "a+bc");
    }

    #[test]
    fn duplicate_put_with_overwrite_replaces_but_still_reports_duplicate() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db4.redb");
        engine
            .put("abc", "a+bc", PutTarget::Exception, false)
            .unwrap();
        let err = engine
            .put("abc", "ab+c", PutTarget::Exception, true)
            .unwrap_err();
        assert!(matches!(err, LexError::Duplicate));
        let result = engine.search("abc", SearchFlags::ALL).unwrap();
        assert_eq!(result.value, "ab+c");
    }

    #[test]
    fn del_reports_not_found_for_absent_key() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db5.redb");
        assert!(matches!(
            engine.del("abc", Dict::Exception).unwrap_err(),
            LexError::NotFound
        ));
    }

    #[test]
    fn seq_enumerates_in_ascending_packed_key_order_then_ends() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db6.redb");
        for w in ["cad", "bad", "abd"] {
            engine.put(w, w, PutTarget::Exception, false).unwrap();
        }
        let mut seen = Vec::new();
        loop {
            match engine.seq(SeqTarget::ExceptionRaw, SeqDirection::Next) {
                Ok((k, _)) => seen.push(k),
                Err(LexError::NotFound) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(seen, vec!["abd", "bad", "cad"]);
        assert!(matches!(
            engine.seq(SeqTarget::ExceptionRaw, SeqDirection::Next),
            Err(LexError::NotFound)
        ));
    }

    #[test]
    fn invalid_key_is_rejected_without_mutating_the_store() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db7.redb");
        // 'k' is in G3 (index 10): forbidden as the first byte of a key.
        let err = engine.put("kab", "kab", PutTarget::Exception, false).unwrap_err();
        assert!(matches!(err, LexError::InvalidKey(_)));
        assert!(matches!(
            engine.seq(SeqTarget::ExceptionRaw, SeqDirection::First),
            Err(LexError::NotFound)
        ));
    }

    #[test]
    fn search_mode_is_read_only() {
        let dir = tempdir().unwrap();
        {
            let engine = open_create(&dir, "db8.redb");
            engine.close().unwrap();
        }
        let mut engine = LexiconEngine::open(dir.path().join("db8.redb"), Mode::Search).unwrap();
        assert!(matches!(
            engine.put("abc", "abc", PutTarget::Exception, false),
            Err(LexError::Access)
        ));
    }

    #[test]
    fn discard_dictionary_clears_entries_and_cursor() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db9.redb");
        engine.put("abc", "abc", PutTarget::Exception, false).unwrap();
        engine.seq(SeqTarget::ExceptionRaw, SeqDirection::First).unwrap();
        assert_eq!(engine.discard_dictionary(Dict::Exception).unwrap(), 1);
        assert!(matches!(
            engine.seq(SeqTarget::ExceptionRaw, SeqDirection::Next),
            Err(LexError::NotFound)
        ));
    }

    #[test]
    fn implicit_form_search_pads_and_decodes_against_base_diff() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db10.redb");
        // Lexical-class rule: words ending "h" have base "ab" (group 1 is
        // "ab"; the literal suffix "h" is excluded from the base).
        engine
            .rule_insert(RuleTarget::LexicalClass, 0, "^(ab)h$")
            .unwrap();
        engine.put("ab", "a+b", PutTarget::ImplicitBase, false).unwrap();

        // The base's diff only inserts a stress marker; it never touches a
        // third position. So the decode buffer for "abh" (the full word,
        // since "ab" is not longer than it) passes its trailing "h" through
        // unedited: the stored diff would need its own REMOVE/INSERT over
        // that tail to suppress it, which this minimal record doesn't have.
        let result = engine.search("abh", SearchFlags::ALL).unwrap();
        assert!(result.hit);
        assert_eq!(result.value, "a+bh");
    }

    #[test]
    fn classify_detects_lexical_base_fixed_points() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db11.redb");
        engine
            .rule_insert(RuleTarget::LexicalClass, 0, "^(ab)$")
            .unwrap();
        assert_eq!(engine.classify("ab").unwrap(), Classification::IsBase);
        assert_eq!(engine.classify("xy").unwrap(), Classification::NotBase);
    }

    #[test]
    fn eager_rule_compile_locks_editing_immediately_on_open() {
        let dir = tempdir().unwrap();
        {
            let mut engine = open_create(&dir, "db13.redb");
            engine
                .rule_insert(RuleTarget::General, 0, r"^(a)")
                .unwrap();
            engine.close().unwrap();
        }

        let config = Config {
            eager_rule_compile: true,
            ..Config::default()
        };
        let mut engine =
            LexiconEngine::open_with_config(dir.path().join("db13.redb"), Mode::Update, config)
                .unwrap();
        assert!(engine.search("abc", SearchFlags::RULES).unwrap().hit);
        assert_eq!(
            engine.rule_insert(RuleTarget::General, 0, r"^(b)"),
            Err(LexError::Access)
        );
    }

    #[test]
    fn default_put_resolves_to_implicit_base_for_a_classified_word() {
        let dir = tempdir().unwrap();
        let mut engine = open_create(&dir, "db12.redb");
        engine
            .rule_insert(RuleTarget::LexicalClass, 0, "^(ab)$")
            .unwrap();
        engine.put("ab", "a+b", PutTarget::Default, false).unwrap();
        assert_eq!(
            engine
                .seq(SeqTarget::ImplicitBase, SeqDirection::First)
                .unwrap(),
            ("ab".to_string(), "a+b".to_string())
        );
        assert!(matches!(
            engine.seq(SeqTarget::ExceptionRaw, SeqDirection::First),
            Err(LexError::NotFound)
        ));
    }
}
