//! The rule engine: general, lexical-class, prefix, and corrector rule
//! programs, each a record-numbered, lazily compiled sequence of
//! case-insensitive regex patterns with an optional literal replacement.
use regex::{Captures, Regex, RegexBuilder};

use crate::error::LexError;
use crate::store::RecnoStore;

/// Which of the four rule programs a [`RuleProgram`] belongs to. Purely
/// informational (used in log messages); match semantics are selected by
/// which method the caller invokes, not by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Stress-position guessing from pattern alone.
    General,
    /// Base-form extraction via a capture group plus a literal suffix.
    LexicalClass,
    /// Prefix stripping/restoration. Present for interface completeness;
    /// `search` and `classify` never consult this program.
    Prefix,
    /// Back-reference template expansion applied to any hit.
    Corrector,
}

/// One rule record before compilation: a regex source and an optional
/// literal replacement, stored as a single line split on the first space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    /// The regex pattern, matched case-insensitively.
    pub pattern: String,
    /// The literal suffix (lexical-class/prefix rules) or back-reference
    /// template (corrector rules), if the record has one.
    pub replacement: Option<String>,
}

impl RuleRecord {
    /// Splits `src` into a pattern and an optional replacement at the
    /// first space.
    pub fn parse(src: &str) -> Self {
        match src.split_once(' ') {
            Some((pattern, rest)) if !rest.is_empty() => Self {
                pattern: pattern.to_string(),
                replacement: Some(rest.to_string()),
            },
            _ => Self {
                pattern: src.trim_end().to_string(),
                replacement: None,
            },
        }
    }

    /// Reassembles the record into its stored line form.
    pub fn to_text(&self) -> String {
        match &self.replacement {
            Some(r) => format!("{} {}", self.pattern, r),
            None => self.pattern.clone(),
        }
    }
}

/// Lazy-compiled cache state for a [`RuleProgram`]. `Unrealized` is the
/// state a freshly opened or just-edited program starts in; the first
/// query call transitions it to `Realized`, allocating one slot per
/// record. Editing a `Realized` program is refused (§4.4): the caller must
/// let it go back to `Unrealized` (which only happens via a fresh
/// [`RuleProgram`], since edits are rejected outright rather than silently
/// invalidating a cache another query might be mid-scan over).
enum CacheState {
    Unrealized,
    Realized {
        attempted: Vec<bool>,
        compiled: Vec<Option<Regex>>,
        replacement: Vec<Option<String>>,
    },
}

/// One rule program: general, lexical-class, prefix, or corrector,
/// depending on which dataset `store` is opened against.
pub struct RuleProgram<S> {
    store: S,
    kind: RuleKind,
    cache: CacheState,
}

impl<S: RecnoStore> RuleProgram<S> {
    /// Wraps `store` as a rule program of the given `kind`. The program
    /// starts `Unrealized`: nothing is compiled until first use.
    pub fn new(store: S, kind: RuleKind) -> Self {
        Self {
            store,
            kind,
            cache: CacheState::Unrealized,
        }
    }

    fn realize(&mut self) -> Result<(), LexError> {
        if matches!(self.cache, CacheState::Unrealized) {
            let n = self.store.count()? as usize;
            self.cache = CacheState::Realized {
                attempted: vec![false; n],
                compiled: vec![None; n],
                replacement: vec![None; n],
            };
        }
        Ok(())
    }

    fn require_editable(&self) -> Result<(), LexError> {
        match self.cache {
            CacheState::Unrealized => Ok(()),
            CacheState::Realized { .. } => Err(LexError::Access),
        }
    }

    fn ensure_loaded(&mut self, i: u32) -> Result<(), LexError> {
        self.realize()?;
        let idx = i as usize;
        let already = match &self.cache {
            CacheState::Realized { attempted, .. } => attempted[idx],
            CacheState::Unrealized => unreachable!("realize() just ran"),
        };
        if already {
            return Ok(());
        }
        let raw = self.store.get(i + 1)?.ok_or(LexError::NotFound)?;
        let text = String::from_utf8_lossy(&raw).into_owned();
        let record = RuleRecord::parse(&text);
        let built = RegexBuilder::new(&record.pattern)
            .case_insensitive(true)
            .build();

        match &mut self.cache {
            CacheState::Realized {
                attempted,
                compiled,
                replacement,
            } => {
                attempted[idx] = true;
                match built {
                    Ok(re) => {
                        compiled[idx] = Some(re);
                        replacement[idx] = record.replacement;
                    }
                    Err(e) => {
                        log::warn!(
                            "rule {} in {:?} ruleset failed to compile, skipping: {e}",
                            i + 1,
                            self.kind
                        );
                        compiled[idx] = None;
                    }
                }
            }
            CacheState::Unrealized => unreachable!("realize() just ran"),
        }
        Ok(())
    }

    fn regex_at(&mut self, i: u32) -> Result<Option<Regex>, LexError> {
        self.ensure_loaded(i)?;
        match &self.cache {
            CacheState::Realized { compiled, .. } => Ok(compiled[i as usize].clone()),
            CacheState::Unrealized => unreachable!("ensure_loaded() just ran"),
        }
    }

    fn replacement_at(&mut self, i: u32) -> Result<Option<String>, LexError> {
        self.ensure_loaded(i)?;
        match &self.cache {
            CacheState::Realized { replacement, .. } => Ok(replacement[i as usize].clone()),
            CacheState::Unrealized => unreachable!("ensure_loaded() just ran"),
        }
    }

    /// Compiles every record up front, rather than lazily on first match.
    /// Used when `Config::eager_rule_compile` is set, so the first `search`
    /// or `classify` call doesn't pay for compiling a large ruleset
    /// mid-query.
    pub fn compile_all(&mut self) -> Result<(), LexError> {
        let total = self.count()?;
        for i in 0..total {
            self.ensure_loaded(i)?;
        }
        Ok(())
    }

    /// Number of records in the program.
    pub fn count(&mut self) -> Result<u32, LexError> {
        self.realize()?;
        match &self.cache {
            CacheState::Realized { compiled, .. } => Ok(compiled.len() as u32),
            CacheState::Unrealized => unreachable!("realize() just ran"),
        }
    }

    /// Fetches the raw (unparsed) text of record `pos` (1-based). Does not
    /// realize the cache; safe to call regardless of editing state.
    pub fn fetch(&self, pos: u32) -> Result<Option<String>, LexError> {
        if pos < 1 {
            return Err(LexError::Parameter);
        }
        Ok(self
            .store
            .get(pos)?
            .map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// Inserts `text` at position `pos` (1-based), or appends when
    /// `pos == 0`. Fails with [`LexError::Access`] if the program is
    /// currently realized for querying.
    pub fn insert(&mut self, pos: u32, text: &str) -> Result<(), LexError> {
        self.require_editable()?;
        if pos == 0 {
            self.store.append(text.as_bytes())?;
        } else {
            self.store.insert_at(pos, text.as_bytes())?;
        }
        Ok(())
    }

    /// Removes record `pos` (1-based), renumbering later records down.
    /// Fails with [`LexError::Access`] if the program is currently
    /// realized for querying.
    pub fn remove(&mut self, pos: u32) -> Result<bool, LexError> {
        self.require_editable()?;
        if pos < 1 {
            return Err(LexError::Parameter);
        }
        self.store.delete_at(pos)
    }

    /// Empties the program and invalidates the compiled cache, returning
    /// the number of records removed.
    pub fn discard(&mut self) -> Result<u32, LexError> {
        let n = self.store.truncate()?;
        self.cache = CacheState::Unrealized;
        Ok(n)
    }

    /// General-rule stress guess: the first rule (in order) whose pattern
    /// matches `word` wins. The result is `word` with a major-stress
    /// marker spliced in right after the end of capture group 1.
    pub fn match_general(&mut self, word: &str) -> Result<Option<String>, LexError> {
        let total = self.count()?;
        for i in 0..total {
            let Some(re) = self.regex_at(i)? else {
                continue;
            };
            if let Some(caps) = re.captures(word) {
                if let Some(g1) = caps.get(1) {
                    let mut out = String::with_capacity(word.len() + 1);
                    out.push_str(&word[..g1.end()]);
                    out.push('+');
                    out.push_str(&word[g1.end()..]);
                    return Ok(Some(out));
                }
            }
        }
        Ok(None)
    }

    /// Scans lexical-class rules starting at 1-based index `start` for the
    /// first whose pattern matches `word`. On a match, constructs the base
    /// form as `word[..group(1).end]` plus the rule's literal replacement
    /// (if any), returning the matched rule's 1-based index alongside it so
    /// the caller can resume scanning past it.
    pub fn classify_scan(
        &mut self,
        word: &str,
        start: u32,
    ) -> Result<Option<(u32, String)>, LexError> {
        if start < 1 {
            return Err(LexError::Parameter);
        }
        let total = self.count()?;
        for i in (start - 1)..total {
            let Some(re) = self.regex_at(i)? else {
                continue;
            };
            if let Some(caps) = re.captures(word) {
                if let Some(g1) = caps.get(1) {
                    let mut base = word[..g1.end()].to_string();
                    if let Some(suffix) = self.replacement_at(i)? {
                        base.push_str(&suffix);
                    }
                    return Ok(Some((i + 1, base)));
                }
            }
        }
        Ok(None)
    }

    /// Applies every corrector rule, in order, that matches `s`, each time
    /// re-matching against the (possibly already modified) string. Unlike
    /// the general and lexical-class programs this is not "first match
    /// wins" — every matching rule fires.
    pub fn apply_correctors(&mut self, s: &mut String) -> Result<(), LexError> {
        let total = self.count()?;
        for i in 0..total {
            let Some(re) = self.regex_at(i)? else {
                continue;
            };
            let Some(caps) = re.captures(s.as_str()) else {
                continue;
            };
            let m0 = caps.get(0).expect("capture group 0 is always present");
            let (start, end) = (m0.start(), m0.end());
            let mut replaced = String::new();
            if let Some(template) = self.replacement_at(i)? {
                expand_template(&template, &caps, &mut replaced);
            }
            s.replace_range(start..end, &replaced);
        }
        Ok(())
    }
}

/// Expands a corrector replacement template: an ASCII digit `d` appends
/// capture group `d` (`0` is the whole match), any other byte is copied
/// through literally.
fn expand_template(template: &str, caps: &Captures, out: &mut String) {
    for b in template.bytes() {
        if b.is_ascii_digit() {
            let group = (b - b'0') as usize;
            if let Some(m) = caps.get(group) {
                out.push_str(m.as_str());
            }
        } else {
            out.push(b as char);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecnoStore;

    #[derive(Default)]
    struct VecStore(Vec<Vec<u8>>);

    impl RecnoStore for VecStore {
        fn count(&self) -> Result<u32, LexError> {
            Ok(self.0.len() as u32)
        }
        fn get(&self, n: u32) -> Result<Option<Vec<u8>>, LexError> {
            Ok(self.0.get(n as usize - 1).cloned())
        }
        fn append(&mut self, value: &[u8]) -> Result<u32, LexError> {
            self.0.push(value.to_vec());
            Ok(self.0.len() as u32)
        }
        fn insert_at(&mut self, n: u32, value: &[u8]) -> Result<(), LexError> {
            self.0.insert(n as usize - 1, value.to_vec());
            Ok(())
        }
        fn delete_at(&mut self, n: u32) -> Result<bool, LexError> {
            if (n as usize) <= self.0.len() {
                self.0.remove(n as usize - 1);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        fn truncate(&mut self) -> Result<u32, LexError> {
            let n = self.0.len() as u32;
            self.0.clear();
            Ok(n)
        }
    }

    #[test]
    fn rule_record_parse_splits_on_first_space() {
        let rec = RuleRecord::parse("(ab)c repl");
        assert_eq!(rec.pattern, "(ab)c");
        assert_eq!(rec.replacement.as_deref(), Some("repl"));
    }

    #[test]
    fn rule_record_parse_without_replacement() {
        let rec = RuleRecord::parse("(ab)c");
        assert_eq!(rec.pattern, "(ab)c");
        assert_eq!(rec.replacement, None);
    }

    #[test]
    fn general_rule_inserts_stress_after_group_one() {
        let mut program = RuleProgram::new(VecStore::default(), RuleKind::General);
        program.insert(0, r"^(ab)c$").unwrap();
        let guess = program.match_general("abc").unwrap();
        assert_eq!(guess.as_deref(), Some("ab+c"));
    }

    #[test]
    fn lexical_class_scan_resumes_past_matched_rule() {
        let mut program = RuleProgram::new(VecStore::default(), RuleKind::LexicalClass);
        program.insert(0, r"^(xy)z$").unwrap();
        program.insert(0, r"^(xy)w$ q").unwrap();
        let first = program.classify_scan("xyz", 1).unwrap();
        assert_eq!(first, Some((1, "xy".to_string())));
        let none_left = program.classify_scan("xyz", 2).unwrap();
        assert_eq!(none_left, None);

        let second = program.classify_scan("xyw", 1).unwrap();
        assert_eq!(second, Some((2, "xyq".to_string())));
    }

    #[test]
    fn corrector_applies_every_matching_rule_in_order() {
        let mut program = RuleProgram::new(VecStore::default(), RuleKind::Corrector);
        program.insert(0, "(a)t 1x").unwrap();
        program.insert(0, "(x) 0z").unwrap();
        let mut s = "cat".to_string();
        program.apply_correctors(&mut s).unwrap();
        // rule 1: "at" -> group(1)="a" + "x" = "ax", giving "cax"
        // rule 2: "x" -> group(0)="x" + "z" = "xz", giving "caxz"
        assert_eq!(s, "caxz");
    }

    #[test]
    fn editing_a_realized_program_is_rejected() {
        let mut program = RuleProgram::new(VecStore::default(), RuleKind::General);
        program.insert(0, r"^(a)$").unwrap();
        program.count().unwrap();
        assert_eq!(program.insert(0, r"^(b)$"), Err(LexError::Access));
    }
}
