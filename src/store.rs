//! Persistence adapter: the abstract ordered-key and record-number store
//! contracts the engine is written against, concrete `redb`-backed
//! implementations, and an in-memory scratch store used during bulk build.
//!
//! Cursors are not held open across calls — a redb `Range` borrows its
//! transaction, so keeping one alive between `seq` calls would pin a
//! read transaction for the life of the handle. Instead the caller (the
//! engine) remembers only the last key it visited and re-queries the table
//! for "the record after/before this key" on every call.
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::LexError;

/// Direction for sequential access over an ordered dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqDirection {
    /// Position at the first record.
    First,
    /// Advance from the current cursor position.
    Next,
    /// Retreat from the current cursor position.
    Prev,
    /// Position at the last record.
    Last,
}

/// The named `redb` tables backing the two dictionaries and the
/// three-to-four rule programs (§6).
pub const LEXBASES_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("Lexbases");
/// Exception dictionary table.
pub const EXCEPTIONS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("Exceptions");
/// General (stress-guessing) rule program table.
pub const GENERAL_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("General");
/// Lexical-class (base-extraction) rule program table.
pub const LEXCLASSES_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("Lexclasses");
/// Corrector rule program table.
pub const CORRECTIONS_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("Corrections");
/// Optional prefix rule program table.
pub const PREFIXES_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("Prefixes");

/// Abstract contract over a lexicographically ordered key-value dataset
/// (the two dictionaries).
pub trait OrderedStore {
    /// Looks up `key`, returning its stored value if present.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LexError>;
    /// Stores `value` under `key`. Returns `true` if the write happened
    /// (the key was absent, or it was present and `overwrite` was set),
    /// `false` if the key already existed and `overwrite` was not set (the
    /// store is left unchanged).
    fn put(&mut self, key: &[u8], value: &[u8], overwrite: bool) -> Result<bool, LexError>;
    /// Removes `key`, returning whether a record existed to remove.
    fn delete(&mut self, key: &[u8]) -> Result<bool, LexError>;
    /// Removes every record, returning how many were removed.
    fn truncate(&mut self) -> Result<u64, LexError>;
    /// The first record in ascending key order.
    fn first(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError>;
    /// The last record in ascending key order.
    fn last(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError>;
    /// The record immediately after `key`, if any.
    fn next_after(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError>;
    /// The record immediately before `key`, if any.
    fn prev_before(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError>;
}

/// Abstract contract over a dense, 1-based record-number dataset (the rule
/// programs).
pub trait RecnoStore {
    /// Number of records currently stored.
    fn count(&self) -> Result<u32, LexError>;
    /// Fetches record `n` (1-based).
    fn get(&self, n: u32) -> Result<Option<Vec<u8>>, LexError>;
    /// Appends a new record after the last one, returning its number.
    fn append(&mut self, value: &[u8]) -> Result<u32, LexError>;
    /// Inserts `value` at position `n` (1-based, must be `<= count() + 1`),
    /// shifting records at or after `n` up by one.
    fn insert_at(&mut self, n: u32, value: &[u8]) -> Result<(), LexError>;
    /// Removes record `n`, shifting later records down by one. Returns
    /// whether a record existed at `n`.
    fn delete_at(&mut self, n: u32) -> Result<bool, LexError>;
    /// Removes every record, returning how many were removed.
    fn truncate(&mut self) -> Result<u32, LexError>;
}

fn map_table_missing<T>(result: Result<T, redb::TableError>) -> Result<Option<T>, LexError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A `redb`-backed [`OrderedStore`] over one named table.
pub struct RedbOrderedStore {
    db: Arc<Database>,
    table: TableDefinition<'static, &'static [u8], &'static [u8]>,
}

impl RedbOrderedStore {
    /// Wraps `table` of `db` as an [`OrderedStore`]. The table is created
    /// lazily on first write; reads against a table that was never created
    /// behave as if it were empty.
    pub fn new(
        db: Arc<Database>,
        table: TableDefinition<'static, &'static [u8], &'static [u8]>,
    ) -> Self {
        Self { db, table }
    }
}

impl OrderedStore for RedbOrderedStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LexError> {
        let txn = self.db.begin_read()?;
        let table = map_table_missing(txn.open_table(self.table))?;
        let Some(table) = table else { return Ok(None) };
        Ok(table.get(key)?.map(|v| v.value().to_vec()))
    }

    fn put(&mut self, key: &[u8], value: &[u8], overwrite: bool) -> Result<bool, LexError> {
        let txn = self.db.begin_write()?;
        let stored;
        {
            let mut table = txn.open_table(self.table)?;
            let existed = table.get(key)?.is_some();
            stored = !existed || overwrite;
            if stored {
                table.insert(key, value)?;
            }
        }
        txn.commit()?;
        Ok(stored)
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool, LexError> {
        let txn = self.db.begin_write()?;
        let existed;
        {
            let mut table = txn.open_table(self.table)?;
            existed = table.remove(key)?.is_some();
        }
        txn.commit()?;
        Ok(existed)
    }

    fn truncate(&mut self) -> Result<u64, LexError> {
        let txn = self.db.begin_write()?;
        let n;
        {
            let mut table = txn.open_table(self.table)?;
            let keys: Vec<Vec<u8>> = table
                .iter()?
                .map(|r| r.map(|(k, _)| k.value().to_vec()))
                .collect::<Result<_, _>>()?;
            n = keys.len() as u64;
            for k in keys {
                table.remove(k.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(n)
    }

    fn first(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        let txn = self.db.begin_read()?;
        let table = map_table_missing(txn.open_table(self.table))?;
        let Some(table) = table else { return Ok(None) };
        match table.iter()?.next() {
            Some(r) => {
                let (k, v) = r?;
                Ok(Some((k.value().to_vec(), v.value().to_vec())))
            }
            None => Ok(None),
        }
    }

    fn last(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        let txn = self.db.begin_read()?;
        let table = map_table_missing(txn.open_table(self.table))?;
        let Some(table) = table else { return Ok(None) };
        match table.iter()?.next_back() {
            Some(r) => {
                let (k, v) = r?;
                Ok(Some((k.value().to_vec(), v.value().to_vec())))
            }
            None => Ok(None),
        }
    }

    fn next_after(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        let txn = self.db.begin_read()?;
        let table = map_table_missing(txn.open_table(self.table))?;
        let Some(table) = table else { return Ok(None) };
        let start = key.to_vec();
        let mut range = table.range(start.as_slice()..)?;
        for r in &mut range {
            let (k, v) = r?;
            if k.value() != key {
                return Ok(Some((k.value().to_vec(), v.value().to_vec())));
            }
        }
        Ok(None)
    }

    fn prev_before(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        let txn = self.db.begin_read()?;
        let table = map_table_missing(txn.open_table(self.table))?;
        let Some(table) = table else { return Ok(None) };
        let end = key.to_vec();
        let mut range = table.range(..end.as_slice())?;
        match range.next_back() {
            Some(r) => {
                let (k, v) = r?;
                Ok(Some((k.value().to_vec(), v.value().to_vec())))
            }
            None => Ok(None),
        }
    }
}

/// A `redb`-backed [`RecnoStore`] over one named table, keyed by a dense
/// 1-based `u32` record number.
pub struct RedbRecnoStore {
    db: Arc<Database>,
    table: TableDefinition<'static, u32, &'static [u8]>,
}

impl RedbRecnoStore {
    /// Wraps `table` of `db` as a [`RecnoStore`].
    pub fn new(db: Arc<Database>, table: TableDefinition<'static, u32, &'static [u8]>) -> Self {
        Self { db, table }
    }
}

impl RecnoStore for RedbRecnoStore {
    fn count(&self) -> Result<u32, LexError> {
        let txn = self.db.begin_read()?;
        let table = map_table_missing(txn.open_table(self.table))?;
        match table {
            Some(t) => Ok(t.len()? as u32),
            None => Ok(0),
        }
    }

    fn get(&self, n: u32) -> Result<Option<Vec<u8>>, LexError> {
        let txn = self.db.begin_read()?;
        let table = map_table_missing(txn.open_table(self.table))?;
        let Some(table) = table else { return Ok(None) };
        Ok(table.get(n)?.map(|v| v.value().to_vec()))
    }

    fn append(&mut self, value: &[u8]) -> Result<u32, LexError> {
        let txn = self.db.begin_write()?;
        let n;
        {
            let mut table = txn.open_table(self.table)?;
            n = table.len()? as u32 + 1;
            table.insert(n, value)?;
        }
        txn.commit()?;
        Ok(n)
    }

    fn insert_at(&mut self, n: u32, value: &[u8]) -> Result<(), LexError> {
        if n == 0 {
            return Err(LexError::Parameter);
        }
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(self.table)?;
            let count = table.len()? as u32;
            if n > count + 1 {
                return Err(LexError::Parameter);
            }
            let mut i = count;
            while i >= n {
                if let Some(v) = table.get(i)? {
                    let moved = v.value().to_vec();
                    drop(v);
                    table.insert(i + 1, moved.as_slice())?;
                }
                if i == 0 {
                    break;
                }
                i -= 1;
            }
            table.insert(n, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete_at(&mut self, n: u32) -> Result<bool, LexError> {
        let txn = self.db.begin_write()?;
        let existed;
        {
            let mut table = txn.open_table(self.table)?;
            let count = table.len()? as u32;
            existed = table.get(n)?.is_some();
            if existed {
                table.remove(n)?;
                for i in (n + 1)..=count {
                    if let Some(v) = table.get(i)? {
                        let moved = v.value().to_vec();
                        drop(v);
                        table.insert(i - 1, moved.as_slice())?;
                        table.remove(i)?;
                    }
                }
            }
        }
        txn.commit()?;
        Ok(existed)
    }

    fn truncate(&mut self) -> Result<u32, LexError> {
        let txn = self.db.begin_write()?;
        let n;
        {
            let mut table = txn.open_table(self.table)?;
            let keys: Vec<u32> = table
                .iter()?
                .map(|r| r.map(|(k, _)| k.value()))
                .collect::<Result<_, _>>()?;
            n = keys.len() as u32;
            for k in keys {
                table.remove(k)?;
            }
        }
        txn.commit()?;
        Ok(n)
    }
}

/// In-memory [`OrderedStore`] backed by a `BTreeMap`, whose iteration is
/// already key-sorted. Used to accumulate a dictionary during bulk build,
/// then dumped into a [`RedbOrderedStore`] on close so the real table is
/// built from pre-sorted input rather than one random-order insert at a
/// time.
#[derive(Debug, Default)]
pub struct ScratchStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ScratchStore {
    /// An empty scratch store.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Iterates entries in the ascending key order they will be dumped in.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.map.iter()
    }
}

impl OrderedStore for ScratchStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, LexError> {
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8], overwrite: bool) -> Result<bool, LexError> {
        if self.map.contains_key(key) && !overwrite {
            return Ok(false);
        }
        self.map.insert(key.to_vec(), value.to_vec());
        Ok(true)
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool, LexError> {
        Ok(self.map.remove(key).is_some())
    }

    fn truncate(&mut self) -> Result<u64, LexError> {
        let n = self.map.len() as u64;
        self.map.clear();
        Ok(n)
    }

    fn first(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        Ok(self.map.iter().next().map(|(k, v)| (k.clone(), v.clone())))
    }

    fn last(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        Ok(self
            .map
            .iter()
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn next_after(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        Ok(self
            .map
            .range((Bound::Excluded(key.to_vec()), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn prev_before(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>, LexError> {
        Ok(self
            .map
            .range((Bound::Unbounded, Bound::Excluded(key.to_vec())))
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone())))
    }
}
