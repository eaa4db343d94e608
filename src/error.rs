//! Error taxonomy shared across the crate.
use displaydoc::Display;

/// A packed key failed validation during encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, Display)]
pub enum KeyCodecError {
    /// the input contains a byte that is not in the alphabet
    NotInAlphabet,
    /// the first letter of the key is forbidden (member of G3)
    ForbiddenInitial,
    /// an adjacent letter pair is illegal
    IllegalAdjacency,
    /// the output buffer is too small to hold the unpacked key
    BufferTooSmall,
}

/// A surface form or key pair failed validation during diff encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, Display)]
pub enum DiffCodecError {
    /// the surface form starts with a forbidden byte (member of G4)
    ForbiddenInitial,
    /// an adjacent letter pair is illegal
    IllegalAdjacency,
    /// the surface form contains a byte that is neither a letter nor a marker
    InvalidByte,
    /// a stress or space-bar marker appears in an illegal position
    MisplacedMarker,
}

/// Top-level error type surfaced by [`crate::engine::LexiconEngine`] and the
/// rule engine, modeling the error kinds of the original interface:
/// `Failure`, `InvalidKey`, `InvalidRecord`, `Parameter`, `Access`,
/// `OutOfMemory`. `Success` and plain absence are represented as `Ok(_)` /
/// `Ok(None)` rather than as variants here; see [`LexError::NotFound`] for
/// the cases where "nothing found" must still be distinguishable from
/// "the call itself failed".
#[derive(Debug, thiserror::Error, Display)]
pub enum LexError {
    /// key is invalid: {0}
    InvalidKey(#[from] KeyCodecError),
    /// record is invalid: {0}
    InvalidRecord(#[from] DiffCodecError),
    /// no record for the given key or cursor position
    NotFound,
    /// a record with this key already exists
    Duplicate,
    /// operation not permitted for the selected target or ruleset
    Parameter,
    /// handle mode does not permit this operation, or a required cursor is uninitialized
    Access,
    /// a value exceeds a configured size limit
    OutOfMemory,
    /// unrecoverable internal error: {0}
    Failure(String),
    /// underlying store database failure: {0}
    Database(#[from] redb::DatabaseError),
    /// underlying store failure: {0}
    Store(#[from] redb::Error),
    /// underlying store transaction failure: {0}
    Transaction(#[from] redb::TransactionError),
    /// underlying store table failure: {0}
    Table(#[from] redb::TableError),
    /// underlying store storage failure: {0}
    Storage(#[from] redb::StorageError),
    /// underlying store commit failure: {0}
    Commit(#[from] redb::CommitError),
    /// underlying I/O failure: {0}
    Io(#[from] std::io::Error),
}

pub type LexResult<T> = Result<T, LexError>;
