use crate::encryption::DecryptionError;
use thiserror::Error;

/// Everything that can go wrong while reading, validating, or writing a document.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("missing or unrecognized %PDF- header")]
    Header,

    #[error("cross-reference table error: {0}")]
    Xref(#[from] XrefError),

    #[error("parse error at offset {offset}: expected {expected}, found {got}")]
    Parse {
        offset: usize,
        expected: &'static str,
        got: String,
    },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("validation failed at {path}: {rule}")]
    Validation { path: String, rule: String },

    #[error("filter {filter} failed to decode: {cause}")]
    Filter { filter: &'static str, cause: String },

    #[error(transparent)]
    Encryption(#[from] DecryptionError),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    #[error("object {0:?} not found")]
    ObjectNotFound(crate::object::ObjectId),

    #[error("dictionary has no entry {0:?}")]
    DictKey(String),

    #[error("document is not encrypted")]
    NotEncrypted,
}

#[derive(Error, Debug)]
pub enum XrefError {
    #[error("could not locate startxref")]
    Start,
    #[error("could not parse xref section")]
    Parse,
    #[error("/Prev offset out of bounds")]
    PrevStart,
    #[error("/XRefStm offset out of bounds")]
    StreamStart,
    #[error("cycle detected while following /Prev chain")]
    Cycle,
}

pub type Result<T> = std::result::Result<T, Error>;
