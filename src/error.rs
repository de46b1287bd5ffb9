use core::str::Utf8Error;

use thiserror::Error;

use crate::SectorKind;

/// Errors that can occur while locating, decoding, editing or injecting a
/// firmware sector. Lenient checks (checksum, WAV trailer, audio parameters)
/// are not errors; they are reported through [`crate::Diagnostics`].
#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The sector magic was not found in the image, or the bytes handed to a
    /// decoder do not start with it.
    #[error("{0} magic not found")]
    NotFound(SectorKind),

    /// The declared or implied size exceeds the available bytes.
    #[error("truncated data: expected {expected} bytes, got {actual} bytes")]
    Truncated { expected: usize, actual: usize },

    /// A name field holds bytes that are not valid UTF-8.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(#[from] Utf8Error),

    /// The pairing database did not contain a single valid entry.
    #[error("no valid entries were read")]
    Empty,

    #[error("cannot assign {field} = {value}: not in the accepted range {accepted}")]
    OutOfRange {
        field: &'static str,
        value: String,
        accepted: String,
    },

    #[error("cannot assign {field} = {value}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The field exists but its type cannot be assigned from text.
    #[error("field {0} cannot be assigned")]
    UnsupportedType(&'static str),

    #[error("unknown field {field}, available fields: {available}")]
    UnknownField { field: String, available: String },

    /// An entry index does not address an existing slot.
    #[error("invalid index {index} for a list of {len} entries")]
    InvalidIndex { index: usize, len: usize },

    #[error("too many entries for an SFX blob: {count} > {max}")]
    TooManyEntries { count: usize, max: usize },

    /// An SFX entry would start beyond the 32-bit offset range of a
    /// descriptor.
    #[error("SFX entry offset {offset:#x} does not fit in 32 bits")]
    OffsetOutOfRange { offset: usize },

    /// The re-encoded sector is bigger than the region it replaces.
    #[error(
        "modified sector is bigger than the original ({new_size} vs {old_size} bytes), refusing to overwrite the next region"
    )]
    Overflow { new_size: usize, old_size: usize },

    #[error("invalid WAV file: {0}")]
    InvalidWav(String),
}
