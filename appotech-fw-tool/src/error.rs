use std::path::PathBuf;

use thiserror::Error;

/// Errors of the file-level tooling around the firmware codecs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Firmware(#[from] appotech_fw::Error),

    #[error("wrote {actual} of {expected} bytes to {}", path.display())]
    PartialWrite {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}
