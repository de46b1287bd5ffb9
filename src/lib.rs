//! Locate, decode, edit and re-inject the configuration sectors of AppoTech
//! Bluetooth speaker firmware images.
//!
//! Three sectors are supported:
//!
//! - [`BtInfoRecord`]: the fixed-size `BTINF` configuration record.
//! - [`BtPairingDatabase`]: the `BTPAIREDINFOHEAD` list of paired devices.
//! - [`SfxBlob`]: the table of MP3/WAV sound effects.
//!
//! Every sector is found inside an opaque image by [`Sector::locate`],
//! decoded into an owned value, edited, re-encoded and spliced back with
//! [`inject`] without touching the bytes around it.

pub mod btinfo;
pub mod btpairing;
pub mod diag;
pub mod error;
pub mod field;
pub mod inject;
pub mod locate;
pub mod sfx;

pub use btinfo::BtInfoRecord;
pub use btpairing::{BtPairingDatabase, PairingEntry};
pub use diag::{Diagnostics, Warning};
pub use error::Error;
pub use inject::inject;
pub use sfx::{SfxBlob, SfxEntry, SourceFile};

/// The sector types this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SectorKind {
    #[strum(to_string = "BTINF")]
    BtInfo,
    #[strum(to_string = "BTPAIREDINFOHEAD")]
    BtPairing,
    #[strum(to_string = "SFX blob")]
    SfxBlob,
}

/// Where a sector was found in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLocation {
    /// Byte offset of the sector magic inside the image.
    pub offset: usize,
    /// Number of bytes the decoded sector occupies.
    pub region_length: usize,
}

impl SectorLocation {
    pub fn end(&self) -> usize {
        self.offset + self.region_length
    }
}

/// A structured region embedded in a firmware image.
pub trait Sector: Sized {
    const KIND: SectorKind;

    /// Find the offset of the sector inside `image`.
    fn locate(image: &[u8]) -> Result<usize, Error>;

    /// Decode the sector from bytes starting at its magic. Trailing bytes
    /// beyond the sector are ignored.
    fn decode(data: &[u8], diag: &mut Diagnostics) -> Result<Self, Error>;

    fn encode(&self) -> Vec<u8>;

    /// Length of [`Sector::encode`] without building it.
    fn encoded_len(&self) -> usize;
}

/// A sector decoded from an image together with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub sector: T,
    pub location: SectorLocation,
}

/// Locate and decode `T` inside `image`.
pub fn load<T: Sector>(image: &[u8], diag: &mut Diagnostics) -> Result<Loaded<T>, Error> {
    let offset = T::locate(image)?;
    load_at(image, offset, diag)
}

/// Decode `T` at a caller-chosen `offset`, bypassing [`Sector::locate`].
pub fn load_at<T: Sector>(
    image: &[u8],
    offset: usize,
    diag: &mut Diagnostics,
) -> Result<Loaded<T>, Error> {
    let data = image.get(offset..).ok_or(Error::Truncated {
        expected: offset,
        actual: image.len(),
    })?;
    let sector = T::decode(data, diag)?;
    let region_length = sector.encoded_len();
    tracing::debug!(
        "{} found at {offset:#x}, {region_length} bytes",
        T::KIND
    );
    Ok(Loaded {
        sector,
        location: SectorLocation {
            offset,
            region_length,
        },
    })
}
