//! The SFX blob: a fixed 0x800-byte descriptor table followed by the
//! MP3/WAV payloads it describes.

mod entry;
pub mod wav;

use core::fmt;
use std::path::PathBuf;

pub use entry::{
    Descriptor,
    Mp3Entry,
    SfxEntry,
    WavEntry,
    WavTrailer,
    CHUNK_SIZE,
    DESCRIPTOR_SIZE,
    TRAILER_MAGIC,
    WAV_TRAILER_SIZE,
};

use crate::diag::Diagnostics;
use crate::error::Error;
use crate::locate::find_by_zero_density;
use crate::{Sector, SectorKind};

/// The first descriptor of a real blob points right behind the table, so
/// the blob starts with `0x800` as a little-endian `u32`.
pub const MAGIC: &[u8; 4] = b"\x00\x08\x00\x00";
pub const HDR_SIZE: usize = 0x800;
pub const MAX_ENTRIES: usize = HDR_SIZE / DESCRIPTOR_SIZE;

/// An audio file handed in by the caller for [`SfxBlob::build_from_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfxBlob {
    pub entries: Vec<SfxEntry>,
}

impl SfxBlob {
    /// Lay out `files` contiguously after the descriptor table, in the given
    /// order. Callers sort the list beforehand.
    pub fn build_from_files(files: &[SourceFile], diag: &mut Diagnostics) -> Result<Self, Error> {
        if files.len() > MAX_ENTRIES {
            return Err(Error::TooManyEntries {
                count: files.len(),
                max: MAX_ENTRIES,
            });
        }

        let mut entries = Vec::with_capacity(files.len());
        let mut cursor = HDR_SIZE;
        for file in files {
            tracing::debug!("processing {}", file.path.display());
            let name = file.path.to_string_lossy();
            let mut entry = SfxEntry::for_file_name(&name);
            let offset = descriptor_offset(cursor)?;
            entry.import_from_file(offset, &file.data, diag)?;
            cursor += entry.total_size();
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    /// Header plus every entry span.
    pub fn total_size(&self) -> usize {
        HDR_SIZE + self.entries.iter().map(SfxEntry::total_size).sum::<usize>()
    }
}

fn descriptor_offset(cursor: usize) -> Result<u32, Error> {
    u32::try_from(cursor).map_err(|_| Error::OffsetOutOfRange { offset: cursor })
}

impl Sector for SfxBlob {
    const KIND: SectorKind = SectorKind::SfxBlob;

    fn locate(image: &[u8]) -> Result<usize, Error> {
        find_by_zero_density(image, MAGIC, HDR_SIZE, Self::KIND)
    }

    fn decode(data: &[u8], diag: &mut Diagnostics) -> Result<Self, Error> {
        if data.len() < HDR_SIZE {
            return Err(Error::Truncated {
                expected: HDR_SIZE,
                actual: data.len(),
            });
        }

        let mut entries: Vec<SfxEntry> = data[..HDR_SIZE]
            .chunks_exact(DESCRIPTOR_SIZE)
            .map(Descriptor::from_bytes)
            .take_while(|d| !d.is_empty())
            .map(SfxEntry::from_descriptor)
            .collect();
        tracing::debug!("read {} descriptors", entries.len());

        for entry in &mut entries {
            let start = entry.offset() as usize;
            let end = start + entry.total_size();
            if data.len() < end {
                return Err(Error::Truncated {
                    expected: end,
                    actual: data.len(),
                });
            }
            entry.import_from_blob(&data[start..end], diag);
        }

        Ok(Self { entries })
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.encoded_len()];

        for (slot, entry) in self.entries.iter().enumerate().take(MAX_ENTRIES) {
            let (descriptor, payload) = entry.export_to_blob();
            let at = slot * DESCRIPTOR_SIZE;
            out[at..at + DESCRIPTOR_SIZE].copy_from_slice(&descriptor);

            let start = entry.offset() as usize;
            let end = (start + payload.len()).min(out.len());
            out[start..end].copy_from_slice(&payload[..end - start]);
        }
        out
    }

    /// At least [`SfxBlob::total_size`]; more if decoded offsets leave gaps.
    fn encoded_len(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.offset() as usize + e.total_size())
            .fold(self.total_size(), usize::max)
    }
}

impl fmt::Display for SfxBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = "------------------------------";
        writeln!(f, "{:<15}{}", "Entries: ", self.entries.len())?;
        writeln!(f, "{:<15}{} bytes", "Size: ", self.encoded_len())?;
        write!(f, "{sep}")?;
        for (idx, entry) in self.entries.iter().enumerate() {
            write!(f, "\nEntry #{idx}\n{entry}\n{sep}")?;
        }
        Ok(())
    }
}
