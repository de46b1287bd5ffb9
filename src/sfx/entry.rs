use core::fmt;

use super::wav::PcmAudio;
use crate::diag::{Diagnostics, Warning};
use crate::error::Error;

/// Payload size granularity.
pub const CHUNK_SIZE: usize = 0x100;
/// Size of one descriptor in the header table.
pub const DESCRIPTOR_SIZE: usize = 8;
/// Metadata block following the samples of a WAV entry.
pub const WAV_TRAILER_SIZE: usize = 0x100;
pub const TRAILER_MAGIC: &[u8; 4] = b"WAV\0";

/// Samples of 8-bit entries are stored unsigned-offset.
const SAMPLE_XOR_8BIT: u8 = 0x80;

/// One slot of the header table: `{offset: u32, size: u16, samplerate: u16}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Descriptor {
    /// Absolute position of the payload inside the blob.
    pub offset: u32,
    /// Payload size in [`CHUNK_SIZE`] units, excluding the WAV trailer.
    pub size: u16,
    /// Sample rate in Hz; zero for MP3 entries.
    pub samplerate: u16,
}

impl Descriptor {
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self {
            offset: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            size: u16::from_le_bytes([raw[4], raw[5]]),
            samplerate: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_SIZE] {
        let mut raw = [0u8; DESCRIPTOR_SIZE];
        raw[..4].copy_from_slice(&self.offset.to_le_bytes());
        raw[4..6].copy_from_slice(&self.size.to_le_bytes());
        raw[6..].copy_from_slice(&self.samplerate.to_le_bytes());
        raw
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0 && self.size == 0 && self.samplerate == 0
    }

    /// Bytes covered by the sample data alone.
    pub fn payload_len(&self) -> usize {
        usize::from(self.size) * CHUNK_SIZE
    }
}

/// MP3 data, stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mp3Entry {
    pub offset: u32,
    pub size: u16,
    pub contents: Vec<u8>,
}

/// Parameters recorded in the 256-byte trailer of a WAV entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavTrailer {
    pub samplerate_khz: u8,
    pub resolution_bits: u8,
}

impl WavTrailer {
    pub fn to_bytes(&self) -> [u8; WAV_TRAILER_SIZE] {
        let mut raw = [0u8; WAV_TRAILER_SIZE];
        raw[..4].copy_from_slice(TRAILER_MAGIC);
        raw[4] = self.samplerate_khz;
        raw[5] = self.resolution_bits;
        raw
    }

    fn xor_mask(&self) -> u8 {
        if self.resolution_bits == 8 {
            SAMPLE_XOR_8BIT
        } else {
            0
        }
    }
}

/// Raw PCM samples plus the firmware trailer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WavEntry {
    pub offset: u32,
    pub size: u16,
    /// Sample rate in Hz as stored in the descriptor.
    pub samplerate: u16,
    /// `None` when the blob did not carry a valid trailer. `contents` then
    /// holds the whole span, trailer area included.
    pub trailer: Option<WavTrailer>,
    /// Sample bytes as the firmware stores them (8-bit samples already
    /// XORed with `0x80`), padded to [`CHUNK_SIZE`].
    pub contents: Vec<u8>,
}

/// An SFX entry in one of the two payload formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SfxEntry {
    Mp3(Mp3Entry),
    Wav(WavEntry),
}

impl SfxEntry {
    /// Pick the variant for a decoded descriptor: a zero sample rate means MP3.
    pub fn from_descriptor(descriptor: Descriptor) -> Self {
        if descriptor.samplerate == 0 {
            Self::Mp3(Mp3Entry {
                offset: descriptor.offset,
                size: descriptor.size,
                contents: Vec::new(),
            })
        } else {
            Self::Wav(WavEntry {
                offset: descriptor.offset,
                size: descriptor.size,
                samplerate: descriptor.samplerate,
                trailer: None,
                contents: Vec::new(),
            })
        }
    }

    /// Pick the variant for an input file: `.mp3` means MP3, anything else WAV.
    pub fn for_file_name(name: &str) -> Self {
        if name.to_ascii_lowercase().ends_with(".mp3") {
            Self::Mp3(Mp3Entry::default())
        } else {
            Self::Wav(WavEntry::default())
        }
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Mp3(_) => "MP3",
            Self::Wav(_) => "WAV",
        }
    }

    pub fn offset(&self) -> u32 {
        match self {
            Self::Mp3(e) => e.offset,
            Self::Wav(e) => e.offset,
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        match self {
            Self::Mp3(e) => Descriptor {
                offset: e.offset,
                size: e.size,
                samplerate: 0,
            },
            Self::Wav(e) => Descriptor {
                offset: e.offset,
                size: e.size,
                samplerate: e.samplerate,
            },
        }
    }

    /// Bytes the entry occupies in the blob, trailer included.
    pub fn total_size(&self) -> usize {
        match self {
            Self::Mp3(e) => usize::from(e.size) * CHUNK_SIZE,
            Self::Wav(e) => usize::from(e.size) * CHUNK_SIZE + WAV_TRAILER_SIZE,
        }
    }

    /// Descriptor bytes and payload bytes for inclusion in a blob.
    pub fn export_to_blob(&self) -> ([u8; DESCRIPTOR_SIZE], Vec<u8>) {
        let payload = match self {
            Self::Mp3(e) => e.contents.clone(),
            Self::Wav(e) => {
                let mut payload = e.contents.clone();
                if let Some(trailer) = e.trailer {
                    payload.extend_from_slice(&trailer.to_bytes());
                }
                payload
            }
        };
        (self.descriptor().to_bytes(), payload)
    }

    /// Load the payload from the entry's span inside the blob.
    pub fn import_from_blob(&mut self, span: &[u8], diag: &mut Diagnostics) {
        match self {
            Self::Mp3(e) => e.contents = span.to_vec(),
            Self::Wav(e) => {
                let split = span.len().saturating_sub(WAV_TRAILER_SIZE);
                let trailer = &span[split..];
                if !trailer.starts_with(TRAILER_MAGIC) {
                    let mut found = [0u8; 4];
                    let n = trailer.len().min(4);
                    found[..n].copy_from_slice(&trailer[..n]);
                    diag.warn(Warning::MissingWavTrailer {
                        offset: e.offset,
                        found,
                    });
                    e.trailer = None;
                    e.contents = span.to_vec();
                    return;
                }
                e.trailer = Some(WavTrailer {
                    samplerate_khz: trailer[4],
                    resolution_bits: trailer[5],
                });
                e.contents = span[..split].to_vec();
            }
        }
    }

    /// Standalone audio file bytes: the MP3 data as is, or a mono WAV file
    /// with the sample transform undone.
    pub fn export_to_file(&self, diag: &mut Diagnostics) -> Vec<u8> {
        match self {
            Self::Mp3(e) => e.contents.clone(),
            Self::Wav(e) => {
                let trailer = e.trailer.unwrap_or_else(|| {
                    diag.warn(Warning::WavTrailerFallback { offset: e.offset });
                    WavTrailer {
                        samplerate_khz: (e.samplerate / 1000) as u8,
                        resolution_bits: 8,
                    }
                });
                let xor = trailer.xor_mask();
                PcmAudio {
                    channels: 1,
                    sample_rate: u32::from(trailer.samplerate_khz) * 1000,
                    sample_width: u16::from(trailer.resolution_bits / 8).max(1),
                    frames: e.contents.iter().map(|b| b ^ xor).collect(),
                }
                .to_bytes()
            }
        }
    }

    /// Build the entry from a standalone file, placing it at `offset`.
    pub fn import_from_file(
        &mut self,
        offset: u32,
        data: &[u8],
        diag: &mut Diagnostics,
    ) -> Result<(), Error> {
        match self {
            Self::Mp3(e) => {
                e.offset = offset;
                e.contents = pad_to_chunk(data.to_vec());
                e.size = chunk_count(e.contents.len())?;
            }
            Self::Wav(e) => {
                let audio = PcmAudio::parse(data)?;
                if audio.channels != 1 {
                    diag.warn(Warning::NotMono {
                        channels: audio.channels,
                    });
                }

                let bits = audio.sample_width * 8;
                match bits {
                    8 => {}
                    16 => diag.warn(Warning::NewerFirmwareRequired("16-bit WAV")),
                    _ => diag.warn(Warning::UnsupportedResolution { bits }),
                }

                let khz = audio.sample_rate / 1000;
                match khz {
                    8 => {}
                    16 | 32 => diag.warn(Warning::NewerFirmwareRequired("16/32 kHz samplerate")),
                    _ => diag.warn(Warning::UnsupportedSampleRate { khz }),
                }

                let trailer = WavTrailer {
                    samplerate_khz: u8::try_from(khz).map_err(|_| {
                        Error::InvalidWav(format!("samplerate {} Hz is too high", audio.sample_rate))
                    })?,
                    resolution_bits: u8::try_from(bits)
                        .map_err(|_| Error::InvalidWav(format!("{bits}-bit samples")))?,
                };
                let xor = trailer.xor_mask();

                e.offset = offset;
                e.samplerate = u16::try_from(audio.sample_rate).map_err(|_| {
                    Error::InvalidWav(format!("samplerate {} Hz is too high", audio.sample_rate))
                })?;
                e.trailer = Some(trailer);
                e.contents = pad_to_chunk(audio.frames.iter().map(|b| b ^ xor).collect());
                e.size = chunk_count(e.contents.len())?;
            }
        }
        Ok(())
    }
}

fn pad_to_chunk(mut data: Vec<u8>) -> Vec<u8> {
    let padded = data.len().div_ceil(CHUNK_SIZE) * CHUNK_SIZE;
    data.resize(padded, 0);
    data
}

fn chunk_count(len: usize) -> Result<u16, Error> {
    u16::try_from(len / CHUNK_SIZE).map_err(|_| {
        Error::InvalidWav(format!("{len} bytes do not fit in a single SFX entry"))
    })
}

impl fmt::Display for SfxEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.offset() as usize;
        let end = start + self.total_size();
        writeln!(f, "{:<15}{start}-{end} (relative to SFX blob)", "Offset: ")?;
        match self {
            Self::Mp3(_) => {
                writeln!(f, "{:<15}{} bytes", "Size: ", self.total_size())?;
                write!(f, "{:<15}{}", "Format: ", self.format_name())
            }
            Self::Wav(e) => {
                writeln!(
                    f,
                    "{:<15}{} bytes (just the raw audio data)",
                    "Size: ",
                    usize::from(e.size) * CHUNK_SIZE
                )?;
                writeln!(
                    f,
                    "{:<15}{} bytes (including the WAV trailer)",
                    "Size: ",
                    self.total_size()
                )?;
                writeln!(f, "{:<15}{}", "Format: ", self.format_name())?;
                writeln!(f, "{:<15}{} Hz", "Samplerate: ", e.samplerate)?;
                match e.trailer {
                    Some(t) => write!(f, "{:<15}{}-bit", "Resolution: ", t.resolution_bits),
                    None => write!(f, "{:<15}unknown (no trailer)", "Resolution: "),
                }
            }
        }
    }
}
