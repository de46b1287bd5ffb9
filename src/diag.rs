use core::fmt;

/// A condition that was detected while processing a sector but deliberately
/// not treated as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The stored BTINF checksum does not match the sum of the record bytes.
    ChecksumMismatch { stored: u16, computed: u16 },
    /// A WAV entry in the SFX blob does not end with a `WAV\0` trailer.
    MissingWavTrailer { offset: u32, found: [u8; 4] },
    /// A WAV entry without trailer was exported with guessed parameters.
    WavTrailerFallback { offset: u32 },
    NotMono { channels: u16 },
    UnsupportedResolution { bits: u16 },
    UnsupportedSampleRate { khz: u32 },
    /// The parameter works only with newer firmware releases.
    NewerFirmwareRequired(&'static str),
    /// A field is populated but the flag that enables it is clear.
    FieldIgnored(&'static str),
    /// `paired_idx` points past the last pairing entry.
    PairedIndexBeyondEntries { paired_idx: u8, entries: usize },
    /// A smaller sector was padded with `0xFF` to fill its region.
    InjectionPadded { padding: usize },
    /// A forced injection was cut short to keep the image size unchanged.
    InjectionTruncated { excess: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch { stored, computed } => write!(
                f,
                "invalid checksum: expected {computed:04X}, got {stored:04X}"
            ),
            Self::MissingWavTrailer { offset, found } => write!(
                f,
                "WAV trailer not found for entry at {offset:#x}, found {}",
                hex::encode_upper(found)
            ),
            Self::WavTrailerFallback { offset } => write!(
                f,
                "entry at {offset:#x} has no WAV trailer, exporting as 8-bit at the descriptor samplerate"
            ),
            Self::NotMono { channels } => {
                write!(f, "only mono WAV is supported, got {channels} channels")
            }
            Self::UnsupportedResolution { bits } => write!(f, "{bits}-bit WAV isn't supported"),
            Self::UnsupportedSampleRate { khz } => write!(
                f,
                "only 8/16/32 kHz samplerate is supported, got {khz} kHz"
            ),
            Self::NewerFirmwareRequired(what) => {
                write!(f, "{what} might be not supported if your firmware is old")
            }
            Self::FieldIgnored(field) => {
                write!(f, "{field} is set but won't be used, flag not set")
            }
            Self::PairedIndexBeyondEntries {
                paired_idx,
                entries,
            } => write!(
                f,
                "paired_idx {paired_idx} points past the last of {entries} entries"
            ),
            Self::InjectionPadded { padding } => write!(
                f,
                "new sector is smaller than the original, added {padding} bytes of 0xFF padding"
            ),
            Self::InjectionTruncated { excess } => write!(
                f,
                "file size limit exceeded by {excess} bytes, truncating the forced sector"
            ),
        }
    }
}

/// Collects [`Warning`]s emitted by an operation. The caller decides how to
/// surface them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: Warning) {
        tracing::trace!("diagnostic: {warning}");
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Take all collected warnings, leaving the sink empty.
    pub fn drain(&mut self) -> impl Iterator<Item = Warning> + '_ {
        self.warnings.drain(..)
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        self.warnings.contains(warning)
    }
}
