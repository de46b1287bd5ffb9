//! Minimal RIFF/WAVE container support: just enough to pull mono PCM
//! samples out of a `.wav` file and to wrap raw samples back into one.

use crate::error::Error;

pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";

const FORMAT_PCM: u16 = 0x0001;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;
const PCM_HEADER_SIZE: usize = 44;
const MAX_BITS_PER_SAMPLE: u16 = 32;

/// Chunk header (4 byte ID + 4 byte size)
#[derive(Debug, Clone, Copy)]
struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

impl ChunkHeader {
    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 8 {
            return None;
        }
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[0..4]);
        let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Some(ChunkHeader { id, size })
    }
}

/// Parameters and sample bytes of a PCM WAV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmAudio {
    pub channels: u16,
    pub sample_rate: u32,
    /// Bytes per sample, rounded up from the declared bit depth.
    pub sample_width: u16,
    /// Interleaved frames, cut to a whole number of frames.
    pub frames: Vec<u8>,
}

impl PcmAudio {
    /// Parse a RIFF/WAVE file holding integer PCM samples.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 12 || &data[0..4] != RIFF_MAGIC || &data[8..12] != WAVE_MAGIC {
            return Err(Error::InvalidWav("missing RIFF/WAVE header".to_string()));
        }

        let mut format: Option<(u16, u32, u16)> = None;
        let mut samples: Option<&[u8]> = None;
        let mut pos = 12;

        while let Some(chunk) = ChunkHeader::from_bytes(&data[pos..]) {
            let body_start = pos + 8;
            let body_end = body_start
                .checked_add(chunk.size as usize)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| {
                    Error::InvalidWav(format!(
                        "chunk {} overruns the file",
                        String::from_utf8_lossy(&chunk.id)
                    ))
                })?;
            let body = &data[body_start..body_end];

            match &chunk.id {
                id if id == FMT_CHUNK => {
                    if body.len() < 16 {
                        return Err(Error::InvalidWav("fmt chunk is too short".to_string()));
                    }
                    let tag = u16::from_le_bytes([body[0], body[1]]);
                    if tag != FORMAT_PCM && tag != FORMAT_EXTENSIBLE {
                        return Err(Error::InvalidWav(format!(
                            "unsupported format tag {tag:#06x}"
                        )));
                    }
                    let channels = u16::from_le_bytes([body[2], body[3]]);
                    let rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                    let bits = u16::from_le_bytes([body[14], body[15]]);
                    format = Some((channels, rate, bits));
                }
                id if id == DATA_CHUNK => samples = Some(body),
                _ => {}
            }

            // Chunks are word aligned.
            pos = body_end + (body_end & 1);
            if pos >= data.len() {
                break;
            }
        }

        let (channels, sample_rate, bits) =
            format.ok_or_else(|| Error::InvalidWav("fmt chunk not found".to_string()))?;
        let samples = samples.ok_or_else(|| Error::InvalidWav("data chunk not found".to_string()))?;
        if channels == 0 || bits == 0 || bits > MAX_BITS_PER_SAMPLE {
            return Err(Error::InvalidWav(format!(
                "{channels} channels, {bits} bits per sample"
            )));
        }
        if sample_rate == 0 {
            return Err(Error::InvalidWav("samplerate of 0 Hz".to_string()));
        }

        let sample_width = bits.div_ceil(8);
        let frame_size = usize::from(sample_width) * usize::from(channels);
        let whole = samples.len() - samples.len() % frame_size;

        Ok(Self {
            channels,
            sample_rate,
            sample_width,
            frames: samples[..whole].to_vec(),
        })
    }

    /// Serialize as a canonical 44-byte-header PCM WAV file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let block_align = self.channels * self.sample_width;
        let byte_rate = self.sample_rate * u32::from(block_align);
        let data_len = self.frames.len() as u32;

        let mut out = Vec::with_capacity(PCM_HEADER_SIZE + self.frames.len() + 1);
        out.extend_from_slice(RIFF_MAGIC);
        out.extend_from_slice(&(36 + data_len + (data_len & 1)).to_le_bytes());
        out.extend_from_slice(WAVE_MAGIC);

        out.extend_from_slice(FMT_CHUNK);
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&(self.sample_width * 8).to_le_bytes());

        out.extend_from_slice(DATA_CHUNK);
        out.extend_from_slice(&data_len.to_le_bytes());
        out.extend_from_slice(&self.frames);
        if data_len & 1 == 1 {
            out.push(0);
        }
        out
    }
}
