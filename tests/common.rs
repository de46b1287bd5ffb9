#![allow(dead_code)]

use appotech_fw::btinfo;
use appotech_fw::btpairing;
use appotech_fw::sfx::wav::PcmAudio;

/// Filler standing in for the code around the sectors.
pub const CODE_BYTE: u8 = 0x5A;

/// A `BTINF` record as found in a real image: name "Speaker", custom name
/// and mute flags set, MAC stored reversed.
pub fn btinfo_bytes() -> Vec<u8> {
    let mut raw = vec![0u8; btinfo::SIZE];
    raw[..5].copy_from_slice(btinfo::MAGIC);
    raw[6] = btinfo::FLAG_CUST_BT_NAME | btinfo::FLAG_CUST_MUTE_CFG;
    raw[7] = 0x10;
    raw[8] = 0x08;
    raw[9] = 0x20;
    raw[14..21].copy_from_slice(b"Speaker");
    raw[46..52].copy_from_slice(&[0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
    let sum = btinfo::checksum(&raw[..62]);
    raw[62..].copy_from_slice(&sum.to_le_bytes());
    raw
}

/// One raw pairing entry.
pub fn pairing_entry(name: &str, mac_wire: [u8; 6], is_valid: u8) -> Vec<u8> {
    let mut raw = vec![0u8; btpairing::ENTRY_SIZE];
    raw[..16].copy_from_slice(&[0x11; 16]);
    raw[16..22].copy_from_slice(&mac_wire);
    raw[22..22 + name.len()].copy_from_slice(name.as_bytes());
    raw[btpairing::ENTRY_SIZE - 1] = is_valid;
    raw
}

/// A pairing database with `names.len()` valid entries and `paired_idx`.
pub fn pairing_bytes(names: &[&str], paired_idx: u8) -> Vec<u8> {
    let mut raw = btpairing::MAGIC.to_vec();
    for (i, name) in names.iter().enumerate() {
        raw.extend(pairing_entry(name, [i as u8; 6], 1));
    }
    raw.push(paired_idx);
    raw
}

/// Wrap `sector` in filler code bytes: `before` bytes in front, `after`
/// bytes behind.
pub fn embed(sector: &[u8], before: usize, after: usize) -> Vec<u8> {
    let mut image = vec![CODE_BYTE; before];
    image.extend_from_slice(sector);
    image.extend(std::iter::repeat_n(CODE_BYTE, after));
    image
}

/// An 8 kHz 8-bit mono WAV file with `samples` sample bytes.
pub fn wav_8k_8bit(samples: usize) -> Vec<u8> {
    PcmAudio {
        channels: 1,
        sample_rate: 8000,
        sample_width: 1,
        frames: (0..samples).map(|i| (i % 251) as u8).collect(),
    }
    .to_bytes()
}

/// Something that looks like MP3 data to the tooling: just bytes.
pub fn mp3(len: usize) -> Vec<u8> {
    let mut data = b"ID3\x04\0\0\0\0\0\0".to_vec();
    data.resize(len, 0xE3);
    data
}
