//! The `BTINF` configuration record.
//!
//! Layout (64 bytes, little-endian):
//!
//! | offset | size | field               |
//! |--------|------|---------------------|
//! | 0      | 5    | magic `BTINF`       |
//! | 5      | 1    | reserved            |
//! | 6      | 1    | `flags`             |
//! | 7      | 1    | `mic_unmute_thresh` |
//! | 8      | 1    | `mic_mute_thresh`   |
//! | 9      | 1    | `mic_mute_duration` |
//! | 10     | 4    | reserved            |
//! | 14     | 32   | `bt_name`, NUL-padded |
//! | 46     | 6    | `bt_mac`, reversed  |
//! | 52     | 10   | reserved            |
//! | 62     | 2    | checksum            |

use core::fmt;

use crate::diag::{Diagnostics, Warning};
use crate::error::Error;
use crate::field::{FieldKind, FieldSpec, FieldValue, Fields};
use crate::locate::find_exact;
use crate::{Sector, SectorKind};

pub const MAGIC: &[u8; 5] = b"BTINF";
pub const SIZE: usize = 64;
pub const NAME_LENGTH: usize = 32;
pub const MAC_LENGTH: usize = 6;

const FLAGS_OFFSET: usize = 6;
const NAME_OFFSET: usize = 14;
const MAC_OFFSET: usize = NAME_OFFSET + NAME_LENGTH;
const CHECKSUM_OFFSET: usize = SIZE - 2;

/// `bt_name` overrides the built-in name.
pub const FLAG_CUST_BT_NAME: u8 = 1 << 0;
/// `bt_mac` overrides the built-in address.
pub const FLAG_CUST_BT_MAC: u8 = 1 << 1;
/// The three microphone thresholds are used.
pub const FLAG_CUST_MUTE_CFG: u8 = 1 << 2;

/// Decoded `BTINF` record. `bt_mac` is kept in human order; it is reversed
/// only on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BtInfoRecord {
    pub flags: u8,
    pub mic_unmute_thresh: u8,
    pub mic_mute_thresh: u8,
    pub mic_mute_duration: u8,
    pub bt_name: String,
    pub bt_mac: [u8; MAC_LENGTH],
    /// Checksum as stored in the decoded bytes. Ignored by [`Sector::encode`].
    pub checksum: u16,
}

/// Unsigned sum of `bytes`, truncated to 16 bits.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Reverse the byte order of a MAC address between wire and human order.
pub fn reverse_mac(mac: [u8; MAC_LENGTH]) -> [u8; MAC_LENGTH] {
    let mut out = mac;
    out.reverse();
    out
}

/// Decode a NUL-padded name field, cutting at the first NUL.
pub(crate) fn decode_name(raw: &[u8]) -> Result<String, Error> {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    Ok(core::str::from_utf8(&raw[..len])?.to_string())
}

/// Write `name` into a NUL-padded field. Longer names are cut at the field
/// size; callers constrain the length before it gets here.
pub(crate) fn encode_name(dest: &mut [u8], name: &str) {
    let bytes = name.as_bytes();
    let len = bytes.len().min(dest.len());
    dest[..len].copy_from_slice(&bytes[..len]);
    dest[len..].fill(0);
}

impl BtInfoRecord {
    /// Warn about populated fields whose enabling flag is clear.
    pub fn check_flags(&self, diag: &mut Diagnostics) {
        let mute_cfg = self.flags & FLAG_CUST_MUTE_CFG != 0;
        if !self.bt_name.is_empty() && self.flags & FLAG_CUST_BT_NAME == 0 {
            diag.warn(Warning::FieldIgnored("bt_name"));
        }
        if self.bt_mac != [0; MAC_LENGTH] && self.flags & FLAG_CUST_BT_MAC == 0 {
            diag.warn(Warning::FieldIgnored("bt_mac"));
        }
        if self.mic_unmute_thresh != 0 && !mute_cfg {
            diag.warn(Warning::FieldIgnored("mic_unmute_thresh"));
        }
        if self.mic_mute_thresh != 0 && !mute_cfg {
            diag.warn(Warning::FieldIgnored("mic_mute_thresh"));
        }
        if self.mic_mute_duration != 0 && !mute_cfg {
            diag.warn(Warning::FieldIgnored("mic_mute_duration"));
        }
    }
}

impl Sector for BtInfoRecord {
    const KIND: SectorKind = SectorKind::BtInfo;

    fn locate(image: &[u8]) -> Result<usize, Error> {
        find_exact(image, MAGIC, SIZE, Self::KIND)
    }

    fn decode(data: &[u8], diag: &mut Diagnostics) -> Result<Self, Error> {
        if data.len() < SIZE {
            return Err(Error::Truncated {
                expected: SIZE,
                actual: data.len(),
            });
        }
        if !data.starts_with(MAGIC) {
            return Err(Error::NotFound(Self::KIND));
        }

        let mut wire_mac = [0u8; MAC_LENGTH];
        wire_mac.copy_from_slice(&data[MAC_OFFSET..MAC_OFFSET + MAC_LENGTH]);
        let stored = u16::from_le_bytes([data[CHECKSUM_OFFSET], data[CHECKSUM_OFFSET + 1]]);

        let record = Self {
            flags: data[FLAGS_OFFSET],
            mic_unmute_thresh: data[FLAGS_OFFSET + 1],
            mic_mute_thresh: data[FLAGS_OFFSET + 2],
            mic_mute_duration: data[FLAGS_OFFSET + 3],
            bt_name: decode_name(&data[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH])?,
            bt_mac: reverse_mac(wire_mac),
            checksum: stored,
        };

        let computed = checksum(&data[..CHECKSUM_OFFSET]);
        if computed != stored {
            diag.warn(Warning::ChecksumMismatch { stored, computed });
        }

        Ok(record)
    }

    fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; SIZE];
        data[..MAGIC.len()].copy_from_slice(MAGIC);
        data[FLAGS_OFFSET] = self.flags;
        data[FLAGS_OFFSET + 1] = self.mic_unmute_thresh;
        data[FLAGS_OFFSET + 2] = self.mic_mute_thresh;
        data[FLAGS_OFFSET + 3] = self.mic_mute_duration;
        encode_name(&mut data[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH], &self.bt_name);
        data[MAC_OFFSET..MAC_OFFSET + MAC_LENGTH].copy_from_slice(&reverse_mac(self.bt_mac));

        let sum = checksum(&data[..CHECKSUM_OFFSET]);
        data[CHECKSUM_OFFSET..].copy_from_slice(&sum.to_le_bytes());
        data
    }

    fn encoded_len(&self) -> usize {
        SIZE
    }
}

/// Editable fields of [`BtInfoRecord`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum BtInfoField {
    Flags,
    MicUnmuteThresh,
    MicMuteThresh,
    MicMuteDuration,
    BtName,
    BtMac,
    Checksum,
}

impl Fields for BtInfoRecord {
    type Field = BtInfoField;

    fn spec(field: BtInfoField) -> FieldSpec {
        let name: &'static str = field.into();
        match field {
            BtInfoField::Flags
            | BtInfoField::MicUnmuteThresh
            | BtInfoField::MicMuteThresh
            | BtInfoField::MicMuteDuration => {
                FieldSpec::new(name, FieldKind::Integer).with_range(0, 0xFF)
            }
            BtInfoField::BtName => FieldSpec::new(name, FieldKind::Text).with_length(0, NAME_LENGTH),
            BtInfoField::BtMac => {
                FieldSpec::new(name, FieldKind::Bytes).with_length(MAC_LENGTH, MAC_LENGTH)
            }
            BtInfoField::Checksum => FieldSpec::new(name, FieldKind::Derived),
        }
    }

    fn store(&mut self, field: BtInfoField, value: FieldValue) -> Result<(), Error> {
        let name: &'static str = field.into();
        match field {
            BtInfoField::Flags => self.flags = value.into_int(name)?,
            BtInfoField::MicUnmuteThresh => self.mic_unmute_thresh = value.into_int(name)?,
            BtInfoField::MicMuteThresh => self.mic_mute_thresh = value.into_int(name)?,
            BtInfoField::MicMuteDuration => self.mic_mute_duration = value.into_int(name)?,
            BtInfoField::BtName => self.bt_name = value.into_text(name)?,
            BtInfoField::BtMac => self.bt_mac = value.into_array(name)?,
            BtInfoField::Checksum => return Err(Error::UnsupportedType(name)),
        }
        Ok(())
    }

    fn reset(&mut self, field: BtInfoField) {
        let fresh = Self::default();
        match field {
            BtInfoField::Flags => self.flags = fresh.flags,
            BtInfoField::MicUnmuteThresh => self.mic_unmute_thresh = fresh.mic_unmute_thresh,
            BtInfoField::MicMuteThresh => self.mic_mute_thresh = fresh.mic_mute_thresh,
            BtInfoField::MicMuteDuration => self.mic_mute_duration = fresh.mic_mute_duration,
            BtInfoField::BtName => self.bt_name = fresh.bt_name,
            BtInfoField::BtMac => self.bt_mac = fresh.bt_mac,
            BtInfoField::Checksum => {}
        }
    }
}

impl fmt::Display for BtInfoRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BtInfo(")?;
        writeln!(f, "    flags             = {:02X}", self.flags)?;
        writeln!(f, "    mic_unmute_thresh = {:02X}", self.mic_unmute_thresh)?;
        writeln!(f, "    mic_mute_thresh   = {:02X}", self.mic_mute_thresh)?;
        writeln!(f, "    mic_mute_duration = {:02X}", self.mic_mute_duration)?;
        writeln!(f, "    bt_name           = \"{}\"", self.bt_name)?;
        writeln!(f, "    bt_mac            = {}", hex::encode_upper(self.bt_mac))?;
        writeln!(f, "    checksum          = {:04X}", self.checksum)?;
        write!(f, ")")
    }
}
