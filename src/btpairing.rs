//! The paired-device database (`BTPAIREDINFOHEAD`).
//!
//! The sector is the 16-byte magic, a run of 55-byte entries and a single
//! `paired_idx` byte. Its length is only known after decoding: entries are
//! read until one does not carry `is_valid == 1`, and the first byte of that
//! rejected slot is `paired_idx`.

use core::fmt;

use crate::btinfo::{decode_name, encode_name, reverse_mac, MAC_LENGTH, NAME_LENGTH};
use crate::diag::{Diagnostics, Warning};
use crate::error::Error;
use crate::field::{FieldKind, FieldSpec, FieldValue, Fields};
use crate::locate::find_exact;
use crate::{Sector, SectorKind};

pub const MAGIC: &[u8; 16] = b"BTPAIREDINFOHEAD";
pub const HEADER_SIZE: usize = MAGIC.len();
pub const LINK_KEY_LENGTH: usize = 16;
pub const ENTRY_SIZE: usize = LINK_KEY_LENGTH + MAC_LENGTH + NAME_LENGTH + 1;
/// Header, one entry and the `paired_idx` byte.
pub const MIN_SIZE: usize = HEADER_SIZE + ENTRY_SIZE + 1;

const MAC_OFFSET: usize = LINK_KEY_LENGTH;
const NAME_OFFSET: usize = MAC_OFFSET + MAC_LENGTH;
const VALID_OFFSET: usize = ENTRY_SIZE - 1;

/// One paired device. `bt_mac` is kept in human order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingEntry {
    pub link_key: [u8; LINK_KEY_LENGTH],
    pub bt_mac: [u8; MAC_LENGTH],
    pub bt_name: String,
    pub is_valid: bool,
}

impl PairingEntry {
    fn decode(raw: &[u8]) -> Result<Self, Error> {
        let mut link_key = [0u8; LINK_KEY_LENGTH];
        link_key.copy_from_slice(&raw[..LINK_KEY_LENGTH]);
        let mut wire_mac = [0u8; MAC_LENGTH];
        wire_mac.copy_from_slice(&raw[MAC_OFFSET..MAC_OFFSET + MAC_LENGTH]);

        Ok(Self {
            link_key,
            bt_mac: reverse_mac(wire_mac),
            bt_name: decode_name(&raw[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH])?,
            is_valid: raw[VALID_OFFSET] == 1,
        })
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        let mut raw = [0u8; ENTRY_SIZE];
        raw[..LINK_KEY_LENGTH].copy_from_slice(&self.link_key);
        raw[MAC_OFFSET..MAC_OFFSET + MAC_LENGTH].copy_from_slice(&reverse_mac(self.bt_mac));
        encode_name(&mut raw[NAME_OFFSET..NAME_OFFSET + NAME_LENGTH], &self.bt_name);
        raw[VALID_OFFSET] = u8::from(self.is_valid);
        out.extend_from_slice(&raw);
    }
}

/// The decoded pairing database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtPairingDatabase {
    pub entries: Vec<PairingEntry>,
    /// Index of the most recently connected device. Not checked against
    /// `entries`; see [`BtPairingDatabase::check_paired_idx`].
    pub paired_idx: u8,
}

impl Default for BtPairingDatabase {
    /// A database holding a single empty entry.
    fn default() -> Self {
        Self {
            entries: vec![PairingEntry::default()],
            paired_idx: 0,
        }
    }
}

impl BtPairingDatabase {
    /// Insert empty entries, one per index, in the given order. Each
    /// insertion shifts the entries after it, so later indices refer to the
    /// list as modified by the earlier ones.
    pub fn insert_entries(&mut self, indices: &[usize]) -> Result<(), Error> {
        for &index in indices {
            if index > self.entries.len() {
                return Err(Error::InvalidIndex {
                    index,
                    len: self.entries.len(),
                });
            }
            tracing::debug!("inserting empty entry at index {index}");
            self.entries.insert(index, PairingEntry::default());
        }
        Ok(())
    }

    /// Remove the entries at `indices`, which refer to the list as it is
    /// before the call. Duplicates are removed once. Fails without changes if
    /// an index does not exist or if no entry would remain.
    pub fn delete_entries(&mut self, indices: &[usize]) -> Result<(), Error> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        if let Some(&index) = sorted.first() {
            if index >= self.entries.len() {
                return Err(Error::InvalidIndex {
                    index,
                    len: self.entries.len(),
                });
            }
        }
        if sorted.len() >= self.entries.len() {
            return Err(Error::Empty);
        }

        for index in sorted {
            tracing::debug!("removing entry at index {index}");
            self.entries.remove(index);
        }
        Ok(())
    }

    pub fn entry_mut(&mut self, index: usize) -> Result<&mut PairingEntry, Error> {
        let len = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or(Error::InvalidIndex { index, len })
    }

    /// Warn when `paired_idx` does not address an entry.
    pub fn check_paired_idx(&self, diag: &mut Diagnostics) {
        if usize::from(self.paired_idx) >= self.entries.len() {
            diag.warn(Warning::PairedIndexBeyondEntries {
                paired_idx: self.paired_idx,
                entries: self.entries.len(),
            });
        }
    }
}

impl Sector for BtPairingDatabase {
    const KIND: SectorKind = SectorKind::BtPairing;

    fn locate(image: &[u8]) -> Result<usize, Error> {
        find_exact(image, MAGIC, MIN_SIZE, Self::KIND)
    }

    fn decode(data: &[u8], _diag: &mut Diagnostics) -> Result<Self, Error> {
        if data.len() < MIN_SIZE {
            return Err(Error::Truncated {
                expected: MIN_SIZE,
                actual: data.len(),
            });
        }
        if !data.starts_with(MAGIC) {
            return Err(Error::NotFound(Self::KIND));
        }

        let mut entries = Vec::new();
        let mut offset = HEADER_SIZE;
        loop {
            let remaining = data.len() - offset;
            if remaining < ENTRY_SIZE {
                tracing::debug!(
                    "stop reading: expected {ENTRY_SIZE} bytes, {remaining} available"
                );
                break;
            }
            let raw = &data[offset..offset + ENTRY_SIZE];
            if raw[VALID_OFFSET] != 1 {
                tracing::debug!("stop reading: abnormal is_valid value at {offset:#x}");
                break;
            }
            entries.push(PairingEntry::decode(raw)?);
            offset += ENTRY_SIZE;
        }

        if entries.is_empty() {
            return Err(Error::Empty);
        }

        let paired_idx = *data.get(offset).ok_or(Error::Truncated {
            expected: offset + 1,
            actual: data.len(),
        })?;

        Ok(Self {
            entries,
            paired_idx,
        })
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(MAGIC);
        for entry in &self.entries {
            entry.encode_into(&mut out);
        }
        out.push(self.paired_idx);
        out
    }

    fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.entries.len() * ENTRY_SIZE + 1
    }
}

/// Editable fields of a [`PairingEntry`].
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
pub enum PairingEntryField {
    LinkKey,
    BtMac,
    BtName,
    IsValid,
}

impl Fields for PairingEntry {
    type Field = PairingEntryField;

    fn spec(field: PairingEntryField) -> FieldSpec {
        let name: &'static str = field.into();
        match field {
            PairingEntryField::LinkKey => {
                FieldSpec::new(name, FieldKind::Bytes).with_length(0, LINK_KEY_LENGTH)
            }
            PairingEntryField::BtMac => {
                FieldSpec::new(name, FieldKind::Bytes).with_length(MAC_LENGTH, MAC_LENGTH)
            }
            PairingEntryField::BtName => {
                FieldSpec::new(name, FieldKind::Text).with_length(0, NAME_LENGTH)
            }
            PairingEntryField::IsValid => FieldSpec::new(name, FieldKind::Boolean),
        }
    }

    fn store(&mut self, field: PairingEntryField, value: FieldValue) -> Result<(), Error> {
        let name: &'static str = field.into();
        match field {
            PairingEntryField::LinkKey => self.link_key = value.into_array(name)?,
            PairingEntryField::BtMac => self.bt_mac = value.into_array(name)?,
            PairingEntryField::BtName => self.bt_name = value.into_text(name)?,
            PairingEntryField::IsValid => self.is_valid = value.into_bool(name)?,
        }
        Ok(())
    }

    fn reset(&mut self, field: PairingEntryField) {
        let fresh = Self::default();
        match field {
            PairingEntryField::LinkKey => self.link_key = fresh.link_key,
            PairingEntryField::BtMac => self.bt_mac = fresh.bt_mac,
            PairingEntryField::BtName => self.bt_name = fresh.bt_name,
            PairingEntryField::IsValid => self.is_valid = fresh.is_valid,
        }
    }
}

/// Editable fields of the database itself.
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
pub enum PairingDatabaseField {
    PairedIdx,
}

impl Fields for BtPairingDatabase {
    type Field = PairingDatabaseField;

    fn spec(field: PairingDatabaseField) -> FieldSpec {
        match field {
            PairingDatabaseField::PairedIdx => {
                FieldSpec::new(field.into(), FieldKind::Integer).with_range(0, 0xFF)
            }
        }
    }

    fn store(&mut self, field: PairingDatabaseField, value: FieldValue) -> Result<(), Error> {
        match field {
            PairingDatabaseField::PairedIdx => self.paired_idx = value.into_int(field.into())?,
        }
        Ok(())
    }

    fn reset(&mut self, field: PairingDatabaseField) {
        match field {
            PairingDatabaseField::PairedIdx => self.paired_idx = 0,
        }
    }
}

impl fmt::Display for PairingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BtPairing.Entry(")?;
        writeln!(f, "    link_key = {}", hex::encode_upper(self.link_key))?;
        writeln!(f, "    bt_mac   = {}", hex::encode_upper(self.bt_mac))?;
        writeln!(f, "    bt_name  = \"{}\"", self.bt_name)?;
        writeln!(f, "    is_valid = {}", self.is_valid)?;
        write!(f, ")")
    }
}

impl fmt::Display for BtPairingDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BtPairing(")?;
        writeln!(f, "    entries = [")?;
        for (idx, entry) in self.entries.iter().enumerate() {
            let text = entry.to_string();
            let mut lines = text.lines().peekable();
            while let Some(line) = lines.next() {
                let last_of_entry = lines.peek().is_none();
                let separator = if last_of_entry && idx + 1 < self.entries.len() {
                    ","
                } else {
                    ""
                };
                writeln!(f, "        {line}{separator}")?;
            }
        }
        writeln!(f, "    ],")?;
        writeln!(f, "    paired_idx = {}", self.paired_idx)?;
        write!(f, ")")
    }
}
