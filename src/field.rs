//! Text-to-field assignment shared by the BTINF record and the pairing
//! database.
//!
//! Each editable record declares a static table (a strum enum of its field
//! names plus [`Fields::spec`]) describing the semantic kind of every field
//! and an optional constraint. Text coming from the command line is parsed
//! according to that kind, checked against the constraint and only then
//! handed to the record.

use core::fmt;
use core::str::FromStr;

use strum::VariantNames;

use crate::error::Error;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Decimal integer.
    Integer,
    /// Hex text, colons and spaces ignored.
    Bytes,
    /// UTF-8 text stored verbatim.
    Text,
    /// `1`/`true`/`0`/`false`, case-insensitive.
    Boolean,
    /// Computed on encode; never assigned from text.
    Derived,
}

/// Optional restriction applied before a value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Inclusive value range for integer fields.
    Value { min: i64, max: i64 },
    /// Inclusive byte-length range for byte-string and text fields.
    Length { min: usize, max: usize },
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { min, max } => write!(f, "{min}..={max}"),
            Self::Length { min, max } => write!(f, "{min}..={max} bytes"),
        }
    }
}

/// Static description of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub constraint: Option<Constraint>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            constraint: None,
        }
    }

    pub const fn with_range(mut self, min: i64, max: i64) -> Self {
        self.constraint = Some(Constraint::Value { min, max });
        self
    }

    pub const fn with_length(mut self, min: usize, max: usize) -> Self {
        self.constraint = Some(Constraint::Length { min, max });
        self
    }

    /// Convert `text` into a typed value for this field, enforcing the
    /// constraint.
    pub fn parse(&self, text: &str) -> Result<FieldValue, Error> {
        match self.kind {
            FieldKind::Integer => {
                let value = text.trim().parse::<i64>().map_err(|e| Error::InvalidValue {
                    field: self.name,
                    value: text.to_string(),
                    reason: e.to_string(),
                })?;
                if let Some(Constraint::Value { min, max }) = self.constraint {
                    if !(min..=max).contains(&value) {
                        return Err(self.out_of_range(text));
                    }
                }
                Ok(FieldValue::Integer(value))
            }
            FieldKind::Bytes => {
                let cleaned: String = text
                    .chars()
                    .filter(|c| *c != ':' && *c != ' ')
                    .collect::<String>()
                    .to_ascii_lowercase();
                let bytes = hex::decode(&cleaned).map_err(|e| Error::InvalidValue {
                    field: self.name,
                    value: text.to_string(),
                    reason: e.to_string(),
                })?;
                self.check_length(text, bytes.len())?;
                Ok(FieldValue::Bytes(bytes))
            }
            FieldKind::Text => {
                self.check_length(text, text.len())?;
                Ok(FieldValue::Text(text.to_string()))
            }
            FieldKind::Boolean => match text.to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(FieldValue::Boolean(true)),
                "0" | "false" => Ok(FieldValue::Boolean(false)),
                _ => Err(Error::InvalidValue {
                    field: self.name,
                    value: text.to_string(),
                    reason: "only (1, true, 0, false) are supported for booleans".to_string(),
                }),
            },
            FieldKind::Derived => Err(Error::UnsupportedType(self.name)),
        }
    }

    fn check_length(&self, text: &str, len: usize) -> Result<(), Error> {
        if let Some(Constraint::Length { min, max }) = self.constraint {
            if !(min..=max).contains(&len) {
                return Err(self.out_of_range(text));
            }
        }
        Ok(())
    }

    fn out_of_range(&self, text: &str) -> Error {
        Error::OutOfRange {
            field: self.name,
            value: text.to_string(),
            accepted: self
                .constraint
                .map(|c| c.to_string())
                .unwrap_or_default(),
        }
    }
}

/// A value that has passed [`FieldSpec::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(i64),
    Bytes(Vec<u8>),
    Text(String),
    Boolean(bool),
}

impl FieldValue {
    /// Narrow an integer value to the storage type of `field`.
    pub fn into_int<T: TryFrom<i64>>(self, field: &'static str) -> Result<T, Error> {
        match self {
            Self::Integer(v) => T::try_from(v).map_err(|_| Error::OutOfRange {
                field,
                value: v.to_string(),
                accepted: core::any::type_name::<T>().to_string(),
            }),
            _ => Err(Error::UnsupportedType(field)),
        }
    }

    /// Copy a byte value into a fixed array, zero-padding shorter input.
    pub fn into_array<const N: usize>(self, field: &'static str) -> Result<[u8; N], Error> {
        match self {
            Self::Bytes(bytes) if bytes.len() <= N => {
                let mut out = [0u8; N];
                out[..bytes.len()].copy_from_slice(&bytes);
                Ok(out)
            }
            Self::Bytes(bytes) => Err(Error::OutOfRange {
                field,
                value: hex::encode_upper(&bytes),
                accepted: format!("0..={N} bytes"),
            }),
            _ => Err(Error::UnsupportedType(field)),
        }
    }

    pub fn into_text(self, field: &'static str) -> Result<String, Error> {
        match self {
            Self::Text(s) => Ok(s),
            _ => Err(Error::UnsupportedType(field)),
        }
    }

    pub fn into_bool(self, field: &'static str) -> Result<bool, Error> {
        match self {
            Self::Boolean(b) => Ok(b),
            _ => Err(Error::UnsupportedType(field)),
        }
    }
}

/// A record whose fields can be edited by name.
pub trait Fields {
    /// Closed set of field names, parsed from and listed as snake_case.
    type Field: Copy + FromStr + VariantNames + Into<&'static str>;

    /// Kind and constraint of `field`.
    fn spec(field: Self::Field) -> FieldSpec;

    /// Store an already validated value.
    fn store(&mut self, field: Self::Field, value: FieldValue) -> Result<(), Error>;

    /// Reset `field` to the value of a freshly constructed record.
    fn reset(&mut self, field: Self::Field);
}

/// Resolve a field name of `T`, listing the valid names on failure.
pub fn lookup<T: Fields>(name: &str) -> Result<T::Field, Error> {
    name.parse::<T::Field>().map_err(|_| Error::UnknownField {
        field: name.to_string(),
        available: T::Field::VARIANTS.join(", "),
    })
}

/// Parse `text` according to the declared kind of `name` and assign it.
pub fn assign<T: Fields>(target: &mut T, name: &str, text: &str) -> Result<(), Error> {
    let field = lookup::<T>(name)?;
    let value = T::spec(field).parse(text)?;
    target.store(field, value)?;
    tracing::debug!("assigned {name} = {text}");
    Ok(())
}

/// Reset `name` to its default value.
pub fn clear<T: Fields>(target: &mut T, name: &str) -> Result<(), Error> {
    let field = lookup::<T>(name)?;
    target.reset(field);
    Ok(())
}
