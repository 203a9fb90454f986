use std::cmp::Ordering;
use std::fmt;

use crate::common::{CairnError, Result, ATTR_SIZE};

use super::AttrType;

/// A single attribute value as stored in a record cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Number(f64),
    String(String),
}

/// A record is one attribute per column, in catalog-declared order.
pub type Record = Vec<Attribute>;

impl Attribute {
    /// Returns the type of this value.
    pub fn attr_type(&self) -> AttrType {
        match self {
            Attribute::Number(_) => AttrType::Number,
            Attribute::String(_) => AttrType::String,
        }
    }

    /// Returns the numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Attribute::Number(v) => Some(*v),
            Attribute::String(_) => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(s) => Some(s),
            Attribute::Number(_) => None,
        }
    }

    /// Encodes this value into a fixed-size cell.
    /// Strings must leave room for the terminating NUL.
    pub fn encode(&self) -> Result<[u8; ATTR_SIZE]> {
        let mut cell = [0u8; ATTR_SIZE];
        match self {
            Attribute::Number(v) => {
                cell[..8].copy_from_slice(&v.to_le_bytes());
            }
            Attribute::String(s) => {
                let bytes = s.as_bytes();
                if bytes.len() >= ATTR_SIZE || bytes.contains(&0) {
                    return Err(CairnError::NameTooLong(s.clone()));
                }
                cell[..bytes.len()].copy_from_slice(bytes);
            }
        }
        Ok(cell)
    }

    /// Decodes a cell according to the declared attribute type.
    pub fn decode(cell: &[u8], attr_type: AttrType) -> Self {
        match attr_type {
            AttrType::Number => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&cell[..8]);
                Attribute::Number(f64::from_le_bytes(bytes))
            }
            AttrType::String => {
                let end = cell.iter().position(|&b| b == 0).unwrap_or(cell.len());
                Attribute::String(String::from_utf8_lossy(&cell[..end]).into_owned())
            }
        }
    }

    /// Three-way comparison of two values of the same type.
    /// Strings compare byte-wise, numbers by value. Returns None for
    /// mismatched types or unordered numbers.
    pub fn compare(&self, other: &Attribute) -> Option<Ordering> {
        match (self, other) {
            (Attribute::Number(a), Attribute::Number(b)) => a.partial_cmp(b),
            (Attribute::String(a), Attribute::String(b)) => {
                Some(a.as_bytes().cmp(b.as_bytes()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Number(v) => write!(f, "{}", v),
            Attribute::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<f64> for Attribute {
    fn from(v: f64) -> Self {
        Attribute::Number(v)
    }
}

impl From<i32> for Attribute {
    fn from(v: i32) -> Self {
        Attribute::Number(v as f64)
    }
}

impl From<&str> for Attribute {
    fn from(v: &str) -> Self {
        Attribute::String(v.to_string())
    }
}

impl From<String> for Attribute {
    fn from(v: String) -> Self {
        Attribute::String(v)
    }
}

/// Encodes a whole record into consecutive cells.
pub fn encode_record(record: &[Attribute]) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(record.len() * ATTR_SIZE);
    for attr in record {
        bytes.extend_from_slice(&attr.encode()?);
    }
    Ok(bytes)
}

/// Decodes consecutive cells using the given column types.
pub fn decode_record(data: &[u8], types: &[AttrType]) -> Record {
    types
        .iter()
        .enumerate()
        .map(|(i, ty)| Attribute::decode(&data[i * ATTR_SIZE..(i + 1) * ATTR_SIZE], *ty))
        .collect()
}
