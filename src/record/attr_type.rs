use std::fmt;

/// The attribute types a relation column can be declared with.
/// Every attribute occupies one fixed `ATTR_SIZE` cell regardless of type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    /// 64-bit floating point number, little-endian in the first 8 bytes
    Number,

    /// NUL-padded byte string of at most `ATTR_SIZE - 1` bytes
    String,
}

impl AttrType {
    /// Returns the type tag stored in the attribute catalog.
    pub fn type_id(&self) -> u8 {
        match self {
            AttrType::Number => 0,
            AttrType::String => 1,
        }
    }

    /// Decodes a type tag read back from the attribute catalog.
    pub fn from_type_id(type_id: u8) -> Option<Self> {
        match type_id {
            0 => Some(AttrType::Number),
            1 => Some(AttrType::String),
            _ => None,
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Number => write!(f, "NUM"),
            AttrType::String => write!(f, "STR"),
        }
    }
}
