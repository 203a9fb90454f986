mod attr_type;
mod attribute;

pub use attr_type::AttrType;
pub use attribute::{decode_record, encode_record, Attribute, Record};
