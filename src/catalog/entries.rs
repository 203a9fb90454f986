use crate::common::{BlockId, CairnError, Result};
use crate::record::{AttrType, Attribute, Record};

/// Column positions inside a relation catalog record
pub const RELCAT_REL_NAME_INDEX: usize = 0;
pub const RELCAT_NO_ATTRIBUTES_INDEX: usize = 1;
pub const RELCAT_NO_RECORDS_INDEX: usize = 2;
pub const RELCAT_FIRST_BLOCK_INDEX: usize = 3;
pub const RELCAT_LAST_BLOCK_INDEX: usize = 4;
pub const RELCAT_NO_SLOTS_PER_BLOCK_INDEX: usize = 5;

/// Column positions inside an attribute catalog record
pub const ATTRCAT_REL_NAME_INDEX: usize = 0;
pub const ATTRCAT_ATTR_NAME_INDEX: usize = 1;
pub const ATTRCAT_ATTR_TYPE_INDEX: usize = 2;
pub const ATTRCAT_PRIMARY_FLAG_INDEX: usize = 3;
pub const ATTRCAT_ROOT_BLOCK_INDEX: usize = 4;
pub const ATTRCAT_OFFSET_INDEX: usize = 5;

/// Column types of the relation catalog
pub const RELCAT_TYPES: [AttrType; 6] = [
    AttrType::String,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
];

/// Column types of the attribute catalog
pub const ATTRCAT_TYPES: [AttrType; 6] = [
    AttrType::String,
    AttrType::String,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
];

/// One row of the relation catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RelCatEntry {
    pub rel_name: String,
    pub num_attrs: usize,
    pub num_recs: usize,
    pub first_blk: Option<BlockId>,
    pub last_blk: Option<BlockId>,
    pub num_slots_per_blk: usize,
}

impl RelCatEntry {
    pub fn to_record(&self) -> Record {
        vec![
            Attribute::from(self.rel_name.as_str()),
            Attribute::Number(self.num_attrs as f64),
            Attribute::Number(self.num_recs as f64),
            Attribute::Number(BlockId::to_raw(self.first_blk) as f64),
            Attribute::Number(BlockId::to_raw(self.last_blk) as f64),
            Attribute::Number(self.num_slots_per_blk as f64),
        ]
    }

    pub fn from_record(record: &[Attribute]) -> Result<Self> {
        if record.len() != RELCAT_TYPES.len() {
            return Err(CairnError::CorruptCatalog(format!(
                "relation catalog row has {} attributes",
                record.len()
            )));
        }

        Ok(Self {
            rel_name: string_field(record, RELCAT_REL_NAME_INDEX)?,
            num_attrs: count_field(record, RELCAT_NO_ATTRIBUTES_INDEX)?,
            num_recs: count_field(record, RELCAT_NO_RECORDS_INDEX)?,
            first_blk: block_field(record, RELCAT_FIRST_BLOCK_INDEX)?,
            last_blk: block_field(record, RELCAT_LAST_BLOCK_INDEX)?,
            num_slots_per_blk: count_field(record, RELCAT_NO_SLOTS_PER_BLOCK_INDEX)?,
        })
    }
}

/// One row of the attribute catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrCatEntry {
    pub rel_name: String,
    pub attr_name: String,
    pub attr_type: AttrType,
    pub primary_flag: bool,
    /// Root of the B+ tree built on this attribute, if any
    pub root_block: Option<BlockId>,
    /// Position of the attribute within a record
    pub offset: usize,
}

impl AttrCatEntry {
    pub fn new(rel_name: &str, attr_name: &str, attr_type: AttrType, offset: usize) -> Self {
        Self {
            rel_name: rel_name.to_string(),
            attr_name: attr_name.to_string(),
            attr_type,
            primary_flag: false,
            root_block: None,
            offset,
        }
    }

    pub fn to_record(&self) -> Record {
        vec![
            Attribute::from(self.rel_name.as_str()),
            Attribute::from(self.attr_name.as_str()),
            Attribute::Number(self.attr_type.type_id() as f64),
            Attribute::Number(if self.primary_flag { 1.0 } else { -1.0 }),
            Attribute::Number(BlockId::to_raw(self.root_block) as f64),
            Attribute::Number(self.offset as f64),
        ]
    }

    pub fn from_record(record: &[Attribute]) -> Result<Self> {
        if record.len() != ATTRCAT_TYPES.len() {
            return Err(CairnError::CorruptCatalog(format!(
                "attribute catalog row has {} attributes",
                record.len()
            )));
        }

        let type_id = count_field(record, ATTRCAT_ATTR_TYPE_INDEX)?;
        let attr_type = AttrType::from_type_id(type_id as u8).ok_or_else(|| {
            CairnError::CorruptCatalog(format!("unknown attribute type {}", type_id))
        })?;

        Ok(Self {
            rel_name: string_field(record, ATTRCAT_REL_NAME_INDEX)?,
            attr_name: string_field(record, ATTRCAT_ATTR_NAME_INDEX)?,
            attr_type,
            primary_flag: number_field(record, ATTRCAT_PRIMARY_FLAG_INDEX)? > 0.0,
            root_block: block_field(record, ATTRCAT_ROOT_BLOCK_INDEX)?,
            offset: count_field(record, ATTRCAT_OFFSET_INDEX)?,
        })
    }
}

fn string_field(record: &[Attribute], index: usize) -> Result<String> {
    record[index]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CairnError::CorruptCatalog(format!("field {} is not a string", index)))
}

fn number_field(record: &[Attribute], index: usize) -> Result<f64> {
    record[index]
        .as_number()
        .ok_or_else(|| CairnError::CorruptCatalog(format!("field {} is not a number", index)))
}

fn count_field(record: &[Attribute], index: usize) -> Result<usize> {
    let value = number_field(record, index)?;
    if value < 0.0 {
        return Err(CairnError::CorruptCatalog(format!(
            "field {} is negative",
            index
        )));
    }
    Ok(value as usize)
}

fn block_field(record: &[Attribute], index: usize) -> Result<Option<BlockId>> {
    Ok(BlockId::from_raw(number_field(record, index)? as i32))
}
