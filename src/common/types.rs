use std::cmp::Ordering;
use std::fmt;

/// On-disk encoding of "no block" in header links and catalog fields
pub const NO_BLOCK: i32 = -1;

/// Block identifier - index of a fixed-size block on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Decodes a stored block link, where any negative value means "none".
    pub fn from_raw(raw: i32) -> Option<Self> {
        if raw < 0 {
            None
        } else {
            Some(Self(raw as u32))
        }
    }

    /// Encodes an optional block link for storage.
    pub fn to_raw(block: Option<Self>) -> i32 {
        block.map(|b| b.0 as i32).unwrap_or(NO_BLOCK)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

/// Record identifier - a block and the slot inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub block: BlockId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(block: BlockId, slot: usize) -> Self {
        Self { block, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.block.0, self.slot)
    }
}

/// Relation identifier - index into the open relation table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelId(pub usize);

impl RelId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelId({})", self.0)
    }
}

/// Comparison operator applied as `compare(record[attr], value) <op> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchOp {
    Ne,
    Lt,
    Le,
    Eq,
    Gt,
    Ge,
}

impl SearchOp {
    /// Returns true if an attribute comparing as `ord` against the search
    /// value satisfies this operator.
    pub fn matches(&self, ord: Ordering) -> bool {
        match self {
            SearchOp::Ne => ord != Ordering::Equal,
            SearchOp::Lt => ord == Ordering::Less,
            SearchOp::Le => ord != Ordering::Greater,
            SearchOp::Eq => ord == Ordering::Equal,
            SearchOp::Gt => ord == Ordering::Greater,
            SearchOp::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for SearchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            SearchOp::Ne => "!=",
            SearchOp::Lt => "<",
            SearchOp::Le => "<=",
            SearchOp::Eq => "=",
            SearchOp::Gt => ">",
            SearchOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}
