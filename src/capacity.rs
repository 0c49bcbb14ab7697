use aws_sdk_dynamodb::types::{Capacity, ConsumedCapacity};
use std::collections::{BTreeMap, HashMap};

/// Read and write units consumed against one secondary index
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReadWrite {
    /// Read capacity units
    pub read: f64,
    /// Write capacity units
    pub write: f64,
}

impl ReadWrite {
    fn add(&mut self, raw: &Capacity) {
        self.read += raw.read_capacity_units.unwrap_or_default();
        self.write += raw.write_capacity_units.unwrap_or_default();
    }
}

/// Additive accumulator of the capacity consumed by one logical operation
///
/// Every page of a query and every chunk of a batch is merged in with
/// [`CapacityUsed::add`]. Missing fields in the raw record count as zero and
/// the merge is order independent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapacityUsed {
    /// Read units across the table and all indexes
    pub total_read: f64,
    /// Write units across the table and all indexes
    pub total_write: f64,
    /// Combined units as reported by the service when no read/write split is given
    pub total_units: f64,
    /// Read units against the base table
    pub table_read: f64,
    /// Write units against the base table
    pub table_write: f64,
    /// Units per secondary index, global and local alike
    pub indexes: BTreeMap<String, ReadWrite>,
}

impl CapacityUsed {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one raw capacity record; `None` is a no-op
    pub fn add(&mut self, raw: Option<&ConsumedCapacity>) {
        let Some(raw) = raw else {
            return;
        };

        self.total_read += raw.read_capacity_units.unwrap_or_default();
        self.total_write += raw.write_capacity_units.unwrap_or_default();
        self.total_units += raw.capacity_units.unwrap_or_default();

        if let Some(table) = &raw.table {
            self.table_read += table.read_capacity_units.unwrap_or_default();
            self.table_write += table.write_capacity_units.unwrap_or_default();
        }

        if let Some(indexes) = &raw.global_secondary_indexes {
            self.add_indexes(indexes);
        }
        if let Some(indexes) = &raw.local_secondary_indexes {
            self.add_indexes(indexes);
        }
    }

    /// Merge every record of a batch response
    pub fn add_all<'a, I>(&mut self, raw: I)
    where
        I: IntoIterator<Item = &'a ConsumedCapacity>,
    {
        for record in raw {
            self.add(Some(record));
        }
    }

    /// Merge another accumulator into this one
    pub fn merge(&mut self, other: &CapacityUsed) {
        self.total_read += other.total_read;
        self.total_write += other.total_write;
        self.total_units += other.total_units;
        self.table_read += other.table_read;
        self.table_write += other.table_write;

        for (name, rw) in &other.indexes {
            let entry = self.indexes.entry(name.clone()).or_default();
            entry.read += rw.read;
            entry.write += rw.write;
        }
    }

    /// Units recorded against one secondary index
    pub fn index(&self, name: &str) -> ReadWrite {
        self.indexes.get(name).copied().unwrap_or_default()
    }

    /// True when nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn add_indexes(&mut self, raw: &HashMap<String, Capacity>) {
        for (name, capacity) in raw {
            self.indexes.entry(name.clone()).or_default().add(capacity);
        }
    }
}

impl From<&ConsumedCapacity> for CapacityUsed {
    fn from(raw: &ConsumedCapacity) -> Self {
        let mut capacity = Self::default();
        capacity.add(Some(raw));
        capacity
    }
}
