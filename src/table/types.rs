use std::fmt;

use crate::capacity::CapacityUsed;

/// Most items DynamoDB accepts in one BatchGetItem or BatchWriteItem request
pub const MAX_ITEMS_PER_BATCH: usize = 25;

/// Primary key of an item in one keyspace
///
/// The sort component is present exactly when the keyspace declares a sort
/// attribute. Tables check this before any request is sent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key<P, S> {
    partition: P,
    sort: Option<S>,
}

impl<P, S> Key<P, S> {
    /// Key from a partition value and an optional sort value
    pub fn new(partition: P, sort: Option<S>) -> Self {
        Self { partition, sort }
    }

    /// Key for a keyspace without a sort attribute
    pub fn partition_only(partition: P) -> Self {
        Self::new(partition, None)
    }

    /// Key for a keyspace with a sort attribute
    pub fn composite(partition: P, sort: S) -> Self {
        Self::new(partition, Some(sort))
    }

    /// Partition value
    pub fn partition(&self) -> &P {
        &self.partition
    }

    /// Sort value
    pub fn sort(&self) -> Option<&S> {
        self.sort.as_ref()
    }

    /// Split into partition and sort values
    pub fn into_parts(self) -> (P, Option<S>) {
        (self.partition, self.sort)
    }
}

impl<P, S> From<(P, Option<S>)> for Key<P, S> {
    fn from((partition, sort): (P, Option<S>)) -> Self {
        Self::new(partition, sort)
    }
}

impl<P: fmt::Display, S: fmt::Display> fmt::Display for Key<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sort {
            Some(sort) => write!(f, "({}, {})", self.partition, sort),
            None => write!(f, "({})", self.partition),
        }
    }
}

/// Attribute layout of one keyspace
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct KeySchema {
    pub(crate) table_name: String,
    pub(crate) index_name: Option<String>,
    pub(crate) partition_attribute: String,
    pub(crate) sort_attribute: Option<String>,
    pub(crate) table_partition_attribute: String,
    pub(crate) table_sort_attribute: Option<String>,
}

impl KeySchema {
    /// Attributes that identify a position in this keyspace
    ///
    /// Secondary index cursors must also carry the base table's key.
    pub(crate) fn cursor_attributes(&self) -> Vec<&str> {
        let mut attributes = vec![self.partition_attribute.as_str()];
        attributes.extend(self.sort_attribute.as_deref());

        for attribute in [
            Some(self.table_partition_attribute.as_str()),
            self.table_sort_attribute.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            if !attributes.contains(&attribute) {
                attributes.push(attribute);
            }
        }

        attributes
    }
}

/// Result of a single-item operation together with the capacity it consumed
#[must_use = "extended results carry consumed capacity that should be checked"]
#[derive(Clone, Debug)]
pub struct ExtendedItemResult<T> {
    /// The decoded item, `None` when there was nothing to return
    pub item: Option<T>,
    /// Capacity consumed by the request
    pub capacity: CapacityUsed,
}

impl<T> ExtendedItemResult<T> {
    pub(crate) fn new(item: Option<T>, capacity: CapacityUsed) -> Self {
        Self { item, capacity }
    }

    /// Drop the capacity and keep the item
    pub fn into_item(self) -> Option<T> {
        self.item
    }
}

/// Accumulated outcome of one logical batch call across all of its chunks
///
/// `unprocessed` holds what the service declined in this pass. Nothing is
/// retried here; resubmit these entries to finish the batch.
#[must_use = "batch results contain unprocessed entries that should be resubmitted"]
#[derive(Clone, Debug)]
pub struct ExtendedBatchResult<T, U> {
    /// Decoded items returned by every chunk
    pub items: Vec<T>,
    /// Unprocessed values: keys or items the service did not process
    #[doc(alias = "unprocessed_values")]
    #[doc(alias = "unprocessedValues")]
    pub unprocessed: Vec<U>,
    /// Capacity consumed by every chunk
    pub capacity: CapacityUsed,
}

impl<T, U> ExtendedBatchResult<T, U> {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            unprocessed: Vec::new(),
            capacity: CapacityUsed::default(),
        }
    }

    /// True when the service processed every entry
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

impl<T, U> Default for ExtendedBatchResult<T, U> {
    fn default() -> Self {
        Self::new()
    }
}
