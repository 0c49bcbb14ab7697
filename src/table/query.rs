use aws_sdk_dynamodb::operation::query::QueryInput;
use aws_sdk_dynamodb::operation::scan::ScanInput;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnConsumedCapacity, Select};
use std::fmt;

use crate::Error;
use crate::codec::{Codec, Record};
use crate::table::helpers::expressions::{KeyConditionBuilder, SortCondition};
use crate::table::index::Index;
use crate::table::paging::{IterableResult, PageRequest};
use crate::table::types::Key;

/// Wire `Limit`: the page size when set, otherwise the total limit
fn wire_limit(limit: Option<usize>, page_size: Option<usize>) -> Option<i32> {
    page_size
        .or(limit)
        .map(|n| i32::try_from(n).unwrap_or(i32::MAX))
}

/// Query over one partition of an [`Index`]
///
/// At most one sort key predicate can be set. Nothing is sent until
/// [`Query::invoke`].
pub struct Query<C: Codec> {
    index: Index<C>,
    partition: C::Partition,
    sort: Option<SortCondition>,
    scan_forward: bool,
    limit: Option<usize>,
    page_size: Option<usize>,
    start_key: Option<Record>,
    consistent_read: Option<bool>,
}

impl<C: Codec> fmt::Debug for Query<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("index", &self.index)
            .field("partition", &self.partition)
            .field("sort", &self.sort)
            .field("scan_forward", &self.scan_forward)
            .field("limit", &self.limit)
            .field("page_size", &self.page_size)
            .field("start_key", &self.start_key)
            .finish()
    }
}

impl<C: Codec> Query<C> {
    pub(crate) fn new(index: Index<C>, partition: C::Partition) -> Self {
        Self {
            index,
            partition,
            sort: None,
            scan_forward: true,
            limit: None,
            page_size: None,
            start_key: None,
            consistent_read: None,
        }
    }

    fn ensure_no_sort(&self) -> Result<(), Error> {
        if self.sort.is_some() {
            return Err(Error::usage("Only one sort expression can be used"));
        }
        Ok(())
    }

    fn set_sort(mut self, sort: SortCondition) -> Result<Self, Error> {
        self.ensure_no_sort()?;
        self.sort = Some(sort);
        Ok(self)
    }

    fn sort_wire(&self, value: &C::Sort) -> Result<AttributeValue, Error> {
        if self.index.sort_key_attribute().is_none() {
            return Err(Error::usage(format!(
                "`{}` has no sort key to put a condition on",
                self.index.index_name().unwrap_or(self.index.table_name())
            )));
        }
        self.index.sort_key_to_wire(value)
    }

    fn key_sort<'k>(&self, key: &'k Key<C::Partition, C::Sort>) -> Result<&'k C::Sort, Error> {
        if key.partition() != &self.partition {
            return Err(Error::usage("All partition values in a query must be equal"));
        }
        key.sort()
            .ok_or_else(|| Error::usage("key used as a sort bound has no sort value"))
    }

    /// Sort key between `low` and `high`, both inclusive
    pub fn sort_between(self, low: &C::Sort, high: &C::Sort) -> Result<Self, Error> {
        self.ensure_no_sort()?;
        let condition = SortCondition::Between(self.sort_wire(low)?, self.sort_wire(high)?);
        self.set_sort(condition)
    }

    /// Sort key above `bound`
    pub fn sort_above(self, bound: &C::Sort, inclusive: bool) -> Result<Self, Error> {
        self.ensure_no_sort()?;
        let bound = self.sort_wire(bound)?;
        self.set_sort(SortCondition::Above { bound, inclusive })
    }

    /// Sort key below `bound`
    pub fn sort_below(self, bound: &C::Sort, inclusive: bool) -> Result<Self, Error> {
        self.ensure_no_sort()?;
        let bound = self.sort_wire(bound)?;
        self.set_sort(SortCondition::Below { bound, inclusive })
    }

    /// Sort key starting with `prefix`
    pub fn sort_prefix(self, prefix: &C::Sort) -> Result<Self, Error> {
        self.ensure_no_sort()?;
        let prefix = self.sort_wire(prefix)?;
        self.set_sort(SortCondition::Prefix(prefix))
    }

    /// [`Query::sort_between`] with bounds taken from keys in the queried partition
    pub fn sort_between_keys(
        self,
        low: &Key<C::Partition, C::Sort>,
        high: &Key<C::Partition, C::Sort>,
    ) -> Result<Self, Error> {
        let (low, high) = (self.key_sort(low)?, self.key_sort(high)?);
        self.sort_between(low, high)
    }

    /// [`Query::sort_above`] with the bound taken from a key
    pub fn sort_above_key(
        self,
        bound: &Key<C::Partition, C::Sort>,
        inclusive: bool,
    ) -> Result<Self, Error> {
        let bound = self.key_sort(bound)?;
        self.sort_above(bound, inclusive)
    }

    /// [`Query::sort_below`] with the bound taken from a key
    pub fn sort_below_key(
        self,
        bound: &Key<C::Partition, C::Sort>,
        inclusive: bool,
    ) -> Result<Self, Error> {
        let bound = self.key_sort(bound)?;
        self.sort_below(bound, inclusive)
    }

    /// [`Query::sort_prefix`] with the prefix taken from a key
    pub fn sort_prefix_key(self, prefix: &Key<C::Partition, C::Sort>) -> Result<Self, Error> {
        let prefix = self.key_sort(prefix)?;
        self.sort_prefix(prefix)
    }

    /// Ascending sort key order when `true` (the default)
    pub fn scan_forward(mut self, forward: bool) -> Self {
        self.scan_forward = forward;
        self
    }

    /// Stop after `limit` items in total
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Items requested per page; `0` leaves the page size to the limit
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = (page_size > 0).then_some(page_size);
        self
    }

    /// Resume after a cursor from [`IterableResult::exclusive_start`]
    pub fn start_key(mut self, start_key: impl Into<Option<Record>>) -> Self {
        self.start_key = start_key.into();
        self
    }

    /// Strongly consistent reads
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = Some(consistent);
        self
    }

    fn request(&self) -> Result<QueryInput, Error> {
        let mut condition = KeyConditionBuilder::new().with_partition_key(
            self.index.partition_key_attribute(),
            self.index.partition_key_to_wire(&self.partition)?,
        );
        if let (Some(sort), Some(attribute)) = (&self.sort, self.index.sort_key_attribute()) {
            condition = condition.with_sort_condition(attribute, sort.clone());
        }
        let condition = condition.build();

        let select = self
            .index
            .index_name()
            .map(|_| Select::AllProjectedAttributes);

        Ok(QueryInput::builder()
            .table_name(self.index.table_name())
            .set_index_name(self.index.index_name().map(str::to_string))
            .set_select(select)
            .key_condition_expression(condition.expression)
            .set_expression_attribute_names(Some(condition.names))
            .set_expression_attribute_values(Some(condition.values))
            .scan_index_forward(self.scan_forward)
            .set_limit(wire_limit(self.limit, self.page_size))
            .set_exclusive_start_key(self.start_key.clone())
            .set_consistent_read(self.consistent_read)
            .return_consumed_capacity(ReturnConsumedCapacity::Indexes)
            .build()?)
    }

    /// Start the query
    ///
    /// The first page is requested right away unless the limit is zero.
    pub fn invoke(self) -> Result<IterableResult<C>, Error> {
        let request = self.request()?;
        IterableResult::new(&self.index, PageRequest::Query(request), self.limit)
    }
}

/// Full traversal of an [`Index`], optionally one segment of a parallel scan
pub struct Scan<C: Codec> {
    index: Index<C>,
    segment: u32,
    total_segments: u32,
    limit: Option<usize>,
    page_size: Option<usize>,
    start_key: Option<Record>,
    consistent_read: Option<bool>,
}

impl<C: Codec> fmt::Debug for Scan<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("index", &self.index)
            .field("segment", &self.segment)
            .field("total_segments", &self.total_segments)
            .field("limit", &self.limit)
            .field("page_size", &self.page_size)
            .field("start_key", &self.start_key)
            .finish()
    }
}

impl<C: Codec> Scan<C> {
    pub(crate) fn new(index: Index<C>, segment: u32, total_segments: u32) -> Self {
        Self {
            index,
            segment,
            total_segments,
            limit: None,
            page_size: None,
            start_key: None,
            consistent_read: None,
        }
    }

    /// Stop after `limit` items in total
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Items requested per page; `0` leaves the page size to the limit
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = (page_size > 0).then_some(page_size);
        self
    }

    /// Resume after a cursor from [`IterableResult::exclusive_start`]
    pub fn start_key(mut self, start_key: impl Into<Option<Record>>) -> Self {
        self.start_key = start_key.into();
        self
    }

    /// Strongly consistent reads
    pub fn consistent_read(mut self, consistent: bool) -> Self {
        self.consistent_read = Some(consistent);
        self
    }

    fn request(&self) -> Result<ScanInput, Error> {
        let segmented = self.total_segments > 1;
        if segmented && self.segment >= self.total_segments {
            return Err(Error::usage(format!(
                "scan segment {} is out of range for {} segments",
                self.segment, self.total_segments
            )));
        }

        let to_i32 = |n: u32| i32::try_from(n).unwrap_or(i32::MAX);

        Ok(ScanInput::builder()
            .table_name(self.index.table_name())
            .set_index_name(self.index.index_name().map(str::to_string))
            .set_segment(segmented.then(|| to_i32(self.segment)))
            .set_total_segments(segmented.then(|| to_i32(self.total_segments)))
            .set_limit(wire_limit(self.limit, self.page_size))
            .set_exclusive_start_key(self.start_key.clone())
            .set_consistent_read(self.consistent_read)
            .return_consumed_capacity(ReturnConsumedCapacity::Indexes)
            .build()?)
    }

    /// Start the scan
    pub fn invoke(self) -> Result<IterableResult<C>, Error> {
        let request = self.request()?;
        IterableResult::new(&self.index, PageRequest::Scan(request), self.limit)
    }
}
