use aws_sdk_dynamodb::types::AttributeValue;
use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::codec::{Codec, Record};
use crate::table::helpers::records;
use crate::table::query::{Query, Scan};
use crate::table::types::{Key, KeySchema};
use crate::transport::DynamoTransport;

/// Read access to one queryable keyspace: a table or one of its secondary indexes
///
/// Cloning is cheap and clones share the codec and transport.
pub struct Index<C: Codec> {
    pub(crate) codec: Arc<C>,
    pub(crate) schema: Arc<KeySchema>,
    pub(crate) transport: Arc<dyn DynamoTransport>,
}

impl<C: Codec> Clone for Index<C> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            schema: Arc::clone(&self.schema),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<C: Codec> fmt::Debug for Index<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("table_name", &self.schema.table_name)
            .field("index_name", &self.schema.index_name)
            .field("partition_key", &self.schema.partition_attribute)
            .field("sort_key", &self.schema.sort_attribute)
            .finish()
    }
}

impl<C: Codec> Index<C> {
    pub(crate) fn new(
        codec: Arc<C>,
        schema: KeySchema,
        transport: Arc<dyn DynamoTransport>,
    ) -> Self {
        Self {
            codec,
            schema: Arc::new(schema),
            transport,
        }
    }

    /// Table this keyspace belongs to
    pub fn table_name(&self) -> &str {
        &self.schema.table_name
    }

    /// Secondary index name, `None` for the base table
    pub fn index_name(&self) -> Option<&str> {
        self.schema.index_name.as_deref()
    }

    /// Partition key attribute of this keyspace
    pub fn partition_key_attribute(&self) -> &str {
        &self.schema.partition_attribute
    }

    /// Sort key attribute of this keyspace
    pub fn sort_key_attribute(&self) -> Option<&str> {
        self.schema.sort_attribute.as_deref()
    }

    /// The codec used for items and key values
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Encode a partition key value
    pub fn partition_key_to_wire(&self, value: &C::Partition) -> Result<AttributeValue, Error> {
        self.codec.partition_to_wire(value)
    }

    /// Encode a sort key value
    pub fn sort_key_to_wire(&self, value: &C::Sort) -> Result<AttributeValue, Error> {
        self.codec.sort_to_wire(value)
    }

    /// Decode a record read from this keyspace
    pub fn decode(&self, record: Record) -> Result<C::Item, Error> {
        self.codec.decode(record)
    }

    /// Cursor that resumes a query or scan right after `item`
    ///
    /// Holds only key attributes. Secondary index cursors also carry the base
    /// table's key, as DynamoDB requires.
    pub fn exclusive_start(&self, item: &C::Item) -> Result<Record, Error> {
        let record = self.codec.encode(item)?;
        Ok(records::project(&record, &self.schema.cursor_attributes()))
    }

    /// Start a query on one partition
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use dynamo_access::{Codec, Error, Index};
    /// # fn example<C: Codec<Partition = String, Sort = u32>>(index: &Index<C>) -> Result<(), Error> {
    /// let recent = index
    ///     .query("player-1".to_string())
    ///     .sort_above(&30, true)?
    ///     .scan_forward(false)
    ///     .limit(10)
    ///     .invoke()?;
    ///
    /// for item in recent {
    ///     let _item = item?;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn query(&self, partition: C::Partition) -> Query<C> {
        Query::new(self.clone(), partition)
    }

    /// Start a scan of one segment out of `total_segments`
    ///
    /// `total_segments <= 1` scans the whole keyspace in one traversal.
    pub fn scan(&self, segment: u32, total_segments: u32) -> Scan<C> {
        Scan::new(self.clone(), segment, total_segments)
    }

    /// Start an unsegmented scan
    pub fn scan_all(&self) -> Scan<C> {
        self.scan(0, 1)
    }

    /// Partition key of an item in this keyspace
    pub fn partition_key(&self, item: &C::Item) -> C::Partition {
        self.codec.partition_key(item)
    }

    /// Sort key of an item in this keyspace
    pub fn sort_key(&self, item: &C::Item) -> Option<C::Sort> {
        self.codec.sort_key(item)
    }

    /// Key of an item in this keyspace
    pub fn key_of(&self, item: &C::Item) -> Key<C::Partition, C::Sort> {
        Key::new(self.partition_key(item), self.sort_key(item))
    }

    /// Wire key record for a typed key
    pub(crate) fn key_record(&self, key: &Key<C::Partition, C::Sort>) -> Result<Record, Error> {
        let mut record = Record::with_capacity(2);
        let partition = self.codec.partition_to_wire(key.partition())?;
        let _ = record.insert(
            self.schema.partition_attribute.clone(),
            self.non_null(&self.schema.partition_attribute, partition)?,
        );

        match (&self.schema.sort_attribute, key.sort()) {
            (Some(attribute), Some(sort)) => {
                let sort = self.codec.sort_to_wire(sort)?;
                let _ = record.insert(attribute.clone(), self.non_null(attribute, sort)?);
            }
            (None, None) => {}
            (Some(attribute), None) => {
                return Err(Error::usage(format!(
                    "key for `{}` is missing sort attribute `{attribute}`",
                    self.schema.table_name
                )));
            }
            (None, Some(_)) => {
                return Err(Error::usage(format!(
                    "`{}` has no sort attribute but the key carries a sort value",
                    self.schema.table_name
                )));
            }
        }

        Ok(record)
    }

    fn non_null(&self, attribute: &str, value: AttributeValue) -> Result<AttributeValue, Error> {
        if value.is_null() {
            return Err(Error::encoding(format!(
                "key attribute `{attribute}` of `{}` is null",
                self.schema.table_name
            )));
        }
        Ok(value)
    }

    /// Typed key from a wire key record
    pub(crate) fn key_from_record(
        &self,
        mut record: Record,
    ) -> Result<Key<C::Partition, C::Sort>, Error> {
        let partition = record
            .remove(&self.schema.partition_attribute)
            .ok_or_else(|| {
                Error::encoding(format!(
                    "key record is missing partition attribute `{}`",
                    self.schema.partition_attribute
                ))
            })?;

        let sort = self
            .schema
            .sort_attribute
            .as_ref()
            .and_then(|attribute| record.remove(attribute))
            .map(|value| self.codec.sort_from_wire(value))
            .transpose()?;

        Ok(Key::new(self.codec.partition_from_wire(partition)?, sort))
    }
}
