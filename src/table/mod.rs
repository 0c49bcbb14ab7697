mod batch;
mod helpers;
mod index;
mod operations;
mod paging;
mod query;
mod types;

pub use batch::{BatchDeleteResult, BatchGetResult, BatchPutResult};
pub use index::Index;
pub use paging::IterableResult;
pub use query::{Query, Scan};
pub use types::{ExtendedBatchResult, ExtendedItemResult, Key, MAX_ITEMS_PER_BATCH};

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::Error;
use crate::codec::{Codec, GsiItem, ItemCodec, Record};
use crate::transport::{BlockingBridge, BlockingTransport, DynamoTransport};
use types::KeySchema;

#[derive(Clone, Debug, PartialEq, Eq)]
struct SecondaryIndex {
    partition_attribute: String,
    sort_attribute: Option<String>,
}

#[derive(Debug)]
struct TableConfig {
    indexes: HashMap<String, SecondaryIndex>,
    return_old_values: bool,
    batch_concurrency: Option<usize>,
}

/// Read and write access to one DynamoDB table
///
/// A table is also the [`Index`] over its own primary key; [`Table::as_index`]
/// exposes it and the query helpers below delegate to it. Tables are cheap to
/// clone and safe to share between tasks.
pub struct Table<C: Codec> {
    base: Index<C>,
    config: Arc<TableConfig>,
}

impl<C: Codec> Clone for Table<C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<C: Codec> fmt::Debug for Table<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("base", &self.base)
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Codec> Table<C> {
    /// The base table keyspace
    pub fn as_index(&self) -> &Index<C> {
        &self.base
    }

    /// Table name
    pub fn table_name(&self) -> &str {
        self.base.table_name()
    }

    /// Partition key attribute
    pub fn partition_key_attribute(&self) -> &str {
        self.base.partition_key_attribute()
    }

    /// Sort key attribute
    pub fn sort_key_attribute(&self) -> Option<&str> {
        self.base.sort_key_attribute()
    }

    /// Encode a partition key value
    pub fn partition_key_to_wire(&self, value: &C::Partition) -> Result<AttributeValue, Error> {
        self.base.partition_key_to_wire(value)
    }

    /// Encode a sort key value
    pub fn sort_key_to_wire(&self, value: &C::Sort) -> Result<AttributeValue, Error> {
        self.base.sort_key_to_wire(value)
    }

    /// Decode a record read from this table
    pub fn decode(&self, record: Record) -> Result<C::Item, Error> {
        self.base.decode(record)
    }

    /// Cursor that resumes a query or scan right after `item`
    pub fn exclusive_start(&self, item: &C::Item) -> Result<Record, Error> {
        self.base.exclusive_start(item)
    }

    /// Start a query on one partition of the table
    pub fn query(&self, partition: C::Partition) -> Query<C> {
        self.base.query(partition)
    }

    /// Start a scan of one segment of the table
    pub fn scan(&self, segment: u32, total_segments: u32) -> Scan<C> {
        self.base.scan(segment, total_segments)
    }

    /// Start an unsegmented scan of the table
    pub fn scan_all(&self) -> Scan<C> {
        self.base.scan_all()
    }

    /// Partition key of an item
    pub fn partition_key(&self, item: &C::Item) -> C::Partition {
        self.base.partition_key(item)
    }

    /// Sort key of an item
    pub fn sort_key(&self, item: &C::Item) -> Option<C::Sort> {
        self.base.sort_key(item)
    }

    /// Primary key of an item
    pub fn key_of(&self, item: &C::Item) -> Key<C::Partition, C::Sort> {
        self.base.key_of(item)
    }

    /// Index over a secondary index registered on the builder
    ///
    /// `codec` decides how items and key values of that index are encoded.
    pub fn index<I: Codec>(&self, name: &str, codec: I) -> Result<Index<I>, Error> {
        let secondary = self.config.indexes.get(name).ok_or_else(|| {
            Error::configuration(format!(
                "table `{}` has no secondary index `{name}`",
                self.table_name()
            ))
        })?;

        let schema = KeySchema {
            table_name: self.base.schema.table_name.clone(),
            index_name: Some(name.to_string()),
            partition_attribute: secondary.partition_attribute.clone(),
            sort_attribute: secondary.sort_attribute.clone(),
            table_partition_attribute: self.base.schema.partition_attribute.clone(),
            table_sort_attribute: self.base.schema.sort_attribute.clone(),
        };

        Ok(Index::new(
            Arc::new(codec),
            schema,
            Arc::clone(&self.base.transport),
        ))
    }

    pub(crate) fn return_old_values(&self) -> bool {
        self.config.return_old_values
    }

    pub(crate) fn batch_concurrency(&self) -> Option<usize> {
        self.config.batch_concurrency
    }
}

impl<T: GsiItem> Table<ItemCodec<T>> {
    /// Index over the global secondary index declared by `T`
    pub fn global_index(&self) -> Result<Index<crate::GsiCodec<T>>, Error> {
        self.index(&T::global_index_name(), T::gsi_codec())
    }
}

/// Builder for [`Table`]
///
/// # Example
///
/// ```rust,no_run
/// # use dynamo_access::{DynamoItem, Error};
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Debug, Clone, Serialize, Deserialize)]
/// # struct Score { player: String, level: u32, points: u64 }
/// # impl DynamoItem for Score {
/// #     type PK = String;
/// #     type SK = u32;
/// #     const TABLE: &'static str = "scores";
/// #     const PARTITION_KEY: &'static str = "player";
/// #     const SORT_KEY: Option<&'static str> = Some("level");
/// #     fn partition_key(&self) -> String { self.player.clone() }
/// #     fn sort_key(&self) -> Option<u32> { Some(self.level) }
/// # }
/// # async fn example() -> Result<(), Error> {
/// let scores = Score::table_builder()
///     .secondary_index("by-points", "points", None)
///     .default_client()
///     .await
///     .build()?;
///
/// let best = scores.get_item_async(&("alice".to_string(), Some(3)).into()).await?;
/// # Ok(())
/// # }
/// ```
pub struct TableBuilder<C> {
    codec: C,
    table_name: Option<String>,
    partition_key: Option<String>,
    sort_key: Option<String>,
    indexes: HashMap<String, SecondaryIndex>,
    transport: Option<Arc<dyn DynamoTransport>>,
    blocking_transport: Option<Arc<dyn BlockingTransport>>,
    return_old_values: bool,
    batch_concurrency: Option<usize>,
}

impl<C> fmt::Debug for TableBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBuilder")
            .field("table_name", &self.table_name)
            .field("partition_key", &self.partition_key)
            .field("sort_key", &self.sort_key)
            .field("indexes", &self.indexes)
            .field("transport", &self.transport.is_some())
            .field("blocking_transport", &self.blocking_transport.is_some())
            .field("return_old_values", &self.return_old_values)
            .field("batch_concurrency", &self.batch_concurrency)
            .finish()
    }
}

impl<C: Codec> TableBuilder<C> {
    /// Start a builder around a codec
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            table_name: None,
            partition_key: None,
            sort_key: None,
            indexes: HashMap::new(),
            transport: None,
            blocking_transport: None,
            return_old_values: false,
            batch_concurrency: None,
        }
    }

    /// Table name
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Partition key attribute
    pub fn partition_key(mut self, attribute: impl Into<String>) -> Self {
        self.partition_key = Some(attribute.into());
        self
    }

    /// Sort key attribute
    pub fn sort_key(mut self, attribute: impl Into<String>) -> Self {
        self.sort_key = Some(attribute.into());
        self
    }

    /// Register a secondary index so [`Table::index`] can open it
    pub fn secondary_index(
        mut self,
        name: impl Into<String>,
        partition_attribute: impl Into<String>,
        sort_attribute: Option<&str>,
    ) -> Self {
        let _ = self.indexes.insert(
            name.into(),
            SecondaryIndex {
                partition_attribute: partition_attribute.into(),
                sort_attribute: sort_attribute.map(str::to_string),
            },
        );
        self
    }

    /// Use an SDK client
    pub fn client(self, client: Client) -> Self {
        self.transport(Arc::new(client))
    }

    /// Use the global client, see [`dynamodb_client`](crate::dynamodb_client)
    pub async fn default_client(self) -> Self {
        let client = crate::dynamodb_client().await.clone();
        self.client(client)
    }

    /// Use a custom non-blocking transport
    pub fn transport(mut self, transport: Arc<dyn DynamoTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a blocking transport
    ///
    /// Ignored when a non-blocking transport is also configured. Otherwise
    /// each call runs on tokio's blocking pool.
    pub fn blocking_transport(mut self, transport: Arc<dyn BlockingTransport>) -> Self {
        self.blocking_transport = Some(transport);
        self
    }

    /// Ask the service for the previous item on every put
    pub fn return_old_values(mut self, enabled: bool) -> Self {
        self.return_old_values = enabled;
        self
    }

    /// Cap the number of batch chunks in flight at once
    ///
    /// By default every chunk of a batch call is sent without waiting.
    pub fn batch_concurrency(mut self, limit: usize) -> Self {
        self.batch_concurrency = Some(limit.max(1));
        self
    }

    /// Validate the configuration and build the table
    pub fn build(self) -> Result<Table<C>, Error> {
        let table_name = non_empty(self.table_name, "table name")?;
        let partition_attribute = non_empty(self.partition_key, "partition key attribute")?;
        let sort_attribute = self
            .sort_key
            .map(|sort| non_empty(Some(sort), "sort key attribute"))
            .transpose()?;

        for (name, index) in &self.indexes {
            if name.is_empty() || index.partition_attribute.is_empty() {
                return Err(Error::configuration(format!(
                    "secondary index `{name}` on `{table_name}` needs a name and a partition key attribute"
                )));
            }
        }

        let transport: Arc<dyn DynamoTransport> = match (self.transport, self.blocking_transport)
        {
            (Some(transport), _) => transport,
            (None, Some(blocking)) => Arc::new(BlockingBridge::new(blocking)),
            (None, None) => {
                return Err(Error::configuration(format!(
                    "table `{table_name}` needs a client or transport"
                )));
            }
        };

        debug!(
            table = %table_name,
            partition_key = %partition_attribute,
            sort_key = ?sort_attribute,
            indexes = self.indexes.len(),
            "built table"
        );

        let schema = KeySchema {
            table_name,
            index_name: None,
            partition_attribute: partition_attribute.clone(),
            sort_attribute: sort_attribute.clone(),
            table_partition_attribute: partition_attribute,
            table_sort_attribute: sort_attribute,
        };

        Ok(Table {
            base: Index::new(Arc::new(self.codec), schema, transport),
            config: Arc::new(TableConfig {
                indexes: self.indexes,
                return_old_values: self.return_old_values,
                batch_concurrency: self.batch_concurrency,
            }),
        })
    }
}

impl<T: GsiItem> TableBuilder<ItemCodec<T>> {
    /// Register the global secondary index declared by `T`
    pub fn with_global_index(self) -> Self {
        self.secondary_index(
            T::global_index_name(),
            T::GSI_PARTITION_KEY,
            T::GSI_SORT_KEY,
        )
    }
}

fn non_empty(value: Option<String>, what: &str) -> Result<String, Error> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::configuration(format!("{what} is required"))),
    }
}
