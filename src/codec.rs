//! Conversion between typed items and DynamoDB wire records.
//!
//! A [`Codec`] is the only place that knows how an item is laid out on the
//! wire. [`ItemCodec`] derives one from `serde` for any [`DynamoItem`], and
//! [`GsiCodec`] does the same for the global secondary index declared by a
//! [`GsiItem`].
//!
//! Null handling is decided by the item's `serde` attributes. `Option` fields
//! are written as the NULL marker unless they carry
//! `#[serde(skip_serializing_if = "Option::is_none")]`, in which case they are
//! left out of the record.

use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::{from_attribute_value, from_item, to_attribute_value, to_item};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::Error;
use crate::table::TableBuilder;

/// A wire record: attribute name to tagged attribute value
pub type Record = HashMap<String, AttributeValue>;

/// Encodes and decodes one item type for one keyspace
///
/// `Partition` and `Sort` are the typed key values of the keyspace the codec
/// serves. For a secondary index these are the index's key types, not the
/// base table's.
pub trait Codec: Send + Sync + 'static {
    /// Decoded item type
    type Item: Send + Sync + 'static;
    /// Partition key value type
    type Partition: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Sort key value type
    type Sort: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Encode an item into a full wire record
    fn encode(&self, item: &Self::Item) -> Result<Record, Error>;

    /// Decode a wire record into an item
    fn decode(&self, record: Record) -> Result<Self::Item, Error>;

    /// Partition key of an item
    fn partition_key(&self, item: &Self::Item) -> Self::Partition;

    /// Sort key of an item, `None` when the keyspace has no sort attribute
    fn sort_key(&self, item: &Self::Item) -> Option<Self::Sort>;

    /// Encode a partition key value
    fn partition_to_wire(&self, value: &Self::Partition) -> Result<AttributeValue, Error>;

    /// Encode a sort key value
    fn sort_to_wire(&self, value: &Self::Sort) -> Result<AttributeValue, Error>;

    /// Decode a partition key value
    fn partition_from_wire(&self, value: AttributeValue) -> Result<Self::Partition, Error>;

    /// Decode a sort key value
    fn sort_from_wire(&self, value: AttributeValue) -> Result<Self::Sort, Error>;
}

/// Bound shared by every typed key value a `serde` codec can move over the wire
pub trait KeyValue:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
}

impl<T> KeyValue for T where
    T: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
}

/// An item stored in a DynamoDB table
///
/// # Example
///
/// ```rust
/// use dynamo_access::DynamoItem;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Order {
///     customer_id: String,
///     order_id: u64,
///     total: f64,
/// }
///
/// impl DynamoItem for Order {
///     type PK = String;
///     type SK = u64;
///
///     const TABLE: &'static str = "orders";
///     const PARTITION_KEY: &'static str = "customer_id";
///     const SORT_KEY: Option<&'static str> = Some("order_id");
///
///     fn partition_key(&self) -> Self::PK {
///         self.customer_id.clone()
///     }
///
///     fn sort_key(&self) -> Option<Self::SK> {
///         Some(self.order_id)
///     }
/// }
/// ```
pub trait DynamoItem: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Associated partition key type
    type PK: KeyValue;

    /// Associated sort key type
    type SK: KeyValue;

    /// Name of the table
    const TABLE: &'static str;

    /// Partition key attribute of the table
    const PARTITION_KEY: &'static str;

    /// Sort key attribute of the table
    const SORT_KEY: Option<&'static str> = None;

    /// Partition key of this item
    fn partition_key(&self) -> Self::PK;

    /// Sort key of this item
    fn sort_key(&self) -> Option<Self::SK> {
        None
    }

    /// The `serde` codec for this item's table
    fn codec() -> ItemCodec<Self> {
        ItemCodec::new()
    }

    /// A table builder with the table name and key attributes already filled in
    fn table_builder() -> TableBuilder<ItemCodec<Self>> {
        let builder = TableBuilder::new(Self::codec())
            .table_name(Self::TABLE)
            .partition_key(Self::PARTITION_KEY);

        match Self::SORT_KEY {
            Some(sort_key) => builder.sort_key(sort_key),
            None => builder,
        }
    }
}

/// Global secondary index declared on a [`DynamoItem`]
pub trait GsiItem: DynamoItem {
    /// GSI partition key type
    type GsiPK: KeyValue;

    /// GSI sort key type
    type GsiSK: KeyValue;

    /// GSI partition key field name
    const GSI_PARTITION_KEY: &'static str;

    /// GSI sort key field name (optional)
    const GSI_SORT_KEY: Option<&'static str> = None;

    /// Returns the GSI partition key value for this item
    fn gsi_partition_key(&self) -> Self::GsiPK;

    /// Returns the GSI sort key value for this item (optional)
    fn gsi_sort_key(&self) -> Option<Self::GsiSK> {
        None
    }

    /// GSI index name
    fn global_index_name() -> String {
        if let Some(sort_key) = Self::GSI_SORT_KEY {
            format!(
                "global-{}-{}-{}",
                Self::TABLE,
                Self::GSI_PARTITION_KEY,
                sort_key
            )
        } else {
            format!("global-{}-{}", Self::TABLE, Self::GSI_PARTITION_KEY)
        }
    }

    /// The `serde` codec for this item's global index
    fn gsi_codec() -> GsiCodec<Self> {
        GsiCodec::new()
    }
}

fn wire<V: Serialize>(value: &V) -> Result<AttributeValue, Error> {
    Ok(to_attribute_value(value)?)
}

fn unwire<V: DeserializeOwned>(value: AttributeValue) -> Result<V, Error> {
    Ok(from_attribute_value(value)?)
}

/// `serde_dynamo` codec over the base table of a [`DynamoItem`]
pub struct ItemCodec<T>(PhantomData<fn() -> T>);

impl<T> ItemCodec<T> {
    /// Create the codec
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ItemCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ItemCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ItemCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ItemCodec")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DynamoItem> Codec for ItemCodec<T> {
    type Item = T;
    type Partition = T::PK;
    type Sort = T::SK;

    fn encode(&self, item: &T) -> Result<Record, Error> {
        Ok(to_item(item)?)
    }

    fn decode(&self, record: Record) -> Result<T, Error> {
        Ok(from_item(record)?)
    }

    fn partition_key(&self, item: &T) -> T::PK {
        item.partition_key()
    }

    fn sort_key(&self, item: &T) -> Option<T::SK> {
        item.sort_key()
    }

    fn partition_to_wire(&self, value: &T::PK) -> Result<AttributeValue, Error> {
        wire(value)
    }

    fn sort_to_wire(&self, value: &T::SK) -> Result<AttributeValue, Error> {
        wire(value)
    }

    fn partition_from_wire(&self, value: AttributeValue) -> Result<T::PK, Error> {
        unwire(value)
    }

    fn sort_from_wire(&self, value: AttributeValue) -> Result<T::SK, Error> {
        unwire(value)
    }
}

/// `serde_dynamo` codec over the global index of a [`GsiItem`]
pub struct GsiCodec<T>(PhantomData<fn() -> T>);

impl<T> GsiCodec<T> {
    /// Create the codec
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for GsiCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for GsiCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for GsiCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GsiCodec")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T: GsiItem> Codec for GsiCodec<T> {
    type Item = T;
    type Partition = T::GsiPK;
    type Sort = T::GsiSK;

    fn encode(&self, item: &T) -> Result<Record, Error> {
        Ok(to_item(item)?)
    }

    fn decode(&self, record: Record) -> Result<T, Error> {
        Ok(from_item(record)?)
    }

    fn partition_key(&self, item: &T) -> T::GsiPK {
        item.gsi_partition_key()
    }

    fn sort_key(&self, item: &T) -> Option<T::GsiSK> {
        item.gsi_sort_key()
    }

    fn partition_to_wire(&self, value: &T::GsiPK) -> Result<AttributeValue, Error> {
        wire(value)
    }

    fn sort_to_wire(&self, value: &T::GsiSK) -> Result<AttributeValue, Error> {
        wire(value)
    }

    fn partition_from_wire(&self, value: AttributeValue) -> Result<T::GsiPK, Error> {
        unwire(value)
    }

    fn sort_from_wire(&self, value: AttributeValue) -> Result<T::GsiSK, Error> {
        unwire(value)
    }
}
