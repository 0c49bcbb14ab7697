use aws_sdk_dynamodb::operation::delete_item::DeleteItemInput;
use aws_sdk_dynamodb::operation::get_item::GetItemInput;
use aws_sdk_dynamodb::operation::put_item::PutItemInput;
use aws_sdk_dynamodb::types::{ReturnConsumedCapacity, ReturnValue};
use tracing::trace;

use crate::Error;
use crate::blocking::block_on;
use crate::capacity::CapacityUsed;
use crate::codec::{Codec, Record};
use crate::table::Table;
use crate::table::helpers::records;
use crate::table::types::{ExtendedItemResult, Key};

type TableKey<C> = Key<<C as Codec>::Partition, <C as Codec>::Sort>;

fn present(record: Option<Record>) -> Option<Record> {
    record.filter(|record| !record.is_empty())
}

impl<C: Codec> Table<C> {
    async fn fetch_item(
        &self,
        key: &TableKey<C>,
        consistent_read: Option<bool>,
        capacity: ReturnConsumedCapacity,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        let input = GetItemInput::builder()
            .table_name(self.table_name())
            .set_key(Some(self.base.key_record(key)?))
            .set_consistent_read(consistent_read)
            .return_consumed_capacity(capacity)
            .build()?;

        trace!(table = %self.table_name(), "get item");
        let output = self.base.transport.get_item(input).await?;

        let item = present(output.item)
            .map(|record| self.decode(record))
            .transpose()?;
        let mut used = CapacityUsed::new();
        used.add(output.consumed_capacity.as_ref());

        Ok(ExtendedItemResult::new(item, used))
    }

    async fn store_item(
        &self,
        item: &C::Item,
        capacity: ReturnConsumedCapacity,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        let record = self.base.codec.encode(item)?;
        records::require_primary_key(&record, &self.base.schema)?;

        let input = PutItemInput::builder()
            .table_name(self.table_name())
            .set_item(Some(record))
            .set_return_values(self.return_old_values().then_some(ReturnValue::AllOld))
            .return_consumed_capacity(capacity)
            .build()?;

        trace!(table = %self.table_name(), "put item");
        let output = self.base.transport.put_item(input).await?;

        let previous = present(output.attributes)
            .map(|record| self.decode(record))
            .transpose()?;
        let mut used = CapacityUsed::new();
        used.add(output.consumed_capacity.as_ref());

        Ok(ExtendedItemResult::new(previous, used))
    }

    async fn remove_item(
        &self,
        key: &TableKey<C>,
        capacity: ReturnConsumedCapacity,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        let input = DeleteItemInput::builder()
            .table_name(self.table_name())
            .set_key(Some(self.base.key_record(key)?))
            .return_values(ReturnValue::AllOld)
            .return_consumed_capacity(capacity)
            .build()?;

        trace!(table = %self.table_name(), "delete item");
        let output = self.base.transport.delete_item(input).await?;

        let deleted = present(output.attributes)
            .map(|record| self.decode(record))
            .transpose()?;
        let mut used = CapacityUsed::new();
        used.add(output.consumed_capacity.as_ref());

        Ok(ExtendedItemResult::new(deleted, used))
    }

    /// Fetch an item by key; `None` when no item has that key
    pub async fn get_item_async(&self, key: &TableKey<C>) -> Result<Option<C::Item>, Error> {
        self.fetch_item(key, None, ReturnConsumedCapacity::None)
            .await
            .map(ExtendedItemResult::into_item)
    }

    /// Blocking [`Table::get_item_async`]
    pub fn get_item(&self, key: &TableKey<C>) -> Result<Option<C::Item>, Error> {
        block_on(self.get_item_async(key))
    }

    /// Fetch the stored version of `item`, addressed by its key
    pub async fn get_item_for_async(&self, item: &C::Item) -> Result<Option<C::Item>, Error> {
        self.get_item_async(&self.key_of(item)).await
    }

    /// Blocking [`Table::get_item_for_async`]
    pub fn get_item_for(&self, item: &C::Item) -> Result<Option<C::Item>, Error> {
        block_on(self.get_item_for_async(item))
    }

    /// Fetch an item by key together with the capacity consumed
    ///
    /// `consistent_read` is passed to the service unchanged.
    pub async fn get_item_extended_async(
        &self,
        key: &TableKey<C>,
        consistent_read: bool,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        self.fetch_item(key, Some(consistent_read), ReturnConsumedCapacity::Indexes)
            .await
    }

    /// Blocking [`Table::get_item_extended_async`]
    pub fn get_item_extended(
        &self,
        key: &TableKey<C>,
        consistent_read: bool,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        block_on(self.get_item_extended_async(key, consistent_read))
    }

    /// Item-addressed [`Table::get_item_extended_async`]
    pub async fn get_item_for_extended_async(
        &self,
        item: &C::Item,
        consistent_read: bool,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        self.get_item_extended_async(&self.key_of(item), consistent_read)
            .await
    }

    /// Blocking [`Table::get_item_for_extended_async`]
    pub fn get_item_for_extended(
        &self,
        item: &C::Item,
        consistent_read: bool,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        block_on(self.get_item_for_extended_async(item, consistent_read))
    }

    /// Write an item, replacing any item with the same key
    ///
    /// Returns the replaced item when the table was built with
    /// [`return_old_values(true)`](crate::TableBuilder::return_old_values),
    /// otherwise `None`. Fails before sending anything if the encoded record
    /// lacks its primary key.
    pub async fn put_item_async(&self, item: &C::Item) -> Result<Option<C::Item>, Error> {
        self.store_item(item, ReturnConsumedCapacity::None)
            .await
            .map(ExtendedItemResult::into_item)
    }

    /// Blocking [`Table::put_item_async`]
    pub fn put_item(&self, item: &C::Item) -> Result<Option<C::Item>, Error> {
        block_on(self.put_item_async(item))
    }

    /// [`Table::put_item_async`] with the capacity consumed
    pub async fn put_item_extended_async(
        &self,
        item: &C::Item,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        self.store_item(item, ReturnConsumedCapacity::Indexes).await
    }

    /// Blocking [`Table::put_item_extended_async`]
    pub fn put_item_extended(&self, item: &C::Item) -> Result<ExtendedItemResult<C::Item>, Error> {
        block_on(self.put_item_extended_async(item))
    }

    /// Delete an item by key, returning what was deleted
    pub async fn delete_item_async(&self, key: &TableKey<C>) -> Result<Option<C::Item>, Error> {
        self.remove_item(key, ReturnConsumedCapacity::None)
            .await
            .map(ExtendedItemResult::into_item)
    }

    /// Blocking [`Table::delete_item_async`]
    pub fn delete_item(&self, key: &TableKey<C>) -> Result<Option<C::Item>, Error> {
        block_on(self.delete_item_async(key))
    }

    /// Delete the stored version of `item`
    pub async fn delete_item_for_async(&self, item: &C::Item) -> Result<Option<C::Item>, Error> {
        self.delete_item_async(&self.key_of(item)).await
    }

    /// Blocking [`Table::delete_item_for_async`]
    pub fn delete_item_for(&self, item: &C::Item) -> Result<Option<C::Item>, Error> {
        block_on(self.delete_item_for_async(item))
    }

    /// [`Table::delete_item_async`] with the capacity consumed
    pub async fn delete_item_extended_async(
        &self,
        key: &TableKey<C>,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        self.remove_item(key, ReturnConsumedCapacity::Indexes).await
    }

    /// Blocking [`Table::delete_item_extended_async`]
    pub fn delete_item_extended(
        &self,
        key: &TableKey<C>,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        block_on(self.delete_item_extended_async(key))
    }

    /// Item-addressed [`Table::delete_item_extended_async`]
    pub async fn delete_item_for_extended_async(
        &self,
        item: &C::Item,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        self.delete_item_extended_async(&self.key_of(item)).await
    }

    /// Blocking [`Table::delete_item_for_extended_async`]
    pub fn delete_item_for_extended(
        &self,
        item: &C::Item,
    ) -> Result<ExtendedItemResult<C::Item>, Error> {
        block_on(self.delete_item_for_extended_async(item))
    }
}
