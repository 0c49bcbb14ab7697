use aws_sdk_dynamodb::operation::batch_get_item::{BatchGetItemInput, BatchGetItemOutput};
use aws_sdk_dynamodb::operation::batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput};
use aws_sdk_dynamodb::types::{
    DeleteRequest, KeysAndAttributes, PutRequest, ReturnConsumedCapacity, WriteRequest,
};
use tracing::{debug, warn};

use crate::Error;
use crate::blocking::block_on;
use crate::codec::{Codec, Record};
use crate::table::Table;
use crate::table::helpers::batch_processor::BatchProcessor;
use crate::table::helpers::records;
use crate::table::types::{ExtendedBatchResult, Key, MAX_ITEMS_PER_BATCH};

type TableKey<C> = Key<<C as Codec>::Partition, <C as Codec>::Sort>;

/// Result of a batch get: decoded items, keys the service did not read
pub type BatchGetResult<C> = ExtendedBatchResult<<C as Codec>::Item, TableKey<C>>;

/// Result of a batch put: items the service did not write
///
/// `items` is always empty for writes.
pub type BatchPutResult<C> = ExtendedBatchResult<<C as Codec>::Item, <C as Codec>::Item>;

/// Result of a batch delete: keys the service did not delete
///
/// `items` is always empty for writes.
pub type BatchDeleteResult<C> = ExtendedBatchResult<<C as Codec>::Item, TableKey<C>>;

fn warn_unprocessed(table: &str, operation: &str, unprocessed: usize) {
    if unprocessed > 0 {
        warn!(
            table = %table,
            operation,
            unprocessed,
            "batch left entries unprocessed; use the extended variant to resubmit them"
        );
    }
}

impl<C: Codec> Table<C> {
    fn batch_processor(&self) -> BatchProcessor {
        BatchProcessor::new(MAX_ITEMS_PER_BATCH, self.batch_concurrency())
    }

    fn key_records<'a, I>(&self, keys: I) -> Result<Vec<Record>, Error>
    where
        I: IntoIterator<Item = &'a TableKey<C>>,
        C: 'a,
    {
        keys.into_iter()
            .map(|key| self.base.key_record(key))
            .collect()
    }

    async fn get_batch_records(
        &self,
        keys: Vec<Record>,
        capacity: ReturnConsumedCapacity,
    ) -> Result<BatchGetResult<C>, Error> {
        let processor = self.batch_processor();
        let table_name = self.table_name();

        debug!(
            table = %table_name,
            keys = keys.len(),
            chunks = processor.chunk_count(keys.len()),
            "dispatching batch get"
        );

        let result = processor
            .process(
                keys,
                |chunk| {
                    let pending = KeysAndAttributes::builder()
                        .set_keys(Some(chunk))
                        .build()
                        .and_then(|request| {
                            BatchGetItemInput::builder()
                                .request_items(table_name, request)
                                .return_consumed_capacity(capacity.clone())
                                .build()
                        })
                        .map(|input| self.base.transport.batch_get_item(input));

                    async move { pending?.await }
                },
                ExtendedBatchResult::new(),
                |result, output| self.absorb_get(result, output),
            )
            .await?;

        debug!(
            table = %table_name,
            items = result.items.len(),
            unprocessed = result.unprocessed.len(),
            "batch get complete"
        );

        Ok(result)
    }

    fn absorb_get(
        &self,
        result: &mut BatchGetResult<C>,
        output: BatchGetItemOutput,
    ) -> Result<(), Error> {
        let table_name = self.table_name();

        if let Some(records) = output
            .responses
            .and_then(|mut responses| responses.remove(table_name))
        {
            for record in records {
                result.items.push(self.decode(record)?);
            }
        }

        if let Some(unprocessed) = output
            .unprocessed_keys
            .and_then(|mut unprocessed| unprocessed.remove(table_name))
        {
            for record in unprocessed.keys {
                result.unprocessed.push(self.base.key_from_record(record)?);
            }
        }

        if let Some(capacities) = &output.consumed_capacity {
            result.capacity.add_all(capacities);
        }

        Ok(())
    }

    async fn write_batch_records<U, F>(
        &self,
        requests: Vec<WriteRequest>,
        capacity: ReturnConsumedCapacity,
        into_unprocessed: F,
    ) -> Result<ExtendedBatchResult<C::Item, U>, Error>
    where
        F: Fn(WriteRequest) -> Result<Option<U>, Error>,
    {
        let processor = self.batch_processor();
        let table_name = self.table_name();

        debug!(
            table = %table_name,
            requests = requests.len(),
            chunks = processor.chunk_count(requests.len()),
            "dispatching batch write"
        );

        processor
            .process(
                requests,
                |chunk| {
                    let pending = BatchWriteItemInput::builder()
                        .request_items(table_name, chunk)
                        .return_consumed_capacity(capacity.clone())
                        .build()
                        .map(|input| self.base.transport.batch_write_item(input));

                    async move { pending?.await }
                },
                ExtendedBatchResult::new(),
                |result, output: BatchWriteItemOutput| {
                    if let Some(requests) = output
                        .unprocessed_items
                        .and_then(|mut unprocessed| unprocessed.remove(table_name))
                    {
                        for request in requests {
                            result.unprocessed.extend(into_unprocessed(request)?);
                        }
                    }

                    if let Some(capacities) = &output.consumed_capacity {
                        result.capacity.add_all(capacities);
                    }

                    Ok(())
                },
            )
            .await
    }

    async fn put_batch_records(
        &self,
        items: &[C::Item],
        capacity: ReturnConsumedCapacity,
    ) -> Result<BatchPutResult<C>, Error> {
        let mut requests = Vec::with_capacity(items.len());
        for item in items {
            let record = self.base.codec.encode(item)?;
            records::require_primary_key(&record, &self.base.schema)?;

            let put_request = PutRequest::builder().set_item(Some(record)).build()?;
            requests.push(
                WriteRequest::builder()
                    .set_put_request(Some(put_request))
                    .build(),
            );
        }

        self.write_batch_records(requests, capacity, |request| {
            request
                .put_request
                .map(|put| self.decode(put.item))
                .transpose()
        })
        .await
    }

    async fn delete_batch_records(
        &self,
        keys: Vec<Record>,
        capacity: ReturnConsumedCapacity,
    ) -> Result<BatchDeleteResult<C>, Error> {
        let requests = keys
            .into_iter()
            .map(|key| -> Result<WriteRequest, Error> {
                let delete_request = DeleteRequest::builder().set_key(Some(key)).build()?;
                Ok(WriteRequest::builder()
                    .set_delete_request(Some(delete_request))
                    .build())
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.write_batch_records(requests, capacity, |request| {
            request
                .delete_request
                .map(|delete| self.base.key_from_record(delete.key))
                .transpose()
        })
        .await
    }

    /// Read many items by key in chunks of [`MAX_ITEMS_PER_BATCH`]
    ///
    /// Items come back in chunk order; order inside a chunk is whatever the
    /// service returns. Keys the service declines are dropped with a warning,
    /// use [`Table::get_batch_by_key_extended_async`] to see them.
    pub async fn get_batch_by_key_async(
        &self,
        keys: &[TableKey<C>],
    ) -> Result<Vec<C::Item>, Error> {
        let result = self
            .get_batch_records(self.key_records(keys)?, ReturnConsumedCapacity::None)
            .await?;
        warn_unprocessed(self.table_name(), "batch get", result.unprocessed.len());
        Ok(result.items)
    }

    /// Blocking [`Table::get_batch_by_key_async`]
    pub fn get_batch_by_key(&self, keys: &[TableKey<C>]) -> Result<Vec<C::Item>, Error> {
        block_on(self.get_batch_by_key_async(keys))
    }

    /// Read the stored versions of many items
    pub async fn get_batch_by_item_async(
        &self,
        items: &[C::Item],
    ) -> Result<Vec<C::Item>, Error> {
        let keys: Vec<TableKey<C>> = items.iter().map(|item| self.key_of(item)).collect();
        self.get_batch_by_key_async(&keys).await
    }

    /// Blocking [`Table::get_batch_by_item_async`]
    pub fn get_batch_by_item(&self, items: &[C::Item]) -> Result<Vec<C::Item>, Error> {
        block_on(self.get_batch_by_item_async(items))
    }

    /// Read many items by key, keeping unprocessed keys and capacity
    pub async fn get_batch_by_key_extended_async(
        &self,
        keys: &[TableKey<C>],
    ) -> Result<BatchGetResult<C>, Error> {
        self.get_batch_records(self.key_records(keys)?, ReturnConsumedCapacity::Indexes)
            .await
    }

    /// Blocking [`Table::get_batch_by_key_extended_async`]
    pub fn get_batch_by_key_extended(
        &self,
        keys: &[TableKey<C>],
    ) -> Result<BatchGetResult<C>, Error> {
        block_on(self.get_batch_by_key_extended_async(keys))
    }

    /// Item-addressed [`Table::get_batch_by_key_extended_async`]
    pub async fn get_batch_by_item_extended_async(
        &self,
        items: &[C::Item],
    ) -> Result<BatchGetResult<C>, Error> {
        let keys: Vec<TableKey<C>> = items.iter().map(|item| self.key_of(item)).collect();
        self.get_batch_by_key_extended_async(&keys).await
    }

    /// Blocking [`Table::get_batch_by_item_extended_async`]
    pub fn get_batch_by_item_extended(
        &self,
        items: &[C::Item],
    ) -> Result<BatchGetResult<C>, Error> {
        block_on(self.get_batch_by_item_extended_async(items))
    }

    /// Write many items in chunks of [`MAX_ITEMS_PER_BATCH`]
    ///
    /// Every item is encoded before the first request is sent.
    pub async fn put_batch_async(&self, items: &[C::Item]) -> Result<(), Error> {
        let result = self
            .put_batch_records(items, ReturnConsumedCapacity::None)
            .await?;
        warn_unprocessed(self.table_name(), "batch put", result.unprocessed.len());
        Ok(())
    }

    /// Blocking [`Table::put_batch_async`]
    pub fn put_batch(&self, items: &[C::Item]) -> Result<(), Error> {
        block_on(self.put_batch_async(items))
    }

    /// Write many items, keeping unprocessed items and capacity
    pub async fn put_batch_extended_async(
        &self,
        items: &[C::Item],
    ) -> Result<BatchPutResult<C>, Error> {
        self.put_batch_records(items, ReturnConsumedCapacity::Indexes)
            .await
    }

    /// Blocking [`Table::put_batch_extended_async`]
    pub fn put_batch_extended(&self, items: &[C::Item]) -> Result<BatchPutResult<C>, Error> {
        block_on(self.put_batch_extended_async(items))
    }

    /// Delete many items by key in chunks of [`MAX_ITEMS_PER_BATCH`]
    pub async fn delete_batch_by_key_async(&self, keys: &[TableKey<C>]) -> Result<(), Error> {
        let result = self
            .delete_batch_records(self.key_records(keys)?, ReturnConsumedCapacity::None)
            .await?;
        warn_unprocessed(self.table_name(), "batch delete", result.unprocessed.len());
        Ok(())
    }

    /// Blocking [`Table::delete_batch_by_key_async`]
    pub fn delete_batch_by_key(&self, keys: &[TableKey<C>]) -> Result<(), Error> {
        block_on(self.delete_batch_by_key_async(keys))
    }

    /// Delete the stored versions of many items
    pub async fn delete_batch_by_item_async(&self, items: &[C::Item]) -> Result<(), Error> {
        let keys: Vec<TableKey<C>> = items.iter().map(|item| self.key_of(item)).collect();
        self.delete_batch_by_key_async(&keys).await
    }

    /// Blocking [`Table::delete_batch_by_item_async`]
    pub fn delete_batch_by_item(&self, items: &[C::Item]) -> Result<(), Error> {
        block_on(self.delete_batch_by_item_async(items))
    }

    /// Delete many items by key, keeping unprocessed keys and capacity
    pub async fn delete_batch_by_key_extended_async(
        &self,
        keys: &[TableKey<C>],
    ) -> Result<BatchDeleteResult<C>, Error> {
        self.delete_batch_records(self.key_records(keys)?, ReturnConsumedCapacity::Indexes)
            .await
    }

    /// Blocking [`Table::delete_batch_by_key_extended_async`]
    pub fn delete_batch_by_key_extended(
        &self,
        keys: &[TableKey<C>],
    ) -> Result<BatchDeleteResult<C>, Error> {
        block_on(self.delete_batch_by_key_extended_async(keys))
    }

    /// Item-addressed [`Table::delete_batch_by_key_extended_async`]
    pub async fn delete_batch_by_item_extended_async(
        &self,
        items: &[C::Item],
    ) -> Result<BatchDeleteResult<C>, Error> {
        let keys: Vec<TableKey<C>> = items.iter().map(|item| self.key_of(item)).collect();
        self.delete_batch_by_key_extended_async(&keys).await
    }

    /// Blocking [`Table::delete_batch_by_item_extended_async`]
    pub fn delete_batch_by_item_extended(
        &self,
        items: &[C::Item],
    ) -> Result<BatchDeleteResult<C>, Error> {
        block_on(self.delete_batch_by_item_extended_async(items))
    }
}
