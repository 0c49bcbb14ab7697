//! Transport handles.
//!
//! Every remote call made by an [`Index`](crate::Index) or [`Table`](crate::Table)
//! goes through a [`DynamoTransport`]. The SDK client implements it directly.
//! Applications that only have a blocking client implement
//! [`BlockingTransport`] instead and the table runs each call on tokio's
//! blocking pool.

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::batch_get_item::{BatchGetItemInput, BatchGetItemOutput};
use aws_sdk_dynamodb::operation::batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput};
use aws_sdk_dynamodb::operation::delete_item::{DeleteItemInput, DeleteItemOutput};
use aws_sdk_dynamodb::operation::get_item::{GetItemInput, GetItemOutput};
use aws_sdk_dynamodb::operation::put_item::{PutItemInput, PutItemOutput};
use aws_sdk_dynamodb::operation::query::{QueryInput, QueryOutput};
use aws_sdk_dynamodb::operation::scan::{ScanInput, ScanOutput};
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

use crate::Error;

/// Pending result of one transport call
pub type Pending<T> = BoxFuture<'static, Result<T, Error>>;

/// Non-blocking DynamoDB transport
///
/// Each call receives a fully built request and returns a future that owns
/// everything it needs, so it can be spawned or polled after the caller's
/// borrows end.
pub trait DynamoTransport: Send + Sync + 'static {
    /// GetItem
    fn get_item(&self, input: GetItemInput) -> Pending<GetItemOutput>;
    /// PutItem
    fn put_item(&self, input: PutItemInput) -> Pending<PutItemOutput>;
    /// DeleteItem
    fn delete_item(&self, input: DeleteItemInput) -> Pending<DeleteItemOutput>;
    /// BatchGetItem
    fn batch_get_item(&self, input: BatchGetItemInput) -> Pending<BatchGetItemOutput>;
    /// BatchWriteItem
    fn batch_write_item(&self, input: BatchWriteItemInput) -> Pending<BatchWriteItemOutput>;
    /// Query
    fn query(&self, input: QueryInput) -> Pending<QueryOutput>;
    /// Scan
    fn scan(&self, input: ScanInput) -> Pending<ScanOutput>;
}

/// Blocking DynamoDB transport
pub trait BlockingTransport: Send + Sync + 'static {
    /// GetItem
    fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, Error>;
    /// PutItem
    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, Error>;
    /// DeleteItem
    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, Error>;
    /// BatchGetItem
    fn batch_get_item(&self, input: BatchGetItemInput) -> Result<BatchGetItemOutput, Error>;
    /// BatchWriteItem
    fn batch_write_item(&self, input: BatchWriteItemInput)
    -> Result<BatchWriteItemOutput, Error>;
    /// Query
    fn query(&self, input: QueryInput) -> Result<QueryOutput, Error>;
    /// Scan
    fn scan(&self, input: ScanInput) -> Result<ScanOutput, Error>;
}

impl DynamoTransport for Client {
    fn get_item(&self, input: GetItemInput) -> Pending<GetItemOutput> {
        let request = Client::get_item(self)
            .set_table_name(input.table_name)
            .set_key(input.key)
            .set_consistent_read(input.consistent_read)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(input.expression_attribute_names);

        Box::pin(async move { Ok(request.send().await?) })
    }

    fn put_item(&self, input: PutItemInput) -> Pending<PutItemOutput> {
        let request = Client::put_item(self)
            .set_table_name(input.table_name)
            .set_item(input.item)
            .set_return_values(input.return_values)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values);

        Box::pin(async move { Ok(request.send().await?) })
    }

    fn delete_item(&self, input: DeleteItemInput) -> Pending<DeleteItemOutput> {
        let request = Client::delete_item(self)
            .set_table_name(input.table_name)
            .set_key(input.key)
            .set_return_values(input.return_values)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values);

        Box::pin(async move { Ok(request.send().await?) })
    }

    fn batch_get_item(&self, input: BatchGetItemInput) -> Pending<BatchGetItemOutput> {
        let request = Client::batch_get_item(self)
            .set_request_items(input.request_items)
            .set_return_consumed_capacity(input.return_consumed_capacity);

        Box::pin(async move { Ok(request.send().await?) })
    }

    fn batch_write_item(&self, input: BatchWriteItemInput) -> Pending<BatchWriteItemOutput> {
        let request = Client::batch_write_item(self)
            .set_request_items(input.request_items)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics);

        Box::pin(async move { Ok(request.send().await?) })
    }

    fn query(&self, input: QueryInput) -> Pending<QueryOutput> {
        let request = Client::query(self)
            .set_table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_select(input.select)
            .set_limit(input.limit)
            .set_consistent_read(input.consistent_read)
            .set_scan_index_forward(input.scan_index_forward)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_key_condition_expression(input.key_condition_expression)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values);

        Box::pin(async move { Ok(request.send().await?) })
    }

    fn scan(&self, input: ScanInput) -> Pending<ScanOutput> {
        let request = Client::scan(self)
            .set_table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_select(input.select)
            .set_limit(input.limit)
            .set_consistent_read(input.consistent_read)
            .set_segment(input.segment)
            .set_total_segments(input.total_segments)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values);

        Box::pin(async move { Ok(request.send().await?) })
    }
}

/// Runs a [`BlockingTransport`] on tokio's blocking pool
pub(crate) struct BlockingBridge {
    inner: Arc<dyn BlockingTransport>,
}

impl BlockingBridge {
    pub(crate) fn new(inner: Arc<dyn BlockingTransport>) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for BlockingBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlockingBridge")
    }
}

macro_rules! bridge {
    ($method:ident, $input:ty, $output:ty) => {
        fn $method(&self, input: $input) -> Pending<$output> {
            let inner = Arc::clone(&self.inner);
            Box::pin(async move {
                tokio::task::spawn_blocking(move || inner.$method(input)).await?
            })
        }
    };
}

impl DynamoTransport for BlockingBridge {
    bridge!(get_item, GetItemInput, GetItemOutput);
    bridge!(put_item, PutItemInput, PutItemOutput);
    bridge!(delete_item, DeleteItemInput, DeleteItemOutput);
    bridge!(batch_get_item, BatchGetItemInput, BatchGetItemOutput);
    bridge!(batch_write_item, BatchWriteItemInput, BatchWriteItemOutput);
    bridge!(query, QueryInput, QueryOutput);
    bridge!(scan, ScanInput, ScanOutput);
}
