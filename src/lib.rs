//! # DynamoDB Access Layer
//!
//! Typed, paginated access to DynamoDB tables and their secondary indexes:
//! - Single-item get, put and delete
//! - Batch get, put and delete, chunked to the service's 25-item limit
//! - Query and scan builders with lazy, limit-aware pagination and resume cursors
//! - Consumed capacity accounting for every operation
//! - Blocking and async flavors of every operation
//!
//! ## Features
//!
//! - **Type-safe**: items, partition keys and sort keys are checked by the compiler, encoding runs through `serde`
//! - **Async-first**: built on `tokio` and `aws-sdk-dynamodb`; the blocking methods drive the same futures
//! - **Exact limits**: a query capped at `n` items yields `n` items and a cursor that resumes right after them
//! - **Pluggable transport**: run against the SDK client, or any [`DynamoTransport`] / [`BlockingTransport`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynamo_access::{DynamoItem, Error, Key};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Order {
//!     user_id: String,
//!     order_id: String,
//!     total: u64,
//! }
//!
//! impl DynamoItem for Order {
//!     type PK = String;
//!     type SK = String;
//!
//!     const TABLE: &'static str = "orders";
//!     const PARTITION_KEY: &'static str = "user_id";
//!     const SORT_KEY: Option<&'static str> = Some("order_id");
//!
//!     fn partition_key(&self) -> Self::PK {
//!         self.user_id.clone()
//!     }
//!
//!     fn sort_key(&self) -> Option<Self::SK> {
//!         Some(self.order_id.clone())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let orders = Order::table_builder().default_client().await.build()?;
//!
//!     let order = Order {
//!         user_id: "123".to_string(),
//!         order_id: "2024-001".to_string(),
//!         total: 42,
//!     };
//!     orders.put_item_async(&order).await?;
//!
//!     let key = Key::new("123".to_string(), Some("2024-001".to_string()));
//!     let _retrieved = orders.get_item_async(&key).await?;
//!
//!     let mut recent = orders
//!         .query("123".to_string())
//!         .sort_prefix(&"2024".to_string())?
//!         .limit(10)
//!         .invoke()?;
//!     while let Some(order) = recent.try_next().await? {
//!         println!("{} {}", order.order_id, order.total);
//!     }
//!     let _resume_from = recent.exclusive_start()?.cloned();
//!
//!     Ok(())
//! }
//! ```
#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    unreachable_pub,
    unused_qualifications
)]

mod blocking;
mod capacity;
mod codec;
mod error;
mod transport;

/// Tables, indexes, queries and their results
pub mod table;

pub use capacity::{CapacityUsed, ReadWrite};
pub use codec::{Codec, DynamoItem, GsiCodec, GsiItem, ItemCodec, KeyValue, Record};
pub use error::Error;
pub use table::{
    BatchDeleteResult, BatchGetResult, BatchPutResult, ExtendedBatchResult, ExtendedItemResult,
    Index, IterableResult, Key, MAX_ITEMS_PER_BATCH, Query, Scan, Table, TableBuilder,
};
pub use transport::{BlockingTransport, DynamoTransport, Pending};

// Re-export aws-config types for configuration
pub use aws_config::{
    BehaviorVersion, Region, SdkConfig, defaults,
    meta::region::{ProvideRegion, RegionProviderChain},
    retry::{RetryConfig, RetryMode},
    timeout::TimeoutConfig,
};

// Re-export aws-types for advanced configuration
pub use aws_types::sdk_config::Builder as SdkConfigBuilder;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use tokio::sync::OnceCell;

/// Global DynamoDB client instance
static GLOBAL_CLIENT: OnceCell<DynamoDbClient> = OnceCell::const_new();

/// Default SDK configuration for the global client
///
/// - Adaptive retry mode with 3 max attempts
/// - Exponential backoff starting at 1 second
/// - Connect timeout: 3 seconds
/// - Read timeout: 20 seconds
/// - Operation timeout: 60 seconds
/// - LocalStack support via AWS_PROFILE=localstack
async fn aws_config_defaults() -> SdkConfig {
    use std::time::Duration;

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    let mut loader = defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config);

    if std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack" {
        loader = loader.endpoint_url("http://127.0.0.1:4566");
    }

    loader.load().await
}

/// Initialize the global DynamoDB client with a custom AWS config
///
/// Has no effect once the global client exists.
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
///         .region(aws_config::Region::new("us-west-2"))
///         .load()
///         .await;
///     dynamo_access::init(&config).await;
/// }
/// ```
pub async fn init(config: &SdkConfig) {
    let _ = GLOBAL_CLIENT
        .get_or_init(|| async { DynamoDbClient::new(config) })
        .await;
}

/// Initialize the global DynamoDB client with a custom client instance
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
///
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::load_from_env().await;
///     dynamo_access::init_with_client(Client::new(&config)).await;
/// }
/// ```
pub async fn init_with_client(client: DynamoDbClient) {
    let _ = GLOBAL_CLIENT.get_or_init(|| async { client }).await;
}

/// Get a reference to the global DynamoDB client
///
/// Unless [`init`] or [`init_with_client`] ran first, the client is created
/// on first use with adaptive retry with 3 attempts, 3s connect, 20s read and 60s
/// operation timeouts, and the LocalStack endpoint when
/// `AWS_PROFILE=localstack`. [`TableBuilder::default_client`] uses this
/// client.
///
/// ```rust,no_run
/// # async fn example() {
/// let client = dynamo_access::dynamodb_client().await;
/// # let _ = client;
/// # }
/// ```
pub async fn dynamodb_client() -> &'static DynamoDbClient {
    GLOBAL_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            DynamoDbClient::new(&config)
        })
        .await
}
