use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use serde_dynamo::Error as SerdeDynamoError;
use std::error::Error as StdError;
use std::{fmt, io};
use tokio::task::JoinError;

type DynamoPutError = SdkError<PutItemError, Response>;
type DynamoGetError = SdkError<GetItemError, Response>;
type DynamoQueryError = SdkError<QueryError, Response>;
type DynamoScanError = SdkError<ScanError, Response>;
type DynamoDeleteItemError = SdkError<DeleteItemError, Response>;
type DynamoBatchWriteItemError = SdkError<BatchWriteItemError, Response>;
type DynamoBatchGetItemError = SdkError<BatchGetItemError, Response>;

/// Error raised by table, index, query and paging operations
#[derive(Debug)]
pub enum Error {
    /// Serde DynamoDB serialization/deserialization error
    SerdeDynamo(SerdeDynamoError),
    /// DynamoDB request builder error
    BuildError(BuildError),
    /// DynamoDB PutItem operation error
    DynamoPutError(DynamoPutError),
    /// DynamoDB GetItem operation error
    DynamoGetError(DynamoGetError),
    /// DynamoDB Query operation error
    DynamoQueryError(DynamoQueryError),
    /// DynamoDB Scan operation error
    DynamoScanError(DynamoScanError),
    /// DynamoDB DeleteItem operation error
    DynamoDeleteItemError(DynamoDeleteItemError),
    /// DynamoDB BatchWriteItem operation error
    DynamoBatchWriteItemError(DynamoBatchWriteItemError),
    /// DynamoDB BatchGetItem operation error
    DynamoBatchGetItemError(DynamoBatchGetItemError),
    /// Failure reported by a custom transport handle
    Transport(Box<dyn StdError + Send + Sync>),
    /// A background page fetch or blocking call panicked or was cancelled
    Join(JoinError),
    /// The shared blocking runtime could not be started
    Runtime(io::Error),
    /// Incomplete or inconsistent table configuration
    Configuration(String),
    /// An operation was called in a state or with arguments it does not accept
    Usage(String),
    /// A record or key could not be converted to or from its wire form
    Encoding(String),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Error::Usage(message.into())
    }

    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        Error::Encoding(message.into())
    }

    /// Wrap an error produced by a custom [`DynamoTransport`](crate::DynamoTransport)
    /// or [`BlockingTransport`](crate::BlockingTransport) implementation
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Error::Transport(error.into())
    }

    /// Check if the error is a DynamoDB ConditionalCheckFailedException
    ///
    /// Only put and delete requests carry conditions in this crate.
    ///
    /// # Example
    /// ```no_run
    /// # use dynamo_access::Error;
    /// # fn example(error: Error) {
    /// if error.is_conditional_check_failed() {
    ///     println!("Item was modified by another process");
    /// }
    /// # }
    /// ```
    pub fn is_conditional_check_failed(&self) -> bool {
        match self {
            Error::DynamoPutError(e) => matches!(
                e.as_service_error(),
                Some(PutItemError::ConditionalCheckFailedException(_))
            ),
            Error::DynamoDeleteItemError(e) => matches!(
                e.as_service_error(),
                Some(DeleteItemError::ConditionalCheckFailedException(_))
            ),
            _ => false,
        }
    }

    /// Check if the error is a serialization/deserialization error
    ///
    /// Returns `true` for serde DynamoDB errors and wire conversion errors.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::SerdeDynamo(_) | Error::Encoding(_))
    }

    /// Check if the error came back from the DynamoDB service or its transport
    pub fn is_dynamodb_error(&self) -> bool {
        matches!(
            self,
            Error::BuildError(_)
                | Error::DynamoPutError(_)
                | Error::DynamoGetError(_)
                | Error::DynamoQueryError(_)
                | Error::DynamoScanError(_)
                | Error::DynamoDeleteItemError(_)
                | Error::DynamoBatchWriteItemError(_)
                | Error::DynamoBatchGetItemError(_)
                | Error::Transport(_)
        )
    }

    /// Check if the error reports API misuse, such as reading a cursor mid-iteration
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Error::Usage(_))
    }

    /// Check if the error reports an incomplete table or index configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

macro_rules! impl_from_error {
    ($name:ident, $variant:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$variant(e)
            }
        }
    };
    ($name:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$name(e)
            }
        }
    };
}

impl_from_error!(SerdeDynamoError, SerdeDynamo);
impl_from_error!(BuildError);
impl_from_error!(DynamoPutError);
impl_from_error!(DynamoGetError);
impl_from_error!(DynamoQueryError);
impl_from_error!(DynamoScanError);
impl_from_error!(DynamoDeleteItemError);
impl_from_error!(DynamoBatchWriteItemError);
impl_from_error!(DynamoBatchGetItemError);
impl_from_error!(JoinError, Join);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerdeDynamo(e) => write!(f, "DynamoDB serialization error: {}", e),
            Error::BuildError(e) => write!(f, "DynamoDB request builder error: {}", e),
            Error::DynamoPutError(e) => {
                write!(f, "DynamoDB PutItem operation failed: {}", e)
            }
            Error::DynamoGetError(e) => {
                write!(f, "DynamoDB GetItem operation failed: {}", e)
            }
            Error::DynamoQueryError(e) => {
                write!(f, "DynamoDB Query operation failed: {}", e)
            }
            Error::DynamoScanError(e) => {
                write!(f, "DynamoDB Scan operation failed: {}", e)
            }
            Error::DynamoDeleteItemError(e) => {
                write!(f, "DynamoDB DeleteItem operation failed: {}", e)
            }
            Error::DynamoBatchWriteItemError(e) => {
                write!(f, "DynamoDB BatchWriteItem operation failed: {}", e)
            }
            Error::DynamoBatchGetItemError(e) => {
                write!(f, "DynamoDB BatchGetItem operation failed: {}", e)
            }
            Error::Transport(e) => write!(f, "DynamoDB transport failed: {}", e),
            Error::Join(e) => write!(f, "background DynamoDB call did not complete: {}", e),
            Error::Runtime(e) => write!(f, "blocking runtime could not be started: {}", e),
            Error::Configuration(msg) => write!(f, "invalid table configuration: {}", msg),
            Error::Usage(msg) => write!(f, "invalid usage: {}", msg),
            Error::Encoding(msg) => write!(f, "record encoding error: {}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::SerdeDynamo(e) => Some(e),
            Error::Transport(e) => Some(e.as_ref()),
            Error::Join(e) => Some(e),
            Error::Runtime(e) => Some(e),
            _ => None,
        }
    }
}
