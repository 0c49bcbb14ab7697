use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::Error;
use crate::codec::Record;
use crate::table::types::KeySchema;

/// Record projection and key checks shared by tables and indexes
pub(crate) mod records {
    use super::*;

    /// Keep only `attributes` from `record`
    pub(crate) fn project(record: &Record, attributes: &[&str]) -> Record {
        attributes
            .iter()
            .filter_map(|name| {
                record
                    .get(*name)
                    .map(|value| ((*name).to_string(), value.clone()))
            })
            .collect()
    }

    /// Fail unless the record carries a non-null primary key
    pub(crate) fn require_primary_key(record: &Record, schema: &KeySchema) -> Result<(), Error> {
        let attributes = [
            Some(schema.table_partition_attribute.as_str()),
            schema.table_sort_attribute.as_deref(),
        ];

        for attribute in attributes.into_iter().flatten() {
            match record.get(attribute) {
                None | Some(AttributeValue::Null(_)) => {
                    return Err(Error::encoding(format!(
                        "primary key attribute `{attribute}` of table `{}` is null",
                        schema.table_name
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// Key condition expression builder for DynamoDB queries
///
/// Attribute names always go through `#p`/`#s` placeholders so reserved
/// words need no special handling.
pub(crate) mod expressions {
    use super::*;

    pub(crate) const PARTITION_NAME: &str = "#p";
    pub(crate) const SORT_NAME: &str = "#s";
    pub(crate) const PARTITION_VALUE: &str = ":p";
    pub(crate) const SORT_VALUE: &str = ":s1";
    pub(crate) const SORT_UPPER_VALUE: &str = ":s2";

    /// The single sort key predicate a query may carry
    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum SortCondition {
        Between(AttributeValue, AttributeValue),
        Above {
            bound: AttributeValue,
            inclusive: bool,
        },
        Below {
            bound: AttributeValue,
            inclusive: bool,
        },
        Prefix(AttributeValue),
    }

    impl SortCondition {
        fn expression(&self) -> String {
            match self {
                SortCondition::Between(..) => {
                    format!("{SORT_NAME} BETWEEN {SORT_VALUE} AND {SORT_UPPER_VALUE}")
                }
                SortCondition::Above { inclusive, .. } => {
                    let op = if *inclusive { ">=" } else { ">" };
                    format!("{SORT_NAME} {op} {SORT_VALUE}")
                }
                SortCondition::Below { inclusive, .. } => {
                    let op = if *inclusive { "<=" } else { "<" };
                    format!("{SORT_NAME} {op} {SORT_VALUE}")
                }
                SortCondition::Prefix(_) => format!("begins_with({SORT_NAME}, {SORT_VALUE})"),
            }
        }

        fn into_values(self) -> (AttributeValue, Option<AttributeValue>) {
            match self {
                SortCondition::Between(low, high) => (low, Some(high)),
                SortCondition::Above { bound, .. }
                | SortCondition::Below { bound, .. }
                | SortCondition::Prefix(bound) => (bound, None),
            }
        }
    }

    /// Key condition ready to be placed on a query request
    #[derive(Debug, Default)]
    pub(crate) struct KeyCondition {
        pub(crate) expression: String,
        pub(crate) names: HashMap<String, String>,
        pub(crate) values: HashMap<String, AttributeValue>,
    }

    pub(crate) struct KeyConditionBuilder {
        condition: KeyCondition,
    }

    impl KeyConditionBuilder {
        pub(crate) fn new() -> Self {
            Self {
                condition: KeyCondition::default(),
            }
        }

        pub(crate) fn with_partition_key(mut self, field: &str, value: AttributeValue) -> Self {
            self.condition.expression = format!("{PARTITION_NAME} = {PARTITION_VALUE}");
            let _ = self
                .condition
                .names
                .insert(PARTITION_NAME.to_string(), field.to_string());
            let _ = self
                .condition
                .values
                .insert(PARTITION_VALUE.to_string(), value);
            self
        }

        pub(crate) fn with_sort_condition(mut self, field: &str, sort: SortCondition) -> Self {
            self.condition.expression.push_str(" AND ");
            self.condition.expression.push_str(&sort.expression());
            let _ = self
                .condition
                .names
                .insert(SORT_NAME.to_string(), field.to_string());

            let (value, upper) = sort.into_values();
            let _ = self
                .condition
                .values
                .insert(SORT_VALUE.to_string(), value);
            if let Some(upper) = upper {
                let _ = self
                    .condition
                    .values
                    .insert(SORT_UPPER_VALUE.to_string(), upper);
            }
            self
        }

        pub(crate) fn build(self) -> KeyCondition {
            self.condition
        }
    }
}

/// Batch processing utilities
pub(crate) mod batch_processor {
    use crate::Error;
    use futures_util::{StreamExt, TryStreamExt};
    use std::future::Future;
    use tokio_stream::{self as stream};

    /// Chunks a batch and runs one request per chunk
    ///
    /// Chunk results are merged in submission order.
    pub(crate) struct BatchProcessor {
        chunk_size: usize,
        concurrency: Option<usize>,
    }

    impl BatchProcessor {
        pub(crate) fn new(chunk_size: usize, concurrency: Option<usize>) -> Self {
            Self {
                chunk_size,
                concurrency,
            }
        }

        /// Number of requests a batch of `len` entries needs
        pub(crate) fn chunk_count(&self, len: usize) -> usize {
            len.div_ceil(self.chunk_size)
        }

        pub(crate) async fn process<T, R, F, Fut, O, M>(
            &self,
            items: Vec<T>,
            operation: F,
            output: O,
            merge_results: M,
        ) -> Result<O, Error>
        where
            F: Fn(Vec<T>) -> Fut,
            Fut: Future<Output = Result<R, Error>>,
            M: Fn(&mut O, R) -> Result<(), Error>,
        {
            if items.is_empty() {
                return Ok(output);
            }

            let chunks = self.chunk_count(items.len());
            let mut items = items.into_iter();
            let batches: Vec<Vec<T>> = (0..chunks)
                .map(|_| items.by_ref().take(self.chunk_size).collect())
                .collect();

            let concurrency = self
                .concurrency
                .unwrap_or(batches.len())
                .clamp(1, batches.len());

            stream::iter(batches.into_iter().map(operation))
                .buffered(concurrency)
                .try_fold(output, |mut acc, result| {
                    let merge_results = &merge_results;
                    async move {
                        merge_results(&mut acc, result)?;
                        Ok(acc)
                    }
                })
                .await
        }
    }
}
