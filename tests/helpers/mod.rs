/// Test helpers and fixtures for table integration tests
///
/// `MemoryDynamo` stands in for the DynamoDB service. It understands the key
/// condition shapes this crate emits, orders and pages results the way the
/// service does, reports consumed capacity, and records every request so tests
/// can assert on what went over the wire.
pub mod fixtures;

pub use dynamo_access::{DynamoItem, Error, Key, Record, Table};
pub use serde::{Deserialize, Serialize};

pub use fixtures::{TestCounters, TestGSIObject, TestObject, TestSlotted};

use aws_sdk_dynamodb::operation::batch_get_item::{BatchGetItemInput, BatchGetItemOutput};
use aws_sdk_dynamodb::operation::batch_write_item::{BatchWriteItemInput, BatchWriteItemOutput};
use aws_sdk_dynamodb::operation::delete_item::{DeleteItemInput, DeleteItemOutput};
use aws_sdk_dynamodb::operation::get_item::{GetItemInput, GetItemOutput};
use aws_sdk_dynamodb::operation::put_item::{PutItemInput, PutItemOutput};
use aws_sdk_dynamodb::operation::query::{QueryInput, QueryOutput};
use aws_sdk_dynamodb::operation::scan::{ScanInput, ScanOutput};
use aws_sdk_dynamodb::types::{
    AttributeValue, Capacity, ConsumedCapacity, KeysAndAttributes, ReturnConsumedCapacity,
    ReturnValue, WriteRequest,
};
use dynamo_access::{BlockingTransport, DynamoTransport, ItemCodec, Pending};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::time::Duration;

/// Page size the fake service uses when a request sets no `Limit`
pub const DEFAULT_PAGE: usize = 100;

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG` (idempotent)
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// One request received by [`MemoryDynamo`]
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Call {
    GetItem(GetItemInput),
    PutItem(PutItemInput),
    DeleteItem(DeleteItemInput),
    BatchGetItem(BatchGetItemInput),
    BatchWriteItem(BatchWriteItemInput),
    Query(QueryInput),
    Scan(ScanInput),
}

#[derive(Debug, Clone)]
struct MemoryTable {
    partition: String,
    sort: Option<String>,
    indexes: BTreeMap<String, (String, Option<String>)>,
    rows: Vec<Record>,
}

impl MemoryTable {
    fn key_attributes(&self) -> Vec<String> {
        std::iter::once(self.partition.clone())
            .chain(self.sort.clone())
            .collect()
    }

    fn keyspace(&self, index: Option<&str>) -> Result<(String, Option<String>), Error> {
        match index {
            None => Ok((self.partition.clone(), self.sort.clone())),
            Some(name) => self
                .indexes
                .get(name)
                .cloned()
                .ok_or_else(|| validation(format!("unknown index {name}"))),
        }
    }

    /// Attributes that order rows of a keyspace, table keys break ties
    fn order_attributes(&self, leading: &[String]) -> Vec<String> {
        let mut attributes = leading.to_vec();
        for attribute in self.key_attributes() {
            if !attributes.contains(&attribute) {
                attributes.push(attribute);
            }
        }
        attributes
    }

    fn check_key(&self, key: &Record) -> Result<(), Error> {
        let expected = self.key_attributes();
        let complete = expected
            .iter()
            .all(|attribute| matches!(key.get(attribute), Some(v) if !v.is_null()));
        if key.len() != expected.len() || !complete {
            return Err(validation(
                "The provided key element does not match the schema",
            ));
        }
        Ok(())
    }

    fn position(&self, key: &Record) -> Option<usize> {
        let attributes = self.key_attributes();
        self.rows.iter().position(|row| {
            attributes
                .iter()
                .all(|attribute| row.get(attribute) == key.get(attribute))
        })
    }

    fn find(&self, key: &Record) -> Option<&Record> {
        self.position(key).map(|at| &self.rows[at])
    }

    fn store(&mut self, item: Record) -> Result<Option<Record>, Error> {
        let key = project(&item, &self.key_attributes());
        self.check_key(&key)?;
        Ok(match self.position(&key) {
            Some(at) => Some(std::mem::replace(&mut self.rows[at], item)),
            None => {
                self.rows.push(item);
                None
            }
        })
    }

    fn remove(&mut self, key: &Record) -> Result<Option<Record>, Error> {
        self.check_key(key)?;
        Ok(self.position(key).map(|at| self.rows.remove(at)))
    }

    /// Indexes an item appears in
    fn indexes_of(&self, item: Option<&Record>) -> Vec<String> {
        let Some(item) = item else {
            return Vec::new();
        };
        self.indexes
            .iter()
            .filter(|(_, (partition, sort))| {
                in_keyspace(item, partition, sort.as_deref())
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemoryTable>,
    calls: Vec<Call>,
    decline: usize,
    failures: VecDeque<String>,
}

impl State {
    fn table(&mut self, name: Option<&str>) -> Result<&mut MemoryTable, Error> {
        let name = name.unwrap_or_default();
        self.tables.get_mut(name).ok_or_else(|| {
            Error::transport(format!(
                "ResourceNotFoundException: Requested resource not found: {name}"
            ))
        })
    }
}

/// In-memory DynamoDB service implementing both transport traits
///
/// Clones share the same tables and request log.
#[derive(Debug, Clone, Default)]
pub struct MemoryDynamo {
    state: Arc<Mutex<State>>,
    latency: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let _ = self.0.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

#[allow(dead_code)]
impl MemoryDynamo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service with every fixture table created
    pub fn with_fixtures() -> Self {
        let dynamo = Self::new();
        dynamo.create_table(TestObject::TABLE, "game", Some("age"));
        dynamo.create_table(TestCounters::TABLE, "imo", None);
        dynamo.create_table(TestGSIObject::TABLE, "game", Some("age"));
        dynamo.create_table(TestSlotted::TABLE, "game", Some("slot"));
        dynamo.create_index(
            TestGSIObject::TABLE,
            &fixtures::gsi_index_name(),
            "user_id",
            Some("age"),
        );
        dynamo
    }

    /// Delay every request by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn create_table(&self, name: &str, partition: &str, sort: Option<&str>) {
        let _ = self.lock().tables.insert(
            name.to_string(),
            MemoryTable {
                partition: partition.to_string(),
                sort: sort.map(str::to_string),
                indexes: BTreeMap::new(),
                rows: Vec::new(),
            },
        );
    }

    pub fn create_index(&self, table: &str, index: &str, partition: &str, sort: Option<&str>) {
        let mut state = self.lock();
        let table = state.tables.get_mut(table).expect("table exists");
        let _ = table.indexes.insert(
            index.to_string(),
            (partition.to_string(), sort.map(str::to_string)),
        );
    }

    /// Store a raw record, bypassing every codec
    pub fn insert_raw(&self, table: &str, record: Record) {
        let mut state = self.lock();
        let table = state.tables.get_mut(table).expect("table exists");
        table.store(record).expect("record carries its key");
    }

    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.lock()
            .tables
            .get(table)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    /// Leave the last `count` entries of every batch request unprocessed
    pub fn decline_per_batch(&self, count: usize) {
        self.lock().decline = count;
    }

    /// Fail the next request with a transport error
    pub fn fail_next(&self, message: &str) {
        self.lock().failures.push_back(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn queries(&self) -> Vec<QueryInput> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query(input) => Some(input),
                _ => None,
            })
            .collect()
    }

    pub fn scans(&self) -> Vec<ScanInput> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Scan(input) => Some(input),
                _ => None,
            })
            .collect()
    }

    /// Entry count of every batch request, in arrival order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::BatchGetItem(input) => Some(
                    input
                        .request_items
                        .unwrap_or_default()
                        .values()
                        .map(|request| request.keys.len())
                        .sum::<usize>(),
                ),
                Call::BatchWriteItem(input) => Some(
                    input
                        .request_items
                        .unwrap_or_default()
                        .values()
                        .map(Vec::len)
                        .sum::<usize>(),
                ),
                _ => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(AtomicOrdering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory state lock")
    }

    /// Record the call and apply any injected failure
    fn begin(&self, call: Call) -> Result<MutexGuard<'_, State>, Error> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(message) => Err(Error::transport(message)),
            None => Ok(state),
        }
    }

    fn pending<T, F>(&self, operation: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&MemoryDynamo) -> Result<T, Error> + Send + 'static,
    {
        let this = self.clone();
        Box::pin(async move {
            let _in_flight = this.enter();
            if let Some(latency) = this.latency {
                tokio::time::sleep(latency).await;
            }
            operation(&this)
        })
    }

    fn blocking<T>(&self, operation: impl FnOnce(&MemoryDynamo) -> Result<T, Error>) -> Result<T, Error> {
        let _in_flight = self.enter();
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        operation(self)
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        let _ = self.max_in_flight.fetch_max(now, AtomicOrdering::SeqCst);
        InFlight(&self.in_flight)
    }

    fn handle_get(&self, input: GetItemInput) -> Result<GetItemOutput, Error> {
        let mut state = self.begin(Call::GetItem(input.clone()))?;
        let table = state.table(input.table_name.as_deref())?;
        let key = input.key.unwrap_or_default();
        table.check_key(&key)?;

        let item = table.find(&key).cloned();
        Ok(GetItemOutput::builder()
            .set_item(item)
            .set_consumed_capacity(consumed(
                input.table_name.as_deref(),
                0.5,
                0.0,
                &[],
                input.return_consumed_capacity.as_ref(),
            ))
            .build())
    }

    fn handle_put(&self, input: PutItemInput) -> Result<PutItemOutput, Error> {
        let mut state = self.begin(Call::PutItem(input.clone()))?;
        let table = state.table(input.table_name.as_deref())?;
        let item = input.item.unwrap_or_default();
        let indexes = table.indexes_of(Some(&item));

        let old = table.store(item)?;
        let old = match input.return_values {
            Some(ReturnValue::AllOld) => old,
            _ => None,
        };

        Ok(PutItemOutput::builder()
            .set_attributes(old)
            .set_consumed_capacity(consumed(
                input.table_name.as_deref(),
                0.0,
                1.0,
                &indexes,
                input.return_consumed_capacity.as_ref(),
            ))
            .build())
    }

    fn handle_delete(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, Error> {
        let mut state = self.begin(Call::DeleteItem(input.clone()))?;
        let table = state.table(input.table_name.as_deref())?;
        let key = input.key.unwrap_or_default();

        let old = table.remove(&key)?;
        let indexes = table.indexes_of(old.as_ref());
        let old = match input.return_values {
            Some(ReturnValue::AllOld) => old,
            _ => None,
        };

        Ok(DeleteItemOutput::builder()
            .set_attributes(old)
            .set_consumed_capacity(consumed(
                input.table_name.as_deref(),
                0.0,
                1.0,
                &indexes,
                input.return_consumed_capacity.as_ref(),
            ))
            .build())
    }

    fn handle_batch_get(&self, input: BatchGetItemInput) -> Result<BatchGetItemOutput, Error> {
        let mut state = self.begin(Call::BatchGetItem(input.clone()))?;
        let decline = state.decline;
        let mut responses = HashMap::new();
        let mut unprocessed = HashMap::new();
        let mut capacities = Vec::new();

        for (table_name, request) in input.request_items.unwrap_or_default() {
            let table = state.table(Some(&table_name))?;
            let mut keys = request.keys;
            if keys.len() > 100 {
                return Err(validation("Too many items requested for the BatchGetItem call"));
            }

            let declined = keys.split_off(keys.len().saturating_sub(decline));
            let mut found = Vec::new();
            for key in &keys {
                table.check_key(key)?;
                found.extend(table.find(key).cloned());
            }

            capacities.extend(consumed(
                Some(&table_name),
                0.5 * keys.len() as f64,
                0.0,
                &[],
                input.return_consumed_capacity.as_ref(),
            ));
            if !declined.is_empty() {
                let _ = unprocessed.insert(
                    table_name.clone(),
                    KeysAndAttributes::builder()
                        .set_keys(Some(declined))
                        .build()
                        .expect("keys are set"),
                );
            }
            let _ = responses.insert(table_name, found);
        }

        Ok(BatchGetItemOutput::builder()
            .set_responses(Some(responses))
            .set_unprocessed_keys(Some(unprocessed))
            .set_consumed_capacity(Some(capacities))
            .build())
    }

    fn handle_batch_write(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput, Error> {
        let mut state = self.begin(Call::BatchWriteItem(input.clone()))?;
        let decline = state.decline;
        let mut unprocessed: HashMap<String, Vec<WriteRequest>> = HashMap::new();
        let mut capacities = Vec::new();

        for (table_name, mut requests) in input.request_items.unwrap_or_default() {
            let table = state.table(Some(&table_name))?;
            if requests.len() > 25 {
                return Err(validation(
                    "Too many items requested for the BatchWriteItem call",
                ));
            }

            let declined = requests.split_off(requests.len().saturating_sub(decline));
            let mut indexes = Vec::new();
            for request in &requests {
                if let Some(put) = &request.put_request {
                    indexes.extend(table.indexes_of(Some(&put.item)));
                    let _ = table.store(put.item.clone())?;
                }
                if let Some(delete) = &request.delete_request {
                    let old = table.remove(&delete.key)?;
                    indexes.extend(table.indexes_of(old.as_ref()));
                }
            }

            capacities.extend(consumed(
                Some(&table_name),
                0.0,
                requests.len() as f64,
                &indexes,
                input.return_consumed_capacity.as_ref(),
            ));
            if !declined.is_empty() {
                let _ = unprocessed.insert(table_name, declined);
            }
        }

        Ok(BatchWriteItemOutput::builder()
            .set_unprocessed_items(Some(unprocessed))
            .set_consumed_capacity(Some(capacities))
            .build())
    }

    fn handle_query(&self, input: QueryInput) -> Result<QueryOutput, Error> {
        let mut state = self.begin(Call::Query(input.clone()))?;
        let table = state.table(input.table_name.as_deref())?;
        let (partition, sort) = table.keyspace(input.index_name.as_deref())?;

        let names = input.expression_attribute_names.clone().unwrap_or_default();
        let values = input.expression_attribute_values.clone().unwrap_or_default();
        let expression = input.key_condition_expression.clone().unwrap_or_default();
        let (partition_part, sort_part) = match expression.split_once(" AND ") {
            Some((partition_part, sort_part)) => (partition_part, Some(sort_part)),
            None => (expression.as_str(), None),
        };

        if partition_part != "#p = :p" || names.get("#p") != Some(&partition) {
            return Err(validation(format!(
                "Query condition missed key schema element: {partition}"
            )));
        }
        let partition_value = values
            .get(":p")
            .ok_or_else(|| validation("missing :p"))?;
        if sort_part.is_some() && names.get("#s") != sort.as_ref() {
            return Err(validation("Query key condition not supported"));
        }

        let leading: Vec<String> = sort.iter().cloned().collect();
        let order = table.order_attributes(&leading);
        let cursor = table.order_attributes(
            &std::iter::once(partition.clone())
                .chain(sort.clone())
                .collect::<Vec<_>>(),
        );

        let mut rows: Vec<Record> = table
            .rows
            .iter()
            .filter(|row| in_keyspace(row, &partition, sort.as_deref()))
            .filter(|row| row.get(&partition) == Some(partition_value))
            .filter(|row| match sort_part {
                Some(condition) => {
                    sort_matches(condition, sort.as_ref().and_then(|s| row.get(s)), &values)
                }
                None => true,
            })
            .cloned()
            .collect();

        let forward = input.scan_index_forward.unwrap_or(true);
        rows.sort_by(|a, b| compare_rows(a, b, &order));
        if !forward {
            rows.reverse();
        }
        if let Some(start) = &input.exclusive_start_key {
            rows.retain(|row| {
                let ordering = compare_rows(row, start, &order);
                if forward {
                    ordering == Ordering::Greater
                } else {
                    ordering == Ordering::Less
                }
            });
        }

        let (items, last_evaluated_key) = page(rows, input.limit, &cursor)?;
        let count = items.len() as i32;
        let read = 0.5 * items.len().max(1) as f64;
        let capacity = match input.index_name.as_deref() {
            Some(index) => consumed_by_index(
                input.table_name.as_deref(),
                index,
                read,
                input.return_consumed_capacity.as_ref(),
            ),
            None => consumed(
                input.table_name.as_deref(),
                read,
                0.0,
                &[],
                input.return_consumed_capacity.as_ref(),
            ),
        };

        Ok(QueryOutput::builder()
            .set_items(Some(items))
            .count(count)
            .scanned_count(count)
            .set_last_evaluated_key(last_evaluated_key)
            .set_consumed_capacity(capacity)
            .build())
    }

    fn handle_scan(&self, input: ScanInput) -> Result<ScanOutput, Error> {
        let mut state = self.begin(Call::Scan(input.clone()))?;
        let table = state.table(input.table_name.as_deref())?;
        let (partition, sort) = table.keyspace(input.index_name.as_deref())?;

        let leading: Vec<String> = std::iter::once(partition.clone()).chain(sort.clone()).collect();
        let order = table.order_attributes(&leading);

        let segments = match (input.segment, input.total_segments) {
            (Some(segment), Some(total)) if total > 1 => Some((segment, total)),
            (None, None) => None,
            _ => return Err(validation("Segment and TotalSegments go together")),
        };

        let mut rows: Vec<Record> = table
            .rows
            .iter()
            .filter(|row| in_keyspace(row, &partition, sort.as_deref()))
            .filter(|row| match segments {
                Some((segment, total)) => segment_of(row.get(&partition), total) == segment,
                None => true,
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| compare_rows(a, b, &order));
        if let Some(start) = &input.exclusive_start_key {
            rows.retain(|row| compare_rows(row, start, &order) == Ordering::Greater);
        }

        let (items, last_evaluated_key) = page(rows, input.limit, &order)?;
        let count = items.len() as i32;
        let read = 0.5 * items.len().max(1) as f64;
        let capacity = match input.index_name.as_deref() {
            Some(index) => consumed_by_index(
                input.table_name.as_deref(),
                index,
                read,
                input.return_consumed_capacity.as_ref(),
            ),
            None => consumed(
                input.table_name.as_deref(),
                read,
                0.0,
                &[],
                input.return_consumed_capacity.as_ref(),
            ),
        };

        Ok(ScanOutput::builder()
            .set_items(Some(items))
            .count(count)
            .scanned_count(count)
            .set_last_evaluated_key(last_evaluated_key)
            .set_consumed_capacity(capacity)
            .build())
    }
}

impl DynamoTransport for MemoryDynamo {
    fn get_item(&self, input: GetItemInput) -> Pending<GetItemOutput> {
        self.pending(move |dynamo| dynamo.handle_get(input))
    }

    fn put_item(&self, input: PutItemInput) -> Pending<PutItemOutput> {
        self.pending(move |dynamo| dynamo.handle_put(input))
    }

    fn delete_item(&self, input: DeleteItemInput) -> Pending<DeleteItemOutput> {
        self.pending(move |dynamo| dynamo.handle_delete(input))
    }

    fn batch_get_item(&self, input: BatchGetItemInput) -> Pending<BatchGetItemOutput> {
        self.pending(move |dynamo| dynamo.handle_batch_get(input))
    }

    fn batch_write_item(&self, input: BatchWriteItemInput) -> Pending<BatchWriteItemOutput> {
        self.pending(move |dynamo| dynamo.handle_batch_write(input))
    }

    fn query(&self, input: QueryInput) -> Pending<QueryOutput> {
        self.pending(move |dynamo| dynamo.handle_query(input))
    }

    fn scan(&self, input: ScanInput) -> Pending<ScanOutput> {
        self.pending(move |dynamo| dynamo.handle_scan(input))
    }
}

impl BlockingTransport for MemoryDynamo {
    fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, Error> {
        self.blocking(|dynamo| dynamo.handle_get(input))
    }

    fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, Error> {
        self.blocking(|dynamo| dynamo.handle_put(input))
    }

    fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, Error> {
        self.blocking(|dynamo| dynamo.handle_delete(input))
    }

    fn batch_get_item(&self, input: BatchGetItemInput) -> Result<BatchGetItemOutput, Error> {
        self.blocking(|dynamo| dynamo.handle_batch_get(input))
    }

    fn batch_write_item(&self, input: BatchWriteItemInput) -> Result<BatchWriteItemOutput, Error> {
        self.blocking(|dynamo| dynamo.handle_batch_write(input))
    }

    fn query(&self, input: QueryInput) -> Result<QueryOutput, Error> {
        self.blocking(|dynamo| dynamo.handle_query(input))
    }

    fn scan(&self, input: ScanInput) -> Result<ScanOutput, Error> {
        self.blocking(|dynamo| dynamo.handle_scan(input))
    }
}

fn validation(message: impl Into<String>) -> Error {
    Error::transport(format!("ValidationException: {}", message.into()))
}

fn project(record: &Record, attributes: &[String]) -> Record {
    attributes
        .iter()
        .filter_map(|attribute| {
            record
                .get(attribute)
                .map(|value| (attribute.clone(), value.clone()))
        })
        .collect()
}

fn in_keyspace(row: &Record, partition: &str, sort: Option<&str>) -> bool {
    let present = |attribute: &str| matches!(row.get(attribute), Some(v) if !v.is_null());
    present(partition) && sort.is_none_or(present)
}

fn compare_values(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(AttributeValue::N(a)), Some(AttributeValue::N(b))) => {
            let a: f64 = a.parse().unwrap_or_default();
            let b: f64 = b.parse().unwrap_or_default();
            a.total_cmp(&b)
        }
        (Some(AttributeValue::S(a)), Some(AttributeValue::S(b))) => a.cmp(b),
        (Some(a), Some(b)) => format!("{a:?}").cmp(&format!("{b:?}")),
    }
}

fn compare_rows(a: &Record, b: &Record, attributes: &[String]) -> Ordering {
    attributes
        .iter()
        .map(|attribute| compare_values(a.get(attribute), b.get(attribute)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn sort_matches(
    condition: &str,
    value: Option<&AttributeValue>,
    values: &HashMap<String, AttributeValue>,
) -> bool {
    let low = values.get(":s1");
    let high = values.get(":s2");

    if condition == "begins_with(#s, :s1)" {
        return match (value, low) {
            (Some(AttributeValue::S(value)), Some(AttributeValue::S(prefix))) => {
                value.starts_with(prefix.as_str())
            }
            _ => false,
        };
    }

    let tokens: Vec<&str> = condition.split_whitespace().collect();
    match tokens.as_slice() {
        ["#s", "BETWEEN", ":s1", "AND", ":s2"] => {
            compare_values(value, low).is_ge() && compare_values(value, high).is_le()
        }
        ["#s", ">=", ":s1"] => compare_values(value, low).is_ge(),
        ["#s", ">", ":s1"] => compare_values(value, low).is_gt(),
        ["#s", "<=", ":s1"] => compare_values(value, low).is_le(),
        ["#s", "<", ":s1"] => compare_values(value, low).is_lt(),
        _ => panic!("unsupported sort condition {condition}"),
    }
}

fn segment_of(value: Option<&AttributeValue>, total: i32) -> i32 {
    let digest: u32 = format!("{value:?}").bytes().map(u32::from).sum();
    (digest % total as u32) as i32
}

fn page(
    rows: Vec<Record>,
    limit: Option<i32>,
    cursor: &[String],
) -> Result<(Vec<Record>, Option<Record>), Error> {
    let size = match limit {
        Some(limit) if limit < 1 => {
            return Err(validation("Limit must be greater than or equal to 1"));
        }
        Some(limit) => limit as usize,
        None => DEFAULT_PAGE,
    };

    let items: Vec<Record> = rows.into_iter().take(size).collect();
    // The service hands out a cursor whenever the page is full.
    let last_evaluated_key = if items.len() == size {
        items.last().map(|row| project(row, cursor))
    } else {
        None
    };
    Ok((items, last_evaluated_key))
}

fn reports_capacity(mode: Option<&ReturnConsumedCapacity>) -> bool {
    matches!(
        mode,
        Some(ReturnConsumedCapacity::Indexes | ReturnConsumedCapacity::Total)
    )
}

fn consumed(
    table: Option<&str>,
    read: f64,
    write: f64,
    indexes: &[String],
    mode: Option<&ReturnConsumedCapacity>,
) -> Option<ConsumedCapacity> {
    if !reports_capacity(mode) {
        return None;
    }

    let mut index_capacity: HashMap<String, Capacity> = HashMap::new();
    for index in indexes {
        let current = index_capacity
            .get(index)
            .and_then(|capacity| capacity.write_capacity_units)
            .unwrap_or_default();
        let _ = index_capacity.insert(
            index.clone(),
            Capacity::builder()
                .write_capacity_units(current + 1.0)
                .capacity_units(current + 1.0)
                .build(),
        );
    }
    let index_writes = indexes.len() as f64;

    let mut builder = ConsumedCapacity::builder()
        .set_table_name(table.map(str::to_string))
        .read_capacity_units(read)
        .write_capacity_units(write + index_writes)
        .capacity_units(read + write + index_writes)
        .table(
            Capacity::builder()
                .read_capacity_units(read)
                .write_capacity_units(write)
                .capacity_units(read + write)
                .build(),
        );
    if matches!(mode, Some(ReturnConsumedCapacity::Indexes)) && !index_capacity.is_empty() {
        builder = builder.set_global_secondary_indexes(Some(index_capacity));
    }
    Some(builder.build())
}

fn consumed_by_index(
    table: Option<&str>,
    index: &str,
    read: f64,
    mode: Option<&ReturnConsumedCapacity>,
) -> Option<ConsumedCapacity> {
    if !reports_capacity(mode) {
        return None;
    }

    let mut builder = ConsumedCapacity::builder()
        .set_table_name(table.map(str::to_string))
        .read_capacity_units(read)
        .capacity_units(read)
        .table(Capacity::builder().read_capacity_units(0.0).build());
    if matches!(mode, Some(ReturnConsumedCapacity::Indexes)) {
        builder = builder.global_secondary_indexes(
            index,
            Capacity::builder()
                .read_capacity_units(read)
                .capacity_units(read)
                .build(),
        );
    }
    Some(builder.build())
}

/// Table over [`TestObject`] served by `dynamo`
#[allow(dead_code)]
pub fn objects(dynamo: &MemoryDynamo) -> Table<ItemCodec<TestObject>> {
    TestObject::table_builder()
        .transport(Arc::new(dynamo.clone()))
        .build()
        .unwrap()
}

/// Table over [`TestObject`] reachable only through the blocking transport
#[allow(dead_code)]
pub fn blocking_objects(dynamo: &MemoryDynamo) -> Table<ItemCodec<TestObject>> {
    TestObject::table_builder()
        .blocking_transport(Arc::new(dynamo.clone()))
        .build()
        .unwrap()
}

/// Table over [`TestCounters`] served by `dynamo`
#[allow(dead_code)]
pub fn counters(dynamo: &MemoryDynamo) -> Table<ItemCodec<TestCounters>> {
    TestCounters::table_builder()
        .transport(Arc::new(dynamo.clone()))
        .build()
        .unwrap()
}

/// Table over [`TestGSIObject`] with its global index registered
#[allow(dead_code)]
pub fn gsi_objects(dynamo: &MemoryDynamo) -> Table<ItemCodec<TestGSIObject>> {
    TestGSIObject::table_builder()
        .with_global_index()
        .transport(Arc::new(dynamo.clone()))
        .build()
        .unwrap()
}

/// Table over [`TestSlotted`] served by `dynamo`
#[allow(dead_code)]
pub fn slotted(dynamo: &MemoryDynamo) -> Table<ItemCodec<TestSlotted>> {
    TestSlotted::table_builder()
        .transport(Arc::new(dynamo.clone()))
        .build()
        .unwrap()
}

/// `TestObject` rows `0..count` in partition `game`
#[allow(dead_code)]
pub fn object_rows(game: &str, count: u32) -> Vec<TestObject> {
    (0..count).map(|age| TestObject::new(game, age)).collect()
}
