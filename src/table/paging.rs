//! Lazy, limit-aware traversal of query and scan pages.
//!
//! An [`IterableResult`] keeps at most one page request in flight. The next
//! page is requested as soon as the current one is known not to be the last,
//! so fetching overlaps with consumption.

use aws_sdk_dynamodb::operation::query::{QueryInput, QueryOutput};
use aws_sdk_dynamodb::operation::scan::{ScanInput, ScanOutput};
use aws_sdk_dynamodb::types::ConsumedCapacity;
use futures_util::{FutureExt, Stream, TryFutureExt, stream};
use std::fmt;
use std::sync::Arc;
use std::vec;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::Error;
use crate::blocking::{block_on, spawn_handle};
use crate::capacity::CapacityUsed;
use crate::codec::{Codec, Record};
use crate::table::helpers::records;
use crate::table::index::Index;
use crate::transport::{DynamoTransport, Pending};

/// The request a traversal repeats with a new start key for every page
#[derive(Clone, Debug)]
pub(crate) enum PageRequest {
    Query(QueryInput),
    Scan(ScanInput),
}

impl PageRequest {
    fn resume_from(&self, start: Record) -> PageRequest {
        match self {
            PageRequest::Query(input) => {
                let mut input = input.clone();
                input.exclusive_start_key = Some(start);
                PageRequest::Query(input)
            }
            PageRequest::Scan(input) => {
                let mut input = input.clone();
                input.exclusive_start_key = Some(start);
                PageRequest::Scan(input)
            }
        }
    }

    fn send(self, transport: &dyn DynamoTransport) -> Pending<Page> {
        match self {
            PageRequest::Query(input) => transport.query(input).map_ok(Page::from).boxed(),
            PageRequest::Scan(input) => transport.scan(input).map_ok(Page::from).boxed(),
        }
    }
}

/// One response page, query or scan
#[derive(Debug, Default)]
pub(crate) struct Page {
    items: Vec<Record>,
    count: usize,
    scanned_count: usize,
    last_evaluated_key: Option<Record>,
    capacity: Option<ConsumedCapacity>,
}

impl Page {
    fn new(
        items: Option<Vec<Record>>,
        count: i32,
        scanned_count: i32,
        last_evaluated_key: Option<Record>,
        capacity: Option<ConsumedCapacity>,
    ) -> Self {
        Self {
            items: items.unwrap_or_default(),
            count: usize::try_from(count).unwrap_or_default(),
            scanned_count: usize::try_from(scanned_count).unwrap_or_default(),
            last_evaluated_key: last_evaluated_key.filter(|key| !key.is_empty()),
            capacity,
        }
    }
}

impl From<QueryOutput> for Page {
    fn from(output: QueryOutput) -> Self {
        Page::new(
            output.items,
            output.count,
            output.scanned_count,
            output.last_evaluated_key,
            output.consumed_capacity,
        )
    }
}

impl From<ScanOutput> for Page {
    fn from(output: ScanOutput) -> Self {
        Page::new(
            output.items,
            output.count,
            output.scanned_count,
            output.last_evaluated_key,
            output.consumed_capacity,
        )
    }
}

/// Single-pass sequence of items produced by a query or scan
///
/// Iterate it with [`Iterator`] from blocking code, or with
/// [`IterableResult::try_next`] / [`IterableResult::stream`] from async code.
/// Once every item has been consumed, [`IterableResult::exclusive_start`]
/// gives the cursor to resume from.
///
/// Dropping the result cancels the page request in flight.
pub struct IterableResult<C: Codec> {
    codec: Arc<C>,
    transport: Arc<dyn DynamoTransport>,
    request: PageRequest,
    cursor_attributes: Vec<String>,
    handle: Option<Handle>,
    limit: Option<usize>,
    items_found: usize,
    items_scanned: usize,
    items_returned: usize,
    capacity: CapacityUsed,
    pending: Option<JoinHandle<Result<Page, Error>>>,
    buffer: vec::IntoIter<Record>,
    exclusive_start: Option<Record>,
    failed: bool,
}

impl<C: Codec> fmt::Debug for IterableResult<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterableResult")
            .field("limit", &self.limit)
            .field("items_found", &self.items_found)
            .field("items_scanned", &self.items_scanned)
            .field("items_returned", &self.items_returned)
            .field("pending", &self.pending.is_some())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

impl<C: Codec> IterableResult<C> {
    pub(crate) fn new(
        index: &Index<C>,
        request: PageRequest,
        limit: Option<usize>,
    ) -> Result<Self, Error> {
        let mut result = Self {
            codec: Arc::clone(&index.codec),
            transport: Arc::clone(&index.transport),
            cursor_attributes: index
                .schema
                .cursor_attributes()
                .into_iter()
                .map(str::to_string)
                .collect(),
            handle: None,
            request,
            limit,
            items_found: 0,
            items_scanned: 0,
            items_returned: 0,
            capacity: CapacityUsed::default(),
            pending: None,
            buffer: Vec::new().into_iter(),
            exclusive_start: None,
            failed: false,
        };

        // A zero limit never touches the service.
        if limit != Some(0) {
            let first = result.request.clone();
            result.fetch(first)?;
        }

        Ok(result)
    }

    fn fetch(&mut self, request: PageRequest) -> Result<(), Error> {
        // Resolved on first use so a zero limit never needs a runtime.
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => spawn_handle()?,
        };
        trace!(start = ?request_start(&request), "requesting page");
        let page = request.send(self.transport.as_ref());
        self.pending = Some(handle.spawn(page));
        self.handle = Some(handle);
        Ok(())
    }

    fn absorb(&mut self, page: Page) -> Result<(), Error> {
        let Page {
            mut items,
            count,
            scanned_count,
            last_evaluated_key,
            capacity,
        } = page;

        self.items_found += count;
        self.items_scanned += scanned_count;
        self.capacity.add(capacity.as_ref());

        let remaining = self
            .limit
            .map(|limit| limit.saturating_sub(self.items_returned));

        match remaining {
            Some(remaining) if items.len() >= remaining => {
                // This page reaches the limit: stop fetching and, when it
                // overshoots, resume from the last item actually kept.
                if items.len() > remaining {
                    items.truncate(remaining);
                    let attributes: Vec<&str> =
                        self.cursor_attributes.iter().map(String::as_str).collect();
                    self.exclusive_start = items
                        .last()
                        .map(|record| records::project(record, &attributes));
                } else {
                    self.exclusive_start = last_evaluated_key;
                }
                trace!(kept = items.len(), "page reached the limit");
            }
            _ => match last_evaluated_key {
                Some(start) => {
                    let next = self.request.resume_from(start);
                    self.fetch(next)?;
                }
                None => self.exclusive_start = None,
            },
        }

        self.items_returned += items.len();
        trace!(
            items = items.len(),
            found = self.items_found,
            scanned = self.items_scanned,
            returned = self.items_returned,
            more = self.pending.is_some(),
            "absorbed page"
        );
        self.buffer = items.into_iter();
        Ok(())
    }

    /// Next item, waiting for the next page when the current one is used up
    ///
    /// Returns `Ok(None)` once the traversal is finished. A failed page
    /// request ends the traversal.
    pub async fn try_next(&mut self) -> Result<Option<C::Item>, Error> {
        loop {
            if let Some(record) = self.buffer.next() {
                return self.codec.decode(record).map(Some);
            }

            let Some(pending) = self.pending.as_mut() else {
                return Ok(None);
            };
            let page = pending.await;
            self.pending = None;

            let absorbed = match page {
                Ok(Ok(page)) => self.absorb(page),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = absorbed {
                self.failed = true;
                return Err(e);
            }
        }
    }

    /// Borrowing async stream of the remaining items
    ///
    /// The result stays usable afterwards, so the cursor can still be read.
    pub fn stream(&mut self) -> impl Stream<Item = Result<C::Item, Error>> + Send + '_ {
        stream::unfold(self, |result| async move {
            let next = result.try_next().await.transpose()?;
            Some((next, result))
        })
    }

    /// Owning async stream of the remaining items
    pub fn into_stream(self) -> impl Stream<Item = Result<C::Item, Error>> + Send {
        stream::unfold(self, |mut result| async move {
            let next = result.try_next().await.transpose()?;
            Some((next, result))
        })
    }

    /// Cursor that resumes after the last item returned
    ///
    /// `None` when nothing is left to read. It is only known once the
    /// traversal is finished, asking earlier is a usage error.
    pub fn exclusive_start(&self) -> Result<Option<&Record>, Error> {
        if self.failed {
            return Err(Error::usage(
                "the exclusive start is unknown because the traversal failed",
            ));
        }
        if self.pending.is_some() || self.buffer.len() > 0 {
            return Err(Error::usage(
                "The exclusive start is unknown until the iterator or stream reaches the end",
            ));
        }
        Ok(self.exclusive_start.as_ref())
    }

    /// Total item cap, `None` when unlimited
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Items handed to the consumer's pages so far, never more than the limit
    pub fn items_returned(&self) -> usize {
        self.items_returned
    }

    /// Items the service matched, including any cut off by the limit
    pub fn items_found(&self) -> usize {
        self.items_found
    }

    /// Items the service examined
    pub fn items_scanned(&self) -> usize {
        self.items_scanned
    }

    /// Capacity consumed by every page fetched so far
    pub fn capacity(&self) -> &CapacityUsed {
        &self.capacity
    }
}

fn request_start(request: &PageRequest) -> Option<&Record> {
    match request {
        PageRequest::Query(input) => input.exclusive_start_key.as_ref(),
        PageRequest::Scan(input) => input.exclusive_start_key.as_ref(),
    }
}

impl<C: Codec> Iterator for IterableResult<C> {
    type Item = Result<C::Item, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(record) = self.buffer.next() {
            return Some(self.codec.decode(record));
        }
        if self.pending.is_none() {
            return None;
        }

        match block_on(self.try_next()) {
            Ok(item) => item.map(Ok),
            Err(e) => {
                // Never hand out the same blocking failure forever.
                if let Some(pending) = self.pending.take() {
                    pending.abort();
                }
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl<C: Codec> Drop for IterableResult<C> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
