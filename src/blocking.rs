//! Blocking facade over the async core.
//!
//! Synchronous operations build the same future as their `_async` twin and
//! drive it to completion here. Outside of any runtime a shared multi-thread
//! runtime is started on first use.

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tracing::debug;

use crate::Error;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn shared_runtime() -> Result<&'static Runtime, Error> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }

    let runtime = Builder::new_multi_thread()
        .thread_name("dynamo-access")
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;

    debug!("started shared runtime for blocking DynamoDB calls");
    Ok(RUNTIME.get_or_init(|| runtime))
}

/// Handle used to spawn background page fetches
pub(crate) fn spawn_handle() -> Result<Handle, Error> {
    match Handle::try_current() {
        Ok(handle) => Ok(handle),
        Err(_) => Ok(shared_runtime()?.handle().clone()),
    }
}

/// Run `future` to completion on the calling thread
///
/// Inside a multi-thread runtime the worker is handed off with
/// `block_in_place`. A current-thread runtime cannot make progress while
/// blocked, so that case is rejected.
pub(crate) fn block_on<T, F>(future: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => Err(Error::usage(
                "blocking DynamoDB call made on a current-thread runtime; use the `_async` variant",
            )),
            _ => tokio::task::block_in_place(|| handle.block_on(future)),
        },
        Err(_) => shared_runtime()?.block_on(future),
    }
}
