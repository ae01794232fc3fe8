//! Blocking bridge from the budex data-access surface to the async engines
//!
//! `DataBuilder`, `Query` and `DataAdapter` are synchronous: a caller asks for
//! a table and gets it back filled. The engines behind them (rusqlite through
//! `spawn_blocking`, tiberius over TCP, the flat-file readers) are async. Every
//! connect, query, execute and close they issue is driven to completion here,
//! on one runtime shared by all connections of the process.
//!
//! The bridge also holds when the caller is itself async. On a multi-threaded
//! runtime the calling worker hands its tasks off with `block_in_place`; on a
//! current-thread runtime, which cannot give up its only thread, the future
//! runs on a short-lived helper thread instead.

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

static DRIVER_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The runtime engine connections live on, created on first use.
///
/// # Panics
///
/// Panics if the runtime cannot be created.
pub fn get_tokio_runtime() -> &'static Runtime {
    DRIVER_RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("budex-engine")
            .build()
            .expect("Failed to create the budex engine runtime")
    })
}

/// Drive an engine call to completion from synchronous code.
///
/// ```ignore
/// let conn = block_on_tokio(driver.connect(&config))?;
/// let result = block_on_tokio(conn.query(statement.text(), statement.params()))?;
/// ```
pub fn block_on_tokio<F, T>(future: F) -> T
where
    F: Future<Output = T> + Send,
    T: Send,
{
    let runtime = get_tokio_runtime();
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Err(_) => runtime.block_on(future),
        Ok(RuntimeFlavor::MultiThread) => {
            tokio::task::block_in_place(|| runtime.block_on(future))
        }
        Ok(_) => std::thread::scope(|scope| {
            match scope.spawn(|| runtime.block_on(future)).join() {
                Ok(output) => output,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }),
    }
}
