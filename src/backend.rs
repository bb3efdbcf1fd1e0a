//! Concurrency backend abstraction.
//!
//! The send pipeline and dispatcher are written entirely against `async`; this
//! module is the single seam where that async core is driven from blocking code
//! (offloaded dispatchers, the synchronous `Client`). Grounded on the
//! block-on-a-shared-runtime shape used throughout `other_examples`' rnet
//! blocking wrappers (`pyo3_async_runtimes::tokio::get_runtime().block_on(...)`),
//! adapted here to an owned, private runtime rather than a process-global one.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::future::Future;
use std::io;
use std::mem::ManuallyDrop;
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;

/// A pluggable way to drive async work from blocking call sites. `TokioBackend`
/// is the only implementation the synchronous `Client` accepts (see
/// `TokioBackend`'s doc comment); the trait exists so the async core never
/// names `tokio` directly outside this module and `ReqwestDispatcher`.
pub trait ConcurrencyBackend: Send + Sync {
    /// Block the calling thread until `fut` completes. Calling this from inside
    /// another `run` on the same backend is unsupported (matches httpx's
    /// `AsyncioBackend.run` contract: nested loops are not allowed).
    fn run<F>(&self, fut: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send;

    /// Lift a blocking iterator onto the backend's thread pool, yielding an
    /// async stream of its items. Used to turn a caller-supplied blocking body
    /// iterator into a `Body::Stream` before it reaches the send pipeline.
    fn iterate_in_threadpool(
        &self,
        iter: Box<dyn Iterator<Item = io::Result<Bytes>> + Send>,
    ) -> BoxStream<'static, io::Result<Bytes>>;

    /// The inverse: drive an async stream to completion chunk-by-chunk from a
    /// blocking call site, producing a blocking iterator. Each `next()` call
    /// performs one `run`-sized block; only a backend whose block-on is cheap
    /// per call (i.e. `TokioBackend`) should be used this way (see §5.2).
    fn iterate(
        &self,
        stream: BoxStream<'static, io::Result<Bytes>>,
    ) -> Box<dyn Iterator<Item = io::Result<Bytes>> + Send>;
}

/// The default concurrency backend: a private multi-threaded Tokio runtime.
pub struct TokioBackend {
    // `ManuallyDrop` so `Drop` can hand the runtime to a plain OS thread for
    // shutdown instead of dropping it in place (see the `Drop` impl below).
    runtime: ManuallyDrop<tokio::runtime::Runtime>,
}

impl TokioBackend {
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime: ManuallyDrop::new(runtime),
        })
    }

    /// Offload a blocking closure onto this backend's runtime, bypassing the
    /// generic [`ConcurrencyBackend::run`] seam. Used by
    /// [`crate::dispatch::ThreadedDispatcher`], which is bound to one concrete
    /// backend rather than an arbitrary `dyn ConcurrencyBackend` (see
    /// DESIGN.md: the trait's generic `run` makes it impossible to store as a
    /// trait object, and `TokioBackend` is the only implementation this crate
    /// ships).
    pub(crate) fn spawn_blocking<F, R>(&self, f: F) -> tokio::task::JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.runtime.spawn_blocking(f)
    }
}

/// Shutting down a `Runtime` in place panics if the dropping thread is itself
/// executing inside another Tokio runtime (a nested backend dropped from an
/// async call site). Move the runtime to a fresh OS thread instead, where no
/// such context exists.
impl Drop for TokioBackend {
    fn drop(&mut self) {
        // Safety: `runtime` is not read again after this point.
        let runtime = unsafe { ManuallyDrop::take(&mut self.runtime) };
        std::thread::spawn(move || drop(runtime));
    }
}

impl Default for TokioBackend {
    /// Panics if the runtime cannot be built (out of threads/fds); matches the
    /// teacher's convention of treating runtime construction as infallible at
    /// the call sites that use `Default`.
    fn default() -> Self {
        Self::new().expect("failed to build the default Tokio runtime")
    }
}

impl ConcurrencyBackend for TokioBackend {
    fn run<F>(&self, fut: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send,
    {
        self.runtime.block_on(fut)
    }

    fn iterate_in_threadpool(
        &self,
        iter: Box<dyn Iterator<Item = io::Result<Bytes>> + Send>,
    ) -> BoxStream<'static, io::Result<Bytes>> {
        let (tx, rx) = mpsc::channel(16);
        self.runtime.spawn_blocking(move || {
            for item in iter {
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
        });
        tokio_stream_from_receiver(rx).boxed()
    }

    fn iterate(
        &self,
        stream: BoxStream<'static, io::Result<Bytes>>,
    ) -> Box<dyn Iterator<Item = io::Result<Bytes>> + Send> {
        let (tx, rx) = std_mpsc::channel::<io::Result<Bytes>>();
        self.runtime.spawn(async move {
            let mut stream = stream;
            while let Some(item) = stream.next().await {
                if tx.send(item).is_err() {
                    break;
                }
            }
        });
        Box::new(rx.into_iter())
    }
}

fn tokio_stream_from_receiver(
    mut rx: mpsc::Receiver<io::Result<Bytes>>,
) -> impl Stream<Item = io::Result<Bytes>> {
    async_stream::stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
    }
}
