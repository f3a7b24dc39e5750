//! Async bridge to the synchronous outcome store.
//!
//! Store calls must not block the async caller, so the store lives on a
//! dedicated thread: operations are submitted as boxed closures over a
//! channel and answered through a oneshot.
//!
//! # Usage
//!
//! ```ignore
//! let executor = StoreExecutor::new(store);
//!
//! let record = executor.run(|store| store.most_recent()).await?;
//! ```

use std::sync::mpsc;
use std::thread;

use outcome_tally_store_sqlite::SqliteTallyStore;
use tokio::sync::oneshot;

/// Runs store operations on a dedicated thread that owns the connection.
pub struct StoreExecutor {
    sender: mpsc::Sender<StoreOperation>,
    _handle: thread::JoinHandle<()>,
}

type BoxedStoreOp = Box<dyn FnOnce(&mut SqliteTallyStore) -> BoxedResult + Send + 'static>;
type BoxedResult = Box<dyn std::any::Any + Send + 'static>;

struct StoreOperation {
    op: BoxedStoreOp,
    response: oneshot::Sender<BoxedResult>,
}

impl StoreExecutor {
    /// Take ownership of the store and start the executor thread.
    ///
    /// The thread drains operations until every sender handle is dropped,
    /// then exits; there is no other teardown.
    #[must_use]
    pub fn new(store: SqliteTallyStore) -> Self {
        let (sender, receiver) = mpsc::channel::<StoreOperation>();

        let handle = thread::spawn(move || {
            let mut store = store;

            while let Ok(operation) = receiver.recv() {
                let result = (operation.op)(&mut store);
                let _ = operation.response.send(result);
            }
        });

        Self {
            sender,
            _handle: handle,
        }
    }

    /// Run one store operation on the executor thread and await its result.
    ///
    /// # Errors
    /// Returns [`ExecutorError::Store`] when the operation itself fails, or
    /// [`ExecutorError::ChannelClosed`] when the executor thread is gone.
    pub async fn run<F, T>(&self, op: F) -> Result<T, ExecutorError>
    where
        F: FnOnce(&mut SqliteTallyStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (response_tx, response_rx) = oneshot::channel();

        let boxed_op: BoxedStoreOp = Box::new(move |store| {
            let result = op(store);
            Box::new(result) as BoxedResult
        });

        let operation = StoreOperation {
            op: boxed_op,
            response: response_tx,
        };

        self.sender
            .send(operation)
            .map_err(|_| ExecutorError::ChannelClosed)?;

        let boxed_result = response_rx
            .await
            .map_err(|_| ExecutorError::ChannelClosed)?;

        let result = boxed_result
            .downcast::<anyhow::Result<T>>()
            .map_err(|_| ExecutorError::TypeMismatch)?;

        result.map_err(ExecutorError::Store)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("store executor channel closed")]
    ChannelClosed,

    #[error("store result had an unexpected type")]
    TypeMismatch,
}
