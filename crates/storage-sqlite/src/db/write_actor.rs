use super::DbPool;
use crate::errors::{IntoCore, StorageError};
use diesel::SqliteConnection;
use log::{debug, error, info};
use spendbook_core::errors::{DatabaseError, Error, Result};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// Type alias for the job to be executed by the writer actor.
// It takes a mutable reference to a SqliteConnection and returns a Result.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type AnyResult = Result<Box<dyn Any + Send + 'static>>;

/// Bound of the job queue.
const WRITE_QUEUE_CAPACITY: usize = 1024;

enum Command {
    Run(Job<Box<dyn Any + Send + 'static>>, oneshot::Sender<AnyResult>),
    Shutdown(oneshot::Sender<()>),
}

fn closed() -> Error {
    Error::Database(DatabaseError::Closed(
        "the writer has stopped".to_string(),
    ))
}

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Command>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// The job runs inside an immediate transaction; the returned future
    /// resolves after the transaction has committed or rolled back.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send(Command::Run(
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| closed())?;

        let boxed = ret_rx.await.map_err(|_| closed())??;
        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Failed to downcast writer actor result".to_string(),
            ))
        })
    }

    /// Stops the actor after the jobs already queued have run.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Command::Shutdown(ack_tx))
            .await
            .map_err(|_| closed())?;
        ack_rx.await.map_err(|_| closed())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawns a background Tokio task that acts as the single writer to the database.
///
/// The actor owns one connection from the pool for its whole lifetime and
/// processes jobs serially. Must be called from within a tokio runtime.
pub fn spawn_writer(pool: &DbPool) -> Result<WriteHandle> {
    let mut conn = pool.get().into_core()?;
    let (tx, mut rx) = mpsc::channel::<Command>(WRITE_QUEUE_CAPACITY);

    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Run(job, reply_tx) => {
                    let result: AnyResult = conn
                        .immediate_transaction::<_, StorageError, _>(|c| {
                            job(c).map_err(StorageError::from)
                        })
                        .map_err(|e: StorageError| {
                            error!("Write transaction failed: {}", e);
                            e.into()
                        });

                    // The caller may have gone away; the transaction outcome stands.
                    let _ = reply_tx.send(result);
                }
                Command::Shutdown(ack_tx) => {
                    info!("Writer actor shutting down");
                    rx.close();
                    let _ = ack_tx.send(());
                    break;
                }
            }
        }
        debug!("Writer actor stopped");
    });

    Ok(WriteHandle { tx })
}
