//! # Timeline Handle
//!
//! Runs a [`DrawingModel`] on its own task and feeds it commands through a
//! bounded FIFO. Every mutation of one document goes through that queue,
//! so appends and seeks never interleave.
//!
//! ```text
//!   TimelineHandle (Clone)      mpsc      timeline task
//!   ┌─────────────────────┐  ────────▶  ┌──────────────────────────┐
//!   │ .append()           │             │ DrawingModel             │
//!   │ .seek()             │  ◀────────  │ one command at a time    │
//!   │ .undo() / .redo()   │   oneshot   │ queued seeks collapse    │
//!   └─────────────────────┘             └──────────────────────────┘
//! ```
//!
//! Seeks queued behind each other are collapsed: the task jumps straight to
//! the newest target and answers the older requests with
//! [`SeekOutcome::Superseded`]. A seek is never dropped without a reply, and
//! a non-seek command found while collapsing still runs in its turn.

use palimpsest_history::{Event, EventIndex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::{ContentHandler, DrawBackend, StorageBackend};
use crate::errors::{TimelineError, TimelineResult};
use crate::model::{AppendOutcome, DrawingModel, TimelineStatus};

/// Result of a seek submitted through a [`TimelineHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The document now sits at `cursor`
    Completed { cursor: EventIndex },

    /// A later seek to `by` was queued before this one started
    Superseded { by: EventIndex },
}

enum Command<P> {
    Append {
        event: Event<P>,
        reply: oneshot::Sender<TimelineResult<AppendOutcome>>,
    },
    Seek {
        target: EventIndex,
        reply: oneshot::Sender<TimelineResult<SeekOutcome>>,
    },
    Undo {
        time: f64,
        reply: oneshot::Sender<TimelineResult<Option<EventIndex>>>,
    },
    Redo {
        time: f64,
        reply: oneshot::Sender<TimelineResult<Option<EventIndex>>>,
    },
    Flush {
        reply: oneshot::Sender<TimelineResult<()>>,
    },
    Status {
        reply: oneshot::Sender<TimelineStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front end of a spawned timeline
pub struct TimelineHandle<P> {
    tx: mpsc::Sender<Command<P>>,
}

impl<P> Clone for TimelineHandle<P> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<P: Send + Sync + 'static> TimelineHandle<P> {
    /// Move `model` onto a new task.
    ///
    /// The join handle yields the model back once every handle is dropped
    /// or [`TimelineHandle::shutdown`] is called.
    pub fn spawn<S, D, H>(model: DrawingModel<S, D, H>) -> (Self, JoinHandle<DrawingModel<S, D, H>>)
    where
        S: StorageBackend<Payload = P> + 'static,
        D: DrawBackend<Snapshot = S::Raster> + 'static,
        H: ContentHandler<D, Payload = P, Document = S::Document> + 'static,
    {
        let (tx, rx) = mpsc::channel(model.config().command_queue_depth.max(1));
        let task = tokio::spawn(run(model, rx));
        (Self { tx }, task)
    }

    pub async fn append(&self, event: Event<P>) -> TimelineResult<AppendOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Append { event, reply }).await?;
        rx.await.map_err(|_| TimelineError::Shutdown)?
    }

    pub async fn seek(&self, target: EventIndex) -> TimelineResult<SeekOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Seek { target, reply }).await?;
        rx.await.map_err(|_| TimelineError::Shutdown)?
    }

    pub async fn undo(&self, time: f64) -> TimelineResult<Option<EventIndex>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Undo { time, reply }).await?;
        rx.await.map_err(|_| TimelineError::Shutdown)?
    }

    pub async fn redo(&self, time: f64) -> TimelineResult<Option<EventIndex>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Redo { time, reply }).await?;
        rx.await.map_err(|_| TimelineError::Shutdown)?
    }

    pub async fn flush(&self) -> TimelineResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Flush { reply }).await?;
        rx.await.map_err(|_| TimelineError::Shutdown)?
    }

    pub async fn status(&self) -> TimelineResult<TimelineStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status { reply }).await?;
        rx.await.map_err(|_| TimelineError::Shutdown)
    }

    /// Stop the task after the commands already queued ahead of this one
    pub async fn shutdown(&self) -> TimelineResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        rx.await.map_err(|_| TimelineError::Shutdown)
    }

    async fn send(&self, command: Command<P>) -> TimelineResult<()> {
        self.tx.send(command).await.map_err(|_| TimelineError::Shutdown)
    }
}

async fn run<S, D, H>(
    mut model: DrawingModel<S, D, H>,
    mut rx: mpsc::Receiver<Command<S::Payload>>,
) -> DrawingModel<S, D, H>
where
    S: StorageBackend,
    D: DrawBackend<Snapshot = S::Raster>,
    H: ContentHandler<D, Payload = S::Payload, Document = S::Document>,
{
    let mut held = None;

    loop {
        let command = match held.take() {
            Some(command) => command,
            None => match rx.recv().await {
                Some(command) => command,
                None => break,
            },
        };

        // Callers that stopped waiting are not an error
        match command {
            Command::Append { event, reply } => {
                let _ = reply.send(model.append(event).await);
            }
            Command::Seek { target, reply } => {
                let (target, reply) = collapse_seeks(&mut rx, &mut held, target, reply);
                let result = model
                    .seek(target)
                    .await
                    .map(|()| SeekOutcome::Completed { cursor: model.cursor() });
                let _ = reply.send(result);
            }
            Command::Undo { time, reply } => {
                let _ = reply.send(model.undo(time).await);
            }
            Command::Redo { time, reply } => {
                let _ = reply.send(model.redo(time).await);
            }
            Command::Flush { reply } => {
                let _ = reply.send(model.flush().await);
            }
            Command::Status { reply } => {
                let _ = reply.send(model.status());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                break;
            }
        }
    }

    info!(cursor = model.cursor(), "timeline task stopped");
    model
}

/// Drain seeks queued directly behind the current one, keeping the newest.
///
/// The first non-seek command drained is parked in `held`.
fn collapse_seeks<P>(
    rx: &mut mpsc::Receiver<Command<P>>,
    held: &mut Option<Command<P>>,
    mut target: EventIndex,
    mut reply: oneshot::Sender<TimelineResult<SeekOutcome>>,
) -> (EventIndex, oneshot::Sender<TimelineResult<SeekOutcome>>) {
    let mut superseded = 0usize;

    while let Ok(command) = rx.try_recv() {
        match command {
            Command::Seek {
                target: next,
                reply: next_reply,
            } => {
                let _ = reply.send(Ok(SeekOutcome::Superseded { by: next }));
                target = next;
                reply = next_reply;
                superseded += 1;
            }
            other => {
                *held = Some(other);
                break;
            }
        }
    }

    if superseded > 0 {
        debug!(superseded, target, "collapsed queued seeks");
    }
    (target, reply)
}
