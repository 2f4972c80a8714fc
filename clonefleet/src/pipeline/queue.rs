//! Sentinel-terminated queues between stages.
//!
//! A queue carries [`Message::Item`]s followed by exactly one
//! [`Message::EndOfStream`]. The sending half cannot be cloned and emits the
//! marker when finished or dropped, so a consumer always sees the marker
//! last and sees it once.

use crate::core::WorkItem;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// One element of a stage queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A real work item.
    Item(WorkItem),
    /// No more items will arrive.
    EndOfStream,
}

/// Creates an unbounded FIFO queue.
#[must_use]
pub fn stage_queue() -> (StageSender, StageReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        StageSender {
            tx: Some(tx),
            sent: 0,
        },
        StageReceiver { rx, ended: false },
    )
}

/// Producing half of a stage queue.
#[derive(Debug)]
pub struct StageSender {
    tx: Option<UnboundedSender<Message>>,
    sent: usize,
}

impl StageSender {
    /// Enqueues `item`. Returns false if the consumer is gone.
    pub fn send(&mut self, item: WorkItem) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        if tx.send(Message::Item(item)).is_err() {
            debug!("Queue consumer is gone; item discarded");
            return false;
        }
        self.sent += 1;
        true
    }

    /// Items enqueued so far.
    #[must_use]
    pub const fn sent(&self) -> usize {
        self.sent
    }

    /// Enqueues the end-of-stream marker.
    pub fn finish(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Message::EndOfStream);
        }
    }
}

impl Drop for StageSender {
    fn drop(&mut self) {
        self.close();
    }
}

/// Consuming half of a stage queue.
#[derive(Debug)]
pub struct StageReceiver {
    rx: UnboundedReceiver<Message>,
    ended: bool,
}

impl StageReceiver {
    /// Waits for the next item; `None` once the end-of-stream marker has been
    /// consumed.
    ///
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<WorkItem> {
        if self.ended {
            return None;
        }
        match self.rx.recv().await {
            Some(Message::Item(item)) => Some(item),
            Some(Message::EndOfStream) => {
                self.ended = true;
                None
            }
            None => {
                warn!("Queue closed without an end-of-stream marker");
                self.ended = true;
                None
            }
        }
    }

    /// Returns true once the end of the stream has been reached.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.ended
    }
}
