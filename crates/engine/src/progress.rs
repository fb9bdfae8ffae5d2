//! Progress reporting.
//!
//! The engine pushes events into an unbounded channel; the consumer (a
//! terminal renderer, a test) decides what to do with them. A dropped
//! receiver silently disables reporting.

use std::sync::Arc;

use tokio::sync::mpsc;

/// Lifecycle of one file transfer.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        file: Arc<str>,
        /// Total size when the server advertised one.
        total: Option<u64>,
        /// Bytes already on disk when the transfer began.
        resumed_from: u64,
    },
    Transferred {
        file: Arc<str>,
        /// Cumulative bytes including any resumed prefix.
        bytes: u64,
    },
    Finished {
        file: Arc<str>,
    },
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

pub fn channel() -> (ProgressSender, mpsc::UnboundedReceiver<ProgressEvent>) {
    mpsc::unbounded_channel()
}
