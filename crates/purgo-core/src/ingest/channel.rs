//! Bounded admission queue.

use tokio::sync::mpsc;

use crate::config::PipelineConfig;

/// Create the admission queue with the configured buffer size.
///
/// When the buffer is full, senders wait, so a burst of drops cannot pile
/// up unbounded payloads in memory ahead of the workers.
pub(crate) fn bounded_channel<T>(config: &PipelineConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.buffer_size)
}
