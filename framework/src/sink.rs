/// Event sink - the boundary between detection and the broadcast transport
///
/// Publishing is best-effort telemetry: callers fire and forget, never retry,
/// and detection never depends on the outcome.
use log::info;

use crate::wire::{WireError, WireMessage};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] WireError),
}

/// Outbound half of the pub/sub channel
pub trait EventSink {
    /// Publish one message without waiting for acknowledgment
    fn publish(&mut self, message: &WireMessage) -> Result<(), PublishError>;
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn publish(&mut self, message: &WireMessage) -> Result<(), PublishError> {
        (**self).publish(message)
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn publish(&mut self, message: &WireMessage) -> Result<(), PublishError> {
        (**self).publish(message)
    }
}

/// Drops everything (offline mode)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _message: &WireMessage) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Logs each message instead of sending it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&mut self, message: &WireMessage) -> Result<(), PublishError> {
        info!("[{}] {}", message.kind(), message.encode()?);
        Ok(())
    }
}

/// Keeps published messages in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    messages: Vec<WireMessage>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[WireMessage] {
        &self.messages
    }

    /// Published bump events, in publish order
    pub fn bumps(&self) -> impl Iterator<Item = &crate::types::BumpEvent> {
        self.messages.iter().filter_map(|m| match m {
            WireMessage::Bump { event } => Some(event),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl EventSink for MemorySink {
    fn publish(&mut self, message: &WireMessage) -> Result<(), PublishError> {
        self.messages.push(message.clone());
        Ok(())
    }
}
