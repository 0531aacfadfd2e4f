//! Outbound buffers
//!
//! - [`OutboundQueue`]: messages sent while the socket was not open. Bounded
//!   FIFO; when full the *new* message is rejected, so the earliest messages
//!   (usually handshake/subscription data) survive a long outage.
//! - [`BatchBuffer`]: payloads collected during one batch interval while
//!   connected, flushed as a single envelope.

use std::collections::VecDeque;

#[derive(Debug)]
pub struct OutboundQueue {
    messages: VecDeque<String>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// Append a message, handing it back if the queue is full
    pub fn push(&mut self, message: String) -> Result<usize, String> {
        if self.messages.len() >= self.capacity {
            return Err(message);
        }
        self.messages.push_back(message);
        Ok(self.messages.len())
    }

    /// Oldest message first
    pub fn pop_front(&mut self) -> Option<String> {
        self.messages.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Default)]
pub struct BatchBuffer {
    messages: Vec<String>,
}

impl BatchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the new length
    pub fn push(&mut self, message: String) -> usize {
        self.messages.push(message);
        self.messages.len()
    }

    /// Take every buffered payload, in call order
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
