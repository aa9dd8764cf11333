//! Job registration point for the host's message channel.
//!
//! The host calls [`ExportExtension::receive`] once per inbound message;
//! every handler added with [`on_job_received`](ExportExtension::on_job_received)
//! sees it, in registration order.

use std::fmt;

use tracing::debug;

use crate::message::InboundMessage;

/// A job handler.
pub type JobHandler = Box<dyn Fn(&InboundMessage)>;

/// Named fan-out of inbound job messages to registered handlers.
pub struct ExportExtension {
    name: String,
    handlers: Vec<JobHandler>,
}

impl ExportExtension {
    /// Create an extension with no handlers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Vec::new(),
        }
    }

    /// Extension name as registered with the host.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a handler called for every received message.
    pub fn on_job_received(&mut self, handler: impl Fn(&InboundMessage) + 'static) -> &mut Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Deliver `message` to every handler, in registration order.
    pub fn receive(&self, message: &InboundMessage) {
        debug!(extension = %self.name, handlers = self.handlers.len(), "job received");
        for handler in &self.handlers {
            handler(message);
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for ExportExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportExtension")
            .field("name", &self.name)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
