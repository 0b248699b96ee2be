//! Command channel: the outbound, fire-and-forget half of the bridge.
//!
//! DESIGN
//! ======
//! The embedded surface offers one primitive: execute this script. It reports
//! at most a best-effort "something ran" flag and never whether the mutation
//! was applied. Callers therefore treat the channel as an append-only log that
//! the surface consumes asynchronously, in FIFO order per sender. Nothing here
//! queues, retries, or acknowledges.

#[cfg(test)]
#[path = "channel_test.rs"]
mod channel_test;

use tokio::sync::mpsc;

use crate::command::Command;
use crate::script::{Script, render};

/// The execution primitive of an embedded surface.
pub trait Transport {
    /// Hand a fragment to the surface. The return value is only the
    /// transport's own "dispatched" flag.
    fn inject(&mut self, script: &Script) -> bool;
}

/// Recording transport, in injection order.
impl Transport for Vec<Script> {
    fn inject(&mut self, script: &Script) -> bool {
        self.push(script.clone());
        true
    }
}

/// Anything the coordinator can issue commands to.
pub trait CommandSink {
    fn submit(&mut self, command: Command) -> bool;
}

/// Recording sink, in submission order.
impl CommandSink for Vec<Command> {
    fn submit(&mut self, command: Command) -> bool {
        self.push(command);
        true
    }
}

/// Renders commands and hands them to a transport.
#[derive(Debug)]
pub struct CommandChannel<T: Transport> {
    transport: T,
    dispatched: u64,
}

impl<T: Transport> CommandChannel<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self { transport, dispatched: 0 }
    }

    /// Render and inject one command.
    pub fn dispatch(&mut self, command: &Command) -> bool {
        let script = render(command);
        let accepted = self.transport.inject(&script);
        self.dispatched += 1;
        if accepted {
            tracing::debug!(command = command.name(), seq = self.dispatched, "command dispatched");
        } else {
            tracing::debug!(command = command.name(), seq = self.dispatched, "transport rejected command");
        }
        accepted
    }

    /// Number of commands handed to the transport so far.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: Transport> CommandSink for CommandChannel<T> {
    fn submit(&mut self, command: Command) -> bool {
        self.dispatch(&command)
    }
}

/// Writing end of a [`script_log`].
#[derive(Debug, Clone)]
pub struct ScriptLogWriter {
    tx: mpsc::UnboundedSender<Script>,
}

impl Transport for ScriptLogWriter {
    fn inject(&mut self, script: &Script) -> bool {
        self.tx.send(script.clone()).is_ok()
    }
}

/// An append-only script log.
///
/// The writer goes into a [`CommandChannel`]; whatever drives the web view
/// drains the receiver and evaluates each fragment in order. Once the receiver
/// is dropped every injection reports `false`.
#[must_use]
pub fn script_log() -> (ScriptLogWriter, mpsc::UnboundedReceiver<Script>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ScriptLogWriter { tx }, rx)
}
