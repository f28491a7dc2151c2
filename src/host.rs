//! Host Stack Interface
//!
//! Capabilities the Bluetooth host stack hands to the vendor library at
//! initialization: buffer allocation, command transmission, outcome
//! callbacks and controller power control.

use crate::domain::buffer::{BufferAllocator, HciBuffer};
use crate::domain::command::Opcode;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Outcome reported through the vendor callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpResult {
    Success,
    Fail,
}

/// Continuation for a submitted command
///
/// Consumed by [`Completion::complete`], so the event can be delivered at
/// most once.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<HciBuffer>,
}

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<HciBuffer>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Deliver the Command Complete event for the submitted command.
    /// Ownership of `event` passes to the waiting chain.
    pub fn complete(self, event: HciBuffer) {
        // A chain that is no longer waiting drops (and frees) the event here
        let _ = self.tx.send(event);
    }
}

/// Command handed back by a transport that refused it
#[derive(Debug)]
pub struct Rejected(pub HciBuffer);

/// Command transmit path of the host stack
pub trait CommandTransport: Send + Sync {
    /// Queue `command` for transmission.
    ///
    /// On `Ok` the transport owns the buffer and must eventually call
    /// `completion` with the matching Command Complete event. On `Err` the
    /// buffer is returned to the caller and `completion` is never called.
    fn submit(
        &self,
        opcode: Opcode,
        command: HciBuffer,
        completion: Completion,
    ) -> Result<(), Rejected>;
}

/// Outcome callbacks, each invoked at most once per operation
pub trait VendorCallbacks: Send + Sync {
    fn firmware_config_done(&self, result: OpResult);
    fn sco_config_done(&self, result: OpResult);
    fn lpm_set_done(&self, result: OpResult);
}

/// Controller power switch
pub trait PowerControl: Send + Sync {
    fn enable(&self) -> std::io::Result<()>;
    fn disable(&self) -> std::io::Result<()>;
}

/// Everything the host stack provides at initialization
#[derive(Clone)]
pub struct HostInterface {
    pub allocator: Arc<dyn BufferAllocator>,
    pub transport: Arc<dyn CommandTransport>,
    pub callbacks: Arc<dyn VendorCallbacks>,
    pub power: Arc<dyn PowerControl>,
}
