//! Error types for the configuration chains and the vendor facade.

use crate::domain::command::Opcode;
use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration chain was aborted
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("payload of {len} bytes for command {opcode} exceeds 255 bytes")]
    PayloadTooLong { opcode: Opcode, len: usize },

    #[error("could not allocate {size} bytes for command {opcode}")]
    Alloc { opcode: Opcode, size: usize },

    #[error("transport rejected command {0}")]
    Rejected(Opcode),

    #[error("completion for command {0} was dropped without an event")]
    CompletionLost(Opcode),

    #[error("command complete event too short ({0} bytes)")]
    ShortEvent(usize),

    #[error("received event for unexpected command {acked} while waiting for {expected}")]
    UnexpectedAck { expected: Opcode, acked: Opcode },
}

/// Errors reported through the operation entry point
#[derive(Debug, Error)]
pub enum VendorError {
    #[error("failed to open port {} after {attempts} attempts", .path.display())]
    OpenExhausted { path: PathBuf, attempts: u32 },

    #[error("port is not open")]
    NotOpen,

    #[error("failed to close port {}", .path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid power state {0}")]
    InvalidPowerState(i32),

    #[error("power control failed")]
    Power(#[source] std::io::Error),
}

impl VendorError {
    /// Status code handed back to the host stack
    pub fn code(&self) -> i32 {
        -1
    }
}
