//! Configuration Sequencer
//!
//! Two independent command chains drive the controller configuration:
//!
//! ```text
//! Firmware: WRITE_BD_ADDRESS -> done
//! SCO:      WRITE_PCM_SETTINGS -> WRITE_PCM_SYNC_SETTINGS
//!           -> WRITE_PCM_LINK_SETTINGS -> SET_SCO_DATA_PATH -> done
//! ```
//!
//! Each chain keeps at most one command in flight. The next command is only
//! built once the Command Complete event for the current step has arrived
//! and acknowledged the expected opcode. Anything else aborts the chain.

use crate::domain::buffer::{build_command, BufferAllocator};
use crate::domain::command::{params, BdAddr, CommandDescriptor, Opcode};
use crate::domain::event::EventRecord;
use crate::error::ChainError;
use crate::host::{CommandTransport, Completion, Rejected};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of feeding an acknowledgment to a chain step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<S> {
    /// Send the command of the next step
    Next(S),
    /// Final step acknowledged
    Complete,
    /// Acknowledgment does not belong to the command in flight
    Unexpected,
}

/// A step of a configuration chain
pub trait ChainStep: Copy + std::fmt::Debug {
    /// Chain name used in logs
    const CHAIN: &'static str;

    fn first() -> Self;

    fn opcode(self) -> Opcode;

    /// Step that follows once this one is acknowledged
    fn next(self) -> Option<Self>;

    fn command(self, local_addr: &BdAddr) -> Result<CommandDescriptor, ChainError>;

    /// Transition table: (step, acknowledged opcode) -> transition
    fn advance(self, acked: Opcode) -> Transition<Self> {
        if acked != self.opcode() {
            return Transition::Unexpected;
        }
        match self.next() {
            Some(step) => Transition::Next(step),
            None => Transition::Complete,
        }
    }
}

/// Firmware configuration: program the local BD address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareStep {
    WriteBdAddress,
}

impl ChainStep for FirmwareStep {
    const CHAIN: &'static str = "fwcfg";

    fn first() -> Self {
        Self::WriteBdAddress
    }

    fn opcode(self) -> Opcode {
        match self {
            Self::WriteBdAddress => Opcode::WRITE_BD_ADDRESS,
        }
    }

    fn next(self) -> Option<Self> {
        None
    }

    fn command(self, local_addr: &BdAddr) -> Result<CommandDescriptor, ChainError> {
        match self {
            Self::WriteBdAddress => {
                CommandDescriptor::new(self.opcode(), local_addr.write_params())
            }
        }
    }
}

/// SCO configuration: route SCO audio over PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoStep {
    PcmSettings,
    PcmSyncSettings,
    PcmLinkSettings,
    ScoDataPath,
}

impl ChainStep for ScoStep {
    const CHAIN: &'static str = "scocfg";

    fn first() -> Self {
        Self::PcmSettings
    }

    fn opcode(self) -> Opcode {
        match self {
            Self::PcmSettings => Opcode::WRITE_PCM_SETTINGS,
            Self::PcmSyncSettings => Opcode::WRITE_PCM_SYNC_SETTINGS,
            Self::PcmLinkSettings => Opcode::WRITE_PCM_LINK_SETTINGS,
            Self::ScoDataPath => Opcode::SET_SCO_DATA_PATH,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::PcmSettings => Some(Self::PcmSyncSettings),
            Self::PcmSyncSettings => Some(Self::PcmLinkSettings),
            Self::PcmLinkSettings => Some(Self::ScoDataPath),
            Self::ScoDataPath => None,
        }
    }

    fn command(self, _local_addr: &BdAddr) -> Result<CommandDescriptor, ChainError> {
        let payload = match self {
            Self::PcmSettings => params::WRITE_PCM_SETTINGS,
            Self::PcmSyncSettings => params::WRITE_PCM_SYNC_SETTINGS,
            Self::PcmLinkSettings => params::WRITE_PCM_LINK_SETTINGS,
            Self::ScoDataPath => params::SET_SCO_DATA_PATH,
        };
        CommandDescriptor::new(self.opcode(), payload)
    }
}

/// Runs configuration chains against the host's allocator and transport
pub struct Sequencer {
    allocator: Arc<dyn BufferAllocator>,
    transport: Arc<dyn CommandTransport>,
    local_addr: BdAddr,
}

impl Sequencer {
    pub fn new(
        allocator: Arc<dyn BufferAllocator>,
        transport: Arc<dyn CommandTransport>,
        local_addr: BdAddr,
    ) -> Self {
        Self {
            allocator,
            transport,
            local_addr,
        }
    }

    /// Drive the chain starting at `S::first()` until it completes or aborts
    pub async fn run<S: ChainStep>(&self) -> Result<(), ChainError> {
        let mut step = S::first();

        loop {
            let record = self.execute(step).await?;

            if record.status != 0 {
                warn!(
                    "{}: command {} ({}) returned status {:#04X}",
                    S::CHAIN,
                    record.opcode,
                    record.opcode.name(),
                    record.status
                );
            }

            match step.advance(record.opcode) {
                Transition::Next(next) => {
                    debug!("{}: {:?} acknowledged, next {:?}", S::CHAIN, step, next);
                    step = next;
                }
                Transition::Complete => return Ok(()),
                Transition::Unexpected => {
                    error!(
                        "Received event for unexpected cmd ({}). Fail.",
                        record.opcode
                    );
                    return Err(ChainError::UnexpectedAck {
                        expected: step.opcode(),
                        acked: record.opcode,
                    });
                }
            }
        }
    }

    /// Send the command for `step` and wait for its Command Complete event
    async fn execute<S: ChainStep>(&self, step: S) -> Result<EventRecord, ChainError> {
        let cmd = step.command(&self.local_addr)?;
        let opcode = cmd.opcode();
        let buf = build_command(&self.allocator, &cmd)?;

        info!("Sending hci command {} ({})", opcode, opcode.name());
        let (completion, rx) = Completion::channel();
        if let Err(Rejected(buf)) = self.transport.submit(opcode, buf, completion) {
            // Still ours after a rejection
            drop(buf);
            return Err(ChainError::Rejected(opcode));
        }

        let event = rx.await.map_err(|_| ChainError::CompletionLost(opcode))?;
        let record = EventRecord::parse(&event);
        // Freed whatever the event contained
        drop(event);
        record
    }
}
