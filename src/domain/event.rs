//! Command Complete event parsing

use crate::domain::buffer::HciBuffer;
use crate::domain::command::Opcode;
use crate::error::ChainError;

/// Event code, parameter length and command credits precede the opcode
const CMD_CMPL_OPCODE_OFFSET: usize = 3;

/// Fields of a Command Complete event the chains care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    /// Opcode of the acknowledged command
    pub opcode: Opcode,
    /// First return parameter (status)
    pub status: u8,
}

impl EventRecord {
    /// Extract the acknowledged opcode and status from a Command Complete event
    ///
    /// # Event Structure
    ///
    /// ```text
    /// [0]   : Event code
    /// [1]   : Parameter length
    /// [2]   : Number of HCI command packets
    /// [3-4] : Opcode (u16 little-endian)
    /// [5]   : Return parameter
    /// ```
    ///
    /// The buffer is only borrowed; the caller decides when to free it.
    pub fn parse(event: &HciBuffer) -> Result<Self, ChainError> {
        let bytes = event.data();
        match bytes.get(CMD_CMPL_OPCODE_OFFSET..CMD_CMPL_OPCODE_OFFSET + 3) {
            Some(&[lo, hi, status]) => Ok(Self {
                opcode: Opcode(u16::from_le_bytes([lo, hi])),
                status,
            }),
            _ => Err(ChainError::ShortEvent(bytes.len())),
        }
    }
}
