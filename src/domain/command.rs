//! Marvell Vendor Commands
//!
//! Opcodes, fixed parameter blocks and the local device address used by the
//! controller configuration chains.

use crate::error::ChainError;
use std::fmt;

/// 16-bit HCI command opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

impl Opcode {
    pub const WRITE_PCM_SETTINGS: Opcode = Opcode(0xFC07);
    pub const WRITE_PCM_SYNC_SETTINGS: Opcode = Opcode(0xFC28);
    pub const WRITE_PCM_LINK_SETTINGS: Opcode = Opcode(0xFC29);
    pub const SET_SCO_DATA_PATH: Opcode = Opcode(0xFC1D);
    pub const WRITE_BD_ADDRESS: Opcode = Opcode(0xFC22);

    /// Human readable command name, used in logs
    pub fn name(self) -> &'static str {
        match self {
            Self::WRITE_PCM_SETTINGS => "write_pcm_settings",
            Self::WRITE_PCM_SYNC_SETTINGS => "write_pcm_sync_settings",
            Self::WRITE_PCM_LINK_SETTINGS => "write_pcm_link_settings",
            Self::SET_SCO_DATA_PATH => "set_sco_data_path",
            Self::WRITE_BD_ADDRESS => "write_bd_address",
            _ => "unknown command",
        }
    }

    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

/// Fixed parameter blocks for the SCO/PCM configuration commands
pub mod params {
    pub const WRITE_PCM_SETTINGS: &[u8] = &[0x02];
    pub const WRITE_PCM_SYNC_SETTINGS: &[u8] = &[0x03, 0x00, 0x03];
    pub const WRITE_PCM_LINK_SETTINGS: &[u8] = &[0x03, 0x00];
    pub const SET_SCO_DATA_PATH: &[u8] = &[0x01];

    /// Parameter ID of the BD address entry in WRITE_BD_ADDRESS
    pub const BD_ADDR_PARAM_ID: u8 = 0xFE;
}

/// Bluetooth device address as handed over by the host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BdAddr(pub [u8; 6]);

impl BdAddr {
    pub const LEN: usize = 6;

    /// Address bytes in controller order (last byte first)
    pub fn reversed(&self) -> [u8; 6] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    /// WRITE_BD_ADDRESS parameters: param id, length, reversed address
    pub fn write_params(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + Self::LEN);
        payload.push(params::BD_ADDR_PARAM_ID);
        payload.push(Self::LEN as u8);
        payload.extend_from_slice(&self.reversed());
        payload
    }
}

impl From<[u8; 6]> for BdAddr {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// A single outbound vendor command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    opcode: Opcode,
    payload: Vec<u8>,
}

impl CommandDescriptor {
    /// Payload length is carried in one byte on the wire
    pub const MAX_PAYLOAD: usize = u8::MAX as usize;

    pub fn new(opcode: Opcode, payload: impl Into<Vec<u8>>) -> Result<Self, ChainError> {
        let payload = payload.into();
        if payload.len() > Self::MAX_PAYLOAD {
            return Err(ChainError::PayloadTooLong {
                opcode,
                len: payload.len(),
            });
        }
        Ok(Self { opcode, payload })
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> u8 {
        // Bounded by MAX_PAYLOAD in `new`
        self.payload.len() as u8
    }
}
