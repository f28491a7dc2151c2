//! HCI Buffers
//!
//! Buffers exchanged with the host stack carry an 8-byte header followed by
//! the HCI bytes:
//!
//! ```text
//! [0-1] : Event kind (u16 little-endian)
//! [2-3] : Length of the HCI bytes
//! [4-5] : Offset
//! [6-7] : Layer specific
//! [8..] : HCI bytes
//! ```
//!
//! Memory comes from the host's allocator and goes back to it exactly once,
//! when the owning [`HciBuffer`] is dropped.

use crate::domain::command::CommandDescriptor;
use crate::error::ChainError;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Size of the buffer header
pub const HEADER_SIZE: usize = 8;

/// Opcode (2) + parameter length (1)
pub const CMD_PREAMBLE_SIZE: usize = 3;

/// Event kinds stored in the buffer header
pub mod kind {
    /// Outbound HCI command
    pub const STACK_TO_HC_HCI_CMD: u16 = 0x2000;
    /// Inbound HCI event
    pub const HC_TO_STACK_HCI_EVT: u16 = 0x1000;
}

/// Allocator pair supplied by the host stack
pub trait BufferAllocator: Send + Sync {
    /// Allocate `size` zeroed bytes, `None` when out of memory
    fn allocate(&self, size: usize) -> Option<Box<[u8]>>;

    /// Give back memory obtained from `allocate`
    fn release(&self, mem: Box<[u8]>);
}

/// Allocator backed by the global heap
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, size: usize) -> Option<Box<[u8]>> {
        Some(vec![0u8; size].into_boxed_slice())
    }

    fn release(&self, mem: Box<[u8]>) {
        drop(mem);
    }
}

/// Owned header + HCI bytes region
pub struct HciBuffer {
    mem: Option<Box<[u8]>>,
    allocator: Arc<dyn BufferAllocator>,
}

impl HciBuffer {
    /// Allocate a buffer holding `data_len` HCI bytes
    fn allocate(allocator: &Arc<dyn BufferAllocator>, kind: u16, data_len: u16) -> Option<Self> {
        let mut mem = allocator.allocate(HEADER_SIZE + data_len as usize)?;
        if mem.len() < HEADER_SIZE + data_len as usize {
            allocator.release(mem);
            return None;
        }

        mem[0..2].copy_from_slice(&kind.to_le_bytes());
        mem[2..4].copy_from_slice(&data_len.to_le_bytes());
        mem[4..6].copy_from_slice(&0u16.to_le_bytes());
        mem[6..8].copy_from_slice(&0u16.to_le_bytes());

        Some(Self {
            mem: Some(mem),
            allocator: Arc::clone(allocator),
        })
    }

    /// Wrap received HCI event bytes, as done by the lower layer
    pub fn inbound(allocator: &Arc<dyn BufferAllocator>, data: &[u8]) -> Option<Self> {
        let len = u16::try_from(data.len()).ok()?;
        let mut buf = Self::allocate(allocator, kind::HC_TO_STACK_HCI_EVT, len)?;
        buf.data_mut().copy_from_slice(data);
        Some(buf)
    }

    fn mem(&self) -> &[u8] {
        self.mem.as_deref().unwrap_or(&[])
    }

    fn header_u16(&self, at: usize) -> u16 {
        let mem = self.mem();
        u16::from_le_bytes([mem[at], mem[at + 1]])
    }

    pub fn kind(&self) -> u16 {
        self.header_u16(0)
    }

    pub fn len(&self) -> u16 {
        self.header_u16(2)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn offset(&self) -> u16 {
        self.header_u16(4)
    }

    pub fn layer_specific(&self) -> u16 {
        self.header_u16(6)
    }

    /// HCI bytes following the header
    pub fn data(&self) -> &[u8] {
        let end = HEADER_SIZE + self.len() as usize;
        &self.mem()[HEADER_SIZE..end]
    }

    fn data_mut(&mut self) -> &mut [u8] {
        let end = HEADER_SIZE + self.len() as usize;
        match self.mem.as_deref_mut() {
            Some(mem) => &mut mem[HEADER_SIZE..end],
            None => &mut [],
        }
    }
}

impl Drop for HciBuffer {
    fn drop(&mut self) {
        if let Some(mem) = self.mem.take() {
            self.allocator.release(mem);
        }
    }
}

impl fmt::Debug for HciBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HciBuffer")
            .field("kind", &format_args!("{:#06X}", self.kind()))
            .field("len", &self.len())
            .field("data", &format_args!("{:02X?}", self.data()))
            .finish()
    }
}

/// Build the outbound buffer for `cmd`
///
/// # Command Layout
///
/// ```text
/// [0-1] : Opcode (u16 little-endian)
/// [2]   : Parameter length
/// [3..] : Parameters
/// ```
pub fn build_command(
    allocator: &Arc<dyn BufferAllocator>,
    cmd: &CommandDescriptor,
) -> Result<HciBuffer, ChainError> {
    let cmd_len = CMD_PREAMBLE_SIZE + cmd.payload().len();

    let mut buf = HciBuffer::allocate(allocator, kind::STACK_TO_HC_HCI_CMD, cmd_len as u16)
        .ok_or(ChainError::Alloc {
            opcode: cmd.opcode(),
            size: HEADER_SIZE + cmd_len,
        })?;

    let data = buf.data_mut();
    data[0..2].copy_from_slice(&cmd.opcode().to_le_bytes());
    data[2] = cmd.payload_len();
    data[CMD_PREAMBLE_SIZE..].copy_from_slice(cmd.payload());

    trace!("Built command {}: {:02X?}", cmd.opcode(), buf.data());
    Ok(buf)
}
