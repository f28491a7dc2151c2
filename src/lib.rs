//! Marvell Bluetooth vendor library
//!
//! Sequences the vendor HCI commands that configure a Marvell controller
//! (BD address programming, SCO over PCM routing) and manages the
//! `mbtchar` character device the controller is attached through.
//!
//! ## Modules
//!
//! - [`domain`] - Vendor commands, HCI buffers, event parsing, configuration chains, settings
//! - [`infrastructure`] - Character device, transport lifecycle, logging
//! - [`host`] - Capabilities provided by the host stack
//! - [`vendor`] - Entry points called by the host stack

pub mod domain;
pub mod error;
pub mod host;
pub mod infrastructure;
pub mod vendor;

#[cfg(test)]
pub(crate) mod testing;

pub use domain::buffer::{BufferAllocator, HciBuffer, HeapAllocator};
pub use domain::command::{BdAddr, Opcode};
pub use domain::settings::VendorSettings;
pub use error::{ChainError, VendorError};
pub use host::{
    CommandTransport, Completion, HostInterface, OpResult, PowerControl, Rejected, VendorCallbacks,
};
pub use vendor::{
    open_slot, status_code, BtVendor, LpmMode, LpmWakeState, OpReply, PowerState, VendorOp,
};
