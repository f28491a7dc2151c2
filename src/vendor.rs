//! Vendor Library Facade
//!
//! Entry points called by the host stack: initialization, the two
//! configuration chains, opcode-dispatched operations and cleanup.
//!
//! ```text
//! host stack ──► BtVendor::op ──┬─► Sequencer (fwcfg / scocfg)
//!                               ├─► SerialTransport (open / close)
//!                               └─► PowerControl / lpm callback
//! ```

use crate::domain::command::BdAddr;
use crate::domain::sequencer::{FirmwareStep, ScoStep, Sequencer};
use crate::domain::settings::VendorSettings;
use crate::error::VendorError;
use crate::host::{HostInterface, OpResult};
use crate::infrastructure::device::{CharDevice, DeviceHandle, MbtcharDevice};
use crate::infrastructure::transport::{SerialTransport, TransportConfig};
use tracing::{debug, error, info};

/// Library version reported at initialization
pub const VERSION: &str = "M002";

/// Requested controller power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    On,
}

impl TryFrom<i32> for PowerState {
    type Error = VendorError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Off),
            1 => Ok(Self::On),
            other => Err(VendorError::InvalidPowerState(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpmMode {
    Disable,
    Enable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpmWakeState {
    Assert,
    Deassert,
}

/// Operations requested by the host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorOp {
    PowerCtrl(PowerState),
    FwCfg,
    ScoCfg,
    UserialOpen,
    UserialClose,
    GetLpmIdleTimeout,
    LpmSetMode(LpmMode),
    LpmWakeSetState(LpmWakeState),
}

/// Successful operation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpReply {
    Done,
    /// Transport opened; the handle fills the host's output slot
    Opened(DeviceHandle),
}

impl OpReply {
    pub fn code(&self) -> i32 {
        match self {
            Self::Done => 0,
            // Number of opened ports
            Self::Opened(_) => 1,
        }
    }
}

/// Integer status expected by the host stack
pub fn status_code(result: &Result<OpReply, VendorError>) -> i32 {
    match result {
        Ok(reply) => reply.code(),
        Err(e) => e.code(),
    }
}

/// Descriptor for the host's output slot after `UserialOpen`
pub fn open_slot(result: &Result<OpReply, VendorError>) -> DeviceHandle {
    match result {
        Ok(OpReply::Opened(handle)) => *handle,
        _ => DeviceHandle::INVALID,
    }
}

/// Vendor library context, alive between initialization and cleanup
pub struct BtVendor<D: CharDevice = MbtcharDevice> {
    host: HostInterface,
    local_addr: BdAddr,
    sequencer: Sequencer,
    transport: SerialTransport<D>,
}

impl BtVendor<MbtcharDevice> {
    /// Store the host interface and a copy of the local address
    pub fn init(host: HostInterface, local_addr: BdAddr, settings: &VendorSettings) -> Self {
        Self::with_device(host, local_addr, MbtcharDevice, TransportConfig::from(settings))
    }
}

impl<D: CharDevice> BtVendor<D> {
    pub fn with_device(
        host: HostInterface,
        local_addr: BdAddr,
        device: D,
        config: TransportConfig,
    ) -> Self {
        info!("Marvell BT Vendor Lib: ver {}", VERSION);
        let sequencer = Sequencer::new(
            host.allocator.clone(),
            host.transport.clone(),
            local_addr,
        );
        Self {
            host,
            local_addr,
            sequencer,
            transport: SerialTransport::new(device, config),
        }
    }

    pub fn transport(&self) -> &SerialTransport<D> {
        &self.transport
    }

    /// Program the local address, then report through `firmware_config_done`
    pub async fn start_firmware_config(&self) -> OpResult {
        info!("Start HW config ...");
        info!("Setting bd addr to {}", self.local_addr);

        let result = match self.sequencer.run::<FirmwareStep>().await {
            Ok(()) => {
                info!("FW config succeeds!");
                OpResult::Success
            }
            Err(e) => {
                error!("Vendor lib fwcfg aborted: {}", e);
                OpResult::Fail
            }
        };
        self.host.callbacks.firmware_config_done(result);
        result
    }

    /// Configure SCO over PCM, then report through `sco_config_done`
    pub async fn start_sco_config(&self) -> OpResult {
        info!("Start SCO config ...");

        let result = match self.sequencer.run::<ScoStep>().await {
            Ok(()) => {
                info!("SCO PCM config succeeds!");
                OpResult::Success
            }
            Err(e) => {
                error!("Vendor lib scocfg aborted: {}", e);
                OpResult::Fail
            }
        };
        self.host.callbacks.sco_config_done(result);
        result
    }

    /// Opcode-dispatched entry point
    pub async fn op(&self, op: VendorOp) -> Result<OpReply, VendorError> {
        debug!("opcode = {:?}", op);
        match op {
            VendorOp::PowerCtrl(PowerState::Off) => {
                debug!("Power off");
                self.host.power.disable().map_err(VendorError::Power)?;
            }
            VendorOp::PowerCtrl(PowerState::On) => {
                debug!("Power on");
                self.host.power.enable().map_err(VendorError::Power)?;
            }
            VendorOp::FwCfg => {
                self.start_firmware_config().await;
            }
            VendorOp::ScoCfg => {
                self.start_sco_config().await;
            }
            VendorOp::UserialOpen => {
                let handle = self.transport.open().await?;
                return Ok(OpReply::Opened(handle));
            }
            VendorOp::UserialClose => self.transport.close().await?,
            VendorOp::GetLpmIdleTimeout => {}
            VendorOp::LpmSetMode(mode) => {
                // Controller side LPM is not configured; report success
                debug!("LPM mode {:?} requested", mode);
                self.host.callbacks.lpm_set_done(OpResult::Success);
            }
            VendorOp::LpmWakeSetState(_) => {}
        }
        Ok(OpReply::Done)
    }

    /// Release held resources. Safe to call repeatedly.
    pub async fn cleanup(&self) {
        if self.transport.is_open().await {
            info!("Closing port left open at cleanup");
            if let Err(e) = self.transport.close().await {
                error!("Cleanup close failed: {}", e);
            }
        }
    }
}
