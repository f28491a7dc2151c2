//! Character device primitives
//!
//! The Marvell driver exposes the controller as `/dev/mbtchar0`. A reader
//! thread of the host stack may sit in a blocking `read` on it, which is
//! released with `MBTCHAR_IOCTL_RELEASE` before the descriptor is closed.

use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;
use std::io;
use std::os::fd::RawFd;
use std::path::Path;

// MBTCHAR_IOCTL_RELEASE = _IO('M', 1)
nix::ioctl_none!(mbtchar_ioctl_release, b'M', 1);

/// Raw descriptor of the opened device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(RawFd);

impl DeviceHandle {
    /// Reported to the host when no device is open
    pub const INVALID: DeviceHandle = DeviceHandle(-1);

    pub fn from_raw(fd: RawFd) -> Self {
        Self(fd)
    }

    pub fn raw(self) -> RawFd {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

/// Open/release/close of the controller device node
pub trait CharDevice: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<DeviceHandle>;

    /// Wake any thread blocked reading from `handle`
    fn release(&self, handle: DeviceHandle) -> io::Result<()>;

    fn close(&self, handle: DeviceHandle) -> io::Result<()>;
}

/// The mbtchar driver node
#[derive(Debug, Default, Clone, Copy)]
pub struct MbtcharDevice;

impl CharDevice for MbtcharDevice {
    fn open(&self, path: &Path) -> io::Result<DeviceHandle> {
        let fd = fcntl::open(path, OFlag::O_RDWR | OFlag::O_NOCTTY, Mode::empty())?;
        Ok(DeviceHandle(fd))
    }

    fn release(&self, handle: DeviceHandle) -> io::Result<()> {
        // SAFETY: argument-less ioctl on a descriptor we opened and still own
        unsafe { mbtchar_ioctl_release(handle.raw()) }?;
        Ok(())
    }

    fn close(&self, handle: DeviceHandle) -> io::Result<()> {
        unistd::close(handle.raw())?;
        Ok(())
    }
}
