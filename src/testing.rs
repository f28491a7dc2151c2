//! Test doubles for the host stack and the character device.

use crate::domain::buffer::{BufferAllocator, HciBuffer};
use crate::domain::command::Opcode;
use crate::host::{CommandTransport, Completion, OpResult, PowerControl, Rejected, VendorCallbacks};
use crate::infrastructure::device::{CharDevice, DeviceHandle};
use std::collections::VecDeque;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct AllocCounters {
    allocs: AtomicUsize,
    frees: AtomicUsize,
    last_size: AtomicUsize,
    fail: AtomicBool,
}

/// Heap allocator that counts allocations and frees
#[derive(Clone, Default)]
pub(crate) struct CountingAllocator {
    counters: Arc<AllocCounters>,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<dyn BufferAllocator> {
        Arc::new(self)
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.counters.fail.store(fail, Ordering::SeqCst);
    }

    pub fn allocs(&self) -> usize {
        self.counters.allocs.load(Ordering::SeqCst)
    }

    pub fn frees(&self) -> usize {
        self.counters.frees.load(Ordering::SeqCst)
    }

    pub fn last_alloc_size(&self) -> usize {
        self.counters.last_size.load(Ordering::SeqCst)
    }
}

impl BufferAllocator for CountingAllocator {
    fn allocate(&self, size: usize) -> Option<Box<[u8]>> {
        if self.counters.fail.load(Ordering::SeqCst) {
            return None;
        }
        self.counters.allocs.fetch_add(1, Ordering::SeqCst);
        self.counters.last_size.store(size, Ordering::SeqCst);
        Some(vec![0u8; size].into_boxed_slice())
    }

    fn release(&self, mem: Box<[u8]>) {
        self.counters.frees.fetch_add(1, Ordering::SeqCst);
        drop(mem);
    }
}

/// How the scripted transport answers a submit
#[derive(Debug, Clone)]
pub(crate) enum Response {
    /// Complete with a Command Complete event for `opcode`
    Ack(Opcode, u8),
    /// Complete with the given event bytes
    Raw(Vec<u8>),
    /// Refuse the command
    Reject,
    /// Accept the command but drop the completion
    Drop,
}

/// Transport that answers submits from a script
pub(crate) struct ScriptedTransport {
    allocator: Arc<dyn BufferAllocator>,
    script: Mutex<VecDeque<Response>>,
    echo: bool,
    submitted: Mutex<Vec<(Opcode, Vec<u8>)>>,
    completions: AtomicUsize,
}

impl ScriptedTransport {
    /// Answers only from the script, drops the completion once it runs dry
    pub fn new(allocator: CountingAllocator) -> Arc<Self> {
        Self::build(allocator, false)
    }

    /// Acknowledges unscripted commands with their own opcode and status 0
    pub fn echo(allocator: CountingAllocator) -> Arc<Self> {
        Self::build(allocator, true)
    }

    fn build(allocator: CountingAllocator, echo: bool) -> Arc<Self> {
        Arc::new(Self {
            allocator: allocator.shared(),
            script: Mutex::new(VecDeque::new()),
            echo,
            submitted: Mutex::new(Vec::new()),
            completions: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, response: Response) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn submitted(&self) -> Vec<Opcode> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(op, _)| *op)
            .collect()
    }

    /// HCI bytes of the `index`th submitted command
    pub fn wire(&self, index: usize) -> Vec<u8> {
        self.submitted.lock().unwrap()[index].1.clone()
    }

    pub fn completions_invoked(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    fn complete(&self, completion: Completion, bytes: &[u8]) {
        let event = HciBuffer::inbound(&self.allocator, bytes).expect("event allocation");
        self.completions.fetch_add(1, Ordering::SeqCst);
        completion.complete(event);
    }
}

impl CommandTransport for ScriptedTransport {
    fn submit(
        &self,
        opcode: Opcode,
        command: HciBuffer,
        completion: Completion,
    ) -> Result<(), Rejected> {
        self.submitted
            .lock()
            .unwrap()
            .push((opcode, command.data().to_vec()));

        let scripted = self.script.lock().unwrap().pop_front();
        let response = match scripted {
            Some(r) => r,
            None if self.echo => Response::Ack(opcode, 0),
            None => Response::Drop,
        };

        match response {
            Response::Ack(acked, status) => {
                drop(command);
                let [lo, hi] = acked.to_le_bytes();
                self.complete(completion, &[0x0E, 0x04, 0x01, lo, hi, status]);
                Ok(())
            }
            Response::Raw(bytes) => {
                drop(command);
                self.complete(completion, &bytes);
                Ok(())
            }
            Response::Reject => Err(Rejected(command)),
            Response::Drop => Ok(()),
        }
    }
}

/// Outcome callback invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Firmware(OpResult),
    Sco(OpResult),
    Lpm(OpResult),
}

#[derive(Default)]
pub(crate) struct RecordingCallbacks {
    outcomes: Mutex<Vec<Outcome>>,
}

impl RecordingCallbacks {
    pub fn all(&self) -> Vec<Outcome> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.all().into_iter().filter(|o| *o == outcome).count()
    }
}

impl VendorCallbacks for RecordingCallbacks {
    fn firmware_config_done(&self, result: OpResult) {
        self.outcomes.lock().unwrap().push(Outcome::Firmware(result));
    }

    fn sco_config_done(&self, result: OpResult) {
        self.outcomes.lock().unwrap().push(Outcome::Sco(result));
    }

    fn lpm_set_done(&self, result: OpResult) {
        self.outcomes.lock().unwrap().push(Outcome::Lpm(result));
    }
}

#[derive(Default)]
pub(crate) struct RecordingPower {
    calls: Mutex<Vec<&'static str>>,
    fail: AtomicBool,
}

impl RecordingPower {
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) -> io::Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "power switch failed"));
        }
        Ok(())
    }
}

impl PowerControl for RecordingPower {
    fn enable(&self) -> io::Result<()> {
        self.record("enable")
    }

    fn disable(&self) -> io::Result<()> {
        self.record("disable")
    }
}

#[derive(Default)]
struct DeviceState {
    failing_opens: AtomicU32,
    opens: AtomicU32,
    fail_close: AtomicBool,
    calls: Mutex<Vec<&'static str>>,
}

/// Character device whose first N opens fail
#[derive(Clone, Default)]
pub(crate) struct FakeDevice {
    state: Arc<DeviceState>,
}

impl FakeDevice {
    pub fn failing_opens(failures: u32) -> Self {
        let device = Self::default();
        device.state.failing_opens.store(failures, Ordering::SeqCst);
        device
    }

    pub fn fail_close(&self, fail: bool) {
        self.state.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn opens(&self) -> u32 {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn releases(&self) -> usize {
        self.calls().iter().filter(|c| **c == "release").count()
    }

    pub fn closes(&self) -> usize {
        self.calls().iter().filter(|c| **c == "close").count()
    }
}

impl CharDevice for FakeDevice {
    fn open(&self, _path: &Path) -> io::Result<DeviceHandle> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        let remaining = self.state.failing_opens.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.failing_opens.store(remaining - 1, Ordering::SeqCst);
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        self.state.calls.lock().unwrap().push("open");
        Ok(DeviceHandle::from_raw(42))
    }

    fn release(&self, _handle: DeviceHandle) -> io::Result<()> {
        self.state.calls.lock().unwrap().push("release");
        Ok(())
    }

    fn close(&self, _handle: DeviceHandle) -> io::Result<()> {
        self.state.calls.lock().unwrap().push("close");
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        Ok(())
    }
}
