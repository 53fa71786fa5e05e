//! Scripted BLE stack for exercising the session without hardware.
//!
//! One [`FakeStack`] plays the roles of resolver, device reference, and GATT
//! link; tests script per-attempt connect/write outcomes up front and assert
//! on the attempt counters and captured payloads afterwards.

use async_trait::async_trait;
use sinilink_core::{AmpError, BleDeviceRef, BleResolver, GattLink};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub struct FakeStack {
    resolvable: AtomicBool,
    fail_disconnects: AtomicBool,
    /// Scripted outcome per connect attempt; exhausted entries succeed.
    connect_script: Mutex<VecDeque<bool>>,
    /// Scripted outcome per write attempt; exhausted entries succeed.
    write_script: Mutex<VecDeque<bool>>,
    connects: AtomicUsize,
    writes: AtomicUsize,
    disconnects: AtomicUsize,
    /// Payloads of successful writes, in order.
    written: Mutex<Vec<Vec<u8>>>,
    /// Liveness flags of every link ever issued, for simulating silent
    /// transport-level drops.
    links: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeStack {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            resolvable: AtomicBool::new(true),
            fail_disconnects: AtomicBool::new(false),
            connect_script: Mutex::new(VecDeque::new()),
            write_script: Mutex::new(VecDeque::new()),
            connects: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            written: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
        })
    }

    pub fn resolver(self: &Arc<Self>) -> Arc<dyn BleResolver> {
        Arc::new(FakeResolver { stack: self.clone() })
    }

    pub fn set_resolvable(&self, resolvable: bool) {
        self.resolvable.store(resolvable, Ordering::SeqCst);
    }

    pub fn fail_disconnects(&self, fail: bool) {
        self.fail_disconnects.store(fail, Ordering::SeqCst);
    }

    /// Script the outcome of upcoming connect attempts (`true` = success).
    pub fn script_connects(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.connect_script.lock().unwrap().extend(outcomes);
    }

    /// Script the outcome of upcoming write attempts (`true` = success).
    pub fn script_writes(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.write_script.lock().unwrap().extend(outcomes);
    }

    /// Simulate the transport silently dropping every issued link.
    pub fn drop_links(&self) {
        for alive in self.links.lock().unwrap().iter() {
            alive.store(false, Ordering::SeqCst);
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }

    fn next(script: &Mutex<VecDeque<bool>>) -> bool {
        script.lock().unwrap().pop_front().unwrap_or(true)
    }
}

struct FakeResolver {
    stack: Arc<FakeStack>,
}

#[async_trait]
impl BleResolver for FakeResolver {
    async fn resolve(&self, _address: &str) -> Result<Option<Box<dyn BleDeviceRef>>, AmpError> {
        if !self.stack.resolvable.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(Box::new(FakeDeviceRef {
            stack: self.stack.clone(),
        })))
    }
}

struct FakeDeviceRef {
    stack: Arc<FakeStack>,
}

#[async_trait]
impl BleDeviceRef for FakeDeviceRef {
    async fn connect(&self, _timeout: Duration) -> Result<Box<dyn GattLink>, AmpError> {
        self.stack.connects.fetch_add(1, Ordering::SeqCst);
        if !FakeStack::next(&self.stack.connect_script) {
            return Err(AmpError::ConnectFailed {
                address: "fake".to_string(),
                reason: "scripted connect failure".to_string(),
            });
        }
        let alive = Arc::new(AtomicBool::new(true));
        self.stack.links.lock().unwrap().push(alive.clone());
        Ok(Box::new(FakeLink {
            stack: self.stack.clone(),
            alive,
        }))
    }
}

struct FakeLink {
    stack: Arc<FakeStack>,
    alive: Arc<AtomicBool>,
}

#[async_trait]
impl GattLink for FakeLink {
    async fn write_characteristic(&self, _uuid: Uuid, payload: &[u8]) -> Result<(), AmpError> {
        self.stack.writes.fetch_add(1, Ordering::SeqCst);
        if !FakeStack::next(&self.stack.write_script) {
            return Err(AmpError::WriteFailed {
                reason: "scripted write failure".to_string(),
            });
        }
        self.stack.written.lock().unwrap().push(payload.to_vec());
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), AmpError> {
        self.stack.disconnects.fetch_add(1, Ordering::SeqCst);
        self.alive.store(false, Ordering::SeqCst);
        if self.stack.fail_disconnects.load(Ordering::SeqCst) {
            return Err(AmpError::Backend("scripted disconnect failure".to_string()));
        }
        Ok(())
    }
}
