//! Scripted in-memory I2C bus for driver tests.

use super::i2c::{I2c, I2cError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct State {
    present: HashSet<u8>,
    reads: HashMap<u8, VecDeque<Vec<u8>>>,
    writes: Vec<(u8, Vec<u8>)>,
}

/// Clones share one bus, like [`crate::transport::LinuxI2c`].
///
/// Devices that were never attached NACK every transfer. Reads pop the next
/// queued response for the address; an empty queue also NACKs.
#[derive(Clone, Default)]
pub struct MockI2c {
    state: Arc<Mutex<State>>,
}

impl MockI2c {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, addr: u8) {
        self.state.lock().present.insert(addr);
    }

    pub fn detach(&self, addr: u8) {
        self.state.lock().present.remove(&addr);
    }

    pub fn queue_read(&self, addr: u8, data: &[u8]) {
        self.state
            .lock()
            .reads
            .entry(addr)
            .or_default()
            .push_back(data.to_vec());
    }

    /// Writes seen so far, including the pointer half of `write_read`.
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.lock().writes.clone()
    }

    pub fn writes_to(&self, addr: u8) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, data)| data)
            .collect()
    }

    pub fn pending_reads(&self, addr: u8) -> usize {
        self.state.lock().reads.get(&addr).map_or(0, VecDeque::len)
    }

    fn do_write(&self, addr: u8, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.present.contains(&addr) {
            return Err(I2cError::NoAck(addr));
        }
        state.writes.push((addr, data.to_vec()));
        Ok(())
    }

    fn do_read(&self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.present.contains(&addr) {
            return Err(I2cError::NoAck(addr));
        }
        let data = state
            .reads
            .get_mut(&addr)
            .and_then(VecDeque::pop_front)
            .ok_or(I2cError::NoAck(addr))?;
        if data.len() != buffer.len() {
            return Err(I2cError::Other(format!(
                "scripted read of {} bytes, caller asked for {}",
                data.len(),
                buffer.len()
            )));
        }
        buffer.copy_from_slice(&data);
        Ok(())
    }
}

#[async_trait]
impl I2c for MockI2c {
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        self.do_write(addr, data)
    }

    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        self.do_read(addr, buffer)
    }

    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        self.do_write(addr, write)?;
        self.do_read(addr, read)
    }
}
