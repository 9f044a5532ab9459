//! I2C through the Linux i2c-dev character device (`/dev/i2c-N`).

use async_trait::async_trait;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use linux_embedded_hal::i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::I2cdev;
use nix::errno::Errno;
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;

use crate::hw_trait::i2c::{I2c, I2cError, Result};
use crate::tracing::prelude::*;

/// Handle to an i2c-dev bus.
///
/// Clones share the same open device, so every driver can own a handle while
/// transactions on the bus stay serialized.
#[derive(Clone)]
pub struct LinuxI2c {
    path: PathBuf,
    dev: Arc<Mutex<I2cdev>>,
}

impl LinuxI2c {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dev = I2cdev::new(&path).map_err(io::Error::from)?;
        debug!("Opened I2C bus {}", path.display());
        Ok(Self {
            path,
            dev: Arc::new(Mutex::new(dev)),
        })
    }

    // Run one transaction on the blocking pool with the bus locked.
    async fn transact<T, F>(&self, addr: u8, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut I2cdev) -> std::result::Result<T, LinuxI2CError> + Send + 'static,
    {
        let dev = self.dev.clone();
        task::spawn_blocking(move || op(&mut dev.lock()))
            .await
            .map_err(|e| I2cError::Other(format!("I2C task failed: {}", e)))?
            .map_err(|e| map_bus_error(addr, e))
    }
}

fn map_bus_error(addr: u8, e: LinuxI2CError) -> I2cError {
    let e = io::Error::from(e);
    match e.raw_os_error().map(Errno::from_raw) {
        Some(Errno::ENXIO) | Some(Errno::EREMOTEIO) => I2cError::NoAck(addr),
        Some(Errno::ETIMEDOUT) => I2cError::Timeout(addr),
        Some(Errno::EAGAIN) => I2cError::ArbitrationLost,
        _ => I2cError::Io { addr, source: e },
    }
}

#[async_trait]
impl I2c for LinuxI2c {
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        trace!("{} 0x{:02X} <- {:02X?}", self.path.display(), addr, data);
        let data = data.to_vec();
        self.transact(addr, move |dev| dev.write(addr, &data)).await
    }

    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        let len = buffer.len();
        let data = self
            .transact(addr, move |dev| {
                let mut data = vec![0u8; len];
                dev.read(addr, &mut data)?;
                Ok(data)
            })
            .await?;
        trace!("{} 0x{:02X} -> {:02X?}", self.path.display(), addr, data);
        buffer.copy_from_slice(&data);
        Ok(())
    }

    /// One combined transfer: the write and the read are joined by a
    /// repeated start.
    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()> {
        trace!("{} 0x{:02X} <- {:02X?}", self.path.display(), addr, write);
        let request = write.to_vec();
        let len = read.len();
        let data = self
            .transact(addr, move |dev| {
                let mut data = vec![0u8; len];
                dev.write_read(addr, &request, &mut data)?;
                Ok(data)
            })
            .await?;
        trace!("{} 0x{:02X} -> {:02X?}", self.path.display(), addr, data);
        read.copy_from_slice(&data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os_error(errno: Errno) -> LinuxI2CError {
        LinuxI2CError::Io(io::Error::from_raw_os_error(errno as i32))
    }

    #[test]
    fn errno_mapping() {
        assert!(matches!(
            map_bus_error(0x44, os_error(Errno::ENXIO)),
            I2cError::NoAck(0x44)
        ));
        assert!(matches!(
            map_bus_error(0x40, os_error(Errno::EREMOTEIO)),
            I2cError::NoAck(0x40)
        ));
        assert!(matches!(
            map_bus_error(0x39, os_error(Errno::ETIMEDOUT)),
            I2cError::Timeout(0x39)
        ));
        assert!(matches!(
            map_bus_error(0x39, os_error(Errno::EAGAIN)),
            I2cError::ArbitrationLost
        ));

        let short = LinuxI2CError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"));
        assert!(matches!(
            map_bus_error(0x39, short),
            I2cError::Io { addr: 0x39, .. }
        ));
    }

    #[test]
    fn missing_bus_fails_to_open() {
        assert!(LinuxI2c::open("/dev/i2c-does-not-exist").is_err());
    }
}
