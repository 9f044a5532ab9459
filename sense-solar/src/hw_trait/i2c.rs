//! I2C hardware abstraction trait.

use async_trait::async_trait;

/// I2C-specific errors
#[derive(Debug, thiserror::Error)]
pub enum I2cError {
    /// No acknowledgment from device
    #[error("No acknowledgment from device at address 0x{0:02x}")]
    NoAck(u8),

    /// Transaction did not complete in time
    #[error("Timeout talking to device at address 0x{0:02x}")]
    Timeout(u8),

    /// Bus arbitration lost
    #[error("Bus arbitration lost")]
    ArbitrationLost,

    /// Error from the underlying bus device
    #[error("I/O error at address 0x{addr:02x}: {source}")]
    Io {
        addr: u8,
        #[source]
        source: std::io::Error,
    },

    /// Other I2C error
    #[error("I2C error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, I2cError>;

/// I2C bus abstraction
///
/// Implementations do not retry. Every call is a complete transaction; the
/// length of `buffer` is the number of bytes the caller intends to interpret.
#[async_trait]
pub trait I2c: Send + Sync {
    /// Write data to an I2C device.
    async fn write(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// Read data from an I2C device.
    async fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()>;

    /// Write data (usually a register pointer) then read from an I2C device,
    /// joined by a repeated start.
    async fn write_read(&mut self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<()>;
}
