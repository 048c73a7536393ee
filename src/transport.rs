//! # Serial transport
//!
//! The driver talks to the module through the [Transport] capability. Two adapters are provided:
//!
//! * [IoTransport] wraps any [embedded_io] serial, e.g. a hardware UART or a bit-banged software UART
//!   of a HAL. The baud rate is changed by a user supplied closure, as embedded-io has no notion of it.
//! * `SerialPortTransport` (feature `serialport`) wraps a host serial device.
use core::fmt::Debug;
use embedded_io::{Read, ReadReady, Write};

/// Byte oriented serial line
pub trait Transport {
    type Error: Debug;

    /// Returns the number of bytes which can be read without blocking
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Reads a single byte. Should only be called if [Transport::available] reported data.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Writes all given bytes
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// (Re)opens the line at the given baud rate
    fn begin(&mut self, baud_rate: u32) -> Result<(), Self::Error>;

    /// Discards all pending bytes. Returns the number of discarded bytes.
    fn drain(&mut self) -> Result<usize, Self::Error> {
        let mut count = 0;

        while self.available()? > 0 {
            self.read_byte()?;
            count += 1;
        }

        Ok(count)
    }
}

/// Transport over an [embedded_io] serial
pub struct IoTransport<S, F> {
    serial: S,

    /// Applies a new baud rate to the serial peripheral
    set_baud_rate: F,
}

/// Errors of [IoTransport]
#[derive(Debug)]
pub enum IoTransportError<E> {
    /// Error of the underlying serial
    Serial(E),

    /// Serial signaled data, but reading returned EOF
    UnexpectedEof,
}

impl<S, F> IoTransport<S, F>
where
    S: Read + Write + ReadReady,
    F: FnMut(&mut S, u32) -> Result<(), S::Error>,
{
    pub fn new(serial: S, set_baud_rate: F) -> Self {
        Self { serial, set_baud_rate }
    }

    /// Returns the wrapped serial
    pub fn release(self) -> S {
        self.serial
    }
}

impl<S, F> Transport for IoTransport<S, F>
where
    S: Read + Write + ReadReady,
    F: FnMut(&mut S, u32) -> Result<(), S::Error>,
{
    type Error = IoTransportError<S::Error>;

    fn available(&mut self) -> Result<usize, Self::Error> {
        let ready = self.serial.read_ready().map_err(IoTransportError::Serial)?;
        Ok(usize::from(ready))
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut byte = [0x0; 1];

        match self.serial.read(&mut byte) {
            Ok(0) => Err(IoTransportError::UnexpectedEof),
            Ok(_) => Ok(byte[0]),
            Err(error) => Err(IoTransportError::Serial(error)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.serial.write_all(data).map_err(IoTransportError::Serial)?;
        self.serial.flush().map_err(IoTransportError::Serial)
    }

    fn begin(&mut self, baud_rate: u32) -> Result<(), Self::Error> {
        (self.set_baud_rate)(&mut self.serial, baud_rate).map_err(IoTransportError::Serial)
    }
}

#[cfg(feature = "serialport")]
pub use self::host::SerialPortTransport;

#[cfg(feature = "serialport")]
mod host {
    extern crate std;

    use super::Transport;
    use serialport::SerialPort;
    use std::boxed::Box;
    use std::io::{Read, Write};

    /// Transport over a host serial device, e.g. an USB-UART bridge
    pub struct SerialPortTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialPortTransport {
        pub fn new(port: Box<dyn SerialPort>) -> Self {
            Self { port }
        }
    }

    impl Transport for SerialPortTransport {
        type Error = serialport::Error;

        fn available(&mut self) -> Result<usize, Self::Error> {
            Ok(self.port.bytes_to_read()? as usize)
        }

        fn read_byte(&mut self) -> Result<u8, Self::Error> {
            let mut byte = [0x0; 1];
            self.port.read_exact(&mut byte)?;
            Ok(byte[0])
        }

        fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
            self.port.write_all(data)?;
            self.port.flush()?;
            Ok(())
        }

        fn begin(&mut self, baud_rate: u32) -> Result<(), Self::Error> {
            self.port.set_baud_rate(baud_rate)
        }
    }
}
