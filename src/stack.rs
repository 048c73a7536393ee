//! # TCP/UDP sockets
//!
//! Sockets are either used in single connection mode (no link id) or in multiplexed mode with up to
//! five connections, identified by link id 0-4. Multiplexed mode gets enabled by
//! [Adapter::enable_mux].
//!
//! Received data is delivered by the module as `+IPD` frames, s. [crate::frame].
//!
//! ## Example
//!
//! ````
//! # use esp_at_mail::example::{ExampleTimer, ExampleTransport};
//! use esp_at_mail::stack::ConnectionState;
//! use esp_at_mail::wifi::{Adapter, Config};
//!
//! let mut adapter: Adapter<_, _, 1_000> =
//!     Adapter::new(ExampleTransport::default(), ExampleTimer::default(), Config::default()).unwrap();
//!
//! // Creating a TCP connection
//! assert!(adapter.create_tcp("10.0.0.1", 21).unwrap());
//! assert_eq!(ConnectionState::Open, adapter.socket_state());
//!
//! // Sending some data
//! assert!(adapter.send(b"hallo!").unwrap());
//!
//! // Receiving some data
//! let mut  rx_buffer = [0x0; 64];
//! let length = adapter.receive(&mut rx_buffer, 1_000).unwrap();
//! assert_eq!(16, length);
//! assert_eq!(b"nice to see you!", &rx_buffer[..16]);
//!
//! // Closing socket
//! assert!(adapter.release_tcp().unwrap());
//! assert_eq!(ConnectionState::Closed, adapter.socket_state());
//! ````
use crate::commands::{
    CloseCommand, ConnectCommand, MultiplexedCloseCommand, MultiplexedConnectCommand,
    MultiplexedTransmissionPrepareCommand, ServerTimeoutCommand, SetMultipleConnectionsCommand, StartServerCommand,
    StopServerCommand, TransmissionPrepareCommand,
};
use crate::email::{read_email, Email};
use crate::error::Error;
use crate::frame::{self, Frame, MAX_LINK_ID};
use crate::transport::Transport;
use crate::wifi::Adapter;
use atat::heapless::String;
use core::str::FromStr;
use fugit::TimerDurationU32;
use fugit_timer::Timer;

/// Line break appended to lines sent by [Adapter::send_line]
const LINE_BREAK: &[u8] = b"\r\n";

/// Connection state of a socket
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum ConnectionState {
    /// Socket is closed and may be (re)used
    #[default]
    Closed,
    /// Connection is open
    Open,
}

/// Transport protocol of a connection
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<U, T, TIMER_HZ> {
    /// Enables multiple connections
    pub fn enable_mux(&mut self) -> Result<bool, Error> {
        self.set_multiplexing(true)
    }

    /// Disables multiple connections
    pub fn disable_mux(&mut self) -> Result<bool, Error> {
        self.set_multiplexing(false)
    }

    /// Returns true if multiple connections were enabled
    pub fn is_mux_enabled(&self) -> bool {
        self.session.multiplexed
    }

    /// Returns the state of the connection in single connection mode
    pub fn socket_state(&self) -> ConnectionState {
        self.session.single
    }

    /// Returns the state of the given link in multiplexed mode
    pub fn socket_state_on(&self, link_id: usize) -> Result<ConnectionState, Error> {
        Self::assert_link_id(link_id)?;
        Ok(self.session.sockets[link_id])
    }

    /// Opens a TCP connection in single connection mode
    pub fn create_tcp(&mut self, host: &str, port: u16) -> Result<bool, Error> {
        self.open(Protocol::Tcp, host, port)
    }

    /// Closes the TCP connection in single connection mode
    pub fn release_tcp(&mut self) -> Result<bool, Error> {
        self.close()
    }

    /// Opens a UDP transmission in single connection mode
    pub fn register_udp(&mut self, host: &str, port: u16) -> Result<bool, Error> {
        self.open(Protocol::Udp, host, port)
    }

    /// Closes the UDP transmission in single connection mode
    pub fn unregister_udp(&mut self) -> Result<bool, Error> {
        self.close()
    }

    /// Opens a TCP connection on the given link
    pub fn create_tcp_on(&mut self, link_id: usize, host: &str, port: u16) -> Result<bool, Error> {
        self.open_on(link_id, Protocol::Tcp, host, port)
    }

    /// Closes the TCP connection of the given link
    pub fn release_tcp_on(&mut self, link_id: usize) -> Result<bool, Error> {
        self.close_on(link_id)
    }

    /// Opens a UDP transmission on the given link
    pub fn register_udp_on(&mut self, link_id: usize, host: &str, port: u16) -> Result<bool, Error> {
        self.open_on(link_id, Protocol::Udp, host, port)
    }

    /// Closes the UDP transmission of the given link
    pub fn unregister_udp_on(&mut self, link_id: usize) -> Result<bool, Error> {
        self.close_on(link_id)
    }

    /// Sends the data in single connection mode. Returns true once the module confirmed the transmission.
    pub fn send(&mut self, data: &[u8]) -> Result<bool, Error> {
        let timeout = self.send_command(&TransmissionPrepareCommand::new(data.len()))?;
        self.transmit(data, timeout)
    }

    /// Sends the data on the given link. Returns true once the module confirmed the transmission.
    pub fn send_on(&mut self, link_id: usize, data: &[u8]) -> Result<bool, Error> {
        Self::assert_link_id(link_id)?;

        let timeout = self.send_command(&MultiplexedTransmissionPrepareCommand::new(link_id, data.len()))?;
        self.transmit(data, timeout)
    }

    /// Receives a single frame and returns the number of bytes copied to the buffer.
    ///
    /// Returns 0 if no valid frame was received within the timeout. Payload exceeding the buffer
    /// is discarded.
    pub fn receive(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<usize, Error> {
        Ok(self.receive_frame(buffer, timeout_ms)?.map_or(0, |frame| frame.received))
    }

    /// Receives a single frame of the given link.
    ///
    /// A frame of another link (or without link id) is consumed and discarded and 0 is returned.
    pub fn receive_on(&mut self, link_id: usize, buffer: &mut [u8], timeout_ms: u32) -> Result<usize, Error> {
        Self::assert_link_id(link_id)?;

        match self.receive_frame(buffer, timeout_ms)? {
            Some(frame) if frame.header.link_id == Some(link_id) => Ok(frame.received),
            Some(frame) => {
                log::warn!(
                    "Discarding frame of link {:?} while waiting for link {}",
                    frame.header.link_id,
                    link_id
                );
                Ok(0)
            }
            None => Ok(0),
        }
    }

    /// Receives a single frame. The link id of the frame is contained in the returned header.
    pub fn receive_frame(&mut self, buffer: &mut [u8], timeout_ms: u32) -> Result<Option<Frame>, Error> {
        let scan = frame::scan_header(&mut self.transport, &mut self.timer, TimerDurationU32::millis(timeout_ms))?;
        self.session.observe(&scan.data);

        let header = match scan.header {
            None => return Ok(None),
            Some(header) => header,
        };

        let payload_timeout = TimerDurationU32::millis(self.config.payload_timeout);
        let received = frame::read_payload(&mut self.transport, &mut self.timer, &header, buffer, payload_timeout)?;
        Ok(received.map(|received| Frame { header, received }))
    }

    /// Starts the TCP server on the given port. Multiple connections need to be enabled.
    pub fn start_tcp_server(&mut self, port: u16) -> Result<bool, Error> {
        let response = self.execute(&StartServerCommand::new(port), &["OK", "no change"])?;
        Ok(response.contains("OK") || response.contains("no change"))
    }

    /// Stops the TCP server and restarts the module.
    ///
    /// Always returns false, also when stopping and restarting succeeded.
    pub fn stop_tcp_server(&mut self) -> Result<bool, Error> {
        self.execute(&StopServerCommand::new(), &["\r\r\n"])?;
        self.restart()?;
        Ok(false)
    }

    /// Alias of [Adapter::start_tcp_server]
    pub fn start_server(&mut self, port: u16) -> Result<bool, Error> {
        self.start_tcp_server(port)
    }

    /// Alias of [Adapter::stop_tcp_server], also always returning false
    pub fn stop_server(&mut self) -> Result<bool, Error> {
        self.stop_tcp_server()
    }

    /// Sets the timeout in seconds after which the server closes inactive client connections
    pub fn set_tcp_server_timeout(&mut self, timeout: u32) -> Result<bool, Error> {
        Ok(self.execute(&ServerTimeoutCommand::new(timeout), &["OK"])?.is_matched())
    }

    /// Sends the message followed by CRLF in single connection mode, without waiting for the
    /// transmission confirmation. Returns false if the module did not prompt for the data.
    pub fn send_line(&mut self, message: &str) -> Result<bool, Error> {
        let timeout = self.send_command(&TransmissionPrepareCommand::new(message.len() + LINE_BREAK.len()))?;

        if !self.scan(&[">"], timeout)?.is_matched() {
            return Ok(false);
        }

        self.drain()?;
        self.write(message.as_bytes())?;
        self.write(LINE_BREAK)?;
        Ok(true)
    }

    /// Sends the line and waits for the given response of the remote, e.g. a mail server reply code
    pub fn send_and_check(&mut self, message: &str, target: &str) -> Result<bool, Error> {
        self.send_line(message)?;

        let timeout = TimerDurationU32::millis(self.config.request_timeout);
        if self.scan(&[target], timeout)?.is_matched() {
            return Ok(true);
        }

        log::warn!("Unexpected response to request {:?}", message);
        Ok(false)
    }

    /// Sends the line and receives the response frame of the remote. Returns the received byte count.
    pub fn send_and_receive(&mut self, buffer: &mut [u8], message: &str) -> Result<usize, Error> {
        self.send_line(message)?;
        self.receive(buffer, self.config.request_timeout)
    }

    /// Sends the line (e.g. a RETR command) and parses the mail contained in the response.
    ///
    /// Returns false if no frame header was received. Otherwise the mail is read until the
    /// body buffer is full or the mail time window elapsed, s. [crate::email].
    pub fn fetch_email(&mut self, email: &mut Email<'_>, message: &str) -> Result<bool, Error> {
        self.send_line(message)?;

        let timeout = TimerDurationU32::millis(self.config.request_timeout);
        let scan = frame::scan_header(&mut self.transport, &mut self.timer, timeout)?;
        self.session.observe(&scan.data);

        if scan.header.is_none() {
            return Ok(false);
        }

        log::debug!("Receiving email");
        let timeout = TimerDurationU32::millis(self.config.email_timeout);
        read_email(&mut self.transport, &mut self.timer, email, timeout)?;
        Ok(true)
    }

    /// Writes the data once prompted and waits for the confirmation
    fn transmit(&mut self, data: &[u8], prompt_timeout: TimerDurationU32<TIMER_HZ>) -> Result<bool, Error> {
        if !self.scan(&[">"], prompt_timeout)?.is_matched() {
            return Ok(false);
        }

        self.drain()?;
        self.write(data)?;

        let timeout = TimerDurationU32::millis(self.config.send_timeout);
        Ok(self.scan(&["SEND OK"], timeout)?.is_matched())
    }

    fn set_multiplexing(&mut self, enabled: bool) -> Result<bool, Error> {
        let command = match enabled {
            true => SetMultipleConnectionsCommand::multiple(),
            false => SetMultipleConnectionsCommand::single(),
        };

        if !self.execute(&command, &["OK", "Link is builded"])?.contains("OK") {
            return Ok(false);
        }

        self.session.multiplexed = enabled;
        Ok(true)
    }

    fn open(&mut self, protocol: Protocol, host: &str, port: u16) -> Result<bool, Error> {
        let command = ConnectCommand::new(protocol.as_str(), Self::host(host)?, port);
        let response = self.execute(&command, &["OK", "ERROR", "ALREADY CONNECT"])?;

        if !response.contains("OK") && !response.contains("ALREADY CONNECT") {
            return Ok(false);
        }

        self.session.single = ConnectionState::Open;
        Ok(true)
    }

    fn open_on(&mut self, link_id: usize, protocol: Protocol, host: &str, port: u16) -> Result<bool, Error> {
        Self::assert_link_id(link_id)?;

        let command = MultiplexedConnectCommand::new(link_id, protocol.as_str(), Self::host(host)?, port);
        let response = self.execute(&command, &["OK", "ERROR", "ALREADY CONNECT"])?;

        if !response.contains("OK") && !response.contains("ALREADY CONNECT") {
            return Ok(false);
        }

        self.session.sockets[link_id] = ConnectionState::Open;
        Ok(true)
    }

    fn close(&mut self) -> Result<bool, Error> {
        if !self.execute(&CloseCommand, &["OK"])?.is_matched() {
            return Ok(false);
        }

        self.session.single = ConnectionState::Closed;
        Ok(true)
    }

    fn close_on(&mut self, link_id: usize) -> Result<bool, Error> {
        Self::assert_link_id(link_id)?;

        let response = self.execute(&MultiplexedCloseCommand::new(link_id), &["OK", "link is not"])?;
        if !response.contains("OK") && !response.contains("link is not") {
            return Ok(false);
        }

        self.session.sockets[link_id] = ConnectionState::Closed;
        Ok(true)
    }

    fn assert_link_id(link_id: usize) -> Result<(), Error> {
        if link_id > MAX_LINK_ID {
            return Err(Error::InvalidLinkId(link_id));
        }

        Ok(())
    }

    fn host(host: &str) -> Result<String<64>, Error> {
        String::from_str(host).map_err(|_| Error::InvalidHostLength)
    }
}
