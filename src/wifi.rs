//! # WIFI client
//!
//! Joining and hosting networks, module restart and diagnostics.
//!
//! All operations block until the module responded or the command specific timeout elapsed.
//! Unanswered commands are reported as `Ok(false)`/`Ok(None)`, so the caller decides whether to retry.
//!
//! ## Example
//!
//! ````
//! # use esp_at_mail::example::{ExampleTimer, ExampleTransport};
//! use esp_at_mail::wifi::{Adapter, Config, WifiMode};
//!
//! let mut adapter: Adapter<_, _, 1_000> =
//!     Adapter::new(ExampleTransport::default(), ExampleTimer::default(), Config::default()).unwrap();
//!
//! // Already in station mode, so no restart is needed
//! assert!(adapter.set_operation_mode(WifiMode::Station).unwrap());
//!
//! assert!(adapter.join_ap("test_wifi", "secret").unwrap());
//! assert_eq!("+CIFSR:STAIP,\"10.0.0.181\"", adapter.get_local_ip().unwrap().unwrap());
//! ````
use crate::commands::{
    AccessPointConnectCommand, AccessPointDisconnectCommand, AccessPointQueryCommand, AliveCommand,
    BaudRateCommand, ConnectionStatusCommand, JoinedDevicesCommand, ListAccessPointsCommand,
    ObtainLocalAddressCommand, RestartCommand, SoftApConfigCommand, VersionCommand, WifiModeCommand,
    WifiModeQueryCommand,
};
use crate::error::Error;
use crate::frame::MAX_LINK_ID;
use crate::receiver::{self, Response};
use crate::stack::ConnectionState;
use crate::timer::{delay_ms, Deadline};
use crate::transport::Transport;
use crate::urc::URCMessages;
use alloc::string::String;
use atat::heapless::String as FixedString;
use atat::AtatCmd;
use core::str::FromStr;
use fugit::TimerDurationU32;
use fugit_timer::Timer;

/// Size of the buffer commands get encoded to
const COMMAND_BUFFER_SIZE: usize = 256;

/// Markers of responses containing a list, e.g. CWLAP or CIFSR
const LIST_BEGIN: &str = "\r\r\n";
const LIST_END: &str = "\r\n\r\nOK";

/// Driver configuration. All durations in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Working baud rate of the serial line
    pub(crate) baud_rate: u32,

    /// Baud rate the module uses after reset
    pub(crate) factory_baud_rate: u32,

    /// Wait time after each step of forcing the baud rate
    pub(crate) baud_switch_delay: u32,

    /// Wait time between reset command and forcing the baud rate again
    pub(crate) boot_delay: u32,

    /// Max. time the module gets to respond to the liveness check after restart
    pub(crate) liveness_window: u32,

    /// Pause between liveness checks
    pub(crate) liveness_poll_interval: u32,

    /// Wait time after a successful restart
    pub(crate) settle_delay: u32,

    /// Timeout for receiving the frame payload once the header was received
    pub(crate) payload_timeout: u32,

    /// Timeout for the SEND OK confirmation of transmitted data
    pub(crate) send_timeout: u32,

    /// Timeout for the response of requests sent over the connection, e.g. mail commands
    pub(crate) request_timeout: u32,

    /// Time window for receiving a mail
    pub(crate) email_timeout: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baud_rate: 9_600,
            factory_baud_rate: 115_200,
            baud_switch_delay: 500,
            boot_delay: 2_000,
            liveness_window: 3_000,
            liveness_poll_interval: 100,
            settle_delay: 1_500,
            payload_timeout: 3_000,
            send_timeout: 10_000,
            request_timeout: 10_000,
            email_timeout: 5_000,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Working baud rate. The module is switched to this rate on restart.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Baud rate the module falls back to after reset
    pub fn factory_baud_rate(mut self, baud_rate: u32) -> Self {
        self.factory_baud_rate = baud_rate;
        self
    }

    /// Sets the restart timings: wait after each baud rate step, wait after reset and the time
    /// window for the module to become responsive
    pub fn restart_timing(mut self, baud_switch_delay: u32, boot_delay: u32, liveness_window: u32) -> Self {
        self.baud_switch_delay = baud_switch_delay;
        self.boot_delay = boot_delay;
        self.liveness_window = liveness_window;
        self
    }

    /// Pause between liveness checks and wait after a successful restart
    pub fn liveness_polling(mut self, interval: u32, settle_delay: u32) -> Self {
        self.liveness_poll_interval = interval;
        self.settle_delay = settle_delay;
        self
    }

    /// Timeout for frame payloads once the header was received
    pub fn payload_timeout(mut self, timeout: u32) -> Self {
        self.payload_timeout = timeout;
        self
    }

    /// Timeout for transmission confirmations
    pub fn send_timeout(mut self, timeout: u32) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Timeout for responses to requests sent over the connection
    pub fn request_timeout(mut self, timeout: u32) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Time window for receiving a mail
    pub fn email_timeout(mut self, timeout: u32) -> Self {
        self.email_timeout = timeout;
        self
    }
}

/// WIFI operation mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WifiMode {
    Station = 1,
    SoftAp = 2,
    StationSoftAp = 3,
}

impl WifiMode {
    fn from_raw(mode: usize) -> Option<Self> {
        match mode {
            1 => Some(Self::Station),
            2 => Some(Self::SoftAp),
            3 => Some(Self::StationSoftAp),
            _ => None,
        }
    }
}

/// Connection state, updated by commands and status lines
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Session {
    /// True if multiple connections have been enabled
    pub(crate) multiplexed: bool,

    /// Connection of single connection mode
    pub(crate) single: ConnectionState,

    /// Connections of multiplexed mode, array index = link_id
    pub(crate) sockets: [ConnectionState; MAX_LINK_ID + 1],
}

impl Session {
    /// Applies all status lines of the given text
    pub(crate) fn observe(&mut self, text: &[u8]) {
        for message in URCMessages::parse_all(text) {
            self.handle_urc(message);
        }
    }

    pub(crate) fn handle_urc(&mut self, message: URCMessages) {
        match message {
            URCMessages::SocketConnected(None) => self.single = ConnectionState::Open,
            URCMessages::SocketClosed(None) => self.single = ConnectionState::Closed,
            URCMessages::SocketConnected(Some(link_id)) => self.sockets[link_id] = ConnectionState::Open,
            URCMessages::SocketClosed(Some(link_id)) => self.sockets[link_id] = ConnectionState::Closed,
        }
    }
}

/// Central client for communicating with the module
///
/// The adapter is not reentrant. Only one command may be in flight, so callers sharing the adapter
/// need to guard it by a single lock.
pub struct Adapter<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Serial line
    pub(crate) transport: U,

    /// Timer used for timeout measurement
    pub(crate) timer: T,

    pub(crate) config: Config,

    /// Network state
    pub(crate) session: Session,
}

impl<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Adapter<U, T, TIMER_HZ> {
    /// Opens the transport at the configured baud rate and discards any pending data
    pub fn new(mut transport: U, timer: T, config: Config) -> Result<Self, Error> {
        transport.begin(config.baud_rate).map_err(|_| Error::TransportError)?;
        transport.drain().map_err(|_| Error::TransportError)?;

        Ok(Self {
            transport,
            timer,
            config,
            session: Session::default(),
        })
    }

    /// Returns the transport and timer
    pub fn release(self) -> (U, T) {
        (self.transport, self.timer)
    }

    /// Checks if the module responds to commands
    pub fn kick(&mut self) -> Result<bool, Error> {
        Ok(self.execute(&AliveCommand, &["OK"])?.is_matched())
    }

    /// Restarts the module and waits until it's responsive again.
    ///
    /// As the module falls back to its factory baud rate after reset, the working baud rate gets
    /// forced before and after the reset. Returns false if the reset was not confirmed or the module
    /// is not responsive within the liveness window. Module state is unknown in this case.
    pub fn restart(&mut self) -> Result<bool, Error> {
        log::info!("Restarting module");
        self.force_baud_rate()?;

        if self.execute(&RestartCommand, &["OK"])?.is_matched() {
            self.session = Session::default();
            delay_ms(&mut self.timer, self.config.boot_delay);
            self.force_baud_rate()?;

            let deadline = Deadline::start_ms(&mut self.timer, self.config.liveness_window);
            while !deadline.is_expired(&mut self.timer) {
                if self.kick()? {
                    delay_ms(&mut self.timer, self.config.settle_delay);
                    return Ok(true);
                }

                delay_ms(&mut self.timer, self.config.liveness_poll_interval);
            }
        }

        log::warn!("Module restart failed");
        Ok(false)
    }

    /// Returns the AT and SDK version information
    pub fn get_version(&mut self) -> Result<Option<String>, Error> {
        self.query_list(&VersionCommand)
    }

    /// Returns the current operation mode. None if the query was not answered or the mode is unknown.
    pub fn get_operation_mode(&mut self) -> Result<Option<WifiMode>, Error> {
        Ok(self.query_mode()?.and_then(WifiMode::from_raw))
    }

    /// Switches the operation mode. If the module is already in the given mode, nothing is changed.
    /// Otherwise the module gets restarted after setting the mode.
    pub fn set_operation_mode(&mut self, mode: WifiMode) -> Result<bool, Error> {
        let current = match self.query_mode()? {
            None => return Ok(false),
            Some(current) => current,
        };

        if current == mode as usize {
            return Ok(true);
        }

        let response = self.execute(&WifiModeCommand::new(mode as usize), &["OK", "no change"])?;
        if !response.contains("OK") && !response.contains("no change") {
            return Ok(false);
        }

        self.restart()
    }

    /// Switches to station mode
    pub fn set_opr_to_station(&mut self) -> Result<bool, Error> {
        self.set_operation_mode(WifiMode::Station)
    }

    /// Switches to SoftAP mode
    pub fn set_opr_to_soft_ap(&mut self) -> Result<bool, Error> {
        self.set_operation_mode(WifiMode::SoftAp)
    }

    /// Switches to combined station and SoftAP mode
    pub fn set_opr_to_station_soft_ap(&mut self) -> Result<bool, Error> {
        self.set_operation_mode(WifiMode::StationSoftAp)
    }

    /// Returns the list of available access points
    pub fn get_ap_list(&mut self) -> Result<Option<String>, Error> {
        self.query_list(&ListAccessPointsCommand)
    }

    /// Joins the given access point
    pub fn join_ap(&mut self, ssid: &str, key: &str) -> Result<bool, Error> {
        let command = AccessPointConnectCommand::new(Self::ssid(ssid)?, Self::password(key)?);
        let response = self.execute(&command, &["OK", "FAIL", "CONNECTED"])?;
        Ok(response.contains("OK") || response.contains("CONNECTED"))
    }

    /// Returns true if an access point is joined
    pub fn check_ap(&mut self) -> Result<bool, Error> {
        let response = self.execute(&AccessPointQueryCommand, &["OK", "FAIL", "CONNECTED"])?;
        Ok(response.contains("OK") || response.contains("CONNECTED"))
    }

    /// Leaves the current access point
    pub fn leave_ap(&mut self) -> Result<bool, Error> {
        Ok(self.execute(&AccessPointDisconnectCommand, &["OK"])?.is_matched())
    }

    /// Configures the SoftAP. Encryption: 0 open, 2 WPA_PSK, 3 WPA2_PSK, 4 WPA_WPA2_PSK
    pub fn set_soft_ap_param(&mut self, ssid: &str, key: &str, channel: u8, encryption: u8) -> Result<bool, Error> {
        let command = SoftApConfigCommand::new(Self::ssid(ssid)?, Self::password(key)?, channel, encryption);
        Ok(self.execute(&command, &["OK", "ERROR"])?.contains("OK"))
    }

    /// Returns the list of stations joined to the SoftAP
    pub fn get_joined_device_ip(&mut self) -> Result<Option<String>, Error> {
        self.query_list(&JoinedDevicesCommand)
    }

    /// Returns the connection status
    pub fn get_ip_status(&mut self) -> Result<Option<String>, Error> {
        delay_ms(&mut self.timer, 100);
        self.query_list(&ConnectionStatusCommand)
    }

    /// Returns the local IP and MAC addresses
    pub fn get_local_ip(&mut self) -> Result<Option<String>, Error> {
        self.query_list(&ObtainLocalAddressCommand)
    }

    /// Queries the raw mode number
    fn query_mode(&mut self) -> Result<Option<usize>, Error> {
        let response = self.execute(&WifiModeQueryCommand, &["OK"])?;
        if !response.is_matched() {
            return Ok(None);
        }

        let mode = response
            .filter("+CWMODE:", LIST_END)
            .and_then(|mode| core::str::from_utf8(mode).ok())
            .and_then(|mode| usize::from_str(mode.trim()).ok());
        Ok(mode)
    }

    /// Sends a command responding with a list and returns the list
    fn query_list<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<Option<String>, Error> {
        let response = self.execute(command, &["OK"])?;
        if !response.is_matched() {
            return Ok(None);
        }

        Ok(response
            .filter(LIST_BEGIN, LIST_END)
            .map(|list| String::from_utf8_lossy(list).into_owned()))
    }

    /// Forces the working baud rate by instructing the module at its factory baud rate
    fn force_baud_rate(&mut self) -> Result<(), Error> {
        log::debug!("Forcing baud rate {}", self.config.baud_rate);
        self.begin(self.config.factory_baud_rate)?;
        self.write_command(&RestartCommand)?;
        delay_ms(&mut self.timer, self.config.baud_switch_delay);

        self.write_command(&BaudRateCommand::new(self.config.baud_rate))?;
        delay_ms(&mut self.timer, self.config.baud_switch_delay);
        self.begin(self.config.baud_rate)
    }

    /// Sends the command and waits for the first of the given targets within the command timeout
    pub(crate) fn execute<Cmd: AtatCmd>(&mut self, command: &Cmd, targets: &[&str]) -> Result<Response, Error> {
        let timeout = self.send_command(command)?;
        self.scan(targets, timeout)
    }

    /// Discards stale data, sends the command and returns its response timeout
    pub(crate) fn send_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<TimerDurationU32<TIMER_HZ>, Error> {
        self.drain()?;
        self.write_command(command)?;
        Ok(TimerDurationU32::millis(Cmd::MAX_TIMEOUT_MS))
    }

    /// Encodes and writes the command
    pub(crate) fn write_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<(), Error> {
        if Cmd::MAX_LEN > COMMAND_BUFFER_SIZE {
            return Err(Error::CommandEncodingFailed);
        }

        let mut buffer = [0x0; COMMAND_BUFFER_SIZE];
        let length = command.write(&mut buffer);

        log::debug!("Command: {:?}", core::str::from_utf8(&buffer[..length]));
        self.write(&buffer[..length])
    }

    /// Scans the response and updates the session by contained status lines
    pub(crate) fn scan(&mut self, targets: &[&str], timeout: TimerDurationU32<TIMER_HZ>) -> Result<Response, Error> {
        let response = receiver::scan(&mut self.transport, &mut self.timer, targets, timeout)?;
        self.session.observe(&response.data);
        Ok(response)
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.transport.write(data).map_err(|_| Error::TransportError)
    }

    pub(crate) fn drain(&mut self) -> Result<(), Error> {
        self.transport.drain().map_err(|_| Error::TransportError)?;
        Ok(())
    }

    fn begin(&mut self, baud_rate: u32) -> Result<(), Error> {
        self.transport.begin(baud_rate).map_err(|_| Error::TransportError)
    }

    fn ssid(ssid: &str) -> Result<FixedString<32>, Error> {
        FixedString::from_str(ssid).map_err(|_| Error::InvalidSSIDLength)
    }

    fn password(key: &str) -> Result<FixedString<64>, Error> {
        if key.len() > 63 {
            return Err(Error::InvalidPasswordLength);
        }

        FixedString::from_str(key).map_err(|_| Error::InvalidPasswordLength)
    }
}
