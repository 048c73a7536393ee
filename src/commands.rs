//! AT command encoding. The `timeout_ms` of each command is the timeout for its terminal marker.
use crate::responses::NoResponse;
use atat::atat_derive::AtatCmd;
use atat::heapless::String;
use core::str::FromStr;

/// Liveness check
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("", NoResponse, timeout_ms = 1_000)]
pub struct AliveCommand;

/// Restarts the module
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+RST", NoResponse, timeout_ms = 1_000)]
pub struct RestartCommand;

/// Changes the UART baud rate of the module
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIOBAUD", NoResponse, timeout_ms = 1_000)]
pub struct BaudRateCommand {
    baud_rate: u32,
}

impl BaudRateCommand {
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }
}

/// Queries the AT and SDK firmware versions
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+GMR", NoResponse, timeout_ms = 1_000)]
pub struct VersionCommand;

/// Queries the current WIFI mode
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWMODE?", NoResponse, timeout_ms = 1_000)]
pub struct WifiModeQueryCommand;

/// Sets the WIFI mode
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWMODE", NoResponse, timeout_ms = 1_000)]
pub struct WifiModeCommand {
    /// WIFI mode:
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    #[at_arg(position = 0)]
    mode: usize,
}

impl WifiModeCommand {
    pub fn new(mode: usize) -> Self {
        Self { mode }
    }
}

/// Command for setting the target WIFI access point parameters
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWJAP", NoResponse, timeout_ms = 10_000)]
pub struct AccessPointConnectCommand {
    /// The SSID of the target access point
    #[at_arg(position = 0)]
    ssid: String<32>,

    /// The password/key of the target access point
    #[at_arg(position = 1)]
    password: String<64>,
}

impl AccessPointConnectCommand {
    pub fn new(ssid: String<32>, password: String<64>) -> Self {
        Self { ssid, password }
    }
}

/// Queries the joined access point
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWJAP?", NoResponse, timeout_ms = 10_000)]
pub struct AccessPointQueryCommand;

/// Lists the available access points
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWLAP", NoResponse, timeout_ms = 10_000)]
pub struct ListAccessPointsCommand;

/// Disconnects from the current access point
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWQAP", NoResponse, timeout_ms = 1_000)]
pub struct AccessPointDisconnectCommand;

/// Configures the SoftAP
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWSAP", NoResponse, timeout_ms = 5_000)]
pub struct SoftApConfigCommand {
    #[at_arg(position = 0)]
    ssid: String<32>,

    #[at_arg(position = 1)]
    password: String<64>,

    /// WIFI channel
    #[at_arg(position = 2)]
    channel: usize,

    /// Encryption:
    ///     0: Open
    ///     2: WPA_PSK
    ///     3: WPA2_PSK
    ///     4: WPA_WPA2_PSK
    #[at_arg(position = 3)]
    encryption: usize,
}

impl SoftApConfigCommand {
    pub fn new(ssid: String<32>, password: String<64>, channel: u8, encryption: u8) -> Self {
        Self {
            ssid,
            password,
            channel: channel as usize,
            encryption: encryption as usize,
        }
    }
}

/// Lists the stations connected to the SoftAP
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CWLIF", NoResponse, timeout_ms = 1_000)]
pub struct JoinedDevicesCommand;

/// Queries the connection status
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CIPSTATUS", NoResponse, timeout_ms = 1_000)]
pub struct ConnectionStatusCommand;

/// Queries the local addresses
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CIFSR", NoResponse, timeout_ms = 1_000)]
pub struct ObtainLocalAddressCommand;

/// Enables/Disables multiple connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse, timeout_ms = 1_000)]
pub struct SetMultipleConnectionsCommand {
    /// 0: single connection, 1: multiple connections
    mode: usize,
}

impl SetMultipleConnectionsCommand {
    /// Enables multiple connections
    pub fn multiple() -> Self {
        Self { mode: 1 }
    }

    /// Disables multiple connections
    pub fn single() -> Self {
        Self { mode: 0 }
    }
}

/// Establish TCP connection or UDP transmission in single connection mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 10_000)]
pub struct ConnectCommand {
    /// Connection type, TCP or UDP
    connection_type: String<3>,

    /// Remote IP address or domain
    remote_host: String<64>,

    /// Remote port
    port: u16,
}

impl ConnectCommand {
    pub fn new(connection_type: &str, remote_host: String<64>, port: u16) -> Self {
        Self {
            connection_type: String::from_str(connection_type).unwrap_or_default(),
            remote_host,
            port,
        }
    }
}

/// Establish TCP connection or UDP transmission on the given link
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 10_000)]
pub struct MultiplexedConnectCommand {
    /// Socket ID
    link_id: usize,

    /// Connection type, TCP or UDP
    connection_type: String<3>,

    /// Remote IP address or domain
    remote_host: String<64>,

    /// Remote port
    port: u16,
}

impl MultiplexedConnectCommand {
    pub fn new(link_id: usize, connection_type: &str, remote_host: String<64>, port: u16) -> Self {
        Self {
            link_id,
            connection_type: String::from_str(connection_type).unwrap_or_default(),
            remote_host,
            port,
        }
    }
}

/// Closes the connection in single connection mode
#[derive(Clone, Default, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 5_000)]
pub struct CloseCommand;

/// Closes the connection of the given link
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 5_000)]
pub struct MultiplexedCloseCommand {
    link_id: usize,
}

impl MultiplexedCloseCommand {
    pub fn new(link_id: usize) -> Self {
        Self { link_id }
    }
}

/// Initiates the transmission of the given byte count in single connection mode.
/// Timeout applies to the `>` prompt.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 5_000)]
pub struct TransmissionPrepareCommand {
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

/// Initiates the transmission of the given byte count on the given link.
/// Timeout applies to the `>` prompt.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 5_000)]
pub struct MultiplexedTransmissionPrepareCommand {
    link_id: usize,
    length: usize,
}

impl MultiplexedTransmissionPrepareCommand {
    pub fn new(link_id: usize, length: usize) -> Self {
        Self { link_id, length }
    }
}

/// Starts the TCP server
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSERVER", NoResponse, timeout_ms = 1_000)]
pub struct StartServerCommand {
    mode: usize,
    port: u16,
}

impl StartServerCommand {
    pub fn new(port: u16) -> Self {
        Self { mode: 1, port }
    }
}

/// Stops the TCP server
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSERVER", NoResponse, timeout_ms = 1_000)]
pub struct StopServerCommand {
    mode: usize,
}

impl StopServerCommand {
    pub fn new() -> Self {
        Self { mode: 0 }
    }
}

/// Sets the TCP server timeout
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTO", NoResponse, timeout_ms = 1_000)]
pub struct ServerTimeoutCommand {
    /// Timeout in seconds
    timeout: u32,
}

impl ServerTimeoutCommand {
    pub fn new(timeout: u32) -> Self {
        Self { timeout }
    }
}
