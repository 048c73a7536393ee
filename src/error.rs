use core::fmt::{Display, Formatter};

/// Faults of the collaborators or of the caller input.
///
/// Protocol outcomes (timeouts, malformed frames, socket id mismatches) are not errors. They are
/// reported by the `false`, `0` or `None` value of the individual operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Reading, writing or reconfiguring the serial transport failed
    TransportError,

    /// Command does not fit into the encoding buffer
    CommandEncodingFailed,

    /// Given link id is outside of 0..=4
    InvalidLinkId(usize),

    /// Given SSID is longer then the max. size of 32 chars
    InvalidSSIDLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,

    /// Given remote host is longer then the max. size of 64 chars
    InvalidHostLength,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::TransportError => write!(f, "serial transport failure"),
            Error::CommandEncodingFailed => write!(f, "command exceeds encoding buffer"),
            Error::InvalidLinkId(link_id) => write!(f, "invalid link id {}", link_id),
            Error::InvalidSSIDLength => write!(f, "SSID longer than 32 chars"),
            Error::InvalidPasswordLength => write!(f, "password longer than 63 chars"),
            Error::InvalidHostLength => write!(f, "remote host longer than 64 chars"),
        }
    }
}
