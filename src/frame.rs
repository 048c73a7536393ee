//! # Socket data frames
//!
//! Received socket data is embedded in the response stream as
//!
//! * `+IPD,<len>:<data>` in single connection mode
//! * `+IPD,<id>,<len>:<data>` in multiplexed mode, id in 0..=4
//!
//! The header is scanned as text byte by byte, so that no payload byte is consumed before the
//! header is complete. The payload is then copied raw, counting bytes instead of matching markers.
use crate::error::Error;
use crate::receiver::find_bytes;
use crate::timer::Deadline;
use crate::transport::Transport;
use alloc::vec::Vec;
use core::str::FromStr;
use fugit::TimerDurationU32;
use fugit_timer::Timer;

/// Frame header marker
const MARKER: &[u8] = b"+IPD,";

/// Highest link id of multiplexed connections
pub const MAX_LINK_ID: usize = 4;

/// Parsed `+IPD` header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Link id, just present in multiplexed mode
    pub link_id: Option<usize>,

    /// Declared payload length. Always > 0.
    pub length: usize,
}

/// Outcome of parsing the scanned text
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeaderState {
    /// No complete header so far
    Incomplete,
    /// Valid header found
    Complete(FrameHeader),
    /// Header found, but link id is out of range or length is not positive
    Malformed,
}

/// A received frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,

    /// Bytes copied to the caller buffer. Less then the declared length if the buffer is too small.
    pub received: usize,
}

/// Result of scanning for a frame header
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderScan {
    /// Valid header. None on timeout or malformed header.
    pub header: Option<FrameHeader>,

    /// Text received up to (and including) the header
    pub data: Vec<u8>,
}

/// Parses the first `+IPD` header of the given text
pub fn parse_header(data: &[u8]) -> HeaderState {
    let start = match find_bytes(data, MARKER, 0) {
        None => return HeaderState::Incomplete,
        Some(index) => index + MARKER.len(),
    };

    let colon = match find_bytes(data, b":", start) {
        None => return HeaderState::Incomplete,
        Some(index) => index,
    };

    match find_bytes(data, b",", start) {
        // +IPD,<id>,<len>:
        Some(comma) if comma < colon => {
            let link_id = match parse_number(&data[start..comma]) {
                Some(id) if id <= MAX_LINK_ID => id,
                _ => return HeaderState::Malformed,
            };

            match parse_length(&data[comma + 1..colon]) {
                Some(length) => HeaderState::Complete(FrameHeader {
                    link_id: Some(link_id),
                    length,
                }),
                None => HeaderState::Malformed,
            }
        }
        // +IPD,<len>:
        _ => match parse_length(&data[start..colon]) {
            Some(length) => HeaderState::Complete(FrameHeader { link_id: None, length }),
            None => HeaderState::Malformed,
        },
    }
}

/// Scans the incoming text for a frame header until the timeout elapsed
pub fn scan_header<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(
    transport: &mut U,
    timer: &mut T,
    timeout: TimerDurationU32<TIMER_HZ>,
) -> Result<HeaderScan, Error> {
    let deadline = Deadline::start(timer, timeout);
    let mut data = Vec::new();

    while !deadline.is_expired(timer) {
        if transport.available().map_err(|_| Error::TransportError)? == 0 {
            continue;
        }

        data.push(transport.read_byte().map_err(|_| Error::TransportError)?);

        match parse_header(&data) {
            HeaderState::Incomplete => {}
            HeaderState::Complete(header) => {
                log::debug!("Frame header: link_id={:?}, length={}", header.link_id, header.length);
                return Ok(HeaderScan {
                    header: Some(header),
                    data,
                });
            }
            HeaderState::Malformed => {
                log::warn!("Dropping malformed frame header");
                return Ok(HeaderScan { header: None, data });
            }
        }
    }

    Ok(HeaderScan { header: None, data })
}

/// Copies the payload of the given header to the buffer. Payload exceeding the buffer is discarded.
///
/// Once complete, all pending bytes get drained. Returns None if the payload was not completely
/// received before the timeout elapsed. Partially received data is lost in this case.
pub fn read_payload<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(
    transport: &mut U,
    timer: &mut T,
    header: &FrameHeader,
    buffer: &mut [u8],
    timeout: TimerDurationU32<TIMER_HZ>,
) -> Result<Option<usize>, Error> {
    let target = header.length.min(buffer.len());
    let deadline = Deadline::start(timer, timeout);
    let mut position = 0;

    while !deadline.is_expired(timer) {
        while position < target && transport.available().map_err(|_| Error::TransportError)? > 0 {
            buffer[position] = transport.read_byte().map_err(|_| Error::TransportError)?;
            position += 1;
        }

        if position == target {
            transport.drain().map_err(|_| Error::TransportError)?;
            return Ok(Some(position));
        }
    }

    log::warn!("Frame payload incomplete: {} of {} bytes", position, target);
    Ok(None)
}

/// Scans for a frame header and copies its payload to the buffer.
/// Returns None on header timeout, malformed header or incomplete payload.
pub fn read_frame<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(
    transport: &mut U,
    timer: &mut T,
    buffer: &mut [u8],
    timeout: TimerDurationU32<TIMER_HZ>,
    payload_timeout: TimerDurationU32<TIMER_HZ>,
) -> Result<Option<Frame>, Error> {
    let header = match scan_header(transport, timer, timeout)?.header {
        None => return Ok(None),
        Some(header) => header,
    };

    let received = read_payload(transport, timer, &header, buffer, payload_timeout)?;
    Ok(received.map(|received| Frame { header, received }))
}

/// Parses a positive payload length
fn parse_length(text: &[u8]) -> Option<usize> {
    parse_number(text).filter(|length| *length > 0)
}

/// Parses an unsigned decimal number surrounded by optional whitespace
///
/// Signs other than `+` and values exceeding [usize] are rejected.
fn parse_number(text: &[u8]) -> Option<usize> {
    let text = core::str::from_utf8(text).ok()?;
    usize::from_str(text.trim()).ok()
}
