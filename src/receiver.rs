//! # Response scanner
//!
//! Collects the bytes of the response stream until one of the expected markers shows up or the
//! deadline expires. Reaching the deadline is not an error, it's reported as unmatched [Response].
//!
//! ````
//! # use esp_at_mail::example::{ExampleTimer, ExampleTransport};
//! # use esp_at_mail::receiver::scan;
//! # use fugit::TimerDurationU32;
//! let mut transport = ExampleTransport::with_rx(b"AT+CWMODE?\r\r\n+CWMODE:1\r\n\r\nOK\r\n");
//! let mut timer = ExampleTimer::default();
//!
//! let response = scan(&mut transport, &mut timer, &["OK"], TimerDurationU32::<1_000>::millis(1_000)).unwrap();
//! assert_eq!(Some(0), response.matched);
//! assert_eq!(Some(&b"1"[..]), response.filter("+CWMODE:", "\r\n\r\nOK"));
//! ````
use crate::error::Error;
use crate::timer::Deadline;
use crate::transport::Transport;
use alloc::string::String;
use alloc::vec::Vec;
use fugit::TimerDurationU32;
use fugit_timer::Timer;

/// Text accumulated during a single scan
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    /// Index of the first target (in listed order) found in the data. None if the deadline expired.
    pub matched: Option<usize>,

    /// All bytes received during the scan, excluding NUL bytes
    pub data: Vec<u8>,
}

impl Response {
    /// True if any target was found
    pub fn is_matched(&self) -> bool {
        self.matched.is_some()
    }

    /// True if the accumulated data contains the given text
    pub fn contains(&self, needle: &str) -> bool {
        find_bytes(&self.data, needle.as_bytes(), 0).is_some()
    }

    /// Returns the bytes between the first occurrence of `begin` and the first occurrence of `end`.
    /// Both markers are excluded. None if a marker is missing or `end` precedes the end of `begin`.
    pub fn filter(&self, begin: &str, end: &str) -> Option<&[u8]> {
        let start = find_bytes(&self.data, begin.as_bytes(), 0)? + begin.len();
        let stop = find_bytes(&self.data, end.as_bytes(), 0)?;

        if start > stop {
            return None;
        }

        Some(&self.data[start..stop])
    }

    /// Returns the data as (lossy) UTF-8 text
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Reads all available bytes until one of the given targets is found or the timeout elapsed.
/// Targets are checked in the given order, so the first listed target wins if several are present.
pub fn scan<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(
    transport: &mut U,
    timer: &mut T,
    targets: &[&str],
    timeout: TimerDurationU32<TIMER_HZ>,
) -> Result<Response, Error> {
    let deadline = Deadline::start(timer, timeout);
    let mut data = Vec::new();

    // Length of the data which was already searched for the targets
    let mut searched = 0;

    loop {
        while transport.available().map_err(|_| Error::TransportError)? > 0 {
            let byte = transport.read_byte().map_err(|_| Error::TransportError)?;
            if byte != 0x0 {
                data.push(byte);
            }
        }

        if searched == 0 || data.len() > searched {
            let matched = targets.iter().position(|target| {
                // Marker may have started in the previously searched tail
                let from = searched.saturating_sub(target.len().saturating_sub(1));
                find_bytes(&data, target.as_bytes(), from).is_some()
            });

            if matched.is_some() {
                return Ok(Response { matched, data });
            }

            searched = data.len();
        }

        if deadline.is_expired(timer) {
            return Ok(Response { matched: None, data });
        }
    }
}

/// Returns true if the target was received before the timeout elapsed
pub fn find<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(
    transport: &mut U,
    timer: &mut T,
    target: &str,
    timeout: TimerDurationU32<TIMER_HZ>,
) -> Result<bool, Error> {
    Ok(scan(transport, timer, &[target], timeout)?.is_matched())
}

/// Waits for the target and extracts the text between `begin` and `end`, s. [Response::filter].
/// Returns None if the target was not received or the markers are missing.
pub fn find_and_filter<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(
    transport: &mut U,
    timer: &mut T,
    target: &str,
    begin: &str,
    end: &str,
    timeout: TimerDurationU32<TIMER_HZ>,
) -> Result<Option<Vec<u8>>, Error> {
    let response = scan(transport, timer, &[target], timeout)?;

    if !response.is_matched() {
        return Ok(None);
    }

    Ok(response.filter(begin, end).map(|data| data.to_vec()))
}

/// Position of the first occurrence of needle in haystack, starting the search at `from`
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }

    if from >= haystack.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}
