//! Unsolicited status lines the module interleaves with command responses
use crate::frame::MAX_LINK_ID;

/// Status messages relevant for the socket lifecycle
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum URCMessages {
    /// Socket connected. Link id is just present in multiplexed mode.
    SocketConnected(Option<usize>),
    /// Socket closed, either by command or remotely. Link id is just present in multiplexed mode.
    SocketClosed(Option<usize>),
}

impl URCMessages {
    /// Parses a single line without line break
    pub fn parse(line: &[u8]) -> Option<Self> {
        match line {
            b"CONNECT" => return Some(Self::SocketConnected(None)),
            b"CLOSED" => return Some(Self::SocketClosed(None)),
            _ => {}
        }

        if line.len() < 2 {
            return None;
        }

        match &line[1..] {
            b",CONNECT" => Some(Self::SocketConnected(Some(Self::parse_link_id(line[0])?))),
            b",CLOSED" => Some(Self::SocketClosed(Some(Self::parse_link_id(line[0])?))),
            _ => None,
        }
    }

    /// Returns all status messages contained in the given text, in order of appearance
    pub fn parse_all(text: &[u8]) -> impl Iterator<Item = URCMessages> + '_ {
        text.split(|byte| *byte == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter_map(Self::parse)
    }

    /// Parses the socket id. Currently supports just socket 0-4
    fn parse_link_id(link_id: u8) -> Option<usize> {
        match link_id {
            b'0'..=b'9' if ((link_id - b'0') as usize) <= MAX_LINK_ID => Some((link_id - b'0') as usize),
            _ => None,
        }
    }
}
