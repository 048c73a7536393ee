//! Mocks for doc examples
use crate::transport::Transport;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::convert::Infallible;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

/// Serial mock simulating a module answering a few fixed commands
///
/// Responses are delivered in chunks. Between two chunks no data is available for a single poll,
/// like a gap on a real line.
#[derive(Default)]
pub struct ExampleTransport {
    /// Pending response chunks
    rx: VecDeque<VecDeque<u8>>,

    /// Written bytes of the current command line
    line: Vec<u8>,

    /// Remaining byte count of a prompted data transmission
    payload_pending: usize,
}

impl ExampleTransport {
    /// Creates a mock which already received the given data
    pub fn with_rx(data: &[u8]) -> Self {
        let mut transport = Self::default();
        transport.respond(data);
        transport
    }

    fn respond(&mut self, data: &[u8]) {
        self.rx.push_back(data.iter().copied().collect());
    }

    fn handle_line(&mut self) {
        match self.line.as_slice() {
            b"AT+CWMODE?\r\n" => self.respond(b"AT+CWMODE?\r\r\n+CWMODE:1\r\n\r\nOK\r\n"),
            b"AT+CWJAP=\"test_wifi\",\"secret\"\r\n" => self.respond(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n"),
            b"AT+CIFSR\r\n" => self.respond(b"AT+CIFSR\r\r\n+CIFSR:STAIP,\"10.0.0.181\"\r\n\r\nOK\r\n"),
            b"AT+CIPSTART=\"TCP\",\"10.0.0.1\",21\r\n" => self.respond(b"CONNECT\r\n\r\nOK\r\n"),
            b"AT+CIPSEND=6\r\n" => {
                self.payload_pending = 6;
                self.respond(b"\r\nOK\r\n> ");
            }
            b"AT+CIPCLOSE\r\n" => self.respond(b"CLOSED\r\n\r\nOK\r\n"),
            _ => self.respond(b"\r\nOK\r\n"),
        }

        self.line.clear();
    }
}

impl Transport for ExampleTransport {
    type Error = Infallible;

    fn available(&mut self) -> Result<usize, Self::Error> {
        match self.rx.front() {
            None => Ok(0),
            Some(chunk) if chunk.is_empty() => {
                self.rx.pop_front();
                Ok(0)
            }
            Some(chunk) => Ok(chunk.len()),
        }
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        Ok(self.rx.front_mut().and_then(|chunk| chunk.pop_front()).unwrap_or_default())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.payload_pending > 0 {
            self.payload_pending = self.payload_pending.saturating_sub(data.len());

            if self.payload_pending == 0 {
                self.respond(b"\r\nRecv 6 bytes\r\n\r\nSEND OK\r\n");
                self.respond(b"\r\n+IPD,16:nice to see you!");
            }
            return Ok(());
        }

        self.line.extend_from_slice(data);
        if self.line.ends_with(b"\r\n") {
            self.handle_line();
        }

        Ok(())
    }

    fn begin(&mut self, _baud_rate: u32) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Timer mock, advancing one millisecond on every poll
#[derive(Default)]
pub struct ExampleTimer {
    ticks: u32,
    deadline: u32,
}

impl Timer<1_000> for ExampleTimer {
    type Error = Infallible;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        self.ticks += 1;
        TimerInstantU32::from_ticks(self.ticks)
    }

    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        self.deadline = self.ticks + duration.ticks();
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        self.ticks += 1;

        if self.ticks >= self.deadline {
            return Ok(());
        }

        Err(nb::Error::WouldBlock)
    }
}
