//! # Mail extraction
//!
//! Splits a mail, as delivered by a mail server over a single connection, into the `From` and
//! `Subject` header values and the body. All other headers are dropped.
//!
//! Lines are terminated by CRLF. The first empty line terminates the header section. CR and LF
//! bytes are never stored, so the body is captured as a single line of text. The body capacity is
//! the size of the caller buffer minus one byte reserved for a NUL terminator. Once all data has
//! been received, the last captured body byte is replaced by the terminator, which removes the
//! trailing `.` the mail server sends as end-of-body marker.
//!
//! ````
//! use esp_at_mail::email::{Email, EmailParser};
//!
//! let mut body = [0x0; 64];
//! let mut email = Email::new(&mut body);
//!
//! let mut parser = EmailParser::new(&mut email);
//! for byte in b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody text.\r\n.\r\n" {
//!     parser.feed(*byte);
//! }
//! parser.finish();
//!
//! assert_eq!("a@b.com", email.from.as_str());
//! assert_eq!("Hi", email.subject.as_str());
//! assert_eq!(b"Body text.", email.body());
//! ````
use crate::error::Error;
use crate::timer::Deadline;
use crate::transport::Transport;
use alloc::vec::Vec;
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use heapless::String;

/// Max. number of chars stored for a header value. Excess chars are truncated.
pub const HEADER_CAPACITY: usize = 127;

const FROM_PREFIX: &[u8] = b"From: ";
const SUBJECT_PREFIX: &[u8] = b"Subject: ";

/// Mail fields, backed by a caller owned body buffer
#[derive(Debug)]
pub struct Email<'a> {
    /// Value of the `From` header
    pub from: String<HEADER_CAPACITY>,

    /// Value of the `Subject` header
    pub subject: String<HEADER_CAPACITY>,

    body: &'a mut [u8],

    /// Length of the captured body, excluding the terminator
    body_length: usize,
}

impl<'a> Email<'a> {
    pub fn new(body: &'a mut [u8]) -> Self {
        Self {
            from: String::new(),
            subject: String::new(),
            body,
            body_length: 0,
        }
    }

    /// Returns the captured body without terminator
    pub fn body(&self) -> &[u8] {
        &self.body[..self.body_length]
    }

    /// Max. number of body bytes captured, one byte less then the buffer size
    pub fn body_capacity(&self) -> usize {
        self.body.len().saturating_sub(1)
    }

    /// Resets all fields
    pub fn clear(&mut self) {
        self.from.clear();
        self.subject.clear();
        self.body_length = 0;
    }
}

/// Section of the mail currently processed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Section {
    Header,
    Body,
}

/// Feed result of [EmailParser]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Parser accepts more data
    Continue,
    /// Body capacity is exhausted
    BodyFull,
}

/// Line based state machine for separating headers from body
pub struct EmailParser<'e, 'b> {
    email: &'e mut Email<'b>,

    section: Section,

    /// CR received, waiting for LF
    carriage_return: bool,

    /// Current header line, without line break
    line: Vec<u8>,
}

impl<'e, 'b> EmailParser<'e, 'b> {
    pub fn new(email: &'e mut Email<'b>) -> Self {
        email.clear();

        Self {
            email,
            section: Section::Header,
            carriage_return: false,
            line: Vec::new(),
        }
    }

    /// Processes a single byte
    pub fn feed(&mut self, byte: u8) -> Progress {
        match byte {
            b'\r' => {
                self.carriage_return = true;
                Progress::Continue
            }
            b'\n' => {
                if self.carriage_return {
                    self.carriage_return = false;
                    self.complete_line();
                }
                Progress::Continue
            }
            _ => {
                self.carriage_return = false;

                match self.section {
                    Section::Header => {
                        self.line.push(byte);
                        Progress::Continue
                    }
                    Section::Body => self.push_body(byte),
                }
            }
        }
    }

    /// True if the empty line terminating the headers was received
    pub fn in_body(&self) -> bool {
        self.section == Section::Body
    }

    /// True if the body capacity is exhausted
    pub fn is_full(&self) -> bool {
        self.email.body_length >= self.email.body_capacity()
    }

    /// Terminates the body. The last captured byte (end-of-body marker) is replaced by NUL.
    pub fn finish(self) {
        if self.email.body_length == 0 {
            return;
        }

        self.email.body_length -= 1;
        self.email.body[self.email.body_length] = 0x0;
    }

    fn push_body(&mut self, byte: u8) -> Progress {
        if self.is_full() {
            return Progress::BodyFull;
        }

        self.email.body[self.email.body_length] = byte;
        self.email.body_length += 1;

        if self.is_full() {
            return Progress::BodyFull;
        }

        Progress::Continue
    }

    fn complete_line(&mut self) {
        if self.section == Section::Body {
            return;
        }

        if self.line.is_empty() {
            self.section = Section::Body;
        } else if let Some(value) = self.line.strip_prefix(FROM_PREFIX) {
            copy_truncated(&mut self.email.from, value);
        } else if let Some(value) = self.line.strip_prefix(SUBJECT_PREFIX) {
            copy_truncated(&mut self.email.subject, value);
        }

        self.line.clear();
    }
}

/// Feeds the incoming stream to the parser until the body is full or the timeout elapsed
pub fn read_email<U: Transport, T: Timer<TIMER_HZ>, const TIMER_HZ: u32>(
    transport: &mut U,
    timer: &mut T,
    email: &mut Email<'_>,
    timeout: TimerDurationU32<TIMER_HZ>,
) -> Result<(), Error> {
    let deadline = Deadline::start(timer, timeout);
    let mut parser = EmailParser::new(email);

    'receive: while !deadline.is_expired(timer) {
        while transport.available().map_err(|_| Error::TransportError)? > 0 {
            let byte = transport.read_byte().map_err(|_| Error::TransportError)?;

            if parser.feed(byte) == Progress::BodyFull {
                break 'receive;
            }
        }
    }

    parser.finish();
    Ok(())
}

/// Replaces the target by the given (lossy decoded) text, truncated to the capacity
fn copy_truncated<const N: usize>(target: &mut String<N>, value: &[u8]) {
    target.clear();

    for c in alloc::string::String::from_utf8_lossy(value).chars() {
        if target.push(c).is_err() {
            break;
        }
    }
}
