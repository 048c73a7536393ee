//! # Blocking ESP8266 AT driver
//!
//! Controls an ESP8266 over a serial line using the vendor AT command set. Each operation writes
//! one command and blocks until a terminal marker arrives or the command timeout elapses, so at
//! most one command is in flight at any time. Wrap the [Adapter](wifi::Adapter) in a mutex when it
//! is shared between callers.
//!
//! Socket data arrives as `+IPD[,<id>],<len>:<payload>` frames inside the response stream, s.
//! [frame]. Mail servers talked to over a single connection can be read with
//! [Adapter::fetch_email](wifi::Adapter::fetch_email), which splits the
//! `From`/`Subject` headers from the body, s. [email].
#![cfg_attr(not(any(test, feature = "serialport")), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

extern crate alloc;

pub(crate) mod commands;
pub mod email;
pub mod error;
pub mod frame;
pub mod receiver;
pub(crate) mod responses;
pub mod stack;
pub mod timer;
pub mod transport;
pub mod urc;
pub mod wifi;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
