//! Example that runs on Linux using a serial-USB-adapter.
//!
//! Joins the given access point and fetches the first mail of a POP3 mailbox.
use std::{env, time::Duration};

use esp_at_mail::{
    email::Email,
    transport::SerialPortTransport,
    wifi::{Adapter, Config},
};
use serialport::{DataBits, FlowControl, Parity, StopBits};

// Timer frequency in Hz
const TIMER_HZ: u32 = 1000;

// Size of the mail body buffer, including the terminator
const BODY_SIZE: usize = 1024;

fn main() {
    env_logger::init();

    // Parse args
    let args: Vec<String> = env::args().collect();
    if args.len() != 8 {
        println!(
            "Usage: {} <path-to-serial> <ssid> <psk> <pop3-host> <pop3-port> <user> <password>",
            args[0]
        );
        println!(
            "Example: {} /dev/ttyUSB0 mywifi hellopasswd123 10.0.0.1 110 alice secret",
            args[0]
        );
        println!("\nNote: To run the example with debug logging, run it like this:");
        println!("\n  RUST_LOG=debug cargo run --example linux --features serialport -- /dev/ttyUSB0 ...");
        std::process::exit(1);
    }
    let dev = &args[1];
    let ssid = &args[2];
    let psk = &args[3];
    let host = &args[4];
    let port: u16 = args[5].parse().expect("Invalid port");
    let user = &args[6];
    let password = &args[7];

    let config = Config::default();
    println!("Starting (dev={})...", dev);

    // Open serial port
    let serial = serialport::new(dev, 9_600)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(500))
        .open()
        .expect("Could not open serial port");

    let mut adapter: Adapter<_, _, TIMER_HZ> =
        Adapter::new(SerialPortTransport::new(serial), timer::SysTimer::new(), config)
            .expect("Could not initialize serial port");

    // Station mode is required for joining an access point
    if !adapter.set_opr_to_station().unwrap() {
        panic!("Could not switch to station mode");
    }

    println!("Join WiFi \"{}\"...", ssid);
    if !adapter.join_ap(ssid, psk).unwrap() {
        panic!("Failed to join WiFi \"{}\"", ssid);
    }
    println!("Local address: {:?}", adapter.get_local_ip().unwrap());

    println!("Connecting to {}:{}...", host, port);
    if !adapter.create_tcp(host, port).unwrap() {
        panic!("Failed to connect to {}", host);
    }

    // Server greeting
    let mut rx_buf = [0; 256];
    let length = adapter.receive(&mut rx_buf, 10_000).unwrap();
    println!("Greeting: {}", String::from_utf8_lossy(&rx_buf[..length]).trim());

    if !adapter.send_and_check(&format!("USER {}", user), "+OK").unwrap()
        || !adapter.send_and_check(&format!("PASS {}", password), "+OK").unwrap()
    {
        panic!("POP3 login failed");
    }

    let mut body = [0; BODY_SIZE];
    let mut email = Email::new(&mut body);
    if !adapter.fetch_email(&mut email, "RETR 1").unwrap() {
        panic!("No response to RETR");
    }

    println!("From: {}", email.from);
    println!("Subject: {}", email.subject);
    println!("---\n{}\n---", String::from_utf8_lossy(email.body()));

    adapter.send_line("QUIT").unwrap();
    adapter.release_tcp().unwrap();
}

mod timer {
    use std::{convert::TryInto, time::Instant as StdInstant};

    use fugit::Instant;
    use fugit_timer::Timer;

    /// A timer with millisecond precision.
    ///
    /// `now()` counts from creation and is not reset by `start()`.
    pub struct SysTimer {
        epoch: StdInstant,
        start: StdInstant,
        duration_ms: u32,
        started: bool,
    }

    impl SysTimer {
        pub fn new() -> SysTimer {
            SysTimer {
                epoch: StdInstant::now(),
                start: StdInstant::now(),
                duration_ms: 0,
                started: false,
            }
        }
    }

    impl Timer<1000> for SysTimer {
        type Error = &'static str;

        /// Return current time `Instant`
        fn now(&mut self) -> fugit::TimerInstantU32<1000> {
            let milliseconds = (StdInstant::now() - self.epoch).as_millis();
            let ticks: u32 = milliseconds.try_into().expect("u32 timer overflow");
            Instant::<u32, 1, 1000>::from_ticks(ticks)
        }

        /// Start timer with a `duration`
        fn start(&mut self, duration: fugit::TimerDurationU32<1000>) -> Result<(), Self::Error> {
            self.start = StdInstant::now();
            self.duration_ms = duration.ticks();
            self.started = true;
            Ok(())
        }

        /// Tries to stop this timer.
        ///
        /// An error will be returned if the timer has already been canceled or was never started.
        fn cancel(&mut self) -> Result<(), Self::Error> {
            if !self.started {
                Err("cannot cancel stopped timer")
            } else {
                self.started = false;
                Ok(())
            }
        }

        /// Wait until timer `duration` has expired.
        fn wait(&mut self) -> nb::Result<(), Self::Error> {
            let now = StdInstant::now();
            if (now - self.start).as_millis() >= self.duration_ms.into() {
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }

}
