use crate::error::Error;
use crate::frame::{Frame, FrameHeader};
use crate::stack::ConnectionState;
use crate::tests::mock::{adapter, fast_restart_adapter, AdapterType, FakeTimer, FakeTransport, MockSerial};
use crate::wifi::{Adapter, Config};
use alloc::string::ToString;
use alloc::vec;

/// Transport expecting multiple connections to be enabled first
fn mux_transport() -> FakeTransport {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPMUX=1\r\n", b"AT+CIPMUX=1\r\r\n\r\nOK\r\n");
    transport
}

fn mux_adapter(transport: FakeTransport) -> AdapterType {
    let mut adapter = adapter(transport);
    assert!(adapter.enable_mux().unwrap());
    adapter
}

#[test]
fn test_enable_mux() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPMUX=1\r\n", b"AT+CIPMUX=1\r\r\n\r\nOK\r\n");
    transport.expect(b"AT+CIPMUX=0\r\n", b"AT+CIPMUX=0\r\r\nLink is builded\r\n");

    let mut adapter = adapter(transport);
    assert!(!adapter.is_mux_enabled());

    assert!(adapter.enable_mux().unwrap());
    assert!(adapter.is_mux_enabled());

    // Links still open
    assert!(!adapter.disable_mux().unwrap());
    assert!(adapter.is_mux_enabled());
}

#[test]
fn test_disable_mux() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPMUX=0\r\n", b"\r\nOK\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.disable_mux().unwrap());
    assert!(!adapter.is_mux_enabled());
}

#[test]
fn test_create_and_release_tcp() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSTART=\"TCP\",\"10.0.0.1\",110\r\n", b"CONNECT\r\n\r\nOK\r\n");
    transport.expect(b"AT+CIPCLOSE\r\n", b"CLOSED\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    assert_eq!(ConnectionState::Closed, adapter.socket_state());

    assert!(adapter.create_tcp("10.0.0.1", 110).unwrap());
    assert_eq!(ConnectionState::Open, adapter.socket_state());

    assert!(adapter.release_tcp().unwrap());
    assert_eq!(ConnectionState::Closed, adapter.socket_state());
    adapter.transport.assert_all_expectations_met();
}

#[test]
fn test_create_tcp_already_connected() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSTART=\"TCP\",\"example.org\",25\r\n", b"ALREADY CONNECT\r\n\r\nERROR\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.create_tcp("example.org", 25).unwrap());
    assert_eq!(ConnectionState::Open, adapter.socket_state());
}

#[test]
fn test_create_tcp_error() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSTART=\"TCP\",\"10.0.0.1\",110\r\n", b"\r\nERROR\r\nCLOSED\r\n");

    let mut adapter = adapter(transport);
    assert!(!adapter.create_tcp("10.0.0.1", 110).unwrap());
    assert_eq!(ConnectionState::Closed, adapter.socket_state());
}

#[test]
fn test_create_tcp_host_too_long() {
    let mut adapter = adapter(FakeTransport::new());
    let host = "a".repeat(65);

    assert_eq!(Error::InvalidHostLength, adapter.create_tcp(&host, 80).unwrap_err());
    assert!(adapter.transport.get_writes_as_strings().is_empty());
}

#[test]
fn test_register_and_unregister_udp() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSTART=\"UDP\",\"10.0.0.2\",5000\r\n", b"CONNECT\r\n\r\nOK\r\n");
    transport.expect(b"AT+CIPCLOSE\r\n", b"CLOSED\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.register_udp("10.0.0.2", 5000).unwrap());
    assert_eq!(ConnectionState::Open, adapter.socket_state());

    assert!(adapter.unregister_udp().unwrap());
    assert_eq!(ConnectionState::Closed, adapter.socket_state());
}

#[test]
fn test_release_tcp_unanswered() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSTART=\"TCP\",\"10.0.0.1\",110\r\n", b"CONNECT\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.create_tcp("10.0.0.1", 110).unwrap());
    assert!(!adapter.release_tcp().unwrap());
    assert_eq!(ConnectionState::Open, adapter.socket_state());
}

#[test]
fn test_create_and_release_tcp_on_link() {
    let mut transport = mux_transport();
    transport.expect(b"AT+CIPSTART=3,\"TCP\",\"10.0.0.1\",110\r\n", b"3,CONNECT\r\n\r\nOK\r\n");
    transport.expect(b"AT+CIPCLOSE=3\r\n", b"3,CLOSED\r\n\r\nOK\r\n");

    let mut adapter = mux_adapter(transport);
    assert!(adapter.create_tcp_on(3, "10.0.0.1", 110).unwrap());
    assert_eq!(ConnectionState::Open, adapter.socket_state_on(3).unwrap());
    assert_eq!(ConnectionState::Closed, adapter.socket_state_on(2).unwrap());

    assert!(adapter.release_tcp_on(3).unwrap());
    assert_eq!(ConnectionState::Closed, adapter.socket_state_on(3).unwrap());
    adapter.transport.assert_all_expectations_met();
}

#[test]
fn test_release_tcp_on_link_not_open() {
    let mut transport = mux_transport();
    transport.expect(b"AT+CIPCLOSE=1\r\n", b"AT+CIPCLOSE=1\r\r\nlink is not\r\n");

    let mut adapter = mux_adapter(transport);
    assert!(adapter.release_tcp_on(1).unwrap());
}

#[test]
fn test_register_udp_on_link() {
    let mut transport = mux_transport();
    transport.expect(b"AT+CIPSTART=0,\"UDP\",\"10.0.0.2\",5000\r\n", b"0,CONNECT\r\n\r\nOK\r\n");
    transport.expect(b"AT+CIPCLOSE=0\r\n", b"0,CLOSED\r\n\r\nOK\r\n");

    let mut adapter = mux_adapter(transport);
    assert!(adapter.register_udp_on(0, "10.0.0.2", 5000).unwrap());
    assert_eq!(ConnectionState::Open, adapter.socket_state_on(0).unwrap());

    assert!(adapter.unregister_udp_on(0).unwrap());
    assert_eq!(ConnectionState::Closed, adapter.socket_state_on(0).unwrap());
}

#[test]
fn test_invalid_link_id() {
    let mut adapter = adapter(FakeTransport::new());
    let mut buffer = [0x0; 8];

    assert_eq!(Error::InvalidLinkId(5), adapter.create_tcp_on(5, "10.0.0.1", 80).unwrap_err());
    assert_eq!(Error::InvalidLinkId(5), adapter.release_tcp_on(5).unwrap_err());
    assert_eq!(Error::InvalidLinkId(7), adapter.send_on(7, b"data").unwrap_err());
    assert_eq!(Error::InvalidLinkId(9), adapter.receive_on(9, &mut buffer, 100).unwrap_err());
    assert_eq!(Error::InvalidLinkId(5), adapter.socket_state_on(5).unwrap_err());

    assert!(adapter.transport.get_writes_as_strings().is_empty());
}

#[test]
fn test_remote_close_tracked() {
    let mut transport = mux_transport();
    transport.expect(b"AT+CIPSTART=1,\"TCP\",\"10.0.0.1\",110\r\n", b"1,CONNECT\r\n\r\nOK\r\n");
    transport.expect(b"AT\r\n", b"1,CLOSED\r\nAT\r\r\n\r\nOK\r\n");

    let mut adapter = mux_adapter(transport);
    assert!(adapter.create_tcp_on(1, "10.0.0.1", 110).unwrap());
    assert_eq!(ConnectionState::Open, adapter.socket_state_on(1).unwrap());

    assert!(adapter.kick().unwrap());
    assert_eq!(ConnectionState::Closed, adapter.socket_state_on(1).unwrap());
}

#[test]
fn test_send() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSEND=5\r\n", b"AT+CIPSEND=5\r\r\n\r\nOK\r\n> ");
    transport.expect(b"HELLO", b"\r\nRecv 5 bytes\r\n\r\nSEND OK\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.send(b"HELLO").unwrap());

    let writes = adapter.transport.get_writes_as_strings();
    assert_eq!(vec!["AT+CIPSEND=5\r\n".to_string(), "HELLO".to_string()], writes);
}

#[test]
fn test_send_without_prompt() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSEND=5\r\n", b"link is not valid\r\n\r\nERROR\r\n");

    let mut adapter = adapter(transport);
    assert!(!adapter.send(b"HELLO").unwrap());

    // Prompt timeout of the command
    assert!(adapter.timer.ticks() >= 5_000);
    assert_eq!(1, adapter.transport.get_writes_as_strings().len());
}

#[test]
fn test_send_not_confirmed() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSEND=5\r\n", b"\r\nOK\r\n> ");
    transport.expect(b"HELLO", b"\r\nRecv 5 bytes\r\n\r\nSEND FAIL\r\n");

    let config = Config::new().send_timeout(2_000);
    let mut adapter = Adapter::new(transport, FakeTimer::new(), config).unwrap();

    assert!(!adapter.send(b"HELLO").unwrap());
}

#[test]
fn test_send_on_link() {
    let mut transport = mux_transport();
    transport.expect(b"AT+CIPSEND=2,4\r\n", b"\r\nOK\r\n> ");
    transport.expect(b"ping", b"\r\nSEND OK\r\n");

    let mut adapter = mux_adapter(transport);
    assert!(adapter.send_on(2, b"ping").unwrap());
    adapter.transport.assert_all_expectations_met();
}

#[test]
fn test_send_discards_stale_data() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSEND=5\r\n", b"\r\nOK\r\n> ");
    transport.expect(b"HELLO", b"\r\nSEND OK\r\n");

    let mut adapter = adapter(transport);
    adapter.transport.add_rx(b"\r\n> SEND OK\r\n");

    assert!(adapter.send(b"HELLO").unwrap());
    adapter.transport.assert_all_expectations_met();
}

#[test]
fn test_receive() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"\r\n+IPD,16:nice to see you!\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 64];

    assert_eq!(16, adapter.receive(&mut buffer, 1_000).unwrap());
    assert_eq!(b"nice to see you!", &buffer[..16]);
    assert_eq!(0, adapter.transport.remaining_rx());
}

#[test]
fn test_receive_timeout() {
    let mut adapter = adapter(FakeTransport::new());
    let mut buffer = [0x0; 64];

    assert_eq!(0, adapter.receive(&mut buffer, 2_000).unwrap());
    assert!(adapter.timer.ticks() >= 2_000);
}

#[test]
fn test_receive_buffer_too_small() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"+IPD,5:HELLO");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 3];

    assert_eq!(3, adapter.receive(&mut buffer, 1_000).unwrap());
    assert_eq!(b"HEL", &buffer);
    assert_eq!(0, adapter.transport.remaining_rx());
}

#[test]
fn test_receive_incomplete_payload() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"+IPD,10:HELLO");

    let config = Config::new().payload_timeout(500);
    let mut adapter = Adapter::new(transport, FakeTimer::new(), config).unwrap();
    let mut buffer = [0x0; 16];

    assert_eq!(0, adapter.receive(&mut buffer, 1_000).unwrap());
}

#[test]
fn test_receive_on_link() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"+IPD,3,5:HELLO");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 16];

    assert_eq!(5, adapter.receive_on(3, &mut buffer, 1_000).unwrap());
    assert_eq!(b"HELLO", &buffer[..5]);
}

#[test]
fn test_receive_on_link_mismatch() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"+IPD,1,5:HELLO");
    transport.add_rx(b"+IPD,2,5:WORLD");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 16];

    // Frame of link 1 is consumed and discarded
    assert_eq!(0, adapter.receive_on(2, &mut buffer, 1_000).unwrap());
    assert_eq!(14, adapter.transport.remaining_rx());

    assert_eq!(5, adapter.receive_on(2, &mut buffer, 1_000).unwrap());
    assert_eq!(b"WORLD", &buffer[..5]);
}

#[test]
fn test_receive_on_link_without_link_id() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"+IPD,5:HELLO");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 16];

    assert_eq!(0, adapter.receive_on(0, &mut buffer, 1_000).unwrap());
}

#[test]
fn test_receive_frame() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"0,CONNECT\r\n\r\n+IPD,0,4:ping");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 16];

    let frame = adapter.receive_frame(&mut buffer, 1_000).unwrap();
    assert_eq!(
        Some(Frame {
            header: FrameHeader {
                link_id: Some(0),
                length: 4
            },
            received: 4
        }),
        frame
    );
    assert_eq!(ConnectionState::Open, adapter.socket_state_on(0).unwrap());
}

#[test]
fn test_receive_malformed_frame() {
    let mut transport = FakeTransport::new();
    transport.add_rx(b"+IPD,0,0:");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 16];

    assert_eq!(None, adapter.receive_frame(&mut buffer, 1_000).unwrap());
}

#[test]
fn test_receive_read_error() {
    let mut transport = MockSerial::new();
    transport.expect_begin().returning(|_| Ok(()));
    transport.expect_drain().returning(|| Ok(0));
    transport.expect_available().returning(|| Ok(1));
    transport.expect_read_byte().times(1).returning(|| Err(4));

    let mut adapter: Adapter<_, _, 1_000> = Adapter::new(transport, FakeTimer::new(), Config::default()).unwrap();
    let mut buffer = [0x0; 16];

    assert_eq!(Error::TransportError, adapter.receive(&mut buffer, 1_000).unwrap_err());
}

#[test]
fn test_start_tcp_server() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSERVER=1,8080\r\n", b"AT+CIPSERVER=1,8080\r\r\n\r\nOK\r\n");
    transport.expect(b"AT+CIPSERVER=1,8080\r\n", b"AT+CIPSERVER=1,8080\r\r\nno change\r\n");
    transport.expect(b"AT+CIPSERVER=1,8080\r\n", b"AT+CIPSERVER=1,8080\r\r\n\r\nERROR\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.start_tcp_server(8080).unwrap());
    assert!(adapter.start_server(8080).unwrap());
    assert!(!adapter.start_tcp_server(8080).unwrap());
}

#[test]
fn test_stop_tcp_server_always_false() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSERVER=0\r\n", b"AT+CIPSERVER=0\r\r\n\r\nOK\r\n");
    transport.expect(b"AT+RST\r\n", b"");
    transport.expect(b"AT+CIOBAUD=9600\r\n", b"");
    transport.expect(b"AT+RST\r\n", b"\r\nOK\r\n");
    transport.expect(b"AT+RST\r\n", b"");
    transport.expect(b"AT+CIOBAUD=9600\r\n", b"");
    transport.expect(b"AT\r\n", b"\r\nOK\r\n");

    let mut adapter = fast_restart_adapter(transport);

    // Stopping and restarting succeeded, but the result is still false
    assert!(!adapter.stop_tcp_server().unwrap());
    adapter.transport.assert_all_expectations_met();
    assert_eq!(
        vec![9_600, 115_200, 9_600, 115_200, 9_600],
        adapter.transport.get_baud_rates()
    );
}

#[test]
fn test_stop_server_restart_failed() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSERVER=0\r\n", b"");

    let mut adapter = fast_restart_adapter(transport);
    assert!(!adapter.stop_server().unwrap());

    let writes = adapter.transport.get_writes_as_strings();
    assert_eq!("AT+CIPSERVER=0\r\n", writes[0]);
    assert_eq!("AT+RST\r\n", writes[1]);
}

#[test]
fn test_set_tcp_server_timeout() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSTO=180\r\n", b"\r\nOK\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.set_tcp_server_timeout(180).unwrap());
}

#[test]
fn test_send_line() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSEND=12\r\n", b"\r\nOK\r\n> ");

    let mut adapter = adapter(transport);
    assert!(adapter.send_line("USER alice").unwrap());

    let writes = adapter.transport.get_writes_as_strings();
    assert_eq!(
        vec!["AT+CIPSEND=12\r\n".to_string(), "USER alice".to_string(), "\r\n".to_string()],
        writes
    );
}

#[test]
fn test_send_line_without_prompt() {
    let mut adapter = adapter(FakeTransport::new());

    assert!(!adapter.send_line("QUIT").unwrap());
    assert_eq!(1, adapter.transport.get_writes_as_strings().len());
}

#[test]
fn test_send_and_check() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSEND=13\r\n", b"\r\nOK\r\n> ");
    transport.expect(b"PASS secret\r\n", b"\r\nSEND OK\r\n\r\n+IPD,20:+OK Logged in.\r\n");
    transport.expect(b"AT+CIPSEND=13\r\n", b"\r\nOK\r\n> ");
    transport.expect(b"PASS wrong!\r\n", b"\r\nSEND OK\r\n\r\n+IPD,27:-ERR invalid password\r\n");

    let mut adapter = adapter(transport);
    assert!(adapter.send_and_check("PASS secret", "+OK").unwrap());
    assert!(!adapter.send_and_check("PASS wrong!", "+OK").unwrap());
    assert!(adapter.timer.ticks() >= 10_000);
}

#[test]
fn test_send_and_receive() {
    let mut transport = FakeTransport::new();
    transport.expect(b"AT+CIPSEND=6\r\n", b"\r\nOK\r\n> ");
    transport.expect(b"STAT\r\n", b"\r\nSEND OK\r\n\r\n+IPD,11:+OK 2 320\r\n");

    let mut adapter = adapter(transport);
    let mut buffer = [0x0; 32];

    assert_eq!(11, adapter.send_and_receive(&mut buffer, "STAT").unwrap());
    assert_eq!(b"+OK 2 320\r\n", &buffer[..11]);
}
