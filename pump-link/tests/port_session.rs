//! Integration tests driving a real `PortSession` over an in-process TCP
//! loopback standing in for the serial line, grounded on
//! `host_emulation`'s split tx/rx stream fake UART.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pump_link::{alaris, frame, NullTraceSink, PortConfig, PortSession};

fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    server.set_nodelay(true).ok();
    client.set_nodelay(true).ok();
    (client, server)
}

/// Consumes one full Fresenius frame (`STX..ETX`) from `device` without
/// replying.
fn consume_one_frame(device: &mut TcpStream) {
    let mut byte = [0u8; 1];
    let mut inside = false;
    loop {
        device.read_exact(&mut byte).unwrap();
        match byte[0] {
            frame::STX => inside = true,
            frame::ETX if inside => break,
            _ => {}
        }
    }
}

fn answer_one_frame(device: &mut TcpStream, reply: &[u8]) {
    consume_one_frame(device);
    device.write_all(reply).unwrap();
}

/// Same, for the Alaris `!..CR` framing.
fn consume_one_alaris_frame(device: &mut TcpStream) {
    let mut byte = [0u8; 1];
    let mut inside = false;
    loop {
        device.read_exact(&mut byte).unwrap();
        match byte[0] {
            alaris::frame::BANG => inside = true,
            alaris::frame::CR if inside => break,
            _ => {}
        }
    }
}

fn answer_one_alaris_frame(device: &mut TcpStream, reply: &[u8]) {
    consume_one_alaris_frame(device);
    device.write_all(reply).unwrap();
}

#[test]
fn exec_raw_round_trips_a_correct_reply() {
    let (client, mut device) = loopback_pair();
    let session = PortSession::from_io(Box::new(client), PortConfig::fresenius(), Arc::new(NullTraceSink));

    let device_thread = thread::spawn(move || {
        answer_one_frame(&mut device, &frame::encode(b"1C;r000003E8"));
    });

    let reply = session.exec_raw(b"1LE;r").unwrap();
    assert_eq!(reply, b"r000003E8");
    device_thread.join().unwrap();
}

#[test]
fn exec_raw_surfaces_an_application_error() {
    let (client, mut device) = loopback_pair();
    let session = PortSession::from_io(Box::new(client), PortConfig::fresenius(), Arc::new(NullTraceSink));

    let device_thread = thread::spawn(move || {
        answer_one_frame(&mut device, &frame::encode(b"1I;08"));
    });

    let err = session.exec_raw(b"1PR;0001").unwrap_err();
    assert!(err.to_string().contains("out off limit"));
    device_thread.join().unwrap();
}

#[test]
fn exec_raw_retries_once_after_a_timeout_then_succeeds() {
    let (client, mut device) = loopback_pair();
    let mut config = PortConfig::fresenius();
    config.command_timeout = Duration::from_millis(100);
    config.read_poll_interval = Duration::from_millis(20);
    let session = PortSession::from_io(Box::new(client), config, Arc::new(NullTraceSink));

    let device_thread = thread::spawn(move || {
        // First attempt: consume the frame but never answer it, forcing the
        // caller's timeout/retry path.
        consume_one_frame(&mut device);
        answer_one_frame(&mut device, &frame::encode(b"1C;r00000000"));
    });

    let reply = session.exec_raw(b"1LE;r").unwrap();
    assert_eq!(reply, b"r00000000");
    device_thread.join().unwrap();
}

#[test]
fn spontaneous_frame_is_acked_and_published_without_a_pending_command() {
    let (client, mut device) = loopback_pair();
    let session = PortSession::from_io(Box::new(client), PortConfig::fresenius(), Arc::new(NullTraceSink));
    let events = session.subscribe_events();

    device.write_all(&frame::encode(b"2E;r000007D0")).unwrap();

    let event = events.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event.origin, 2);
    assert_eq!(event.payload, b"r000007D0");

    // The device should see an ACK followed by an echoed spontaneous frame.
    let mut buf = [0u8; 1];
    device.read_exact(&mut buf).unwrap();
    assert_eq!(buf[0], frame::ACK);

    // Dropped explicitly, ahead of `session`: `PortSession::drop` joins the
    // reader thread, which only unblocks once this end of the pipe closes.
    drop(device);
}

#[test]
fn alaris_protocol_round_trips_through_the_pipe_framing() {
    let (client, mut device) = loopback_pair();
    let session = PortSession::from_io(Box::new(client), PortConfig::alaris(), Arc::new(NullTraceSink));

    let device_thread = thread::spawn(move || {
        answer_one_alaris_frame(&mut device, &alaris::frame::encode(b"0C^r000003E8"));
    });

    let reply = session.exec_raw(b"0LE^r").unwrap();
    assert_eq!(reply, b"r000003E8");
    device_thread.join().unwrap();
}
