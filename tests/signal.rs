#![cfg(unix)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Start the server on an ephemeral port and return it with its port.
fn spawn_server() -> (Child, BufReader<std::process::ChildStdout>, u16) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_echo-server"))
        .args(["--host", "127.0.0.1", "--port", "0"])
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to start echo-server");

    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut port = None;
    let mut line = String::new();
    loop {
        line.clear();
        assert!(stdout.read_line(&mut line).unwrap() > 0, "server exited early");
        if let Some(rest) = line.split("Listening on port ").nth(1) {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            port = Some(digits.parse().unwrap());
        }
        if line.contains("Waiting for connections") {
            break;
        }
    }

    (child, stdout, port.expect("no port logged"))
}

fn send_signal(child: &Child, signal: &str) {
    let status = Command::new("kill")
        .args([signal, &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

fn assert_graceful_stop(signal: &str) {
    let (mut child, mut stdout, port) = spawn_server();

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    stream.write_all(b"Message #1 from test client").unwrap();
    let mut buf = [0u8; 256];
    assert!(stream.read(&mut buf).unwrap() > 0);

    send_signal(&child, signal);

    let status = child.wait().unwrap();
    let mut rest = String::new();
    stdout.read_to_string(&mut rest).unwrap();

    assert!(status.success(), "exit status {status:?} after {signal}");
    assert!(rest.contains("[INFO] Shutdown signal received"));
    assert!(rest.contains("[STOPPED] Server stopped"));
    assert!(rest.contains("[SESSION STATS]"));
    assert!(rest.contains("Total Messages: 1"));
}

#[test]
fn test_sigterm_stops_gracefully() {
    assert_graceful_stop("-TERM");
}

#[test]
fn test_sigint_stops_gracefully() {
    assert_graceful_stop("-INT");
}
