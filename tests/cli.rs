use std::net::TcpListener;
use std::process::Command;

#[test]
fn test_client_connect_failure_reported_once() {
    // Grab a free port, then close it.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let output = Command::new(env!("CARGO_BIN_EXE_echo-client"))
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run echo-client");

    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let all = format!("{stdout}{stderr}");
    assert_eq!(all.matches("Failed to connect to").count(), 1, "{all}");
    assert!(!stderr.contains("Error: "));
}

#[test]
fn test_zero_messages_rejected() {
    let output = Command::new(env!("CARGO_BIN_EXE_echo-client"))
        .args(["-n", "0"])
        .output()
        .expect("Failed to run echo-client");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("must be at least 1"));
}
