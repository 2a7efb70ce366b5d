//! End-to-end tests against a real listener on an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use room_chat::{serve, AppError, OverflowPolicy, ServerConfig};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    start_server_with(ServerConfig::default()).await
}

async fn start_server_with(config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, config));
    addr
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// Connect and set a display name, consuming the confirmation
    async fn named(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(&format!("/name {}", name)).await;
        assert_eq!(client.recv().await, format!("Name is {}", name));
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> String {
        timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed")
    }

    /// Next line if one arrives within `wait`
    async fn recv_within(&mut self, wait: Duration) -> Option<String> {
        match timeout(wait, self.lines.next_line()).await {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => panic!("read failed: {}", e),
            Err(_) => None,
        }
    }

    /// Read whatever is buffered until the server ends the connection
    ///
    /// A reset counts as closed; the server may drop the socket with
    /// unsent data still queued.
    async fn drain_until_closed(&mut self) {
        let result = timeout(READ_TIMEOUT, async {
            loop {
                match self.lines.next_line().await {
                    Ok(Some(_)) => continue,
                    Ok(None) | Err(_) => break,
                }
            }
        })
        .await;
        assert!(result.is_ok(), "connection still open");
    }

    /// Send large messages until `marker` comes back
    async fn flood_until(&mut self, marker: &str) {
        let payload = format!("/msg {}", "x".repeat(4000));
        for _ in 0..5000 {
            self.send(&payload).await;
            if let Some(line) = self.recv_within(Duration::from_millis(1)).await {
                assert_eq!(line, marker);
                return;
            }
        }
        match self.recv_within(READ_TIMEOUT).await {
            Some(line) => assert_eq!(line, marker),
            None => panic!("never saw '{}'", marker),
        }
    }

    /// Wait for the server to close the connection
    async fn expect_closed(&mut self) {
        let next = timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for close")
            .unwrap();
        assert_eq!(next, None);
    }
}

#[tokio::test]
async fn join_message_and_members() {
    let addr = start_server().await;
    let mut alice = TestClient::named(addr, "alice").await;
    let mut bob = TestClient::named(addr, "bob").await;

    alice.send("/join general").await;
    assert_eq!(alice.recv().await, "You have joined the room alice");

    bob.send("/join general").await;
    assert_eq!(bob.recv().await, "You have joined the room bob");
    assert_eq!(alice.recv().await, "bob has joined the room");

    bob.send("/msg hello   world").await;
    assert_eq!(alice.recv().await, "bob: hello world");

    alice.send("/members").await;
    assert_eq!(alice.recv().await, "Members in room: bob");

    // bob never sees his own message; the next line he gets is the reply
    bob.send("/members").await;
    assert_eq!(bob.recv().await, "Members in room: alice");
}

#[tokio::test]
async fn join_is_seen_before_message() {
    let addr = start_server().await;
    let mut alice = TestClient::named(addr, "alice").await;
    let mut bob = TestClient::named(addr, "bob").await;

    alice.send("/join lobby").await;
    alice.recv().await;

    bob.send("/join lobby").await;
    bob.send("/msg hello").await;

    assert_eq!(alice.recv().await, "bob has joined the room");
    assert_eq!(alice.recv().await, "bob: hello");
}

#[tokio::test]
async fn usage_errors_stay_with_sender() {
    let addr = start_server().await;
    let mut alice = TestClient::named(addr, "alice").await;

    alice.send("/msg anyone there").await;
    assert_eq!(alice.recv().await, "Not in a room");

    alice.send("/members").await;
    assert_eq!(alice.recv().await, "Not in a room");

    alice.send("/dance").await;
    assert_eq!(alice.recv().await, "unknown command: /dance");

    alice.send("/join").await;
    assert_eq!(alice.recv().await, "Missing argument for /join");

    // Blank lines are ignored; the session is still usable
    alice.send("").await;
    alice.send("/name alicia").await;
    assert_eq!(alice.recv().await, "Name is alicia");
}

#[tokio::test]
async fn rooms_lists_created_rooms() {
    let addr = start_server().await;
    let mut alice = TestClient::named(addr, "alice").await;
    let mut bob = TestClient::named(addr, "bob").await;

    alice.send("/join general").await;
    alice.recv().await;
    bob.send("/join random").await;
    bob.recv().await;

    alice.send("/rooms").await;
    let line = alice.recv().await;
    let listed = line.strip_prefix("Open rooms: ").unwrap();
    let mut names: Vec<&str> = listed.split(", ").collect();
    names.sort();
    assert_eq!(names, vec!["general", "random"]);
}

#[tokio::test]
async fn quit_notifies_room_and_closes() {
    let addr = start_server().await;
    let mut alice = TestClient::named(addr, "alice").await;
    let mut bob = TestClient::named(addr, "bob").await;

    alice.send("/join general").await;
    alice.recv().await;
    bob.send("/join general").await;
    bob.recv().await;
    alice.recv().await;

    bob.send("/quit").await;
    assert_eq!(bob.recv().await, "Closing connection");
    bob.expect_closed().await;

    assert_eq!(alice.recv().await, "bob has left the room");
    alice.send("/members").await;
    assert_eq!(alice.recv().await, "Members in room: ");
}

#[tokio::test]
async fn dropped_connection_leaves_room() {
    let addr = start_server().await;
    let mut alice = TestClient::named(addr, "alice").await;
    let mut bob = TestClient::named(addr, "bob").await;

    alice.send("/join general").await;
    alice.recv().await;
    bob.send("/join general").await;
    bob.recv().await;
    alice.recv().await;

    drop(bob);

    assert_eq!(alice.recv().await, "bob has left the room");
    alice.send("/members").await;
    assert_eq!(alice.recv().await, "Members in room: ");
}

#[tokio::test]
async fn oversized_line_ends_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = ServerConfig {
        max_line_length: 32,
        ..ServerConfig::default()
    };
    tokio::spawn(serve(listener, config));

    let mut alice = TestClient::connect(addr).await;
    alice.send(&format!("/msg {}", "x".repeat(64))).await;

    assert_eq!(alice.recv().await, "Line too long");
    alice.expect_closed().await;
}

#[tokio::test]
async fn slow_reader_is_evicted_and_closed() {
    // The write timeout is longer than the drain wait below, so only the
    // eviction itself can close the socket in time
    let addr = start_server_with(ServerConfig {
        outbound_buffer: 4,
        overflow_policy: OverflowPolicy::Disconnect,
        write_timeout_ms: 30_000,
        ..ServerConfig::default()
    })
    .await;
    let mut alice = TestClient::named(addr, "alice").await;
    let mut slow = TestClient::connect(addr).await;

    alice.send("/join lobby").await;
    alice.recv().await;
    slow.send("/join lobby").await;
    assert_eq!(alice.recv().await, "Anonymous has joined the room");

    // slow never reads, so its socket and then its buffer fill up
    alice.flood_until("Anonymous has left the room").await;

    slow.drain_until_closed().await;

    alice.send("/members").await;
    assert_eq!(alice.recv().await, "Members in room: ");
}

#[tokio::test]
async fn write_timeout_ends_session() {
    let addr = start_server_with(ServerConfig {
        outbound_buffer: 100_000,
        overflow_policy: OverflowPolicy::Drop,
        write_timeout_ms: 200,
        ..ServerConfig::default()
    })
    .await;
    let mut alice = TestClient::named(addr, "alice").await;
    let mut slow = TestClient::connect(addr).await;

    alice.send("/join lobby").await;
    alice.recv().await;
    slow.send("/join lobby").await;
    assert_eq!(alice.recv().await, "Anonymous has joined the room");

    // The buffer never fills, so only the stalled write can end slow's session
    alice.flood_until("Anonymous has left the room").await;

    slow.drain_until_closed().await;
}

#[tokio::test]
async fn zero_sized_buffer_is_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = ServerConfig {
        command_buffer: 0,
        ..ServerConfig::default()
    };

    match serve(listener, config).await {
        Err(AppError::InvalidConfig(msg)) => assert!(msg.contains("command_buffer")),
        other => panic!("Unexpected serve result: {:?}", other),
    }
}
