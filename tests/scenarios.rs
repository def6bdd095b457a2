//! End-to-end scenarios over loopback TCP.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use line_chat_server::{serve, ChatLog, DisplayTag, RegistryHandle, ServerContext};

const RESET: &str = "\x1b[0m";

async fn start_server(max_clients: usize) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ctx = ServerContext {
        registry: RegistryHandle::spawn(max_clients),
        chat_log: ChatLog::disabled(),
        max_line_length: 1024,
    };
    tokio::spawn(serve(listener, ctx, std::future::pending::<()>()));
    addr
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    /// Connect and wait until the name is registered
    async fn register(addr: SocketAddr, name: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.send(name).await;
        client.send("/leave").await;
        assert_eq!(client.recv().await.as_deref(), Some("You have left the channel."));
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
    }

    async fn join(&mut self, channel: &str) {
        self.send(&format!("/join {channel}")).await;
        assert_eq!(
            self.recv().await,
            Some(format!("Joined channel {channel}"))
        );
    }

    /// No line arrives within a short window
    async fn assert_silent(&mut self) {
        let next = tokio::time::timeout(Duration::from_millis(200), self.lines.next_line()).await;
        assert!(next.is_err(), "unexpected line: {next:?}");
    }
}

fn decorated(name: &str) -> String {
    format!("{}{}{}", DisplayTag::for_name(name), name, RESET)
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;

    let mut impostor = Client::connect(addr).await;
    impostor.send("alice").await;
    assert_eq!(impostor.recv().await.as_deref(), Some("Username already taken."));
    assert_eq!(impostor.recv().await, None);

    alice.join("#general").await;
}

#[tokio::test]
async fn test_sender_receives_own_broadcast() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;

    alice.join("#general").await;
    alice.send("hi").await;
    assert_eq!(alice.recv().await, Some(format!("{}: hi", decorated("alice"))));
}

#[tokio::test]
async fn test_broadcast_stays_in_channel() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;
    let mut bob = Client::register(addr, "bob").await;
    let mut carol = Client::register(addr, "carol").await;

    alice.join("#general").await;
    bob.join("#general").await;
    carol.join("#other").await;

    bob.send("hello all").await;
    let expected = Some(format!("{}: hello all", decorated("bob")));
    assert_eq!(alice.recv().await, expected);
    assert_eq!(bob.recv().await, expected);
    carol.assert_silent().await;
}

#[tokio::test]
async fn test_who_lists_only_channel_members() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;
    let mut bob = Client::register(addr, "bob").await;
    let mut carol = Client::register(addr, "carol").await;

    alice.join("#general").await;
    bob.join("#general").await;
    carol.join("#other").await;

    alice.send("/who").await;
    assert_eq!(alice.recv().await.as_deref(), Some("Users:"));
    assert_eq!(alice.recv().await, Some(format!(" - {}", decorated("alice"))));
    assert_eq!(alice.recv().await, Some(format!(" - {}", decorated("bob"))));
    alice.assert_silent().await;
}

#[tokio::test]
async fn test_list_follows_membership() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;

    alice.join("#a").await;
    alice.send("/list").await;
    assert_eq!(alice.recv().await.as_deref(), Some("Channels:"));
    assert_eq!(alice.recv().await.as_deref(), Some(" - #a"));

    alice.send("/leave").await;
    assert_eq!(alice.recv().await.as_deref(), Some("You have left the channel."));
    alice.send("/list").await;
    assert_eq!(alice.recv().await.as_deref(), Some("Channels:"));
    assert_eq!(alice.recv().await.as_deref(), Some(" (none)"));
}

#[tokio::test]
async fn test_private_messages() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;
    let mut bob = Client::register(addr, "bob").await;

    alice.send("/msg @bob see you at 5").await;
    assert_eq!(
        bob.recv().await,
        Some(format!(
            "{}[PM from alice]:{} see you at 5",
            DisplayTag::for_name("alice"),
            RESET
        ))
    );
    alice.assert_silent().await;

    alice.send("/msg @nobody hello").await;
    assert_eq!(alice.recv().await.as_deref(), Some("User not found."));
    bob.assert_silent().await;
}

#[tokio::test]
async fn test_name_reusable_after_quit() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;

    alice.send("/quit").await;
    assert_eq!(alice.recv().await, None);

    let mut again = Client::register(addr, "alice").await;
    again.join("#back").await;
}

#[tokio::test]
async fn test_errors_keep_connection_open() {
    let addr = start_server(10).await;
    let mut alice = Client::register(addr, "alice").await;

    alice.send("no channel yet").await;
    assert_eq!(
        alice.recv().await.as_deref(),
        Some("Join a channel to send messages.")
    );
    alice.send("/frobnicate").await;
    assert_eq!(alice.recv().await.as_deref(), Some("Unrecognized input"));
    alice.send("/join bad channel").await;
    assert_eq!(alice.recv().await.as_deref(), Some("Unrecognized input"));
    alice.send("/join bad!").await;
    assert_eq!(alice.recv().await.as_deref(), Some("Invalid channel name."));
    alice.send("/who").await;
    assert_eq!(alice.recv().await.as_deref(), Some("You're not in a channel."));

    alice.join("#ok").await;
}

#[tokio::test]
async fn test_capacity_and_release() {
    let addr = start_server(2).await;
    let _alice = Client::register(addr, "alice").await;
    let mut bob = Client::register(addr, "bob").await;

    let mut carol = Client::connect(addr).await;
    carol.send("carol").await;
    assert_eq!(carol.recv().await.as_deref(), Some("Server is full."));
    assert_eq!(carol.recv().await, None);

    bob.send("/quit").await;
    assert_eq!(bob.recv().await, None);

    Client::register(addr, "carol").await;
}

#[tokio::test]
async fn test_concurrent_clients_share_channel() {
    let addr = start_server(10).await;
    let mut clients = Vec::new();
    for i in 0..8 {
        let mut client = Client::register(addr, &format!("user{i}")).await;
        client.join("testroom").await;
        clients.push(client);
    }

    clients[3].send("ping").await;
    let expected = Some(format!("{}: ping", decorated("user3")));
    for client in clients.iter_mut() {
        assert_eq!(client.recv().await, expected);
    }
}
