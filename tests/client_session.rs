//! End-to-end client tests against an in-memory server.
//!
//! The client runs over one end of a `tokio::io::duplex` pipe; the test
//! plays the server on the other end.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::StreamExt;
use ircflow::{Client, Config, ConnectionState, Message, MessageSink, Preconnected, ProtocolError};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadBuf,
    ReadHalf, WriteHalf,
};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn config() -> Config {
    Config::new("irc.example.org", 6667, "flowbot", "flow", "Flow Bot")
}

struct Server {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Server {
    async fn expect(&mut self, line: &str) {
        let got = timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for client")
            .expect("read failed");
        assert_eq!(got.as_deref(), Some(line));
    }

    async fn expect_closed(&mut self) {
        let got = timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for close")
            .expect("read failed");
        assert_eq!(got, None);
    }

    async fn write(&mut self, data: &str) {
        self.writer.write_all(data.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn expect_handshake(&mut self) {
        self.expect("USER flow . . :Flow Bot").await;
        self.expect("NICK :flowbot").await;
    }
}

fn pair() -> (Preconnected<DuplexStream>, Server) {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let (read, writer) = tokio::io::split(server_io);
    let server = Server {
        lines: BufReader::new(read).lines(),
        writer,
    };
    (Preconnected::new(client_io), server)
}

async fn next_message(sub: &mut ircflow::Subscription<Message>) -> Message {
    timeout(WAIT, sub.next())
        .await
        .expect("timed out waiting for message")
        .expect("stream ended")
        .expect("stream failed")
}

#[tokio::test]
async fn test_handshake_sent_on_connect() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    assert_eq!(client.state(), ConnectionState::Idle);

    client.connect(connector).unwrap();
    server.expect_handshake().await;
    assert_eq!(client.wait_connected().await, ConnectionState::Connected);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let (connector, _server) = pair();
    let (second, _other) = pair();
    let client = Client::new(config());

    client.connect(connector).unwrap();
    assert!(matches!(client.connect(second), Err(ProtocolError::AlreadyStarted)));
}

#[tokio::test]
async fn test_messages_queued_before_connect_follow_handshake() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    client.channel("#early").join().unwrap();

    client.connect(connector).unwrap();
    server.expect_handshake().await;
    server.expect("JOIN :#early").await;
}

#[tokio::test]
async fn test_ping_answered_with_pong() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    let mut pings = client.command_stream("PING");
    client.connect(connector).unwrap();
    server.expect_handshake().await;

    server.write("PING :abc\r\n").await;
    server.expect("PONG :abc").await;
    assert_eq!(next_message(&mut pings).await, Message::new("PING", ["abc"]));

    // Nothing else was written in response.
    server.write("PING :second\r\n").await;
    server.expect("PONG :second").await;
}

#[tokio::test]
async fn test_fragmented_reads_are_reassembled() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    let mut all = client.messages();
    client.connect(connector).unwrap();
    server.expect_handshake().await;

    server.write(":alice!a@host PRIV").await;
    server.write("MSG #rust :hello wo").await;
    server.write("rld\r").await;
    server.write("\n:bob!b@host JOIN #rust\n").await;

    let first = next_message(&mut all).await;
    assert_eq!(first.prefix.as_deref(), Some("alice!a@host"));
    assert_eq!(first.params, vec!["#rust", "hello world"]);

    let second = next_message(&mut all).await;
    assert_eq!(second.command, "JOIN");
    assert_eq!(second.source_nickname(), Some("bob"));
}

#[tokio::test]
async fn test_command_stream_filters_exactly() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    let mut notices = client.command_stream("NOTICE");
    client.connect(connector).unwrap();
    server.expect_handshake().await;

    server
        .write(":s notice * :lower\r\n:s PRIVMSG me :x\r\n\r\n:s NOTICE * :upper\r\n")
        .await;

    let msg = next_message(&mut notices).await;
    assert_eq!(msg.params, vec!["*", "upper"]);
}

#[tokio::test]
async fn test_channel_view_and_helpers() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    let channel = client.channel("#Test");
    let mut chatter = channel.messages();
    client.connect(connector).unwrap();
    server.expect_handshake().await;

    channel.join().unwrap();
    server.expect("JOIN :#Test").await;
    channel.send_message("hi all").unwrap();
    server.expect("PRIVMSG #Test :hi all").await;

    server
        .write(":a!b@c PRIVMSG #other :no\r\n:srv QUIT\r\n:a!b@c PRIVMSG #test :yes\r\n")
        .await;

    let msg = next_message(&mut chatter).await;
    assert_eq!(msg.params, vec!["#test", "yes"]);

    channel.part(Some("bye")).unwrap();
    server.expect("PART #Test :bye").await;
    channel.part(None).unwrap();
    server.expect("PART :#Test").await;
}

#[tokio::test]
async fn test_unsubscribe_leaves_others_running() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    let first = client.messages();
    let mut second = client.messages();
    client.connect(connector).unwrap();
    server.expect_handshake().await;

    first.unsubscribe();
    server.write("PING :x\r\n").await;
    assert_eq!(next_message(&mut second).await.command, "PING");
}

#[tokio::test]
async fn test_clean_close_sends_quit_leaving() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    let mut all = client.messages();
    let driver = client.connect(connector).unwrap();
    server.expect_handshake().await;

    server.writer.shutdown().await.unwrap();

    server.expect("QUIT :Leaving").await;
    server.expect_closed().await;
    timeout(WAIT, driver).await.unwrap().unwrap();

    assert!(timeout(WAIT, all.next()).await.unwrap().is_none());
    assert_eq!(client.state(), ConnectionState::Terminated);
    assert!(matches!(client.send(Message::nick("late")), Err(ProtocolError::Closed)));
}

#[tokio::test]
async fn test_quit_closes_write_side() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    client.connect(connector).unwrap();
    server.expect_handshake().await;

    client.quit();
    server.expect("QUIT :Leaving").await;
    server.expect_closed().await;
}

#[tokio::test]
async fn test_sink_fail_sends_quit_error() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    client.connect(connector).unwrap();
    server.expect_handshake().await;

    client.sink().fail(&ProtocolError::Closed);
    server.expect("QUIT :Error").await;
    server.expect_closed().await;
}

#[tokio::test]
async fn test_overlong_line_fails_connection() {
    let (connector, mut server) = pair();
    let client = Client::new(config());
    let mut all = client.messages();
    let driver = client.connect(connector).unwrap();
    server.expect_handshake().await;

    server.write("PING :before\r\n").await;
    server.expect("PONG :before").await;
    assert_eq!(next_message(&mut all).await.command, "PING");

    // Never terminated; the client gives up once the line passes the cap.
    server.write(&"x".repeat(ircflow::line::MAX_LINE_LEN + 1800)).await;

    server.expect("QUIT :Error").await;
    server.expect_closed().await;
    timeout(WAIT, driver).await.unwrap().unwrap();

    match timeout(WAIT, all.next()).await.unwrap() {
        Some(Err(e)) => assert!(matches!(*e, ProtocolError::LineTooLong(n) if n > ircflow::line::MAX_LINE_LEN)),
        other => panic!("expected the overflow error, got {other:?}"),
    }
    assert!(all.next().await.is_none());
    assert_eq!(client.state(), ConnectionState::Terminated);
}

#[test]
fn test_encoding_must_be_ascii_compatible() {
    assert!(Client::with_encoding(config(), "latin1").is_ok());
    assert!(matches!(
        Client::with_encoding(config(), "utf-16be"),
        Err(ProtocolError::UnknownEncoding(_))
    ));
}

/// Reads fail after the first read; writes go to a duplex pipe.
struct BrokenReads {
    inner: DuplexStream,
    served: bool,
}

impl AsyncRead for BrokenReads {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.served {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
        }
        self.served = true;
        buf.put_slice(b":srv NOTICE * :before the reset\r\n");
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for BrokenReads {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[tokio::test]
async fn test_transport_error_is_broadcast_once() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let client = Client::new(config());
    let mut first = client.messages();
    let mut second = client.command_stream("PRIVMSG");

    let driver = client
        .connect(Preconnected::new(BrokenReads {
            inner: client_io,
            served: false,
        }))
        .unwrap();

    let mut server = BufReader::new(server_io).lines();
    for expected in ["USER flow . . :Flow Bot", "NICK :flowbot", "QUIT :Error"] {
        let line = timeout(WAIT, server.next_line()).await.unwrap().unwrap();
        assert_eq!(line.as_deref(), Some(expected));
    }
    timeout(WAIT, driver).await.unwrap().unwrap();

    assert_eq!(next_message(&mut first).await.command, "NOTICE");
    match first.next().await {
        Some(Err(e)) => assert!(matches!(*e, ProtocolError::Io(_))),
        other => panic!("expected the transport error, got {other:?}"),
    }
    assert!(first.next().await.is_none());

    assert!(matches!(second.next().await, Some(Err(_))));
    assert!(second.next().await.is_none());

    // Late subscribers observe the terminal failure too.
    let mut late = client.messages();
    assert!(matches!(late.next().await, Some(Err(_))));
    assert_eq!(client.state(), ConnectionState::Terminated);
}

#[tokio::test]
async fn test_connect_failure_terminates() {
    let (client_io, _server_io) = tokio::io::duplex(64);
    let connector = Preconnected::new(client_io);
    // Drain the stream so the client's connect attempt fails.
    let _ = ircflow::Connector::connect(&connector, "x", 0).await;

    let client = Client::new(config());
    let mut all = client.messages();
    let driver = client.connect(connector).unwrap();
    timeout(WAIT, driver).await.unwrap().unwrap();

    match all.next().await {
        Some(Err(e)) => assert!(matches!(*e, ProtocolError::Connect { port: 6667, .. })),
        other => panic!("expected a connect error, got {other:?}"),
    }
    assert_eq!(client.wait_connected().await, ConnectionState::Terminated);
}
