//! Implementation of the Minecraft: Pi Edition protocol.
//!
//! The protocol is line based: each request is a single line such as
//! `world.setBlock(0,64,0,1,0)\n`, and requests that produce a reply are answered with exactly
//! one line. The server answers a request it cannot satisfy with the line `Fail`. Nothing
//! correlates a reply with its request other than ordering, so a connection only ever has one
//! request in flight.
//!
//! Sources include:
//! - [Picraft docs](https://picraft.readthedocs.io/en/release-1.0/protocol.html)
//! - [Wiki.vg](https://wiki.vg/Minecraft_Pi_Protocol)
//! - [martinohanlon/Minecraft-Pi-API](https://github.com/martinohanlon/Minecraft-Pi-API/blob/master/api.md)

use std::fmt::Debug;
use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::string::FromUtf8Error;
use std::task::Poll;

use args::{flatten, Arg};
use bytes::{Bytes, BytesMut};
use commands::SerializableCommand;
use derive_more::{AsRef, Display, From, FromStr};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter, ReadBuf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace, warn};

use crate::util::{decode_cp437, encode_cp437};

pub mod args;
pub mod commands;

/// The port the game listens on for API connections.
pub const DEFAULT_PORT: u16 = 4711;
/// The address of a game running on the local machine.
pub const DEFAULT_ADDRESS: &str = "localhost:4711";
/// The reply the server sends when it could not carry out a request.
pub const FAIL_SENTINEL: &str = "Fail";

// MARK: Types

/// The identifier of an entity in the game world.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRef, Display, FromStr, From,
)]
pub struct EntityId(pub i32);

impl From<EntityId> for Arg {
    fn from(value: EntityId) -> Self {
        value.0.into()
    }
}

/// A player-related setting that can be updated using the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRef, Display)]
#[as_ref(forward)]
pub struct PlayerSettingKey(pub &'static str);

impl PlayerSettingKey {
    /// When enabled, the player will automatically jump when walking into a
    /// block.
    pub const AUTOJUMP: Self = Self("autojump");
}

/// A world-related setting that can be updated using the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRef, Display)]
#[as_ref(forward)]
pub struct WorldSettingKey(pub &'static str);

impl WorldSettingKey {
    /// When enabled, players cannot edit the world (such as by placing or
    /// destroying blocks).
    pub const WORLD_IMMUTABLE: Self = Self("world_immutable");
    /// When disabled, player name tags will not be shown above their heads.
    pub const NAMETAGS_VISIBLE: Self = Self("nametags_visible");
}

impl From<PlayerSettingKey> for Arg {
    fn from(value: PlayerSettingKey) -> Self {
        value.0.into()
    }
}

impl From<WorldSettingKey> for Arg {
    fn from(value: WorldSettingKey) -> Self {
        value.0.into()
    }
}

// MARK: Errors

/// An error that can occur when interacting with a Minecraft: Pi Edition game
/// server.
#[derive(Debug, Snafu)]
pub enum ConnectionError {
    /// The connection to the server could not be established.
    #[snafu(display("Could not connect to the server: {source}"))]
    Connect {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// An IO error occurred while talking to the server. The connection is
    /// closed afterwards.
    #[snafu(display("The connection to the server failed: {source}"))]
    Io {
        source: std::io::Error,
        backtrace: Backtrace,
    },
    /// The server closed the connection, or the connection was already closed
    /// by an earlier failure.
    #[snafu(display("The connection to the server is closed."))]
    ConnectionClosed { backtrace: Backtrace },
    /// The server responded with a 'Fail' message.
    ///
    /// The server understood the request but could not carry it out. The
    /// connection remains usable.
    #[snafu(display("The server responded with a 'Fail' message to `{request}`."))]
    RequestFailed {
        request: String,
        backtrace: Backtrace,
    },
    /// A command contained a character that cannot be sent over the API.
    ///
    /// Commands are encoded as CP437, and newlines would end the command early.
    #[snafu(display("The character {character:?} cannot be sent to the server."))]
    Encode {
        character: char,
        backtrace: Backtrace,
    },
    /// Failed to parse a server response as UTF-8.
    #[snafu(display("Failed to parse server response as UTF-8: {source}"))]
    ResponseNotUtf8 {
        source: FromUtf8Error,
        backtrace: Backtrace,
    },
}

impl ConnectionError {
    /// Whether the server rejected the request with a 'Fail' message.
    #[must_use]
    pub const fn is_request_failed(&self) -> bool {
        matches!(self, Self::RequestFailed { .. })
    }

    /// Whether the error was caused by the underlying byte stream. After such
    /// an error the connection cannot be used again.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Io { .. } | Self::ConnectionClosed { .. }
        )
    }
}

// MARK: Options

/// The text encoding used to decode server responses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyEncoding {
    /// Code page 437, the encoding of the game itself. Every byte decodes to
    /// some character.
    #[default]
    Cp437,
    /// UTF-8, for servers that reply with it. Invalid bytes are an error.
    Utf8,
}

impl ReplyEncoding {
    /// Decodes a single reply line.
    pub fn decode(self, line: Bytes) -> Result<String, ConnectionError> {
        match self {
            Self::Cp437 => Ok(decode_cp437(&line)),
            Self::Utf8 => String::from_utf8(line.into()).context(ResponseNotUtf8Snafu),
        }
    }

    /// Decodes arbitrary bytes for logging, replacing anything invalid.
    #[must_use]
    pub fn decode_lossy(self, data: &[u8]) -> String {
        match self {
            Self::Cp437 => decode_cp437(data),
            Self::Utf8 => String::from_utf8_lossy(data).into_owned(),
        }
    }
}

/// Options that can be set to change the behavior of the connection to the
/// game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectOptions {
    /// How replies from the server are decoded. Commands are always sent as
    /// CP437.
    ///
    /// Defaults to [`ReplyEncoding::Cp437`].
    pub reply_encoding: ReplyEncoding,
    /// The most data read from the socket at once when discarding unread
    /// replies before a command is sent.
    ///
    /// Defaults to 1500 bytes.
    pub drain_chunk_size: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            reply_encoding: ReplyEncoding::Cp437,
            drain_chunk_size: 1500,
        }
    }
}

// MARK: Framing

/// Serializes a command into the line sent to the server, e.g.
/// `world.getBlock(0,0,0)\n`.
///
/// Arguments are flattened and joined with commas. Commas and parentheses
/// inside text arguments are sent as-is, so callers that need them must
/// substitute them first.
///
/// # Errors
///
/// Returns [`ConnectionError::Encode`] if the name or an argument contains a
/// newline or a character with no CP437 code point.
pub fn encode_message(name: &str, args: &[Arg]) -> Result<Vec<u8>, ConnectionError> {
    let mut buf = Vec::with_capacity(name.len() + 2 + args.len() * 4);
    encode_text(name, &mut buf)?;
    buf.push(b'(');
    for (i, arg) in flatten(args).into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_text(&arg.to_string(), &mut buf)?;
    }
    buf.extend_from_slice(b")\n");
    Ok(buf)
}

fn encode_text(text: &str, buf: &mut Vec<u8>) -> Result<(), ConnectionError> {
    ensure!(!text.contains('\n'), EncodeSnafu { character: '\n' });
    encode_cp437(text, buf).map_err(|character| EncodeSnafu { character }.build())
}

// MARK: Connection

/// A communication interface with a Minecraft: Pi Edition game server.
pub trait Protocol: Debug + Send {
    /// Sends a command without waiting for a response.
    fn send(
        &mut self,
        name: &str,
        args: &[Arg],
    ) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Sends a command and waits for the server's one-line response, which is
    /// returned without processing or parsing.
    fn send_receive(
        &mut self,
        name: &str,
        args: &[Arg],
    ) -> impl Future<Output = Result<String, ConnectionError>> + Send;

    /// Sends a typed command, waiting for a response only if the command
    /// [has one](`SerializableCommand::HAS_RESPONSE`). Commands without a
    /// response return an empty string.
    fn send_command<T: SerializableCommand>(
        &mut self,
        command: &T,
    ) -> impl Future<Output = Result<String, ConnectionError>> + Send {
        let args = command.args();
        async move {
            if T::HAS_RESPONSE {
                self.send_receive(T::NAME, &args).await
            } else {
                self.send(T::NAME, &args).await?;
                Ok(String::new())
            }
        }
    }

    /// Flushes the connection and disconnects.
    fn close(&mut self) -> impl Future<Output = Result<(), ConnectionError>> + Send;
}

/// A connection to a game server using the Minecraft: Pi Edition API protocol.
///
/// Every operation takes `&mut self` and runs to completion before the next
/// one can start, which keeps replies in the same order as their requests.
/// Once the stream fails or is closed by the server, every later operation
/// returns [`ConnectionError::ConnectionClosed`]; there is no reconnect.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    socket: BufWriter<S>,
    /// Bytes received from the server that are not yet part of a returned
    /// reply.
    buffer: BytesMut,
    /// How much of `buffer` is known to contain no newline.
    scanned: usize,
    /// The most recently sent command. Only used in diagnostics; it is never
    /// used to match replies to requests.
    last_sent: Vec<u8>,
    closed: bool,
    pub options: ConnectOptions,
}

impl Connection {
    /// Connects to the Minecraft: Pi Edition server at the given address, such
    /// as `"localhost:4711"` or `("raspberrypi.local", DEFAULT_PORT)`.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        options: ConnectOptions,
    ) -> Result<Self, ConnectionError> {
        let socket = TcpStream::connect(addr).await.context(ConnectSnafu)?;
        debug!(peer = ?socket.peer_addr().ok(), "connected to game server");
        Ok(Self::from_stream(socket, options))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Creates a [`Connection`] from an existing stream.
    pub fn from_stream(socket: S, options: ConnectOptions) -> Self {
        Self {
            socket: BufWriter::new(socket),
            buffer: BytesMut::new(),
            scanned: 0,
            last_sent: Vec::new(),
            closed: false,
            options,
        }
    }

    /// The command most recently sent to the server, including its trailing
    /// newline. Empty if nothing has been sent yet.
    #[must_use]
    pub fn last_sent(&self) -> String {
        decode_cp437(&self.last_sent)
    }

    /// Whether the connection has been closed, either locally or because the
    /// stream failed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            debug!(last_sent = %self.last_sent().trim(), "connection closed");
            self.closed = true;
        }
    }

    fn transport_failure<T>(&mut self, source: std::io::Error) -> Result<T, ConnectionError> {
        self.mark_closed();
        Err(source).context(IoSnafu)
    }

    fn report_drained(&self, data: &[u8]) {
        warn!(
            drained = %self.options.reply_encoding.decode_lossy(data).trim(),
            last_sent = %self.last_sent().trim(),
            "drained unexpected data from the server"
        );
    }

    /// Discards any data the server sent that was never read, such as the
    /// reply to a request whose response was not awaited.
    ///
    /// Never waits for data to arrive: only bytes that are already available
    /// are read. Each chunk that is discarded is reported as a warning.
    pub async fn drain(&mut self) -> Result<(), ConnectionError> {
        ensure!(!self.closed, ConnectionClosedSnafu);

        if !self.buffer.is_empty() {
            let stale = self.buffer.split();
            self.scanned = 0;
            self.report_drained(&stale);
        }

        // Let the runtime poll the socket's readiness first, otherwise data
        // that arrived since the last poll is reported as pending.
        tokio::task::yield_now().await;

        let mut chunk = vec![0; self.options.drain_chunk_size.max(1)];
        loop {
            let mut read_buf = ReadBuf::new(&mut chunk);
            let socket = &mut self.socket;
            let polled =
                poll_fn(|cx| Poll::Ready(Pin::new(&mut *socket).poll_read(cx, &mut read_buf)))
                    .await;
            match polled {
                Poll::Pending => return Ok(()),
                Poll::Ready(Err(source)) => return self.transport_failure(source),
                Poll::Ready(Ok(())) if read_buf.filled().is_empty() => {
                    self.mark_closed();
                    return ConnectionClosedSnafu.fail();
                }
                Poll::Ready(Ok(())) => self.report_drained(read_buf.filled()),
            }
        }
    }

    async fn write_message(&mut self, name: &str, args: &[Arg]) -> Result<(), ConnectionError> {
        ensure!(!self.closed, ConnectionClosedSnafu);
        let message = encode_message(name, args)?;
        self.drain().await?;
        trace!(message = %decode_cp437(&message).trim_end(), "sending command");
        self.last_sent = message;

        if let Err(source) = self.socket.write_all(&self.last_sent).await {
            return self.transport_failure(source);
        }
        if let Err(source) = self.socket.flush().await {
            return self.transport_failure(source);
        }
        Ok(())
    }

    /// Receive a line from the connection by either using data that has
    /// already been received or waiting for more data from the socket.
    async fn read_line(&mut self) -> Result<Bytes, ConnectionError> {
        loop {
            let unscanned = &self.buffer[self.scanned..];
            if let Some(idx) = unscanned.iter().position(|&b| b == b'\n') {
                let idx = self.scanned + idx;
                self.scanned = 0;
                let mut line = self.buffer.split_to(idx + 1);
                line.truncate(idx);
                return Ok(line.freeze());
            }
            self.scanned = self.buffer.len();

            match self.socket.read_buf(&mut self.buffer).await {
                Ok(0) => {
                    // Connection lost, possibly partway through a line.
                    self.mark_closed();
                    return ConnectionClosedSnafu.fail();
                }
                Ok(_) => {}
                Err(source) => return self.transport_failure(source),
            }
        }
    }

    /// Waits for the next line sent by the server and returns it without the
    /// trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::RequestFailed`] if the line is exactly
    /// `Fail`, and [`ConnectionError::ConnectionClosed`] if the stream ends
    /// before a full line arrives.
    pub async fn receive(&mut self) -> Result<String, ConnectionError> {
        ensure!(!self.closed, ConnectionClosedSnafu);
        let line = self.read_line().await?;
        let reply = self.options.reply_encoding.decode(line)?;
        if reply == FAIL_SENTINEL {
            return RequestFailedSnafu {
                request: self.last_sent().trim(),
            }
            .fail();
        }
        Ok(reply)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send + Debug> Protocol for Connection<S> {
    async fn send(&mut self, name: &str, args: &[Arg]) -> Result<(), ConnectionError> {
        self.write_message(name, args).await
    }

    async fn send_receive(&mut self, name: &str, args: &[Arg]) -> Result<String, ConnectionError> {
        self.write_message(name, args).await?;
        self.receive().await
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        if self.closed {
            return Ok(());
        }
        let result = self.socket.shutdown().await;
        self.mark_closed();
        result.context(IoSnafu)
    }
}

// MARK: Tests

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{duplex, AsyncBufReadExt, BufReader, DuplexStream};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use super::*;
    use crate::args;

    fn pair() -> (Connection<DuplexStream>, BufReader<DuplexStream>) {
        let (client, server) = duplex(4096);
        (
            Connection::from_stream(client, ConnectOptions::default()),
            BufReader::new(server),
        )
    }

    /// Answers each request with the next scripted reply, or not at all for
    /// an empty reply, and returns the requests it saw once the client goes
    /// away.
    fn scripted_peer(
        mut server: BufReader<DuplexStream>,
        replies: &[&'static str],
    ) -> JoinHandle<Vec<String>> {
        let replies = replies.to_vec();
        tokio::spawn(async move {
            let mut requests = Vec::new();
            let mut replies = replies.into_iter();
            loop {
                let mut line = String::new();
                if server.read_line(&mut line).await.unwrap() == 0 {
                    return requests;
                }
                requests.push(line);
                if let Some(reply) = replies.next().filter(|reply| !reply.is_empty()) {
                    server.write_all(reply.as_bytes()).await.unwrap();
                    server.write_all(b"\n").await.unwrap();
                }
            }
        })
    }

    async fn next_request(server: &mut BufReader<DuplexStream>) -> String {
        let mut line = String::new();
        server.read_line(&mut line).await.unwrap();
        line
    }

    #[test]
    fn frames_commands() {
        assert_eq!(
            encode_message("world.setBlock", &args![1, [2, 3], 4]).unwrap(),
            b"world.setBlock(1,2,3,4)\n"
        );
        assert_eq!(
            encode_message("world.checkpoint.save", &args![]).unwrap(),
            b"world.checkpoint.save()\n"
        );
        assert_eq!(encode_message("a.b", &args![[[5]]]).unwrap(), b"a.b(5)\n");
    }

    #[test]
    fn frames_end_with_a_single_newline() {
        let message = encode_message("chat.post", &args!["hello", [1.5, -2.0]]).unwrap();
        assert_eq!(message, b"chat.post(hello,1.5,-2)\n");
        assert_eq!(message.iter().filter(|&&b| b == b'\n').count(), 1);
    }

    #[test]
    fn text_is_encoded_as_cp437() {
        assert_eq!(
            encode_message("chat.post", &args!["I am so happy ♥"]).unwrap(),
            b"chat.post(I am so happy \x03)\n"
        );
        assert_eq!(
            encode_message("chat.post", &args!["a\tb"]).unwrap(),
            b"chat.post(a\tb)\n"
        );
    }

    #[test]
    fn special_characters_are_not_escaped() {
        assert_eq!(
            encode_message("chat.post", &args!["a,b (c)"]).unwrap(),
            b"chat.post(a,b (c))\n"
        );
    }

    #[test]
    fn unencodable_characters_are_rejected() {
        let err = encode_message("chat.post", &args!["snowman ☃"]).unwrap_err();
        assert!(matches!(err, ConnectionError::Encode { character: '☃', .. }));

        let err = encode_message("chat.post", &args!["two\nlines"]).unwrap_err();
        assert!(matches!(err, ConnectionError::Encode { character: '\n', .. }));

        let err = encode_message("chat\n.post", &args![]).unwrap_err();
        assert!(matches!(err, ConnectionError::Encode { .. }));
    }

    #[tokio::test]
    async fn send_writes_one_line_without_waiting() {
        let (mut conn, mut server) = pair();
        conn.send("world.setBlock", &args![0, 0, 0, 1]).await.unwrap();
        assert_eq!(next_request(&mut server).await, "world.setBlock(0,0,0,1)\n");
        assert_eq!(conn.last_sent(), "world.setBlock(0,0,0,1)\n");
    }

    #[tokio::test]
    async fn send_receive_returns_the_reply() {
        let (mut conn, server) = pair();
        let peer = scripted_peer(server, &["2"]);

        let reply = conn
            .send_receive("world.getBlock", &args![0, 0, 0])
            .await
            .unwrap();
        assert_eq!(reply, "2");

        drop(conn);
        assert_eq!(peer.await.unwrap(), ["world.getBlock(0,0,0)\n"]);
    }

    #[tokio::test]
    async fn replies_stay_in_call_order() {
        let (mut conn, server) = pair();
        let peer = scripted_peer(server, &["1", "12"]);

        let first = conn.send_receive("world.getBlock", &args![0, 0, 0]).await;
        let second = conn.send_receive("world.getBlock", &args![1, 0, 0]).await;
        assert_eq!(first.unwrap(), "1");
        assert_eq!(second.unwrap(), "12");

        drop(conn);
        assert_eq!(
            peer.await.unwrap(),
            ["world.getBlock(0,0,0)\n", "world.getBlock(1,0,0)\n"]
        );
    }

    #[tokio::test]
    async fn fail_reply_is_a_request_error() {
        let (mut conn, server) = pair();
        let _peer = scripted_peer(server, &["Fail", "0"]);

        let err = conn
            .send_receive("world.getBlock", &args![0, -500, 0])
            .await
            .unwrap_err();
        assert!(err.is_request_failed());
        assert!(!err.is_transport());
        match &err {
            ConnectionError::RequestFailed { request, .. } => {
                assert_eq!(request, "world.getBlock(0,-500,0)");
            }
            other => panic!("unexpected error: {other}"),
        }

        // The connection is still usable afterwards.
        assert!(!conn.is_closed());
        let reply = conn.send_receive("world.getBlock", &args![0, 0, 0]).await;
        assert_eq!(reply.unwrap(), "0");
    }

    #[tokio::test]
    async fn only_the_exact_sentinel_fails() {
        let (mut conn, server) = pair();
        let _peer = scripted_peer(server, &["Failure", "fail", " Fail"]);

        for expected in ["Failure", "fail", " Fail"] {
            let reply = conn.send_receive("chat.posts", &args![]).await.unwrap();
            assert_eq!(reply, expected);
        }
    }

    #[tokio::test]
    async fn replies_are_decoded_as_cp437_by_default() {
        let (mut conn, mut server) = pair();
        server.write_all(b"1,\x82 hi\n").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), "1,é hi");

        server.write_all(b"64\r\n").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), "64\r");
    }

    #[test]
    fn drained_data_is_rendered_in_the_reply_encoding() {
        assert_eq!(ReplyEncoding::Cp437.decode_lossy(b"\x82t\xe9"), "étΘ");
        assert_eq!(
            ReplyEncoding::Utf8.decode_lossy(b"\xc3\xa9t\xff"),
            "ét\u{fffd}"
        );
    }

    #[tokio::test]
    async fn replies_can_be_decoded_as_utf8() {
        let (mut conn, mut server) = pair();
        conn.options.reply_encoding = ReplyEncoding::Utf8;

        server.write_all("1,♥ hi\n".as_bytes()).await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), "1,♥ hi");

        server.write_all(b"\xff\xfe\n").await.unwrap();
        let err = conn.receive().await.unwrap_err();
        assert!(matches!(err, ConnectionError::ResponseNotUtf8 { .. }));
    }

    #[tokio::test]
    async fn replies_split_across_reads_are_joined() {
        let (mut conn, mut server) = pair();
        let reader = tokio::spawn(async move { conn.receive().await });
        server.write_all(b"1.5,70").await.unwrap();
        tokio::task::yield_now().await;
        server.write_all(b".0,-3.25\n").await.unwrap();
        assert_eq!(reader.await.unwrap().unwrap(), "1.5,70.0,-3.25");
    }

    #[tokio::test]
    async fn lines_are_found_across_many_reads() {
        let (mut conn, mut server) = pair();
        let reader = tokio::spawn(async move {
            let first = conn.receive().await.unwrap();
            let second = conn.receive().await.unwrap();
            (first, second)
        });
        for piece in [&b"1,2"[..], b",", b"3\n4", b"\n"] {
            server.write_all(piece).await.unwrap();
            tokio::task::yield_now().await;
        }
        assert_eq!(
            reader.await.unwrap(),
            ("1,2,3".to_owned(), "4".to_owned())
        );
    }

    #[tokio::test]
    async fn drain_returns_immediately_when_nothing_is_pending() {
        let (mut conn, _server) = pair();
        timeout(Duration::from_secs(1), conn.drain())
            .await
            .expect("drain waited for data")
            .unwrap();
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn orphaned_replies_are_drained_before_sending() {
        let (mut conn, mut server) = pair();

        // A reply to a request whose response was never read.
        conn.send("world.getHeight", &args![0, 0]).await.unwrap();
        assert_eq!(next_request(&mut server).await, "world.getHeight(0,0)\n");
        server.write_all(b"64\n").await.unwrap();

        conn.send("world.getBlock", &args![0, 0, 0]).await.unwrap();
        assert_eq!(next_request(&mut server).await, "world.getBlock(0,0,0)\n");
        server.write_all(b"3\n").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), "3");
    }

    #[tokio::test]
    async fn drain_reads_large_backlogs_in_chunks() {
        let (mut conn, mut server) = pair();
        conn.options.drain_chunk_size = 8;
        server.write_all(&[b'x'; 100]).await.unwrap();
        server.write_all(b"\n").await.unwrap();

        conn.drain().await.unwrap();
        conn.send("world.getBlock", &args![0, 0, 0]).await.unwrap();
        next_request(&mut server).await;
        server.write_all(b"7\n").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), "7");
    }

    #[tokio::test]
    async fn buffered_extra_lines_are_drained() {
        let (mut conn, mut server) = pair();
        server.write_all(b"1\nstale\n").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), "1");

        conn.send("world.getBlock", &args![0, 0, 0]).await.unwrap();
        next_request(&mut server).await;
        server.write_all(b"2\n").await.unwrap();
        assert_eq!(conn.receive().await.unwrap(), "2");
    }

    #[tokio::test]
    async fn send_fails_after_the_server_disconnects() {
        let (mut conn, server) = pair();
        drop(server);

        let err = conn.send("chat.post", &args!["hi"]).await.unwrap_err();
        assert!(err.is_transport());
        assert!(conn.is_closed());

        let err = conn.send("chat.post", &args!["hi"]).await.unwrap_err();
        assert!(matches!(err, ConnectionError::ConnectionClosed { .. }));
    }

    #[tokio::test]
    async fn receive_fails_after_the_server_disconnects() {
        let (mut conn, mut server) = pair();
        server.write_all(b"partial").await.unwrap();
        drop(server);

        let err = timeout(Duration::from_secs(1), conn.receive())
            .await
            .expect("receive hung on a closed stream")
            .unwrap_err();
        assert!(matches!(err, ConnectionError::ConnectionClosed { .. }));

        let err = conn.receive().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn send_command_only_waits_for_requests() {
        use commands::{ChatPost, WorldGetHeight};
        use nalgebra::Point2;

        let (mut conn, server) = pair();
        let peer = scripted_peer(server, &["", "64"]);

        let reply = conn
            .send_command(&ChatPost {
                message: "hello".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply, "");

        let reply = conn
            .send_command(&WorldGetHeight {
                coords: Point2::new(3, 4),
            })
            .await
            .unwrap();
        assert_eq!(reply, "64");

        drop(conn);
        assert_eq!(
            peer.await.unwrap(),
            ["chat.post(hello)\n", "world.getHeight(3,4)\n"]
        );
    }

    #[tokio::test]
    async fn connects_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = BufReader::new(socket);
            let mut line = String::new();
            socket.read_line(&mut line).await.unwrap();
            socket.write_all(b"1|2|3\n").await.unwrap();
            line
        });

        let mut conn = Connection::connect(addr, ConnectOptions::default())
            .await
            .unwrap();
        let reply = conn.send_receive("world.getPlayerIds", &args![]).await;
        assert_eq!(reply.unwrap(), "1|2|3");
        assert_eq!(server.await.unwrap(), "world.getPlayerIds()\n");

        // The server has hung up by now.
        let err = conn.receive().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn replies_waiting_in_the_socket_are_drained() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            let mut writer = socket.try_clone().unwrap();
            let lines = std::io::BufRead::lines(std::io::BufReader::new(socket));
            for (line, reply) in lines.zip(["64\n", "3\n"]) {
                line.unwrap();
                std::io::Write::write_all(&mut writer, reply.as_bytes()).unwrap();
            }
        });

        let mut conn = Connection::connect(addr, ConnectOptions::default())
            .await
            .unwrap();
        conn.send("world.getHeight", &args![0, 0]).await.unwrap();
        // Block the runtime so the reply sits unread in the socket.
        std::thread::sleep(Duration::from_millis(200));

        let reply = conn.send_receive("world.getBlock", &args![0, 0, 0]).await;
        assert_eq!(reply.unwrap(), "3");

        drop(conn);
        server.join().unwrap();
    }

    #[tokio::test]
    async fn refused_connections_are_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = Connection::connect(addr, ConnectOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Connect { .. }));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn close_shuts_the_connection() {
        let (mut conn, mut server) = pair();
        conn.close().await.unwrap();
        assert!(conn.is_closed());

        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        let err = conn.send("chat.post", &args!["hi"]).await.unwrap_err();
        assert!(matches!(err, ConnectionError::ConnectionClosed { .. }));
    }
}
