//! Socket I/O between the shell and the node daemon.
//!
//! [`Client`] owns one stream to the daemon's control socket. It writes a framed
//! [`Request`] and reads back the raw reply bytes; interpreting them is left to
//! [`Response`](crate::Response).

use std::path::Path;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::UnixStream,
};
use tracing::{debug, trace};

use crate::{
    Request,
    envelope::{content_length, header_end},
    error::*,
};

/// Size of the single receive the daemon's reply is read with.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// How much of a reply is read per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// One receive of at most the buffer size. Longer or fragmented replies are truncated.
    #[default]
    Single,
    /// Keep receiving until the header block and `Content-Length` body bytes have arrived, or
    /// the daemon closes the connection.
    Full,
}

/// A request/reply round trip with the daemon.
#[async_trait]
pub trait Exchange: Send {
    /// Sends the request and returns the raw reply. An empty reply means the peer closed.
    async fn exchange(&mut self, request: &Request) -> Result<Bytes>;
}

/// Client half of a control socket connection. The stream is closed when the client is dropped.
#[derive(Debug)]
pub struct Client<S = UnixStream>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// The connected stream.
    stream: S,
    /// Upper bound for a single receive.
    buffer_size: usize,
    read_mode: ReadMode,
}

impl Client<UnixStream> {
    /// Connects to the Unix domain socket at `path`.
    pub async fn connect_unix<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
        read_mode: ReadMode,
    ) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| ShellError::Connect {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Unix connection established to: {}", path.display());
        Ok(Self::new(stream, buffer_size, read_mode))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an already connected stream.
    pub fn new(stream: S, buffer_size: usize, read_mode: ReadMode) -> Self {
        Self {
            stream,
            buffer_size,
            read_mode,
        }
    }

    /// Writes the request envelope and flushes it.
    async fn send(&mut self, request: &Request) -> Result<()> {
        let buffer = request.to_bytes();
        trace!("sending {} bytes: {:?}", buffer.len(), request.command);
        self.stream
            .write_all(&buffer)
            .await
            .map_err(|source| ShellError::Write { source })?;
        self.stream
            .flush()
            .await
            .map_err(|source| ShellError::Write { source })
    }

    /// Performs one receive of at most `buffer_size` bytes, appending to `reply`.
    async fn receive(&mut self, reply: &mut BytesMut) -> Result<usize> {
        let mut chunk = vec![0u8; self.buffer_size];
        let n = self
            .stream
            .read(&mut chunk)
            .await
            .map_err(|source| ShellError::Read { source })?;
        reply.extend_from_slice(&chunk[..n]);
        trace!("received {} bytes", n);
        Ok(n)
    }
}

/// Whether a reply holds its complete header block and advertised body.
fn is_complete(reply: &[u8]) -> bool {
    match header_end(reply) {
        Some(end) => match content_length(&reply[..end]) {
            Some(length) => reply.len() >= end + length,
            None => true,
        },
        None => false,
    }
}

#[async_trait]
impl<S> Exchange for Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn exchange(&mut self, request: &Request) -> Result<Bytes> {
        self.send(request).await?;
        let mut reply = BytesMut::with_capacity(self.buffer_size);
        let n = self.receive(&mut reply).await?;
        if n == 0 {
            debug!("daemon closed the connection");
            return Ok(reply.freeze());
        }
        if self.read_mode == ReadMode::Full {
            while !is_complete(&reply) {
                if self.receive(&mut reply).await? == 0 {
                    debug!("daemon closed the connection mid-reply");
                    break;
                }
            }
        }
        Ok(reply.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        pin::Pin,
        task::{Context, Poll},
    };
    use tokio::io::{duplex, ReadBuf};

    /// Accepts every write and fails every read.
    struct ResetStream;

    impl AsyncRead for ResetStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::ErrorKind::ConnectionReset.into()))
        }
    }

    impl AsyncWrite for ResetStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn test_is_complete() {
        assert!(!is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n"));
        assert!(!is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nabc"));
        assert!(is_complete(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nabcde"));
        assert!(is_complete(b"HTTP/1.1 200 OK\r\n\r\nanything"));
    }

    #[tokio::test]
    async fn test_exchange_writes_envelope() {
        let (client_side, mut daemon_side) = duplex(1024);
        let mut client = Client::new(client_side, DEFAULT_BUFFER_SIZE, ReadMode::Single);

        let daemon = tokio::spawn(async move {
            let expected = Request::new("version").to_bytes();
            let mut received = vec![0u8; expected.len()];
            daemon_side.read_exact(&mut received).await.unwrap();
            daemon_side.write_all(b"reply").await.unwrap();
            (received, expected)
        });

        let reply = client.exchange(&Request::new("version")).await.unwrap();
        assert_eq!(&reply[..], b"reply");

        let (received, expected) = daemon.await.unwrap();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_single_read_truncates_at_buffer_size() {
        let (client_side, mut daemon_side) = duplex(1024);
        daemon_side.write_all(b"0123456789abcdef").await.unwrap();
        let mut client = Client::new(client_side, 8, ReadMode::Single);

        let reply = client.exchange(&Request::new("x")).await.unwrap();
        assert_eq!(&reply[..], b"01234567");
    }

    #[tokio::test]
    async fn test_full_read_reassembles_fragments() {
        let (client_side, mut daemon_side) = duplex(1024);
        let mut client = Client::new(client_side, 8, ReadMode::Full);
        let reply_text = "HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\nhello world\n";
        daemon_side.write_all(reply_text.as_bytes()).await.unwrap();

        let reply = client.exchange(&Request::new("x")).await.unwrap();
        assert_eq!(&reply[..], reply_text.as_bytes());
    }

    #[tokio::test]
    async fn test_peer_close_after_request_yields_empty_reply() {
        let (client_side, mut daemon_side) = duplex(1024);
        let mut client = Client::new(client_side, DEFAULT_BUFFER_SIZE, ReadMode::Full);

        let daemon = tokio::spawn(async move {
            let mut received = vec![0u8; Request::new("x").to_bytes().len()];
            daemon_side.read_exact(&mut received).await.unwrap();
        });

        let reply = client.exchange(&Request::new("x")).await.unwrap();
        assert!(reply.is_empty());
        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn test_send_to_closed_peer_is_write_error() {
        let (client_side, daemon_side) = duplex(1024);
        let mut client = Client::new(client_side, DEFAULT_BUFFER_SIZE, ReadMode::Single);
        drop(daemon_side);

        match client.exchange(&Request::new("x")).await {
            Err(ShellError::Write { source }) => {
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe)
            }
            other => panic!("Expected Write error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_receive_is_read_error() {
        let mut client = Client::new(ResetStream, DEFAULT_BUFFER_SIZE, ReadMode::Single);

        match client.exchange(&Request::new("x")).await {
            Err(ShellError::Read { source }) => {
                assert_eq!(source.kind(), io::ErrorKind::ConnectionReset)
            }
            other => panic!("Expected Read error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_error_ends_shell_session() {
        let client = Client::new(ResetStream, DEFAULT_BUFFER_SIZE, ReadMode::Single);
        let mut shell = crate::Shell::new(client, crate::Config::default());
        let mut output = Vec::new();

        let result = shell.run(&b"help
help
"[..], &mut output).await;
        assert!(matches!(result, Err(ShellError::Read { .. })));
        assert_eq!(shell.state(), crate::State::Terminated);
        assert_eq!(String::from_utf8(output).unwrap(), "> ");
    }
}
