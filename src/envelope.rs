//! The pseudo-HTTP envelope spoken on the node control socket.
//!
//! Requests are a fixed `POST /connect` template wrapping the command text. Responses are not
//! parsed as HTTP: they are cut into lines and a heuristic ([`Unframe`]) decides which lines are
//! header noise and which are the body shown to the user.
use std::fmt;

use crate::error::*;

/// Number of header-like lines the daemon's reply is assumed to start with.
pub const DEFAULT_SKIP_LINES: usize = 4;

/// A single command framed for the daemon.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Request {
    pub command: String,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Length of the body in bytes, as advertised in `Content-Length`.
    pub fn content_length(&self) -> usize {
        self.command.len()
    }

    /// Returns the full envelope as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "POST /connect HTTP/1.1\r\n\
             Host: localhost\r\n\
             Content-Type: text/text\r\n\
             Content-Length: {}\r\n\
             \r\n\
             {}\r\n\
             \r\n",
            self.content_length(),
            self.command
        )
    }
}

/// Strategy for separating the daemon's preamble from the text shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unframe {
    /// Drop blank lines, then drop this many leading lines unconditionally.
    FixedOffset(usize),
    /// Treat everything up to the first blank line as headers and show the rest.
    HeaderSplit,
}

impl Default for Unframe {
    fn default() -> Self {
        Unframe::FixedOffset(DEFAULT_SKIP_LINES)
    }
}

impl Unframe {
    /// Applies the strategy to decoded response text.
    pub fn lines<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match *self {
            Unframe::FixedOffset(skip) => non_empty_lines(text).skip(skip).collect(),
            Unframe::HeaderSplit => {
                let body = match header_end(text.as_bytes()) {
                    Some(end) => &text[end..],
                    None => text,
                };
                non_empty_lines(body).collect()
            }
        }
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
}

/// The printable part of a daemon reply.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Response {
    lines: Vec<String>,
}

impl Response {
    /// Decodes raw reply bytes. An empty reply yields an empty response.
    pub fn decode(bytes: &[u8], unframe: Unframe) -> Result<Self> {
        let text = String::from_utf8(bytes.to_vec())?;
        let lines = unframe
            .lines(&text)
            .into_iter()
            .map(str::to_string)
            .collect();
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Returns the offset just past the first blank line (`\r\n\r\n` or `\n\n`), if any.
pub(crate) fn header_end(bytes: &[u8]) -> Option<usize> {
    let crlf = find(bytes, b"\r\n\r\n").map(|i| i + 4);
    let lf = find(bytes, b"\n\n").map(|i| i + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Extracts the `Content-Length` value from a header block, matching the name case-insensitively.
pub(crate) fn content_length(headers: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(headers).lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
