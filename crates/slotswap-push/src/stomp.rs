//! Minimal STOMP 1.2 frame codec.
//!
//! ```text
//! COMMAND\n
//! header:value\n
//! header:value\n
//! \n
//! body NUL
//! ```
//!
//! Lines end in LF or CRLF. The frame ends with a NUL octet; when a
//! `content-length` header is present the body spans exactly that many bytes
//! and the NUL follows it. Header names and values are escaped on every
//! command except `CONNECT`/`CONNECTED`.
//!
//! Only the commands this client exchanges are supported: it sends
//! `CONNECT`, `SUBSCRIBE` and `DISCONNECT`, and receives `CONNECTED`,
//! `MESSAGE`, `ERROR` and `RECEIPT`.

use thiserror::Error;

/// Protocol revision offered during the handshake.
pub const ACCEPT_VERSION: &str = "1.2";

/// Heart-beat declaration sent on CONNECT: neither side emits beats.
/// Liveness comes from the reconnect loop, not from timers inside a session.
pub const HEARTBEAT_NONE: &str = "0,0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame is empty")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("invalid escape sequence in header")]
    InvalidEscape,
    #[error("frame is missing its NUL terminator")]
    MissingTerminator,
    #[error("content-length does not match the body")]
    ContentLengthMismatch,
    #[error("data after the NUL terminator")]
    TrailingData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Disconnect,
    Message,
    Error,
    Receipt,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Error => "ERROR",
            Command::Receipt => "RECEIPT",
        }
    }

    fn from_wire(line: &str) -> Result<Self, FrameError> {
        Ok(match line {
            "CONNECT" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SUBSCRIBE" => Command::Subscribe,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "ERROR" => Command::Error,
            "RECEIPT" => Command::Receipt,
            "" => return Err(FrameError::Empty),
            other => return Err(FrameError::UnknownCommand(other.to_string())),
        })
    }

    /// CONNECT and CONNECTED predate header escaping and transmit raw octets.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command, headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self { command, headers, body: body.into() }
    }

    /// CONNECT with the bearer credential alongside the standard headers.
    pub fn connect(host: &str, credential: &str) -> Self {
        Self::new(
            Command::Connect,
            vec![
                ("accept-version".to_string(), ACCEPT_VERSION.to_string()),
                ("host".to_string(), host.to_string()),
                ("heart-beat".to_string(), HEARTBEAT_NONE.to_string()),
                ("Authorization".to_string(), format!("Bearer {credential}")),
            ],
            "",
        )
    }

    /// SUBSCRIBE to `destination`, repeating the credential so the broker can
    /// authorize the subscription on its own.
    pub fn subscribe(id: &str, destination: &str, credential: &str) -> Self {
        Self::new(
            Command::Subscribe,
            vec![
                ("id".to_string(), id.to_string()),
                ("destination".to_string(), destination.to_string()),
                ("Authorization".to_string(), format!("Bearer {credential}")),
            ],
            "",
        )
    }

    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect, Vec::new(), "")
    }

    /// First value for `name`, exactly as the frame carried it.
    /// Repeated headers keep their first occurrence, per the protocol.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn encode(&self) -> String {
        let escaped = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escaped {
                escape_into(name, &mut out);
                out.push(':');
                escape_into(value, &mut out);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one complete frame. Trailing EOLs after the NUL are tolerated,
    /// anything else after it is an error.
    pub fn parse(input: &str) -> Result<Self, FrameError> {
        let mut rest = input;

        let command_line = take_line(&mut rest).ok_or(FrameError::Empty)?;
        let command = Command::from_wire(command_line)?;
        let escaped = command.escapes_headers();

        let mut headers = Vec::new();
        loop {
            let line = take_line(&mut rest).ok_or(FrameError::MissingTerminator)?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
            if escaped {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let body_end = match header_value(&headers, "content-length") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| FrameError::MalformedHeader(format!("content-length:{raw}")))?,
            None => rest.find('\0').ok_or(FrameError::MissingTerminator)?,
        };
        let body = rest
            .get(..body_end)
            .ok_or(FrameError::ContentLengthMismatch)?
            .to_string();
        rest = &rest[body_end..];
        if !rest.starts_with('\0') {
            return Err(if rest.is_empty() {
                FrameError::MissingTerminator
            } else {
                FrameError::ContentLengthMismatch
            });
        }
        rest = &rest[1..];
        if !rest.chars().all(|c| c == '\n' || c == '\r') {
            return Err(FrameError::TrailingData);
        }

        Ok(Frame { command, headers, body })
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(header, _)| header == name)
        .map(|(_, value)| value.as_str())
}

/// Take everything up to the next LF, stripping an optional CR.
fn take_line<'a>(rest: &mut &'a str) -> Option<&'a str> {
    let end = rest.find('\n')?;
    let line = &rest[..end];
    *rest = &rest[end + 1..];
    Some(line.strip_suffix('\r').unwrap_or(line))
}

fn escape_into(raw: &str, out: &mut String) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape),
        }
    }
    Ok(out)
}
