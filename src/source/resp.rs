//! RESP snapshot source.
//!
//! Talks to the store directly over TCP, sending `INFO <section>` and
//! parsing the bulk-string reply into a [`Snapshot`].

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::{Snapshot, SnapshotSource, Target};
use crate::error::SourceError;

/// Default bound on a single query round trip.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest bulk reply accepted from the server.
const MAX_BULK_LEN: usize = 64 * 1024 * 1024;

/// A snapshot source that queries the store over its wire protocol.
///
/// The connection is opened lazily on the first query and reused until an
/// I/O error or timeout, after which the next query reconnects.
///
/// # Example
///
/// ```no_run
/// use cmdstat_watch::{RespSource, SnapshotSource, Target};
///
/// # tokio_test::block_on(async {
/// let source = RespSource::new("127.0.0.1:6379");
/// let snapshot = source.query(&Target::new("127.0.0.1:6379")).await;
/// # });
/// ```
#[derive(Debug)]
pub struct RespSource {
    default_addr: String,
    timeout: Duration,
    connection: Mutex<Option<Connection>>,
    description: String,
}

#[derive(Debug)]
struct Connection {
    addr: String,
    stream: BufReader<TcpStream>,
}

impl Connection {
    async fn open(addr: &str) -> Result<Self, SourceError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| SourceError::Connection {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(addr, "connected");
        Ok(Self {
            addr: addr.to_string(),
            stream: BufReader::new(stream),
        })
    }
}

impl RespSource {
    /// Create a source for the given `host:port`. Targets with a non-empty
    /// datasource override this address.
    pub fn new(addr: &str) -> Self {
        let default_addr = strip_scheme(addr).to_string();
        Self {
            description: format!("resp: {}", default_addr),
            default_addr,
            timeout: DEFAULT_QUERY_TIMEOUT,
            connection: Mutex::new(None),
        }
    }

    /// Set the per-query timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn addr_for<'a>(&'a self, target: &'a Target) -> &'a str {
        if target.datasource.is_empty() {
            &self.default_addr
        } else {
            strip_scheme(&target.datasource)
        }
    }

    async fn round_trip(
        slot: &mut Option<Connection>,
        addr: &str,
        request: &[u8],
    ) -> Result<String, SourceError> {
        if !matches!(slot, Some(c) if c.addr == addr) {
            *slot = Some(Connection::open(addr).await?);
        }
        let Some(conn) = slot.as_mut() else {
            return Err(SourceError::Connection {
                addr: addr.to_string(),
                reason: "no connection".to_string(),
            });
        };

        conn.stream.get_mut().write_all(request).await?;
        read_reply(&mut conn.stream).await
    }
}

#[async_trait]
impl SnapshotSource for RespSource {
    async fn query(&self, target: &Target) -> Result<Option<Snapshot>, SourceError> {
        let resolved = target.resolved();
        if !resolved.command.eq_ignore_ascii_case("info") || resolved.kind != "command" {
            return Err(SourceError::Unsupported(format!(
                "{} ({})",
                resolved.command, resolved.kind
            )));
        }

        let addr = self.addr_for(target);
        let request = encode_command(&["INFO", resolved.section]);

        let mut slot = self.connection.lock().await;
        let reply = match tokio::time::timeout(
            self.timeout,
            Self::round_trip(&mut slot, addr, &request),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                *slot = None;
                return Err(e);
            }
            Err(_) => {
                *slot = None;
                return Err(SourceError::Timeout);
            }
        };

        let snapshot = Snapshot::from_info(&reply);
        Ok((!snapshot.is_empty()).then_some(snapshot))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

fn strip_scheme(addr: &str) -> &str {
    addr.strip_prefix("redis://").unwrap_or(addr)
}

/// Encode a command as a RESP array of bulk strings.
fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

async fn read_reply(stream: &mut BufReader<TcpStream>) -> Result<String, SourceError> {
    let mut header = String::new();
    if stream.read_line(&mut header).await? == 0 {
        return Err(SourceError::Io(std::io::ErrorKind::UnexpectedEof.into()));
    }
    let header = header.trim_end_matches(['\r', '\n']);

    let mut chars = header.chars();
    let kind = chars.next();
    let rest = chars.as_str();
    match kind {
        Some('$') => {
            let len: i64 = rest
                .parse()
                .map_err(|_| SourceError::Protocol(format!("bad bulk length: {}", rest)))?;
            if len < 0 {
                return Ok(String::new());
            }
            let len = len as usize;
            if len > MAX_BULK_LEN {
                return Err(SourceError::Protocol(format!("bulk reply too large: {}", len)));
            }

            let mut payload = vec![0u8; len + 2];
            stream.read_exact(&mut payload).await?;
            payload.truncate(len);
            String::from_utf8(payload).map_err(|e| SourceError::Protocol(e.to_string()))
        }
        Some('+') => Ok(rest.to_string()),
        Some('-') => Err(SourceError::Protocol(rest.to_string())),
        _ => Err(SourceError::Protocol(format!("unexpected reply: {}", header))),
    }
}
