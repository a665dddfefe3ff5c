use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Fault, ProtocolFault};

/// Sentinel written when a request dies on a server-side fault.
pub const SYSTEM_ERROR: &str = "System Error";
/// Sentinel for a details lookup on an absent class identifier.
pub const NO_CLASSID: &str = "NO CLASSID";
/// Success marker opening a details response.
pub const CLASSID_EXISTS: &str = "CLASSID EXISTS";

/// Longest accepted request line in bytes, newline excluded.
pub const MAX_LINE_BYTES: usize = 8192;

/// First line of a request. Anything else is unrecognized and gets no
/// response at all; the connection simply closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Submit,
    Details,
}

impl Command {
    /// Parses the command line, tolerating surrounding whitespace
    /// (a trailing `\r` included).
    pub fn parse(line: &str) -> Option<Command> {
        match line.trim() {
            "submit" => Some(Command::Submit),
            "details" => Some(Command::Details),
            _ => None,
        }
    }
}

/// Reads one newline-terminated line and returns it without the newline.
/// `Ok(None)` means the peer closed with nothing left to read; a final
/// line missing its newline still counts as a line. Only the newline is
/// stripped, every other byte of the line comes back untouched.
pub async fn read_line<R>(reader: &mut BufReader<R>) -> Result<Option<String>, Fault>
where
    R: AsyncRead + Unpin,
{
    let mut line: Vec<u8> = Vec::new();
    loop {
        let available = match reader.fill_buf().await {
            Ok([]) => {
                if line.is_empty() {
                    return Ok(None);
                }
                break;
            }
            Ok(bytes) => bytes,
            Err(e) => return Err(Fault::Io(e)),
        };
        match available.iter().position(|&b| b == b'\n') {
            Some(at) => {
                if line.len() + at > MAX_LINE_BYTES {
                    reader.consume(at + 1);
                    return Err(ProtocolFault::LineTooLong {
                        limit: MAX_LINE_BYTES,
                    }
                    .into());
                }
                line.extend_from_slice(&available[..at]);
                reader.consume(at + 1);
                break;
            }
            None => {
                let take = available.len();
                if line.len() + take > MAX_LINE_BYTES {
                    reader.consume(take);
                    return Err(ProtocolFault::LineTooLong {
                        limit: MAX_LINE_BYTES,
                    }
                    .into());
                }
                line.extend_from_slice(available);
                reader.consume(take);
            }
        }
    }
    match String::from_utf8(line) {
        Ok(line) => Ok(Some(line)),
        Err(_) => Err(ProtocolFault::InvalidUtf8.into()),
    }
}

/// Writes one response line and flushes it, so the peer can render rows
/// as they arrive instead of waiting for the whole result set.
pub async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
