use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while serving one request. Exactly one
/// sentinel or a bare close reaches the peer; the variant decides which.
#[derive(Debug, Error)]
pub enum Fault {
    /// The requested class identifier does not exist. Not a server error,
    /// surfaced to the peer as `NO CLASSID`.
    #[error("no class with id {0:?}")]
    NoSuchClass(String),

    /// The catalog could not be reached or read, or a row the schema
    /// guarantees was missing. Surfaced as `System Error`.
    #[error("catalog store fault: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolFault),

    /// Socket-level failure while reading or writing a line.
    #[error("connection i/o fault: {0}")]
    Io(#[from] std::io::Error),
}

/// Framing violations and missed deadlines on the client side of the
/// wire. These never get a response line; the connection just closes.
#[derive(Debug, Error)]
pub enum ProtocolFault {
    #[error("peer closed the connection before sending all arguments")]
    UnexpectedEof,

    #[error("request line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("request line is not valid utf-8")]
    InvalidUtf8,

    #[error("no request line within {0:?}")]
    ReadTimedOut(Duration),

    #[error("peer did not accept a response line within {0:?}")]
    WriteTimedOut(Duration),
}
