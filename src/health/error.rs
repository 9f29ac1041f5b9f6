// src/health/error.rs
use reqwest::StatusCode;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;

/// Why a probe failed. Only ever turned into a `DependencyResult` detail.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0}")]
    Status(StatusCode),

    #[error("ETIMEDOUT")]
    Timeout(Duration),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Request(String),
}

impl ProbeError {
    /// Most actionable description available: protocol status first, then a
    /// transport error code, then the raw message.
    pub fn classify(&self) -> String {
        match self {
            ProbeError::Status(status) => status_reason(*status),
            ProbeError::Timeout(_) => "ETIMEDOUT".to_string(),
            ProbeError::Http(err) => {
                if let Some(status) = err.status() {
                    status_reason(status)
                } else if let Some(code) = transport_code(err) {
                    code.to_string()
                } else {
                    err.to_string()
                }
            }
            ProbeError::InvalidResponse(msg) | ProbeError::Request(msg) => msg.clone(),
        }
    }
}

fn status_reason(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Walk the source chain looking for an OS-level error we can name.
fn transport_code(err: &reqwest::Error) -> Option<&'static str> {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(current) = source {
        if let Some(io_err) = current.downcast_ref::<io::Error>() {
            if let Some(code) = io_code(io_err.kind()) {
                return Some(code);
            }
        }
        source = current.source();
    }

    if err.is_timeout() {
        return Some("ETIMEDOUT");
    }
    None
}

fn io_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        io::ErrorKind::NotConnected => Some("ENOTCONN"),
        io::ErrorKind::AddrNotAvailable => Some("EADDRNOTAVAIL"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        io::ErrorKind::UnexpectedEof => Some("ECONNRESET"),
        _ => None,
    }
}
