// src/io/error.rs
//
// Error taxonomy for the acquisition pipeline.
//
// Construction failures (TransportOpen, Configuration) are fatal and
// surfaced to the caller. The four framing/decoding errors are per-cycle
// noise on a physiological sensor link: the acquisition loop counts them
// and keeps going. Disconnected is the one read-path error that ends a
// running loop.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum AcquireError {
    /// The serial port could not be opened; the device is unusable.
    TransportOpen { port: String, reason: String },
    /// Invalid configuration (bad TOML, unusable parameter).
    Configuration(String),
    /// No 0xAA 0xAA sync pair arrived within the read timeout.
    SyncTimeout,
    /// The length byte promised more frame bytes than arrived in time.
    IncompletePayload { expected: usize, got: usize },
    /// The transmitted checksum does not match the payload.
    ChecksumMismatch { expected: u8, got: u8 },
    /// A field's declared length would read past the end of the payload.
    TruncatedPayload {
        code: u8,
        needed: usize,
        remaining: usize,
    },
    /// The transport reported end-of-stream; the device is gone.
    Disconnected,
    /// API misuse, e.g. polling while the reader thread is running.
    Usage(&'static str),
    /// Unexpected transport I/O failure.
    Io(io::Error),
}

impl AcquireError {
    pub fn transport_open(port: &str, reason: impl fmt::Display) -> Self {
        AcquireError::TransportOpen {
            port: port.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AcquireError::Configuration(msg.into())
    }

    /// Whether the acquisition loop should keep running after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AcquireError::SyncTimeout
                | AcquireError::IncompletePayload { .. }
                | AcquireError::ChecksumMismatch { .. }
                | AcquireError::TruncatedPayload { .. }
        )
    }
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireError::TransportOpen { port, reason } => {
                write!(f, "failed to open {}: {}", port, reason)
            }
            AcquireError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            AcquireError::SyncTimeout => write!(f, "no sync bytes within the read timeout"),
            AcquireError::IncompletePayload { expected, got } => {
                write!(f, "incomplete payload: expected {} bytes, got {}", expected, got)
            }
            AcquireError::ChecksumMismatch { expected, got } => {
                write!(
                    f,
                    "checksum mismatch: expected {:#04X}, got {:#04X}",
                    expected, got
                )
            }
            AcquireError::TruncatedPayload {
                code,
                needed,
                remaining,
            } => write!(
                f,
                "payload truncated: code {:#04X} declares {} bytes, {} remain",
                code, needed, remaining
            ),
            AcquireError::Disconnected => write!(f, "transport disconnected"),
            AcquireError::Usage(msg) => write!(f, "usage error: {}", msg),
            AcquireError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for AcquireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AcquireError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AcquireError {
    fn from(err: io::Error) -> Self {
        AcquireError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AcquireError::SyncTimeout.is_transient());
        assert!(AcquireError::IncompletePayload { expected: 5, got: 2 }.is_transient());
        assert!(AcquireError::ChecksumMismatch { expected: 0, got: 1 }.is_transient());
        assert!(AcquireError::TruncatedPayload {
            code: 0x83,
            needed: 4,
            remaining: 1
        }
        .is_transient());

        assert!(!AcquireError::Disconnected.is_transient());
        assert!(!AcquireError::Usage("nope").is_transient());
        assert!(!AcquireError::transport_open("COM3", "busy").is_transient());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = AcquireError::ChecksumMismatch {
            expected: 0x5E,
            got: 0x05,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x5E"));
        assert!(msg.contains("0x05"));
    }
}
