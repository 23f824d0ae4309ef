//! Acquisition library for ThinkGear-style EEG headsets.
//!
//! Decodes the headset's framed serial protocol (sync bytes, length-prefixed
//! payload, inverted-sum checksum) into attention/meditation/signal-quality
//! metrics and a rolling buffer of raw samples. Decoding runs either on the
//! caller's own loop ([`EegDevice::poll_once`]) or on a background reader
//! thread ([`EegDevice::start`]/[`EegDevice::stop`]).

#[macro_use]
pub mod logging;

pub mod checksums;
pub mod config;
pub mod diagnostics;
pub mod io;
pub mod sample_buffer;

pub use config::EegConfig;
pub use diagnostics::{DecodeStats, DecodeStatsSnapshot};
pub use io::error::AcquireError;
pub use io::serial::{list_serial_ports, ByteSource, SerialByteSource, SerialPortInfo};
pub use io::thinkgear::{decode_payload, EegDevice, FieldUpdate, FrameReader, Metrics};
pub use io::DeviceStatus;
pub use sample_buffer::SampleBuffer;
