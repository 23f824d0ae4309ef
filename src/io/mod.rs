// src/io/mod.rs
//
// Acquisition I/O: the transport seam, the ThinkGear framing codec, and
// the device handle consumers hold.

pub mod error;
pub mod serial;
pub mod thinkgear;

pub use error::AcquireError;
pub use serial::{list_serial_ports, ByteSource, SerialByteSource, SerialPortInfo};
pub use thinkgear::{decode_payload, EegDevice, FieldUpdate, FrameReader, Metrics};

use serde::{Deserialize, Serialize};

/// Lifecycle state of an EEG device handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Transport open, nothing acquiring; `poll_once` is legal.
    Idle,
    /// The background acquisition thread is running.
    Running,
    /// Transport released; terminal.
    Closed,
}
