// src/io/serial.rs
//
// Serial transport for ThinkGear headsets.
//
// ByteSource is the seam between the framing layer and the hardware: the
// frame reader only needs chunked reads with a bounded timeout, so tests
// and captures can stand in for a real port.

use std::io::Read;
use std::time::Duration;

use serde::Serialize;

use crate::io::error::AcquireError;

/// A serial-like byte stream with a bounded read timeout.
///
/// `read` fills `buf` with whatever is available and returns the count.
/// A timeout with no data is reported as `io::ErrorKind::TimedOut`;
/// `Ok(0)` means the transport is gone (unplugged dongle, closed pty).
pub trait ByteSource: Send {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// ByteSource over a real serial port.
pub struct SerialByteSource {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialByteSource {
    /// Open `port_name` at `baud_rate` with the given per-read timeout.
    ///
    /// The timeout here is the chunk timeout, not the whole-frame budget;
    /// keep it short so the frame reader can interleave its own deadline
    /// checks (see `FrameReader::read_packet`).
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, AcquireError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| AcquireError::transport_open(port_name, e))?;
        Ok(Self { port })
    }
}

impl ByteSource for SerialByteSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

/// Information about a serial port that may host a headset dongle.
#[derive(Clone, Debug, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

/// Whether a port path is worth offering to the user.
///
/// On macOS the /dev/tty.* variants block on open waiting for carrier
/// detect; only the /dev/cu.* (calling unit) devices are usable here.
fn is_usable_port(port_name: &str) -> bool {
    #[cfg(target_os = "macos")]
    {
        !port_name.starts_with("/dev/tty.")
    }
    #[cfg(not(target_os = "macos"))]
    {
        let _ = port_name;
        true
    }
}

/// Enumerate serial ports a headset could be plugged into.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, AcquireError> {
    let ports = serialport::available_ports().map_err(|e| {
        AcquireError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("failed to enumerate ports: {}", e),
        ))
    })?;

    Ok(ports
        .into_iter()
        .filter(|p| is_usable_port(&p.port_name))
        .map(|p| {
            let (port_type, manufacturer, product) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    ("USB".to_string(), info.manufacturer, info.product)
                }
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None)
                }
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None),
                serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None),
            };
            SerialPortInfo {
                port_name: p.port_name,
                port_type,
                manufacturer,
                product,
            }
        })
        .collect())
}
