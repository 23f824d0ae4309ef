// src/io/thinkgear/mod.rs
//
// ThinkGear-style EEG headset protocol.
//
// Frame format:
//   [0xAA][0xAA][LEN][payload: LEN bytes][CHECKSUM]
//   checksum = (!sum(payload)) & 0xFF
//
// The payload is a sequence of fields; see codec.rs for the field table.

pub mod codec;
pub mod reader;
pub mod types;

pub use codec::{decode_payload, FrameReader};
pub use reader::EegDevice;
pub use types::{FieldUpdate, Metrics};
