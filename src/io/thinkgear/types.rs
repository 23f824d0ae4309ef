// src/io/thinkgear/types.rs
//
// Shared types for the ThinkGear acquisition pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sample_buffer::SampleBuffer;

/// Latest scalar metrics reported by the headset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Attention level, 0-100
    pub attention: u8,
    /// Meditation level, 0-100
    pub meditation: u8,
    /// Contact quality, 0-255 (0 = good contact, 200 = electrodes off skin)
    pub signal_quality: u8,
}

impl Default for Metrics {
    /// Attention and meditation start at the neutral midpoint so an
    /// unconnected headset never reads as a strong signal in one direction.
    fn default() -> Self {
        Self {
            attention: 50,
            meditation: 50,
            signal_quality: 0,
        }
    }
}

/// One decoded payload field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    SignalQuality(u8),
    Attention(u8),
    Meditation(u8),
    /// Sign-corrected raw EEG sample.
    RawSample(i32),
    /// Simple code this decoder does not model, kept for observability.
    Unknown { code: u8, value: u8 },
}

/// Live device state. Exactly one writer (the acquisition cycle); everyone
/// else reads by snapshot.
#[derive(Debug)]
pub(crate) struct DeviceState {
    pub(crate) metrics: Metrics,
    pub(crate) samples: SampleBuffer,
    pub(crate) unknown: HashMap<u8, u8>,
}

impl DeviceState {
    pub(crate) fn new(buffer_capacity: usize) -> Self {
        Self {
            metrics: Metrics::default(),
            samples: SampleBuffer::new(buffer_capacity),
            unknown: HashMap::new(),
        }
    }

    /// Apply every update from one packet. The caller holds the state lock
    /// for the whole call, which is what makes a packet atomic to readers.
    pub(crate) fn apply_packet(&mut self, updates: &[FieldUpdate]) {
        for update in updates {
            match *update {
                FieldUpdate::SignalQuality(v) => self.metrics.signal_quality = v,
                // Firmware occasionally emits out-of-range eSense values;
                // clamp rather than let them past the 0-100 contract.
                FieldUpdate::Attention(v) => self.metrics.attention = v.min(100),
                FieldUpdate::Meditation(v) => self.metrics.meditation = v.min(100),
                FieldUpdate::RawSample(v) => self.samples.push(v),
                FieldUpdate::Unknown { code, value } => {
                    self.unknown.insert(code, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metrics_are_neutral() {
        let metrics = Metrics::default();
        assert_eq!(metrics.attention, 50);
        assert_eq!(metrics.meditation, 50);
        assert_eq!(metrics.signal_quality, 0);
    }

    #[test]
    fn test_apply_packet_updates_every_field() {
        let mut state = DeviceState::new(8);
        state.apply_packet(&[
            FieldUpdate::SignalQuality(200),
            FieldUpdate::Attention(10),
            FieldUpdate::Meditation(90),
            FieldUpdate::RawSample(-42),
            FieldUpdate::Unknown { code: 0x16, value: 3 },
        ]);

        assert_eq!(state.metrics.signal_quality, 200);
        assert_eq!(state.metrics.attention, 10);
        assert_eq!(state.metrics.meditation, 90);
        assert_eq!(state.samples.latest(1), vec![-42]);
        assert_eq!(state.unknown.get(&0x16), Some(&3));
    }

    #[test]
    fn test_out_of_range_esense_values_are_clamped() {
        let mut state = DeviceState::new(8);
        state.apply_packet(&[FieldUpdate::Attention(255), FieldUpdate::Meditation(101)]);
        assert_eq!(state.metrics.attention, 100);
        assert_eq!(state.metrics.meditation, 100);
    }

    #[test]
    fn test_unknown_codes_never_touch_metrics() {
        let mut state = DeviceState::new(8);
        // 0x02/0x04/0x05 as *unknown* codes must not leak into metrics
        state.apply_packet(&[
            FieldUpdate::Unknown { code: 0x03, value: 7 },
            FieldUpdate::Unknown { code: 0x16, value: 1 },
        ]);
        assert_eq!(state.metrics, Metrics::default());
        assert_eq!(state.unknown.len(), 2);
    }
}
