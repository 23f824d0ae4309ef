// src/io/thinkgear/codec.rs
//
// ThinkGear framing and payload decoding.
//
// Payload field table:
//   0x02 <value>          signal quality, 0-255
//   0x04 <value>          attention, 0-100
//   0x05 <value>          meditation, 0-100
//   0x80 0x02 <hi> <lo>   raw EEG sample, big-endian u16, sign-corrected
//   other < 0x80          one value byte, surfaced as Unknown
//   other >= 0x80         one length byte + that many data bytes, skipped

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use hex::ToHex;

use crate::checksums::payload_checksum;
use crate::io::error::AcquireError;
use crate::io::serial::ByteSource;

use super::types::FieldUpdate;

/// Protocol constants.
pub mod constants {
    /// Frame synchronization byte; two in a row start a frame.
    pub const SYNC: u8 = 0xAA;
    /// Simple code: contact/signal quality.
    pub const CODE_SIGNAL_QUALITY: u8 = 0x02;
    /// Simple code: attention eSense.
    pub const CODE_ATTENTION: u8 = 0x04;
    /// Simple code: meditation eSense.
    pub const CODE_MEDITATION: u8 = 0x05;
    /// Extended code: raw EEG sample (length 2).
    pub const CODE_RAW_SAMPLE: u8 = 0x80;
    /// Codes at or above this carry an explicit length byte.
    pub const EXTENDED_CODE_BASE: u8 = 0x80;
    /// Wire values above this wrap into the negative range.
    pub const RAW_SIGN_PIVOT: i32 = 32_768;
    /// Carry-over buffer bound while hunting for sync.
    pub const RESYNC_BUFFER_LIMIT: usize = 1024;
}

use constants::*;

/// Position of the first sync pair in `buf`.
fn find_sync(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == [SYNC, SYNC])
}

/// Pulls framed payloads out of a byte stream.
///
/// Resynchronizes by scanning: anything in front of a 0xAA 0xAA pair is
/// discarded, so bus noise and partial reads cost one frame at worst, not
/// the whole stream. One `read_packet` call blocks at most `read_timeout`.
pub struct FrameReader<S: ByteSource> {
    source: S,
    /// Bytes read from the source but not yet consumed by a frame.
    pending: Vec<u8>,
    read_timeout: Duration,
    /// Noise bytes dropped since the last `take_discarded`.
    discarded: u64,
}

impl<S: ByteSource> FrameReader<S> {
    pub fn new(source: S, read_timeout: Duration) -> Self {
        Self {
            source,
            pending: Vec::with_capacity(RESYNC_BUFFER_LIMIT),
            read_timeout,
            discarded: 0,
        }
    }

    /// Read one validated payload from the stream.
    ///
    /// Scans for the sync pair, reads the length byte, the payload, and the
    /// checksum byte, and verifies the checksum. Leftover bytes stay
    /// buffered for the next call.
    pub fn read_packet(&mut self) -> Result<Vec<u8>, AcquireError> {
        let deadline = Instant::now() + self.read_timeout;

        loop {
            if let Some(pos) = find_sync(&self.pending) {
                // Discard noise in front of the sync pair
                if pos > 0 {
                    self.discarded += pos as u64;
                    self.pending.drain(..pos);
                }

                // Sync pair + length byte
                if self.pending.len() < 3 {
                    if !self.fill(deadline)? {
                        return Err(AcquireError::IncompletePayload {
                            expected: 1,
                            got: 0,
                        });
                    }
                    continue;
                }

                let len = self.pending[2] as usize;
                let total = 3 + len + 1;
                if self.pending.len() < total {
                    if !self.fill(deadline)? {
                        return Err(AcquireError::IncompletePayload {
                            expected: len + 1,
                            got: self.pending.len() - 3,
                        });
                    }
                    continue;
                }

                let frame: Vec<u8> = self.pending.drain(..total).collect();
                let payload = frame[3..3 + len].to_vec();
                let got = frame[3 + len];
                let expected = payload_checksum(&payload);
                if got != expected {
                    self.discarded += total as u64;
                    tlog!(
                        "[ThinkGear] Checksum mismatch ({:02X} != {:02X}), dropping payload {}",
                        got,
                        expected,
                        payload.encode_hex::<String>()
                    );
                    return Err(AcquireError::ChecksumMismatch { expected, got });
                }
                return Ok(payload);
            }

            // No sync pair yet. Keep the tail bounded; only the last byte
            // can still complete a pair with the next read.
            if self.pending.len() > RESYNC_BUFFER_LIMIT {
                let drop = self.pending.len() - 1;
                self.discarded += drop as u64;
                self.pending.drain(..drop);
            }
            if !self.fill(deadline)? {
                return Err(AcquireError::SyncTimeout);
            }
        }
    }

    /// Pull one chunk from the source into the carry-over buffer.
    /// Returns false once the deadline has passed with no new bytes.
    fn fill(&mut self, deadline: Instant) -> Result<bool, AcquireError> {
        let mut chunk = [0u8; 256];
        loop {
            if Instant::now() >= deadline {
                return Ok(false);
            }
            match self.source.read(&mut chunk) {
                Ok(0) => return Err(AcquireError::Disconnected),
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut => {
                    // Expected for serial reads; loop back to the deadline check
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(AcquireError::Io(e)),
            }
        }
    }

    /// Noise bytes dropped since the last call. The acquisition loop folds
    /// this into the diagnostics counters after each cycle.
    pub fn take_discarded(&mut self) -> u64 {
        std::mem::take(&mut self.discarded)
    }
}

/// Decode one validated payload into field updates.
///
/// Walks the payload left to right. Any field whose declared length would
/// read past the end fails with `TruncatedPayload` without touching any
/// state; the caller simply drops the packet.
pub fn decode_payload(payload: &[u8]) -> Result<Vec<FieldUpdate>, AcquireError> {
    let mut updates = Vec::new();
    let mut i = 0;

    while i < payload.len() {
        let code = payload[i];
        i += 1;

        if code >= EXTENDED_CODE_BASE {
            if i >= payload.len() {
                return Err(AcquireError::TruncatedPayload {
                    code,
                    needed: 1,
                    remaining: 0,
                });
            }
            let len = payload[i] as usize;
            i += 1;

            if i + len > payload.len() {
                return Err(AcquireError::TruncatedPayload {
                    code,
                    needed: len,
                    remaining: payload.len() - i,
                });
            }

            if code == CODE_RAW_SAMPLE && len == 2 {
                let wire = i32::from(u16::from_be_bytes([payload[i], payload[i + 1]]));
                let sample = if wire > RAW_SIGN_PIVOT {
                    wire - 65_536
                } else {
                    wire
                };
                updates.push(FieldUpdate::RawSample(sample));
            }
            // Other extended codes declare their own length; skip them
            i += len;
        } else {
            if i >= payload.len() {
                return Err(AcquireError::TruncatedPayload {
                    code,
                    needed: 1,
                    remaining: 0,
                });
            }
            let value = payload[i];
            i += 1;

            updates.push(match code {
                CODE_SIGNAL_QUALITY => FieldUpdate::SignalQuality(value),
                CODE_ATTENTION => FieldUpdate::Attention(value),
                CODE_MEDITATION => FieldUpdate::Meditation(value),
                _ => FieldUpdate::Unknown { code, value },
            });
        }
    }

    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::serial::testing::{Exhausted, ScriptedSource};

    /// Encoder-side framing: sync pair, length, payload, checksum.
    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![SYNC, SYNC, payload.len() as u8];
        out.extend_from_slice(payload);
        out.push(payload_checksum(payload));
        out
    }

    fn reader_over(bytes: Vec<u8>) -> FrameReader<ScriptedSource> {
        FrameReader::new(
            ScriptedSource::new(bytes, Exhausted::TimedOut),
            Duration::from_millis(20),
        )
    }

    #[test]
    fn test_read_packet_happy_path() {
        let payload = [0x04, 0x37];
        let mut reader = reader_over(frame(&payload));
        assert_eq!(reader.read_packet().unwrap(), payload);
        assert_eq!(reader.take_discarded(), 0);
    }

    #[test]
    fn test_read_packet_resyncs_over_leading_noise() {
        let mut bytes = vec![0x13, 0x37, 0xAA, 0x00, 0xFE];
        bytes.extend(frame(&[0x05, 0x59]));
        let mut reader = reader_over(bytes);
        assert_eq!(reader.read_packet().unwrap(), vec![0x05, 0x59]);
        assert_eq!(reader.take_discarded(), 5);
    }

    #[test]
    fn test_read_packet_across_chunk_boundaries() {
        // One byte per read still yields the frame
        let source =
            ScriptedSource::new(frame(&[0x02, 0x64, 0x04, 0x37]), Exhausted::TimedOut)
                .with_chunk_size(1);
        let mut reader = FrameReader::new(source, Duration::from_millis(50));
        assert_eq!(reader.read_packet().unwrap(), vec![0x02, 0x64, 0x04, 0x37]);
    }

    #[test]
    fn test_consecutive_packets_from_one_stream() {
        let mut bytes = frame(&[0x04, 0x0A]);
        bytes.extend(frame(&[0x04, 0x5A]));
        let mut reader = reader_over(bytes);
        assert_eq!(reader.read_packet().unwrap(), vec![0x04, 0x0A]);
        assert_eq!(reader.read_packet().unwrap(), vec![0x04, 0x5A]);
    }

    #[test]
    fn test_silence_times_out() {
        let mut reader = reader_over(vec![]);
        assert!(matches!(
            reader.read_packet(),
            Err(AcquireError::SyncTimeout)
        ));
    }

    #[test]
    fn test_truncated_frame_reports_incomplete_payload() {
        // Length byte promises 4 payload bytes, only 2 arrive
        let mut reader = reader_over(vec![SYNC, SYNC, 0x04, 0x02, 0x64]);
        match reader.read_packet() {
            Err(AcquireError::IncompletePayload { expected, got }) => {
                assert_eq!(expected, 5); // 4 payload + checksum
                assert_eq!(got, 2);
            }
            other => panic!("expected IncompletePayload, got {:?}", other),
        }
    }

    #[test]
    fn test_checksum_mismatch_drops_frame_only() {
        let mut bad = frame(&[0x04, 0x37]);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        bad.extend(frame(&[0x05, 0x59]));

        let mut reader = reader_over(bad);
        assert!(matches!(
            reader.read_packet(),
            Err(AcquireError::ChecksumMismatch { .. })
        ));
        // The stream recovers on the next frame
        assert_eq!(reader.read_packet().unwrap(), vec![0x05, 0x59]);
    }

    #[test]
    fn test_disconnect_is_fatal() {
        let source = ScriptedSource::new(vec![], Exhausted::Disconnected);
        let mut reader = FrameReader::new(source, Duration::from_millis(20));
        assert!(matches!(
            reader.read_packet(),
            Err(AcquireError::Disconnected)
        ));
    }

    #[test]
    fn test_decode_metrics_payload() {
        let updates = decode_payload(&[0x02, 0x64, 0x04, 0x37, 0x05, 0x59]).unwrap();
        assert_eq!(
            updates,
            vec![
                FieldUpdate::SignalQuality(100),
                FieldUpdate::Attention(55),
                FieldUpdate::Meditation(89),
            ]
        );
    }

    #[test]
    fn test_decode_raw_sample_positive() {
        let updates = decode_payload(&[0x80, 0x02, 0x01, 0x02]).unwrap();
        assert_eq!(updates, vec![FieldUpdate::RawSample(0x0102)]);
    }

    #[test]
    fn test_decode_raw_sample_sign_correction() {
        // 0xFFFF wraps to -1
        let updates = decode_payload(&[0x80, 0x02, 0xFF, 0xFF]).unwrap();
        assert_eq!(updates, vec![FieldUpdate::RawSample(-1)]);

        // 0x8001 wraps to -32767
        let updates = decode_payload(&[0x80, 0x02, 0x80, 0x01]).unwrap();
        assert_eq!(updates, vec![FieldUpdate::RawSample(-32_767)]);
    }

    #[test]
    fn test_decode_raw_sample_boundary_value_stays_positive() {
        // Only values strictly above 32768 are sign-corrected; the boundary
        // value itself passes through unchanged
        let updates = decode_payload(&[0x80, 0x02, 0x80, 0x00]).unwrap();
        assert_eq!(updates, vec![FieldUpdate::RawSample(32_768)]);
    }

    #[test]
    fn test_decode_unknown_simple_code_is_kept() {
        let updates = decode_payload(&[0x16, 0x02]).unwrap();
        assert_eq!(
            updates,
            vec![FieldUpdate::Unknown {
                code: 0x16,
                value: 0x02
            }]
        );
    }

    #[test]
    fn test_decode_unknown_extended_code_is_skipped_by_length() {
        // 0x83 (EEG power bands) with 3 data bytes, followed by attention
        let updates = decode_payload(&[0x83, 0x03, 0x01, 0x02, 0x03, 0x04, 0x2A]).unwrap();
        assert_eq!(updates, vec![FieldUpdate::Attention(42)]);
    }

    #[test]
    fn test_decode_raw_code_with_unexpected_length_is_skipped() {
        // 0x80 with length 4 is not a raw sample; skip it, keep walking
        let updates = decode_payload(&[0x80, 0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x07]).unwrap();
        assert_eq!(updates, vec![FieldUpdate::Meditation(7)]);
    }

    #[test]
    fn test_decode_truncated_extended_field() {
        // Declared length 5, only 1 byte remains
        let err = decode_payload(&[0x83, 0x05, 0x01]).unwrap_err();
        match err {
            AcquireError::TruncatedPayload {
                code,
                needed,
                remaining,
            } => {
                assert_eq!(code, 0x83);
                assert_eq!(needed, 5);
                assert_eq!(remaining, 1);
            }
            other => panic!("expected TruncatedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_truncated_simple_field() {
        let err = decode_payload(&[0x04]).unwrap_err();
        assert!(matches!(
            err,
            AcquireError::TruncatedPayload { code: 0x04, .. }
        ));
    }

    #[test]
    fn test_decode_extended_code_missing_length_byte() {
        let err = decode_payload(&[0x83]).unwrap_err();
        assert!(matches!(
            err,
            AcquireError::TruncatedPayload { code: 0x83, .. }
        ));
    }

    #[test]
    fn test_decode_empty_payload_yields_no_updates() {
        assert!(decode_payload(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_framed_checksum_roundtrip_for_generated_payloads() {
        // Every encoder-side frame validates when read back
        for len in 0..8usize {
            let payload: Vec<u8> = (0..len as u8).map(|b| b.wrapping_mul(37)).collect();
            let mut reader = reader_over(frame(&payload));
            assert_eq!(reader.read_packet().unwrap(), payload);
        }
    }
}
