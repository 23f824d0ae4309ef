// src/io/thinkgear/reader.rs
//
// EEG device handle and acquisition loop.
//
// Two ways to drive decoding, matching how consumers run:
//   - polled: the caller invokes poll_once() from its own loop and decoding
//     happens inline, sequenced by the caller
//   - autonomous: start() spawns a reader thread that polls continuously
//     until stop(), which joins before returning

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::EegConfig;
use crate::diagnostics::{DecodeStats, DecodeStatsSnapshot};
use crate::io::error::AcquireError;
use crate::io::serial::{ByteSource, SerialByteSource};
use crate::io::DeviceStatus;

use super::codec::{decode_payload, FrameReader};
use super::types::{DeviceState, Metrics};

/// State shared between the device handle and the acquisition thread.
struct Shared {
    state: Mutex<DeviceState>,
    stats: DecodeStats,
    cancel: AtomicBool,
}

/// Handle to one EEG headset.
///
/// All accessors return point-in-time copies; nothing hands out references
/// into the state the acquisition thread is mutating.
pub struct EegDevice<S: ByteSource = SerialByteSource> {
    config: EegConfig,
    shared: Arc<Shared>,
    /// Present while Idle; moves into the reader thread while Running.
    reader: Option<FrameReader<S>>,
    task: Option<JoinHandle<(FrameReader<S>, &'static str)>>,
    status: DeviceStatus,
}

impl EegDevice<SerialByteSource> {
    /// Open the serial transport and build an idle device.
    pub fn open(config: EegConfig) -> Result<Self, AcquireError> {
        // Short per-read timeout so the frame reader can interleave its own
        // deadline checks (the whole-frame budget lives in the config).
        let chunk_timeout = Duration::from_millis(50).min(config.read_timeout());
        let source = SerialByteSource::open(&config.port, config.baud_rate, chunk_timeout)?;
        tlog!(
            "[ThinkGear:{}] Opened at {} baud (buffer: {} samples)",
            config.port,
            config.baud_rate,
            config.buffer_capacity()
        );
        Ok(Self::with_source(config, source))
    }
}

impl<S: ByteSource + 'static> EegDevice<S> {
    /// Wire a device over any byte source (tests, captures, bridges).
    pub fn with_source(config: EegConfig, source: S) -> Self {
        let reader = FrameReader::new(source, config.read_timeout());
        let shared = Arc::new(Shared {
            state: Mutex::new(DeviceState::new(config.buffer_capacity())),
            stats: DecodeStats::default(),
            cancel: AtomicBool::new(false),
        });
        Self {
            config,
            shared,
            reader: Some(reader),
            task: None,
            status: DeviceStatus::Idle,
        }
    }

    /// Run exactly one read-decode-apply cycle on the caller's thread.
    ///
    /// Blocks at most the configured read timeout. Per-cycle errors are
    /// returned *and* counted in the diagnostics; prior state is untouched.
    pub fn poll_once(&mut self) -> Result<(), AcquireError> {
        match self.status {
            DeviceStatus::Running => {
                return Err(AcquireError::Usage(
                    "poll_once while the acquisition thread is running",
                ))
            }
            DeviceStatus::Closed => return Err(AcquireError::Usage("device is closed")),
            DeviceStatus::Idle => {}
        }
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return Err(AcquireError::Usage("device has no frame reader")),
        };
        run_cycle(reader, &self.shared)
    }

    /// Launch the background acquisition thread.
    pub fn start(&mut self) -> Result<(), AcquireError> {
        match self.status {
            DeviceStatus::Running => {
                return Err(AcquireError::Usage("acquisition thread is already running"))
            }
            DeviceStatus::Closed => return Err(AcquireError::Usage("device is closed")),
            DeviceStatus::Idle => {}
        }
        let reader = match self.reader.take() {
            Some(r) => r,
            None => return Err(AcquireError::Usage("device has no frame reader")),
        };

        self.shared.cancel.store(false, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        let poll_interval = self.config.poll_interval();
        let port = self.config.port.clone();

        let handle = thread::Builder::new()
            .name("thinkgear-reader".to_string())
            .spawn(move || run_acquisition(reader, shared, poll_interval, port))
            .map_err(AcquireError::Io)?;

        self.task = Some(handle);
        self.status = DeviceStatus::Running;
        Ok(())
    }

    /// Stop the background thread, joining it before returning, and take
    /// the frame reader back so polled mode works again.
    ///
    /// Idempotent: calling with nothing running is a no-op.
    pub fn stop(&mut self) -> Result<(), AcquireError> {
        self.shared.cancel.store(true, Ordering::Relaxed);

        if let Some(handle) = self.task.take() {
            match handle.join() {
                Ok((reader, reason)) => {
                    tlog!(
                        "[ThinkGear:{}] Acquisition stopped (reason: {})",
                        self.config.port,
                        reason
                    );
                    self.reader = Some(reader);
                }
                Err(_) => return Err(AcquireError::Usage("acquisition thread panicked")),
            }
        }

        if self.status == DeviceStatus::Running {
            self.status = DeviceStatus::Idle;
        }
        Ok(())
    }

    /// Point-in-time copy of the latest metrics.
    pub fn current_metrics(&self) -> Metrics {
        self.shared.state.lock().unwrap().metrics.clone()
    }

    /// The last `n` raw samples, oldest first.
    pub fn recent_samples(&self, n: usize) -> Vec<i32> {
        self.shared.state.lock().unwrap().samples.latest(n)
    }

    /// Number of raw samples currently buffered.
    pub fn sample_count(&self) -> usize {
        self.shared.state.lock().unwrap().samples.len()
    }

    /// Latest values seen for simple codes this decoder does not model.
    pub fn unknown_fields(&self) -> HashMap<u8, u8> {
        self.shared.state.lock().unwrap().unknown.clone()
    }

    /// Decode-path diagnostics counters.
    pub fn stats(&self) -> DecodeStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Stop acquisition (if running) and release the transport.
    ///
    /// Safe to call multiple times; after the first call the device is
    /// terminal and polling or starting is a usage error.
    pub fn close(&mut self) -> Result<(), AcquireError> {
        if self.status == DeviceStatus::Closed {
            return Ok(());
        }
        self.stop()?;
        // Dropping the reader drops the byte source and with it the port
        self.reader = None;
        self.status = DeviceStatus::Closed;
        tlog!("[ThinkGear:{}] Closed", self.config.port);
        Ok(())
    }
}

impl<S: ByteSource> Drop for EegDevice<S> {
    fn drop(&mut self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.task.take() {
            let _ = handle.join();
        }
    }
}

/// One frame-read, decode, state-apply cycle.
///
/// The state lock is taken once per packet and every field update is
/// applied under it, so readers observe packets fully or not at all.
fn run_cycle<S: ByteSource>(
    reader: &mut FrameReader<S>,
    shared: &Shared,
) -> Result<(), AcquireError> {
    let outcome = reader
        .read_packet()
        .and_then(|payload| decode_payload(&payload));
    shared.stats.add_discarded(reader.take_discarded());

    match outcome {
        Ok(updates) => {
            shared.state.lock().unwrap().apply_packet(&updates);
            shared.stats.record_ok();
            Ok(())
        }
        Err(err) => {
            shared.stats.record_error(&err);
            Err(err)
        }
    }
}

/// Body of the background acquisition thread.
///
/// Per-cycle framing errors are counted and swallowed; a noisy sensor link
/// must not end acquisition. Only cancellation, a dead transport, or an
/// unexpected I/O failure exits the loop. Returns the frame reader so the
/// handle can resume polled operation, plus the reason the loop ended.
fn run_acquisition<S: ByteSource>(
    mut reader: FrameReader<S>,
    shared: Arc<Shared>,
    poll_interval: Duration,
    port: String,
) -> (FrameReader<S>, &'static str) {
    tlog!("[ThinkGear:{}] Acquisition thread started", port);

    let reason;
    loop {
        if shared.cancel.load(Ordering::Relaxed) {
            reason = "stopped";
            break;
        }

        match run_cycle(&mut reader, &shared) {
            Ok(()) => {}
            Err(err) if err.is_transient() => {
                // Counted by run_cycle; keep acquiring
            }
            Err(AcquireError::Disconnected) => {
                tlog!("[ThinkGear:{}] Transport disconnected", port);
                reason = "disconnected";
                break;
            }
            Err(err) => {
                tlog!("[ThinkGear:{}] Read error: {}", port, err);
                reason = "error";
                break;
            }
        }

        thread::sleep(poll_interval);
    }

    (reader, reason)
}
