//! Ordered, gap-free audio playback.
//!
//! Sentences are synthesized concurrently but must play in the order they
//! were cut from the stream. The queue hands out sequenced slots: a slot
//! is reserved synchronously at sentence-cut time, filled later from the
//! synthesis task, and consumed by the playback worker strictly in
//! reservation order. A slot filled with `None` (sanitizer rejection or
//! synthesis failure) is skipped without stalling its successors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{CompanionError, Result};

/// Decoded mono audio ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    /// Decode little-endian 16-bit PCM. A trailing odd byte is dropped.
    pub fn from_pcm16(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Where decoded clips go. The worker calls `play` once per clip, in
/// order; `play` blocks until the clip has been rendered or `stop` is set.
pub trait PlaybackSink: Send {
    fn play(&mut self, clip: &AudioClip, stop: &AtomicBool) -> Result<()>;
}

/// A reserved position in the playback order. Fill it exactly once;
/// dropping it unfilled is treated as `None` and the position is skipped.
pub struct AudioSlot {
    tx: oneshot::Sender<Option<AudioClip>>,
}

impl AudioSlot {
    /// Deliver the clip (or the lack of one) for this position.
    pub fn fill(self, clip: Option<AudioClip>) {
        // The queue may already be torn down; nothing to do then.
        let _ = self.tx.send(clip);
    }
}

/// Playback queue with a dedicated worker thread.
pub struct AudioPlaybackQueue {
    slots: Option<mpsc::Sender<oneshot::Receiver<Option<AudioClip>>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl AudioPlaybackQueue {
    /// Queue backed by the default output device.
    pub fn new() -> Result<Self> {
        Ok(Self::with_sink(Box::new(CpalSink::new()?)))
    }

    /// Queue backed by an arbitrary sink.
    pub fn with_sink(mut sink: Box<dyn PlaybackSink>) -> Self {
        let (slots_tx, slots_rx) = mpsc::channel::<oneshot::Receiver<Option<AudioClip>>>();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();
        let worker = std::thread::Builder::new()
            .name("audio-playback".into())
            .spawn(move || {
                while let Ok(slot) = slots_rx.recv() {
                    if worker_stop.load(Ordering::Relaxed) {
                        continue;
                    }
                    match slot.blocking_recv() {
                        Ok(Some(clip)) if !clip.is_empty() => {
                            debug!(duration_ms = clip.duration().as_millis() as u64, "playing clip");
                            if let Err(e) = sink.play(&clip, &worker_stop) {
                                warn!("playback failed, skipping clip: {e}");
                            }
                        }
                        // Unspeakable or failed sentence: skip, keep order.
                        Ok(_) | Err(_) => {}
                    }
                }
            })
            .ok();
        Self {
            slots: Some(slots_tx),
            stop,
            worker,
        }
    }

    /// Reserve the next playback position. Call synchronously at
    /// sentence-cut time so positions match submission order.
    pub fn reserve(&self) -> AudioSlot {
        let (tx, rx) = oneshot::channel();
        match &self.slots {
            Some(slots) if slots.send(rx).is_ok() => {}
            _ => warn!("playback worker is gone; slot will be discarded"),
        }
        AudioSlot { tx }
    }

    /// Drain remaining slots and join the worker.
    pub fn shutdown(&mut self) {
        drop(self.slots.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Cut current playback short, discard queued slots, and join the
    /// worker.
    pub fn interrupt(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.shutdown();
    }
}

impl Drop for AudioPlaybackQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Sink that discards clips. Used when no output device exists so the
/// rest of the pipeline keeps its ordering behavior.
#[derive(Debug, Default)]
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn play(&mut self, _clip: &AudioClip, _stop: &AtomicBool) -> Result<()> {
        Ok(())
    }
}

/// Sink rendering through the default cpal output device.
pub struct CpalSink {
    device: cpal::Device,
    channels: u16,
    device_rate: u32,
}

impl CpalSink {
    pub fn new() -> Result<Self> {
        use cpal::traits::{DeviceTrait, HostTrait};
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| CompanionError::Audio("no output device available".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| CompanionError::Audio(format!("output config: {e}")))?;
        Ok(Self {
            channels: config.channels(),
            device_rate: config.sample_rate(),
            device,
        })
    }

    /// Nearest-sample resample from the clip rate to the device rate.
    fn resample(&self, clip: &AudioClip) -> Vec<f32> {
        if clip.sample_rate == self.device_rate || clip.sample_rate == 0 {
            return clip.samples.clone();
        }
        let ratio = clip.sample_rate as f64 / self.device_rate as f64;
        let out_len = (clip.samples.len() as f64 / ratio) as usize;
        (0..out_len)
            .map(|i| {
                let src = ((i as f64 * ratio) as usize).min(clip.samples.len() - 1);
                clip.samples[src]
            })
            .collect()
    }
}

impl PlaybackSink for CpalSink {
    fn play(&mut self, clip: &AudioClip, stop: &AtomicBool) -> Result<()> {
        use cpal::traits::{DeviceTrait, StreamTrait};

        let samples = Arc::new(self.resample(clip));
        let total = samples.len();
        if total == 0 {
            return Ok(());
        }
        let position = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let stream_pos = position.clone();
        let stream_samples = samples.clone();
        let channels = self.channels as usize;

        let config = cpal::StreamConfig {
            channels: self.channels,
            sample_rate: self.device_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        let stream = self
            .device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _| {
                    for frame in out.chunks_mut(channels) {
                        let i = stream_pos.fetch_add(1, Ordering::Relaxed);
                        let sample = stream_samples.get(i).copied().unwrap_or(0.0);
                        for slot in frame {
                            *slot = sample;
                        }
                    }
                },
                |e| warn!("output stream error: {e}"),
                None,
            )
            .map_err(|e| CompanionError::Audio(format!("build stream: {e}")))?;
        stream
            .play()
            .map_err(|e| CompanionError::Audio(format!("start stream: {e}")))?;

        while position.load(Ordering::Relaxed) < total && !stop.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        played: Arc<Mutex<Vec<usize>>>,
    }

    impl PlaybackSink for RecordingSink {
        fn play(&mut self, clip: &AudioClip, _stop: &AtomicBool) -> Result<()> {
            if let Ok(mut played) = self.played.lock() {
                played.push(clip.samples.len());
            }
            Ok(())
        }
    }

    fn clip_of_len(len: usize) -> AudioClip {
        AudioClip {
            samples: vec![0.25; len],
            sample_rate: 24_000,
        }
    }

    #[test]
    fn pcm16_decodes_to_unit_range() {
        let bytes = [0x00, 0x40, 0x00, 0xC0, 0xFF]; // +0.5, -0.5, odd tail
        let clip = AudioClip::from_pcm16(&bytes, 24_000);
        assert_eq!(clip.samples.len(), 2);
        assert!((clip.samples[0] - 0.5).abs() < 0.001);
        assert!((clip.samples[1] + 0.5).abs() < 0.001);
    }

    #[test]
    fn duration_reflects_sample_count() {
        let clip = clip_of_len(12_000);
        assert_eq!(clip.duration(), Duration::from_millis(500));
    }

    #[test]
    fn slots_play_in_reservation_order_despite_fill_order() {
        let played = Arc::new(Mutex::new(Vec::new()));
        let mut queue = AudioPlaybackQueue::with_sink(Box::new(RecordingSink {
            played: played.clone(),
        }));

        let first = queue.reserve();
        let second = queue.reserve();
        let third = queue.reserve();

        // Fill out of order, as concurrent synthesis would.
        third.fill(Some(clip_of_len(3)));
        first.fill(Some(clip_of_len(1)));
        second.fill(Some(clip_of_len(2)));

        queue.shutdown();
        let order = played.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn failed_slot_is_skipped_without_stalling() {
        let played = Arc::new(Mutex::new(Vec::new()));
        let mut queue = AudioPlaybackQueue::with_sink(Box::new(RecordingSink {
            played: played.clone(),
        }));

        let first = queue.reserve();
        let second = queue.reserve();
        let third = queue.reserve();

        first.fill(Some(clip_of_len(1)));
        second.fill(None);
        drop(third); // abandoned slot behaves like None

        let fourth = queue.reserve();
        fourth.fill(Some(clip_of_len(4)));

        queue.shutdown();
        let order = played.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(order, vec![1, 4]);
    }

    struct BlockingSink {
        entered: Arc<AtomicBool>,
        played: Arc<Mutex<Vec<usize>>>,
    }

    impl PlaybackSink for BlockingSink {
        fn play(&mut self, clip: &AudioClip, stop: &AtomicBool) -> Result<()> {
            if let Ok(mut played) = self.played.lock() {
                played.push(clip.samples.len());
            }
            self.entered.store(true, Ordering::SeqCst);
            while !stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        }
    }

    #[test]
    fn interrupt_cuts_playback_and_discards_queued_slots() {
        let entered = Arc::new(AtomicBool::new(false));
        let played = Arc::new(Mutex::new(Vec::new()));
        let mut queue = AudioPlaybackQueue::with_sink(Box::new(BlockingSink {
            entered: entered.clone(),
            played: played.clone(),
        }));

        let first = queue.reserve();
        first.fill(Some(clip_of_len(1)));
        while !entered.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        let second = queue.reserve();
        second.fill(Some(clip_of_len(2)));

        queue.interrupt();
        let order = played.lock().map(|p| p.clone()).unwrap_or_default();
        assert_eq!(order, vec![1]);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut queue = AudioPlaybackQueue::with_sink(Box::new(RecordingSink {
            played: Arc::new(Mutex::new(Vec::new())),
        }));
        queue.shutdown();
        queue.shutdown();
    }
}
