use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::models::frame::AudioFrame;
use crate::traits::audio_sink::AudioSink;

/// Default depth cap: 50 frames, i.e. 500ms of audio.
pub const DEFAULT_TAP_CAPACITY: usize = 50;

/// Thread-safe bounded FIFO of frames copied off a tap point.
///
/// The real-time thread pushes, the remix worker pops. Both sides only hold
/// the lock for a queue operation, so a push never waits on the consumer.
///
/// Overflow behavior: drops the oldest frame and counts the drop.
/// Frames drain in insertion order regardless of their timestamps.
#[derive(Debug)]
pub struct TapSink {
    frames: Mutex<VecDeque<AudioFrame>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl TapSink {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TAP_CAPACITY)
    }

    /// A sink holding at most `capacity` frames (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a frame, evicting the oldest one if the sink is full.
    pub fn push(&self, frame: AudioFrame) {
        let evicted = {
            let mut frames = self.frames.lock();
            let evicted = if frames.len() >= self.capacity {
                frames.pop_front()
            } else {
                None
            };
            frames.push_back(frame);
            evicted
        };

        // Drop the evicted frame outside the lock.
        if evicted.is_some() {
            let previous = self.dropped.fetch_add(1, Ordering::Relaxed);
            if previous == 0 {
                log::warn!("Tap sink full ({} frames), dropping oldest", self.capacity);
            }
        }
    }

    /// Remove and return the oldest frame, if any.
    pub fn pop(&self) -> Option<AudioFrame> {
        self.frames.lock().pop_front()
    }

    /// Discard every buffered frame.
    pub fn reset(&self) {
        let drained = std::mem::take(&mut *self.frames.lock());
        drop(drained);
    }

    /// Number of frames currently buffered.
    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames evicted by overflow since creation.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for TapSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for TapSink {
    fn on_data(&self, frame: &AudioFrame) {
        self.push(frame.clone());
    }
}
