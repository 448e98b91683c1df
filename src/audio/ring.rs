//! Lock-free PCM ring shared between the playback producer and the visualizer.
//!
//! Field ownership:
//! - `samples`: written only by the [`PcmWriter`], read by the visualizer.
//! - `bytes_written`: advanced only by the [`PcmWriter`] (Release), read by
//!   the visualizer (Acquire).
//!
//! The reader never mutates anything and tolerates slightly stale indices;
//! a window overwritten mid-copy is detected by re-reading the counter.

use std::sync::atomic::{AtomicI16, AtomicU64, Ordering};
use std::sync::Arc;

use crate::spectrum::energy::FFT_WINDOW;

/// Interleaved channels per sample frame, fixed at build time.
pub const CHANNELS: usize = 2;
/// Bytes per PCM sample (signed 16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;
/// Samples in one FFT window across all channels.
pub const WINDOW_SAMPLES: usize = FFT_WINDOW * CHANNELS;
/// Default ring length in analysis windows.
pub const RING_WINDOWS: usize = 128;

pub struct PcmRing {
    samples: Box<[AtomicI16]>,
    bytes_written: AtomicU64,
}

impl PcmRing {
    /// Creates a ring of `windows` whole FFT windows and its single writer.
    pub fn shared(windows: usize) -> (PcmWriter, Arc<PcmRing>) {
        let capacity = windows.max(1) * WINDOW_SAMPLES;
        let ring = Arc::new(PcmRing {
            samples: (0..capacity).map(|_| AtomicI16::new(0)).collect(),
            bytes_written: AtomicU64::new(0),
        });
        (PcmWriter { ring: Arc::clone(&ring) }, ring)
    }

    /// Capacity in samples; always a multiple of [`WINDOW_SAMPLES`].
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity_bytes(&self) -> u64 {
        (self.samples.len() * BYTES_PER_SAMPLE) as u64
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Acquire)
    }

    /// Live write index as an absolute sample count.
    pub fn samples_written(&self) -> u64 {
        self.bytes_written() / BYTES_PER_SAMPLE as u64
    }

    /// True while `[start, end)` has been produced and not yet overwritten.
    pub fn is_resident(&self, start: u64, end: u64) -> bool {
        let written = self.samples_written();
        start <= end && end <= written && written - start <= self.capacity() as u64
    }

    /// Copies samples starting at absolute index `start` into `out`.
    ///
    /// Returns `false` if the range was not resident before the copy or was
    /// overwritten while copying; `out` is unspecified in that case.
    pub fn read(&self, start: u64, out: &mut [i16]) -> bool {
        let end = start + out.len() as u64;
        if !self.is_resident(start, end) {
            return false;
        }

        let capacity = self.capacity() as u64;
        for (offset, dst) in out.iter_mut().enumerate() {
            let idx = ((start + offset as u64) % capacity) as usize;
            *dst = self.samples[idx].load(Ordering::Relaxed);
        }

        self.is_resident(start, end)
    }
}

/// The only handle allowed to append samples.
pub struct PcmWriter {
    ring: Arc<PcmRing>,
}

impl PcmWriter {
    /// Appends interleaved samples, overwriting the oldest data on wrap.
    pub fn write(&mut self, samples: &[i16]) {
        let ring = &self.ring;
        let capacity = ring.capacity() as u64;
        let start = ring.samples_written();
        for (offset, &sample) in samples.iter().enumerate() {
            let idx = ((start + offset as u64) % capacity) as usize;
            ring.samples[idx].store(sample, Ordering::Relaxed);
        }
        ring.bytes_written
            .fetch_add((samples.len() * BYTES_PER_SAMPLE) as u64, Ordering::Release);
    }
}
