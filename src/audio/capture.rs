//! Clock-synchronized selection of the analysis windows that are audible "now".

use std::time::Duration;

use super::ring::{PcmRing, BYTES_PER_SAMPLE, CHANNELS, WINDOW_SAMPLES};
use crate::error::{Result, VisualizerError};
use crate::river::history::LOOKBACK;

/// Output latency compensation applied on top of the measured lag.
pub const DEFAULT_LEAD: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamFormat {
    pub fn bytes_per_second(&self) -> u64 {
        BYTES_PER_SAMPLE as u64 * self.channels as u64 * self.sample_rate as u64
    }

    fn frame_bytes(&self) -> u64 {
        BYTES_PER_SAMPLE as u64 * self.channels as u64
    }
}

/// Why a tick produced no new windows. None of these are faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not enough audio has been played to fill one window.
    AwaitingHistory,
    /// The producer is more than a full ring ahead of the clock.
    Desynchronized,
    /// The audible window was already processed.
    NoNewWindow,
    /// The audible window was overwritten before it could be read.
    Overrun,
}

/// Half-open range of window-aligned absolute sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpan {
    pub start: u64,
    pub end: u64,
}

impl WindowSpan {
    /// Start marks of every window in the span, oldest first.
    pub fn marks(&self) -> impl Iterator<Item = u64> {
        (self.start..self.end).step_by(WINDOW_SAMPLES)
    }

    pub fn latest_mark(&self) -> u64 {
        self.end - WINDOW_SAMPLES as u64
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePoll {
    Ready(WindowSpan),
    Skip(SkipReason),
}

pub struct SampleCapture {
    format: Option<StreamFormat>,
    lead: Duration,
    started_at: Option<Duration>,
    /// Bytes folded in whenever the producer fell behind the clock.
    adjustment: i64,
    next_window: Option<u64>,
}

impl SampleCapture {
    pub fn new(lead: Duration) -> Self {
        Self {
            format: None,
            lead,
            started_at: None,
            adjustment: 0,
            next_window: None,
        }
    }

    pub fn configure(&mut self, format: StreamFormat) -> Result<()> {
        if format.channels as usize != CHANNELS || format.sample_rate == 0 {
            return Err(VisualizerError::UnsupportedFormat {
                sample_rate: format.sample_rate,
                channels: format.channels,
            });
        }
        log::debug!("Capture configured: {} Hz, {} channels", format.sample_rate, format.channels);
        self.format = Some(format);
        Ok(())
    }

    pub fn format(&self) -> Option<StreamFormat> {
        self.format
    }

    /// Forgets the clock origin, drift correction and read cursor.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.adjustment = 0;
        self.next_window = None;
    }

    /// Resets and takes `now` as the moment playback of the counted bytes began.
    ///
    /// Without an explicit start the origin is the first `poll`.
    pub fn start(&mut self, now: Duration) {
        self.reset();
        self.started_at = Some(now);
    }

    #[cfg(test)]
    pub fn adjustment(&self) -> i64 {
        self.adjustment
    }

    /// Picks the unprocessed windows up to the currently audible position.
    pub fn poll(&mut self, ring: &PcmRing, now: Duration) -> Result<CapturePoll> {
        let format = self.format.ok_or(VisualizerError::NotConfigured)?;
        let started_at = *self.started_at.get_or_insert(now);

        let bytes_per_second = format.bytes_per_second();
        let elapsed = bytes_over(bytes_per_second, now.saturating_sub(started_at)) as i64;
        let total = ring.bytes_written() as i64;

        let mut lag = self.adjustment + total - elapsed;
        if lag < 0 {
            log::trace!("Producer behind clock by {} bytes", -lag);
            self.adjustment -= lag;
            lag = 0;
        }
        if lag as u64 > ring.capacity_bytes() {
            log::debug!("Capture desynchronized: lag {} bytes exceeds ring", lag);
            return Ok(CapturePoll::Skip(SkipReason::Desynchronized));
        }

        let frame_bytes = format.frame_bytes();
        let lead = bytes_over(bytes_per_second, self.lead);
        let lag = lag as u64 + lead - lead % frame_bytes;

        let total_samples = total as u64 / BYTES_PER_SAMPLE as u64;
        let Some(audible) = total_samples.checked_sub(lag / BYTES_PER_SAMPLE as u64) else {
            return Ok(CapturePoll::Skip(SkipReason::AwaitingHistory));
        };

        let window = WINDOW_SAMPLES as u64;
        let boundary = audible - audible % window;
        if boundary < window {
            return Ok(CapturePoll::Skip(SkipReason::AwaitingHistory));
        }

        // The boundary comes from the same counter that publishes samples, so
        // it never runs ahead of the live write index.
        let live = ring.samples_written();
        debug_assert!(boundary <= live);

        let mut start = self.next_window.unwrap_or(boundary - window);
        if start >= boundary {
            return Ok(CapturePoll::Skip(SkipReason::NoNewWindow));
        }

        let oldest = live.saturating_sub(ring.capacity() as u64).div_ceil(window) * window;
        if boundary - window < oldest {
            self.next_window = Some(boundary);
            return Ok(CapturePoll::Skip(SkipReason::Overrun));
        }
        if start < oldest {
            log::debug!("Ring overran read cursor; skipping {} windows", (oldest - start) / window);
            start = oldest;
        }
        start = start.max(boundary.saturating_sub(LOOKBACK as u64 * window));

        self.next_window = Some(boundary);
        Ok(CapturePoll::Ready(WindowSpan { start, end: boundary }))
    }
}

fn bytes_over(bytes_per_second: u64, span: Duration) -> u64 {
    (bytes_per_second as u128 * span.as_nanos() / 1_000_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ring::PcmWriter;
    use std::sync::Arc;

    const FORMAT: StreamFormat = StreamFormat { sample_rate: 44_100, channels: 2 };

    fn setup(windows: usize) -> (SampleCapture, PcmWriter, Arc<PcmRing>) {
        let mut capture = SampleCapture::new(Duration::ZERO);
        capture.configure(FORMAT).unwrap();
        let (writer, ring) = PcmRing::shared(windows);
        (capture, writer, ring)
    }

    #[test]
    fn poll_before_configure_is_misuse() {
        let mut capture = SampleCapture::new(DEFAULT_LEAD);
        let (_writer, ring) = PcmRing::shared(4);
        assert_eq!(capture.poll(&ring, Duration::ZERO), Err(VisualizerError::NotConfigured));
    }

    #[test]
    fn rejects_foreign_channel_counts() {
        let mut capture = SampleCapture::new(DEFAULT_LEAD);
        let err = capture.configure(StreamFormat { sample_rate: 48_000, channels: 6 });
        assert!(matches!(err, Err(VisualizerError::UnsupportedFormat { channels: 6, .. })));
        assert!(capture.format().is_none());
    }

    #[test]
    fn empty_ring_awaits_history() {
        let (mut capture, _writer, ring) = setup(8);
        assert_eq!(
            capture.poll(&ring, Duration::ZERO).unwrap(),
            CapturePoll::Skip(SkipReason::AwaitingHistory)
        );
    }

    #[test]
    fn yields_each_window_once() {
        let (mut capture, mut writer, ring) = setup(8);
        let clock = Duration::ZERO;
        capture.poll(&ring, clock).unwrap();

        // Producer keeps pace exactly with the clock: zero lag.
        writer.write(&vec![0i16; WINDOW_SAMPLES * 2]);
        let span = match capture.poll(&ring, Duration::from_secs_f64(2048.0 / 44_100.0)).unwrap() {
            CapturePoll::Ready(span) => span,
            other => panic!("expected windows, got {:?}", other),
        };
        assert_eq!(span.start, WINDOW_SAMPLES as u64);
        assert_eq!(span.end, 2 * WINDOW_SAMPLES as u64);
        assert_eq!(span.marks().collect::<Vec<_>>(), vec![WINDOW_SAMPLES as u64]);
        assert_eq!(span.latest_mark(), WINDOW_SAMPLES as u64);

        assert_eq!(
            capture.poll(&ring, Duration::from_secs_f64(2048.0 / 44_100.0)).unwrap(),
            CapturePoll::Skip(SkipReason::NoNewWindow)
        );
    }

    #[test]
    fn producer_falling_behind_folds_into_adjustment() {
        let (mut capture, mut writer, ring) = setup(8);
        capture.poll(&ring, Duration::ZERO).unwrap();
        writer.write(&vec![0i16; 100]);
        capture.poll(&ring, Duration::from_secs(1)).unwrap();
        assert_eq!(capture.adjustment(), 44_100 * 4 - 200);
    }

    #[test]
    fn producer_too_far_ahead_is_desynchronized() {
        let (mut capture, mut writer, ring) = setup(1);
        writer.write(&vec![0i16; WINDOW_SAMPLES]);
        writer.write(&vec![0i16; WINDOW_SAMPLES]);
        writer.write(&vec![0i16; 2]);
        assert_eq!(
            capture.poll(&ring, Duration::ZERO).unwrap(),
            CapturePoll::Skip(SkipReason::Desynchronized)
        );
    }

    #[test]
    fn lead_delays_audible_position() {
        let mut capture = SampleCapture::new(Duration::from_millis(300));
        capture.configure(FORMAT).unwrap();
        let (mut writer, ring) = PcmRing::shared(64);

        capture.poll(&ring, Duration::ZERO).unwrap();
        writer.write(&vec![0i16; 44_100 * 2]);
        let span = match capture.poll(&ring, Duration::from_secs(1)).unwrap() {
            CapturePoll::Ready(span) => span,
            other => panic!("expected windows, got {:?}", other),
        };
        // 0.7 s audible: 61740 samples, rounded down to the window grid.
        assert_eq!(span.end, 61_440);
    }

    #[test]
    fn reset_restarts_from_scratch() {
        let (mut capture, mut writer, ring) = setup(8);
        capture.poll(&ring, Duration::ZERO).unwrap();
        writer.write(&vec![0i16; 10]);
        capture.poll(&ring, Duration::from_secs(1)).unwrap();
        assert!(capture.adjustment() > 0);
        capture.reset();
        assert_eq!(capture.adjustment(), 0);
    }

    // 32 kHz makes one window exactly 32 ms.
    const EVEN: StreamFormat = StreamFormat { sample_rate: 32_000, channels: 2 };

    fn window_of(value: i16) -> Vec<i16> {
        vec![value; WINDOW_SAMPLES]
    }

    #[test]
    fn start_fixes_clock_origin() {
        let (mut capture, mut writer, ring) = setup(8);
        capture.start(Duration::from_millis(500));
        writer.write(&vec![0i16; 100]);
        capture.poll(&ring, Duration::from_millis(1500)).unwrap();
        // One second has elapsed since the origin, not zero.
        assert_eq!(capture.adjustment(), 44_100 * 4 - 200);
    }

    #[test]
    fn overwritten_windows_are_skipped_across_wrap() {
        let mut capture = SampleCapture::new(Duration::ZERO);
        capture.configure(EVEN).unwrap();
        let (mut writer, ring) = PcmRing::shared(4);
        capture.start(Duration::ZERO);

        writer.write(&window_of(0));
        writer.write(&window_of(1));
        assert_eq!(
            capture.poll(&ring, Duration::from_millis(64)).unwrap(),
            CapturePoll::Ready(WindowSpan { start: 2048, end: 4096 })
        );

        // Reader stalls while the producer laps the four-window ring.
        for value in 2..10 {
            writer.write(&window_of(value));
        }
        let span = match capture.poll(&ring, Duration::from_millis(320)).unwrap() {
            CapturePoll::Ready(span) => span,
            other => panic!("expected windows, got {:?}", other),
        };
        assert_eq!(span, WindowSpan { start: 6 * 2048, end: 10 * 2048 });

        let mut buf = vec![0i16; WINDOW_SAMPLES];
        for (mark, expected) in span.marks().zip(6..10) {
            assert!(ring.read(mark, &mut buf));
            assert!(buf.iter().all(|&s| s == expected), "window at {}", mark);
        }
        assert!(!ring.read(5 * 2048, &mut buf));
    }

    #[test]
    fn reader_behind_the_ring_overruns() {
        let mut capture = SampleCapture::new(Duration::from_secs(1));
        capture.configure(EVEN).unwrap();
        let (mut writer, ring) = PcmRing::shared(2);
        capture.start(Duration::ZERO);

        writer.write(&vec![0i16; 128_000]);
        // A one second lead puts the audible window 31 windows behind the
        // newest sample, far outside a two-window ring.
        assert_eq!(
            capture.poll(&ring, Duration::from_secs(2)).unwrap(),
            CapturePoll::Skip(SkipReason::Overrun)
        );
        assert_eq!(
            capture.poll(&ring, Duration::from_secs(2)).unwrap(),
            CapturePoll::Skip(SkipReason::NoNewWindow)
        );
    }
}
