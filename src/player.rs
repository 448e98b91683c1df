//! Offline stand-in for a live playback pipeline.
//!
//! A producer copies decoded PCM into the shared ring a little ahead of a
//! simulated clock, the visualizer is ticked at a fixed cadence, and the
//! framebuffer is sampled at the video frame rate.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::audio::capture::StreamFormat;
use crate::audio::clock::{Clock, ManualClock};
use crate::audio::decode::AudioData;
use crate::audio::ring::{PcmRing, PcmWriter, CHANNELS, RING_WINDOWS};
use crate::render::surface::FrameBuffer;
use crate::visualizer::{TickOutcome, VisualizerState};

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub tick: Duration,
    pub lead: Duration,
    pub buffer_ahead: Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaybackStats {
    pub ticks: u64,
    pub rendered: u64,
    pub skipped: u64,
    pub video_frames: u64,
}

/// Number of video frames [`play`] will emit for `audio`.
pub fn video_frame_count(audio: &AudioData, fps: u32) -> u64 {
    (audio.frames() as u64 * fps as u64).div_ceil(audio.sample_rate.max(1) as u64)
}

/// Keeps the ring filled up to `buffer_ahead` past the clock, padding with
/// silence once the source runs out.
struct Producer<'a> {
    source: &'a [i16],
    sample_rate: u32,
    writer: PcmWriter,
    produced: usize,
    silence: Vec<i16>,
}

impl Producer<'_> {
    fn fill_until(&mut self, at: Duration) {
        let frames = (at.as_nanos() * self.sample_rate as u128 / 1_000_000_000) as usize;
        let target = frames * CHANNELS;
        if target <= self.produced {
            return;
        }

        let from_source = target.min(self.source.len());
        if self.produced < from_source {
            self.writer.write(&self.source[self.produced..from_source]);
            self.produced = from_source;
        }
        if self.produced < target {
            let gap = target - self.produced;
            self.silence.resize(gap, 0);
            self.writer.write(&self.silence[..gap]);
            self.produced = target;
        }
    }
}

/// Plays `audio` through the visualizer and hands every video frame to `on_frame`.
pub fn play<F>(audio: &AudioData, settings: &PlaybackSettings, mut on_frame: F) -> Result<PlaybackStats>
where
    F: FnMut(&FrameBuffer) -> Result<()>,
{
    if settings.tick.is_zero() || settings.fps == 0 {
        anyhow::bail!("Tick interval and frame rate must be positive");
    }

    let (writer, ring) = PcmRing::shared(RING_WINDOWS);
    let mut producer = Producer {
        source: &audio.samples,
        sample_rate: audio.sample_rate,
        writer,
        produced: 0,
        silence: Vec::new(),
    };

    let clock = ManualClock::new();
    let mut visualizer = VisualizerState::new(settings.lead);
    visualizer
        .configure(StreamFormat {
            sample_rate: audio.sample_rate,
            channels: CHANNELS as u16,
        })
        .context("Audio format not supported by the visualizer")?;
    visualizer.resize(settings.width, settings.height);
    visualizer.enable(&clock);

    let mut framebuffer = FrameBuffer::new(settings.width, settings.height);
    let total_frames = video_frame_count(audio, settings.fps);
    let frame_period = Duration::from_secs(1) / settings.fps;
    let mut stats = PlaybackStats::default();

    log::info!(
        "Simulating playback: {} video frames, tick {:?}, lead {:?}, buffer ahead {:?}",
        total_frames,
        settings.tick,
        settings.lead,
        settings.buffer_ahead
    );

    while stats.video_frames < total_frames {
        producer.fill_until(clock.now() + settings.buffer_ahead);
        clock.advance(settings.tick);

        let outcome = visualizer
            .tick(&ring, &clock, &mut framebuffer)
            .context("Visualizer tick failed")?;
        stats.ticks += 1;
        match outcome {
            TickOutcome::Rendered => stats.rendered += 1,
            TickOutcome::Skipped(_) | TickOutcome::ScreenUnsupported => stats.skipped += 1,
            _ => {}
        }

        while stats.video_frames < total_frames && frame_period * stats.video_frames as u32 <= clock.now() {
            on_frame(&framebuffer)?;
            stats.video_frames += 1;
        }
    }

    visualizer.disable();
    log::debug!("Playback finished: {:?}", stats);
    Ok(stats)
}
