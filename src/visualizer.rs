//! The per-tick driver tying capture, analysis, history and rendering together.

use std::time::Duration;

use crate::audio::capture::{CapturePoll, SampleCapture, SkipReason, StreamFormat};
use crate::audio::clock::Clock;
use crate::audio::ring::{PcmRing, CHANNELS, WINDOW_SAMPLES};
use crate::error::{Result, VisualizerError};
use crate::render::projection::ProjectionCache;
use crate::render::surface::Surface;
use crate::render::terrain::TerrainRenderer;
use crate::river::history::{DisplayAction, RiverFrame, RiverHistory};
use crate::spectrum::bands::BandTable;
use crate::spectrum::energy::{downmix, BandEnergyExtractor, FFT_WINDOW};

/// What a single tick ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Disabled,
    Skipped(SkipReason),
    Rendered,
    AlreadyShown,
    Discontinuous,
    Missing,
    /// A frame was ready but the screen size has no projection.
    ScreenUnsupported,
}

pub struct VisualizerState {
    table: BandTable,
    extractor: BandEnergyExtractor,
    capture: SampleCapture,
    history: RiverHistory,
    projection: ProjectionCache,
    renderer: TerrainRenderer,
    enabled: bool,
    screen: (u32, u32),
    interleaved: Vec<i16>,
    mono: Vec<f64>,
}

impl VisualizerState {
    /// Creates a disabled visualizer with no screen; call [`resize`](Self::resize)
    /// before the first tick that should draw.
    pub fn new(lead: Duration) -> Self {
        Self {
            table: BandTable::new(),
            extractor: BandEnergyExtractor::new(),
            capture: SampleCapture::new(lead),
            history: RiverHistory::new(),
            projection: ProjectionCache::new(),
            renderer: TerrainRenderer::new(),
            enabled: false,
            screen: (0, 0),
            interleaved: vec![0; WINDOW_SAMPLES],
            mono: vec![0.0; FFT_WINDOW],
        }
    }

    pub fn configure(&mut self, format: StreamFormat) -> Result<()> {
        self.capture.configure(format)
    }

    /// Starts visualizing from an empty history, counting playback time from
    /// the clock's current reading.
    pub fn enable<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.capture.start(clock.now());
        self.history.clear();
        self.enabled = true;
        log::debug!("Visualizer enabled");
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        log::debug!("Visualizer disabled");
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.screen != (width, height) {
            log::debug!("Screen resized to {}x{}", width, height);
            self.screen = (width, height);
            self.projection.invalidate();
        }
    }

    #[cfg(test)]
    pub fn history(&self) -> &RiverHistory {
        &self.history
    }

    /// Analyzes every newly audible window and redraws if the river advanced.
    pub fn tick<C, S>(&mut self, ring: &PcmRing, clock: &C, surface: &mut S) -> Result<TickOutcome>
    where
        C: Clock + ?Sized,
        S: Surface + ?Sized,
    {
        if !self.enabled {
            return Ok(TickOutcome::Disabled);
        }
        let format = self.capture.format().ok_or(VisualizerError::NotConfigured)?;

        let span = match self.capture.poll(ring, clock.now())? {
            CapturePoll::Ready(span) => span,
            CapturePoll::Skip(reason) => {
                log::trace!("Tick skipped: {:?}", reason);
                return Ok(TickOutcome::Skipped(reason));
            }
        };

        let latest = span.latest_mark();
        for mark in span.marks() {
            if !ring.read(mark, &mut self.interleaved) {
                log::debug!("Window at {} overwritten before analysis", mark);
                continue;
            }
            downmix(&self.interleaved, CHANNELS, &mut self.mono);
            let levels = self.extractor.extract(&self.table, format.sample_rate, &self.mono)?;
            self.history.push(RiverFrame::new(levels, mark));
            // Only the newest frame of a batch is drawn.
            if mark != latest {
                self.history.catch_up(mark);
            }
        }

        let frames = match self.history.try_display(latest) {
            DisplayAction::Render(frames) => frames,
            DisplayAction::AlreadyShown => return Ok(TickOutcome::AlreadyShown),
            DisplayAction::Discontinuous => return Ok(TickOutcome::Discontinuous),
            DisplayAction::Missing => return Ok(TickOutcome::Missing),
        };

        let (width, height) = self.screen;
        match self.projection.ensure(width, height) {
            Ok(grid) => {
                self.renderer.draw(surface, grid, &frames);
                Ok(TickOutcome::Rendered)
            }
            Err(_) => Ok(TickOutcome::ScreenUnsupported),
        }
    }
}
