use super::bands::{BandTable, NUM_BANDS};
use super::fft;
use crate::error::Result;

/// Samples per channel in one analysis window.
pub const FFT_WINDOW: usize = 1024;

/// Per-band loudness extraction.
///
/// Each band is isolated by zeroing every bin outside it (and outside its
/// negative-frequency mirror), transformed back to the time domain, and
/// reduced to `mean(|x|)^2` before being quantized against the level table.
pub struct BandEnergyExtractor {
    spec_re: Vec<f64>,
    spec_im: Vec<f64>,
    masked_re: Vec<f64>,
    masked_im: Vec<f64>,
    out_re: Vec<f64>,
    out_im: Vec<f64>,
}

impl BandEnergyExtractor {
    pub fn new() -> Self {
        Self {
            spec_re: vec![0.0; FFT_WINDOW],
            spec_im: vec![0.0; FFT_WINDOW],
            masked_re: vec![0.0; FFT_WINDOW],
            masked_im: vec![0.0; FFT_WINDOW],
            out_re: vec![0.0; FFT_WINDOW],
            out_im: vec![0.0; FFT_WINDOW],
        }
    }

    /// Levels for all bands of one mono window of `FFT_WINDOW` samples.
    pub fn extract(&mut self, table: &BandTable, sample_rate: u32, window: &[f64]) -> Result<[u8; NUM_BANDS]> {
        fft::forward(window, &mut self.spec_re, &mut self.spec_im)?;

        let mut levels = [0u8; NUM_BANDS];
        for (band, level) in levels.iter_mut().enumerate() {
            *level = self.band_level(table, sample_rate, band)?;
        }
        Ok(levels)
    }

    fn band_level(&mut self, table: &BandTable, sample_rate: u32, band: usize) -> Result<u8> {
        let sr = sample_rate as f64;
        let lo = table.bands[band];
        let hi = table.bands[band + 1];

        let mut any_energy = false;
        for m in 0..FFT_WINDOW {
            let f1 = sr * m as f64 / FFT_WINDOW as f64;
            let in_band = (f1 >= lo && f1 < hi) || (f1 > sr - hi && f1 <= sr - lo);
            if in_band {
                self.masked_re[m] = self.spec_re[m];
                self.masked_im[m] = self.spec_im[m];
                any_energy |= self.spec_re[m] != 0.0 || self.spec_im[m] != 0.0;
            } else {
                self.masked_re[m] = 0.0;
                self.masked_im[m] = 0.0;
            }
        }
        if !any_energy {
            return Ok(0);
        }

        fft::inverse(&self.masked_re, &self.masked_im, &mut self.out_re, &mut self.out_im)?;

        let mean_abs = self.out_re.iter().map(|x| x.abs()).sum::<f64>() / FFT_WINDOW as f64;
        Ok(table.level_for(mean_abs * mean_abs))
    }
}

impl Default for BandEnergyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Average interleaved i16 frames down to one mono f64 value per frame.
pub fn downmix(samples: &[i16], channels: usize, out: &mut [f64]) {
    for (frame, dst) in samples.chunks_exact(channels).zip(out.iter_mut()) {
        *dst = frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64;
    }
}
