/// Number of frequency bands (depth rows of the river).
pub const NUM_BANDS: usize = 70;
/// Number of discrete loudness levels (height steps of the river).
pub const NUM_LEVELS: usize = 60;

const OCTAVE_BASES: usize = 10;
const STEPS_PER_OCTAVE: usize = 7;
const BAND_RATIO: f64 = 1.09052;
const TOP_FREQUENCY: f64 = 20480.0;
const FIRST_THRESHOLD: f64 = 100.0;
const LEVEL_RATIO: f64 = 1.12248;

/// Static band boundaries and loudness thresholds.
#[derive(Debug, Clone)]
pub struct BandTable {
    /// Ascending boundaries in Hz; band `i` spans `[bands[i], bands[i + 1])`.
    pub bands: [f64; NUM_BANDS + 1],
    /// Ascending power thresholds; level `i` needs `power >= db_levels[i]`.
    pub db_levels: [f64; NUM_LEVELS],
}

impl BandTable {
    pub fn new() -> Self {
        let mut bands = [0.0; NUM_BANDS + 1];
        let mut base = 20.0;
        for octave in 0..OCTAVE_BASES {
            for step in 0..STEPS_PER_OCTAVE {
                bands[octave * STEPS_PER_OCTAVE + step] = base * BAND_RATIO.powi(step as i32);
            }
            base *= 2.0;
        }
        bands[NUM_BANDS] = TOP_FREQUENCY;

        let mut db_levels = [0.0; NUM_LEVELS];
        let step = LEVEL_RATIO * LEVEL_RATIO;
        let mut threshold = FIRST_THRESHOLD;
        for level in db_levels.iter_mut() {
            *level = threshold;
            threshold *= step;
        }

        Self { bands, db_levels }
    }

    /// Band whose range contains `freq`, if any.
    pub fn band_of(&self, freq: f64) -> Option<usize> {
        (0..NUM_BANDS).find(|&b| freq >= self.bands[b] && freq < self.bands[b + 1])
    }

    /// Largest level whose threshold `power` reaches, clamped to `0..NUM_LEVELS`.
    pub fn level_for(&self, power: f64) -> u8 {
        let reached = self.db_levels.partition_point(|&threshold| power >= threshold);
        reached.saturating_sub(1).min(NUM_LEVELS - 1) as u8
    }
}

impl Default for BandTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_span_audible_range() {
        let table = BandTable::new();
        assert_eq!(table.bands[0], 20.0);
        assert_eq!(table.bands[NUM_BANDS], 20480.0);
        assert!(table.bands.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(table.bands[7], 40.0);
        assert_eq!(table.bands[63], 10240.0);
    }

    #[test]
    fn db_levels_strictly_increase() {
        let table = BandTable::new();
        assert_eq!(table.db_levels.len(), 60);
        assert_eq!(table.db_levels[0], 100.0);
        assert!(table.db_levels.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn level_lookup_clamps() {
        let table = BandTable::new();
        assert_eq!(table.level_for(0.0), 0);
        assert_eq!(table.level_for(99.0), 0);
        assert_eq!(table.level_for(100.0), 0);
        assert_eq!(table.level_for(table.db_levels[1]), 1);
        assert_eq!(table.level_for(table.db_levels[30] * 1.01), 30);
        assert_eq!(table.level_for(f64::MAX), 59);
    }

    #[test]
    fn band_lookup() {
        let table = BandTable::new();
        assert_eq!(table.band_of(20.0), Some(0));
        assert_eq!(table.band_of(19.9), None);
        assert_eq!(table.band_of(20480.0), None);
        let b = table.band_of(440.0).unwrap();
        assert!(table.bands[b] <= 440.0 && 440.0 < table.bands[b + 1]);
    }
}
