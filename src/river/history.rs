use crate::spectrum::bands::NUM_BANDS;

/// Frames kept in the circular history.
pub const HISTORY_LEN: usize = 200;
/// How far back `find_by_mark` searches from the newest frame.
pub const LOOKBACK: usize = 60;
/// Frames handed to the renderer per displayed tick.
pub const DISPLAY_FRAMES: usize = 100;

/// One time slice of the river: a level per band plus the sample mark it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiverFrame {
    pub levels: [u8; NUM_BANDS],
    pub mark: u64,
}

impl RiverFrame {
    pub const EMPTY: RiverFrame = RiverFrame {
        levels: [0; NUM_BANDS],
        mark: u64::MAX,
    };

    pub fn new(levels: [u8; NUM_BANDS], mark: u64) -> Self {
        Self { levels, mark }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayAction {
    /// The mark is not within the lookback window.
    Missing,
    /// The mark resolves to the frame that is already on screen.
    AlreadyShown,
    /// History skipped ahead; the display pointer moved but nothing is drawn.
    Discontinuous,
    /// Up to [`DISPLAY_FRAMES`] frames ending at the resolved one, oldest first.
    Render(Vec<RiverFrame>),
}

pub struct RiverHistory {
    frames: Vec<RiverFrame>,
    cursor: usize,
    wrapped: bool,
    last_displayed: Option<usize>,
}

impl RiverHistory {
    pub fn new() -> Self {
        Self {
            frames: vec![RiverFrame::EMPTY; HISTORY_LEN],
            cursor: 0,
            wrapped: false,
            last_displayed: None,
        }
    }

    pub fn clear(&mut self) {
        self.frames.fill(RiverFrame::EMPTY);
        self.cursor = 0;
        self.wrapped = false;
        self.last_displayed = None;
    }

    /// Number of frames currently stored.
    pub fn len(&self) -> usize {
        if self.wrapped {
            HISTORY_LEN
        } else {
            self.cursor
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, frame: RiverFrame) {
        self.frames[self.cursor] = frame;
        self.cursor = (self.cursor + 1) % HISTORY_LEN;
        if self.cursor == 0 {
            self.wrapped = true;
        }
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<&RiverFrame> {
        if index < self.len() {
            self.frames.get(index)
        } else {
            None
        }
    }

    pub fn find_by_mark(&self, mark: u64) -> Option<usize> {
        self.find_by_mark_within(mark, LOOKBACK)
    }

    /// Scans backward from the newest frame for at most `depth` frames.
    pub fn find_by_mark_within(&self, mark: u64, depth: usize) -> Option<usize> {
        let depth = depth.min(self.len());
        (1..=depth)
            .map(|back| (self.cursor + HISTORY_LEN - back) % HISTORY_LEN)
            .find(|&idx| self.frames[idx].mark == mark)
    }

    /// Moves the display pointer onto `mark` without drawing it, provided
    /// the frame continues what was last displayed. Used for frames that were
    /// produced in the same tick as a newer one.
    pub fn catch_up(&mut self, mark: u64) -> bool {
        let Some(idx) = self.find_by_mark(mark) else {
            return false;
        };
        let continues = match self.last_displayed {
            None => true,
            Some(last) => last == idx || self.predecessor(idx) == Some(last),
        };
        if continues {
            self.last_displayed = Some(idx);
        }
        continues
    }

    pub fn try_display(&mut self, mark: u64) -> DisplayAction {
        let Some(idx) = self.find_by_mark(mark) else {
            return DisplayAction::Missing;
        };

        match self.last_displayed {
            Some(last) if last == idx => DisplayAction::AlreadyShown,
            Some(last) if self.predecessor(idx) != Some(last) => {
                log::trace!("River discontinuity at mark {}", mark);
                self.last_displayed = Some(idx);
                DisplayAction::Discontinuous
            }
            _ => {
                self.last_displayed = Some(idx);
                DisplayAction::Render(self.frames_ending_at(idx, DISPLAY_FRAMES))
            }
        }
    }

    fn predecessor(&self, idx: usize) -> Option<usize> {
        let oldest = if self.wrapped { self.cursor } else { 0 };
        if idx == oldest {
            None
        } else {
            Some((idx + HISTORY_LEN - 1) % HISTORY_LEN)
        }
    }

    fn frames_ending_at(&self, idx: usize, count: usize) -> Vec<RiverFrame> {
        let available = if self.wrapped {
            (idx + HISTORY_LEN - self.cursor) % HISTORY_LEN + 1
        } else {
            idx + 1
        };
        let n = count.min(available);
        let first = idx + HISTORY_LEN + 1 - n;
        (0..n)
            .map(|offset| self.frames[(first + offset) % HISTORY_LEN])
            .collect()
    }
}

impl Default for RiverHistory {
    fn default() -> Self {
        Self::new()
    }
}
