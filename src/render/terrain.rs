//! Draws the river history as shaded bars using the cached projection grid.
//!
//! There is no depth buffer. Occlusion comes from draw order alone: depth
//! bands go back to front, and columns go from each screen edge toward the
//! centre so bars nearer the apex cover the side faces of their neighbours.

use super::line::{Axis, LineWalk, Point};
use super::projection::ProjectionGrid;
use super::surface::{Rgb, Surface};
use crate::river::history::{RiverFrame, DISPLAY_FRAMES};
use crate::spectrum::bands::{NUM_BANDS, NUM_LEVELS};

pub const BACKGROUND: Rgb = Rgb::new(12, 14, 30);
pub const EDGE: Rgb = Rgb::BLACK;

const RIGHT_SIDE_SHADE: f32 = 0.7;
const LEFT_SIDE_SHADE: f32 = 0.343;
const TOP_SHADE: f32 = 0.49;

/// Front-face colour for a depth band: red to yellow over the back half,
/// yellow to cyan over the front half.
pub fn band_color(band: usize) -> Rgb {
    let half = NUM_BANDS / 2;
    if band < half {
        let t = band as f32 / (half - 1) as f32;
        Rgb::new(255, (255.0 * t).round() as u8, 0)
    } else {
        let t = ((band - half) as f32 / (NUM_BANDS - half - 1) as f32).min(1.0);
        Rgb::new((255.0 * (1.0 - t)).round() as u8, 255, (255.0 * t).round() as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

pub struct TerrainRenderer {
    background: Rgb,
}

impl TerrainRenderer {
    pub fn new() -> Self {
        Self { background: BACKGROUND }
    }

    /// Paints `frames` (oldest first, newest in the rightmost column) and
    /// presents the drawable region.
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, grid: &ProjectionGrid, frames: &[RiverFrame]) {
        let bounds = grid.bounds();
        surface.fill_rect(bounds.x, bounds.y, bounds.w, bounds.h, self.background);

        let frames = &frames[frames.len().saturating_sub(DISPLAY_FRAMES)..];
        let offset = DISPLAY_FRAMES - frames.len();
        let half = DISPLAY_FRAMES / 2;

        for column in (0..half).chain((half..DISPLAY_FRAMES).rev()) {
            let Some(frame) = column.checked_sub(offset).and_then(|idx| frames.get(idx)) else {
                continue;
            };
            let side = if column < half { Side::Right } else { Side::Left };
            for band in 0..NUM_BANDS {
                let level = (frame.levels[band] as usize).min(NUM_LEVELS - 1);
                draw_bar(surface, grid, column, band, level, side);
            }
        }

        surface.present(bounds);
    }
}

impl Default for TerrainRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_bar<S: Surface + ?Sized>(
    surface: &mut S,
    grid: &ProjectionGrid,
    column: usize,
    band: usize,
    level: usize,
    side: Side,
) {
    let (front, back) = (band + 1, band);
    let base = band_color(band);

    let front_left = grid.at(column, front, 0);
    let front_right = grid.at(column + 1, front, 0);
    let top_front_left = grid.at(column, front, level);
    let top_front_right = grid.at(column + 1, front, level);
    let top_back_left = grid.at(column, back, level);
    let top_back_right = grid.at(column + 1, back, level);

    let (edge_column, shade) = match side {
        Side::Right => (column + 1, RIGHT_SIDE_SHADE),
        Side::Left => (column, LEFT_SIDE_SHADE),
    };
    let side_front_floor = grid.at(edge_column, front, 0);
    let side_back_floor = grid.at(edge_column, back, 0);
    let side_front_top = grid.at(edge_column, front, level);
    let side_back_top = grid.at(edge_column, back, level);

    if level > 0 {
        fill_between(
            surface,
            (side_front_top, side_back_top),
            (side_front_floor, side_back_floor),
            Axis::Column,
            base.shade(shade),
        );
    }

    fill_between(
        surface,
        (top_front_left, top_back_left),
        (top_front_right, top_back_right),
        Axis::Row,
        base.shade(TOP_SHADE),
    );

    if level > 0 {
        surface.fill_rect(
            front_left.x,
            top_front_left.y,
            front_right.x - front_left.x + 1,
            front_left.y - top_front_left.y + 1,
            base,
        );
        stroke(surface, front_left, top_front_left);
        stroke(surface, front_right, top_front_right);
        stroke(surface, side_back_floor, side_back_top);
    }

    stroke(surface, top_front_left, top_front_right);
    stroke(surface, top_back_left, top_back_right);
}

/// Fills the gap between two edges walked in lock-step.
///
/// Both edges must cover the same rows (`Axis::Row`) or columns
/// (`Axis::Column`); each pair of matching spans becomes one rectangle.
fn fill_between<S: Surface + ?Sized>(
    surface: &mut S,
    a: (Point, Point),
    b: (Point, Point),
    axis: Axis,
    color: Rgb,
) {
    let spans_a = LineWalk::new(a.0, a.1).spans(axis);
    let spans_b = LineWalk::new(b.0, b.1).spans(axis);

    for (sa, sb) in spans_a.zip(spans_b) {
        if sa.at != sb.at {
            continue;
        }
        let lo = sa.lo.min(sb.lo);
        let len = sa.hi.max(sb.hi) - lo + 1;
        match axis {
            Axis::Row => surface.fill_rect(lo, sa.at, len, 1, color),
            Axis::Column => surface.fill_rect(sa.at, lo, 1, len, color),
        }
    }
}

fn stroke<S: Surface + ?Sized>(surface: &mut S, a: Point, b: Point) {
    for p in LineWalk::new(a, b) {
        surface.fill_rect(p.x, p.y, 1, 1, EDGE);
    }
}
