//! One-time construction of the (time, depth, height) → screen grid.
//!
//! No matrices are involved: every grid point is the first pixel where a
//! walked line meets a line already marked in an [`OcclusionBitmap`].

use super::line::{OcclusionBitmap, Point};
use super::surface::Rect;
use crate::error::{Result, VisualizerError};
use crate::river::history::DISPLAY_FRAMES;
use crate::spectrum::bands::{NUM_BANDS, NUM_LEVELS};

pub const TIME_POINTS: usize = DISPLAY_FRAMES + 1;
pub const DEPTH_POINTS: usize = NUM_BANDS + 1;
pub const HEIGHT_POINTS: usize = NUM_LEVELS;

pub const MIN_WIDTH: u32 = 640;
pub const MAX_WIDTH: u32 = 1920;
pub const MIN_HEIGHT: u32 = 560;
pub const MAX_HEIGHT: u32 = 1080;

const FRONT: usize = DEPTH_POINTS - 1;
const TOP: usize = HEIGHT_POINTS - 1;

/// Apex and step sizes derived from the screen size.
#[derive(Debug, Clone, Copy)]
struct Layout {
    apex: Point,
    base_y: i32,
    x_left: i32,
    x_right: i32,
    depth_step: f64,
    height_step: f64,
}

impl Layout {
    fn for_screen(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32, height as i32);
        let apex = Point::new(w / 2, h / 20);
        let base_y = h - 1 - h / 20;
        let margin = w / 16;
        // Farthest depth row sits 30% of the way from the apex to the baseline.
        let far_y = apex.y + (base_y - apex.y) * 3 / 10;
        Self {
            apex,
            base_y,
            x_left: margin,
            x_right: w - 1 - margin,
            depth_step: (base_y - far_y) as f64 / FRONT as f64,
            height_step: h as f64 * 0.45 / TOP as f64,
        }
    }

    fn depth_row(&self, j: usize) -> i32 {
        self.base_y - ((FRONT - j) as f64 * self.depth_step).round() as i32
    }

    fn front_height(&self, k: usize) -> i32 {
        self.base_y - (k as f64 * self.height_step).round() as i32
    }
}

pub struct ProjectionGrid {
    width: u32,
    height: u32,
    apex: Point,
    points: Vec<Point>,
    bounds: Rect,
}

impl ProjectionGrid {
    pub fn build(width: u32, height: u32) -> Result<Self> {
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) || !(MIN_HEIGHT..=MAX_HEIGHT).contains(&height) {
            return Err(VisualizerError::UnsupportedScreen { width, height });
        }

        let layout = Layout::for_screen(width, height);
        let mut grid = Self {
            width,
            height,
            apex: layout.apex,
            points: vec![Point::default(); TIME_POINTS * DEPTH_POINTS * HEIGHT_POINTS],
            bounds: Rect::new(0, 0, 0, 0),
        };
        let mut bitmap = OcclusionBitmap::new(width, height);

        grid.build_baseline(&layout);
        grid.build_depth_rows(&layout, &mut bitmap)?;
        grid.build_first_column_heights(&layout, &mut bitmap)?;
        grid.build_column_heights(&mut bitmap)?;
        grid.bounds = grid.compute_bounds()?;

        log::debug!(
            "Projection grid built for {}x{} (apex {:?}, bounds {:?})",
            width,
            height,
            grid.apex,
            grid.bounds
        );
        Ok(grid)
    }

    fn index(i: usize, j: usize, k: usize) -> usize {
        (i * DEPTH_POINTS + j) * HEIGHT_POINTS + k
    }

    fn set(&mut self, i: usize, j: usize, k: usize, p: Point) {
        self.points[Self::index(i, j, k)] = p;
    }

    /// Grid point for time `i`, depth `j`, height `k`; indices are clamped.
    pub fn at(&self, i: usize, j: usize, k: usize) -> Point {
        let i = i.min(TIME_POINTS - 1);
        let j = j.min(DEPTH_POINTS - 1);
        let k = k.min(HEIGHT_POINTS - 1);
        self.points[Self::index(i, j, k)]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Smallest rectangle containing every grid point.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[cfg(test)]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn build_baseline(&mut self, layout: &Layout) {
        let span = (layout.x_right - layout.x_left) as f64;
        for i in 0..TIME_POINTS {
            let x = layout.x_left + (i as f64 * span / DISPLAY_FRAMES as f64).round() as i32;
            self.set(i, FRONT, 0, Point::new(x, layout.base_y));
        }
    }

    fn build_depth_rows(&mut self, layout: &Layout, bitmap: &mut OcclusionBitmap) -> Result<()> {
        let right = self.width as i32 - 1;
        for i in 0..TIME_POINTS {
            bitmap.clear();
            bitmap.draw_line(layout.apex, self.at(i, FRONT, 0));

            for j in (0..FRONT).rev() {
                let y = layout.depth_row(j);
                let hit = bitmap
                    .first_hit(Point::new(0, y), Point::new(right, y))
                    .ok_or(VisualizerError::DegenerateProjection("depth row"))?;
                self.set(i, j, 0, hit);
            }
        }
        Ok(())
    }

    fn build_first_column_heights(&mut self, layout: &Layout, bitmap: &mut OcclusionBitmap) -> Result<()> {
        let bottom = self.height as i32 - 1;
        let x0 = self.at(0, FRONT, 0).x;
        for k in 1..HEIGHT_POINTS {
            let front = Point::new(x0, layout.front_height(k));
            self.set(0, FRONT, k, front);

            bitmap.clear();
            bitmap.draw_line(layout.apex, front);
            for j in 0..FRONT {
                let x = self.at(0, j, 0).x;
                let hit = bitmap
                    .first_hit(Point::new(x, 0), Point::new(x, bottom))
                    .ok_or(VisualizerError::DegenerateProjection("first column height"))?;
                self.set(0, j, k, hit);
            }
        }
        Ok(())
    }

    fn build_column_heights(&mut self, bitmap: &mut OcclusionBitmap) -> Result<()> {
        let right = self.width as i32 - 1;
        for j in 0..DEPTH_POINTS {
            bitmap.clear();
            let ceiling = (0..HEIGHT_POINTS)
                .map(|k| self.at(0, j, k).y)
                .min()
                .unwrap_or(0);
            for i in 1..TIME_POINTS {
                let floor = self.at(i, j, 0);
                bitmap.draw_line(floor, Point::new(floor.x, ceiling));
            }

            for k in 1..HEIGHT_POINTS {
                let y = self.at(0, j, k).y;
                for i in 1..TIME_POINTS {
                    let from = (self.at(i - 1, j, k).x + 1).min(self.at(i, j, 0).x);
                    let hit = bitmap
                        .first_hit(Point::new(from, y), Point::new(right, y))
                        .ok_or(VisualizerError::DegenerateProjection("column height"))?;
                    self.set(i, j, k, hit);
                }
            }
        }
        Ok(())
    }

    fn compute_bounds(&self) -> Result<Rect> {
        let (w, h) = (self.width as i32, self.height as i32);
        if let Some(p) = self.points.iter().find(|p| p.x < 0 || p.y < 0 || p.x >= w || p.y >= h) {
            log::warn!("Projection point {:?} fell outside {}x{}", p, w, h);
            return Err(VisualizerError::DegenerateProjection("out of bounds"));
        }
        let min_x = self.points.iter().map(|p| p.x).min().unwrap_or(0);
        let max_x = self.points.iter().map(|p| p.x).max().unwrap_or(0);
        let min_y = self.points.iter().map(|p| p.y).min().unwrap_or(0);
        let max_y = self.points.iter().map(|p| p.y).max().unwrap_or(0);
        Ok(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }
}

/// Holds the grid for the current screen size; rebuilt lazily after a resize.
#[derive(Default)]
pub struct ProjectionCache {
    grid: Option<ProjectionGrid>,
    failed: Option<(u32, u32)>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_valid(&self) -> bool {
        self.grid.is_some()
    }

    pub fn invalidate(&mut self) {
        self.grid = None;
        self.failed = None;
    }

    /// Returns a grid valid for `width` x `height`, building it if needed.
    pub fn ensure(&mut self, width: u32, height: u32) -> Result<&ProjectionGrid> {
        let stale = self
            .grid
            .as_ref()
            .is_some_and(|g| g.width() != width || g.height() != height);
        if stale {
            self.invalidate();
        }
        if self.failed == Some((width, height)) {
            return Err(VisualizerError::UnsupportedScreen { width, height });
        }

        if self.grid.is_none() {
            match ProjectionGrid::build(width, height) {
                Ok(grid) => self.grid = Some(grid),
                Err(err) => {
                    log::warn!("Visualization disabled until resize: {}", err);
                    self.failed = Some((width, height));
                    return Err(err);
                }
            }
        }
        self.grid
            .as_ref()
            .ok_or(VisualizerError::UnsupportedScreen { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(grid: &ProjectionGrid) {
        let (w, h) = (grid.width() as i32, grid.height() as i32);
        assert_eq!(grid.points().len(), 101 * 71 * 60);
        for p in grid.points() {
            assert!(p.x >= 0 && p.x < w && p.y >= 0 && p.y < h, "{:?}", p);
        }

        for i in 1..TIME_POINTS {
            assert!(grid.at(i, FRONT, 0).x > grid.at(i - 1, FRONT, 0).x);
        }
        for j in 1..DEPTH_POINTS {
            assert!(grid.at(0, j, 0).y > grid.at(0, j - 1, 0).y, "depth row {}", j);
            assert!(grid.at(50, j, 0).y == grid.at(0, j, 0).y);
        }
        for i in 0..TIME_POINTS {
            for j in 0..DEPTH_POINTS {
                let floor = grid.at(i, j, 0);
                let top = grid.at(i, j, TOP);
                assert!(top.y < floor.y, "({}, {}) top {:?} floor {:?}", i, j, top, floor);
                assert!(grid.at(i, j, 30).y <= floor.y);
                assert_eq!(top.x, floor.x);
            }
        }
        // Bars foreshorten toward the apex.
        let front_height = grid.at(0, FRONT, 0).y - grid.at(0, FRONT, TOP).y;
        let back_height = grid.at(0, 0, 0).y - grid.at(0, 0, TOP).y;
        assert!(back_height < front_height);
    }

    #[test]
    fn builds_at_largest_size() {
        let grid = ProjectionGrid::build(1920, 1080).unwrap();
        assert_well_formed(&grid);
        let bounds = grid.bounds();
        assert!(bounds.x >= 0 && bounds.right() <= 1920);
        assert!(bounds.y >= 0 && bounds.bottom() <= 1080);
    }

    #[test]
    fn builds_at_smallest_size() {
        let grid = ProjectionGrid::build(640, 560).unwrap();
        assert_well_formed(&grid);
    }

    #[test]
    fn rejects_unsupported_sizes() {
        assert_eq!(
            ProjectionGrid::build(100, 1080).err(),
            Some(VisualizerError::UnsupportedScreen { width: 100, height: 1080 })
        );
        assert!(ProjectionGrid::build(1920, 1200).is_err());
    }

    #[test]
    fn cache_rebuilds_after_resize() {
        let mut cache = ProjectionCache::new();
        assert!(!cache.is_valid());
        assert_eq!(cache.ensure(800, 600).unwrap().width(), 800);
        assert!(cache.is_valid());

        assert!(cache.ensure(100, 100).is_err());
        assert!(!cache.is_valid());
        assert!(cache.ensure(100, 100).is_err());

        cache.invalidate();
        let grid = cache.ensure(1024, 768).unwrap();
        assert_eq!((grid.width(), grid.height()), (1024, 768));
    }
}
