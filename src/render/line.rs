//! Integer line walking and the occlusion bitmap used to intersect lines.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Bresenham walk from `a` to `b`, both endpoints included.
///
/// The walk is 8-connected, so every row and every column between the
/// endpoints holds at least one pixel of the line.
#[derive(Debug, Clone)]
pub struct LineWalk {
    x: i32,
    y: i32,
    end: Point,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    done: bool,
}

impl LineWalk {
    pub fn new(a: Point, b: Point) -> Self {
        let dx = (b.x - a.x).abs();
        let dy = -(b.y - a.y).abs();
        Self {
            x: a.x,
            y: a.y,
            end: b,
            dx,
            dy,
            sx: if a.x < b.x { 1 } else { -1 },
            sy: if a.y < b.y { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }
}

impl Iterator for LineWalk {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.done {
            return None;
        }
        let current = Point::new(self.x, self.y);
        if self.x == self.end.x && self.y == self.end.y {
            self.done = true;
        } else {
            let e2 = 2 * self.err;
            if e2 >= self.dy {
                self.err += self.dy;
                self.x += self.sx;
            }
            if e2 <= self.dx {
                self.err += self.dx;
                self.y += self.sy;
            }
        }
        Some(current)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

/// Contiguous run of line pixels sharing one row (or column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// The shared row `y` (or column `x`).
    pub at: i32,
    pub lo: i32,
    pub hi: i32,
}

impl LineWalk {
    /// Groups the walk into one span per row or column.
    ///
    /// Two edges covering the same rows yield spans in lock-step, which is
    /// how faces are filled without a polygon primitive.
    pub fn spans(self, axis: Axis) -> Spans {
        Spans {
            walk: self.peekable(),
            axis,
        }
    }
}

pub struct Spans {
    walk: std::iter::Peekable<LineWalk>,
    axis: Axis,
}

impl Spans {
    fn split(&self, p: Point) -> (i32, i32) {
        match self.axis {
            Axis::Row => (p.y, p.x),
            Axis::Column => (p.x, p.y),
        }
    }
}

impl Iterator for Spans {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        let first = self.walk.next()?;
        let (at, v) = self.split(first);
        let mut span = Span { at, lo: v, hi: v };
        while let Some(&p) = self.walk.peek() {
            let (next_at, v) = self.split(p);
            if next_at != at {
                break;
            }
            span.lo = span.lo.min(v);
            span.hi = span.hi.max(v);
            self.walk.next();
        }
        Some(span)
    }
}

/// Per-pixel marks for one projection construction pass.
///
/// Only the pixels touched since the last [`clear`](Self::clear) are reset,
/// so clearing costs as much as the lines that were drawn.
pub struct OcclusionBitmap {
    width: i32,
    height: i32,
    marks: Vec<bool>,
    touched: Vec<usize>,
}

impl OcclusionBitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as i32,
            height: height as i32,
            marks: vec![false; (width * height) as usize],
            touched: Vec::new(),
        }
    }

    fn index(&self, p: Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            return None;
        }
        Some((p.y * self.width + p.x) as usize)
    }

    pub fn mark(&mut self, p: Point) {
        if let Some(idx) = self.index(p) {
            if !self.marks[idx] {
                self.marks[idx] = true;
                self.touched.push(idx);
            }
        }
    }

    pub fn is_marked(&self, p: Point) -> bool {
        self.index(p).is_some_and(|idx| self.marks[idx])
    }

    pub fn draw_line(&mut self, a: Point, b: Point) {
        for p in LineWalk::new(a, b) {
            self.mark(p);
        }
    }

    /// First already-marked pixel met while walking from `a` to `b`.
    pub fn first_hit(&self, a: Point, b: Point) -> Option<Point> {
        LineWalk::new(a, b).find(|&p| self.is_marked(p))
    }

    pub fn clear(&mut self) {
        for idx in self.touched.drain(..) {
            self.marks[idx] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_includes_both_endpoints() {
        let pts: Vec<Point> = LineWalk::new(Point::new(0, 0), Point::new(3, 0)).collect();
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[0], Point::new(0, 0));
        assert_eq!(pts[3], Point::new(3, 0));

        let single: Vec<Point> = LineWalk::new(Point::new(5, 5), Point::new(5, 5)).collect();
        assert_eq!(single, vec![Point::new(5, 5)]);
    }

    #[test]
    fn walk_covers_every_row_and_column() {
        let a = Point::new(2, 40);
        let b = Point::new(17, 3);
        let pts: Vec<Point> = LineWalk::new(a, b).collect();
        for x in 2..=17 {
            assert!(pts.iter().any(|p| p.x == x), "column {}", x);
        }
        for y in 3..=40 {
            assert!(pts.iter().any(|p| p.y == y), "row {}", y);
        }
        assert_eq!(*pts.last().unwrap(), b);
    }

    #[test]
    fn spans_group_runs() {
        let rows: Vec<Span> = LineWalk::new(Point::new(0, 0), Point::new(7, 1))
            .spans(Axis::Row)
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].at, 0);
        assert_eq!(rows[0].lo, 0);
        assert_eq!(rows[1].at, 1);
        assert_eq!(rows[1].hi, 7);
        assert_eq!(rows[0].hi + 1, rows[1].lo);

        let cols: Vec<Span> = LineWalk::new(Point::new(3, 10), Point::new(3, 2))
            .spans(Axis::Column)
            .collect();
        assert_eq!(cols, vec![Span { at: 3, lo: 2, hi: 10 }]);
    }

    #[test]
    fn scanline_finds_first_crossing() {
        let mut bitmap = OcclusionBitmap::new(64, 64);
        bitmap.draw_line(Point::new(32, 0), Point::new(10, 63));
        let hit = bitmap.first_hit(Point::new(0, 40), Point::new(63, 40)).unwrap();
        assert_eq!(hit.y, 40);
        assert!(bitmap.is_marked(hit));
        assert!((0..hit.x).all(|x| !bitmap.is_marked(Point::new(x, 40))));

        assert_eq!(bitmap.first_hit(Point::new(40, 0), Point::new(40, 63)), None);
    }

    #[test]
    fn clear_resets_only_touched_pixels() {
        let mut bitmap = OcclusionBitmap::new(16, 16);
        bitmap.draw_line(Point::new(0, 0), Point::new(15, 15));
        bitmap.mark(Point::new(-1, 3));
        assert!(bitmap.is_marked(Point::new(7, 7)));
        bitmap.clear();
        assert!(!bitmap.is_marked(Point::new(7, 7)));
        assert_eq!(bitmap.first_hit(Point::new(0, 7), Point::new(15, 7)), None);
    }
}
