//! Coverage planning for scanners.
//!
//! The grid is cut into contiguous bands, one per scanner, along the longer
//! axis. Each band is swept by a coverage pattern picked round-robin
//! (row-major, column-major, ...), so every cell lands on exactly one path.

use crate::types::Position;

type PatternGenerator = fn(Band) -> Vec<Position>;

const PATTERNS: [PatternGenerator; 2] = [row_major, column_major];

/// Half-open rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug)]
struct Band {
    x0: i32,
    x1: i32,
    y0: i32,
    y1: i32,
}

#[derive(Debug, Default)]
pub struct Planner {
    dims: Option<(i32, i32)>,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the area to cover. Non-positive dimensions leave the planner
    /// unconfigured.
    pub fn configure(&mut self, width: i32, height: i32) {
        self.dims = (width > 0 && height > 0).then_some((width, height));
    }

    pub fn is_configured(&self) -> bool {
        self.dims.is_some()
    }

    /// One path per scanner; empty if unconfigured or `agent_count == 0`.
    ///
    /// With more scanners than rows/columns along the split axis, the
    /// surplus scanners receive empty paths.
    pub fn build_scan_plans(&self, agent_count: usize) -> Vec<Vec<Position>> {
        let Some((width, height)) = self.dims else {
            return Vec::new();
        };
        if agent_count == 0 {
            return Vec::new();
        }

        let split_rows = height >= width;
        let extent = (if split_rows { height } else { width }) as usize;

        (0..agent_count)
            .map(|idx| {
                let start = (idx * extent / agent_count) as i32;
                let end = ((idx + 1) * extent / agent_count) as i32;
                let band = if split_rows {
                    Band {
                        x0: 0,
                        x1: width,
                        y0: start,
                        y1: end,
                    }
                } else {
                    Band {
                        x0: start,
                        x1: end,
                        y0: 0,
                        y1: height,
                    }
                };
                PATTERNS[idx % PATTERNS.len()](band)
            })
            .collect()
    }
}

fn row_major(band: Band) -> Vec<Position> {
    (band.y0..band.y1)
        .flat_map(|y| (band.x0..band.x1).map(move |x| Position::new(x, y)))
        .collect()
}

fn column_major(band: Band) -> Vec<Position> {
    (band.x0..band.x1)
        .flat_map(|x| (band.y0..band.y1).map(move |y| Position::new(x, y)))
        .collect()
}
