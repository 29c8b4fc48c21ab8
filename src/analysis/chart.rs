//! Fixed-size ASCII line chart of a size history.
//!
//! [`TrendChart::render`] only computes the grid; [`TrendChart::to_lines`]
//! turns it into printable rows with the min/max labels attached.

#![allow(missing_docs)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]

use crate::core::format::format_size;

pub const CHART_WIDTH: usize = 50;
pub const CHART_HEIGHT: usize = 8;

pub const POINT_GLYPH: char = '●';
pub const LINE_GLYPH: char = '─';
const BLANK: char = ' ';

const INDENT: &str = "     ";
const FOOTER: &str = "oldest → newest";

/// Rendered grid plus the range it was normalized against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendChart {
    grid: Vec<Vec<char>>,
    min_bytes: u64,
    max_bytes: u64,
}

impl TrendChart {
    /// Render `history` (oldest first). Fewer than two points render nothing.
    pub fn render(history: &[u64]) -> Option<Self> {
        if history.len() < 2 {
            return None;
        }
        let min_bytes = history.iter().copied().min()?;
        let max_bytes = history.iter().copied().max()?;

        let mut grid = vec![vec![BLANK; CHART_WIDTH]; CHART_HEIGHT];
        let points: Vec<(usize, usize)> = history
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                (
                    column_for(i, history.len()),
                    row_for(size, min_bytes, max_bytes),
                )
            })
            .collect();

        for &(col, row) in &points {
            grid[row][col] = POINT_GLYPH;
        }
        for pair in points.windows(2) {
            draw_connector(&mut grid, pair[0], pair[1]);
        }

        Some(Self {
            grid,
            min_bytes,
            max_bytes,
        })
    }

    pub const fn min_bytes(&self) -> u64 {
        self.min_bytes
    }

    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Glyph at `(row, col)`, row 0 being the top.
    pub fn cell(&self, row: usize, col: usize) -> Option<char> {
        self.grid.get(row)?.get(col).copied()
    }

    /// Grid rows without labels.
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        self.grid.iter().map(|row| row.iter().collect())
    }

    /// Printable chart: max label, grid rows (min label on the last), footer.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(CHART_HEIGHT + 2);
        lines.push(format!("{INDENT}{}", format_size(self.max_bytes)));
        let last = CHART_HEIGHT - 1;
        for (i, row) in self.rows().enumerate() {
            if i == last {
                lines.push(format!("{INDENT}{row} {}", format_size(self.min_bytes)));
            } else {
                lines.push(format!("{INDENT}{row}"));
            }
        }
        lines.push(format!("{INDENT}{FOOTER:<CHART_WIDTH$}"));
        lines
    }
}

fn column_for(index: usize, count: usize) -> usize {
    (index * CHART_WIDTH / count).min(CHART_WIDTH - 1)
}

fn row_for(size: u64, min: u64, max: u64) -> usize {
    if max == min {
        return CHART_HEIGHT / 2;
    }
    let normalized = (size - min) as f64 / (max - min) as f64;
    let offset = (normalized * (CHART_HEIGHT - 1) as f64) as usize;
    CHART_HEIGHT - 1 - offset.min(CHART_HEIGHT - 1)
}

fn draw_connector(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize)) {
    let (x0, y0) = from;
    let (x1, y1) = to;
    let span = (x1 - x0 + 1) as f64;
    let rise = y1 as i64 - y0 as i64;

    for x in x0..=x1.min(CHART_WIDTH - 1) {
        let progress = (x - x0) as f64 / span;
        let y = y0 as i64 + (progress * rise as f64) as i64;
        let Ok(y) = usize::try_from(y) else {
            continue;
        };
        if let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x)) {
            if *cell == BLANK {
                *cell = LINE_GLYPH;
            }
        }
    }
}
