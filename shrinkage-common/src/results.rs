use serde::{Deserialize, Serialize};

use crate::params::ScanDirection;
use crate::vecmath::Vec2;

/// One display cell on the mother glass, before and after (exaggerated) shrinkage.
/// All rectangles are top-left anchored in glass-local millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// `row * GRID_COLS + col`
    pub id: usize,
    pub row: usize,
    pub col: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub shrunken_x: f64,
    pub shrunken_y: f64,
    pub shrunken_width: f64,
    pub shrunken_height: f64,
}

impl Cell {
    /// Center of the original rectangle.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y) + Vec2::new(self.width, self.height) * 0.5
    }

    /// Center of the shrunken rectangle.
    pub fn shrunken_center(&self) -> Vec2 {
        Vec2::new(self.shrunken_x, self.shrunken_y)
            + Vec2::new(self.shrunken_width, self.shrunken_height) * 0.5
    }
}

/// Output of one shrinkage calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    pub original_width: f64,
    pub original_height: f64,
    /// Glass size after shrinkage, using the true (unexaggerated) factor
    pub new_width: f64,
    pub new_height: f64,
    pub shrinkage_width_ppm: i64,
    pub shrinkage_height_ppm: i64,
    /// Row-major, `GRID_COLS * GRID_ROWS` entries
    pub cells: Vec<Cell>,
    /// True when a single cell is wider than it is tall. Only decides which
    /// PPM value is labelled as the cell long axis.
    pub is_width_long_axis: bool,
    /// Scan direction the results were computed for
    pub scan_direction: ScanDirection,
}

impl SimulationResults {
    /// Shrinkage along the long axis of an individual cell.
    pub fn cell_long_axis_ppm(&self) -> i64 {
        if self.is_width_long_axis {
            self.shrinkage_width_ppm
        } else {
            self.shrinkage_height_ppm
        }
    }

    /// Shrinkage along the short axis of an individual cell.
    pub fn cell_short_axis_ppm(&self) -> i64 {
        if self.is_width_long_axis {
            self.shrinkage_height_ppm
        } else {
            self.shrinkage_width_ppm
        }
    }
}
