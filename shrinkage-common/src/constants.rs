use std::ops::RangeInclusive;

// Physics constants (approximated for the simulation, not measured material data)

/// CTE of the polyimide substrate (ppm/K)
pub const CTE_PI: f64 = 60.0;
/// CTE of the carrier glass (ppm/K)
pub const CTE_GLASS: f64 = 3.0;
/// Effective thermal load without a block metal layer
pub const TEMP_CHANGE_NO_BML: f64 = 7.0;
/// Reduced thermal load when the BML acts as a heat sink
pub const TEMP_CHANGE_WITH_BML: f64 = 3.5;
pub const RELAXATION_FACTOR: f64 = 0.5;
/// Multiplier applied to the axis the ELA laser scans along
pub const ANISOTROPY_FACTOR: f64 = 2.5;

/// Display-only scale applied to cell layout so shrinkage is visible at glass scale.
/// Never applied to reported PPM values or to the new glass size.
pub const VISUAL_EXAGGERATION: f64 = 150.0;

/// Parts per million
pub const PPM: f64 = 1_000_000.0;

// Grid configuration (cells per mother glass)
pub const GRID_COLS: usize = 4;
pub const GRID_ROWS: usize = 10;

/// Margin on each side of a cell, as a fraction of its slot size
pub const CELL_MARGIN_FRACTION: f64 = 0.05;

// Defaults (A3 6G line glass)
pub const DEFAULT_GLASS_WIDTH_MM: f64 = 1500.0;
pub const DEFAULT_GLASS_HEIGHT_MM: f64 = 1850.0;
pub const DEFAULT_EXAGGERATION: f64 = 100.0;
pub const DEFAULT_CORRECTION_FACTOR: f64 = 1.0;

/// Range suggested to operators for the process correction factor. Not enforced.
pub const CORRECTION_FACTOR_HINT: RangeInclusive<f64> = 0.5..=2.0;
