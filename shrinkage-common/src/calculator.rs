use log::trace;
use serde::{Deserialize, Serialize};

use crate::constants::{
    ANISOTROPY_FACTOR, CELL_MARGIN_FRACTION, CTE_GLASS, CTE_PI, GRID_COLS, GRID_ROWS, PPM,
    RELAXATION_FACTOR, TEMP_CHANGE_NO_BML, TEMP_CHANGE_WITH_BML, VISUAL_EXAGGERATION,
};
use crate::params::{ScanDirection, SimulationParams};
use crate::results::{Cell, SimulationResults};
use crate::vecmath::Vec2;

/// Intermediate values of the strain formula, before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainBreakdown {
    /// CTE_PI - CTE_GLASS (ppm/K)
    pub cte_mismatch: f64,
    /// Effective thermal load, depends on BML presence
    pub delta_t: f64,
    pub base_strain_ppm: f64,
    /// Base strain after the operator correction factor
    pub corrected_strain_ppm: f64,
    pub width_multiplier: f64,
    pub height_multiplier: f64,
}

/// Evaluates the thermal mismatch strain and assigns the anisotropy boost.
///
/// Strain = (CTE_PI - CTE_GLASS) * dT * relaxation, scaled linearly by the
/// correction factor (no clamping). The scan axis gets `ANISOTROPY_FACTOR`,
/// the other axis 1.0.
pub fn strain_breakdown(params: &SimulationParams) -> StrainBreakdown {
    let cte_mismatch = CTE_PI - CTE_GLASS;
    let delta_t = if params.has_bml { TEMP_CHANGE_WITH_BML } else { TEMP_CHANGE_NO_BML };
    let base_strain_ppm = cte_mismatch * delta_t * RELAXATION_FACTOR;
    let corrected_strain_ppm = base_strain_ppm * params.correction_factor;

    // Long axis is the glass height
    let (width_multiplier, height_multiplier) = match params.scan_direction {
        ScanDirection::LongAxis => (1.0, ANISOTROPY_FACTOR),
        ScanDirection::ShortAxis => (ANISOTROPY_FACTOR, 1.0),
    };

    StrainBreakdown {
        cte_mismatch,
        delta_t,
        base_strain_ppm,
        corrected_strain_ppm,
        width_multiplier,
        height_multiplier,
    }
}

/// Exaggerated shrink multiplier used for cell layout only.
#[inline]
pub fn visual_factor(ppm: i64) -> f64 {
    1.0 - (ppm as f64 * VISUAL_EXAGGERATION) / PPM
}

/// Physical shrink multiplier.
#[inline]
pub fn real_factor(ppm: i64) -> f64 {
    1.0 - ppm as f64 / PPM
}

// Round half away from zero; non-finite strain saturates on the cast (NaN -> 0).
fn round_ppm(strain_ppm: f64) -> i64 {
    strain_ppm.round() as i64
}

/// Computes per-axis shrinkage and the before/after cell grid for one parameter set.
///
/// Pure and total: identical inputs give identical outputs, and degenerate
/// dimensions produce degenerate (possibly non-finite) geometry rather than an error.
pub fn compute(params: &SimulationParams) -> SimulationResults {
    let strain = strain_breakdown(params);
    let shrinkage_width_ppm = round_ppm(strain.corrected_strain_ppm * strain.width_multiplier);
    let shrinkage_height_ppm = round_ppm(strain.corrected_strain_ppm * strain.height_multiplier);
    trace!("Strain breakdown: {:?}", strain);

    let width = params.width;
    let height = params.height;
    let slot_w = width / GRID_COLS as f64;
    let slot_h = height / GRID_ROWS as f64;

    let margin_x = slot_w * CELL_MARGIN_FRACTION;
    let margin_y = slot_h * CELL_MARGIN_FRACTION;
    let cell_width = slot_w - 2.0 * margin_x;
    let cell_height = slot_h - 2.0 * margin_y;
    let is_width_long_axis = cell_width > cell_height;

    let visual_x = visual_factor(shrinkage_width_ppm);
    let visual_y = visual_factor(shrinkage_height_ppm);
    let shrunken_width = cell_width * visual_x;
    let shrunken_height = cell_height * visual_y;

    let glass_center = Vec2::new(width / 2.0, height / 2.0);

    let mut cells = Vec::with_capacity(GRID_COLS * GRID_ROWS);
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            let slot_center = Vec2::new(
                col as f64 * slot_w + slot_w / 2.0,
                row as f64 * slot_h + slot_h / 2.0,
            );

            // Cells move toward the glass center by the same per-axis factor they shrink by
            let offset = slot_center - glass_center;
            let new_center = glass_center + offset.scale_xy(visual_x, visual_y);

            cells.push(Cell {
                id: row * GRID_COLS + col,
                row,
                col,
                x: slot_center.x - cell_width / 2.0,
                y: slot_center.y - cell_height / 2.0,
                width: cell_width,
                height: cell_height,
                shrunken_x: new_center.x - shrunken_width / 2.0,
                shrunken_y: new_center.y - shrunken_height / 2.0,
                shrunken_width,
                shrunken_height,
            });
        }
    }

    SimulationResults {
        original_width: width,
        original_height: height,
        new_width: width * real_factor(shrinkage_width_ppm),
        new_height: height * real_factor(shrinkage_height_ppm),
        shrinkage_width_ppm,
        shrinkage_height_ppm,
        cells,
        is_width_long_axis,
        scan_direction: params.scan_direction,
    }
}
