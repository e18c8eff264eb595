use anyhow::{Context, Result};
use log::info;
use shrinkage_common::constants::{GRID_COLS, GRID_ROWS};
use shrinkage_common::{OutputConfig, RunReport, ScenarioRecord};
use std::path::{Path, PathBuf};

/// Writes the report in the configured format. Returns the path written.
pub fn save_report(report: &RunReport, output: &OutputConfig) -> Result<PathBuf> {
    let filename = PathBuf::from(format!(
        "{}_report.{}",
        output.base_filename,
        output.format.extension()
    ));
    report.save(&filename, output.format)?;
    info!("Report with {} scenario(s) saved to {} ({:?} format)",
        report.scenarios.len(), filename.display(), output.format);
    Ok(filename)
}

/// Writes every cell of every scenario, original and shrunken geometry, as CSV.
pub fn save_cells_csv(report: &RunReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Error creating CSV file '{}'", path.display()))?;
    writer.write_record([
        "scenario", "id", "row", "col",
        "x_mm", "y_mm", "width_mm", "height_mm",
        "shrunken_x_mm", "shrunken_y_mm", "shrunken_width_mm", "shrunken_height_mm",
    ])?;
    for record in &report.scenarios {
        for cell in &record.results.cells {
            writer.write_record(&[
                record.name.clone(),
                cell.id.to_string(),
                cell.row.to_string(),
                cell.col.to_string(),
                format!("{:.4}", cell.x),
                format!("{:.4}", cell.y),
                format!("{:.4}", cell.width),
                format!("{:.4}", cell.height),
                format!("{:.4}", cell.shrunken_x),
                format!("{:.4}", cell.shrunken_y),
                format!("{:.4}", cell.shrunken_width),
                format!("{:.4}", cell.shrunken_height),
            ])?;
        }
    }
    writer.flush()?;
    info!("Cell geometry saved to {}", path.display());
    Ok(())
}

/// Logs the summary metrics of one scenario.
pub fn log_summary(record: &ScenarioRecord) {
    let params = &record.params;
    let results = &record.results;
    info!("Scenario '{}':", record.name);
    info!("  BML: {} | Scan: {} | Process factor: {:.1}x",
        if params.has_bml { "yes" } else { "no" }, params.scan_direction, params.correction_factor);
    info!("  Cell long axis:  {} PPM", results.cell_long_axis_ppm());
    info!("  Cell short axis: {} PPM", results.cell_short_axis_ppm());
    info!("  Glass: {:.0} x {:.0} mm -> {:.4} x {:.4} mm",
        results.original_width, results.original_height, results.new_width, results.new_height);
    info!("  Grid layout: {} x {} ({} cells)", GRID_COLS, GRID_ROWS, results.cells.len());
}
