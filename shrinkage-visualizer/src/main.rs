use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, LevelFilter};
use palette::Srgb;
use rayon::prelude::*;
use shrinkage_common::constants::{GRID_COLS, GRID_ROWS};
use shrinkage_common::{compute, RunConfig, RunReport, ScanDirection, ScenarioRecord, SimulationResults, BASELINE_NAME};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

/// Command-line arguments for the visualizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Report file written by the engine (.json, .bin or .msgpack)
    #[arg(short, long, required_unless_present = "config")]
    input: Option<PathBuf>,

    /// Compute the scenarios of this config.toml directly instead of reading a report
    #[arg(long, conflicts_with = "input")]
    config: Option<PathBuf>,

    /// Directory for the rendered PNG files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Filename prefix, images are named <prefix>_<scenario>.png
    #[arg(long, default_value = "shrinkage")]
    prefix: String,

    /// Only render the scenario with this name
    #[arg(long)]
    scenario: Option<String>,

    /// Width of the output image in pixels (height follows the glass aspect ratio)
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Margin around the glass in pixels, holds the scan indicator
    #[arg(long, default_value_t = 60)]
    padding: u32,

    /// Background color - a color name or #rrggbb
    #[arg(long, default_value = "white")]
    bg_color: String,

    /// Fill of the shrunken cells - a color name or #rrggbb
    #[arg(long, default_value = "#9DD1FA")]
    cell_color: String,

    /// Color of the scan direction arrow - a color name or #rrggbb
    #[arg(long, default_value = "#D32F2F")]
    arrow_color: String,
}

// Color definitions for named colors (RGBA format)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
    ("gray", [189, 189, 189, 255]),
];

/// Parse a color name or hex code to RGBA values
fn parse_color(color: &str) -> [u8; 4] {
    for &(name, rgba) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color) {
            return rgba;
        }
    }
    match Srgb::<u8>::from_str(color) {
        Ok(rgb) => [rgb.red, rgb.green, rgb.blue, 255],
        Err(_) => {
            // Default to black if color not found
            warn!("Color '{}' not recognized, using black.", color);
            [0, 0, 0, 255]
        }
    }
}

/// Colors used for one drawing
#[derive(Debug, Clone, Copy)]
struct ColorScheme {
    background: Rgba<u8>,
    glass_fill: Rgba<u8>,
    glass_outline: Rgba<u8>,
    original_outline: Rgba<u8>,
    shrunken_fill: Rgba<u8>,
    shrunken_outline: Rgba<u8>,
    arrow: Rgba<u8>,
}

impl ColorScheme {
    fn from_args(args: &Args) -> Self {
        ColorScheme {
            background: Rgba(parse_color(&args.bg_color)),
            glass_fill: Rgba(parse_color("#F0F9FF")),
            glass_outline: Rgba(parse_color("#90CAF9")),
            original_outline: Rgba(parse_color("gray")),
            shrunken_fill: Rgba(parse_color(&args.cell_color)),
            shrunken_outline: Rgba(parse_color("#1565C0")),
            arrow: Rgba(parse_color(&args.arrow_color)),
        }
    }
}

// Largest image side the renderer will allocate
const MAX_IMAGE_DIMENSION_PX: u32 = 16384;

/// Maps glass millimeters to image pixels.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    pixels_per_mm: f64,
    padding: f64,
    width_px: u32,
    height_px: u32,
}

impl Viewport {
    fn fit(glass_width_mm: f64, glass_height_mm: f64, width_px: u32, padding_px: u32) -> Result<Self> {
        if !(glass_width_mm.is_finite() && glass_width_mm > 0.0 && glass_height_mm.is_finite() && glass_height_mm > 0.0) {
            anyhow::bail!("Cannot draw a {} x {} mm glass.", glass_width_mm, glass_height_mm);
        }
        if width_px > MAX_IMAGE_DIMENSION_PX {
            anyhow::bail!("Image width {} px exceeds the {} px limit.", width_px, MAX_IMAGE_DIMENSION_PX);
        }
        let border = 2 * u64::from(padding_px);
        if u64::from(width_px) <= border {
            anyhow::bail!("Image width {} px leaves no room inside {} px padding.", width_px, padding_px);
        }
        let pixels_per_mm = (u64::from(width_px) - border) as f64 / glass_width_mm;
        let height = (glass_height_mm * pixels_per_mm).round() + border as f64;
        if !(height <= MAX_IMAGE_DIMENSION_PX as f64) {
            anyhow::bail!(
                "A {} x {} mm glass at {} px wide needs an image {} px tall, above the {} px limit.",
                glass_width_mm, glass_height_mm, width_px, height, MAX_IMAGE_DIMENSION_PX
            );
        }
        let height_px = height as u32;
        Ok(Viewport {
            pixels_per_mm,
            padding: padding_px as f64,
            width_px,
            height_px,
        })
    }

    fn to_px(&self, x_mm: f64, y_mm: f64) -> (i32, i32) {
        (
            (self.padding + x_mm * self.pixels_per_mm).round() as i32,
            (self.padding + y_mm * self.pixels_per_mm).round() as i32,
        )
    }

    /// Pixel rectangle of a top-left anchored mm rectangle. None if it has no visible area.
    fn rect(&self, x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64) -> Option<Rect> {
        let (x, y) = self.to_px(x_mm, y_mm);
        let w = (width_mm * self.pixels_per_mm).round();
        let h = (height_mm * self.pixels_per_mm).round();
        if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
            return None;
        }
        Some(Rect::at(x, y).of_size(w as u32, h as u32))
    }
}

/// Draw the scan direction arrow in the margin: pointing up along the left edge
/// for a long-axis scan, pointing right along the top edge for a short-axis scan.
fn draw_scan_arrow(image: &mut RgbaImage, results: &SimulationResults, viewport: &Viewport, color: Rgba<u8>) {
    let max_dim = results.original_width.max(results.original_height);
    let length = (max_dim * 0.2 * viewport.pixels_per_mm).round() as i32;
    let shaft = (viewport.padding / 15.0).round().max(2.0) as i32;
    let head = shaft * 3;
    let margin_mid = (viewport.padding / 3.0).round() as i32;

    match results.scan_direction {
        ScanDirection::LongAxis => {
            let x = margin_mid;
            let base_y = viewport.height_px as i32 - viewport.padding as i32;
            let tip_y = base_y - length;
            draw_filled_rect_mut(
                image,
                Rect::at(x - shaft / 2, tip_y + head).of_size(shaft.max(1) as u32, (length - head).max(1) as u32),
                color,
            );
            draw_polygon_mut(
                image,
                &[Point::new(x, tip_y), Point::new(x + head / 2, tip_y + head), Point::new(x - head / 2, tip_y + head)],
                color,
            );
        }
        ScanDirection::ShortAxis => {
            let y = margin_mid;
            let base_x = viewport.padding as i32;
            let tip_x = base_x + length;
            draw_filled_rect_mut(
                image,
                Rect::at(base_x, y - shaft / 2).of_size((length - head).max(1) as u32, shaft.max(1) as u32),
                color,
            );
            draw_polygon_mut(
                image,
                &[Point::new(tip_x, y), Point::new(tip_x - head, y - head / 2), Point::new(tip_x - head, y + head / 2)],
                color,
            );
        }
    }
}

/// Draw the glass, original cells (outlined) and shrunken cells (filled) of one result
fn draw_results(results: &SimulationResults, viewport: &Viewport, colors: &ColorScheme) -> RgbaImage {
    let mut image = ImageBuffer::from_pixel(viewport.width_px, viewport.height_px, colors.background);

    if let Some(glass) = viewport.rect(0.0, 0.0, results.original_width, results.original_height) {
        draw_filled_rect_mut(&mut image, glass, colors.glass_fill);
        draw_hollow_rect_mut(&mut image, glass, colors.glass_outline);
    }

    for cell in &results.cells {
        if let Some(original) = viewport.rect(cell.x, cell.y, cell.width, cell.height) {
            draw_hollow_rect_mut(&mut image, original, colors.original_outline);
        }
        if let Some(shrunken) = viewport.rect(cell.shrunken_x, cell.shrunken_y, cell.shrunken_width, cell.shrunken_height) {
            draw_filled_rect_mut(&mut image, shrunken, colors.shrunken_fill);
            draw_hollow_rect_mut(&mut image, shrunken, colors.shrunken_outline);
        }
    }

    draw_scan_arrow(&mut image, results, viewport, colors.arrow);
    image
}

/// Log the summary tiles shown next to the drawing
fn log_metrics(record: &ScenarioRecord) {
    let results = &record.results;
    let (long_dir, short_dir) = if results.is_width_long_axis {
        ("horizontal", "vertical")
    } else {
        ("vertical", "horizontal")
    };
    info!("[{}] Cell long axis: {} PPM ({} shrinkage)", record.name, results.cell_long_axis_ppm(), long_dir);
    info!("[{}] Cell short axis: {} PPM ({} shrinkage)", record.name, results.cell_short_axis_ppm(), short_dir);
    info!("[{}] Total glass size: {} x {} mm", record.name, results.original_width, results.original_height);
    info!("[{}] Grid layout: {} x {} | ELA scan: {}", record.name, GRID_COLS, GRID_ROWS, results.scan_direction);
}

/// Scenario names become part of a filename
fn file_stem(prefix: &str, scenario: &str) -> String {
    let safe: String = scenario
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}_{}", prefix, safe)
}

/// Distinct scenario names can still map to the same file, e.g. "a b" and "a_b".
fn check_unique_stems(report: &RunReport, prefix: &str) -> Result<()> {
    let mut stems = HashSet::new();
    for record in &report.scenarios {
        let stem = file_stem(prefix, &record.name);
        if !stems.insert(stem.clone()) {
            anyhow::bail!("Scenario '{}' would overwrite another image named {}.png.", record.name, stem);
        }
    }
    Ok(())
}

fn render_record(record: &ScenarioRecord, args: &Args, colors: &ColorScheme) -> Result<PathBuf> {
    let results = &record.results;
    let viewport = Viewport::fit(results.original_width, results.original_height, args.width, args.padding)
        .with_context(|| format!("Scenario '{}'", record.name))?;
    let image = draw_results(results, &viewport, colors);

    let path = args.output_dir.join(format!("{}.png", file_stem(&args.prefix, &record.name)));
    image
        .save(&path)
        .with_context(|| format!("Failed to write image to {}", path.display()))?;
    Ok(path)
}

/// Scenarios of a config file, computed in-process
fn report_from_config(path: &Path) -> Result<RunReport> {
    let config = RunConfig::load(path)?;
    let base = config.params();
    let mut inputs = vec![(BASELINE_NAME.to_string(), base)];
    inputs.extend(config.scenarios.iter().map(|s| (s.name.clone(), s.apply(&base))));
    Ok(RunReport {
        scenarios: inputs
            .into_iter()
            .map(|(name, params)| ScenarioRecord { results: compute(&params), name, params })
            .collect(),
    })
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    // Initialize logger
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    info!("Starting Shrinkage Visualizer...");

    let mut report = match (&args.input, &args.config) {
        (Some(input), _) => {
            info!("Input report: {}", input.display());
            RunReport::load(input)?
        }
        (None, Some(config)) => {
            info!("Computing scenarios from {}", config.display());
            report_from_config(config)?
        }
        (None, None) => anyhow::bail!("Either --input or --config is required."),
    };

    if let Some(name) = &args.scenario {
        report.scenarios.retain(|record| &record.name == name);
        if report.scenarios.is_empty() {
            anyhow::bail!("No scenario named '{}' in the input.", name);
        }
    }
    if report.scenarios.is_empty() {
        warn!("Input contains no scenarios. Exiting.");
        return Ok(());
    }

    check_unique_stems(&report, &args.prefix)?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory {}", args.output_dir.display()))?;

    let colors = ColorScheme::from_args(&args);
    for record in &report.scenarios {
        log_metrics(record);
    }

    // Set up progress bar
    let progress_bar = ProgressBar::new(report.scenarios.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images ({percent}%)")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let written: Vec<PathBuf> = report
        .scenarios
        .par_iter()
        .map(|record| {
            let path = render_record(record, &args, &colors);
            progress_bar.inc(1);
            path
        })
        .collect::<Result<_>>()?;
    progress_bar.finish_with_message(format!("Rendered {} images", written.len()));

    for path in &written {
        info!("Image saved to: {}", path.display());
    }
    info!("Rendering completed in {:.2?}", start_time.elapsed());

    Ok(())
}

// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use shrinkage_common::SimulationParams;

    fn test_args(output_dir: PathBuf) -> Args {
        Args {
            input: None,
            config: None,
            output_dir,
            prefix: String::from("test"),
            scenario: None,
            width: 400,
            padding: 20,
            bg_color: String::from("white"),
            cell_color: String::from("#9DD1FA"),
            arrow_color: String::from("#D32F2F"),
        }
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("White"), [255, 255, 255, 255]);
        assert_eq!(parse_color("#1565C0"), [0x15, 0x65, 0xC0, 255]);
        assert_eq!(parse_color("not-a-color"), [0, 0, 0, 255]);
    }

    #[test]
    fn test_viewport_keeps_aspect_ratio() {
        let viewport = Viewport::fit(1500.0, 1850.0, 400, 20).unwrap();
        assert!((viewport.pixels_per_mm - 0.24).abs() < 1e-12);
        assert_eq!(viewport.height_px, 444 + 40);
        assert_eq!(viewport.to_px(0.0, 0.0), (20, 20));
        assert_eq!(viewport.to_px(1500.0, 1850.0), (380, 464));
        assert!(viewport.rect(0.0, 0.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_viewport_rejects_degenerate_glass() {
        assert!(Viewport::fit(0.0, 1850.0, 400, 20).is_err());
        assert!(Viewport::fit(f64::NAN, 1850.0, 400, 20).is_err());
        assert!(Viewport::fit(1500.0, 1850.0, 40, 20).is_err());
    }

    #[test]
    fn test_viewport_rejects_oversized_image() {
        // Valid glass, but far too tall for the requested width
        assert!(Viewport::fit(1.0, 1.0e8, 1024, 60).is_err());
        assert!(Viewport::fit(1500.0, 1850.0, 1024, u32::MAX).is_err());
        assert!(Viewport::fit(1500.0, 1850.0, u32::MAX, 60).is_err());

        let viewport = Viewport::fit(1850.0, 1500.0, MAX_IMAGE_DIMENSION_PX, 0).unwrap();
        assert!(viewport.height_px <= MAX_IMAGE_DIMENSION_PX);
    }

    #[test]
    fn test_draw_default_results() {
        let args = test_args(std::env::temp_dir());
        let colors = ColorScheme::from_args(&args);
        let results = compute(&SimulationParams::default());
        let viewport = Viewport::fit(results.original_width, results.original_height, args.width, args.padding).unwrap();
        let image = draw_results(&results, &viewport, &colors);

        assert_eq!(image.dimensions(), (400, 484));
        assert_eq!(*image.get_pixel(1, 1), colors.background);

        let center = results.cells[0].shrunken_center();
        let (cx, cy) = viewport.to_px(center.x, center.y);
        assert_eq!(*image.get_pixel(cx as u32, cy as u32), colors.shrunken_fill);

        // Long-axis arrow runs up the left margin
        let arrow_x = (viewport.padding / 3.0).round() as u32;
        assert_eq!(*image.get_pixel(arrow_x, viewport.height_px - 25), colors.arrow);
    }

    #[test]
    fn test_short_axis_arrow_is_in_top_margin() {
        let args = test_args(std::env::temp_dir());
        let colors = ColorScheme::from_args(&args);
        let results = compute(&SimulationParams { scan_direction: ScanDirection::ShortAxis, ..SimulationParams::default() });
        let viewport = Viewport::fit(results.original_width, results.original_height, args.width, args.padding).unwrap();
        let image = draw_results(&results, &viewport, &colors);

        let arrow_y = (viewport.padding / 3.0).round() as u32;
        assert_eq!(*image.get_pixel(30, arrow_y), colors.arrow);
        assert_eq!(*image.get_pixel(399, arrow_y), colors.background);
    }

    #[test]
    fn test_file_stem_is_filesystem_safe() {
        assert_eq!(file_stem("shrinkage", "long scan/hot"), "shrinkage_long_scan_hot");
        assert_eq!(file_stem("shrinkage", "no_bml"), "shrinkage_no_bml");
    }

    #[test]
    fn test_colliding_file_stems_are_rejected() {
        let params = SimulationParams::default();
        let record = |name: &str| ScenarioRecord { name: name.into(), params, results: compute(&params) };

        let report = RunReport { scenarios: vec![record("baseline"), record("a b"), record("a_b")] };
        let err = check_unique_stems(&report, "test").unwrap_err();
        assert!(err.to_string().contains("test_a_b.png"), "{}", err);

        let report = RunReport { scenarios: vec![record("baseline"), record("a b"), record("a-b")] };
        assert!(check_unique_stems(&report, "test").is_ok());
    }

    #[test]
    fn test_render_record_writes_png() {
        let dir = std::env::temp_dir().join(format!("shrinkage_vis_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let args = test_args(dir.clone());
        let colors = ColorScheme::from_args(&args);
        let params = SimulationParams::default();
        let record = ScenarioRecord { name: "baseline".into(), params, results: compute(&params) };

        let path = render_record(&record, &args, &colors).unwrap();
        assert_eq!(path, dir.join("test_baseline.png"));
        let decoded = image::open(&path).unwrap();
        fs::remove_dir_all(&dir).ok();
        assert_eq!((decoded.width(), decoded.height()), (400, 484));
    }
}
