pub mod calculator;
pub mod config;
pub mod constants;
pub mod params;
pub mod report;
pub mod results;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use calculator::{compute, real_factor, strain_breakdown, visual_factor, StrainBreakdown};
pub use config::{OutputConfig, OutputFormat, RunConfig, ScenarioConfig, BASELINE_NAME};
pub use params::{ScanDirection, SimulationParams};
pub use report::{RunReport, ScenarioRecord};
pub use results::{Cell, SimulationResults};
pub use vecmath::Vec2;
