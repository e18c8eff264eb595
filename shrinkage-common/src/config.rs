use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::constants::{CORRECTION_FACTOR_HINT, DEFAULT_EXAGGERATION};
use crate::params::{ScanDirection, SimulationParams};

// Mother glass dimensions
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GlassConfig {
    pub width_mm: f64,
    pub height_mm: f64,
}

// Process settings of the ELA step
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProcessConfig {
    pub has_bml: bool,
    pub scan_direction: ScanDirection,
    pub correction_factor: f64,
    #[serde(default = "default_exaggeration")]
    pub exaggeration: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Bincode,
    Messagepack,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::Messagepack => "msgpack",
        }
    }
}

// Output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_save_cells_csv")]
    pub save_cells_csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "ela_shrinkage".to_string(),
            format: OutputFormat::Json,
            save_cells_csv: true,
        }
    }
}

/// Name of the scenario built from the committed parameters themselves.
pub const BASELINE_NAME: &str = "baseline";

/// A named variation of the base parameters. Unset fields keep the base value.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub has_bml: Option<bool>,
    #[serde(default)]
    pub scan_direction: Option<ScanDirection>,
    #[serde(default)]
    pub correction_factor: Option<f64>,
    #[serde(default)]
    pub width_mm: Option<f64>,
    #[serde(default)]
    pub height_mm: Option<f64>,
}

impl ScenarioConfig {
    /// Applies this scenario's overrides on top of `base`.
    pub fn apply(&self, base: &SimulationParams) -> SimulationParams {
        SimulationParams {
            width: self.width_mm.unwrap_or(base.width),
            height: self.height_mm.unwrap_or(base.height),
            has_bml: self.has_bml.unwrap_or(base.has_bml),
            scan_direction: self.scan_direction.unwrap_or(base.scan_direction),
            exaggeration: base.exaggeration,
            correction_factor: self.correction_factor.unwrap_or(base.correction_factor),
        }
    }
}

fn default_exaggeration() -> f64 {
    DEFAULT_EXAGGERATION
}

fn default_save_cells_csv() -> bool {
    true
}

// Main run configuration structure, loaded from config.toml.
// `Default` is the built-in parameter set with default output and no scenarios.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    pub glass: GlassConfig,
    pub process: ProcessConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let params = SimulationParams::default();
        RunConfig {
            glass: GlassConfig {
                width_mm: params.width,
                height_mm: params.height,
            },
            process: ProcessConfig {
                has_bml: params.has_bml,
                scan_direction: params.scan_direction,
                correction_factor: params.correction_factor,
                exaggeration: params.exaggeration,
            },
            output: OutputConfig::default(),
            scenarios: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Loads the run configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;

        validate_glass(config.glass.width_mm, config.glass.height_mm, "glass")?;
        validate_correction_factor(config.process.correction_factor, "process")?;
        let mut names = HashSet::new();
        for scenario in &config.scenarios {
            if scenario.name.trim().is_empty() {
                anyhow::bail!("Every scenario needs a non-empty name.");
            }
            if scenario.name == BASELINE_NAME {
                anyhow::bail!("Scenario name '{}' is reserved for the committed parameters.", BASELINE_NAME);
            }
            if !names.insert(scenario.name.as_str()) {
                anyhow::bail!("Scenario name '{}' is used more than once.", scenario.name);
            }
            let params = scenario.apply(&config.params());
            validate_glass(params.width, params.height, &scenario.name)?;
            validate_correction_factor(params.correction_factor, &scenario.name)?;
        }

        Ok(config)
    }

    /// Converts the configuration into calculator parameters.
    pub fn params(&self) -> SimulationParams {
        SimulationParams {
            width: self.glass.width_mm,
            height: self.glass.height_mm,
            has_bml: self.process.has_bml,
            scan_direction: self.process.scan_direction,
            exaggeration: self.process.exaggeration,
            correction_factor: self.process.correction_factor,
        }
    }
}

/// Rejects glass dimensions the grid layout cannot represent.
pub fn validate_glass(width_mm: f64, height_mm: f64, source: &str) -> Result<()> {
    if !(width_mm.is_finite() && width_mm > 0.0) {
        anyhow::bail!("{}: glass width must be a positive number of mm, got {}.", source, width_mm);
    }
    if !(height_mm.is_finite() && height_mm > 0.0) {
        anyhow::bail!("{}: glass height must be a positive number of mm, got {}.", source, height_mm);
    }
    Ok(())
}

/// Rejects unusable correction factors and warns about ones outside the suggested range.
pub fn validate_correction_factor(correction_factor: f64, source: &str) -> Result<()> {
    if !(correction_factor.is_finite() && correction_factor > 0.0) {
        anyhow::bail!("{}: correction_factor must be positive, got {}.", source, correction_factor);
    }
    if !CORRECTION_FACTOR_HINT.contains(&correction_factor) {
        warn!(
            "{}: correction_factor {:.2} is outside the suggested range [{:.1}, {:.1}].",
            source,
            correction_factor,
            CORRECTION_FACTOR_HINT.start(),
            CORRECTION_FACTOR_HINT.end()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [glass]
        width_mm = 1500.0
        height_mm = 1850.0

        [process]
        has_bml = false
        scan_direction = "short_axis"
        correction_factor = 1.2
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = RunConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.process.exaggeration, DEFAULT_EXAGGERATION);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.save_cells_csv);
        assert!(config.scenarios.is_empty());

        let params = config.params();
        assert!(!params.has_bml);
        assert_eq!(params.scan_direction, ScanDirection::ShortAxis);
        assert_eq!(params.correction_factor, 1.2);
    }

    #[test]
    fn test_full_config_with_scenarios() {
        let text = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [output]
            base_filename = "line_a3"
            format = "messagepack"
            save_cells_csv = false

            [[scenarios]]
            name = "bml"
            has_bml = true

            [[scenarios]]
            name = "long scan, hot"
            scan_direction = "long_axis"
            correction_factor = 1.8
            "#
        );
        let config = RunConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.output.format, OutputFormat::Messagepack);
        assert_eq!(config.output.format.extension(), "msgpack");
        assert_eq!(config.scenarios.len(), 2);

        let base = config.params();
        let bml = config.scenarios[0].apply(&base);
        assert!(bml.has_bml);
        assert_eq!(bml.scan_direction, ScanDirection::ShortAxis);
        assert_eq!(bml.correction_factor, 1.2);

        let hot = config.scenarios[1].apply(&base);
        assert!(!hot.has_bml);
        assert_eq!(hot.scan_direction, ScanDirection::LongAxis);
        assert_eq!(hot.correction_factor, 1.8);
        assert_eq!(hot.width, 1500.0);
    }

    #[test]
    fn test_rejects_non_positive_glass() {
        let text = MINIMAL.replace("width_mm = 1500.0", "width_mm = 0.0");
        assert!(RunConfig::from_toml_str(&text).is_err());
        let text = MINIMAL.replace("height_mm = 1850.0", "height_mm = -5.0");
        assert!(RunConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_rejects_bad_correction_factor() {
        let text = MINIMAL.replace("correction_factor = 1.2", "correction_factor = 0.0");
        assert!(RunConfig::from_toml_str(&text).is_err());
        let text = MINIMAL.replace("correction_factor = 1.2", "correction_factor = nan");
        assert!(RunConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_out_of_hint_correction_factor_is_accepted() {
        let text = MINIMAL.replace("correction_factor = 1.2", "correction_factor = 3.0");
        let config = RunConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.params().correction_factor, 3.0);
    }

    #[test]
    fn test_rejects_bad_scenario() {
        let text = format!("{}\n[[scenarios]]\nname = \"thin\"\nwidth_mm = -1.0\n", MINIMAL);
        assert!(RunConfig::from_toml_str(&text).is_err());
        let text = format!("{}\n[[scenarios]]\nname = \" \"\n", MINIMAL);
        assert!(RunConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_rejects_duplicate_scenario_names() {
        let text = format!("{}\n[[scenarios]]\nname = \"a b\"\n\n[[scenarios]]\nname = \"a b\"\nhas_bml = true\n", MINIMAL);
        let err = RunConfig::from_toml_str(&text).unwrap_err();
        assert!(err.to_string().contains("more than once"), "{}", err);
    }

    #[test]
    fn test_rejects_reserved_baseline_name() {
        let text = format!("{}\n[[scenarios]]\nname = \"baseline\"\nhas_bml = true\n", MINIMAL);
        assert!(RunConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_default_config_matches_default_params() {
        let config = RunConfig::default();
        assert_eq!(config.params(), SimulationParams::default());
        assert!(config.scenarios.is_empty());
        assert_eq!(config.output.base_filename, "ela_shrinkage");
    }

    #[test]
    fn test_unknown_scan_direction_fails() {
        let text = MINIMAL.replace("short_axis", "diagonal");
        assert!(RunConfig::from_toml_str(&text).is_err());
    }
}
