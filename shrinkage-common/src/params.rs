use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    DEFAULT_CORRECTION_FACTOR, DEFAULT_EXAGGERATION, DEFAULT_GLASS_HEIGHT_MM, DEFAULT_GLASS_WIDTH_MM,
};

/// Physical axis of the mother glass the anneal laser scans along.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScanDirection {
    /// Scanning along the long (height, 1850 mm) direction
    LongAxis,
    /// Scanning along the short (width, 1500 mm) direction
    ShortAxis,
}

impl fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanDirection::LongAxis => write!(f, "long axis"),
            ScanDirection::ShortAxis => write!(f, "short axis"),
        }
    }
}

/// Inputs of one shrinkage calculation. Holds values only; validation happens
/// where the values enter the program (see `RunConfig::load`).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Mother glass width in mm
    pub width: f64,
    /// Mother glass height in mm
    pub height: f64,
    /// Block metal layer present beneath the panel
    pub has_bml: bool,
    pub scan_direction: ScanDirection,
    /// Reserved display knob. Carried through but not read by the calculator.
    pub exaggeration: f64,
    /// Linear multiplier on the computed strain
    pub correction_factor: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            width: DEFAULT_GLASS_WIDTH_MM,
            height: DEFAULT_GLASS_HEIGHT_MM,
            has_bml: true,
            scan_direction: ScanDirection::LongAxis,
            exaggeration: DEFAULT_EXAGGERATION,
            correction_factor: DEFAULT_CORRECTION_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = SimulationParams::default();
        assert_eq!(params.width, 1500.0);
        assert_eq!(params.height, 1850.0);
        assert!(params.has_bml);
        assert_eq!(params.scan_direction, ScanDirection::LongAxis);
        assert_eq!(params.exaggeration, 100.0);
        assert_eq!(params.correction_factor, 1.0);
    }

    #[test]
    fn test_scan_direction_serde_names() {
        assert_eq!(serde_json::to_string(&ScanDirection::LongAxis).unwrap(), "\"long_axis\"");
        let parsed: ScanDirection = serde_json::from_str("\"short_axis\"").unwrap();
        assert_eq!(parsed, ScanDirection::ShortAxis);
    }

    #[test]
    fn test_scan_direction_display() {
        assert_eq!(ScanDirection::LongAxis.to_string(), "long axis");
        assert_eq!(ScanDirection::ShortAxis.to_string(), "short axis");
    }
}
