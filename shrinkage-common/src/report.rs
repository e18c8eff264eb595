use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::config::OutputFormat;
use crate::params::SimulationParams;
use crate::results::SimulationResults;

/// The committed parameters of one scenario together with its results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub name: String,
    pub params: SimulationParams,
    pub results: SimulationResults,
}

/// Everything one engine run produces, as written to `<base>_report.<ext>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunReport {
    pub scenarios: Vec<ScenarioRecord>,
}

impl RunReport {
    /// Serializes the report in the given format.
    pub fn encode<W: Write>(&self, format: OutputFormat, writer: &mut W) -> Result<()> {
        match format {
            OutputFormat::Json => serde_json::to_writer(writer, self)
                .context("Error serializing report to JSON")?,
            OutputFormat::Bincode => bincode::serialize_into(writer, self)
                .context("Error serializing report to bincode")?,
            OutputFormat::Messagepack => rmp_serde::encode::write(writer, self)
                .context("Error serializing report to MessagePack")?,
        }
        Ok(())
    }

    pub fn decode<R: Read>(format: OutputFormat, reader: R) -> Result<Self> {
        let report: RunReport = match format {
            OutputFormat::Json => serde_json::from_reader(reader)
                .context("Error deserializing JSON report")?,
            OutputFormat::Bincode => bincode::deserialize_from(reader)
                .context("Error deserializing bincode report")?,
            OutputFormat::Messagepack => rmp_serde::decode::from_read(reader)
                .context("Error deserializing MessagePack report")?,
        };
        Ok(report)
    }

    /// Writes the report to `path`, creating or truncating the file.
    pub fn save<P: AsRef<Path>>(&self, path: P, format: OutputFormat) -> Result<()> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref)
            .with_context(|| format!("Error creating report file '{}'", path_ref.display()))?;
        let mut writer = BufWriter::new(file);
        self.encode(format, &mut writer)?;
        writer
            .flush()
            .with_context(|| format!("Error writing report file '{}'", path_ref.display()))?;
        Ok(())
    }

    /// Reads a report, choosing the decoder from the file extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let format = format_from_path(path_ref)?;
        let file = File::open(path_ref)
            .with_context(|| format!("Failed to open report file: {}", path_ref.display()))?;
        Self::decode(format, BufReader::new(file))
    }
}

/// Maps `.json`, `.bin` and `.msgpack` to their report format.
pub fn format_from_path(path: &Path) -> Result<OutputFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(OutputFormat::Json),
        Some("bin") => Ok(OutputFormat::Bincode),
        Some("msgpack") => Ok(OutputFormat::Messagepack),
        other => anyhow::bail!(
            "Unknown report extension {:?} for '{}' (expected json, bin or msgpack)",
            other,
            path.display()
        ),
    }
}
