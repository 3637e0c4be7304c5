use anyhow::Result;
use clap::ValueEnum;
use hierarchy_snapshot::PartialCapture;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Prints `value` in the structured formats, or hands it to `human`.
pub fn emit<T, F>(format: OutputFormat, value: &T, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    match format {
        OutputFormat::Human => human(value),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PartialReport {
    pub index_path: String,
    pub reason: String,
}

impl From<&PartialCapture> for PartialReport {
    fn from(partial: &PartialCapture) -> Self {
        Self {
            index_path: partial.index_path.to_string(),
            reason: partial.reason.clone(),
        }
    }
}

pub fn partial_reports(partial: &[PartialCapture]) -> Vec<PartialReport> {
    partial.iter().map(PartialReport::from).collect()
}
