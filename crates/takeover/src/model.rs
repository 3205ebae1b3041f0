use crate::Result;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::fmt::Write as FmtWrite;
use std::io::Write;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

// region:        --- Models

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Match {
    pub target: String,
    pub service: String,
    pub vulnerable: bool,
    pub nxdomain: bool,
}

/// Matches of a whole run, in probe completion order.
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub probed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub matches: Vec<Match>,
}

impl ScanReport {
    pub fn retain_vulnerable(&mut self) {
        self.matches.retain(|m| m.vulnerable);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "txt" => Some(OutputFormat::Txt),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    #[serde(flatten)]
    report: &'a ScanReport,
}

// endregion:     --- Models

// region:        --- Exporting utils

/// Writes the report to `sink`, a `None` sink is a dry run.
///
/// Io failures are returned as is, the caller knows where the sink points to.
pub fn write_report(
    report: &ScanReport,
    sink: Option<&mut dyn Write>,
    format: OutputFormat,
) -> Result<()> {
    let Some(sink) = sink else {
        return Ok(());
    };

    let content = match format {
        OutputFormat::Txt => to_lines(report)?,
        OutputFormat::Json => to_json(report)?,
    };

    sink.write_all(content.as_bytes())?;
    sink.flush()?;
    Ok(())
}

fn to_lines(report: &ScanReport) -> Result<String> {
    let mut content = String::new();
    for m in &report.matches {
        writeln!(&mut content, "{}\t{}\t{}", m.target, m.service, m.vulnerable)?;
    }
    Ok(content)
}

fn to_json(report: &ScanReport) -> Result<String> {
    let generated_at = OffsetDateTime::now_utc().format(&Rfc3339)?;
    let mut json = to_string_pretty(&JsonReport {
        generated_at,
        report,
    })?;
    json.push('\n');
    Ok(json)
}

// endregion:     --- Exporting utils
