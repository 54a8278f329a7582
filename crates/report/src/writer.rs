//! Results directory writer
//!
//! One `<uuid>-result.json` per scenario; every attachment's bytes go to
//! their own `<uuid>-attachment.<ext>` file next to it.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ReportResult;
use crate::model::{AttachmentRecord, ReportEntry, ScenarioReport};

pub struct ResultsWriter {
    output_dir: PathBuf,
}

impl ResultsWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> ReportResult<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    /// Write a scenario report and its attachments, returning the result file path
    pub fn write_scenario(&self, report: &ScenarioReport) -> ReportResult<PathBuf> {
        let mut report = report.clone();
        for entry in report.children.iter_mut() {
            self.write_entry(entry)?;
        }

        let path = self.output_dir.join(format!("{}-result.json", report.uuid));
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json)?;

        info!("Report for '{}' written to: {}", report.name, path.display());
        Ok(path)
    }

    fn write_entry(&self, entry: &mut ReportEntry) -> ReportResult<()> {
        match entry {
            ReportEntry::Step(step) => {
                for child in step.children.iter_mut() {
                    self.write_entry(child)?;
                }
            }
            ReportEntry::Attachment(attachment) => self.write_attachment(attachment)?,
        }
        Ok(())
    }

    fn write_attachment(&self, attachment: &mut AttachmentRecord) -> ReportResult<()> {
        let file_name = format!(
            "{}-attachment.{}",
            Uuid::new_v4(),
            extension_for(&attachment.mime_type)
        );
        std::fs::write(self.output_dir.join(&file_name), &attachment.content)?;
        debug!("Attachment '{}' -> {}", attachment.name, file_name);
        attachment.source = Some(file_name);
        Ok(())
    }

    /// Read back every scenario report in a results directory
    pub fn read_all(dir: &Path) -> ReportResult<Vec<ScenarioReport>> {
        let mut reports = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_result = path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with("-result.json"))
                .unwrap_or(false);

            if is_result {
                let content = std::fs::read_to_string(&path)?;
                reports.push(serde_json::from_str(&content)?);
            }
        }

        reports.sort_by_key(|r: &ScenarioReport| r.start);
        Ok(reports)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/svg+xml" => "svg",
        "text/html" => "html",
        "text/csv" => "csv",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "application/zip" => "zip",
        "video/webm" => "webm",
        m if m.starts_with("text/") => "txt",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("image/png", "png")]
    #[test_case("application/json", "json")]
    #[test_case("text/plain", "txt")]
    #[test_case("application/x-unknown", "bin")]
    fn test_extension_for(mime: &str, ext: &str) {
        assert_eq!(extension_for(mime), ext);
    }
}
