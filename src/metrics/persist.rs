use crate::error::ReportError;
use crate::metrics::report::RunReport;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

/// Writes finished reports as timestamped JSON files
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `metrics-<YYYYMMDD-HHMMSS>` for the report's finish time
    pub fn file_stem(report: &RunReport) -> String {
        format!("metrics-{}", report.finished_at.format("%Y%m%d-%H%M%S"))
    }

    /// Write `report` as pretty JSON and return the created path.
    ///
    /// Never overwrites: a name already taken gets a `-1`, `-2`, ... suffix.
    pub fn write(&self, report: &RunReport) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(report)?;
        let stem = Self::file_stem(report);

        let mut attempt = 0u32;
        loop {
            let name = match attempt {
                0 => format!("{}.json", stem),
                n => format!("{}-{}.json", stem, n),
            };
            let path = self.dir.join(name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())?;
                    file.write_all(b"\n")?;
                    log::info!("Report written to {}", path.display());
                    return Ok(path);
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }
}
