use std::io::Write;
use std::path::PathBuf;

use crate::{Error, Reading, Result};

/// Where readings go. A log file only ever holds the latest reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    pub fn new(log_file: Option<PathBuf>) -> Self {
        log_file.map_or(Sink::Stdout, Sink::File)
    }

    pub fn emit(&self, reading: &Reading) -> Result<()> {
        let line = format_line(reading);
        match self {
            Sink::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(line.as_bytes())
                    .and_then(|()| stdout.flush())
                    .map_err(Error::Stdout)
            }
            Sink::File(path) => std::fs::write(path, line).map_err(|source| Error::Output {
                path: path.clone(),
                source,
            }),
        }
    }
}

/// `"<temperature> <humidity>\n"` with six decimals each.
pub fn format_line(reading: &Reading) -> String {
    format!(
        "{:.6} {:.6}\n",
        reading.temperature_celsius, reading.relative_humidity_pct
    )
}
