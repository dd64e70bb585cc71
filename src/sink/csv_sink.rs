/// CSV bar sink - one append-only file per symbol
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{BarError, Result};
use crate::sink::BarSink;
use crate::types::Bar;

/// Row layout of the CSV files; field order is the column order
#[derive(Debug, Serialize)]
struct CsvRow {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    open_timestamp: i64,
    close_timestamp: i64,
}

impl From<&Bar> for CsvRow {
    fn from(bar: &Bar) -> Self {
        CsvRow {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            open_timestamp: bar.open_timestamp,
            close_timestamp: bar.close_timestamp,
        }
    }
}

/// Writes bars to `<directory>/<prefix>_<symbol>.csv`
pub struct CsvSink {
    prefix: String,
    directory: PathBuf,
}

impl CsvSink {
    pub fn new(prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        CsvSink {
            prefix: prefix.into(),
            directory: directory.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.directory.join(format!("{}_{}.csv", self.prefix, symbol))
    }

    /// Append one row, writing the header first if the file is new (or empty)
    pub async fn write_bar(&self, symbol: &str, bar: &Bar) -> Result<()> {
        let path = self.path_for(symbol);
        let needs_header = needs_header(&path).await?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(Vec::new());
        writer.serialize(CsvRow::from(bar))?;
        let row = writer
            .into_inner()
            .map_err(|e| BarError::SinkFailed {
                sink: self.name().to_string(),
                message: format!("CSV buffer flush failed: {}", e),
            })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&row).await?;
        file.flush().await?;

        if needs_header {
            info!("📄 Created bar file {}", path.display());
        } else {
            debug!("Appended bar to {}", path.display());
        }

        Ok(())
    }
}

async fn needs_header(path: &Path) -> Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

impl BarSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn append<'a>(&'a self, symbol: &'a str, bar: &'a Bar) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.write_bar(symbol, bar))
    }
}
