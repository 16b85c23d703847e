//! JSON export of processed graphs

use crate::output::traits::{GraphExporter, OutputResult};
use crate::storage::UsersGraphData;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;

/// Writes `<crawl_id>.json` files into a directory
#[derive(Debug, Clone)]
pub struct JsonExporter {
    export_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }
}

impl GraphExporter for JsonExporter {
    fn export(&self, crawl_id: &str, graph: &UsersGraphData) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join(format!("{}.json", crawl_id));

        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, graph)?;
        writer.flush()?;

        debug!(crawl_id, path = %path.display(), "Graph exported");
        Ok(path)
    }
}
