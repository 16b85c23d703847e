//! Output module for reporting crawls and exporting graphs
//!
//! This module handles:
//! - Printing crawl progress reports
//! - Exporting processed graphs as JSON
//! - Generating markdown summaries of processed graphs

mod export;
mod markdown;
pub mod stats;
mod traits;

pub use export::JsonExporter;
pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownExporter};
pub use stats::{print_crawl_report, CrawlReport};
pub use traits::{GraphExporter, GraphSummary, OutputError, OutputResult};

use crate::storage::DataStore;
use std::path::PathBuf;

/// Exports a stored graph with every given exporter
///
/// # Arguments
///
/// * `store` - Store holding the processed graph
/// * `crawl_id` - The crawl whose graph to export
/// * `exporters` - Formats to write
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - The written files, in exporter order
/// * `Err(OutputError::GraphNotFound)` - No graph was stored for the crawl
pub async fn export_graph(
    store: &dyn DataStore,
    crawl_id: &str,
    exporters: &[&dyn GraphExporter],
) -> crate::Result<Vec<PathBuf>> {
    let graph = store
        .fetch_processed_graph(crawl_id)
        .await?
        .ok_or_else(|| OutputError::GraphNotFound(crawl_id.to_string()))?;

    let mut written = Vec::with_capacity(exporters.len());
    for exporter in exporters {
        written.push(exporter.export(crawl_id, &graph)?);
    }
    Ok(written)
}
