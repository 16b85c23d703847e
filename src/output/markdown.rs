//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of a processed
//! graph: the crawl target, users per level and the top games table.

use crate::output::traits::{GraphExporter, GraphSummary, OutputResult};
use crate::storage::UsersGraphData;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `<crawl_id>.md` files into a directory
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    export_dir: PathBuf,
}

impl MarkdownExporter {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
        }
    }
}

impl GraphExporter for MarkdownExporter {
    fn export(&self, crawl_id: &str, graph: &UsersGraphData) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.export_dir)?;
        let path = self.export_dir.join(format!("{}.md", crawl_id));
        generate_markdown_summary(&GraphSummary::from_graph(crawl_id, graph), &path)?;
        Ok(path)
    }
}

/// Generates a markdown summary of a graph
///
/// # Arguments
///
/// * `summary` - The graph summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &GraphSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a graph summary as markdown
///
/// # Arguments
///
/// * `summary` - The graph summary data
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(summary: &GraphSummary) -> String {
    let mut md = String::new();

    md.push_str("# Steam Friend Graph\n\n");

    md.push_str("## Crawl Information\n\n");
    md.push_str(&format!("- **Crawl ID**: {}\n", summary.crawl_id));
    if summary.root_username.is_empty() {
        md.push_str(&format!("- **Target**: {}\n", summary.root_steam_id));
    } else {
        md.push_str(&format!(
            "- **Target**: {} ({})\n",
            summary.root_username, summary.root_steam_id
        ));
    }
    md.push_str(&format!("- **Users**: {}\n\n", summary.total_users));

    md.push_str("## Users per Level\n\n");
    md.push_str("| Level | Users |\n");
    md.push_str("|-------|-------|\n");
    for (level, count) in &summary.users_per_level {
        md.push_str(&format!("| {} | {} |\n", level, count));
    }
    md.push('\n');

    if !summary.top_games.is_empty() {
        md.push_str("## Top Games\n\n");
        md.push_str("| Rank | Game | Total Playtime (hours) |\n");
        md.push_str("|------|------|------------------------|\n");
        for (rank, game) in summary.top_games.iter().enumerate() {
            let name = if game.name.is_empty() {
                format!("App {}", game.app_id)
            } else {
                game.name.clone()
            };
            md.push_str(&format!(
                "| {} | {} | {:.1} |\n",
                rank + 1,
                name,
                game.total_playtime as f64 / 60.0
            ));
        }
        md.push('\n');
    }

    md
}
