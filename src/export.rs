//! Plain-text export of a finished note.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Render transcript and summary into the two-section text document.
///
/// Layout is fixed: transcript first, each header underlined with `=`, one
/// blank line between sections. Empty strings produce empty section bodies.
pub fn render(transcript: &str, summary: &str) -> String {
    format!(
        "{}\n\n{}",
        section("Transcript", transcript),
        section("Summary", summary)
    )
}

fn section(header: &str, body: &str) -> String {
    format!("{}\n{}\n{}", header, "=".repeat(header.len()), body)
}

/// Write the rendered document to disk. The save is user-triggered and
/// leaves no server-side state behind.
pub fn write_document(path: &Path, transcript: &str, summary: &str) -> Result<()> {
    std::fs::write(path, render(transcript, summary))
        .with_context(|| format!("Failed to write note to {}", path.display()))?;

    info!("Note exported to {}", path.display());
    Ok(())
}
