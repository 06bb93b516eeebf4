//! Input framing: a line count followed by that many assignment lines.

use anyhow::{bail, Context, Result};

/// Split raw input into the assignment lines it announces.
///
/// Blank lines before the count are skipped. Lines after the announced
/// count are ignored.
pub fn read_assignments(text: &str) -> Result<Vec<String>> {
    let mut lines = text.lines();

    let count_line = lines
        .by_ref()
        .find(|line| !line.trim().is_empty())
        .context("missing line count")?;
    let count: usize = count_line
        .trim()
        .parse()
        .with_context(|| format!("invalid line count '{}'", count_line.trim()))?;

    let assignments: Vec<String> = lines.take(count).map(str::to_string).collect();
    if assignments.len() < count {
        bail!(
            "expected {} assignment lines, found {}",
            count,
            assignments.len()
        );
    }
    Ok(assignments)
}
