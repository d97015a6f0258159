//! Per-project result formatting.
//!
//! Renders one block per project: a summary line (result count, capped at
//! [`MAX_DISPLAY_RESULTS`], plus elapsed time) followed by one fenced snippet
//! block per hit.

use crate::client::Blob;
use std::fmt::Write;
use std::time::Duration;

/// Snippet blocks printed per project. Search over-fetches one extra hit so
/// the summary can say "5+" when more exist.
pub const MAX_DISPLAY_RESULTS: usize = 5;

/// Renders a project's search results and writes them to stdout.
pub fn print_project(project_name: &str, blobs: &[Blob], elapsed: Duration) {
    print!("{}", render_project(project_name, blobs, elapsed));
}

/// Renders a project's search results as one printable block.
#[must_use]
pub fn render_project(project_name: &str, blobs: &[Blob], elapsed: Duration) -> String {
    if blobs.is_empty() {
        return format!(
            "🔍 Project [{project_name}] has no code results, cost {} ms\n\n",
            elapsed.as_millis()
        );
    }

    let size = if blobs.len() > MAX_DISPLAY_RESULTS {
        format!("{MAX_DISPLAY_RESULTS}+")
    } else {
        blobs.len().to_string()
    };
    let comment = if blobs.len() > MAX_DISPLAY_RESULTS {
        format!(" (only show {MAX_DISPLAY_RESULTS} results)")
    } else {
        String::new()
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "🔍 Project [{project_name}] has [{size}] results{comment}, cost {} ms\n",
        elapsed.as_millis()
    );
    for blob in blobs.iter().take(MAX_DISPLAY_RESULTS) {
        let _ = writeln!(out, "👉 {}\n", blob.path);
        let _ = writeln!(out, "```# branch: {}, line: {}", blob.reference, blob.line);
        let _ = writeln!(out, "{}", normalize_snippet(&blob.data));
        let _ = writeln!(out, "```\n");
    }
    out
}

/// Normalizes a raw snippet for terminal display: tabs become two spaces,
/// leading and trailing newlines are trimmed.
fn normalize_snippet(data: &str) -> String {
    data.replace('\t', "  ").trim_matches('\n').to_string()
}
