//! Plain-text joke files.
//!
//! Each category is written to `<output_dir>/<category>.txt` as a sequence of
//! blocks:
//!
//! ```text
//! [KNOCK_KNOCK #1]
//! User: amy
//! Knock knock. Who's there?
//!
//! ```
//!
//! The combined file concatenates every category file under a
//! `--- <filename> ---` header.

use crate::models::{Collection, JokeEntry};
use crate::outputs::SinkResult;
use std::fmt::Write;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument};

/// Render jokes as numbered blocks, numbering from 1.
pub fn render_jokes(category: &str, jokes: &[JokeEntry]) -> String {
    let label = category.to_uppercase();
    let mut out = String::new();
    for (i, joke) in jokes.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = write!(out, "[{} #{}]\nUser: {}\n{}\n\n", label, i + 1, joke.author, joke.text);
    }
    out
}

/// Path of a category's file.
pub fn category_path(output_dir: &Path, category: &str) -> PathBuf {
    output_dir.join(format!("{category}.txt"))
}

/// Write a finished collection to its category file.
///
/// Every item counts as attempted; on a write failure none are delivered.
#[instrument(level = "info", skip_all, fields(category = %jokes.name(), count = jokes.len()))]
pub async fn finalize(output_dir: &Path, jokes: Collection<JokeEntry>) -> SinkResult {
    let (name, items) = jokes.into_parts();
    let attempted = items.len();
    let path = category_path(output_dir, &name);

    let write = async {
        fs::create_dir_all(output_dir).await?;
        fs::write(&path, render_jokes(&name, &items)).await
    };
    match write.await {
        Ok(()) => {
            info!(path = %path.display(), "Saved jokes");
            SinkResult {
                delivered: attempted,
                attempted,
            }
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to save jokes");
            SinkResult {
                delivered: 0,
                attempted,
            }
        }
    }
}

/// Concatenate every regular file in `dir`, sorted by file name.
///
/// Dotfiles are skipped; category names never start with a dot.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn combine_files(dir: &Path) -> io::Result<String> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            debug!(path = %entry.path().display(), "Skipping hidden file");
            continue;
        }
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut sections = Vec::with_capacity(files.len());
    for path in files {
        let content = fs::read_to_string(&path).await?;
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(file = %filename, chars = content.chars().count(), "Read joke file");
        sections.push(format!("--- {filename} ---\n{content}\n"));
    }
    Ok(sections.join("\n"))
}

/// Combine `dir` and write the result to `output`, returning the combined text.
pub async fn write_combined(dir: &Path, output: &Path) -> io::Result<String> {
    let combined = combine_files(dir).await?;
    fs::write(output, &combined).await?;
    info!(path = %output.display(), "Combined jokes written");
    Ok(combined)
}
