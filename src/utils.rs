//! Small helpers for logging and output directories.

use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped characters appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(15), 10), "aaaaaaaaaa…(+5 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", kept, total - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a scratch file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let check_path = path.join(".__write_check__");
    fs::write(&check_path, b"").await?;
    if let Err(e) = fs::remove_file(&check_path).await {
        warn!(path = %check_path.display(), error = %e, "Failed to remove write-check file");
    }
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.ends_with("…(+400 chars)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "ééééé";
        assert_eq!(truncate_for_log(s, 2), "éé…(+3 chars)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join(".__write_check__").exists());
    }
}
