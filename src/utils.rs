//! Utility functions for path manipulation and HTTP header values

use std::path::{Path, PathBuf};

/// Lexically clean a client-supplied path as if it were rooted at `/`.
///
/// Empty and `.` segments are dropped and `..` pops the previous segment,
/// never climbing above the root. The result always starts with `/`, so
/// joining it below a base directory cannot escape that directory.
///
/// # Examples
///
/// ```
/// use filebrowser::utils::clean_path;
/// use std::path::PathBuf;
///
/// assert_eq!(clean_path("docs//./a.txt"), PathBuf::from("/docs/a.txt"));
/// assert_eq!(clean_path("/docs/../../etc/passwd"), PathBuf::from("/etc/passwd"));
/// assert_eq!(clean_path(""), PathBuf::from("/"));
/// ```
#[must_use]
pub fn clean_path(raw: &str) -> PathBuf {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = PathBuf::from("/");
    cleaned.extend(segments);
    cleaned
}

/// Join `name` below the client path `dir` and clean the result.
///
/// # Examples
///
/// ```
/// use filebrowser::utils::join_path;
/// use std::path::PathBuf;
///
/// assert_eq!(join_path("/docs", "a.txt"), PathBuf::from("/docs/a.txt"));
/// assert_eq!(join_path("/docs", "../a.txt"), PathBuf::from("/a.txt"));
/// ```
#[must_use]
pub fn join_path(dir: &str, name: &str) -> PathBuf {
    clean_path(&format!("{dir}/{name}"))
}

/// Resolve a client path below `base`.
#[must_use]
pub fn resolve_below(base: &Path, path: &Path) -> PathBuf {
    let cleaned = clean_path(&path.to_string_lossy());
    match cleaned.strip_prefix("/") {
        Ok(relative) => base.join(relative),
        Err(_) => base.to_path_buf(),
    }
}

/// Reduce an uploaded file name to its final component.
///
/// Some browsers send the full client-side path (with either separator).
/// Returns `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use filebrowser::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("C:\\Users\\me\\photo.jpg").as_deref(), Some("photo.jpg"));
/// assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
/// assert_eq!(sanitize_file_name(".."), None);
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// Build a `Content-Disposition` value that asks the browser to download.
///
/// Quotes and backslashes in the name are escaped; control characters are
/// dropped so the value is always a valid header.
#[must_use]
pub fn attachment_disposition(file_name: &str) -> String {
    let mut escaped = String::with_capacity(file_name.len());
    for c in file_name.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    format!("attachment; filename=\"{escaped}\"")
}
