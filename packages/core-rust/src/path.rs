//! First-folder extraction for folder-based tenant routing.
//!
//! A tenant in folder mode is addressed by the first path segment after the
//! application root (`/site1/page` belongs to `site1`). The parser works on
//! the raw path value and never fails: anything it cannot attribute to a
//! folder yields the empty string, which callers map to [`ROOT_FOLDER_NAME`].
//!
//! # Query strings
//!
//! The query string is *not* stripped before the slash positions are
//! computed. `/site1/app.css?v=1` still yields `site1`, but a `/` inside a
//! query value shifts the last-slash position and can change the result for
//! single-segment paths (`/app.css?v=a/b` yields `app.css?v=a`).

/// Folder name of the tenant served at the application root.
pub const ROOT_FOLDER_NAME: &str = "root";

/// Strips a leading `https://` or `http://` scheme, if any.
fn strip_scheme(raw: &str) -> &str {
    raw.strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .unwrap_or(raw)
}

/// Returns the first folder segment after the application root, or `""`.
///
/// # Examples
///
/// ```
/// use multisite_core::path::first_folder_segment;
///
/// assert_eq!(first_folder_segment("/"), "");
/// assert_eq!(first_folder_segment("/en"), "en");
/// assert_eq!(first_folder_segment("/en/"), "en");
/// assert_eq!(first_folder_segment("/site1/page/sub"), "site1");
/// ```
#[must_use]
pub fn first_folder_segment(raw_path: &str) -> String {
    let path = strip_scheme(raw_path);
    if path == "/" {
        return String::new();
    }

    let (Some(first), Some(last)) = (path.find('/'), path.rfind('/')) else {
        return String::new();
    };

    // Two or more slashes: `/seg1/seg2...`
    if last > first + 1 {
        let rest = &path[first + 1..];
        return match rest.find('/') {
            Some(end) => rest[..end].to_string(),
            None => String::new(),
        };
    }

    // Exactly one slash, at the start: `/en`
    if first == 0 && last == 0 && path.len() > 1 {
        return path[1..].to_string();
    }

    String::new()
}
