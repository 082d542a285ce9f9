//! File names derived from download URLs.

use std::path::{Component, Path};

use url::Url;

/// Used when a URL has no usable last path segment.
pub const FALLBACK_FILENAME: &str = "download";

/// Returns the percent-decoded, sanitized last path segment of `url`.
///
/// Unparseable URLs are split by hand so that relative or odd links still
/// get a name.
#[must_use]
pub fn filename_from_url(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            path.rsplit('/').next().unwrap_or_default().to_string()
        }
    };

    let decoded = urlencoding::decode(&segment).map_or(segment.clone(), |d| d.into_owned());
    if decoded.trim().is_empty() {
        return FALLBACK_FILENAME.to_string();
    }
    sanitize_filename(&decoded)
}

/// Replaces characters that are invalid on common filesystems
/// (`/ \ : * ? " < > |` and control characters) with `_`.
///
/// Names that would still resolve to a special path component, such as
/// `.` or `..`, have their dots replaced too.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    if is_plain_component(&sanitized) {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

fn is_plain_component(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
