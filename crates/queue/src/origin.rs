//! Classification of user-supplied origin text.

use std::sync::LazyLock;

use regex::Regex;

use crate::job::OriginKind;

/// Share-link shapes that carry a file identifier, tried in order.
static IDENTIFIER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"id=([a-zA-Z0-9_-]{25,})",
        r"/d/([a-zA-Z0-9_-]{25,})",
        r"file/d/([a-zA-Z0-9_-]{25,})",
        r"open\?id=([a-zA-Z0-9_-]{25,})",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("identifier pattern compiles"))
    .collect()
});

/// Extensions a direct link must end in to be accepted.
const DOWNLOADABLE_EXTENSIONS: &[&str] = &[
    // video
    ".mp4", ".mkv", ".avi", ".mov", ".webm", ".flv", ".wmv",
    // audio
    ".mp3", ".wav", ".flac", ".aac", ".ogg",
    // archives
    ".zip", ".rar", ".7z", ".tar", ".gz",
    // documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    // images
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp",
    // installers
    ".exe", ".dmg", ".pkg", ".deb", ".rpm",
    // text
    ".txt", ".csv", ".json", ".xml",
];

/// Finds a provider file identifier in a share link.
pub fn extract_identifier(text: &str) -> Option<&str> {
    IDENTIFIER_PATTERNS
        .iter()
        .find_map(|re| re.captures(text)?.get(1))
        .map(|m| m.as_str())
}

/// Whether `text` is an HTTP(S) link to a known downloadable file type.
pub fn is_downloadable_link(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return false;
    }
    let path = lower
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    DOWNLOADABLE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
}

/// Maps user text to an origin, identifiers taking precedence over links.
pub fn classify(text: &str) -> Option<(OriginKind, String)> {
    let text = text.trim();
    if let Some(id) = extract_identifier(text) {
        return Some((OriginKind::Identifier, id.to_string()));
    }
    if is_downloadable_link(text) {
        return Some((OriginKind::Link, text.to_string()));
    }
    None
}
